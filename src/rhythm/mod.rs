/*!
 * Paragraph rhythm: break candidates, per-language policies and the
 * deterministic splitter.
 */

pub mod candidates;
pub mod policy;
pub mod splitter;

pub use self::candidates::{
    mark_break_candidates, mark_break_candidates_with, pressure_score, strip_break_markers,
    CandidateConfig, MarkedText, PressureReport, BREAK_TAG,
};
pub use self::policy::{apply_rhythm_policy, policy_for, RhythmOutcome, RhythmOverride, RhythmPolicy};
pub use self::splitter::split_dense_paragraphs;
