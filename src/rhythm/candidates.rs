/*!
 * Break-candidate marking.
 *
 * Annotates sentence boundaries where a paragraph break would read
 * naturally. The marker is an in-band literal that a plain replace removes
 * without residue; nothing else about the text is changed. Its tag is picked
 * per text so that it never occurs in the input. Which candidates become real
 * breaks is decided later by the rhythm pass.
 */

use log::debug;
use std::fmt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::text::{char_len, is_quote_char, segment_sentences};

/// Preferred tag; texts that already contain it get a numbered variant
pub const BREAK_TAG: &str = "[[BREAK]]";

/// Default trimmed length under which a sentence counts as short
pub const DEFAULT_SHORT_SENTENCE_THRESHOLD: usize = 30;

/// Movement and action verbs (English, matched as whole words)
const ACTION_VERBS_EN: &[&str] = &[
    "ran", "walked", "jumped", "stopped", "opened", "closed", "turned", "moved", "grabbed",
    "threw", "kicked", "hit", "stood", "sat", "fell", "climbed", "rushed",
];

/// Movement and action verbs (Japanese, matched as substrings)
const ACTION_VERBS_JA: &[&str] = &[
    "走った", "歩いた", "飛んだ", "止まった", "開けた", "閉めた", "振り向いた", "動いた",
    "掴んだ", "投げた", "蹴った",
];

/// Temporal and contrastive connectives (English)
const TRANSITIONS_EN: &[&str] = &[
    "suddenly", "at that moment", "then", "meanwhile", "after that", "before that", "however",
    "but",
];

/// Temporal and contrastive connectives (Japanese)
const TRANSITIONS_JA: &[&str] = &[
    "その時", "そして", "しかし", "だが", "突然", "その後", "やがて", "すると",
];

/// Ellipses and dashes that mark interiority or emphasis
const INTERIORITY_MARKERS: &[&str] = &["...", "…", "—", "――"];

/// Three or more newlines left behind after scrubbing tags
static EXCESS_NEWLINES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n{3,}").expect("Invalid newline regex")
});

/// Tuning knobs for candidate detection
#[derive(Debug, Clone)]
pub struct CandidateConfig {
    /// Sentences whose trimmed length is below this are candidates
    pub short_sentence_threshold: usize,
    /// How many leading words of a sentence may hold its action verb
    pub action_verb_window: usize,
}

impl Default for CandidateConfig {
    fn default() -> Self {
        Self {
            short_sentence_threshold: DEFAULT_SHORT_SENTENCE_THRESHOLD,
            action_verb_window: 3,
        }
    }
}

/// Why a boundary was marked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateReason {
    /// Either side contains dialogue
    Dialogue,
    /// Next sentence opens with an action verb
    Action,
    /// Next sentence contains a transition term
    Transition,
    /// Current sentence has an ellipsis or dash
    Interiority,
    /// Current sentence is short
    ShortSentence,
}

/// A text with break markers inserted, and the tag those markers carry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedText {
    pub text: String,
    /// Tag absent from the unmarked input
    pub tag: String,
    pub candidates: usize,
}

impl MarkedText {
    /// Literal inserted at each candidate boundary
    pub fn marker(&self) -> String {
        break_marker(&self.tag)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl fmt::Display for MarkedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// First of `[[BREAK]]`, `[[BREAK-1]]`, `[[BREAK-2]]`... that `text` does not contain
pub fn break_tag_for(text: &str) -> String {
    if !text.contains(BREAK_TAG) {
        return BREAK_TAG.to_string();
    }

    (1usize..)
        .map(|n| format!("[[BREAK-{}]]", n))
        .find(|tag| !text.contains(tag.as_str()))
        .unwrap_or_else(|| BREAK_TAG.to_string())
}

/// Marker literal of a tag; the tag has no newline so markers never merge with content
pub fn break_marker(tag: &str) -> String {
    format!("\n{}\n", tag)
}

/// Insert break markers with the default configuration
pub fn mark_break_candidates(text: &str) -> MarkedText {
    mark_break_candidates_with(text, &CandidateConfig::default())
}

/// Insert a marker after every sentence boundary that qualifies.
///
/// The last sentence is never followed by a marker. Blank text is returned
/// unchanged.
pub fn mark_break_candidates_with(text: &str, config: &CandidateConfig) -> MarkedText {
    let tag = break_tag_for(text);
    let sentences = segment_sentences(text);
    if sentences.is_empty() {
        return MarkedText { text: text.to_string(), tag, candidates: 0 };
    }

    let marker = break_marker(&tag);
    let mut marked = String::with_capacity(text.len() + sentences.len() * marker.len());
    let mut candidates = 0;

    for (i, sentence) in sentences.iter().enumerate() {
        marked.push_str(sentence);

        if let Some(next) = sentences.get(i + 1) {
            if candidate_reason(sentence, next, config).is_some() {
                marked.push_str(&marker);
                candidates += 1;
            }
        }
    }

    debug!("Marked {} break candidate(s) across {} sentence(s) with {}", candidates, sentences.len(), tag);
    MarkedText { text: marked, tag, candidates }
}

/// First rule that makes the boundary between two sentences a candidate
pub fn candidate_reason(current: &str, next: &str, config: &CandidateConfig) -> Option<CandidateReason> {
    if is_dialogue(current) || is_dialogue(next) {
        Some(CandidateReason::Dialogue)
    } else if opens_with_action_verb(next, config.action_verb_window) {
        Some(CandidateReason::Action)
    } else if has_transition(next) {
        Some(CandidateReason::Transition)
    } else if has_interiority(current) {
        Some(CandidateReason::Interiority)
    } else if char_len(current.trim()) < config.short_sentence_threshold {
        Some(CandidateReason::ShortSentence)
    } else {
        None
    }
}

/// Remove every inserted marker, restoring the unmarked text
pub fn strip_break_markers(marked: &MarkedText) -> String {
    marked.text.replace(&marked.marker(), "")
}

/// Clean model output that may still carry bare `tag`s
pub fn scrub_break_tags(text: &str, tag: &str) -> String {
    let without_tags = text.replace(tag, "");
    EXCESS_NEWLINES.replace_all(&without_tags, "\n\n").into_owned()
}

/// Number of `tag` occurrences in a text
pub fn count_break_markers(text: &str, tag: &str) -> usize {
    text.matches(tag).count()
}

/// Whether a sentence contains any quotation character
pub fn is_dialogue(sentence: &str) -> bool {
    sentence.chars().any(is_quote_char)
}

fn opens_with_action_verb(sentence: &str, window: usize) -> bool {
    let opening_words = sentence
        .split_whitespace()
        .take(window)
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphabetic())
                .to_lowercase()
        });

    for word in opening_words {
        if ACTION_VERBS_EN.contains(&word.as_str()) {
            return true;
        }
    }

    ACTION_VERBS_JA.iter().any(|verb| sentence.contains(verb))
}

fn has_transition(sentence: &str) -> bool {
    let lowered = sentence.to_lowercase();
    TRANSITIONS_EN.iter().any(|term| contains_phrase(&lowered, term))
        || TRANSITIONS_JA.iter().any(|term| sentence.contains(term))
}

fn has_interiority(sentence: &str) -> bool {
    INTERIORITY_MARKERS.iter().any(|marker| sentence.contains(marker))
}

/// Whole-word containment: `then` matches "and then he" but not "athens"
fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    haystack.match_indices(phrase).any(|(start, matched)| {
        let end = start + matched.len();
        let clear_before = haystack[..start].chars().next_back().is_none_or(|c| !c.is_alphanumeric());
        let clear_after = haystack[end..].chars().next().is_none_or(|c| !c.is_alphanumeric());
        clear_before && clear_after
    })
}

/// Diagnostic summary of how "dense" a passage reads
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PressureReport {
    /// Number of sentence spans
    pub sentence_count: usize,
    /// Mean sentence length in characters
    pub avg_sentence_length: f64,
    /// Number of candidate markers the text would receive
    pub break_candidates: usize,
    /// Whether any sentence contains dialogue
    pub has_dialogue: bool,
    /// Combined heuristic in [0, 1]
    pub pressure_score: f64,
}

/// Compute the pressure diagnostic with the default configuration
pub fn pressure_score(text: &str) -> PressureReport {
    pressure_score_with(text, &CandidateConfig::default())
}

/// Compute the pressure diagnostic.
///
/// 0.3 weight on sentence count (saturating at 5), 0.2 on shortness of the
/// average sentence (zero at 100 chars), 0.3 on candidate density and a flat
/// 0.2 when dialogue is present. Used for tuning only.
pub fn pressure_score_with(text: &str, config: &CandidateConfig) -> PressureReport {
    let sentences = segment_sentences(text);
    let sentence_count = sentences.len();
    let total_length: usize = sentences.iter().map(|s| char_len(s)).sum();
    let avg_sentence_length = total_length as f64 / sentence_count.max(1) as f64;
    let break_candidates = mark_break_candidates_with(text, config).candidates;
    let has_dialogue = sentences.iter().any(|s| is_dialogue(s));

    let mut score = 0.0;
    score += (sentence_count as f64 / 5.0).min(1.0) * 0.3;
    score += (1.0 - avg_sentence_length / 100.0).max(0.0) * 0.2;
    if sentence_count > 0 {
        score += (break_candidates as f64 / sentence_count as f64).min(1.0) * 0.3;
    }
    if has_dialogue {
        score += 0.2;
    }

    PressureReport {
        sentence_count,
        avg_sentence_length,
        break_candidates,
        has_dialogue,
        pressure_score: score.min(1.0),
    }
}
