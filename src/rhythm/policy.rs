/*!
 * Per-language paragraph rhythm.
 *
 * Each target language carries a small record describing how its web-novel
 * readers expect paragraphs to look. One routine turns a record into
 * instructions for an external judgment over break candidates; the record
 * also drives the deterministic splitter.
 */

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::providers::{CompletionRequest, Provider};
use crate::rhythm::candidates::{mark_break_candidates_with, scrub_break_tags, CandidateConfig};
use crate::rhythm::splitter::DEFAULT_MAX_SENTENCES;
use crate::text::PARAGRAPH_DELIMITER;

/// Temperature of the rhythm judgment request
pub const RHYTHM_TEMPERATURE: f32 = 0.3;

/// Paragraph rhythm rules for one target language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RhythmPolicy {
    /// ISO 639-1 code
    pub language: &'static str,
    /// Paragraphs at or under this many characters count as short
    pub short_paragraph_max: usize,
    /// Preferred (min, max) sentences per narration paragraph
    pub sentences_per_paragraph: (usize, usize),
    /// Dialogue must always be its own paragraph
    pub dialogue_standalone: bool,
    /// Run the external rhythm judgment after restructuring
    pub external_pass: bool,
    /// How dialogue is marked in this language
    pub dialogue_marks: &'static str,
    /// Extra guidance specific to the language
    pub note: &'static str,
    /// Sentence budget of the deterministic splitter, for languages that use it
    pub dense_split_max: Option<usize>,
}

/// User adjustments of a built-in record; unset fields keep the default
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RhythmOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_pass: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_paragraph_max: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_sentences: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dense_split_max: Option<usize>,
}

impl RhythmOverride {
    /// Record with the set fields replaced
    pub fn apply(&self, policy: RhythmPolicy) -> RhythmPolicy {
        let (min, max) = policy.sentences_per_paragraph;
        let max = self.max_sentences.unwrap_or(max).max(min);
        RhythmPolicy {
            external_pass: self.external_pass.unwrap_or(policy.external_pass),
            short_paragraph_max: self.short_paragraph_max.unwrap_or(policy.short_paragraph_max),
            sentences_per_paragraph: (min, max),
            dense_split_max: self.dense_split_max.or(policy.dense_split_max),
            ..policy
        }
    }
}

const POLICIES: [RhythmPolicy; 9] = [
    RhythmPolicy {
        language: "ko",
        short_paragraph_max: 60,
        sentences_per_paragraph: (1, 3),
        dialogue_standalone: true,
        external_pass: false,
        dialogue_marks: "\"...\"",
        note: "Korean web novels favor short paragraphs with a blank line around dialogue.",
        dense_split_max: None,
    },
    RhythmPolicy {
        language: "en",
        short_paragraph_max: 80,
        sentences_per_paragraph: (1, 3),
        dialogue_standalone: true,
        external_pass: true,
        dialogue_marks: "\"...\"",
        note: "One-sentence paragraphs are encouraged; never group sentences only because they are related.",
        dense_split_max: None,
    },
    RhythmPolicy {
        language: "ja",
        short_paragraph_max: 60,
        sentences_per_paragraph: (1, 4),
        dialogue_standalone: true,
        external_pass: true,
        dialogue_marks: "「...」",
        note: "Follow Narou and Kakuyomu conventions; slightly denser paragraphs than English are fine.",
        dense_split_max: Some(DEFAULT_MAX_SENTENCES),
    },
    RhythmPolicy {
        language: "zh",
        short_paragraph_max: 40,
        sentences_per_paragraph: (1, 2),
        dialogue_standalone: true,
        external_pass: false,
        dialogue_marks: "\u{201C}...\u{201D}",
        note: "Chinese web novels use shorter paragraphs than other languages.",
        dense_split_max: None,
    },
    RhythmPolicy {
        language: "de",
        short_paragraph_max: 100,
        sentences_per_paragraph: (2, 4),
        dialogue_standalone: true,
        external_pass: false,
        dialogue_marks: "\u{201E}...\u{201C} or \"...\"",
        note: "German sentences run long, so paragraphs must stay short.",
        dense_split_max: None,
    },
    RhythmPolicy {
        language: "es",
        short_paragraph_max: 90,
        sentences_per_paragraph: (2, 4),
        dialogue_standalone: true,
        external_pass: false,
        dialogue_marks: "\u{2014} or \"...\"",
        note: "Dialogue introduced with a dash stays separate from narration.",
        dense_split_max: None,
    },
    RhythmPolicy {
        language: "fr",
        short_paragraph_max: 90,
        sentences_per_paragraph: (2, 4),
        dialogue_standalone: true,
        external_pass: false,
        dialogue_marks: "\u{AB} ... \u{BB} or \"...\"",
        note: "Use a single newline inside continuous action and a blank line for scene or viewpoint shifts.",
        dense_split_max: None,
    },
    RhythmPolicy {
        language: "pt",
        short_paragraph_max: 90,
        sentences_per_paragraph: (2, 4),
        dialogue_standalone: true,
        external_pass: false,
        dialogue_marks: "\u{2014} or \"...\"",
        note: "Dialogue introduced with a dash stays separate from narration.",
        dense_split_max: None,
    },
    RhythmPolicy {
        language: "id",
        short_paragraph_max: 80,
        sentences_per_paragraph: (1, 3),
        dialogue_standalone: true,
        external_pass: false,
        dialogue_marks: "\"...\"",
        note: "Keep paragraphs light for mobile readers.",
        dense_split_max: None,
    },
];

/// All built-in records
pub fn policies() -> &'static [RhythmPolicy] {
    &POLICIES
}

/// Built-in record for a language, if it has one
pub fn policy_for(language: &str) -> Option<RhythmPolicy> {
    POLICIES.iter().find(|p| p.language == language).copied()
}

/// What the rhythm pass did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RhythmOutcome {
    /// Resulting text
    pub text: String,
    /// Candidates offered to the external judgment
    pub candidates: usize,
    /// Whether the external result was accepted
    pub applied: bool,
}

impl RhythmOutcome {
    fn unchanged(text: &str, candidates: usize) -> Self {
        Self { text: text.to_string(), candidates, applied: false }
    }
}

/// Instructions for the external rhythm judgment
pub fn build_rhythm_instructions(policy: &RhythmPolicy, language_name: &str, tag: &str) -> String {
    let (min, max) = policy.sentences_per_paragraph;
    let dialogue_rule = if policy.dialogue_standalone {
        format!("- Dialogue ({}) MUST be a standalone paragraph. Never merge dialogue with narration.\n", policy.dialogue_marks)
    } else {
        String::new()
    };

    format!(
        "You are adjusting paragraph breaks for ALREADY TRANSLATED {language} web novel text.\n\
         This is NOT a translation task. Do NOT rewrite, summarize, add, remove or rephrase anything.\n\
         Your ONLY task is to adjust paragraph breaks.\n\n\
         The text contains {tag} markers at possible break points. They are suggestions:\n\
         - You MAY turn a {tag} into a paragraph break (a blank line).\n\
         - You MAY ignore a {tag} and keep the sentences together.\n\
         Remove ALL {tag} markers from your output.\n\n\
         RULES:\n\
         {dialogue_rule}\
         - Narration paragraphs hold {min} to {max} sentences.\n\
         - Paragraphs of {short} characters or fewer may stand alone.\n\
         - Split when the focus of action, the scene or a character's state changes.\n\
         - Do not split purely because sentences are short.\n\
         - Placeholders such as __ENTITY_x__ must be kept exactly as they are.\n\
         - {note}\n\n\
         OUTPUT: only the adjusted {language} text, same sentences, same order.",
        language = language_name,
        tag = tag,
        dialogue_rule = dialogue_rule,
        min = min,
        max = max,
        short = policy.short_paragraph_max,
        note = policy.note,
    )
}

/// Content with all whitespace removed, for comparing before and after
fn content_signature(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Run the external rhythm judgment for one text.
///
/// Marks candidates, asks the provider which ones become breaks, then
/// scrubs leftover tags. This never fails: any provider error, an empty
/// answer, or an answer whose non-whitespace content differs from the input
/// returns the input unchanged.
pub async fn apply_rhythm_policy(
    text: &str,
    policy: &RhythmPolicy,
    language_name: &str,
    provider: &dyn Provider,
    candidate_config: &CandidateConfig,
) -> RhythmOutcome {
    if text.trim().is_empty() {
        return RhythmOutcome::unchanged(text, 0);
    }

    let marked = mark_break_candidates_with(text, candidate_config);
    let candidates = marked.candidates;
    if candidates == 0 {
        debug!("No break candidates for {}; skipping rhythm pass", policy.language);
        return RhythmOutcome::unchanged(text, 0);
    }

    let request = CompletionRequest::new()
        .system(build_rhythm_instructions(policy, language_name, &marked.tag))
        .user(marked.text.clone())
        .temperature(RHYTHM_TEMPERATURE);

    let response = match provider.complete(request).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Rhythm pass for {} failed, keeping restructured text: {}", policy.language, e);
            return RhythmOutcome::unchanged(text, candidates);
        }
    };

    let adjusted = scrub_break_tags(response.text.trim(), &marked.tag);
    if adjusted.trim().is_empty() {
        warn!("Rhythm pass for {} returned nothing, keeping restructured text", policy.language);
        return RhythmOutcome::unchanged(text, candidates);
    }

    if content_signature(&adjusted) != content_signature(text) {
        warn!("Rhythm pass for {} changed the content, keeping restructured text", policy.language);
        return RhythmOutcome::unchanged(text, candidates);
    }

    debug!(
        "Rhythm pass for {}: {} candidate(s), {} -> {} paragraph(s)",
        policy.language,
        candidates,
        text.split(PARAGRAPH_DELIMITER).count(),
        adjusted.split(PARAGRAPH_DELIMITER).count()
    );

    RhythmOutcome { text: adjusted, candidates, applied: true }
}
