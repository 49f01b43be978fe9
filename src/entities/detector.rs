/*!
 * Proper-noun candidate detection.
 *
 * The source chapter is packed into coarse chunks and each chunk is sent to
 * the generation service, which answers with a JSON array of names. The
 * detector is recall-oriented and silent about failures: a chunk whose
 * answer cannot be used contributes nothing.
 */

use futures::stream::{self, StreamExt};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;

use crate::providers::{CompletionRequest, Provider};
use crate::translation::chunker::{chunk_paragraphs, DEFAULT_COARSE_CHUNK_CHARS};

/// Temperature of detection requests
pub const DETECTION_TEMPERATURE: f32 = 0.2;

/// First `[` through last `]` of an answer
static JSON_ARRAY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[[\s\S]*\]").expect("Invalid JSON array regex")
});

const DETECTION_PROMPT: &str = r#"You extract proper-noun candidates from the original {source_language} text of a web novel.
Missing a name is worse than including a doubtful one: include anything that might be a proper noun.

Candidates include:
- character names, nicknames, titles and epithets
- places and organizations
- skills, items and named concepts
- words that only mean something inside the story's world

Rules:
- Do not translate, interpret or judge.
- Use each expression exactly as it appears in the text.
- Output ONLY a JSON array of strings."#;

/// LLM-backed entity candidate detector
#[derive(Debug, Clone)]
pub struct EntityDetector {
    provider: Arc<dyn Provider>,
    chunk_chars: usize,
    concurrency: usize,
}

impl EntityDetector {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            chunk_chars: DEFAULT_COARSE_CHUNK_CHARS,
            concurrency: 1,
        }
    }

    /// Size of the coarse chunks sent per request
    pub fn with_chunk_chars(mut self, chunk_chars: usize) -> Self {
        self.chunk_chars = chunk_chars.max(1);
        self
    }

    /// Number of chunk requests in flight
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Candidate names in first-seen order, without duplicates
    pub async fn detect(&self, text: &str, source_language_name: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chunks = chunk_paragraphs(text.trim(), self.chunk_chars);
        let instructions = DETECTION_PROMPT.replace("{source_language}", source_language_name);

        let per_chunk: Vec<Vec<String>> = stream::iter(chunks)
            .map(|chunk| {
                let instructions = instructions.clone();
                async move { self.detect_chunk(&instructions, chunk).await }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut seen = HashSet::new();
        let candidates: Vec<String> = per_chunk
            .into_iter()
            .flatten()
            .filter(|name| seen.insert(name.clone()))
            .collect();

        debug!("Detected {} entity candidate(s)", candidates.len());
        candidates
    }

    async fn detect_chunk(&self, instructions: &str, chunk: String) -> Vec<String> {
        let request = CompletionRequest::new()
            .system(instructions)
            .user(chunk)
            .temperature(DETECTION_TEMPERATURE);

        match self.provider.complete(request).await {
            Ok(response) => parse_candidates(&response.text),
            Err(e) => {
                warn!("Entity detection request failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// Pull a JSON array of strings out of a free-form answer
pub fn parse_candidates(answer: &str) -> Vec<String> {
    let Some(array) = JSON_ARRAY_REGEX.find(answer) else {
        debug!("Detection answer contains no JSON array");
        return Vec::new();
    };

    match serde_json::from_str::<Value>(array.as_str()) {
        Ok(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        Ok(_) => Vec::new(),
        Err(e) => {
            debug!("Detection answer is not valid JSON: {}", e);
            Vec::new()
        }
    }
}
