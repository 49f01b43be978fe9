/*!
 * Chapter translation pipeline.
 *
 * `ChapterTranslator` ties the text components to the external
 * collaborators: entities come from an `EntityStore`, every generation call
 * goes through a `Provider`. Only invalid identifying input fails a chapter;
 * every other failure is recovered inside the unit it happened in.
 */

use futures::stream::{self, StreamExt};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::entities::{AddReport, EntityDetector, EntitySet, EntityStore};
use crate::errors::PipelineError;
use crate::language_utils::{prompt_language_name, validate_language_code};
use crate::providers::Provider;
use crate::rhythm::candidates::CandidateConfig;
use crate::rhythm::policy::{apply_rhythm_policy, policy_for, RhythmOverride, RhythmPolicy};
use crate::rhythm::splitter::split_dense_paragraphs;
use crate::text::{count_paragraphs, normalize_line_endings, LINE_DELIMITER};
use crate::translation::chunker::{
    plan_paragraphs, reassemble_paragraphs, DEFAULT_COARSE_CHUNK_CHARS, DEFAULT_MAX_PARAGRAPH_CHARS,
};
use crate::translation::placeholder::{find_residual_tokens, PlaceholderCodec, TokenStyle};
use crate::translation::stages::{build_stage_request, Stage, StageLanguages};
use crate::translation::structure::{restructure, DEFAULT_SHORT_LINE_MAX};

/// Blank-line runs inside one unit
static UNIT_PARAGRAPH_BREAKS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\n[ \t\r]*\n[\n \t\r]*").expect("Invalid paragraph break regex")
});

/// Token usage statistics for tracking API consumption
#[derive(Debug, Clone)]
pub struct TokenUsageStats {
    /// Number of prompt tokens
    pub prompt_tokens: u64,
    /// Number of completion tokens
    pub completion_tokens: u64,
    /// Total number of tokens
    pub total_tokens: u64,
    /// Number of successful requests
    pub requests: u64,
    /// Total time spent on API requests
    pub api_duration: Duration,
}

impl Default for TokenUsageStats {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenUsageStats {
    /// Create a new empty token usage stats instance
    pub fn new() -> Self {
        Self {
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            requests: 0,
            api_duration: Duration::from_secs(0),
        }
    }

    /// Record one request
    pub fn add_token_usage(&mut self, prompt_tokens: Option<u64>, completion_tokens: Option<u64>, elapsed: Duration) {
        if let Some(pt) = prompt_tokens {
            self.prompt_tokens += pt;
            self.total_tokens += pt;
        }

        if let Some(ct) = completion_tokens {
            self.completion_tokens += ct;
            self.total_tokens += ct;
        }

        self.requests += 1;
        self.api_duration += elapsed;
    }

    /// Fold another set of stats into this one
    pub fn merge(&mut self, other: &TokenUsageStats) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
        self.requests += other.requests;
        self.api_duration += other.api_duration;
    }

    /// Calculate tokens per minute rate over API time
    pub fn tokens_per_minute(&self) -> f64 {
        let duration_minutes = self.api_duration.as_secs_f64() / 60.0;
        if duration_minutes > 0.0 {
            self.total_tokens as f64 / duration_minutes
        } else {
            0.0
        }
    }

    /// Generate a summary of token usage
    pub fn summary(&self) -> String {
        format!(
            "Requests: {}, prompt tokens: {}, completion tokens: {}, total tokens: {}, API time: {:.2} min, tokens/min: {:.2}",
            self.requests,
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens,
            self.api_duration.as_secs_f64() / 60.0,
            self.tokens_per_minute()
        )
    }
}

/// Tunables of the pipeline, resolved once from configuration
#[derive(Debug, Clone)]
pub struct TranslatorSettings {
    /// Paragraphs longer than this are chunked
    pub max_paragraph_chars: usize,
    /// Coarse chunk size for entity detection
    pub entity_chunk_chars: usize,
    /// Narration at or under this length stays standalone
    pub short_line_max: usize,
    /// Units in flight at once
    pub concurrent_requests: usize,
    /// Break-candidate thresholds
    pub candidates: CandidateConfig,
    /// Master switch for the external rhythm pass
    pub rhythm_enabled: bool,
    /// Per-language adjustments of the built-in rhythm records
    pub rhythm_overrides: HashMap<String, RhythmOverride>,
    /// How placeholder tokens are generated
    pub token_style: TokenStyle,
}

impl Default for TranslatorSettings {
    fn default() -> Self {
        Self {
            max_paragraph_chars: DEFAULT_MAX_PARAGRAPH_CHARS,
            entity_chunk_chars: DEFAULT_COARSE_CHUNK_CHARS,
            short_line_max: DEFAULT_SHORT_LINE_MAX,
            concurrent_requests: 4,
            candidates: CandidateConfig::default(),
            rhythm_enabled: true,
            rhythm_overrides: HashMap::new(),
            token_style: TokenStyle::Random,
        }
    }
}

impl TranslatorSettings {
    /// Rhythm record of a language with overrides applied
    pub fn rhythm_policy(&self, language: &str) -> Option<RhythmPolicy> {
        let policy = policy_for(language)?;
        Some(match self.rhythm_overrides.get(language) {
            Some(adjustment) => adjustment.apply(policy),
            None => policy,
        })
    }
}

/// Counters collected while translating one chapter
#[derive(Debug, Clone, Default)]
pub struct TranslationStats {
    /// Non-blank paragraphs of the input
    pub paragraphs: usize,
    /// Units sent through the stage chain
    pub units: usize,
    /// Paragraphs that had to be chunked
    pub chunked_paragraphs: usize,
    /// Locked entities resolved for the target language
    pub entities_resolved: usize,
    /// Placeholder tokens substituted across all units
    pub placeholders_applied: usize,
    /// Stage calls whose input was passed through
    pub stage_fallbacks: usize,
    /// Paragraphs after restructuring and the rhythm pass
    pub output_paragraphs: usize,
    /// Break candidates offered to the rhythm pass
    pub rhythm_candidates: usize,
    /// Whether the rhythm pass result was kept
    pub rhythm_applied: bool,
    /// Token-shaped strings left in the output
    pub residual_tokens: Vec<String>,
    /// Provider usage
    pub token_usage: TokenUsageStats,
    /// Wall-clock time of the chapter
    pub elapsed: Duration,
}

/// Result of `translate_chapter`
#[derive(Debug, Clone)]
pub struct ChapterTranslation {
    pub text: String,
    pub stats: TranslationStats,
}

struct Unit<'a> {
    index: usize,
    paragraph: usize,
    text: &'a str,
}

struct UnitOutcome {
    index: usize,
    paragraph: usize,
    text: String,
    placeholders: usize,
    fallbacks: usize,
    usage: TokenUsageStats,
}

/// Orchestrates the translation of whole chapters
#[derive(Debug, Clone)]
pub struct ChapterTranslator {
    provider: Arc<dyn Provider>,
    entity_store: Arc<dyn EntityStore>,
    settings: TranslatorSettings,
    codec: PlaceholderCodec,
}

impl ChapterTranslator {
    pub fn new(provider: Arc<dyn Provider>, entity_store: Arc<dyn EntityStore>, settings: TranslatorSettings) -> Self {
        let codec = PlaceholderCodec::new(settings.token_style);
        Self { provider, entity_store, settings, codec }
    }

    pub fn settings(&self) -> &TranslatorSettings {
        &self.settings
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Translate a chapter without progress reporting
    pub async fn translate_chapter(
        &self,
        title: &str,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<ChapterTranslation, PipelineError> {
        self.translate_chapter_with_progress(title, text, source_language, target_language, |_, _| {})
            .await
    }

    /// Translate a chapter, calling `progress(done, total)` after every unit
    pub async fn translate_chapter_with_progress<F>(
        &self,
        title: &str,
        text: &str,
        source_language: &str,
        target_language: &str,
        progress: F,
    ) -> Result<ChapterTranslation, PipelineError>
    where
        F: Fn(usize, usize) + Sync,
    {
        let start_time = Instant::now();
        let languages = resolve_languages(title, source_language, target_language)?;
        let mut stats = TranslationStats::default();
        let text = normalize_line_endings(text);
        let text: &str = &text;

        if text.trim().is_empty() {
            return Ok(ChapterTranslation { text: String::new(), stats });
        }

        let entities = self.load_entities(title).await;
        let resolved = entities.resolve_locked(&languages.target_code);
        stats.entities_resolved = resolved.len();
        debug!("Resolved {} of {} entities for '{}' ({})", resolved.len(), entities.len(), title, languages.target_code);

        let plan = plan_paragraphs(text, self.settings.max_paragraph_chars);
        stats.paragraphs = count_paragraphs(text);
        stats.chunked_paragraphs = plan.iter().filter(|p| p.is_chunked()).count();

        let units: Vec<Unit<'_>> = plan
            .iter()
            .enumerate()
            .filter(|(_, paragraph)| !paragraph.blank)
            .flat_map(|(paragraph_index, paragraph)| {
                paragraph.chunks.iter().map(move |chunk| (paragraph_index, *chunk))
            })
            .enumerate()
            .map(|(index, (paragraph, text))| Unit { index, paragraph, text })
            .collect();
        stats.units = units.len();

        let total_units = units.len();
        let completed = std::sync::atomic::AtomicUsize::new(0);
        let resolved = &resolved;
        let languages = &languages;
        let progress = &progress;
        let completed = &completed;

        let mut outcomes: Vec<UnitOutcome> = stream::iter(units)
            .map(|unit| async move {
                let outcome = self.translate_unit(unit, resolved, languages).await;
                let done = completed.fetch_add(1, std::sync::atomic::Ordering::SeqCst) + 1;
                progress(done, total_units);
                outcome
            })
            .buffer_unordered(self.settings.concurrent_requests.max(1))
            .collect()
            .await;

        // Sort results by unit index to restore the original order
        outcomes.sort_by_key(|outcome| outcome.index);

        let mut paragraphs: Vec<Vec<String>> = plan
            .iter()
            .map(|p| if p.blank { p.chunks.iter().map(|c| c.to_string()).collect() } else { Vec::new() })
            .collect();

        for outcome in outcomes {
            stats.placeholders_applied += outcome.placeholders;
            stats.stage_fallbacks += outcome.fallbacks;
            stats.token_usage.merge(&outcome.usage);
            paragraphs[outcome.paragraph].push(outcome.text);
        }

        let joined = reassemble_paragraphs(&paragraphs);
        let mut output = restructure(&joined, self.settings.short_line_max);

        if let Some(policy) = self.settings.rhythm_policy(&languages.target_code) {
            output = self.apply_rhythm(output, &policy, languages, &mut stats).await;
        }

        stats.residual_tokens = find_residual_tokens(&output);
        if !stats.residual_tokens.is_empty() {
            warn!("{} placeholder token(s) left in the output of '{}': {:?}",
                  stats.residual_tokens.len(), title, stats.residual_tokens);
        }

        stats.output_paragraphs = count_paragraphs(&output);
        stats.elapsed = start_time.elapsed();
        info!(
            "Translated '{}' ({} -> {}): {} paragraph(s), {} unit(s), {} fallback(s)",
            title, languages.source_code, languages.target_code, stats.paragraphs, stats.units, stats.stage_fallbacks
        );

        Ok(ChapterTranslation { text: output, stats })
    }

    /// Detect proper-noun candidates in a source chapter
    pub async fn detect_entities(&self, text: &str, source_language: &str) -> Result<Vec<String>, PipelineError> {
        let source_code = validate_language_code(source_language)
            .map_err(|e| PipelineError::InvalidInput(e.to_string()))?;
        let source_name = prompt_language_name(&source_code)
            .map_err(|e| PipelineError::InvalidInput(e.to_string()))?;

        let detector = EntityDetector::new(Arc::clone(&self.provider))
            .with_chunk_chars(self.settings.entity_chunk_chars)
            .with_concurrency(self.settings.concurrent_requests);
        Ok(detector.detect(text, &source_name).await)
    }

    /// Detect candidates and register the ones the store does not know yet
    pub async fn register_new_entities(
        &self,
        title: &str,
        text: &str,
        source_language: &str,
    ) -> Result<AddReport, PipelineError> {
        if title.trim().is_empty() {
            return Err(PipelineError::InvalidInput("title must not be empty".to_string()));
        }

        let candidates = self.detect_entities(text, source_language).await?;
        let known = self.load_entities(title).await;
        let new_names: Vec<String> = candidates.into_iter().filter(|name| !known.contains(name)).collect();

        if new_names.is_empty() {
            debug!("No new entities for '{}'", title);
            return Ok(AddReport::default());
        }

        let report = self.entity_store.add(title, &new_names).await;
        info!("Registered {} new entit(ies) for '{}', {} failed", report.added.len(), title, report.failed.len());
        Ok(report)
    }

    async fn load_entities(&self, title: &str) -> EntitySet {
        match self.entity_store.load(title).await {
            Ok(set) => set,
            Err(e) => {
                warn!("Failed to load entities for '{}', continuing without them: {}", title, e);
                EntitySet::new()
            }
        }
    }

    async fn translate_unit(
        &self,
        unit: Unit<'_>,
        resolved: &HashMap<String, String>,
        languages: &StageLanguages,
    ) -> UnitOutcome {
        let (masked, mapping) = self.codec.apply(unit.text, resolved);
        let mut current = masked;
        let mut fallbacks = 0;
        let mut usage = TokenUsageStats::new();

        for stage in Stage::ALL {
            let Some(request) = build_stage_request(stage, &current, languages) else {
                continue;
            };

            let started = Instant::now();
            match self.provider.complete(request).await {
                Ok(response) if !response.text.trim().is_empty() => {
                    usage.add_token_usage(response.prompt_tokens, response.completion_tokens, started.elapsed());
                    let answer = response.text.trim();
                    let lost = mapping.lost_tokens(&current, answer);
                    if lost.is_empty() {
                        current = answer.to_string();
                    } else {
                        warn!("{} stage dropped {} placeholder(s) for unit {}; passing input through: {:?}",
                              stage, lost.len(), unit.index, lost);
                        fallbacks += 1;
                    }
                }
                Ok(_) => {
                    warn!("{} stage returned nothing for unit {}; passing input through", stage, unit.index);
                    fallbacks += 1;
                }
                Err(e) => {
                    warn!("{} stage failed for unit {}; passing input through: {}", stage, unit.index, e);
                    fallbacks += 1;
                }
            }
        }

        let restored = self.codec.restore(&current, &mapping, resolved, &languages.target_code);

        UnitOutcome {
            index: unit.index,
            paragraph: unit.paragraph,
            text: flatten_paragraph_breaks(&restored, unit.text),
            placeholders: mapping.len(),
            fallbacks,
            usage,
        }
    }

    async fn apply_rhythm(
        &self,
        text: String,
        policy: &RhythmPolicy,
        languages: &StageLanguages,
        stats: &mut TranslationStats,
    ) -> String {
        let mut text = text;

        if self.settings.rhythm_enabled && policy.external_pass {
            let outcome = apply_rhythm_policy(
                &text,
                policy,
                &languages.target_name,
                self.provider.as_ref(),
                &self.settings.candidates,
            )
            .await;
            stats.rhythm_candidates = outcome.candidates;
            stats.rhythm_applied = outcome.applied;
            text = outcome.text;
        }

        if !stats.rhythm_applied {
            if let Some(max_sentences) = policy.dense_split_max {
                text = split_dense_paragraphs(&text, max_sentences);
            }
        }

        text
    }
}

/// Validate identifying input and resolve language names
fn resolve_languages(title: &str, source_language: &str, target_language: &str) -> Result<StageLanguages, PipelineError> {
    if title.trim().is_empty() {
        return Err(PipelineError::InvalidInput("title must not be empty".to_string()));
    }

    let invalid = |e: anyhow::Error| PipelineError::InvalidInput(e.to_string());
    let source_code = validate_language_code(source_language).map_err(invalid)?;
    let target_code = validate_language_code(target_language).map_err(invalid)?;

    Ok(StageLanguages {
        source_name: prompt_language_name(&source_code).map_err(invalid)?,
        target_name: prompt_language_name(&target_code).map_err(invalid)?,
        source_code,
        target_code,
    })
}

/// A unit is always part of one paragraph: collapse the blank-line runs its
/// translation gained to newlines. Runs already present in the unit's source
/// are kept, each one as often as the source has it.
fn flatten_paragraph_breaks(output: &str, source: &str) -> String {
    let mut source_runs: HashMap<&str, usize> = HashMap::new();
    for run in UNIT_PARAGRAPH_BREAKS.find_iter(source) {
        *source_runs.entry(run.as_str()).or_insert(0) += 1;
    }

    UNIT_PARAGRAPH_BREAKS
        .replace_all(output, |caps: &regex::Captures<'_>| {
            let run = &caps[0];
            match source_runs.get_mut(run) {
                Some(remaining) if *remaining > 0 => {
                    *remaining -= 1;
                    run.to_string()
                }
                _ => LINE_DELIMITER.to_string(),
            }
        })
        .into_owned()
}
