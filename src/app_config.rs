use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use url::Url;

use crate::language_utils::validate_language_code;
use crate::providers::RetryPolicy;
use crate::rhythm::candidates::{CandidateConfig, DEFAULT_SHORT_SENTENCE_THRESHOLD};
use crate::rhythm::policy::RhythmOverride;
use crate::translation::chunker::{DEFAULT_COARSE_CHUNK_CHARS, DEFAULT_MAX_PARAGRAPH_CHARS};
use crate::translation::core::TranslatorSettings;
use crate::translation::structure::DEFAULT_SHORT_LINE_MAX;

/// Settings of one run, loaded from `conf.json` and resolved once in `main`.
///
/// Every section defaults independently, so a partial file is valid.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Source language code (ISO)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// Target language code (ISO)
    #[serde(default = "default_target_language")]
    pub target_language: String,

    /// Translation config
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Paragraph chunking
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Block restructuring
    #[serde(default)]
    pub structure: StructureConfig,

    /// Break-candidate marking
    #[serde(default)]
    pub candidates: CandidatesConfig,

    /// Paragraph rhythm pass
    #[serde(default)]
    pub rhythm: RhythmConfig,

    /// Where entities are stored
    #[serde(default)]
    pub entity_store: EntityStoreConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Translation provider type
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TranslationProvider {
    // @provider: OpenAI or any OpenAI-compatible endpoint
    #[default]
    OpenAI,
    // @provider: Ollama
    Ollama,
}

impl TranslationProvider {
    // @returns: Capitalized provider name
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Ollama => "Ollama",
        }
    }

    // @returns: Lowercase provider identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::OpenAI => "openai".to_string(),
            Self::Ollama => "ollama".to_string(),
        }
    }
}

impl std::fmt::Display for TranslationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

impl std::str::FromStr for TranslationProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider configuration wrapper
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider type identifier
    #[serde(rename = "type")]
    pub provider_type: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: API key
    #[serde(default = "String::new")]
    pub api_key: String,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub endpoint: String,

    // @field: Max concurrent requests
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    // @field: Rate limit (requests per minute)
    #[serde(default)]
    pub rate_limit: Option<u32>,
}

impl ProviderConfig {
    // @param provider_type: Provider enum
    // @returns: Provider config with defaults
    pub fn new(provider_type: TranslationProvider) -> Self {
        match provider_type {
            TranslationProvider::OpenAI => Self {
                provider_type: "openai".to_string(),
                model: default_openai_model(),
                api_key: String::new(),
                endpoint: default_openai_endpoint(),
                concurrent_requests: default_concurrent_requests(),
                timeout_secs: default_timeout_secs(),
                rate_limit: default_openai_rate_limit(),
            },
            TranslationProvider::Ollama => Self {
                provider_type: "ollama".to_string(),
                model: default_ollama_model(),
                api_key: String::new(),
                endpoint: default_ollama_endpoint(),
                concurrent_requests: default_concurrent_requests(),
                timeout_secs: default_ollama_timeout_secs(),
                rate_limit: None,
            },
        }
    }
}

/// Translation service configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    /// Translation provider to use
    #[serde(default)]
    pub provider: TranslationProvider,

    /// Available translation providers
    #[serde(default)]
    pub available_providers: Vec<ProviderConfig>,

    /// Common translation settings
    #[serde(default)]
    pub common: TranslationCommonConfig,
}

/// Common translation settings applicable to all providers
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationCommonConfig {
    /// Retry count for failed requests
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,

    /// Backoff multiplier for retries (in milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Token style for placeholders: random ids, or sequential ones for
    /// reproducible runs
    #[serde(default)]
    pub sequential_placeholders: bool,
}

impl Default for TranslationCommonConfig {
    fn default() -> Self {
        Self {
            retry_count: default_retry_count(),
            retry_backoff_ms: default_retry_backoff_ms(),
            sequential_placeholders: false,
        }
    }
}

/// Paragraph chunking thresholds
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Paragraphs longer than this many characters are chunked
    #[serde(default = "default_max_paragraph_chars")]
    pub max_paragraph_chars: usize,

    /// Coarse chunk size for entity detection
    #[serde(default = "default_entity_chunk_chars")]
    pub entity_chunk_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_paragraph_chars: default_max_paragraph_chars(),
            entity_chunk_chars: default_entity_chunk_chars(),
        }
    }
}

/// Block restructuring
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StructureConfig {
    /// Narration at or under this many characters stays standalone
    #[serde(default = "default_short_line_max")]
    pub short_line_max: usize,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self { short_line_max: default_short_line_max() }
    }
}

/// Break-candidate thresholds
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CandidatesConfig {
    /// Sentences shorter than this many characters are break candidates
    #[serde(default = "default_short_sentence_threshold")]
    pub short_sentence_threshold: usize,
}

impl Default for CandidatesConfig {
    fn default() -> Self {
        Self { short_sentence_threshold: default_short_sentence_threshold() }
    }
}

/// Paragraph rhythm pass
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RhythmConfig {
    /// Master switch for the external rhythm judgment
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Per-language adjustments keyed by ISO 639-1 code
    #[serde(default)]
    pub overrides: HashMap<String, RhythmOverride>,
}

impl Default for RhythmConfig {
    fn default() -> Self {
        Self { enabled: true, overrides: HashMap::new() }
    }
}

/// Entity store backend
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntityStoreKind {
    /// No store; chapters are translated without entities
    #[default]
    None,
    /// Storage API over HTTP
    Http,
    /// One JSON file per title
    File,
}

/// Entity store configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EntityStoreConfig {
    #[serde(default)]
    pub kind: EntityStoreKind,

    /// Base URL of the storage API
    #[serde(default = "String::new")]
    pub base_url: String,

    /// Bearer token of the storage API
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Directory of the JSON file store
    #[serde(default = "default_entity_dir")]
    pub dir: String,

    /// Storage API timeout in seconds
    #[serde(default = "default_store_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EntityStoreConfig {
    fn default() -> Self {
        Self {
            kind: EntityStoreKind::default(),
            base_url: String::new(),
            api_key: String::new(),
            dir: default_entity_dir(),
            timeout_secs: default_store_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_source_language() -> String {
    "ko".to_string()
}

fn default_target_language() -> String {
    "en".to_string()
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_ollama_timeout_secs() -> u64 {
    120
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    1000 // 1 second base backoff time, doubled on each retry
}

fn default_max_paragraph_chars() -> usize {
    DEFAULT_MAX_PARAGRAPH_CHARS
}

fn default_entity_chunk_chars() -> usize {
    DEFAULT_COARSE_CHUNK_CHARS
}

fn default_short_line_max() -> usize {
    DEFAULT_SHORT_LINE_MAX
}

fn default_short_sentence_threshold() -> usize {
    DEFAULT_SHORT_SENTENCE_THRESHOLD
}

fn default_entity_dir() -> String {
    "entities".to_string()
}

fn default_store_timeout_secs() -> u64 {
    crate::entities::http::DEFAULT_STORE_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

fn default_ollama_endpoint() -> String {
    "http://localhost:11434".to_string()
}

fn default_openai_endpoint() -> String {
    crate::providers::openai::DEFAULT_OPENAI_ENDPOINT.to_string()
}

fn default_ollama_model() -> String {
    "qwen2.5:14b".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_openai_rate_limit() -> Option<u32> {
    Some(60) // 60 requests per minute by default
}

impl Config {
    /// Load a configuration file, or write the defaults there when it does
    /// not exist yet
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<(Self, bool)> {
        let path = path.as_ref();

        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to open config file: {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            return Ok((config, false));
        }

        let config = Config::default();
        config.save(path)?;
        Ok((config, true))
    }

    /// Write the configuration as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self)
            .context("Failed to serialize config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write config to file: {}", path.display()))?;
        Ok(())
    }

    /// Apply `OPENAI_API_KEY`, `STORAGE_BASE_URL` and `STORAGE_API_KEY`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(api_key) = lookup("OPENAI_API_KEY") {
            if let Some(openai) = self.translation.provider_config_mut(&TranslationProvider::OpenAI) {
                openai.api_key = api_key;
            }
        }

        if let Some(base_url) = lookup("STORAGE_BASE_URL") {
            self.entity_store.base_url = base_url;
            if self.entity_store.kind == EntityStoreKind::None {
                self.entity_store.kind = EntityStoreKind::Http;
            }
        }

        if let Some(api_key) = lookup("STORAGE_API_KEY") {
            self.entity_store.api_key = api_key;
        }
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        validate_language_code(&self.source_language)
            .with_context(|| format!("Invalid source language: {}", self.source_language))?;
        validate_language_code(&self.target_language)
            .with_context(|| format!("Invalid target language: {}", self.target_language))?;

        if self.translation.provider == TranslationProvider::OpenAI && self.translation.get_api_key().is_empty() {
            return Err(anyhow!("Translation API key is required for OpenAI provider"));
        }

        if self.translation.optimal_concurrent_requests() == 0 {
            return Err(anyhow!("concurrent_requests must be at least 1"));
        }

        if self.chunking.max_paragraph_chars == 0 || self.chunking.entity_chunk_chars == 0 {
            return Err(anyhow!("Chunk sizes must be greater than zero"));
        }

        for language in self.rhythm.overrides.keys() {
            validate_language_code(language)
                .with_context(|| format!("Invalid rhythm override language: {}", language))?;
        }

        if self.entity_store.kind == EntityStoreKind::Http {
            if self.entity_store.base_url.trim().is_empty() {
                return Err(anyhow!("entity_store.base_url is required for the http entity store"));
            }
            Url::parse(&self.entity_store.base_url)
                .with_context(|| format!("Invalid entity store URL: {}", self.entity_store.base_url))?;
        }

        Ok(())
    }

    /// Retry behaviour of the active provider
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.translation.common.retry_count,
            backoff_base_ms: self.translation.common.retry_backoff_ms,
            rate_limit: self.translation.get_rate_limit(),
        }
    }

    /// Pipeline tunables
    pub fn translator_settings(&self) -> TranslatorSettings {
        TranslatorSettings {
            max_paragraph_chars: self.chunking.max_paragraph_chars,
            entity_chunk_chars: self.chunking.entity_chunk_chars,
            short_line_max: self.structure.short_line_max,
            concurrent_requests: self.translation.optimal_concurrent_requests(),
            candidates: CandidateConfig {
                short_sentence_threshold: self.candidates.short_sentence_threshold,
                ..CandidateConfig::default()
            },
            rhythm_enabled: self.rhythm.enabled,
            rhythm_overrides: self.rhythm.overrides.clone(),
            token_style: if self.translation.common.sequential_placeholders {
                crate::translation::placeholder::TokenStyle::Sequential
            } else {
                crate::translation::placeholder::TokenStyle::Random
            },
        }
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            source_language: default_source_language(),
            target_language: default_target_language(),
            translation: TranslationConfig::default(),
            chunking: ChunkingConfig::default(),
            structure: StructureConfig::default(),
            candidates: CandidatesConfig::default(),
            rhythm: RhythmConfig::default(),
            entity_store: EntityStoreConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl TranslationConfig {
    pub fn optimal_concurrent_requests(&self) -> usize {
        if let Some(provider_config) = self.get_active_provider_config() {
            return provider_config.concurrent_requests;
        }

        default_concurrent_requests()
    }

    /// Get the active provider configuration from the available_providers array
    pub fn get_active_provider_config(&self) -> Option<&ProviderConfig> {
        self.get_provider_config(&self.provider)
    }

    /// Get a specific provider configuration by type
    pub fn get_provider_config(&self, provider_type: &TranslationProvider) -> Option<&ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        self.available_providers.iter().find(|p| p.provider_type == provider_str)
    }

    /// Mutable provider configuration, added with defaults when missing
    pub fn provider_config_mut(&mut self, provider_type: &TranslationProvider) -> Option<&mut ProviderConfig> {
        let provider_str = provider_type.to_lowercase_string();
        if !self.available_providers.iter().any(|p| p.provider_type == provider_str) {
            self.available_providers.push(ProviderConfig::new(provider_type.clone()));
        }
        self.available_providers.iter_mut().find(|p| p.provider_type == provider_str)
    }

    /// Get the model for the active provider
    pub fn get_model(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.model.is_empty() {
                return provider_config.model.clone();
            }
        }

        match self.provider {
            TranslationProvider::OpenAI => default_openai_model(),
            TranslationProvider::Ollama => default_ollama_model(),
        }
    }

    /// Get the API key for the active provider
    pub fn get_api_key(&self) -> String {
        self.get_active_provider_config()
            .map(|p| p.api_key.clone())
            .unwrap_or_default()
    }

    /// Get the endpoint for the active provider
    pub fn get_endpoint(&self) -> String {
        if let Some(provider_config) = self.get_active_provider_config() {
            if !provider_config.endpoint.is_empty() {
                return provider_config.endpoint.clone();
            }
        }

        match self.provider {
            TranslationProvider::OpenAI => default_openai_endpoint(),
            TranslationProvider::Ollama => default_ollama_endpoint(),
        }
    }

    /// Get the timeout for the active provider
    pub fn get_timeout_secs(&self) -> u64 {
        match self.get_active_provider_config() {
            Some(provider_config) => provider_config.timeout_secs,
            None => match self.provider {
                TranslationProvider::OpenAI => default_timeout_secs(),
                TranslationProvider::Ollama => default_ollama_timeout_secs(),
            },
        }
    }

    /// Get the rate limit for the active provider
    pub fn get_rate_limit(&self) -> Option<u32> {
        if let Some(provider_config) = self.get_active_provider_config() {
            return provider_config.rate_limit;
        }

        match self.provider {
            TranslationProvider::OpenAI => default_openai_rate_limit(),
            TranslationProvider::Ollama => None,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            provider: TranslationProvider::default(),
            available_providers: vec![
                ProviderConfig::new(TranslationProvider::OpenAI),
                ProviderConfig::new(TranslationProvider::Ollama),
            ],
            common: TranslationCommonConfig::default(),
        }
    }
}
