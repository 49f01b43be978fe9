/*!
 * Common test utilities for the novelwai test suite
 */

use anyhow::Result;
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use novelwai::entities::{AddReport, EntitySet, EntityStore};
use novelwai::errors::EntityStoreError;
use novelwai::providers::mock::MockProvider;
use novelwai::translation::{ChapterTranslator, TokenStyle, TranslatorSettings};

/// Route `log` output through the test harness; safe to call from every test
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Short Korean chapter: narration, dialogue, narration
pub const SAMPLE_CHAPTER: &str = "아이라는 창밖을 보았다.\n\n\"레온, 거기 있어?\"\n\n대답은 없었다.";

/// Settings with deterministic tokens and no rhythm pass
pub fn quiet_settings() -> TranslatorSettings {
    TranslatorSettings {
        rhythm_enabled: false,
        token_style: TokenStyle::Sequential,
        ..TranslatorSettings::default()
    }
}

/// Translator over a mock provider and an arbitrary store
pub fn translator_with(provider: MockProvider, store: Arc<dyn EntityStore>, settings: TranslatorSettings) -> ChapterTranslator {
    ChapterTranslator::new(Arc::new(provider), store, settings)
}

/// Store whose backend is always down
#[derive(Debug, Default)]
pub struct UnavailableEntityStore;

#[async_trait]
impl EntityStore for UnavailableEntityStore {
    async fn load(&self, _title: &str) -> Result<EntitySet, EntityStoreError> {
        Err(EntityStoreError::Unavailable)
    }

    async fn add(&self, _title: &str, names: &[String]) -> AddReport {
        AddReport::all_failed(names, "storage offline")
    }
}
