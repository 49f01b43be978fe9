use anyhow::{anyhow, Context, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::app_config::{Config, EntityStoreKind, TranslationProvider};
use crate::entities::{AddReport, EntityStore, HttpEntityStore, JsonFileEntityStore, NullEntityStore};
use crate::file_utils::{FileManager, CHAPTER_EXTENSION};
use crate::providers::ollama::Ollama;
use crate::providers::openai::OpenAi;
use crate::providers::Provider;
use crate::rhythm::candidates::{mark_break_candidates_with, pressure_score_with, PressureReport};
use crate::translation::core::{ChapterTranslator, TranslationStats};

// @module: Application controller for chapter processing

/// Default Ollama port when the endpoint does not carry one
const OLLAMA_DEFAULT_PORT: u16 = 11434;

/// Outcome of a directory run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderSummary {
    pub translated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Main application controller for chapter translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Pipeline built from the configuration
    translator: ChapterTranslator,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let provider = Self::build_provider(&config);
        let entity_store = Self::build_entity_store(&config)?;
        Ok(Self::with_components(config, provider, entity_store))
    }

    /// Controller over explicit collaborators
    pub fn with_components(config: Config, provider: Arc<dyn Provider>, entity_store: Arc<dyn EntityStore>) -> Self {
        let translator = ChapterTranslator::new(provider, entity_store, config.translator_settings());
        Self { config, translator }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn translator(&self) -> &ChapterTranslator {
        &self.translator
    }

    /// Generation service of the active provider
    pub fn build_provider(config: &Config) -> Arc<dyn Provider> {
        let translation = &config.translation;
        let retry = config.retry_policy();

        match translation.provider {
            TranslationProvider::OpenAI => Arc::new(OpenAi::new(
                translation.get_api_key(),
                translation.get_endpoint(),
                translation.get_model(),
                translation.get_timeout_secs(),
                retry,
            )),
            TranslationProvider::Ollama => Arc::new(Ollama::new(
                translation.get_endpoint(),
                OLLAMA_DEFAULT_PORT,
                translation.get_model(),
                translation.get_timeout_secs(),
                retry,
            )),
        }
    }

    /// Entity store selected by `entity_store.kind`
    pub fn build_entity_store(config: &Config) -> Result<Arc<dyn EntityStore>> {
        let store_config = &config.entity_store;

        Ok(match store_config.kind {
            EntityStoreKind::None => Arc::new(NullEntityStore),
            EntityStoreKind::File => Arc::new(JsonFileEntityStore::new(&store_config.dir)),
            EntityStoreKind::Http => {
                let api_key = Some(store_config.api_key.clone()).filter(|key| !key.is_empty());
                let store = HttpEntityStore::new(&store_config.base_url, api_key, store_config.timeout_secs)
                    .context("Failed to create entity store client")?;
                Arc::new(store)
            }
        })
    }

    /// Translate one chapter file.
    ///
    /// Returns the written path, or `None` when an existing translation was
    /// kept because `force_overwrite` is off.
    pub async fn run(&self, input_file: PathBuf, output_dir: PathBuf, title: &str, force_overwrite: bool) -> Result<Option<PathBuf>> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(&input_file, &output_dir, title, &multi_progress, force_overwrite).await
    }

    async fn run_with_progress(
        &self,
        input_file: &Path,
        output_dir: &Path,
        title: &str,
        multi_progress: &MultiProgress,
        force_overwrite: bool,
    ) -> Result<Option<PathBuf>> {
        if !FileManager::file_exists(input_file) {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        let output_path = FileManager::generate_output_path(
            input_file,
            output_dir,
            &self.config.target_language,
            CHAPTER_EXTENSION,
        );
        if output_path.exists() && !force_overwrite {
            warn!("Skipping {:?}, translation already exists (use -f to force overwrite)", input_file);
            return Ok(None);
        }

        let text = FileManager::read_chapter(input_file)?;

        let progress_bar = multi_progress.add(ProgressBar::new(0));
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} units ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));
        progress_bar.set_message("Translating");

        info!("NovelwAI: {} - {}", self.config.translation.provider.display_name(), self.config.translation.get_model());

        let pb = progress_bar.clone();
        let result = self
            .translator
            .translate_chapter_with_progress(
                title,
                &text,
                &self.config.source_language,
                &self.config.target_language,
                move |completed, total| {
                    pb.set_length(total as u64);
                    pb.set_position(completed as u64);
                },
            )
            .await
            .with_context(|| format!("Failed to translate {:?}", input_file))?;

        // Only the folder bar stays visible between chapters
        progress_bar.finish_and_clear();

        FileManager::write_to_file(&output_path, &result.text)?;
        Self::log_stats(&output_path, &result.stats);

        Ok(Some(output_path))
    }

    /// Translate every chapter of a directory; one failing chapter does not stop the rest
    pub async fn run_folder(&self, input_dir: PathBuf, output_dir: Option<PathBuf>, title: &str, force_overwrite: bool) -> Result<FolderSummary> {
        let start_time = std::time::Instant::now();

        if !FileManager::dir_exists(&input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let chapters = FileManager::find_chapters(&input_dir)?;
        if chapters.is_empty() {
            return Err(anyhow!("No chapter files found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(chapters.len() as u64));
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chapters ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        folder_pb.set_style(template_result.progress_chars("█▓▒░"));

        let mut summary = FolderSummary::default();

        for chapter in &chapters {
            let file_name = chapter
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            let chapter_output_dir = match (&output_dir, chapter.parent()) {
                (Some(dir), _) => dir.clone(),
                (None, Some(parent)) => parent.to_path_buf(),
                (None, None) => input_dir.clone(),
            };

            match self.run_with_progress(chapter, &chapter_output_dir, title, &multi_progress, force_overwrite).await {
                Ok(Some(_)) => summary.translated += 1,
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    error!("Error processing file {}: {:#}", file_name, e);
                    summary.failed += 1;
                }
            }

            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");

        info!(
            "Folder processing completed in {}: {} translated, {} skipped, {} errors",
            Self::format_duration(start_time.elapsed()),
            summary.translated,
            summary.skipped,
            summary.failed
        );

        Ok(summary)
    }

    /// Detect entity candidates in a chapter file or directory and register new ones
    pub async fn detect(&self, input_path: &Path, title: &str) -> Result<AddReport> {
        let files = if FileManager::dir_exists(input_path) {
            FileManager::find_chapters(input_path)?
        } else if FileManager::file_exists(input_path) {
            vec![input_path.to_path_buf()]
        } else {
            return Err(anyhow!("Input path does not exist: {:?}", input_path));
        };

        let mut report = AddReport::default();
        for file in files {
            let text = FileManager::read_chapter(&file)?;
            let chapter_report = self
                .translator
                .register_new_entities(title, &text, &self.config.source_language)
                .await
                .with_context(|| format!("Entity detection failed for {:?}", file))?;
            info!("{:?}: {} new entit(ies)", file, chapter_report.added.len());
            report.added.extend(chapter_report.added);
            report.failed.extend(chapter_report.failed);
        }

        Ok(report)
    }

    /// Marked text and pressure report of a file, without calling any service
    pub fn inspect_candidates(&self, input_file: &Path) -> Result<(String, PressureReport)> {
        let text = FileManager::read_chapter(input_file)?;
        let candidate_config = self.translator.settings().candidates.clone();
        let marked = mark_break_candidates_with(&text, &candidate_config);
        Ok((marked.text, pressure_score_with(&text, &candidate_config)))
    }

    fn log_stats(output_path: &Path, stats: &TranslationStats) {
        info!(
            "Success: {:?} ({} -> {} paragraph(s), {} placeholder(s), {} fallback(s), {})",
            output_path,
            stats.paragraphs,
            stats.output_paragraphs,
            stats.placeholders_applied,
            stats.stage_fallbacks,
            Self::format_duration(stats.elapsed)
        );
        info!("{}", stats.token_usage.summary());
    }

    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
