// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::path::{Path, PathBuf};

use novelwai::app_config::{self, Config, TranslationProvider};
use novelwai::app_controller::Controller;
use novelwai::file_utils::FileManager;

/// CLI Wrapper for TranslationProvider to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTranslationProvider {
    OpenAI,
    Ollama,
}

impl From<CliTranslationProvider> for TranslationProvider {
    fn from(cli_provider: CliTranslationProvider) -> Self {
        match cli_provider {
            CliTranslationProvider::OpenAI => TranslationProvider::OpenAI,
            CliTranslationProvider::Ollama => TranslationProvider::Ollama,
        }
    }
}

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// Options shared by every command that loads the configuration
#[derive(Args, Debug)]
struct CommonArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliTranslationProvider>,

    /// Model name to use
    #[arg(short, long)]
    model: Option<String>,

    /// Source language code (e.g., 'ko', 'ja', 'zh')
    #[arg(short, long)]
    source_language: Option<String>,
}

#[derive(Parser, Debug)]
struct TranslateArgs {
    /// Chapter file or directory of `.txt` chapters
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Novel title; scopes the entity set
    #[arg(long)]
    title: String,

    /// Target language code (e.g., 'en', 'ja', 'de')
    #[arg(short, long)]
    target_language: Option<String>,

    /// Output directory (defaults to the chapter's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser, Debug)]
struct DetectArgs {
    /// Chapter file or directory of `.txt` chapters
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Novel title; scopes the entity set
    #[arg(long)]
    title: String,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser, Debug)]
struct CandidatesArgs {
    /// Translated text file to inspect
    #[arg(value_name = "INPUT_FILE")]
    input_file: PathBuf,

    /// Sentences shorter than this are candidates
    #[arg(long)]
    short_sentence_threshold: Option<usize>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate chapters
    Translate(TranslateArgs),

    /// Detect proper-noun candidates and register new ones with the entity store
    Detect(DetectArgs),

    /// Show break candidates and the paragraph pressure report of a text
    Candidates(CandidatesArgs),

    /// Generate shell completions for novelwai
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// NovelwAI - web novel translation with AI
///
/// Translates web-novel chapters through translate, edit and polish stages
/// while keeping locked character names consistent.
#[derive(Parser, Debug)]
#[command(name = "novelwai")]
#[command(version)]
#[command(about = "AI-powered web novel translation tool")]
#[command(long_about = "NovelwAI translates web-novel chapters with AI providers, keeping proper nouns and paragraphs intact.

EXAMPLES:
    novelwai translate ch001.txt --title my-novel            # Korean to English using conf.json
    novelwai translate chapters/ --title my-novel -t ja -f    # Whole directory to Japanese, overwrite outputs
    novelwai translate ch001.txt --title my-novel -p ollama -m qwen2.5:14b
    novelwai detect chapters/ --title my-novel                # Register new proper nouns
    novelwai candidates ch001.en.txt                          # Inspect break candidates
    novelwai completions bash > novelwai.bash                 # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the file doesn't exist,
    a default one is created. OPENAI_API_KEY, STORAGE_BASE_URL and
    STORAGE_API_KEY override the matching settings.

SUPPORTED PROVIDERS:
    openai - OpenAI or any OpenAI-compatible API (requires API key)
    ollama - Local Ollama server")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color of a level
    fn color_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "\x1B[1;31m",
            Level::Warn => "\x1B[1;33m",
            Level::Info => "\x1B[1;32m",
            Level::Debug => "\x1B[1;36m",
            Level::Trace => "\x1B[1;35m",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:<5} {}\x1B[0m",
                Self::color_for_level(record.level()),
                now,
                record.level(),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // The level is lowered or raised once the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "novelwai", &mut std::io::stdout());
            Ok(())
        }
        Commands::Translate(args) => run_translate(args).await,
        Commands::Detect(args) => run_detect(args).await,
        Commands::Candidates(args) => run_candidates(args),
    }
}

/// Load the config, apply env and CLI overrides, set the log level and validate
fn load_config(common: &CommonArgs, target_language: Option<&str>) -> Result<Config> {
    if let Some(cmd_log_level) = &common.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let (mut config, created) = Config::load_or_create(&common.config_path)?;
    if created {
        warn!("Config file not found at '{}', created default config.", common.config_path);
    }

    config.apply_env_overrides();

    if let Some(provider) = &common.provider {
        config.translation.provider = provider.clone().into();
    }

    if let Some(model) = &common.model {
        let provider = config.translation.provider.clone();
        if let Some(provider_config) = config.translation.provider_config_mut(&provider) {
            provider_config.model = model.clone();
        }
    }

    if let Some(source_lang) = &common.source_language {
        config.source_language = source_lang.clone();
    }

    if let Some(target_lang) = target_language {
        config.target_language = target_lang.to_string();
    }

    match &common.log_level {
        Some(log_level) => config.log_level = log_level.clone().into(),
        None => log::set_max_level(config.log_level.to_level_filter()),
    }

    config.validate().context("Configuration validation failed")?;
    Ok(config)
}

async fn run_translate(options: TranslateArgs) -> Result<()> {
    let config = load_config(&options.common, options.target_language.as_deref())?;
    let controller = Controller::with_config(config)?;

    if FileManager::file_exists(&options.input_path) {
        let output_dir = options
            .output_dir
            .clone()
            .or_else(|| options.input_path.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));
        controller
            .run(options.input_path.clone(), output_dir, &options.title, options.force_overwrite)
            .await?;
    } else if FileManager::dir_exists(&options.input_path) {
        let summary = controller
            .run_folder(options.input_path.clone(), options.output_dir.clone(), &options.title, options.force_overwrite)
            .await?;
        if summary.failed > 0 {
            return Err(anyhow!("{} chapter(s) failed", summary.failed));
        }
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", options.input_path));
    }

    Ok(())
}

async fn run_detect(options: DetectArgs) -> Result<()> {
    let config = load_config(&options.common, None)?;
    let controller = Controller::with_config(config)?;

    let report = controller.detect(&options.input_path, &options.title).await?;
    info!("Registered {} entit(ies), {} failed", report.added.len(), report.failed.len());
    for (name, reason) in &report.failed {
        warn!("Could not register '{}': {}", name, reason);
    }

    Ok(())
}

fn run_candidates(options: CandidatesArgs) -> Result<()> {
    let (mut config, _) = Config::load_or_create(&options.config_path)?;
    if let Some(threshold) = options.short_sentence_threshold {
        config.candidates.short_sentence_threshold = threshold;
    }

    let provider = Controller::build_provider(&config);
    let controller = Controller::with_components(config, provider, std::sync::Arc::new(novelwai::entities::NullEntityStore));
    let (marked, report) = controller.inspect_candidates(&options.input_file)?;

    println!("{}", marked);
    println!();
    println!("{}", serde_json::to_string_pretty(&report).context("Failed to serialize pressure report")?);

    Ok(())
}
