// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]
#![cfg_attr(test, allow(non_snake_case))]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use content_translate::app_config::{self, Config, ProviderKind};
use content_translate::app_controller::{Controller, RunTarget};
use content_translate::jobs::SubmitJobParams;
use content_translate::translation::{TextFormat, TranslatableField};

/// CLI Wrapper for ProviderKind to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliProvider {
    #[value(name = "openai")]
    OpenAI,
    Dummy,
}

impl From<CliProvider> for ProviderKind {
    fn from(cli_provider: CliProvider) -> Self {
        match cli_provider {
            CliProvider::OpenAI => ProviderKind::OpenAI,
            CliProvider::Dummy => ProviderKind::Dummy,
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

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate the records of a content export
    Run(RunArgs),

    /// Show jobs, or the per-locale report of a content export
    Report(ReportArgs),

    /// Generate shell completions for content-translate
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Content export file, updated in place
    #[arg(value_name = "CONTENT_FILE")]
    content_file: PathBuf,

    /// Content type uid (e.g., 'api::article.article')
    #[arg(short = 'c', long, required_unless_present = "resume")]
    content_type: Option<String>,

    /// Source locale code (e.g., 'en', 'fr-CA')
    #[arg(short, long, required_unless_present = "resume")]
    source_locale: Option<String>,

    /// Target locale code
    #[arg(short, long, required_unless_present = "resume")]
    target_locale: Option<String>,

    /// Field to translate, as PATH or PATH:FORMAT (plain, markdown, html)
    #[arg(short, long = "field", value_name = "FIELD", required_unless_present = "resume")]
    fields: Vec<String>,

    /// Priority forwarded to the provider
    #[arg(long, default_value_t = 0)]
    priority: i64,

    /// Resume a paused or interrupted job instead of submitting one
    #[arg(long, value_name = "JOB_ID", conflicts_with_all = ["content_type", "source_locale", "target_locale", "fields"])]
    resume: Option<String>,

    /// Pause the job once this many records are translated
    #[arg(long, value_name = "N")]
    pause_after: Option<u64>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser, Debug)]
struct ReportArgs {
    /// Content export file to report on; lists jobs when omitted
    #[arg(value_name = "CONTENT_FILE")]
    content_file: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Parser, Debug)]
struct CommonArgs {
    /// Translation provider to use
    #[arg(short, long, value_enum)]
    provider: Option<CliProvider>,

    /// Model name to use for translation
    #[arg(short, long)]
    model: Option<String>,

    /// Job database path
    #[arg(long, env = "CONTENT_TRANSLATE_DB")]
    database: Option<PathBuf>,

    /// Configuration file path
    #[arg(long, default_value = "conf.json")]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,
}

/// content-translate - batch translation of structured content
#[derive(Parser, Debug)]
#[command(name = "content-translate")]
#[command(version)]
#[command(about = "Batch translation of structured content records")]
#[command(long_about = "content-translate translates the text fields of content records with resumable batch jobs.

EXAMPLES:
    content-translate run content.json -c api::article.article -s en -t fr -f title -f body:markdown
    content-translate run content.json -c api::article.article -s en -t fr -f title --pause-after 400
    content-translate run content.json --resume 1b4e28ba-2fa1-11d2-883f-0016d3cca427
    content-translate report                      # List jobs
    content-translate report content.json         # Per-locale report
    content-translate completions bash > content-translate.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.

SUPPORTED PROVIDERS:
    openai - OpenAI chat completions API (requires API key)
    dummy  - Returns texts unchanged")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color for log level
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
            let color = Self::color_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {:<5} {}\x1B[0m",
                color,
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
    // Level is lowered or raised once the config is loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "content-translate", &mut std::io::stdout());
            Ok(())
        }
        Commands::Run(args) => run(args).await,
        Commands::Report(args) => report(args).await,
    }
}

/// Parse a `PATH[:FORMAT]` field argument
fn parse_field(arg: &str) -> Result<TranslatableField> {
    match arg.rsplit_once(':') {
        Some((path, format)) if !path.is_empty() => {
            let format: TextFormat = format.parse()?;
            Ok(TranslatableField::new(path, format))
        }
        _ => Ok(TranslatableField::new(arg, TextFormat::Plain)),
    }
}

/// Load or create configuration, then apply CLI overrides
fn load_config(options: &CommonArgs) -> Result<Config> {
    if let Some(level) = &options.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let config_path = Path::new(&options.config_path);
    let mut config = if config_path.exists() {
        Config::load(config_path)?
    } else {
        warn!("Config file not found at '{}', creating default config.", options.config_path);
        let config = Config::default();
        config
            .save(config_path)
            .context("Failed to write default config")?;
        config
    };

    if let Some(provider) = &options.provider {
        config.provider.kind = provider.clone().into();
    }
    if let Some(model) = &options.model {
        config.provider.model = model.clone();
    }
    if let Some(database) = &options.database {
        config.database_path = Some(database.clone());
    }
    if let Some(level) = &options.log_level {
        config.log_level = level.clone().into();
    }

    config.validate().context("Configuration validation failed")?;

    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    Ok(config)
}

async fn run(args: RunArgs) -> Result<()> {
    let config = load_config(&args.common)?;

    if !args.content_file.exists() {
        return Err(anyhow!("Content file does not exist: {:?}", args.content_file));
    }

    let target = match args.resume {
        Some(job_id) => RunTarget::Resume(job_id),
        None => {
            let fields = args
                .fields
                .iter()
                .map(|f| parse_field(f))
                .collect::<Result<Vec<_>>>()?;
            let params = SubmitJobParams::new(
                args.content_type.unwrap_or_default(),
                args.source_locale.unwrap_or_default(),
                args.target_locale.unwrap_or_default(),
                fields,
            )
            .with_priority(args.priority);
            RunTarget::Submit(params)
        }
    };

    info!("Using {} ({})", config.provider.kind.display_name(), config.provider.model);
    let controller = Controller::with_config(config)?;
    controller.run(&args.content_file, target, args.pause_after).await?;

    Ok(())
}

async fn report(args: ReportArgs) -> Result<()> {
    let config = load_config(&args.common)?;
    let controller = Controller::with_config(config)?;

    match args.content_file {
        Some(content_file) => {
            let report = controller.report(&content_file).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        None => {
            let jobs = controller.jobs().await?;
            print!("{}", Controller::format_jobs(&jobs));
            info!("{}", controller.database_stats()?);
        }
    }

    Ok(())
}
