// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Result, anyhow, Context};
use log::{error, warn, info, LevelFilter, Log, Metadata, Record, Level, SetLoggerError};
use std::path::{Path, PathBuf};
use std::io::Write;
use clap::{Parser, ValueEnum, CommandFactory, Subcommand, Args};
use clap_complete::{generate, Shell};

use resub::app_config::{self, Config};
use resub::app_controller::Controller;

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

/// Options shared by every command, they override the configuration file
#[derive(Args, Debug, Clone)]
struct CommonArgs {
    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: PathBuf,

    /// Comma separated API keys, tried in order when a quota is hit
    #[arg(long, env = "RESUB_API_KEYS", hide_env_values = true, global = true)]
    api_keys: Option<String>,

    /// Target language, ISO code (e.g. 'fr', 'pt') or name (e.g. 'Portuguese (Brazil)')
    #[arg(short, long, global = true)]
    target_language: Option<String>,

    /// Model name to use for translation
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Token ceiling of one request
    #[arg(long, global = true)]
    chunk_tokens: Option<usize>,

    /// Extra context for the model, replaces the hint derived from the file name
    #[arg(long, global = true)]
    context: Option<String>,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

#[derive(Args, Debug)]
struct TranslateArgs {
    /// Input SRT file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: PathBuf,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Print progress events as JSON lines instead of a progress bar
    #[arg(long)]
    json_events: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Translate subtitles (default command)
    Translate(TranslateArgs),

    /// Show how a file would be split into requests, without sending any
    Plan {
        /// Input SRT file
        #[arg(value_name = "INPUT_FILE")]
        input_file: PathBuf,
    },

    /// Check every configured API key with a minimal request
    ValidateKeys,

    /// Generate shell completions for resub
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// resub - subtitle translation with Gemini
#[derive(Parser, Debug)]
#[command(name = "resub")]
#[command(version)]
#[command(about = "AI-powered SRT subtitle translation tool")]
#[command(long_about = "resub translates SRT subtitle files with the Gemini API, batching subtitles into
token-bounded requests and rotating through several API keys when quotas are hit.

EXAMPLES:
    resub movie.srt                                # Translate using default config
    resub -f movie.srt                             # Force overwrite existing files
    resub -t fr -m gemini-2.5-pro movie.srt        # Translate to French with another model
    resub --api-keys KEY1,KEY2 /subtitles/         # Process a whole directory with two keys
    resub --json-events movie.srt                  # Machine readable progress on stdout
    resub plan movie.srt                           # Show the request breakdown
    resub validate-keys                            # Check the configured keys
    resub completions bash > resub.bash            # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically. API keys can also come from RESUB_API_KEYS.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    common: CommonArgs,

    /// Input SRT file or directory to process
    #[arg(value_name = "INPUT_PATH")]
    input_path: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,

    /// Print progress events as JSON lines instead of a progress bar
    #[arg(long)]
    json_events: bool,
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

    // @returns: Emoji for log level
    fn get_emoji_for_level(level: Level) -> &'static str {
        match level {
            Level::Error => "❌ ",
            Level::Warn => "🚧 ",
            Level::Info => " ",
            Level::Debug => "🔍 ",
            Level::Trace => "📋 ",
        }
    }

    // @returns: ANSI color for log level
    fn get_color_for_level(level: Level) -> &'static str {
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
            let level = record.level();

            let mut stderr = std::io::stderr();
            let _ = writeln!(
                stderr,
                "{}{} {} {}\x1B[0m",
                Self::get_color_for_level(level),
                now,
                Self::get_emoji_for_level(level),
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
    // The logger accepts everything; the effective level is set below
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "resub", &mut std::io::stdout());
            Ok(())
        }
        Some(Commands::Translate(args)) => run_translate(&cli.common, args).await,
        Some(Commands::Plan { input_file }) => run_plan(&cli.common, &input_file),
        Some(Commands::ValidateKeys) => run_validate_keys(&cli.common).await,
        None => {
            let input_path = cli.input_path.ok_or_else(|| {
                anyhow!("INPUT_PATH is required when no subcommand is specified")
            })?;

            let args = TranslateArgs {
                input_path,
                force_overwrite: cli.force_overwrite,
                json_events: cli.json_events,
            };
            run_translate(&cli.common, args).await
        }
    }
}

/// Load the configuration file, apply command line overrides, validate
fn load_config(options: &CommonArgs) -> Result<Config> {
    if let Some(cmd_log_level) = &options.log_level {
        let level: app_config::LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(&options.config_path)?;

    if let Some(api_keys) = &options.api_keys {
        config.translation.api_keys = api_keys.clone();
    }
    if let Some(target_language) = &options.target_language {
        config.target_language = target_language.clone();
    }
    if let Some(model) = &options.model {
        config.translation.provider.model = model.clone();
    }
    if let Some(chunk_tokens) = options.chunk_tokens {
        config.translation.max_tokens_per_chunk = chunk_tokens;
    }
    if let Some(context) = &options.context {
        config.translation.context = Some(context.clone());
    }
    if let Some(log_level) = &options.log_level {
        config.log_level = log_level.clone().into();
    }

    config.validate()
        .context("Configuration validation failed")?;

    if options.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    Ok(config)
}

async fn run_translate(common: &CommonArgs, options: TranslateArgs) -> Result<()> {
    let config = load_config(common)?;
    let controller = Controller::with_config(config)?
        .with_json_events(options.json_events);

    if options.input_path.is_file() {
        let output_dir = options.input_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        controller.run(options.input_path.clone(), output_dir, options.force_overwrite).await?;
    } else if options.input_path.is_dir() {
        let summary = controller.run_folder(options.input_path.clone(), options.force_overwrite).await?;
        if summary.errors > 0 {
            return Err(anyhow!("{} file(s) failed to translate", summary.errors));
        }
    } else {
        return Err(anyhow!("Input path does not exist: {:?}", options.input_path));
    }

    Ok(())
}

fn run_plan(common: &CommonArgs, input_file: &Path) -> Result<()> {
    let config = load_config(common)?;
    let ceiling = config.translation.max_tokens_per_chunk;
    let controller = Controller::with_config(config)?;

    let plan = controller.plan(input_file)?;
    let segments: usize = plan.iter().map(|p| p.segment_count).sum();
    info!("{} subtitles in {} chunks (ceiling {} tokens)", segments, plan.len(), ceiling);
    for chunk in &plan {
        println!("{}", chunk);
        if chunk.tokens > ceiling {
            warn!("Chunk {} holds a single subtitle above the ceiling", chunk.number);
        }
    }

    Ok(())
}

async fn run_validate_keys(common: &CommonArgs) -> Result<()> {
    let config = load_config(common)?;
    let controller = Controller::with_config(config)?;

    let reports = controller.validate_keys().await?;
    for report in &reports {
        match &report.error {
            None => println!("#{} {}: valid", report.index, report.masked),
            Some(message) => println!("#{} {}: invalid ({})", report.index, report.masked, message),
        }
    }

    let valid = reports.iter().filter(|r| r.is_valid()).count();
    if valid == 0 {
        error!("None of the {} key(s) was accepted", reports.len());
        return Err(anyhow!("No valid API key"));
    }
    info!("{}/{} key(s) accepted", valid, reports.len());

    Ok(())
}
