#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info};
use std::io::Write;
use std::path::{Path, PathBuf};

use dramaflow::app_config::{self, Config};
use dramaflow::file_utils::{ArtifactPaths, FileManager};
use dramaflow::pipeline::{DramaPipeline, PipelineObserver, PipelineStage};
use dramaflow::script::Script;
use dramaflow::voices::{UserTier, VoiceAssigner};
use dramaflow::language_utils::VoiceLanguage;

/// CLI Wrapper for UserTier to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliTier {
    Free,
    Vip,
}

impl From<CliTier> for UserTier {
    fn from(cli_tier: CliTier) -> Self {
        match cli_tier {
            CliTier::Free => UserTier::Free,
            CliTier::Vip => UserTier::Vip,
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
    /// Render a script into audio, subtitles and timeline files
    Render(RenderArgs),

    /// Show the voice cast for a script without synthesizing
    Cast(CastArgs),

    /// Generate shell completions for dramaflow
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Script file (JSON)
    #[arg(value_name = "SCRIPT")]
    script_path: PathBuf,

    /// Output directory (defaults to the script's directory)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Account tier, overrides the configuration
    #[arg(long, value_enum)]
    tier: Option<CliTier>,

    /// Set logging level
    #[arg(short, long, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Also write WebVTT subtitles
    #[arg(long)]
    vtt: bool,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    force_overwrite: bool,
}

#[derive(Parser, Debug)]
struct CastArgs {
    /// Script file (JSON)
    #[arg(value_name = "SCRIPT")]
    script_path: PathBuf,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json")]
    config_path: String,

    /// Account tier, overrides the configuration
    #[arg(long, value_enum)]
    tier: Option<CliTier>,
}

/// dramaflow - Audio drama assembly
///
/// Turns a narrative script into one voiced audio track with matching subtitles.
#[derive(Parser, Debug)]
#[command(name = "dramaflow")]
#[command(version)]
#[command(about = "Audio drama assembly from narrative scripts")]
#[command(long_about = "dramaflow voices a narrative script with a consistent narrator and per-character voices, \
merges the clips into one track and writes matching subtitles.

EXAMPLES:
    dramaflow render story.json                   # Render using default config
    dramaflow render -f story.json                # Force overwrite existing files
    dramaflow render --tier vip -o out story.json # Premium voices, custom output dir
    dramaflow cast story.json                     # Show who voices whom
    dramaflow completions bash > dramaflow.bash   # Generate bash completions

CONFIGURATION:
    Configuration is stored in conf.json by default. If the config file doesn't
    exist, a default one will be created automatically. API keys may also come
    from ELEVENLABS_API_KEY, OPENAI_API_KEY, AZURE_SPEECH_KEY (+ AZURE_SPEECH_REGION)
    and GOOGLE_API_KEY.")]
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
            Level::Error => "1;31",
            Level::Warn => "1;33",
            Level::Info => "1;32",
            Level::Debug => "1;36",
            Level::Trace => "1;35",
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                Self::get_color_for_level(record.level()),
                now,
                Self::get_emoji_for_level(record.level()),
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

// @struct: Progress bar over clip completions
struct ProgressObserver {
    bar: ProgressBar,
}

impl ProgressObserver {
    fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} clips ({percent}%) {msg}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style.progress_chars("█▓▒░"));
        Self { bar }
    }
}

impl PipelineObserver for ProgressObserver {
    fn on_stage(&self, _run_id: &str, stage: PipelineStage) {
        match stage {
            PipelineStage::Done => self.bar.finish_with_message("done"),
            PipelineStage::Aborted => self.bar.abandon_with_message("aborted"),
            other => self.bar.set_message(other.to_string()),
        }
    }

    fn on_clip(&self, completed: usize, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(completed as u64);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Info by default; raised or lowered once the config is known
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = CommandLineOptions::command();
            generate(shell, &mut cmd, "dramaflow", &mut std::io::stdout());
            Ok(())
        }
        Commands::Render(args) => run_render(args).await,
        Commands::Cast(args) => run_cast(args),
    }
}

fn read_script(path: &Path) -> Result<Script> {
    let json = FileManager::read_to_string(path)?;
    Script::from_json(&json).with_context(|| format!("Invalid script: {:?}", path))
}

async fn run_render(options: RenderArgs) -> Result<()> {
    if let Some(level) = &options.log_level {
        let level: app_config::LogLevel = level.clone().into();
        log::set_max_level(level.level_filter());
    }

    let mut config = Config::load_or_create(&options.config_path)?;
    if let Some(tier) = &options.tier {
        config.tier = tier.clone().into();
    }
    if let Some(level) = &options.log_level {
        config.log_level = level.clone().into();
    }
    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.level_filter());

    let script = read_script(&options.script_path)?;

    let output_dir = options
        .output_dir
        .clone()
        .or_else(|| options.script_path.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));
    let stem = FileManager::output_stem(&options.script_path);
    let paths = ArtifactPaths::new(&output_dir, &stem, options.vtt);

    // Check before spending any synthesis calls
    if !options.force_overwrite {
        if let Some(existing) = paths.all().into_iter().find(|p| p.exists()) {
            return Err(anyhow::anyhow!("Output file already exists: {:?}. Use -f to force overwrite.", existing));
        }
    }

    info!("🚀 dramaflow: {} segment(s), {} tier", script.len(), config.tier);
    let pipeline = DramaPipeline::from_config(&config)?;
    let observer = ProgressObserver::new(script.len());

    // The pipeline has already logged the failure report
    let artifacts = pipeline.run_with_observer(script, &observer).await?;

    let artifacts = FileManager::save_artifacts(artifacts, paths, options.force_overwrite).await?;
    info!(
        "Rendered {} ms of audio with {} voice(s)",
        artifacts.duration_ms(),
        artifacts.cast.len()
    );
    Ok(())
}

fn run_cast(options: CastArgs) -> Result<()> {
    let mut config = if Path::new(&options.config_path).exists() {
        Config::from_file(&options.config_path)?
    } else {
        Config::default()
    };
    if let Some(tier) = &options.tier {
        config.tier = tier.clone().into();
    }

    let mut script = read_script(&options.script_path)?;
    let assigner = VoiceAssigner::new(config.tier)
        .with_default_language(VoiceLanguage::from_code(&config.default_language)?)
        .with_language_policy(config.language_policy);
    let decision = assigner.assign(&mut script);

    println!("Language: {} ({} tier)", decision.language.name(), config.tier);
    for member in VoiceAssigner::cast_sheet(&script) {
        println!("{:<20} {:<8} {}", member.character, format!("{:?}", member.gender), member.voice);
    }
    Ok(())
}
