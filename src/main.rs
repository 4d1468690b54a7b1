// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{anyhow, bail, Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use log::{info, warn, Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use regex::Regex;
use stsync::app_config::{self, Config, DEFAULT_CONFIG_PATH};
use stsync::captions::CaptionExtractor;
use stsync::compute::{SubtitleOperationsForFile, SubtitleOperationsForRepository, extract_file_identity};
use stsync::file_utils::FileManager;
use stsync::fix::AddInitialPersistentSubtitleIds;
use stsync::split::SubtitleSplitter;
use stsync::subtitle::{IdInventory, OperationsForRepository, PersistentIdAllocator, SubtitleMarkerCsv};
use stsync::sync::SubtitleSync;
use stsync::vcs::{CachedVersionControl, GitCli};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, Copy, ValueEnum)]
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
    /// Compute subtitle operations between two revisions of a repository
    ComputeOps {
        /// Repository directory
        #[arg(value_name = "REPO_DIR")]
        repo_dir: PathBuf,

        /// Revision to start from
        #[arg(long)]
        from: String,

        /// Revision to go to
        #[arg(long)]
        to: String,

        /// Where to write the operations JSON
        #[arg(short, long, default_value = "subtitle_operations.json")]
        output: PathBuf,

        /// Minimum classification confidence (overrides the config)
        #[arg(long)]
        threshold: Option<f64>,

        /// Name operations by the persistent ids found in the current marker files
        #[arg(long)]
        with_marker_ids: bool,
    },

    /// Update marker files from computed operations
    Sync {
        /// Repository directory
        #[arg(value_name = "REPO_DIR")]
        repo_dir: PathBuf,

        /// Operations JSON written by compute-ops
        #[arg(short, long)]
        operations: PathBuf,
    },

    /// Add subtitle marks to a foreign text based on its primary text
    Split {
        /// Primary text with subtitle marks
        #[arg(value_name = "PRIMARY_FILE")]
        primary: PathBuf,

        /// Foreign text to add marks to
        #[arg(value_name = "FOREIGN_FILE")]
        foreign: PathBuf,

        /// Output file, defaults to replacing the foreign file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Remove marks already in the foreign text first
        #[arg(long)]
        remove_existing_marks: bool,
    },

    /// Give persistent ids to a marker file that only has timings
    InitIds {
        /// Content file whose marker file gets ids
        #[arg(value_name = "CONTENT_FILE")]
        content_file: PathBuf,
    },

    /// Allocate persistent ids and print them
    Allocate {
        /// Number of ids
        #[arg(value_name = "COUNT")]
        count: usize,
    },

    /// Generate shell completions for stsync
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// stsync - subtitle synchronization and alignment
///
/// Keeps subtitle marker records in step with changing documents and
/// transfers subtitle marks to translations.
#[derive(Parser, Debug)]
#[command(name = "stsync")]
#[command(version)]
#[command(about = "Subtitle synchronization and alignment")]
#[command(long_about = "stsync keeps subtitle marker records in step with documents that change between revisions.

EXAMPLES:
    stsync compute-ops repo --from v1 --to v2           # Compute operations between two revisions
    stsync sync repo -o subtitle_operations.json        # Update marker files
    stsync split english.at french.at                  # Add subtitle marks to a translation
    stsync init-ids content/eng/eng57-0212.at          # Assign initial persistent ids
    stsync allocate 10                                 # Allocate 10 persistent ids
    stsync completions bash > stsync.bash              # Generate bash completions

CONFIGURATION:
    Configuration is stored in stsync.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,

    /// Persistent id inventory file (overrides the config)
    #[arg(long, global = true)]
    inventory: Option<PathBuf>,
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
        log::set_boxed_logger(Box::new(CustomLogger::new(LevelFilter::Trace)))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and label for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("\x1B[1;31m", "ERROR"),
            Level::Warn => ("\x1B[1;33m", "WARN "),
            Level::Info => ("\x1B[1;32m", "INFO "),
            Level::Debug => ("\x1B[1;36m", "DEBUG"),
            Level::Trace => ("\x1B[1;35m", "TRACE"),
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
            let (color, label) = Self::style_for_level(record.level());
            let _ = writeln!(std::io::stderr(), "{}{} {} {}\x1B[0m", color, now, label, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "stsync", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;

    match cli.command {
        Commands::ComputeOps {
            repo_dir,
            from,
            to,
            output,
            threshold,
            with_marker_ids,
        } => {
            let mut config = config;
            if let Some(threshold) = threshold {
                config.operations.confidence_threshold = threshold;
                config.validate().context("Configuration validation failed")?;
            }
            run_compute_ops(&config, &repo_dir, &from, &to, &output, with_marker_ids).await
        }
        Commands::Sync { repo_dir, operations } => run_sync(&config, &repo_dir, &operations),
        Commands::Split {
            primary,
            foreign,
            output,
            remove_existing_marks,
        } => run_split(&config, &primary, &foreign, output.as_deref(), remove_existing_marks),
        Commands::InitIds { content_file } => run_init_ids(&config, &content_file),
        Commands::Allocate { count } => run_allocate(&config, count),
        Commands::Completions { .. } => Ok(()),
    }
}

/// Load or create the configuration and apply command line overrides
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    // If log level is set via command line, apply it immediately
    if let Some(level) = cli.log_level {
        let level: app_config::LogLevel = level.into();
        log::set_max_level(level.into());
    }

    let mut config = Config::load_or_create(&cli.config_path)?;

    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if let Some(inventory) = &cli.inventory {
        config.persistent_ids.inventory_path = inventory.clone();
    }

    config.validate().context("Configuration validation failed")?;

    // Just update the max level without reinitializing the logger
    log::set_max_level(config.log_level.into());
    Ok(config)
}

async fn run_compute_ops(
    config: &Config,
    repo_dir: &Path,
    from: &str,
    to: &str,
    output: &Path,
    with_marker_ids: bool,
) -> Result<()> {
    let mut git = GitCli::new(repo_dir);
    if let Some(name) = &config.repository.name {
        git = git.with_name(name.clone());
    }

    let content_pattern = Regex::new(&config.repository.content_file_pattern)?;
    let computer = SubtitleOperationsForFile::new(config.captions.clone(), config.operations);
    let mut runner = SubtitleOperationsForRepository::new(CachedVersionControl::new(git), computer, content_pattern);
    if with_marker_ids {
        runner = runner.with_existing_stids(collect_marker_ids(config, repo_dir)?);
    }

    let result = runner.compute(from, to).await?;
    result.operations.save(output)?;
    info!(
        "Wrote {} operations for {} files to {}",
        result.operations.operations_count(),
        result.operations.operations_for_files.len(),
        output.display()
    );

    if !result.is_complete() {
        bail!("{} files failed, see the log for details", result.failures.len());
    }
    Ok(())
}

/// Persistent ids of every marker file in the working tree, keyed by file identity
fn collect_marker_ids(config: &Config, repo_dir: &Path) -> Result<HashMap<String, Vec<String>>> {
    let pattern = Regex::new(&config.repository.content_file_pattern)?;
    let mut ids = HashMap::new();

    for path in FileManager::find_content_files(repo_dir, &pattern)? {
        let Some(identity) = extract_file_identity(&path.to_string_lossy()) else {
            continue;
        };
        let Some(marker_path) = FileManager::sibling_path(&path, &config.repository.marker_file_extension) else {
            continue;
        };
        if !FileManager::file_exists(&marker_path) {
            warn!("No marker file for {}", path.display());
            continue;
        }
        let markers = SubtitleMarkerCsv::load(&marker_path)?;
        if markers.is_legacy() {
            warn!("{} has no persistent ids, using positions", marker_path.display());
            continue;
        }
        ids.insert(identity, markers.persistent_ids());
    }

    Ok(ids)
}

fn run_sync(config: &Config, repo_dir: &Path, operations_path: &Path) -> Result<()> {
    let operations = OperationsForRepository::load(operations_path)?;
    let syncer = SubtitleSync::new(
        CaptionExtractor::new(config.captions.clone()),
        PersistentIdAllocator::new(&config.persistent_ids)?,
        config.repository.clone(),
    )?;

    let mut inventory = IdInventory::open(&config.persistent_ids.inventory_path).with_context(|| {
        format!(
            "Failed to open id inventory: {}",
            config.persistent_ids.inventory_path.display()
        )
    })?;
    let report = syncer.sync_repository(repo_dir, &operations, &mut inventory)?;

    if !report.is_complete() {
        bail!("{} files failed to sync", report.failures.len());
    }
    Ok(())
}

fn run_split(
    config: &Config,
    primary_path: &Path,
    foreign_path: &Path,
    output: Option<&Path>,
    remove_existing_marks: bool,
) -> Result<()> {
    let primary = FileManager::read_to_string(primary_path)?;
    let foreign = FileManager::read_to_string(foreign_path)?;

    let splitter = SubtitleSplitter::new(config.captions.mark, config.alignment)
        .with_remove_existing_marks(remove_existing_marks);
    let result = splitter
        .split(&primary, &foreign)
        .map_err(|e| anyhow!("Failed to split {}: {}", foreign_path.display(), e))?;

    let output = output.unwrap_or(foreign_path);
    FileManager::write_to_file(output, &result.text)?;
    info!(
        "Wrote {} subtitle marks to {} ({} low confidence)",
        result.confidences.len(),
        output.display(),
        result.low_confidence_count(config.alignment.low_confidence_threshold)
    );
    Ok(())
}

fn run_init_ids(config: &Config, content_file: &Path) -> Result<()> {
    let fixer = AddInitialPersistentSubtitleIds::new(
        CaptionExtractor::new(config.captions.clone()),
        PersistentIdAllocator::new(&config.persistent_ids)?,
    );
    let mut inventory = IdInventory::open(&config.persistent_ids.inventory_path)?;
    fixer.run_for_file(content_file, &config.repository.marker_file_extension, &mut inventory)?;
    Ok(())
}

fn run_allocate(config: &Config, count: usize) -> Result<()> {
    let allocator = PersistentIdAllocator::new(&config.persistent_ids)?;
    let mut inventory = IdInventory::open(&config.persistent_ids.inventory_path)?;
    let ids = allocator.allocate(&mut inventory, count)?;

    let mut stdout = std::io::stdout();
    for id in ids {
        writeln!(stdout, "{}", id)?;
    }
    Ok(())
}
