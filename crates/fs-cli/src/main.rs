//! CLI entry point for filesync.
//!
//! Mirrors a source directory into a destination directory, once or
//! continuously.
//!
//! # Usage
//!
//! ```bash
//! filesync [OPTIONS] <COMMAND>
//!
//! # One-shot mirror
//! filesync --source ./site --dest /mnt/backup/site sync
//!
//! # Mirror, then keep mirroring on every change
//! filesync --config filesync.json watch
//!
//! # Show what a sync would touch
//! filesync --source ./site --dest /mnt/backup/site diff --format json
//!
//! # Explain why a path is or is not mirrored
//! filesync --source ./site check-ignore build/app.js docs/index.md
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{WrapErr, bail, eyre};
use fs_core::{Config, FileSystem, LocalFileSystem};
use fs_ignore::PathFilter;
use fs_sync::{DiffSummary, SyncEngine, SyncReport, TreeDiff};
use fs_watcher::{ChangeWatcher, IgnoreFilter, SyncTrigger};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Incremental directory mirror.
///
/// Makes the destination directory an exact copy of the source directory,
/// minus anything excluded by `.fsignore` rules.
#[derive(Parser)]
#[command(name = "filesync", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file.
    ///
    /// Command-line options override values from the file.
    #[arg(short, long, global = true, env = "FILESYNC_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Directory to mirror from.
    #[arg(short, long, global = true, env = "FILESYNC_SOURCE")]
    source: Option<Utf8PathBuf>,

    /// Directory to mirror into.
    #[arg(short, long, global = true, env = "FILESYNC_DEST")]
    dest: Option<Utf8PathBuf>,

    /// Compare file contents instead of length and modification time.
    #[arg(long, global = true)]
    deep: bool,

    /// Keep destination files whose source was removed.
    #[arg(long, global = true)]
    keep_removed: bool,

    /// Number of files synced in parallel.
    #[arg(short, long, global = true, env = "FILESYNC_JOBS")]
    jobs: Option<usize>,

    /// Quiet period before a watched change triggers a sync.
    #[arg(long, global = true, env = "FILESYNC_DEBOUNCE_MS")]
    debounce_ms: Option<u64>,

    /// Extra ignore rule, applied after every `.fsignore` rule (repeatable).
    #[arg(short, long = "ignore", global = true, value_name = "RULE")]
    ignore: Vec<String>,

    /// Also write logs to this file.
    #[arg(long, global = true, env = "FILESYNC_LOG_FILE")]
    log_file: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Mirror the source into the destination once.
    Sync {
        /// Plan the sync without writing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Mirror once, then again after every burst of changes.
    Watch,

    /// Show how the two trees differ.
    Diff {
        /// Output format.
        #[arg(short, long, value_enum, default_value_t = DiffFormat::Text)]
        format: DiffFormat,
    },

    /// Report whether paths are excluded, and by which rule.
    CheckIgnore {
        /// Paths relative to the source root.
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

/// Diff output format.
#[derive(Clone, Copy, ValueEnum)]
enum DiffFormat {
    /// One line per added or removed path.
    Text,
    /// Full diff as JSON.
    Json,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default. Console
/// output goes to stderr so stdout stays machine-readable; `log_file` gets
/// the same events without ANSI colors.
fn init_tracing(verbose: bool, no_color: bool, log_file: Option<&Utf8Path>) -> color_eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},notify=warn,ignore=warn,globset=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .wrap_err_with(|| format!("cannot open log file {path}"))?;
            Some(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(io::stderr),
        )
        .with(file_layer)
        .with(filter)
        .init();
    Ok(())
}

/// Builds a [`Config`] from the optional config file and CLI overrides.
///
/// The result is not validated.
fn build_config(cli: &Cli) -> color_eyre::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path).wrap_err_with(|| format!("cannot load config {path}"))?,
        None => Config::default(),
    };

    if let Some(source) = &cli.source {
        config.source.clone_from(source);
    }
    if let Some(dest) = &cli.dest {
        config.destination.clone_from(dest);
    }
    if let Some(log_file) = &cli.log_file {
        config.log_file = Some(log_file.clone());
    }
    if let Some(jobs) = cli.jobs {
        config.sync.max_concurrency = jobs;
    }
    if let Some(debounce_ms) = cli.debounce_ms {
        config.watch.debounce_ms = debounce_ms;
    }
    config.sync.use_deep_comparer |= cli.deep;
    config.sync.keep_removed_files |= cli.keep_removed;
    config.ignore.patterns.extend(cli.ignore.iter().cloned());

    if let Commands::Sync { dry_run: true } = cli.command {
        config.sync.dry_run = true;
    }

    Ok(config)
}

/// Builds the path filter for the source tree.
fn build_filter(config: &Config, source: &dyn FileSystem) -> color_eyre::Result<PathFilter> {
    let tree = config.ignore.load_ignore_files.then_some(source);
    fs_ignore::build_filter(tree, &config.ignore.patterns).wrap_err("invalid ignore rule")
}

/// Wires filesystems, filter and engine together.
fn build_engine(
    config: &Config,
    cancel: CancellationToken,
) -> color_eyre::Result<(Arc<PathFilter>, SyncEngine)> {
    let source = Arc::new(LocalFileSystem::new(config.source.clone()));
    let dest = Arc::new(LocalFileSystem::new(config.destination.clone()));
    let filter = Arc::new(build_filter(config, source.as_ref())?);

    let engine = SyncEngine::new(source, dest, Arc::clone(&filter), config.sync)?
        .with_cancellation(cancel);
    Ok((filter, engine))
}

/// Cancels `cancel` on Ctrl-C or SIGTERM.
async fn cancel_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
        () = cancel.cancelled() => return,
    }
    cancel.cancel();
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Runs one sync on the blocking pool.
async fn sync_once(engine: &Arc<SyncEngine>) -> color_eyre::Result<SyncReport> {
    let engine = Arc::clone(engine);
    let report = tokio::task::spawn_blocking(move || engine.sync()).await??;
    Ok(report)
}

/// Runs a one-shot sync and prints its summary.
///
/// # Errors
///
/// Returns an error if the run could not start, was interrupted, or left any
/// pair unsynced.
async fn run_sync(config: &Config, cancel: CancellationToken) -> color_eyre::Result<()> {
    let (_, engine) = build_engine(config, cancel)?;
    let report = sync_once(&Arc::new(engine)).await?;

    write_summary(&mut io::stdout().lock(), &report)?;
    finish(&report)
}

/// Syncs once, then keeps syncing after every quiet period until cancelled.
///
/// # Errors
///
/// Returns an error if the initial sync cannot run or the watcher cannot
/// start.
async fn run_watch(config: &Config, cancel: CancellationToken) -> color_eyre::Result<()> {
    let (filter, engine) = build_engine(config, cancel.clone())?;
    let engine = Arc::new(engine);

    // Subscribe first so nothing changed during the initial sync is missed.
    let watcher = if config.watch.enabled {
        Some(ChangeWatcher::new(&config.source, IgnoreFilter::new(filter), &config.watch).await?)
    } else {
        None
    };

    let report = sync_once(&engine).await?;
    write_summary(&mut io::stdout().lock(), &report)?;

    let Some(mut watcher) = watcher else {
        info!("watching is disabled in the configuration");
        return finish(&report);
    };

    info!(
        source = %config.source,
        debounce_ms = config.watch.debounce_ms,
        "watching for changes"
    );
    let trigger = SyncTrigger::new(engine, cancel);
    let exit = watcher.run(&trigger).await;
    info!(?exit, stats = ?trigger.stats(), "stopped watching");

    watcher.shutdown().await?;
    Ok(())
}

/// Prints the difference between the trees.
fn run_diff(config: &Config, format: DiffFormat) -> color_eyre::Result<()> {
    let (_, engine) = build_engine(config, CancellationToken::new())?;
    let diff = engine.diff()?;
    info!(added = diff.added().len(), removed = diff.removed().len(), "computed diff");

    write_diff(&mut io::stdout().lock(), &diff, format)
}

/// Prints the verdict for each path.
fn run_check_ignore(config: &Config, paths: &[String]) -> color_eyre::Result<()> {
    if config.source.as_str().is_empty() {
        bail!("source directory is required (--source or config file)");
    }
    if !config.source.is_dir() {
        bail!("source directory does not exist: {}", config.source);
    }
    let source = LocalFileSystem::new(config.source.clone());
    let filter = build_filter(config, &source)?;

    write_check_ignore(&mut io::stdout().lock(), &filter, paths)
}

/// Turns a finished report into the process outcome.
fn finish(report: &SyncReport) -> color_eyre::Result<()> {
    if report.cancelled {
        bail!("sync interrupted before every path was processed");
    }
    if report.is_partial_failure() {
        let stderr = io::stderr();
        let mut handle = stderr.lock();
        writeln!(handle)?;
        writeln!(handle, "Not synced ({}):", report.stats.failed)?;
        for pair in report.unsynced() {
            writeln!(handle, "  {}", pair.path())?;
        }
        return Err(eyre!("{} path(s) failed to sync", report.stats.failed));
    }
    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Writes a summary of a sync run.
fn write_summary(out: &mut impl Write, report: &SyncReport) -> io::Result<()> {
    let s = &report.stats;

    writeln!(out)?;
    if report.dry_run {
        writeln!(out, "Sync Summary (dry run, nothing written)")?;
        writeln!(out, "=======================================")?;
    } else {
        writeln!(out, "Sync Summary")?;
        writeln!(out, "============")?;
    }
    writeln!(out)?;
    writeln!(out, "  Copied:     {}", s.copied)?;
    writeln!(out, "  Updated:    {}", s.merged)?;
    writeln!(out, "  Deleted:    {}", s.deleted)?;
    writeln!(out, "  Unchanged:  {}", s.unchanged)?;
    writeln!(out, "  Skipped:    {}", s.skipped)?;
    writeln!(out, "  Failed:     {}", s.failed)?;
    writeln!(out)?;
    writeln!(out, "Elapsed: {:.2}s", report.elapsed.as_secs_f64())
}

/// Writes a diff in the requested format.
fn write_diff(out: &mut impl Write, diff: &TreeDiff, format: DiffFormat) -> color_eyre::Result<()> {
    #[derive(serde::Serialize)]
    struct DiffReport<'a> {
        summary: DiffSummary,
        added: &'a [Utf8PathBuf],
        removed: &'a [Utf8PathBuf],
        common: &'a [Utf8PathBuf],
    }

    match format {
        DiffFormat::Json => {
            let report = DiffReport {
                summary: diff.summary(),
                added: diff.added(),
                removed: diff.removed(),
                common: diff.common(),
            };
            serde_json::to_writer_pretty(&mut *out, &report)
                .map_err(|e| eyre!("Failed to serialize JSON: {}", e))?;
            writeln!(out)?;
        }
        DiffFormat::Text => {
            for path in diff.added() {
                writeln!(out, "+ {path}")?;
            }
            for path in diff.removed() {
                writeln!(out, "- {path}")?;
            }
            let summary = diff.summary();
            writeln!(
                out,
                "{} added, {} removed, {} in both",
                summary.added, summary.removed, summary.common
            )?;
        }
    }
    Ok(())
}

/// Writes one verdict line per path: status, path, and the deciding rule.
fn write_check_ignore(out: &mut impl Write, filter: &PathFilter, paths: &[String]) -> color_eyre::Result<()> {
    for path in paths {
        let path = path.trim_start_matches("./");
        let status = if filter.filtered(path) { "ignored" } else { "included" };
        match filter.deciding_pattern(path) {
            Some(rule) => writeln!(out, "{status}\t{path}\t{}", rule.source())?,
            None => writeln!(out, "{status}\t{path}")?,
        }
    }
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Resolve configuration (file, then flags)
    let config = build_config(&cli)?;

    // 4. Initialize tracing (console, plus the log file if configured)
    init_tracing(cli.verbose, cli.no_color, config.log_file.as_deref())?;

    // 5. Listen for Ctrl-C / SIGTERM
    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    // 6. Route to appropriate command
    let result = match &cli.command {
        Commands::CheckIgnore { paths } => run_check_ignore(&config, paths),
        Commands::Diff { format } => {
            config.validate()?;
            run_diff(&config, *format)
        }
        Commands::Sync { .. } => {
            config.validate()?;
            run_sync(&config, cancel.clone()).await
        }
        Commands::Watch => {
            config.validate()?;
            run_watch(&config, cancel.clone()).await
        }
    };
    cancel.cancel();
    result
}
