//! dirscope - concurrent directory-tree walker.
//!
//! Usage:
//!   dirscope [PATH]                 Scan and print a size tree
//!   dirscope [PATH] --format json   Print the whole tree as JSON
//!   dirscope --help                 Show help

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Result, WrapErr, eyre};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use dirscope_core::Entry;
use dirscope_scan::{
    CancellationToken, ProgressTracker, ScanError, ScanObserver, ScanProgress, Scanner,
};

/// Exit status after Ctrl-C, as shells report SIGINT.
const EXIT_CANCELLED: i32 = 130;

#[derive(Parser)]
#[command(
    name = "dirscope",
    version,
    about = "Concurrent directory-tree walker",
    long_about = "dirscope walks a directory tree in parallel and reports where \
                  the space goes. Press Ctrl-C to cancel a running scan."
)]
struct Cli {
    /// Path to scan (defaults to current directory)
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Maximum depth to display
    #[arg(short, long, default_value = "3")]
    depth: u32,

    /// Show all entries (no depth limit on display)
    #[arg(short, long)]
    all: bool,

    /// Number of top entries to show per directory
    #[arg(short = 'n', long, default_value = "10")]
    top: usize,

    /// Do not print live progress to stderr
    #[arg(long)]
    no_progress: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("interrupt received, cancelling scan");
                cancel.cancel();
            }
        });
    }

    let tracker = Arc::new(ProgressTracker::new());
    let progress = (!cli.no_progress).then(|| spawn_progress_printer(&tracker));

    let observer: Arc<dyn ScanObserver> = tracker.clone();
    let scanner = Scanner::new().with_observer(observer);

    info!(path = %cli.path.display(), "scanning");
    let result = scanner.scan(&cli.path, &cancel).await;

    if let Some(progress) = progress {
        progress.abort();
        eprint!("\r\x1b[2K");
    }

    let root = match result {
        Ok(root) => root,
        Err(ScanError::Cancelled) => {
            eprintln!("Scan cancelled.");
            std::process::exit(EXIT_CANCELLED);
        }
        Err(err) => return Err(err).wrap_err("Scan failed"),
    };

    let snapshot = tracker.snapshot();
    match cli.format {
        OutputFormat::Text => {
            let max_depth = if cli.all { u32::MAX } else { cli.depth };
            print_summary(&root, &snapshot);
            print_entry(&root, 0, max_depth, cli.top, root.size());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&root)?);
        }
    }

    Ok(())
}

/// Initialize tracing on stderr.
fn setup_logging(verbose: bool) -> Result<()> {
    let default = if verbose {
        "dirscope=debug,warn"
    } else {
        "dirscope=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| eyre!("{e}"))
        .wrap_err("Failed to initialize logging")?;

    Ok(())
}

/// Redraw a single status line on stderr for every published snapshot.
fn spawn_progress_printer(tracker: &ProgressTracker) -> tokio::task::JoinHandle<()> {
    let mut rx = tracker.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(progress) => {
                    let mut stderr = std::io::stderr().lock();
                    let _ = write!(
                        stderr,
                        "\r\x1b[2KScanning... {} files, {} dirs, {} ({:.0} files/s)",
                        progress.files_scanned,
                        progress.dirs_started,
                        format_size(progress.bytes_scanned),
                        progress.files_per_second(),
                    );
                    let _ = stderr.flush();
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn print_summary(root: &Entry, progress: &ScanProgress) {
    println!("{}", "─".repeat(60));
    println!(" {} - {}", root.full_path().display(), format_size(root.size()));
    println!(
        " {} files, {} directories",
        root.file_count(),
        root.dir_count()
    );
    println!(" Scanned in {:.2}s", progress.elapsed.as_secs_f64());
    if progress.access_denied > 0 {
        println!(" {} directories could not be read", progress.access_denied);
    }
    println!("{}", "─".repeat(60));
    println!();
}

/// Print an entry and its largest children.
fn print_entry(entry: &Entry, depth: u32, max_depth: u32, top_n: usize, root_size: u64) {
    let indent = "  ".repeat(depth as usize);
    let ratio = if root_size > 0 {
        entry.size() as f64 / root_size as f64 * 100.0
    } else {
        0.0
    };

    let name = if depth == 0 {
        entry.full_path().display().to_string()
    } else {
        entry.name().to_string()
    };
    let marker = match (entry.is_dir(), entry.is_access_denied()) {
        (true, true) => "/ (access denied)",
        (true, false) => "/",
        (false, _) => "",
    };

    println!(
        "{}{}{:<40} {:>10} {:>5.1}% {}",
        indent,
        if entry.is_dir() { "▼ " } else { "  " },
        truncate(&format!("{name}{marker}"), 40),
        format_size(entry.size()),
        ratio,
        make_bar(ratio / 100.0, 10)
    );

    if entry.is_dir() && depth < max_depth {
        let mut children: Vec<&Entry> = entry.children().iter().collect();
        children.sort_by(|a, b| b.size().cmp(&a.size()).then_with(|| a.name().cmp(b.name())));
        let remaining = children.len().saturating_sub(top_n);

        for child in children.into_iter().take(top_n) {
            print_entry(child, depth + 1, max_depth, top_n, root_size);
        }

        if remaining > 0 {
            let indent = "  ".repeat((depth + 1) as usize);
            println!("{indent}  ... and {remaining} more");
        }
    }
}

fn make_bar(ratio: f64, width: usize) -> String {
    let filled = ((ratio * width as f64).round() as usize).min(width);
    let empty = width - filled;
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Truncate to `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}
