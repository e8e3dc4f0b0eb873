//! Concurrent directory scanning engine for dirscope.
//!
//! # Overview
//!
//! `dirscope-scan` walks a directory tree and builds an [`Entry`] tree with
//! every directory size aggregated from its descendants. Key features:
//!
//! - **One task per directory**, fanned out on the tokio runtime
//! - **Bounded enumeration** through a [`ConcurrencyGate`] sized from the
//!   available parallelism
//! - **Synchronous notifications** to subscribed [`ScanObserver`]s
//! - **Cooperative cancellation** via [`CancellationToken`]
//! - **Per-directory isolation** of permission failures
//!
//! # Example
//!
//! ```rust,no_run
//! use dirscope_scan::{CancellationToken, Scanner};
//!
//! # async fn run() -> Result<(), dirscope_scan::ScanError> {
//! let scanner = Scanner::new();
//! let root = scanner.scan("/path/to/scan", &CancellationToken::new()).await?;
//!
//! println!("Total size: {} bytes", root.size());
//! println!("Total files: {}", root.file_count());
//! # Ok(())
//! # }
//! ```
//!
//! # Progress Monitoring
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dirscope_scan::{ProgressTracker, Scanner};
//!
//! let tracker = Arc::new(ProgressTracker::new());
//! let mut progress_rx = tracker.subscribe();
//! let scanner = Scanner::new().with_observer(tracker);
//!
//! tokio::spawn(async move {
//!     while let Ok(progress) = progress_rx.recv().await {
//!         println!("Scanned {} files", progress.files_scanned);
//!     }
//! });
//! ```

mod fs;
mod gate;
mod progress;
mod scanner;

pub use fs::{DirInfo, FileInfo, FileSystem, Listing, OsFileSystem};
pub use gate::{ConcurrencyGate, GatePermit};
pub use progress::{PROGRESS_INTERVAL, ProgressTracker, ScanProgress};
pub use scanner::Scanner;

pub use tokio_util::sync::CancellationToken;

// Re-export core types for convenience
pub use dirscope_core::{
    Entry, EntryKind, EntryState, Observers, ScanError, ScanEvent, ScanEventKind, ScanObserver,
};
