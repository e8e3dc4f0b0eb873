//! Scan progress reporting.

use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

use dirscope_core::{ScanEvent, ScanObserver};

/// Counted events (files discovered plus directories finished) between two
/// published snapshots.
pub const PROGRESS_INTERVAL: u64 = 1000;

/// Progress information during a scan.
#[derive(Debug, Clone)]
pub struct ScanProgress {
    /// Number of files discovered so far.
    pub files_scanned: u64,
    /// Number of directories entered so far.
    pub dirs_started: u64,
    /// Number of directories whose subtree is finished.
    pub dirs_finished: u64,
    /// Total bytes of the files discovered so far.
    pub bytes_scanned: u64,
    /// Directories with a denied listing.
    pub access_denied: u64,
    /// Most recently entered directory.
    pub current_path: PathBuf,
    /// Time elapsed since the tracker was created.
    pub elapsed: Duration,
    /// Whether the scan completed.
    pub completed: bool,
}

impl ScanProgress {
    /// Create initial progress state.
    pub fn new() -> Self {
        Self {
            files_scanned: 0,
            dirs_started: 0,
            dirs_finished: 0,
            bytes_scanned: 0,
            access_denied: 0,
            current_path: PathBuf::new(),
            elapsed: Duration::ZERO,
            completed: false,
        }
    }

    /// Calculate scan rate in files per second.
    pub fn files_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.files_scanned as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Calculate scan rate in bytes per second.
    pub fn bytes_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.bytes_scanned as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Get total items scanned (files + dirs).
    pub fn total_items(&self) -> u64 {
        self.files_scanned + self.dirs_started
    }

    /// Directories entered but not yet finished.
    pub fn dirs_in_flight(&self) -> u64 {
        self.dirs_started.saturating_sub(self.dirs_finished)
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer that turns scan events into periodic [`ScanProgress`] snapshots.
///
/// Snapshots go out over a broadcast channel; a receiver that falls behind
/// loses snapshots rather than slowing the scan down.
#[derive(Debug)]
pub struct ProgressTracker {
    start_time: Instant,
    files_scanned: AtomicU64,
    dirs_started: AtomicU64,
    dirs_finished: AtomicU64,
    bytes_scanned: AtomicU64,
    access_denied: AtomicU64,
    ticks: AtomicU64,
    completed: AtomicBool,
    current_path: Mutex<PathBuf>,
    progress_tx: broadcast::Sender<ScanProgress>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (progress_tx, _) = broadcast::channel(100);
        Self {
            start_time: Instant::now(),
            files_scanned: AtomicU64::new(0),
            dirs_started: AtomicU64::new(0),
            dirs_finished: AtomicU64::new(0),
            bytes_scanned: AtomicU64::new(0),
            access_denied: AtomicU64::new(0),
            ticks: AtomicU64::new(0),
            completed: AtomicBool::new(false),
            current_path: Mutex::new(PathBuf::new()),
            progress_tx,
        }
    }

    /// Subscribe to progress snapshots.
    pub fn subscribe(&self) -> broadcast::Receiver<ScanProgress> {
        self.progress_tx.subscribe()
    }

    pub fn snapshot(&self) -> ScanProgress {
        ScanProgress {
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            dirs_started: self.dirs_started.load(Ordering::Relaxed),
            dirs_finished: self.dirs_finished.load(Ordering::Relaxed),
            bytes_scanned: self.bytes_scanned.load(Ordering::Relaxed),
            access_denied: self.access_denied.load(Ordering::Relaxed),
            current_path: self
                .current_path
                .lock()
                .map(|path| path.clone())
                .unwrap_or_default(),
            elapsed: self.start_time.elapsed(),
            completed: self.completed.load(Ordering::Relaxed),
        }
    }

    fn publish(&self) {
        // No receivers is fine.
        let _ = self.progress_tx.send(self.snapshot());
    }

    fn tick(&self) {
        let ticks = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        if ticks % PROGRESS_INTERVAL == 0 {
            self.publish();
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanObserver for ProgressTracker {
    fn on_event(&self, event: ScanEvent<'_>) {
        match event {
            ScanEvent::DirectoryStarted(dir) => {
                self.dirs_started.fetch_add(1, Ordering::Relaxed);
                if let Ok(mut current) = self.current_path.lock() {
                    *current = dir.full_path().to_path_buf();
                }
            }
            ScanEvent::FileDiscovered(file) => {
                self.files_scanned.fetch_add(1, Ordering::Relaxed);
                self.bytes_scanned.fetch_add(file.size(), Ordering::Relaxed);
                self.tick();
            }
            ScanEvent::DirectoryFinished(dir) => {
                self.dirs_finished.fetch_add(1, Ordering::Relaxed);
                if dir.is_access_denied() {
                    self.access_denied.fetch_add(1, Ordering::Relaxed);
                }
                self.tick();
            }
            ScanEvent::ScanCompleted(_) => {
                self.completed.store(true, Ordering::Relaxed);
                self.publish();
            }
        }
    }
}
