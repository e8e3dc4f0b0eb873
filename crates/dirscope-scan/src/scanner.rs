//! Recursive, gate-bounded directory scanner.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use compact_str::CompactString;
use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use dirscope_core::{Entry, Observers, ScanError, ScanEvent, ScanObserver};

use crate::fs::{FileSystem, OsFileSystem};
use crate::gate::ConcurrencyGate;

/// One `process_directory` invocation, boxed so it can spawn itself.
type DirectoryTask = Pin<Box<dyn Future<Output = Result<Entry, ScanError>> + Send>>;

/// Child directory tasks, tagged with their enumeration index.
type ChildTasks = JoinSet<(usize, Result<Entry, ScanError>)>;

/// Concurrent directory scanner.
///
/// Each directory is processed as its own task. The tasks enumerating at any
/// instant are capped by a [`ConcurrencyGate`]; tasks waiting on their
/// children hold no slot, so the walk cannot starve itself at depth.
pub struct Scanner {
    fs: Arc<dyn FileSystem>,
    observers: Observers,
    gate_capacity: Option<usize>,
}

impl Scanner {
    /// Create a scanner over the real filesystem.
    pub fn new() -> Self {
        Self::with_filesystem(OsFileSystem::new())
    }

    /// Create a scanner over a custom filesystem implementation.
    pub fn with_filesystem(fs: impl FileSystem) -> Self {
        Self {
            fs: Arc::new(fs),
            observers: Observers::new(),
            gate_capacity: None,
        }
    }

    /// Override the gate capacity for a scan.
    #[cfg(test)]
    pub(crate) fn with_gate_capacity(mut self, capacity: usize) -> Self {
        self.gate_capacity = Some(capacity);
        self
    }

    /// Subscribe an observer to every subsequent scan.
    pub fn subscribe(&mut self, observer: Arc<dyn ScanObserver>) -> &mut Self {
        self.observers.subscribe(observer);
        self
    }

    /// Builder-style [`Scanner::subscribe`].
    pub fn with_observer(mut self, observer: Arc<dyn ScanObserver>) -> Self {
        self.observers.subscribe(observer);
        self
    }

    pub fn observers(&self) -> &Observers {
        &self.observers
    }

    /// Scan the tree under `root` and return it with every size aggregated.
    ///
    /// Fails with [`ScanError::InvalidArgument`] for a blank path and
    /// [`ScanError::PathNotFound`] if `root` is not an existing directory,
    /// both before any work is spawned. Fails with [`ScanError::Cancelled`]
    /// once `cancel` fires; `ScanCompleted` is then never emitted.
    pub async fn scan(
        &self,
        root: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> Result<Entry, ScanError> {
        let start = Instant::now();
        let root_path = self.resolve_root(root.as_ref())?;

        // Dropping the scan (or failing) stops whatever is still in flight.
        let cancel = cancel.child_token();
        let _stop_in_flight = cancel.clone().drop_guard();

        let gate = match self.gate_capacity {
            Some(capacity) => ConcurrencyGate::with_capacity(capacity),
            None => ConcurrencyGate::new(),
        };
        debug!(root = %root_path.display(), capacity = gate.capacity(), "starting scan");

        let ctx = Arc::new(ScanContext {
            fs: Arc::clone(&self.fs),
            observers: self.observers.clone(),
            gate,
            cancel,
            runtime: Handle::current(),
        });

        let root_entry = Entry::directory(root_name(&root_path), root_path);
        let root_entry = process_directory(Arc::clone(&ctx), root_entry)
            .await
            .inspect_err(|err| debug!(error = %err, "scan aborted"))?;

        if ctx.cancel.is_cancelled() {
            debug!("scan cancelled after the last directory finished");
            return Err(ScanError::Cancelled);
        }

        ctx.observers.emit(ScanEvent::ScanCompleted(&root_entry));
        debug!(
            size = root_entry.size(),
            files = root_entry.file_count(),
            dirs = root_entry.dir_count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "scan completed"
        );

        Ok(root_entry)
    }

    /// Blocking variant of [`Scanner::scan`] that drives its own runtime.
    ///
    /// Must not be called from within an async context.
    pub fn scan_blocking(
        &self,
        root: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> Result<Entry, ScanError> {
        let root = root.as_ref();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| ScanError::io(root, e))?;
        runtime.block_on(self.scan(root, cancel))
    }

    /// Validate the root and make it absolute.
    fn resolve_root(&self, root: &Path) -> Result<PathBuf, ScanError> {
        if root.as_os_str().to_string_lossy().trim().is_empty() {
            return Err(ScanError::invalid_argument(
                "root path cannot be empty or whitespace",
            ));
        }

        let root_path = std::path::absolute(root).map_err(|e| ScanError::io(root, e))?;
        match self.fs.is_directory(&root_path) {
            Ok(true) => Ok(root_path),
            Ok(false) => Err(ScanError::PathNotFound { path: root_path }),
            Err(err) => Err(ScanError::io(root_path, err)),
        }
    }
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

/// State shared by every task of one scan.
struct ScanContext {
    fs: Arc<dyn FileSystem>,
    observers: Observers,
    gate: ConcurrencyGate,
    cancel: CancellationToken,
    runtime: Handle,
}

impl ScanContext {
    fn check_cancelled(&self) -> Result<(), Interrupt> {
        if self.cancel.is_cancelled() {
            Err(Interrupt::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Why a listing step stopped early.
enum Interrupt {
    Cancelled,
    Io(io::Error),
}

impl From<io::Error> for Interrupt {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

/// Process one directory and everything below it.
///
/// Returns the directory once its subtree is finished; from then on nothing
/// mutates it.
fn process_directory(ctx: Arc<ScanContext>, entry: Entry) -> DirectoryTask {
    Box::pin(async move {
        if ctx.cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }

        trace!(path = %entry.full_path().display(), "entering directory");
        ctx.observers.emit(ScanEvent::DirectoryStarted(&entry));

        let permit = ctx.gate.acquire(&ctx.cancel).await?;

        let enumerate_ctx = Arc::clone(&ctx);
        let (mut entry, mut children) = tokio::task::spawn_blocking(move || {
            // The slot is held for enumeration only and released on every exit.
            let _permit = permit;
            enumerate(&enumerate_ctx, entry)
        })
        .await
        .map_err(join_failure)??;

        let mut finished: Vec<Option<Entry>> = vec![None; children.len()];
        while let Some(joined) = children.join_next().await {
            let (index, child) = joined.map_err(join_failure)?;
            finished[index] = Some(child?);
        }
        for child in finished.into_iter().flatten() {
            entry.append_child(child);
        }

        entry.aggregate_size();
        trace!(path = %entry.full_path().display(), size = entry.size(), "finished directory");
        ctx.observers.emit(ScanEvent::DirectoryFinished(&entry));

        Ok(entry)
    })
}

/// List subdirectories and files of `entry` while holding a gate slot.
///
/// Subdirectories are spawned as independent tasks as soon as they are seen.
/// Each listing is guarded on its own: a denial marks the directory and
/// abandons only that listing.
fn enumerate(ctx: &Arc<ScanContext>, mut entry: Entry) -> Result<(Entry, ChildTasks), ScanError> {
    let mut children = ChildTasks::new();
    let dir = entry.full_path().to_path_buf();

    if ctx.cancel.is_cancelled() {
        return Err(ScanError::Cancelled);
    }

    let listed = spawn_subdirectories(ctx, &dir, &mut children);
    absorb_denied(&mut entry, "subdirectories", listed)?;

    let listed = append_files(ctx, &dir, &mut entry);
    absorb_denied(&mut entry, "files", listed)?;

    Ok((entry, children))
}

fn spawn_subdirectories(
    ctx: &Arc<ScanContext>,
    dir: &Path,
    children: &mut ChildTasks,
) -> Result<(), Interrupt> {
    for info in ctx.fs.list_directories(dir)? {
        ctx.check_cancelled()?;
        let info = info?;

        let index = children.len();
        let task = process_directory(Arc::clone(ctx), Entry::directory(info.name, info.path));
        children.spawn_on(async move { (index, task.await) }, &ctx.runtime);
    }
    Ok(())
}

fn append_files(ctx: &ScanContext, dir: &Path, entry: &mut Entry) -> Result<(), Interrupt> {
    for info in ctx.fs.list_files(dir)? {
        ctx.check_cancelled()?;
        let info = info?;

        entry.append_child(Entry::file(info.name, info.path, info.size));
        if let Some(file) = entry.children().last() {
            ctx.observers.emit(ScanEvent::FileDiscovered(file));
        }
    }
    Ok(())
}

/// Record a denied listing on the directory; anything else aborts the scan.
fn absorb_denied(
    entry: &mut Entry,
    listing: &str,
    result: Result<(), Interrupt>,
) -> Result<(), ScanError> {
    match result {
        Ok(()) => Ok(()),
        Err(Interrupt::Io(err)) if err.kind() == io::ErrorKind::PermissionDenied => {
            warn!(path = %entry.full_path().display(), listing, "permission denied");
            entry.mark_access_denied();
            Ok(())
        }
        Err(Interrupt::Io(err)) => Err(ScanError::Io {
            path: entry.full_path().to_path_buf(),
            source: err,
        }),
        Err(Interrupt::Cancelled) => {
            debug!(path = %entry.full_path().display(), "cancellation observed");
            Err(ScanError::Cancelled)
        }
    }
}

/// Panics from observers travel up to the caller of `scan`.
fn join_failure(err: JoinError) -> ScanError {
    if err.is_panic() {
        std::panic::resume_unwind(err.into_panic());
    }
    ScanError::Cancelled
}

fn root_name(path: &Path) -> CompactString {
    path.file_name()
        .map(|n| CompactString::new(n.to_string_lossy()))
        .unwrap_or_else(|| CompactString::new(path.to_string_lossy()))
}
