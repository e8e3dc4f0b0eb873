//! File and directory entry types.

use std::path::{Path, PathBuf};

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Type of a scanned entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// Anything that is not a directory.
    File,
    /// Directory.
    Directory,
}

impl EntryKind {
    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File)
    }
}

/// Outcome of listing an entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryState {
    #[default]
    Ok,
    /// Listing the files or subdirectories of this directory was denied.
    AccessDenied,
}

/// A single file or directory in the scanned tree.
///
/// Entries are owned by value: the unit of work that processes a directory is
/// the only one holding it mutably, and hands it back to its parent once the
/// subtree is finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    kind: EntryKind,
    name: CompactString,
    full_path: PathBuf,
    /// Bytes for files, aggregate of all descendant files for directories.
    size: u64,
    state: EntryState,
    /// Children in append order. Always empty for files.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<Entry>,
}

impl Entry {
    /// Create a new entry in the `Ok` state with no children.
    ///
    /// A directory always starts at size 0; its size is only ever written by
    /// [`Entry::aggregate_size`].
    pub fn new(
        kind: EntryKind,
        name: impl Into<CompactString>,
        full_path: impl Into<PathBuf>,
        size: u64,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            full_path: full_path.into(),
            size: if kind.is_dir() { 0 } else { size },
            state: EntryState::Ok,
            children: Vec::new(),
        }
    }

    /// Create a new file entry.
    pub fn file(name: impl Into<CompactString>, full_path: impl Into<PathBuf>, size: u64) -> Self {
        Self::new(EntryKind::File, name, full_path, size)
    }

    /// Create a new, empty directory entry.
    pub fn directory(name: impl Into<CompactString>, full_path: impl Into<PathBuf>) -> Self {
        Self::new(EntryKind::Directory, name, full_path, 0)
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Base name component.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn state(&self) -> EntryState {
        self.state
    }

    pub fn children(&self) -> &[Entry] {
        &self.children
    }

    /// Check if this entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Check if this entry is a file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    pub fn is_access_denied(&self) -> bool {
        self.state == EntryState::AccessDenied
    }

    /// Append a child to a directory. Does not update the size.
    ///
    /// Files never have children, so appending to a file is a no-op.
    pub fn append_child(&mut self, child: Entry) {
        if self.is_dir() {
            self.children.push(child);
        }
    }

    /// Record that a listing step for this directory was denied.
    pub fn mark_access_denied(&mut self) {
        self.state = EntryState::AccessDenied;
    }

    /// Set a directory's size to the sum of its direct children's sizes.
    ///
    /// Must only run once every child directory has been aggregated itself.
    /// No-op for files.
    pub fn aggregate_size(&mut self) {
        if self.is_dir() {
            self.size = self.children.iter().map(|child| child.size).sum();
        }
    }

    /// Number of files in this subtree (1 for a file).
    pub fn file_count(&self) -> u64 {
        match self.kind {
            EntryKind::File => 1,
            EntryKind::Directory => self.children.iter().map(Entry::file_count).sum(),
        }
    }

    /// Number of directories strictly below this entry.
    pub fn dir_count(&self) -> u64 {
        self.children
            .iter()
            .filter(|child| child.is_dir())
            .map(|child| child.dir_count() + 1)
            .sum()
    }

    /// Pre-order iterator over this entry and everything below it.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Find the entry with the given full path in this subtree.
    pub fn find(&self, path: impl AsRef<Path>) -> Option<&Entry> {
        let path = path.as_ref();
        if !path.starts_with(&self.full_path) {
            return None;
        }
        self.descendants().find(|entry| entry.full_path == path)
    }
}

/// Iterator returned by [`Entry::descendants`].
#[derive(Debug)]
pub struct Descendants<'a> {
    stack: Vec<&'a Entry>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a Entry;

    fn next(&mut self) -> Option<Self::Item> {
        let entry = self.stack.pop()?;
        self.stack.extend(entry.children.iter().rev());
        Some(entry)
    }
}
