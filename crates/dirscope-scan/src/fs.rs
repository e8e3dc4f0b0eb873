//! Filesystem enumeration boundary.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use compact_str::CompactString;

/// A fallible listing of directory contents.
///
/// The listing itself may fail up front, and any element may fail mid-way.
pub type Listing<'a, T> = Box<dyn Iterator<Item = io::Result<T>> + Send + 'a>;

/// A file found by [`FileSystem::list_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: CompactString,
    pub path: PathBuf,
    /// Length in bytes.
    pub size: u64,
}

/// A subdirectory found by [`FileSystem::list_directories`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirInfo {
    pub name: CompactString,
    pub path: PathBuf,
}

/// The enumeration capability the scanner consumes.
///
/// Calls are blocking; the scanner runs them on the blocking thread pool.
/// `io::ErrorKind::PermissionDenied` from a listing marks the directory as
/// access denied; any other error aborts the scan.
pub trait FileSystem: Send + Sync + 'static {
    /// Does `path` exist and is it a directory.
    fn is_directory(&self, path: &Path) -> io::Result<bool>;

    /// Immediate non-directory children of `dir`.
    fn list_files<'a>(&'a self, dir: &Path) -> io::Result<Listing<'a, FileInfo>>;

    /// Immediate subdirectories of `dir`.
    fn list_directories<'a>(&'a self, dir: &Path) -> io::Result<Listing<'a, DirInfo>>;
}

/// [`FileSystem`] backed by `std::fs`.
///
/// Symbolic links are never followed: a link is reported as a file with the
/// size of the link itself, so linked directories are not traversed.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl OsFileSystem {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for OsFileSystem {
    fn is_directory(&self, path: &Path) -> io::Result<bool> {
        fs::metadata(path).map(|metadata| metadata.is_dir())
    }

    fn list_files<'a>(&'a self, dir: &Path) -> io::Result<Listing<'a, FileInfo>> {
        let read_dir = fs::read_dir(dir)?;
        Ok(Box::new(read_dir.filter_map(|entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => return Some(Err(err)),
            };
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => return Some(Err(err)),
            };
            if file_type.is_dir() {
                return None;
            }
            // DirEntry::metadata does not traverse symlinks.
            Some(entry.metadata().map(|metadata| FileInfo {
                name: file_name(&entry),
                path: entry.path(),
                size: metadata.len(),
            }))
        })))
    }

    fn list_directories<'a>(&'a self, dir: &Path) -> io::Result<Listing<'a, DirInfo>> {
        let read_dir = fs::read_dir(dir)?;
        Ok(Box::new(read_dir.filter_map(|entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => return Some(Err(err)),
            };
            match entry.file_type() {
                Ok(file_type) if file_type.is_dir() => Some(Ok(DirInfo {
                    name: file_name(&entry),
                    path: entry.path(),
                })),
                Ok(_) => None,
                Err(err) => Some(Err(err)),
            }
        })))
    }
}

fn file_name(entry: &fs::DirEntry) -> CompactString {
    CompactString::new(entry.file_name().to_string_lossy())
}
