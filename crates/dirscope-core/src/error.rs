//! Error types for scanning operations.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a scan.
///
/// A denied listing is not among them: it is recorded on the affected
/// directory as [`EntryState::AccessDenied`](crate::EntryState::AccessDenied)
/// and the walk carries on.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The root path was empty or whitespace.
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The root path does not name an existing directory.
    #[error("Directory not found: {path}")]
    PathNotFound { path: PathBuf },

    /// The cancellation token fired before the scan completed.
    #[error("Scan was cancelled")]
    Cancelled,

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::PathNotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Check if this error is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
