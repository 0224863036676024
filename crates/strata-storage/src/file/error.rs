//! I/O error types for the file module.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for I/O operations.
pub type IoResult<T> = Result<T, IoError>;

/// Errors that can occur during file I/O operations.
#[derive(Debug, Error)]
#[allow(missing_docs)] // Fields are documented by variant docs
pub enum IoError {
    /// Standard I/O error.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// File not found.
    #[error("file not found: {path}")]
    NotFound { path: PathBuf },

    /// Permission denied.
    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// File already exists.
    #[error("file already exists: {path}")]
    AlreadyExists { path: PathBuf },

    /// Short write (less data accepted than handed over).
    #[error("short write: expected {expected} bytes, got {actual}")]
    ShortWrite { expected: usize, actual: usize },

    /// Invalid operation for the mode the file was opened in.
    #[error("invalid operation: {operation} not allowed in {mode} mode")]
    InvalidOperation {
        operation: &'static str,
        mode: &'static str,
    },
}

impl IoError {
    /// Creates a new NotFound error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Creates a new AlreadyExists error.
    pub fn already_exists(path: impl Into<PathBuf>) -> Self {
        Self::AlreadyExists { path: path.into() }
    }

    /// Creates a ShortWrite error.
    pub fn short_write(expected: usize, actual: usize) -> Self {
        Self::ShortWrite { expected, actual }
    }

    /// Returns true if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
            || matches!(self, Self::Io { source } if source.kind() == io::ErrorKind::NotFound)
    }

    /// Converts from `std::io::Error` with path context.
    pub fn from_io_with_path(err: io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            io::ErrorKind::AlreadyExists => Self::AlreadyExists { path },
            _ => Self::Io { source: err },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found() {
        let err = IoError::not_found("/tmp/missing.db");
        assert!(err.is_not_found());

        let std_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err: IoError = std_err.into();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_from_io_with_path() {
        let err = IoError::from_io_with_path(
            io::Error::new(io::ErrorKind::AlreadyExists, "exists"),
            "/tmp/a.db",
        );
        assert!(matches!(err, IoError::AlreadyExists { .. }));

        let err = IoError::from_io_with_path(
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
            "/tmp/a.db",
        );
        assert!(matches!(err, IoError::PermissionDenied { .. }));
    }

    #[test]
    fn test_short_write() {
        let err = IoError::short_write(100, 50);
        assert!(matches!(
            err,
            IoError::ShortWrite {
                expected: 100,
                actual: 50
            }
        ));
    }
}
