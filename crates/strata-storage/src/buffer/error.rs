//! Buffer manager errors.

use thiserror::Error;

use crate::file::IoError;

/// Result type for buffer manager operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer manager operations.
///
/// Usage errors (marking a shared handle dirty, closing a file with a
/// pinned page) are programming bugs and panic instead of appearing here.
#[derive(Debug, Error)]
pub enum BufferError {
    /// An underlying file operation failed. Surfaces at the `fix_page`,
    /// `flush`, or `truncate` call that triggered the I/O.
    #[error("file I/O error: {0}")]
    Io(#[from] IoError),

    /// The buffer manager was constructed with an invalid configuration.
    #[error("configuration error: {message}")]
    Config {
        /// What was wrong with the configuration.
        message: String,
    },
}

impl BufferError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_conversion() {
        let io = IoError::not_found("/tmp/x.db");
        let err: BufferError = io.into();
        assert!(matches!(err, BufferError::Io(_)));
    }

    #[test]
    fn test_config_message() {
        let err = BufferError::config("page_capacity must be > 0");
        assert_eq!(
            err.to_string(),
            "configuration error: page_capacity must be > 0"
        );
    }
}
