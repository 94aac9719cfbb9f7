//! Error types for calmerge.
//!
//! Library crates use [`CalMergeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all calmerge operations.
#[derive(Debug, thiserror::Error)]
pub enum CalMergeError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while fetching the page or a feed.
    #[error("network error: {0}")]
    Network(String),

    /// Markup or URL parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (oversized response, bad value, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// The source page did not link to any calendar feed.
    #[error("no iCal links found on {page}")]
    NoFeedLinks { page: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, CalMergeError>;

impl CalMergeError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
