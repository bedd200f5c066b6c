//! Package output error types.
//!
//! Building a package never fails; only writing it to disk can.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while writing a package.
#[derive(Debug, Error)]
pub enum PackageError {
    /// Creating a directory or writing a file failed.
    #[error("I/O error writing {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The package manifest could not be serialized.
    #[error("failed to serialize package manifest: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Result type alias for package output.
pub type BuildResult<T> = Result<T, PackageError>;
