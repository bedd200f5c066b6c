//! Policy-library error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while reading policy sources.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Frontmatter YAML parsing failed.
    #[error("failed to parse frontmatter at {path}: {source}")]
    FrontmatterParse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    /// The policies directory does not exist.
    #[error("policies directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// I/O error.
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type alias for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;
