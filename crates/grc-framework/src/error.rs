//! Framework-specific error types.
//!
//! Structured errors for framework loading. All errors carry the source
//! (file path or caller-supplied name) so a skipped file can be located
//! from the log line alone.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading framework definitions.
#[derive(Debug, Error)]
pub enum FrameworkError {
    /// YAML parsing failed.
    #[error("failed to parse framework YAML from {source_name}: {source}")]
    YamlParse {
        source_name: String,
        source: serde_yaml::Error,
    },

    /// The document has none of the recognized grouping keys.
    #[error("unrecognized framework structure in {source_name}: expected one of {expected}")]
    UnrecognizedStructure {
        source_name: String,
        expected: &'static str,
    },

    /// A framework file was not found.
    #[error("framework file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// The frameworks directory does not exist.
    #[error("frameworks directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// Reload was requested before any directory was loaded.
    #[error("no frameworks directory has been loaded; nothing to reload")]
    NothingToReload,

    /// I/O error.
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type alias for framework operations.
pub type FrameworkResult<T> = Result<T, FrameworkError>;
