//! Gap-analysis error types.

use grc_policy::PolicyError;
use thiserror::Error;

/// Errors raised by the gap analyzer.
#[derive(Debug, Error)]
pub enum ComplianceError {
    /// The requested framework is not registered with the mapper.
    #[error("Framework not found: {framework_id}")]
    FrameworkNotFound { framework_id: String },

    /// The policy library could not be scanned.
    #[error("failed to load policy library: {0}")]
    PolicyLibrary(#[from] PolicyError),
}

/// Result type alias for gap-analysis operations.
pub type ComplianceResult<T> = Result<T, ComplianceError>;
