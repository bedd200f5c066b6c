//! # Validation Errors
//!
//! Errors raised when a string fails to parse into one of the stack's
//! closed vocabularies (severity, priority, status, size tier, ...).

use thiserror::Error;

/// A string did not name a known variant of a closed vocabulary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The value is not one of the accepted names.
    #[error("unknown {kind}: \"{value}\" (expected one of: {expected})")]
    UnknownVariant {
        /// Vocabulary being parsed, e.g. "priority".
        kind: &'static str,
        /// The rejected input.
        value: String,
        /// Comma-separated list of accepted names.
        expected: &'static str,
    },

    /// An identifier was empty after trimming.
    #[error("{kind} must be non-empty")]
    EmptyIdentifier {
        /// What kind of identifier was empty.
        kind: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_variant_display_lists_expected() {
        let err = ValidationError::UnknownVariant {
            kind: "priority",
            value: "urgent".to_string(),
            expected: "critical, high, medium, low",
        };
        let msg = err.to_string();
        assert!(msg.contains("urgent"));
        assert!(msg.contains("critical, high, medium, low"));
    }

    #[test]
    fn empty_identifier_display() {
        let err = ValidationError::EmptyIdentifier { kind: "policy id" };
        assert_eq!(err.to_string(), "policy id must be non-empty");
    }
}
