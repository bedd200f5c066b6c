//! # grc-policy — Policy Source Documents
//!
//! The policy library: Markdown templates with YAML frontmatter describing
//! each policy's id, category, static framework mapping, variables, and
//! citations of other policies.
//!
//! - [`document`]: frontmatter parsing into [`PolicySource`].
//! - [`library`]: directory loading into a [`PolicyLibrary`], plus the
//!   lenient id scan used for gap analysis.
//! - [`references`]: the [`ReferenceValidator`] for broken, deprecated and
//!   circular citations.

pub mod document;
pub mod error;
pub mod library;
pub mod references;

pub use document::{parse_policy, split_frontmatter, PolicySource, PolicyStatus, PolicyType};
pub use error::{PolicyError, PolicyResult};
pub use library::{scan_policy_ids, PolicyLibrary};
pub use references::{
    IssueLevel, ReferenceIssue, ReferenceStatus, ReferenceValidator, ValidationMode,
    ValidationResult,
};
