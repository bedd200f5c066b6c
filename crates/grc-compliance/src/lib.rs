//! # grc-compliance — Gap Analysis
//!
//! Client-facing coverage computation layered on the compliance mapper and
//! a set of available policy ids.
//!
//! - [`gap`]: per-control [`Gap`]s, category rollups, and the
//!   [`GapReport`] for one framework.
//! - [`priorities`]: cross-framework missing-policy ranking and the
//!   remediation plan built from it.
//!
//! Gap severity ([`grc_core::GapSeverity`]) and remediation priority
//! ([`grc_core::Priority`]) are different scales and are never converted
//! into each other here.

pub mod error;
pub mod gap;
pub mod priorities;

pub use error::{ComplianceError, ComplianceResult};
pub use gap::{
    CategoryCoverage, Gap, GapAnalyzer, GapReport, GapReportDocument, GapSummary, OpenGap,
    DEFAULT_PRIORITY_GAP_LIMIT, UNCATEGORIZED,
};
pub use priorities::{
    MissingPolicy, MissingPolicySummary, RemediationPriority, DEFAULT_REMEDIATION_LIMIT,
};
