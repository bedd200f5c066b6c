//! # grc-framework — Compliance Frameworks and Policy Mapping
//!
//! Loads compliance framework definitions (NIST CSF, SOC 2, ISO 27001,
//! HIPAA, PCI DSS, GDPR, NIST 800-171, CCPA, NIS2, ...) from YAML into a
//! uniform [`Control`] model and maintains the policy → framework → control
//! index that every coverage computation reads.
//!
//! ## Modules
//!
//! - [`shape`]: the recognized source nestings and one handler per shape.
//! - [`loader`]: single-definition and best-effort directory loading.
//! - [`mapper`]: the [`ComplianceMapper`] registry, [`rebuild_index`],
//!   overlap, summaries and matrices.
//! - [`coverage`]: framework-overview coverage reports.
//!
//! ## Control Ids
//!
//! Control and group keys are deserialized directly into `String`, so a key
//! written `1.10` stays `"1.10"` and never collides with `1.1`.

pub mod coverage;
pub mod error;
pub mod loader;
pub mod mapper;
pub mod model;
pub mod parser;
pub mod shape;

pub use coverage::{ControlCoverage, CoverageReport, FrameworkCoverage};
pub use error::{FrameworkError, FrameworkResult};
pub use loader::{load_directory, load_framework, load_framework_file, load_framework_str};
pub use mapper::{
    rebuild_index, ComplianceMapper, ControlRef, FrameworkRefs, FrameworkSummary, LoadSummary,
    PolicyFrameworkMapping,
};
pub use model::{Control, Framework};
pub use shape::{FrameworkDefinition, FrameworkShape};
