//! # grc-package — Client Policy Packages
//!
//! Turns a policy library, a compliance mapper, and one client's
//! configuration into a finished deliverable.
//!
//! ## Pipeline
//!
//! 1. [`PackageBuilder::select_policies`] picks candidates: every library
//!    policy, or those required by (or mapped to) the client's target
//!    frameworks.
//! 2. Each candidate is rendered through the template engine with a
//!    [`grc_template::ClientProfile`] derived from the [`ClientConfig`].
//! 3. Rendered text is scanned for leftovers ([`incomplete`]) and for
//!    framework-specific customization needs ([`customization`]).
//! 4. [`markdown`] and [`remediation`] produce the accompanying documents;
//!    [`export::write_package`] lays everything out on disk.
//!
//! Building never fails. Missing policies and broken references surface as
//! warnings on the [`PackageResult`]; only writing to disk returns errors.

pub mod builder;
pub mod config;
pub mod customization;
pub mod error;
pub mod export;
pub mod incomplete;
pub mod markdown;
pub mod remediation;

pub use builder::{PackageBuilder, PackageResult, PolicyDocument, DATE_FORMAT, DEFAULT_PACKAGE_VERSION};
pub use config::{BuildOptions, ClientConfig};
pub use customization::{generate_checklist, CustomizationFinding, IncompletenessDetector};
pub use error::{BuildResult, PackageError};
pub use export::{package_dir_name, policy_file_name, write_package, PackageManifest};
pub use incomplete::{detect_incomplete_sections, IncompleteKind, IncompleteSection};
pub use markdown::{generate_customization_checklist, generate_table_of_contents};
pub use remediation::{
    RemediationCategory, RemediationInput, RemediationItem, RemediationReport, RemediationReporter,
};
