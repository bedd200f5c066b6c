#![deny(missing_docs)]

//! # grc-core — Foundational Types for the GRC Policy Stack
//!
//! Types shared by every other crate in the workspace. No internal crate
//! dependencies, only `serde` and `thiserror`.
//!
//! ## Design Principles
//!
//! 1. **Two severity scales, two types.** Per-control gap severity
//!    ([`GapSeverity`]) and remediation/customization priority ([`Priority`])
//!    are separate enums so one can never be passed where the other is expected.
//!
//! 2. **Identifiers stay strings.** Framework, control and policy ids come
//!    from hand-written source files and may look numeric (`1.10`). They are
//!    carried as `String` end to end and never parsed.

pub mod de;
pub mod error;
pub mod severity;
pub mod text;

pub use error::ValidationError;
pub use severity::{GapSeverity, Priority};
pub use text::{percentage, round_to_tenth, title_case};
