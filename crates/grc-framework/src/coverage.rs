//! # Framework Coverage Report
//!
//! Framework-overview coverage for a set of available policies. This is the
//! mapper's report; the client-facing gap report with severities and category
//! rollups lives in `grc-compliance` and uses its own rounding and defaults.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use grc_core::percentage;
use serde::{Serialize, Serializer};

use crate::model::Framework;

/// Coverage state of one control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCoverage {
    /// The control requires no policies.
    NoRequirements,
    /// Every required policy is available.
    FullyCovered,
    /// Some but not all required policies are available.
    Partial { have: usize, required: usize },
    /// None of the required policies is available.
    NotCovered,
}

impl ControlCoverage {
    /// Classify a control from its required set against `available`.
    pub fn classify(required: &BTreeSet<String>, available: &BTreeSet<String>) -> Self {
        if required.is_empty() {
            return Self::NoRequirements;
        }
        let have = required.intersection(available).count();
        if have == required.len() {
            Self::FullyCovered
        } else if have > 0 {
            Self::Partial {
                have,
                required: required.len(),
            }
        } else {
            Self::NotCovered
        }
    }
}

impl fmt::Display for ControlCoverage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRequirements => f.write_str("no_requirements"),
            Self::FullyCovered => f.write_str("fully_covered"),
            Self::Partial { have, required } => write!(f, "partial ({have}/{required})"),
            Self::NotCovered => f.write_str("not_covered"),
        }
    }
}

impl Serialize for ControlCoverage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Coverage of one framework against a set of available policies.
#[derive(Debug, Clone, Serialize)]
pub struct FrameworkCoverage {
    pub framework_id: String,
    pub framework_name: String,
    pub total_controls: usize,
    pub controls_fully_covered: usize,
    pub controls_partially_covered: usize,
    pub controls_not_covered: usize,
    /// Fully covered / total × 100, one decimal; 0 when there are no controls.
    pub coverage_percentage: f64,
    pub required_policies_total: usize,
    pub required_policies_available: usize,
    pub required_policies_missing: usize,
    /// Sorted.
    pub missing_policies: Vec<String>,
    pub control_details: BTreeMap<String, ControlCoverage>,
}

/// Outcome of a coverage query. Unknown frameworks are a value, not an error.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum CoverageReport {
    Covered(FrameworkCoverage),
    NotFound { error: String },
}

impl CoverageReport {
    /// Report for an id that is not registered.
    pub fn not_found(framework_id: &str) -> Self {
        Self::NotFound {
            error: format!("Framework not found: {framework_id}"),
        }
    }

    /// The coverage, when the framework was found.
    pub fn coverage(&self) -> Option<&FrameworkCoverage> {
        match self {
            Self::Covered(coverage) => Some(coverage),
            Self::NotFound { .. } => None,
        }
    }
}

/// Compute coverage of `framework` against `available`.
pub fn framework_coverage(framework: &Framework, available: &BTreeSet<String>) -> FrameworkCoverage {
    let required_policies = framework.get_all_required_policies();
    let missing: Vec<String> = required_policies.difference(available).cloned().collect();
    let covered = required_policies.len() - missing.len();

    let mut fully = 0;
    let mut partial = 0;
    let mut not_covered = 0;
    let mut control_details = BTreeMap::new();

    for (control_id, control) in &framework.controls {
        let state = ControlCoverage::classify(&control.required_set(), available);
        match state {
            ControlCoverage::NoRequirements | ControlCoverage::FullyCovered => fully += 1,
            ControlCoverage::Partial { .. } => partial += 1,
            ControlCoverage::NotCovered => not_covered += 1,
        }
        control_details.insert(control_id.clone(), state);
    }

    FrameworkCoverage {
        framework_id: framework.id.clone(),
        framework_name: framework.name.clone(),
        total_controls: framework.total_controls(),
        controls_fully_covered: fully,
        controls_partially_covered: partial,
        controls_not_covered: not_covered,
        coverage_percentage: percentage(fully, framework.total_controls()),
        required_policies_total: required_policies.len(),
        required_policies_available: covered,
        required_policies_missing: missing.len(),
        missing_policies: missing,
        control_details,
    }
}
