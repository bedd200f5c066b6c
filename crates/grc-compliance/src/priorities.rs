//! # Cross-Framework Remediation Priorities
//!
//! Answers "which policy should we write next": a missing policy that
//! blocks controls in many frameworks outranks one that blocks a single
//! control.

use std::collections::BTreeMap;

use grc_core::Priority;
use serde::Serialize;

use crate::gap::GapAnalyzer;

/// Default number of entries in a remediation plan.
pub const DEFAULT_REMEDIATION_LIMIT: usize = 20;

/// One missing policy and what it blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingPolicy {
    pub policy_id: String,
    pub frameworks_impacted: usize,
    pub controls_impacted: usize,
    /// Frameworks missing this policy, in request order.
    pub framework_list: Vec<String>,
    /// `framework:control` pairs blocked by this policy.
    pub control_list: Vec<String>,
}

/// Missing policies across several frameworks, broadest impact first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingPolicySummary {
    pub total_missing: usize,
    pub policies: Vec<MissingPolicy>,
}

/// A missing policy with an assigned priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemediationPriority {
    pub policy_id: String,
    pub priority: Priority,
    pub frameworks_impacted: usize,
    pub controls_impacted: usize,
    pub framework_list: Vec<String>,
    pub recommendation: String,
}

impl<'a> GapAnalyzer<'a> {
    /// Aggregate missing policies over `framework_ids`.
    ///
    /// Unknown or repeated framework ids are skipped. Entries are sorted by
    /// `(frameworks_impacted, controls_impacted)` descending; ties keep the
    /// order in which policies were first seen.
    pub fn get_missing_policies_summary<S: AsRef<str>>(
        &self,
        framework_ids: &[S],
    ) -> MissingPolicySummary {
        let mut entries: Vec<MissingPolicy> = Vec::new();
        let mut index: BTreeMap<String, usize> = BTreeMap::new();
        let mut seen_frameworks: Vec<&str> = Vec::new();

        for fw_id in framework_ids {
            let fw_id = fw_id.as_ref();
            if seen_frameworks.contains(&fw_id) {
                continue;
            }
            seen_frameworks.push(fw_id);

            let Ok(report) = self.analyze_framework(fw_id) else {
                continue;
            };
            for policy_id in &report.missing_policy_list {
                let slot = *index.entry(policy_id.clone()).or_insert_with(|| {
                    entries.push(MissingPolicy {
                        policy_id: policy_id.clone(),
                        frameworks_impacted: 0,
                        controls_impacted: 0,
                        framework_list: Vec::new(),
                        control_list: Vec::new(),
                    });
                    entries.len() - 1
                });
                let entry = &mut entries[slot];
                entry.framework_list.push(fw_id.to_string());
                for gap in &report.gaps {
                    if gap.missing_policies.contains(policy_id) {
                        entry.control_list.push(format!("{fw_id}:{}", gap.control_id));
                    }
                }
            }
        }

        for entry in &mut entries {
            entry.frameworks_impacted = entry.framework_list.len();
            entry.controls_impacted = entry.control_list.len();
        }
        entries.sort_by(|a, b| {
            (b.frameworks_impacted, b.controls_impacted)
                .cmp(&(a.frameworks_impacted, a.controls_impacted))
        });

        MissingPolicySummary {
            total_missing: entries.len(),
            policies: entries,
        }
    }

    /// The top `limit` missing policies with a priority and recommendation.
    pub fn generate_remediation_priorities<S: AsRef<str>>(
        &self,
        framework_ids: &[S],
        limit: usize,
    ) -> Vec<RemediationPriority> {
        self.get_missing_policies_summary(framework_ids)
            .policies
            .into_iter()
            .take(limit)
            .map(|p| RemediationPriority {
                priority: Priority::for_remediation(p.frameworks_impacted, p.controls_impacted),
                recommendation: format!(
                    "Create {} to address {} controls across {} framework(s)",
                    p.policy_id, p.controls_impacted, p.frameworks_impacted
                ),
                policy_id: p.policy_id,
                frameworks_impacted: p.frameworks_impacted,
                controls_impacted: p.controls_impacted,
                framework_list: p.framework_list,
            })
            .collect()
    }
}
