//! # Remediation Report
//!
//! Rolls every outstanding issue for one client engagement into a single
//! numbered work list: customization findings on rendered policies,
//! cross-reference problems in the library, and missing policies surfaced
//! by gap analysis.
//!
//! ## Numbering
//!
//! Item ids carry a category prefix and the item's 1-based position in the
//! combined list (`INC-0001`, `INC-0002`, `REF-0003`, `GAP-0004`), so ids
//! are unique within a report and record the order items were collected.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use grc_compliance::Gap;
use grc_core::{GapSeverity, Priority};
use grc_policy::{ReferenceIssue, ReferenceStatus};
use serde::Serialize;

use crate::customization::CustomizationFinding;

const DESCRIPTION_WIDTH: usize = 50;
const REMEDIATION_WIDTH: usize = 40;

/// Source of a remediation item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemediationCategory {
    IncompleteSection,
    BrokenReference,
    PolicyGap,
}

impl RemediationCategory {
    fn prefix(self) -> &'static str {
        match self {
            Self::IncompleteSection => "INC",
            Self::BrokenReference => "REF",
            Self::PolicyGap => "GAP",
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::IncompleteSection => "incomplete_section",
            Self::BrokenReference => "broken_reference",
            Self::PolicyGap => "policy_gap",
        }
    }

    /// Rough effort to close one item of this category at `priority`.
    pub fn estimated_effort(self, priority: Priority) -> &'static str {
        match (self, priority) {
            (Self::IncompleteSection, Priority::Critical) => "2-4 hours",
            (Self::IncompleteSection, Priority::High) => "1-2 hours",
            (Self::IncompleteSection, Priority::Medium) => "30-60 minutes",
            (Self::IncompleteSection, Priority::Low) => "15-30 minutes",
            (Self::BrokenReference, Priority::High) => "1-2 hours",
            (Self::BrokenReference, Priority::Medium) => "30 minutes",
            (Self::PolicyGap, Priority::Critical) => "4-8 hours",
            (Self::PolicyGap, Priority::High) => "2-4 hours",
            (Self::PolicyGap, Priority::Medium) => "1-2 hours",
            _ => "1 hour",
        }
    }
}

impl fmt::Display for RemediationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow state of an item. Reports are always generated with every item
/// open; the other states exist for downstream trackers that ingest the
/// JSON form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Open,
    InProgress,
    Complete,
    Waived,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemediationItem {
    pub id: String,
    pub category: RemediationCategory,
    pub priority: Priority,
    pub policy_id: Option<String>,
    pub framework: Option<String>,
    pub description: String,
    pub remediation: String,
    pub estimated_effort: String,
    pub status: ItemStatus,
}

/// A reference problem as recorded in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceEntry {
    pub source: String,
    pub target: String,
    pub status: ReferenceStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemediationReport {
    pub client_id: String,
    pub client_name: String,
    pub generated_at: DateTime<Utc>,
    pub target_frameworks: Vec<String>,
    pub policies_generated: usize,
    /// Distinct policies with at least one customization finding.
    pub policies_requiring_customization: usize,
    pub critical_items: usize,
    pub high_items: usize,
    pub medium_items: usize,
    pub low_items: usize,
    pub items: Vec<RemediationItem>,
    /// Framework id to the ids of its `GAP-` items.
    pub gaps_by_framework: BTreeMap<String, Vec<String>>,
    /// Missing policy ids, deduplicated and sorted.
    pub missing_policies: Vec<String>,
    pub reference_issues: Vec<ReferenceEntry>,
}

impl RemediationReport {
    fn item(&self, id: &str) -> Option<&RemediationItem> {
        self.items.iter().find(|item| item.id == id)
    }

    fn push(&mut self, category: RemediationCategory, draft: ItemDraft) {
        let id = format!("{}-{:04}", category.prefix(), self.items.len() + 1);
        match draft.priority {
            Priority::Critical => self.critical_items += 1,
            Priority::High => self.high_items += 1,
            Priority::Medium => self.medium_items += 1,
            Priority::Low => self.low_items += 1,
        }
        if category == RemediationCategory::PolicyGap {
            if let Some(framework) = &draft.framework {
                self.gaps_by_framework
                    .entry(framework.clone())
                    .or_default()
                    .push(id.clone());
            }
        }
        self.items.push(RemediationItem {
            id,
            category,
            priority: draft.priority,
            estimated_effort: category.estimated_effort(draft.priority).to_string(),
            policy_id: draft.policy_id,
            framework: draft.framework,
            description: draft.description,
            remediation: draft.remediation,
            status: ItemStatus::Open,
        });
    }
}

struct ItemDraft {
    priority: Priority,
    policy_id: Option<String>,
    framework: Option<String>,
    description: String,
    remediation: String,
}

/// Everything a report is built from.
#[derive(Debug, Clone, Copy)]
pub struct RemediationInput<'a> {
    pub client_id: &'a str,
    pub client_name: &'a str,
    pub target_frameworks: &'a [String],
    pub generated_policies: &'a [String],
    pub findings: &'a [CustomizationFinding],
    pub reference_issues: &'a [ReferenceIssue],
    pub gaps: &'a [Gap],
}

/// Gap severity expressed on the remediation priority scale.
fn gap_priority(severity: GapSeverity) -> Priority {
    match severity {
        GapSeverity::Critical => Priority::Critical,
        GapSeverity::High => Priority::High,
        GapSeverity::Medium => Priority::Medium,
        GapSeverity::None => Priority::Low,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RemediationReporter {
    generated_at: DateTime<Utc>,
}

impl Default for RemediationReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl RemediationReporter {
    /// Reporter stamping reports with the current time.
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Reporter stamping reports with `generated_at`.
    pub fn at(generated_at: DateTime<Utc>) -> Self {
        Self { generated_at }
    }

    pub fn generate_report(&self, input: RemediationInput<'_>) -> RemediationReport {
        let mut report = RemediationReport {
            client_id: input.client_id.to_string(),
            client_name: input.client_name.to_string(),
            generated_at: self.generated_at,
            target_frameworks: input.target_frameworks.to_vec(),
            policies_generated: input.generated_policies.len(),
            policies_requiring_customization: 0,
            critical_items: 0,
            high_items: 0,
            medium_items: 0,
            low_items: 0,
            items: Vec::new(),
            gaps_by_framework: BTreeMap::new(),
            missing_policies: Vec::new(),
            reference_issues: Vec::new(),
        };

        let mut customized = BTreeSet::new();
        for finding in input.findings {
            customized.insert(finding.policy_id.as_str());
            report.push(
                RemediationCategory::IncompleteSection,
                ItemDraft {
                    priority: finding.priority,
                    policy_id: Some(finding.policy_id.clone()),
                    framework: finding.frameworks.first().cloned(),
                    description: finding.reason.clone(),
                    remediation: format!(
                        "Complete section {} with required details",
                        finding.section
                    ),
                },
            );
        }
        report.policies_requiring_customization = customized.len();

        for issue in input.reference_issues {
            let priority = if issue.status == ReferenceStatus::Broken {
                Priority::High
            } else {
                Priority::Medium
            };
            report.push(
                RemediationCategory::BrokenReference,
                ItemDraft {
                    priority,
                    policy_id: Some(issue.source_policy.clone()),
                    framework: None,
                    description: issue.message.clone(),
                    remediation: format!(
                        "Add missing policy '{}' or update reference",
                        issue.referenced_policy
                    ),
                },
            );
            report.reference_issues.push(ReferenceEntry {
                source: issue.source_policy.clone(),
                target: issue.referenced_policy.clone(),
                status: issue.status,
            });
        }

        let mut missing = BTreeSet::new();
        for gap in input.gaps {
            for policy in &gap.missing_policies {
                missing.insert(policy.clone());
                report.push(
                    RemediationCategory::PolicyGap,
                    ItemDraft {
                        priority: gap_priority(gap.severity),
                        policy_id: None,
                        framework: Some(gap.framework_id.clone()),
                        description: format!(
                            "Missing policy: {policy} (required for {})",
                            gap.control_id
                        ),
                        remediation: format!("Create or acquire policy: {policy}"),
                    },
                );
            }
        }
        report.missing_policies = missing.into_iter().collect();

        report
    }

    pub fn to_markdown(&self, report: &RemediationReport) -> String {
        let mut lines = vec![
            "# Compliance Remediation Report".to_string(),
            format!("## Client: {}", report.client_name),
            format!(
                "## Assessment Date: {}",
                report.generated_at.format("%Y-%m-%d")
            ),
            String::new(),
            "---".to_string(),
            String::new(),
            "## Executive Summary".to_string(),
            String::new(),
            format!(
                "- **Total Policies Generated:** {}",
                report.policies_generated
            ),
            format!(
                "- **Policies Requiring Customization:** {}",
                report.policies_requiring_customization
            ),
            format!("- **Critical Actions Required:** {}", report.critical_items),
            format!("- **High Priority Items:** {}", report.high_items),
            format!("- **Medium Priority Items:** {}", report.medium_items),
            format!("- **Low Priority Items:** {}", report.low_items),
            format!(
                "- **Target Frameworks:** {}",
                report.target_frameworks.join(", ")
            ),
            String::new(),
            "---".to_string(),
            String::new(),
            "## Remediation Items".to_string(),
            String::new(),
            "| ID | Priority | Category | Policy | Description | Remediation | Effort |".to_string(),
            "|-----|----------|----------|--------|-------------|-------------|--------|".to_string(),
        ];

        let mut items: Vec<&RemediationItem> = report.items.iter().collect();
        items.sort_by_key(|item| item.priority.rank());
        for item in items {
            lines.push(format!(
                "| {} | {} | {} | {} | {} | {} | {} |",
                item.id,
                item.priority.as_str().to_uppercase(),
                item.category,
                item.policy_id.as_deref().unwrap_or("-"),
                truncate(&item.description, DESCRIPTION_WIDTH),
                truncate(&item.remediation, REMEDIATION_WIDTH),
                item.estimated_effort,
            ));
        }

        if !report.gaps_by_framework.is_empty() {
            lines.extend(section("Gaps by Framework"));
            for (framework, ids) in &report.gaps_by_framework {
                lines.push(format!("### {}", framework.to_uppercase()));
                lines.push(String::new());
                for item in ids.iter().filter_map(|id| report.item(id)) {
                    lines.push(format!("- [ ] {}", item.description));
                }
                lines.push(String::new());
            }
        }

        if !report.missing_policies.is_empty() {
            lines.extend(section("Missing Policies"));
            lines.push("The following policies need to be created:".to_string());
            lines.push(String::new());
            for policy in &report.missing_policies {
                lines.push(format!("- [ ] {policy}"));
            }
        }

        if !report.reference_issues.is_empty() {
            lines.extend(section("Reference Issues"));
            for issue in &report.reference_issues {
                let relation = match issue.status {
                    ReferenceStatus::Broken => "missing".to_string(),
                    other => other.to_string(),
                };
                lines.push(format!(
                    "- Policy `{}` references {relation} `{}`",
                    issue.source, issue.target
                ));
            }
        }

        lines.extend(section("Recommended Next Steps"));
        lines.extend(
            [
                "1. Complete all CRITICAL priority items immediately",
                "2. Address HIGH priority items within 2 weeks",
                "3. Schedule MEDIUM priority items for completion within 30 days",
                "4. Review and approve all policies with stakeholders",
                "5. Distribute policies to all personnel",
                "6. Schedule annual policy review",
                "",
                "---",
                "",
                "*Report generated by grc*",
            ]
            .map(String::from),
        );

        lines.join("\n")
    }
}

fn section(title: &str) -> [String; 5] {
    [
        String::new(),
        "---".to_string(),
        String::new(),
        format!("## {title}"),
        String::new(),
    ]
}

/// First `width` characters of `text`, with `...` appended when cut.
fn truncate(text: &str, width: usize) -> String {
    match text.char_indices().nth(width) {
        Some((end, _)) => format!("{}...", &text[..end]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use grc_policy::IssueLevel;

    use super::*;

    fn finding(policy_id: &str, priority: Priority) -> CustomizationFinding {
        CustomizationFinding {
            policy_id: policy_id.to_string(),
            section: "## Scope".to_string(),
            reason: "Contains placeholder: [INSERT scope]".to_string(),
            frameworks: vec!["soc2".to_string()],
            priority,
        }
    }

    fn issue(status: ReferenceStatus) -> ReferenceIssue {
        ReferenceIssue {
            source_policy: "access-control".to_string(),
            referenced_policy: "ghost".to_string(),
            status,
            message: "Referenced policy 'ghost' not found".to_string(),
            level: IssueLevel::Warning,
        }
    }

    fn gap(framework: &str, control: &str, missing: &[&str], severity: GapSeverity) -> Gap {
        Gap {
            framework_id: framework.to_string(),
            control_id: control.to_string(),
            control_name: control.to_string(),
            control_description: String::new(),
            required_policies: missing.iter().map(|s| s.to_string()).collect(),
            missing_policies: missing.iter().map(|s| s.to_string()).collect(),
            available_policies: Vec::new(),
            severity,
            category: "Access".to_string(),
        }
    }

    fn reporter() -> RemediationReporter {
        RemediationReporter::at(Utc.with_ymd_and_hms(2025, 3, 7, 12, 0, 0).unwrap())
    }

    fn input<'a>(
        findings: &'a [CustomizationFinding],
        issues: &'a [ReferenceIssue],
        gaps: &'a [Gap],
        frameworks: &'a [String],
    ) -> RemediationInput<'a> {
        RemediationInput {
            client_id: "acme",
            client_name: "Acme Corp",
            target_frameworks: frameworks,
            generated_policies: frameworks,
            findings,
            reference_issues: issues,
            gaps,
        }
    }

    #[test]
    fn items_are_numbered_across_categories() {
        let findings = [finding("a", Priority::High), finding("a", Priority::Low)];
        let issues = [issue(ReferenceStatus::Broken)];
        let gaps = [gap("soc2", "CC6.1", &["encryption"], GapSeverity::Critical)];
        let frameworks = vec!["soc2".to_string()];
        let report = reporter().generate_report(input(&findings, &issues, &gaps, &frameworks));

        let ids: Vec<&str> = report.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["INC-0001", "INC-0002", "REF-0003", "GAP-0004"]);
        assert_eq!(report.policies_requiring_customization, 1);
        assert_eq!(report.critical_items, 1);
        assert_eq!(report.high_items, 2);
        assert_eq!(report.low_items, 1);
        assert_eq!(report.gaps_by_framework["soc2"], ["GAP-0004"]);
        assert_eq!(report.missing_policies, ["encryption"]);
        assert_eq!(report.items[0].framework.as_deref(), Some("soc2"));
        assert!(report.items.iter().all(|i| i.status == ItemStatus::Open));
    }

    #[test]
    fn reference_priority_follows_status() {
        let issues = [
            issue(ReferenceStatus::Broken),
            issue(ReferenceStatus::Deprecated),
        ];
        let report = reporter().generate_report(input(&[], &issues, &[], &[]));
        assert_eq!(report.items[0].priority, Priority::High);
        assert_eq!(report.items[1].priority, Priority::Medium);
        assert_eq!(report.items[1].estimated_effort, "30 minutes");
        assert_eq!(
            report.items[0].remediation,
            "Add missing policy 'ghost' or update reference"
        );
    }

    #[test]
    fn effort_table() {
        use RemediationCategory as C;
        assert_eq!(C::PolicyGap.estimated_effort(Priority::Critical), "4-8 hours");
        assert_eq!(C::IncompleteSection.estimated_effort(Priority::Low), "15-30 minutes");
        assert_eq!(C::PolicyGap.estimated_effort(Priority::Low), "1 hour");
        assert_eq!(C::BrokenReference.estimated_effort(Priority::Critical), "1 hour");
    }

    #[test]
    fn missing_policies_are_deduplicated() {
        let gaps = [
            gap("soc2", "CC6.1", &["encryption", "backup"], GapSeverity::High),
            gap("hipaa", "164.312", &["encryption"], GapSeverity::Medium),
        ];
        let report = reporter().generate_report(input(&[], &[], &gaps, &[]));
        assert_eq!(report.items.len(), 3);
        assert_eq!(report.missing_policies, ["backup", "encryption"]);
        assert_eq!(report.gaps_by_framework.len(), 2);
    }

    #[test]
    fn markdown_layout() {
        let findings = [finding("a", Priority::Low)];
        let gaps = [gap("soc2", "CC6.1", &["encryption"], GapSeverity::Critical)];
        let frameworks = vec!["soc2".to_string(), "hipaa".to_string()];
        let r = reporter();
        let md = r.to_markdown(&r.generate_report(input(&findings, &[], &gaps, &frameworks)));

        assert!(md.starts_with("# Compliance Remediation Report\n## Client: Acme Corp\n## Assessment Date: 2025-03-07\n"));
        assert!(md.contains("- **Target Frameworks:** soc2, hipaa"));
        let gap_row = md.find("| GAP-0002 | CRITICAL |").unwrap();
        let inc_row = md.find("| INC-0001 | LOW |").unwrap();
        assert!(gap_row < inc_row);
        assert!(md.contains("### SOC2\n\n- [ ] Missing policy: encryption (required for CC6.1)"));
        assert!(md.contains("## Missing Policies"));
        assert!(!md.contains("## Reference Issues"));
        assert!(md.contains("## Recommended Next Steps"));
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("ééééé", 2), "éé...");
    }
}
