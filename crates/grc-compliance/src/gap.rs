//! # Per-Control Gap Analysis
//!
//! Compares each control's required policies against the policy library a
//! client actually has. Every control yields a [`Gap`] (fully covered
//! controls included, with severity `none`), and the framework as a whole
//! yields a [`GapReport`] with category rollups.
//!
//! ## Design
//!
//! The analyzer borrows the mapper and owns a plain id set. It never
//! mutates either, so one analyzer can serve any number of reports.
//!
//! This report is deliberately separate from the mapper's coverage report:
//! `overall_coverage` here is a fraction, while category rollups and the
//! mapper's report use one-decimal percentages.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use grc_core::{percentage, round_to_tenth, GapSeverity};
use grc_framework::{ComplianceMapper, Control};
use serde::Serialize;

use crate::error::{ComplianceError, ComplianceResult};

/// Category label for controls with no `parent_category`.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Default number of entries from [`GapAnalyzer::get_priority_gaps`].
pub const DEFAULT_PRIORITY_GAP_LIMIT: usize = 10;

/// Coverage result for one control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Gap {
    pub framework_id: String,
    pub control_id: String,
    pub control_name: String,
    pub control_description: String,
    /// Distinct required policies, sorted.
    pub required_policies: Vec<String>,
    /// `required - library`, sorted.
    pub missing_policies: Vec<String>,
    /// `required ∩ library`, sorted.
    pub available_policies: Vec<String>,
    pub severity: GapSeverity,
    pub category: String,
}

impl Gap {
    fn for_control(framework_id: &str, control: &Control, library: &BTreeSet<String>) -> Self {
        let required = control.required_set();
        let (available, missing): (Vec<String>, Vec<String>) =
            required.iter().cloned().partition(|id| library.contains(id));
        let severity = GapSeverity::classify(required.len(), missing.len(), available.len());
        let category = if control.parent_category.is_empty() {
            control.parent_function.clone()
        } else {
            control.parent_category.clone()
        };

        Self {
            framework_id: framework_id.to_string(),
            control_id: control.id.clone(),
            control_name: control.name.clone(),
            control_description: control.description.clone(),
            required_policies: required.into_iter().collect(),
            missing_policies: missing,
            available_policies: available,
            severity,
            category,
        }
    }

    /// Share of required policies available; 1.0 when nothing is required.
    pub fn coverage_ratio(&self) -> f64 {
        if self.required_policies.is_empty() {
            return 1.0;
        }
        self.available_policies.len() as f64 / self.required_policies.len() as f64
    }

    pub fn is_fully_covered(&self) -> bool {
        self.missing_policies.is_empty()
    }

    fn is_partially_covered(&self) -> bool {
        !self.is_fully_covered() && !self.available_policies.is_empty()
    }

    fn is_not_covered(&self) -> bool {
        self.available_policies.is_empty() && !self.required_policies.is_empty()
    }
}

/// Rollup of the controls sharing one `parent_category`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryCoverage {
    pub total_controls: usize,
    pub fully_covered: usize,
    pub partially_covered: usize,
    pub not_covered: usize,
    /// Fully covered share, percent, one decimal.
    pub coverage_percentage: f64,
    /// Distinct required policies across the category.
    pub required_policies: usize,
    /// Distinct missing policies across the category.
    pub missing_policies: usize,
}

#[derive(Default)]
struct CategoryTally {
    total: usize,
    fully: usize,
    partially: usize,
    not_covered: usize,
    required: BTreeSet<String>,
    missing: BTreeSet<String>,
}

impl CategoryTally {
    fn add(&mut self, gap: &Gap) {
        self.total += 1;
        self.required.extend(gap.required_policies.iter().cloned());
        self.missing.extend(gap.missing_policies.iter().cloned());
        if gap.is_fully_covered() {
            self.fully += 1;
        } else if gap.is_partially_covered() {
            self.partially += 1;
        } else {
            self.not_covered += 1;
        }
    }

    fn finish(self) -> CategoryCoverage {
        CategoryCoverage {
            total_controls: self.total,
            fully_covered: self.fully,
            partially_covered: self.partially,
            not_covered: self.not_covered,
            coverage_percentage: percentage(self.fully, self.total),
            required_policies: self.required.len(),
            missing_policies: self.missing.len(),
        }
    }
}

/// Gap analysis of one framework against the policy library.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapReport {
    pub framework_id: String,
    pub framework_name: String,
    pub total_controls: usize,
    pub fully_covered_controls: usize,
    pub partially_covered_controls: usize,
    pub not_covered_controls: usize,
    /// Distinct policies required anywhere in the framework.
    pub total_required_policies: usize,
    /// How many of those the library has.
    pub available_policies: usize,
    /// How many of those the library lacks.
    pub missing_policies: usize,
    /// `fully_covered / total` as a fraction; 0.0 with no controls.
    pub overall_coverage: f64,
    /// Every control, sorted by severity then control id.
    pub gaps: Vec<Gap>,
    pub missing_policy_list: Vec<String>,
    pub category_coverage: BTreeMap<String, CategoryCoverage>,
}

/// Flattened counts of a [`GapReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapSummary {
    pub total_controls: usize,
    pub fully_covered_controls: usize,
    pub partially_covered_controls: usize,
    pub not_covered_controls: usize,
    pub total_required_policies: usize,
    pub available_policies: usize,
    pub missing_policies: usize,
    pub overall_coverage_percentage: f64,
}

/// One open gap in the exported form of a report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenGap {
    pub control_id: String,
    pub control_name: String,
    pub category: String,
    pub severity: GapSeverity,
    pub required_policies: Vec<String>,
    pub missing_policies: Vec<String>,
    pub coverage_ratio: f64,
}

/// The report as emitted by `grc frameworks gaps --json`: summary counts
/// plus only the gaps that are not fully covered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapReportDocument {
    pub framework_id: String,
    pub framework_name: String,
    pub summary: GapSummary,
    pub missing_policy_list: Vec<String>,
    pub category_coverage: BTreeMap<String, CategoryCoverage>,
    pub gaps: Vec<OpenGap>,
}

impl GapReport {
    pub fn summary(&self) -> GapSummary {
        GapSummary {
            total_controls: self.total_controls,
            fully_covered_controls: self.fully_covered_controls,
            partially_covered_controls: self.partially_covered_controls,
            not_covered_controls: self.not_covered_controls,
            total_required_policies: self.total_required_policies,
            available_policies: self.available_policies,
            missing_policies: self.missing_policies,
            overall_coverage_percentage: round_to_tenth(self.overall_coverage * 100.0),
        }
    }

    pub fn to_document(&self) -> GapReportDocument {
        GapReportDocument {
            framework_id: self.framework_id.clone(),
            framework_name: self.framework_name.clone(),
            summary: self.summary(),
            missing_policy_list: self.missing_policy_list.clone(),
            category_coverage: self.category_coverage.clone(),
            gaps: self
                .gaps
                .iter()
                .filter(|g| !g.is_fully_covered())
                .map(|g| OpenGap {
                    control_id: g.control_id.clone(),
                    control_name: g.control_name.clone(),
                    category: g.category.clone(),
                    severity: g.severity,
                    required_policies: g.required_policies.clone(),
                    missing_policies: g.missing_policies.clone(),
                    coverage_ratio: g.coverage_ratio(),
                })
                .collect(),
        }
    }

    /// Gaps with severity other than `none`, most severe first.
    pub fn open_gaps(&self) -> impl Iterator<Item = &Gap> {
        self.gaps.iter().filter(|g| !g.is_fully_covered())
    }
}

/// Gap analyzer over a mapper and a set of available policy ids.
#[derive(Debug, Clone)]
pub struct GapAnalyzer<'a> {
    mapper: &'a ComplianceMapper,
    library: BTreeSet<String>,
}

impl<'a> GapAnalyzer<'a> {
    pub fn new(mapper: &'a ComplianceMapper, library: BTreeSet<String>) -> Self {
        Self { mapper, library }
    }

    pub fn mapper(&self) -> &'a ComplianceMapper {
        self.mapper
    }

    pub fn library(&self) -> &BTreeSet<String> {
        &self.library
    }

    pub fn set_policy_library(&mut self, library: BTreeSet<String>) {
        self.library = library;
    }

    /// Replace the library with the ids of every `*.md` under `dir`.
    pub fn load_policy_library_from_dir(&mut self, dir: &Path) -> ComplianceResult<&BTreeSet<String>> {
        self.library = grc_policy::scan_policy_ids(dir)?;
        tracing::debug!(
            dir = %dir.display(),
            policies = self.library.len(),
            "loaded policy library for gap analysis"
        );
        Ok(&self.library)
    }

    /// Analyze one framework. Unknown ids are an error.
    pub fn analyze_framework(&self, framework_id: &str) -> ComplianceResult<GapReport> {
        let framework =
            self.mapper
                .get_framework(framework_id)
                .ok_or_else(|| ComplianceError::FrameworkNotFound {
                    framework_id: framework_id.to_string(),
                })?;

        let mut gaps = Vec::with_capacity(framework.controls.len());
        let mut all_required = BTreeSet::new();
        let mut all_missing = BTreeSet::new();
        let mut categories: BTreeMap<String, CategoryTally> = BTreeMap::new();

        for control in framework.controls.values() {
            let gap = Gap::for_control(framework_id, control, &self.library);
            all_required.extend(gap.required_policies.iter().cloned());
            all_missing.extend(gap.missing_policies.iter().cloned());

            let category = if control.parent_category.is_empty() {
                UNCATEGORIZED.to_string()
            } else {
                control.parent_category.clone()
            };
            categories.entry(category).or_default().add(&gap);
            gaps.push(gap);
        }

        gaps.sort_by(|a, b| {
            a.severity
                .rank()
                .cmp(&b.severity.rank())
                .then_with(|| a.control_id.cmp(&b.control_id))
        });

        let total_controls = gaps.len();
        let fully = gaps.iter().filter(|g| g.is_fully_covered()).count();
        let partially = gaps.iter().filter(|g| g.is_partially_covered()).count();
        let not_covered = gaps.iter().filter(|g| g.is_not_covered()).count();
        let available = all_required.iter().filter(|id| self.library.contains(*id)).count();

        Ok(GapReport {
            framework_id: framework_id.to_string(),
            framework_name: framework.name.clone(),
            total_controls,
            fully_covered_controls: fully,
            partially_covered_controls: partially,
            not_covered_controls: not_covered,
            total_required_policies: all_required.len(),
            available_policies: available,
            missing_policies: all_missing.len(),
            overall_coverage: if total_controls == 0 {
                0.0
            } else {
                fully as f64 / total_controls as f64
            },
            gaps,
            missing_policy_list: all_missing.into_iter().collect(),
            category_coverage: categories
                .into_iter()
                .map(|(name, tally)| (name, tally.finish()))
                .collect(),
        })
    }

    /// Analyze several frameworks; unknown ids are logged and skipped.
    pub fn analyze_multiple_frameworks<S: AsRef<str>>(
        &self,
        framework_ids: &[S],
    ) -> BTreeMap<String, GapReport> {
        let mut reports = BTreeMap::new();
        for id in framework_ids {
            let id = id.as_ref();
            match self.analyze_framework(id) {
                Ok(report) => {
                    reports.insert(id.to_string(), report);
                }
                Err(e) => tracing::warn!(framework = %id, error = %e, "skipping framework"),
            }
        }
        reports
    }

    /// The first `limit` open gaps of a framework, most severe first.
    pub fn get_priority_gaps(&self, framework_id: &str, limit: usize) -> ComplianceResult<Vec<Gap>> {
        let report = self.analyze_framework(framework_id)?;
        Ok(report.open_gaps().take(limit).cloned().collect())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use grc_framework::Framework;

    pub(crate) fn control(id: &str, category: &str, required: &[&str]) -> Control {
        Control {
            id: id.to_string(),
            name: format!("Control {id}"),
            description: String::new(),
            policies_required: required.iter().map(|s| s.to_string()).collect(),
            policies_recommended: Vec::new(),
            evidence_types: Vec::new(),
            parent_category: category.to_string(),
            parent_function: String::new(),
        }
    }

    pub(crate) fn framework(id: &str, controls: Vec<Control>) -> Framework {
        Framework {
            id: id.to_string(),
            name: id.to_uppercase(),
            version: "1".to_string(),
            release_date: String::new(),
            authority: String::new(),
            url: String::new(),
            controls: controls.into_iter().map(|c| (c.id.clone(), c)).collect(),
        }
    }

    pub(crate) fn library(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn mapper() -> ComplianceMapper {
        ComplianceMapper::from_frameworks(vec![framework(
            "iso27001",
            vec![
                control("A.5.1", "Organizational", &["p1", "p2", "p3"]),
                control("A.5.2", "Organizational", &["p1"]),
                control("A.8.1", "Technological", &["p1", "p2"]),
                control("A.8.2", "Technological", &["p4"]),
                control("A.9.9", "", &[]),
            ],
        )])
    }

    #[test]
    fn severity_and_sort_order() {
        let mapper = mapper();
        let analyzer = GapAnalyzer::new(&mapper, library(&["p1"]));
        let report = analyzer.analyze_framework("iso27001").unwrap();

        let order: Vec<(&str, GapSeverity)> = report
            .gaps
            .iter()
            .map(|g| (g.control_id.as_str(), g.severity))
            .collect();
        assert_eq!(
            order,
            vec![
                ("A.8.2", GapSeverity::Critical),
                ("A.5.1", GapSeverity::High),
                ("A.8.1", GapSeverity::Medium),
                ("A.5.2", GapSeverity::None),
                ("A.9.9", GapSeverity::None),
            ]
        );
    }

    #[test]
    fn report_counts() {
        let mapper = mapper();
        let analyzer = GapAnalyzer::new(&mapper, library(&["p1"]));
        let report = analyzer.analyze_framework("iso27001").unwrap();

        assert_eq!(report.total_controls, 5);
        assert_eq!(report.fully_covered_controls, 2);
        assert_eq!(report.partially_covered_controls, 2);
        assert_eq!(report.not_covered_controls, 1);
        assert_eq!(report.total_required_policies, 4);
        assert_eq!(report.available_policies, 1);
        assert_eq!(report.missing_policies, 3);
        assert_eq!(report.missing_policy_list, vec!["p2", "p3", "p4"]);
        assert!((report.overall_coverage - 0.4).abs() < 1e-9);
        assert_eq!(report.summary().overall_coverage_percentage, 40.0);
    }

    #[test]
    fn category_rollup() {
        let mapper = mapper();
        let analyzer = GapAnalyzer::new(&mapper, library(&["p1"]));
        let report = analyzer.analyze_framework("iso27001").unwrap();

        let org = &report.category_coverage["Organizational"];
        assert_eq!(org.total_controls, 2);
        assert_eq!(org.fully_covered, 1);
        assert_eq!(org.partially_covered, 1);
        assert_eq!(org.coverage_percentage, 50.0);
        assert_eq!(org.required_policies, 3);
        assert_eq!(org.missing_policies, 2);

        let tech = &report.category_coverage["Technological"];
        assert_eq!(tech.not_covered, 1);

        assert_eq!(report.category_coverage[UNCATEGORIZED].fully_covered, 1);
    }

    #[test]
    fn coverage_ratio_and_full_coverage() {
        let gap = Gap::for_control("x", &control("1.2", "c", &["a", "b"]), &library(&["a"]));
        assert!((gap.coverage_ratio() - 0.5).abs() < 1e-9);
        assert!(!gap.is_fully_covered());

        let empty = Gap::for_control("x", &control("1.3", "c", &[]), &library(&[]));
        assert_eq!(empty.coverage_ratio(), 1.0);
        assert!(empty.is_fully_covered());
        assert_eq!(empty.severity, GapSeverity::None);
    }

    #[test]
    fn category_falls_back_to_function() {
        let mut c = control("ID.AM-1", "", &["asset"]);
        c.parent_function = "Identify".to_string();
        let gap = Gap::for_control("nist_csf", &c, &library(&[]));
        assert_eq!(gap.category, "Identify");
    }

    #[test]
    fn unknown_framework_is_an_error() {
        let mapper = mapper();
        let analyzer = GapAnalyzer::new(&mapper, BTreeSet::new());
        let err = analyzer.analyze_framework("nope").unwrap_err();
        assert!(matches!(err, ComplianceError::FrameworkNotFound { .. }));
    }

    #[test]
    fn multiple_frameworks_skip_unknown() {
        let mapper = mapper();
        let analyzer = GapAnalyzer::new(&mapper, BTreeSet::new());
        let reports = analyzer.analyze_multiple_frameworks(&["iso27001", "nope"]);
        assert_eq!(reports.keys().collect::<Vec<_>>(), vec!["iso27001"]);
    }

    #[test]
    fn priority_gaps_exclude_covered() {
        let mapper = mapper();
        let analyzer = GapAnalyzer::new(&mapper, library(&["p1"]));
        let gaps = analyzer.get_priority_gaps("iso27001", DEFAULT_PRIORITY_GAP_LIMIT).unwrap();
        assert_eq!(gaps.len(), 3);
        assert_eq!(analyzer.get_priority_gaps("iso27001", 1).unwrap().len(), 1);
    }

    #[test]
    fn document_drops_covered_gaps() {
        let mapper = mapper();
        let analyzer = GapAnalyzer::new(&mapper, library(&["p1"]));
        let doc = analyzer.analyze_framework("iso27001").unwrap().to_document();
        assert_eq!(doc.gaps.len(), 3);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["gaps"][0]["severity"], "critical");
        assert_eq!(json["summary"]["overall_coverage_percentage"], 40.0);
    }

    #[test]
    fn empty_framework_has_zero_coverage() {
        let mapper = ComplianceMapper::from_frameworks(vec![framework("empty", vec![])]);
        let analyzer = GapAnalyzer::new(&mapper, BTreeSet::new());
        let report = analyzer.analyze_framework("empty").unwrap();
        assert_eq!(report.overall_coverage, 0.0);
        assert!(report.gaps.is_empty());
    }

    #[test]
    fn library_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("p1.md"), "# no frontmatter").unwrap();
        std::fs::write(
            dir.path().join("other.md"),
            "---\nid: p2\ntitle: Two\n---\nbody",
        )
        .unwrap();

        let mapper = mapper();
        let mut analyzer = GapAnalyzer::new(&mapper, BTreeSet::new());
        let ids = analyzer.load_policy_library_from_dir(dir.path()).unwrap();
        assert_eq!(ids, &library(&["p1", "p2"]));

        let report = analyzer.analyze_framework("iso27001").unwrap();
        assert_eq!(report.available_policies, 2);
    }

    #[test]
    fn missing_library_dir_is_an_error() {
        let mapper = mapper();
        let mut analyzer = GapAnalyzer::new(&mapper, BTreeSet::new());
        let err = analyzer
            .load_policy_library_from_dir(Path::new("/definitely/not/here"))
            .unwrap_err();
        assert!(matches!(err, ComplianceError::PolicyLibrary(_)));
    }
}
