//! # Package Generation End to End
//!
//! Frameworks and a policy library on disk, through the builder, the
//! detectors and the remediation reporter, to a package directory.

use std::collections::BTreeSet;
use std::path::Path;

use chrono::{DateTime, TimeZone, Utc};
use grc_compliance::GapAnalyzer;
use grc_core::Priority;
use grc_framework::{load_framework_str, ComplianceMapper};
use grc_package::{
    write_package, BuildOptions, ClientConfig, IncompletenessDetector, PackageBuilder,
    RemediationCategory, RemediationInput, RemediationReporter,
};
use grc_policy::{
    scan_policy_ids, PolicyLibrary, PolicyStatus, ReferenceStatus, ReferenceValidator,
    ValidationMode,
};

const SOC2: &str = r#"
framework:
  id: soc2
  name: SOC 2
categories:
  CC6:
    name: Logical Access
    criteria:
      CC6.1:
        name: Access Security
        policies_required: [access-control, encryption]
      CC7.3:
        name: Incident Evaluation
        policies_required: [incident-response]
"#;

const ACCESS_CONTROL: &str = "---\nid: access-control\ntitle: Access Control Policy\ncategory: security\nreferences: [encryption, incident-response]\n---\n\n# Purpose\n\n{{ORGANIZATION_NAME}} limits access.\n\n## Owner\n\n[ACTION REQUIRED: name the system owner]\n";

const ENCRYPTION: &str = "---\nid: encryption\ntitle: Encryption Policy\ncategory: security\n---\n\n{{ORGANIZATION_NAME}} encrypts data. Contact {{CONTACT_EMAIL}}.\n";

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 7, 9, 0, 0).unwrap()
}

fn mapper() -> ComplianceMapper {
    ComplianceMapper::from_frameworks(vec![
        load_framework_str(SOC2, Path::new("soc2.yaml")).unwrap()
    ])
}

fn library(root: &Path) -> PolicyLibrary {
    let security = root.join("security");
    std::fs::create_dir_all(&security).unwrap();
    std::fs::write(security.join("access-control.md"), ACCESS_CONTROL).unwrap();
    std::fs::write(security.join("encryption.md"), ENCRYPTION).unwrap();
    PolicyLibrary::load_dir(root).unwrap()
}

fn client() -> ClientConfig {
    let mut config = ClientConfig::new("Acme Health");
    config.frameworks = vec!["soc2".to_string()];
    config
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

#[test]
fn empty_library_builds_empty_package() {
    let mapper = mapper();
    let library = PolicyLibrary::new();
    let result = PackageBuilder::new(&library, &mapper).build_package_at(
        &client(),
        BuildOptions::default(),
        now(),
    );

    assert_eq!(result.total_policies, 0);
    assert!(result.policies.is_empty());
    assert_eq!(result.incomplete_count, 0);
    assert_eq!(
        result.warnings,
        [
            "Policy not found: access-control",
            "Policy not found: encryption",
            "Policy not found: incident-response",
        ]
    );
}

#[test]
fn build_renders_and_flags_policies() {
    let dir = tempfile::tempdir().unwrap();
    let mapper = mapper();
    let library = library(dir.path());
    let result = PackageBuilder::new(&library, &mapper).build_package_at(
        &client(),
        BuildOptions::default(),
        now(),
    );

    assert_eq!(result.total_policies, 2);
    assert_eq!(result.incomplete_count, 2);
    assert_eq!(result.frameworks_covered, ["soc2"]);
    assert_eq!(result.variables_applied["EFFECTIVE_DATE"], "March 07, 2025");
    // The framework requires incident-response, so the reference to it is
    // only reported as a missing policy.
    assert_eq!(result.warnings, ["Policy not found: incident-response"]);

    let access = &result.policies[0];
    assert_eq!(access.id, "access-control");
    assert!(access.content.contains("Acme Health limits access."));
    let encryption = &result.policies[1];
    assert!(encryption.content.contains("Contact [CONTACT_EMAIL]."));
}

#[test]
fn reference_warnings_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let mapper = mapper();
    let library = library(dir.path());
    let options = BuildOptions {
        include_all: true,
        validate_references: false,
    };
    let result = PackageBuilder::new(&library, &mapper).build_package_at(
        &ClientConfig::new("Acme"),
        options,
        now(),
    );
    assert_eq!(result.total_policies, 2);
    assert!(result.warnings.is_empty());
}

#[test]
fn loosely_written_frontmatter_keeps_one_id_everywhere() {
    let dir = tempfile::tempdir().unwrap();
    let security = dir.path().join("security");
    std::fs::create_dir_all(&security).unwrap();
    std::fs::write(
        security.join("ac.md"),
        "---\nid: access-control\ntitle: Access Control Policy\ncategory: security\nstatus: approved\ntype: template\nframeworks:\n  soc2: [CC6.1]\n  hipaa: [164.308]\n---\n\n{{ORGANIZATION_NAME}} limits access.\n",
    )
    .unwrap();

    let library = PolicyLibrary::load_dir(dir.path()).unwrap();
    let scanned = scan_policy_ids(dir.path()).unwrap();
    assert_eq!(scanned, library.ids());
    assert!(scanned.contains("access-control"));

    let source = library.get("access-control").unwrap();
    assert_eq!(source.status, PolicyStatus::Active);
    assert_eq!(source.frameworks["hipaa"], ["164.308"]);

    let mapper = mapper();
    let result = PackageBuilder::new(&library, &mapper).build_package_at(
        &client(),
        BuildOptions::default(),
        now(),
    );
    let ids: Vec<&str> = result.policies.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ["access-control"]);
    assert!(!result
        .warnings
        .contains(&"Policy not found: access-control".to_string()));

    let analyzer = GapAnalyzer::new(&mapper, scanned);
    let report = analyzer.analyze_framework("soc2").unwrap();
    let cc61 = report.gaps.iter().find(|g| g.control_id == "CC6.1").unwrap();
    assert!(cc61.available_policies.contains(&"access-control".to_string()));
}

// ---------------------------------------------------------------------------
// Remediation and export
// ---------------------------------------------------------------------------

#[test]
fn package_with_remediation_written_to_disk() {
    let lib_dir = tempfile::tempdir().unwrap();
    let out_dir = tempfile::tempdir().unwrap();
    let mapper = mapper();
    let library = library(lib_dir.path());
    let config = client();

    let result = PackageBuilder::new(&library, &mapper).build_package_at(
        &config,
        BuildOptions::default(),
        now(),
    );

    let detector = IncompletenessDetector::new(&config.frameworks);
    let findings: Vec<_> = result
        .policies
        .iter()
        .flat_map(|p| detector.detect(&p.id, &p.content))
        .collect();
    let validator = ReferenceValidator::new(&library);
    let issues: Vec<_> = result
        .policies
        .iter()
        .flat_map(|p| validator.validate_policy(&p.id, ValidationMode::Warn).issues)
        .collect();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].status, ReferenceStatus::Broken);

    let analyzer = GapAnalyzer::new(&mapper, library.ids());
    let report = analyzer.analyze_framework("soc2").unwrap();
    let gaps: Vec<_> = report.open_gaps().cloned().collect();

    let generated: Vec<String> = result.policies.iter().map(|p| p.id.clone()).collect();
    let reporter = RemediationReporter::at(now());
    let remediation = reporter.generate_report(RemediationInput {
        client_id: &config.slug(),
        client_name: &config.name,
        target_frameworks: &config.frameworks,
        generated_policies: &generated,
        findings: &findings,
        reference_issues: &issues,
        gaps: &gaps,
    });

    assert_eq!(remediation.policies_generated, 2);
    assert_eq!(remediation.missing_policies, ["incident-response"]);
    assert_eq!(remediation.gaps_by_framework["soc2"].len(), 1);
    let reference_item = remediation
        .items
        .iter()
        .find(|item| item.category == RemediationCategory::BrokenReference)
        .unwrap();
    assert_eq!(reference_item.id, format!("REF-{:04}", findings.len() + 1));
    assert_eq!(reference_item.priority, Priority::High);

    let markdown = reporter.to_markdown(&remediation);
    let package_dir = write_package(&result, out_dir.path(), Some(&markdown)).unwrap();
    assert_eq!(
        package_dir.file_name().unwrap().to_string_lossy(),
        "acme_health_policies_20250307"
    );

    let names: BTreeSet<String> = std::fs::read_dir(&package_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    let expected: BTreeSet<String> = [
        "00_CUSTOMIZATION_CHECKLIST.md",
        "00_TABLE_OF_CONTENTS.md",
        "REMEDIATION_REPORT.md",
        "package.json",
        "security_access-control.md",
        "security_encryption.md",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    assert_eq!(names, expected);

    let policy = std::fs::read_to_string(package_dir.join("security_access-control.md")).unwrap();
    assert!(policy.starts_with("# Access Control Policy\n\n"));

    let toc = std::fs::read_to_string(package_dir.join("00_TABLE_OF_CONTENTS.md")).unwrap();
    assert!(toc.starts_with("# Acme Health - Policy Package"));
    assert!(toc.contains("**⚠️ 2 policies require customization**"));

    let manifest: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(package_dir.join("package.json")).unwrap())
            .unwrap();
    assert_eq!(manifest["total_policies"], 2);
    assert_eq!(manifest["policies"][0]["file"], "security_access-control.md");
    assert_eq!(manifest["policies"][1]["incomplete"], true);
}
