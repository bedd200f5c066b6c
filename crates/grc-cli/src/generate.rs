//! # Generate CLI
//!
//! Builds a client policy package and writes it as Markdown, together with
//! the table of contents, customization checklist, remediation report, and
//! `package.json` manifest.
//!
//! ```bash
//! grc generate "Acme Corp" -f soc2,hipaa
//! grc generate "Acme Corp" -f soc2 --size-tier small --employees 40 \
//!     --var CONTACT_EMAIL=security@acme.test --dry-run
//! ```

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use grc_compliance::GapAnalyzer;
use grc_core::ValidationError;
use grc_framework::ComplianceMapper;
use grc_package::{
    write_package, BuildOptions, ClientConfig, IncompletenessDetector, PackageBuilder,
    PackageManifest, PackageResult, RemediationInput, RemediationReport, RemediationReporter,
};
use grc_policy::{PolicyLibrary, ReferenceValidator, ValidationMode};
use grc_template::SizeTier;
use serde::Serialize;

use crate::config::AppConfig;
use crate::workspace::{available_policy_ids, load_library, load_mapper};

/// Width of the `----` rule under the generation banner.
const BANNER_RULE_WIDTH: usize = 50;

/// Warnings listed by a dry run.
const DRY_RUN_WARNINGS_SHOWN: usize = 5;

/// Generate subcommand arguments.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Client name, used for the package directory and as the default
    /// organization name.
    pub client: String,

    /// Comma-separated target framework IDs (e.g., soc2,hipaa).
    #[arg(short, long)]
    pub frameworks: Option<String>,

    /// Output directory. Defaults to the configured output directory.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Organization name (default: client name).
    #[arg(long)]
    pub org_name: Option<String>,

    /// Title of the security lead, e.g. CISO.
    #[arg(long)]
    pub cso_title: Option<String>,

    /// Industry, for conditional sections.
    #[arg(long)]
    pub industry: Option<String>,

    /// Organization size: solopreneur, small, medium, or enterprise.
    #[arg(long)]
    pub size_tier: Option<SizeTier>,

    /// Employee count, for conditional sections.
    #[arg(long)]
    pub employees: Option<u64>,

    /// Template variable, repeatable.
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// Include every policy regardless of framework.
    #[arg(long)]
    pub all_policies: bool,

    /// Preview what would be generated without creating files.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the manifest and remediation report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Parse `KEY=VALUE`. The value may be empty or contain further `=`.
pub fn parse_var(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(ValidationError::EmptyIdentifier {
            kind: "variable name",
        }
        .to_string());
    }
    Ok((key.to_string(), value.to_string()))
}

impl GenerateArgs {
    /// The client configuration these flags describe.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(self.client.clone());
        if let Some(list) = &self.frameworks {
            config.frameworks = crate::split_ids(list)
                .into_iter()
                .map(|id| id.to_lowercase())
                .collect();
        }
        config.variables.insert(
            "ORGANIZATION_NAME".to_string(),
            self.org_name.clone().unwrap_or_else(|| self.client.clone()),
        );
        if let Some(title) = &self.cso_title {
            config
                .variables
                .insert("CSO_TITLE".to_string(), title.clone());
        }
        config
            .variables
            .extend(self.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        if let Some(industry) = &self.industry {
            config.industry = industry.clone();
        }
        if let Some(tier) = self.size_tier {
            config.size_tier = tier;
        }
        if let Some(employees) = self.employees {
            config.employee_count = employees;
        }
        config
    }

    fn build_options(&self) -> BuildOptions {
        BuildOptions {
            include_all: self.all_policies,
            ..BuildOptions::default()
        }
    }
}

/// A built package and its remediation report.
#[derive(Debug)]
pub struct GeneratedPackage {
    pub result: PackageResult,
    pub report: RemediationReport,
    pub remediation_markdown: String,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    package: PackageManifest,
    remediation: &'a RemediationReport,
    output_dir: Option<PathBuf>,
}

/// Build the package for `client` and collect everything the remediation
/// report needs: customization findings on the rendered text, reference
/// issues of each included policy, and the open gaps of every target
/// framework.
pub fn generate_package(
    client: &ClientConfig,
    options: BuildOptions,
    mapper: &ComplianceMapper,
    library: &PolicyLibrary,
    available_policies: BTreeSet<String>,
    now: DateTime<Utc>,
) -> GeneratedPackage {
    let result = PackageBuilder::new(library, mapper).build_package_at(client, options, now);

    let detector = IncompletenessDetector::new(&client.frameworks);
    let findings: Vec<_> = result
        .policies
        .iter()
        .flat_map(|policy| detector.detect(&policy.id, &policy.content))
        .collect();

    let validator = ReferenceValidator::new(library);
    let reference_issues: Vec<_> = result
        .policies
        .iter()
        .flat_map(|policy| validator.validate_policy(&policy.id, ValidationMode::Warn).issues)
        .collect();

    let analyzer = GapAnalyzer::new(mapper, available_policies);
    let mut gaps = Vec::new();
    for framework_id in &client.frameworks {
        match analyzer.analyze_framework(framework_id) {
            Ok(report) => gaps.extend(report.open_gaps().cloned()),
            Err(e) => tracing::warn!(framework = %framework_id, error = %e, "no gap analysis"),
        }
    }

    let generated: Vec<String> = result.policies.iter().map(|p| p.id.clone()).collect();
    let reporter = RemediationReporter::at(now);
    let report = reporter.generate_report(RemediationInput {
        client_id: &client.slug(),
        client_name: &client.name,
        target_frameworks: &client.frameworks,
        generated_policies: &generated,
        findings: &findings,
        reference_issues: &reference_issues,
        gaps: &gaps,
    });
    let remediation_markdown = reporter.to_markdown(&report);

    GeneratedPackage {
        result,
        report,
        remediation_markdown,
    }
}

/// Execute the generate subcommand.
pub fn run_generate(args: &GenerateArgs, config: &AppConfig) -> Result<u8> {
    let mapper = load_mapper(config)?;
    let library = load_library(config)?;
    let available = available_policy_ids(config)?;
    let client = args.client_config();

    let package = generate_package(
        &client,
        args.build_options(),
        &mapper,
        &library,
        available,
        Utc::now(),
    );

    if !args.json {
        println!("{}", render_summary(args, &client, &package));
    }

    let output_dir = if args.dry_run {
        None
    } else {
        let base = args.output.clone().unwrap_or_else(|| config.output_dir.clone());
        let dir = write_package(&package.result, &base, Some(&package.remediation_markdown))
            .with_context(|| format!("writing package under {}", base.display()))?;
        Some(dir)
    };

    if args.json {
        let output = JsonOutput {
            package: PackageManifest::from_result(&package.result),
            remediation: &package.report,
            output_dir,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(0);
    }

    match output_dir {
        Some(dir) => {
            println!("\n[OK] Markdown exported: {}", dir.display());
            if !package.result.warnings.is_empty() {
                println!(
                    "\n[WARN]  {} warnings (missing cross-references)",
                    package.result.warnings.len()
                );
            }
        }
        None => {
            println!("\n[DRY RUN] No files created. Remove --dry-run to generate actual output.");
            if !package.result.warnings.is_empty() {
                println!(
                    "\n[WARN] {} warnings would be generated:",
                    package.result.warnings.len()
                );
                for warning in package.result.warnings.iter().take(DRY_RUN_WARNINGS_SHOWN) {
                    println!("  - {warning}");
                }
            }
        }
    }
    Ok(0)
}

pub fn render_summary(
    args: &GenerateArgs,
    client: &ClientConfig,
    package: &GeneratedPackage,
) -> String {
    let mode = if args.dry_run { "[DRY RUN] " } else { "" };
    let frameworks = if client.frameworks.is_empty() {
        "All".to_string()
    } else {
        client.frameworks.join(", ")
    };
    let report = &package.report;
    [
        format!("\n{mode}Generating policy package for: {}", client.name),
        format!("Frameworks: {frameworks}"),
        "-".repeat(BANNER_RULE_WIDTH),
        format!("Total policies: {}", package.result.total_policies),
        format!("Incomplete: {}", package.result.incomplete_count),
        format!(
            "Remediation items: {} (critical {}, high {}, medium {}, low {})",
            report.items.len(),
            report.critical_items,
            report.high_items,
            report.medium_items,
            report.low_items
        ),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use clap::Parser;

    use super::*;
    use crate::workspace::tests::fixture;

    #[derive(Parser, Debug)]
    struct Harness {
        #[command(flatten)]
        args: GenerateArgs,
    }

    fn parse(argv: &[&str]) -> GenerateArgs {
        let mut full = vec!["generate"];
        full.extend_from_slice(argv);
        Harness::try_parse_from(full).unwrap().args
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 7, 12, 0, 0).unwrap()
    }

    #[test]
    fn parse_var_splits_on_first_equals() {
        assert_eq!(
            parse_var("URL=https://x.test/?a=b").unwrap(),
            ("URL".to_string(), "https://x.test/?a=b".to_string())
        );
        assert_eq!(parse_var("EMPTY=").unwrap().1, "");
        assert!(parse_var("NOEQUALS").is_err());
        assert_eq!(
            parse_var(" =value").unwrap_err(),
            "variable name must be non-empty"
        );
    }

    #[test]
    fn flags_build_client_config() {
        let args = parse(&[
            "Acme Corp",
            "-f",
            "SOC2, hipaa",
            "--cso-title",
            "CISO",
            "--size-tier",
            "small",
            "--employees",
            "40",
            "--industry",
            "healthcare",
            "--var",
            "ORGANIZATION_NAME=Acme Holdings",
            "--var",
            "CONTACT_EMAIL=sec@acme.test",
        ]);
        let config = args.client_config();
        assert_eq!(config.name, "Acme Corp");
        assert_eq!(config.frameworks, ["soc2", "hipaa"]);
        assert_eq!(config.variables["ORGANIZATION_NAME"], "Acme Holdings");
        assert_eq!(config.variables["CSO_TITLE"], "CISO");
        assert_eq!(config.variables["CONTACT_EMAIL"], "sec@acme.test");
        assert_eq!(config.size_tier, SizeTier::Small);
        assert_eq!(config.employee_count, 40);
        assert_eq!(config.industry, "healthcare");
    }

    #[test]
    fn org_name_defaults_to_client() {
        let config = parse(&["Acme"]).client_config();
        assert_eq!(config.variables["ORGANIZATION_NAME"], "Acme");
        assert!(config.frameworks.is_empty());
    }

    #[test]
    fn invalid_size_tier_is_rejected() {
        let full = ["generate", "Acme", "--size-tier", "huge"];
        assert!(Harness::try_parse_from(full).is_err());
    }

    #[test]
    fn package_and_remediation_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture(dir.path());
        let mapper = load_mapper(&config).unwrap();
        let library = load_library(&config).unwrap();
        let client = parse(&["Acme Corp", "-f", "hipaa"]).client_config();

        let package = generate_package(
            &client,
            BuildOptions::default(),
            &mapper,
            &library,
            available_policy_ids(&config).unwrap(),
            now(),
        );

        assert_eq!(package.result.total_policies, 2);
        assert!(package
            .result
            .warnings
            .contains(&"Policy not found: audit-logging".to_string()));
        let categories: BTreeSet<String> = package
            .report
            .items
            .iter()
            .map(|item| item.category.to_string())
            .collect();
        assert!(categories.contains("incomplete_section"));
        assert!(categories.contains("broken_reference"));
        assert!(categories.contains("policy_gap"));
        assert_eq!(package.report.missing_policies, ["audit-logging"]);
        assert!(package
            .remediation_markdown
            .contains("## Client: Acme Corp"));
    }

    #[test]
    fn written_package_layout() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture(dir.path());
        let mapper = load_mapper(&config).unwrap();
        let library = load_library(&config).unwrap();
        let client = parse(&["Acme Corp", "-f", "soc2"]).client_config();
        let package = generate_package(
            &client,
            BuildOptions::default(),
            &mapper,
            &library,
            available_policy_ids(&config).unwrap(),
            now(),
        );

        let out = write_package(
            &package.result,
            &config.output_dir,
            Some(&package.remediation_markdown),
        )
        .unwrap();
        assert!(out.ends_with("acme_corp_policies_20250307"));
        let policy = std::fs::read_to_string(out.join("security_encryption.md")).unwrap();
        assert!(policy.starts_with("# Encryption Policy\n\nAcme Corp encrypts data."));
        assert!(out.join("REMEDIATION_REPORT.md").is_file());
    }

    #[test]
    fn summary_banner() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture(dir.path());
        let mapper = load_mapper(&config).unwrap();
        let library = load_library(&config).unwrap();
        let args = parse(&["Acme", "--dry-run"]);
        let client = args.client_config();
        let package = generate_package(
            &client,
            args.build_options(),
            &mapper,
            &library,
            BTreeSet::new(),
            now(),
        );
        let out = render_summary(&args, &client, &package);
        assert!(out.starts_with("\n[DRY RUN] Generating policy package for: Acme\nFrameworks: All\n"));
        assert!(out.contains("Total policies: 2"));
    }
}
