//! # Frameworks CLI
//!
//! ```bash
//! grc frameworks list
//! grc frameworks coverage soc2
//! grc frameworks gaps -f soc2,hipaa --limit 10
//! grc frameworks overlap -f soc2,hipaa,iso27001
//! ```

use anyhow::Result;
use clap::{Args, Subcommand};
use grc_compliance::{GapAnalyzer, GapReport, RemediationPriority};
use grc_framework::ComplianceMapper;

use crate::config::AppConfig;
use crate::heading;
use crate::workspace::{available_policy_ids, framework_selection, load_mapper};

/// Remediation entries shown by `frameworks gaps` unless `--limit` is given.
pub const DEFAULT_GAPS_LIMIT: usize = 15;

/// Missing policies listed under a coverage report.
const COVERAGE_MISSING_SHOWN: usize = 10;

/// Framework subcommand arguments.
#[derive(Args, Debug)]
pub struct FrameworksArgs {
    #[command(subcommand)]
    pub command: FrameworksCommand,
}

#[derive(Subcommand, Debug)]
pub enum FrameworksCommand {
    /// List every loaded framework.
    List {
        /// Print summaries as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Coverage of one framework by the policy library.
    Coverage {
        /// Framework ID (e.g., soc2, hipaa).
        framework_id: String,

        /// Print the gap report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Missing policies ranked across frameworks.
    Gaps {
        /// Comma-separated framework IDs. Defaults to every framework.
        #[arg(short, long)]
        frameworks: Option<String>,

        /// Maximum number of policies to list.
        #[arg(long, default_value_t = DEFAULT_GAPS_LIMIT)]
        limit: usize,

        /// Print the ranking as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Policies required by two or more of the given frameworks.
    Overlap {
        /// Comma-separated framework IDs (at least two).
        #[arg(short, long)]
        frameworks: String,

        /// Print the overlap as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Execute the frameworks subcommand.
pub fn run_frameworks(args: &FrameworksArgs, config: &AppConfig) -> Result<u8> {
    let mapper = load_mapper(config)?;
    match &args.command {
        FrameworksCommand::List { json } => {
            if *json {
                let summaries: Vec<_> = mapper
                    .framework_ids()
                    .iter()
                    .filter_map(|id| mapper.get_framework_summary(id))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else {
                println!("{}", render_list(&mapper));
            }
            Ok(0)
        }
        FrameworksCommand::Coverage { framework_id, json } => {
            let analyzer = GapAnalyzer::new(&mapper, available_policy_ids(config)?);
            match analyzer.analyze_framework(framework_id) {
                Ok(report) if *json => {
                    println!("{}", serde_json::to_string_pretty(&report.to_document())?);
                    Ok(0)
                }
                Ok(report) => {
                    println!("{}", render_coverage(&report));
                    Ok(0)
                }
                Err(e) => {
                    println!("Error: {e}");
                    Ok(1)
                }
            }
        }
        FrameworksCommand::Gaps {
            frameworks,
            limit,
            json,
        } => {
            let analyzer = GapAnalyzer::new(&mapper, available_policy_ids(config)?);
            let ids = framework_selection(&mapper, frameworks.as_deref());
            let priorities = analyzer.generate_remediation_priorities(&ids, *limit);
            if *json {
                println!("{}", serde_json::to_string_pretty(&priorities)?);
            } else {
                println!("{}", render_gaps(&priorities));
            }
            Ok(0)
        }
        FrameworksCommand::Overlap { frameworks, json } => {
            let ids = crate::split_ids(frameworks);
            if ids.len() < 2 {
                println!("Error: overlap needs at least two frameworks");
                return Ok(1);
            }
            let overlap = mapper.find_overlap(&ids);
            if *json {
                println!("{}", serde_json::to_string_pretty(&overlap)?);
            } else {
                println!("{}", render_overlap(&ids, &mapper));
            }
            Ok(0)
        }
    }
}

pub fn render_list(mapper: &ComplianceMapper) -> String {
    let mut out = heading("Available Compliance Frameworks");
    for (id, framework) in mapper.frameworks() {
        let Some(summary) = mapper.get_framework_summary(id) else {
            continue;
        };
        out.push_str(&format!(
            "\n\n{}: {}\n  Version: {}\n  Controls: {}\n  Required Policies: {}",
            id.to_uppercase(),
            framework.name,
            framework.version,
            summary.total_controls,
            summary.required_policies,
        ));
    }
    out
}

pub fn render_coverage(report: &GapReport) -> String {
    let mut lines = vec![
        heading(&format!("{} Coverage Analysis", report.framework_name)),
        format!("Total Controls: {}", report.total_controls),
        format!(
            "Fully Covered: {} ({:.1}%)",
            report.fully_covered_controls,
            report.overall_coverage * 100.0
        ),
        format!("Partially Covered: {}", report.partially_covered_controls),
        format!("Not Covered: {}", report.not_covered_controls),
        format!("Required Policies: {}", report.total_required_policies),
        format!("Missing Policies: {}", report.missing_policies),
    ];
    if !report.missing_policy_list.is_empty() {
        lines.push("\nMissing Policies:".to_string());
        for policy in report.missing_policy_list.iter().take(COVERAGE_MISSING_SHOWN) {
            lines.push(format!("  - {policy}"));
        }
    }
    lines.join("\n")
}

pub fn render_gaps(priorities: &[RemediationPriority]) -> String {
    let mut out = heading("Cross-Framework Gap Analysis");
    if priorities.is_empty() {
        out.push_str("\n\n[OK] No gaps found! All frameworks have 100% policy coverage.");
        return out;
    }
    out.push_str(&format!("\n\nTop {} policies to create:\n", priorities.len()));
    for (i, item) in priorities.iter().enumerate() {
        out.push_str(&format!(
            "\n{}. [{}] {}\n   Impacts: {} frameworks, {} controls",
            i + 1,
            item.priority.as_str().to_uppercase(),
            item.policy_id,
            item.frameworks_impacted,
            item.controls_impacted,
        ));
    }
    out
}

pub fn render_overlap(framework_ids: &[String], mapper: &ComplianceMapper) -> String {
    let overlap = mapper.find_overlap(framework_ids);
    let mut out = heading(&format!("Policy Overlap: {}", framework_ids.join(", ")));
    if overlap.is_empty() {
        out.push_str("\n\nNo policy is required by more than one of these frameworks.");
        return out;
    }
    out.push_str(&format!(
        "\n\n{} policies satisfy two or more frameworks:\n",
        overlap.len()
    ));
    for (policy, frameworks) in &overlap {
        let frameworks: Vec<&str> = frameworks.iter().map(String::as_str).collect();
        out.push_str(&format!("\n  {policy}: {}", frameworks.join(", ")));
    }
    out
}
