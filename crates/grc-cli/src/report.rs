//! # Report CLI
//!
//! ```bash
//! grc report compliance
//! grc report compliance -f soc2,hipaa -o coverage.md
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use grc_compliance::GapAnalyzer;

use crate::config::AppConfig;
use crate::workspace::{available_policy_ids, framework_selection, load_mapper};

/// Report subcommand arguments.
#[derive(Args, Debug)]
pub struct ReportArgs {
    #[command(subcommand)]
    pub command: ReportCommand,
}

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    /// Markdown table of coverage per framework.
    Compliance {
        /// Comma-separated framework IDs. Defaults to every framework.
        #[arg(short, long)]
        frameworks: Option<String>,

        /// Write the report here instead of standard output.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Execute the report subcommand.
pub fn run_report(args: &ReportArgs, config: &AppConfig) -> Result<u8> {
    match &args.command {
        ReportCommand::Compliance { frameworks, output } => {
            let mapper = load_mapper(config)?;
            let analyzer = GapAnalyzer::new(&mapper, available_policy_ids(config)?);
            let ids = framework_selection(&mapper, frameworks.as_deref());
            let content = compliance_report(&analyzer, &ids, Utc::now());

            match output {
                Some(path) => {
                    std::fs::write(path, &content)
                        .with_context(|| format!("writing report: {}", path.display()))?;
                    println!("Report saved to: {}", path.display());
                }
                None => println!("{content}"),
            }
            Ok(0)
        }
    }
}

/// One summary row per known framework; unknown ids are left out.
pub fn compliance_report(
    analyzer: &GapAnalyzer<'_>,
    framework_ids: &[String],
    generated_at: DateTime<Utc>,
) -> String {
    let mut lines = vec![
        "# Compliance Coverage Report".to_string(),
        format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M")),
        String::new(),
        "## Summary".to_string(),
        String::new(),
        "| Framework | Controls | Coverage | Missing |".to_string(),
        "|-----------|----------|----------|---------|".to_string(),
    ];
    for id in framework_ids {
        match analyzer.analyze_framework(id) {
            Ok(report) => lines.push(format!(
                "| {} | {} | {:.0}% | {} |",
                report.framework_name,
                report.total_controls,
                report.overall_coverage * 100.0,
                report.missing_policies
            )),
            Err(e) => tracing::warn!(framework = %id, error = %e, "skipping framework in report"),
        }
    }
    lines.join("\n")
}
