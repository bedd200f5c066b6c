//! # Policies CLI
//!
//! ```bash
//! grc policies list --category access-control
//! grc policies validate --mode block
//! grc policies validate --report
//! ```

use anyhow::Result;
use clap::{Args, Subcommand};
use grc_core::title_case;
use grc_policy::{PolicyLibrary, ReferenceValidator, ValidationMode, ValidationResult};
use serde::Serialize;

use crate::config::AppConfig;
use crate::heading;
use crate::workspace::load_library;

/// Width of the `----` rule under category names.
const CATEGORY_RULE_WIDTH: usize = 40;

/// Policy subcommand arguments.
#[derive(Args, Debug)]
pub struct PoliciesArgs {
    #[command(subcommand)]
    pub command: PoliciesCommand,
}

#[derive(Subcommand, Debug)]
pub enum PoliciesCommand {
    /// List the policy library grouped by category.
    List {
        /// Only policies in this category (case-insensitive).
        #[arg(short, long)]
        category: Option<String>,

        /// Print id, title, and category as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Check metadata and cross-references of every policy.
    Validate {
        /// How to treat references to missing policies: warn, block, or auto.
        #[arg(long, default_value = "warn")]
        mode: ValidationMode,

        /// Also print the Markdown reference report.
        #[arg(long)]
        report: bool,
    },
}

#[derive(Debug, Serialize)]
struct ListEntry<'a> {
    id: &'a str,
    title: &'a str,
    category: &'a str,
}

/// Execute the policies subcommand.
pub fn run_policies(args: &PoliciesArgs, config: &AppConfig) -> Result<u8> {
    let library = load_library(config)?;
    match &args.command {
        PoliciesCommand::List { category, json } => {
            if *json {
                let entries: Vec<ListEntry<'_>> = library
                    .iter()
                    .filter(|p| matches_category(&p.category, category.as_deref()))
                    .map(|p| ListEntry {
                        id: &p.id,
                        title: &p.title,
                        category: &p.category,
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                println!("{}", render_list(&library, category.as_deref()));
            }
            Ok(0)
        }
        PoliciesCommand::Validate { mode, report } => {
            let (output, failed) = render_validation(&library, *mode);
            println!("{output}");
            if *report {
                println!("\n{}", ReferenceValidator::new(&library).generate_report());
            }
            Ok(u8::from(failed))
        }
    }
}

fn matches_category(category: &str, filter: Option<&str>) -> bool {
    filter.map_or(true, |wanted| category.eq_ignore_ascii_case(wanted))
}

pub fn render_list(library: &PolicyLibrary, category: Option<&str>) -> String {
    let mut groups = library.by_category();
    groups.retain(|name, _| matches_category(name, category));
    let total: usize = groups.values().map(Vec::len).sum();

    let mut out = heading(&format!("Policy Library ({total} policies)"));
    for (name, mut policies) in groups {
        policies.sort_by(|a, b| a.title.cmp(&b.title));
        out.push_str(&format!(
            "\n\n{} ({})\n{}",
            title_case(&name),
            policies.len(),
            "-".repeat(CATEGORY_RULE_WIDTH)
        ));
        for policy in policies {
            out.push_str(&format!("\n  {}", policy.id));
        }
    }
    out
}

/// Metadata and reference checks. Returns the output and whether any error
/// was found.
pub fn render_validation(library: &PolicyLibrary, mode: ValidationMode) -> (String, bool) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for policy in library.iter() {
        if policy.title.trim().is_empty() {
            errors.push(format!("{}: Missing title", policy.id));
        }
        if policy.category.trim().is_empty() {
            warnings.push(format!("{}: Missing category", policy.id));
        }
    }

    let references: ValidationResult = ReferenceValidator::new(library).validate_all(mode);
    errors.extend(references.errors.iter().cloned());
    warnings.extend(references.warnings.iter().cloned());

    let mut out = heading(&format!(
        "Validating {} policies (mode: {})...",
        library.len(),
        mode_name(mode)
    ));
    if !errors.is_empty() {
        out.push_str(&format!("\n\nErrors ({}):", errors.len()));
        for error in &errors {
            out.push_str(&format!("\n  [ERROR] {error}"));
        }
    }
    if !warnings.is_empty() {
        out.push_str(&format!("\n\nWarnings ({}):", warnings.len()));
        for warning in &warnings {
            out.push_str(&format!("\n  [WARN]  {warning}"));
        }
    }
    if !references.auto_include.is_empty() {
        out.push_str(&format!(
            "\n\nAuto-include ({}):",
            references.auto_include.len()
        ));
        for id in &references.auto_include {
            out.push_str(&format!("\n  + {id}"));
        }
    }

    let failed = !errors.is_empty();
    if failed {
        out.push_str(&format!(
            "\n\n[FAIL] Validation failed: {} errors in {} policies",
            errors.len(),
            library.len()
        ));
    } else {
        out.push_str(&format!(
            "\n\n[OK] Validation complete: {} policies checked",
            library.len()
        ));
    }
    (out, failed)
}

fn mode_name(mode: ValidationMode) -> &'static str {
    match mode {
        ValidationMode::Block => "block",
        ValidationMode::Warn => "warn",
        ValidationMode::AutoInclude => "auto",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::tests::fixture;

    fn library() -> PolicyLibrary {
        let dir = tempfile::tempdir().unwrap();
        load_library(&fixture(dir.path())).unwrap()
    }

    #[test]
    fn list_groups_by_category() {
        let out = render_list(&library(), None);
        assert!(out.contains("Policy Library (2 policies)"));
        assert!(out.contains(&format!("Security (2)\n{}", "-".repeat(40))));
        assert!(out.contains("  access-control\n  encryption"));
    }

    #[test]
    fn list_category_filter_ignores_case() {
        assert!(render_list(&library(), Some("SECURITY")).contains("(2 policies)"));
        assert!(render_list(&library(), Some("hr")).contains("(0 policies)"));
    }

    #[test]
    fn warn_mode_passes_with_broken_reference() {
        let (out, failed) = render_validation(&library(), ValidationMode::Warn);
        assert!(!failed);
        assert!(out.contains("[WARN]  Policy 'access-control' references non-existent policy 'incident-response'"));
        assert!(out.contains("[OK] Validation complete: 2 policies checked"));
    }

    #[test]
    fn block_mode_fails_with_broken_reference() {
        let (out, failed) = render_validation(&library(), ValidationMode::Block);
        assert!(failed);
        assert!(out.contains("[ERROR] Policy 'access-control' references non-existent policy 'incident-response'"));
        assert!(out.contains("[FAIL]"));
    }

    #[test]
    fn auto_mode_lists_inclusions() {
        let (out, failed) = render_validation(&library(), ValidationMode::AutoInclude);
        assert!(!failed);
        assert!(out.contains("Auto-include (1):\n  + incident-response"));
    }
}
