//! # grc-cli — Command-Line Interface for the GRC Stack
//!
//! Provides the `grc` binary: a thin front-end over the framework, policy,
//! compliance, template, and package crates.
//!
//! ## Subcommands
//!
//! - `grc frameworks` — list frameworks, coverage, cross-framework gaps, overlap.
//! - `grc policies` — list the policy library, validate cross-references.
//! - `grc report compliance` — Markdown coverage summary.
//! - `grc generate` — build and write a client policy package.
//!
//! ```bash
//! grc frameworks coverage soc2
//! grc frameworks gaps -f soc2,hipaa
//! grc policies validate --mode block
//! grc generate "Acme Corp" -f soc2,hipaa --var CONTACT_EMAIL=security@acme.test
//! ```
//!
//! ## Crate Policy
//!
//! - Argument parsing lives beside each handler; handlers delegate to the
//!   domain crates and only format output.
//! - Handlers return `anyhow::Result<u8>`; the entry point maps the code to
//!   the process exit status.

pub mod config;
pub mod frameworks;
pub mod generate;
pub mod policies;
pub mod report;
pub mod workspace;

use std::path::{Path, PathBuf};

/// Directory whose presence marks the project root.
pub const ROOT_MARKER: &str = "policies";

/// Width of the `====` rule under section titles.
pub(crate) const RULE_WIDTH: usize = 60;

/// Resolve a path that may be relative to the project root.
///
/// If the path is absolute, returns it as-is. If relative and it exists
/// relative to `root`, uses that. Otherwise returns the path relative to
/// the current directory.
pub fn resolve_path(path: &Path, root: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    let root_relative = root.join(path);
    if root_relative.exists() {
        root_relative
    } else {
        path.to_path_buf()
    }
}

/// Walk up from `start` to the nearest directory containing `policies/`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut dir = start;
    loop {
        if dir.join(ROOT_MARKER).is_dir() {
            return Some(dir.to_path_buf());
        }
        dir = dir.parent()?;
    }
}

/// Split a comma-separated id list, trimming and dropping empty entries.
pub fn split_ids(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// `title\n====...` with a leading blank line.
pub(crate) fn heading(title: &str) -> String {
    format!("\n{title}\n{}", "=".repeat(RULE_WIDTH))
}
