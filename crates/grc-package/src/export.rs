//! Writing a built package to disk.
//!
//! Layout of `<output>/<client>_policies_<YYYYMMDD>/`:
//!
//! ```text
//! 00_TABLE_OF_CONTENTS.md
//! 00_CUSTOMIZATION_CHECKLIST.md
//! REMEDIATION_REPORT.md          (when a report is supplied)
//! <category>_<policy id>.md      (one per policy)
//! package.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::builder::{PackageResult, PolicyDocument};
use crate::error::{BuildResult, PackageError};
use crate::markdown::{generate_customization_checklist, generate_table_of_contents};

pub const TABLE_OF_CONTENTS_FILE: &str = "00_TABLE_OF_CONTENTS.md";
pub const CHECKLIST_FILE: &str = "00_CUSTOMIZATION_CHECKLIST.md";
pub const REMEDIATION_FILE: &str = "REMEDIATION_REPORT.md";
pub const MANIFEST_FILE: &str = "package.json";

/// `package.json` contents.
#[derive(Debug, Clone, Serialize)]
pub struct PackageManifest {
    pub client_name: String,
    pub generated_at: DateTime<Utc>,
    pub total_policies: usize,
    pub incomplete_count: usize,
    pub frameworks_covered: Vec<String>,
    pub warnings: Vec<String>,
    pub policies: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ManifestEntry {
    pub id: String,
    pub title: String,
    pub category: String,
    pub file: String,
    pub incomplete: bool,
}

impl PackageManifest {
    pub fn from_result(result: &PackageResult) -> Self {
        Self {
            client_name: result.client_name.clone(),
            generated_at: result.generated_at,
            total_policies: result.total_policies,
            incomplete_count: result.incomplete_count,
            frameworks_covered: result.frameworks_covered.clone(),
            warnings: result.warnings.clone(),
            policies: result
                .policies
                .iter()
                .map(|policy| ManifestEntry {
                    id: policy.id.clone(),
                    title: policy.title.clone(),
                    category: policy.category.clone(),
                    file: policy_file_name(policy),
                    incomplete: policy.is_incomplete(),
                })
                .collect(),
        }
    }
}

/// Directory name for a package: lowercased client name with spaces
/// replaced by underscores, then the generation date.
pub fn package_dir_name(result: &PackageResult) -> String {
    format!(
        "{}_policies_{}",
        result.client_name.to_lowercase().replace(' ', "_"),
        result.generated_at.format("%Y%m%d")
    )
}

/// `<category>_<id>.md`, with `/` in the id flattened to `_`.
pub fn policy_file_name(policy: &PolicyDocument) -> String {
    format!("{}_{}.md", policy.category, policy.id.replace('/', "_"))
}

/// Write every package file under `output_dir` and return the package
/// directory.
pub fn write_package(
    result: &PackageResult,
    output_dir: &Path,
    remediation_markdown: Option<&str>,
) -> BuildResult<PathBuf> {
    let package_dir = output_dir.join(package_dir_name(result));
    fs::create_dir_all(&package_dir).map_err(|source| PackageError::Io {
        path: package_dir.clone(),
        source,
    })?;

    write_file(
        &package_dir.join(TABLE_OF_CONTENTS_FILE),
        &generate_table_of_contents(result),
    )?;
    write_file(
        &package_dir.join(CHECKLIST_FILE),
        &generate_customization_checklist(result),
    )?;
    if let Some(markdown) = remediation_markdown {
        write_file(&package_dir.join(REMEDIATION_FILE), markdown)?;
    }

    for policy in &result.policies {
        write_file(
            &package_dir.join(policy_file_name(policy)),
            &format!("# {}\n\n{}", policy.title, policy.content),
        )?;
    }

    let manifest = serde_json::to_string_pretty(&PackageManifest::from_result(result))?;
    write_file(&package_dir.join(MANIFEST_FILE), &manifest)?;

    tracing::info!(
        path = %package_dir.display(),
        policies = result.policies.len(),
        "wrote policy package"
    );
    Ok(package_dir)
}

fn write_file(path: &Path, contents: &str) -> BuildResult<()> {
    fs::write(path, contents).map_err(|source| PackageError::Io {
        path: path.to_path_buf(),
        source,
    })
}
