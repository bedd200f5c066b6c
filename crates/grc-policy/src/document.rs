//! # Policy Source Documents
//!
//! A policy source is Markdown that opens with a YAML frontmatter block:
//!
//! ```text
//! ---
//! id: access-control
//! title: Access Control Policy
//! category: access-control
//! frameworks:
//!   soc2: [CC6.1, CC6.2]
//! references: [password-management]
//! ---
//! {{ORGANIZATION_NAME}} restricts access ...
//! ```
//!
//! The frontmatter runs from the opening `---` to the next `---`; the body
//! is everything after it, trimmed.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use grc_core::de::null_as_default;
use grc_core::ValidationError;
use serde::{Deserialize, Serialize};

use crate::error::{PolicyError, PolicyResult};

/// Kind of policy document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
    #[default]
    Policy,
    Procedure,
    Plan,
    Agreement,
    Standard,
    Guideline,
}

/// Lifecycle status of a policy document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    Draft,
    #[default]
    Active,
    UnderReview,
    Deprecated,
    Archived,
}

impl PolicyType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Policy => "policy",
            Self::Procedure => "procedure",
            Self::Plan => "plan",
            Self::Agreement => "agreement",
            Self::Standard => "standard",
            Self::Guideline => "guideline",
        }
    }
}

impl FromStr for PolicyType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "policy" => Ok(Self::Policy),
            "procedure" => Ok(Self::Procedure),
            "plan" => Ok(Self::Plan),
            "agreement" => Ok(Self::Agreement),
            "standard" => Ok(Self::Standard),
            "guideline" => Ok(Self::Guideline),
            _ => Err(ValidationError::UnknownVariant {
                kind: "policy type",
                value: s.to_string(),
                expected: "policy, procedure, plan, agreement, standard, guideline",
            }),
        }
    }
}

impl PolicyStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Active => "active",
            Self::UnderReview => "under_review",
            Self::Deprecated => "deprecated",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for PolicyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "active" => Ok(Self::Active),
            "under_review" => Ok(Self::UnderReview),
            "deprecated" => Ok(Self::Deprecated),
            "archived" => Ok(Self::Archived),
            _ => Err(ValidationError::UnknownVariant {
                kind: "policy status",
                value: s.to_string(),
                expected: "draft, active, under_review, deprecated, archived",
            }),
        }
    }
}

/// Frontmatter fields as written.
#[derive(Debug, Default, Deserialize)]
struct Frontmatter {
    id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    category: String,
    #[serde(default, rename = "type")]
    policy_type: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    frameworks: BTreeMap<String, Vec<String>>,
    #[serde(default, deserialize_with = "null_as_default")]
    variables: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    references: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    requires_customization: Vec<String>,
}

/// Only the `id` key, so other malformed fields cannot move a policy's id.
#[derive(Debug, Default, Deserialize)]
struct IdOnly {
    id: Option<String>,
}

/// Parse an optional enum field, falling back to the default on an
/// unrecognized value.
fn lenient<T>(value: Option<&str>, field: &str, path: &Path) -> T
where
    T: FromStr<Err = ValidationError> + Default,
{
    let Some(raw) = value.filter(|v| !v.trim().is_empty()) else {
        return T::default();
    };
    raw.parse::<T>().unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), field, error = %e, "using default");
        T::default()
    })
}

/// A parsed policy source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicySource {
    pub id: String,
    pub title: String,
    pub category: String,
    pub policy_type: PolicyType,
    pub status: PolicyStatus,
    pub version: String,
    /// Static mapping: framework id → control ids this policy addresses.
    pub frameworks: BTreeMap<String, Vec<String>>,
    /// Template variables the body uses.
    pub variables: Vec<String>,
    /// Ids of other policies this one cites.
    pub references: Vec<String>,
    /// Free-text notes on what a client must tailor.
    pub requires_customization: Vec<String>,
    /// Template body, trimmed.
    pub body: String,
    pub path: PathBuf,
}

impl PolicySource {
    /// Whether the static mapping names `framework_id`.
    pub fn maps_to(&self, framework_id: &str) -> bool {
        self.frameworks.contains_key(framework_id)
    }
}

/// Split text into `(frontmatter, body)`, or `None` without a frontmatter block.
pub fn split_frontmatter(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix("---")?;
    let end = rest.find("---")?;
    Some((&rest[..end], rest[end + 3..].trim()))
}

/// Parse a policy source.
///
/// Returns `Ok(None)` when the text has no frontmatter block. The id falls
/// back to the file stem of `path`.
pub fn parse_policy(text: &str, path: &Path) -> PolicyResult<Option<PolicySource>> {
    let Some((header, body)) = split_frontmatter(text) else {
        return Ok(None);
    };
    let fm: Frontmatter =
        serde_yaml::from_str(header).map_err(|e| PolicyError::FrontmatterParse {
            path: path.to_path_buf(),
            source: e,
        })?;

    let id = declared_id(fm.id, path);
    let policy_type = lenient(fm.policy_type.as_deref(), "type", path);
    let status = lenient(fm.status.as_deref(), "status", path);

    Ok(Some(PolicySource {
        id,
        title: fm.title,
        category: fm.category,
        policy_type,
        status,
        version: fm.version,
        frameworks: fm.frameworks,
        variables: fm.variables,
        references: fm.references,
        requires_customization: fm.requires_customization,
        body: body.to_string(),
        path: path.to_path_buf(),
    }))
}

/// Policy id for a file: the frontmatter `id` when one parses, else the stem.
///
/// Reads only the `id` key, so it agrees with [`parse_policy`] whenever the
/// latter succeeds.
pub fn policy_id_for(text: &str, path: &Path) -> String {
    let declared = split_frontmatter(text)
        .and_then(|(header, _)| serde_yaml::from_str::<IdOnly>(header).ok())
        .and_then(|fm| fm.id);
    declared_id(declared, path)
}

fn declared_id(id: Option<String>, path: &Path) -> String {
    id.filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| file_stem(path))
}

pub(crate) fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
