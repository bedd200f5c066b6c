//! Diagnostics for rendered policy text that still needs an operator's
//! attention.

use std::collections::BTreeSet;

use grc_core::Priority;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static UNREPLACED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([A-Z_]+)\}\}").expect("valid regex"));
static ACTION_REQUIRED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[ACTION REQUIRED[^\]]*\]").expect("valid regex"));
static TODO_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[TODO[^\]]*\]").expect("valid regex"));

/// What kind of leftover was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncompleteKind {
    /// `{{VAR}}` tokens that survived rendering.
    UnreplacedVariables,
    /// Variables the engine rendered as `[VAR]` placeholders.
    UnresolvedVariables,
    /// `[ACTION REQUIRED ...]` markers.
    ActionRequired,
    /// `[TODO ...]` markers.
    Todo,
}

impl IncompleteKind {
    pub fn severity(self) -> Priority {
        match self {
            Self::Todo => Priority::Medium,
            _ => Priority::High,
        }
    }
}

/// One diagnostic on a rendered policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncompleteSection {
    #[serde(rename = "type")]
    pub kind: IncompleteKind,
    /// Variable names or marker text, depending on `kind`.
    pub items: Vec<String>,
    pub severity: Priority,
}

impl IncompleteSection {
    fn new(kind: IncompleteKind, items: Vec<String>) -> Self {
        Self {
            kind,
            items,
            severity: kind.severity(),
        }
    }
}

/// Scan rendered `content`; `unresolved` is the engine's placeholder list.
pub fn detect_incomplete_sections(content: &str, unresolved: &[String]) -> Vec<IncompleteSection> {
    let mut found = Vec::new();

    let unreplaced: BTreeSet<String> = UNREPLACED
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .collect();
    if !unreplaced.is_empty() {
        found.push(IncompleteSection::new(
            IncompleteKind::UnreplacedVariables,
            unreplaced.into_iter().collect(),
        ));
    }

    if !unresolved.is_empty() {
        found.push(IncompleteSection::new(
            IncompleteKind::UnresolvedVariables,
            unresolved.to_vec(),
        ));
    }

    for (kind, pattern) in [
        (IncompleteKind::ActionRequired, &ACTION_REQUIRED),
        (IncompleteKind::Todo, &TODO_MARKER),
    ] {
        let markers: Vec<String> = pattern
            .find_iter(content)
            .map(|m| m.as_str().to_string())
            .collect();
        if !markers.is_empty() {
            found.push(IncompleteSection::new(kind, markers));
        }
    }

    found
}
