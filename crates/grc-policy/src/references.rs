//! # Cross-Reference Validation
//!
//! Policies cite each other through the frontmatter `references` list. The
//! validator checks those citations against the library: a citation of a
//! policy that does not exist is *broken*, a citation of a policy whose
//! status is `deprecated` is flagged, and reference cycles are reported as
//! chains (`a -> b -> a`).
//!
//! How broken references are treated depends on [`ValidationMode`]: they
//! block generation, are carried as warnings, or are queued for automatic
//! inclusion.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::str::FromStr;

use grc_core::ValidationError;
use serde::Serialize;

use crate::document::PolicyStatus;
use crate::library::PolicyLibrary;

/// How to treat broken references.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Broken references are errors.
    Block,
    /// Broken references are warnings.
    #[default]
    Warn,
    /// Broken references are queued for inclusion.
    #[serde(rename = "auto")]
    AutoInclude,
}

impl FromStr for ValidationMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "block" => Ok(Self::Block),
            "warn" => Ok(Self::Warn),
            "auto" | "auto_include" => Ok(Self::AutoInclude),
            _ => Err(ValidationError::UnknownVariant {
                kind: "validation mode",
                value: s.to_string(),
                expected: "block, warn, auto",
            }),
        }
    }
}

/// What is wrong with a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceStatus {
    Broken,
    Deprecated,
    Circular,
}

impl fmt::Display for ReferenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Broken => "broken",
            Self::Deprecated => "deprecated",
            Self::Circular => "circular",
        })
    }
}

/// Whether an issue blocks or merely warns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueLevel {
    Warning,
    Error,
}

/// One problem with one reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceIssue {
    pub source_policy: String,
    pub referenced_policy: String,
    pub status: ReferenceStatus,
    pub message: String,
    pub level: IssueLevel,
}

/// Outcome of validating one policy or the whole library.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub issues: Vec<ReferenceIssue>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    /// Missing policies to pull in (auto mode), sorted and distinct.
    pub auto_include: Vec<String>,
    pub circular_chains: Vec<Vec<String>>,
}

impl ValidationResult {
    fn valid() -> Self {
        Self {
            is_valid: true,
            issues: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            auto_include: Vec::new(),
            circular_chains: Vec::new(),
        }
    }

    /// Generation should stop.
    pub fn blocked(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Reference graph over a policy library.
#[derive(Debug, Clone, Default)]
pub struct ReferenceValidator {
    graph: BTreeMap<String, BTreeSet<String>>,
    deprecated: BTreeSet<String>,
}

impl ReferenceValidator {
    pub fn new(library: &PolicyLibrary) -> Self {
        let mut validator = Self::default();
        for policy in library.iter() {
            validator
                .graph
                .insert(policy.id.clone(), policy.references.iter().cloned().collect());
            if policy.status == PolicyStatus::Deprecated {
                validator.deprecated.insert(policy.id.clone());
            }
        }
        validator
    }

    /// Check the references of one policy.
    pub fn validate_policy(&self, policy_id: &str, mode: ValidationMode) -> ValidationResult {
        let mut result = ValidationResult::valid();
        let Some(references) = self.graph.get(policy_id) else {
            result.errors.push(format!("Policy not found: {policy_id}"));
            result.is_valid = false;
            return result;
        };

        for target in references {
            let Some(issue) = self.check_reference(policy_id, target, mode) else {
                continue;
            };
            match issue.status {
                ReferenceStatus::Broken => match mode {
                    ValidationMode::Block => {
                        result.errors.push(issue.message.clone());
                        result.is_valid = false;
                    }
                    ValidationMode::AutoInclude => {
                        result.auto_include.push(target.clone());
                        result.warnings.push(format!("Will auto-include: {target}"));
                    }
                    ValidationMode::Warn => result.warnings.push(issue.message.clone()),
                },
                ReferenceStatus::Deprecated => result.warnings.push(issue.message.clone()),
                ReferenceStatus::Circular => {
                    result.errors.push(issue.message.clone());
                    result.is_valid = false;
                }
            }
            result.issues.push(issue);
        }
        result
    }

    /// Check every policy, including reference cycles.
    pub fn validate_all(&self, mode: ValidationMode) -> ValidationResult {
        let mut result = ValidationResult::valid();

        let chains = self.find_circular_references();
        if !chains.is_empty() {
            for chain in &chains {
                let rendered = chain.join(" -> ");
                result.issues.push(ReferenceIssue {
                    source_policy: chain.first().cloned().unwrap_or_default(),
                    referenced_policy: chain.last().cloned().unwrap_or_default(),
                    status: ReferenceStatus::Circular,
                    message: format!("Circular reference detected: {rendered}"),
                    level: IssueLevel::Error,
                });
                result.errors.push(format!("Circular reference: {rendered}"));
            }
            result.circular_chains = chains;
            result.is_valid = false;
        }

        for policy_id in self.graph.keys() {
            let policy_result = self.validate_policy(policy_id, mode);
            result.is_valid &= policy_result.is_valid;
            result.issues.extend(policy_result.issues);
            result.warnings.extend(policy_result.warnings);
            result.errors.extend(policy_result.errors);
            result.auto_include.extend(policy_result.auto_include);
        }

        result.auto_include.sort();
        result.auto_include.dedup();
        result
    }

    fn check_reference(&self, source: &str, target: &str, mode: ValidationMode) -> Option<ReferenceIssue> {
        if !self.graph.contains_key(target) {
            return Some(ReferenceIssue {
                source_policy: source.to_string(),
                referenced_policy: target.to_string(),
                status: ReferenceStatus::Broken,
                message: format!("Policy '{source}' references non-existent policy '{target}'"),
                level: if mode == ValidationMode::Block {
                    IssueLevel::Error
                } else {
                    IssueLevel::Warning
                },
            });
        }
        if self.deprecated.contains(target) {
            return Some(ReferenceIssue {
                source_policy: source.to_string(),
                referenced_policy: target.to_string(),
                status: ReferenceStatus::Deprecated,
                message: format!("Policy '{source}' references deprecated policy '{target}'"),
                level: IssueLevel::Warning,
            });
        }
        None
    }

    /// Every reference cycle found by depth-first search, as closed chains.
    pub fn find_circular_references(&self) -> Vec<Vec<String>> {
        let mut search = CycleSearch::default();
        for node in self.graph.keys() {
            if !search.visited.contains(node) {
                search.visit(node, &self.graph);
            }
        }
        search.chains
    }

    /// Policies cited by `policy_id`, optionally following citations onward.
    pub fn get_all_references(&self, policy_id: &str, transitive: bool) -> BTreeSet<String> {
        let Some(direct) = self.graph.get(policy_id) else {
            return BTreeSet::new();
        };
        if !transitive {
            return direct.clone();
        }

        let mut all = direct.clone();
        let mut queue: VecDeque<&String> = direct.iter().collect();
        while let Some(current) = queue.pop_front() {
            if let Some(next) = self.graph.get(current) {
                for reference in next {
                    if reference != policy_id && all.insert(reference.clone()) {
                        queue.push_back(reference);
                    }
                }
            }
        }
        all
    }

    /// Policies that cite `policy_id`.
    pub fn get_dependents(&self, policy_id: &str) -> BTreeSet<String> {
        self.graph
            .iter()
            .filter(|(_, refs)| refs.contains(policy_id))
            .map(|(source, _)| source.clone())
            .collect()
    }

    /// Library policies no other policy cites.
    pub fn get_orphaned_policies(&self) -> BTreeSet<String> {
        let referenced = self.referenced();
        self.graph
            .keys()
            .filter(|id| !referenced.contains(*id))
            .cloned()
            .collect()
    }

    /// Cited policies that are not in the library.
    pub fn get_missing_policies(&self) -> BTreeSet<String> {
        self.referenced()
            .into_iter()
            .filter(|id| !self.graph.contains_key(id))
            .collect()
    }

    fn referenced(&self) -> BTreeSet<String> {
        self.graph.values().flatten().cloned().collect()
    }

    /// Markdown summary of missing, circular, and orphaned policies.
    pub fn generate_report(&self) -> String {
        let orphaned = self.get_orphaned_policies();
        let missing = self.get_missing_policies();
        let circular = self.find_circular_references();

        let mut lines = vec![
            "# Policy Reference Validation Report".to_string(),
            String::new(),
            "## Summary".to_string(),
            format!("- Total policies: {}", self.graph.len()),
            format!("- Orphaned policies (never referenced): {}", orphaned.len()),
            format!(
                "- Missing policies (referenced but don't exist): {}",
                missing.len()
            ),
            format!("- Circular reference chains: {}", circular.len()),
            String::new(),
        ];

        if !missing.is_empty() {
            lines.push("## Missing Policies".to_string());
            lines.push("These policies are referenced but don't exist:".to_string());
            for id in &missing {
                let dependents: Vec<String> = self.get_dependents(id).into_iter().collect();
                lines.push(format!(
                    "- **{id}** (referenced by: {})",
                    dependents.join(", ")
                ));
            }
            lines.push(String::new());
        }

        if !circular.is_empty() {
            lines.push("## Circular References".to_string());
            for chain in &circular {
                lines.push(format!("- {}", chain.join(" -> ")));
            }
            lines.push(String::new());
        }

        if !orphaned.is_empty() {
            lines.push("## Orphaned Policies".to_string());
            lines.push("These policies are never referenced by any other policy:".to_string());
            for id in &orphaned {
                lines.push(format!("- {id}"));
            }
            lines.push(String::new());
        }

        lines.join("\n")
    }
}

#[derive(Default)]
struct CycleSearch {
    visited: BTreeSet<String>,
    on_stack: BTreeSet<String>,
    path: Vec<String>,
    chains: Vec<Vec<String>>,
}

impl CycleSearch {
    fn visit(&mut self, node: &str, graph: &BTreeMap<String, BTreeSet<String>>) {
        if self.on_stack.contains(node) {
            if let Some(start) = self.path.iter().position(|p| p == node) {
                let mut chain = self.path[start..].to_vec();
                chain.push(node.to_string());
                self.chains.push(chain);
            }
            return;
        }
        if !self.visited.insert(node.to_string()) {
            return;
        }
        self.on_stack.insert(node.to_string());
        self.path.push(node.to_string());

        if let Some(neighbors) = graph.get(node) {
            for next in neighbors {
                self.visit(next, graph);
            }
        }

        self.path.pop();
        self.on_stack.remove(node);
    }
}
