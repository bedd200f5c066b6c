//! # Compliance Mapper
//!
//! Owns the framework registry and the derived policy → framework → controls
//! index.
//!
//! ## Design
//!
//! The index is never patched in place. Whenever the registry changes it is
//! recomputed from the full framework set by [`rebuild_index`], so reloading
//! or replacing a framework cannot leave stale entries behind. Queries take
//! `&self` and never fail: unknown ids produce empty results (or an explicit
//! not-found coverage report).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};

use crate::coverage::{framework_coverage, CoverageReport};
use crate::error::{FrameworkError, FrameworkResult};
use crate::loader::{load_directory, SkippedFile};
use crate::model::Framework;

/// Suffix marking a recommended (rather than required) control reference.
pub const RECOMMENDED_MARKER: char = '*';

/// One control a policy maps to, and whether the mapping is required.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ControlRef {
    Required(String),
    Recommended(String),
}

impl ControlRef {
    /// The referenced control id, without marker.
    pub fn control_id(&self) -> &str {
        match self {
            Self::Required(id) | Self::Recommended(id) => id,
        }
    }

    pub fn is_required(&self) -> bool {
        matches!(self, Self::Required(_))
    }
}

impl fmt::Display for ControlRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required(id) => f.write_str(id),
            Self::Recommended(id) => write!(f, "{id}{RECOMMENDED_MARKER}"),
        }
    }
}

impl Serialize for ControlRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Control references for one policy, keyed by framework id.
pub type FrameworkRefs = BTreeMap<String, Vec<ControlRef>>;

/// Derived index: policy id → framework id → control references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PolicyFrameworkMapping {
    entries: BTreeMap<String, FrameworkRefs>,
}

impl PolicyFrameworkMapping {
    /// Mappings for one policy.
    pub fn get(&self, policy_id: &str) -> Option<&FrameworkRefs> {
        self.entries.get(policy_id)
    }

    /// Every mapped policy id, sorted.
    pub fn policies(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FrameworkRefs)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compute the policy index from a complete set of frameworks.
///
/// Within a control, a policy listed as both required and recommended is
/// indexed once, as required. Repeated listings are collapsed.
pub fn rebuild_index<'a, I>(frameworks: I) -> PolicyFrameworkMapping
where
    I: IntoIterator<Item = &'a Framework>,
{
    let mut entries: BTreeMap<String, FrameworkRefs> = BTreeMap::new();

    for framework in frameworks {
        for control in framework.controls.values() {
            for policy_id in &control.policies_required {
                let refs = entries
                    .entry(policy_id.clone())
                    .or_default()
                    .entry(framework.id.clone())
                    .or_default();
                let r = ControlRef::Required(control.id.clone());
                if !refs.contains(&r) {
                    refs.push(r);
                }
            }
            for policy_id in &control.policies_recommended {
                let refs = entries
                    .entry(policy_id.clone())
                    .or_default()
                    .entry(framework.id.clone())
                    .or_default();
                if !refs.iter().any(|r| r.control_id() == control.id) {
                    refs.push(ControlRef::Recommended(control.id.clone()));
                }
            }
        }
    }

    PolicyFrameworkMapping { entries }
}

/// Outcome of a directory load.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadSummary {
    /// Ids registered by this load, in file order.
    pub loaded: Vec<String>,
    pub skipped: Vec<SkippedFile>,
}

/// Headline numbers for one framework.
#[derive(Debug, Clone, Serialize)]
pub struct FrameworkSummary {
    pub id: String,
    pub name: String,
    pub version: String,
    pub authority: String,
    pub total_controls: usize,
    pub required_policies: usize,
    pub recommended_policies: usize,
    pub categories: Vec<String>,
}

/// Framework registry plus derived policy index.
#[derive(Debug, Default)]
pub struct ComplianceMapper {
    frameworks: BTreeMap<String, Framework>,
    policy_mapping: PolicyFrameworkMapping,
    source_dir: Option<PathBuf>,
}

impl ComplianceMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mapper over already-loaded frameworks.
    pub fn from_frameworks<I: IntoIterator<Item = Framework>>(frameworks: I) -> Self {
        let mut mapper = Self::new();
        for framework in frameworks {
            mapper.frameworks.insert(framework.id.clone(), framework);
        }
        mapper.reindex();
        mapper
    }

    /// Load every definition in `dir`, registering each success.
    ///
    /// Later files replace earlier frameworks with the same id. Files that
    /// fail are reported in the summary and do not stop the batch.
    pub fn load_all_frameworks(&mut self, dir: &Path) -> FrameworkResult<LoadSummary> {
        let load = load_directory(dir)?;
        self.source_dir = Some(dir.to_path_buf());

        let mut summary = LoadSummary {
            loaded: Vec::with_capacity(load.frameworks.len()),
            skipped: load.skipped,
        };
        for framework in load.frameworks {
            if self.frameworks.contains_key(&framework.id) {
                tracing::warn!(
                    framework = %framework.id,
                    "framework id loaded twice; keeping the later definition"
                );
            }
            summary.loaded.push(framework.id.clone());
            self.frameworks.insert(framework.id.clone(), framework);
        }
        self.reindex();
        Ok(summary)
    }

    /// Drop every framework and reload from the last loaded directory.
    pub fn reload(&mut self) -> FrameworkResult<LoadSummary> {
        let dir = self.source_dir.clone().ok_or(FrameworkError::NothingToReload)?;
        self.frameworks.clear();
        self.load_all_frameworks(&dir)
    }

    /// Register one framework, returning any framework it replaced.
    pub fn register_framework(&mut self, framework: Framework) -> Option<Framework> {
        let previous = self.frameworks.insert(framework.id.clone(), framework);
        self.reindex();
        previous
    }

    fn reindex(&mut self) {
        self.policy_mapping = rebuild_index(self.frameworks.values());
        tracing::debug!(
            frameworks = self.frameworks.len(),
            policies = self.policy_mapping.len(),
            "rebuilt policy index"
        );
    }

    pub fn frameworks(&self) -> &BTreeMap<String, Framework> {
        &self.frameworks
    }

    /// Registered framework ids, sorted.
    pub fn framework_ids(&self) -> Vec<String> {
        self.frameworks.keys().cloned().collect()
    }

    pub fn get_framework(&self, framework_id: &str) -> Option<&Framework> {
        self.frameworks.get(framework_id)
    }

    pub fn policy_mapping(&self) -> &PolicyFrameworkMapping {
        &self.policy_mapping
    }

    /// Sorted union of required policies; empty for an unknown framework.
    pub fn get_required_policies(&self, framework_id: &str) -> Vec<String> {
        self.frameworks
            .get(framework_id)
            .map(|fw| fw.get_all_required_policies().into_iter().collect())
            .unwrap_or_default()
    }

    /// Sorted union of recommended policies; empty for an unknown framework.
    pub fn get_recommended_policies(&self, framework_id: &str) -> Vec<String> {
        self.frameworks
            .get(framework_id)
            .map(|fw| fw.get_all_recommended_policies().into_iter().collect())
            .unwrap_or_default()
    }

    /// Every framework/control reference for a policy; empty when unmapped.
    pub fn get_policy_frameworks(&self, policy_id: &str) -> FrameworkRefs {
        self.policy_mapping.get(policy_id).cloned().unwrap_or_default()
    }

    /// Control references for a policy.
    ///
    /// With a framework id, returns that framework's refs (`CC6.1`, `CC6.2*`).
    /// Without, returns every ref qualified as `framework:ref`.
    pub fn get_controls_for_policy(
        &self,
        policy_id: &str,
        framework_id: Option<&str>,
    ) -> Vec<String> {
        let Some(mapping) = self.policy_mapping.get(policy_id) else {
            return Vec::new();
        };
        match framework_id {
            Some(fw) => mapping
                .get(fw)
                .map(|refs| refs.iter().map(ToString::to_string).collect())
                .unwrap_or_default(),
            None => mapping
                .iter()
                .flat_map(|(fw, refs)| refs.iter().map(move |r| format!("{fw}:{r}")))
                .collect(),
        }
    }

    /// Policies required by at least two of the given frameworks.
    ///
    /// Returns policy id → the subset of `framework_ids` requiring it. Fewer
    /// than two ids yields an empty map; unknown ids contribute nothing.
    pub fn find_overlap<S: AsRef<str>>(
        &self,
        framework_ids: &[S],
    ) -> BTreeMap<String, BTreeSet<String>> {
        if framework_ids.len() < 2 {
            return BTreeMap::new();
        }

        let required: BTreeMap<&str, BTreeSet<String>> = framework_ids
            .iter()
            .filter_map(|id| {
                let id = id.as_ref();
                self.frameworks
                    .get(id)
                    .map(|fw| (id, fw.get_all_required_policies()))
            })
            .collect();

        let mut users: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for (fw_id, policies) in &required {
            for policy in policies {
                users
                    .entry(policy.clone())
                    .or_default()
                    .insert((*fw_id).to_string());
            }
        }
        users.retain(|_, frameworks| frameworks.len() >= 2);
        users
    }

    /// Coverage of one framework against the available policy ids.
    pub fn get_coverage_report(
        &self,
        available_policies: &BTreeSet<String>,
        framework_id: &str,
    ) -> CoverageReport {
        match self.frameworks.get(framework_id) {
            Some(framework) => {
                CoverageReport::Covered(framework_coverage(framework, available_policies))
            }
            None => CoverageReport::not_found(framework_id),
        }
    }

    pub fn get_framework_summary(&self, framework_id: &str) -> Option<FrameworkSummary> {
        let fw = self.frameworks.get(framework_id)?;
        Some(FrameworkSummary {
            id: fw.id.clone(),
            name: fw.name.clone(),
            version: fw.version.clone(),
            authority: fw.authority.clone(),
            total_controls: fw.total_controls(),
            required_policies: fw.get_all_required_policies().len(),
            recommended_policies: fw.get_all_recommended_policies().len(),
            categories: fw.categories().into_iter().collect(),
        })
    }

    /// Policy × framework grid of control references.
    ///
    /// Every requested framework (default: all registered) appears under every
    /// requested policy, with an empty list where nothing maps.
    pub fn generate_policy_framework_matrix<S: AsRef<str>>(
        &self,
        policy_ids: &[S],
        framework_ids: Option<&[String]>,
    ) -> BTreeMap<String, FrameworkRefs> {
        let all_ids = self.framework_ids();
        let framework_ids = framework_ids.unwrap_or(all_ids.as_slice());

        policy_ids
            .iter()
            .map(|policy_id| {
                let mapping = self.policy_mapping.get(policy_id.as_ref());
                let row = framework_ids
                    .iter()
                    .map(|fw| {
                        let refs = mapping.and_then(|m| m.get(fw)).cloned().unwrap_or_default();
                        (fw.clone(), refs)
                    })
                    .collect();
                (policy_id.as_ref().to_string(), row)
            })
            .collect()
    }
}
