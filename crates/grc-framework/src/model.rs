//! # Uniform Control Model
//!
//! Every framework, whatever its source nesting, is reduced to a flat map of
//! [`Control`]s keyed by their framework-local id. Ids are opaque strings:
//! `1.10` and `1.1` are different controls.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A single requirement within a compliance framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    /// Framework-local identifier, exactly as written in the source.
    pub id: String,
    /// Short display name.
    pub name: String,
    /// Requirement text.
    pub description: String,
    /// Policies that must exist for this control to be covered.
    pub policies_required: Vec<String>,
    /// Policies that strengthen coverage but are not required.
    pub policies_recommended: Vec<String>,
    /// Kinds of evidence an auditor expects.
    pub evidence_types: Vec<String>,
    /// Display label of the enclosing group.
    pub parent_category: String,
    /// Display label of the outermost group (NIST CSF functions only).
    pub parent_function: String,
}

impl Control {
    /// Distinct required policy ids, sorted.
    pub fn required_set(&self) -> BTreeSet<String> {
        self.policies_required.iter().cloned().collect()
    }
}

/// A loaded compliance framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Framework {
    /// Registry key.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Version string as written in the source.
    pub version: String,
    /// Publication date as written in the source.
    pub release_date: String,
    /// Issuing body.
    pub authority: String,
    /// Reference URL.
    pub url: String,
    /// Controls keyed by id.
    pub controls: BTreeMap<String, Control>,
}

impl Framework {
    /// Number of controls.
    pub fn total_controls(&self) -> usize {
        self.controls.len()
    }

    /// Union of every control's required policies.
    pub fn get_all_required_policies(&self) -> BTreeSet<String> {
        self.controls
            .values()
            .flat_map(|c| c.policies_required.iter().cloned())
            .collect()
    }

    /// Union of every control's recommended policies.
    pub fn get_all_recommended_policies(&self) -> BTreeSet<String> {
        self.controls
            .values()
            .flat_map(|c| c.policies_recommended.iter().cloned())
            .collect()
    }

    /// Distinct non-empty `parent_category` labels, sorted.
    pub fn categories(&self) -> BTreeSet<String> {
        self.controls
            .values()
            .filter(|c| !c.parent_category.is_empty())
            .map(|c| c.parent_category.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn control(id: &str, required: &[&str], recommended: &[&str], category: &str) -> Control {
        Control {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            policies_required: required.iter().map(|s| s.to_string()).collect(),
            policies_recommended: recommended.iter().map(|s| s.to_string()).collect(),
            evidence_types: Vec::new(),
            parent_category: category.to_string(),
            parent_function: String::new(),
        }
    }

    fn framework() -> Framework {
        let mut controls = BTreeMap::new();
        for c in [
            control("CC1.1", &["governance", "ethics"], &["training"], "Control Environment"),
            control("CC1.2", &["governance"], &[], "Control Environment"),
            control("CC6.1", &["access-control"], &["training"], ""),
        ] {
            controls.insert(c.id.clone(), c);
        }
        Framework {
            id: "soc2".to_string(),
            name: "SOC 2".to_string(),
            version: "2017".to_string(),
            release_date: String::new(),
            authority: "AICPA".to_string(),
            url: String::new(),
            controls,
        }
    }

    #[test]
    fn required_policies_are_deduplicated() {
        let fw = framework();
        let req: Vec<String> = fw.get_all_required_policies().into_iter().collect();
        assert_eq!(req, vec!["access-control", "ethics", "governance"]);
    }

    #[test]
    fn recommended_policies_are_deduplicated() {
        let fw = framework();
        assert_eq!(fw.get_all_recommended_policies().len(), 1);
    }

    #[test]
    fn categories_skip_empty_labels() {
        let fw = framework();
        let cats: Vec<String> = fw.categories().into_iter().collect();
        assert_eq!(cats, vec!["Control Environment"]);
        assert_eq!(fw.total_controls(), 3);
    }
}
