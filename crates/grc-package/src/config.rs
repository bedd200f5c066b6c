//! Client configuration and build options.

use std::collections::BTreeMap;

use grc_template::{ClientProfile, SizeTier};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a client asked for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub name: String,
    /// Explicit variable values; these win over package defaults.
    pub variables: BTreeMap<String, String>,
    /// Target framework ids. Empty means every policy.
    pub frameworks: Vec<String>,
    pub industry: String,
    pub size_tier: SizeTier,
    pub employee_count: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            variables: BTreeMap::new(),
            frameworks: Vec::new(),
            industry: String::new(),
            size_tier: SizeTier::default(),
            employee_count: ClientProfile::default().employee_count,
        }
    }
}

impl ClientConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Lowercase, underscore-separated form of the client name.
    pub fn slug(&self) -> String {
        self.name.trim().to_lowercase().replace(' ', "_")
    }

    /// The profile templates are rendered against, binding `variables`.
    pub fn to_profile(&self, variables: &BTreeMap<String, String>) -> ClientProfile {
        let mut profile = ClientProfile::new(self.slug(), self.name.clone());
        profile.variables = variables
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        profile.size_tier = self.size_tier;
        profile.employee_count = self.employee_count;
        if !self.industry.is_empty() {
            profile.industry = self.industry.clone();
        }
        profile.target_frameworks = self.frameworks.clone();
        profile
    }
}

/// Switches for one build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
    /// Include every library policy regardless of target frameworks.
    pub include_all: bool,
    /// Warn about references to policies that do not exist.
    pub validate_references: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            include_all: false,
            validate_references: true,
        }
    }
}
