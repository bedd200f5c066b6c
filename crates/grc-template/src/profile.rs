//! # Client Profile
//!
//! The inputs a template is rendered against: bound variables plus the
//! organization metadata that conditions test (`organization.size`,
//! `compliance`, ...). The profile is never mutated by rendering.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use grc_core::ValidationError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Organization size bracket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeTier {
    Solopreneur,
    Small,
    #[default]
    Medium,
    Enterprise,
}

impl SizeTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Solopreneur => "solopreneur",
            Self::Small => "small",
            Self::Medium => "medium",
            Self::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for SizeTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SizeTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "solopreneur" => Ok(Self::Solopreneur),
            "small" => Ok(Self::Small),
            "medium" => Ok(Self::Medium),
            "enterprise" => Ok(Self::Enterprise),
            _ => Err(ValidationError::UnknownVariant {
                kind: "size tier",
                value: s.to_string(),
                expected: "solopreneur, small, medium, enterprise",
            }),
        }
    }
}

/// Variable bindings and organization metadata for one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientProfile {
    pub id: String,
    pub name: String,
    pub variables: BTreeMap<String, Value>,
    pub size_tier: SizeTier,
    pub employee_count: u64,
    pub industry: String,
    pub location: String,
    pub target_frameworks: Vec<String>,
}

impl Default for ClientProfile {
    fn default() -> Self {
        Self {
            id: String::new(),
            name: String::new(),
            variables: BTreeMap::new(),
            size_tier: SizeTier::default(),
            employee_count: 100,
            industry: "technology".to_string(),
            location: "US".to_string(),
            target_frameworks: Vec::new(),
        }
    }
}

impl ClientProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Bind a variable, replacing any previous value.
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Resolve `key`: bound variables first, then the computed
    /// `organization.*` properties and `compliance` (target frameworks).
    pub fn get(&self, key: &str) -> Option<Value> {
        if let Some(value) = self.variables.get(key) {
            return Some(value.clone());
        }
        match key {
            "organization.size" => Some(Value::from(self.employee_count)),
            "organization.size_tier" => Some(Value::from(self.size_tier.as_str())),
            "organization.industry" => Some(Value::from(self.industry.as_str())),
            "organization.location" => Some(Value::from(self.location.as_str())),
            "compliance" => Some(Value::from(self.target_frameworks.clone())),
            _ => None,
        }
    }
}
