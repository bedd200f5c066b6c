//! # Severity and Priority Vocabularies
//!
//! The stack grades findings on two independent scales:
//!
//! - [`GapSeverity`] grades a single control's policy coverage
//!   (critical / high / medium / none).
//! - [`Priority`] grades work items: cross-framework remediation of a
//!   missing policy, customization findings in rendered documents, and
//!   remediation report entries (critical / high / medium / low).
//!
//! Both order by urgency: `Critical` sorts first.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Coverage severity of one control in a gap analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapSeverity {
    /// No required policy is available.
    Critical,
    /// More required policies are missing than available.
    High,
    /// At least one required policy is missing.
    Medium,
    /// Fully covered, or nothing is required.
    None,
}

impl GapSeverity {
    /// Classify a control from its missing and available policy counts.
    ///
    /// Rules are evaluated in order and the first match wins, so a control
    /// missing everything is `Critical` even though `missing > available`
    /// also holds.
    pub fn classify(required: usize, missing: usize, available: usize) -> Self {
        if required > 0 && missing == required {
            Self::Critical
        } else if missing > available {
            Self::High
        } else if missing > 0 {
            Self::Medium
        } else {
            Self::None
        }
    }

    /// Sort rank: critical=0, high=1, medium=2, none=3.
    pub fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::None => 3,
        }
    }

    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::None => "none",
        }
    }
}

impl fmt::Display for GapSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GapSeverity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "none" => Ok(Self::None),
            _ => Err(ValidationError::UnknownVariant {
                kind: "gap severity",
                value: s.to_string(),
                expected: "critical, high, medium, none",
            }),
        }
    }
}

/// Urgency of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Address immediately.
    Critical,
    /// Address within two weeks.
    High,
    /// Address within thirty days.
    Medium,
    /// Address when convenient.
    Low,
}

impl Priority {
    /// Priority for a policy missing from `frameworks` frameworks and
    /// `controls` controls in a cross-framework gap summary.
    pub fn for_remediation(frameworks: usize, controls: usize) -> Self {
        if frameworks >= 3 || controls >= 10 {
            Self::Critical
        } else if frameworks >= 2 || controls >= 5 {
            Self::High
        } else {
            Self::Medium
        }
    }

    /// Sort rank: critical=0, high=1, medium=2, low=3.
    pub fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "critical" => Ok(Self::Critical),
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            _ => Err(ValidationError::UnknownVariant {
                kind: "priority",
                value: s.to_string(),
                expected: "critical, high, medium, low",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_follows_rule_order() {
        assert_eq!(GapSeverity::classify(3, 3, 0), GapSeverity::Critical);
        assert_eq!(GapSeverity::classify(3, 2, 1), GapSeverity::High);
        assert_eq!(GapSeverity::classify(3, 1, 2), GapSeverity::Medium);
        assert_eq!(GapSeverity::classify(3, 0, 3), GapSeverity::None);
        assert_eq!(GapSeverity::classify(0, 0, 0), GapSeverity::None);
    }

    #[test]
    fn equal_missing_and_available_is_medium() {
        assert_eq!(GapSeverity::classify(2, 1, 1), GapSeverity::Medium);
    }

    #[test]
    fn severity_ordering_matches_rank() {
        let mut all = vec![
            GapSeverity::None,
            GapSeverity::Medium,
            GapSeverity::Critical,
            GapSeverity::High,
        ];
        all.sort();
        let ranks: Vec<u8> = all.iter().map(|s| s.rank()).collect();
        assert_eq!(ranks, vec![0, 1, 2, 3]);
    }

    #[test]
    fn remediation_thresholds() {
        assert_eq!(Priority::for_remediation(3, 1), Priority::Critical);
        assert_eq!(Priority::for_remediation(1, 10), Priority::Critical);
        assert_eq!(Priority::for_remediation(2, 1), Priority::High);
        assert_eq!(Priority::for_remediation(1, 5), Priority::High);
        assert_eq!(Priority::for_remediation(1, 4), Priority::Medium);
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&GapSeverity::None).unwrap();
        assert_eq!(json, "\"none\"");
        let p: Priority = serde_json::from_str("\"high\"").unwrap();
        assert_eq!(p, Priority::High);
    }

    #[test]
    fn from_str_rejects_unknown() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
        assert!("low".parse::<GapSeverity>().is_err());
    }
}
