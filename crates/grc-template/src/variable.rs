//! Template variable definitions and the built-in registry.

use serde::{Deserialize, Serialize};

/// Declared kind of a variable's value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    #[default]
    String,
    Number,
    Date,
    Boolean,
    List,
    Object,
}

/// A named placeholder a policy template may use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,
    pub required: bool,
    /// Substituted when the client does not bind the variable.
    pub default: Option<String>,
    pub description: String,
    pub example: Option<String>,
    /// Common alternative values offered to the operator.
    pub alternatives: Vec<String>,
}

impl Variable {
    /// An optional variable with no default.
    pub fn optional(name: &str, kind: VariableKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: false,
            default: None,
            description: description.to_string(),
            example: None,
            alternatives: Vec::new(),
        }
    }

    pub fn required(name: &str, kind: VariableKind, description: &str) -> Self {
        Self {
            required: true,
            ..Self::optional(name, kind, description)
        }
    }

    /// An optional string variable with a default.
    pub fn with_default(name: &str, default: &str, description: &str) -> Self {
        Self {
            default: Some(default.to_string()),
            ..Self::optional(name, VariableKind::String, description)
        }
    }

    pub fn example(mut self, example: &str) -> Self {
        self.example = Some(example.to_string());
        self
    }

    pub fn alternatives(mut self, alternatives: &[&str]) -> Self {
        self.alternatives = alternatives.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// Variables every engine starts with.
pub fn builtin_variables() -> Vec<Variable> {
    use VariableKind as K;

    vec![
        Variable::required("ORGANIZATION_NAME", K::String, "Legal name of the organization")
            .example("Acme Corporation"),
        Variable::required("EFFECTIVE_DATE", K::Date, "Date the policy becomes effective")
            .example("January 1, 2025"),
        Variable::required("APPROVAL_DATE", K::Date, "Date the policy was approved")
            .example("December 15, 2024"),
        Variable::with_default(
            "APPROVER",
            "Policy Committee",
            "Person or committee approving the policy",
        ),
        Variable::with_default("VERSION", "1.0", "Policy version number"),
        Variable::with_default(
            "CSO_TITLE",
            "Chief Security Officer",
            "Title of the chief security officer",
        )
        .alternatives(&["CISO", "VP of Security", "Security Director"]),
        Variable::with_default(
            "EXEC_MGMT",
            "Executive Management",
            "Term for executive management",
        )
        .alternatives(&["Executive Leadership", "Senior Leadership Team"]),
        Variable::with_default("IT_STAFF", "IT Staff", "Term for IT personnel")
            .alternatives(&["IT Department", "Technology Team"]),
        Variable::with_default(
            "RMO_TITLE",
            "Risk Management Officer",
            "Title of risk management officer",
        ),
        Variable::optional(
            "PRIVACY_OFFICER",
            K::String,
            "Name of privacy officer (required for HIPAA/GDPR)",
        ),
        Variable::with_default("HR_DEPARTMENT", "Human Resources", "Term for HR department"),
        Variable::with_default(
            "LEGAL_DEPARTMENT",
            "Legal Department",
            "Term for legal department",
        ),
        Variable::optional("REVIEW_DATE", K::Date, "Next scheduled review date"),
        Variable::optional("COMPANY_ADDRESS", K::String, "Organization headquarters address"),
        Variable::optional("CONTACT_EMAIL", K::String, "Primary contact email"),
    ]
}
