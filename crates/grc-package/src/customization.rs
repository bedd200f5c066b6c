//! # Customization Detection
//!
//! Finds places in rendered policy text where a client must still supply
//! specifics: generic placeholders (`[INSERT ...]`, `<name>`, `XXX`) and,
//! for each target framework, subject matter that framework expects to be
//! spelled out (a PCI DSS policy mentioning the cardholder data environment
//! needs the CDE's network ranges).
//!
//! Each finding is located by the nearest heading above it.

use grc_core::Priority;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Heading lines: Markdown `#`s, roman numerals (`IV.`), or letters (`B.`).
static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(?:#{1,6}|[IVX]+\.|[A-Z]\.).*$").expect("valid regex"));

static PLACEHOLDERS: Lazy<Vec<(Regex, Priority)>> = Lazy::new(|| {
    [
        (r"(?i)\[.*?REQUIRED.*?\]", Priority::High),
        (r"(?i)\[.*?TODO.*?\]", Priority::Medium),
        (r"(?i)\[.*?INSERT.*?\]", Priority::Medium),
        (r"(?i)\[.*?SPECIFY.*?\]", Priority::Medium),
        (r"<.*?>", Priority::Low),
        (r"(?i)X{2,}", Priority::Low),
    ]
    .into_iter()
    .map(|(pattern, priority)| (Regex::new(pattern).expect("valid regex"), priority))
    .collect()
});

/// `(framework, phrase, what the client must provide)`.
const FRAMEWORK_REQUIREMENTS: &[(&str, &str, &str)] = &[
    ("pci_dss", "cardholder data environment", "CDE IP ranges and network diagram"),
    ("pci_dss", "encryption", "Specific encryption algorithms and key lengths"),
    ("pci_dss", "payment channel", "List of payment channels and processors"),
    ("hipaa", "privacy officer", "Named Privacy Officer"),
    ("hipaa", "protected health information", "PHI handling procedures"),
    ("hipaa", "business associate", "List of business associates"),
    ("gdpr", "data protection officer", "Named DPO"),
    ("gdpr", "lawful basis", "Documented lawful basis for processing"),
    ("gdpr", "data subject rights", "Specific procedures for each right"),
    ("soc2", "monitoring", "Specific monitoring tools and thresholds"),
    ("soc2", "incident", "Incident classification criteria"),
];

static REQUIREMENT_PATTERNS: Lazy<Vec<(&'static str, Regex, &'static str)>> = Lazy::new(|| {
    FRAMEWORK_REQUIREMENTS
        .iter()
        .map(|(framework, phrase, required)| {
            let pattern = format!("(?i){}", regex::escape(phrase));
            (*framework, Regex::new(&pattern).expect("valid regex"), *required)
        })
        .collect()
});

/// Section label when no heading precedes a finding.
pub const UNKNOWN_SECTION: &str = "Unknown section";

const SECTION_LABEL_CHARS: usize = 50;

/// One place in a policy needing client input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomizationFinding {
    pub policy_id: String,
    pub section: String,
    pub reason: String,
    /// The framework that demands this detail; empty for generic placeholders.
    pub frameworks: Vec<String>,
    pub priority: Priority,
}

/// Detector configured for a client's target frameworks.
#[derive(Debug, Clone, Default)]
pub struct IncompletenessDetector {
    target_frameworks: Vec<String>,
}

impl IncompletenessDetector {
    pub fn new(target_frameworks: &[String]) -> Self {
        Self {
            target_frameworks: target_frameworks.to_vec(),
        }
    }

    pub fn detect(&self, policy_id: &str, content: &str) -> Vec<CustomizationFinding> {
        let mut findings = Vec::new();

        for (pattern, priority) in PLACEHOLDERS.iter() {
            for m in pattern.find_iter(content) {
                findings.push(CustomizationFinding {
                    policy_id: policy_id.to_string(),
                    section: find_section(content, m.start()),
                    reason: format!("Contains placeholder: {}", m.as_str()),
                    frameworks: Vec::new(),
                    priority: *priority,
                });
            }
        }

        for framework in &self.target_frameworks {
            for (_, pattern, required) in REQUIREMENT_PATTERNS
                .iter()
                .filter(|(fw, _, _)| fw == framework)
            {
                if let Some(m) = pattern.find(content) {
                    findings.push(CustomizationFinding {
                        policy_id: policy_id.to_string(),
                        section: find_section(content, m.start()),
                        reason: format!("{} requires: {required}", framework.to_uppercase()),
                        frameworks: vec![framework.clone()],
                        priority: Priority::High,
                    });
                }
            }
        }

        findings
    }
}

/// The last heading line starting at or before `position`, truncated.
fn find_section(content: &str, position: usize) -> String {
    HEADING
        .find_iter(content)
        .take_while(|m| m.start() <= position)
        .last()
        .map(|m| m.as_str().chars().take(SECTION_LABEL_CHARS).collect())
        .unwrap_or_else(|| UNKNOWN_SECTION.to_string())
}

/// Markdown table of findings, most urgent first, then by policy.
pub fn generate_checklist(findings: &[CustomizationFinding]) -> String {
    let mut sorted: Vec<&CustomizationFinding> = findings.iter().collect();
    sorted.sort_by(|a, b| {
        a.priority
            .rank()
            .cmp(&b.priority.rank())
            .then_with(|| a.policy_id.cmp(&b.policy_id))
    });

    let mut lines = vec![
        "# Policy Customization Checklist".to_string(),
        String::new(),
        "| Priority | Policy | Section | Requirement | Frameworks |".to_string(),
        "|----------|--------|---------|-------------|------------|".to_string(),
    ];
    for item in sorted {
        let frameworks = if item.frameworks.is_empty() {
            "-".to_string()
        } else {
            item.frameworks.join(", ")
        };
        lines.push(format!(
            "| {} | {} | {} | {} | {} |",
            item.priority.as_str().to_uppercase(),
            item.policy_id,
            item.section,
            item.reason,
            frameworks
        ));
    }
    lines.join("\n")
}
