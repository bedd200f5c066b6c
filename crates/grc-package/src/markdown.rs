//! Markdown deliverables that accompany a package: the table of contents
//! and the operator's customization checklist.

use std::collections::BTreeMap;

use grc_compliance::UNCATEGORIZED;
use grc_core::title_case;

use crate::builder::{PackageResult, PolicyDocument, DATE_FORMAT};
use crate::incomplete::IncompleteKind;

pub fn generate_table_of_contents(result: &PackageResult) -> String {
    let frameworks = if result.frameworks_covered.is_empty() {
        "All".to_string()
    } else {
        result.frameworks_covered.join(", ")
    };
    let mut lines = vec![
        format!("# {} - Policy Package", result.client_name),
        String::new(),
        format!("**Generated:** {}", result.generated_at.format(DATE_FORMAT)),
        format!("**Total Policies:** {}", result.total_policies),
        format!("**Frameworks:** {frameworks}"),
        String::new(),
        "---".to_string(),
        String::new(),
        "## Table of Contents".to_string(),
        String::new(),
    ];

    let mut categories: BTreeMap<&str, Vec<&PolicyDocument>> = BTreeMap::new();
    for policy in &result.policies {
        let category = if policy.category.is_empty() {
            UNCATEGORIZED
        } else {
            policy.category.as_str()
        };
        categories.entry(category).or_default().push(policy);
    }

    for (category, mut policies) in categories {
        lines.push(format!("### {}", title_case(category)));
        policies.sort_by(|a, b| a.title.cmp(&b.title));
        for policy in policies {
            let status = if policy.is_incomplete() { "⚠️" } else { "✅" };
            lines.push(format!("- {status} {}", policy.title));
        }
        lines.push(String::new());
    }

    if result.incomplete_count > 0 {
        lines.extend([
            "---".to_string(),
            String::new(),
            format!(
                "**⚠️ {} policies require customization**",
                result.incomplete_count
            ),
            String::new(),
        ]);
    }

    lines.join("\n")
}

pub fn generate_customization_checklist(result: &PackageResult) -> String {
    let mut lines = vec![
        "# Policy Customization Checklist".to_string(),
        format!("## {}", result.client_name),
        String::new(),
        format!("**Generated:** {}", result.generated_at.format(DATE_FORMAT)),
        String::new(),
        "---".to_string(),
        String::new(),
    ];

    let mut has_items = false;
    for policy in result.policies.iter().filter(|p| p.is_incomplete()) {
        has_items = true;
        lines.push(format!("### {}", policy.title));
        lines.push(format!("**Policy ID:** {}", policy.id));
        lines.push(String::new());

        for section in &policy.incomplete_sections {
            match section.kind {
                IncompleteKind::UnreplacedVariables | IncompleteKind::UnresolvedVariables => {
                    lines.push(if section.kind == IncompleteKind::UnreplacedVariables {
                        "**Unreplaced Variables:**".to_string()
                    } else {
                        "**Unresolved Variables:**".to_string()
                    });
                    for var in &section.items {
                        lines.push(format!("- [ ] Set value for `{{{{{var}}}}}`"));
                    }
                }
                IncompleteKind::ActionRequired | IncompleteKind::Todo => {
                    lines.push(if section.kind == IncompleteKind::ActionRequired {
                        "**Action Required:**".to_string()
                    } else {
                        "**To Do:**".to_string()
                    });
                    for marker in &section.items {
                        lines.push(format!("- [ ] {marker}"));
                    }
                }
            }
        }
        lines.push(String::new());
    }

    if !has_items {
        lines.push("✅ **No customizations required!**".to_string());
        lines.push(String::new());
        lines.push(
            "All policies have been fully populated with the provided variables.".to_string(),
        );
    }

    lines.join("\n")
}
