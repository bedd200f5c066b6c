//! # Framework Definition Shapes
//!
//! Framework sources nest controls in different ways. The raw document is
//! deserialized into [`FrameworkDefinition`], the grouping key is resolved
//! once into a [`FrameworkShape`], and one handler per shape walks the two
//! nesting levels into [`Control`]s.
//!
//! | Shape | Nesting |
//! |-------|---------|
//! | `functions` | function → `categories` → `subcategories` |
//! | `categories` | category → `criteria` |
//! | `themes`, `safeguards`, `requirements`, `chapters`, `families`, `sections` | group → `controls` |
//! | `framework.articles` | article → `controls` |

use std::collections::BTreeMap;

use grc_core::de::{null_as_default, present_or_null};
use serde::Deserialize;

use crate::model::Control;

/// Grouping keys in probe order, for error messages.
pub const RECOGNIZED_SHAPES: &str = "functions, categories, themes, safeguards, requirements, \
chapters, families, sections, framework.articles";

/// Raw framework definition document.
#[derive(Debug, Default, Deserialize)]
pub struct FrameworkDefinition {
    #[serde(default, deserialize_with = "null_as_default")]
    pub framework: FrameworkHeader,
    #[serde(default, deserialize_with = "present_or_null")]
    pub functions: Option<BTreeMap<String, FunctionGroup>>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub categories: Option<BTreeMap<String, CriteriaGroup>>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub themes: Option<BTreeMap<String, ControlGroup>>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub safeguards: Option<BTreeMap<String, ControlGroup>>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub requirements: Option<BTreeMap<String, ControlGroup>>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub chapters: Option<BTreeMap<String, ControlGroup>>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub families: Option<BTreeMap<String, ControlGroup>>,
    #[serde(default, deserialize_with = "present_or_null")]
    pub sections: Option<BTreeMap<String, ControlGroup>>,
}

/// The `framework:` metadata block.
#[derive(Debug, Default, Deserialize)]
pub struct FrameworkHeader {
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub release_date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub authority: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "present_or_null")]
    pub articles: Option<BTreeMap<String, ControlGroup>>,
}

/// NIST CSF function.
#[derive(Debug, Default, Deserialize)]
pub struct FunctionGroup {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: BTreeMap<String, SubcategoryGroup>,
}

/// NIST CSF category.
#[derive(Debug, Default, Deserialize)]
pub struct SubcategoryGroup {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub subcategories: BTreeMap<String, ControlEntry>,
}

/// Trust-services category holding `criteria`.
#[derive(Debug, Default, Deserialize)]
pub struct CriteriaGroup {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub criteria: BTreeMap<String, ControlEntry>,
}

/// Generic group holding `controls`.
#[derive(Debug, Default, Deserialize)]
pub struct ControlGroup {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub controls: BTreeMap<String, ControlEntry>,
}

/// One control as written in the source.
#[derive(Debug, Default, Deserialize)]
pub struct ControlEntry {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub policies_required: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub policies_recommended: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub evidence_types: Vec<String>,
}

/// Which grouping key a definition uses, with its groups.
#[derive(Debug)]
pub enum FrameworkShape {
    /// function → categories → subcategories.
    Functions(BTreeMap<String, FunctionGroup>),
    /// category → criteria.
    Criteria(BTreeMap<String, CriteriaGroup>),
    /// group → controls, under the named top-level key.
    Controls {
        key: &'static str,
        groups: BTreeMap<String, ControlGroup>,
    },
}

impl FrameworkShape {
    /// Take the first recognized grouping key out of `definition`.
    ///
    /// Probe order is fixed; when a document carries more than one grouping
    /// key the earlier one wins and the rest are ignored. A key written with
    /// no value still selects its shape, with no groups.
    pub fn take_from(definition: &mut FrameworkDefinition) -> Option<Self> {
        if let Some(groups) = definition.functions.take() {
            return Some(Self::Functions(groups));
        }
        if let Some(groups) = definition.categories.take() {
            return Some(Self::Criteria(groups));
        }
        let candidates = [
            ("themes", definition.themes.take()),
            ("safeguards", definition.safeguards.take()),
            ("requirements", definition.requirements.take()),
            ("chapters", definition.chapters.take()),
            ("families", definition.families.take()),
            ("sections", definition.sections.take()),
            ("articles", definition.framework.articles.take()),
        ];
        candidates
            .into_iter()
            .find_map(|(key, groups)| groups.map(|groups| Self::Controls { key, groups }))
    }

    /// Name of the grouping key.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Functions(_) => "functions",
            Self::Criteria(_) => "categories",
            Self::Controls { key, .. } => *key,
        }
    }

    /// Flatten the groups into controls keyed by id.
    ///
    /// A control id repeated across groups keeps the last occurrence.
    pub fn into_controls(self) -> BTreeMap<String, Control> {
        let mut controls = BTreeMap::new();
        match self {
            Self::Functions(functions) => collect_functions(functions, &mut controls),
            Self::Criteria(groups) => {
                for (group_id, group) in groups {
                    let label = group.name.unwrap_or(group_id);
                    collect_entries(group.criteria, &label, "", &mut controls);
                }
            }
            Self::Controls { groups, .. } => {
                for (group_id, group) in groups {
                    let label = group.name.unwrap_or(group_id);
                    collect_entries(group.controls, &label, "", &mut controls);
                }
            }
        }
        controls
    }
}

fn collect_functions(
    functions: BTreeMap<String, FunctionGroup>,
    controls: &mut BTreeMap<String, Control>,
) {
    for (function_id, function) in functions {
        let function_name = function.name.unwrap_or(function_id);
        for (category_id, category) in function.categories {
            let category_name = category.name.unwrap_or(category_id);
            collect_entries(
                category.subcategories,
                &category_name,
                &function_name,
                controls,
            );
        }
    }
}

fn collect_entries(
    entries: BTreeMap<String, ControlEntry>,
    parent_category: &str,
    parent_function: &str,
    controls: &mut BTreeMap<String, Control>,
) {
    for (id, entry) in entries {
        let control = Control {
            name: entry.name.unwrap_or_else(|| id.clone()),
            description: entry.description,
            policies_required: entry.policies_required,
            policies_recommended: entry.policies_recommended,
            evidence_types: entry.evidence_types,
            parent_category: parent_category.to_string(),
            parent_function: parent_function.to_string(),
            id: id.clone(),
        };
        controls.insert(id, control);
    }
}
