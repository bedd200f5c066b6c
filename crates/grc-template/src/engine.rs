//! # Template Engine
//!
//! Renders a policy template against a [`ClientProfile`] in four passes:
//!
//! 1. `{{#if COND}}...{{#else}}...{{/if}}` blocks, repeated until the text
//!    stops changing. Blocks are matched with nesting awareness and the
//!    chosen branch is trimmed.
//! 2. `{{#each LIST}}...{{this}}...{{/each}}` loops. Items are rendered
//!    one per line; a binding that is not a list renders as nothing.
//! 3. `{{VAR}}` substitution: client value, then computed variable, then
//!    registered default, then the visible placeholder `[VAR]`.
//! 4. Cleanup of any `{{VAR}}` a substituted value introduced:
//!    `[VAR - REQUIRED]` for required variables, `[VAR]` otherwise.
//!
//! Placeholders are never dropped silently. Downstream incompleteness
//! detection looks for the brackets.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::Value;

use crate::condition::evaluate_condition;
use crate::profile::ClientProfile;
use crate::value::display_value;
use crate::variable::{builtin_variables, Variable};

static SIMPLE_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([A-Z_]+)\}\}").expect("valid regex"));
static EACH_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\{\{#each\s+(\w+)\}\}(.*?)\{\{/each\}\}").expect("valid regex")
});

const IF_OPEN: &str = "{{#if";
const ELSE: &str = "{{#else}}";
const IF_CLOSE: &str = "{{/if}}";
const TAG_END: &str = "}}";
const THIS: &str = "{{this}}";

/// A variable computed from the profile at render time.
pub type ComputedFn = Box<dyn Fn(&ClientProfile) -> String + Send + Sync>;

/// Rendered text plus the variables that fell back to `[VAR]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderOutput {
    pub content: String,
    /// Sorted, distinct.
    pub unresolved: Vec<String>,
}

/// Variable registry and renderer.
pub struct TemplateEngine {
    variables: BTreeMap<String, Variable>,
    computed: BTreeMap<String, ComputedFn>,
}

impl fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateEngine")
            .field("variables", &self.variables.keys().collect::<Vec<_>>())
            .field("computed", &self.computed.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    /// An engine with the built-in variables registered.
    pub fn new() -> Self {
        let mut engine = Self {
            variables: BTreeMap::new(),
            computed: BTreeMap::new(),
        };
        for variable in builtin_variables() {
            engine.register_variable(variable);
        }
        engine
    }

    /// Add or replace a variable definition.
    pub fn register_variable(&mut self, variable: Variable) {
        self.variables.insert(variable.name.clone(), variable);
    }

    pub fn register_computed(&mut self, name: impl Into<String>, func: ComputedFn) {
        self.computed.insert(name.into(), func);
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn required_variables(&self) -> Vec<&Variable> {
        self.variables.values().filter(|v| v.required).collect()
    }

    pub fn optional_variables(&self) -> Vec<&Variable> {
        self.variables.values().filter(|v| !v.required).collect()
    }

    /// Names of required variables the client leaves unbound, null, or empty.
    pub fn validate_client(&self, client: &ClientProfile) -> Vec<String> {
        self.variables
            .values()
            .filter(|v| v.required)
            .filter(|v| match client.get(&v.name) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(_) => false,
            })
            .map(|v| v.name.clone())
            .collect()
    }

    pub fn render(&self, template: &str, client: &ClientProfile) -> String {
        self.render_detailed(template, client).content
    }

    pub fn render_detailed(&self, template: &str, client: &ClientProfile) -> RenderOutput {
        let text = self.process_conditionals(template, client);
        let text = process_each(&text, client);
        let (text, unresolved) = self.substitute_variables(&text, client);
        let content = self.cleanup_unsubstituted(&text);

        if !unresolved.is_empty() {
            tracing::debug!(?unresolved, "template rendered with placeholders");
        }
        RenderOutput {
            content,
            unresolved: unresolved.into_iter().collect(),
        }
    }

    fn process_conditionals(&self, text: &str, client: &ClientProfile) -> String {
        let mut current = self.expand_conditionals(text, client);
        loop {
            let next = self.expand_conditionals(&current, client);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn expand_conditionals(&self, text: &str, client: &ClientProfile) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(start) = rest.find(IF_OPEN) {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            match IfBlock::parse(tail) {
                Some(block) => {
                    let branch = if evaluate_condition(block.condition, client) {
                        block.then_branch
                    } else {
                        block.else_branch.unwrap_or("")
                    };
                    out.push_str(&self.process_conditionals(branch.trim(), client));
                    rest = &tail[block.len..];
                }
                None => {
                    out.push_str(IF_OPEN);
                    rest = &tail[IF_OPEN.len()..];
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn resolve(&self, name: &str, client: &ClientProfile) -> Option<String> {
        if let Some(value) = client.get(name).filter(|v| !v.is_null()) {
            return Some(display_value(&value));
        }
        if let Some(func) = self.computed.get(name) {
            return Some(func(client));
        }
        self.variables.get(name).and_then(|v| v.default.clone())
    }

    fn substitute_variables(
        &self,
        text: &str,
        client: &ClientProfile,
    ) -> (String, BTreeSet<String>) {
        let mut unresolved = BTreeSet::new();
        let out = SIMPLE_VAR.replace_all(text, |caps: &Captures| {
            let name = &caps[1];
            self.resolve(name, client).unwrap_or_else(|| {
                unresolved.insert(name.to_string());
                format!("[{name}]")
            })
        });
        (out.into_owned(), unresolved)
    }

    fn cleanup_unsubstituted(&self, text: &str) -> String {
        SIMPLE_VAR
            .replace_all(text, |caps: &Captures| {
                let name = &caps[1];
                match self.variables.get(name) {
                    Some(v) if v.required => format!("[{name} - REQUIRED]"),
                    _ => format!("[{name}]"),
                }
            })
            .into_owned()
    }
}

fn process_each(text: &str, client: &ClientProfile) -> String {
    EACH_BLOCK
        .replace_all(text, |caps: &Captures| match client.get(&caps[1]) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| caps[2].replace(THIS, &display_value(item)).trim().to_string())
                .collect::<Vec<_>>()
                .join("\n"),
            _ => String::new(),
        })
        .into_owned()
}

/// One `{{#if}}` block located at the start of a slice.
struct IfBlock<'a> {
    condition: &'a str,
    then_branch: &'a str,
    else_branch: Option<&'a str>,
    /// Bytes from the opening marker through the closing `{{/if}}`.
    len: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Marker {
    Open,
    Else,
    Close,
}

impl Marker {
    fn text(self) -> &'static str {
        match self {
            Self::Open => IF_OPEN,
            Self::Else => ELSE,
            Self::Close => IF_CLOSE,
        }
    }
}

fn next_marker(text: &str, from: usize) -> Option<(usize, Marker)> {
    [Marker::Open, Marker::Else, Marker::Close]
        .into_iter()
        .filter_map(|m| text[from..].find(m.text()).map(|i| (from + i, m)))
        .min_by_key(|(i, _)| *i)
}

impl<'a> IfBlock<'a> {
    /// Parse the block opening at `text[0]`; `None` if it is malformed or
    /// never closed.
    fn parse(text: &'a str) -> Option<Self> {
        let after_open = &text[IF_OPEN.len()..];
        if !after_open.starts_with(char::is_whitespace) {
            return None;
        }
        let tag_len = after_open.find(TAG_END)?;
        let condition = after_open[..tag_len].trim();
        if condition.is_empty() {
            return None;
        }

        let body_start = IF_OPEN.len() + tag_len + TAG_END.len();
        let mut depth = 0usize;
        let mut else_at = None;
        let mut pos = body_start;
        loop {
            let (at, marker) = next_marker(text, pos)?;
            pos = at + marker.text().len();
            match marker {
                Marker::Open => depth += 1,
                Marker::Else if depth == 0 && else_at.is_none() => else_at = Some(at),
                Marker::Else => {}
                Marker::Close if depth == 0 => {
                    return Some(Self {
                        condition,
                        then_branch: &text[body_start..else_at.unwrap_or(at)],
                        else_branch: else_at.map(|e| &text[e + ELSE.len()..at]),
                        len: pos,
                    });
                }
                Marker::Close => depth -= 1,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn client(size: u64) -> ClientProfile {
        let mut c = ClientProfile::new("c1", "Acme");
        c.employee_count = size;
        c.target_frameworks = vec!["hipaa".to_string()];
        c.with_variable("ORGANIZATION_NAME", "Acme Corp")
    }

    #[test]
    fn size_conditional() {
        let engine = TemplateEngine::new();
        let t = "{{#if organization.size >= 500}}Enterprise{{#else}}Standard{{/if}}";
        assert_eq!(engine.render(t, &client(600)), "Enterprise");
        assert_eq!(engine.render(t, &client(50)), "Standard");
    }

    #[test]
    fn missing_else_renders_nothing() {
        let engine = TemplateEngine::new();
        let t = "A{{#if compliance.includes(\"pci_dss\")}} PCI {{/if}}B";
        assert_eq!(engine.render(t, &client(10)), "AB");
    }

    #[test]
    fn nested_conditionals() {
        let engine = TemplateEngine::new();
        let t = "{{#if compliance.includes(\"hipaa\")}}\n\
                 HIPAA\n\
                 {{#if organization.size > 100}}large{{#else}}small{{/if}}\n\
                 {{#else}}none{{/if}}";
        assert_eq!(engine.render(t, &client(600)), "HIPAA\nlarge");
        assert_eq!(engine.render(t, &client(20)), "HIPAA\nsmall");

        let mut other = client(20);
        other.target_frameworks.clear();
        assert_eq!(engine.render(t, &other), "none");
    }

    #[test]
    fn unterminated_block_is_left_verbatim() {
        let engine = TemplateEngine::new();
        let t = "before {{#if compliance}}never closed";
        assert_eq!(engine.render(t, &client(10)), t);
    }

    #[test]
    fn each_loop() {
        let engine = TemplateEngine::new();
        let c = client(10).with_variable("SYSTEMS", json!(["CRM", "ERP"]));
        let t = "{{#each SYSTEMS}}\n- {{this}}\n{{/each}}";
        assert_eq!(engine.render(t, &c), "- CRM\n- ERP");
        assert_eq!(engine.render("{{#each ORGANIZATION_NAME}}x{{/each}}", &c), "");
        assert_eq!(engine.render("[{{#each compliance}}{{this}}{{/each}}]", &c), "[hipaa]");
    }

    #[test]
    fn substitution_precedence() {
        let mut engine = TemplateEngine::new();
        engine.register_computed(
            "EMPLOYEE_BAND",
            Box::new(|c: &ClientProfile| format!("{}+", c.employee_count / 100 * 100)),
        );
        let c = client(250).with_variable("CSO_TITLE", "CISO");

        assert_eq!(engine.render("{{ORGANIZATION_NAME}}", &c), "Acme Corp");
        assert_eq!(engine.render("{{CSO_TITLE}}", &c), "CISO");
        assert_eq!(engine.render("{{EMPLOYEE_BAND}}", &c), "200+");
        assert_eq!(engine.render("{{IT_STAFF}}", &c), "IT Staff");
        assert_eq!(engine.render("{{PRIVACY_OFFICER}}", &c), "[PRIVACY_OFFICER]");
        assert_eq!(engine.render("{{NEVER_REGISTERED}}", &c), "[NEVER_REGISTERED]");
    }

    #[test]
    fn null_binding_falls_through_to_default() {
        let engine = TemplateEngine::new();
        let c = client(10).with_variable("VERSION", Value::Null);
        assert_eq!(engine.render("v{{VERSION}}", &c), "v1.0");
    }

    #[test]
    fn injected_tokens_are_marked_in_cleanup() {
        let engine = TemplateEngine::new();
        let c = client(10).with_variable("APPROVER", "{{EFFECTIVE_DATE}}");
        assert_eq!(
            engine.render("{{APPROVER}}", &c),
            "[EFFECTIVE_DATE - REQUIRED]"
        );
    }

    #[test]
    fn detailed_render_lists_unresolved() {
        let engine = TemplateEngine::new();
        let out = engine.render_detailed(
            "{{REVIEW_DATE}} {{CONTACT_EMAIL}} {{REVIEW_DATE}} {{ORGANIZATION_NAME}}",
            &client(10),
        );
        assert_eq!(out.unresolved, vec!["CONTACT_EMAIL", "REVIEW_DATE"]);
        assert_eq!(out.content, "[REVIEW_DATE] [CONTACT_EMAIL] [REVIEW_DATE] Acme Corp");
    }

    #[test]
    fn value_display_in_substitution() {
        let engine = TemplateEngine::new();
        let c = client(10)
            .with_variable("RETENTION_YEARS", 7)
            .with_variable("MFA_REQUIRED", true)
            .with_variable("REGIONS", json!(["us", "eu"]));
        assert_eq!(
            engine.render("{{RETENTION_YEARS}} {{MFA_REQUIRED}} {{REGIONS}}", &c),
            "7 true us, eu"
        );
    }

    #[test]
    fn validate_client_reports_missing_required() {
        let engine = TemplateEngine::new();
        let c = client(10).with_variable("EFFECTIVE_DATE", "");
        assert_eq!(engine.validate_client(&c), vec!["APPROVAL_DATE", "EFFECTIVE_DATE"]);
        assert_eq!(engine.required_variables().len(), 3);
        assert_eq!(
            engine.required_variables().len() + engine.optional_variables().len(),
            15
        );
    }

    #[test]
    fn plain_text_is_unchanged() {
        let engine = TemplateEngine::new();
        let t = "No placeholders here.\n  Keep spacing.  ";
        assert_eq!(engine.render(t, &client(10)), t);
    }
}
