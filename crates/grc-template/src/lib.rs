//! # grc-template — Policy Template Engine
//!
//! Renders policy templates for one client. Templates use a small
//! Handlebars-like syntax:
//!
//! ```text
//! {{ORGANIZATION_NAME}} maintains this policy.
//! {{#if organization.size >= 500}}A dedicated security team ...{{#else}}...{{/if}}
//! {{#each SYSTEMS}}- {{this}}{{/each}}
//! ```
//!
//! - [`profile`]: the [`ClientProfile`] templates are rendered against.
//! - [`variable`]: variable definitions and the built-in registry.
//! - [`condition`]: tokenizer, parser, and evaluator for `{{#if}}`
//!   expressions.
//! - [`engine`]: the [`TemplateEngine`] render pipeline.
//!
//! Rendering is pure: the same template and profile always produce the same
//! output, and unresolved variables become visible `[NAME]` placeholders
//! rather than errors.

pub mod condition;
pub mod engine;
pub mod profile;
pub mod value;
pub mod variable;

pub use condition::{evaluate_condition, Expr};
pub use engine::{ComputedFn, RenderOutput, TemplateEngine};
pub use profile::{ClientProfile, SizeTier};
pub use value::display_value;
pub use variable::{builtin_variables, Variable, VariableKind};
