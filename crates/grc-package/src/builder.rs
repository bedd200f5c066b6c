//! # Package Builder
//!
//! Turns a [`ClientConfig`] into a [`PackageResult`]: choose the policies
//! the client's frameworks call for, render each through the template
//! engine, and flag what still needs customizing.
//!
//! ## Design
//!
//! The builder only reads the library and the mapper, so one builder can
//! serve many clients. Nothing here returns an error: a policy the mapper
//! requires but the library lacks, or a reference to a policy that does not
//! exist, becomes a warning on the result. Partial output still has value.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use grc_framework::ComplianceMapper;
use grc_policy::{PolicyLibrary, PolicySource};
use grc_template::{ClientProfile, TemplateEngine};
use serde::Serialize;

use crate::config::{BuildOptions, ClientConfig};
use crate::incomplete::{detect_incomplete_sections, IncompleteSection};

/// Package-level default for `VERSION`.
pub const DEFAULT_PACKAGE_VERSION: &str = "1.0.0";

/// Date format for `EFFECTIVE_DATE` and `APPROVAL_DATE` defaults.
pub const DATE_FORMAT: &str = "%B %d, %Y";

/// A rendered policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyDocument {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: String,
    /// Static framework mapping from the source frontmatter.
    pub frameworks: BTreeMap<String, Vec<String>>,
    pub variables_used: Vec<String>,
    pub incomplete_sections: Vec<IncompleteSection>,
}

impl PolicyDocument {
    pub fn is_incomplete(&self) -> bool {
        !self.incomplete_sections.is_empty()
    }
}

/// Everything an exporter needs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageResult {
    pub client_name: String,
    pub generated_at: DateTime<Utc>,
    pub policies: Vec<PolicyDocument>,
    pub total_policies: usize,
    pub frameworks_covered: Vec<String>,
    pub variables_applied: BTreeMap<String, String>,
    pub incomplete_count: usize,
    pub warnings: Vec<String>,
}

/// Builds packages from a policy library and a framework mapper.
#[derive(Debug)]
pub struct PackageBuilder<'a> {
    library: &'a PolicyLibrary,
    mapper: &'a ComplianceMapper,
    engine: TemplateEngine,
}

impl<'a> PackageBuilder<'a> {
    pub fn new(library: &'a PolicyLibrary, mapper: &'a ComplianceMapper) -> Self {
        Self::with_engine(library, mapper, TemplateEngine::new())
    }

    /// Use a preconfigured engine (extra variables, computed values).
    pub fn with_engine(
        library: &'a PolicyLibrary,
        mapper: &'a ComplianceMapper,
        engine: TemplateEngine,
    ) -> Self {
        Self {
            library,
            mapper,
            engine,
        }
    }

    pub fn engine(&self) -> &TemplateEngine {
        &self.engine
    }

    /// Ids of the policies a build would include.
    ///
    /// With target frameworks, this is the mapper's required policies for
    /// each framework plus any library policy whose frontmatter maps to one
    /// of them. The mapper's ids may name policies the library lacks.
    pub fn select_policies(&self, config: &ClientConfig, options: BuildOptions) -> BTreeSet<String> {
        if options.include_all || config.frameworks.is_empty() {
            return self.library.ids();
        }

        let mut ids: BTreeSet<String> = config
            .frameworks
            .iter()
            .flat_map(|fw| self.mapper.get_required_policies(fw))
            .collect();
        for policy in self.library.iter() {
            if config.frameworks.iter().any(|fw| policy.maps_to(fw)) {
                ids.insert(policy.id.clone());
            }
        }
        ids
    }

    /// Package defaults merged under the client's own values.
    pub fn merged_variables(config: &ClientConfig, now: DateTime<Utc>) -> BTreeMap<String, String> {
        let today = now.format(DATE_FORMAT).to_string();
        let mut variables = BTreeMap::from([
            ("ORGANIZATION_NAME".to_string(), config.name.clone()),
            ("EFFECTIVE_DATE".to_string(), today.clone()),
            ("APPROVAL_DATE".to_string(), today),
            ("VERSION".to_string(), DEFAULT_PACKAGE_VERSION.to_string()),
        ]);
        variables.extend(config.variables.iter().map(|(k, v)| (k.clone(), v.clone())));
        variables
    }

    pub fn build_package(&self, config: &ClientConfig, options: BuildOptions) -> PackageResult {
        self.build_package_at(config, options, Utc::now())
    }

    /// Build with an explicit clock.
    pub fn build_package_at(
        &self,
        config: &ClientConfig,
        options: BuildOptions,
        now: DateTime<Utc>,
    ) -> PackageResult {
        let candidates = self.select_policies(config, options);
        tracing::debug!(
            client = %config.name,
            candidates = candidates.len(),
            "selected policies for package"
        );

        let variables = Self::merged_variables(config, now);
        let profile = config.to_profile(&variables);

        let mut warnings = Vec::new();
        let mut policies = Vec::with_capacity(candidates.len());
        for id in &candidates {
            match self.library.get(id) {
                Some(source) => policies.push(self.render_policy(source, &profile)),
                None => warnings.push(format!("Policy not found: {id}")),
            }
        }

        if options.validate_references {
            warnings.extend(self.reference_warnings(&policies, &candidates));
        }

        let incomplete_count = policies.iter().filter(|p| p.is_incomplete()).count();
        tracing::info!(
            client = %config.name,
            policies = policies.len(),
            incomplete = incomplete_count,
            warnings = warnings.len(),
            "built policy package"
        );

        PackageResult {
            client_name: config.name.clone(),
            generated_at: now,
            total_policies: policies.len(),
            policies,
            frameworks_covered: config.frameworks.clone(),
            variables_applied: variables,
            incomplete_count,
            warnings,
        }
    }

    /// Render one policy's title and body for `profile`.
    pub fn render_policy(&self, source: &PolicySource, profile: &ClientProfile) -> PolicyDocument {
        let title = self.engine.render_detailed(&source.title, profile);
        let rendered = self.engine.render_detailed(&source.body, profile);
        let unresolved: Vec<String> = title
            .unresolved
            .into_iter()
            .chain(rendered.unresolved)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let incomplete_sections = detect_incomplete_sections(&rendered.content, &unresolved);

        PolicyDocument {
            id: source.id.clone(),
            title: title.content,
            content: rendered.content,
            category: source.category.clone(),
            frameworks: source.frameworks.clone(),
            variables_used: source.variables.clone(),
            incomplete_sections,
        }
    }

    fn reference_warnings(
        &self,
        policies: &[PolicyDocument],
        candidates: &BTreeSet<String>,
    ) -> Vec<String> {
        let mut warnings = Vec::new();
        for policy in policies {
            let Some(source) = self.library.get(&policy.id) else {
                continue;
            };
            let mut seen = BTreeSet::new();
            for reference in &source.references {
                if !seen.insert(reference.as_str()) {
                    continue;
                }
                if !candidates.contains(reference) && !self.library.contains(reference) {
                    warnings.push(format!(
                        "Policy '{}' references missing policy: {reference}",
                        policy.id
                    ));
                }
            }
        }
        warnings
    }
}
