//! Loading the framework registry and policy library a command works on.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use grc_framework::ComplianceMapper;
use grc_policy::{scan_policy_ids, PolicyLibrary};

use crate::config::AppConfig;

/// Every framework definition under the configured frameworks directory.
pub fn load_mapper(config: &AppConfig) -> Result<ComplianceMapper> {
    let mut mapper = ComplianceMapper::new();
    mapper
        .load_all_frameworks(&config.frameworks_dir)
        .with_context(|| {
            format!(
                "loading frameworks from {}",
                config.frameworks_dir.display()
            )
        })?;
    Ok(mapper)
}

/// Policy sources with frontmatter under the configured policies directory.
pub fn load_library(config: &AppConfig) -> Result<PolicyLibrary> {
    PolicyLibrary::load_dir(&config.policies_dir).with_context(|| {
        format!(
            "loading policy library from {}",
            config.policies_dir.display()
        )
    })
}

/// Ids of every Markdown file under the policies directory, for gap
/// analysis.
pub fn available_policy_ids(config: &AppConfig) -> Result<BTreeSet<String>> {
    scan_policy_ids(&config.policies_dir).with_context(|| {
        format!(
            "scanning policy ids in {}",
            config.policies_dir.display()
        )
    })
}

/// `requested`, or every loaded framework id when nothing was requested.
pub fn framework_selection(mapper: &ComplianceMapper, requested: Option<&str>) -> Vec<String> {
    match requested {
        Some(list) => crate::split_ids(list),
        None => mapper.framework_ids(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::Path;

    use super::*;

    pub(crate) const SOC2: &str = r#"
framework:
  id: soc2
  name: SOC 2
  version: "2017"
categories:
  CC6:
    name: Logical Access
    criteria:
      CC6.1:
        name: Access Security
        policies_required: [access-control, encryption]
      CC6.2:
        name: User Registration
        policies_required: [access-control]
"#;

    pub(crate) const HIPAA: &str = r#"
framework:
  id: hipaa
  name: HIPAA Security Rule
  version: "2013"
sections:
  "164.312":
    name: Technical Safeguards
    controls:
      "164.312(a)":
        name: Access Control
        policies_required: [access-control, encryption, audit-logging]
"#;

    pub(crate) const ACCESS_CONTROL: &str = "---\nid: access-control\ntitle: Access Control Policy\ncategory: security\nreferences: [encryption, incident-response]\n---\n\n# Purpose\n\n{{ORGANIZATION_NAME}} limits access.\n\n## Owner\n\n[ACTION REQUIRED: name the system owner]\n";

    pub(crate) const ENCRYPTION: &str = "---\nid: encryption\ntitle: Encryption Policy\ncategory: security\n---\n\n{{ORGANIZATION_NAME}} encrypts data. Contact {{CONTACT_EMAIL}}.\n";

    /// A project root with two frameworks and two policies.
    pub(crate) fn fixture(root: &Path) -> AppConfig {
        let frameworks = root.join("config").join("frameworks");
        let policies = root.join("policies").join("security");
        std::fs::create_dir_all(&frameworks).unwrap();
        std::fs::create_dir_all(&policies).unwrap();
        std::fs::write(frameworks.join("soc2.yaml"), SOC2).unwrap();
        std::fs::write(frameworks.join("hipaa.yaml"), HIPAA).unwrap();
        std::fs::write(policies.join("access-control.md"), ACCESS_CONTROL).unwrap();
        std::fs::write(policies.join("encryption.md"), ENCRYPTION).unwrap();
        AppConfig::default().resolved(root)
    }

    #[test]
    fn loads_fixture() {
        let dir = tempfile::tempdir().unwrap();
        let config = fixture(dir.path());
        let mapper = load_mapper(&config).unwrap();
        assert_eq!(mapper.framework_ids(), ["hipaa", "soc2"]);
        assert_eq!(load_library(&config).unwrap().len(), 2);
        assert_eq!(
            available_policy_ids(&config).unwrap(),
            BTreeSet::from(["access-control".to_string(), "encryption".to_string()])
        );
    }

    #[test]
    fn missing_frameworks_dir_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::default().resolved(dir.path());
        let err = load_mapper(&config).unwrap_err();
        assert!(format!("{err:#}").contains("loading frameworks from"));
    }

    #[test]
    fn selection_defaults_to_all() {
        let dir = tempfile::tempdir().unwrap();
        let mapper = load_mapper(&fixture(dir.path())).unwrap();
        assert_eq!(framework_selection(&mapper, None), ["hipaa", "soc2"]);
        assert_eq!(framework_selection(&mapper, Some("soc2, x")), ["soc2", "x"]);
    }
}
