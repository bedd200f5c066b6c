//! CLI configuration.
//!
//! Values are layered, lowest precedence first: built-in defaults, an
//! optional YAML file, `GRC_*` environment variables, then command-line
//! flags (applied by the entry point).
//!
//! Variables:
//! - `GRC_POLICIES_DIR` (default: `policies`)
//! - `GRC_FRAMEWORKS_DIR` (default: `config/frameworks`)
//! - `GRC_OUTPUT_DIR` (default: `output`)
//! - `GRC_LOG_LEVEL` (default: `info`)

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::level_filters::LevelFilter;

use crate::resolve_path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub policies_dir: PathBuf,
    pub frameworks_dir: PathBuf,
    pub output_dir: PathBuf,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            policies_dir: PathBuf::from("policies"),
            frameworks_dir: PathBuf::from("config/frameworks"),
            output_dir: PathBuf::from("output"),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, overlaid with `file` when given, then with the process
    /// environment.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env(|key| std::env::var(key).ok())
    }

    /// Read a YAML config file. Keys it omits keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()
    }

    /// Overlay `GRC_*` variables read through `lookup`.
    pub fn with_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("GRC_POLICIES_DIR") {
            self.policies_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("GRC_FRAMEWORKS_DIR") {
            self.frameworks_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("GRC_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup("GRC_LOG_LEVEL") {
            self.log_level = level;
        }
        self.validate()
    }

    /// The configured level as a tracing filter.
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::InvalidLogLevel(self.log_level.clone()))
    }

    /// Copy with every directory resolved against `root`. The output
    /// directory need not exist yet, so it is always rooted there.
    pub fn resolved(&self, root: &Path) -> Self {
        Self {
            policies_dir: resolve_path(&self.policies_dir, root),
            frameworks_dir: resolve_path(&self.frameworks_dir, root),
            output_dir: if self.output_dir.is_absolute() {
                self.output_dir.clone()
            } else {
                root.join(&self.output_dir)
            },
            log_level: self.log_level.clone(),
        }
    }

    fn validate(self) -> Result<Self, ConfigError> {
        self.level_filter()?;
        Ok(self)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("invalid log level: {0:?} (expected off, error, warn, info, debug, or trace)")]
    InvalidLogLevel(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.policies_dir, PathBuf::from("policies"));
        assert_eq!(config.frameworks_dir, PathBuf::from("config/frameworks"));
        assert_eq!(config.output_dir, PathBuf::from("output"));
        assert_eq!(config.level_filter().unwrap(), LevelFilter::INFO);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grc.yaml");
        std::fs::write(&path, "policies_dir: library\nlog_level: debug\n").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.policies_dir, PathBuf::from("library"));
        assert_eq!(config.frameworks_dir, PathBuf::from("config/frameworks"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn env_overrides_file() {
        let config = AppConfig {
            output_dir: PathBuf::from("from-file"),
            ..AppConfig::default()
        }
        .with_env(env(&[("GRC_OUTPUT_DIR", "/tmp/out"), ("GRC_LOG_LEVEL", "warn")]))
        .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        let err = AppConfig::default()
            .with_env(env(&[("GRC_LOG_LEVEL", "loud")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel(level) if level == "loud"));
    }

    #[test]
    fn unknown_key_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grc.yaml");
        std::fs::write(&path, "policy_dir: typo\n").unwrap();
        assert!(matches!(
            AppConfig::from_file(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = AppConfig::from_file(Path::new("/nonexistent/grc.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn resolved_joins_relative_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("policies")).unwrap();
        let config = AppConfig::default().resolved(dir.path());
        assert_eq!(config.policies_dir, dir.path().join("policies"));
        assert_eq!(config.output_dir, dir.path().join("output"));
    }
}
