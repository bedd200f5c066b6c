//! Shared YAML parsing infrastructure.
//!
//! Framework definitions are deserialized straight from text into typed
//! structs. They never pass through `serde_yaml::Value`: a plain scalar such
//! as `1.10` would become the float `1.1` there, while a `String` target
//! receives the scalar's source text unchanged.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::error::{FrameworkError, FrameworkResult};

/// Read a file to a string, mapping a missing file to `FileNotFound`.
pub fn read_source(path: &Path) -> FrameworkResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            FrameworkError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            FrameworkError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}

/// Parse YAML (or JSON, a YAML subset) text into a strongly-typed struct.
pub fn parse_yaml_typed<T: DeserializeOwned>(text: &str, source_name: &str) -> FrameworkResult<T> {
    serde_yaml::from_str(text).map_err(|e| FrameworkError::YamlParse {
        source_name: source_name.to_string(),
        source: e,
    })
}

/// Load a YAML file into a strongly-typed struct.
pub fn load_yaml_typed<T: DeserializeOwned>(path: &Path) -> FrameworkResult<T> {
    let content = read_source(path)?;
    parse_yaml_typed(&content, &path.display().to_string())
}

/// List `*.yaml` and `*.yml` files directly inside `dir`, sorted by path.
pub fn find_definition_files(dir: &Path) -> FrameworkResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(FrameworkError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }
    let entries = std::fs::read_dir(dir).map_err(|e| FrameworkError::Io {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "failed to read directory entry");
                continue;
            }
        };
        let path = entry.path();
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext == "yaml" || ext == "yml");
        if is_yaml && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
