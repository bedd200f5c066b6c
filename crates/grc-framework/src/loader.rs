//! # Framework Loader
//!
//! Turns one framework definition into a [`Framework`]. Metadata comes from
//! the `framework:` block; the id falls back to the source file stem.
//!
//! Directory loading is best-effort: a file that fails to read, parse, or
//! match a recognized shape is logged and skipped, and the rest of the batch
//! continues.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{FrameworkError, FrameworkResult};
use crate::model::Framework;
use crate::parser::{find_definition_files, parse_yaml_typed, read_source};
use crate::shape::{FrameworkDefinition, FrameworkShape, RECOGNIZED_SHAPES};

/// Build a [`Framework`] from a parsed definition.
///
/// `source` names the definition in errors and supplies the fallback id.
pub fn load_framework(mut definition: FrameworkDefinition, source: &Path) -> FrameworkResult<Framework> {
    let shape = FrameworkShape::take_from(&mut definition).ok_or_else(|| {
        FrameworkError::UnrecognizedStructure {
            source_name: source.display().to_string(),
            expected: RECOGNIZED_SHAPES,
        }
    })?;

    let header = definition.framework;
    let id = header
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| fallback_id(source));

    tracing::debug!(framework = %id, shape = shape.key(), "parsing framework definition");

    Ok(Framework {
        id,
        name: header.name,
        version: header.version,
        release_date: header.release_date,
        authority: header.authority,
        url: header.url,
        controls: shape.into_controls(),
    })
}

/// Parse definition text and build a [`Framework`].
pub fn load_framework_str(text: &str, source: &Path) -> FrameworkResult<Framework> {
    let definition: FrameworkDefinition = parse_yaml_typed(text, &source.display().to_string())?;
    load_framework(definition, source)
}

/// Read, parse, and build a [`Framework`] from a file.
pub fn load_framework_file(path: &Path) -> FrameworkResult<Framework> {
    let text = read_source(path)?;
    load_framework_str(&text, path)
}

fn fallback_id(source: &Path) -> String {
    source
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| source.display().to_string())
}

/// A definition file that was skipped during a directory load.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub error: String,
}

/// Result of loading every definition in a directory.
#[derive(Debug, Default)]
pub struct DirectoryLoad {
    /// Successfully built frameworks, in file order.
    pub frameworks: Vec<Framework>,
    /// Files that failed, with the reason.
    pub skipped: Vec<SkippedFile>,
}

/// Load every `*.yaml`/`*.yml` definition in `dir`.
///
/// Only a missing or unreadable directory is an error; individual files
/// that fail are recorded in [`DirectoryLoad::skipped`].
pub fn load_directory(dir: &Path) -> FrameworkResult<DirectoryLoad> {
    let files = find_definition_files(dir)?;
    let mut load = DirectoryLoad::default();

    for path in files {
        match load_framework_file(&path) {
            Ok(framework) => {
                tracing::debug!(
                    framework = %framework.id,
                    controls = framework.total_controls(),
                    "loaded framework"
                );
                load.frameworks.push(framework);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "skipping framework definition");
                load.skipped.push(SkippedFile {
                    path,
                    error: e.to_string(),
                });
            }
        }
    }

    tracing::info!(
        dir = %dir.display(),
        loaded = load.frameworks.len(),
        skipped = load.skipped.len(),
        "framework directory loaded"
    );
    Ok(load)
}
