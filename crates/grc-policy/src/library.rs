//! # Policy Library
//!
//! The set of policy sources available to a deployment, loaded from a
//! directory tree of Markdown files.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::document::{parse_policy, policy_id_for, PolicySource};
use crate::error::{PolicyError, PolicyResult};

/// Loaded policy sources keyed by id.
#[derive(Debug, Clone, Default)]
pub struct PolicyLibrary {
    policies: BTreeMap<String, PolicySource>,
}

impl PolicyLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a library from already-parsed sources. Later duplicates win.
    pub fn from_policies<I: IntoIterator<Item = PolicySource>>(policies: I) -> Self {
        Self {
            policies: policies.into_iter().map(|p| (p.id.clone(), p)).collect(),
        }
    }

    /// Load every `*.md` under `dir`, recursively.
    ///
    /// Files without frontmatter are skipped silently; files whose
    /// frontmatter fails to parse are skipped with a warning.
    pub fn load_dir(dir: &Path) -> PolicyResult<Self> {
        let mut library = Self::new();
        for path in markdown_files(dir)? {
            let text = match read_text(&path) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable policy");
                    continue;
                }
            };
            match parse_policy(&text, &path) {
                Ok(Some(policy)) => {
                    if let Some(previous) = library.policies.get(&policy.id) {
                        tracing::warn!(
                            policy = %policy.id,
                            first = %previous.path.display(),
                            second = %path.display(),
                            "duplicate policy id; keeping the later file"
                        );
                    }
                    library.policies.insert(policy.id.clone(), policy);
                }
                Ok(None) => {
                    tracing::debug!(path = %path.display(), "no frontmatter; not a policy source");
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping policy");
                }
            }
        }
        tracing::info!(dir = %dir.display(), policies = library.len(), "policy library loaded");
        Ok(library)
    }

    pub fn get(&self, policy_id: &str) -> Option<&PolicySource> {
        self.policies.get(policy_id)
    }

    pub fn contains(&self, policy_id: &str) -> bool {
        self.policies.contains_key(policy_id)
    }

    pub fn ids(&self) -> BTreeSet<String> {
        self.policies.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PolicySource> {
        self.policies.values()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Policies grouped by category (empty category as `uncategorized`).
    pub fn by_category(&self) -> BTreeMap<String, Vec<&PolicySource>> {
        let mut groups: BTreeMap<String, Vec<&PolicySource>> = BTreeMap::new();
        for policy in self.policies.values() {
            let category = if policy.category.is_empty() {
                "uncategorized".to_string()
            } else {
                policy.category.clone()
            };
            groups.entry(category).or_default().push(policy);
        }
        groups
    }
}

/// Collect policy ids from every `*.md` under `dir`.
///
/// Unlike [`PolicyLibrary::load_dir`], every Markdown file counts: the id is
/// the frontmatter `id` when present, else the file stem.
pub fn scan_policy_ids(dir: &Path) -> PolicyResult<BTreeSet<String>> {
    let mut ids = BTreeSet::new();
    for path in markdown_files(dir)? {
        let id = match read_text(&path) {
            Ok(text) => policy_id_for(&text, &path),
            Err(_) => crate::document::file_stem(&path),
        };
        if !id.is_empty() {
            ids.insert(id);
        }
    }
    Ok(ids)
}

fn read_text(path: &Path) -> PolicyResult<String> {
    std::fs::read_to_string(path).map_err(|e| PolicyError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Every `*.md` file under `dir`, sorted.
fn markdown_files(dir: &Path) -> PolicyResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(PolicyError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }
    let mut files = Vec::new();
    walk_for_markdown(dir, &mut files);
    files.sort();
    Ok(files)
}

fn walk_for_markdown(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to read directory");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            walk_for_markdown(&path, out);
        } else if path.extension().and_then(|e| e.to_str()) == Some("md") {
            out.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn load_dir_walks_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "security/access.md", "---\nid: access-control\ncategory: security\n---\nbody");
        write(dir.path(), "hr/onboarding.md", "---\ntitle: Onboarding\n---\nbody");
        write(dir.path(), "README.md", "# Library readme");
        write(dir.path(), "notes.txt", "---\nid: not-markdown\n---\n");

        let lib = PolicyLibrary::load_dir(dir.path()).unwrap();
        let ids: Vec<String> = lib.ids().into_iter().collect();
        assert_eq!(ids, vec!["access-control", "onboarding"]);
        assert!(lib.contains("onboarding"));
        let groups = lib.by_category();
        assert_eq!(groups["security"].len(), 1);
        assert_eq!(groups["uncategorized"].len(), 1);
    }

    #[test]
    fn scan_counts_files_without_frontmatter() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.md", "---\nid: alpha\n---\n");
        write(dir.path(), "sub/b.md", "plain text");
        write(dir.path(), "c.md", "---\nid: [broken\n---\n");

        let ids: Vec<String> = scan_policy_ids(dir.path()).unwrap().into_iter().collect();
        assert_eq!(ids, vec!["alpha", "b", "c"]);
    }

    #[test]
    fn load_and_scan_agree_on_unknown_status() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "ac.md",
            "---\nid: access-control\nstatus: approved\ntype: template\nframeworks:\n  soc2: [CC6.1]\n---\nbody",
        );

        let lib = PolicyLibrary::load_dir(dir.path()).unwrap();
        let scanned = scan_policy_ids(dir.path()).unwrap();
        assert_eq!(lib.ids(), scanned);
        assert!(lib.get("access-control").unwrap().maps_to("soc2"));
    }

    #[test]
    fn missing_directory_errors() {
        assert!(matches!(
            PolicyLibrary::load_dir(Path::new("/no/such/policies")),
            Err(PolicyError::DirectoryNotFound { .. })
        ));
        assert!(scan_policy_ids(Path::new("/no/such/policies")).is_err());
    }
}
