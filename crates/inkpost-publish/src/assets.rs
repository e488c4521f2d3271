//! Image path resolution against a notes vault.

use std::path::{Path, PathBuf};

use inkpost_renderer::{AssetResolver, is_passthrough_url};

/// Resolves image paths the way note-taking vaults link them.
///
/// Lookup order:
/// 1. relative to the directory of the document
/// 2. relative to the vault root
/// 3. any file in the vault with the same file name
///
/// Unresolved paths are returned unchanged.
#[derive(Debug, Default)]
pub struct VaultResolver {
    vault_dir: Option<PathBuf>,
}

impl VaultResolver {
    #[must_use]
    pub fn new(vault_dir: Option<PathBuf>) -> Self {
        Self { vault_dir }
    }

    fn find_by_name(&self, name: &str) -> Option<PathBuf> {
        let vault = self.vault_dir.as_deref()?;
        find_file(vault, name)
    }
}

/// Depth-first search for a file called `name`, skipping hidden entries.
/// Entries are visited in name order so the result is deterministic.
fn find_file(dir: &Path, name: &str) -> Option<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return None;
    };
    let mut entries: Vec<_> = entries
        .filter_map(Result::ok)
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .map(|e| {
            let is_dir = e.file_type().is_ok_and(|t| t.is_dir());
            (e.path(), is_dir)
        })
        .collect();
    entries.sort();

    for (path, is_dir) in &entries {
        if !is_dir && path.file_name().is_some_and(|n| n == name) {
            return Some(path.clone());
        }
    }
    entries
        .iter()
        .filter(|(_, is_dir)| *is_dir)
        .find_map(|(path, _)| find_file(path, name))
}

impl AssetResolver for VaultResolver {
    fn resolve(&self, path: &str, document: Option<&Path>) -> String {
        if is_passthrough_url(path) || path.is_empty() {
            return path.to_owned();
        }

        let relative = path.trim_start_matches("./");
        if let Some(dir) = document.and_then(Path::parent) {
            let candidate = dir.join(relative);
            if candidate.is_file() {
                return candidate.display().to_string();
            }
        }

        if let Some(vault) = &self.vault_dir {
            let candidate = vault.join(relative.trim_start_matches('/'));
            if candidate.is_file() {
                return candidate.display().to_string();
            }
        }

        let name = relative.rsplit('/').next().unwrap_or(relative);
        if let Some(found) = self.find_by_name(name) {
            tracing::debug!(image = path, found = %found.display(), "image found by name");
            return found.display().to_string();
        }

        tracing::warn!(image = path, "image not found, keeping original path");
        path.to_owned()
    }
}
