//! On-disk [`Cache`].
//!
//! Layout:
//!
//! ```text
//! {root}/
//! +-- VERSION
//! +-- math/              # bucket
//!     +-- 3f/            # first two characters of the key
//!         +-- 3f9a...    # entry: "{fingerprint}\n{data}"
//! ```
//!
//! Keys are restricted to ASCII alphanumerics, `-` and `_` so they can be
//! used as file names directly; content hashes satisfy this. Entries with
//! any other key are silently not cached.

use std::fs;
use std::path::{Path, PathBuf};

use crate::{Cache, CacheBucket};

/// Directory-backed [`Cache`] with a version stamp.
///
/// When the `VERSION` file does not hold the expected version, the whole
/// directory is discarded so entries written by an incompatible build are
/// never read back.
pub struct FileCache {
    root: PathBuf,
}

impl FileCache {
    /// Open the cache at `root`, wiping it if `version` differs from the
    /// stored one. Filesystem errors are logged and otherwise ignored.
    #[must_use]
    pub fn new(root: PathBuf, version: &str) -> Self {
        ensure_version(&root, version);
        Self { root }
    }

    /// Cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Cache for FileCache {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        Box::new(FileBucket {
            dir: self.root.join(name),
        })
    }
}

struct FileBucket {
    dir: PathBuf,
}

impl FileBucket {
    fn entry_path(&self, key: &str) -> Option<PathBuf> {
        let valid = key.len() > 2
            && key
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        valid.then(|| self.dir.join(&key[..2]).join(key))
    }
}

impl CacheBucket for FileBucket {
    fn get(&self, key: &str, fingerprint: &str) -> Option<Vec<u8>> {
        let bytes = fs::read(self.entry_path(key)?).ok()?;
        let newline = bytes.iter().position(|&b| b == b'\n')?;
        if &bytes[..newline] != fingerprint.as_bytes() {
            return None;
        }
        Some(bytes[newline + 1..].to_vec())
    }

    fn set(&self, key: &str, fingerprint: &str, value: &[u8]) {
        let Some(path) = self.entry_path(key) else {
            tracing::debug!(key, "cache key is not file-safe, skipping");
            return;
        };
        if fingerprint.contains('\n') {
            return;
        }
        let Some(parent) = path.parent() else {
            return;
        };
        if let Err(e) = fs::create_dir_all(parent) {
            tracing::debug!(error = %e, "failed to create cache directory");
            return;
        }

        let mut buf = Vec::with_capacity(fingerprint.len() + 1 + value.len());
        buf.extend_from_slice(fingerprint.as_bytes());
        buf.push(b'\n');
        buf.extend_from_slice(value);

        if let Err(e) = fs::write(&path, &buf) {
            tracing::debug!(error = %e, path = %path.display(), "failed to write cache entry");
        }
    }
}

fn ensure_version(root: &Path, version: &str) {
    let version_file = root.join("VERSION");

    match fs::read_to_string(&version_file) {
        Ok(stored) if stored == version => {
            tracing::debug!(version, "cache version matches");
            return;
        }
        Ok(stored) => {
            tracing::info!(stored = %stored, current = version, "cache version changed, wiping cache");
        }
        Err(_) => {
            tracing::debug!(root = %root.display(), "initializing cache");
        }
    }

    if root.exists()
        && let Err(e) = fs::remove_dir_all(root)
    {
        tracing::warn!("failed to remove cache directory: {e}");
    }
    if let Err(e) = fs::create_dir_all(root) {
        tracing::warn!("failed to create cache directory: {e}");
        return;
    }
    if let Err(e) = fs::write(&version_file, version) {
        tracing::warn!("failed to write cache VERSION file: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const KEY: &str = "3f9a0c";

    #[test]
    fn test_set_and_get() {
        let tmp = TempDir::new().unwrap();
        let cache = FileCache::new(tmp.path().join("cache"), "1");
        let bucket = cache.bucket("math");

        bucket.set(KEY, "https://tex.local", b"<svg>x</svg>");
        assert_eq!(
            bucket.get(KEY, "https://tex.local"),
            Some(b"<svg>x</svg>".to_vec())
        );
        assert!(tmp.path().join("cache/math/3f").join(KEY).exists());
    }

    #[test]
    fn test_fingerprint_mismatch_misses() {
        let tmp = TempDir::new().unwrap();
        let cache = FileCache::new(tmp.path().join("cache"), "1");
        let bucket = cache.bucket("math");

        bucket.set(KEY, "server-a", b"svg");
        assert_eq!(bucket.get(KEY, "server-b"), None);
    }

    #[test]
    fn test_value_may_contain_newlines() {
        let tmp = TempDir::new().unwrap();
        let cache = FileCache::new(tmp.path().join("cache"), "1");
        let bucket = cache.bucket("math");

        bucket.set(KEY, "fp", b"<svg>\n<path/>\n</svg>");
        assert_eq!(bucket.get(KEY, "fp"), Some(b"<svg>\n<path/>\n</svg>".to_vec()));
    }

    #[test]
    fn test_unsafe_keys_are_not_cached() {
        let tmp = TempDir::new().unwrap();
        let cache = FileCache::new(tmp.path().join("cache"), "1");
        let bucket = cache.bucket("math");

        bucket.set("../escape", "fp", b"x");
        bucket.set("ab", "fp", b"x");
        assert_eq!(bucket.get("../escape", "fp"), None);
        assert_eq!(bucket.get("ab", "fp"), None);
        assert!(!tmp.path().join("escape").exists());
    }

    #[test]
    fn test_missing_entry() {
        let tmp = TempDir::new().unwrap();
        let cache = FileCache::new(tmp.path().join("cache"), "1");
        assert_eq!(cache.bucket("math").get(KEY, "fp"), None);
    }

    #[test]
    fn test_same_version_keeps_entries() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("cache");

        FileCache::new(root.clone(), "1").bucket("math").set(KEY, "fp", b"kept");
        let reopened = FileCache::new(root, "1");
        assert_eq!(reopened.bucket("math").get(KEY, "fp"), Some(b"kept".to_vec()));
    }

    #[test]
    fn test_new_version_wipes_entries() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("cache");

        FileCache::new(root.clone(), "1").bucket("math").set(KEY, "fp", b"stale");
        let reopened = FileCache::new(root.clone(), "2");
        assert_eq!(reopened.bucket("math").get(KEY, "fp"), None);
        assert_eq!(fs::read_to_string(root.join("VERSION")).unwrap(), "2");
    }

    #[test]
    fn test_creates_missing_root() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("a/b/cache");

        let cache = FileCache::new(root.clone(), "1");
        assert_eq!(cache.root(), root.as_path());
        assert_eq!(fs::read_to_string(root.join("VERSION")).unwrap(), "1");
    }
}
