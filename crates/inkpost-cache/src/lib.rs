//! Cache abstraction for inkpost.
//!
//! Rendering artifacts that are expensive to produce (typeset formulas in
//! particular) are stored in named [`CacheBucket`]s obtained from a
//! [`Cache`]. A cached entry is only served when the caller presents the same
//! fingerprint it was stored with, so changing the producer (for example,
//! pointing at another typesetting server) invalidates old entries.
//!
//! Implementations:
//!
//! - [`NullCache`]: caching disabled, every lookup misses
//! - [`MemoryCache`]: process-local map, shared by all bucket handles
//! - [`FileCache`]: one file per entry under a versioned directory
//!
//! ```
//! use inkpost_cache::{Cache, CacheBucketExt, MemoryCache};
//!
//! let cache = MemoryCache::default();
//! let formulas = cache.bucket("math");
//! formulas.set_string("a1b2", "server-a", "<svg/>");
//! assert_eq!(formulas.get_string("a1b2", "server-a").as_deref(), Some("<svg/>"));
//! assert_eq!(formulas.get_string("a1b2", "server-b"), None);
//! ```

mod ext;
mod file;
mod memory;

pub use ext::CacheBucketExt;
pub use file::FileCache;
pub use memory::MemoryCache;

/// A named partition of a [`Cache`].
///
/// Entries are raw bytes addressed by `key` and guarded by a `fingerprint`.
/// Errors are never surfaced: a cache that cannot read or write behaves as
/// a miss.
pub trait CacheBucket: Send + Sync {
    /// Fetch the entry for `key` if it was stored with `fingerprint`.
    fn get(&self, key: &str, fingerprint: &str) -> Option<Vec<u8>>;

    /// Store `value` for `key`, replacing any previous entry.
    fn set(&self, key: &str, fingerprint: &str, value: &[u8]);
}

/// Factory for isolated [`CacheBucket`]s.
pub trait Cache: Send + Sync {
    /// Open (or create) the bucket called `name`.
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket>;
}

/// Bucket that stores nothing.
pub struct NullCacheBucket;

impl CacheBucket for NullCacheBucket {
    fn get(&self, _key: &str, _fingerprint: &str) -> Option<Vec<u8>> {
        None
    }

    fn set(&self, _key: &str, _fingerprint: &str, _value: &[u8]) {}
}

/// Cache used when caching is turned off.
pub struct NullCache;

impl Cache for NullCache {
    fn bucket(&self, _name: &str) -> Box<dyn CacheBucket> {
        Box::new(NullCacheBucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_cache_never_returns_stored_value() {
        let bucket = NullCache.bucket("math");
        bucket.set("e=mc^2", "local", b"<svg/>");
        assert_eq!(bucket.get("e=mc^2", "local"), None);
    }
}
