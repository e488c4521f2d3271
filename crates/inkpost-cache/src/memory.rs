use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::{Cache, CacheBucket};

type Entries = HashMap<(String, String), (String, Vec<u8>)>;

/// In-process [`Cache`].
///
/// Bucket handles opened from the same `MemoryCache` (or its clones) share
/// one map, so a value stored through one handle is visible to the others.
#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<Mutex<Entries>>,
}

impl MemoryCache {
    /// Number of entries across all buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().map_or(0, |entries| entries.len())
    }

    /// Whether nothing has been stored yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for MemoryCache {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        Box::new(MemoryBucket {
            name: name.to_owned(),
            entries: Arc::clone(&self.entries),
        })
    }
}

struct MemoryBucket {
    name: String,
    entries: Arc<Mutex<Entries>>,
}

impl CacheBucket for MemoryBucket {
    fn get(&self, key: &str, fingerprint: &str) -> Option<Vec<u8>> {
        let entries = self.entries.lock().ok()?;
        let (stored, value) = entries.get(&(self.name.clone(), key.to_owned()))?;
        (stored == fingerprint).then(|| value.clone())
    }

    fn set(&self, key: &str, fingerprint: &str, value: &[u8]) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                (self.name.clone(), key.to_owned()),
                (fingerprint.to_owned(), value.to_vec()),
            );
        }
    }
}
