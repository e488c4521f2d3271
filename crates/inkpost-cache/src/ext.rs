use crate::CacheBucket;

/// UTF-8 helpers on top of the byte-oriented [`CacheBucket`].
pub trait CacheBucketExt: CacheBucket {
    /// Fetch a cached string. Invalid UTF-8 counts as a miss.
    fn get_string(&self, key: &str, fingerprint: &str) -> Option<String> {
        let bytes = self.get(key, fingerprint)?;
        String::from_utf8(bytes).ok()
    }

    /// Store a string.
    fn set_string(&self, key: &str, fingerprint: &str, value: &str) {
        self.set(key, fingerprint, value.as_bytes());
    }
}

impl<B: CacheBucket + ?Sized> CacheBucketExt for B {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cache, MemoryCache};

    #[test]
    fn test_invalid_utf8_is_a_miss() {
        let bucket = MemoryCache::default().bucket("math");
        bucket.set("k", "f", &[0xFF, 0xFE]);
        assert_eq!(bucket.get_string("k", "f"), None);
        assert!(bucket.get("k", "f").is_some());
    }

    #[test]
    fn test_boxed_bucket_string_round_trip() {
        let bucket: Box<dyn CacheBucket> = MemoryCache::default().bucket("math");
        bucket.set_string("k", "f", "\\frac{1}{2}");
        assert_eq!(bucket.get_string("k", "f").as_deref(), Some("\\frac{1}{2}"));
    }
}
