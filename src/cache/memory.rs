//! In-process cache bounded by total stored bytes.

use bytes::Bytes;

use super::Cache;

/// Memory-backed [`Cache`] using moka's concurrent LRU-ish eviction.
#[derive(Clone)]
pub struct MemoryCache {
    inner: moka::sync::Cache<String, Bytes>,
}

impl MemoryCache {
    /// Create a cache holding at most `max_bytes` of values.
    pub fn new(max_bytes: u64) -> Self {
        let inner = moka::sync::Cache::builder()
            .weigher(|_key: &String, value: &Bytes| -> u32 {
                value.len().try_into().unwrap_or(u32::MAX)
            })
            .max_capacity(max_bytes)
            .build();

        Self { inner }
    }

    /// Number of entries currently stored.
    pub fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks();
        self.inner.entry_count()
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Option<Bytes> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: Bytes) {
        self.inner.insert(key.to_string(), value);
    }

    fn delete(&self, key: &str) {
        self.inner.invalidate(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let cache = MemoryCache::new(1024);

        cache.set("a", Bytes::from_static(b"alpha"));
        assert_eq!(cache.get("a"), Some(Bytes::from_static(b"alpha")));

        cache.set("a", Bytes::from_static(b"beta"));
        assert_eq!(cache.get("a"), Some(Bytes::from_static(b"beta")));

        cache.delete("a");
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn test_capacity_is_bounded() {
        let cache = MemoryCache::new(100);
        for i in 0..50 {
            cache.set(&format!("key-{}", i), Bytes::from(vec![0u8; 10]));
        }
        assert!(cache.entry_count() <= 10);
    }
}
