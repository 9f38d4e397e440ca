//! Byte stores backing the caching transport.
//!
//! Entries are complete HTTP responses in wire form, keyed by the request
//! URL (fragment included). Stores must be safe for concurrent use; the
//! caching transport adds no locking of its own.

pub mod memory;

use bytes::Bytes;

pub use memory::MemoryCache;

/// A key/value store for serialized responses.
pub trait Cache: Send + Sync {
    /// Return the stored value for `key`, if any.
    fn get(&self, key: &str) -> Option<Bytes>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: Bytes);

    /// Remove `key`.
    fn delete(&self, key: &str);
}

/// A cache that stores nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NopCache;

impl Cache for NopCache {
    fn get(&self, _key: &str) -> Option<Bytes> {
        None
    }

    fn set(&self, _key: &str, _value: Bytes) {}

    fn delete(&self, _key: &str) {}
}
