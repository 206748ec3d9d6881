//! The persisted cache boundary.
//!
//! The store treats the cache as a key-value store of opaque blobs; the
//! embedding process supplies the real backend. Keys follow three
//! key-spaces: `symbols/<uri>`, `references/<uri>` and `state`.

use std::collections::HashMap;
use std::sync::RwLock;
use thiserror::Error;

/// Cache key for a document's serialized symbol table.
pub fn symbols_key(uri: &str) -> String {
    format!("symbols/{}", uri)
}

/// Cache key for a document's serialized reference table.
pub fn references_key(uri: &str) -> String {
    format!("references/{}", uri)
}

/// Cache key of the workspace state blob.
pub const STATE_KEY: &str = "state";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache blob malformed: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("no cache entry for key {0}")]
    Missing(String),
}

/// Blob storage for serialized tables. Failures are non-fatal everywhere:
/// callers log and fall back to in-memory state.
pub trait Cache: Send + Sync {
    fn read(&self, key: &str) -> Result<Vec<u8>, CacheError>;
    fn write(&self, key: &str, blob: &[u8]) -> Result<(), CacheError>;
    fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// In-process cache used in tests and as a default backend.
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        MemoryCache::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Cache for MemoryCache {
    fn read(&self, key: &str) -> Result<Vec<u8>, CacheError> {
        self.entries
            .read()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
            .ok_or_else(|| CacheError::Missing(key.to_string()))
    }

    fn write(&self, key: &str, blob: &[u8]) -> Result<(), CacheError> {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.to_string(), blob.to_vec());
        }
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), CacheError> {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_cache_round_trip() {
        let cache = MemoryCache::new();
        cache.write("symbols/file:///a.php", b"blob").unwrap();
        assert_eq!(cache.read("symbols/file:///a.php").unwrap(), b"blob");
        cache.delete("symbols/file:///a.php").unwrap();
        assert!(matches!(
            cache.read("symbols/file:///a.php"),
            Err(CacheError::Missing(_))
        ));
    }

    #[test]
    fn test_key_spaces() {
        assert_eq!(symbols_key("file:///a.php"), "symbols/file:///a.php");
        assert_eq!(references_key("file:///a.php"), "references/file:///a.php");
        assert_eq!(STATE_KEY, "state");
    }
}
