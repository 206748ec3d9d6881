//! The workspace-wide reference index.
//!
//! Open documents keep their [`ReferenceTable`] in memory; closing a
//! document flushes the table into the cache and drops it. An inverted
//! index from lowercased identity to uris lets `find_references` touch only
//! the documents that mention a name, materializing closed tables on
//! demand. Per-document states: Open -> Closed -> Removed; every
//! transition is total and closing a never-opened document is a no-op.

use crate::cache::{references_key, Cache};
use dashmap::DashMap;
use php_analyzer_types::{Location, ReferenceTable};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

pub struct ReferenceStore {
    open: DashMap<String, Arc<ReferenceTable>>,
    closed: DashMap<String, ()>,
    names: RwLock<HashMap<String, Vec<String>>>,
    cache: Arc<dyn Cache>,
}

impl ReferenceStore {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        ReferenceStore {
            open: DashMap::new(),
            closed: DashMap::new(),
            names: RwLock::new(HashMap::new()),
            cache,
        }
    }

    /// Add or replace the table of an open document.
    pub fn add(&self, table: ReferenceTable) {
        let uri = table.uri.clone();
        self.unindex(&uri);
        self.index(&table);
        self.closed.remove(&uri);
        self.open.insert(uri, Arc::new(table));
    }

    /// Flush an open document to the cache and drop the in-memory table.
    /// On a cache failure the table stays open: memory is authoritative.
    pub fn close(&self, uri: &str) {
        let Some((_, table)) = self.open.remove(uri) else {
            return;
        };
        let blob = match serde_json::to_vec(&*table) {
            Ok(blob) => blob,
            Err(err) => {
                tracing::warn!(uri, %err, "failed to encode reference table");
                self.open.insert(uri.to_string(), table);
                return;
            }
        };
        match self.cache.write(&references_key(uri), &blob) {
            Ok(()) => {
                self.closed.insert(uri.to_string(), ());
            }
            Err(err) => {
                tracing::warn!(uri, %err, "failed to cache reference table");
                self.open.insert(uri.to_string(), table);
            }
        }
    }

    /// Re-register a document cached in an earlier session as Closed,
    /// rebuilding its name index entries from the cached table.
    pub fn restore_closed(&self, uri: &str) -> bool {
        self.closed.insert(uri.to_string(), ());
        match self.table(uri) {
            Some(table) => {
                self.unindex(uri);
                self.index(&table);
                true
            }
            None => {
                self.closed.remove(uri);
                false
            }
        }
    }

    /// Forget a document entirely.
    pub fn remove(&self, uri: &str) {
        self.open.remove(uri);
        self.closed.remove(uri);
        if let Err(err) = self.cache.delete(&references_key(uri)) {
            tracing::warn!(uri, %err, "failed to delete cached reference table");
        }
        self.unindex(uri);
    }

    /// The table for a uri: in-memory for open documents, materialized
    /// from the cache for closed ones.
    pub fn table(&self, uri: &str) -> Option<Arc<ReferenceTable>> {
        if let Some(table) = self.open.get(uri) {
            return Some(table.value().clone());
        }
        if !self.closed.contains_key(uri) {
            return None;
        }
        let blob = match self.cache.read(&references_key(uri)) {
            Ok(blob) => blob,
            Err(err) => {
                tracing::warn!(uri, %err, "failed to read cached reference table");
                return None;
            }
        };
        match serde_json::from_slice::<ReferenceTable>(&blob) {
            Ok(table) => Some(Arc::new(table)),
            Err(err) => {
                tracing::warn!(uri, %err, "cached reference table malformed");
                None
            }
        }
    }

    pub fn is_open(&self, uri: &str) -> bool {
        self.open.contains_key(uri)
    }

    pub fn uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.open.iter().map(|e| e.key().clone()).collect();
        uris.extend(self.closed.iter().map(|e| e.key().clone()));
        uris.sort();
        uris
    }

    /// Every location across the workspace that references `name` (any of
    /// a reference's identities counts).
    pub fn find_references(&self, name: &str) -> Vec<Location> {
        let needle = name.trim_start_matches('\\');
        let key = needle.to_lowercase();

        let uris = self
            .names
            .read()
            .ok()
            .and_then(|names| names.get(&key).cloned())
            .unwrap_or_default();

        let mut out = Vec::new();
        for uri in uris {
            let Some(table) = self.table(&uri) else {
                continue;
            };
            for reference in table.iter() {
                let hit = reference
                    .identities()
                    .iter()
                    .any(|id| id.trim_start_matches('\\').eq_ignore_ascii_case(needle));
                if hit {
                    out.push(Location::new(uri.clone(), reference.range));
                }
            }
        }
        out
    }

    fn index(&self, table: &ReferenceTable) {
        let Ok(mut names) = self.names.write() else {
            return;
        };
        for reference in table.iter() {
            for identity in reference.identities() {
                let key = identity.trim_start_matches('\\').to_lowercase();
                let uris = names.entry(key).or_default();
                if !uris.contains(&table.uri) {
                    uris.push(table.uri.clone());
                }
            }
        }
    }

    fn unindex(&self, uri: &str) {
        if let Ok(mut names) = self.names.write() {
            names.retain(|_, uris| {
                uris.retain(|u| u != uri);
                !uris.is_empty()
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheError, MemoryCache};
    use php_analyzer_types::{Position, Range, Reference, Scope, ScopeChild, SymbolKind};

    fn range(line: u32, start: u32, end: u32) -> Range {
        Range::new(Position::new(line, start), Position::new(line, end))
    }

    fn table(uri: &str) -> ReferenceTable {
        let mut root = Scope::new(range(0, 0, 80));
        root.children.push(ScopeChild::Ref(Reference::new(
            SymbolKind::Class,
            "A\\B\\Foo",
            range(1, 4, 7),
        )));
        let mut inner = Scope::new(range(2, 0, 60));
        inner.children.push(ScopeChild::Ref(Reference::new(
            SymbolKind::Method,
            "A\\B\\Foo::bar",
            range(2, 10, 13),
        )));
        root.children.push(ScopeChild::Scope(inner));
        ReferenceTable::new(uri, 7, root)
    }

    fn store() -> ReferenceStore {
        ReferenceStore::new(Arc::new(MemoryCache::new()))
    }

    #[test]
    fn test_find_references_across_documents() {
        let store = store();
        store.add(table("file:///a.php"));
        store.add(table("file:///b.php"));

        let locations = store.find_references("a\\b\\foo");
        assert_eq!(locations.len(), 2);
        let locations = store.find_references("\\A\\B\\Foo::bar");
        assert_eq!(locations.len(), 2);
        assert!(store.find_references("A\\B\\Missing").is_empty());
    }

    #[test]
    fn test_close_flushes_and_materializes_on_demand() {
        let cache = Arc::new(MemoryCache::new());
        let store = ReferenceStore::new(cache.clone());
        store.add(table("file:///a.php"));

        store.close("file:///a.php");
        assert!(!store.is_open("file:///a.php"));
        assert_eq!(cache.len(), 1);

        // Closed document still answers queries through the cache.
        let materialized = store.table("file:///a.php").expect("materialized table");
        assert_eq!(materialized.hash, 7);
        assert_eq!(store.find_references("A\\B\\Foo").len(), 1);
    }

    #[test]
    fn test_close_of_never_opened_document_is_noop() {
        let store = store();
        store.close("file:///nope.php");
        assert!(store.uris().is_empty());
    }

    #[test]
    fn test_remove_forgets_everything() {
        let cache = Arc::new(MemoryCache::new());
        let store = ReferenceStore::new(cache.clone());
        store.add(table("file:///a.php"));
        store.close("file:///a.php");
        store.remove("file:///a.php");

        assert!(store.table("file:///a.php").is_none());
        assert!(store.find_references("A\\B\\Foo").is_empty());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_cache_failure_keeps_table_open() {
        struct FailingCache;
        impl Cache for FailingCache {
            fn read(&self, key: &str) -> Result<Vec<u8>, CacheError> {
                Err(CacheError::Missing(key.to_string()))
            }
            fn write(&self, _key: &str, _blob: &[u8]) -> Result<(), CacheError> {
                Err(CacheError::Io(std::io::Error::other("disk full")))
            }
            fn delete(&self, _key: &str) -> Result<(), CacheError> {
                Ok(())
            }
        }

        let store = ReferenceStore::new(Arc::new(FailingCache));
        store.add(table("file:///a.php"));
        store.close("file:///a.php");
        // Write failed: memory stays authoritative.
        assert!(store.is_open("file:///a.php"));
        assert_eq!(store.find_references("A\\B\\Foo").len(), 1);
    }

    #[test]
    fn test_add_replaces_index_entries() {
        let store = store();
        store.add(table("file:///a.php"));

        let mut root = Scope::new(range(0, 0, 10));
        root.children.push(ScopeChild::Ref(Reference::new(
            SymbolKind::Function,
            "A\\other",
            range(1, 0, 5),
        )));
        store.add(ReferenceTable::new("file:///a.php", 9, root));

        assert!(store.find_references("A\\B\\Foo").is_empty());
        assert_eq!(store.find_references("A\\other").len(), 1);
    }
}
