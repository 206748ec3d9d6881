//! The workspace-wide symbol index.
//!
//! Holds one [`SymbolTable`] per document plus a lowercased key index over
//! every declared symbol. A symbol emits up to two keys: its full name and
//! its last segment (member name for members), so both `App\Foo` and `Foo`
//! reach the same declaration. Case-sensitive kinds (constants, variables,
//! properties) are filtered exactly after the index probe.

use crate::aggregate::{MergeStrategy, TypeAggregate};
use dashmap::DashMap;
use php_analyzer_parser::SymbolTable;
use php_analyzer_types::{Location, Reference, Symbol, SymbolKind};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// A symbol found through the store, detached from its table.
#[derive(Debug, Clone)]
pub struct SymbolHandle {
    pub uri: String,
    pub symbol: Symbol,
}

impl SymbolHandle {
    /// Navigation target: the name token of the declaration.
    pub fn location(&self) -> Location {
        Location::new(self.uri.clone(), self.symbol.selection_range)
    }
}

#[derive(Debug, Clone)]
struct IndexEntry {
    uri: String,
    path: Vec<u32>,
    /// True when this entry was emitted under the last-segment key.
    segment_key: bool,
}

#[derive(Default)]
pub struct SymbolStore {
    tables: DashMap<String, Arc<SymbolTable>>,
    index: RwLock<BTreeMap<String, Vec<IndexEntry>>>,
}

impl SymbolStore {
    pub fn new() -> Self {
        SymbolStore::default()
    }

    /// Add a table, replacing any previous table at the same uri.
    pub fn add(&self, table: SymbolTable) {
        self.remove(&table.uri);
        let table = Arc::new(table);

        let mut keys: Vec<(String, IndexEntry)> = Vec::new();
        table.for_each_path(|symbol, path| {
            if !indexable(symbol) {
                return;
            }
            let full = symbol.name.to_lowercase();
            let segment = symbol.member_name().to_lowercase();
            keys.push((
                full.clone(),
                IndexEntry {
                    uri: table.uri.clone(),
                    path: path.to_vec(),
                    segment_key: false,
                },
            ));
            if segment != full {
                keys.push((
                    segment,
                    IndexEntry {
                        uri: table.uri.clone(),
                        path: path.to_vec(),
                        segment_key: true,
                    },
                ));
            }
        });

        if let Ok(mut index) = self.index.write() {
            for (key, entry) in keys {
                index.entry(key).or_default().push(entry);
            }
        }
        tracing::debug!(uri = %table.uri, "indexed symbol table");
        self.tables.insert(table.uri.clone(), table);
    }

    pub fn remove(&self, uri: &str) {
        if self.tables.remove(uri).is_none() {
            return;
        }
        if let Ok(mut index) = self.index.write() {
            index.retain(|_, entries| {
                entries.retain(|e| e.uri != uri);
                !entries.is_empty()
            });
        }
        tracing::debug!(uri, "dropped symbol table");
    }

    pub fn table(&self, uri: &str) -> Option<Arc<SymbolTable>> {
        self.tables.get(uri).map(|t| t.value().clone())
    }

    pub fn tables(&self) -> Vec<Arc<SymbolTable>> {
        self.tables.iter().map(|t| t.value().clone()).collect()
    }

    /// Exact-match lookup. Case sensitive for constant/variable/property
    /// kinds, insensitive otherwise.
    pub fn find(&self, text: &str, filter: impl Fn(&Symbol) -> bool) -> Vec<SymbolHandle> {
        let text = text.trim_start_matches('\\');
        if text.is_empty() {
            return Vec::new();
        }
        let key = text.to_lowercase();

        let entries = match self.index.read() {
            Ok(index) => index.get(&key).cloned().unwrap_or_default(),
            Err(_) => return Vec::new(),
        };

        let mut out = Vec::new();
        for entry in entries {
            let Some(handle) = self.resolve_entry(&entry) else {
                continue;
            };
            if !filter(&handle.symbol) {
                continue;
            }
            if handle.symbol.kind.is_case_sensitive()
                && handle.symbol.name != text
                && handle.symbol.member_name() != text
            {
                continue;
            }
            out.push(handle);
        }
        out
    }

    /// Prefix match on the lowercased key, ranked by segment-key matches
    /// first and then by key length.
    pub fn match_(&self, text: &str, filter: impl Fn(&Symbol) -> bool) -> Vec<SymbolHandle> {
        let prefix = text.trim_start_matches('\\').to_lowercase();
        if prefix.is_empty() {
            return Vec::new();
        }

        let mut scored: Vec<(bool, usize, IndexEntry)> = Vec::new();
        if let Ok(index) = self.index.read() {
            for (key, entries) in index.range(prefix.clone()..) {
                if !key.starts_with(&prefix) {
                    break;
                }
                for entry in entries {
                    scored.push((!entry.segment_key, key.len(), entry.clone()));
                }
            }
        }
        scored.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut seen: Vec<(String, Vec<u32>)> = Vec::new();
        let mut out = Vec::new();
        for (_, _, entry) in scored {
            if seen.iter().any(|(u, p)| *u == entry.uri && *p == entry.path) {
                continue;
            }
            let Some(handle) = self.resolve_entry(&entry) else {
                continue;
            };
            if filter(&handle.symbol) {
                seen.push((entry.uri, entry.path));
                out.push(handle);
            }
        }
        out
    }

    /// Members of a type, merged over its inheritance closure.
    pub fn find_members(
        &self,
        scope_fqn: &str,
        strategy: MergeStrategy,
        predicate: impl Fn(&Symbol) -> bool,
    ) -> Vec<SymbolHandle> {
        match TypeAggregate::new(self, scope_fqn) {
            Some(aggregate) => aggregate.members(strategy, predicate),
            None => Vec::new(),
        }
    }

    /// Resolve a reference to the declarations it denotes.
    pub fn find_symbols_by_reference(
        &self,
        reference: &Reference,
        strategy: MergeStrategy,
    ) -> Vec<SymbolHandle> {
        match reference.kind {
            SymbolKind::Class | SymbolKind::Interface | SymbolKind::Trait => {
                self.find(&reference.name, |s| s.kind.is_class_like())
            }
            SymbolKind::Constructor => {
                let members = self.find_members(&reference.name, MergeStrategy::Override, |s| {
                    s.kind == SymbolKind::Method && s.member_name() == "__construct"
                });
                if members.is_empty() {
                    self.find(&reference.name, |s| s.kind.is_class_like())
                } else {
                    members
                }
            }
            SymbolKind::Method | SymbolKind::Property | SymbolKind::ClassConstant => {
                let mut out = Vec::new();
                for identity in reference.identities() {
                    let Some((class, member)) = identity.rsplit_once("::") else {
                        continue;
                    };
                    let kind = reference.kind;
                    let matches = self.find_members(class, strategy, |s| {
                        s.kind == kind && member_name_eq(s, member)
                    });
                    out.extend(matches);
                }
                out
            }
            SymbolKind::Function => self.find(&reference.name, |s| s.kind == SymbolKind::Function),
            SymbolKind::Constant => self.find(&reference.name, |s| s.kind == SymbolKind::Constant),
            SymbolKind::Namespace => {
                self.find(&reference.name, |s| s.kind == SymbolKind::Namespace)
            }
            // Variables and parameters are resolved inside their document.
            _ => Vec::new(),
        }
    }

    fn resolve_entry(&self, entry: &IndexEntry) -> Option<SymbolHandle> {
        let table = self.tables.get(&entry.uri)?;
        let symbol = table.symbol_at_path(&entry.path)?.clone();
        Some(SymbolHandle {
            uri: entry.uri.clone(),
            symbol,
        })
    }
}

fn member_name_eq(symbol: &Symbol, member: &str) -> bool {
    if symbol.kind.is_case_sensitive() {
        symbol.member_name() == member
    } else {
        symbol.member_name().eq_ignore_ascii_case(member)
    }
}

// Anonymous classes stay indexed: their synthetic `uri#offset` FQNs must
// resolve through the store so member lookup on them works.
fn indexable(symbol: &Symbol) -> bool {
    if symbol.modifiers.is_import {
        return false;
    }
    !matches!(
        symbol.kind,
        SymbolKind::File | SymbolKind::Parameter | SymbolKind::Variable
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use php_analyzer_parser::{Document, SymbolReader};

    fn table_for(uri: &str, code: &str) -> SymbolTable {
        let doc = Document::new(uri, code, 1);
        SymbolReader::read(doc.tree().unwrap(), code, uri)
    }

    fn store_with_fixture() -> SymbolStore {
        let store = SymbolStore::new();
        store.add(table_for(
            "file:///foo.php",
            "<?php\nnamespace A\\B;\nclass Foo {\n    public const LIMIT = 1;\n    public function bar(): int { return 1; }\n}\nfunction helper() {}\nconst BUILD = 'dev';\n",
        ));
        store.add(table_for(
            "file:///bar.php",
            "<?php\nnamespace A\\B;\nclass FooBar {}\n",
        ));
        store
    }

    #[test]
    fn test_find_by_fqn_and_segment() {
        let store = store_with_fixture();
        let by_fqn = store.find("A\\B\\Foo", |s| s.kind.is_class_like());
        assert_eq!(by_fqn.len(), 1);
        assert_eq!(by_fqn[0].uri, "file:///foo.php");

        let by_segment = store.find("foo", |s| s.kind.is_class_like());
        assert_eq!(by_segment.len(), 1, "class lookup is case-insensitive");

        let leading_backslash = store.find("\\A\\B\\Foo", |s| s.kind.is_class_like());
        assert_eq!(leading_backslash.len(), 1);
    }

    #[test]
    fn test_find_constant_is_case_sensitive() {
        let store = store_with_fixture();
        assert_eq!(store.find("A\\B\\BUILD", |_| true).len(), 1);
        assert!(store.find("A\\B\\build", |_| true).is_empty());
    }

    #[test]
    fn test_match_prefix_ranking() {
        let store = store_with_fixture();
        let hits = store.match_("foo", |s| s.kind.is_class_like());
        let names: Vec<&str> = hits.iter().map(|h| h.symbol.name.as_str()).collect();
        // Shorter segment match ranks before the longer one.
        assert_eq!(names, vec!["A\\B\\Foo", "A\\B\\FooBar"]);
    }

    #[test]
    fn test_match_does_not_duplicate_fqn_and_segment_hits() {
        let store = store_with_fixture();
        let hits = store.match_("a\\b\\foo", |s| s.kind.is_class_like());
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_add_replaces_previous_table() {
        let store = store_with_fixture();
        store.add(table_for("file:///foo.php", "<?php\nclass Renamed {}\n"));
        assert!(store.find("A\\B\\Foo", |s| s.kind.is_class_like()).is_empty());
        assert_eq!(store.find("Renamed", |_| true).len(), 1);
    }

    #[test]
    fn test_remove_drops_symbols() {
        let store = store_with_fixture();
        store.remove("file:///foo.php");
        assert!(store.find("A\\B\\Foo", |_| true).is_empty());
        assert_eq!(store.find("FooBar", |_| true).len(), 1);
    }

    #[test]
    fn test_find_symbols_by_reference_constructor_falls_back_to_class() {
        let store = store_with_fixture();
        let reference = Reference::new(
            SymbolKind::Constructor,
            "A\\B\\Foo",
            php_analyzer_types::Range::default(),
        );
        let hits = store.find_symbols_by_reference(&reference, MergeStrategy::Override);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].symbol.kind, SymbolKind::Class);

        let store2 = SymbolStore::new();
        store2.add(table_for(
            "file:///c.php",
            "<?php\nclass WithCtor {\n    public function __construct() {}\n}\n",
        ));
        let reference = Reference::new(
            SymbolKind::Constructor,
            "WithCtor",
            php_analyzer_types::Range::default(),
        );
        let hits = store2.find_symbols_by_reference(&reference, MergeStrategy::Override);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].symbol.member_name(), "__construct");
    }

    #[test]
    fn test_find_symbols_by_reference_method_uses_alt_names() {
        let store = store_with_fixture();
        let mut reference = Reference::new(
            SymbolKind::Method,
            "A\\B\\Missing::bar",
            php_analyzer_types::Range::default(),
        );
        reference.alt_name = Some("A\\B\\Foo::bar".to_string());
        let hits = store.find_symbols_by_reference(&reference, MergeStrategy::Override);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].symbol.name, "A\\B\\Foo::bar");
    }

    #[test]
    fn test_variable_references_resolve_to_nothing_here() {
        let store = store_with_fixture();
        let reference = Reference::new(
            SymbolKind::Variable,
            "$x",
            php_analyzer_types::Range::default(),
        );
        assert!(store
            .find_symbols_by_reference(&reference, MergeStrategy::Override)
            .is_empty());
    }
}
