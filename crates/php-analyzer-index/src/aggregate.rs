//! Merged member view of a class and everything it inherits.
//!
//! The closure over `associated` is computed through the store with a
//! visited set, in deterministic order: the class itself, its base chain,
//! the interface DAG in declaration order, then traits in use order.

use crate::store::{SymbolHandle, SymbolStore};
use php_analyzer_types::{Symbol, SymbolKind, Visibility};

/// How shadowed members merge across tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Every member from every tier, shadowed duplicates included.
    None,
    /// First occurrence per (kind, name); shadowed occurrences may still
    /// contribute documentation when the winner has none.
    Documented,
    /// First occurrence per (kind, name); shadowed occurrences discarded.
    Override,
}

pub struct TypeAggregate<'s> {
    store: &'s SymbolStore,
    tiers: Vec<String>,
}

impl<'s> TypeAggregate<'s> {
    /// Compute the aggregate for a class FQN. Returns `None` when the
    /// store has no class-like declaration under that name.
    pub fn new(store: &'s SymbolStore, fqn: &str) -> Option<Self> {
        let fqn = fqn.trim_start_matches('\\');
        if store.find(fqn, |s| s.kind.is_class_like()).is_empty() {
            return None;
        }

        let mut visited: Vec<String> = Vec::new();
        let mut classes: Vec<String> = Vec::new();

        // Base chain.
        let mut current = Some(fqn.to_string());
        while let Some(class) = current {
            if !mark_visited(&mut visited, &class) {
                break;
            }
            current = lookup(store, &class)
                .and_then(|h| {
                    h.symbol
                        .associated
                        .iter()
                        .find(|a| a.kind == SymbolKind::Class)
                        .map(|a| a.fqn.clone())
                })
                .filter(|fqn| !fqn.is_empty());
            classes.push(class);
        }

        // Interface DAG, breadth-first in declaration order.
        let mut interfaces: Vec<String> = Vec::new();
        let mut queue: Vec<String> = Vec::new();
        for class in &classes {
            if let Some(h) = lookup(store, class) {
                queue.extend(associated_of_kind(&h.symbol, SymbolKind::Interface));
            }
        }
        let mut i = 0;
        while i < queue.len() {
            let iface = queue[i].clone();
            i += 1;
            if !mark_visited(&mut visited, &iface) {
                continue;
            }
            if let Some(h) = lookup(store, &iface) {
                queue.extend(associated_of_kind(&h.symbol, SymbolKind::Interface));
            }
            interfaces.push(iface);
        }

        // Traits, in use order, including traits used by traits.
        let mut traits: Vec<String> = Vec::new();
        let mut queue: Vec<String> = Vec::new();
        for class in &classes {
            if let Some(h) = lookup(store, class) {
                queue.extend(associated_of_kind(&h.symbol, SymbolKind::Trait));
            }
        }
        let mut i = 0;
        while i < queue.len() {
            let used = queue[i].clone();
            i += 1;
            if !mark_visited(&mut visited, &used) {
                continue;
            }
            if let Some(h) = lookup(store, &used) {
                queue.extend(associated_of_kind(&h.symbol, SymbolKind::Trait));
            }
            traits.push(used);
        }

        let mut tiers = classes;
        tiers.extend(interfaces);
        tiers.extend(traits);
        Some(TypeAggregate { store, tiers })
    }

    /// The FQNs contributing members, in merge order.
    pub fn tiers(&self) -> &[String] {
        &self.tiers
    }

    /// True if `fqn` participates in this aggregate.
    pub fn contains(&self, fqn: &str) -> bool {
        let fqn = fqn.trim_start_matches('\\');
        self.tiers.iter().any(|t| t.eq_ignore_ascii_case(fqn))
    }

    /// Merged members, earliest tier first.
    pub fn members(
        &self,
        strategy: MergeStrategy,
        predicate: impl Fn(&Symbol) -> bool,
    ) -> Vec<SymbolHandle> {
        let mut out: Vec<SymbolHandle> = Vec::new();
        let mut keys: Vec<(SymbolKind, String)> = Vec::new();

        for tier in &self.tiers {
            for class in self.store.find(tier, |s| s.kind.is_class_like()) {
                for member in &class.symbol.children {
                    if !member.kind.is_member() || !predicate(member) {
                        continue;
                    }
                    let key = merge_key(member);
                    match strategy {
                        MergeStrategy::None => {}
                        MergeStrategy::Override | MergeStrategy::Documented => {
                            if let Some(idx) = keys.iter().position(|k| *k == key) {
                                if strategy == MergeStrategy::Documented
                                    && out[idx].symbol.doc.is_none()
                                    && member.doc.is_some()
                                {
                                    out[idx].symbol.doc = member.doc.clone();
                                }
                                continue;
                            }
                        }
                    }
                    keys.push(key);
                    out.push(SymbolHandle {
                        uri: class.uri.clone(),
                        symbol: member.clone(),
                    });
                }
            }
        }
        out
    }
}

/// Visibility filter for members, parameterized by the caller's class.
///
/// From inside the owning class everything is visible; from a subclass,
/// `Private` is hidden; from elsewhere, `Private` and `Protected` are.
pub fn member_visible(store: &SymbolStore, member: &Symbol, caller: Option<&str>) -> bool {
    let Some(owner) = member.scope.as_deref() else {
        return true;
    };
    match caller {
        Some(caller) if caller.eq_ignore_ascii_case(owner) => true,
        Some(caller) => match member.visibility {
            Visibility::Public => true,
            Visibility::Private => false,
            Visibility::Protected => TypeAggregate::new(store, caller)
                .is_some_and(|aggregate| aggregate.contains(owner)),
        },
        None => member.visibility == Visibility::Public,
    }
}

fn lookup(store: &SymbolStore, fqn: &str) -> Option<SymbolHandle> {
    store
        .find(fqn, |s| s.kind.is_class_like())
        .into_iter()
        .next()
}

fn associated_of_kind(symbol: &Symbol, kind: SymbolKind) -> Vec<String> {
    symbol
        .associated
        .iter()
        .filter(|a| a.kind == kind)
        .map(|a| a.fqn.clone())
        .collect()
}

fn mark_visited(visited: &mut Vec<String>, fqn: &str) -> bool {
    let key = fqn.to_lowercase();
    if visited.contains(&key) {
        return false;
    }
    visited.push(key);
    true
}

fn merge_key(member: &Symbol) -> (SymbolKind, String) {
    let name = if member.kind.is_case_sensitive() {
        member.member_name().to_string()
    } else {
        member.member_name().to_lowercase()
    };
    (member.kind, name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use php_analyzer_parser::{Document, SymbolReader};

    fn store_with(sources: &[(&str, &str)]) -> SymbolStore {
        let store = SymbolStore::new();
        for (uri, code) in sources {
            let doc = Document::new(*uri, code, 1);
            store.add(SymbolReader::read(doc.tree().unwrap(), code, uri));
        }
        store
    }

    fn hierarchy_store() -> SymbolStore {
        store_with(&[
            (
                "file:///base.php",
                "<?php\nnamespace App;\ninterface Marker {}\ninterface Countable2 extends Marker {}\ntrait Helper {\n    public function helperMethod() {}\n}\nclass Base {\n    /** Original doc. */\n    public function run(): int { return 1; }\n    protected function hook() {}\n    private function secret() {}\n}\n",
            ),
            (
                "file:///child.php",
                "<?php\nnamespace App;\nclass Child extends Base implements Countable2 {\n    use Helper;\n    public function run(): string { return 'x'; }\n}\n",
            ),
        ])
    }

    #[test]
    fn test_tier_order() {
        let store = hierarchy_store();
        let aggregate = TypeAggregate::new(&store, "App\\Child").unwrap();
        assert_eq!(
            aggregate.tiers(),
            &[
                "App\\Child",
                "App\\Base",
                "App\\Countable2",
                "App\\Marker",
                "App\\Helper",
            ]
        );
        assert!(aggregate.contains("app\\base"));
        assert!(!aggregate.contains("App\\Other"));
    }

    #[test]
    fn test_override_merge_keeps_first_occurrence() {
        let store = hierarchy_store();
        let aggregate = TypeAggregate::new(&store, "App\\Child").unwrap();
        let members = aggregate.members(MergeStrategy::Override, |s| {
            s.member_name().eq_ignore_ascii_case("run")
        });
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].symbol.name, "App\\Child::run");
    }

    #[test]
    fn test_none_merge_keeps_shadowed_duplicates() {
        let store = hierarchy_store();
        let aggregate = TypeAggregate::new(&store, "App\\Child").unwrap();
        let members = aggregate.members(MergeStrategy::None, |s| {
            s.member_name().eq_ignore_ascii_case("run")
        });
        assert_eq!(members.len(), 2);
    }

    #[test]
    fn test_documented_merge_borrows_doc_from_shadowed() {
        let store = hierarchy_store();
        let aggregate = TypeAggregate::new(&store, "App\\Child").unwrap();
        let members = aggregate.members(MergeStrategy::Documented, |s| {
            s.member_name().eq_ignore_ascii_case("run")
        });
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].symbol.name, "App\\Child::run");
        let doc = members[0].symbol.doc.as_ref().expect("borrowed doc");
        assert_eq!(doc.summary.as_deref(), Some("Original doc."));
    }

    #[test]
    fn test_trait_members_included() {
        let store = hierarchy_store();
        let members = store.find_members("App\\Child", MergeStrategy::Override, |_| true);
        assert!(members
            .iter()
            .any(|m| m.symbol.member_name() == "helperMethod"));
    }

    #[test]
    fn test_cycle_protection() {
        let store = store_with(&[
            ("file:///a.php", "<?php\nclass A extends B {}\n"),
            ("file:///b.php", "<?php\nclass B extends A {}\n"),
        ]);
        let aggregate = TypeAggregate::new(&store, "A").expect("aggregate despite cycle");
        assert_eq!(aggregate.tiers(), &["A", "B"]);
    }

    #[test]
    fn test_unknown_class_yields_none() {
        let store = hierarchy_store();
        assert!(TypeAggregate::new(&store, "App\\Nope").is_none());
    }

    #[test]
    fn test_member_visibility() {
        let store = hierarchy_store();
        let members = store.find_members("App\\Child", MergeStrategy::Override, |_| true);
        let hook = members
            .iter()
            .find(|m| m.symbol.member_name() == "hook")
            .unwrap();
        let secret = members
            .iter()
            .find(|m| m.symbol.member_name() == "secret")
            .unwrap();

        // From the owning class.
        assert!(member_visible(&store, &hook.symbol, Some("App\\Base")));
        assert!(member_visible(&store, &secret.symbol, Some("App\\Base")));
        // From the subclass.
        assert!(member_visible(&store, &hook.symbol, Some("App\\Child")));
        assert!(!member_visible(&store, &secret.symbol, Some("App\\Child")));
        // From elsewhere.
        assert!(!member_visible(&store, &hook.symbol, None));
        assert!(!member_visible(&store, &secret.symbol, Some("App\\Marker")));
    }
}
