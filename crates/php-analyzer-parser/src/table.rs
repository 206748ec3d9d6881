//! The per-document symbol table.
//!
//! A tree of symbols keyed by uri with a content hash for cache validity.
//! Lookup relies on the in-order property of symbol ranges: children are
//! contained in their parents and ordered by source position.

use php_analyzer_types::symbol::SymbolIter;
use php_analyzer_types::{ImportRule, NameResolver, Position, Range, Symbol, SymbolKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolTable {
    pub uri: String,
    pub hash: u64,
    pub root: Symbol,
}

impl SymbolTable {
    pub fn new(uri: impl Into<String>, hash: u64, root: Symbol) -> Self {
        SymbolTable {
            uri: uri.into(),
            hash,
            root,
        }
    }

    pub fn document_range(&self) -> Range {
        self.root.range
    }

    /// Preorder iteration over every symbol including the root.
    pub fn iter(&self) -> SymbolIter<'_> {
        self.root.iter()
    }

    /// The innermost symbol whose range contains `pos`. The `File` root is
    /// never returned.
    pub fn symbol_at(&self, pos: Position) -> Option<&Symbol> {
        self.path_at(pos).pop()
    }

    /// Path of containing symbols from the outermost declaration to the
    /// innermost, excluding the `File` root.
    pub fn path_at(&self, pos: Position) -> Vec<&Symbol> {
        let mut path = Vec::new();
        let mut current = &self.root;
        'descend: loop {
            for child in &current.children {
                if child.range.contains_inclusive(pos) {
                    path.push(child);
                    current = child;
                    continue 'descend;
                }
            }
            return path;
        }
    }

    /// Innermost class-like declaration containing `pos`.
    pub fn enclosing_class_at(&self, pos: Position) -> Option<&Symbol> {
        self.path_at(pos)
            .into_iter()
            .rev()
            .find(|s| s.kind.is_class_like())
    }

    /// Innermost function, method or closure containing `pos`.
    pub fn enclosing_callable_at(&self, pos: Position) -> Option<&Symbol> {
        self.path_at(pos)
            .into_iter()
            .rev()
            .find(|s| matches!(s.kind, SymbolKind::Function | SymbolKind::Method))
    }

    /// Resolve a child-index path produced by [`SymbolTable::for_each_path`].
    pub fn symbol_at_path(&self, path: &[u32]) -> Option<&Symbol> {
        let mut current = &self.root;
        for &idx in path {
            current = current.children.get(idx as usize)?;
        }
        Some(current)
    }

    /// Preorder walk handing each symbol its child-index path. The root
    /// has the empty path.
    pub fn for_each_path(&self, mut f: impl FnMut(&Symbol, &[u32])) {
        fn walk(symbol: &Symbol, path: &mut Vec<u32>, f: &mut impl FnMut(&Symbol, &[u32])) {
            f(symbol, path);
            for (i, child) in symbol.children.iter().enumerate() {
                path.push(i as u32);
                walk(child, path, f);
                path.pop();
            }
        }
        walk(&self.root, &mut Vec::new(), &mut f);
    }

    /// All symbols with the given FQN (leading backslash tolerated).
    pub fn find(&self, fqn: &str) -> Vec<&Symbol> {
        let fqn = fqn.trim_start_matches('\\');
        self.iter().filter(|s| s.name == fqn).collect()
    }

    /// Reconstruct the name-resolution state lexically visible at `pos`:
    /// the namespace in effect, the import rules declared before `pos`, and
    /// the stack of enclosing class declarations.
    pub fn name_resolver_at(&self, pos: Position) -> NameResolver {
        let mut namespace = String::new();
        for symbol in self.iter() {
            if symbol.kind == SymbolKind::Namespace && symbol.range.start <= pos {
                namespace = symbol.name.clone();
            }
        }

        let mut resolver = NameResolver::new(namespace);
        for symbol in self.iter() {
            if symbol.modifiers.is_import && symbol.range.start <= pos {
                if let Some(target) = symbol.associated.first() {
                    resolver.add_rule(ImportRule {
                        kind: symbol.kind,
                        alias: symbol.name.clone(),
                        target: target.fqn.clone(),
                    });
                }
            }
        }

        for symbol in self.path_at(pos) {
            if symbol.kind.is_class_like() {
                let base = symbol
                    .associated
                    .iter()
                    .find(|a| a.kind == SymbolKind::Class)
                    .map(|a| a.fqn.clone())
                    .unwrap_or_default();
                resolver.push_class(symbol.name.clone(), base);
            }
        }

        resolver
    }
}
