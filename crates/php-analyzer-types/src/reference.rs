//! Name references and the per-document scope tree.

use crate::position::{Position, Range};
use crate::symbol::SymbolKind;
use crate::typestring::TypeString;
use serde::{Deserialize, Serialize};

/// One resolved name occurrence.
///
/// `name` is the identity the occurrence resolves to: an FQN, or
/// `Class::member` for members (`$` kept on property names). `alt_name`
/// carries pipe-joined alternative identities when a union-typed receiver
/// made the member lookup ambiguous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub kind: SymbolKind,
    pub name: String,
    pub range: Range,
    #[serde(default)]
    pub ty: Option<TypeString>,
    #[serde(default)]
    pub alt_name: Option<String>,
}

impl Reference {
    pub fn new(kind: SymbolKind, name: impl Into<String>, range: Range) -> Self {
        Reference {
            kind,
            name: name.into(),
            range,
            ty: None,
            alt_name: None,
        }
    }

    /// All identities this reference resolves to: `name` plus alternates.
    pub fn identities(&self) -> Vec<&str> {
        let mut out = vec![self.name.as_str()];
        if let Some(alt) = &self.alt_name {
            out.extend(alt.split('|').filter(|s| !s.is_empty()));
        }
        out
    }
}

/// A child of a scope: either a reference or a nested scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScopeChild {
    Ref(Reference),
    Scope(Scope),
}

impl ScopeChild {
    fn range(&self) -> Range {
        match self {
            ScopeChild::Ref(r) => r.range,
            ScopeChild::Scope(s) => s.range,
        }
    }
}

/// A syntactic region with source-ordered children. Child ranges are
/// contained within and do not overlap the parent's range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scope {
    pub range: Range,
    pub children: Vec<ScopeChild>,
}

impl Scope {
    pub fn new(range: Range) -> Self {
        Scope {
            range,
            children: Vec::new(),
        }
    }

    /// The reference at `pos`, searching nested scopes. Binary search on
    /// the sorted child ranges at each level.
    pub fn reference_at(&self, pos: Position) -> Option<&Reference> {
        let idx = self
            .children
            .partition_point(|child| child.range().start <= pos);
        // The candidate is the last child starting at or before pos.
        let child = self.children.get(idx.checked_sub(1)?)?;
        match child {
            ScopeChild::Ref(r) if r.range.contains_inclusive(pos) => Some(r),
            ScopeChild::Scope(s) if s.range.contains_inclusive(pos) => s.reference_at(pos),
            _ => None,
        }
    }

    /// The innermost scope whose range contains `pos`.
    pub fn scope_at(&self, pos: Position) -> &Scope {
        let idx = self
            .children
            .partition_point(|child| child.range().start <= pos);
        if let Some(ScopeChild::Scope(s)) = idx.checked_sub(1).and_then(|i| self.children.get(i)) {
            if s.range.contains_inclusive(pos) {
                return s.scope_at(pos);
            }
        }
        self
    }

    /// Preorder iteration over every reference in this scope and below.
    pub fn iter(&self) -> ReferenceIter<'_> {
        ReferenceIter {
            stack: vec![self.children.iter()],
        }
    }
}

/// All references of one document, arranged in the scope tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTable {
    pub uri: String,
    pub hash: u64,
    pub root: Scope,
}

impl ReferenceTable {
    pub fn new(uri: impl Into<String>, hash: u64, root: Scope) -> Self {
        ReferenceTable {
            uri: uri.into(),
            hash,
            root,
        }
    }

    pub fn reference_at(&self, pos: Position) -> Option<&Reference> {
        self.root.reference_at(pos)
    }

    pub fn scope_at(&self, pos: Position) -> &Scope {
        self.root.scope_at(pos)
    }

    pub fn iter(&self) -> ReferenceIter<'_> {
        self.root.iter()
    }
}

pub struct ReferenceIter<'a> {
    stack: Vec<std::slice::Iter<'a, ScopeChild>>,
}

impl<'a> Iterator for ReferenceIter<'a> {
    type Item = &'a Reference;

    fn next(&mut self) -> Option<&'a Reference> {
        while let Some(iter) = self.stack.last_mut() {
            match iter.next() {
                Some(ScopeChild::Ref(r)) => return Some(r),
                Some(ScopeChild::Scope(s)) => self.stack.push(s.children.iter()),
                None => {
                    self.stack.pop();
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(sl: u32, sc: u32, el: u32, ec: u32) -> Range {
        Range::new(Position::new(sl, sc), Position::new(el, ec))
    }

    fn build_table() -> Scope {
        let mut root = Scope::new(range(0, 0, 10, 0));
        root.children.push(ScopeChild::Ref(Reference::new(
            SymbolKind::Class,
            "App\\Foo",
            range(1, 4, 1, 7),
        )));
        let mut inner = Scope::new(range(2, 0, 6, 1));
        inner.children.push(ScopeChild::Ref(Reference::new(
            SymbolKind::Variable,
            "$x",
            range(3, 4, 3, 6),
        )));
        inner.children.push(ScopeChild::Ref(Reference::new(
            SymbolKind::Method,
            "App\\Foo::bar",
            range(4, 8, 4, 11),
        )));
        root.children.push(ScopeChild::Scope(inner));
        root.children.push(ScopeChild::Ref(Reference::new(
            SymbolKind::Function,
            "App\\f",
            range(8, 0, 8, 1),
        )));
        root
    }

    #[test]
    fn test_reference_at_top_level() {
        let table = build_table();
        let r = table.reference_at(Position::new(1, 5)).unwrap();
        assert_eq!(r.name, "App\\Foo");
    }

    #[test]
    fn test_reference_at_descends_into_scope() {
        let table = build_table();
        let r = table.reference_at(Position::new(4, 9)).unwrap();
        assert_eq!(r.name, "App\\Foo::bar");
    }

    #[test]
    fn test_reference_at_token_end_inclusive() {
        let table = build_table();
        let r = table.reference_at(Position::new(3, 6)).unwrap();
        assert_eq!(r.name, "$x");
    }

    #[test]
    fn test_reference_at_miss() {
        let table = build_table();
        assert!(table.reference_at(Position::new(7, 0)).is_none());
    }

    #[test]
    fn test_scope_at_innermost() {
        let table = build_table();
        assert_eq!(table.scope_at(Position::new(3, 0)).range, range(2, 0, 6, 1));
        assert_eq!(table.scope_at(Position::new(8, 0)).range, table.range);
    }

    #[test]
    fn test_iter_source_order() {
        let table = build_table();
        let names: Vec<&str> = table.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["App\\Foo", "$x", "App\\Foo::bar", "App\\f"]);
    }

    #[test]
    fn test_identities_split_alt_name() {
        let mut r = Reference::new(SymbolKind::Method, "A::m", range(0, 0, 0, 1));
        r.alt_name = Some("B::m|C::m".to_string());
        assert_eq!(r.identities(), vec!["A::m", "B::m", "C::m"]);
    }
}
