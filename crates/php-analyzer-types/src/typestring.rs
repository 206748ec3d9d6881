//! The union-type notation of PHP doc comments and declarations.
//!
//! A `TypeString` is a pipe-joined list of atoms; an atom is a primitive
//! name, a fully qualified class name, or `T[]` meaning array-of-T.

use crate::resolver::NameResolver;
use crate::symbol::SymbolKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type names that never resolve to a class declaration.
pub const PRIMITIVE_ATOMS: &[&str] = &[
    "int", "integer", "float", "double", "string", "bool", "boolean", "array", "callable",
    "iterable", "object", "mixed", "void", "never", "null", "true", "false", "resource", "self",
    "static", "$this", "parent",
];

/// A parsed union type: an ordered list of atoms.
///
/// Equality ignores atom order; `Display` preserves the original order and
/// multiplicity. An empty `TypeString` means "unknown".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeString {
    atoms: Vec<String>,
}

impl TypeString {
    /// Parse `A|B[]|int`. A leading `?` contributes a `null` atom.
    pub fn new(text: &str) -> Self {
        let mut atoms = Vec::new();
        for part in text.split('|') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            if let Some(inner) = part.strip_prefix('?') {
                if !inner.is_empty() {
                    atoms.push(inner.to_string());
                }
                if !atoms.iter().any(|a| a == "null") {
                    atoms.push("null".to_string());
                }
            } else {
                atoms.push(part.to_string());
            }
        }
        TypeString { atoms }
    }

    pub fn empty() -> Self {
        TypeString { atoms: Vec::new() }
    }

    pub fn from_atom(atom: impl Into<String>) -> Self {
        let atom = atom.into();
        if atom.is_empty() {
            return TypeString::empty();
        }
        TypeString { atoms: vec![atom] }
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atoms(&self) -> &[String] {
        &self.atoms
    }

    /// Set-union of the two atom lists, keeping `self`'s order first.
    pub fn merge(&self, other: &TypeString) -> TypeString {
        let mut atoms = self.atoms.clone();
        for atom in &other.atoms {
            if !atoms.contains(atom) {
                atoms.push(atom.clone());
            }
        }
        TypeString { atoms }
    }

    /// Strip one `[]` level from array atoms; non-array atoms drop out.
    pub fn array_dereference(&self) -> TypeString {
        let atoms = self
            .atoms
            .iter()
            .filter_map(|atom| atom.strip_suffix("[]").map(|s| s.to_string()))
            .filter(|s| !s.is_empty())
            .collect();
        TypeString { atoms }
    }

    /// Class-like atoms only, with all array suffixes stripped.
    pub fn atomic_class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for atom in &self.atoms {
            let base = atom.trim_end_matches("[]");
            if base.is_empty() || is_primitive(base) {
                continue;
            }
            let base = base.trim_start_matches('\\').to_string();
            if !names.contains(&base) {
                names.push(base);
            }
        }
        names
    }

    /// Resolve unqualified class atoms to FQNs, preserving array suffixes.
    ///
    /// Primitives pass through; `self`/`static`/`$this` are left for lazy
    /// substitution at lookup time.
    pub fn name_resolve(&self, resolver: &NameResolver) -> TypeString {
        let atoms = self
            .atoms
            .iter()
            .map(|atom| {
                let suffix_start = atom.find("[]").unwrap_or(atom.len());
                let (base, suffix) = atom.split_at(suffix_start);
                if base.is_empty() || is_primitive(base) {
                    return atom.clone();
                }
                let resolved = resolver.resolve(base, SymbolKind::Class);
                format!("{}{}", resolved, suffix)
            })
            .collect();
        TypeString { atoms }
    }

    /// Substitute `self`/`static`/`$this` with the given class FQN.
    pub fn with_class_context(&self, class_fqn: &str) -> TypeString {
        if class_fqn.is_empty() {
            return self.clone();
        }
        let atoms = self
            .atoms
            .iter()
            .map(|atom| {
                let suffix_start = atom.find("[]").unwrap_or(atom.len());
                let (base, suffix) = atom.split_at(suffix_start);
                match base {
                    "self" | "static" | "$this" => format!("{}{}", class_fqn, suffix),
                    _ => atom.clone(),
                }
            })
            .collect();
        TypeString { atoms }
    }
}

/// True for type names that never denote a class declaration.
pub fn is_primitive(atom: &str) -> bool {
    let base = atom.trim_start_matches('\\');
    PRIMITIVE_ATOMS
        .iter()
        .any(|p| p.eq_ignore_ascii_case(base) || *p == base)
}

impl fmt::Display for TypeString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.atoms.join("|"))
    }
}

impl PartialEq for TypeString {
    fn eq(&self, other: &Self) -> bool {
        if self.atoms.len() != other.atoms.len() {
            return false;
        }
        let mut a = self.atoms.clone();
        let mut b = other.atoms.clone();
        a.sort();
        b.sort();
        a == b
    }
}

impl Eq for TypeString {}
