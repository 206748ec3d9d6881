//! Symbol records and the per-document symbol tree.

use crate::position::Range;
use crate::typestring::TypeString;
use serde::{Deserialize, Serialize};

/// Kind of a declared PHP symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Namespace,
    Class,
    Interface,
    Trait,
    Method,
    Function,
    Property,
    Constant,
    ClassConstant,
    Parameter,
    Variable,
    Constructor,
    File,
}

impl SymbolKind {
    pub fn is_class_like(self) -> bool {
        matches!(
            self,
            SymbolKind::Class | SymbolKind::Interface | SymbolKind::Trait
        )
    }

    pub fn is_member(self) -> bool {
        matches!(
            self,
            SymbolKind::Method
                | SymbolKind::Property
                | SymbolKind::ClassConstant
                | SymbolKind::Constructor
        )
    }

    pub fn is_callable(self) -> bool {
        matches!(
            self,
            SymbolKind::Function | SymbolKind::Method | SymbolKind::Constructor
        )
    }

    /// PHP resolves constants and variables case-sensitively; class-likes,
    /// functions and methods are case-insensitive.
    pub fn is_case_sensitive(self) -> bool {
        matches!(
            self,
            SymbolKind::Constant
                | SymbolKind::ClassConstant
                | SymbolKind::Variable
                | SymbolKind::Property
                | SymbolKind::Parameter
        )
    }

    /// Convert to LSP SymbolKind.
    pub fn to_lsp_symbol_kind(self) -> lsp_types::SymbolKind {
        match self {
            SymbolKind::Namespace => lsp_types::SymbolKind::NAMESPACE,
            SymbolKind::Class => lsp_types::SymbolKind::CLASS,
            SymbolKind::Interface => lsp_types::SymbolKind::INTERFACE,
            SymbolKind::Trait => lsp_types::SymbolKind::INTERFACE,
            SymbolKind::Method => lsp_types::SymbolKind::METHOD,
            SymbolKind::Function => lsp_types::SymbolKind::FUNCTION,
            SymbolKind::Property => lsp_types::SymbolKind::PROPERTY,
            SymbolKind::Constant => lsp_types::SymbolKind::CONSTANT,
            SymbolKind::ClassConstant => lsp_types::SymbolKind::CONSTANT,
            SymbolKind::Parameter => lsp_types::SymbolKind::VARIABLE,
            SymbolKind::Variable => lsp_types::SymbolKind::VARIABLE,
            SymbolKind::Constructor => lsp_types::SymbolKind::CONSTRUCTOR,
            SymbolKind::File => lsp_types::SymbolKind::FILE,
        }
    }
}

/// Visibility of a class member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

/// Modifier flags on a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SymbolModifiers {
    pub is_static: bool,
    pub is_abstract: bool,
    pub is_final: bool,
    /// Anonymous class or closure (carries a synthetic FQN).
    pub is_anonymous: bool,
    /// Alias introduced by a namespace-use clause.
    pub is_import: bool,
}

/// A weak reference to another symbol, by kind and FQN. Resolution is
/// always late, through the symbol store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolIdentity {
    pub kind: SymbolKind,
    pub fqn: String,
}

impl SymbolIdentity {
    pub fn new(kind: SymbolKind, fqn: impl Into<String>) -> Self {
        SymbolIdentity {
            kind,
            fqn: fqn.into(),
        }
    }
}

/// Extracted documentation attached to a symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocBlock {
    pub summary: Option<String>,
    pub deprecated: Option<String>,
}

impl DocBlock {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.deprecated.is_none()
    }
}

/// One declared entity.
///
/// `name` is the FQN for declared entities and the simple name for
/// parameters and locals; property names keep their leading `$`.
/// `children` encode class members, function parameters and locals, and
/// namespace-use aliases; every non-root symbol appears in exactly one
/// parent's `children`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    pub name: String,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub modifiers: SymbolModifiers,
    #[serde(default)]
    pub ty: TypeString,
    pub range: Range,
    pub selection_range: Range,
    /// FQN of the enclosing class, for members.
    #[serde(default)]
    pub scope: Option<String>,
    /// Literal default value, for parameters and constants.
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub doc: Option<DocBlock>,
    /// Symbols this one imports, extends, implements, or uses.
    #[serde(default)]
    pub associated: Vec<SymbolIdentity>,
    #[serde(default)]
    pub children: Vec<Symbol>,
}

impl Symbol {
    pub fn new(kind: SymbolKind, name: impl Into<String>, range: Range) -> Self {
        Symbol {
            kind,
            name: name.into(),
            visibility: Visibility::default(),
            modifiers: SymbolModifiers::default(),
            ty: TypeString::empty(),
            range,
            selection_range: range,
            scope: None,
            value: None,
            doc: None,
            associated: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Last backslash-separated segment of the name.
    pub fn last_segment(&self) -> &str {
        self.name.rsplit('\\').next().unwrap_or(&self.name)
    }

    /// The member part of a `Class::member` name, or the name itself.
    pub fn member_name(&self) -> &str {
        match self.name.rsplit_once("::") {
            Some((_, member)) => member,
            None => self.last_segment(),
        }
    }

    /// Name as shown to the user: instance properties lose their `$`,
    /// static properties keep it.
    pub fn display_name(&self) -> &str {
        let name = self.member_name();
        if self.kind == SymbolKind::Property && !self.modifiers.is_static {
            name.strip_prefix('$').unwrap_or(name)
        } else {
            name
        }
    }

    /// Preorder iteration over this symbol and all descendants.
    pub fn iter(&self) -> SymbolIter<'_> {
        SymbolIter { stack: vec![self] }
    }
}

pub struct SymbolIter<'a> {
    stack: Vec<&'a Symbol>,
}

impl<'a> Iterator for SymbolIter<'a> {
    type Item = &'a Symbol;

    fn next(&mut self) -> Option<&'a Symbol> {
        let symbol = self.stack.pop()?;
        for child in symbol.children.iter().rev() {
            self.stack.push(child);
        }
        Some(symbol)
    }
}
