//! Shared types for php-analyzer.
//!
//! The data model of the analysis core: symbols and symbol trees, references
//! and scope trees, union type strings, name resolution state, and the
//! position/range primitives every other crate speaks in.

pub mod cancel;
pub mod position;
pub mod reference;
pub mod resolver;
pub mod symbol;
pub mod typestring;

pub use cancel::CancellationToken;
pub use position::{Location, Position, Range};
pub use reference::{Reference, ReferenceTable, Scope, ScopeChild};
pub use resolver::{ImportRule, NameResolver};
pub use symbol::{DocBlock, Symbol, SymbolIdentity, SymbolKind, SymbolModifiers, Visibility};
pub use typestring::TypeString;
