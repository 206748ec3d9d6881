//! Parse tree access and symbol extraction for php-analyzer.
//!
//! Wraps tree-sitter-php behind a [`document::Document`] with incremental
//! edits, provides the spine-based [`traverser::ParseTreeTraverser`], parses
//! PHPDoc comments, and builds the per-document [`table::SymbolTable`] via
//! [`symbols::SymbolReader`].

pub mod document;
pub mod line_index;
pub mod phpdoc;
pub mod symbols;
pub mod table;
pub mod traverser;

pub use document::{content_hash, Document};
pub use line_index::LineIndex;
pub use symbols::SymbolReader;
pub use table::SymbolTable;
pub use traverser::ParseTreeTraverser;
