//! Flow-sensitive typing and reference extraction for php-analyzer.
//!
//! [`variables::VariableTable`] tracks variable types through scope and
//! branch frames, [`expr::ExpressionTypeResolver`] assigns a type string to
//! an expression node, and [`reader::ReferenceReader`] links every name
//! occurrence in a document to the symbol identities it denotes.

pub mod expr;
pub mod reader;
pub mod variables;

pub use expr::ExpressionTypeResolver;
pub use reader::ReferenceReader;
pub use variables::VariableTable;
