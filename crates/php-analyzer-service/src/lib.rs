//! The request-response facade of php-analyzer.
//!
//! One [`service::LanguageService`] owns the open documents, the symbol and
//! reference stores, and the cache handle. An external dispatcher calls its
//! methods one at a time; every query flushes its target document before
//! reading, and every method has a typed empty response it returns on any
//! internally-handled failure.

pub mod features;
pub mod service;

pub use service::{LanguageService, SymbolEntry, TextChange};
