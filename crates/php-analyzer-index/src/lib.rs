//! Workspace-wide indexes for php-analyzer.
//!
//! The [`store::SymbolStore`] answers name queries across every indexed
//! document, [`aggregate::TypeAggregate`] merges a class with its bases,
//! interfaces and traits, and the [`references::ReferenceStore`] tracks
//! name occurrences, spilling closed documents into the [`cache::Cache`].

pub mod aggregate;
pub mod cache;
pub mod references;
pub mod store;

pub use aggregate::{member_visible, MergeStrategy, TypeAggregate};
pub use cache::{Cache, CacheError, MemoryCache};
pub use references::ReferenceStore;
pub use store::{SymbolHandle, SymbolStore};
