//! The language service: document lifecycle plus the query surface.

use dashmap::DashMap;
use lsp_types::{
    CompletionList, Hover, HoverContents, MarkupContent, MarkupKind, SignatureHelp, TextEdit,
};
use php_analyzer_completion::{CompletionContext, CompletionProvider};
use php_analyzer_index::cache::{symbols_key, Cache, STATE_KEY};
use php_analyzer_index::{MemoryCache, MergeStrategy, ReferenceStore, SymbolStore};
use php_analyzer_parser::traverser::child_of_kind;
use php_analyzer_parser::{Document, LineIndex, ParseTreeTraverser, SymbolReader, SymbolTable};
use php_analyzer_typing::ReferenceReader;
use php_analyzer_types::cancel::{cancelled, CancellationToken};
use php_analyzer_types::{
    Location, Position, Range, Reference, Symbol, SymbolKind, TypeString,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tree_sitter::Tree;

use crate::features;

/// One ordered text edit from the editor. `range` of `None` replaces the
/// whole document.
#[derive(Debug, Clone)]
pub struct TextChange {
    pub range: Option<Range>,
    pub text: String,
}

/// A document or workspace symbol listing entry.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolEntry {
    pub name: String,
    pub kind: lsp_types::SymbolKind,
    pub container_name: Option<String>,
    pub location: Location,
}

/// The persisted workspace state blob.
#[derive(Debug, Serialize, Deserialize)]
struct WorkspaceState {
    timestamp: u64,
    uris: Vec<String>,
}

pub struct LanguageService {
    docs: DashMap<String, Document>,
    symbols: Arc<SymbolStore>,
    references: Arc<ReferenceStore>,
    cache: Arc<dyn Cache>,
    completion: CompletionProvider,
}

impl Default for LanguageService {
    fn default() -> Self {
        LanguageService::new(Arc::new(MemoryCache::new()))
    }
}

impl LanguageService {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        LanguageService {
            docs: DashMap::new(),
            symbols: Arc::new(SymbolStore::new()),
            references: Arc::new(ReferenceStore::new(cache.clone())),
            cache,
            completion: CompletionProvider::default(),
        }
    }

    pub fn symbol_store(&self) -> &SymbolStore {
        &self.symbols
    }

    pub fn reference_store(&self) -> &ReferenceStore {
        &self.references
    }

    // --- Document lifecycle ---------------------------------------------

    pub fn open_document(&self, uri: &str, text: &str, version: i32) {
        tracing::debug!(uri, version, "open document");
        let doc = Document::new(uri, text, version);
        if let Some(tree) = doc.tree().cloned() {
            self.rebuild(uri, &tree, text);
        }
        self.docs.insert(uri.to_string(), doc);
    }

    /// Apply ordered edits and mark the parse dirty. Rebuild is deferred
    /// until the next query flushes the document.
    pub fn edit_document(&self, uri: &str, version: i32, changes: &[TextChange]) {
        let Some(mut doc) = self.docs.get_mut(uri) else {
            tracing::debug!(uri, "edit for unknown document ignored");
            return;
        };
        for change in changes {
            doc.apply_change(version, change.range, &change.text);
        }
    }

    /// Force pending parses and table rebuilds through. Every query calls
    /// this on its target before reading.
    pub fn flush(&self, uri: &str) {
        let Some(mut doc) = self.docs.get_mut(uri) else {
            return;
        };
        let reparsed = doc.flush();
        if !reparsed && self.symbols.table(uri).is_some() {
            return;
        }
        let text = doc.text();
        let tree = doc.tree().cloned();
        drop(doc);
        if let Some(tree) = tree {
            self.rebuild(uri, &tree, &text);
        }
    }

    /// Flush, persist the tables, and drop the in-memory document. The
    /// symbol table stays in the store for workspace-wide queries.
    pub fn close_document(&self, uri: &str) {
        self.flush(uri);
        self.docs.remove(uri);
        self.references.close(uri);
        if let Some(table) = self.symbols.table(uri) {
            self.write_symbols_blob(&table);
        }
        tracing::debug!(uri, "closed document");
    }

    /// Remove a document's symbols and references entirely.
    pub fn forget(&self, uri: &str) {
        self.docs.remove(uri);
        self.symbols.remove(uri);
        self.references.remove(uri);
        if let Err(err) = self.cache.delete(&symbols_key(uri)) {
            tracing::warn!(uri, %err, "failed to delete cached symbol table");
        }
        tracing::debug!(uri, "forgot document");
    }

    // --- Persisted state -------------------------------------------------

    /// Write the `state` blob plus a symbol blob per indexed document.
    pub fn save_state(&self, timestamp: u64) {
        let mut uris = Vec::new();
        for table in self.symbols.tables() {
            self.write_symbols_blob(&table);
            uris.push(table.uri.clone());
        }
        uris.sort();
        let state = WorkspaceState { timestamp, uris };
        match serde_json::to_vec(&state) {
            Ok(blob) => {
                if let Err(err) = self.cache.write(STATE_KEY, &blob) {
                    tracing::warn!(%err, "failed to write state blob");
                }
            }
            Err(err) => tracing::warn!(%err, "failed to encode state blob"),
        }
    }

    /// Restore symbol tables (and closed reference tables) recorded by a
    /// previous `save_state`. Returns the number of documents restored.
    pub fn load_state(&self) -> usize {
        let blob = match self.cache.read(STATE_KEY) {
            Ok(blob) => blob,
            Err(err) => {
                tracing::debug!(%err, "no persisted state");
                return 0;
            }
        };
        let state: WorkspaceState = match serde_json::from_slice(&blob) {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(%err, "state blob malformed");
                return 0;
            }
        };

        let mut restored = 0;
        for uri in &state.uris {
            let Ok(blob) = self.cache.read(&symbols_key(uri)) else {
                continue;
            };
            match serde_json::from_slice::<SymbolTable>(&blob) {
                Ok(table) => {
                    self.symbols.add(table);
                    self.references.restore_closed(uri);
                    restored += 1;
                }
                Err(err) => tracing::warn!(uri, %err, "cached symbol table malformed"),
            }
        }
        restored
    }

    // --- Queries ----------------------------------------------------------

    pub fn document_symbols(&self, uri: &str) -> Vec<SymbolEntry> {
        self.flush(uri);
        let Some(table) = self.symbols.table(uri) else {
            return Vec::new();
        };
        table
            .iter()
            .filter(|s| listable(s))
            .map(|s| symbol_entry(&table.uri, s))
            .collect()
    }

    pub fn workspace_symbols(&self, query: &str) -> Vec<SymbolEntry> {
        if query.is_empty() {
            let mut out = Vec::new();
            for table in self.symbols.tables() {
                out.extend(
                    table
                        .iter()
                        .filter(|s| listable(s))
                        .map(|s| symbol_entry(&table.uri, s)),
                );
            }
            return out;
        }
        self.symbols
            .match_(query, listable)
            .into_iter()
            .map(|h| symbol_entry(&h.uri, &h.symbol))
            .collect()
    }

    pub fn provide_completions(
        &self,
        uri: &str,
        position: Position,
        cancel: Option<&CancellationToken>,
    ) -> CompletionList {
        self.flush(uri);
        let Some(doc) = self.docs.get(uri) else {
            return CompletionList::default();
        };
        let Some(table) = self.symbols.table(uri) else {
            return CompletionList::default();
        };
        let Some(tree) = doc.tree() else {
            return CompletionList::default();
        };
        let refs = self.references.table(uri);
        let source = doc.text();

        let ctx = CompletionContext::new(
            &self.symbols,
            &table,
            refs.as_deref(),
            tree,
            &source,
            position,
        );
        self.completion.provide(&ctx, cancel)
    }

    pub fn provide_definition(
        &self,
        uri: &str,
        position: Position,
        cancel: Option<&CancellationToken>,
    ) -> Vec<Location> {
        self.flush(uri);
        if cancelled(cancel) {
            return Vec::new();
        }
        let Some(reference) = self.reference_at(uri, position) else {
            return Vec::new();
        };

        if matches!(reference.kind, SymbolKind::Variable | SymbolKind::Parameter) {
            return self.local_definition(uri, position, &reference);
        }

        self.symbols
            .find_symbols_by_reference(&reference, MergeStrategy::Override)
            .into_iter()
            .map(|h| h.location())
            .collect()
    }

    pub fn provide_hover(
        &self,
        uri: &str,
        position: Position,
        cancel: Option<&CancellationToken>,
    ) -> Option<Hover> {
        self.flush(uri);
        if cancelled(cancel) {
            return None;
        }
        let reference = self.reference_at(uri, position)?;

        let (signature, summary) =
            if matches!(reference.kind, SymbolKind::Variable | SymbolKind::Parameter) {
                let empty = TypeString::empty();
                let ty = reference.ty.as_ref().unwrap_or(&empty);
                (features::variable_hover(&reference.name, ty), None)
            } else {
                let targets = self
                    .symbols
                    .find_symbols_by_reference(&reference, MergeStrategy::Documented);
                let target = targets.first()?;
                (
                    features::hover_signature(&target.symbol),
                    target.symbol.doc.as_ref().and_then(|d| d.summary.clone()),
                )
            };

        let mut value = format!("```php\n{}\n```", signature);
        if let Some(summary) = summary {
            value.push_str("\n\n");
            value.push_str(&summary);
        }

        Some(Hover {
            contents: HoverContents::Markup(MarkupContent {
                kind: MarkupKind::Markdown,
                value,
            }),
            range: Some(reference.range.into()),
        })
    }

    pub fn provide_signature_help(
        &self,
        uri: &str,
        position: Position,
        cancel: Option<&CancellationToken>,
    ) -> Option<SignatureHelp> {
        self.flush(uri);
        if cancelled(cancel) {
            return None;
        }
        let doc = self.docs.get(uri)?;
        let source = doc.text();
        let tree = doc.tree()?.clone();
        drop(doc);
        let line_index = LineIndex::new(&source);
        let offset = line_index.offset_of(&source, position);

        let mut traverser = ParseTreeTraverser::new(&tree);
        traverser.seek_byte(offset.saturating_sub(1));
        let call = traverser.ancestor(|n| {
            matches!(
                n.kind(),
                "function_call_expression"
                    | "member_call_expression"
                    | "scoped_call_expression"
                    | "object_creation_expression"
            ) && child_of_kind(n, "arguments")
                .map(|a| a.start_byte() < offset && offset <= a.end_byte())
                .unwrap_or(false)
        })?;

        let arguments = child_of_kind(call, "arguments")?;
        let mut active_parameter: u32 = 0;
        for i in 0..arguments.child_count() {
            if let Some(child) = arguments.child(i) {
                if child.kind() == "," && child.start_byte() < offset {
                    active_parameter += 1;
                }
            }
        }

        // The callable name node decides the reference to resolve.
        let callee = match call.kind() {
            "function_call_expression" => call.child_by_field_name("function")?,
            "member_call_expression" | "scoped_call_expression" => {
                call.child_by_field_name("name")?
            }
            _ => {
                let mut found = None;
                for i in 0..call.named_child_count() {
                    if let Some(child) = call.named_child(i) {
                        if matches!(child.kind(), "name" | "qualified_name" | "relative_scope") {
                            found = Some(child);
                            break;
                        }
                    }
                }
                found?
            }
        };
        let callee_pos = line_index.position_of(&source, callee.start_byte());
        let reference = self.reference_at(uri, callee_pos)?;
        let targets = self
            .symbols
            .find_symbols_by_reference(&reference, MergeStrategy::Documented);

        let signatures: Vec<_> = targets
            .iter()
            .map(|t| {
                if t.symbol.kind.is_class_like() {
                    // `new` on a class without a declared constructor.
                    lsp_types::SignatureInformation {
                        label: format!("{}()", t.symbol.last_segment()),
                        documentation: None,
                        parameters: Some(Vec::new()),
                        active_parameter: None,
                    }
                } else {
                    features::signature_information(&t.symbol)
                }
            })
            .collect();
        if signatures.is_empty() {
            return None;
        }

        Some(SignatureHelp {
            signatures,
            active_signature: Some(0),
            active_parameter: Some(active_parameter),
        })
    }

    pub fn provide_references(
        &self,
        uri: &str,
        position: Position,
        include_declaration: bool,
        cancel: Option<&CancellationToken>,
    ) -> Vec<Location> {
        self.flush(uri);
        if cancelled(cancel) {
            return Vec::new();
        }
        let Some(reference) = self.reference_at(uri, position) else {
            return Vec::new();
        };

        if matches!(reference.kind, SymbolKind::Variable | SymbolKind::Parameter) {
            return self.local_references(uri, position, &reference);
        }

        let mut out = Vec::new();
        for identity in reference.identities() {
            for location in self.references.find_references(identity) {
                if !out.contains(&location) {
                    out.push(location);
                }
            }
        }

        if !include_declaration {
            let declarations: Vec<Location> = self
                .symbols
                .find_symbols_by_reference(&reference, MergeStrategy::Override)
                .into_iter()
                .map(|h| h.location())
                .collect();
            out.retain(|l| !declarations.contains(l));
        }
        out
    }

    /// Formatting is presentation-only and excluded from the core; the
    /// method exists so the API surface is total.
    pub fn provide_document_formatting_edits(&self, uri: &str) -> Vec<TextEdit> {
        self.flush(uri);
        Vec::new()
    }

    pub fn provide_document_range_formatting_edits(
        &self,
        uri: &str,
        _range: Range,
    ) -> Vec<TextEdit> {
        self.flush(uri);
        Vec::new()
    }

    // --- Internals --------------------------------------------------------

    fn rebuild(&self, uri: &str, tree: &Tree, text: &str) {
        let table = SymbolReader::read(tree, text, uri);
        self.symbols.add(table);
        let Some(table) = self.symbols.table(uri) else {
            return;
        };
        if let Some(refs) = ReferenceReader::read(&self.symbols, &table, tree, text, uri, None) {
            self.references.add(refs);
        }
    }

    fn reference_at(&self, uri: &str, position: Position) -> Option<Reference> {
        self.references
            .table(uri)
            .and_then(|table| table.reference_at(position).cloned())
    }

    fn local_definition(
        &self,
        uri: &str,
        position: Position,
        reference: &Reference,
    ) -> Vec<Location> {
        let Some(table) = self.symbols.table(uri) else {
            return Vec::new();
        };
        let holder = table
            .enclosing_callable_at(position)
            .unwrap_or(&table.root);
        holder
            .children
            .iter()
            .filter(|c| {
                matches!(c.kind, SymbolKind::Parameter | SymbolKind::Variable)
                    && c.name == reference.name
            })
            .map(|c| Location::new(uri.to_string(), c.selection_range))
            .collect()
    }

    fn local_references(
        &self,
        uri: &str,
        position: Position,
        reference: &Reference,
    ) -> Vec<Location> {
        let Some(table) = self.references.table(uri) else {
            return Vec::new();
        };
        let scope = table.scope_at(position);
        scope
            .iter()
            .filter(|r| r.kind == SymbolKind::Variable && r.name == reference.name)
            .map(|r| Location::new(uri.to_string(), r.range))
            .collect()
    }

    fn write_symbols_blob(&self, table: &SymbolTable) {
        match serde_json::to_vec(table) {
            Ok(blob) => {
                if let Err(err) = self.cache.write(&symbols_key(&table.uri), &blob) {
                    tracing::warn!(uri = %table.uri, %err, "failed to cache symbol table");
                }
            }
            Err(err) => tracing::warn!(uri = %table.uri, %err, "failed to encode symbol table"),
        }
    }
}

fn listable(symbol: &Symbol) -> bool {
    if symbol.modifiers.is_import || symbol.modifiers.is_anonymous {
        return false;
    }
    !matches!(
        symbol.kind,
        SymbolKind::File | SymbolKind::Parameter | SymbolKind::Variable
    )
}

fn symbol_entry(uri: &str, symbol: &Symbol) -> SymbolEntry {
    SymbolEntry {
        name: symbol.display_name().to_string(),
        kind: symbol.kind.to_lsp_symbol_kind(),
        container_name: symbol.scope.clone().or_else(|| {
            symbol
                .name
                .rsplit_once('\\')
                .map(|(container, _)| container.to_string())
        }),
        location: Location::new(uri.to_string(), symbol.selection_range),
    }
}
