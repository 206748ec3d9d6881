//! Everything a completion strategy inspects at the cursor.

use php_analyzer_index::{MergeStrategy, SymbolStore};
use php_analyzer_parser::traverser::node_text;
use php_analyzer_parser::{LineIndex, ParseTreeTraverser, SymbolTable};
use php_analyzer_types::{
    NameResolver, Position, Reference, ReferenceTable, Symbol, SymbolKind, TypeString,
};
use tree_sitter::{Node, Tree};

pub struct CompletionContext<'a> {
    pub store: &'a SymbolStore,
    pub table: &'a SymbolTable,
    pub refs: Option<&'a ReferenceTable>,
    pub tree: &'a Tree,
    pub source: &'a str,
    pub position: Position,
    pub offset: usize,
    pub resolver: NameResolver,
}

impl<'a> CompletionContext<'a> {
    pub fn new(
        store: &'a SymbolStore,
        table: &'a SymbolTable,
        refs: Option<&'a ReferenceTable>,
        tree: &'a Tree,
        source: &'a str,
        position: Position,
    ) -> Self {
        let line_index = LineIndex::new(source);
        let offset = line_index.offset_of(source, position);
        let resolver = table.name_resolver_at(position);
        CompletionContext {
            store,
            table,
            refs,
            tree,
            source,
            position,
            offset,
            resolver,
        }
    }

    /// The token ending at or before the cursor. At an exact boundary this
    /// is the preceding token, which decides the strategy.
    pub fn token_before(&self) -> Option<Node<'a>> {
        ParseTreeTraverser::new(self.tree).token_before(self.offset)
    }

    /// Text of the current line up to the cursor.
    pub fn line_prefix(&self) -> &'a str {
        let line_start = self.source[..self.offset]
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        &self.source[line_start..self.offset]
    }

    /// The identifier fragment already typed, ending at the cursor.
    pub fn word_prefix(&self) -> &'a str {
        let prefix = self.line_prefix();
        let start = prefix
            .rfind(|c: char| !c.is_alphanumeric() && c != '_')
            .map(|i| i + 1)
            .unwrap_or(0);
        &prefix[start..]
    }

    /// Like `word_prefix`, including backslashes (qualified names).
    pub fn qualified_prefix(&self) -> &'a str {
        let prefix = self.line_prefix();
        let start = prefix
            .rfind(|c: char| !c.is_alphanumeric() && c != '_' && c != '\\')
            .map(|i| i + 1)
            .unwrap_or(0);
        &prefix[start..]
    }

    /// The nearest strictly enclosing node of one of the given kinds.
    pub fn enclosing(&self, kinds: &[&str]) -> Option<Node<'a>> {
        let mut traverser = ParseTreeTraverser::new(self.tree);
        traverser.seek_byte(self.offset.saturating_sub(1));
        traverser.ancestor(|n| kinds.contains(&n.kind()))
    }

    pub fn enclosing_class(&self) -> Option<&'a Symbol> {
        self.table.enclosing_class_at(self.position)
    }

    pub fn enclosing_class_fqn(&self) -> Option<&str> {
        self.resolver.class_name()
    }

    /// Variables visible at the cursor: `$this` plus the parameters and
    /// locals of the innermost callable (or the file's top level).
    pub fn visible_variables(&self) -> Vec<&'a Symbol> {
        let mut out = Vec::new();
        let holder = self
            .table
            .enclosing_callable_at(self.position)
            .or_else(|| {
                self.table
                    .path_at(self.position)
                    .into_iter()
                    .rev()
                    .find(|s| s.kind == SymbolKind::Namespace)
            })
            .unwrap_or(&self.table.root);
        for child in &holder.children {
            if matches!(child.kind, SymbolKind::Parameter | SymbolKind::Variable) {
                out.push(child);
            }
        }
        out
    }

    /// Type of the receiver expression ending right before `operator_end`
    /// (the byte just past `->` or `::`). Resolution goes through the
    /// reference table, which already carries flow-sensitive types.
    pub fn receiver_type(&self, operator_end: usize) -> TypeString {
        let receiver_end = {
            let before = &self.source[..operator_end];
            if before.ends_with("->") || before.ends_with("::") {
                operator_end - 2
            } else {
                operator_end
            }
        };

        let mut traverser = ParseTreeTraverser::new(self.tree);
        let Some(token) = traverser.token_before(receiver_end) else {
            return TypeString::empty();
        };
        let node = token;

        // Widest expression ending where the receiver ends.
        let mut receiver = node;
        traverser.seek_byte(node.start_byte());
        for ancestor in traverser.ancestors() {
            if ancestor.end_byte() == receiver.end_byte() {
                receiver = ancestor;
            }
        }
        self.node_type(receiver)
    }

    /// Best-effort type of a node, read back from the reference table.
    pub fn node_type(&self, node: Node) -> TypeString {
        match node.kind() {
            "variable_name" => {
                let text = node_text(node, self.source);
                if text == "$this" {
                    return self
                        .enclosing_class_fqn()
                        .map(TypeString::from_atom)
                        .unwrap_or_default();
                }
                self.reference_in(node)
                    .and_then(|r| r.ty.clone())
                    .unwrap_or_default()
            }
            "name" | "qualified_name" | "relative_scope" => {
                let fqn = self
                    .resolver
                    .resolve(node_text(node, self.source), SymbolKind::Class);
                TypeString::from_atom(fqn)
            }
            "parenthesized_expression" => node
                .named_child(0)
                .map(|inner| self.node_type(inner))
                .unwrap_or_default(),
            "object_creation_expression" => self
                .reference_in(node)
                .map(|r| TypeString::from_atom(r.name.clone()))
                .unwrap_or_default(),
            _ => {
                // Calls and member accesses: resolve the recorded
                // reference to its declaration and take its type.
                let Some(reference) = self.reference_in(node) else {
                    return TypeString::empty();
                };
                let targets = self
                    .store
                    .find_symbols_by_reference(reference, MergeStrategy::Override);
                targets
                    .first()
                    .map(|t| {
                        let owner = t.symbol.scope.clone().unwrap_or_default();
                        t.symbol.ty.with_class_context(&owner)
                    })
                    .unwrap_or_default()
            }
        }
    }

    /// The innermost recorded reference whose range intersects a node.
    fn reference_in(&self, node: Node) -> Option<&'a Reference> {
        let refs = self.refs?;
        let line_index = LineIndex::new(self.source);
        let start = line_index.position_of(self.source, node.start_byte());
        let end = line_index.position_of(self.source, node.end_byte());
        refs.reference_at(start)
            .or_else(|| refs.reference_at(end))
            .or_else(|| {
                // Fall back to the last reference starting inside the node.
                let mut best: Option<&Reference> = None;
                for r in refs.iter() {
                    if r.range.start >= start && r.range.end <= end {
                        best = Some(r);
                    }
                }
                best
            })
    }
}
