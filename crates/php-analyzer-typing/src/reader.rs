//! Build the per-document reference table.
//!
//! One forward pass over the parse tree runs three concerns in lockstep:
//! the name resolver tracks namespace/import/class state, the variable
//! table tracks flow-sensitive types, and every name occurrence is emitted
//! as a reference into the nested scope tree. Unresolvable names are still
//! recorded with their literal text.

use crate::expr::ExpressionTypeResolver;
use crate::variables::VariableTable;
use php_analyzer_index::{MergeStrategy, SymbolStore};
use php_analyzer_parser::phpdoc::parse_doc_comment;
use php_analyzer_parser::traverser::{child_of_kind, node_text};
use php_analyzer_parser::{LineIndex, SymbolTable};
use php_analyzer_types::cancel::{cancelled, CancellationToken};
use php_analyzer_types::{
    NameResolver, Range, Reference, ReferenceTable, Scope, ScopeChild, SymbolKind, TypeString,
};
use tree_sitter::{Node, Tree};

pub struct ReferenceReader<'a> {
    uri: &'a str,
    source: &'a str,
    line_index: LineIndex,
    store: &'a SymbolStore,
    table: &'a SymbolTable,
    resolver: NameResolver,
    vars: VariableTable,
    scopes: Vec<Scope>,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> ReferenceReader<'a> {
    /// Read the reference table for one document. Returns `None` when the
    /// walk was cancelled; no partial table escapes.
    pub fn read(
        store: &'a SymbolStore,
        table: &'a SymbolTable,
        tree: &Tree,
        source: &'a str,
        uri: &'a str,
        cancel: Option<&'a CancellationToken>,
    ) -> Option<ReferenceTable> {
        let line_index = LineIndex::new(source);
        let document_range = line_index.range_of(source, 0, source.len());
        let mut reader = ReferenceReader {
            uri,
            source,
            line_index,
            store,
            table,
            resolver: NameResolver::default(),
            vars: VariableTable::new(),
            scopes: vec![Scope::new(document_range)],
            cancel,
        };

        if !reader.visit(tree.root_node()) {
            tracing::debug!(uri, "reference read cancelled");
            return None;
        }
        let root = reader.scopes.pop().unwrap_or(Scope::new(document_range));
        Some(ReferenceTable::new(uri, table.hash, root))
    }

    fn visit(&mut self, node: Node) -> bool {
        if cancelled(self.cancel) {
            return false;
        }
        match node.kind() {
            "namespace_definition" => self.handle_namespace(node),
            "namespace_use_declaration" => self.handle_use(node),
            "class_declaration" => self.handle_class_like(node, SymbolKind::Class),
            "interface_declaration" => self.handle_class_like(node, SymbolKind::Interface),
            "trait_declaration" => self.handle_class_like(node, SymbolKind::Trait),
            "method_declaration" | "function_definition" => self.handle_callable(node),
            "anonymous_function_creation_expression" => self.handle_closure(node),
            "arrow_function" => self.handle_arrow_function(node),
            "object_creation_expression" => self.handle_new(node),
            "member_access_expression" => self.handle_member(node, false),
            "member_call_expression" => self.handle_member(node, true),
            "scoped_call_expression" => self.handle_scoped(node, SymbolKind::Method),
            "scoped_property_access_expression" => self.handle_scoped(node, SymbolKind::Property),
            "class_constant_access_expression" => {
                self.handle_scoped(node, SymbolKind::ClassConstant)
            }
            "function_call_expression" => self.handle_call(node),
            "assignment_expression" => self.handle_assignment(node),
            "if_statement" => self.handle_if(node),
            "switch_statement" => self.handle_switch(node),
            "foreach_statement" => self.handle_foreach(node),
            "catch_clause" => self.handle_catch(node),
            "property_declaration" => self.handle_property_declaration(node),
            "const_declaration" | "class_const_declaration" => self.handle_const_declaration(node),
            "use_declaration" => self.handle_trait_use(node),
            "expression_statement" => self.handle_statement(node),
            "variable_name" => {
                self.emit_variable(node);
                true
            }
            "name" | "qualified_name" => self.handle_bare_name(node),
            _ => self.recurse(node),
        }
    }

    fn recurse(&mut self, node: Node) -> bool {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        for child in children {
            if !self.visit(child) {
                return false;
            }
        }
        true
    }

    // --- Declarations -----------------------------------------------------

    fn handle_namespace(&mut self, node: Node) -> bool {
        if let Some(name_node) = child_of_kind(node, "namespace_name") {
            let name = self.text(name_node).to_string();
            self.emit(Reference::new(
                SymbolKind::Namespace,
                name.clone(),
                self.range(name_node),
            ));
            self.resolver = NameResolver::new(name);
        } else {
            self.resolver = NameResolver::default();
        }
        if let Some(body) = node.child_by_field_name("body") {
            return self.recurse(body);
        }
        true
    }

    fn handle_use(&mut self, node: Node) -> bool {
        let kind = use_kind(node, self.source);

        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        for child in children {
            match child.kind() {
                "namespace_use_clause" => self.handle_use_clause(child, None, kind),
                "namespace_use_group" => {
                    let prefix = node
                        .child_by_field_name("prefix")
                        .or_else(|| child_of_kind(node, "namespace_name"))
                        .map(|n| self.text(n).to_string());
                    let mut group_cursor = child.walk();
                    let clauses: Vec<Node> = child.children(&mut group_cursor).collect();
                    for clause in clauses {
                        if clause.kind() == "namespace_use_clause" {
                            self.handle_use_clause(clause, prefix.as_deref(), kind);
                        }
                    }
                }
                _ => {}
            }
        }
        true
    }

    fn handle_use_clause(&mut self, clause: Node, prefix: Option<&str>, kind: SymbolKind) {
        let mut target: Option<Node> = None;
        let mut alias: Option<String> = None;
        let mut saw_as = false;

        let mut cursor = clause.walk();
        for child in clause.children(&mut cursor) {
            match child.kind() {
                "qualified_name" | "namespace_name" | "name" if !saw_as => target = Some(child),
                "as" => saw_as = true,
                "name" if saw_as => alias = Some(self.text(child).to_string()),
                _ => {}
            }
        }

        let Some(target) = target else { return };
        let target_fqn = match prefix {
            Some(prefix) => format!(
                "{}\\{}",
                prefix.trim_start_matches('\\'),
                self.text(target)
            ),
            None => self.text(target).trim_start_matches('\\').to_string(),
        };
        let alias_name = alias.unwrap_or_else(|| {
            target_fqn
                .rsplit('\\')
                .next()
                .unwrap_or(&target_fqn)
                .to_string()
        });

        self.emit(Reference::new(kind, target_fqn.clone(), self.range(target)));
        self.resolver.add_rule(php_analyzer_types::ImportRule {
            kind,
            alias: alias_name,
            target: target_fqn,
        });
    }

    fn handle_class_like(&mut self, node: Node, kind: SymbolKind) -> bool {
        let Some(name_node) = node.child_by_field_name("name") else {
            return self.recurse(node);
        };
        let fqn = self
            .resolver
            .resolve_relative(self.text(name_node));

        self.open_scope(node);
        self.emit(Reference::new(kind, fqn.clone(), self.range(name_node)));

        let base_fqn = self.emit_heritage(node, kind);

        self.resolver.push_class(fqn, base_fqn);
        self.vars.push_scope(&[]);
        let mut ok = true;
        if let Some(body) = node
            .child_by_field_name("body")
            .or_else(|| child_of_kind(node, "declaration_list"))
        {
            ok = self.recurse(body);
        }
        self.vars.pop_scope();
        self.resolver.pop_class();
        self.close_scope();
        ok
    }

    /// Emit extends/implements references; returns the base class FQN.
    fn emit_heritage(&mut self, node: Node, kind: SymbolKind) -> String {
        let mut base_fqn = String::new();
        if let Some(base_clause) = child_of_kind(node, "base_clause") {
            let mut cursor = base_clause.walk();
            let names: Vec<Node> = base_clause.children(&mut cursor).collect();
            for name in names {
                if matches!(name.kind(), "name" | "qualified_name") {
                    let target = self.resolver.resolve(self.text(name), SymbolKind::Class);
                    let ref_kind = if kind == SymbolKind::Interface {
                        SymbolKind::Interface
                    } else {
                        SymbolKind::Class
                    };
                    if base_fqn.is_empty() && kind != SymbolKind::Interface {
                        base_fqn = target.clone();
                    }
                    self.emit(Reference::new(ref_kind, target, self.range(name)));
                }
            }
        }
        if let Some(iface_clause) = child_of_kind(node, "class_interface_clause") {
            let mut cursor = iface_clause.walk();
            let names: Vec<Node> = iface_clause.children(&mut cursor).collect();
            for name in names {
                if matches!(name.kind(), "name" | "qualified_name") {
                    let target = self.resolver.resolve(self.text(name), SymbolKind::Class);
                    self.emit(Reference::new(
                        SymbolKind::Interface,
                        target,
                        self.range(name),
                    ));
                }
            }
        }
        base_fqn
    }

    fn handle_trait_use(&mut self, node: Node) -> bool {
        let mut cursor = node.walk();
        let names: Vec<Node> = node.children(&mut cursor).collect();
        for name in names {
            if matches!(name.kind(), "name" | "qualified_name") {
                let target = self.resolver.resolve(self.text(name), SymbolKind::Class);
                self.emit(Reference::new(SymbolKind::Trait, target, self.range(name)));
            }
        }
        true
    }

    fn handle_callable(&mut self, node: Node) -> bool {
        let Some(name_node) = node.child_by_field_name("name") else {
            return self.recurse(node);
        };
        let is_method = node.kind() == "method_declaration";
        let name = self.text(name_node).to_string();

        let (kind, fqn) = if is_method {
            let class = self.resolver.class_name().unwrap_or("").to_string();
            (SymbolKind::Method, format!("{}::{}", class, name))
        } else {
            (SymbolKind::Function, self.resolver.resolve_relative(&name))
        };

        self.open_scope(node);
        self.emit(Reference::new(kind, fqn, self.range(name_node)));

        self.vars.push_scope(&[]);
        if is_method && !is_static_declaration(node, self.source) {
            if let Some(class) = self.resolver.class_name() {
                let ty = TypeString::from_atom(class);
                self.vars.set_type("$this", ty);
            }
        }
        self.bind_parameters(node);

        let mut ok = true;
        for field in ["parameters", "return_type", "body"] {
            if let Some(child) = node.child_by_field_name(field) {
                ok = self.visit(child);
                if !ok {
                    break;
                }
            }
        }

        self.vars.pop_scope();
        self.close_scope();
        ok
    }

    fn handle_closure(&mut self, node: Node) -> bool {
        self.open_scope(node);

        // Captured variables keep their outer types.
        let mut carry: Vec<String> = vec!["$this".to_string()];
        if let Some(use_clause) = child_of_kind(node, "anonymous_function_use_clause") {
            let mut cursor = use_clause.walk();
            for var in use_clause.children(&mut cursor) {
                if var.kind() == "variable_name" {
                    carry.push(self.text(var).to_string());
                }
            }
        }
        let carry_refs: Vec<&str> = carry.iter().map(String::as_str).collect();
        self.vars.push_scope(&carry_refs);
        self.bind_parameters(node);

        let mut ok = true;
        if let Some(use_clause) = child_of_kind(node, "anonymous_function_use_clause") {
            ok = self.recurse(use_clause);
        }
        if ok {
            for field in ["parameters", "return_type", "body"] {
                if let Some(child) = node.child_by_field_name(field) {
                    ok = self.visit(child);
                    if !ok {
                        break;
                    }
                }
            }
        }

        self.vars.pop_scope();
        self.close_scope();
        ok
    }

    fn handle_arrow_function(&mut self, node: Node) -> bool {
        self.open_scope(node);
        self.vars.push_scope_inheriting();
        self.bind_parameters(node);

        let mut ok = true;
        for field in ["parameters", "return_type", "body"] {
            if let Some(child) = node.child_by_field_name(field) {
                ok = self.visit(child);
                if !ok {
                    break;
                }
            }
        }

        self.vars.pop_scope();
        self.close_scope();
        ok
    }

    /// Seed parameter types from the symbol table entry of this callable,
    /// where declared and doc types were already resolved.
    fn bind_parameters(&mut self, node: Node) {
        let start = self.range(node).start;
        let callable = self.table.iter().find(|s| {
            matches!(s.kind, SymbolKind::Function | SymbolKind::Method)
                && s.range.start == start
        });
        if let Some(callable) = callable {
            for param in &callable.children {
                if param.kind == SymbolKind::Parameter && !param.ty.is_empty() {
                    self.vars.set_type(&param.name, param.ty.clone());
                }
            }
        }
    }

    fn handle_property_declaration(&mut self, node: Node) -> bool {
        let class = self.resolver.class_name().unwrap_or("").to_string();
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        for child in children {
            if child.kind() == "type" || is_type_node(child.kind()) {
                if !self.visit(child) {
                    return false;
                }
                continue;
            }
            if child.kind() != "property_element" {
                continue;
            }
            if let Some(name_node) = child
                .child_by_field_name("name")
                .or_else(|| child_of_kind(child, "variable_name"))
            {
                self.emit(Reference::new(
                    SymbolKind::Property,
                    format!("{}::{}", class, self.text(name_node)),
                    self.range(name_node),
                ));
            }
            // Default value expression, if any.
            for i in 0..child.named_child_count() {
                if let Some(value) = child.named_child(i) {
                    if value.kind() != "variable_name" && !self.visit(value) {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn handle_const_declaration(&mut self, node: Node) -> bool {
        let class = self.resolver.class_name().map(str::to_string);
        let mut cursor = node.walk();
        let elements: Vec<Node> = node.children(&mut cursor).collect();
        for element in elements {
            if element.kind() != "const_element" {
                continue;
            }
            let Some(name_node) = element
                .child_by_field_name("name")
                .or_else(|| child_of_kind(element, "name"))
            else {
                continue;
            };
            let reference = match &class {
                Some(class) => Reference::new(
                    SymbolKind::ClassConstant,
                    format!("{}::{}", class, self.text(name_node)),
                    self.range(name_node),
                ),
                None => Reference::new(
                    SymbolKind::Constant,
                    self.resolver.resolve_relative(self.text(name_node)),
                    self.range(name_node),
                ),
            };
            self.emit(reference);
            if let Some(value) = element.named_child(1) {
                if !self.visit(value) {
                    return false;
                }
            }
        }
        true
    }

    // --- Expressions ------------------------------------------------------

    fn handle_new(&mut self, node: Node) -> bool {
        if child_of_kind(node, "declaration_list").is_some() {
            return self.handle_anonymous_class(node);
        }

        let mut designator: Option<Node> = None;
        for i in 0..node.named_child_count() {
            if let Some(child) = node.named_child(i) {
                if matches!(child.kind(), "name" | "qualified_name" | "relative_scope") {
                    designator = Some(child);
                    break;
                }
            }
        }
        if let Some(designator) = designator {
            let fqn = self
                .resolver
                .resolve(self.text(designator), SymbolKind::Class);
            let name = if fqn.is_empty() {
                self.text(designator).to_string()
            } else {
                fqn
            };
            self.emit(Reference::new(
                SymbolKind::Constructor,
                name,
                self.range(designator),
            ));
        }

        if let Some(arguments) = child_of_kind(node, "arguments") {
            return self.recurse(arguments);
        }
        true
    }

    fn handle_anonymous_class(&mut self, node: Node) -> bool {
        let fqn = format!("{}#{}", self.uri, node.start_byte());
        self.open_scope(node);
        let base_fqn = self.emit_heritage(node, SymbolKind::Class);

        let mut ok = true;
        if let Some(arguments) = child_of_kind(node, "arguments") {
            ok = self.recurse(arguments);
        }

        self.resolver.push_class(fqn, base_fqn);
        self.vars.push_scope(&[]);
        if ok {
            if let Some(body) = child_of_kind(node, "declaration_list") {
                ok = self.recurse(body);
            }
        }
        self.vars.pop_scope();
        self.resolver.pop_class();
        self.close_scope();
        ok
    }

    fn handle_member(&mut self, node: Node, is_call: bool) -> bool {
        let Some(object) = node.child_by_field_name("object") else {
            return self.recurse(node);
        };
        if !self.visit(object) {
            return false;
        }
        let Some(name_node) = node.child_by_field_name("name") else {
            return true;
        };
        // Dynamic access like `$obj->$prop` already emitted the variable.
        if name_node.kind() == "variable_name" {
            if !self.visit(name_node) {
                return false;
            }
        } else {
            let member = self.text(name_node).to_string();
            let receiver = self.expr_type(object);
            let kind = if is_call {
                SymbolKind::Method
            } else {
                SymbolKind::Property
            };
            let reference = self.member_reference(kind, &receiver, &member, name_node);
            self.emit(reference);
        }

        if let Some(arguments) = child_of_kind(node, "arguments") {
            return self.recurse(arguments);
        }
        true
    }

    fn handle_scoped(&mut self, node: Node, kind: SymbolKind) -> bool {
        let scope_node = node
            .child_by_field_name("scope")
            .or_else(|| node.named_child(0));
        let name_node = node
            .child_by_field_name("name")
            .or_else(|| node.named_child(1));
        let (Some(scope_node), Some(name_node)) = (scope_node, name_node) else {
            return self.recurse(node);
        };

        let receiver = match scope_node.kind() {
            "relative_scope" | "name" | "qualified_name" => {
                let written = self.text(scope_node).to_string();
                let fqn = self.resolver.resolve(&written, SymbolKind::Class);
                let name = if fqn.is_empty() { written } else { fqn };
                self.emit(Reference::new(
                    SymbolKind::Class,
                    name.clone(),
                    self.range(scope_node),
                ));
                TypeString::from_atom(name)
            }
            _ => {
                if !self.visit(scope_node) {
                    return false;
                }
                self.expr_type(scope_node)
            }
        };

        let member = self.text(name_node).to_string();
        // `Foo::class` names the class itself, already emitted above.
        if !(kind == SymbolKind::ClassConstant && member == "class") {
            let reference = self.member_reference(kind, &receiver, &member, name_node);
            self.emit(reference);
        }

        if let Some(arguments) = child_of_kind(node, "arguments") {
            return self.recurse(arguments);
        }
        true
    }

    /// Resolve a member against the receiver's class atoms. The winner (by
    /// Override merge on the first atom that has the member) becomes
    /// `name`; remaining candidates land in `alt_name`. With no receiver
    /// type the literal member text is recorded.
    fn member_reference(
        &self,
        kind: SymbolKind,
        receiver: &TypeString,
        member: &str,
        name_node: Node,
    ) -> Reference {
        let receiver = match self.resolver.class_name() {
            Some(class) => receiver.with_class_context(class),
            None => receiver.clone(),
        };
        let member_key = match kind {
            SymbolKind::Property => {
                if member.starts_with('$') {
                    member.to_string()
                } else {
                    format!("${}", member)
                }
            }
            _ => member.to_string(),
        };

        let mut identities: Vec<String> = Vec::new();
        for class in receiver.atomic_class_names() {
            let members = self
                .store
                .find_members(&class, MergeStrategy::Override, |s| {
                    member_kind_matches(s.kind, kind)
                        && member_name_matches(s.member_name(), &member_key, kind)
                });
            match members.first() {
                Some(found) => identities.push(found.symbol.name.clone()),
                None => identities.push(format!("{}::{}", class, member_key)),
            }
        }
        identities.dedup();

        let name = identities
            .first()
            .cloned()
            .unwrap_or_else(|| member_key.clone());
        let mut reference = Reference::new(kind, name, self.range(name_node));
        if identities.len() > 1 {
            reference.alt_name = Some(identities[1..].join("|"));
        }
        reference
    }

    fn handle_call(&mut self, node: Node) -> bool {
        let Some(callable) = node.child_by_field_name("function") else {
            return self.recurse(node);
        };
        if matches!(callable.kind(), "name" | "qualified_name") {
            let written = self.text(callable).to_string();
            let mut fqn = self.resolver.resolve(&written, SymbolKind::Function);
            // Unqualified calls fall back to the global namespace.
            if !written.contains('\\')
                && self
                    .store
                    .find(&fqn, |s| s.kind == SymbolKind::Function)
                    .is_empty()
                && !self
                    .store
                    .find(&written, |s| s.kind == SymbolKind::Function)
                    .is_empty()
            {
                fqn = written;
            }
            self.emit(Reference::new(
                SymbolKind::Function,
                fqn,
                self.range(callable),
            ));
        } else if !self.visit(callable) {
            return false;
        }

        if let Some(arguments) = child_of_kind(node, "arguments") {
            return self.recurse(arguments);
        }
        true
    }

    fn handle_assignment(&mut self, node: Node) -> bool {
        let left = node.child_by_field_name("left");
        let right = node.child_by_field_name("right");

        if let (Some(left), Some(right)) = (left, right) {
            if left.kind() == "variable_name" {
                let ty = self.expr_type(right);
                self.vars.set_type(self.text(left), ty);
            }
            if !self.visit(left) {
                return false;
            }
            return self.visit(right);
        }
        self.recurse(node)
    }

    // --- Control flow -----------------------------------------------------

    fn handle_if(&mut self, node: Node) -> bool {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();

        let mut condition_done = false;
        let mut narrowings: Vec<(String, TypeString)> = Vec::new();
        for child in children {
            match child.kind() {
                "parenthesized_expression" if !condition_done => {
                    condition_done = true;
                    if !self.visit(child) {
                        return false;
                    }
                    narrowings = self.instanceof_narrowings(child);
                }
                "else_if_clause" => {
                    if !self.handle_else_if(child) {
                        return false;
                    }
                }
                "else_clause" => {
                    self.vars.push_branch();
                    let ok = self.recurse(child);
                    self.vars.pop_branch();
                    if !ok {
                        return false;
                    }
                }
                "comment" => {}
                _ if child.is_named() => {
                    // The if body.
                    self.vars.push_branch();
                    for (name, ty) in &narrowings {
                        self.vars.set_narrowed_type(name, ty.clone());
                    }
                    let ok = self.visit(child);
                    self.vars.pop_branch();
                    if !ok {
                        return false;
                    }
                }
                _ => {}
            }
        }
        self.vars.prune_branches();
        true
    }

    fn handle_else_if(&mut self, node: Node) -> bool {
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();

        let mut narrowings: Vec<(String, TypeString)> = Vec::new();
        let mut condition_done = false;
        for child in children {
            match child.kind() {
                "parenthesized_expression" if !condition_done => {
                    condition_done = true;
                    if !self.visit(child) {
                        return false;
                    }
                    narrowings = self.instanceof_narrowings(child);
                }
                "comment" => {}
                _ if child.is_named() => {
                    self.vars.push_branch();
                    for (name, ty) in &narrowings {
                        self.vars.set_narrowed_type(name, ty.clone());
                    }
                    let ok = self.visit(child);
                    self.vars.pop_branch();
                    if !ok {
                        return false;
                    }
                }
                _ => {}
            }
        }
        true
    }

    fn handle_switch(&mut self, node: Node) -> bool {
        if let Some(condition) = child_of_kind(node, "parenthesized_expression") {
            if !self.visit(condition) {
                return false;
            }
        }
        if let Some(block) = child_of_kind(node, "switch_block") {
            let mut cursor = block.walk();
            let arms: Vec<Node> = block.children(&mut cursor).collect();
            for arm in arms {
                if matches!(arm.kind(), "case_statement" | "default_statement") {
                    self.vars.push_branch();
                    let ok = self.recurse(arm);
                    self.vars.pop_branch();
                    if !ok {
                        return false;
                    }
                }
            }
        }
        self.vars.prune_branches();
        true
    }

    fn handle_foreach(&mut self, node: Node) -> bool {
        if let Some(collection) = node.named_child(0) {
            let element = self.expr_type(collection).array_dereference();
            let (key, value) = foreach_variables(node);
            if let Some(value) = value {
                self.vars.set_type(self.text(value), element);
            }
            if let Some(key) = key {
                self.vars
                    .set_type(self.text(key), TypeString::new("int|string"));
            }
        }
        self.recurse(node)
    }

    fn handle_catch(&mut self, node: Node) -> bool {
        let mut caught = TypeString::empty();
        if let Some(type_list) = node
            .child_by_field_name("type")
            .or_else(|| child_of_kind(node, "type_list"))
        {
            let mut cursor = type_list.walk();
            for name in type_list.children(&mut cursor) {
                if matches!(name.kind(), "name" | "qualified_name") {
                    let fqn = self.resolver.resolve(self.text(name), SymbolKind::Class);
                    caught = caught.merge(&TypeString::from_atom(fqn));
                }
            }
        }
        let var = node
            .child_by_field_name("name")
            .or_else(|| child_of_kind(node, "variable_name"));
        if let Some(var) = var {
            if !caught.is_empty() {
                self.vars.set_type(self.text(var), caught);
            }
        }
        self.recurse(node)
    }

    /// Apply `/** @var ... */` annotations above a statement, then visit
    /// it. Named tags bind their variable directly; an unnamed tag binds
    /// the statement's assignment target.
    fn handle_statement(&mut self, node: Node) -> bool {
        let Some(doc) = self.preceding_doc(node) else {
            return self.recurse(node);
        };

        for tag in &doc.vars {
            if let Some(name) = &tag.name {
                self.vars
                    .set_type(name, tag.ty.name_resolve(&self.resolver));
            }
        }
        if !self.recurse(node) {
            return false;
        }
        // Doc types win over what the statement inferred.
        for tag in &doc.vars {
            let resolved = tag.ty.name_resolve(&self.resolver);
            match &tag.name {
                Some(name) => self.vars.set_type(name, resolved),
                None => {
                    if let Some(target) = assignment_target(node, self.source) {
                        self.vars.set_type(&target, resolved);
                    }
                }
            }
        }
        true
    }

    // --- Leaves -----------------------------------------------------------

    fn emit_variable(&mut self, node: Node) {
        let name = self.text(node).to_string();
        let ty = if name == "$this" {
            self.resolver
                .class_name()
                .map(TypeString::from_atom)
                .unwrap_or_default()
        } else {
            self.vars.get_type(&name)
        };
        let mut reference = Reference::new(SymbolKind::Variable, name, self.range(node));
        reference.ty = (!ty.is_empty()).then_some(ty);
        self.emit(reference);
    }

    fn handle_bare_name(&mut self, node: Node) -> bool {
        let Some(parent) = node.parent() else {
            return true;
        };
        // Segments of a qualified name are covered by the whole.
        if matches!(parent.kind(), "qualified_name" | "namespace_name") {
            return true;
        }
        let text = self.text(node).to_string();
        let class_position = is_type_node(parent.kind())
            || matches!(
                parent.kind(),
                "base_clause" | "class_interface_clause" | "type_list"
            )
            || is_instanceof_operand(node, parent, self.source);
        if class_position {
            let fqn = self.resolver.resolve(&text, SymbolKind::Class);
            let name = if fqn.is_empty() { text } else { fqn };
            self.emit(Reference::new(SymbolKind::Class, name, self.range(node)));
            return true;
        }
        // Everything else in expression position is a constant reference.
        let fqn = self.resolver.resolve(&text, SymbolKind::Constant);
        let name = if fqn.is_empty() { text } else { fqn };
        self.emit(Reference::new(SymbolKind::Constant, name, self.range(node)));
        true
    }

    // --- Plumbing ---------------------------------------------------------

    fn instanceof_narrowings(&self, condition: Node) -> Vec<(String, TypeString)> {
        let mut out = Vec::new();
        collect_instanceof(condition, self.source, &mut |var, class| {
            let fqn = self.resolver.resolve(class, SymbolKind::Class);
            if !fqn.is_empty() {
                out.push((var.to_string(), TypeString::from_atom(fqn)));
            }
        });
        out
    }

    fn preceding_doc(&self, node: Node) -> Option<php_analyzer_parser::phpdoc::DocComment> {
        let mut prev = node.prev_sibling();
        while let Some(p) = prev {
            if p.kind() == "comment" {
                let text = node_text(p, self.source);
                return text.starts_with("/**").then(|| parse_doc_comment(text));
            }
            if p.is_named() {
                return None;
            }
            prev = p.prev_sibling();
        }
        None
    }

    fn expr_type(&self, node: Node) -> TypeString {
        ExpressionTypeResolver::new(self.store, &self.resolver, &self.vars, self.uri)
            .resolve(node, self.source)
    }

    fn emit(&mut self, reference: Reference) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.children.push(ScopeChild::Ref(reference));
        }
    }

    fn open_scope(&mut self, node: Node) {
        self.scopes.push(Scope::new(self.range(node)));
    }

    fn close_scope(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            if let Some(parent) = self.scopes.last_mut() {
                parent.children.push(ScopeChild::Scope(scope));
            } else {
                self.scopes.push(scope);
            }
        }
    }

    fn range(&self, node: Node) -> Range {
        self.line_index
            .range_of(self.source, node.start_byte(), node.end_byte())
    }

    fn text(&self, node: Node) -> &'a str {
        node_text(node, self.source)
    }
}

fn member_kind_matches(symbol_kind: SymbolKind, wanted: SymbolKind) -> bool {
    match wanted {
        SymbolKind::Method => symbol_kind == SymbolKind::Method,
        SymbolKind::Property => symbol_kind == SymbolKind::Property,
        SymbolKind::ClassConstant => symbol_kind == SymbolKind::ClassConstant,
        _ => symbol_kind == wanted,
    }
}

fn member_name_matches(symbol_member: &str, wanted: &str, kind: SymbolKind) -> bool {
    if kind == SymbolKind::Method {
        symbol_member.eq_ignore_ascii_case(wanted)
    } else {
        symbol_member == wanted
    }
}

/// True when `node` is the class name on the right of `instanceof`.
fn is_instanceof_operand(node: Node, parent: Node, source: &str) -> bool {
    if !matches!(parent.kind(), "binary_expression" | "instanceof_expression") {
        return false;
    }
    node.prev_sibling()
        .map(|p| node_text(p, source) == "instanceof")
        .unwrap_or(false)
}

fn is_type_node(kind: &str) -> bool {
    matches!(
        kind,
        "named_type" | "optional_type" | "union_type" | "intersection_type" | "primitive_type"
    )
}

fn is_static_declaration(node: Node, source: &str) -> bool {
    let mut cursor = node.walk();
    let result = node.children(&mut cursor).any(|c| {
        c.kind() == "static_modifier" || (!c.is_named() && node_text(c, source) == "static")
    });
    result
}

fn use_kind(node: Node, source: &str) -> SymbolKind {
    for i in 0..node.child_count() {
        let Some(child) = node.child(i) else { break };
        match child.kind() {
            "function" => return SymbolKind::Function,
            "const" => return SymbolKind::Constant,
            "namespace_use_clause" | "namespace_use_group" => break,
            _ => {}
        }
    }
    let text = node_text(node, source);
    if text.starts_with("use function") {
        SymbolKind::Function
    } else if text.starts_with("use const") {
        SymbolKind::Constant
    } else {
        SymbolKind::Class
    }
}

fn collect_instanceof(node: Node, source: &str, f: &mut impl FnMut(&str, &str)) {
    let is_instanceof = match node.kind() {
        "instanceof_expression" => true,
        "binary_expression" => {
            let mut cursor = node.walk();
            let result = node.children(&mut cursor)
                .any(|c| node_text(c, source) == "instanceof");
            result
        }
        _ => false,
    };
    if is_instanceof {
        let left = node
            .child_by_field_name("left")
            .or_else(|| node.named_child(0));
        let right = node
            .child_by_field_name("right")
            .or_else(|| node.named_child(1));
        if let (Some(left), Some(right)) = (left, right) {
            if left.kind() == "variable_name"
                && matches!(right.kind(), "name" | "qualified_name")
            {
                f(node_text(left, source), node_text(right, source));
            }
        }
        return;
    }
    for i in 0..node.named_child_count() {
        if let Some(child) = node.named_child(i) {
            collect_instanceof(child, source, f);
        }
    }
}

/// The key/value variables of a foreach statement. Falls back to scanning
/// the children between `as` and the body when the grammar exposes no
/// fields.
fn foreach_variables(node: Node) -> (Option<Node>, Option<Node>) {
    let key = node.child_by_field_name("key").filter(|n| n.kind() == "variable_name");
    let value = node
        .child_by_field_name("value")
        .filter(|n| n.kind() == "variable_name");
    if value.is_some() {
        return (key, value);
    }

    let mut vars: Vec<Node> = Vec::new();
    let mut after_as = false;
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "as" => after_as = true,
            ")" => break,
            "variable_name" if after_as => vars.push(child),
            "pair" | "foreach_pair" | "by_ref" if after_as => {
                let mut inner = child.walk();
                for v in child.children(&mut inner) {
                    if v.kind() == "variable_name" {
                        vars.push(v);
                    }
                }
            }
            _ => {}
        }
    }
    match vars.len() {
        0 => (None, None),
        1 => (None, Some(vars[0])),
        _ => (Some(vars[0]), Some(vars[1])),
    }
}

fn assignment_target(statement: Node, source: &str) -> Option<String> {
    let expr = statement.named_child(0)?;
    if expr.kind() != "assignment_expression" {
        return None;
    }
    let left = expr.child_by_field_name("left")?;
    (left.kind() == "variable_name").then(|| node_text(left, source).to_string())
}
