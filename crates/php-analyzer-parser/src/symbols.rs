//! Build the per-document symbol tree from a parse tree.
//!
//! A scope stack drives construction: every declaration becomes a child of
//! the current container, and container declarations (namespaces, class
//! likes, functions, methods, closures) collect their own children before
//! being attached. Error subtrees are skipped; partial symbols survive.

use crate::line_index::LineIndex;
use crate::phpdoc::{parse_doc_comment, DocComment};
use crate::table::SymbolTable;
use crate::traverser::{child_of_kind, node_text};
use php_analyzer_types::{
    DocBlock, ImportRule, NameResolver, Range, Symbol, SymbolIdentity, SymbolKind,
    SymbolModifiers, TypeString, Visibility,
};
use tree_sitter::{Node, Tree};

/// Extracts the symbol table of one document.
pub struct SymbolReader<'a> {
    uri: &'a str,
    source: &'a str,
    line_index: LineIndex,
    resolver: NameResolver,
}

impl<'a> SymbolReader<'a> {
    /// Build a [`SymbolTable`] for `uri` from a parsed tree.
    pub fn read(tree: &Tree, source: &'a str, uri: &'a str) -> SymbolTable {
        let mut reader = SymbolReader {
            uri,
            source,
            line_index: LineIndex::new(source),
            resolver: NameResolver::default(),
        };

        let program = tree.root_node();
        let mut root = Symbol::new(SymbolKind::File, uri, reader.range(program));

        // Track an unbraced `namespace N;` declaration: it contains every
        // following declaration until the next namespace definition.
        let mut ns_container: Option<Symbol> = None;

        let mut cursor = program.walk();
        let children: Vec<Node> = program.children(&mut cursor).collect();
        for child in children {
            if child.kind() == "namespace_definition" {
                if let Some(ns) = ns_container.take() {
                    push_finalized(&mut root, ns);
                }
                ns_container = reader.read_namespace(child, &mut root);
            } else {
                let target = ns_container.as_mut().unwrap_or(&mut root);
                reader.read_statement(child, target);
            }
        }
        if let Some(ns) = ns_container.take() {
            push_finalized(&mut root, ns);
        }

        SymbolTable::new(uri, crate::document::content_hash(source), root)
    }

    /// Returns the namespace symbol when the definition is unbraced (the
    /// caller keeps it open as the current container).
    fn read_namespace(&mut self, node: Node, root: &mut Symbol) -> Option<Symbol> {
        let name = child_of_kind(node, "namespace_name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        self.resolver = NameResolver::new(name.clone());

        let mut sym = Symbol::new(SymbolKind::Namespace, name, self.range(node));
        if let Some(name_node) = child_of_kind(node, "namespace_name") {
            sym.selection_range = self.range(name_node);
        }

        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            let children: Vec<Node> = body.children(&mut cursor).collect();
            for child in children {
                self.read_statement(child, &mut sym);
            }
            push_finalized(root, sym);
            None
        } else {
            Some(sym)
        }
    }

    fn read_statement(&mut self, node: Node, parent: &mut Symbol) {
        if node.is_error() {
            return;
        }
        match node.kind() {
            "namespace_use_declaration" => self.read_use_declaration(node, parent),
            "class_declaration" => self.read_class_like(node, SymbolKind::Class, parent),
            "interface_declaration" => self.read_class_like(node, SymbolKind::Interface, parent),
            "trait_declaration" => self.read_class_like(node, SymbolKind::Trait, parent),
            "function_definition" => self.read_function(node, parent),
            "const_declaration" => self.read_constants(node, parent),
            _ => self.collect_expressions(node, parent),
        }
    }

    /// Walk statement/expression subtrees for closures, anonymous classes,
    /// nested declarations and local variable bindings.
    fn collect_expressions(&mut self, node: Node, container: &mut Symbol) {
        if node.is_error() {
            return;
        }
        match node.kind() {
            "class_declaration" => {
                self.read_class_like(node, SymbolKind::Class, container);
                return;
            }
            "function_definition" => {
                self.read_function(node, container);
                return;
            }
            "anonymous_function_creation_expression" | "arrow_function" => {
                self.read_closure(node, container);
                return;
            }
            "object_creation_expression" => {
                if child_of_kind(node, "declaration_list").is_some() {
                    self.read_anonymous_class(node, container);
                    return;
                }
            }
            "assignment_expression" => {
                if let Some(left) = node.child_by_field_name("left") {
                    if left.kind() == "variable_name" {
                        self.record_local(left, container);
                    }
                }
            }
            "foreach_statement" => {
                // Key and value bindings sit between `as` and the body.
                let mut after_as = false;
                let mut cursor = node.walk();
                let parts: Vec<Node> = node.children(&mut cursor).collect();
                for part in parts {
                    match part.kind() {
                        "as" => after_as = true,
                        ")" => break,
                        "variable_name" if after_as => self.record_local(part, container),
                        "pair" | "foreach_pair" | "by_ref" if after_as => {
                            let mut inner = part.walk();
                            let vars: Vec<Node> = part.children(&mut inner).collect();
                            for var in vars {
                                if var.kind() == "variable_name" {
                                    self.record_local(var, container);
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            "catch_clause" => {
                let var = node
                    .child_by_field_name("name")
                    .or_else(|| child_of_kind(node, "variable_name"));
                if let Some(var) = var {
                    self.record_local(var, container);
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        for child in children {
            self.collect_expressions(child, container);
        }
    }

    fn record_local(&mut self, var_node: Node, container: &mut Symbol) {
        if !is_variable_scope(container.kind) {
            return;
        }
        let name = self.text(var_node);
        if !name.starts_with('$') || name == "$this" {
            return;
        }
        if container
            .children
            .iter()
            .any(|c| matches!(c.kind, SymbolKind::Parameter | SymbolKind::Variable) && c.name == name)
        {
            return;
        }
        let range = self.range(var_node);
        container
            .children
            .push(Symbol::new(SymbolKind::Variable, name, range));
    }

    fn read_use_declaration(&mut self, node: Node, parent: &mut Symbol) {
        let kind = use_statement_kind(node, self.source);

        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        for child in children {
            match child.kind() {
                "namespace_use_clause" => self.read_use_clause(child, None, kind, parent),
                "namespace_use_group" => {
                    let prefix = node
                        .child_by_field_name("prefix")
                        .or_else(|| child_of_kind(node, "namespace_name"))
                        .map(|n| self.text(n).to_string());
                    let mut group_cursor = child.walk();
                    let clauses: Vec<Node> = child.children(&mut group_cursor).collect();
                    for clause in clauses {
                        if clause.kind() == "namespace_use_clause" {
                            self.read_use_clause(clause, prefix.as_deref(), kind, parent);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn read_use_clause(
        &mut self,
        clause: Node,
        prefix: Option<&str>,
        kind: SymbolKind,
        parent: &mut Symbol,
    ) {
        let mut target: Option<String> = None;
        let mut alias: Option<String> = None;
        let mut saw_as = false;

        let mut cursor = clause.walk();
        for child in clause.children(&mut cursor) {
            match child.kind() {
                "qualified_name" | "namespace_name" | "name" if !saw_as => {
                    target = Some(self.text(child).to_string());
                }
                "as" => saw_as = true,
                "name" if saw_as => alias = Some(self.text(child).to_string()),
                _ => {}
            }
        }

        let Some(target) = target else { return };
        let target_fqn = match prefix {
            Some(prefix) => format!("{}\\{}", prefix.trim_start_matches('\\'), target),
            None => target.trim_start_matches('\\').to_string(),
        };
        let alias_name = alias.unwrap_or_else(|| {
            target_fqn
                .rsplit('\\')
                .next()
                .unwrap_or(&target_fqn)
                .to_string()
        });

        self.resolver.add_rule(ImportRule {
            kind,
            alias: alias_name.clone(),
            target: target_fqn.clone(),
        });

        let mut sym = Symbol::new(kind, alias_name, self.range(clause));
        sym.modifiers.is_import = true;
        sym.associated
            .push(SymbolIdentity::new(kind, target_fqn));
        parent.children.push(sym);
    }

    fn read_class_like(&mut self, node: Node, kind: SymbolKind, parent: &mut Symbol) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).to_string();
        let fqn = self.resolver.resolve_relative(&name);

        let mut sym = Symbol::new(kind, fqn.clone(), self.range(node));
        sym.selection_range = self.range(name_node);
        sym.modifiers = self.modifiers(node);

        let doc = self.doc_comment(node);
        if let Some(doc) = &doc {
            sym.doc = doc_block(doc);
        }

        let base_fqn = self.read_heritage(node, kind, &mut sym);

        self.resolver.push_class(fqn.clone(), base_fqn);
        if let Some(body) = node
            .child_by_field_name("body")
            .or_else(|| child_of_kind(node, "declaration_list"))
        {
            self.read_class_body(body, &mut sym);
        }
        if let Some(doc) = &doc {
            self.add_magic_members(doc, &mut sym);
        }
        self.resolver.pop_class();

        parent.children.push(sym);
    }

    /// Record extends/implements identities in source order; returns the
    /// base class FQN for class declarations ("" if none).
    fn read_heritage(&mut self, node: Node, kind: SymbolKind, sym: &mut Symbol) -> String {
        let mut base_fqn = String::new();

        if let Some(base_clause) = child_of_kind(node, "base_clause") {
            let mut cursor = base_clause.walk();
            for child in base_clause.children(&mut cursor) {
                if matches!(child.kind(), "name" | "qualified_name") {
                    let target = self
                        .resolver
                        .resolve(self.text(child), SymbolKind::Class);
                    if kind == SymbolKind::Interface {
                        sym.associated
                            .push(SymbolIdentity::new(SymbolKind::Interface, target));
                    } else {
                        if base_fqn.is_empty() {
                            base_fqn = target.clone();
                        }
                        sym.associated
                            .push(SymbolIdentity::new(SymbolKind::Class, target));
                    }
                }
            }
        }

        if let Some(iface_clause) = child_of_kind(node, "class_interface_clause") {
            let mut cursor = iface_clause.walk();
            for child in iface_clause.children(&mut cursor) {
                if matches!(child.kind(), "name" | "qualified_name") {
                    let target = self
                        .resolver
                        .resolve(self.text(child), SymbolKind::Class);
                    sym.associated
                        .push(SymbolIdentity::new(SymbolKind::Interface, target));
                }
            }
        }

        base_fqn
    }

    fn read_class_body(&mut self, body: Node, class: &mut Symbol) {
        let mut cursor = body.walk();
        let children: Vec<Node> = body.children(&mut cursor).collect();
        for child in children {
            match child.kind() {
                "method_declaration" => self.read_method(child, class),
                "property_declaration" => self.read_properties(child, class),
                "const_declaration" | "class_const_declaration" => {
                    self.read_class_constants(child, class)
                }
                "use_declaration" => {
                    // Trait use: associated identities only, in use order.
                    let mut use_cursor = child.walk();
                    for name in child.children(&mut use_cursor) {
                        if matches!(name.kind(), "name" | "qualified_name") {
                            let target =
                                self.resolver.resolve(self.text(name), SymbolKind::Class);
                            class
                                .associated
                                .push(SymbolIdentity::new(SymbolKind::Trait, target));
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn read_method(&mut self, node: Node, class: &mut Symbol) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).to_string();
        let fqn = format!("{}::{}", class.name, name);

        let mut sym = Symbol::new(SymbolKind::Method, fqn, self.range(node));
        sym.selection_range = self.range(name_node);
        sym.visibility = self.visibility(node);
        sym.modifiers = self.modifiers(node);
        sym.scope = Some(class.name.clone());

        let doc = self.doc_comment(node).unwrap_or_default();
        sym.doc = doc_block(&doc);
        sym.ty = self.return_type(node, &doc);

        let promoted = self.read_parameters(node, &mut sym, &doc, Some(&class.name));
        if let Some(body) = node.child_by_field_name("body") {
            self.collect_expressions(body, &mut sym);
        }

        class.children.push(sym);
        class.children.extend(promoted);
    }

    fn read_function(&mut self, node: Node, parent: &mut Symbol) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).to_string();
        let fqn = self.resolver.resolve_relative(&name);

        let mut sym = Symbol::new(SymbolKind::Function, fqn, self.range(node));
        sym.selection_range = self.range(name_node);

        let doc = self.doc_comment(node).unwrap_or_default();
        sym.doc = doc_block(&doc);
        sym.ty = self.return_type(node, &doc);

        self.read_parameters(node, &mut sym, &doc, None);
        if let Some(body) = node.child_by_field_name("body") {
            self.collect_expressions(body, &mut sym);
        }

        parent.children.push(sym);
    }

    fn read_closure(&mut self, node: Node, parent: &mut Symbol) {
        let fqn = format!("{}#{}", self.uri, node.start_byte());
        let mut sym = Symbol::new(SymbolKind::Function, fqn, self.range(node));
        sym.modifiers.is_anonymous = true;

        let doc = self.doc_comment(node).unwrap_or_default();
        sym.ty = self.return_type(node, &doc);
        self.read_parameters(node, &mut sym, &doc, None);

        // `use ($a, &$b)` captures behave like locals inside the closure.
        if let Some(use_clause) = child_of_kind(node, "anonymous_function_use_clause") {
            let mut cursor = use_clause.walk();
            let captured: Vec<Node> = use_clause.children(&mut cursor).collect();
            for var in captured {
                if var.kind() == "variable_name" {
                    self.record_local(var, &mut sym);
                }
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            self.collect_expressions(body, &mut sym);
        }
        parent.children.push(sym);
    }

    fn read_anonymous_class(&mut self, node: Node, parent: &mut Symbol) {
        let fqn = format!("{}#{}", self.uri, node.start_byte());
        let mut sym = Symbol::new(SymbolKind::Class, fqn.clone(), self.range(node));
        sym.modifiers.is_anonymous = true;

        let base_fqn = self.read_heritage(node, SymbolKind::Class, &mut sym);

        self.resolver.push_class(fqn, base_fqn);
        if let Some(body) = child_of_kind(node, "declaration_list") {
            self.read_class_body(body, &mut sym);
        }
        self.resolver.pop_class();

        parent.children.push(sym);
    }

    /// Read the formal parameter list into `callable`; returns promoted
    /// constructor properties for the enclosing class.
    fn read_parameters(
        &mut self,
        node: Node,
        callable: &mut Symbol,
        doc: &DocComment,
        class_fqn: Option<&str>,
    ) -> Vec<Symbol> {
        let mut promoted = Vec::new();
        let Some(params) = node.child_by_field_name("parameters") else {
            return promoted;
        };

        let mut cursor = params.walk();
        let children: Vec<Node> = params.children(&mut cursor).collect();
        for param in children {
            if !matches!(
                param.kind(),
                "simple_parameter" | "variadic_parameter" | "property_promotion_parameter"
            ) {
                continue;
            }
            let Some(name_node) = param.child_by_field_name("name") else {
                continue;
            };
            let name = self.text(name_node).to_string();
            let bare = name.trim_start_matches('$');

            let declared = param
                .child_by_field_name("type")
                .map(|t| self.type_of(t))
                .unwrap_or_default();
            let ty = if declared.is_empty() {
                doc.param_type(bare)
                    .map(|t| t.name_resolve(&self.resolver))
                    .unwrap_or_default()
            } else {
                declared
            };

            let mut sym = Symbol::new(SymbolKind::Parameter, name.clone(), self.range(param));
            sym.selection_range = self.range(name_node);
            sym.ty = ty.clone();
            sym.value = param
                .child_by_field_name("default_value")
                .map(|n| self.text(n).to_string());

            if param.kind() == "property_promotion_parameter" {
                if let Some(class_fqn) = class_fqn {
                    let mut prop = Symbol::new(
                        SymbolKind::Property,
                        format!("{}::{}", class_fqn, name),
                        self.range(param),
                    );
                    prop.selection_range = self.range(name_node);
                    prop.visibility = self.visibility(param);
                    prop.ty = ty;
                    prop.scope = Some(class_fqn.to_string());
                    promoted.push(prop);
                }
            }

            callable.children.push(sym);
        }
        promoted
    }

    fn read_properties(&mut self, node: Node, class: &mut Symbol) {
        let visibility = self.visibility(node);
        let modifiers = self.modifiers(node);
        let doc = self.doc_comment(node).unwrap_or_default();

        let declared = node
            .child_by_field_name("type")
            .map(|t| self.type_of(t))
            .unwrap_or_default();

        let mut cursor = node.walk();
        let elements: Vec<Node> = node.children(&mut cursor).collect();
        for element in elements {
            if element.kind() != "property_element" {
                continue;
            }
            let Some(name_node) = element
                .child_by_field_name("name")
                .or_else(|| child_of_kind(element, "variable_name"))
            else {
                continue;
            };
            let name = self.text(name_node).to_string();

            let ty = if declared.is_empty() {
                doc.var_type(None)
                    .or_else(|| doc.var_type(Some(name.as_str())))
                    .map(|t| t.name_resolve(&self.resolver))
                    .unwrap_or_default()
            } else {
                declared.clone()
            };

            let mut sym = Symbol::new(
                SymbolKind::Property,
                format!("{}::{}", class.name, name),
                self.range(node),
            );
            sym.selection_range = self.range(name_node);
            sym.visibility = visibility;
            sym.modifiers = modifiers;
            sym.ty = ty;
            sym.scope = Some(class.name.clone());
            sym.doc = doc_block(&doc);
            class.children.push(sym);
        }
    }

    fn read_class_constants(&mut self, node: Node, class: &mut Symbol) {
        let visibility = self.visibility(node);
        let doc = self.doc_comment(node).unwrap_or_default();

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
            let name = self.text(name_node).to_string();
            let value = element.named_child(1).map(|n| self.text(n).to_string());

            let mut sym = Symbol::new(
                SymbolKind::ClassConstant,
                format!("{}::{}", class.name, name),
                self.range(element),
            );
            sym.selection_range = self.range(name_node);
            sym.visibility = visibility;
            sym.ty = value
                .as_deref()
                .map(literal_type)
                .unwrap_or_default();
            sym.value = value;
            sym.scope = Some(class.name.clone());
            sym.doc = doc_block(&doc);
            class.children.push(sym);
        }
    }

    fn read_constants(&mut self, node: Node, parent: &mut Symbol) {
        let doc = self.doc_comment(node).unwrap_or_default();

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
            let name = self.text(name_node).to_string();
            let value = element.named_child(1).map(|n| self.text(n).to_string());

            let mut sym = Symbol::new(
                SymbolKind::Constant,
                self.resolver.resolve_relative(&name),
                self.range(element),
            );
            sym.selection_range = self.range(name_node);
            sym.ty = value
                .as_deref()
                .map(literal_type)
                .unwrap_or_default();
            sym.value = value;
            sym.doc = doc_block(&doc);
            parent.children.push(sym);
        }
    }

    /// Materialize `@property` and `@method` tags as members.
    fn add_magic_members(&mut self, doc: &DocComment, class: &mut Symbol) {
        for tag in &doc.properties {
            let mut sym = Symbol::new(
                SymbolKind::Property,
                format!("{}::{}", class.name, tag.name),
                class.selection_range,
            );
            sym.ty = tag.ty.name_resolve(&self.resolver);
            sym.scope = Some(class.name.clone());
            if tag.description.is_some() {
                sym.doc = Some(DocBlock {
                    summary: tag.description.clone(),
                    deprecated: None,
                });
            }
            class.children.push(sym);
        }
        for tag in &doc.methods {
            let mut sym = Symbol::new(
                SymbolKind::Method,
                format!("{}::{}", class.name, tag.name),
                class.selection_range,
            );
            sym.modifiers.is_static = tag.is_static;
            sym.ty = tag.return_ty.name_resolve(&self.resolver);
            sym.scope = Some(class.name.clone());
            for param in &tag.params {
                let mut p = Symbol::new(
                    SymbolKind::Parameter,
                    format!("${}", param.name),
                    class.selection_range,
                );
                p.ty = param.ty.name_resolve(&self.resolver);
                sym.children.push(p);
            }
            class.children.push(sym);
        }
    }

    fn return_type(&self, node: Node, doc: &DocComment) -> TypeString {
        let declared = node
            .child_by_field_name("return_type")
            .map(|t| self.type_of(t))
            .unwrap_or_default();
        if !declared.is_empty() {
            return declared;
        }
        doc.return_ty.name_resolve(&self.resolver)
    }

    fn type_of(&self, type_node: Node) -> TypeString {
        // Declared `A|B` and `A&B` both parse into the atom list.
        let text = self.text(type_node).replace('&', "|");
        TypeString::new(&text).name_resolve(&self.resolver)
    }

    fn visibility(&self, node: Node) -> Visibility {
        match child_of_kind(node, "visibility_modifier").map(|n| self.text(n)) {
            Some("protected") => Visibility::Protected,
            Some("private") => Visibility::Private,
            _ => Visibility::Public,
        }
    }

    fn modifiers(&self, node: Node) -> SymbolModifiers {
        let mut mods = SymbolModifiers::default();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "static_modifier" => mods.is_static = true,
                "abstract_modifier" => mods.is_abstract = true,
                "final_modifier" => mods.is_final = true,
                _ => {
                    if self.text(child) == "static" {
                        mods.is_static = true;
                    }
                }
            }
        }
        mods
    }

    /// The `/** ... */` comment immediately preceding a node, parsed.
    fn doc_comment(&self, node: Node) -> Option<DocComment> {
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

    fn range(&self, node: Node) -> Range {
        self.line_index
            .range_of(self.source, node.start_byte(), node.end_byte())
    }

    fn text(&self, node: Node) -> &'a str {
        node_text(node, self.source)
    }
}

/// Push a container after expanding its range to cover its children, so an
/// unbraced namespace contains everything declared under it.
fn push_finalized(parent: &mut Symbol, mut sym: Symbol) {
    if let Some(last) = sym.children.last() {
        if sym.range.end < last.range.end {
            sym.range.end = last.range.end;
        }
    }
    parent.children.push(sym);
}

fn is_variable_scope(kind: SymbolKind) -> bool {
    matches!(
        kind,
        SymbolKind::File | SymbolKind::Namespace | SymbolKind::Function | SymbolKind::Method
    )
}

fn use_statement_kind(node: Node, source: &str) -> SymbolKind {
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

/// Guess a type from a constant's literal initializer.
fn literal_type(value: &str) -> TypeString {
    let value = value.trim();
    if value.starts_with('\'') || value.starts_with('"') {
        TypeString::from_atom("string")
    } else if value == "true" || value == "false" {
        TypeString::from_atom("bool")
    } else if value.starts_with('[') || value.starts_with("array(") {
        TypeString::from_atom("array")
    } else if value.parse::<i64>().is_ok() {
        TypeString::from_atom("int")
    } else if value.parse::<f64>().is_ok() {
        TypeString::from_atom("float")
    } else {
        TypeString::empty()
    }
}

fn doc_block(doc: &DocComment) -> Option<DocBlock> {
    let block = DocBlock {
        summary: doc.summary.clone(),
        deprecated: doc.deprecated.clone(),
    };
    (!block.is_empty()).then_some(block)
}
