//! Map an expression node to a type string.
//!
//! A recursive evaluator over expression phrases: variables come from the
//! [`VariableTable`], members from the symbol store through the type
//! aggregate, calls from the declared symbol. Anything unknown yields the
//! empty type; the resolver never fails.

use crate::variables::VariableTable;
use php_analyzer_index::{MergeStrategy, SymbolStore};
use php_analyzer_parser::traverser::{child_of_kind, node_text};
use php_analyzer_types::{NameResolver, SymbolKind, TypeString};
use tree_sitter::Node;

/// How a member is being reached; decides which member kinds apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MemberAccess {
    Method,
    Property,
    StaticProperty,
    Constant,
}

pub struct ExpressionTypeResolver<'a> {
    pub store: &'a SymbolStore,
    pub resolver: &'a NameResolver,
    pub vars: &'a VariableTable,
    pub uri: &'a str,
}

impl<'a> ExpressionTypeResolver<'a> {
    pub fn new(
        store: &'a SymbolStore,
        resolver: &'a NameResolver,
        vars: &'a VariableTable,
        uri: &'a str,
    ) -> Self {
        ExpressionTypeResolver {
            store,
            resolver,
            vars,
            uri,
        }
    }

    pub fn resolve(&self, node: Node, source: &str) -> TypeString {
        match node.kind() {
            "variable_name" => {
                let text = node_text(node, source);
                if text == "$this" {
                    return self
                        .resolver
                        .class_name()
                        .map(TypeString::from_atom)
                        .unwrap_or_default();
                }
                self.vars.get_type(text)
            }

            // A qualified name in value position denotes the class type.
            "name" | "qualified_name" => {
                let fqn = self
                    .resolver
                    .resolve(node_text(node, source), SymbolKind::Class);
                TypeString::from_atom(fqn)
            }

            "parenthesized_expression" => node
                .named_child(0)
                .map(|inner| self.resolve(inner, source))
                .unwrap_or_default(),

            "subscript_expression" => node
                .named_child(0)
                .map(|base| self.resolve(base, source).array_dereference())
                .unwrap_or_default(),

            "member_call_expression" => self.member_access(node, source, MemberAccess::Method),
            "member_access_expression" => self.member_access(node, source, MemberAccess::Property),

            "scoped_call_expression" => self.scoped_access(node, source, MemberAccess::Method),
            "scoped_property_access_expression" => {
                self.scoped_access(node, source, MemberAccess::StaticProperty)
            }
            "class_constant_access_expression" => {
                self.scoped_access(node, source, MemberAccess::Constant)
            }

            "function_call_expression" => self.function_call(node, source),

            "object_creation_expression" => {
                if child_of_kind(node, "declaration_list").is_some() {
                    return TypeString::from_atom(format!("{}#{}", self.uri, node.start_byte()));
                }
                for i in 0..node.named_child_count() {
                    if let Some(child) = node.named_child(i) {
                        if matches!(child.kind(), "name" | "qualified_name") {
                            let fqn = self
                                .resolver
                                .resolve(node_text(child, source), SymbolKind::Class);
                            return TypeString::from_atom(fqn);
                        }
                    }
                }
                TypeString::empty()
            }

            "assignment_expression" => node
                .child_by_field_name("right")
                .map(|rhs| self.resolve(rhs, source))
                .unwrap_or_default(),

            "conditional_expression" => {
                // a ? b : c unions the arms; a ?: c unions condition and alternative.
                let count = node.named_child_count();
                if count < 2 {
                    return TypeString::empty();
                }
                let first = if count == 2 { 0 } else { 1 };
                let a = node
                    .named_child(first)
                    .map(|n| self.resolve(n, source))
                    .unwrap_or_default();
                let b = node
                    .named_child(count - 1)
                    .map(|n| self.resolve(n, source))
                    .unwrap_or_default();
                a.merge(&b)
            }

            "binary_expression" => self.binary(node, source),

            "clone_expression" => node
                .named_child(0)
                .map(|inner| self.resolve(inner, source))
                .unwrap_or_default(),

            "anonymous_function_creation_expression" | "arrow_function" => {
                TypeString::from_atom(format!("{}#{}", self.uri, node.start_byte()))
            }

            "integer" => TypeString::from_atom("int"),
            "float" => TypeString::from_atom("float"),
            "string" | "encapsed_string" | "heredoc" => TypeString::from_atom("string"),
            "boolean" | "true" | "false" => TypeString::from_atom("bool"),
            "null" => TypeString::from_atom("null"),
            "array_creation_expression" => TypeString::from_atom("array"),

            _ => TypeString::empty(),
        }
    }

    /// Resolve the written receiver of a `::` access to class FQNs.
    pub fn scope_designator(&self, node: Node, source: &str) -> TypeString {
        match node.kind() {
            "relative_scope" | "name" | "qualified_name" => {
                let fqn = self
                    .resolver
                    .resolve(node_text(node, source), SymbolKind::Class);
                TypeString::from_atom(fqn)
            }
            _ => self.resolve(node, source),
        }
    }

    /// Member lookup across the receiver's class atoms; merged result.
    pub fn member_type(&self, receiver: &TypeString, member: &str, is_method: bool) -> TypeString {
        let access = if is_method {
            MemberAccess::Method
        } else {
            MemberAccess::Property
        };
        self.member_type_with(receiver, member, access)
    }

    fn member_access(&self, node: Node, source: &str, access: MemberAccess) -> TypeString {
        let Some(object) = node.child_by_field_name("object") else {
            return TypeString::empty();
        };
        let Some(name_node) = node.child_by_field_name("name") else {
            return TypeString::empty();
        };
        let receiver = self.resolve(object, source);
        self.member_type_with(&receiver, node_text(name_node, source), access)
    }

    fn scoped_access(&self, node: Node, source: &str, access: MemberAccess) -> TypeString {
        let scope = node
            .child_by_field_name("scope")
            .or_else(|| node.named_child(0));
        let name = node
            .child_by_field_name("name")
            .or_else(|| node.named_child(1));
        let (Some(scope), Some(name)) = (scope, name) else {
            return TypeString::empty();
        };
        let receiver = self.scope_designator(scope, source);
        self.member_type_with(&receiver, node_text(name, source), access)
    }

    fn member_type_with(
        &self,
        receiver: &TypeString,
        member: &str,
        access: MemberAccess,
    ) -> TypeString {
        let receiver = match self.resolver.class_name() {
            Some(class) => receiver.with_class_context(class),
            None => receiver.clone(),
        };

        let mut out = TypeString::empty();
        for class in receiver.atomic_class_names() {
            let members = self.store.find_members(&class, MergeStrategy::Override, |s| {
                member_matches(s, member, access)
            });
            for found in members {
                // Late static binding: `static`/`self`/`$this` in a member
                // type become the receiver's class.
                out = out.merge(&found.symbol.ty.with_class_context(&class));
            }
        }
        out
    }

    fn function_call(&self, node: Node, source: &str) -> TypeString {
        let Some(callable) = node.child_by_field_name("function") else {
            return TypeString::empty();
        };
        if !matches!(callable.kind(), "name" | "qualified_name") {
            return self.resolve(callable, source);
        }
        let written = node_text(callable, source);
        let fqn = self.resolver.resolve(written, SymbolKind::Function);

        let mut found = self.store.find(&fqn, |s| s.kind == SymbolKind::Function);
        if found.is_empty() && !written.contains('\\') {
            // Unqualified calls fall back to the global namespace.
            found = self.store.find(written, |s| s.kind == SymbolKind::Function);
        }
        found
            .first()
            .map(|f| f.symbol.ty.clone())
            .unwrap_or_default()
    }

    fn binary(&self, node: Node, source: &str) -> TypeString {
        let operator = node
            .child_by_field_name("operator")
            .map(|op| node_text(op, source))
            .unwrap_or("");
        let left = node.child_by_field_name("left");
        let right = node.child_by_field_name("right");
        match operator {
            "??" => {
                let a = left.map(|n| self.resolve(n, source)).unwrap_or_default();
                let b = right.map(|n| self.resolve(n, source)).unwrap_or_default();
                a.merge(&b)
            }
            "." => TypeString::from_atom("string"),
            "==" | "===" | "!=" | "!==" | "<" | ">" | "<=" | ">=" | "&&" | "||" | "instanceof" => {
                TypeString::from_atom("bool")
            }
            _ => TypeString::empty(),
        }
    }
}

fn member_matches(symbol: &php_analyzer_types::Symbol, member: &str, access: MemberAccess) -> bool {
    match access {
        MemberAccess::Method => {
            symbol.kind == SymbolKind::Method && symbol.member_name().eq_ignore_ascii_case(member)
        }
        MemberAccess::Property => {
            let wanted = if member.starts_with('$') {
                member.to_string()
            } else {
                format!("${}", member)
            };
            symbol.kind == SymbolKind::Property
                && !symbol.modifiers.is_static
                && symbol.member_name() == wanted
        }
        MemberAccess::StaticProperty => {
            symbol.kind == SymbolKind::Property && symbol.member_name() == member
        }
        MemberAccess::Constant => {
            symbol.kind == SymbolKind::ClassConstant && symbol.member_name() == member
        }
    }
}
