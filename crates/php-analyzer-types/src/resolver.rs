//! Namespace and import resolution.
//!
//! Converts names as written in source (qualified, relative-qualified,
//! unqualified, fully qualified) into canonical FQNs. FQNs are stored
//! without a leading backslash; the empty namespace is `""`.

use crate::symbol::SymbolKind;
use serde::{Deserialize, Serialize};

/// One `use` clause: `alias` maps to `target` for names of kind `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRule {
    pub kind: SymbolKind,
    pub alias: String,
    pub target: String,
}

/// Name-resolution state at a point in a document: the current namespace,
/// the import rules in scope, and the stack of enclosing class declarations.
///
/// The resolver never fails; names that match no rule pass through resolved
/// against the current namespace.
#[derive(Debug, Clone, Default)]
pub struct NameResolver {
    pub namespace_name: String,
    pub rules: Vec<ImportRule>,
    class_stack: Vec<(String, String)>,
}

impl NameResolver {
    pub fn new(namespace_name: impl Into<String>) -> Self {
        NameResolver {
            namespace_name: namespace_name.into(),
            rules: Vec::new(),
            class_stack: Vec::new(),
        }
    }

    pub fn add_rule(&mut self, rule: ImportRule) {
        self.rules.push(rule);
    }

    /// Record entry into a class declaration. `base_fqn` is empty when the
    /// class has no base.
    pub fn push_class(&mut self, this_fqn: impl Into<String>, base_fqn: impl Into<String>) {
        self.class_stack.push((this_fqn.into(), base_fqn.into()));
    }

    pub fn pop_class(&mut self) {
        self.class_stack.pop();
    }

    /// FQN of the innermost enclosing class, if any.
    pub fn class_name(&self) -> Option<&str> {
        self.class_stack.last().map(|(this, _)| this.as_str())
    }

    /// FQN of the innermost enclosing class's base class, if any.
    pub fn base_class_name(&self) -> Option<&str> {
        self.class_stack
            .last()
            .map(|(_, base)| base.as_str())
            .filter(|base| !base.is_empty())
    }

    /// Concatenate the current namespace and `name`; if either side is
    /// empty the other is returned unchanged.
    pub fn resolve_relative(&self, name: &str) -> String {
        if self.namespace_name.is_empty() {
            return name.to_string();
        }
        if name.is_empty() {
            return self.namespace_name.clone();
        }
        format!("{}\\{}", self.namespace_name, name)
    }

    /// Resolve a name that carries no leading backslash.
    pub fn resolve_not_fully_qualified(&self, name: &str, kind: SymbolKind) -> String {
        match name {
            "self" | "static" | "$this" => {
                return self.class_name().map(str::to_string).unwrap_or_default()
            }
            "parent" => {
                return self
                    .base_class_name()
                    .map(str::to_string)
                    .unwrap_or_default()
            }
            _ => {}
        }

        if let Some((first, rest)) = name.split_once('\\') {
            // Qualified: the first segment may be a class-kind alias.
            if let Some(rule) = self.match_import(first, SymbolKind::Class) {
                return format!("{}\\{}", rule.target, rest);
            }
            return self.resolve_relative(name);
        }

        if let Some(rule) = self.match_import(name, kind) {
            return rule.target.clone();
        }
        self.resolve_relative(name)
    }

    /// Resolve any written form of a name to an FQN.
    ///
    /// `\A\B` is already fully qualified; `namespace\A` is
    /// relative-qualified; everything else goes through the import rules.
    pub fn resolve(&self, name: &str, kind: SymbolKind) -> String {
        if name.is_empty() {
            return String::new();
        }
        if let Some(rest) = name.strip_prefix('\\') {
            return rest.to_string();
        }
        if let Some(rest) = name.strip_prefix("namespace\\") {
            return self.resolve_relative(rest);
        }
        self.resolve_not_fully_qualified(name, kind)
    }

    fn match_import(&self, alias: &str, kind: SymbolKind) -> Option<&ImportRule> {
        self.rules
            .iter()
            .find(|rule| kinds_compatible(rule.kind, kind) && rule.alias == alias)
    }
}

fn kinds_compatible(rule_kind: SymbolKind, query_kind: SymbolKind) -> bool {
    match query_kind {
        SymbolKind::Function => rule_kind == SymbolKind::Function,
        SymbolKind::Constant => rule_kind == SymbolKind::Constant,
        _ => rule_kind.is_class_like() || rule_kind == SymbolKind::Class,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver_with_rules() -> NameResolver {
        let mut r = NameResolver::new("App\\Http");
        r.add_rule(ImportRule {
            kind: SymbolKind::Class,
            alias: "Foo".to_string(),
            target: "A\\B\\Foo".to_string(),
        });
        r.add_rule(ImportRule {
            kind: SymbolKind::Function,
            alias: "helper".to_string(),
            target: "A\\Util\\helper".to_string(),
        });
        r
    }

    #[test]
    fn test_resolve_relative_empty_sides() {
        let r = NameResolver::new("App");
        assert_eq!(r.resolve_relative(""), "App");
        assert_eq!(r.resolve_relative("Foo"), "App\\Foo");

        let global = NameResolver::new("");
        assert_eq!(global.resolve_relative("Foo"), "Foo");
        assert_eq!(global.resolve_relative(""), "");
    }

    #[test]
    fn test_separator_iff_namespace_nonempty() {
        let r = NameResolver::new("App");
        assert!(r.resolve_relative("Foo").contains('\\'));
        let global = NameResolver::new("");
        assert!(!global.resolve_relative("Foo").contains('\\'));
    }

    #[test]
    fn test_import_rule_match() {
        let r = resolver_with_rules();
        assert_eq!(r.resolve("Foo", SymbolKind::Class), "A\\B\\Foo");
        assert_eq!(r.resolve("helper", SymbolKind::Function), "A\\Util\\helper");
        // A class lookup does not hit a function rule.
        assert_eq!(r.resolve("helper", SymbolKind::Class), "App\\Http\\helper");
    }

    #[test]
    fn test_qualified_name_splices_rest_onto_alias_target() {
        let r = resolver_with_rules();
        assert_eq!(r.resolve("Foo\\Inner", SymbolKind::Class), "A\\B\\Foo\\Inner");
        // No matching alias: relative resolution.
        assert_eq!(
            r.resolve("Other\\Thing", SymbolKind::Class),
            "App\\Http\\Other\\Thing"
        );
    }

    #[test]
    fn test_fully_qualified_passes_through() {
        let r = resolver_with_rules();
        assert_eq!(r.resolve("\\X\\Y", SymbolKind::Class), "X\\Y");
    }

    #[test]
    fn test_relative_qualified() {
        let r = resolver_with_rules();
        assert_eq!(
            r.resolve("namespace\\Sub\\Thing", SymbolKind::Class),
            "App\\Http\\Sub\\Thing"
        );
    }

    #[test]
    fn test_class_stack() {
        let mut r = NameResolver::new("App");
        r.push_class("App\\Foo", "App\\Base");
        assert_eq!(r.resolve("self", SymbolKind::Class), "App\\Foo");
        assert_eq!(r.resolve("static", SymbolKind::Class), "App\\Foo");
        assert_eq!(r.resolve("parent", SymbolKind::Class), "App\\Base");
        r.push_class("App\\Foo#42", "");
        assert_eq!(r.resolve("self", SymbolKind::Class), "App\\Foo#42");
        assert_eq!(r.resolve("parent", SymbolKind::Class), "");
        r.pop_class();
        assert_eq!(r.resolve("self", SymbolKind::Class), "App\\Foo");
    }
}
