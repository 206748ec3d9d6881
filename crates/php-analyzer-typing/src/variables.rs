//! The flow-sensitive variable table.
//!
//! An arena of frames with parent indices. A Scope frame isolates variable
//! visibility (functions, methods, closures); a Branch frame defers commit
//! (if/elseif/else arms, switch cases). `elseif` and `else` branches are
//! siblings of the `if` branch on the enclosing frame: popping a branch
//! leaves it recorded there, and `prune_branches` unions all siblings at
//! once.

use php_analyzer_types::TypeString;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Scope,
    Branch,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    parent: Option<usize>,
    vars: HashMap<String, TypeString>,
    /// Condition-derived bindings (`instanceof` guards). Visible like
    /// `vars` but never merged by `prune_branches`: the guard only holds
    /// inside its branch.
    narrowed: HashMap<String, TypeString>,
    branches: Vec<usize>,
}

#[derive(Debug)]
pub struct VariableTable {
    frames: Vec<Frame>,
    top: usize,
}

impl Default for VariableTable {
    fn default() -> Self {
        VariableTable {
            frames: vec![Frame {
                kind: FrameKind::Scope,
                parent: None,
                vars: HashMap::new(),
                narrowed: HashMap::new(),
                branches: Vec::new(),
            }],
            top: 0,
        }
    }
}

impl VariableTable {
    pub fn new() -> Self {
        VariableTable::default()
    }

    /// Record a variable's type on the top frame, replacing any previous
    /// binding there.
    pub fn set_type(&mut self, name: &str, ty: TypeString) {
        self.frames[self.top].narrowed.remove(name);
        self.frames[self.top].vars.insert(name.to_string(), ty);
    }

    /// Record a guard-derived binding on the top frame. It shadows outer
    /// bindings but does not survive `prune_branches`.
    pub fn set_narrowed_type(&mut self, name: &str, ty: TypeString) {
        self.frames[self.top].narrowed.insert(name.to_string(), ty);
    }

    /// Look a variable up from the top frame outward, stopping at the
    /// nearest Scope frame (inclusive).
    pub fn get_type(&self, name: &str) -> TypeString {
        let mut current = Some(self.top);
        while let Some(idx) = current {
            let frame = &self.frames[idx];
            if let Some(ty) = frame.narrowed.get(name) {
                return ty.clone();
            }
            if let Some(ty) = frame.vars.get(name) {
                return ty.clone();
            }
            if frame.kind == FrameKind::Scope {
                break;
            }
            current = frame.parent;
        }
        TypeString::empty()
    }

    /// Enter an isolated scope, carrying only the named variables in.
    pub fn push_scope(&mut self, carry: &[&str]) {
        let carried: Vec<(String, TypeString)> = carry
            .iter()
            .map(|name| (name.to_string(), self.get_type(name)))
            .collect();
        self.push_frame(FrameKind::Scope);
        for (name, ty) in carried {
            if !ty.is_empty() {
                self.set_type(&name, ty);
            }
        }
    }

    /// Enter a scope that sees every variable visible outside it (arrow
    /// functions capture implicitly).
    pub fn push_scope_inheriting(&mut self) {
        let visible = self.visible_vars();
        self.push_frame(FrameKind::Scope);
        for (name, ty) in visible {
            self.set_type(&name, ty);
        }
    }

    pub fn pop_scope(&mut self) {
        if let Some(parent) = self.frames[self.top].parent {
            self.top = parent;
        }
    }

    /// Open a branch under the current frame. The branch stays recorded on
    /// its parent after `pop_branch` so siblings merge together.
    pub fn push_branch(&mut self) {
        let idx = self.push_frame(FrameKind::Branch);
        let parent = self.frames[idx].parent.unwrap_or(0);
        self.frames[parent].branches.push(idx);
    }

    pub fn pop_branch(&mut self) {
        if let Some(parent) = self.frames[self.top].parent {
            self.top = parent;
        }
    }

    /// Merge all recorded child branches into the current frame: per
    /// variable, the union of the types observed in any branch.
    pub fn prune_branches(&mut self) {
        let branch_indices = std::mem::take(&mut self.frames[self.top].branches);
        for idx in branch_indices {
            let vars: Vec<(String, TypeString)> = self.frames[idx]
                .vars
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            for (name, ty) in vars {
                let existing = self.frames[self.top]
                    .vars
                    .get(&name)
                    .cloned()
                    .unwrap_or_else(|| self.get_type(&name));
                self.frames[self.top]
                    .vars
                    .insert(name, existing.merge(&ty));
            }
        }
    }

    fn push_frame(&mut self, kind: FrameKind) -> usize {
        let idx = self.frames.len();
        self.frames.push(Frame {
            kind,
            parent: Some(self.top),
            vars: HashMap::new(),
            narrowed: HashMap::new(),
            branches: Vec::new(),
        });
        self.top = idx;
        idx
    }

    /// Every binding visible from the top frame, innermost first.
    fn visible_vars(&self) -> Vec<(String, TypeString)> {
        let mut out: Vec<(String, TypeString)> = Vec::new();
        let mut current = Some(self.top);
        while let Some(idx) = current {
            let frame = &self.frames[idx];
            for (name, ty) in frame.narrowed.iter().chain(frame.vars.iter()) {
                if !out.iter().any(|(n, _)| n == name) {
                    out.push((name.clone(), ty.clone()));
                }
            }
            if frame.kind == FrameKind::Scope {
                break;
            }
            current = frame.parent;
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(s: &str) -> TypeString {
        TypeString::new(s)
    }

    #[test]
    fn test_set_and_get() {
        let mut table = VariableTable::new();
        table.set_type("$a", ty("Foo"));
        assert_eq!(table.get_type("$a"), ty("Foo"));
        assert!(table.get_type("$missing").is_empty());
    }

    #[test]
    fn test_scope_isolates() {
        let mut table = VariableTable::new();
        table.set_type("$a", ty("Foo"));
        table.push_scope(&[]);
        assert!(table.get_type("$a").is_empty());
        table.set_type("$a", ty("Bar"));
        assert_eq!(table.get_type("$a"), ty("Bar"));
        table.pop_scope();
        assert_eq!(table.get_type("$a"), ty("Foo"));
    }

    #[test]
    fn test_scope_carries_named_variables() {
        let mut table = VariableTable::new();
        table.set_type("$this", ty("App\\Foo"));
        table.set_type("$other", ty("Bar"));
        table.push_scope(&["$this"]);
        assert_eq!(table.get_type("$this"), ty("App\\Foo"));
        assert!(table.get_type("$other").is_empty());
    }

    #[test]
    fn test_inheriting_scope_sees_everything() {
        let mut table = VariableTable::new();
        table.set_type("$a", ty("Foo"));
        table.push_scope_inheriting();
        assert_eq!(table.get_type("$a"), ty("Foo"));
        table.set_type("$a", ty("Bar"));
        table.pop_scope();
        assert_eq!(table.get_type("$a"), ty("Foo"));
    }

    #[test]
    fn test_branch_defers_commit() {
        let mut table = VariableTable::new();
        table.set_type("$x", ty("Foo"));
        table.push_branch();
        table.set_type("$x", ty("Bar"));
        assert_eq!(table.get_type("$x"), ty("Bar"));
        table.pop_branch();
        // Not yet pruned: the branch write is invisible.
        assert_eq!(table.get_type("$x"), ty("Foo"));
        table.prune_branches();
        assert_eq!(table.get_type("$x"), ty("Foo|Bar"));
    }

    #[test]
    fn test_sibling_branches_union_on_prune() {
        // if/elseif/else arms are siblings: pruning unions all of them.
        let mut table = VariableTable::new();
        table.push_branch();
        table.set_type("$x", ty("A"));
        table.pop_branch();
        table.push_branch();
        table.set_type("$x", ty("B"));
        table.pop_branch();
        table.push_branch();
        table.set_type("$x", ty("C"));
        table.pop_branch();
        table.prune_branches();
        assert_eq!(table.get_type("$x"), ty("A|B|C"));
    }

    #[test]
    fn test_nested_branches() {
        let mut table = VariableTable::new();
        table.push_branch();
        table.push_branch();
        table.set_type("$x", ty("Deep"));
        table.pop_branch();
        table.prune_branches();
        assert_eq!(table.get_type("$x"), ty("Deep"));
        table.pop_branch();
        table.prune_branches();
        assert_eq!(table.get_type("$x"), ty("Deep"));
    }

    #[test]
    fn test_narrowed_types_do_not_survive_prune() {
        let mut table = VariableTable::new();
        table.set_type("$x", ty("Foo"));
        table.push_branch();
        table.set_narrowed_type("$x", ty("Bar"));
        assert_eq!(table.get_type("$x"), ty("Bar"));
        table.pop_branch();
        table.prune_branches();
        assert_eq!(table.get_type("$x"), ty("Foo"));
    }

    #[test]
    fn test_assignment_replaces_narrowing() {
        let mut table = VariableTable::new();
        table.push_branch();
        table.set_narrowed_type("$x", ty("Bar"));
        table.set_type("$x", ty("Baz"));
        assert_eq!(table.get_type("$x"), ty("Baz"));
        table.pop_branch();
        table.prune_branches();
        assert_eq!(table.get_type("$x"), ty("Baz"));
    }

    #[test]
    fn test_branch_lookup_passes_through_to_scope() {
        let mut table = VariableTable::new();
        table.set_type("$a", ty("Outer"));
        table.push_branch();
        assert_eq!(table.get_type("$a"), ty("Outer"));
        table.pop_branch();
    }
}
