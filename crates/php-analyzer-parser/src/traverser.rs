//! Spine-based traversal over the tree-sitter parse tree.
//!
//! A traverser captures its position as a list of child indices from the
//! root rather than as borrowed nodes, so it is cheap to clone and store.
//! The visitor walk drives symbol and reference construction.

use php_analyzer_types::cancel::{cancelled, CancellationToken};
use tree_sitter::{Node, Tree};

/// Text of a node.
pub fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    source.get(node.byte_range()).unwrap_or("")
}

/// First child with the given kind.
pub fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let result = node.children(&mut cursor).find(|c| c.kind() == kind);
    result
}

/// True if the node has a child of the given kind.
pub fn has_child_of_kind(node: Node, kind: &str) -> bool {
    child_of_kind(node, kind).is_some()
}

/// A cursor into the parse tree positioned on one node, with its spine.
#[derive(Debug, Clone)]
pub struct ParseTreeTraverser<'t> {
    root: Node<'t>,
    spine: Vec<usize>,
}

impl<'t> ParseTreeTraverser<'t> {
    pub fn new(tree: &'t Tree) -> Self {
        ParseTreeTraverser {
            root: tree.root_node(),
            spine: Vec::new(),
        }
    }

    /// The node the traverser is positioned on.
    pub fn node(&self) -> Node<'t> {
        let mut node = self.root;
        for &idx in &self.spine {
            match node.child(idx) {
                Some(child) => node = child,
                None => break,
            }
        }
        node
    }

    pub fn parent(&self) -> Option<Node<'t>> {
        if self.spine.is_empty() {
            return None;
        }
        let mut node = self.root;
        for &idx in &self.spine[..self.spine.len() - 1] {
            node = node.child(idx)?;
        }
        Some(node)
    }

    /// Ancestors from the parent outward to the root.
    pub fn ancestors(&self) -> Vec<Node<'t>> {
        let mut out = Vec::with_capacity(self.spine.len());
        let mut node = self.root;
        for &idx in &self.spine {
            out.push(node);
            match node.child(idx) {
                Some(child) => node = child,
                None => break,
            }
        }
        out.reverse();
        out
    }

    /// Nearest ancestor (or self) matching the predicate.
    pub fn ancestor(&self, pred: impl Fn(Node) -> bool) -> Option<Node<'t>> {
        if pred(self.node()) {
            return Some(self.node());
        }
        self.ancestors().into_iter().find(|n| pred(*n))
    }

    /// Position on the deepest node whose byte range contains `byte`.
    pub fn seek_byte(&mut self, byte: usize) -> Node<'t> {
        self.spine.clear();
        let mut node = self.root;
        'descend: loop {
            for i in 0..node.child_count() {
                let child = match node.child(i) {
                    Some(c) => c,
                    None => break,
                };
                if child.start_byte() <= byte && byte < child.end_byte() {
                    self.spine.push(i);
                    node = child;
                    continue 'descend;
                }
            }
            return node;
        }
    }

    /// The token (leaf) ending at or before `byte`, if any. At an exact
    /// token boundary this is the *preceding* token.
    pub fn token_before(&self, byte: usize) -> Option<Node<'t>> {
        token_ending_at_or_before(self.root, byte)
    }
}

fn token_ending_at_or_before(node: Node, byte: usize) -> Option<Node> {
    if node.child_count() == 0 {
        return (node.end_byte() <= byte && node.start_byte() < node.end_byte()).then_some(node);
    }
    for i in (0..node.child_count()).rev() {
        let child = node.child(i)?;
        if child.start_byte() >= byte {
            continue;
        }
        if child.end_byte() <= byte {
            // Fully before: its last leaf is the candidate.
            if let Some(tok) = last_leaf(child) {
                return Some(tok);
            }
            continue;
        }
        // Straddles: descend.
        if let Some(tok) = token_ending_at_or_before(child, byte) {
            return Some(tok);
        }
    }
    None
}

fn last_leaf(node: Node) -> Option<Node> {
    let mut node = node;
    while node.child_count() > 0 {
        node = node.child(node.child_count() - 1)?;
    }
    (node.start_byte() < node.end_byte()).then_some(node)
}

/// Pre/post-order visitor over the parse tree.
pub trait TreeVisitor {
    /// Called before a node's children; return false to skip the subtree.
    fn preorder(&mut self, node: Node, source: &str) -> bool;

    /// Called after a node's children.
    fn postorder(&mut self, _node: Node, _source: &str) {}
}

/// Walk the tree. Returns false if the walk was cancelled; the visitor's
/// partial output must then be discarded by the caller.
pub fn walk(
    root: Node,
    source: &str,
    visitor: &mut dyn TreeVisitor,
    cancel: Option<&CancellationToken>,
) -> bool {
    if cancelled(cancel) {
        return false;
    }
    if visitor.preorder(root, source) {
        for i in 0..root.child_count() {
            let child = match root.child(i) {
                Some(c) => c,
                None => break,
            };
            if !walk(child, source, visitor, cancel) {
                return false;
            }
        }
    }
    visitor.postorder(root, source);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;

    fn doc(code: &str) -> Document {
        Document::new("file:///test.php", code, 1)
    }

    #[test]
    fn test_seek_byte_finds_deepest_node() {
        let code = "<?php\nclass Foo { public function bar(): int { return 1; } }\n";
        let d = doc(code);
        let tree = d.tree().unwrap();
        let mut traverser = ParseTreeTraverser::new(tree);

        let offset = code.find("bar").unwrap() + 1;
        let node = traverser.seek_byte(offset);
        assert_eq!(node.kind(), "name");
        assert_eq!(node_text(node, code), "bar");

        let parents: Vec<&str> = traverser.ancestors().iter().map(|n| n.kind()).collect();
        assert!(parents.contains(&"method_declaration"));
        assert!(parents.contains(&"class_declaration"));
    }

    #[test]
    fn test_ancestor_search() {
        let code = "<?php\nclass Foo { public function bar() { $x = 1; } }\n";
        let d = doc(code);
        let tree = d.tree().unwrap();
        let mut traverser = ParseTreeTraverser::new(tree);
        traverser.seek_byte(code.find("$x").unwrap());

        let method = traverser
            .ancestor(|n| n.kind() == "method_declaration")
            .expect("method ancestor");
        assert_eq!(method.kind(), "method_declaration");
        assert!(traverser.ancestor(|n| n.kind() == "foreach_statement").is_none());
    }

    #[test]
    fn test_token_before_at_boundary() {
        let code = "<?php\n$obj->bar\n";
        let d = doc(code);
        let tree = d.tree().unwrap();
        let traverser = ParseTreeTraverser::new(tree);

        // Cursor right after "bar": the preceding token is "bar" itself.
        let end = code.find("bar").unwrap() + 3;
        let tok = traverser.token_before(end).expect("token");
        assert_eq!(node_text(tok, code), "bar");

        // Cursor right after "->": the preceding token is the arrow.
        let arrow_end = code.find("->").unwrap() + 2;
        let tok = traverser.token_before(arrow_end).expect("token");
        assert_eq!(node_text(tok, code), "->");
    }

    #[test]
    fn test_walk_pre_and_post_order() {
        struct Counter {
            pre: usize,
            post: usize,
        }
        impl TreeVisitor for Counter {
            fn preorder(&mut self, _node: Node, _source: &str) -> bool {
                self.pre += 1;
                true
            }
            fn postorder(&mut self, _node: Node, _source: &str) {
                self.post += 1;
            }
        }

        let code = "<?php\n$a = 1;\n";
        let d = doc(code);
        let tree = d.tree().unwrap();
        let mut counter = Counter { pre: 0, post: 0 };
        assert!(walk(tree.root_node(), code, &mut counter, None));
        assert_eq!(counter.pre, counter.post);
        assert!(counter.pre > 3);
    }

    #[test]
    fn test_walk_cancellation() {
        struct Noop;
        impl TreeVisitor for Noop {
            fn preorder(&mut self, _node: Node, _source: &str) -> bool {
                true
            }
        }

        let code = "<?php\n$a = 1;\n";
        let d = doc(code);
        let tree = d.tree().unwrap();
        let token = CancellationToken::new();
        token.cancel();
        assert!(!walk(tree.root_node(), code, &mut Noop, Some(&token)));
    }
}
