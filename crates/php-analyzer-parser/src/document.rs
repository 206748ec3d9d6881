//! One open document: rope-backed text plus an incrementally reparsed
//! tree-sitter tree.
//!
//! Edits are applied eagerly to the rope and to the old tree's edit
//! bookkeeping, but the reparse itself is deferred until [`Document::flush`]
//! so a burst of keystrokes costs one parse.

use php_analyzer_types::{Position, Range};
use ropey::Rope;
use tree_sitter::{InputEdit, Parser, Point, Tree};

/// Stable 64-bit FNV-1a content hash, used for cache validity.
pub fn content_hash(text: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for byte in text.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

pub struct Document {
    uri: String,
    version: i32,
    rope: Rope,
    parser: Parser,
    tree: Option<Tree>,
    dirty: bool,
}

impl Document {
    /// Create and fully parse a document.
    pub fn new(uri: impl Into<String>, text: &str, version: i32) -> Self {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_php::LANGUAGE_PHP.into())
            .expect("tree-sitter-php language mismatch");
        let tree = parser.parse(text.as_bytes(), None);

        Document {
            uri: uri.into(),
            version,
            rope: Rope::from_str(text),
            parser,
            tree,
            dirty: false,
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn hash(&self) -> u64 {
        content_hash(&self.text())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// The current tree. Stale while dirty; call [`Document::flush`] first.
    pub fn tree(&self) -> Option<&Tree> {
        self.tree.as_ref()
    }

    /// Apply one ordered content change. `range` of `None` replaces the
    /// whole document. The tree is edited but not reparsed.
    pub fn apply_change(&mut self, version: i32, range: Option<Range>, new_text: &str) {
        self.version = version;
        self.dirty = true;

        let range = match range {
            Some(range) => range,
            None => {
                self.rope = Rope::from_str(new_text);
                self.tree = None;
                return;
            }
        };

        let start_byte = self.offset_of(range.start);
        let old_end_byte = self.offset_of(range.end);

        let start_point = self.point_of_byte(start_byte);
        let old_end_point = self.point_of_byte(old_end_byte);

        let start_char = self.rope.byte_to_char(start_byte);
        let old_end_char = self.rope.byte_to_char(old_end_byte);
        self.rope.remove(start_char..old_end_char);
        self.rope.insert(start_char, new_text);

        let new_end_byte = start_byte + new_text.len();
        let new_end_point = self.point_of_byte(new_end_byte);

        if let Some(tree) = &mut self.tree {
            tree.edit(&InputEdit {
                start_byte,
                old_end_byte,
                new_end_byte,
                start_position: start_point,
                old_end_position: old_end_point,
                new_end_position: new_end_point,
            });
        }
    }

    /// Reparse if dirty. Returns true when a parse actually ran.
    pub fn flush(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        let source = self.rope.to_string();
        self.tree = self.parser.parse(source.as_bytes(), self.tree.as_ref());
        self.dirty = false;
        tracing::trace!(uri = %self.uri, version = self.version, "reparsed document");
        true
    }

    /// Byte offset of a UTF-16 position in the current rope.
    pub fn offset_of(&self, pos: Position) -> usize {
        let line = pos.line as usize;
        if line >= self.rope.len_lines() {
            return self.rope.len_bytes();
        }
        let line_slice = self.rope.line(line);
        let line_start = self.rope.line_to_byte(line);

        let mut units = 0usize;
        let mut bytes = 0usize;
        for ch in line_slice.chars() {
            if units >= pos.character as usize || ch == '\n' || ch == '\r' {
                break;
            }
            units += ch.len_utf16();
            bytes += ch.len_utf8();
        }
        line_start + bytes
    }

    /// tree-sitter point (row, byte column) for a byte offset.
    fn point_of_byte(&self, byte: usize) -> Point {
        let byte = byte.min(self.rope.len_bytes());
        let row = self.rope.byte_to_line(byte);
        let col = byte - self.rope.line_to_byte(row);
        Point::new(row, col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_on_open() {
        let doc = Document::new("file:///t.php", "<?php\nclass Foo {}\n", 1);
        let tree = doc.tree().expect("tree after open");
        assert_eq!(tree.root_node().kind(), "program");
        assert!(!tree.root_node().has_error());
        assert!(!doc.is_dirty());
    }

    #[test]
    fn test_edit_defers_parse_until_flush() {
        let mut doc = Document::new("file:///t.php", "<?php\nclass Foo {}\n", 1);
        doc.apply_change(
            2,
            Some(Range::new(Position::new(1, 6), Position::new(1, 9))),
            "Bar",
        );
        assert!(doc.is_dirty());
        assert!(doc.text().contains("class Bar {}"));

        assert!(doc.flush());
        assert!(!doc.is_dirty());
        assert!(!doc.tree().unwrap().root_node().has_error());
        // A second flush is a no-op.
        assert!(!doc.flush());
    }

    #[test]
    fn test_full_replace() {
        let mut doc = Document::new("file:///t.php", "<?php\n", 1);
        doc.apply_change(2, None, "<?php\nfunction f() {}\n");
        doc.flush();
        assert!(doc.text().contains("function f"));
        assert_eq!(doc.version(), 2);
    }

    #[test]
    fn test_parse_error_still_yields_tree() {
        let doc = Document::new("file:///t.php", "<?php\nfunction f( {\n", 1);
        let tree = doc.tree().expect("tree despite error");
        assert!(tree.root_node().has_error());
    }

    #[test]
    fn test_content_hash_stable_and_sensitive() {
        let a = content_hash("<?php class Foo {}");
        assert_eq!(a, content_hash("<?php class Foo {}"));
        assert_ne!(a, content_hash("<?php class Bar {}"));
    }

    #[test]
    fn test_utf16_offset_mapping() {
        let doc = Document::new("file:///t.php", "<?php\n$a = \"€\"; $b = 1;\n", 1);
        // '€' is one UTF-16 unit but three bytes; '$b' starts at character 11.
        let offset = doc.offset_of(Position::new(1, 11));
        assert_eq!(&doc.text()[offset..offset + 2], "$b");
    }
}
