//! Position primitives.
//!
//! Zero-based `(line, character)` pairs with UTF-16 code-unit characters,
//! matching the editor protocol. Ranges are half-open on the end.

use serde::{Deserialize, Serialize};

/// A zero-based position in a document. `character` counts UTF-16 code units.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Position { line, character }
    }
}

/// A half-open range `[start, end)` in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Range { start, end }
    }

    /// True if `pos` lies inside the range. The end position is excluded.
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos < self.end
    }

    /// True if `pos` lies inside the range or sits exactly on its end.
    ///
    /// Queries at a cursor resting just after the last character of a token
    /// still belong to that token.
    pub fn contains_inclusive(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }

    /// True if `other` is fully contained in `self`.
    pub fn contains_range(&self, other: &Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A range inside a named document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub uri: String,
    pub range: Range,
}

impl Location {
    pub fn new(uri: impl Into<String>, range: Range) -> Self {
        Location {
            uri: uri.into(),
            range,
        }
    }
}

impl From<Position> for lsp_types::Position {
    fn from(pos: Position) -> Self {
        lsp_types::Position {
            line: pos.line,
            character: pos.character,
        }
    }
}

impl From<lsp_types::Position> for Position {
    fn from(pos: lsp_types::Position) -> Self {
        Position {
            line: pos.line,
            character: pos.character,
        }
    }
}

impl From<Range> for lsp_types::Range {
    fn from(range: Range) -> Self {
        lsp_types::Range {
            start: range.start.into(),
            end: range.end.into(),
        }
    }
}

impl From<lsp_types::Range> for Range {
    fn from(range: lsp_types::Range) -> Self {
        Range {
            start: range.start.into(),
            end: range.end.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(sl: u32, sc: u32, el: u32, ec: u32) -> Range {
        Range::new(Position::new(sl, sc), Position::new(el, ec))
    }

    #[test]
    fn test_contains_is_half_open() {
        let r = range(1, 4, 1, 10);
        assert!(r.contains(Position::new(1, 4)));
        assert!(r.contains(Position::new(1, 9)));
        assert!(!r.contains(Position::new(1, 10)));
        assert!(r.contains_inclusive(Position::new(1, 10)));
    }

    #[test]
    fn test_contains_multiline() {
        let r = range(0, 0, 3, 0);
        assert!(r.contains(Position::new(1, 80)));
        assert!(!r.contains(Position::new(3, 1)));
    }

    #[test]
    fn test_contains_range() {
        let outer = range(0, 0, 10, 0);
        assert!(outer.contains_range(&range(2, 1, 4, 5)));
        assert!(outer.contains_range(&outer));
        assert!(!outer.contains_range(&range(2, 1, 10, 1)));
    }
}
