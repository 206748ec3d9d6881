//! Byte offset to UTF-16 position mapping.
//!
//! tree-sitter reports byte offsets and byte columns; the editor protocol
//! speaks zero-based lines with UTF-16 code-unit characters. The index
//! caches line start offsets and converts in both directions.

use php_analyzer_types::{Position, Range};

#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        let bytes = text.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'\n' {
                line_starts.push(i + 1);
            } else if bytes[i] == b'\r' {
                if i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
                    line_starts.push(i + 2);
                    i += 1;
                } else {
                    line_starts.push(i + 1);
                }
            }
            i += 1;
        }
        LineIndex { line_starts }
    }

    /// Convert a byte offset into a UTF-16 position. Offsets past the end
    /// of `text` clamp to the final position.
    pub fn position_of(&self, text: &str, offset: usize) -> Position {
        let offset = offset.min(text.len());
        let line = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let line_start = self.line_starts[line];
        let character: usize = text[line_start..offset]
            .chars()
            .map(|c| c.len_utf16())
            .sum();
        Position::new(line as u32, character as u32)
    }

    /// Convert a UTF-16 position into a byte offset, clamping past-the-end
    /// characters to the end of the line.
    pub fn offset_of(&self, text: &str, pos: Position) -> usize {
        let line = pos.line as usize;
        if line >= self.line_starts.len() {
            return text.len();
        }
        let line_start = self.line_starts[line];
        let line_end = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(text.len());
        let line_text = &text[line_start..line_end];

        let mut units = 0usize;
        let mut bytes = 0usize;
        for ch in line_text.chars() {
            if units >= pos.character as usize || ch == '\n' || ch == '\r' {
                break;
            }
            units += ch.len_utf16();
            bytes += ch.len_utf8();
        }
        line_start + bytes
    }

    /// Range covering `[start_byte, end_byte)`.
    pub fn range_of(&self, text: &str, start_byte: usize, end_byte: usize) -> Range {
        Range::new(
            self.position_of(text, start_byte),
            self.position_of(text, end_byte),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_round_trip() {
        let text = "<?php\n$a = 1;\n";
        let index = LineIndex::new(text);
        let pos = index.position_of(text, 6);
        assert_eq!(pos, Position::new(1, 0));
        assert_eq!(index.offset_of(text, pos), 6);
    }

    #[test]
    fn test_utf16_wide_characters() {
        // '€' is 3 bytes in UTF-8 and 1 UTF-16 unit; '𝔘' is 4 bytes and 2 units.
        let text = "€𝔘x\n";
        let index = LineIndex::new(text);
        assert_eq!(index.position_of(text, 3), Position::new(0, 1));
        assert_eq!(index.position_of(text, 7), Position::new(0, 3));
        assert_eq!(index.offset_of(text, Position::new(0, 3)), 7);
    }

    #[test]
    fn test_offset_clamps_to_line_end() {
        let text = "ab\ncd\n";
        let index = LineIndex::new(text);
        assert_eq!(index.offset_of(text, Position::new(0, 99)), 2);
        assert_eq!(index.offset_of(text, Position::new(9, 0)), text.len());
    }

    #[test]
    fn test_crlf_lines() {
        let text = "a\r\nb\r\n";
        let index = LineIndex::new(text);
        assert_eq!(index.position_of(text, 3), Position::new(1, 0));
        assert_eq!(index.offset_of(text, Position::new(1, 1)), 4);
    }
}
