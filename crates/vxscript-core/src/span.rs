//! Source location tracking for diagnostics.

use std::fmt;

/// A location in a source unit: 1-based line and column plus a byte length.
///
/// Columns count bytes, not characters, which is what the tokenizer sees.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Line number (1-indexed).
    pub line: u32,
    /// Column number (1-indexed, byte-based).
    pub col: u32,
    /// Length in bytes.
    pub len: u32,
}

impl Span {
    #[inline]
    pub fn new(line: u32, col: u32, len: u32) -> Self {
        Self { line, col, len }
    }

    /// Zero-length span at a position.
    #[inline]
    pub fn point(line: u32, col: u32) -> Self {
        Self { line, col, len: 0 }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.len
    }

    /// Span starting at `self` and covering `other` when both sit on one line.
    ///
    /// Spans on different lines keep the start of `self`; the length then only
    /// approximates the covered text, which is all diagnostics need.
    pub fn merge(self, other: Span) -> Span {
        if self.line == other.line {
            let start = self.col.min(other.col);
            let end = (self.col + self.len).max(other.col + other.len);
            Span::new(self.line, start, end - start)
        } else {
            Span::new(self.line, self.col, self.len + other.len)
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_basics() {
        let span = Span::new(1, 5, 10);
        assert_eq!(span.len(), 10);
        assert!(!span.is_empty());
        assert!(Span::point(1, 5).is_empty());
    }

    #[test]
    fn span_display() {
        assert_eq!(format!("{}", Span::new(3, 15, 5)), "3:15");
        assert_eq!(format!("{:?}", Span::new(7, 2, 1)), "7:2");
    }

    #[test]
    fn merge_same_line() {
        let merged = Span::new(1, 5, 3).merge(Span::new(1, 10, 3));
        assert_eq!(merged, Span::new(1, 5, 8));
    }

    #[test]
    fn merge_across_lines_keeps_start() {
        let merged = Span::new(2, 4, 3).merge(Span::new(5, 1, 2));
        assert_eq!(merged.line, 2);
        assert_eq!(merged.col, 4);
        assert_eq!(merged.len, 5);
    }
}
