/// Character cursor over a source unit.
///
/// Tracks the byte offset, the 1-based line and the 1-based byte column of
/// the next character.
pub struct Cursor<'src> {
    source: &'src str,
    rest: &'src str,
    offset: u32,
    line: u32,
    column: u32,
}

impl<'src> Cursor<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            rest: source,
            offset: 0,
            line: 1,
            column: 1,
        }
    }

    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    #[inline]
    pub fn line(&self) -> u32 {
        self.line
    }

    #[inline]
    pub fn column(&self) -> u32 {
        self.column
    }

    #[inline]
    pub fn is_eof(&self) -> bool {
        self.rest.is_empty()
    }

    /// Next character without consuming it.
    #[inline]
    pub fn peek(&self) -> Option<char> {
        let first = *self.rest.as_bytes().first()?;
        if first.is_ascii() {
            Some(first as char)
        } else {
            self.rest.chars().next()
        }
    }

    /// Character `n` positions ahead (0 = next).
    #[inline]
    pub fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest.chars().nth(n)
    }

    #[inline]
    pub fn check(&self, f: impl Fn(char) -> bool) -> bool {
        self.peek().is_some_and(f)
    }

    #[inline]
    pub fn check_str(&self, s: &str) -> bool {
        self.rest.starts_with(s)
    }

    /// Consume one character, updating line and column.
    pub fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        let len = ch.len_utf8();
        self.rest = &self.rest[len..];
        self.offset += len as u32;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += len as u32;
        }
        Some(ch)
    }

    /// Consume `n` bytes; `n` must land on a character boundary.
    pub fn advance_bytes(&mut self, n: usize) {
        debug_assert!(self.rest.is_char_boundary(n));
        let end = self.offset as usize + n;
        while (self.offset as usize) < end && self.advance().is_some() {}
    }

    #[inline]
    pub fn eat(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume characters while `f` holds and return them.
    pub fn eat_while(&mut self, f: impl Fn(char) -> bool) -> &'src str {
        let start = self.offset;
        while self.check(&f) {
            self.advance();
        }
        self.slice_from(start)
    }

    #[inline]
    pub fn slice_from(&self, start: u32) -> &'src str {
        &self.source[start as usize..self.offset as usize]
    }
}

#[inline]
pub fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

#[inline]
pub fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_lines_and_columns() {
        let mut cursor = Cursor::new("ab\ncd");
        cursor.advance();
        cursor.advance();
        assert_eq!((cursor.line(), cursor.column()), (1, 3));
        cursor.advance();
        assert_eq!((cursor.line(), cursor.column()), (2, 1));
        assert_eq!(cursor.offset(), 3);
    }

    #[test]
    fn eat_and_eat_while() {
        let mut cursor = Cursor::new("aaab");
        assert_eq!(cursor.eat_while(|c| c == 'a'), "aaa");
        assert!(!cursor.eat('a'));
        assert!(cursor.eat('b'));
        assert!(cursor.is_eof());
    }

    #[test]
    fn multibyte_columns_count_bytes() {
        let mut cursor = Cursor::new("é!");
        cursor.advance();
        assert_eq!(cursor.offset(), 2);
        assert_eq!(cursor.column(), 3);
        assert_eq!(cursor.peek(), Some('!'));
    }

    #[test]
    fn advance_bytes_over_newline() {
        let mut cursor = Cursor::new("\"\"\"\nx");
        cursor.advance_bytes(4);
        assert_eq!(cursor.line(), 2);
        assert_eq!(cursor.peek(), Some('x'));
    }

    #[test]
    fn lookahead() {
        let cursor = Cursor::new("0x1F");
        assert_eq!(cursor.peek_nth(1), Some('x'));
        assert!(cursor.check_str("0x"));
        assert!(cursor.check(|c| c.is_ascii_digit()));
    }
}
