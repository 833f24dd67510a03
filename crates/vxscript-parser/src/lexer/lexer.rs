//! The tokenizer.
//!
//! [`Lexer`] turns source text into [`Token`]s by dispatching on the first
//! character. Whitespace and comments are produced as trivia tokens; the
//! parser filters them. Errors are recorded and scanning continues, so one
//! pass reports every unrecognized character.

use bumpalo::Bump;
use bumpalo::collections::Vec as BumpVec;
use vxscript_core::{LexError, Span};

use super::cursor::{Cursor, is_ident_continue, is_ident_start};
use super::token::{Token, TokenKind, lookup_keyword};

pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    errors: Vec<LexError>,
}

/// Every token of a source unit, stored in a transient arena.
pub struct TokenBuffer<'bump, 'src> {
    pub tokens: BumpVec<'bump, Token<'src>>,
    pub errors: Vec<LexError>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            errors: Vec::new(),
        }
    }

    /// Tokenize the whole unit into `arena`. The buffer always ends with `Eof`.
    pub fn tokenize_in<'bump>(mut self, arena: &'bump Bump) -> TokenBuffer<'bump, 'src> {
        let mut tokens = BumpVec::new_in(arena);
        loop {
            let token = self.next_token();
            tokens.push(token);
            if token.kind == TokenKind::Eof {
                break;
            }
        }
        TokenBuffer {
            tokens,
            errors: self.errors,
        }
    }

    /// Scan the next token, trivia included.
    pub fn next_token(&mut self) -> Token<'src> {
        let start_line = self.cursor.line();
        let start_col = self.cursor.column();
        let start = self.cursor.offset();

        let Some(c) = self.cursor.peek() else {
            return Token::new(TokenKind::Eof, "", start, Span::point(start_line, start_col));
        };

        let kind = match c {
            c if c.is_whitespace() || c == '\u{FEFF}' => {
                self.cursor.eat_while(|c| c.is_whitespace() || c == '\u{FEFF}');
                TokenKind::Whitespace
            }
            '/' => self.scan_slash(start_line, start_col, start),
            '"' => self.scan_string(start_line, start_col, start),
            '\'' => self.scan_char(start_line, start_col, start),
            c if c.is_ascii_digit() => self.scan_number(start_line, start_col, start),
            '.' if self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.scan_number(start_line, start_col, start)
            }
            c if is_ident_start(c) => {
                let word = self.cursor.eat_while(is_ident_continue);
                lookup_keyword(word).unwrap_or(TokenKind::Identifier)
            }
            _ => self.scan_operator(start_line, start_col, start),
        };

        let lexeme = self.cursor.slice_from(start);
        Token::new(kind, lexeme, start, Span::new(start_line, start_col, lexeme.len() as u32))
    }

    fn span_from(&self, line: u32, col: u32, start: u32) -> Span {
        Span::new(line, col, self.cursor.offset() - start)
    }

    // =========================================
    // Comments and slash
    // =========================================

    fn scan_slash(&mut self, line: u32, col: u32, start: u32) -> TokenKind {
        self.cursor.advance();
        match self.cursor.peek() {
            Some('/') => {
                self.cursor.eat_while(|c| c != '\n');
                TokenKind::LineComment
            }
            Some('*') => {
                self.cursor.advance();
                loop {
                    if self.cursor.is_eof() {
                        let span = self.span_from(line, col, start);
                        self.errors.push(LexError::UnterminatedComment { span });
                        return TokenKind::Error;
                    }
                    if self.cursor.check_str("*/") {
                        self.cursor.advance_bytes(2);
                        return TokenKind::BlockComment;
                    }
                    self.cursor.advance();
                }
            }
            Some('=') => {
                self.cursor.advance();
                TokenKind::SlashEqual
            }
            _ => TokenKind::Slash,
        }
    }

    // =========================================
    // Strings
    // =========================================

    fn scan_string(&mut self, line: u32, col: u32, start: u32) -> TokenKind {
        if self.cursor.check_str("\"\"\"") {
            self.cursor.advance_bytes(3);
            loop {
                if self.cursor.is_eof() {
                    let span = self.span_from(line, col, start);
                    self.errors.push(LexError::UnterminatedHeredoc { span });
                    return TokenKind::Error;
                }
                if self.cursor.check_str("\"\"\"") {
                    self.cursor.advance_bytes(3);
                    return TokenKind::HeredocLiteral;
                }
                self.cursor.advance();
            }
        }

        self.cursor.advance();
        if self.scan_quoted('"', line, col, start) {
            TokenKind::StringLiteral
        } else {
            TokenKind::Error
        }
    }

    /// `'a'` is a character constant with the value of its code.
    fn scan_char(&mut self, line: u32, col: u32, start: u32) -> TokenKind {
        self.cursor.advance();
        if self.scan_quoted('\'', line, col, start) {
            TokenKind::IntLiteral
        } else {
            TokenKind::Error
        }
    }

    /// Scan up to and including the closing `quote`. Strings do not span lines.
    fn scan_quoted(&mut self, quote: char, line: u32, col: u32, start: u32) -> bool {
        loop {
            match self.cursor.peek() {
                None | Some('\n') => {
                    let span = self.span_from(line, col, start);
                    self.errors.push(LexError::UnterminatedString { span });
                    return false;
                }
                Some('\\') => {
                    let esc_line = self.cursor.line();
                    let esc_col = self.cursor.column();
                    self.cursor.advance();
                    match self.cursor.peek() {
                        Some('"' | '\'' | 'n' | 'r' | '0' | '\\' | 'x' | 'X') => {
                            self.cursor.advance();
                        }
                        Some('\n') | None => {}
                        Some(_) => {
                            self.cursor.advance();
                            self.errors.push(LexError::InvalidEscape {
                                span: Span::new(esc_line, esc_col, 2),
                            });
                        }
                    }
                }
                Some(c) if c == quote => {
                    self.cursor.advance();
                    return true;
                }
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }
    }

    // =========================================
    // Numbers
    // =========================================

    fn scan_number(&mut self, line: u32, col: u32, start: u32) -> TokenKind {
        if self.cursor.peek() == Some('0') && matches!(self.cursor.peek_nth(1), Some('x' | 'X')) {
            self.cursor.advance_bytes(2);
            let digits = self.cursor.eat_while(|c| c.is_ascii_hexdigit());
            if digits.is_empty() {
                self.errors.push(LexError::InvalidNumber {
                    span: self.span_from(line, col, start),
                    detail: "expected hexadecimal digits after '0x'".to_string(),
                });
                return TokenKind::Error;
            }
            return TokenKind::BitsLiteral;
        }

        self.cursor.eat_while(|c| c.is_ascii_digit());
        let mut is_real = false;

        if self.cursor.peek() == Some('.') && self.cursor.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.cursor.advance();
            self.cursor.eat_while(|c| c.is_ascii_digit());
            is_real = true;
        }

        if let Some('e' | 'E') = self.cursor.peek() {
            let signed = matches!(self.cursor.peek_nth(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.cursor.peek_nth(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                self.cursor.advance();
                if signed {
                    self.cursor.advance();
                }
                self.cursor.eat_while(|c| c.is_ascii_digit());
                is_real = true;
            }
        }

        if let Some('f' | 'F') = self.cursor.peek() {
            self.cursor.advance();
            return TokenKind::FloatLiteral;
        }

        if is_real {
            TokenKind::DoubleLiteral
        } else {
            TokenKind::IntLiteral
        }
    }

    // =========================================
    // Operators
    // =========================================

    /// Consume the second character of a two-character operator.
    fn take(&mut self, kind: TokenKind) -> TokenKind {
        self.cursor.advance();
        kind
    }

    fn scan_operator(&mut self, line: u32, col: u32, start: u32) -> TokenKind {
        let Some(c) = self.cursor.advance() else {
            return TokenKind::Eof;
        };
        let next = self.cursor.peek();

        match (c, next) {
            ('(', _) => TokenKind::LeftParen,
            (')', _) => TokenKind::RightParen,
            ('[', _) => TokenKind::LeftBracket,
            (']', _) => TokenKind::RightBracket,
            ('{', _) => TokenKind::LeftBrace,
            ('}', _) => TokenKind::RightBrace,
            (';', _) => TokenKind::Semicolon,
            (',', _) => TokenKind::Comma,
            ('~', _) => TokenKind::Tilde,
            ('?', _) => TokenKind::Question,
            (':', _) => TokenKind::Colon,
            ('@', _) => TokenKind::At,
            ('.', _) => TokenKind::Dot,

            ('+', Some('+')) => self.take(TokenKind::PlusPlus),
            ('+', Some('=')) => self.take(TokenKind::PlusEqual),
            ('+', _) => TokenKind::Plus,

            ('-', Some('-')) => self.take(TokenKind::MinusMinus),
            ('-', Some('=')) => self.take(TokenKind::MinusEqual),
            ('-', _) => TokenKind::Minus,

            ('*', Some('=')) => self.take(TokenKind::StarEqual),
            ('*', _) => TokenKind::Star,

            ('%', Some('=')) => self.take(TokenKind::PercentEqual),
            ('%', _) => TokenKind::Percent,

            ('=', Some('=')) => self.take(TokenKind::EqualEqual),
            ('=', _) => TokenKind::Equal,

            ('!', Some('=')) => self.take(TokenKind::BangEqual),
            ('!', _) => TokenKind::Bang,

            ('<', Some('=')) => self.take(TokenKind::LessEqual),
            ('<', Some('<')) => {
                self.cursor.advance();
                if self.cursor.eat('=') {
                    TokenKind::LessLessEqual
                } else {
                    TokenKind::LessLess
                }
            }
            ('<', _) => TokenKind::Less,

            ('>', Some('=')) => self.take(TokenKind::GreaterEqual),
            ('>', Some('>')) => {
                self.cursor.advance();
                if self.cursor.eat('>') {
                    if self.cursor.eat('=') {
                        TokenKind::GreaterGreaterGreaterEqual
                    } else {
                        TokenKind::GreaterGreaterGreater
                    }
                } else if self.cursor.eat('=') {
                    TokenKind::GreaterGreaterEqual
                } else {
                    TokenKind::GreaterGreater
                }
            }
            ('>', _) => TokenKind::Greater,

            ('&', Some('=')) => self.take(TokenKind::AmpEqual),
            ('&', Some('&')) => self.take(TokenKind::AmpAmp),
            ('&', _) => TokenKind::Amp,

            ('|', Some('=')) => self.take(TokenKind::PipeEqual),
            ('|', Some('|')) => self.take(TokenKind::PipePipe),
            ('|', _) => TokenKind::Pipe,

            ('^', Some('=')) => self.take(TokenKind::CaretEqual),
            ('^', Some('^')) => self.take(TokenKind::CaretCaret),
            ('^', _) => TokenKind::Caret,

            _ => {
                let span = self.span_from(line, col, start);
                self.errors.push(LexError::UnexpectedChar { ch: c, span });
                TokenKind::Error
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(source: &str) -> Vec<(TokenKind, String)> {
        let arena = Bump::new();
        let buffer = Lexer::new(source).tokenize_in(&arena);
        buffer
            .tokens
            .iter()
            .filter(|t| !t.kind.is_trivia() && t.kind != TokenKind::Eof)
            .map(|t| (t.kind, t.lexeme.to_string()))
            .collect()
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokens(source).into_iter().map(|(k, _)| k).collect()
    }

    #[test]
    fn empty_source_is_eof() {
        let mut lexer = Lexer::new("");
        assert_eq!(lexer.next_token().kind, TokenKind::Eof);
    }

    #[test]
    fn trivia_is_tokenized() {
        let arena = Bump::new();
        let buffer = Lexer::new("a // c\n/* b */ b").tokenize_in(&arena);
        let all: Vec<_> = buffer.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            all,
            vec![
                TokenKind::Identifier,
                TokenKind::Whitespace,
                TokenKind::LineComment,
                TokenKind::Whitespace,
                TokenKind::BlockComment,
                TokenKind::Whitespace,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("struct Foo bits8 from importer"),
            vec![
                TokenKind::Struct,
                TokenKind::Identifier,
                TokenKind::Bits8,
                TokenKind::Identifier,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn number_literals() {
        assert_eq!(
            tokens("42 0x1F 1.5 1.5f 2e3 .5"),
            vec![
                (TokenKind::IntLiteral, "42".into()),
                (TokenKind::BitsLiteral, "0x1F".into()),
                (TokenKind::DoubleLiteral, "1.5".into()),
                (TokenKind::FloatLiteral, "1.5f".into()),
                (TokenKind::DoubleLiteral, "2e3".into()),
                (TokenKind::DoubleLiteral, ".5".into()),
            ]
        );
    }

    #[test]
    fn member_access_on_integer_is_not_a_real() {
        assert_eq!(
            kinds("1.x"),
            vec![TokenKind::IntLiteral, TokenKind::Dot, TokenKind::Identifier]
        );
    }

    #[test]
    fn strings_and_chars() {
        assert_eq!(
            tokens(r#""a\"b" 'c' """x
y""""#),
            vec![
                (TokenKind::StringLiteral, r#""a\"b""#.into()),
                (TokenKind::IntLiteral, "'c'".into()),
                (TokenKind::HeredocLiteral, "\"\"\"x\ny\"\"\"".into()),
            ]
        );
    }

    #[test]
    fn shift_operators() {
        assert_eq!(
            kinds(">> >>> >>= >>>= << <<="),
            vec![
                TokenKind::GreaterGreater,
                TokenKind::GreaterGreaterGreater,
                TokenKind::GreaterGreaterEqual,
                TokenKind::GreaterGreaterGreaterEqual,
                TokenKind::LessLess,
                TokenKind::LessLessEqual,
            ]
        );
    }

    #[test]
    fn logical_operators() {
        assert_eq!(
            kinds("&& || ^^ ! != @"),
            vec![
                TokenKind::AmpAmp,
                TokenKind::PipePipe,
                TokenKind::CaretCaret,
                TokenKind::Bang,
                TokenKind::BangEqual,
                TokenKind::At,
            ]
        );
    }

    #[test]
    fn spans_track_lines() {
        let arena = Bump::new();
        let buffer = Lexer::new("int\n  x;").tokenize_in(&arena);
        let x = buffer.tokens.iter().find(|t| t.lexeme == "x").unwrap();
        assert_eq!(x.span, Span::new(2, 3, 1));
        assert_eq!(x.offset, 6);
    }

    #[test]
    fn unexpected_character_is_recorded() {
        let arena = Bump::new();
        let buffer = Lexer::new("a $ b").tokenize_in(&arena);
        assert_eq!(buffer.errors.len(), 1);
        assert!(matches!(buffer.errors[0], LexError::UnexpectedChar { ch: '$', .. }));
        assert!(buffer.tokens.iter().any(|t| t.kind == TokenKind::Error));
    }

    #[test]
    fn unterminated_constructs() {
        let arena = Bump::new();
        let buffer = Lexer::new("\"abc\nx").tokenize_in(&arena);
        assert!(matches!(buffer.errors[0], LexError::UnterminatedString { .. }));

        let buffer = Lexer::new("/* open").tokenize_in(&arena);
        assert!(matches!(buffer.errors[0], LexError::UnterminatedComment { .. }));

        let buffer = Lexer::new("\"\"\" open").tokenize_in(&arena);
        assert!(matches!(buffer.errors[0], LexError::UnterminatedHeredoc { .. }));
    }

    #[test]
    fn invalid_escape_is_recorded_but_string_continues() {
        let arena = Bump::new();
        let buffer = Lexer::new(r#""a\qb""#).tokenize_in(&arena);
        assert_eq!(buffer.errors.len(), 1);
        assert!(matches!(buffer.errors[0], LexError::InvalidEscape { .. }));
        assert_eq!(buffer.tokens[0].kind, TokenKind::StringLiteral);
    }

    #[test]
    fn bad_hex_literal() {
        let arena = Bump::new();
        let buffer = Lexer::new("0xZ").tokenize_in(&arena);
        assert!(matches!(buffer.errors[0], LexError::InvalidNumber { .. }));
    }
}
