//! Error types for the tokenizer, parser and host registration.
//!
//! Semantic errors found while building a module are not Rust errors: they
//! are collected in the [`Diagnostics`](crate::Diagnostics) stream so that
//! one build reports as many problems as possible. The types here cover the
//! phases that produce a value or fail:
//!
//! ```text
//! LexError           - tokenization
//! ParseError(s)      - syntax, with ParseErrorKind
//! RegistrationError  - host declarations rejected by the registry
//! ```

use thiserror::Error;

use crate::Span;

// ============================================================================
// Lexer Errors
// ============================================================================

/// Errors that occur during tokenization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}' at {span}")]
    UnexpectedChar { ch: char, span: Span },

    #[error("unterminated string at {span}")]
    UnterminatedString { span: Span },

    #[error("unterminated heredoc at {span}")]
    UnterminatedHeredoc { span: Span },

    #[error("unterminated comment at {span}")]
    UnterminatedComment { span: Span },

    #[error("invalid number at {span}: {detail}")]
    InvalidNumber { span: Span, detail: String },

    #[error("invalid escape sequence at {span}")]
    InvalidEscape { span: Span },
}

impl LexError {
    pub fn span(&self) -> Span {
        match self {
            LexError::UnexpectedChar { span, .. }
            | LexError::UnterminatedString { span }
            | LexError::UnterminatedHeredoc { span }
            | LexError::UnterminatedComment { span }
            | LexError::InvalidNumber { span, .. }
            | LexError::InvalidEscape { span } => *span,
        }
    }
}

// ============================================================================
// Parse Errors
// ============================================================================

/// Categories of syntax errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    // Token-level errors
    ExpectedToken,
    UnexpectedToken,
    UnexpectedEof,

    // Expression errors
    ExpectedExpression,
    ExpectedOperator,

    // Type errors
    ExpectedType,

    // Statement and declaration errors
    ExpectedStatement,
    ExpectedIdentifier,
    ExpectedConstant,

    // Literal errors
    InvalidLiteral,
    InvalidEscapeSequence,
}

impl ParseErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseErrorKind::ExpectedToken => "expected token",
            ParseErrorKind::UnexpectedToken => "unexpected token",
            ParseErrorKind::UnexpectedEof => "unexpected end of file",
            ParseErrorKind::ExpectedExpression => "expected expression",
            ParseErrorKind::ExpectedOperator => "expected operator",
            ParseErrorKind::ExpectedType => "expected type",
            ParseErrorKind::ExpectedStatement => "expected statement",
            ParseErrorKind::ExpectedIdentifier => "expected identifier",
            ParseErrorKind::ExpectedConstant => "expected constant",
            ParseErrorKind::InvalidLiteral => "invalid literal",
            ParseErrorKind::InvalidEscapeSequence => "invalid escape sequence",
        }
    }
}

impl std::fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A syntax error with location and context.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} at {span}: {message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    /// Message reported to the diagnostics stream.
    pub message: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    /// `Expected '<expected>'` / `Expected '<expected>', found '<found>'`.
    pub fn expected_token(span: Span, expected: &str, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedToken,
            span,
            format!("Expected '{expected}', found '{found}'"),
        )
    }

    pub fn unexpected_token(span: Span, token: &str) -> Self {
        Self::new(ParseErrorKind::UnexpectedToken, span, format!("Unexpected token '{token}'"))
    }

    pub fn unexpected_eof(span: Span) -> Self {
        Self::new(ParseErrorKind::UnexpectedEof, span, "Unexpected end of file")
    }

    pub fn expected_identifier(span: Span, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedIdentifier,
            span,
            format!("Expected identifier, found '{found}'"),
        )
    }

    pub fn expected_expression(span: Span, found: &str) -> Self {
        Self::new(
            ParseErrorKind::ExpectedExpression,
            span,
            format!("Expected expression value, found '{found}'"),
        )
    }

    pub fn expected_type(span: Span, found: &str) -> Self {
        Self::new(ParseErrorKind::ExpectedType, span, format!("Expected data type, found '{found}'"))
    }

    /// Render with the offending source line and a caret under the span.
    pub fn display_with_source(&self, source: &str) -> String {
        let mut output = format!("Error at {}:{}: {}\n", self.span.line, self.span.col, self.message);
        if let Some(line_text) = source.lines().nth((self.span.line as usize).saturating_sub(1)) {
            output.push_str("  |\n");
            output.push_str(&format!("{:>3} | {}\n", self.span.line, line_text));
            let indent = " ".repeat((self.span.col as usize).saturating_sub(1));
            let pointer = "^".to_string() + &"~".repeat((self.span.len as usize).saturating_sub(1));
            output.push_str(&format!("  | {indent}{pointer}\n"));
        }
        output
    }
}

/// Syntax errors accumulated over one source unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseErrors {
    errors: Vec<ParseError>,
}

impl ParseErrors {
    pub fn new() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn push(&mut self, error: ParseError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParseError> {
        self.errors.iter()
    }

    pub fn into_vec(self) -> Vec<ParseError> {
        self.errors
    }
}

impl IntoIterator for ParseErrors {
    type Item = ParseError;
    type IntoIter = std::vec::IntoIter<ParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ParseErrors {
    type Item = &'a ParseError;
    type IntoIter = std::slice::Iter<'a, ParseError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl From<ParseError> for ParseErrors {
    fn from(error: ParseError) -> Self {
        Self { errors: vec![error] }
    }
}

impl From<LexError> for ParseError {
    fn from(error: LexError) -> Self {
        let kind = match error {
            LexError::InvalidNumber { .. } => ParseErrorKind::InvalidLiteral,
            LexError::InvalidEscape { .. } => ParseErrorKind::InvalidEscapeSequence,
            LexError::UnterminatedComment { .. } => ParseErrorKind::UnexpectedEof,
            _ => ParseErrorKind::UnexpectedToken,
        };
        let span = error.span();
        ParseError::new(kind, span, error.to_string())
    }
}

impl std::fmt::Display for ParseErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseErrors {}

// ============================================================================
// Registration Errors
// ============================================================================

/// A host declaration the registry refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    #[error("type not found: {0}")]
    TypeNotFound(String),

    #[error("duplicate type: {0}")]
    DuplicateType(String),

    #[error("duplicate property '{property}' on '{owner}'")]
    DuplicateProperty { owner: String, property: String },

    #[error("duplicate global property: {0}")]
    DuplicateGlobalProperty(String),

    #[error("unknown config group: {0}")]
    UnknownGroup(String),

    #[error("type '{type_name}': {behaviour} behaviour not allowed - {reason}")]
    ForbiddenBehaviour {
        type_name: String,
        behaviour: &'static str,
        reason: String,
    },

    #[error("string factory already registered")]
    DuplicateStringFactory,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_error_span() {
        let span = Span::new(3, 7, 1);
        assert_eq!(LexError::UnexpectedChar { ch: '$', span }.span(), span);
        assert_eq!(LexError::UnterminatedHeredoc { span }.span(), span);
    }

    #[test]
    fn lex_error_converts_to_parse_error() {
        let span = Span::new(1, 4, 3);
        let err: ParseError = LexError::InvalidNumber {
            span,
            detail: "no digits".into(),
        }
        .into();
        assert_eq!(err.kind, ParseErrorKind::InvalidLiteral);
        assert_eq!(err.span, span);
    }

    #[test]
    fn parse_errors_collection() {
        let mut errors = ParseErrors::new();
        assert!(errors.is_empty());
        errors.push(ParseError::unexpected_eof(Span::new(2, 1, 0)));
        errors.push(ParseError::expected_token(Span::new(2, 1, 1), ";", "}"));
        assert_eq!(errors.len(), 2);
        let text = errors.to_string();
        assert!(text.contains("Unexpected end of file"));
        assert!(text.contains("Expected ';', found '}'"));
    }

    #[test]
    fn display_with_source_points_at_span() {
        let err = ParseError::expected_identifier(Span::new(2, 5, 3), "int");
        let out = err.display_with_source("void f()\nint int x;\n");
        assert!(out.contains("  2 | int int x;"));
        assert!(out.contains("|     ^~~"));
    }

    #[test]
    fn registration_error_messages() {
        let err = RegistrationError::DuplicateProperty {
            owner: "Vec3".into(),
            property: "x".into(),
        };
        assert_eq!(err.to_string(), "duplicate property 'x' on 'Vec3'");
    }
}
