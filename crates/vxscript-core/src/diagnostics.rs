//! The message stream of a build.
//!
//! Every syntax error, semantic error, warning and informational message
//! produced while building a module is appended here in discovery order.
//! A module with at least one error must not be handed to the VM.

use std::collections::VecDeque;
use std::fmt;

/// A single message from the builder or compiler.
///
/// ```
/// use vxscript_core::{Diagnostic, DiagnosticKind};
///
/// let diagnostic = Diagnostic {
///     kind: DiagnosticKind::Error,
///     message: "No matching signatures to 'foo()'".to_string(),
///     section: Some("main.vxs".to_string()),
///     row: 10,
///     col: 5,
/// };
/// assert_eq!(diagnostic.to_string(), "main.vxs (10, 5) : Error : No matching signatures to 'foo()'");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    /// Name of the source unit, if the message has a location.
    pub section: Option<String>,
    /// 1-based line.
    pub row: u32,
    /// 1-based column.
    pub col: u32,
}

/// Severity of a [`Diagnostic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// The module must not be executed.
    Error,
    /// Advisory; code generation proceeds.
    Warning,
    /// Context for the messages that follow it, such as the function being compiled.
    Info,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DiagnosticKind::Error => "Error",
            DiagnosticKind::Warning => "Warning",
            DiagnosticKind::Info => "Info",
        })
    }
}

/// All messages of one build.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    diagnostics: VecDeque<Diagnostic>,
    has_errors: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) {
        if diagnostic.kind == DiagnosticKind::Error {
            self.has_errors = true;
        }
        self.diagnostics.push_back(diagnostic);
    }

    pub fn error(&mut self, section: &str, row: u32, col: u32, message: impl Into<String>) {
        self.push(DiagnosticKind::Error, section, row, col, message);
    }

    pub fn warning(&mut self, section: &str, row: u32, col: u32, message: impl Into<String>) {
        self.push(DiagnosticKind::Warning, section, row, col, message);
    }

    pub fn info(&mut self, section: &str, row: u32, col: u32, message: impl Into<String>) {
        self.push(DiagnosticKind::Info, section, row, col, message);
    }

    fn push(&mut self, kind: DiagnosticKind, section: &str, row: u32, col: u32, message: impl Into<String>) {
        self.add_diagnostic(Diagnostic {
            kind,
            message: message.into(),
            section: Some(section.to_string()),
            row,
            col,
        });
    }

    /// Append every message of `other`, keeping its order.
    pub fn extend(&mut self, other: Diagnostics) {
        for diagnostic in other.diagnostics {
            self.add_diagnostic(diagnostic);
        }
    }

    pub fn has_errors(&self) -> bool {
        self.has_errors
    }

    pub fn has_warnings(&self) -> bool {
        self.diagnostics.iter().any(|d| d.kind == DiagnosticKind::Warning)
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn clear(&mut self) {
        self.diagnostics.clear();
        self.has_errors = false;
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.kind == DiagnosticKind::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.kind == DiagnosticKind::Warning)
    }

    pub fn count(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn info_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == DiagnosticKind::Info).count()
    }

    pub fn emit<W: std::io::Write>(&self, writer: &mut W) -> std::io::Result<()> {
        for diagnostic in &self.diagnostics {
            writeln!(writer, "{diagnostic}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.section {
            Some(section) => write!(
                f,
                "{} ({}, {}) : {} : {}",
                section, self.row, self.col, self.kind, self.message
            ),
            None => write!(f, "{} : {}", self.kind, self.message),
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.diagnostics {
            writeln!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stream() {
        let diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());
        assert!(!diagnostics.has_errors());
        assert_eq!(diagnostics.count(), 0);
    }

    #[test]
    fn counts_by_kind() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.info("a", 1, 1, "Compiling void main()");
        diagnostics.warning("a", 2, 3, "Implicit conversion changed sign of value");
        diagnostics.error("a", 4, 1, "'x' is not declared");
        assert!(diagnostics.has_errors());
        assert!(diagnostics.has_warnings());
        assert_eq!(diagnostics.error_count(), 1);
        assert_eq!(diagnostics.warning_count(), 1);
        assert_eq!(diagnostics.info_count(), 1);
    }

    #[test]
    fn display_format() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.error("script", 3, 14, "Expected ';'");
        assert_eq!(diagnostics.to_string(), "script (3, 14) : Error : Expected ';'\n");

        let bare = Diagnostic {
            kind: DiagnosticKind::Warning,
            message: "no location".into(),
            section: None,
            row: 0,
            col: 0,
        };
        assert_eq!(bare.to_string(), "Warning : no location");
    }

    #[test]
    fn extend_keeps_order_and_error_flag() {
        let mut a = Diagnostics::new();
        a.warning("s", 1, 1, "first");
        let mut b = Diagnostics::new();
        b.error("s", 2, 1, "second");
        a.extend(b);
        let messages: Vec<_> = a.iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["first", "second"]);
        assert!(a.has_errors());
    }

    #[test]
    fn clear_resets() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.error("s", 1, 1, "boom");
        diagnostics.clear();
        assert!(diagnostics.is_empty());
        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn emit_writes_lines() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.info("s", 1, 1, "one");
        diagnostics.info("s", 2, 1, "two");
        let mut out = Vec::new();
        diagnostics.emit(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);
    }
}
