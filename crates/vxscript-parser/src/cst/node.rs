//! CST node kinds and node records.

use std::fmt;
use vxscript_core::Span;

use crate::lexer::TokenKind;

/// Index of a node in its [`Cst`](super::Cst) arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of a CST node. Children layouts are listed per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// A freed slot, or a bare token (`const`, `[`, `&`, `in`, ...) inside a
    /// data type or type modifier.
    Undefined,
    /// Top-level declarations.
    Script,
    /// `Function` signature, then the module name `Constant`.
    Import,
    /// `Identifier`, then `DataType Identifier+` per member line.
    Struct,
    /// `DataType TypeMod Identifier ParameterList StatementBlock?`
    Function,
    /// `DataType (Identifier (InitList | Assignment | ArgList)?)+`
    GlobalVar,
    /// Token is the base type; children are `const`, the base token and the
    /// `[]`/`@` modifiers in source order.
    DataType,
    /// Empty, or `&` optionally followed by `in`/`out`/`inout`.
    TypeMod,
    Identifier,
    /// `(DataType TypeMod Identifier?)*`
    ParameterList,
    StatementBlock,
    /// Local variable declaration; same layout as `GlobalVar`.
    Declaration,
    /// `Assignment?`
    ExpressionStatement,
    /// `Assignment Statement Statement?`
    If,
    /// `(Declaration | ExpressionStatement) ExpressionStatement Assignment? Statement`
    For,
    /// `Assignment Statement`
    While,
    /// `Statement Assignment`
    DoWhile,
    /// `Assignment?`
    Return,
    Break,
    Continue,
    /// `Assignment Case*`
    Switch,
    /// Token is `case` or `default`; `Expression?` then statements.
    Case,
    /// `Condition (ExprOperator Assignment)?`
    Assignment,
    /// `Expression (Assignment Assignment)?`
    Condition,
    /// `ExprTerm (ExprOperator ExprTerm)*`
    Expression,
    /// `ExprPreOp* ExprValue ExprPostOp*`
    ExprTerm,
    ExprPreOp,
    /// `.` with `FunctionCall | Identifier`, `[` with `Assignment`, or `++`/`--`.
    ExprPostOp,
    ExprOperator,
    /// `Constant | Identifier | FunctionCall | Assignment`
    ExprValue,
    /// Token is the literal kind; string constants hold one child per
    /// adjacent literal.
    Constant,
    /// `DataType ArgList`: a call, a constructor call or a conversion.
    FunctionCall,
    /// `Assignment*`
    ArgList,
    /// `(Assignment | InitList | Undefined)*`; `Undefined` marks an empty slot.
    InitList,
}

/// One node of the tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Token the node was created from, if any.
    pub token: Option<TokenKind>,
    /// Byte range covered in the source unit.
    pub offset: u32,
    pub len: u32,
    /// Location of the first covered character.
    pub span: Span,
    pub(crate) parent: Option<NodeId>,
    pub(crate) first_child: Option<NodeId>,
    pub(crate) last_child: Option<NodeId>,
    pub(crate) prev: Option<NodeId>,
    pub(crate) next: Option<NodeId>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            token: None,
            offset: 0,
            len: 0,
            span: Span::default(),
            parent: None,
            first_child: None,
            last_child: None,
            prev: None,
            next: None,
        }
    }

    /// Widen the covered range to include `[offset, offset + len)`.
    pub(crate) fn update_source_pos(&mut self, offset: u32, len: u32, span: Span) {
        if self.span.line == 0 {
            self.offset = offset;
            self.len = len;
            self.span = span;
            return;
        }
        let end = (self.offset + self.len).max(offset + len);
        if offset < self.offset {
            self.offset = offset;
            self.span = span;
        }
        self.len = end - self.offset;
    }
}
