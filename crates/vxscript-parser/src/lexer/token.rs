//! Token vocabulary of the script language.

use std::fmt;
use vxscript_core::{Operator, PrimitiveKind, Span};

/// A token: its kind, source text and location.
#[derive(Clone, Copy, PartialEq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    pub lexeme: &'src str,
    /// Byte offset of the first character.
    pub offset: u32,
    pub span: Span,
}

impl<'src> Token<'src> {
    #[inline]
    pub fn new(kind: TokenKind, lexeme: &'src str, offset: u32, span: Span) -> Self {
        Self {
            kind,
            lexeme,
            offset,
            span,
        }
    }

    #[inline]
    pub fn len(&self) -> u32 {
        self.lexeme.len() as u32
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lexeme.is_empty()
    }
}

impl fmt::Debug for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?} @ {:?})", self.kind, self.lexeme, self.span)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // =========================================
    // Literals
    // =========================================
    /// `42`, `'a'`
    IntLiteral,
    /// `3.5f`
    FloatLiteral,
    /// `3.5`, `1e3`
    DoubleLiteral,
    /// `"text"`
    StringLiteral,
    /// `"""text"""`
    HeredocLiteral,
    /// `0xFF`
    BitsLiteral,

    Identifier,

    // =========================================
    // Keywords - Types
    // =========================================
    Void,
    Bool,
    Int8,
    Int16,
    Int,
    UInt8,
    UInt16,
    UInt,
    Bits8,
    Bits16,
    Bits,
    Float,
    Double,

    // =========================================
    // Keywords - Values
    // =========================================
    True,
    False,
    Null,

    // =========================================
    // Keywords - Control Flow
    // =========================================
    If,
    Else,
    For,
    While,
    Do,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Return,

    // =========================================
    // Keywords - Declarations
    // =========================================
    Const,
    Struct,
    Import,
    In,
    Out,
    InOut,

    // =========================================
    // Operators - Arithmetic
    // =========================================
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,

    // =========================================
    // Operators - Assignment
    // =========================================
    Equal,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    AmpEqual,
    PipeEqual,
    CaretEqual,
    LessLessEqual,
    GreaterGreaterEqual,
    GreaterGreaterGreaterEqual,

    // =========================================
    // Operators - Bitwise
    // =========================================
    Amp,
    Pipe,
    Caret,
    Tilde,
    LessLess,
    GreaterGreater,
    GreaterGreaterGreater,

    // =========================================
    // Operators - Comparison and logic
    // =========================================
    EqualEqual,
    BangEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    AmpAmp,
    PipePipe,
    CaretCaret,
    Bang,

    // =========================================
    // Punctuation
    // =========================================
    Question,
    Colon,
    Dot,
    At,
    Comma,
    Semicolon,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,

    // =========================================
    // Trivia and special
    // =========================================
    Whitespace,
    LineComment,
    BlockComment,
    /// Unrecognized input; the error is recorded by the lexer.
    Error,
    Eof,
}

impl TokenKind {
    pub fn is_keyword(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Void | Bool
                | Int8
                | Int16
                | Int
                | UInt8
                | UInt16
                | UInt
                | Bits8
                | Bits16
                | Bits
                | Float
                | Double
                | True
                | False
                | Null
                | If
                | Else
                | For
                | While
                | Do
                | Switch
                | Case
                | Default
                | Break
                | Continue
                | Return
                | Const
                | Struct
                | Import
                | In
                | Out
                | InOut
        )
    }

    /// Whitespace and comments, skipped by the parser.
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::LineComment | TokenKind::BlockComment)
    }

    /// Tokens that form a constant expression value.
    pub fn is_constant(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            IntLiteral | FloatLiteral | DoubleLiteral | StringLiteral | HeredocLiteral | BitsLiteral | True | False | Null
        )
    }

    pub fn is_string(self) -> bool {
        matches!(self, TokenKind::StringLiteral | TokenKind::HeredocLiteral)
    }

    /// Primitive type keyword, if this is one.
    pub fn primitive_kind(self) -> Option<PrimitiveKind> {
        use TokenKind::*;
        Some(match self {
            Void => PrimitiveKind::Void,
            Bool => PrimitiveKind::Bool,
            Int8 => PrimitiveKind::Int8,
            Int16 => PrimitiveKind::Int16,
            Int => PrimitiveKind::Int32,
            UInt8 => PrimitiveKind::UInt8,
            UInt16 => PrimitiveKind::UInt16,
            UInt => PrimitiveKind::UInt32,
            Bits8 => PrimitiveKind::Bits8,
            Bits16 => PrimitiveKind::Bits16,
            Bits => PrimitiveKind::Bits32,
            Float => PrimitiveKind::Float,
            Double => PrimitiveKind::Double,
            _ => return None,
        })
    }

    /// Binary operator allowed between expression terms.
    pub fn binary_operator(self) -> Option<Operator> {
        use TokenKind::*;
        Some(match self {
            Plus => Operator::Add,
            Minus => Operator::Sub,
            Star => Operator::Mul,
            Slash => Operator::Div,
            Percent => Operator::Mod,
            Amp => Operator::BitAnd,
            Pipe => Operator::BitOr,
            Caret => Operator::BitXor,
            LessLess => Operator::Shl,
            GreaterGreater => Operator::Shr,
            GreaterGreaterGreater => Operator::Sar,
            AmpAmp => Operator::And,
            PipePipe => Operator::Or,
            CaretCaret => Operator::Xor,
            EqualEqual => Operator::Equal,
            BangEqual => Operator::NotEqual,
            Less => Operator::Less,
            LessEqual => Operator::LessEqual,
            Greater => Operator::Greater,
            GreaterEqual => Operator::GreaterEqual,
            _ => return None,
        })
    }

    pub fn assign_operator(self) -> Option<Operator> {
        use TokenKind::*;
        Some(match self {
            Equal => Operator::Assign,
            PlusEqual => Operator::AddAssign,
            MinusEqual => Operator::SubAssign,
            StarEqual => Operator::MulAssign,
            SlashEqual => Operator::DivAssign,
            PercentEqual => Operator::ModAssign,
            AmpEqual => Operator::AndAssign,
            PipeEqual => Operator::OrAssign,
            CaretEqual => Operator::XorAssign,
            LessLessEqual => Operator::ShlAssign,
            GreaterGreaterEqual => Operator::ShrAssign,
            GreaterGreaterGreaterEqual => Operator::SarAssign,
            _ => return None,
        })
    }

    pub fn prefix_operator(self) -> Option<Operator> {
        use TokenKind::*;
        Some(match self {
            Minus => Operator::Negate,
            Plus => Operator::Plus,
            Bang => Operator::Not,
            Tilde => Operator::BitNot,
            PlusPlus => Operator::Increment,
            MinusMinus => Operator::Decrement,
            At => Operator::Handle,
            _ => return None,
        })
    }

    /// `++`, `--`, `.` and `[`.
    pub fn is_postfix_operator(self) -> bool {
        matches!(
            self,
            TokenKind::PlusPlus | TokenKind::MinusMinus | TokenKind::Dot | TokenKind::LeftBracket
        )
    }

    /// Spelling used in diagnostics.
    pub fn description(self) -> &'static str {
        use TokenKind::*;
        match self {
            IntLiteral => "integer constant",
            FloatLiteral => "float constant",
            DoubleLiteral => "double constant",
            StringLiteral => "string constant",
            HeredocLiteral => "heredoc string constant",
            BitsLiteral => "bits constant",
            Identifier => "identifier",
            Void => "void",
            Bool => "bool",
            Int8 => "int8",
            Int16 => "int16",
            Int => "int",
            UInt8 => "uint8",
            UInt16 => "uint16",
            UInt => "uint",
            Bits8 => "bits8",
            Bits16 => "bits16",
            Bits => "bits",
            Float => "float",
            Double => "double",
            True => "true",
            False => "false",
            Null => "null",
            If => "if",
            Else => "else",
            For => "for",
            While => "while",
            Do => "do",
            Switch => "switch",
            Case => "case",
            Default => "default",
            Break => "break",
            Continue => "continue",
            Return => "return",
            Const => "const",
            Struct => "struct",
            Import => "import",
            In => "in",
            Out => "out",
            InOut => "inout",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            PlusPlus => "++",
            MinusMinus => "--",
            Equal => "=",
            PlusEqual => "+=",
            MinusEqual => "-=",
            StarEqual => "*=",
            SlashEqual => "/=",
            PercentEqual => "%=",
            AmpEqual => "&=",
            PipeEqual => "|=",
            CaretEqual => "^=",
            LessLessEqual => "<<=",
            GreaterGreaterEqual => ">>=",
            GreaterGreaterGreaterEqual => ">>>=",
            Amp => "&",
            Pipe => "|",
            Caret => "^",
            Tilde => "~",
            LessLess => "<<",
            GreaterGreater => ">>",
            GreaterGreaterGreater => ">>>",
            EqualEqual => "==",
            BangEqual => "!=",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            AmpAmp => "&&",
            PipePipe => "||",
            CaretCaret => "^^",
            Bang => "!",
            Question => "?",
            Colon => ":",
            Dot => ".",
            At => "@",
            Comma => ",",
            Semicolon => ";",
            LeftParen => "(",
            RightParen => ")",
            LeftBracket => "[",
            RightBracket => "]",
            LeftBrace => "{",
            RightBrace => "}",
            Whitespace => "whitespace",
            LineComment | BlockComment => "comment",
            Error => "unrecognized token",
            Eof => "end of file",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Map a word to its keyword kind. `from` is deliberately not a keyword.
pub fn lookup_keyword(ident: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match ident {
        "void" => Void,
        "bool" => Bool,
        "int8" => Int8,
        "int16" => Int16,
        "int" => Int,
        "uint8" => UInt8,
        "uint16" => UInt16,
        "uint" => UInt,
        "bits8" => Bits8,
        "bits16" => Bits16,
        "bits" => Bits,
        "float" => Float,
        "double" => Double,

        "true" => True,
        "false" => False,
        "null" => Null,

        "if" => If,
        "else" => Else,
        "for" => For,
        "while" => While,
        "do" => Do,
        "switch" => Switch,
        "case" => Case,
        "default" => Default,
        "break" => Break,
        "continue" => Continue,
        "return" => Return,

        "const" => Const,
        "struct" => Struct,
        "import" => Import,
        "in" => In,
        "out" => Out,
        "inout" => InOut,

        _ => return None,
    })
}
