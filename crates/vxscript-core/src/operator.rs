//! Operators the compiler understands.
//!
//! The same enum keys operator behaviours registered by hosts (for example a
//! `+=` method on a string type) and drives the compiler's choice of routine
//! for built-in operands.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    // === Assignment ===
    /// `=`
    Assign,
    /// `+=`
    AddAssign,
    /// `-=`
    SubAssign,
    /// `*=`
    MulAssign,
    /// `/=`
    DivAssign,
    /// `%=`
    ModAssign,
    /// `&=`
    AndAssign,
    /// `|=`
    OrAssign,
    /// `^=`
    XorAssign,
    /// `<<=`
    ShlAssign,
    /// `>>=` (logical)
    ShrAssign,
    /// `>>>=` (arithmetic)
    SarAssign,

    // === Binary ===
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    /// `&`
    BitAnd,
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `<<`
    Shl,
    /// `>>` (logical)
    Shr,
    /// `>>>` (arithmetic)
    Sar,
    /// `&&`
    And,
    /// `||`
    Or,
    /// `^^`
    Xor,
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,

    // === Unary ===
    /// Prefix `-`
    Negate,
    /// Prefix `+`
    Plus,
    /// `!`
    Not,
    /// `~`
    BitNot,
    /// `++`
    Increment,
    /// `--`
    Decrement,
    /// `@`
    Handle,

    // === Other ===
    /// `[]`
    Index,
}

impl Operator {
    /// Binding strength of a binary operator; higher binds tighter.
    ///
    /// Multiplicative > additive > shift > `&` > `^` > `|` > relational >
    /// equality (and `^^`) > `&&` > `||`. Non-binary operators return `None`.
    pub const fn precedence(self) -> Option<i32> {
        use Operator::*;
        Some(match self {
            Mul | Div | Mod => 0,
            Add | Sub => -1,
            Shl | Shr | Sar => -2,
            BitAnd => -3,
            BitXor => -4,
            BitOr => -5,
            Less | LessEqual | Greater | GreaterEqual => -6,
            Equal | NotEqual | Xor => -7,
            And => -8,
            Or => -9,
            _ => return None,
        })
    }

    pub const fn is_assignment(self) -> bool {
        use Operator::*;
        matches!(
            self,
            Assign
                | AddAssign
                | SubAssign
                | MulAssign
                | DivAssign
                | ModAssign
                | AndAssign
                | OrAssign
                | XorAssign
                | ShlAssign
                | ShrAssign
                | SarAssign
        )
    }

    /// Compound assignment (`+=` and friends), not plain `=`.
    pub const fn is_compound_assignment(self) -> bool {
        self.is_assignment() && !matches!(self, Operator::Assign)
    }

    pub const fn is_math(self) -> bool {
        use Operator::*;
        matches!(
            self,
            Add | Sub | Mul | Div | Mod | AddAssign | SubAssign | MulAssign | DivAssign | ModAssign
        )
    }

    pub const fn is_bitwise(self) -> bool {
        use Operator::*;
        matches!(
            self,
            BitAnd | BitOr | BitXor | Shl | Shr | Sar | AndAssign | OrAssign | XorAssign | ShlAssign | ShrAssign | SarAssign
        )
    }

    pub const fn is_shift(self) -> bool {
        use Operator::*;
        matches!(self, Shl | Shr | Sar | ShlAssign | ShrAssign | SarAssign)
    }

    pub const fn is_comparison(self) -> bool {
        use Operator::*;
        matches!(self, Equal | NotEqual | Less | LessEqual | Greater | GreaterEqual)
    }

    pub const fn is_boolean(self) -> bool {
        matches!(self, Operator::And | Operator::Or | Operator::Xor)
    }

    /// Binary operator applied by a compound assignment.
    pub const fn compound_base(self) -> Option<Operator> {
        use Operator::*;
        Some(match self {
            AddAssign => Add,
            SubAssign => Sub,
            MulAssign => Mul,
            DivAssign => Div,
            ModAssign => Mod,
            AndAssign => BitAnd,
            OrAssign => BitOr,
            XorAssign => BitXor,
            ShlAssign => Shl,
            ShrAssign => Shr,
            SarAssign => Sar,
            _ => return None,
        })
    }

    pub const fn symbol(self) -> &'static str {
        use Operator::*;
        match self {
            Assign => "=",
            AddAssign => "+=",
            SubAssign => "-=",
            MulAssign => "*=",
            DivAssign => "/=",
            ModAssign => "%=",
            AndAssign => "&=",
            OrAssign => "|=",
            XorAssign => "^=",
            ShlAssign => "<<=",
            ShrAssign => ">>=",
            SarAssign => ">>>=",
            Add | Plus => "+",
            Sub | Negate => "-",
            Mul => "*",
            Div => "/",
            Mod => "%",
            BitAnd => "&",
            BitOr => "|",
            BitXor => "^",
            Shl => "<<",
            Shr => ">>",
            Sar => ">>>",
            And => "&&",
            Or => "||",
            Xor => "^^",
            Equal => "==",
            NotEqual => "!=",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            Not => "!",
            BitNot => "~",
            Increment => "++",
            Decrement => "--",
            Handle => "@",
            Index => "[]",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_is_total_over_binary_operators() {
        let order = [
            Operator::Mul,
            Operator::Add,
            Operator::Shl,
            Operator::BitAnd,
            Operator::BitXor,
            Operator::BitOr,
            Operator::Less,
            Operator::Equal,
            Operator::And,
            Operator::Or,
        ];
        for pair in order.windows(2) {
            assert!(pair[0].precedence() > pair[1].precedence(), "{} vs {}", pair[0], pair[1]);
        }
        assert_eq!(Operator::Assign.precedence(), None);
    }

    #[test]
    fn compound_assignment_maps_to_base() {
        assert_eq!(Operator::SarAssign.compound_base(), Some(Operator::Sar));
        assert!(Operator::AddAssign.is_compound_assignment());
        assert!(!Operator::Assign.is_compound_assignment());
        assert_eq!(Operator::Assign.compound_base(), None);
    }

    #[test]
    fn categories() {
        assert!(Operator::ModAssign.is_math());
        assert!(Operator::ShlAssign.is_bitwise() && Operator::ShlAssign.is_shift());
        assert!(Operator::Xor.is_boolean());
        assert!(Operator::GreaterEqual.is_comparison());
        assert_eq!(Operator::Sar.to_string(), ">>>");
    }
}
