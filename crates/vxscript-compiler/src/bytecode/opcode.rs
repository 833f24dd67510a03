//! Bytecode operation codes.
//!
//! The VM is a register/stack hybrid: each function has a frame of dword
//! variable slots addressed by signed offsets, a value stack used for call
//! arguments and object addresses, a value register (`R4`/`R8`) and an
//! object register. Most arithmetic works directly on frame variables.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// How the arguments of an instruction are laid out, and which of them are
/// frame variables.
///
/// `W` is a plain 16-bit word, `rW`/`wW` a variable read/written, `DW` a
/// dword and `QW` a qword.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgLayout {
    NoArg,
    W,
    rW,
    wW,
    wW_rW,
    rW_rW,
    wW_rW_rW,
    wW_DW,
    wW_QW,
    DW,
    QW,
    QW_DW,
}

impl ArgLayout {
    /// Encoded size in 32-bit words, including the opcode word.
    pub const fn size(self) -> u32 {
        match self {
            ArgLayout::NoArg | ArgLayout::W | ArgLayout::rW | ArgLayout::wW => 1,
            ArgLayout::wW_rW | ArgLayout::rW_rW | ArgLayout::wW_rW_rW | ArgLayout::wW_DW | ArgLayout::DW => 2,
            ArgLayout::wW_QW | ArgLayout::QW => 3,
            ArgLayout::QW_DW => 4,
        }
    }

    /// Number of leading word arguments that address frame variables.
    pub const fn variable_args(self) -> usize {
        match self {
            ArgLayout::rW | ArgLayout::wW | ArgLayout::wW_DW | ArgLayout::wW_QW => 1,
            ArgLayout::wW_rW | ArgLayout::rW_rW => 2,
            ArgLayout::wW_rW_rW => 3,
            _ => 0,
        }
    }
}

/// Bytecode operation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum OpCode {
    // =========================================================================
    // Stack
    // =========================================================================
    /// Pop `W` dwords from the value stack.
    POP = 0,
    /// Reserve `W` dwords on the value stack.
    PUSH,
    /// Push a dword constant.
    PshC4,
    /// Push a qword constant.
    PshC8,
    /// Push the address of a frame variable.
    PSF,
    /// Swap the two top dwords.
    SWAP4,
    /// Swap the two top qwords.
    SWAP8,
    /// Swap a dword on top with the qword below it.
    SWAP48,
    /// Swap a qword on top with the dword below it.
    SWAP84,
    /// Push the address held in the register.
    PshRPtr,
    /// Pop an address into the register.
    PopRPtr,
    /// Read a dword through the address on the stack, replacing it.
    RDS4,
    /// Read a qword through the address on the stack, replacing it.
    RDS8,
    /// Add a byte offset to the address on the stack.
    ADDSi,
    /// Null check of the address on the stack.
    CHKREF,
    /// Null check of the address the stack top points to.
    ChkRefS,
    /// Push the object type id.
    OBJTYPE,
    /// Push a type id.
    TYPEID,
    /// Push the address and length of a string constant.
    STR,

    // =========================================================================
    // Variables and registers
    // =========================================================================
    /// Set a dword variable to a constant.
    SetV4,
    /// Set a qword variable to a constant.
    SetV8,
    CpyVtoV4,
    CpyVtoV8,
    /// Copy a dword variable into the value register.
    CpyVtoR4,
    CpyVtoR8,
    /// Copy the value register into a dword variable.
    CpyRtoV4,
    CpyRtoV8,
    /// Load the address of a frame variable into the register.
    LDV,
    /// Load the address of a global variable into the register.
    LDG,
    /// Push the address of a global variable.
    PGA,
    /// Push a placeholder for a variable to be resolved by `GETREF`.
    VAR,
    /// Replace the variable index at stack offset `W` with its address.
    GETREF,
    /// Replace the variable index at stack offset `W` with the object address it holds.
    GETOBJREF,
    /// Move the object held by the variable at stack offset `W` onto the stack.
    GETOBJ,
    /// Move an object variable into the object register.
    LOADOBJ,
    /// Move the object register into an object variable.
    STOREOBJ,
    /// Read through the register into a variable.
    RDR1,
    RDR2,
    RDR4,
    RDR8,
    /// Write a variable through the register.
    WRTV1,
    WRTV2,
    WRTV4,
    WRTV8,

    // =========================================================================
    // Flow
    // =========================================================================
    JMP,
    /// Jump if the register is zero.
    JZ,
    JNZ,
    /// Jump if the register is negative.
    JS,
    JNS,
    /// Jump if the register is positive.
    JP,
    JNP,
    /// Jump `var` entries into the jump table that follows.
    JMPP,
    /// Call a script function.
    CALL,
    /// Call a host function.
    CALLSYS,
    /// Call an imported function.
    CALLBND,
    /// Return, popping `W` dwords of arguments.
    RET,
    /// Cooperative yield point.
    SUSPEND,

    // =========================================================================
    // Comparison and tests
    // =========================================================================
    /// Compare two int variables, leaving -1, 0 or 1 in the register.
    CMPi,
    CMPu,
    CMPf,
    CMPd,
    /// Register becomes `register == 0`.
    TZ,
    TNZ,
    /// Register becomes `register < 0`.
    TS,
    TNS,
    /// Register becomes `register > 0`.
    TP,
    TNP,

    // =========================================================================
    // Math
    // =========================================================================
    NEGi,
    NEGf,
    NEGd,
    /// Increment the value the register points to.
    INCi,
    DECi,
    INCi16,
    DECi16,
    INCi8,
    DECi8,
    INCf,
    DECf,
    INCd,
    DECd,
    ADDi,
    SUBi,
    MULi,
    DIVi,
    MODi,
    ADDf,
    SUBf,
    MULf,
    DIVf,
    MODf,
    ADDd,
    SUBd,
    MULd,
    DIVd,
    MODd,

    // =========================================================================
    // Bitwise and boolean
    // =========================================================================
    /// Boolean not of a variable.
    NOT,
    BNOT,
    BAND,
    BOR,
    BXOR,
    /// Logical shift left.
    BSLL,
    /// Logical shift right.
    BSRL,
    /// Arithmetic shift right.
    BSRA,

    // =========================================================================
    // Conversions
    // =========================================================================
    ItoF,
    FtoI,
    UtoF,
    FtoU,
    /// Sign extend a byte variable.
    SbToI,
    SwToI,
    /// Zero extend a byte variable.
    UbToI,
    UwToI,
    DtoI,
    DtoU,
    DtoF,
    ItoD,
    UtoD,
    FtoD,

    // =========================================================================
    // Objects
    // =========================================================================
    /// Allocate and construct an object, storing it at the address on the stack.
    ALLOC,
    /// Destroy or release the object at the address on the stack.
    FREE,
    /// Copy a handle, adjusting reference counts.
    REFCPY,
    /// Copy `DW` dwords between two objects.
    COPY,

    // =========================================================================
    // Pseudo instructions, never encoded
    // =========================================================================
    /// Jump target.
    Label = 0xFE,
    /// Source position marker.
    Line = 0xFF,
}

impl OpCode {
    /// Convert from u8, returning None for invalid values.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::try_from(value).ok()
    }

    pub const fn layout(self) -> ArgLayout {
        use ArgLayout as L;
        use OpCode::*;
        match self {
            SWAP4 | SWAP8 | SWAP48 | SWAP84 | PshRPtr | PopRPtr | RDS4 | RDS8 | CHKREF | ChkRefS | TZ | TNZ | TS
            | TNS | TP | TNP | INCi | DECi | INCi16 | DECi16 | INCi8 | DECi8 | INCf | DECf | INCd | DECd
            | SUSPEND => L::NoArg,

            POP | PUSH | GETREF | GETOBJREF | GETOBJ | RET | STR => L::W,

            PSF | VAR | LDV | CpyVtoR4 | CpyVtoR8 | LOADOBJ | JMPP => L::rW,

            CpyRtoV4 | CpyRtoV8 | STOREOBJ | RDR1 | RDR2 | RDR4 | RDR8 | NEGi | NEGf | NEGd | NOT | BNOT | ItoF
            | FtoI | UtoF | FtoU | SbToI | SwToI | UbToI | UwToI => L::wW,

            WRTV1 | WRTV2 | WRTV4 | WRTV8 => L::rW,

            CpyVtoV4 | CpyVtoV8 | DtoI | DtoU | DtoF | ItoD | UtoD | FtoD => L::wW_rW,

            CMPi | CMPu | CMPf | CMPd => L::rW_rW,

            ADDi | SUBi | MULi | DIVi | MODi | ADDf | SUBf | MULf | DIVf | MODf | ADDd | SUBd | MULd | DIVd
            | MODd | BAND | BOR | BXOR | BSLL | BSRL | BSRA => L::wW_rW_rW,

            SetV4 => L::wW_DW,
            SetV8 => L::wW_QW,

            PshC4 | ADDSi | LDG | PGA | JMP | JZ | JNZ | JS | JNS | JP | JNP | CALL | CALLSYS | CALLBND | COPY
            | Label | Line => L::DW,

            PshC8 | OBJTYPE | TYPEID | FREE | REFCPY => L::QW,

            ALLOC => L::QW_DW,
        }
    }

    /// Fixed change of the value stack depth in dwords. `None` for
    /// instructions whose change depends on their arguments.
    pub const fn stack_inc(self) -> Option<i32> {
        use OpCode::*;
        Some(match self {
            PshC4 | PSF | VAR | PGA | OBJTYPE | TYPEID | PshRPtr | RDS8 => 1,
            PshC8 | STR => 2,
            PopRPtr | FREE | REFCPY | COPY => -1,
            CALL | CALLSYS | CALLBND | ALLOC | RET | POP | PUSH => return None,
            _ => 0,
        })
    }

    /// Conditional jumps continue on both paths.
    pub const fn is_conditional_jump(self) -> bool {
        matches!(self, OpCode::JZ | OpCode::JNZ | OpCode::JS | OpCode::JNS | OpCode::JP | OpCode::JNP)
    }

    pub const fn is_jump(self) -> bool {
        matches!(self, OpCode::JMP) || self.is_conditional_jump()
    }

    pub const fn is_pseudo(self) -> bool {
        matches!(self, OpCode::Label | OpCode::Line)
    }

    /// Mnemonic used in listings.
    pub fn name(self) -> &'static str {
        use OpCode::*;
        match self {
            ItoF => "iTOf",
            FtoI => "fTOi",
            UtoF => "uTOf",
            FtoU => "fTOu",
            SbToI => "sbTOi",
            SwToI => "swTOi",
            UbToI => "ubTOi",
            UwToI => "uwTOi",
            DtoI => "dTOi",
            DtoU => "dTOu",
            DtoF => "dTOf",
            ItoD => "iTOd",
            UtoD => "uTOd",
            FtoD => "fTOd",
            POP => "POP",
            PUSH => "PUSH",
            PshC4 => "PshC4",
            PshC8 => "PshC8",
            PSF => "PSF",
            SWAP4 => "SWAP4",
            SWAP8 => "SWAP8",
            SWAP48 => "SWAP48",
            SWAP84 => "SWAP84",
            PshRPtr => "PshRPtr",
            PopRPtr => "PopRPtr",
            RDS4 => "RDS4",
            RDS8 => "RDS8",
            ADDSi => "ADDSi",
            CHKREF => "CHKREF",
            ChkRefS => "ChkRefS",
            OBJTYPE => "OBJTYPE",
            TYPEID => "TYPEID",
            STR => "STR",
            SetV4 => "SetV4",
            SetV8 => "SetV8",
            CpyVtoV4 => "CpyVtoV4",
            CpyVtoV8 => "CpyVtoV8",
            CpyVtoR4 => "CpyVtoR4",
            CpyVtoR8 => "CpyVtoR8",
            CpyRtoV4 => "CpyRtoV4",
            CpyRtoV8 => "CpyRtoV8",
            LDV => "LDV",
            LDG => "LDG",
            PGA => "PGA",
            VAR => "VAR",
            GETREF => "GETREF",
            GETOBJREF => "GETOBJREF",
            GETOBJ => "GETOBJ",
            LOADOBJ => "LOADOBJ",
            STOREOBJ => "STOREOBJ",
            RDR1 => "RDR1",
            RDR2 => "RDR2",
            RDR4 => "RDR4",
            RDR8 => "RDR8",
            WRTV1 => "WRTV1",
            WRTV2 => "WRTV2",
            WRTV4 => "WRTV4",
            WRTV8 => "WRTV8",
            JMP => "JMP",
            JZ => "JZ",
            JNZ => "JNZ",
            JS => "JS",
            JNS => "JNS",
            JP => "JP",
            JNP => "JNP",
            JMPP => "JMPP",
            CALL => "CALL",
            CALLSYS => "CALLSYS",
            CALLBND => "CALLBND",
            RET => "RET",
            SUSPEND => "SUSPEND",
            CMPi => "CMPi",
            CMPu => "CMPu",
            CMPf => "CMPf",
            CMPd => "CMPd",
            TZ => "TZ",
            TNZ => "TNZ",
            TS => "TS",
            TNS => "TNS",
            TP => "TP",
            TNP => "TNP",
            NEGi => "NEGi",
            NEGf => "NEGf",
            NEGd => "NEGd",
            INCi => "INCi",
            DECi => "DECi",
            INCi16 => "INCi16",
            DECi16 => "DECi16",
            INCi8 => "INCi8",
            DECi8 => "DECi8",
            INCf => "INCf",
            DECf => "DECf",
            INCd => "INCd",
            DECd => "DECd",
            ADDi => "ADDi",
            SUBi => "SUBi",
            MULi => "MULi",
            DIVi => "DIVi",
            MODi => "MODi",
            ADDf => "ADDf",
            SUBf => "SUBf",
            MULf => "MULf",
            DIVf => "DIVf",
            MODf => "MODf",
            ADDd => "ADDd",
            SUBd => "SUBd",
            MULd => "MULd",
            DIVd => "DIVd",
            MODd => "MODd",
            NOT => "NOT",
            BNOT => "BNOT",
            BAND => "BAND",
            BOR => "BOR",
            BXOR => "BXOR",
            BSLL => "BSLL",
            BSRL => "BSRL",
            BSRA => "BSRA",
            ALLOC => "ALLOC",
            FREE => "FREE",
            REFCPY => "REFCPY",
            COPY => "COPY",
            Label => "Label",
            Line => "Line",
        }
    }

    /// Arithmetic instructions folded away when both operands are constants.
    pub const fn is_arithmetic(self) -> bool {
        use OpCode::*;
        matches!(
            self,
            ADDi | SUBi
                | MULi
                | DIVi
                | MODi
                | ADDf
                | SUBf
                | MULf
                | DIVf
                | MODf
                | ADDd
                | SUBd
                | MULd
                | DIVd
                | MODd
                | BAND
                | BOR
                | BXOR
                | BSLL
                | BSRL
                | BSRA
                | CMPi
                | CMPu
                | CMPf
                | CMPd
                | NEGi
                | NEGf
                | NEGd
        )
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_u8() {
        for op in [OpCode::POP, OpCode::SetV4, OpCode::JMPP, OpCode::ALLOC, OpCode::Line] {
            let byte: u8 = op.into();
            assert_eq!(OpCode::from_u8(byte), Some(op));
        }
        assert_eq!(OpCode::from_u8(0xF0), None);
    }

    #[test]
    fn layout_sizes() {
        assert_eq!(OpCode::SUSPEND.layout().size(), 1);
        assert_eq!(OpCode::CpyVtoV4.layout().size(), 2);
        assert_eq!(OpCode::ADDi.layout().size(), 2);
        assert_eq!(OpCode::SetV8.layout().size(), 3);
        assert_eq!(OpCode::ALLOC.layout().size(), 4);
        assert_eq!(OpCode::ADDi.layout().variable_args(), 3);
        assert_eq!(OpCode::GETREF.layout().variable_args(), 0);
    }

    #[test]
    fn stack_increments() {
        assert_eq!(OpCode::PSF.stack_inc(), Some(1));
        assert_eq!(OpCode::STR.stack_inc(), Some(2));
        assert_eq!(OpCode::FREE.stack_inc(), Some(-1));
        assert_eq!(OpCode::CALL.stack_inc(), None);
        assert_eq!(OpCode::ADDi.stack_inc(), Some(0));
    }

    #[test]
    fn conversion_mnemonics() {
        assert_eq!(OpCode::ItoF.to_string(), "iTOf");
        assert_eq!(OpCode::UwToI.name(), "uwTOi");
    }
}
