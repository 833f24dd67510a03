//! A single bytecode instruction before and after linearization.

use std::fmt;

use super::opcode::{ArgLayout, OpCode};

/// One instruction in a [`ByteCode`](super::ByteCode) buffer.
///
/// Word arguments are stored signed because most of them address frame
/// variables. `arg` holds the dword or qword argument; `arg2` the trailing
/// dword of `QW_DW` instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: OpCode,
    pub w: [i16; 3],
    pub arg: u64,
    pub arg2: u32,
    /// Change of the value stack depth caused by this instruction.
    pub stack_inc: i32,
}

impl Instruction {
    pub fn new(op: OpCode) -> Self {
        Self {
            op,
            w: [0; 3],
            arg: 0,
            arg2: 0,
            stack_inc: op.stack_inc().unwrap_or(0),
        }
    }

    /// Encoded size in words. Pseudo instructions take no space.
    pub fn size(&self) -> u32 {
        if self.op.is_pseudo() { 0 } else { self.op.layout().size() }
    }

    /// Frame variables this instruction reads or writes.
    pub fn variables(&self) -> &[i16] {
        &self.w[..self.op.layout().variable_args()]
    }

    pub(crate) fn variables_mut(&mut self) -> &mut [i16] {
        let count = self.op.layout().variable_args();
        &mut self.w[..count]
    }

    /// Label id for `Label` and jumps, before jump resolution.
    pub fn label(&self) -> u32 {
        self.arg as u32
    }

    /// Append the encoded words of this instruction.
    pub fn encode(&self, out: &mut Vec<u32>) {
        if self.op.is_pseudo() {
            return;
        }
        let op = u8::from(self.op) as u32;
        let word = |w: i16| w as u16 as u32;
        match self.op.layout() {
            ArgLayout::NoArg => out.push(op),
            ArgLayout::W | ArgLayout::rW | ArgLayout::wW => out.push(op | word(self.w[0]) << 16),
            ArgLayout::wW_rW | ArgLayout::rW_rW => {
                out.push(op | word(self.w[0]) << 16);
                out.push(word(self.w[1]));
            }
            ArgLayout::wW_rW_rW => {
                out.push(op | word(self.w[0]) << 16);
                out.push(word(self.w[1]) | word(self.w[2]) << 16);
            }
            ArgLayout::DW => {
                out.push(op);
                out.push(self.arg as u32);
            }
            ArgLayout::wW_DW => {
                out.push(op | word(self.w[0]) << 16);
                out.push(self.arg as u32);
            }
            ArgLayout::QW => {
                out.push(op);
                out.push(self.arg as u32);
                out.push((self.arg >> 32) as u32);
            }
            ArgLayout::wW_QW => {
                out.push(op | word(self.w[0]) << 16);
                out.push(self.arg as u32);
                out.push((self.arg >> 32) as u32);
            }
            ArgLayout::QW_DW => {
                out.push(op);
                out.push(self.arg as u32);
                out.push((self.arg >> 32) as u32);
                out.push(self.arg2);
            }
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            OpCode::Label => return write!(f, "{}:", self.arg),
            OpCode::Line => return write!(f, "  ; line {} col {}", self.arg & 0xFFFFF, self.arg >> 20),
            _ => {}
        }
        write!(f, "  {:<9}", self.op.name())?;
        match self.op.layout() {
            ArgLayout::NoArg => Ok(()),
            ArgLayout::W | ArgLayout::rW | ArgLayout::wW => write!(f, " {}", self.w[0]),
            ArgLayout::wW_rW | ArgLayout::rW_rW => write!(f, " v{}, v{}", self.w[0], self.w[1]),
            ArgLayout::wW_rW_rW => write!(f, " v{}, v{}, v{}", self.w[0], self.w[1], self.w[2]),
            ArgLayout::wW_DW => write!(f, " v{}, {}", self.w[0], self.arg as u32),
            ArgLayout::wW_QW => write!(f, " v{}, {}", self.w[0], self.arg),
            ArgLayout::DW => write!(f, " {}", self.arg as u32 as i32),
            ArgLayout::QW => write!(f, " {:#x}", self.arg),
            ArgLayout::QW_DW => write!(f, " {:#x}, {}", self.arg, self.arg2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_word_arguments() {
        let mut instr = Instruction::new(OpCode::ADDi);
        instr.w = [1, -2, 3];
        let mut out = Vec::new();
        instr.encode(&mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0] & 0xFF, u8::from(OpCode::ADDi) as u32);
        assert_eq!((out[0] >> 16) as i16, 1);
        assert_eq!(out[1] as u16 as i16, -2);
        assert_eq!((out[1] >> 16) as i16, 3);
    }

    #[test]
    fn pseudo_instructions_are_not_encoded() {
        let mut out = Vec::new();
        Instruction::new(OpCode::Label).encode(&mut out);
        Instruction::new(OpCode::Line).encode(&mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn variables_follow_layout() {
        let mut instr = Instruction::new(OpCode::CMPi);
        instr.w = [4, 5, 6];
        assert_eq!(instr.variables(), &[4, 5]);
        let mut instr = Instruction::new(OpCode::GETREF);
        instr.w = [4, 0, 0];
        assert!(instr.variables().is_empty());
    }
}
