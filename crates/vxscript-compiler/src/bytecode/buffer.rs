//! The bytecode assembly buffer.
//!
//! The compiler appends instructions with symbolic labels and pseudo
//! `Line` markers. [`ByteCode::finalize`] turns the buffer into the encoded
//! word stream: it walks every reachable path to compute the stack depth,
//! drops unreachable code, resolves labels to relative offsets and extracts
//! the line table.

use rustc_hash::FxHashMap;
use thiserror::Error;
use vxscript_core::TypeHash;

use super::instruction::Instruction;
use super::opcode::OpCode;

/// Bookkeeping failures found while linearizing a buffer. They indicate a
/// compiler bug, never a script error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ByteCodeError {
    #[error("jump to undefined label {0}")]
    UndefinedLabel(u32),

    #[error("stack underflow at instruction {0}")]
    StackUnderflow(usize),

    #[error("paths reach instruction {position} with stack depths {first} and {second}")]
    InconsistentStack { position: usize, first: i32, second: i32 },

    #[error("jump table at instruction {0} runs past the end of the code")]
    TruncatedJumpTable(usize),
}

/// Output of [`ByteCode::finalize`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinalCode {
    /// Reachable instructions with resolved jump offsets, pseudo
    /// instructions included.
    pub instructions: Vec<Instruction>,
    pub code: Vec<u32>,
    /// Largest value stack depth in dwords.
    pub stack_size: u32,
    /// `(word position, line | col << 20)`.
    pub line_table: Vec<(u32, u32)>,
}

/// Instruction buffer for one function or expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ByteCode {
    instrs: Vec<Instruction>,
}

impl ByteCode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn clear(&mut self) {
        self.instrs.clear();
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instrs
    }

    /// Last real instruction, skipping pseudo instructions.
    pub fn last_op(&self) -> Option<OpCode> {
        self.instrs.iter().rev().map(|i| i.op).find(|op| !op.is_pseudo())
    }

    fn emit(&mut self, instr: Instruction) {
        self.instrs.push(instr);
    }

    pub fn instr(&mut self, op: OpCode) {
        self.emit(Instruction::new(op));
    }

    pub fn instr_w(&mut self, op: OpCode, a: i16) {
        let mut i = Instruction::new(op);
        i.w[0] = a;
        self.emit(i);
    }

    pub fn instr_w_w(&mut self, op: OpCode, a: i16, b: i16) {
        let mut i = Instruction::new(op);
        i.w = [a, b, 0];
        self.emit(i);
    }

    pub fn instr_w_w_w(&mut self, op: OpCode, a: i16, b: i16, c: i16) {
        let mut i = Instruction::new(op);
        i.w = [a, b, c];
        self.emit(i);
    }

    pub fn instr_dword(&mut self, op: OpCode, value: u32) {
        let mut i = Instruction::new(op);
        i.arg = value as u64;
        self.emit(i);
    }

    pub fn instr_qword(&mut self, op: OpCode, value: u64) {
        let mut i = Instruction::new(op);
        i.arg = value;
        self.emit(i);
    }

    pub fn instr_w_dword(&mut self, op: OpCode, a: i16, value: u32) {
        let mut i = Instruction::new(op);
        i.w[0] = a;
        i.arg = value as u64;
        self.emit(i);
    }

    pub fn instr_w_qword(&mut self, op: OpCode, a: i16, value: u64) {
        let mut i = Instruction::new(op);
        i.w[0] = a;
        i.arg = value;
        self.emit(i);
    }

    /// Instruction taking a type identity, e.g. `FREE` or `OBJTYPE`.
    pub fn instr_type(&mut self, op: OpCode, ty: TypeHash) {
        self.instr_qword(op, ty.0);
    }

    /// `CALL`, `CALLSYS` or `CALLBND`, popping `pop` dwords of arguments.
    pub fn call(&mut self, op: OpCode, func: u32, pop: u32) {
        let mut i = Instruction::new(op);
        i.arg = func as u64;
        i.stack_inc = -(pop as i32);
        self.emit(i);
    }

    /// Allocate an object of `ty` with constructor `func`.
    pub fn alloc(&mut self, ty: TypeHash, func: u32, pop: u32) {
        let mut i = Instruction::new(OpCode::ALLOC);
        i.arg = ty.0;
        i.arg2 = func;
        i.stack_inc = -(pop as i32);
        self.emit(i);
    }

    pub fn ret(&mut self, pop: u32) {
        self.instr_w(OpCode::RET, pop as i16);
    }

    pub fn push(&mut self, dwords: u32) {
        let mut i = Instruction::new(OpCode::PUSH);
        i.w[0] = dwords as i16;
        i.stack_inc = dwords as i32;
        self.emit(i);
    }

    pub fn pop(&mut self, dwords: u32) {
        let mut i = Instruction::new(OpCode::POP);
        i.w[0] = dwords as i16;
        i.stack_inc = -(dwords as i32);
        self.emit(i);
    }

    /// Jump to a label. `op` is `JMP` or one of the conditional jumps.
    pub fn jump(&mut self, op: OpCode, label: u32) {
        debug_assert!(op.is_jump());
        self.instr_dword(op, label);
    }

    /// Jump into the table of `max + 1` `JMP`s that must follow.
    pub fn jmpp(&mut self, var: i16, max: u32) {
        let mut i = Instruction::new(OpCode::JMPP);
        i.w[0] = var;
        i.arg = max as u64;
        self.emit(i);
    }

    pub fn label(&mut self, label: u32) {
        self.instr_dword(OpCode::Label, label);
    }

    pub fn line(&mut self, line: u32, col: u32) {
        self.instr_dword(OpCode::Line, (line & 0xFFFFF) | (col << 20));
    }

    /// Append another buffer.
    pub fn add_code(&mut self, other: ByteCode) {
        self.instrs.extend(other.instrs);
    }

    /// Insert another buffer in front of this one.
    pub fn prepend(&mut self, other: ByteCode) {
        let tail = std::mem::replace(&mut self.instrs, other.instrs);
        self.instrs.extend(tail);
    }

    /// Shift every label id by `offset`, so buffers compiled with separate
    /// label counters can be concatenated.
    pub fn relabel(&mut self, offset: u32) {
        for i in &mut self.instrs {
            if i.op == OpCode::Label || i.op.is_jump() {
                i.arg += offset as u64;
            }
        }
    }

    /// Largest label id in use.
    pub fn max_label(&self) -> Option<u32> {
        self.instrs.iter().filter(|i| i.op == OpCode::Label).map(Instruction::label).max()
    }

    /// Every frame variable referenced by the buffer.
    pub fn vars_used(&self) -> Vec<i16> {
        let mut vars = Vec::new();
        for instr in &self.instrs {
            for &v in instr.variables() {
                if !vars.contains(&v) {
                    vars.push(v);
                }
            }
        }
        vars
    }

    pub fn is_var_used(&self, offset: i16) -> bool {
        self.instrs.iter().any(|i| i.variables().contains(&offset))
    }

    /// Rename frame variable `old` to `new` throughout the buffer.
    pub fn exchange_var(&mut self, old: i16, new: i16) {
        for instr in &mut self.instrs {
            for v in instr.variables_mut() {
                if *v == old {
                    *v = new;
                }
            }
        }
    }

    /// Opcodes of the real instructions, pseudo instructions skipped.
    pub fn opcodes(&self) -> Vec<OpCode> {
        self.instrs.iter().map(|i| i.op).filter(|op| !op.is_pseudo()).collect()
    }

    /// Check that the buffer holds exactly the given opcode sequence.
    #[track_caller]
    pub fn assert_opcodes(&self, expected: &[OpCode]) {
        assert_opcode_sequence(&self.opcodes(), expected);
    }

    /// Check that the given opcodes appear in order, not necessarily contiguous.
    #[track_caller]
    pub fn assert_contains_opcodes(&self, expected: &[OpCode]) {
        assert_opcode_subsequence(&self.opcodes(), expected);
    }

    /// Linearize the buffer.
    pub fn finalize(self) -> Result<FinalCode, ByteCodeError> {
        let labels = self.label_positions();
        let (depths, largest) = self.walk_paths(&labels)?;

        let instructions: Vec<Instruction> = self
            .instrs
            .into_iter()
            .zip(&depths)
            .filter_map(|(instr, depth)| depth.map(|_| instr))
            .collect();

        let mut positions = Vec::with_capacity(instructions.len());
        let mut pos = 0u32;
        let mut label_words = FxHashMap::default();
        for instr in &instructions {
            positions.push(pos);
            if instr.op == OpCode::Label {
                label_words.insert(instr.label(), pos);
            }
            pos += instr.size();
        }

        let mut resolved = instructions;
        for (index, instr) in resolved.iter_mut().enumerate() {
            if instr.op.is_jump() {
                let target = *label_words
                    .get(&instr.label())
                    .ok_or(ByteCodeError::UndefinedLabel(instr.label()))?;
                let next = positions[index] + instr.size();
                instr.arg = (target as i64 - next as i64) as i32 as u32 as u64;
            }
        }

        let mut code = Vec::with_capacity(pos as usize);
        let mut line_table: Vec<(u32, u32)> = Vec::new();
        for (index, instr) in resolved.iter().enumerate() {
            if instr.op == OpCode::Line {
                let entry = (positions[index], instr.arg as u32);
                match line_table.last_mut() {
                    Some(last) if last.0 == entry.0 => *last = entry,
                    _ => line_table.push(entry),
                }
            }
            instr.encode(&mut code);
        }

        Ok(FinalCode {
            instructions: resolved,
            code,
            stack_size: largest as u32,
            line_table,
        })
    }

    fn label_positions(&self) -> FxHashMap<u32, usize> {
        self.instrs
            .iter()
            .enumerate()
            .filter(|(_, i)| i.op == OpCode::Label)
            .map(|(pos, i)| (i.label(), pos))
            .collect()
    }

    /// Depth-first walk over every path from the first instruction.
    fn walk_paths(&self, labels: &FxHashMap<u32, usize>) -> Result<(Vec<Option<i32>>, i32), ByteCodeError> {
        let n = self.instrs.len();
        let mut depths: Vec<Option<i32>> = vec![None; n];
        let mut largest = 0;
        let mut work = vec![(0usize, 0i32)];
        let target = |label: u32| labels.get(&label).copied().ok_or(ByteCodeError::UndefinedLabel(label));

        while let Some((mut pos, mut depth)) = work.pop() {
            while pos < n {
                match depths[pos] {
                    Some(seen) if seen == depth => break,
                    Some(seen) => {
                        return Err(ByteCodeError::InconsistentStack {
                            position: pos,
                            first: seen,
                            second: depth,
                        });
                    }
                    None => depths[pos] = Some(depth),
                }

                let instr = &self.instrs[pos];
                depth += instr.stack_inc;
                if depth < 0 {
                    return Err(ByteCodeError::StackUnderflow(pos));
                }
                largest = largest.max(depth);

                match instr.op {
                    OpCode::RET => break,
                    OpCode::JMP => pos = target(instr.label())?,
                    op if op.is_conditional_jump() => {
                        work.push((target(instr.label())?, depth));
                        pos += 1;
                    }
                    OpCode::JMPP => {
                        let entries = instr.arg as usize + 1;
                        if pos + entries >= n {
                            return Err(ByteCodeError::TruncatedJumpTable(pos));
                        }
                        for entry in 1..=entries {
                            work.push((pos + entry, depth));
                        }
                        break;
                    }
                    _ => pos += 1,
                }
            }
        }

        Ok((depths, largest))
    }
}

#[track_caller]
pub(crate) fn assert_opcode_sequence(actual: &[OpCode], expected: &[OpCode]) {
    assert_eq!(
        actual,
        expected,
        "Bytecode mismatch.\nExpected: {:?}\nActual:   {:?}",
        expected.iter().map(|op| op.name()).collect::<Vec<_>>(),
        actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
    );
}

#[track_caller]
pub(crate) fn assert_opcode_subsequence(actual: &[OpCode], expected: &[OpCode]) {
    let mut expected_iter = expected.iter().peekable();
    for op in actual {
        if expected_iter.peek() == Some(&op) {
            expected_iter.next();
        }
    }
    if expected_iter.peek().is_some() {
        let remaining: Vec<_> = expected_iter.map(|op| op.name()).collect();
        panic!(
            "Missing opcodes in sequence.\nExpected to find: {:?}\nActual bytecode:  {:?}",
            remaining,
            actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
        );
    }
}
