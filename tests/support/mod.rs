//! Shared helpers for the integration tests.

use std::path::PathBuf;

use rustc_hash::FxHashMap;
use vxscript::{CompiledFunction, Instruction, OpCode, Registry, Unit};

/// Load a test script from the test_scripts directory.
pub fn load_script(filename: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("test_scripts")
        .join(filename);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
}

/// Build one test script against `registry`, panicking with the
/// diagnostics on failure.
pub fn build_script<'r>(registry: &'r Registry, filename: &str) -> Unit<'r> {
    let mut unit = Unit::with_registry(registry);
    unit.add_source(filename, load_script(filename)).expect("Failed to add source");
    if unit.build().is_err() {
        panic!("Failed to build {filename}:\n{}", unit.diagnostics());
    }
    unit
}

fn read(vars: &FxHashMap<i16, u32>, offset: i16) -> u32 {
    vars.get(&offset).copied().unwrap_or(0)
}

/// Run `function` on dword arguments and return the value register.
///
/// Executes the integer and jump subset of the instruction set on a frame
/// of dword variables: enough for dispatch logic such as `switch`, not for
/// anything touching objects or the value stack.
pub fn run(function: &CompiledFunction, args: &[u32]) -> u32 {
    let code = &function.instructions;

    // Word position of every instruction and of its end.
    let mut at_word: FxHashMap<u32, usize> = FxHashMap::default();
    let mut ends = Vec::with_capacity(code.len());
    let mut word = 0;
    for (index, instr) in code.iter().enumerate() {
        if !instr.op.is_pseudo() {
            at_word.entry(word).or_insert(index);
        }
        word += instr.size();
        ends.push(word);
    }
    let jump_size = Instruction::new(OpCode::JMP).size();
    let goto = |word: i64| -> usize {
        let word = u32::try_from(word).unwrap_or_else(|_| panic!("jump before the start: {word}"));
        *at_word.get(&word).unwrap_or_else(|| panic!("no instruction at word {word}"))
    };

    let mut vars: FxHashMap<i16, u32> = FxHashMap::default();
    let mut offset = 0;
    for &arg in args {
        vars.insert(offset, arg);
        offset -= 1;
    }

    let mut register: u32 = 0;
    let mut pc = 0;
    for _ in 0..100_000 {
        let instr = &code[pc];
        let [a, b, c] = instr.w;
        let taken = match instr.op {
            OpCode::JMP => true,
            OpCode::JZ => register == 0,
            OpCode::JNZ => register != 0,
            OpCode::JS => (register as i32) < 0,
            OpCode::JNS => (register as i32) >= 0,
            OpCode::JP => (register as i32) > 0,
            OpCode::JNP => (register as i32) <= 0,
            _ => false,
        };
        if instr.op.is_jump() {
            pc = if taken {
                goto(i64::from(ends[pc]) + i64::from(instr.arg as u32 as i32))
            } else {
                pc + 1
            };
            continue;
        }

        match instr.op {
            op if op.is_pseudo() => {}
            OpCode::PUSH | OpCode::POP | OpCode::SUSPEND => {}
            OpCode::SetV4 => {
                vars.insert(a, instr.arg as u32);
            }
            OpCode::CpyVtoV4 => {
                let value = read(&vars, b);
                vars.insert(a, value);
            }
            OpCode::CpyVtoR4 => register = read(&vars, a),
            OpCode::CpyRtoV4 => {
                vars.insert(a, register);
            }
            OpCode::ADDi | OpCode::SUBi | OpCode::MULi | OpCode::DIVi | OpCode::MODi => {
                let (l, r) = (read(&vars, b) as i32, read(&vars, c) as i32);
                let value = match instr.op {
                    OpCode::ADDi => l.wrapping_add(r),
                    OpCode::SUBi => l.wrapping_sub(r),
                    OpCode::MULi => l.wrapping_mul(r),
                    OpCode::DIVi => l.checked_div(r).unwrap_or_else(|| panic!("division fault {l} / {r}")),
                    _ => l.checked_rem(r).unwrap_or_else(|| panic!("division fault {l} % {r}")),
                };
                vars.insert(a, value as u32);
            }
            OpCode::CMPi => {
                let (l, r) = (read(&vars, a) as i32, read(&vars, b) as i32);
                register = l.cmp(&r) as i32 as u32;
            }
            OpCode::CMPu => {
                let (l, r) = (read(&vars, a), read(&vars, b));
                register = l.cmp(&r) as i32 as u32;
            }
            OpCode::JMPP => {
                let entry = read(&vars, a);
                pc = goto(i64::from(ends[pc]) + i64::from(entry * jump_size));
                continue;
            }
            OpCode::RET => return register,
            op => panic!("unsupported instruction {} in {}", op.name(), function.declaration),
        }
        pc += 1;
    }
    panic!("{} did not return", function.declaration);
}
