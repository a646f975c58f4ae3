use crate::error::VmError;
use crate::isa::{Instruction, Opcode, Word};
use serde::{Deserialize, Serialize};
use std::io::Write;
use tracing::{debug, trace, warn};

pub const DEFAULT_STACK_SIZE: usize = 2048;

/// Construction-time parameters. Nothing here changes after [`Machine::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineConfig {
    /// Slots in the shared stack/memory array.
    pub stack_size: usize,
    /// Exact number of words [`Machine::load`] accepts.
    pub code_size: usize,
    /// Starting instruction pointer.
    pub entry: i32,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            code_size: 0,
            entry: 0,
        }
    }
}

/// Stack machine over a single `i32` array that is both operand stack and memory.
///
/// `sp` points one past the logical top. The last slot of the array is never
/// reached by a push: `increase_sp` refuses once `sp == capacity - 1`.
pub struct Machine<W: Write> {
    pub(crate) ip: i32,
    pub(crate) sp: i32,
    pub(crate) stack: Vec<i32>,
    pub(crate) code: Vec<Word>,
    out: W,
}

impl<W: Write> Machine<W> {
    pub fn new(config: MachineConfig, out: W) -> Self {
        Self {
            ip: config.entry,
            sp: 0,
            stack: vec![0; config.stack_size],
            code: vec![Word::default(); config.code_size],
            out,
        }
    }

    /// Replaces the whole code array. The length must match the configured code size.
    pub fn load(&mut self, words: &[Word]) -> Result<(), VmError> {
        if words.len() != self.code.len() {
            return Err(VmError::CodeSizeMismatch {
                expected: self.code.len(),
                actual: words.len(),
            });
        }
        self.code.copy_from_slice(words);
        debug!(count = words.len(), entry = self.ip, "code loaded");
        Ok(())
    }

    /// Runs exactly `code.len()` cycles, stopping at the first error.
    pub fn run(&mut self) -> Result<(), VmError> {
        for _ in 0..self.code.len() {
            if let Err(e) = self.step() {
                warn!(ip = self.ip, sp = self.sp, error = %e, "execution stopped");
                return Err(e);
            }
        }
        Ok(())
    }

    /// Runs one fetch/execute cycle.
    pub fn step(&mut self) -> Result<(), VmError> {
        let instr = self.fetch()?;
        trace!(ip = self.ip - 1, sp = self.sp, %instr, "exec");
        self.execute(instr)
    }

    pub fn ip(&self) -> i32 {
        self.ip
    }

    pub fn sp(&self) -> i32 {
        self.sp
    }

    pub fn stack(&self) -> &[i32] {
        &self.stack
    }

    pub fn code(&self) -> &[Word] {
        &self.code
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn output_mut(&mut self) -> &mut W {
        &mut self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    // --- Micro ops ---

    pub(crate) fn read_instruction(&self, pos: i32) -> Result<Word, VmError> {
        usize::try_from(pos)
            .ok()
            .and_then(|i| self.code.get(i).copied())
            .ok_or(VmError::IllegalInstruction { ip: pos })
    }

    fn fetch(&mut self) -> Result<Instruction, VmError> {
        let word = self.read_instruction(self.ip)?;
        let instr = match Instruction::try_from(word) {
            Ok(Instruction::Ill) | Err(_) => {
                return Err(VmError::IllegalInstruction { ip: self.ip });
            }
            Ok(instr) => instr,
        };
        self.ip += 1;
        Ok(instr)
    }

    pub(crate) fn read_stack(&self, pos: i32) -> Result<i32, VmError> {
        usize::try_from(pos)
            .ok()
            .and_then(|i| self.stack.get(i).copied())
            .ok_or(VmError::MemoryError { index: pos })
    }

    fn write_stack(&mut self, pos: i32, value: i32) -> Result<(), VmError> {
        let slot = usize::try_from(pos)
            .ok()
            .and_then(|i| self.stack.get_mut(i))
            .ok_or(VmError::MemoryError { index: pos })?;
        *slot = value;
        Ok(())
    }

    fn increase_sp(&mut self) -> Result<(), VmError> {
        if self.sp as i64 >= self.stack.len() as i64 - 1 {
            return Err(VmError::StackOverflow { sp: self.sp });
        }
        self.sp += 1;
        Ok(())
    }

    fn decrease_sp(&mut self) -> Result<(), VmError> {
        if self.sp == 0 {
            return Err(VmError::StackOverflow { sp: self.sp });
        }
        self.sp -= 1;
        Ok(())
    }

    fn push(&mut self, value: i32) -> Result<(), VmError> {
        self.write_stack(self.sp, value)?;
        self.increase_sp()
    }

    // a = top, b = the slot under it; the result replaces b.
    fn binary_op(
        &mut self,
        f: impl FnOnce(i32, i32) -> Result<i32, VmError>,
    ) -> Result<(), VmError> {
        let a = self.read_stack(self.sp - 1)?;
        let b = self.read_stack(self.sp - 2)?;
        let result = f(a, b)?;
        self.write_stack(self.sp - 2, result)?;
        self.decrease_sp()
    }

    fn execute(&mut self, instr: Instruction) -> Result<(), VmError> {
        match instr {
            // --- Stack / Memory ---
            Instruction::Lit(x) => self.push(x),
            Instruction::Lod(x) => {
                let val = self.read_stack(x)?;
                self.push(val)
            }
            Instruction::Sto(x) => {
                let val = self.read_stack(self.sp - 1)?;
                self.write_stack(x, val)?;
                self.decrease_sp()
            }

            // --- Arithmetic ---
            Instruction::Add => self.binary_op(|a, b| {
                b.checked_add(a)
                    .ok_or(VmError::ArithmeticOverflow { opcode: Opcode::Add })
            }),
            Instruction::Sub => self.binary_op(|a, b| {
                b.checked_sub(a)
                    .ok_or(VmError::ArithmeticOverflow { opcode: Opcode::Sub })
            }),
            Instruction::Mul => self.binary_op(|a, b| {
                b.checked_mul(a)
                    .ok_or(VmError::ArithmeticOverflow { opcode: Opcode::Mul })
            }),
            Instruction::Div => self.binary_op(|a, b| {
                if a == 0 {
                    return Err(VmError::DivideByZero);
                }
                // only i32::MIN / -1 is left to overflow
                b.checked_div(a)
                    .ok_or(VmError::ArithmeticOverflow { opcode: Opcode::Div })
            }),

            // --- Output ---
            Instruction::Wrt => {
                let val = self.read_stack(self.sp - 1)?;
                // one write per line so a failing sink never holds half of it
                self.out.write_all(format!("{}\n", val).as_bytes())?;
                self.decrease_sp()
            }

            Instruction::Ill => Err(VmError::Unreachable(Opcode::Ill)),
        }
    }
}
