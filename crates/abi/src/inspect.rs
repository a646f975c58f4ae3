//! Read-only debug views over a [`Machine`]. None of these touch machine state.

use crate::isa::{Opcode, Word};
use crate::vm::Machine;
use std::fmt;
use std::io::Write;

impl<W: Write> Machine<W> {
    /// Value at `sp - 1`, if that slot is addressable.
    pub fn stack_top(&self) -> Option<i32> {
        self.read_stack(self.sp - 1).ok()
    }

    /// Word at the instruction pointer, or an `ILL` word when out of range.
    pub fn next_word(&self) -> Word {
        self.read_instruction(self.ip)
            .unwrap_or(Word::new(Opcode::Ill as i32, 0))
    }

    /// Word just before the instruction pointer, typically the one last executed.
    pub fn last_word(&self) -> Option<Word> {
        self.read_instruction(self.ip.checked_sub(1)?).ok()
    }

    /// Renders the stack from `sp` down to `sp - max` (clamped at 0).
    pub fn stack_graph(&self, max: i32) -> String {
        let sp = self.sp;
        if sp < 0 || sp as usize >= self.stack.len() {
            return "Stack graph is not available.".to_string();
        }
        let min = sp.saturating_sub(max).max(0);
        let mut out = String::new();
        for i in (min..=sp).rev() {
            let v = self.stack[i as usize];
            if i == sp {
                out.push_str(&format!("|\t{}\t| <-- sp", v));
            } else {
                out.push_str(&format!("|\t{}\t| {}", v, i));
            }
            if i != min {
                out.push('\n');
            }
        }
        out
    }

    /// Renders code around the instruction pointer: `half - 1` rows before it, `half` after.
    pub fn instruction_graph(&self, half: i32) -> String {
        let len = self.code.len() as i64;
        let ip = self.ip as i64;
        let half = half as i64;
        let max = (ip + half).min(len - 1);
        let min = (ip - half + 1).max(0);
        if len == 0 || min > max || min >= len {
            return "Instructions graph is not available.".to_string();
        }
        let mut out = String::new();
        for i in min..=max {
            let word = self.code[i as usize];
            if i == ip {
                out.push_str(&format!("|\t{}\t| <-- ip", word));
            } else {
                out.push_str(&format!("|\t{}\t| {}", word, i));
            }
            if i != max {
                out.push('\n');
            }
        }
        out
    }
}

impl<W: Write> fmt::Display for Machine<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Registers: ip={} sp={}", self.ip, self.sp)?;
        if let Some(last) = self.last_word() {
            writeln!(f, "Last Instruction: {}", last)?;
        }
        writeln!(f, "Stack:")?;
        writeln!(f, "{}", self.stack_graph(20))?;
        writeln!(f, "Instructions:")?;
        write!(f, "{}", self.instruction_graph(5))
    }
}
