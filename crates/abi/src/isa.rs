use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum Opcode {
    // --- Marker ---
    Ill = 0, // Never valid to execute

    // --- Stack / Memory ---
    Lit = 1, // Push immediate X
    Lod = 2, // Push memory[X]
    Sto = 3, // Pop top, memory[X] = top

    // --- Arithmetic (i32, overflow-checked) ---
    Add = 4, // Pop a, Pop b, Push b + a
    Sub = 5, // Pop a, Pop b, Push b - a
    Mul = 6, // Pop a, Pop b, Push b * a
    Div = 7, // Pop a, Pop b, Push b / a

    // --- Output ---
    Wrt = 8, // Pop top, write "{top}\n"
}

impl Opcode {
    pub const ALL: [Opcode; 9] = [
        Opcode::Ill,
        Opcode::Lit,
        Opcode::Lod,
        Opcode::Sto,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Wrt,
    ];

    pub const fn mnemonic(self) -> &'static str {
        match self {
            Opcode::Ill => "ILL",
            Opcode::Lit => "LIT",
            Opcode::Lod => "LOD",
            Opcode::Sto => "STO",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Wrt => "WRT",
        }
    }

    /// Whether the operand field carries meaning for this opcode.
    pub const fn takes_operand(self) -> bool {
        matches!(self, Opcode::Lit | Opcode::Lod | Opcode::Sto)
    }
}

impl TryFrom<i32> for Opcode {
    type Error = i32;

    fn try_from(tag: i32) -> Result<Self, Self::Error> {
        Opcode::ALL
            .into_iter()
            .find(|op| *op as i32 == tag)
            .ok_or(tag)
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// One raw 8-byte code record: opcode tag plus operand.
///
/// This is what the container transports and what the machine stores. The
/// tag is not checked against [`Opcode`] until fetch time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Word {
    pub opcode: i32,
    pub operand: i32,
}

impl Word {
    pub const SIZE: usize = 8;

    pub const fn new(opcode: i32, operand: i32) -> Self {
        Self { opcode, operand }
    }

    pub fn to_le_bytes(self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0..4].copy_from_slice(&self.opcode.to_le_bytes());
        out[4..8].copy_from_slice(&self.operand.to_le_bytes());
        out
    }

    pub fn from_le_bytes(bytes: [u8; Self::SIZE]) -> Self {
        let [o0, o1, o2, o3, x0, x1, x2, x3] = bytes;
        Self {
            opcode: i32::from_le_bytes([o0, o1, o2, o3]),
            operand: i32::from_le_bytes([x0, x1, x2, x3]),
        }
    }
}

/// A decoded instruction. Zero-operand variants encode operand 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instruction {
    Ill,
    Lit(i32),
    Lod(i32),
    Sto(i32),
    Add,
    Sub,
    Mul,
    Div,
    Wrt,
}

impl Instruction {
    pub const fn opcode(&self) -> Opcode {
        match self {
            Instruction::Ill => Opcode::Ill,
            Instruction::Lit(_) => Opcode::Lit,
            Instruction::Lod(_) => Opcode::Lod,
            Instruction::Sto(_) => Opcode::Sto,
            Instruction::Add => Opcode::Add,
            Instruction::Sub => Opcode::Sub,
            Instruction::Mul => Opcode::Mul,
            Instruction::Div => Opcode::Div,
            Instruction::Wrt => Opcode::Wrt,
        }
    }

    pub const fn operand(&self) -> i32 {
        match self {
            Instruction::Lit(x) | Instruction::Lod(x) | Instruction::Sto(x) => *x,
            _ => 0,
        }
    }

    /// Builds an instruction from an opcode and operand. The operand is
    /// dropped for opcodes that do not take one.
    pub const fn from_parts(opcode: Opcode, operand: i32) -> Self {
        match opcode {
            Opcode::Ill => Instruction::Ill,
            Opcode::Lit => Instruction::Lit(operand),
            Opcode::Lod => Instruction::Lod(operand),
            Opcode::Sto => Instruction::Sto(operand),
            Opcode::Add => Instruction::Add,
            Opcode::Sub => Instruction::Sub,
            Opcode::Mul => Instruction::Mul,
            Opcode::Div => Instruction::Div,
            Opcode::Wrt => Instruction::Wrt,
        }
    }
}

impl From<Instruction> for Word {
    fn from(instr: Instruction) -> Self {
        Word::new(instr.opcode() as i32, instr.operand())
    }
}

impl TryFrom<Word> for Instruction {
    type Error = i32;

    /// Fails with the raw tag when it is outside the opcode set.
    fn try_from(word: Word) -> Result<Self, Self::Error> {
        let opcode = Opcode::try_from(word.opcode)?;
        Ok(Instruction::from_parts(opcode, word.operand))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.opcode();
        if op.takes_operand() {
            write!(f, "{} {}", op, self.operand())
        } else {
            write!(f, "{}", op)
        }
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Instruction::try_from(*self) {
            Ok(instr) => write!(f, "{}", instr),
            Err(_) => f.write_str("BAD"),
        }
    }
}
