//! EPF v1 ("Executable Pcode Format") container.
//!
//! Layout, all fields little-endian with no padding:
//!
//! ```text
//! offset  size  field
//! 0       4     magic "ZQLS"
//! 4       4     version (i32, must be 1)
//! 8       4     instruction count (i32)
//! 12      4     entry point (i32)
//! 16      8*n   records: opcode (i32), operand (i32)
//! ```
//!
//! The container is a dumb transport. Opcode tags are carried as-is and the
//! entry point is not checked against the record count; the machine decides
//! legality when it fetches.

use crate::error::EpfError;
use crate::isa::{Instruction, Word};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use tracing::debug;

pub const MAGIC: [u8; 4] = *b"ZQLS";
pub const VERSION: i32 = 1;
pub const HEADER_SIZE: usize = 16;

// Upper bound on up-front allocation; a lying count cannot reserve more.
const PREALLOC_LIMIT: usize = 4096;

// The header for the executable format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramHeader {
    pub magic: [u8; 4],
    pub version: i32,
    pub instruction_count: i32,
    pub entry_point: i32,
}

impl ProgramHeader {
    pub fn to_le_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0..4].copy_from_slice(&self.magic);
        out[4..8].copy_from_slice(&self.version.to_le_bytes());
        out[8..12].copy_from_slice(&self.instruction_count.to_le_bytes());
        out[12..16].copy_from_slice(&self.entry_point.to_le_bytes());
        out
    }

    pub fn from_le_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        let field = |at: usize| {
            i32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
        };
        Self {
            magic: [bytes[0], bytes[1], bytes[2], bytes[3]],
            version: field(4),
            instruction_count: field(8),
            entry_point: field(12),
        }
    }
}

/// A finished instruction sequence plus its entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    words: Vec<Word>,
    entry: i32,
}

impl Program {
    pub fn new(words: Vec<Word>, entry: i32) -> Self {
        Self { words, entry }
    }

    pub fn from_instructions(instructions: &[Instruction], entry: i32) -> Self {
        Self::new(instructions.iter().copied().map(Word::from).collect(), entry)
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn entry(&self) -> i32 {
        self.entry
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn into_parts(self) -> (Vec<Word>, i32) {
        (self.words, self.entry)
    }

    pub fn header(&self) -> Result<ProgramHeader, EpfError> {
        let instruction_count = i32::try_from(self.words.len())
            .map_err(|_| EpfError::TooManyInstructions(self.words.len()))?;
        Ok(ProgramHeader {
            magic: MAGIC,
            version: VERSION,
            instruction_count,
            entry_point: self.entry,
        })
    }

    /// Encodes the header and every record into `out`.
    pub fn write_to<W: Write>(&self, out: &mut W) -> Result<(), EpfError> {
        let header = self.header()?;
        out.write_all(&header.to_le_bytes()).map_err(EpfError::Write)?;
        for word in &self.words {
            out.write_all(&word.to_le_bytes()).map_err(EpfError::Write)?;
        }
        debug!(count = self.words.len(), entry = self.entry, "encoded EPF program");
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, EpfError> {
        let mut out = Vec::with_capacity(HEADER_SIZE + self.words.len() * Word::SIZE);
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Decodes a program, reading exactly the header plus `count` records.
    ///
    /// Bytes after the last record are left in the reader.
    pub fn read_from<R: Read>(input: &mut R) -> Result<Self, EpfError> {
        let mut raw = [0u8; HEADER_SIZE];
        input.read_exact(&mut raw).map_err(EpfError::Read)?;
        let header = ProgramHeader::from_le_bytes(&raw);

        if header.magic != MAGIC {
            return Err(EpfError::BadSignature(header.magic));
        }
        if header.version != VERSION {
            return Err(EpfError::UnsupportedVersion(header.version));
        }
        let count = usize::try_from(header.instruction_count)
            .map_err(|_| EpfError::InvalidCount(header.instruction_count))?;

        let mut words = Vec::with_capacity(count.min(PREALLOC_LIMIT));
        let mut record = [0u8; Word::SIZE];
        for _ in 0..count {
            input.read_exact(&mut record).map_err(EpfError::Read)?;
            words.push(Word::from_le_bytes(record));
        }
        debug!(count, entry = header.entry_point, "decoded EPF program");
        Ok(Self::new(words, header.entry_point))
    }

    pub fn from_bytes(mut input: &[u8]) -> Result<Self, EpfError> {
        Self::read_from(&mut input)
    }
}
