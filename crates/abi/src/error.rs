use crate::isa::Opcode;
use thiserror::Error;

/// Errors raised while loading or executing code. Every one of them ends the run.
#[derive(Debug, Error)]
pub enum VmError {
    /// Fetch hit an out-of-range instruction pointer, an unknown opcode, or `ILL`.
    #[error("illegal instruction at ip {ip}")]
    IllegalInstruction { ip: i32 },
    /// Stack/memory access outside `[0, capacity)`.
    #[error("memory error: index {index} out of bounds")]
    MemoryError { index: i32 },
    /// Push at the ceiling or pop on an empty stack.
    #[error("stack overflow at sp {sp}")]
    StackOverflow { sp: i32 },
    #[error("arithmetic overflow in {opcode}")]
    ArithmeticOverflow { opcode: Opcode },
    #[error("divide by zero")]
    DivideByZero,
    #[error("code size mismatch: machine holds {expected} instructions, got {actual}")]
    CodeSizeMismatch { expected: usize, actual: usize },
    /// The output sink refused a write.
    #[error("output error: {0}")]
    Output(#[from] std::io::Error),
    /// An opcode that fetch should have rejected reached execute.
    #[error("unreachable opcode {0} at execute")]
    Unreachable(Opcode),
}

/// Errors raised while reading or writing an EPF container.
#[derive(Debug, Error)]
pub enum EpfError {
    #[error("wrong signature: {0:?}")]
    BadSignature([u8; 4]),
    #[error("wrong version: {0}")]
    UnsupportedVersion(i32),
    #[error("invalid instruction count: {0}")]
    InvalidCount(i32),
    #[error("too many instructions for a 32-bit count: {0}")]
    TooManyInstructions(usize),
    #[error("read error: {0}")]
    Read(#[source] std::io::Error),
    #[error("write error: {0}")]
    Write(#[source] std::io::Error),
}
