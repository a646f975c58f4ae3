// Pcode ABI
// Instruction set, EPF container, and the stack machine that executes it.
// The container never depends on the machine; the machine is the only
// authority on opcode legality.

pub mod epf;
pub mod error;
pub mod inspect;
pub mod isa;
pub mod vm;

pub use epf::Program;
pub use error::{EpfError, VmError};
pub use isa::{Instruction, Opcode, Word};
pub use vm::{Machine, MachineConfig};
