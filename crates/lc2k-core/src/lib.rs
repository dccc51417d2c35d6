//! Core machine model for the LC2K instruction set.
//!
//! Holds the opcode table, the word codec, and the simulator. The simulator
//! has eight registers and a memory made of a program image followed by a
//! growable stack. It also provides state dumps and disassembly.

/// Opcode table and per-opcode operand shapes.
pub mod encoding;
pub use encoding::{A2Kind, Opcode, FILL_MNEMONIC, OPCODE_TABLE};

/// Instruction word packing and unpacking.
pub mod codec;
pub use codec::{
    decode, encode, encode_fill, sign_extend_16, FieldError, Instruction, MachineWord,
    WORD_LIMIT,
};

/// Fault taxonomy for simulator runs.
pub mod fault;
pub use fault::{FaultClass, FaultCode};

/// Architectural register and run-state model.
pub mod state;
pub use state::{RegisterFile, RunState, REGISTER_COUNT};

/// Program image plus stack region.
pub mod memory;
pub use memory::{Memory, MemoryRegion, DEFAULT_STACK_LIMIT};

/// Public host-facing API types.
pub mod api;
pub use api::{
    MachineConfig, MachineState, NullTrace, RunOutcome, StepOutcome, StopReason, TraceEvent,
    TraceSink, DEFAULT_STEP_LIMIT,
};

/// Instruction execution pipeline.
pub mod execute;
pub use execute::{execute_instruction, run, run_until, step_one, Retirement};

/// Text rendering of machine state.
pub mod dump;
pub use dump::{render_state_dump, StateDump};

/// Word disassembly in source syntax.
pub mod disasm;
pub use disasm::{disassemble_program, disassemble_word, DisassemblyRow};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
