//! Architectural CPU state model primitives.

/// Register file storage.
pub mod registers;
/// Running / halted / faulted state machine.
pub mod run_state;

pub use registers::{RegisterFile, REGISTER_COUNT};
pub use run_state::RunState;
