//! Unified memory: a fixed program image followed by a growable stack.

/// Address validation helpers.
pub mod access;
/// Region map for the unified address space.
pub mod map;

pub use access::{validate_address, validate_stack_growth};
pub use map::{decode_memory_region, MemoryRegion};

use crate::codec::MachineWord;
use crate::FaultCode;

/// Default maximum number of stack words.
pub const DEFAULT_STACK_LIMIT: usize = 1 << 20;

/// Program image plus stack region.
///
/// The program region never changes length after load. The stack only
/// grows, by zero-filling up to the highest written index.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Memory {
    program: Vec<MachineWord>,
    stack: Vec<MachineWord>,
}

impl Memory {
    /// Creates memory holding `program` with an empty stack.
    #[must_use]
    pub const fn new(program: Vec<MachineWord>) -> Self {
        Self {
            program,
            stack: Vec::new(),
        }
    }

    /// The fixed code/data region.
    #[must_use]
    pub fn program(&self) -> &[MachineWord] {
        &self.program
    }

    /// The stack region, in address order.
    #[must_use]
    pub fn stack(&self) -> &[MachineWord] {
        &self.stack
    }

    /// Length of the program region (the first stack address).
    #[must_use]
    pub fn program_len(&self) -> usize {
        self.program.len()
    }

    /// Reads a word. Addresses past both regions read as zero.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::InvalidAddress`] for negative addresses.
    pub fn read(&self, address: i64) -> Result<MachineWord, FaultCode> {
        let address = validate_address(address)?;
        let value = match decode_memory_region(address, self.program.len()) {
            (MemoryRegion::Program, index) => self.program[index],
            (MemoryRegion::Stack, index) => self.stack.get(index).copied().unwrap_or(0),
        };
        Ok(value)
    }

    /// Writes a word, growing the stack with zeros if needed.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::InvalidAddress`] for negative addresses and
    /// [`FaultCode::StackLimitExceeded`] when the stack would grow past
    /// `stack_limit` words.
    pub fn write(
        &mut self,
        address: i64,
        value: MachineWord,
        stack_limit: usize,
    ) -> Result<(), FaultCode> {
        let address = validate_address(address)?;
        match decode_memory_region(address, self.program.len()) {
            (MemoryRegion::Program, index) => self.program[index] = value,
            (MemoryRegion::Stack, index) => {
                if index >= self.stack.len() {
                    validate_stack_growth(index, stack_limit)?;
                    self.stack.resize(index + 1, 0);
                }
                self.stack[index] = value;
            }
        }
        Ok(())
    }
}
