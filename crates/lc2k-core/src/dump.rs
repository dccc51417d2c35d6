//! Plain-text rendering of machine state.

use std::fmt;

use crate::MachineState;

/// Display adapter printing registers, then program words, then stack words.
///
/// Each line is `label | value`: registers are labelled `r0`..`r7`, memory
/// words by absolute address.
#[derive(Debug, Clone, Copy)]
pub struct StateDump<'a>(pub &'a MachineState);

impl fmt::Display for StateDump<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0;
        for (index, value) in state.registers.values().iter().enumerate() {
            writeln!(f, "r{index} | {value}")?;
        }

        let program = state.memory.program();
        let stack = state.memory.stack();
        for (addr, value) in program.iter().chain(stack).enumerate() {
            writeln!(f, "{addr} | {value}")?;
        }
        Ok(())
    }
}

/// Renders the full state dump as a string.
#[must_use]
pub fn render_state_dump(state: &MachineState) -> String {
    StateDump(state).to_string()
}
