use crate::FaultCode;

/// Execution-state machine for the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Ready to execute the next instruction.
    #[default]
    Running,
    /// `halt` retired; no further steps execute.
    Halted,
    /// A fault is latched and no further progress is possible without reset.
    Faulted(FaultCode),
}

impl RunState {
    /// Returns the latched fault, if any.
    #[must_use]
    pub const fn latched_fault(self) -> Option<FaultCode> {
        match self {
            Self::Faulted(cause) => Some(cause),
            Self::Running | Self::Halted => None,
        }
    }

    /// Returns `true` once the machine can no longer make progress.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}
