//! Public host-facing API for embedding the simulator.

use crate::codec::MachineWord;
use crate::memory::{Memory, DEFAULT_STACK_LIMIT};
use crate::state::{RegisterFile, RunState, REGISTER_COUNT};
use crate::FaultCode;

/// Default bound on retired instructions per run.
pub const DEFAULT_STEP_LIMIT: u64 = 10_000_000;

/// Top-level immutable configuration for a simulator run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MachineConfig {
    /// Maximum retired instructions before the run loop gives up.
    /// `None` runs until halt or fault.
    pub step_limit: Option<u64>,
    /// Maximum number of words the stack region may grow to.
    pub stack_limit: usize,
    /// Enables trace callback dispatch.
    pub tracing_enabled: bool,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            step_limit: Some(DEFAULT_STEP_LIMIT),
            stack_limit: DEFAULT_STACK_LIMIT,
            tracing_enabled: false,
        }
    }
}

/// Complete machine state: registers, memory, program counter, run state.
///
/// A state is built fresh for every run; there is no way to resume a
/// previous run other than keeping this value.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MachineState {
    /// General-purpose registers.
    pub registers: RegisterFile,
    /// Program image and stack.
    pub memory: Memory,
    /// Address of the next instruction to fetch.
    pub pc: MachineWord,
    /// Current execution state.
    pub run_state: RunState,
    /// Instructions retired since load.
    pub steps: u64,
}

impl MachineState {
    /// Loads a program with all registers zeroed.
    #[must_use]
    pub fn new(program: Vec<MachineWord>) -> Self {
        Self::with_registers(program, [0; REGISTER_COUNT])
    }

    /// Loads a program with explicit initial register values.
    #[must_use]
    pub fn with_registers(
        program: Vec<MachineWord>,
        registers: [MachineWord; REGISTER_COUNT],
    ) -> Self {
        Self {
            registers: RegisterFile::with_values(registers),
            memory: Memory::new(program),
            pc: 0,
            run_state: RunState::Running,
            steps: 0,
        }
    }

    /// Returns `true` after `halt` retired.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        matches!(self.run_state, RunState::Halted)
    }
}

/// Output status from one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    /// Instruction retired; the machine keeps running.
    Retired,
    /// `halt` retired, or the machine was already halted.
    Halted,
    /// A fault was raised now or is latched from an earlier step.
    Fault {
        /// Fault code.
        cause: FaultCode,
        /// Program counter of the faulting instruction.
        pc: MachineWord,
    },
}

/// Why a run loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The machine halted.
    Halted,
    /// The machine faulted.
    Fault {
        /// Fault code.
        cause: FaultCode,
        /// Program counter of the faulting instruction.
        pc: MachineWord,
    },
    /// The configured step limit was reached; the machine is still running.
    StepLimit,
    /// The caller's stop predicate fired between steps.
    Stopped,
}

/// Aggregated outcome of a run loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunOutcome {
    /// Instructions retired during this call.
    pub steps: u64,
    /// Why the loop returned.
    pub stop: StopReason,
}

/// Trace events emitted at step boundaries when tracing is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TraceEvent {
    /// Emitted after fetch, before decode.
    InstructionStart {
        /// Program counter used for this fetch.
        pc: MachineWord,
        /// Raw fetched word.
        word: MachineWord,
    },
    /// Data memory access by `lw` or `sw`.
    MemoryAccess {
        /// Effective address.
        addr: usize,
        /// Value read or written.
        value: MachineWord,
        /// True for writes.
        is_write: bool,
    },
    /// `halt` retired.
    Halted {
        /// Address of the `halt` instruction.
        pc: MachineWord,
    },
    /// A fault was raised.
    FaultRaised {
        /// Fault code.
        cause: FaultCode,
        /// Program counter active when the fault was raised.
        pc: MachineWord,
    },
}

/// Sink for trace events.
pub trait TraceSink {
    /// Records an event in execution order.
    fn on_event(&mut self, event: TraceEvent);
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTrace;

impl TraceSink for NullTrace {
    fn on_event(&mut self, _event: TraceEvent) {}
}

impl TraceSink for Vec<TraceEvent> {
    fn on_event(&mut self, event: TraceEvent) {
        self.push(event);
    }
}
