//! Fetch-decode-execute pipeline.
//!
//! A step fetches `memory[pc]`, decodes it, executes it and advances the
//! program counter. Faults are precise: a faulting instruction leaves
//! registers, memory and `pc` untouched and latches the fault.

mod helpers;

pub use helpers::{compute_effective_address, compute_next_pc};

use crate::codec::{decode, Instruction, MachineWord};
use crate::encoding::Opcode;
use crate::{
    FaultCode, MachineConfig, MachineState, RunOutcome, RunState, StepOutcome, StopReason,
    TraceEvent, TraceSink,
};

/// Effect of one retired instruction on control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retirement {
    /// Program counter after the instruction.
    pub next_pc: MachineWord,
    /// Whether the instruction was `halt`.
    pub halted: bool,
}

/// Executes one decoded instruction against the state.
///
/// On success returns the control-flow effect; the caller commits `pc`.
///
/// # Errors
///
/// Returns the fault raised by a data access or an out-of-range branch
/// target. No side effects are applied when an error is returned.
pub fn execute_instruction(
    instr: Instruction,
    state: &mut MachineState,
    config: &MachineConfig,
    trace: &mut dyn TraceSink,
) -> Result<Retirement, FaultCode> {
    let pc = state.pc;
    let regs = &mut state.registers;
    let mut next_pc = compute_next_pc(pc, 0)?;
    let mut halted = false;

    match instr.opcode() {
        Opcode::Add => {
            let sum = regs.get(instr.a0()).wrapping_add(regs.get(instr.a1()));
            regs.set(a2_register(instr), sum);
        }
        Opcode::Nor => {
            let nor = !(regs.get(instr.a0()) | regs.get(instr.a1()));
            regs.set(a2_register(instr), nor);
        }
        Opcode::Lw => {
            let addr = compute_effective_address(regs.get(instr.a0()), instr.a2());
            let value = state.memory.read(addr)?;
            emit_memory_access(config, trace, addr, value, false);
            regs.set(instr.a1(), value);
        }
        Opcode::Sw => {
            let addr = compute_effective_address(regs.get(instr.a0()), instr.a2());
            let value = regs.get(instr.a1());
            state.memory.write(addr, value, config.stack_limit)?;
            emit_memory_access(config, trace, addr, value, true);
        }
        Opcode::Beq => {
            if regs.get(instr.a0()) == regs.get(instr.a1()) {
                next_pc = compute_next_pc(pc, instr.a2())?;
            }
        }
        Opcode::Jalr => {
            // Link is written before the target is read, so `jalr r r`
            // falls through to the next instruction.
            regs.set(instr.a1(), next_pc);
            next_pc = regs.get(instr.a0());
        }
        Opcode::Halt => halted = true,
        Opcode::Noop => {}
    }

    Ok(Retirement { next_pc, halted })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const fn a2_register(instr: Instruction) -> u8 {
    // Decode guarantees `a2` is a register index for add/nor.
    instr.a2() as u8
}

fn emit(config: &MachineConfig, trace: &mut dyn TraceSink, event: TraceEvent) {
    if config.tracing_enabled {
        trace.on_event(event);
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn emit_memory_access(
    config: &MachineConfig,
    trace: &mut dyn TraceSink,
    addr: i64,
    value: MachineWord,
    is_write: bool,
) {
    // Only called after a successful access, so `addr` is non-negative.
    emit(
        config,
        trace,
        TraceEvent::MemoryAccess {
            addr: addr as usize,
            value,
            is_write,
        },
    );
}

fn latch_fault(
    state: &mut MachineState,
    config: &MachineConfig,
    trace: &mut dyn TraceSink,
    cause: FaultCode,
) -> StepOutcome {
    let pc = state.pc;
    state.run_state = RunState::Faulted(cause);
    emit(config, trace, TraceEvent::FaultRaised { cause, pc });
    StepOutcome::Fault { cause, pc }
}

/// Executes exactly one instruction.
///
/// A halted or faulted machine does not advance; the latched outcome is
/// returned again.
pub fn step_one(
    state: &mut MachineState,
    config: &MachineConfig,
    trace: &mut dyn TraceSink,
) -> StepOutcome {
    match state.run_state {
        RunState::Halted => return StepOutcome::Halted,
        RunState::Faulted(cause) => {
            return StepOutcome::Fault {
                cause,
                pc: state.pc,
            }
        }
        RunState::Running => {}
    }

    let pc = state.pc;
    let word = match state.memory.read(i64::from(pc)) {
        Ok(word) => word,
        Err(cause) => return latch_fault(state, config, trace, cause),
    };
    emit(config, trace, TraceEvent::InstructionStart { pc, word });

    let instr = match decode(word) {
        Ok(instr) => instr,
        Err(cause) => return latch_fault(state, config, trace, cause),
    };

    match execute_instruction(instr, state, config, trace) {
        Ok(Retirement { next_pc, halted }) => {
            state.pc = next_pc;
            state.steps += 1;
            if halted {
                state.run_state = RunState::Halted;
                emit(config, trace, TraceEvent::Halted { pc });
                StepOutcome::Halted
            } else {
                StepOutcome::Retired
            }
        }
        Err(cause) => latch_fault(state, config, trace, cause),
    }
}

/// Runs until halt, fault, or the configured step limit.
pub fn run(
    state: &mut MachineState,
    config: &MachineConfig,
    trace: &mut dyn TraceSink,
) -> RunOutcome {
    run_until(state, config, trace, |_| false)
}

/// Runs like [`run`], additionally polling `stop` after every retired
/// instruction.
///
/// Breakpoints and cancellation are expressed through `stop`. The step
/// limit counts every instruction retired since load, so repeated calls
/// share one budget.
pub fn run_until<F>(
    state: &mut MachineState,
    config: &MachineConfig,
    trace: &mut dyn TraceSink,
    mut stop: F,
) -> RunOutcome
where
    F: FnMut(&MachineState) -> bool,
{
    let start = state.steps;
    let retired = |state: &MachineState| state.steps - start;

    loop {
        if state.run_state == RunState::Running
            && config.step_limit.is_some_and(|limit| state.steps >= limit)
        {
            return RunOutcome {
                steps: retired(state),
                stop: StopReason::StepLimit,
            };
        }

        match step_one(state, config, trace) {
            StepOutcome::Retired => {
                if stop(state) {
                    return RunOutcome {
                        steps: retired(state),
                        stop: StopReason::Stopped,
                    };
                }
            }
            StepOutcome::Halted => {
                return RunOutcome {
                    steps: retired(state),
                    stop: StopReason::Halted,
                };
            }
            StepOutcome::Fault { cause, pc } => {
                return RunOutcome {
                    steps: retired(state),
                    stop: StopReason::Fault { cause, pc },
                };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode_fill;
    use crate::NullTrace;

    fn word(opcode: Opcode, a0: i32, a1: i32, a2: i32) -> MachineWord {
        Instruction::new(opcode, a0, a1, a2)
            .expect("fields in range")
            .encode()
    }

    fn halt() -> MachineWord {
        Instruction::bare(Opcode::Halt).encode()
    }

    fn run_program(program: Vec<MachineWord>, regs: [i32; 8]) -> (MachineState, RunOutcome) {
        let mut state = MachineState::with_registers(program, regs);
        let outcome = run(&mut state, &MachineConfig::default(), &mut NullTrace);
        (state, outcome)
    }

    #[test]
    fn add_writes_destination() {
        let (state, outcome) = run_program(
            vec![word(Opcode::Add, 0, 1, 2), halt()],
            [0, 1, 2, 3, 4, 5, 6, 7],
        );
        assert_eq!(outcome.stop, StopReason::Halted);
        assert_eq!(state.registers.get(2), 1);
        assert_eq!(outcome.steps, 2);
    }

    #[test]
    fn add_wraps_on_overflow() {
        let (state, _) = run_program(
            vec![word(Opcode::Add, 1, 2, 3), halt()],
            [0, i32::MAX, 1, 0, 0, 0, 0, 0],
        );
        assert_eq!(state.registers.get(3), i32::MIN);
    }

    #[test]
    fn nor_is_bitwise_over_full_width() {
        let (state, _) = run_program(
            vec![word(Opcode::Nor, 1, 2, 3), halt()],
            [0, 0b1010, 0b0101, 0, 0, 0, 0, 0],
        );
        assert_eq!(state.registers.get(3), !0b1111);

        let (state, _) = run_program(vec![word(Opcode::Nor, 0, 0, 1), halt()], [0; 8]);
        assert_eq!(state.registers.get(1), -1);
    }

    #[test]
    fn lw_and_sw_use_signed_displacement() {
        let program = vec![
            word(Opcode::Lw, 0, 1, 4),  // r1 = mem[4]
            word(Opcode::Sw, 2, 1, -1), // mem[r2 - 1] = r1
            word(Opcode::Lw, 2, 3, -1), // r3 = mem[r2 - 1]
            halt(),
            encode_fill(1234),
        ];
        let (state, outcome) = run_program(program, [0, 0, 20, 0, 0, 0, 0, 0]);
        assert_eq!(outcome.stop, StopReason::Halted);
        assert_eq!(state.registers.get(1), 1234);
        assert_eq!(state.registers.get(3), 1234);
        assert_eq!(state.memory.read(19), Ok(1234));
        assert_eq!(state.memory.stack().len(), 15);
    }

    #[test]
    fn beq_taken_skips_relative_to_next_instruction() {
        let program = vec![
            word(Opcode::Beq, 0, 0, 1),
            word(Opcode::Add, 1, 1, 1),
            halt(),
        ];
        let (state, _) = run_program(program, [0, 5, 0, 0, 0, 0, 0, 0]);
        assert_eq!(state.registers.get(1), 5);
        assert_eq!(state.pc, 3);
    }

    #[test]
    fn beq_not_taken_falls_through() {
        let program = vec![
            word(Opcode::Beq, 0, 1, 1),
            word(Opcode::Add, 1, 1, 1),
            halt(),
        ];
        let (state, _) = run_program(program, [0, 5, 0, 0, 0, 0, 0, 0]);
        assert_eq!(state.registers.get(1), 10);
    }

    #[test]
    fn jalr_links_and_jumps() {
        let program = vec![
            word(Opcode::Jalr, 1, 7, 0),
            halt(),
            word(Opcode::Add, 2, 2, 2),
            halt(),
        ];
        let (state, _) = run_program(program, [0, 2, 3, 0, 0, 0, 0, 0]);
        assert_eq!(state.registers.get(7), 1);
        assert_eq!(state.registers.get(2), 6);
        assert_eq!(state.pc, 4);
    }

    #[test]
    fn jalr_same_register_falls_through() {
        let program = vec![word(Opcode::Jalr, 3, 3, 0), halt()];
        let (state, outcome) = run_program(program, [0, 0, 0, 9, 0, 0, 0, 0]);
        assert_eq!(outcome.stop, StopReason::Halted);
        assert_eq!(state.registers.get(3), 1);
    }

    #[test]
    fn halt_still_advances_pc_and_latches() {
        let mut state = MachineState::new(vec![halt(), halt()]);
        let config = MachineConfig::default();
        assert_eq!(step_one(&mut state, &config, &mut NullTrace), StepOutcome::Halted);
        assert_eq!(state.pc, 1);
        assert_eq!(step_one(&mut state, &config, &mut NullTrace), StepOutcome::Halted);
        assert_eq!(state.pc, 1);
        assert_eq!(state.steps, 1);
    }

    #[test]
    fn illegal_word_faults_precisely() {
        let mut state = MachineState::new(vec![word(Opcode::Noop, 0, 0, 0), -1]);
        let outcome = run(&mut state, &MachineConfig::default(), &mut NullTrace);
        assert_eq!(
            outcome.stop,
            StopReason::Fault {
                cause: FaultCode::IllegalEncoding,
                pc: 1
            }
        );
        assert_eq!(state.pc, 1);
        assert_eq!(state.run_state, RunState::Faulted(FaultCode::IllegalEncoding));
    }

    #[test]
    fn negative_data_address_faults_without_side_effects() {
        let mut state = MachineState::new(vec![word(Opcode::Lw, 0, 1, -1), halt()]);
        let outcome = run(&mut state, &MachineConfig::default(), &mut NullTrace);
        assert!(matches!(
            outcome.stop,
            StopReason::Fault {
                cause: FaultCode::InvalidAddress,
                pc: 0
            }
        ));
        assert_eq!(state.registers.get(1), 0);
        assert_eq!(state.pc, 0);
    }

    #[test]
    fn jump_to_negative_address_faults_on_fetch() {
        let program = vec![word(Opcode::Jalr, 1, 2, 0)];
        let mut state = MachineState::with_registers(program, [0, -4, 0, 0, 0, 0, 0, 0]);
        let outcome = run(&mut state, &MachineConfig::default(), &mut NullTrace);
        assert_eq!(
            outcome.stop,
            StopReason::Fault {
                cause: FaultCode::InvalidAddress,
                pc: -4
            }
        );
    }

    #[test]
    fn step_limit_bounds_program_without_halt() {
        let mut state = MachineState::new(vec![word(Opcode::Beq, 0, 0, -1)]);
        let config = MachineConfig {
            step_limit: Some(100),
            ..MachineConfig::default()
        };
        let outcome = run(&mut state, &config, &mut NullTrace);
        assert_eq!(outcome.stop, StopReason::StepLimit);
        assert_eq!(outcome.steps, 100);
        assert_eq!(state.run_state, RunState::Running);
    }

    #[test]
    fn stop_predicate_is_polled_between_steps() {
        let program = vec![
            word(Opcode::Noop, 0, 0, 0),
            word(Opcode::Noop, 0, 0, 0),
            word(Opcode::Noop, 0, 0, 0),
            halt(),
        ];
        let mut state = MachineState::new(program);
        let config = MachineConfig::default();
        let outcome = run_until(&mut state, &config, &mut NullTrace, |s| s.pc == 2);
        assert_eq!(outcome.stop, StopReason::Stopped);
        assert_eq!(outcome.steps, 2);

        let outcome = run_until(&mut state, &config, &mut NullTrace, |s| s.pc == 2);
        assert_eq!(outcome.stop, StopReason::Halted);
        assert_eq!(outcome.steps, 2);
    }

    #[test]
    fn trace_events_follow_execution_order() {
        let program = vec![word(Opcode::Sw, 0, 1, 3), halt()];
        let mut state = MachineState::with_registers(program, [0, 8, 0, 0, 0, 0, 0, 0]);
        let config = MachineConfig {
            tracing_enabled: true,
            ..MachineConfig::default()
        };
        let mut events = Vec::new();
        run(&mut state, &config, &mut events);

        assert_eq!(
            events,
            vec![
                TraceEvent::InstructionStart {
                    pc: 0,
                    word: word(Opcode::Sw, 0, 1, 3)
                },
                TraceEvent::MemoryAccess {
                    addr: 3,
                    value: 8,
                    is_write: true
                },
                TraceEvent::InstructionStart { pc: 1, word: halt() },
                TraceEvent::Halted { pc: 1 },
            ]
        );
    }

    #[test]
    fn tracing_disabled_emits_nothing() {
        let mut state = MachineState::new(vec![halt()]);
        let mut events = Vec::new();
        run(&mut state, &MachineConfig::default(), &mut events);
        assert!(events.is_empty());
    }
}
