use crate::codec::MachineWord;
use crate::FaultCode;

/// Computes `base + offset` as a data address without wrapping.
#[must_use]
pub fn compute_effective_address(base: MachineWord, offset: i32) -> i64 {
    i64::from(base) + i64::from(offset)
}

/// Computes the program counter after a taken or untaken branch.
///
/// `displacement` is relative to the instruction after the branch.
///
/// # Errors
///
/// Returns [`FaultCode::InvalidAddress`] when the target does not fit in a
/// machine word.
pub fn compute_next_pc(pc: MachineWord, displacement: i32) -> Result<MachineWord, FaultCode> {
    let target = i64::from(pc) + 1 + i64::from(displacement);
    MachineWord::try_from(target).map_err(|_| FaultCode::InvalidAddress)
}
