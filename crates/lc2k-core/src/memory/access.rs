//! Address validation for fetch and data accesses.

use crate::FaultCode;

/// Converts a computed effective address into a memory index.
///
/// Effective addresses are computed in 64 bits so `reg + offset` never
/// wraps.
///
/// # Errors
///
/// Returns [`FaultCode::InvalidAddress`] when `address` is negative or does
/// not fit the host's index type.
pub fn validate_address(address: i64) -> Result<usize, FaultCode> {
    usize::try_from(address).map_err(|_| FaultCode::InvalidAddress)
}

/// Checks that growing the stack to hold `stack_index` stays within `limit`
/// words.
///
/// # Errors
///
/// Returns [`FaultCode::StackLimitExceeded`] when `stack_index >= limit`.
pub const fn validate_stack_growth(stack_index: usize, limit: usize) -> Result<(), FaultCode> {
    if stack_index < limit {
        Ok(())
    } else {
        Err(FaultCode::StackLimitExceeded)
    }
}
