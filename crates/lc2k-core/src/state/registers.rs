use crate::codec::MachineWord;

/// Number of general-purpose registers (`r0..r7`).
pub const REGISTER_COUNT: usize = 8;

/// The eight 32-bit signed general-purpose registers.
///
/// Register 0 is an ordinary register: writes to it persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct RegisterFile {
    regs: [MachineWord; REGISTER_COUNT],
}

impl RegisterFile {
    /// Creates a register file with explicit initial values.
    #[must_use]
    pub const fn with_values(regs: [MachineWord; REGISTER_COUNT]) -> Self {
        Self { regs }
    }

    /// Reads a register. `index` is a decoded 3-bit field.
    #[must_use]
    pub const fn get(&self, index: u8) -> MachineWord {
        self.regs[index as usize]
    }

    /// Writes a register. `index` is a decoded 3-bit field.
    pub const fn set(&mut self, index: u8, value: MachineWord) {
        self.regs[index as usize] = value;
    }

    /// All register values in index order.
    #[must_use]
    pub const fn values(&self) -> &[MachineWord; REGISTER_COUNT] {
        &self.regs
    }
}

impl From<[MachineWord; REGISTER_COUNT]> for RegisterFile {
    fn from(regs: [MachineWord; REGISTER_COUNT]) -> Self {
        Self::with_values(regs)
    }
}

#[cfg(test)]
mod tests {
    use super::{RegisterFile, REGISTER_COUNT};

    #[test]
    fn default_is_all_zero() {
        let regs = RegisterFile::default();
        assert_eq!(regs.values(), &[0; REGISTER_COUNT]);
    }

    #[test]
    fn register_zero_is_writable() {
        let mut regs = RegisterFile::default();
        regs.set(0, 42);
        assert_eq!(regs.get(0), 42);
    }

    #[test]
    fn with_values_preserves_order() {
        let regs = RegisterFile::from([0, 1, 2, 3, 4, 5, 6, 7]);
        for index in 0u8..8 {
            assert_eq!(regs.get(index), i32::from(index));
        }
    }
}
