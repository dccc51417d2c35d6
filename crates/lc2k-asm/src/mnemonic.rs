//! Mnemonic resolution against the core opcode table.

use lc2k_core::{Opcode, FILL_MNEMONIC};

/// What an opcode field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    /// A machine instruction.
    Instruction(Opcode),
    /// The `.fill` data pseudo-op.
    Fill,
}

impl Mnemonic {
    /// Number of operands the mnemonic takes.
    #[must_use]
    pub const fn operand_count(self) -> usize {
        match self {
            Self::Instruction(opcode) => opcode.operand_count(),
            Self::Fill => 1,
        }
    }

    /// Source spelling of the mnemonic.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Instruction(opcode) => opcode.mnemonic(),
            Self::Fill => FILL_MNEMONIC,
        }
    }
}

/// Resolves an opcode field. Matching is case-sensitive.
#[must_use]
pub fn resolve_mnemonic(name: &str) -> Option<Mnemonic> {
    if name == FILL_MNEMONIC {
        return Some(Mnemonic::Fill);
    }
    Opcode::from_mnemonic(name).map(Mnemonic::Instruction)
}

#[cfg(test)]
mod tests {
    use super::{resolve_mnemonic, Mnemonic};
    use lc2k_core::{Opcode, OPCODE_TABLE};

    #[test]
    fn every_table_entry_resolves() {
        for (name, opcode) in OPCODE_TABLE {
            assert_eq!(resolve_mnemonic(name), Some(Mnemonic::Instruction(*opcode)));
        }
    }

    #[test]
    fn fill_is_a_pseudo_op_with_one_operand() {
        let fill = resolve_mnemonic(".fill").expect(".fill resolves");
        assert_eq!(fill, Mnemonic::Fill);
        assert_eq!(fill.operand_count(), 1);
        assert_eq!(fill.as_str(), ".fill");
    }

    #[test]
    fn unknown_and_wrong_case_are_rejected() {
        assert_eq!(resolve_mnemonic("mov"), None);
        assert_eq!(resolve_mnemonic("HALT"), None);
        assert_eq!(resolve_mnemonic(".FILL"), None);
        assert_eq!(resolve_mnemonic(""), None);
    }

    #[test]
    fn operand_counts_follow_opcode_shape() {
        assert_eq!(Mnemonic::Instruction(Opcode::Lw).operand_count(), 3);
        assert_eq!(Mnemonic::Instruction(Opcode::Jalr).operand_count(), 2);
        assert_eq!(Mnemonic::Instruction(Opcode::Noop).operand_count(), 0);
    }
}
