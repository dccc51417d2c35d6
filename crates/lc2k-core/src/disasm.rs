//! Instruction disassembly for the LC2K ISA.
//!
//! Output uses assembler source syntax, so a disassembled word can be pasted
//! back into a source file.

use crate::codec::{decode, MachineWord};
use crate::encoding::{A2Kind, FILL_MNEMONIC};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single disassembled memory word.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DisassemblyRow {
    /// Address of the word.
    pub addr: usize,
    /// Raw word.
    pub word: MachineWord,
    /// The instruction mnemonic, or `.fill` for data.
    pub mnemonic: String,
    /// Tab-separated operands.
    pub operands: String,
    /// Whether the word failed to decode as an instruction.
    pub is_illegal: bool,
}

impl DisassemblyRow {
    /// Disassembles `word` located at `addr`.
    #[must_use]
    pub fn new(addr: usize, word: MachineWord) -> Self {
        let Ok(instr) = decode(word) else {
            return Self {
                addr,
                word,
                mnemonic: FILL_MNEMONIC.to_owned(),
                operands: word.to_string(),
                is_illegal: true,
            };
        };

        let opcode = instr.opcode();
        let operands = match (opcode.operand_count(), opcode.a2_kind()) {
            (0, _) => String::new(),
            (_, A2Kind::Unused) => format!("{}\t{}", instr.a0(), instr.a1()),
            _ => format!("{}\t{}\t{}", instr.a0(), instr.a1(), instr.a2()),
        };

        Self {
            addr,
            word,
            mnemonic: opcode.mnemonic().to_owned(),
            operands,
            is_illegal: false,
        }
    }

    /// Source-syntax text of the row (`mnemonic\toperands`).
    #[must_use]
    pub fn text(&self) -> String {
        if self.operands.is_empty() {
            self.mnemonic.clone()
        } else {
            format!("{}\t{}", self.mnemonic, self.operands)
        }
    }
}

/// Renders one word as source text.
///
/// Words that do not decode (including data such as negative `.fill`
/// values) render as `.fill\t<value>`.
#[must_use]
pub fn disassemble_word(word: MachineWord) -> String {
    DisassemblyRow::new(0, word).text()
}

/// Disassembles every word of a program image in address order.
#[must_use]
pub fn disassemble_program(words: &[MachineWord]) -> Vec<DisassemblyRow> {
    words
        .iter()
        .enumerate()
        .map(|(addr, &word)| DisassemblyRow::new(addr, word))
        .collect()
}
