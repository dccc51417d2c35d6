//! Instruction word codec for the LC2K ISA.
//!
//! Words are laid out as `opcode<<23 | a0<<19 | a1<<16 | a2`, with `a2` in the
//! low 16 bits (two's complement when negative). The bit positions are part of
//! the interchange contract and must not change.

use thiserror::Error;

use crate::encoding::{A2Kind, Opcode};
use crate::fault::FaultCode;

/// A machine word as stored in memory and registers.
pub type MachineWord = i32;

/// Bit offset of the opcode field.
pub const OPCODE_SHIFT: u32 = 23;
/// Bit offset of the `a0` register field.
pub const A0_SHIFT: u32 = 19;
/// Bit offset of the `a1` register field.
pub const A1_SHIFT: u32 = 16;
/// Mask for 3-bit fields after shifting.
pub const FIELD3_MASK: i32 = 0b111;
/// Mask for the 16-bit `a2` field.
pub const A2_MASK: i32 = 0xFFFF;
/// Exclusive upper bound of encodable instruction words.
pub const WORD_LIMIT: i32 = 1 << 26;
/// Highest register index.
pub const MAX_REGISTER: i32 = 7;

/// A field value that does not fit its slot in the instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum FieldError {
    /// Register operand outside `0..=7`.
    #[error("register {0} out of range 0-7")]
    RegisterOutOfRange(i32),
    /// Displacement outside the signed 16-bit range.
    #[error("offset {0} does not fit in a signed 16-bit field")]
    OffsetOutOfRange(i32),
    /// Non-zero value given for a field the opcode never reads.
    #[error("{opcode} does not take a third operand (got {value})")]
    UnusedField {
        /// Opcode being encoded.
        opcode: Opcode,
        /// Rejected value.
        value: i32,
    },
}

/// A decoded instruction. Fields are validated at construction, so every
/// value of this type encodes losslessly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Instruction {
    opcode: Opcode,
    a0: u8,
    a1: u8,
    a2: i32,
}

impl Instruction {
    /// Builds an instruction, checking every field against its slot.
    ///
    /// # Errors
    ///
    /// Returns a [`FieldError`] when a register is outside `0..=7`, an offset
    /// does not fit in 16 signed bits, or an unused `a2` is non-zero.
    pub fn new(opcode: Opcode, a0: i32, a1: i32, a2: i32) -> Result<Self, FieldError> {
        let a0 = register_field(a0)?;
        let a1 = register_field(a1)?;
        match opcode.a2_kind() {
            A2Kind::Register => {
                register_field(a2)?;
            }
            A2Kind::Offset => {
                if i16::try_from(a2).is_err() {
                    return Err(FieldError::OffsetOutOfRange(a2));
                }
            }
            A2Kind::Unused => {
                if a2 != 0 {
                    return Err(FieldError::UnusedField { opcode, value: a2 });
                }
            }
        }
        Ok(Self { opcode, a0, a1, a2 })
    }

    /// Shorthand for an instruction without operands (`halt`, `noop`).
    #[must_use]
    pub const fn bare(opcode: Opcode) -> Self {
        Self {
            opcode,
            a0: 0,
            a1: 0,
            a2: 0,
        }
    }

    /// The opcode.
    #[must_use]
    pub const fn opcode(self) -> Opcode {
        self.opcode
    }

    /// First register field.
    #[must_use]
    pub const fn a0(self) -> u8 {
        self.a0
    }

    /// Second register field.
    #[must_use]
    pub const fn a1(self) -> u8 {
        self.a1
    }

    /// Third field: a register index, a signed displacement, or zero.
    #[must_use]
    pub const fn a2(self) -> i32 {
        self.a2
    }

    /// Packs this instruction into a machine word.
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn encode(self) -> MachineWord {
        ((self.opcode.as_u8() as i32) << OPCODE_SHIFT)
            | ((self.a0 as i32) << A0_SHIFT)
            | ((self.a1 as i32) << A1_SHIFT)
            | (self.a2 & A2_MASK)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
const fn register_field(value: i32) -> Result<u8, FieldError> {
    if value < 0 || value > MAX_REGISTER {
        Err(FieldError::RegisterOutOfRange(value))
    } else {
        Ok(value as u8)
    }
}

/// Encodes an instruction into a machine word.
#[must_use]
pub const fn encode(instruction: Instruction) -> MachineWord {
    instruction.encode()
}

/// Encodes a `.fill` literal. The value is stored as-is.
#[must_use]
pub const fn encode_fill(value: i32) -> MachineWord {
    value
}

/// Decodes a machine word into an instruction.
///
/// # Errors
///
/// Returns [`FaultCode::IllegalEncoding`] when the word lies outside
/// `0..2^26` or an `add`/`nor` destination register exceeds 7.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn decode(word: MachineWord) -> Result<Instruction, FaultCode> {
    if !(0..WORD_LIMIT).contains(&word) {
        return Err(FaultCode::IllegalEncoding);
    }

    let opcode = Opcode::from_u3(((word >> OPCODE_SHIFT) & FIELD3_MASK) as u8)
        .ok_or(FaultCode::IllegalEncoding)?;
    let a0 = ((word >> A0_SHIFT) & FIELD3_MASK) as u8;
    let a1 = ((word >> A1_SHIFT) & FIELD3_MASK) as u8;
    let raw = word & A2_MASK;

    let a2 = match opcode.a2_kind() {
        A2Kind::Register => {
            if raw > MAX_REGISTER {
                return Err(FaultCode::IllegalEncoding);
            }
            raw
        }
        A2Kind::Offset => sign_extend_16(raw),
        A2Kind::Unused => 0,
    };

    Ok(Instruction { opcode, a0, a1, a2 })
}

/// Reinterprets the low 16 bits of `raw` as a signed value.
#[must_use]
pub const fn sign_extend_16(raw: i32) -> i32 {
    let low = raw & A2_MASK;
    if low >= 0x8000 {
        low - 0x1_0000
    } else {
        low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instr(opcode: Opcode, a0: i32, a1: i32, a2: i32) -> Instruction {
        Instruction::new(opcode, a0, a1, a2).expect("fields in range")
    }

    #[test]
    fn encodes_fields_at_fixed_offsets() {
        let word = instr(Opcode::Add, 1, 2, 3).encode();
        assert_eq!(word, (1 << 19) | (2 << 16) | 3);

        let word = instr(Opcode::Lw, 0, 1, 5).encode();
        assert_eq!(word, (2 << 23) | (1 << 16) | 5);

        assert_eq!(Instruction::bare(Opcode::Halt).encode(), 6 << 23);
        assert_eq!(Instruction::bare(Opcode::Noop).encode(), 7 << 23);
    }

    #[test]
    fn negative_offset_is_twos_complement() {
        let word = instr(Opcode::Beq, 0, 0, -1).encode();
        assert_eq!(word & A2_MASK, 0xFFFF);
        assert_eq!(word >> OPCODE_SHIFT, 4);

        let decoded = decode(word).expect("valid word");
        assert_eq!(decoded.a2(), -1);
    }

    #[test]
    fn offset_extremes_roundtrip() {
        for offset in [i32::from(i16::MIN), -32767, -1, 0, 1, 32767] {
            let original = instr(Opcode::Sw, 3, 4, offset);
            assert_eq!(decode(original.encode()), Ok(original));
        }
    }

    #[test]
    fn fill_is_stored_literally() {
        assert_eq!(encode_fill(-42), -42);
        assert_eq!(encode_fill(32768), 32768);
    }

    #[test]
    fn rejects_out_of_range_fields() {
        assert_eq!(
            Instruction::new(Opcode::Add, 8, 0, 0),
            Err(FieldError::RegisterOutOfRange(8))
        );
        assert_eq!(
            Instruction::new(Opcode::Nor, 0, 0, -1),
            Err(FieldError::RegisterOutOfRange(-1))
        );
        assert_eq!(
            Instruction::new(Opcode::Beq, 0, 0, 32768),
            Err(FieldError::OffsetOutOfRange(32768))
        );
        assert_eq!(
            Instruction::new(Opcode::Jalr, 1, 2, 4),
            Err(FieldError::UnusedField {
                opcode: Opcode::Jalr,
                value: 4
            })
        );
    }

    #[test]
    fn decode_rejects_words_outside_encodable_range() {
        assert_eq!(decode(-1), Err(FaultCode::IllegalEncoding));
        assert_eq!(decode(WORD_LIMIT), Err(FaultCode::IllegalEncoding));
        assert!(decode(WORD_LIMIT - 1).is_ok());
    }

    #[test]
    fn decode_rejects_register_a2_above_seven() {
        assert_eq!(decode(8), Err(FaultCode::IllegalEncoding));
        assert_eq!(decode(7), Ok(instr(Opcode::Add, 0, 0, 7)));
    }

    #[test]
    fn decode_ignores_unused_a2_bits() {
        let word = (5 << 23) | (1 << 19) | (2 << 16) | 0x1234;
        assert_eq!(decode(word), Ok(instr(Opcode::Jalr, 1, 2, 0)));
    }

    #[test]
    fn sign_extension_boundaries() {
        assert_eq!(sign_extend_16(0x7FFF), 32767);
        assert_eq!(sign_extend_16(0x8000), -32768);
        assert_eq!(sign_extend_16(0xFFFF), -1);
    }
}
