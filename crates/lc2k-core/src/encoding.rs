/// The eight LC2K opcodes with their assigned 3-bit encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
#[allow(missing_docs)]
pub enum Opcode {
    Add = 0,
    Nor = 1,
    Lw = 2,
    Sw = 3,
    Beq = 4,
    Jalr = 5,
    Halt = 6,
    Noop = 7,
}

/// How an instruction interprets its 16-bit `a2` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum A2Kind {
    /// Destination register index (`0..=7`).
    Register,
    /// Signed 16-bit displacement.
    Offset,
    /// Field is not read and always encodes as zero.
    Unused,
}

/// Single source-of-truth mnemonic table.
///
/// Any mnemonic not present here (other than the `.fill` pseudo-op) is
/// unknown by definition.
pub const OPCODE_TABLE: &[(&str, Opcode)] = &[
    ("add", Opcode::Add),
    ("nor", Opcode::Nor),
    ("lw", Opcode::Lw),
    ("sw", Opcode::Sw),
    ("beq", Opcode::Beq),
    ("jalr", Opcode::Jalr),
    ("halt", Opcode::Halt),
    ("noop", Opcode::Noop),
];

/// Mnemonic of the data pseudo-op.
pub const FILL_MNEMONIC: &str = ".fill";

impl Opcode {
    /// Ordered list of all opcodes.
    pub const ALL: [Self; 8] = [
        Self::Add,
        Self::Nor,
        Self::Lw,
        Self::Sw,
        Self::Beq,
        Self::Jalr,
        Self::Halt,
        Self::Noop,
    ];

    /// Converts a 3-bit opcode field into an opcode.
    #[must_use]
    pub const fn from_u3(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Add),
            1 => Some(Self::Nor),
            2 => Some(Self::Lw),
            3 => Some(Self::Sw),
            4 => Some(Self::Beq),
            5 => Some(Self::Jalr),
            6 => Some(Self::Halt),
            7 => Some(Self::Noop),
            _ => None,
        }
    }

    /// Returns the encoded opcode value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns the assembly mnemonic.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Nor => "nor",
            Self::Lw => "lw",
            Self::Sw => "sw",
            Self::Beq => "beq",
            Self::Jalr => "jalr",
            Self::Halt => "halt",
            Self::Noop => "noop",
        }
    }

    /// Looks up an opcode by its mnemonic. Matching is case-sensitive.
    #[must_use]
    pub fn from_mnemonic(name: &str) -> Option<Self> {
        OPCODE_TABLE
            .iter()
            .find(|(mnemonic, _)| *mnemonic == name)
            .map(|(_, opcode)| *opcode)
    }

    /// Number of source operands the instruction takes.
    #[must_use]
    pub const fn operand_count(self) -> usize {
        match self {
            Self::Add | Self::Nor | Self::Lw | Self::Sw | Self::Beq => 3,
            Self::Jalr => 2,
            Self::Halt | Self::Noop => 0,
        }
    }

    /// Interpretation of the `a2` field for this opcode.
    #[must_use]
    pub const fn a2_kind(self) -> A2Kind {
        match self {
            Self::Add | Self::Nor => A2Kind::Register,
            Self::Lw | Self::Sw | Self::Beq => A2Kind::Offset,
            Self::Jalr | Self::Halt | Self::Noop => A2Kind::Unused,
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mnemonic())
    }
}
