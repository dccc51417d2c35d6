use thiserror::Error;

/// Fault classes used to separate codec failures from runtime anomalies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// A fetched word did not decode to a valid instruction.
    Encoding,
    /// Address or resource anomaly detected while executing.
    Runtime,
}

/// Machine faults. Any fault latches the machine and ends the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum FaultCode {
    /// Word outside the encodable range, or a register field out of range.
    #[error("illegal instruction encoding")]
    IllegalEncoding = 0x01,
    /// Fetch or data access at a negative or overflowing address.
    #[error("memory access at an invalid address")]
    InvalidAddress = 0x02,
    /// A store would grow the stack region past the configured limit.
    #[error("stack region grew past its configured limit")]
    StackLimitExceeded = 0x03,
}

impl FaultCode {
    /// Converts a fault code to its stable numeric value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a stable numeric value back into a fault code.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::IllegalEncoding),
            0x02 => Some(Self::InvalidAddress),
            0x03 => Some(Self::StackLimitExceeded),
            _ => None,
        }
    }

    /// Returns the fault class for this fault code.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::IllegalEncoding => FaultClass::Encoding,
            Self::InvalidAddress | Self::StackLimitExceeded => FaultClass::Runtime,
        }
    }
}
