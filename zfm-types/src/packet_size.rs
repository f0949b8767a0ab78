//! Data packet size setting

use std::fmt;

use crate::error::{Error, Result};

/// Maximum payload of a bulk data packet, as configured on the module
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum PacketSize {
    Bytes32,
    Bytes64,
    #[default]
    Bytes128,
    Bytes256,
}

impl PacketSize {
    /// Payload size in bytes
    pub fn bytes(self) -> usize {
        match self {
            Self::Bytes32 => 32,
            Self::Bytes64 => 64,
            Self::Bytes128 => 128,
            Self::Bytes256 => 256,
        }
    }

    /// Size code as reported in the system parameters (0-3)
    pub fn code(self) -> u16 {
        match self {
            Self::Bytes32 => 0,
            Self::Bytes64 => 1,
            Self::Bytes128 => 2,
            Self::Bytes256 => 3,
        }
    }

    /// Decode a size code from the system parameters
    pub fn from_code(code: u16) -> Result<Self> {
        match code {
            0 => Ok(Self::Bytes32),
            1 => Ok(Self::Bytes64),
            2 => Ok(Self::Bytes128),
            3 => Ok(Self::Bytes256),
            other => Err(Error::Parse(format!("invalid packet size code {}", other))),
        }
    }
}

impl TryFrom<usize> for PacketSize {
    type Error = Error;

    fn try_from(bytes: usize) -> Result<Self> {
        match bytes {
            32 => Ok(Self::Bytes32),
            64 => Ok(Self::Bytes64),
            128 => Ok(Self::Bytes128),
            256 => Ok(Self::Bytes256),
            other => Err(Error::Validation(format!(
                "packet size must be 32, 64, 128 or 256 bytes, got {}",
                other
            ))),
        }
    }
}

impl fmt::Display for PacketSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bytes", self.bytes())
    }
}
