//! System status and basic configuration

use std::fmt;

use bitflags::bitflags;
use byteorder::{BigEndian, ByteOrder};

use crate::{
    error::{Error, Result},
    packet_size::PacketSize,
};

bitflags! {
    /// Bits of the module status register
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u16 {
        /// Module is executing a command
        const BUSY = 1 << 0;

        /// A matching finger was found
        const PASS = 1 << 1;

        /// The handshake password was verified
        const PASSWORD_VERIFIED = 1 << 2;

        /// The image buffer holds a valid image
        const IMAGE_VALID = 1 << 3;
    }
}

/// System parameters reported by `ReadSysPara`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemParameters {
    /// Status register
    pub status: StatusFlags,

    /// System identifier code (constant 0x0009 on most modules)
    pub system_id: u16,

    /// Number of template slots in the library
    pub library_size: u16,

    /// Matching security level (1-5)
    pub security_level: u16,

    /// Module address
    pub address: u32,

    /// Data packet size
    pub packet_size: PacketSize,

    /// Baud rate in bits per second
    pub baud_rate: u32,
}

impl SystemParameters {
    /// Encoded size in bytes
    pub const SIZE: usize = 16;

    /// Parse the 16-byte parameter list
    ///
    /// Word sizes per the datasheet: five u16 fields, the u32 address, and a
    /// u16 baud multiplier of 9600.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(Error::Parse(format!(
                "system parameters need {} bytes, got {}",
                Self::SIZE,
                bytes.len()
            )));
        }

        Ok(Self {
            status: StatusFlags::from_bits_retain(BigEndian::read_u16(&bytes[0..2])),
            system_id: BigEndian::read_u16(&bytes[2..4]),
            library_size: BigEndian::read_u16(&bytes[4..6]),
            security_level: BigEndian::read_u16(&bytes[6..8]),
            address: BigEndian::read_u32(&bytes[8..12]),
            packet_size: PacketSize::from_code(BigEndian::read_u16(&bytes[12..14]))?,
            baud_rate: u32::from(BigEndian::read_u16(&bytes[14..16])) * 9600,
        })
    }

    /// Check if the module is busy
    pub fn is_busy(&self) -> bool {
        self.status.contains(StatusFlags::BUSY)
    }

    /// Check if the image buffer holds a valid image
    pub fn has_valid_image(&self) -> bool {
        self.status.contains(StatusFlags::IMAGE_VALID)
    }
}

impl fmt::Display for SystemParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Sensor[address: 0x{:08X}, slots: {}, security: {}, packets: {}, baud: {}]",
            self.address, self.library_size, self.security_level, self.packet_size, self.baud_rate
        )
    }
}
