//! ZFM protocol packet structure and encoding/decoding

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

use crate::{
    checksum,
    command::Command,
    constants::START_MARKER,
    error::{Error, Result},
};

/// Packet identifier
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// Host to device instruction
    Command = 0x01,

    /// Bulk data, more packets follow
    Data = 0x02,

    /// Device acknowledge carrying a confirmation code
    Ack = 0x07,

    /// Last bulk data packet
    EndData = 0x08,
}

impl PacketType {
    /// Check if this packet carries bulk data
    pub fn is_data(self) -> bool {
        matches!(self, Self::Data | Self::EndData)
    }
}

impl From<PacketType> for u8 {
    fn from(packet_type: PacketType) -> u8 {
        packet_type as u8
    }
}

impl TryFrom<u8> for PacketType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::Command),
            0x02 => Ok(Self::Data),
            0x07 => Ok(Self::Ack),
            0x08 => Ok(Self::EndData),
            _ => Err(Error::UnknownPacketType(value)),
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Command => "Command",
            Self::Data => "Data",
            Self::Ack => "Ack",
            Self::EndData => "EndData",
        };
        write!(f, "{}(0x{:02X})", name, *self as u8)
    }
}

/// ZFM protocol packet
///
/// # Packet Structure
///
/// ```text
/// ┌──────────┬──────────┬──────┬──────────┬─────────────┬──────────┐
/// │  Start   │ Address  │ PID  │  Length  │   Payload   │ Checksum │
/// │ 2 bytes  │ 4 bytes  │ 1 b  │ 2 bytes  │ Length - 2  │ 2 bytes  │
/// │ (0xEF01) │ (BE u32) │      │ (BE u16) │   (bytes)   │ (BE u16) │
/// └──────────┴──────────┴──────┴──────────┴─────────────┴──────────┘
/// ```
///
/// All multi-byte values are big-endian. `Length` counts the payload plus
/// the two checksum bytes.
///
/// # Examples
///
/// ```
/// use zfm_core::{Command, Packet};
///
/// // Create a template count request for the broadcast address
/// let packet = Packet::command(Command::TemplateNum, 0xFFFF_FFFF, &[]).unwrap();
/// let encoded = packet.encode();
///
/// // Decode it back
/// let decoded = Packet::decode(&encoded).unwrap();
/// assert_eq!(packet, decoded);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet identifier
    pub packet_type: PacketType,

    /// Module address (broadcast `0xFFFFFFFF` by default)
    pub address: u32,

    /// Instruction and parameters, confirmation code and results, or bulk data
    pub payload: Bytes,
}

impl Packet {
    /// Start marker, address, identifier and length
    pub const HEADER_SIZE: usize = 9;

    /// Trailing checksum
    pub const CHECKSUM_SIZE: usize = 2;

    /// Maximum payload size
    pub const MAX_PAYLOAD_SIZE: usize = 256;

    /// Create a packet
    ///
    /// # Errors
    ///
    /// Returns `PayloadTooLarge` if the payload exceeds `MAX_PAYLOAD_SIZE`.
    pub fn new(packet_type: PacketType, address: u32, payload: impl Into<Bytes>) -> Result<Self> {
        let payload = payload.into();

        if payload.len() > Self::MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge {
                size: payload.len(),
                max: Self::MAX_PAYLOAD_SIZE,
            });
        }

        Ok(Self {
            packet_type,
            address,
            payload,
        })
    }

    /// Create a command packet: instruction code followed by its parameters
    ///
    /// # Examples
    ///
    /// ```
    /// use zfm_core::{Command, Packet};
    ///
    /// let packet = Packet::command(Command::VfyPwd, 0xFFFF_FFFF, &0u32.to_be_bytes()).unwrap();
    /// assert_eq!(packet.payload.len(), 5);
    /// assert_eq!(packet.length(), 7);
    /// ```
    pub fn command(command: Command, address: u32, parameters: &[u8]) -> Result<Self> {
        let mut payload = BytesMut::with_capacity(1 + parameters.len());
        payload.put_u8(command.into());
        payload.put_slice(parameters);

        Self::new(PacketType::Command, address, payload.freeze())
    }

    /// Value of the length field: payload plus checksum
    pub fn length(&self) -> u16 {
        // Bounded by MAX_PAYLOAD_SIZE
        (self.payload.len() + Self::CHECKSUM_SIZE) as u16
    }

    /// Calculate checksum for this packet
    pub fn checksum(&self) -> u16 {
        checksum::calculate(self.packet_type.into(), self.length(), &self.payload)
    }

    /// Encode packet to bytes
    ///
    /// # Examples
    ///
    /// ```
    /// use zfm_core::{Command, Packet};
    ///
    /// let packet = Packet::command(Command::GenImg, 0xFFFF_FFFF, &[]).unwrap();
    /// assert_eq!(
    ///     &packet.encode()[..],
    ///     &[0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x03, 0x01, 0x00, 0x05]
    /// );
    /// ```
    pub fn encode(&self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.size());

        buf.put_u16(START_MARKER);
        buf.put_u32(self.address);
        buf.put_u8(self.packet_type.into());
        buf.put_u16(self.length());
        buf.put_slice(&self.payload);
        buf.put_u16(self.checksum());

        buf
    }

    /// Decode exactly one packet from bytes
    ///
    /// Validation happens in order: start marker, declared length against the
    /// bytes available, checksum, then packet identifier. Nothing is returned
    /// unless every check passes.
    ///
    /// # Errors
    ///
    /// - `Framing` if the start marker is wrong
    /// - `Incomplete` if more bytes are needed; `needed` says how many
    /// - `InvalidLength` / `PayloadTooLarge` if the length field is impossible
    /// - `ChecksumMismatch` if the checksum does not match
    /// - `TrailingBytes` if bytes follow the declared end of the packet
    /// - `UnknownPacketType` if the identifier is not a known packet type
    ///
    /// # Examples
    ///
    /// ```
    /// use zfm_core::{Error, Packet};
    ///
    /// // Header only: the length field announces 3 more bytes
    /// let header = [0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x07, 0x00, 0x03];
    /// assert!(matches!(
    ///     Packet::decode(&header),
    ///     Err(Error::Incomplete { needed: 3, .. })
    /// ));
    /// ```
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < 2 {
            return Err(Error::Incomplete {
                needed: Self::HEADER_SIZE - buf.len(),
                available: buf.len(),
            });
        }

        let marker = u16::from_be_bytes([buf[0], buf[1]]);
        if marker != START_MARKER {
            return Err(Error::Framing { found: marker });
        }

        if buf.len() < Self::HEADER_SIZE {
            return Err(Error::Incomplete {
                needed: Self::HEADER_SIZE - buf.len(),
                available: buf.len(),
            });
        }

        let address = u32::from_be_bytes([buf[2], buf[3], buf[4], buf[5]]);
        let pid = buf[6];
        let length = u16::from_be_bytes([buf[7], buf[8]]);

        let length_usize = usize::from(length);
        if length_usize < Self::CHECKSUM_SIZE {
            return Err(Error::InvalidLength(length));
        }
        if length_usize - Self::CHECKSUM_SIZE > Self::MAX_PAYLOAD_SIZE {
            return Err(Error::PayloadTooLarge {
                size: length_usize - Self::CHECKSUM_SIZE,
                max: Self::MAX_PAYLOAD_SIZE,
            });
        }

        let total = Self::HEADER_SIZE + length_usize;
        if buf.len() < total {
            return Err(Error::Incomplete {
                needed: total - buf.len(),
                available: buf.len(),
            });
        }

        let payload_end = total - Self::CHECKSUM_SIZE;
        let payload = &buf[Self::HEADER_SIZE..payload_end];
        let received = u16::from_be_bytes([buf[payload_end], buf[payload_end + 1]]);

        let expected = checksum::calculate(pid, length, payload);
        if expected != received {
            return Err(Error::ChecksumMismatch { expected, received });
        }

        if buf.len() > total {
            return Err(Error::TrailingBytes {
                extra: buf.len() - total,
            });
        }

        let packet_type = PacketType::try_from(pid)?;

        Ok(Self {
            packet_type,
            address,
            payload: Bytes::copy_from_slice(payload),
        })
    }

    /// Check if this is an acknowledge packet
    pub fn is_ack(&self) -> bool {
        self.packet_type == PacketType::Ack
    }

    /// Check if this packet ends a bulk transfer
    pub fn is_end_data(&self) -> bool {
        self.packet_type == PacketType::EndData
    }

    /// Get total encoded packet size
    pub fn size(&self) -> usize {
        Self::HEADER_SIZE + self.payload.len() + Self::CHECKSUM_SIZE
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("packet_type", &self.packet_type)
            .field("address", &format!("0x{:08X}", self.address))
            .field("length", &self.length())
            .field("checksum", &format!("0x{:04X}", self.checksum()))
            .field("payload", &hex::encode(&self.payload[..self.payload.len().min(16)]))
            .finish()
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Packet[{}](address=0x{:08X}, len={})",
            self.packet_type,
            self.address,
            self.payload.len()
        )
    }
}
