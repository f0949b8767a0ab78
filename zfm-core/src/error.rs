//! Error types for zfm-core

/// Result type alias for zfm-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core protocol errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Start marker does not match `0xEF01`
    #[error("Framing error: expected start marker 0xEF01, found 0x{found:04X}")]
    Framing {
        found: u16,
    },

    /// Declared packet length is below the two checksum bytes
    #[error("Invalid packet length field: {0}")]
    InvalidLength(u16),

    /// More bytes follow the declared end of the packet
    #[error("Trailing bytes after packet: {extra} bytes")]
    TrailingBytes {
        extra: usize,
    },

    /// Not enough bytes yet; the caller must read `needed` more
    #[error("Incomplete packet: {needed} more bytes needed (have {available})")]
    Incomplete {
        needed: usize,
        available: usize,
    },

    /// Checksum verification failed
    #[error("Checksum mismatch: expected 0x{expected:04X}, received 0x{received:04X}")]
    ChecksumMismatch {
        expected: u16,
        received: u16,
    },

    /// Unknown packet identifier
    #[error("Unknown packet type: 0x{0:02X}")]
    UnknownPacketType(u8),

    /// Unknown instruction code
    #[error("Unknown command code: 0x{0:02X}")]
    UnknownCommand(u8),

    /// A well-formed packet of the wrong kind arrived
    #[error("Unexpected packet: expected {expected}, got {actual}")]
    UnexpectedPacket {
        expected: crate::packet::PacketType,
        actual: crate::packet::PacketType,
    },

    /// Acknowledge packet carried no confirmation code
    #[error("Acknowledge packet has an empty payload")]
    EmptyAck,

    /// Acknowledge parameters are shorter than the command defines
    #[error("Short acknowledge for {command}: expected {expected} parameter bytes, got {actual}")]
    ShortAck {
        command: crate::command::Command,
        expected: usize,
        actual: usize,
    },

    /// Acknowledge parameters have the right size but invalid content
    #[error("Malformed {command} response: {reason}")]
    MalformedResponse {
        command: crate::command::Command,
        reason: String,
    },

    /// Inbound transfer did not fit the destination
    #[error("Transfer of {required} bytes exceeds capacity of {capacity} bytes")]
    CapacityExceeded {
        required: usize,
        capacity: usize,
    },

    /// Invalid session state
    #[error("Invalid session state: {0}")]
    InvalidSessionState(String),

    /// Payload too large
    #[error("Payload too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge {
        size: usize,
        max: usize,
    },
}

