//! # zfm-core
//!
//! Core protocol implementation for ZhianTec ZFM compatible fingerprint sensors.
//!
//! This crate provides the low-level protocol primitives:
//! - Packet structure and encoding/decoding
//! - Checksum calculation
//! - Instruction and confirmation codes
//! - Chunked transfer splitting and reassembly
//! - Session state
//! - Protocol constants

pub mod ack;
pub mod checksum;
pub mod chunk;
pub mod command;
pub mod confirmation;
pub mod constants;
pub mod error;
pub mod packet;
pub mod session;

pub use ack::Ack;
pub use command::Command;
pub use confirmation::ConfirmationCode;
pub use error::{Error, Result};
pub use packet::{Packet, PacketType};
pub use session::{Session, SessionState};

/// Protocol version information
pub const PROTOCOL_VERSION: &str = "1.0";
