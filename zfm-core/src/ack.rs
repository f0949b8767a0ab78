//! Acknowledge packet parsing

use bytes::Bytes;

use crate::{
    command::Command,
    confirmation::ConfirmationCode,
    error::{Error, Result},
    packet::{Packet, PacketType},
};

/// Parsed acknowledge: confirmation code plus response parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    /// First payload byte
    pub code: ConfirmationCode,

    /// Remaining payload bytes
    pub parameters: Bytes,
}

impl Ack {
    /// Interpret an acknowledge packet
    ///
    /// # Errors
    ///
    /// Returns `UnexpectedPacket` for any other packet type and `EmptyAck`
    /// when the payload lacks a confirmation code.
    pub fn from_packet(packet: Packet) -> Result<Self> {
        if packet.packet_type != PacketType::Ack {
            return Err(Error::UnexpectedPacket {
                expected: PacketType::Ack,
                actual: packet.packet_type,
            });
        }

        let Some(&code) = packet.payload.first() else {
            return Err(Error::EmptyAck);
        };

        Ok(Self {
            code: ConfirmationCode::from(code),
            parameters: packet.payload.slice(1..),
        })
    }

    /// Check if the device reported success
    pub fn is_success(&self) -> bool {
        self.code.is_success()
    }

    /// Ensure the parameters are long enough for what `command` returns
    pub fn expect_parameters(&self, command: Command) -> Result<&[u8]> {
        let expected = command.ack_parameter_len();

        if self.parameters.len() < expected {
            return Err(Error::ShortAck {
                command,
                expected,
                actual: self.parameters.len(),
            });
        }

        Ok(&self.parameters[..expected])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ack(payload: &[u8]) -> Packet {
        Packet::new(PacketType::Ack, 0xFFFF_FFFF, payload.to_vec()).unwrap()
    }

    #[test]
    fn test_ack_success() {
        let ack = Ack::from_packet(ack(&[0x00])).unwrap();

        assert!(ack.is_success());
        assert!(ack.parameters.is_empty());
    }

    #[test]
    fn test_ack_parameters() {
        // TemplateNum answer: 3 templates
        let ack = Ack::from_packet(ack(&[0x00, 0x00, 0x03])).unwrap();

        assert_eq!(ack.expect_parameters(Command::TemplateNum).unwrap(), &[0x00, 0x03]);
    }

    #[test]
    fn test_ack_short_parameters() {
        let ack = Ack::from_packet(ack(&[0x00, 0x01])).unwrap();

        assert!(matches!(
            ack.expect_parameters(Command::Search),
            Err(Error::ShortAck { expected: 4, actual: 1, .. })
        ));
    }

    #[test]
    fn test_ack_failure_code() {
        let ack = Ack::from_packet(ack(&[0x02])).unwrap();

        assert_eq!(ack.code, ConfirmationCode::NoFinger);
        assert!(!ack.is_success());
    }

    #[test]
    fn test_ack_empty_payload() {
        assert!(matches!(Ack::from_packet(ack(&[])), Err(Error::EmptyAck)));
    }

    #[test]
    fn test_ack_wrong_packet_type() {
        let data = Packet::new(PacketType::Data, 0xFFFF_FFFF, vec![0x00]).unwrap();

        assert!(matches!(
            Ack::from_packet(data),
            Err(Error::UnexpectedPacket { expected: PacketType::Ack, actual: PacketType::Data })
        ));
    }
}
