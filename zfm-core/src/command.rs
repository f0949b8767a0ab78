//! ZFM instruction codes

use std::fmt;

use crate::error::{Error, Result};

/// Instruction codes carried in the first payload byte of a command packet
///
/// Names follow the module datasheet.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Command {
    // Fingerprint processing
    GenImg = 0x01,
    Img2Tz = 0x02,
    Match = 0x03,
    Search = 0x04,
    RegModel = 0x05,

    // Template library
    Store = 0x06,
    LoadChar = 0x07,
    UpChar = 0x08,
    DownChar = 0x09,
    UpImage = 0x0A,
    DownImage = 0x0B,
    DeletChar = 0x0C,
    Empty = 0x0D,

    // System
    ReadSysPara = 0x0F,
    SetPwd = 0x12,
    VfyPwd = 0x13,
    GetRandomCode = 0x14,
    SetAddr = 0x15,

    // Notepad
    WriteNotepad = 0x18,
    ReadNotepad = 0x19,

    // Library status
    TemplateNum = 0x1D,
    ReadConList = 0x1F,
}

impl Command {
    /// Check if the device runs a biometric algorithm or flash operation
    /// before acknowledging, which takes noticeably longer than a plain
    /// register access
    pub fn is_slow(self) -> bool {
        matches!(
            self,
            Self::GenImg
                | Self::Img2Tz
                | Self::Match
                | Self::Search
                | Self::RegModel
                | Self::Store
                | Self::DeletChar
                | Self::Empty
        )
    }

    /// Check if a successful acknowledge is followed by data packets
    /// from the device
    pub fn starts_download(self) -> bool {
        matches!(self, Self::UpChar | Self::UpImage)
    }

    /// Check if a successful acknowledge must be followed by data packets
    /// from the host
    pub fn starts_upload(self) -> bool {
        matches!(self, Self::DownChar | Self::DownImage)
    }

    /// Number of parameter bytes a successful acknowledge carries after the
    /// confirmation code
    pub fn ack_parameter_len(self) -> usize {
        match self {
            Self::Match => 2,
            Self::Search => 4,
            Self::ReadSysPara => 16,
            Self::GetRandomCode => 4,
            Self::ReadNotepad => 32,
            Self::TemplateNum => 2,
            Self::ReadConList => 32,
            _ => 0,
        }
    }

    /// Get command name
    pub fn name(self) -> &'static str {
        match self {
            Self::GenImg => "GenImg",
            Self::Img2Tz => "Img2Tz",
            Self::Match => "Match",
            Self::Search => "Search",
            Self::RegModel => "RegModel",
            Self::Store => "Store",
            Self::LoadChar => "LoadChar",
            Self::UpChar => "UpChar",
            Self::DownChar => "DownChar",
            Self::UpImage => "UpImage",
            Self::DownImage => "DownImage",
            Self::DeletChar => "DeletChar",
            Self::Empty => "Empty",
            Self::ReadSysPara => "ReadSysPara",
            Self::SetPwd => "SetPwd",
            Self::VfyPwd => "VfyPwd",
            Self::GetRandomCode => "GetRandomCode",
            Self::SetAddr => "SetAddr",
            Self::WriteNotepad => "WriteNotepad",
            Self::ReadNotepad => "ReadNotepad",
            Self::TemplateNum => "TemplateNum",
            Self::ReadConList => "ReadConList",
        }
    }
}

impl From<Command> for u8 {
    fn from(cmd: Command) -> u8 {
        cmd as u8
    }
}

impl TryFrom<u8> for Command {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(Self::GenImg),
            0x02 => Ok(Self::Img2Tz),
            0x03 => Ok(Self::Match),
            0x04 => Ok(Self::Search),
            0x05 => Ok(Self::RegModel),
            0x06 => Ok(Self::Store),
            0x07 => Ok(Self::LoadChar),
            0x08 => Ok(Self::UpChar),
            0x09 => Ok(Self::DownChar),
            0x0A => Ok(Self::UpImage),
            0x0B => Ok(Self::DownImage),
            0x0C => Ok(Self::DeletChar),
            0x0D => Ok(Self::Empty),
            0x0F => Ok(Self::ReadSysPara),
            0x12 => Ok(Self::SetPwd),
            0x13 => Ok(Self::VfyPwd),
            0x14 => Ok(Self::GetRandomCode),
            0x15 => Ok(Self::SetAddr),
            0x18 => Ok(Self::WriteNotepad),
            0x19 => Ok(Self::ReadNotepad),
            0x1D => Ok(Self::TemplateNum),
            0x1F => Ok(Self::ReadConList),
            _ => Err(Error::UnknownCommand(value)),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(0x{:02X})", self.name(), *self as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_conversion() {
        assert_eq!(u8::from(Command::VfyPwd), 0x13);
        assert_eq!(Command::try_from(0x13).unwrap(), Command::VfyPwd);
        assert_eq!(Command::try_from(0x1F).unwrap(), Command::ReadConList);
    }

    #[test]
    fn test_every_code_round_trips() {
        for code in 0..=u8::MAX {
            if let Ok(cmd) = Command::try_from(code) {
                assert_eq!(u8::from(cmd), code);
            }
        }
    }

    #[test]
    fn test_command_transfer_direction() {
        assert!(Command::UpChar.starts_download());
        assert!(Command::UpImage.starts_download());
        assert!(Command::DownChar.starts_upload());
        assert!(!Command::DownChar.starts_download());
        assert!(!Command::GenImg.starts_upload());
    }

    #[test]
    fn test_command_is_slow() {
        assert!(Command::Search.is_slow());
        assert!(!Command::TemplateNum.is_slow());
    }

    #[test]
    fn test_unknown_command() {
        assert!(matches!(
            Command::try_from(0xEE),
            Err(Error::UnknownCommand(0xEE))
        ));
    }

    #[test]
    fn test_command_display() {
        assert_eq!(Command::Empty.to_string(), "Empty(0x0D)");
    }
}
