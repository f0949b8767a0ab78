//! Confirmation codes returned in acknowledge packets

use std::fmt;

/// Confirmation code, the first payload byte of every acknowledge packet
///
/// `Success` is the only non-failure value. Codes the datasheet does not
/// document are preserved in `Unknown`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ConfirmationCode {
    Success,
    PacketReceiveError,
    NoFinger,
    EnrollFailed,
    DisorderlyImage,
    TooFewFeatures,
    NoMatch,
    NotFound,
    CombineFailed,
    SlotOutOfRange,
    TemplateReadError,
    UploadFeaturesFailed,
    ReceiveDataFailed,
    UploadImageFailed,
    DeleteFailed,
    ClearLibraryFailed,
    WrongPassword,
    NoValidImage,
    FlashWriteError,
    UndefinedError,
    InvalidRegister,
    IncorrectConfiguration,
    WrongNotepadPage,
    PortOperationFailed,
    Unknown(u8),
}

impl ConfirmationCode {
    /// Check if this is the success code
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// Raw wire value
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0x00,
            Self::PacketReceiveError => 0x01,
            Self::NoFinger => 0x02,
            Self::EnrollFailed => 0x03,
            Self::DisorderlyImage => 0x06,
            Self::TooFewFeatures => 0x07,
            Self::NoMatch => 0x08,
            Self::NotFound => 0x09,
            Self::CombineFailed => 0x0A,
            Self::SlotOutOfRange => 0x0B,
            Self::TemplateReadError => 0x0C,
            Self::UploadFeaturesFailed => 0x0D,
            Self::ReceiveDataFailed => 0x0E,
            Self::UploadImageFailed => 0x0F,
            Self::DeleteFailed => 0x10,
            Self::ClearLibraryFailed => 0x11,
            Self::WrongPassword => 0x13,
            Self::NoValidImage => 0x15,
            Self::FlashWriteError => 0x18,
            Self::UndefinedError => 0x19,
            Self::InvalidRegister => 0x1A,
            Self::IncorrectConfiguration => 0x1B,
            Self::WrongNotepadPage => 0x1C,
            Self::PortOperationFailed => 0x1D,
            Self::Unknown(code) => code,
        }
    }

    /// Human-readable description
    pub fn description(self) -> &'static str {
        match self {
            Self::Success => "command executed",
            Self::PacketReceiveError => "device failed to receive the packet",
            Self::NoFinger => "no finger on the sensor",
            Self::EnrollFailed => "failed to capture the finger image",
            Self::DisorderlyImage => "image too disorderly to extract features",
            Self::TooFewFeatures => "image too small or too few features",
            Self::NoMatch => "fingers do not match",
            Self::NotFound => "no matching template in the library",
            Self::CombineFailed => "failed to combine character files",
            Self::SlotOutOfRange => "template slot beyond the library",
            Self::TemplateReadError => "error reading template from the library",
            Self::UploadFeaturesFailed => "error uploading features",
            Self::ReceiveDataFailed => "device cannot receive the following data packets",
            Self::UploadImageFailed => "error uploading the image",
            Self::DeleteFailed => "failed to delete templates",
            Self::ClearLibraryFailed => "failed to clear the library",
            Self::WrongPassword => "wrong password",
            Self::NoValidImage => "no valid primary image in the image buffer",
            Self::FlashWriteError => "error writing flash",
            Self::UndefinedError => "undefined error",
            Self::InvalidRegister => "invalid register number",
            Self::IncorrectConfiguration => "incorrect register configuration",
            Self::WrongNotepadPage => "wrong notepad page number",
            Self::PortOperationFailed => "failed to operate the communication port",
            Self::Unknown(_) => "unknown confirmation code",
        }
    }
}

impl From<u8> for ConfirmationCode {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::Success,
            0x01 => Self::PacketReceiveError,
            0x02 => Self::NoFinger,
            0x03 => Self::EnrollFailed,
            0x06 => Self::DisorderlyImage,
            0x07 => Self::TooFewFeatures,
            0x08 => Self::NoMatch,
            0x09 => Self::NotFound,
            0x0A => Self::CombineFailed,
            0x0B => Self::SlotOutOfRange,
            0x0C => Self::TemplateReadError,
            0x0D => Self::UploadFeaturesFailed,
            0x0E => Self::ReceiveDataFailed,
            0x0F => Self::UploadImageFailed,
            0x10 => Self::DeleteFailed,
            0x11 => Self::ClearLibraryFailed,
            0x13 => Self::WrongPassword,
            0x15 => Self::NoValidImage,
            0x18 => Self::FlashWriteError,
            0x19 => Self::UndefinedError,
            0x1A => Self::InvalidRegister,
            0x1B => Self::IncorrectConfiguration,
            0x1C => Self::WrongNotepadPage,
            0x1D => Self::PortOperationFailed,
            other => Self::Unknown(other),
        }
    }
}

impl From<ConfirmationCode> for u8 {
    fn from(code: ConfirmationCode) -> u8 {
        code.code()
    }
}

impl fmt::Display for ConfirmationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X} ({})", self.code(), self.description())
    }
}
