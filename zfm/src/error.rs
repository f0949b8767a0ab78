//! High-level error types

use std::time::Duration;

use zfm_core::{Command, ConfirmationCode, SessionState};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or unexpected traffic from the sensor
    #[error("Protocol violation: {0}")]
    ProtocolViolation(#[source] zfm_core::Error),

    /// No response before the deadline
    #[error("Sensor did not respond within {0:?}")]
    Timeout(Duration),

    /// The byte stream failed; the session is closed
    #[error("Transport failure: {0}")]
    TransportFailure(#[source] zfm_transport::Error),

    /// The sensor rejected the handshake password
    #[error("Password rejected by sensor")]
    AuthenticationFailed,

    /// The sensor answered with a non-success confirmation code
    #[error("{command} rejected: {code}")]
    DeviceRejected {
        command: Command,
        code: ConfirmationCode,
    },

    /// Destination buffer cannot hold the result
    #[error("Buffer too small: {required} bytes required")]
    BufferTooSmall {
        required: usize,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Operation issued outside the ready state
    #[error("Sensor not ready (session {state})")]
    NotReady {
        state: SessionState,
    },

    #[error("Image error: {0}")]
    Image(#[from] zfm_types::Error),
}

impl Error {
    /// Check if the session is still usable after this error
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::ProtocolViolation(_)
                | Self::Timeout(_)
                | Self::DeviceRejected { .. }
                | Self::BufferTooSmall { .. }
                | Self::InvalidArgument(_)
                | Self::Image(_)
        )
    }

    /// Check if the session was closed and `connect` must be called again
    pub fn requires_reconnect(&self) -> bool {
        matches!(self, Self::TransportFailure(_) | Self::AuthenticationFailed)
    }

    /// Confirmation code behind a rejection
    pub fn confirmation_code(&self) -> Option<ConfirmationCode> {
        match self {
            Self::DeviceRejected { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<zfm_core::Error> for Error {
    fn from(err: zfm_core::Error) -> Self {
        match err {
            zfm_core::Error::CapacityExceeded { required, .. } => Self::BufferTooSmall { required },
            zfm_core::Error::PayloadTooLarge { size, max } => Self::InvalidArgument(format!(
                "payload of {} bytes exceeds {} bytes",
                size, max
            )),
            other => Self::ProtocolViolation(other),
        }
    }
}

impl From<zfm_transport::Error> for Error {
    fn from(err: zfm_transport::Error) -> Self {
        match err {
            zfm_transport::Error::ReadTimeout(timeout) => Self::Timeout(timeout),
            other => Self::TransportFailure(other),
        }
    }
}
