//! Transport errors

use std::io;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not connected")]
    NotConnected,
    
    #[error("Already connected")]
    AlreadyConnected,
    
    #[error("Read timeout after {0:?}")]
    ReadTimeout(Duration),
    
    #[error("Connection closed by remote")]
    ConnectionClosed,
    
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Blocking I/O task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

impl Error {
    /// Check if the error is a read deadline expiring
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ReadTimeout(_))
    }
}
