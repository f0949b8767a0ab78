//! Transport layer for ZFM fingerprint sensors
//!
//! Provides the byte stream the protocol engine talks over.

pub mod error;
pub mod serial;

pub use error::{Error, Result};
pub use serial::{list_ports, SerialTransport};

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

/// Byte stream to a sensor
///
/// Implementations move raw bytes only; framing and checksums belong to
/// the protocol engine.
#[cfg_attr(feature = "mock", mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Open the underlying device
    async fn connect(&mut self) -> Result<()>;
    
    /// Close the underlying device
    async fn disconnect(&mut self) -> Result<()>;
    
    /// Check if connected
    fn is_connected(&self) -> bool;
    
    /// Write all of `data`
    async fn send(&mut self, data: &[u8]) -> Result<()>;
    
    /// Read exactly `len` bytes, failing with `ReadTimeout` once `timeout` elapses
    async fn read_exact(&mut self, len: usize, timeout: Duration) -> Result<Bytes>;

    /// Discard any received bytes not yet read
    async fn clear_input(&mut self) -> Result<()>;
    
    /// Human readable name of the endpoint
    fn name(&self) -> String;
}
