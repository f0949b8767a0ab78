//! # zfm
//!
//! Async driver for ZhianTec ZFM compatible fingerprint sensors (R30x,
//! R50x, AS608 and friends) over a serial link.
//!
//! ## Features
//!
//! - Type-safe packet codec with checksum validation
//! - Async/await API using Tokio, safe to share between tasks
//! - Enrollment, matching and library search
//! - Template and image transfer, with BMP conversion for images
//! - Notepad, password and address management
//!
//! ## Quick Start
//!
//! ```no_run
//! use zfm::{Sensor, SensorConfig};
//!
//! #[tokio::main]
//! async fn main() -> zfm::Result<()> {
//!     // Connect and verify the default password
//!     let sensor = Sensor::new(SensorConfig::new("/dev/ttyUSB0"))?;
//!     sensor.connect().await?;
//!
//!     let params = sensor.system_parameters().await?;
//!     println!("{}", params);
//!     println!("{} templates stored", sensor.template_count().await?);
//!
//!     sensor.disconnect().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
mod link;
pub mod sensor;
mod transfer;

// Re-exports
pub use config::SensorConfig;
pub use error::{Error, Result};
pub use sensor::Sensor;

// Re-export protocol and domain types
pub use zfm_core::{Command, ConfirmationCode, Packet, SessionState};
pub use zfm_transport::{SerialTransport, Transport};
pub use zfm_types::{
    CharBuffer, FingerprintImage, OccupancyPage, PacketSize, SearchResult, StatusFlags,
    SystemParameters,
};
