//! Domain types for ZFM fingerprint sensors

pub mod char_buffer;
pub mod error;
pub mod image;
pub mod occupancy;
pub mod packet_size;
pub mod search;
pub mod system_parameters;

pub use char_buffer::CharBuffer;
pub use error::{Error, Result};
pub use image::FingerprintImage;
pub use occupancy::OccupancyPage;
pub use packet_size::PacketSize;
pub use search::SearchResult;
pub use system_parameters::{StatusFlags, SystemParameters};
