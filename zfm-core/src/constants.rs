//! Protocol constants

use std::time::Duration;

/// Fixed start marker opening every packet (high byte first)
pub const START_MARKER: u16 = 0xEF01;

/// Broadcast address accepted by a sensor with factory settings
pub const DEFAULT_ADDRESS: u32 = 0xFFFF_FFFF;

/// Factory handshake password
pub const DEFAULT_PASSWORD: u32 = 0x0000_0000;

/// Factory baud rate
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// The module only accepts baud rates that are multiples of this value
pub const BAUD_RATE_STEP: u32 = 9_600;

/// Highest supported baud rate (multiplier 12)
pub const MAX_BAUD_RATE: u32 = 115_200;

/// Default deadline for a command/acknowledge exchange
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// Deadline for commands that run an on-device algorithm (capture, search, ...)
pub const DEFAULT_SLOW_TIMEOUT: Duration = Duration::from_secs(5);

/// Deadline for each packet of a chunked download
pub const DEFAULT_DATA_TIMEOUT: Duration = Duration::from_secs(2);

/// Notepad geometry
pub mod notepad {
    /// Number of notepad pages
    pub const PAGES: u8 = 16;

    /// Size of one notepad page in bytes
    pub const PAGE_SIZE: usize = 32;
}

/// Template index table ("content list") geometry
pub mod occupancy {
    /// Size of one index table page in bytes
    pub const PAGE_SIZE: usize = 32;

    /// Template slots described by one index table page
    pub const SLOTS_PER_PAGE: usize = PAGE_SIZE * 8;
}

/// Sizes of bulk transfers
pub mod transfer {
    /// Size of a character file / template uploaded from a CharBuffer
    pub const CHARACTERISTICS_SIZE: usize = 512;

    /// Image width in pixels
    pub const IMAGE_WIDTH: usize = 256;

    /// Image height in pixels
    pub const IMAGE_HEIGHT: usize = 288;

    /// Image size on the wire (two 4-bit pixels per byte)
    pub const IMAGE_SIZE: usize = IMAGE_WIDTH * IMAGE_HEIGHT / 2;
}
