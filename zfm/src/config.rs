//! Sensor configuration

use std::time::Duration;

use zfm_core::constants::{
    transfer::CHARACTERISTICS_SIZE, BAUD_RATE_STEP, DEFAULT_ADDRESS, DEFAULT_BAUD_RATE, DEFAULT_DATA_TIMEOUT, DEFAULT_PASSWORD,
    DEFAULT_SLOW_TIMEOUT, DEFAULT_TIMEOUT, MAX_BAUD_RATE,
};
use zfm_types::PacketSize;

use crate::error::{Error, Result};

/// Settings for one sensor connection
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use zfm::SensorConfig;
///
/// let config = SensorConfig::new("/dev/ttyUSB0")
///     .with_baud_rate(115_200)
///     .with_slow_timeout(Duration::from_secs(8));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorConfig {
    /// Serial device path (default: `/dev/ttyUSB0`)
    pub port: String,

    /// Baud rate, a multiple of 9600 up to 115200 (default: 57600)
    pub baud_rate: u32,

    /// Module address (default: `0xFFFFFFFF`)
    pub address: u32,

    /// Handshake password (default: 0)
    pub password: u32,

    /// Deadline for plain register commands (default: 2s)
    pub timeout: Duration,

    /// Deadline for capture, extraction, matching and flash commands (default: 5s)
    pub slow_timeout: Duration,

    /// Deadline for each packet of a bulk download (default: 2s)
    pub data_timeout: Duration,

    /// Payload size of outbound data packets (default: 128 bytes)
    pub packet_size: PacketSize,

    /// Number of library slots searched by `search`; read from the sensor
    /// when unset
    pub library_size: Option<u16>,

    /// Size of one character file in bytes (default: 512)
    pub characteristics_size: usize,
}

impl SensorConfig {
    /// Defaults for the sensor on `port`
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            ..Self::default()
        }
    }

    /// Set baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set module address
    pub fn with_address(mut self, address: u32) -> Self {
        self.address = address;
        self
    }

    /// Set handshake password
    pub fn with_password(mut self, password: u32) -> Self {
        self.password = password;
        self
    }

    /// Set command timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set timeout for slow commands
    pub fn with_slow_timeout(mut self, timeout: Duration) -> Self {
        self.slow_timeout = timeout;
        self
    }

    /// Set per-packet timeout for downloads
    pub fn with_data_timeout(mut self, timeout: Duration) -> Self {
        self.data_timeout = timeout;
        self
    }

    /// Set data packet size
    pub fn with_packet_size(mut self, packet_size: PacketSize) -> Self {
        self.packet_size = packet_size;
        self
    }

    /// Set number of library slots to search
    pub fn with_library_size(mut self, library_size: u16) -> Self {
        self.library_size = Some(library_size);
        self
    }

    /// Set character file size
    pub fn with_characteristics_size(mut self, size: usize) -> Self {
        self.characteristics_size = size;
        self
    }

    /// Check the settings for values the sensor cannot use
    pub fn validate(&self) -> Result<()> {
        if self.baud_rate == 0
            || self.baud_rate > MAX_BAUD_RATE
            || self.baud_rate % BAUD_RATE_STEP != 0
        {
            return Err(Error::InvalidArgument(format!(
                "baud rate must be a multiple of {} up to {}, got {}",
                BAUD_RATE_STEP, MAX_BAUD_RATE, self.baud_rate
            )));
        }

        for (name, timeout) in [
            ("timeout", self.timeout),
            ("slow_timeout", self.slow_timeout),
            ("data_timeout", self.data_timeout),
        ] {
            if timeout.is_zero() {
                return Err(Error::InvalidArgument(format!("{} must be non-zero", name)));
            }
        }

        if self.library_size == Some(0) {
            return Err(Error::InvalidArgument("library size must be non-zero".into()));
        }

        if self.characteristics_size == 0 {
            return Err(Error::InvalidArgument("character file size must be non-zero".into()));
        }

        Ok(())
    }
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".into(),
            baud_rate: DEFAULT_BAUD_RATE,
            address: DEFAULT_ADDRESS,
            password: DEFAULT_PASSWORD,
            timeout: DEFAULT_TIMEOUT,
            slow_timeout: DEFAULT_SLOW_TIMEOUT,
            data_timeout: DEFAULT_DATA_TIMEOUT,
            packet_size: PacketSize::default(),
            library_size: None,
            characteristics_size: CHARACTERISTICS_SIZE,
        }
    }
}
