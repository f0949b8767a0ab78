//! Serial port transport

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serialport::{ClearBuffer, DataBits, FlowControl, Parity, SerialPort, StopBits};
use tracing::{debug, trace, warn};

use crate::{error::*, Transport};

type SharedPort = Arc<Mutex<Box<dyn SerialPort>>>;

/// List the names of serial ports present on the system
pub fn list_ports() -> Result<Vec<String>> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|p| p.port_name)
        .collect())
}

/// UART transport (8N1, no flow control)
///
/// `serialport` is blocking, so every port operation runs on tokio's
/// blocking pool.
pub struct SerialTransport {
    path: String,
    baud_rate: u32,
    write_timeout: Duration,
    port: Option<SharedPort>,
}

impl SerialTransport {
    /// Create new serial transport
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            write_timeout: Duration::from_secs(1),
            port: None,
        }
    }

    /// Set write timeout
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Device path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Configured baud rate
    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    fn port(&self) -> Result<SharedPort> {
        self.port.clone().ok_or(Error::NotConnected)
    }
}

async fn blocking<T, F>(port: SharedPort, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&mut dyn SerialPort) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = port.lock();
        f(guard.as_mut())
    })
    .await?
}

fn read_until(port: &mut dyn SerialPort, buf: &mut [u8], timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    let mut filled = 0;

    while filled < buf.len() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(Error::ReadTimeout(timeout));
        }
        port.set_timeout(remaining)?;

        match port.read(&mut buf[filled..]) {
            Ok(0) => return Err(Error::ConnectionClosed),
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                return Err(Error::ReadTimeout(timeout));
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(Error::Io(e)),
        }
    }

    Ok(())
}

#[async_trait]
impl Transport for SerialTransport {
    async fn connect(&mut self) -> Result<()> {
        if self.is_connected() {
            return Err(Error::AlreadyConnected);
        }

        debug!("Opening {} at {} baud...", self.path, self.baud_rate);

        let builder = serialport::new(self.path.clone(), self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.write_timeout);

        let port = tokio::task::spawn_blocking(move || {
            let port = builder.open()?;
            port.clear(ClearBuffer::All)?;
            Ok::<_, serialport::Error>(port)
        })
        .await??;

        debug!("Opened {}", self.path);

        self.port = Some(Arc::new(Mutex::new(port)));
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            debug!("Closed {}", self.path);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let port = self.port()?;

        trace!("tx {} bytes: {}", data.len(), hex::encode(&data[..data.len().min(32)]));

        let data = data.to_vec();
        let write_timeout = self.write_timeout;
        blocking(port, move |port| {
            port.set_timeout(write_timeout)?;
            port.write_all(&data)?;
            port.flush()?;
            Ok(())
        })
        .await
    }

    async fn read_exact(&mut self, len: usize, timeout: Duration) -> Result<Bytes> {
        let port = self.port()?;

        let buf = blocking(port, move |port| {
            let mut buf = vec![0u8; len];
            read_until(port, &mut buf, timeout)?;
            Ok(buf)
        })
        .await?;

        trace!("rx {} bytes: {}", buf.len(), hex::encode(&buf[..buf.len().min(32)]));

        Ok(Bytes::from(buf))
    }

    async fn clear_input(&mut self) -> Result<()> {
        let port = self.port()?;

        blocking(port, |port| {
            port.clear(ClearBuffer::Input)?;
            Ok(())
        })
        .await
    }

    fn name(&self) -> String {
        format!("{}@{}", self.path, self.baud_rate)
    }
}

impl Drop for SerialTransport {
    fn drop(&mut self) {
        if self.is_connected() {
            warn!("Serial transport dropped while still connected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serial_transport_create() {
        let transport = SerialTransport::new("/dev/ttyUSB0", 57_600);

        assert!(!transport.is_connected());
        assert_eq!(transport.name(), "/dev/ttyUSB0@57600");
        assert_eq!(transport.baud_rate(), 57_600);
    }

    #[tokio::test]
    async fn test_io_requires_connection() {
        let mut transport = SerialTransport::new("/dev/ttyUSB0", 57_600);

        assert!(matches!(transport.send(&[0xEF, 0x01]).await, Err(Error::NotConnected)));
        assert!(matches!(
            transport.read_exact(9, Duration::from_millis(10)).await,
            Err(Error::NotConnected)
        ));
        assert!(matches!(transport.clear_input().await, Err(Error::NotConnected)));
    }

    #[tokio::test]
    async fn test_open_missing_port() {
        let mut transport = SerialTransport::new("/dev/does-not-exist-zfm", 57_600);

        let err = transport.connect().await.unwrap_err();

        assert!(matches!(err, Error::Serial(_)));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let mut transport = SerialTransport::new("/dev/ttyUSB0", 57_600);

        transport.disconnect().await.unwrap();
        transport.disconnect().await.unwrap();
    }
}
