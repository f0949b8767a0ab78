//! High-level sensor interface

use std::path::Path;

use byteorder::{BigEndian, ByteOrder};
use bytes::Bytes;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

use zfm_core::{
    constants::{notepad, transfer},
    Command, ConfirmationCode, Session, SessionState,
};
use zfm_transport::{SerialTransport, Transport};
use zfm_types::{CharBuffer, FingerprintImage, OccupancyPage, SearchResult, SystemParameters};

use crate::{
    config::SensorConfig,
    error::{Error, Result},
    link::{ensure_success, rejected, Link},
};

/// ZFM fingerprint sensor
///
/// All operations take `&self`; share a sensor between tasks with an `Arc`.
/// Exchanges are serialized internally, so concurrent callers wait for the
/// operation in flight to finish.
///
/// # Examples
///
/// ```no_run
/// use zfm::{CharBuffer, SearchResult, Sensor, SensorConfig};
///
/// #[tokio::main]
/// async fn main() -> zfm::Result<()> {
///     let sensor = Sensor::new(SensorConfig::new("/dev/ttyUSB0"))?;
///     sensor.connect().await?;
///
///     sensor.capture_image().await?;
///     sensor.extract_features(CharBuffer::Buffer1).await?;
///
///     match sensor.search(CharBuffer::Buffer1).await? {
///         SearchResult::Found { slot, score } => println!("slot {} (score {})", slot, score),
///         SearchResult::NotFound => println!("unknown finger"),
///     }
///
///     sensor.disconnect().await?;
///     Ok(())
/// }
/// ```
pub struct Sensor {
    link: Mutex<Link>,
    session: Session,
    characteristics_size: usize,
}

impl Sensor {
    /// Create a sensor on the serial port named in `config`
    pub fn new(config: SensorConfig) -> Result<Self> {
        let transport = SerialTransport::new(config.port.clone(), config.baud_rate);
        Self::with_transport(Box::new(transport), config)
    }

    /// Create a sensor over any transport
    pub fn with_transport(transport: Box<dyn Transport>, config: SensorConfig) -> Result<Self> {
        config.validate()?;

        let session = Session::new(config.address);
        let link = Link::new(transport, session.clone(), &config);

        Ok(Self {
            link: Mutex::new(link),
            session,
            characteristics_size: config.characteristics_size,
        })
    }

    /// Current session state
    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    /// Check if the password has been verified
    pub fn is_ready(&self) -> bool {
        self.session.is_ready()
    }

    /// Address commands are sent to
    pub fn address(&self) -> u32 {
        self.session.address()
    }

    /// Last confirmation code the sensor returned
    pub fn last_error_code(&self) -> ConfirmationCode {
        self.session.last_code()
    }

    /// Open the transport and verify the password
    ///
    /// # Errors
    ///
    /// Returns `AuthenticationFailed` if the sensor rejects the password and
    /// `TransportFailure` if the port cannot be opened; in both cases the
    /// sensor stays disconnected.
    pub async fn connect(&self) -> Result<()> {
        let mut link = self.link.lock().await;

        if self.session.is_ready() {
            debug!("Already connected");
            return Ok(());
        }

        info!("Connecting to {}...", link.transport_name());
        link.open().await?;

        match handshake(&mut link).await {
            Ok(true) => {
                info!("Connected (address=0x{:08X})", self.session.address());
                Ok(())
            }
            Ok(false) => {
                warn!("Password rejected by sensor");
                link.close().await;
                Err(Error::AuthenticationFailed)
            }
            Err(e) => {
                link.close().await;
                Err(e)
            }
        }
    }

    /// Close the transport; safe to call in any state
    pub async fn disconnect(&self) -> Result<()> {
        let mut link = self.link.lock().await;

        if self.session.is_connected() {
            info!("Disconnecting from {}...", link.transport_name());
        }
        link.close().await;

        Ok(())
    }

    /// Verify the stored password again
    ///
    /// Returns `false` if the sensor reports a wrong password.
    pub async fn verify_password(&self) -> Result<bool> {
        let mut link = self
            .lock_in(&[SessionState::Connected, SessionState::Ready])
            .await?;

        let result = handshake(&mut link).await;
        link.settle(result).await
    }

    /// Change the handshake password
    pub async fn set_password(&self, password: u32) -> Result<()> {
        let mut link = self.ready_link().await?;

        let mut params = [0u8; 4];
        BigEndian::write_u32(&mut params, password);

        let result = link.execute_ok(Command::SetPwd, &params).await;
        if result.is_ok() {
            link.password = password;
            info!("Password changed");
        }
        link.settle(result).await.map(|_| ())
    }

    /// Change the module address
    ///
    /// The sensor answers from its new address; later commands go there.
    pub async fn set_address(&self, address: u32) -> Result<()> {
        let mut link = self.ready_link().await?;

        let mut params = [0u8; 4];
        BigEndian::write_u32(&mut params, address);

        let result = link
            .exchange(Command::SetAddr, &params, Some(address))
            .await
            .and_then(|ack| ensure_success(Command::SetAddr, ack));
        if result.is_ok() {
            self.session.set_address(address);
            info!("Address changed to 0x{:08X}", address);
        }
        link.settle(result).await.map(|_| ())
    }

    /// Scan a finger into the image buffer
    ///
    /// Fails with `DeviceRejected` carrying `NoFinger` when the sensor is
    /// empty; callers poll until a finger is placed.
    pub async fn capture_image(&self) -> Result<()> {
        self.simple(Command::GenImg, &[]).await
    }

    /// Extract features from the image buffer into `buffer`
    pub async fn extract_features(&self, buffer: CharBuffer) -> Result<()> {
        self.simple(Command::Img2Tz, &[buffer.id()]).await
    }

    /// Combine both character buffers into a template (left in both buffers)
    pub async fn combine_features(&self) -> Result<()> {
        self.simple(Command::RegModel, &[]).await
    }

    /// Compare the two character buffers
    ///
    /// Returns the match score, 0 when the fingers do not match.
    pub async fn match_buffers(&self) -> Result<u16> {
        let mut link = self.ready_link().await?;

        let result = match link.execute(Command::Match, &[]).await {
            Ok(ack) if ack.is_success() => ack
                .expect_parameters(Command::Match)
                .map(BigEndian::read_u16)
                .map_err(Error::ProtocolViolation),
            Ok(ack) if ack.code == ConfirmationCode::NoMatch => Ok(0),
            Ok(ack) => Err(rejected(Command::Match, ack.code)),
            Err(e) => Err(e),
        };
        link.settle(result).await
    }

    /// Search the whole library for the features in `buffer`
    ///
    /// The library size comes from the configuration, or from the system
    /// parameters read on first use.
    pub async fn search(&self, buffer: CharBuffer) -> Result<SearchResult> {
        let mut link = self.ready_link().await?;

        let result = async {
            let count = library_size(&mut link).await?;
            search_slots(&mut link, buffer, 0, count).await
        }
        .await;
        link.settle(result).await
    }

    /// Search `count` slots starting at `start`
    pub async fn search_range(&self, buffer: CharBuffer, start: u16, count: u16) -> Result<SearchResult> {
        if count == 0 {
            return Err(Error::InvalidArgument("search range is empty".into()));
        }

        let mut link = self.ready_link().await?;
        let result = search_slots(&mut link, buffer, start, count).await;
        link.settle(result).await
    }

    /// Store the template in `buffer` at `slot`, replacing any template there
    pub async fn store(&self, slot: u16, buffer: CharBuffer) -> Result<()> {
        self.simple(Command::Store, &slot_params(buffer, slot)).await?;
        info!("Stored {} in slot {}", buffer, slot);
        Ok(())
    }

    /// Load the template at `slot` into `buffer`
    pub async fn load(&self, slot: u16, buffer: CharBuffer) -> Result<()> {
        self.simple(Command::LoadChar, &slot_params(buffer, slot)).await
    }

    /// Delete `count` templates starting at `start`
    pub async fn delete_templates(&self, start: u16, count: u16) -> Result<()> {
        if count == 0 {
            return Err(Error::InvalidArgument("nothing to delete".into()));
        }

        let mut params = [0u8; 4];
        BigEndian::write_u16(&mut params[0..2], start);
        BigEndian::write_u16(&mut params[2..4], count);

        self.simple(Command::DeletChar, &params).await?;
        info!("Deleted {} templates from slot {}", count, start);
        Ok(())
    }

    /// Delete every template in the library
    pub async fn erase_database(&self) -> Result<()> {
        self.simple(Command::Empty, &[]).await?;
        info!("Template library erased");
        Ok(())
    }

    /// Number of stored templates
    pub async fn template_count(&self) -> Result<u16> {
        let mut link = self.ready_link().await?;

        let result = link
            .execute_ok(Command::TemplateNum, &[])
            .await
            .and_then(|ack| {
                ack.expect_parameters(Command::TemplateNum)
                    .map(BigEndian::read_u16)
                    .map_err(Error::ProtocolViolation)
            });
        link.settle(result).await
    }

    /// Read one page of the library index table
    pub async fn read_occupancy_page(&self, page: u8) -> Result<OccupancyPage> {
        let mut raw = [0u8; OccupancyPage::SIZE];
        self.read_occupancy_page_into(page, &mut raw).await?;

        Ok(OccupancyPage::from_bytes(page, &raw)?)
    }

    /// Read one page of the library index table into `out`
    ///
    /// Fails with `BufferTooSmall` before touching the wire when `out` is
    /// shorter than a page.
    pub async fn read_occupancy_page_into(&self, page: u8, out: &mut [u8]) -> Result<usize> {
        self.read_fixed(Command::ReadConList, &[page], out).await
    }

    /// Read the system parameters
    pub async fn system_parameters(&self) -> Result<SystemParameters> {
        let mut link = self.ready_link().await?;

        let result = read_parameters(&mut link).await;
        link.settle(result).await
    }

    /// Read a random number from the sensor's generator
    pub async fn random_code(&self) -> Result<u32> {
        let mut link = self.ready_link().await?;

        let result = link
            .execute_ok(Command::GetRandomCode, &[])
            .await
            .and_then(|ack| {
                ack.expect_parameters(Command::GetRandomCode)
                    .map(BigEndian::read_u32)
                    .map_err(Error::ProtocolViolation)
            });
        link.settle(result).await
    }

    /// Read a 32-byte notepad page (0-15)
    pub async fn read_notepad(&self, page: u8) -> Result<[u8; notepad::PAGE_SIZE]> {
        let mut out = [0u8; notepad::PAGE_SIZE];
        self.read_notepad_into(page, &mut out).await?;

        Ok(out)
    }

    /// Read a notepad page into `out`
    pub async fn read_notepad_into(&self, page: u8, out: &mut [u8]) -> Result<usize> {
        check_notepad_page(page)?;
        self.read_fixed(Command::ReadNotepad, &[page], out).await
    }

    /// Write up to 32 bytes to a notepad page, zero padded
    pub async fn write_notepad(&self, page: u8, data: &[u8]) -> Result<()> {
        check_notepad_page(page)?;
        if data.len() > notepad::PAGE_SIZE {
            return Err(Error::InvalidArgument(format!(
                "notepad pages hold {} bytes, got {}",
                notepad::PAGE_SIZE,
                data.len()
            )));
        }

        let mut params = [0u8; 1 + notepad::PAGE_SIZE];
        params[0] = page;
        params[1..=data.len()].copy_from_slice(data);

        self.simple(Command::WriteNotepad, &params).await
    }

    /// Send a character file to `buffer`
    pub async fn upload_characteristics(&self, buffer: CharBuffer, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return Err(Error::InvalidArgument("character file is empty".into()));
        }

        let mut link = self.ready_link().await?;
        let result = link.upload(Command::DownChar, &[buffer.id()], data).await;
        link.settle(result).await
    }

    /// Fetch the character file in `buffer`
    pub async fn download_characteristics(&self, buffer: CharBuffer) -> Result<Bytes> {
        let mut out = vec![0u8; self.characteristics_size];
        let received = self.download_characteristics_into(buffer, &mut out).await?;
        out.truncate(received);

        Ok(Bytes::from(out))
    }

    /// Fetch the character file in `buffer` into `out`
    ///
    /// Fails with `BufferTooSmall` before touching the wire when `out` is
    /// shorter than the configured character file size.
    pub async fn download_characteristics_into(&self, buffer: CharBuffer, out: &mut [u8]) -> Result<usize> {
        check_capacity(out, self.characteristics_size)?;

        let mut link = self.ready_link().await?;
        let result = link.download_into(Command::UpChar, &[buffer.id()], out).await;
        link.settle(result).await
    }

    /// Send an image to the image buffer
    pub async fn upload_image_data(&self, image: &FingerprintImage) -> Result<()> {
        let packed = image.to_packed();

        let mut link = self.ready_link().await?;
        let result = link.upload(Command::DownImage, &[], &packed).await;
        link.settle(result).await
    }

    /// Fetch the image buffer
    pub async fn download_image_data(&self) -> Result<FingerprintImage> {
        let mut packed = vec![0u8; transfer::IMAGE_SIZE];

        let received = {
            let mut link = self.ready_link().await?;
            let result = link.download_into(Command::UpImage, &[], &mut packed).await;
            link.settle(result).await?
        };

        Ok(FingerprintImage::from_packed(&packed[..received])?)
    }

    /// Send a BMP file to the image buffer
    pub async fn upload_image(&self, path: impl AsRef<Path>) -> Result<()> {
        let image = FingerprintImage::open(path)?;
        self.upload_image_data(&image).await
    }

    /// Fetch the image buffer into a BMP file
    pub async fn download_image(&self, path: impl AsRef<Path>) -> Result<()> {
        let image = self.download_image_data().await?;
        image.save(path)?;

        Ok(())
    }

    // Helper methods

    async fn lock_in(&self, allowed: &[SessionState]) -> Result<MutexGuard<'_, Link>> {
        let link = self.link.lock().await;
        let state = self.session.state();

        if allowed.contains(&state) {
            Ok(link)
        } else {
            Err(Error::NotReady { state })
        }
    }

    async fn ready_link(&self) -> Result<MutexGuard<'_, Link>> {
        self.lock_in(&[SessionState::Ready]).await
    }

    /// Run a command whose acknowledge carries nothing but the code
    async fn simple(&self, command: Command, parameters: &[u8]) -> Result<()> {
        let mut link = self.ready_link().await?;

        let result = link.execute_ok(command, parameters).await.map(|_| ());
        link.settle(result).await
    }

    /// Run a command returning a fixed-size parameter block into `out`
    async fn read_fixed(&self, command: Command, parameters: &[u8], out: &mut [u8]) -> Result<usize> {
        let size = command.ack_parameter_len();
        check_capacity(out, size)?;

        let mut link = self.ready_link().await?;

        let result = link.execute_ok(command, parameters).await.and_then(|ack| {
            let block = ack
                .expect_parameters(command)
                .map_err(Error::ProtocolViolation)?;
            out[..size].copy_from_slice(block);
            Ok(size)
        });
        link.settle(result).await
    }
}

async fn handshake(link: &mut Link) -> Result<bool> {
    let mut params = [0u8; 4];
    BigEndian::write_u32(&mut params, link.password);

    let ack = link.execute(Command::VfyPwd, &params).await?;
    match ack.code {
        ConfirmationCode::Success => {
            link.session().authenticate()?;
            Ok(true)
        }
        ConfirmationCode::WrongPassword => Ok(false),
        code => Err(rejected(Command::VfyPwd, code)),
    }
}

async fn read_parameters(link: &mut Link) -> Result<SystemParameters> {
    let ack = link.execute_ok(Command::ReadSysPara, &[]).await?;
    let raw = ack
        .expect_parameters(Command::ReadSysPara)
        .map_err(Error::ProtocolViolation)?;

    let params = SystemParameters::from_bytes(raw).map_err(|e| {
        Error::ProtocolViolation(zfm_core::Error::MalformedResponse {
            command: Command::ReadSysPara,
            reason: e.to_string(),
        })
    })?;
    debug!("{}", params);

    link.library_size.get_or_insert(params.library_size);
    Ok(params)
}

async fn library_size(link: &mut Link) -> Result<u16> {
    match link.library_size {
        Some(size) => Ok(size),
        None => Ok(read_parameters(link).await?.library_size),
    }
}

async fn search_slots(link: &mut Link, buffer: CharBuffer, start: u16, count: u16) -> Result<SearchResult> {
    let mut params = [0u8; 5];
    params[0] = buffer.id();
    BigEndian::write_u16(&mut params[1..3], start);
    BigEndian::write_u16(&mut params[3..5], count);

    let ack = link.execute(Command::Search, &params).await?;
    match ack.code {
        ConfirmationCode::Success => {
            let found = ack
                .expect_parameters(Command::Search)
                .map_err(Error::ProtocolViolation)?;

            Ok(SearchResult::Found {
                slot: BigEndian::read_u16(&found[0..2]),
                score: BigEndian::read_u16(&found[2..4]),
            })
        }
        ConfirmationCode::NotFound => Ok(SearchResult::NotFound),
        code => Err(rejected(Command::Search, code)),
    }
}

fn slot_params(buffer: CharBuffer, slot: u16) -> [u8; 3] {
    let mut params = [buffer.id(), 0, 0];
    BigEndian::write_u16(&mut params[1..3], slot);
    params
}

fn check_notepad_page(page: u8) -> Result<()> {
    if page >= notepad::PAGES {
        return Err(Error::InvalidArgument(format!(
            "notepad page must be 0-{}, got {}",
            notepad::PAGES - 1,
            page
        )));
    }
    Ok(())
}

fn check_capacity(out: &[u8], required: usize) -> Result<()> {
    if out.len() < required {
        return Err(Error::BufferTooSmall { required });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use zfm_transport::MockTransport;

    fn sensor(transport: MockTransport) -> Sensor {
        Sensor::with_transport(Box::new(transport), SensorConfig::default()).unwrap()
    }

    // A mock without expectations panics on any call, so these tests also
    // prove that nothing reached the transport.

    #[tokio::test]
    async fn test_operations_require_connection() {
        let sensor = sensor(MockTransport::new());

        assert!(matches!(
            sensor.capture_image().await,
            Err(Error::NotReady { state: SessionState::Disconnected })
        ));
        assert!(matches!(sensor.template_count().await, Err(Error::NotReady { .. })));
        assert!(matches!(sensor.search(CharBuffer::Buffer1).await, Err(Error::NotReady { .. })));
        assert!(matches!(sensor.verify_password().await, Err(Error::NotReady { .. })));
        assert!(matches!(sensor.set_address(1).await, Err(Error::NotReady { .. })));
        assert!(matches!(sensor.download_image_data().await, Err(Error::NotReady { .. })));
        assert_eq!(sensor.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_probes_fail_without_io() {
        let sensor = sensor(MockTransport::new());
        let mut empty = [0u8; 0];

        assert!(matches!(
            sensor.read_notepad_into(0, &mut empty).await,
            Err(Error::BufferTooSmall { required: 32 })
        ));
        assert!(matches!(
            sensor.read_occupancy_page_into(0, &mut empty).await,
            Err(Error::BufferTooSmall { required: 32 })
        ));
        assert!(matches!(
            sensor
                .download_characteristics_into(CharBuffer::Buffer1, &mut [0u8; 100])
                .await,
            Err(Error::BufferTooSmall { required: 512 })
        ));
    }

    #[tokio::test]
    async fn test_arguments_checked_without_io() {
        let sensor = sensor(MockTransport::new());

        assert!(matches!(sensor.read_notepad(16).await, Err(Error::InvalidArgument(_))));
        assert!(matches!(
            sensor.write_notepad(0, &[0u8; 33]).await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(sensor.delete_templates(0, 0).await, Err(Error::InvalidArgument(_))));
        assert!(matches!(
            sensor.upload_characteristics(CharBuffer::Buffer2, &[]).await,
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            sensor.search_range(CharBuffer::Buffer1, 0, 0).await,
            Err(Error::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let mut transport = MockTransport::new();
        transport.expect_is_connected().return_const(false);

        let sensor = sensor(transport);
        sensor.disconnect().await.unwrap();
        sensor.disconnect().await.unwrap();

        assert_eq!(sensor.state(), SessionState::Disconnected);
    }

    #[tokio::test]
    async fn test_open_failure_stays_disconnected() {
        let mut transport = MockTransport::new();
        transport.expect_name().return_const("mock".to_string());
        transport.expect_is_connected().return_const(false);
        transport
            .expect_connect()
            .times(1)
            .returning(|| Err(zfm_transport::Error::ConnectionClosed));

        let sensor = sensor(transport);
        let err = sensor.connect().await.unwrap_err();

        assert!(matches!(err, Error::TransportFailure(_)));
        assert_eq!(sensor.state(), SessionState::Disconnected);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SensorConfig::default().with_baud_rate(12_345);

        assert!(Sensor::with_transport(Box::new(MockTransport::new()), config).is_err());
    }

    #[test]
    fn test_slot_params() {
        assert_eq!(slot_params(CharBuffer::Buffer2, 0x0105), [0x02, 0x01, 0x05]);
    }
}
