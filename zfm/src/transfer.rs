//! Bulk transfers of character files and images

use bytes::Bytes;
use tracing::{debug, warn};

use zfm_core::{
    chunk::{self, Progress, Reassembler},
    Command, Packet,
};

use crate::{
    error::{Error, Result},
    link::Link,
};

impl Link {
    /// Trigger an upload with `command`, then stream `data` to the sensor
    ///
    /// The sensor does not acknowledge individual data packets.
    pub(crate) async fn upload(&mut self, command: Command, parameters: &[u8], data: &[u8]) -> Result<()> {
        if !command.starts_upload() {
            return Err(Error::InvalidArgument(format!("{} does not accept data", command)));
        }
        if data.is_empty() {
            return Err(Error::InvalidArgument("nothing to upload".into()));
        }

        let chunks = chunk::split(data, self.packet_size.bytes())?;
        let count = chunks.len();

        self.execute_ok(command, parameters).await?;

        let address = self.session().address();
        for (packet_type, payload) in chunks {
            let packet = Packet::new(packet_type, address, Bytes::copy_from_slice(payload))?;
            self.send_packet(&packet).await?;
        }

        debug!("Uploaded {} bytes in {} packets", data.len(), count);
        Ok(())
    }

    /// Trigger a download with `command` and reassemble the reply into `out`
    ///
    /// Returns the number of bytes received. When the sensor sends more than
    /// `out` holds, the transfer is still drained to its end before failing
    /// with `BufferTooSmall`.
    pub(crate) async fn download_into(
        &mut self,
        command: Command,
        parameters: &[u8],
        out: &mut [u8],
    ) -> Result<usize> {
        if !command.starts_download() {
            return Err(Error::InvalidArgument(format!("{} sends no data", command)));
        }

        self.execute_ok(command, parameters).await?;

        let capacity = out.len();
        let mut reassembler = Reassembler::new(out);

        loop {
            let packet = self.receive_addressed(self.data_timeout, None).await?;
            match reassembler.push(&packet).map_err(Error::ProtocolViolation)? {
                Progress::More => {}
                Progress::Done => break,
            }
        }

        if reassembler.overflowed() {
            warn!(
                "{} sent {} bytes, only {} fit",
                command,
                reassembler.received(),
                capacity
            );
        }

        let packets = reassembler.packets();
        let received = reassembler.finish()?;
        debug!("Downloaded {} bytes in {} packets", received, packets);

        Ok(received)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SensorConfig;
    use zfm_core::Session;
    use zfm_transport::MockTransport;

    fn link() -> Link {
        let config = SensorConfig::default();
        Link::new(Box::new(MockTransport::new()), Session::new(config.address), &config)
    }

    #[tokio::test]
    async fn test_transfer_direction_checked_without_io() {
        let mut link = link();

        let err = link.upload(Command::UpChar, &[1], &[0xAA]).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let mut out = [0u8; 16];
        let err = link.download_into(Command::DownImage, &[], &mut out).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
