//! Command/response exchanges over one transport
//!
//! A [`Link`] owns the transport of a session and runs one exchange at a
//! time: a command packet out, then packets in until the acknowledge from the
//! session address arrives or the deadline passes. The sensor facade keeps the
//! link behind an async mutex, which is what keeps exchanges from
//! interleaving.

use std::time::Duration;

use bytes::BytesMut;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use zfm_core::{Ack, Command, ConfirmationCode, Packet, Session};
use zfm_transport::Transport;
use zfm_types::PacketSize;

use crate::{
    config::SensorConfig,
    error::{Error, Result},
};

pub(crate) struct Link {
    transport: Box<dyn Transport>,
    session: Session,
    pub(crate) password: u32,
    timeout: Duration,
    slow_timeout: Duration,
    pub(crate) data_timeout: Duration,
    pub(crate) packet_size: PacketSize,
    pub(crate) library_size: Option<u16>,
    /// Late bytes from a failed exchange may still be on their way
    dirty: bool,
}

impl Link {
    pub(crate) fn new(transport: Box<dyn Transport>, session: Session, config: &SensorConfig) -> Self {
        Self {
            transport,
            session,
            password: config.password,
            timeout: config.timeout,
            slow_timeout: config.slow_timeout,
            data_timeout: config.data_timeout,
            packet_size: config.packet_size,
            library_size: config.library_size,
            dirty: false,
        }
    }

    pub(crate) fn session(&self) -> &Session {
        &self.session
    }

    pub(crate) fn transport_name(&self) -> String {
        self.transport.name()
    }

    /// Open the transport and mark the session connected
    pub(crate) async fn open(&mut self) -> Result<()> {
        if self.transport.is_connected() {
            warn!("Transport {} still open, reopening", self.transport.name());
            self.transport.disconnect().await?;
        }
        self.session.close();

        self.transport.connect().await?;
        self.session.open()?;
        self.dirty = false;

        Ok(())
    }

    /// Close the transport and the session, whatever their state
    pub(crate) async fn close(&mut self) {
        if self.transport.is_connected() {
            if let Err(e) = self.transport.disconnect().await {
                warn!("Failed to close {}: {}", self.transport.name(), e);
            }
        }
        self.session.close();
    }

    /// Leave the link in a usable state after a failed operation
    ///
    /// Timeouts and protocol violations may leave stray bytes behind, so the
    /// input buffer is flushed now and again before the next command goes out.
    /// Transport and handshake failures close the session.
    pub(crate) async fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        match &result {
            Err(e @ (Error::Timeout(_) | Error::ProtocolViolation(_))) => {
                warn!("{}, flushing input", e);
                self.dirty = true;
                if let Err(flush) = self.transport.clear_input().await {
                    warn!("Failed to flush input: {}", flush);
                }
            }
            Err(e) if e.requires_reconnect() => {
                warn!("{}, closing session", e);
                self.close().await;
            }
            _ => {}
        }
        result
    }

    /// Run one command and return its acknowledge, whatever the code
    pub(crate) async fn execute(&mut self, command: Command, parameters: &[u8]) -> Result<Ack> {
        self.exchange(command, parameters, None).await
    }

    /// Run one command, failing with `DeviceRejected` on a non-zero code
    pub(crate) async fn execute_ok(&mut self, command: Command, parameters: &[u8]) -> Result<Ack> {
        let ack = self.execute(command, parameters).await?;
        ensure_success(command, ack)
    }

    /// Run one command, also accepting the acknowledge from `alternate`
    pub(crate) async fn exchange(
        &mut self,
        command: Command,
        parameters: &[u8],
        alternate: Option<u32>,
    ) -> Result<Ack> {
        let timeout = if command.is_slow() {
            self.slow_timeout
        } else {
            self.timeout
        };

        let packet = Packet::command(command, self.session.address(), parameters)?;

        if self.dirty {
            debug!("Discarding late input before {}", command);
            self.transport.clear_input().await?;
            self.dirty = false;
        }

        debug!("-> {}", command);
        self.send_packet(&packet).await?;

        let packet = self.receive_addressed(timeout, alternate).await?;
        let ack = Ack::from_packet(packet).map_err(Error::ProtocolViolation)?;

        self.session.record_code(ack.code);
        debug!("<- {} {}", command, ack.code);

        Ok(ack)
    }

    pub(crate) async fn send_packet(&mut self, packet: &Packet) -> Result<()> {
        trace!("Sending: {:?}", packet);

        let data = packet.encode();
        self.transport.send(&data).await?;

        Ok(())
    }

    /// Receive the next packet from the session address (or `alternate`)
    ///
    /// Well-formed packets from other addresses are dropped while the
    /// deadline keeps running.
    pub(crate) async fn receive_addressed(
        &mut self,
        timeout: Duration,
        alternate: Option<u32>,
    ) -> Result<Packet> {
        let deadline = Instant::now() + timeout;

        loop {
            let packet = self.receive_packet(deadline, timeout).await?;
            let address = self.session.address();

            if packet.address == address || Some(packet.address) == alternate {
                return Ok(packet);
            }

            warn!(
                "Ignoring {} from 0x{:08X}, expected 0x{:08X}",
                packet.packet_type, packet.address, address
            );
        }
    }

    async fn receive_packet(&mut self, deadline: Instant, timeout: Duration) -> Result<Packet> {
        let mut buf = BytesMut::with_capacity(Packet::HEADER_SIZE + Packet::MAX_PAYLOAD_SIZE + 2);
        let mut needed = Packet::HEADER_SIZE;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(Error::Timeout(timeout));
            }

            let chunk = self
                .transport
                .read_exact(needed, remaining)
                .await
                .map_err(|e| match e {
                    zfm_transport::Error::ReadTimeout(_) => Error::Timeout(timeout),
                    other => Error::TransportFailure(other),
                })?;
            buf.extend_from_slice(&chunk);

            match Packet::decode(&buf) {
                Ok(packet) => {
                    trace!("Received: {:?}", packet);
                    return Ok(packet);
                }
                Err(zfm_core::Error::Incomplete { needed: more, .. }) => needed = more,
                Err(e) => return Err(Error::ProtocolViolation(e)),
            }
        }
    }
}

pub(crate) fn ensure_success(command: Command, ack: Ack) -> Result<Ack> {
    if ack.is_success() {
        Ok(ack)
    } else {
        Err(rejected(command, ack.code))
    }
}

pub(crate) fn rejected(command: Command, code: ConfirmationCode) -> Error {
    Error::DeviceRejected { command, code }
}
