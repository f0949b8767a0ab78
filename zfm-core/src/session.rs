//! Session management for the ZFM protocol
//!
//! A session represents one connection to a sensor and tracks:
//! - Lifecycle state (disconnected, connected, ready)
//! - The module address every packet is sent to
//! - The last confirmation code the device returned

use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};
use std::sync::Arc;

use crate::{
    confirmation::ConfirmationCode,
    constants::DEFAULT_ADDRESS,
    error::{Error, Result},
};

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport closed
    Disconnected,

    /// Transport open, password not yet verified
    Connected,

    /// Password verified, ready for commands
    Ready,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => f.write_str("disconnected"),
            Self::Connected => f.write_str("connected"),
            Self::Ready => f.write_str("ready"),
        }
    }
}

/// Session manager
///
/// Manages session state, the module address and the last confirmation code.
/// Thread-safe and can be cloned cheaply (Arc internally), so the state can
/// be inspected while an exchange holds the link.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    /// Address packets are sent to and accepted from
    address: AtomicU32,

    /// Raw value of the last confirmation code observed
    last_code: AtomicU8,

    /// Current session state
    state: parking_lot::RwLock<SessionState>,
}

impl Session {
    /// Create a new disconnected session targeting `address`
    pub fn new(address: u32) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                address: AtomicU32::new(address),
                last_code: AtomicU8::new(ConfirmationCode::Success.code()),
                state: parking_lot::RwLock::new(SessionState::Disconnected),
            }),
        }
    }

    /// Get the module address
    pub fn address(&self) -> u32 {
        self.inner.address.load(Ordering::Acquire)
    }

    /// Point the session at a new module address
    pub fn set_address(&self, address: u32) {
        self.inner.address.store(address, Ordering::Release);
    }

    /// Get the last confirmation code observed
    pub fn last_code(&self) -> ConfirmationCode {
        ConfirmationCode::from(self.inner.last_code.load(Ordering::Acquire))
    }

    /// Record a confirmation code received from the device
    pub fn record_code(&self, code: ConfirmationCode) {
        self.inner.last_code.store(code.code(), Ordering::Release);
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        *self.inner.state.read()
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        !matches!(self.state(), SessionState::Disconnected)
    }

    /// Check if ready for commands
    pub fn is_ready(&self) -> bool {
        matches!(self.state(), SessionState::Ready)
    }

    /// Mark the transport as open
    pub fn open(&self) -> Result<()> {
        let mut state = self.inner.state.write();

        if *state != SessionState::Disconnected {
            return Err(Error::InvalidSessionState(format!(
                "Cannot open from state: {:?}",
                *state
            )));
        }

        self.inner
            .last_code
            .store(ConfirmationCode::Success.code(), Ordering::Release);
        *state = SessionState::Connected;

        Ok(())
    }

    /// Mark the password as verified
    pub fn authenticate(&self) -> Result<()> {
        let mut state = self.inner.state.write();

        match *state {
            SessionState::Connected | SessionState::Ready => {
                *state = SessionState::Ready;
                Ok(())
            }
            SessionState::Disconnected => Err(Error::InvalidSessionState(format!(
                "Cannot authenticate from state: {:?}",
                *state
            ))),
        }
    }

    /// Close session
    ///
    /// The address is kept: it belongs to the module, not to the connection.
    pub fn close(&self) {
        *self.inner.state.write() = SessionState::Disconnected;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS)
    }
}
