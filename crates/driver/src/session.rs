//! Session exclusivity
//!
//! At most one client owns the device at any instant. A [`Session`] is the
//! opaque capability proving ownership; every transfer presents it and the
//! state checks it against the current open generation.

use protocol::{DeviceError, DeviceId};

/// Capability proving its holder opened the device.
///
/// Not clonable: there is never more than one live session per device.
/// Dropping the token does NOT release the device — call
/// [`Device::release`](crate::Device::release). A token kept past its
/// release is stale; transfers reject it with `NotOpen`.
#[derive(Debug)]
pub struct Session {
    device: DeviceId,
    epoch: u64,
}

impl Session {
    /// Device this session was minted for.
    pub fn device(&self) -> DeviceId {
        self.device
    }

    pub(crate) fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Open/closed flag plus the open-generation counter.
///
/// The generation distinguishes successive sessions, so a stale capability
/// from an earlier open is rejected rather than silently honored.
#[derive(Debug, Default)]
pub struct SessionState {
    opened: bool,
    epoch: u64,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the device.
    ///
    /// Fails with `SessionConflict` while another session holds it; the
    /// state is unchanged in that case. Never touches the buffers.
    pub fn open(&mut self, device: DeviceId) -> Result<Session, DeviceError> {
        if self.opened {
            return Err(DeviceError::SessionConflict);
        }
        self.opened = true;
        self.epoch += 1;
        Ok(Session {
            device,
            epoch: self.epoch,
        })
    }

    /// Clear the session flag unconditionally.
    ///
    /// Holding a valid, still-open session is the caller's obligation:
    /// releasing with a stale token after another client reopened closes
    /// that client's session.
    pub fn release(&mut self) {
        self.opened = false;
    }

    /// Whether `session` is the live session for `device`.
    pub fn is_current(&self, device: DeviceId, session: &Session) -> bool {
        self.opened && session.device == device && session.epoch == self.epoch
    }

    pub fn is_opened(&self) -> bool {
        self.opened
    }
}
