//! Device error taxonomy
//!
//! Every failure a client can observe at the device surface, with the stable
//! errno-style code that device-node glue reports for it.

use crate::types::BusStatus;
use thiserror::Error;

/// Errno-style codes for the device surface.
///
/// Values follow the conventional Linux numbers; glue layers negate them when
/// reporting to userspace (see [`DeviceError::errno`]).
pub mod errno {
    /// I/O error (failed bus exchange)
    pub const EIO: i32 = 5;
    /// Bad file handle (no valid session)
    pub const EBADF: i32 = 9;
    /// Out of memory (device could not be constructed)
    pub const ENOMEM: i32 = 12;
    /// Bad address (payload could not be staged)
    pub const EFAULT: i32 = 14;
    /// Device busy (session already held)
    pub const EBUSY: i32 = 16;
    /// Message too long for the transfer buffers
    pub const EMSGSIZE: i32 = 90;
}

/// Errors surfaced by the session/transfer core
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// Open was called while another session holds the device.
    #[error("device already opened by another session")]
    SessionConflict,

    /// Transfer length exceeds the fixed buffer capacity.
    ///
    /// Checked before any buffer or hardware action, so a rejected call has
    /// zero side effects.
    #[error("message of {len} bytes exceeds buffer capacity of {capacity}")]
    MessageTooLarge { len: usize, capacity: usize },

    /// The payload source could not be read while staging the outbound
    /// buffer. The buffer is left unmodified and no exchange is attempted.
    #[error("payload could not be staged into the outbound buffer")]
    CopyFault,

    /// The host bus reported a nonzero status. Surfaced verbatim, no retry.
    #[error("bus exchange failed with {0}")]
    Bus(BusStatus),

    /// Read/write was presented without a valid, still-open session.
    ///
    /// The base contract makes holding a session a caller obligation; this
    /// implementation checks defensively and rejects rather than operating on
    /// an unbound device.
    #[error("no open session for this device")]
    NotOpen,

    /// The device could not be constructed at attach time.
    #[error("device allocation failed: {0}")]
    AllocationFailure(String),
}

impl DeviceError {
    /// Negative errno-style code for device-node glue.
    ///
    /// A failed bus exchange reports the bus status itself, negated, so the
    /// underlying cause is not collapsed to a generic `-EIO` when the bus
    /// gave something more specific.
    pub fn errno(&self) -> i32 {
        match self {
            DeviceError::SessionConflict => -errno::EBUSY,
            DeviceError::MessageTooLarge { .. } => -errno::EMSGSIZE,
            DeviceError::CopyFault => -errno::EFAULT,
            DeviceError::Bus(status) => {
                let code = status.get().abs();
                if code == 0 { -errno::EIO } else { -code }
            }
            DeviceError::NotOpen => -errno::EBADF,
            DeviceError::AllocationFailure(_) => -errno::ENOMEM,
        }
    }
}

/// Type alias for device-surface results
pub type Result<T> = std::result::Result<T, DeviceError>;
