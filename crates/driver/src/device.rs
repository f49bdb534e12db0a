//! Device composition root
//!
//! Binds one host bus handle, one transfer engine, and the session state
//! under a single mutex. That mutex is the concurrency guard: staging,
//! exchanging, and draining happen inside one critical section, so every
//! transfer is a single atomic step as observed by any other caller on the
//! same device. The only blocking work inside the section is the hardware
//! exchange itself.

use crate::bus::HostBus;
use crate::config::DeviceConfig;
use crate::engine::TransferEngine;
use crate::session::{Session, SessionState};
use protocol::{DeviceError, DeviceId};
use std::io::Read;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, warn};

struct Inner<B> {
    bus: B,
    engine: TransferEngine,
    session: SessionState,
}

impl<B> Inner<B> {
    fn ensure_session(&self, device: DeviceId, session: &Session) -> Result<(), DeviceError> {
        if self.session.is_current(device, session) {
            Ok(())
        } else {
            Err(DeviceError::NotOpen)
        }
    }
}

/// One attached peripheral.
///
/// Created by [`DeviceRegistry::attach`](crate::DeviceRegistry::attach) when
/// the peripheral is discovered and dropped at detach; it persists across
/// arbitrarily many open/release cycles. Values are threaded explicitly to
/// every caller — there is no process-wide device.
pub struct Device<B: HostBus> {
    id: DeviceId,
    capacity: usize,
    clock_hz: u32,
    inner: Mutex<Inner<B>>,
}

impl<B: HostBus> Device<B> {
    /// Build a device over `bus` from a validated config.
    ///
    /// Both staging buffers are allocated here, once, and reused in place
    /// for every transfer afterwards. Fails with `AllocationFailure` if the
    /// config cannot describe a usable device.
    pub fn new(id: DeviceId, bus: B, config: &DeviceConfig) -> Result<Self, DeviceError> {
        config.validate()?;
        Ok(Self {
            id,
            capacity: config.capacity,
            clock_hz: config.clock_hz,
            inner: Mutex::new(Inner {
                bus,
                engine: TransferEngine::new(config.capacity, config.clock_hz),
                session: SessionState::new(),
            }),
        })
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Capacity C of each staging buffer, in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    /// Whether a session currently holds the device.
    ///
    /// Diagnostic only: the answer is stale the moment the guard drops.
    pub fn is_open(&self) -> bool {
        self.lock().session.is_opened()
    }

    /// Claim exclusive ownership of the device.
    ///
    /// Fails with `SessionConflict` while another session holds it. Does not
    /// touch the buffers.
    pub fn open(&self) -> Result<Session, DeviceError> {
        let mut inner = self.lock();
        let session = inner.session.open(self.id)?;
        debug!("device {} opened (epoch {})", self.id, session.epoch());
        Ok(session)
    }

    /// Give up ownership of the device.
    ///
    /// Clears the session flag unconditionally; presenting a valid,
    /// still-open session is the caller's obligation. A stale token is
    /// honored (and logged), exactly as the device-node contract demands.
    pub fn release(&self, session: &Session) {
        let mut inner = self.lock();
        if !inner.session.is_current(self.id, session) {
            warn!("device {} released with a stale session token", self.id);
        }
        inner.session.release();
        debug!("device {} released", self.id);
    }

    /// Stage `payload` into the outbound buffer and clock it out, capturing
    /// the peripheral's simultaneous response into the inbound buffer.
    ///
    /// Returns the actual number of bytes exchanged. Oversize payloads are
    /// rejected with `MessageTooLarge` before anything is touched.
    pub fn write(&self, session: &Session, payload: &[u8]) -> Result<usize, DeviceError> {
        self.check_len(payload.len())?;
        let mut guard = self.lock();
        guard.ensure_session(self.id, session)?;

        let inner = &mut *guard;
        inner.engine.stage_outbound(payload);
        let outcome = inner.engine.exchange(&mut inner.bus, payload.len())?;
        debug!(
            "device {} wrote {}/{} bytes",
            self.id, outcome.transferred, outcome.requested
        );
        Ok(outcome.transferred)
    }

    /// Like [`write`](Self::write), but stages from a fallible byte source
    /// (e.g. a stream handed over by node glue).
    ///
    /// A source failure is a `CopyFault`: the outbound buffer is left
    /// unmodified and no exchange is attempted.
    pub fn write_from(
        &self,
        session: &Session,
        source: &mut dyn Read,
        len: usize,
    ) -> Result<usize, DeviceError> {
        self.check_len(len)?;
        let mut guard = self.lock();
        guard.ensure_session(self.id, session)?;

        let inner = &mut *guard;
        inner.engine.stage_outbound_from(source, len)?;
        let outcome = inner.engine.exchange(&mut inner.bus, len)?;
        debug!(
            "device {} wrote {}/{} bytes from source",
            self.id, outcome.transferred, outcome.requested
        );
        Ok(outcome.transferred)
    }

    /// Exchange `dest.len()` bytes against the current outbound buffer
    /// contents and copy the capture out to `dest`.
    ///
    /// The capture always lands in the device's own inbound buffer first and
    /// is copied out afterwards; client memory is never presented to the
    /// bus. Returns the actual number of bytes exchanged.
    pub fn read(&self, session: &Session, dest: &mut [u8]) -> Result<usize, DeviceError> {
        self.check_len(dest.len())?;
        let mut guard = self.lock();
        guard.ensure_session(self.id, session)?;

        let inner = &mut *guard;
        let outcome = inner.engine.exchange(&mut inner.bus, dest.len())?;
        inner.engine.drain_inbound(&mut dest[..outcome.transferred]);
        debug!(
            "device {} read {}/{} bytes",
            self.id, outcome.transferred, outcome.requested
        );
        Ok(outcome.transferred)
    }

    fn check_len(&self, len: usize) -> Result<(), DeviceError> {
        if len > self.capacity {
            return Err(DeviceError::MessageTooLarge {
                len,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Inner<B>> {
        // Every operation restages the bytes it depends on, so a guard
        // poisoned by a panicking thread is recovered, not propagated.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
