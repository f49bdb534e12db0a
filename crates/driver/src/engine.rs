//! Bounded double-buffer transfer engine
//!
//! Owns the outbound/inbound staging buffers and the configured clock rate.
//! Both buffers are allocated once and reused in place for every transfer;
//! nothing here hands client memory to the bus.

use crate::bus::HostBus;
use protocol::{DeviceError, TransferOutcome};
use std::io::Read;
use tracing::{debug, warn};

pub struct TransferEngine {
    tx_buf: Box<[u8]>,
    rx_buf: Box<[u8]>,
    clock_hz: u32,
}

impl TransferEngine {
    pub fn new(capacity: usize, clock_hz: u32) -> Self {
        Self {
            tx_buf: vec![0u8; capacity].into_boxed_slice(),
            rx_buf: vec![0u8; capacity].into_boxed_slice(),
            clock_hz,
        }
    }

    /// Capacity C of each staging buffer.
    pub fn capacity(&self) -> usize {
        self.tx_buf.len()
    }

    pub fn clock_hz(&self) -> u32 {
        self.clock_hz
    }

    /// Copy a payload into the outbound buffer.
    ///
    /// Length is checked against the capacity by the caller before any
    /// buffer is touched.
    pub fn stage_outbound(&mut self, payload: &[u8]) {
        debug_assert!(payload.len() <= self.capacity());
        self.tx_buf[..payload.len()].copy_from_slice(payload);
    }

    /// Stage `len` bytes from a fallible source into the outbound buffer.
    ///
    /// The source is read into the inbound buffer first; its contents are
    /// dead between exchanges, so a source that fails partway cannot corrupt
    /// the outbound stream. Only a fully read payload is committed.
    pub fn stage_outbound_from(
        &mut self,
        source: &mut dyn Read,
        len: usize,
    ) -> Result<(), DeviceError> {
        debug_assert!(len <= self.capacity());
        if let Err(err) = source.read_exact(&mut self.rx_buf[..len]) {
            warn!("failed to stage {} byte payload: {}", len, err);
            return Err(DeviceError::CopyFault);
        }
        self.tx_buf[..len].copy_from_slice(&self.rx_buf[..len]);
        Ok(())
    }

    /// Run one full-duplex exchange of `len` bytes against the bus.
    ///
    /// The outbound buffer is the transmit stream and the inbound buffer the
    /// receive capture. Blocks until the bus completes or fails; a nonzero
    /// status is surfaced verbatim with no retry.
    pub fn exchange<B: HostBus>(
        &mut self,
        bus: &mut B,
        len: usize,
    ) -> Result<TransferOutcome, DeviceError> {
        debug_assert!(len <= self.capacity());
        match bus.exchange(&self.tx_buf[..len], &mut self.rx_buf[..len], self.clock_hz) {
            Ok(actual) => {
                debug!("exchanged {}/{} bytes at {} Hz", actual, len, self.clock_hz);
                Ok(TransferOutcome::new(len, actual.min(len)))
            }
            Err(status) => {
                warn!("bus exchange of {} bytes failed with {}", len, status);
                Err(DeviceError::Bus(status))
            }
        }
    }

    /// Copy the most recent capture out to the caller's destination.
    pub fn drain_inbound(&self, dest: &mut [u8]) {
        debug_assert!(dest.len() <= self.capacity());
        dest.copy_from_slice(&self.rx_buf[..dest.len()]);
    }

    #[cfg(test)]
    fn outbound(&self, len: usize) -> &[u8] {
        &self.tx_buf[..len]
    }
}
