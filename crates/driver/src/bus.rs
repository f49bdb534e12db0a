//! Host bus contract
//!
//! The transfer core never implements the electrical protocol. It presents
//! both of its buffer windows to a [`HostBus`] implementation and blocks
//! until the exchange is done.

use protocol::BusStatus;

/// One synchronous full-duplex exchange primitive.
///
/// Implementations own the peripheral handle and everything electrical,
/// including any interrupt suppression the platform needs for a correct
/// exchange; none of that leaks into the transfer core.
pub trait HostBus: Send {
    /// Clock `tx` out while capturing into `rx` at `clock_hz`.
    ///
    /// `tx` and `rx` have the same length. Blocks the calling thread until
    /// the bus completes or fails; there is no timeout at this layer.
    /// `Ok(n)` is the actual number of bytes exchanged (`n <= tx.len()`),
    /// `Err` carries the nonzero status.
    fn exchange(&mut self, tx: &[u8], rx: &mut [u8], clock_hz: u32) -> Result<usize, BusStatus>;
}
