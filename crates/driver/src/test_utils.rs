//! Test utilities for rust-spi-dev
//!
//! A scripted in-memory host bus plus an observation probe, shared by unit
//! and integration tests.
//!
//! # Example
//!
//! ```
//! use driver::bus::HostBus;
//! use driver::test_utils::MockBus;
//!
//! let mut bus = MockBus::new().with_echo();
//! let probe = bus.probe();
//!
//! let mut rx = [0u8; 4];
//! bus.exchange(b"PING", &mut rx, 1_000_000).unwrap();
//! assert_eq!(&rx, b"PING");
//! assert_eq!(probe.exchange_count(), 1);
//! ```

use crate::bus::HostBus;
use protocol::BusStatus;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// One exchange as the bus saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRecord {
    /// Outbound stream presented to the bus
    pub tx: Vec<u8>,
    /// Clock rate the exchange ran at
    pub clock_hz: u32,
}

#[derive(Debug, Default)]
struct MockState {
    exchanges: AtomicUsize,
    history: Mutex<Vec<ExchangeRecord>>,
}

/// Scripted in-memory host bus.
///
/// By default every exchange succeeds with an all-zero capture. Builders
/// configure echoing, a scripted response, failure injection, short
/// transfers, and artificial latency for concurrency tests.
#[derive(Debug, Default)]
pub struct MockBus {
    state: Arc<MockState>,
    echo: bool,
    response: Vec<u8>,
    fail_status: Option<i32>,
    short_by: usize,
    latency: Duration,
}

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture = stream: the peripheral echoes every byte back.
    pub fn with_echo(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Scripted capture, zero-padded to each transfer's length.
    pub fn with_response(mut self, bytes: &[u8]) -> Self {
        self.response = bytes.to_vec();
        self
    }

    /// Every exchange fails with this nonzero status.
    pub fn with_failure(mut self, status: i32) -> Self {
        self.fail_status = Some(status);
        self
    }

    /// Report this many fewer bytes than requested.
    pub fn with_short_transfers(mut self, short_by: usize) -> Self {
        self.short_by = short_by;
        self
    }

    /// Hold every exchange for `latency` before completing. Other callers
    /// stay blocked on the device guard meanwhile, which is what the
    /// concurrency tests observe.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Observation handle that stays valid after the bus moves into a
    /// device.
    pub fn probe(&self) -> MockProbe {
        MockProbe {
            state: self.state.clone(),
        }
    }
}

impl HostBus for MockBus {
    fn exchange(&mut self, tx: &[u8], rx: &mut [u8], clock_hz: u32) -> Result<usize, BusStatus> {
        // Recorded at entry, before any scripted latency, so probes can see
        // an exchange that is still in flight.
        self.state.exchanges.fetch_add(1, Ordering::SeqCst);
        self.state.history.lock().unwrap().push(ExchangeRecord {
            tx: tx.to_vec(),
            clock_hz,
        });

        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }

        if let Some(status) = self.fail_status {
            return Err(BusStatus(status));
        }

        if self.echo {
            rx.copy_from_slice(tx);
        } else {
            let n = self.response.len().min(rx.len());
            rx[..n].copy_from_slice(&self.response[..n]);
            rx[n..].fill(0);
        }

        Ok(tx.len().saturating_sub(self.short_by))
    }
}

/// Shared view of a [`MockBus`]'s recorded activity.
#[derive(Debug, Clone)]
pub struct MockProbe {
    state: Arc<MockState>,
}

impl MockProbe {
    /// Number of exchanges the bus was asked to run.
    pub fn exchange_count(&self) -> usize {
        self.state.exchanges.load(Ordering::SeqCst)
    }

    /// Every exchange so far, oldest first.
    pub fn history(&self) -> Vec<ExchangeRecord> {
        self.state.history.lock().unwrap().clone()
    }

    /// The most recent exchange, if any.
    pub fn last_exchange(&self) -> Option<ExchangeRecord> {
        self.state.history.lock().unwrap().last().cloned()
    }
}
