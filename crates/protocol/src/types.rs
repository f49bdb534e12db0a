//! Device-surface type definitions
//!
//! This module defines the types clients see at the byte-stream device
//! surface: device identity, SPI mode, bus status, and transfer outcomes.

use serde::{Deserialize, Serialize};

/// Unique device identifier (registry-assigned)
///
/// Assigned when the peripheral is attached and stable until it is detached.
/// Device-node glue uses this to route node operations to the right device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub u32);

impl std::fmt::Display for DeviceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "spi{}", self.0)
    }
}

/// SPI clock/phase mode
///
/// Standard modes 0-3 (CPOL/CPHA combinations). The attached peripheral
/// dictates which mode is correct; it is fixed at attach time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpiMode {
    /// CPOL=0, CPHA=0
    #[default]
    Mode0,
    /// CPOL=0, CPHA=1
    Mode1,
    /// CPOL=1, CPHA=0
    Mode2,
    /// CPOL=1, CPHA=1
    Mode3,
}

impl SpiMode {
    /// Mode number as used by the kernel interface (0-3).
    pub fn number(self) -> u8 {
        match self {
            SpiMode::Mode0 => 0,
            SpiMode::Mode1 => 1,
            SpiMode::Mode2 => 2,
            SpiMode::Mode3 => 3,
        }
    }

    /// Parse a kernel mode number. Returns `None` for anything above 3.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            0 => Some(SpiMode::Mode0),
            1 => Some(SpiMode::Mode1),
            2 => Some(SpiMode::Mode2),
            3 => Some(SpiMode::Mode3),
            _ => None,
        }
    }
}

/// Nonzero status reported by a failed bus exchange
///
/// The host bus layer reports status 0 for success; any nonzero value is a
/// failure and is surfaced to clients verbatim, without retry. On Linux this
/// is the positive errno from the underlying ioctl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusStatus(pub i32);

impl BusStatus {
    /// Raw status value.
    pub fn get(self) -> i32 {
        self.0
    }
}

impl std::fmt::Display for BusStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "status {}", self.0)
    }
}

/// Result of one successful full-duplex exchange
///
/// Carries the requested length and the actual number of bytes the bus
/// reported as exchanged (`0 <= transferred <= requested`). Failures are
/// reported as [`DeviceError::Bus`](crate::DeviceError::Bus) instead, so an
/// outcome always means status 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferOutcome {
    /// Length the client asked to exchange
    pub requested: usize,
    /// Bytes the bus actually clocked through
    pub transferred: usize,
}

impl TransferOutcome {
    pub fn new(requested: usize, transferred: usize) -> Self {
        Self {
            requested,
            transferred,
        }
    }

    /// True when the bus exchanged every requested byte.
    pub fn is_complete(&self) -> bool {
        self.transferred == self.requested
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_copy_and_display() {
        let id1 = DeviceId(3);
        let id2 = id1;
        assert_eq!(id1, id2);
        assert_eq!(id1.to_string(), "spi3");
    }

    #[test]
    fn test_spi_mode_numbers() {
        assert_eq!(SpiMode::Mode0.number(), 0);
        assert_eq!(SpiMode::Mode3.number(), 3);
        assert_eq!(SpiMode::from_number(2), Some(SpiMode::Mode2));
        assert_eq!(SpiMode::from_number(4), None);
        assert_eq!(SpiMode::default(), SpiMode::Mode0);
    }

    #[test]
    fn test_outcome_completeness() {
        assert!(TransferOutcome::new(4, 4).is_complete());
        assert!(!TransferOutcome::new(4, 2).is_complete());
        assert!(TransferOutcome::new(0, 0).is_complete());
    }
}
