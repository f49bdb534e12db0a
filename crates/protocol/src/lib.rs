//! Protocol library for rust-spi-dev
//!
//! This crate defines the contract between the SPI transfer core and its
//! clients: the device-surface types and the error taxonomy, including the
//! errno-style codes that device-node glue reports to userspace.
//!
//! # Example
//!
//! ```
//! use protocol::{DeviceError, TransferOutcome};
//!
//! let outcome = TransferOutcome::new(4, 4);
//! assert!(outcome.is_complete());
//!
//! // Every error maps to a stable negative errno-style code.
//! let err = DeviceError::SessionConflict;
//! assert_eq!(err.errno(), -protocol::errno::EBUSY);
//! ```

pub mod error;
pub mod types;

pub use error::{DeviceError, Result, errno};
pub use types::{BusStatus, DeviceId, SpiMode, TransferOutcome};
