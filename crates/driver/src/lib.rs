//! Session/transfer core for an SPI-attached peripheral
//!
//! Brokers exclusive, synchronous, full-duplex byte exchanges between exactly
//! one client and a single attached peripheral on a clocked serial bus.
//! Every transfer flows through a pair of fixed-capacity staging buffers
//! owned by the device; client memory is never handed to the hardware
//! exchange primitive. One mutex serializes buffer mutation, session state,
//! and the exchange itself, so "stage, exchange, drain" is a single atomic
//! step as seen by every other caller.
//!
//! The electrical protocol lives behind the [`HostBus`] trait: production
//! uses [`spi::SpiDevBus`] over `/dev/spidev*`, tests use
//! [`test_utils::MockBus`].
//!
//! # Example
//!
//! ```
//! use driver::{DeviceConfig, DeviceRegistry};
//! use driver::test_utils::MockBus;
//!
//! let mut registry = DeviceRegistry::new();
//! let device = registry
//!     .attach(MockBus::new().with_echo(), &DeviceConfig::default())
//!     .unwrap();
//!
//! let session = device.open().unwrap();
//! assert_eq!(device.write(&session, b"PING").unwrap(), 4);
//!
//! let mut capture = [0u8; 4];
//! device.read(&session, &mut capture).unwrap();
//! assert_eq!(&capture, b"PING");
//!
//! device.release(&session);
//! ```

pub mod bus;
pub mod config;
pub mod device;
pub mod engine;
pub mod logging;
pub mod registry;
pub mod session;
#[cfg(target_os = "linux")]
pub mod spi;
pub mod test_utils;

pub use bus::HostBus;
pub use config::{CtlConfig, DeviceConfig};
pub use device::Device;
pub use logging::setup_logging;
pub use registry::DeviceRegistry;
pub use session::Session;
#[cfg(target_os = "linux")]
pub use spi::SpiDevBus;
