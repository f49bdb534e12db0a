//! Linux spidev-backed host bus
//!
//! Wraps the kernel's userspace SPI interface (`/dev/spidevB.C`). The
//! kernel side owns chip select, interrupt masking, and DMA; this wrapper
//! only maps the exchange contract onto the ioctl.

use crate::bus::HostBus;
use protocol::{BusStatus, SpiMode, errno};
use spidev::{SpiModeFlags, Spidev, SpidevOptions, SpidevTransfer};
use std::io;
use std::path::Path;
use tracing::{debug, warn};

pub struct SpiDevBus {
    spi: Spidev,
    mode: SpiMode,
    configured_hz: u32,
}

impl SpiDevBus {
    /// Open and configure a spidev node for 8-bit transfers at `clock_hz`.
    pub fn open<P: AsRef<Path>>(path: P, clock_hz: u32, mode: SpiMode) -> io::Result<Self> {
        let mut spi = Spidev::open(&path)?;
        spi.configure(&bus_options(clock_hz, mode))?;
        debug!(
            "configured {} at {} Hz, mode {}",
            path.as_ref().display(),
            clock_hz,
            mode.number()
        );
        Ok(Self {
            spi,
            mode,
            configured_hz: clock_hz,
        })
    }
}

impl HostBus for SpiDevBus {
    fn exchange(&mut self, tx: &[u8], rx: &mut [u8], clock_hz: u32) -> Result<usize, BusStatus> {
        // The device's clock rate is fixed at attach, so this reconfigure
        // only fires if a future caller varies it per exchange.
        if clock_hz != self.configured_hz {
            self.spi
                .configure(&bus_options(clock_hz, self.mode))
                .map_err(|err| {
                    warn!("failed to reclock bus to {} Hz: {}", clock_hz, err);
                    map_io_error(&err)
                })?;
            self.configured_hz = clock_hz;
        }

        let mut transfer = SpidevTransfer::read_write(tx, rx);
        self.spi.transfer(&mut transfer).map_err(|err| {
            warn!("spidev exchange of {} bytes failed: {}", tx.len(), err);
            map_io_error(&err)
        })?;

        // The ioctl clocks the whole transfer or fails.
        Ok(tx.len())
    }
}

fn bus_options(clock_hz: u32, mode: SpiMode) -> SpidevOptions {
    SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(clock_hz)
        .mode(mode_flags(mode))
        .build()
}

fn mode_flags(mode: SpiMode) -> SpiModeFlags {
    match mode {
        SpiMode::Mode0 => SpiModeFlags::SPI_MODE_0,
        SpiMode::Mode1 => SpiModeFlags::SPI_MODE_1,
        SpiMode::Mode2 => SpiModeFlags::SPI_MODE_2,
        SpiMode::Mode3 => SpiModeFlags::SPI_MODE_3,
    }
}

/// Map an ioctl failure to the bus status surfaced to clients.
fn map_io_error(err: &io::Error) -> BusStatus {
    BusStatus(err.raw_os_error().unwrap_or(errno::EIO))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_flags_cover_all_modes() {
        assert_eq!(mode_flags(SpiMode::Mode0), SpiModeFlags::SPI_MODE_0);
        assert_eq!(mode_flags(SpiMode::Mode1), SpiModeFlags::SPI_MODE_1);
        assert_eq!(mode_flags(SpiMode::Mode2), SpiModeFlags::SPI_MODE_2);
        assert_eq!(mode_flags(SpiMode::Mode3), SpiModeFlags::SPI_MODE_3);
    }

    #[test]
    fn test_map_io_error_prefers_raw_os_error() {
        let err = io::Error::from_raw_os_error(71);
        assert_eq!(map_io_error(&err), BusStatus(71));

        let err = io::Error::new(io::ErrorKind::Other, "no raw code");
        assert_eq!(map_io_error(&err), BusStatus(errno::EIO));
    }
}
