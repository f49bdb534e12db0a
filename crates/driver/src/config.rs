//! Configuration management

use anyhow::Context;
use protocol::{DeviceError, SpiMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Buffer capacity of the reference peripheral, kept as the default.
pub const DEFAULT_CAPACITY: usize = 1024;
/// Default exchange clock rate (1 MHz).
pub const DEFAULT_CLOCK_HZ: u32 = 1_000_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CtlConfig {
    pub ctl: CtlSettings,
    pub device: DeviceConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CtlSettings {
    pub log_level: String,
}

/// Per-device transfer parameters, fixed for the whole attach lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device node of the underlying bus
    #[serde(default = "DeviceConfig::default_node")]
    pub node: PathBuf,
    /// Capacity C of each staging buffer, in bytes
    #[serde(default = "DeviceConfig::default_capacity")]
    pub capacity: usize,
    /// Exchange clock rate in hertz
    #[serde(default = "DeviceConfig::default_clock_hz")]
    pub clock_hz: u32,
    /// SPI clock/phase mode
    #[serde(default)]
    pub mode: SpiMode,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            node: Self::default_node(),
            capacity: Self::default_capacity(),
            clock_hz: Self::default_clock_hz(),
            mode: SpiMode::default(),
        }
    }
}

impl DeviceConfig {
    fn default_node() -> PathBuf {
        PathBuf::from("/dev/spidev0.0")
    }

    fn default_capacity() -> usize {
        DEFAULT_CAPACITY
    }

    fn default_clock_hz() -> u32 {
        DEFAULT_CLOCK_HZ
    }

    /// A config that cannot describe a working device fails the attach as an
    /// allocation failure.
    pub fn validate(&self) -> Result<(), DeviceError> {
        if self.capacity == 0 {
            return Err(DeviceError::AllocationFailure(
                "buffer capacity must be nonzero".into(),
            ));
        }
        if self.clock_hz == 0 {
            return Err(DeviceError::AllocationFailure(
                "clock rate must be a positive frequency".into(),
            ));
        }
        Ok(())
    }
}

impl Default for CtlConfig {
    fn default() -> Self {
        Self {
            ctl: CtlSettings {
                log_level: "info".to_string(),
            },
            device: DeviceConfig::default(),
        }
    }
}

impl CtlConfig {
    /// Default config location: `~/.config/spi-dev/ctl.toml`.
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("spi-dev").join("ctl.toml")
        } else {
            PathBuf::from("/etc/spi-dev/ctl.toml")
        }
    }

    pub fn load(path: Option<PathBuf>) -> anyhow::Result<Self> {
        let path = path.unwrap_or_else(Self::default_path);
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config from {}", path.display()))?;
        Ok(config)
    }

    /// Load the default-location config, falling back to defaults if it is
    /// absent or unreadable.
    pub fn load_or_default() -> Self {
        let path = Self::default_path();
        if !path.exists() {
            return Self::default();
        }
        Self::load(Some(path)).unwrap_or_else(|err| {
            warn!("ignoring broken config: {:#}", err);
            Self::default()
        })
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(path, contents)
            .with_context(|| format!("failed to write config to {}", path.display()))?;
        Ok(())
    }
}
