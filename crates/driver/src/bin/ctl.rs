//! spi-dev-ctl
//!
//! Registration glue and diagnostic tool for a spidev-attached peripheral:
//! attaches the configured device node, opens a session, runs a probe
//! exchange, prints the capture, and tears everything down in reverse
//! creation order.

#[cfg(target_os = "linux")]
fn main() -> anyhow::Result<()> {
    linux::run()
}

#[cfg(not(target_os = "linux"))]
fn main() {
    eprintln!("spi-dev-ctl drives /dev/spidev* nodes and only runs on Linux");
    std::process::exit(1);
}

#[cfg(target_os = "linux")]
mod linux {
    use anyhow::{Context, Result};
    use clap::Parser;
    use driver::{CtlConfig, Device, DeviceRegistry, SpiDevBus, setup_logging};
    use std::path::PathBuf;
    use std::sync::Arc;
    use tracing::info;

    #[derive(Parser, Debug)]
    #[command(name = "spi-dev-ctl")]
    #[command(
        author,
        version,
        about = "Exclusive synchronous exchange broker for a spidev-attached peripheral"
    )]
    struct Args {
        /// Path to configuration file
        #[arg(short, long, value_name = "PATH")]
        config: Option<PathBuf>,

        /// Save default configuration to the default location and exit
        #[arg(long)]
        save_config: bool,

        /// Device node to attach (overrides the config)
        #[arg(short, long, value_name = "NODE")]
        device: Option<PathBuf>,

        /// Probe payload to clock out
        #[arg(short, long, value_name = "BYTES", default_value = "PING")]
        payload: String,

        /// Log level (trace, debug, info, warn, error)
        #[arg(short, long, value_name = "LEVEL")]
        log_level: Option<String>,
    }

    pub fn run() -> Result<()> {
        let args = Args::parse();

        if args.save_config {
            let config = CtlConfig::default();
            let path = CtlConfig::default_path();
            config.save(&path).context("failed to save configuration")?;
            println!("Configuration saved to: {}", path.display());
            return Ok(());
        }

        let mut config = if let Some(ref path) = args.config {
            CtlConfig::load(Some(path.clone())).context("failed to load configuration")?
        } else {
            CtlConfig::load_or_default()
        };
        if let Some(node) = args.device {
            config.device.node = node;
        }

        let log_level = args.log_level.as_deref().unwrap_or(&config.ctl.log_level);
        setup_logging(log_level).context("failed to set up logging")?;

        info!("spi-dev-ctl v{}", env!("CARGO_PKG_VERSION"));

        let bus = SpiDevBus::open(&config.device.node, config.device.clock_hz, config.device.mode)
            .with_context(|| format!("failed to open {}", config.device.node.display()))?;

        let mut registry = DeviceRegistry::new();
        let device = registry
            .attach(bus, &config.device)
            .context("failed to attach device")?;

        // Whatever the probe does, the device is detached before reporting,
        // mirroring the reverse-order unwind the registration contract
        // requires of node glue.
        let result = probe_exchange(&device, args.payload.as_bytes());
        registry.detach(device.id());

        result
    }

    fn probe_exchange(device: &Arc<Device<SpiDevBus>>, payload: &[u8]) -> Result<()> {
        let session = device.open().context("failed to open session")?;

        let result: Result<()> = (|| {
            let sent = device
                .write(&session, payload)
                .context("write exchange failed")?;
            println!("wrote {} bytes", sent);

            let mut capture = vec![0u8; payload.len()];
            let received = device
                .read(&session, &mut capture)
                .context("read exchange failed")?;
            println!("read  {} bytes: {}", received, hex(&capture[..received]));
            Ok(())
        })();

        device.release(&session);
        result
    }

    fn hex(bytes: &[u8]) -> String {
        bytes
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
