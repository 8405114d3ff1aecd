//! usb-list
//!
//! Lists the USB devices attached to the host, one line per device.

use anyhow::{Context as _, Result, anyhow};
use clap::Parser;
use cli::config::{ListConfig, expand_path, parse_hex_id, unused_params};
use cli::list::{Selection, list_devices};
use common::{ParamStore, UsbOptions, log_filter, setup_logging};
use std::io::{self, Write};
use tracing::{debug, info, warn};
use usb::{Context, DebugLevel};

/// Prefix of parameters accepted by `--set`
const PARAM_PREFIX: &str = "usb-";

#[derive(Parser, Debug)]
#[command(name = "usb-list")]
#[command(author, version, about = "List USB devices")]
#[command(long_about = "
Displays lsusb-like information about the USB buses in the system and the
devices connected to them.

EXAMPLES:
    # List every device
    usb-list

    # Only FTDI devices
    usb-list --vendor 0x0403

    # Backend diagnostics
    usb-list --set usb-debug-level=verbose

CONFIGURATION:
    The tool looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/usb-tools/list.toml
    3. /etc/usb-tools/list.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Write the default configuration (to --config, or the per-user file) and exit
    #[arg(long)]
    save_config: bool,

    /// Only list devices with this vendor ID (hex)
    #[arg(long, value_name = "VID", value_parser = parse_hex_id)]
    vendor: Option<u16>,

    /// Only list devices with this product ID (hex)
    #[arg(long, value_name = "PID", value_parser = parse_hex_id)]
    product: Option<u16>,

    /// Show the device with this name (e.g. /dev/bus/usb/001/004)
    #[arg(long, value_name = "NAME", conflicts_with_all = ["vendor", "product"])]
    name: Option<String>,

    /// USB parameter, e.g. usb-debug-level=verbose
    #[arg(long = "set", value_name = "KEY=VALUE")]
    set: Vec<String>,

    /// Backend debug level (minimal, error, warning, verbose)
    #[arg(short, long, value_name = "LEVEL")]
    debug_level: Option<DebugLevel>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.save_config {
        let path = match args.config.as_deref() {
            Some(path) => expand_path(path),
            None => ListConfig::user_path()
                .ok_or_else(|| anyhow!("No per-user config directory; pass --config"))?,
        };
        ListConfig::default()
            .write(&path)
            .context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let (config, source) =
        ListConfig::resolve(args.config.as_deref()).context("Failed to load configuration")?;

    // Config file first, --set overrides, --debug-level last
    let mut params = config.usb_params();
    params.merge(&ParamStore::from_args(&args.set, PARAM_PREFIX));
    let mut options = UsbOptions::from_params(&params);
    if let Some(level) = args.debug_level {
        options.debug_level = level;
    }

    let log_level = args.log_level.as_deref().unwrap_or(&config.list.log_level);
    setup_logging(&log_filter(log_level, options.debug_level))
        .context("Failed to setup logging")?;

    info!("usb-list v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", source);
    debug!("USB parameters:\n{}", params);
    for key in unused_params(&params) {
        warn!("Ignoring parameter {}{}: not used when listing", PARAM_PREFIX, key);
    }

    let mut ctx = Context::init().context("Failed to initialize USB context")?;
    ctx.setup(options.debug_level)
        .context("Failed to set USB debug level")?;
    ctx.refresh().context("Failed to enumerate USB devices")?;

    let mut out = io::stdout().lock();
    if let Some(ref name) = args.name {
        match ctx.match_name(name) {
            Some(id) => ctx.device(id)?.print(&mut out)?,
            None => writeln!(out, "No devices found.")?,
        }
    } else {
        let selection = Selection {
            vendor_id: args.vendor,
            product_id: args.product,
            filters: config.usb.filters.clone(),
        };
        let count = list_devices(&ctx, &selection, &mut out).context("Failed to write device list")?;
        debug!("Listed {} of {} devices", count, ctx.len());
    }

    ctx.release();
    Ok(())
}
