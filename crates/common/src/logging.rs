//! Logging setup and configuration

use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use usb::DebugLevel;

/// Setup tracing subscriber for the application
///
/// `RUST_LOG` takes precedence over `default_filter`.
pub fn setup_logging(default_filter: &str) -> crate::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| crate::Error::Config(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init()
        .map_err(|e| crate::Error::Other(format!("Failed to install subscriber: {}", e)))?;

    Ok(())
}

/// Build a filter directive from a log level and a USB debug level
///
/// The USB debug level only ever raises the verbosity of the `usb` target;
/// a more verbose global `level` is left alone.
pub fn log_filter(level: &str, debug_level: DebugLevel) -> String {
    let Some(usb_level) = usb_target_level(debug_level) else {
        return level.to_string();
    };

    match rank(level) {
        Some(global) if global >= rank(usb_level).unwrap_or(0) => level.to_string(),
        _ => format!("{},usb={}", level, usb_level),
    }
}

fn usb_target_level(debug_level: DebugLevel) -> Option<&'static str> {
    match debug_level {
        DebugLevel::Minimal => None,
        DebugLevel::Error => Some("error"),
        DebugLevel::Warning => Some("warn"),
        DebugLevel::Verbose => Some("debug"),
    }
}

/// Verbosity of a plain level name, `None` for composite directives
fn rank(level: &str) -> Option<u8> {
    match level.trim().to_ascii_lowercase().as_str() {
        "off" => Some(0),
        "error" => Some(1),
        "warn" => Some(2),
        "info" => Some(3),
        "debug" => Some(4),
        "trace" => Some(5),
        _ => None,
    }
}
