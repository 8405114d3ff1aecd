//! USB session options read from a [`ParamStore`]

use crate::params::ParamStore;
use std::time::Duration;
use tracing::warn;
use usb::{DEFAULT_TIMEOUT, DebugLevel};

/// Parameter key for the backend debug level (`minimal`, `error`, `warning`, `verbose`)
pub const KEY_DEBUG_LEVEL: &str = "debug-level";
/// Parameter key for the request timeout in seconds
pub const KEY_TIMEOUT: &str = "timeout";

/// Options applied to a USB context and its devices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbOptions {
    pub debug_level: DebugLevel,
    /// Zero waits indefinitely
    pub timeout: Duration,
}

impl Default for UsbOptions {
    fn default() -> Self {
        Self {
            debug_level: DebugLevel::Minimal,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl UsbOptions {
    /// Read options, falling back to defaults for absent or invalid values
    pub fn from_params(params: &ParamStore) -> Self {
        let defaults = Self::default();

        let debug_level = match params.get(KEY_DEBUG_LEVEL) {
            Some(value) => value.parse().unwrap_or_else(|e| {
                warn!("{}; using {}", e, defaults.debug_level);
                defaults.debug_level
            }),
            None => defaults.debug_level,
        };

        let timeout = match params.get(KEY_TIMEOUT) {
            Some(value) => parse_timeout(value).unwrap_or_else(|| {
                warn!(
                    "Invalid timeout '{}'; using {:?}",
                    value, defaults.timeout
                );
                defaults.timeout
            }),
            None => defaults.timeout,
        };

        Self {
            debug_level,
            timeout,
        }
    }

    /// Write the options back as parameters
    pub fn to_params(&self) -> ParamStore {
        let mut params = ParamStore::new();
        params.set(KEY_DEBUG_LEVEL, self.debug_level.as_str());
        params.set_float(KEY_TIMEOUT, self.timeout.as_secs_f64());
        params
    }
}

fn parse_timeout(value: &str) -> Option<Duration> {
    let secs: f64 = value.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_absent() {
        let options = UsbOptions::from_params(&ParamStore::new());
        assert_eq!(options, UsbOptions::default());
        assert_eq!(options.timeout, Duration::from_secs(1));
        assert_eq!(options.debug_level, DebugLevel::Minimal);
    }

    #[test]
    fn test_reads_values() {
        let params = ParamStore::from_args(["usb-debug-level=Verbose", "usb-timeout=0.001"], "usb-");
        let options = UsbOptions::from_params(&params);
        assert_eq!(options.debug_level, DebugLevel::Verbose);
        assert_eq!(options.timeout, Duration::from_secs_f64(0.001));
    }

    #[test]
    fn test_zero_timeout_is_kept() {
        let params = ParamStore::from_args(["usb-timeout=0"], "usb-");
        assert_eq!(UsbOptions::from_params(&params).timeout, Duration::ZERO);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        for timeout in ["-1", "soon", "", "inf", "NaN"] {
            let mut params = ParamStore::new();
            params.set(KEY_TIMEOUT, timeout);
            params.set(KEY_DEBUG_LEVEL, "loud");
            assert_eq!(UsbOptions::from_params(&params), UsbOptions::default(), "{}", timeout);
        }
    }

    #[test]
    fn test_to_params_round_trip() {
        let options = UsbOptions {
            debug_level: DebugLevel::Warning,
            timeout: Duration::from_millis(250),
        };
        assert_eq!(UsbOptions::from_params(&options.to_params()), options);
    }
}
