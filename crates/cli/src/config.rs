//! usb-list configuration file
//!
//! ```toml
//! [list]
//! log_level = "warn"
//!
//! [usb]
//! debug_level = "minimal"
//! filters = ["0x0403:*"]
//! ```
//!
//! An explicit `--config` path must exist. Otherwise the first existing file
//! among [`ListConfig::search_paths`] is used, and built-in defaults apply
//! when there is none. A file that exists but does not parse or validate is
//! always an error.

use anyhow::{Context, Result, anyhow, bail};
use common::ParamStore;
use common::options::KEY_DEBUG_LEVEL;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use usb::DebugLevel;

/// File name looked up in each configuration directory
pub const CONFIG_FILE: &str = "list.toml";
/// System-wide configuration directory
pub const SYSTEM_CONFIG_DIR: &str = "/etc/usb-tools";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListConfig {
    pub list: ListSettings,
    #[serde(default)]
    pub usb: UsbSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListSettings {
    pub log_level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsbSettings {
    /// Backend debug level (minimal, error, warning, verbose)
    #[serde(default)]
    pub debug_level: DebugLevel,
    /// Only list devices matching one of these VID:PID filters
    #[serde(default)]
    pub filters: Vec<String>,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            list: ListSettings {
                log_level: "warn".to_string(),
            },
            usb: UsbSettings::default(),
        }
    }
}

/// Where the active configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Defaults => f.write_str("built-in defaults"),
        }
    }
}

impl ListConfig {
    /// Parse and validate TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ListConfig = toml::from_str(content).context("Invalid TOML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    /// Read a configuration file
    pub fn read(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("Bad configuration in {}", path.display()))
    }

    /// Write the configuration, creating parent directories
    pub fn write(&self, path: &Path) -> Result<()> {
        let content = self.to_toml()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Per-user configuration file, if the platform has a config directory
    pub fn user_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("usb-tools").join(CONFIG_FILE))
    }

    /// Implicit configuration files, most specific first
    pub fn search_paths() -> Vec<PathBuf> {
        Self::user_path()
            .into_iter()
            .chain([Path::new(SYSTEM_CONFIG_DIR).join(CONFIG_FILE)])
            .collect()
    }

    /// Resolve the active configuration from `--config` and the search paths
    pub fn resolve(explicit: Option<&str>) -> Result<(Self, ConfigSource)> {
        Self::resolve_from(explicit, &Self::search_paths())
    }

    /// Resolve against an explicit list of candidate files
    pub fn resolve_from(explicit: Option<&str>, candidates: &[PathBuf]) -> Result<(Self, ConfigSource)> {
        if let Some(path) = explicit {
            let path = expand_path(path);
            if !path.exists() {
                bail!("Configuration file {} does not exist", path.display());
            }
            return Ok((Self::read(&path)?, ConfigSource::File(path)));
        }

        match candidates.iter().find(|p| p.is_file()) {
            Some(path) => Ok((Self::read(path)?, ConfigSource::File(path.clone()))),
            None => Ok((Self::default(), ConfigSource::Defaults)),
        }
    }

    /// USB parameters described by the `[usb]` table
    ///
    /// These form the base layer that `--set` arguments are merged into.
    pub fn usb_params(&self) -> ParamStore {
        let mut params = ParamStore::new();
        params.set(KEY_DEBUG_LEVEL, self.usb.debug_level.as_str());
        params
    }

    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.list.log_level.as_str()) {
            bail!(
                "Invalid log level '{}', must be one of: {}",
                self.list.log_level,
                LOG_LEVELS.join(", ")
            );
        }

        for filter in &self.usb.filters {
            validate_filter(filter)?;
        }

        Ok(())
    }
}

/// Parameter keys the listing tool has no use for
///
/// Only the debug level affects listing; everything else (such as a request
/// timeout) applies to opened devices.
pub fn unused_params(params: &ParamStore) -> impl Iterator<Item = &str> {
    params
        .iter()
        .map(|(key, _)| key)
        .filter(|key| *key != KEY_DEBUG_LEVEL)
}

/// Expand a leading `~` in a user-supplied path
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

/// Validate a USB device filter pattern (VID:PID)
pub fn validate_filter(filter: &str) -> Result<()> {
    let Some((vid, pid)) = filter.split_once(':') else {
        return Err(filter_format_error(filter));
    };
    if pid.contains(':') {
        return Err(filter_format_error(filter));
    }

    if vid != "*" {
        validate_hex_id(vid, "VID")?;
    }
    if pid != "*" {
        validate_hex_id(pid, "PID")?;
    }

    Ok(())
}

fn filter_format_error(filter: &str) -> anyhow::Error {
    anyhow!(
        "Invalid filter format '{}', expected VID:PID (e.g., '0x1234:0x5678' or '0x1234:*')",
        filter
    )
}

/// Validate a hex ID (VID or PID)
fn validate_hex_id(id: &str, name: &str) -> Result<()> {
    let Some(hex_part) = id.strip_prefix("0x").or_else(|| id.strip_prefix("0X")) else {
        return Err(anyhow!(
            "Invalid {} '{}', must start with '0x' (e.g., '0x1234')",
            name,
            id
        ));
    };

    if hex_part.is_empty() || hex_part.len() > 4 {
        return Err(anyhow!(
            "Invalid {} '{}', hex part must be 1-4 digits",
            name,
            id
        ));
    }

    u16::from_str_radix(hex_part, 16)
        .map_err(|_| anyhow!("Invalid {} '{}', not a valid hex number", name, id))?;

    Ok(())
}

/// Check a device against VID:PID filters
///
/// No filters means every device passes. Malformed filters never match.
pub fn check_filter(vid: u16, pid: u16, filters: &[String]) -> bool {
    if filters.is_empty() {
        return true;
    }

    filters.iter().any(|filter| {
        let Some((filter_vid, filter_pid)) = filter.split_once(':') else {
            return false;
        };
        id_matches(filter_vid, vid) && id_matches(filter_pid, pid)
    })
}

fn id_matches(pattern: &str, id: u16) -> bool {
    pattern == "*" || parse_hex_id(pattern).is_ok_and(|p| p == id)
}

/// Parse a hex vendor or product ID, with or without `0x` prefix
pub fn parse_hex_id(s: &str) -> std::result::Result<u16, String> {
    let hex = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u16::from_str_radix(hex, 16).map_err(|_| format!("'{}' is not a 16-bit hex ID", s))
}
