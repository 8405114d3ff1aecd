//! Integration tests for the listing tool configuration
//!
//! Covers writing and reading TOML files, config resolution order,
//! validation on load and the interplay with `--set` style parameters.

use cli::config::{ConfigSource, ListConfig};
use common::{ParamStore, UsbOptions};
use std::fs;
use tempfile::TempDir;
use usb::DebugLevel;

fn write_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

mod files {
    use super::*;

    #[test]
    fn test_write_and_read_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("list.toml");

        let mut config = ListConfig::default();
        config.list.log_level = "debug".to_string();
        config.usb.debug_level = DebugLevel::Warning;
        config.usb.filters = vec!["0x0403:*".to_string()];
        config.write(&path).unwrap();

        assert_eq!(ListConfig::read(&path).unwrap(), config);
    }

    #[test]
    fn test_read_rejects_invalid_filter() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "list.toml",
            "[list]\nlog_level = \"info\"\n\n[usb]\nfilters = [\"0403:6001\"]\n",
        );

        let err = ListConfig::read(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("must start with '0x'"));
    }

    #[test]
    fn test_read_rejects_unknown_debug_level() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "list.toml",
            "[list]\nlog_level = \"info\"\n\n[usb]\ndebug_level = \"loud\"\n",
        );

        let err = ListConfig::read(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Invalid TOML"));
    }
}

mod resolution {
    use super::*;

    #[test]
    fn test_explicit_path_wins() {
        let dir = TempDir::new().unwrap();
        let explicit = write_file(&dir, "explicit.toml", "[list]\nlog_level = \"error\"\n");
        let implicit = write_file(&dir, "implicit.toml", "[list]\nlog_level = \"debug\"\n");

        let (config, source) =
            ListConfig::resolve_from(explicit.to_str(), &[implicit]).unwrap();
        assert_eq!(config.list.log_level, "error");
        assert_eq!(source, ConfigSource::File(explicit));
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let dir = TempDir::new().unwrap();
        let absent = dir.path().join("absent.toml");

        let err = ListConfig::resolve_from(absent.to_str(), &[]).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_first_existing_candidate_is_used() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("user.toml");
        let system = write_file(&dir, "system.toml", "[list]\nlog_level = \"info\"\n");

        let (config, source) = ListConfig::resolve_from(None, &[missing, system.clone()]).unwrap();
        assert_eq!(config.list.log_level, "info");
        assert_eq!(source, ConfigSource::File(system));
    }

    #[test]
    fn test_defaults_without_candidates() {
        let dir = TempDir::new().unwrap();
        let (config, source) =
            ListConfig::resolve_from(None, &[dir.path().join("none.toml")]).unwrap();
        assert_eq!(config, ListConfig::default());
        assert_eq!(source, ConfigSource::Defaults);
    }

    #[test]
    fn test_broken_candidate_is_not_skipped() {
        let dir = TempDir::new().unwrap();
        let broken = write_file(&dir, "user.toml", "[list]\nlog_level = \"chatty\"\n");
        let valid = write_file(&dir, "system.toml", "[list]\nlog_level = \"info\"\n");

        assert!(ListConfig::resolve_from(None, &[broken, valid]).is_err());
    }
}

#[test]
fn test_set_parameters_override_config() {
    let mut config = ListConfig::default();
    config.usb.debug_level = DebugLevel::Error;

    let mut params = config.usb_params();
    params.merge(&ParamStore::from_args(["usb-debug-level=verbose"], "usb-"));
    assert_eq!(UsbOptions::from_params(&params).debug_level, DebugLevel::Verbose);

    let options = UsbOptions::from_params(&config.usb_params());
    assert_eq!(options.debug_level, DebugLevel::Error);
}
