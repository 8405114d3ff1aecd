//! Common utilities for usb-tools
//!
//! Shared between the USB library consumers and the command-line tools:
//! error handling, logging setup and the key/value parameter store used to
//! configure USB sessions.

pub mod error;
pub mod logging;
pub mod options;
pub mod params;

pub use error::{Error, Result};
pub use logging::{log_filter, setup_logging};
pub use options::UsbOptions;
pub use params::ParamStore;
