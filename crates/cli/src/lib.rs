//! usb-list library
//!
//! Configuration and listing logic behind the `usb-list` binary.

pub mod config;
pub mod list;

pub use config::ListConfig;
pub use list::{Selection, list_devices};
