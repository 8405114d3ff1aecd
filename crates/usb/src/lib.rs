//! Host-side USB device access
//!
//! This crate hides a native USB stack behind a small synchronous API:
//! - [`Context`] owns the backend binding and the enumerated device list
//! - [`Device`] / [`DeviceMut`] carry per-device session state (open handle,
//!   timeout, byte counters, last error)
//! - control and bulk transfers run on an open [`DeviceMut`]
//!
//! The native stack is reached through the [`UsbBackend`] trait. The
//! production backend is [`RusbBackend`] (libusb via `rusb`);
//! [`test_utils::MockBackend`] allows exercising everything without hardware.
//!
//! ```no_run
//! use std::time::Duration;
//! use usb::{Context, Recipient, RequestType};
//!
//! # fn main() -> usb::Result<()> {
//! let mut ctx = Context::init()?;
//! ctx.refresh()?;
//!
//! if let Some(id) = ctx.match_vendor_product(0x0403, 0x6001) {
//!     let mut dev = ctx.device_mut(id)?;
//!     dev.open()?;
//!     dev.setup(Duration::from_millis(500));
//!     dev.control_write(RequestType::Vendor, Recipient::Device, 0x00, 0x00, 0x00, &[])?;
//!     dev.close();
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod context;
pub mod device;
pub mod error;
pub mod test_utils;
pub mod transfers;
pub mod types;

pub use backend::{Enumerated, RusbBackend, UsbBackend};
pub use context::Context;
pub use device::{DEFAULT_TIMEOUT, Device, DeviceMut};
pub use error::{Result, UsbError};
pub use transfers::{BulkTransfer, ControlTransfer};
pub use types::{
    ControlSetup, DebugLevel, DeviceClass, DeviceId, DeviceIdentity, Direction, Recipient,
    RequestType,
};

/// Re-export of the libusb binding used by [`RusbBackend`]
pub use rusb;
