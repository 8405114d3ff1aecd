//! Device listing

use crate::config::check_filter;
use std::io::{self, Write};
use usb::{Context, Device, UsbBackend};

/// Which devices to print
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
    /// VID:PID filters, see [`check_filter`]
    pub filters: Vec<String>,
}

impl Selection {
    pub fn matches<B: UsbBackend>(&self, device: &Device<B>) -> bool {
        self.vendor_id.is_none_or(|vid| vid == device.vendor_id())
            && self.product_id.is_none_or(|pid| pid == device.product_id())
            && check_filter(device.vendor_id(), device.product_id(), &self.filters)
    }
}

/// Print one line per selected device, in enumeration order
///
/// Prints `No devices found.` when nothing is selected. Returns the number
/// of devices printed.
pub fn list_devices<B: UsbBackend, W: Write>(
    ctx: &Context<B>,
    selection: &Selection,
    out: &mut W,
) -> io::Result<usize> {
    let mut count = 0;
    for (_, device) in ctx.devices().filter(|(_, d)| selection.matches(d)) {
        device.print(out)?;
        count += 1;
    }

    if count == 0 {
        writeln!(out, "No devices found.")?;
    }
    Ok(count)
}
