//! Backend adapter
//!
//! The [`UsbBackend`] trait is the seam between the context/device logic and
//! the native USB stack. [`RusbBackend`] binds it to libusb through `rusb`;
//! `test_utils::MockBackend` implements it without hardware.

use crate::error::UsbError;
use crate::types::{ControlSetup, DebugLevel, DeviceClass, DeviceIdentity};
use rusb::UsbContext;
use std::time::Duration;
use tracing::debug;

/// One device as reported by backend enumeration
#[derive(Debug, Clone)]
pub struct Enumerated<D> {
    /// Bus, address, IDs and class
    pub identity: DeviceIdentity,
    /// Backend-assigned device name
    pub name: String,
    /// Opaque backend reference used to open the device
    pub device: D,
}

/// Native USB subsystem binding
///
/// All transfer primitives are synchronous and block up to `timeout`
/// (a zero timeout waits indefinitely). Failures are reported in the
/// backend's own error type and mapped through `Into<UsbError>`.
pub trait UsbBackend {
    /// Opaque per-device reference
    type Device;
    /// Open device handle
    type Handle;
    /// Backend failure signal
    type Error: Into<UsbError> + std::fmt::Display;

    /// Set backend diagnostic verbosity
    fn set_debug_level(&mut self, level: DebugLevel);

    /// Enumerate currently connected devices, in backend order
    fn enumerate(&self) -> Result<Vec<Enumerated<Self::Device>>, Self::Error>;

    /// Acquire an exclusive handle to a device
    fn open(&self, device: &Self::Device) -> Result<Self::Handle, Self::Error>;

    /// Release a handle
    fn close(&self, handle: Self::Handle) {
        drop(handle);
    }

    /// Device-to-host control transfer
    fn read_control(
        &self,
        handle: &Self::Handle,
        setup: ControlSetup,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, Self::Error>;

    /// Host-to-device control transfer
    fn write_control(
        &self,
        handle: &Self::Handle,
        setup: ControlSetup,
        buf: &[u8],
        timeout: Duration,
    ) -> Result<usize, Self::Error>;

    /// Bulk IN transfer; `endpoint` is the full address including the direction bit
    fn read_bulk(
        &self,
        handle: &Self::Handle,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, Self::Error>;

    /// Bulk OUT transfer
    fn write_bulk(
        &self,
        handle: &Self::Handle,
        endpoint: u8,
        buf: &[u8],
        timeout: Duration,
    ) -> Result<usize, Self::Error>;
}

/// Device node name as assigned by udev
pub fn device_name(bus: u8, address: u8) -> String {
    format!("/dev/bus/usb/{:03}/{:03}", bus, address)
}

/// libusb backend
pub struct RusbBackend {
    context: rusb::Context,
}

impl RusbBackend {
    /// Acquire a libusb context
    pub fn new() -> Result<Self, rusb::Error> {
        let context = rusb::Context::new()?;
        debug!("Acquired libusb context");
        Ok(Self { context })
    }
}

impl UsbBackend for RusbBackend {
    type Device = rusb::Device<rusb::Context>;
    type Handle = rusb::DeviceHandle<rusb::Context>;
    type Error = rusb::Error;

    fn set_debug_level(&mut self, level: DebugLevel) {
        self.context.set_log_level(map_log_level(level));
    }

    fn enumerate(&self) -> Result<Vec<Enumerated<Self::Device>>, rusb::Error> {
        let devices = self.context.devices()?;
        let mut found = Vec::with_capacity(devices.len());

        for device in devices.iter() {
            let descriptor = device.device_descriptor()?;
            let identity = DeviceIdentity {
                bus: device.bus_number(),
                address: device.address(),
                vendor_id: descriptor.vendor_id(),
                product_id: descriptor.product_id(),
                class: DeviceClass::from_code(descriptor.class_code()),
            };

            found.push(Enumerated {
                identity,
                name: device_name(identity.bus, identity.address),
                device,
            });
        }

        Ok(found)
    }

    fn open(&self, device: &Self::Device) -> Result<Self::Handle, rusb::Error> {
        device.open()
    }

    fn read_control(
        &self,
        handle: &Self::Handle,
        setup: ControlSetup,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        handle.read_control(
            setup.request_type,
            setup.request,
            setup.value,
            setup.index,
            buf,
            libusb_timeout(timeout),
        )
    }

    fn write_control(
        &self,
        handle: &Self::Handle,
        setup: ControlSetup,
        buf: &[u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        handle.write_control(
            setup.request_type,
            setup.request,
            setup.value,
            setup.index,
            buf,
            libusb_timeout(timeout),
        )
    }

    fn read_bulk(
        &self,
        handle: &Self::Handle,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        handle.read_bulk(endpoint, buf, libusb_timeout(timeout))
    }

    fn write_bulk(
        &self,
        handle: &Self::Handle,
        endpoint: u8,
        buf: &[u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        handle.write_bulk(endpoint, buf, libusb_timeout(timeout))
    }
}

/// Largest timeout libusb can represent (`u32::MAX` milliseconds)
const MAX_LIBUSB_TIMEOUT: Duration = Duration::from_millis(u32::MAX as u64);

/// Convert a request timeout to libusb's millisecond resolution
///
/// libusb reads 0 ms as "wait indefinitely", so a non-zero timeout below one
/// millisecond is rounded up to 1 ms instead of truncated. Timeouts beyond
/// `u32::MAX` ms are capped.
fn libusb_timeout(timeout: Duration) -> Duration {
    if timeout.is_zero() {
        return Duration::ZERO;
    }
    let millis = timeout.as_millis().clamp(1, u32::MAX as u128);
    Duration::from_millis(millis as u64)
}

/// Map debug level to libusb log level
fn map_log_level(level: DebugLevel) -> rusb::LogLevel {
    match level {
        DebugLevel::Minimal => rusb::LogLevel::None,
        DebugLevel::Error => rusb::LogLevel::Error,
        DebugLevel::Warning => rusb::LogLevel::Warning,
        DebugLevel::Verbose => rusb::LogLevel::Debug,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_name() {
        assert_eq!(device_name(1, 4), "/dev/bus/usb/001/004");
        assert_eq!(device_name(12, 127), "/dev/bus/usb/012/127");
    }

    #[test]
    fn test_libusb_timeout_keeps_zero() {
        assert_eq!(libusb_timeout(Duration::ZERO), Duration::ZERO);
    }

    #[test]
    fn test_libusb_timeout_rounds_sub_millisecond_up() {
        for timeout in [
            Duration::from_nanos(1),
            Duration::from_micros(500),
            Duration::from_secs_f64(0.0005),
            Duration::from_micros(999),
        ] {
            let converted = libusb_timeout(timeout);
            assert_eq!(converted, Duration::from_millis(1), "{:?}", timeout);
            assert_ne!(converted.as_millis() as u32, 0);
        }
    }

    #[test]
    fn test_libusb_timeout_whole_milliseconds() {
        assert_eq!(libusb_timeout(Duration::from_millis(1)), Duration::from_millis(1));
        assert_eq!(libusb_timeout(Duration::from_micros(1500)), Duration::from_millis(1));
        assert_eq!(libusb_timeout(Duration::from_secs(1)), Duration::from_secs(1));
    }

    #[test]
    fn test_libusb_timeout_caps_large_values() {
        let capped = libusb_timeout(Duration::from_secs(u64::MAX));
        assert_eq!(capped, MAX_LIBUSB_TIMEOUT);
        assert_eq!(capped.as_millis() as u32, u32::MAX);

        let just_over = MAX_LIBUSB_TIMEOUT + Duration::from_millis(1);
        assert_eq!(libusb_timeout(just_over).as_millis() as u32, u32::MAX);
    }

    #[test]
    fn test_map_log_level() {
        assert!(matches!(
            map_log_level(DebugLevel::Minimal),
            rusb::LogLevel::None
        ));
        assert!(matches!(
            map_log_level(DebugLevel::Verbose),
            rusb::LogLevel::Debug
        ));
    }
}
