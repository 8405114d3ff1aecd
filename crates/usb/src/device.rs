//! USB device abstraction
//!
//! A [`Device`] is one enumerated physical device owned by a
//! [`crate::Context`]. Session operations (open, close, setup and transfers)
//! go through [`DeviceMut`], a mutable view that also borrows the context's
//! backend, so a device cannot outlive the refresh that produced it.

use crate::backend::{Enumerated, UsbBackend};
use crate::error::{Result, UsbError};
use crate::types::{DeviceClass, DeviceIdentity};
use std::fmt;
use std::io;
use std::ops::Deref;
use std::time::Duration;
use tracing::{debug, warn};

/// Default request timeout for new devices (1 second)
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// USB device with session state
pub struct Device<B: UsbBackend> {
    identity: DeviceIdentity,
    name: String,
    device: B::Device,
    /// Open handle (present iff open)
    pub(crate) handle: Option<B::Handle>,
    pub(crate) timeout: Duration,
    pub(crate) bytes_read: usize,
    pub(crate) bytes_written: usize,
    pub(crate) last_error: Option<UsbError>,
}

impl<B: UsbBackend> Device<B> {
    pub(crate) fn new(enumerated: Enumerated<B::Device>) -> Self {
        Self {
            identity: enumerated.identity,
            name: enumerated.name,
            device: enumerated.device,
            handle: None,
            timeout: DEFAULT_TIMEOUT,
            bytes_read: 0,
            bytes_written: 0,
            last_error: None,
        }
    }

    pub fn identity(&self) -> DeviceIdentity {
        self.identity
    }

    pub fn bus(&self) -> u8 {
        self.identity.bus
    }

    pub fn address(&self) -> u8 {
        self.identity.address
    }

    pub fn vendor_id(&self) -> u16 {
        self.identity.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.identity.product_id
    }

    pub fn class(&self) -> DeviceClass {
        self.identity.class
    }

    /// Backend-assigned device name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Request timeout used by transfers
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Bytes read since the device was last opened
    pub fn bytes_read(&self) -> usize {
        self.bytes_read
    }

    /// Bytes written since the device was last opened
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// Error of the most recent open or transfer call, `None` after success
    pub fn last_error(&self) -> Option<UsbError> {
        self.last_error
    }

    /// Write the one-line device summary to `out`
    pub fn print<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "{}", self)
    }

    /// Release the handle, if any, and reset the byte counters
    pub(crate) fn close_with(&mut self, backend: &B) {
        if let Some(handle) = self.handle.take() {
            backend.close(handle);
            debug!("Closed device {}", self.name);
        }
        self.bytes_read = 0;
        self.bytes_written = 0;
    }

    /// Record the outcome of a call in `last_error`
    pub(crate) fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        self.last_error = result.as_ref().err().copied();
        result
    }
}

impl<B: UsbBackend> fmt::Display for Device<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bus {:03} Device {:03}: ID {:04x}:{:04x} {}",
            self.identity.bus,
            self.identity.address,
            self.identity.vendor_id,
            self.identity.product_id,
            self.identity.class
        )
    }
}

impl<B: UsbBackend> fmt::Debug for Device<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("identity", &self.identity)
            .field("name", &self.name)
            .field("open", &self.is_open())
            .field("timeout", &self.timeout)
            .field("bytes_read", &self.bytes_read)
            .field("bytes_written", &self.bytes_written)
            .field("last_error", &self.last_error)
            .finish()
    }
}

/// Mutable view of a device together with the backend it belongs to
pub struct DeviceMut<'a, B: UsbBackend> {
    pub(crate) backend: &'a B,
    pub(crate) device: &'a mut Device<B>,
}

impl<'a, B: UsbBackend> DeviceMut<'a, B> {
    pub(crate) fn new(backend: &'a B, device: &'a mut Device<B>) -> Self {
        Self { backend, device }
    }

    /// Open the device for transfers
    ///
    /// Opening an already open device is a no-op that keeps the current
    /// handle and byte counters. A successful open resets both counters.
    pub fn open(&mut self) -> Result<()> {
        if self.device.is_open() {
            debug!("Device {} already open", self.device.name);
            return self.device.record(Ok(()));
        }

        let result: Result<()> = match self.backend.open(&self.device.device) {
            Ok(handle) => {
                self.device.handle = Some(handle);
                self.device.bytes_read = 0;
                self.device.bytes_written = 0;
                debug!("Opened device {}", self.device.name);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to open device {}: {}", self.device.name, e);
                Err(e.into())
            }
        };

        self.device.record(result)
    }

    /// Close the device
    ///
    /// No-op on a closed device. Byte counters are reset either way.
    pub fn close(&mut self) {
        self.device.close_with(self.backend);
    }

    /// Set the request timeout for subsequent transfers
    ///
    /// A zero timeout waits indefinitely.
    pub fn setup(&mut self, timeout: Duration) {
        debug!("Device {} timeout set to {:?}", self.device.name, timeout);
        self.device.timeout = timeout;
    }
}

impl<B: UsbBackend> Deref for DeviceMut<'_, B> {
    type Target = Device<B>;

    fn deref(&self) -> &Self::Target {
        self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockBackend, create_mock_device};

    fn device(backend: &MockBackend) -> Device<MockBackend> {
        let enumerated = backend
            .enumerate()
            .expect("mock enumeration")
            .into_iter()
            .next()
            .expect("one device");
        Device::new(enumerated)
    }

    #[test]
    fn test_display_format() {
        let backend = MockBackend::with_devices(vec![create_mock_device(1, 4, 0x0403, 0x6001, 0xff)]);
        let dev = device(&backend);
        assert_eq!(dev.to_string(), "Bus 001 Device 004: ID 0403:6001 Vendor specific");
    }

    #[test]
    fn test_print_writes_line() {
        let backend = MockBackend::with_devices(vec![create_mock_device(2, 9, 0x046d, 0xc52b, 0x03)]);
        let dev = device(&backend);
        let mut out = Vec::new();
        dev.print(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Bus 002 Device 009: ID 046d:c52b Human interface device\n"
        );
    }

    #[test]
    fn test_new_device_is_closed() {
        let backend = MockBackend::with_devices(vec![create_mock_device(1, 2, 0x1234, 0x5678, 0x00)]);
        let dev = device(&backend);
        assert!(!dev.is_open());
        assert_eq!(dev.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(dev.bytes_read(), 0);
        assert_eq!(dev.bytes_written(), 0);
        assert_eq!(dev.last_error(), None);
        assert_eq!(dev.name(), "/dev/bus/usb/001/002");
    }

    #[test]
    fn test_open_close_cycle() {
        let backend = MockBackend::with_devices(vec![create_mock_device(1, 2, 0x1234, 0x5678, 0x00)]);
        let mut dev = device(&backend);
        let mut view = DeviceMut::new(&backend, &mut dev);

        view.open().unwrap();
        assert!(view.is_open());
        assert_eq!(backend.open_handles(), 1);

        view.close();
        assert!(!view.is_open());
        assert_eq!(backend.open_handles(), 0);

        // Second close is a no-op
        view.close();
        assert_eq!(backend.open_handles(), 0);
    }

    #[test]
    fn test_open_failure_is_recorded() {
        let backend = MockBackend::with_devices(vec![create_mock_device(1, 2, 0x1234, 0x5678, 0x00)]);
        backend.fail_open(1, 2, rusb::Error::Access);
        let mut dev = device(&backend);
        let mut view = DeviceMut::new(&backend, &mut dev);

        assert_eq!(view.open(), Err(UsbError::Access));
        assert!(!view.is_open());
        assert_eq!(view.last_error(), Some(UsbError::Access));
    }

    #[test]
    fn test_setup_sets_timeout() {
        let backend = MockBackend::with_devices(vec![create_mock_device(1, 2, 0x1234, 0x5678, 0x00)]);
        let mut dev = device(&backend);
        let mut view = DeviceMut::new(&backend, &mut dev);

        view.setup(Duration::from_millis(250));
        assert_eq!(view.timeout(), Duration::from_millis(250));
        assert_eq!(backend.open_handles(), 0);
    }
}
