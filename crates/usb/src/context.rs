//! USB context
//!
//! Owns the backend binding and the list of enumerated devices. Devices are
//! addressed through [`DeviceId`]s bound to the refresh generation that
//! produced them, so identifiers obtained before a refresh resolve to
//! [`UsbError::NotFound`] afterwards.

use crate::backend::{RusbBackend, UsbBackend};
use crate::device::{Device, DeviceMut};
use crate::error::{Result, UsbError};
use crate::types::{DebugLevel, DeviceId};
use std::fmt;
use tracing::{debug, info, warn};

/// USB context
///
/// Created explicitly by the caller and released with [`Context::release`]
/// or on drop. Releasing closes every device that is still open.
pub struct Context<B: UsbBackend = RusbBackend> {
    /// Backend binding, `None` once released
    backend: Option<B>,
    debug_level: DebugLevel,
    devices: Vec<Device<B>>,
    /// Bumped on every successful refresh and on release
    generation: u64,
    last_error: Option<UsbError>,
}

impl Context<RusbBackend> {
    /// Initialize a context on top of libusb
    ///
    /// Fails with [`UsbError::InvalidContext`] if libusb cannot be
    /// initialized.
    pub fn init() -> Result<Self> {
        Self::acquire(RusbBackend::new)
    }
}

impl<B: UsbBackend> Context<B> {
    /// Initialize a context on a backend produced by `acquire`
    ///
    /// Any backend failure is reported as [`UsbError::InvalidContext`]; the
    /// backend's own error is only logged.
    pub fn acquire<F>(make_backend: F) -> Result<Self>
    where
        F: FnOnce() -> std::result::Result<B, B::Error>,
    {
        match make_backend() {
            Ok(backend) => Ok(Self::with_backend(backend)),
            Err(e) => {
                warn!("Failed to acquire USB backend: {}", e);
                Err(UsbError::InvalidContext)
            }
        }
    }

    /// Initialize a context on top of an arbitrary backend
    ///
    /// The device list starts empty and the debug level is
    /// [`DebugLevel::Minimal`].
    pub fn with_backend(mut backend: B) -> Self {
        backend.set_debug_level(DebugLevel::Minimal);
        info!("USB context initialized");

        Self {
            backend: Some(backend),
            debug_level: DebugLevel::Minimal,
            devices: Vec::new(),
            generation: 0,
            last_error: None,
        }
    }

    /// Close all open devices, drop the device list and release the backend
    ///
    /// Calling this on a released context is a no-op.
    pub fn release(&mut self) {
        let Some(backend) = self.backend.take() else {
            return;
        };

        for device in &mut self.devices {
            device.close_with(&backend);
        }
        let count = self.devices.len();
        self.devices.clear();
        self.generation += 1;

        info!("USB context released ({} devices dropped)", count);
    }

    pub fn is_released(&self) -> bool {
        self.backend.is_none()
    }

    /// Set the backend debug level
    pub fn setup(&mut self, debug_level: DebugLevel) -> Result<()> {
        let result = match self.backend.as_mut() {
            Some(backend) => {
                backend.set_debug_level(debug_level);
                self.debug_level = debug_level;
                debug!("USB debug level set to {}", debug_level);
                Ok(())
            }
            None => Err(UsbError::InvalidContext),
        };
        self.record(result)
    }

    pub fn debug_level(&self) -> DebugLevel {
        self.debug_level
    }

    /// Re-enumerate connected devices
    ///
    /// On success the device list is replaced by the new enumeration (in
    /// backend order) and all identifiers from the previous generation become
    /// stale. Every previous entry is closed before it is dropped. On failure
    /// the previous list stays in place. Returns the number of devices found.
    pub fn refresh(&mut self) -> Result<usize> {
        let Some(backend) = self.backend.as_ref() else {
            return self.record(Err(UsbError::InvalidContext));
        };

        let result = match backend.enumerate() {
            Ok(found) => {
                for device in &mut self.devices {
                    if device.is_open() {
                        debug!("Closing {} before refresh", device.name());
                    }
                    device.close_with(backend);
                }

                self.devices = found.into_iter().map(Device::new).collect();
                self.generation += 1;

                debug!(
                    "Enumerated {} devices (generation {})",
                    self.devices.len(),
                    self.generation
                );
                Ok(self.devices.len())
            }
            Err(e) => {
                warn!("Failed to enumerate USB devices: {}", e);
                Err(e.into())
            }
        };

        self.record(result)
    }

    /// Number of devices in the current generation
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Current refresh generation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Error of the most recent setup or refresh call
    pub fn last_error(&self) -> Option<UsbError> {
        self.last_error
    }

    /// Iterate devices in enumeration order
    pub fn devices(&self) -> impl Iterator<Item = (DeviceId, &Device<B>)> + '_ {
        self.devices
            .iter()
            .enumerate()
            .map(|(index, device)| (self.id(index), device))
    }

    /// First device whose backend name equals `name`
    pub fn match_name(&self, name: &str) -> Option<DeviceId> {
        self.devices
            .iter()
            .position(|device| device.name() == name)
            .map(|index| self.id(index))
    }

    /// First device with the given vendor and product IDs
    ///
    /// When several identical devices are connected the earliest enumerated
    /// one wins.
    pub fn match_vendor_product(&self, vendor_id: u16, product_id: u16) -> Option<DeviceId> {
        self.devices
            .iter()
            .position(|device| device.vendor_id() == vendor_id && device.product_id() == product_id)
            .map(|index| self.id(index))
    }

    /// Resolve an identifier to a device
    pub fn device(&self, id: DeviceId) -> Result<&Device<B>> {
        if self.backend.is_none() {
            return Err(UsbError::InvalidContext);
        }
        if id.generation != self.generation {
            return Err(UsbError::NotFound);
        }
        self.devices.get(id.index).ok_or(UsbError::NotFound)
    }

    /// Resolve an identifier to a device view for session operations
    pub fn device_mut(&mut self, id: DeviceId) -> Result<DeviceMut<'_, B>> {
        let backend = self.backend.as_ref().ok_or(UsbError::InvalidContext)?;
        if id.generation != self.generation {
            return Err(UsbError::NotFound);
        }
        let device = self.devices.get_mut(id.index).ok_or(UsbError::NotFound)?;
        Ok(DeviceMut::new(backend, device))
    }

    fn id(&self, index: usize) -> DeviceId {
        DeviceId {
            generation: self.generation,
            index,
        }
    }

    fn record<T>(&mut self, result: Result<T>) -> Result<T> {
        self.last_error = result.as_ref().err().copied();
        result
    }
}

impl<B: UsbBackend> Drop for Context<B> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<B: UsbBackend> fmt::Debug for Context<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("released", &self.is_released())
            .field("debug_level", &self.debug_level)
            .field("devices", &self.devices)
            .field("generation", &self.generation)
            .field("last_error", &self.last_error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockBackend, create_mock_device};

    #[test]
    fn test_init_state() {
        let backend = MockBackend::new();
        let ctx = Context::with_backend(backend.clone());

        assert!(ctx.is_empty());
        assert!(!ctx.is_released());
        assert_eq!(ctx.debug_level(), DebugLevel::Minimal);
        assert_eq!(backend.debug_level(), Some(DebugLevel::Minimal));
        assert_eq!(ctx.generation(), 0);
        assert_eq!(ctx.last_error(), None);
    }

    #[test]
    fn test_acquire_failure_is_invalid_context() {
        let result = Context::<MockBackend>::acquire(|| Err(rusb::Error::NoMem));
        assert_eq!(result.err(), Some(UsbError::InvalidContext));

        let result = Context::<MockBackend>::acquire(|| Err(rusb::Error::Access));
        assert_eq!(result.err(), Some(UsbError::InvalidContext));
    }

    #[test]
    fn test_acquire_success() {
        let backend = MockBackend::with_devices(vec![create_mock_device(1, 2, 0x1234, 0x5678, 0x00)]);
        let mut ctx = Context::acquire(|| Ok(backend.clone())).unwrap();

        assert!(!ctx.is_released());
        assert_eq!(backend.debug_level(), Some(DebugLevel::Minimal));
        assert_eq!(ctx.refresh(), Ok(1));
    }

    #[test]
    fn test_setup_forwards_debug_level() {
        let backend = MockBackend::new();
        let mut ctx = Context::with_backend(backend.clone());

        ctx.setup(DebugLevel::Verbose).unwrap();
        assert_eq!(ctx.debug_level(), DebugLevel::Verbose);
        assert_eq!(backend.debug_level(), Some(DebugLevel::Verbose));
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut ctx = Context::with_backend(MockBackend::new());
        ctx.release();
        assert!(ctx.is_released());
        ctx.release();
        assert!(ctx.is_released());
    }

    #[test]
    fn test_operations_on_released_context() {
        let backend = MockBackend::with_devices(vec![create_mock_device(1, 2, 0x1234, 0x5678, 0x00)]);
        let mut ctx = Context::with_backend(backend);
        ctx.refresh().unwrap();
        let id = ctx.match_vendor_product(0x1234, 0x5678).unwrap();
        ctx.release();

        assert_eq!(ctx.refresh(), Err(UsbError::InvalidContext));
        assert_eq!(ctx.last_error(), Some(UsbError::InvalidContext));
        assert_eq!(ctx.setup(DebugLevel::Error), Err(UsbError::InvalidContext));
        assert_eq!(ctx.device(id).err(), Some(UsbError::InvalidContext));
        assert!(ctx.device_mut(id).is_err());
        assert_eq!(ctx.match_vendor_product(0x1234, 0x5678), None);
    }

    #[test]
    fn test_drop_closes_open_devices() {
        let backend = MockBackend::with_devices(vec![create_mock_device(1, 2, 0x1234, 0x5678, 0x00)]);
        {
            let mut ctx = Context::with_backend(backend.clone());
            ctx.refresh().unwrap();
            let id = ctx.match_vendor_product(0x1234, 0x5678).unwrap();
            ctx.device_mut(id).unwrap().open().unwrap();
            assert_eq!(backend.open_handles(), 1);
        }
        assert_eq!(backend.open_handles(), 0);
    }

    #[test]
    fn test_debug_output_lists_devices() {
        let backend = MockBackend::with_devices(vec![create_mock_device(3, 7, 0xabcd, 0x0001, 0x09)]);
        let mut ctx = Context::with_backend(backend);
        ctx.refresh().unwrap();
        let debug = format!("{:?}", ctx);
        assert!(debug.contains("generation: 1"));
        assert!(debug.contains("/dev/bus/usb/003/007"));
    }
}
