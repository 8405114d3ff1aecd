//! Test utilities
//!
//! [`MockBackend`] implements [`UsbBackend`] without hardware. Clones share
//! state, so a test can hand one clone to a [`crate::Context`] and keep
//! another to script devices, failures and transfer data.
//!
//! # Example
//!
//! ```
//! use usb::Context;
//! use usb::test_utils::{MockBackend, create_mock_device};
//!
//! let backend = MockBackend::with_devices(vec![create_mock_device(1, 2, 0x0403, 0x6001, 0xff)]);
//! let mut ctx = Context::with_backend(backend.clone());
//! ctx.refresh().unwrap();
//! assert!(ctx.match_vendor_product(0x0403, 0x6001).is_some());
//! ```

use crate::backend::{Enumerated, UsbBackend, device_name};
use crate::types::{ControlSetup, DebugLevel, DeviceClass, DeviceIdentity};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Device known to the mock backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockDevice {
    pub identity: DeviceIdentity,
    pub name: String,
}

/// Create a mock device with the udev-style name for its bus/address
pub fn create_mock_device(
    bus: u8,
    address: u8,
    vendor_id: u16,
    product_id: u16,
    class_code: u8,
) -> MockDevice {
    MockDevice {
        identity: DeviceIdentity {
            bus,
            address,
            vendor_id,
            product_id,
            class: DeviceClass::from_code(class_code),
        },
        name: device_name(bus, address),
    }
}

/// Transfer call as seen by the mock backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    ReadControl {
        setup: ControlSetup,
        len: usize,
        timeout: Duration,
    },
    WriteControl {
        setup: ControlSetup,
        data: Vec<u8>,
        timeout: Duration,
    },
    ReadBulk {
        endpoint: u8,
        len: usize,
        timeout: Duration,
    },
    WriteBulk {
        endpoint: u8,
        data: Vec<u8>,
        timeout: Duration,
    },
}

/// Open mock handle
#[derive(Debug)]
pub struct MockHandle {
    key: (u8, u8),
}

#[derive(Debug, Default)]
struct MockState {
    devices: Vec<MockDevice>,
    debug_level: Option<DebugLevel>,
    enumerate_error: Option<rusb::Error>,
    open_errors: HashMap<(u8, u8), rusb::Error>,
    open: HashSet<(u8, u8)>,
    transfer_errors: VecDeque<rusb::Error>,
    read_chunks: VecDeque<Vec<u8>>,
    write_capacity: Option<usize>,
    calls: Vec<MockCall>,
}

/// Scriptable in-memory backend
///
/// * Enumeration returns the configured devices in insertion order.
/// * Opening a device that already has an open handle fails with `Busy`.
/// * Reads consume queued chunks; with nothing queued they time out. A chunk
///   is reported with its full length even if the buffer is shorter.
/// * Writes accept everything, or at most the configured write capacity.
/// * Injected transfer errors are consumed one per transfer call.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(devices: Vec<MockDevice>) -> Self {
        let backend = Self::new();
        backend.set_devices(devices);
        backend
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the set of connected devices
    pub fn set_devices(&self, devices: Vec<MockDevice>) {
        self.state().devices = devices;
    }

    /// Plug in another device at the end of the enumeration order
    pub fn push_device(&self, device: MockDevice) {
        self.state().devices.push(device);
    }

    /// Unplug the device at `bus`/`address`
    pub fn remove_device(&self, bus: u8, address: u8) {
        self.state()
            .devices
            .retain(|d| (d.identity.bus, d.identity.address) != (bus, address));
    }

    /// Make enumeration fail until cleared
    pub fn fail_enumerate(&self, error: rusb::Error) {
        self.state().enumerate_error = Some(error);
    }

    pub fn clear_enumerate_failure(&self) {
        self.state().enumerate_error = None;
    }

    /// Make opening the device at `bus`/`address` fail
    pub fn fail_open(&self, bus: u8, address: u8, error: rusb::Error) {
        self.state().open_errors.insert((bus, address), error);
    }

    /// Fail the next transfer call with `error`
    pub fn fail_next_transfer(&self, error: rusb::Error) {
        self.state().transfer_errors.push_back(error);
    }

    /// Queue data returned by the next read
    pub fn queue_read(&self, data: Vec<u8>) {
        self.state().read_chunks.push_back(data);
    }

    /// Limit the number of bytes each write accepts
    pub fn set_write_capacity(&self, capacity: Option<usize>) {
        self.state().write_capacity = capacity;
    }

    /// Transfer calls received so far
    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    /// Number of handles currently open
    pub fn open_handles(&self) -> usize {
        self.state().open.len()
    }

    /// Last debug level set through the backend
    pub fn debug_level(&self) -> Option<DebugLevel> {
        self.state().debug_level
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize, rusb::Error> {
        let mut state = self.state();
        if let Some(error) = state.transfer_errors.pop_front() {
            return Err(error);
        }
        let chunk = state.read_chunks.pop_front().ok_or(rusb::Error::Timeout)?;
        let len = chunk.len().min(buf.len());
        buf[..len].copy_from_slice(&chunk[..len]);
        Ok(chunk.len())
    }

    fn write(&self, buf: &[u8]) -> Result<usize, rusb::Error> {
        let mut state = self.state();
        if let Some(error) = state.transfer_errors.pop_front() {
            return Err(error);
        }
        Ok(state.write_capacity.map_or(buf.len(), |cap| cap.min(buf.len())))
    }

    /// Transfers on unplugged devices fail with `NoDevice`
    fn check_open(&self, handle: &MockHandle) -> Result<(), rusb::Error> {
        let state = self.state();
        let plugged = state
            .devices
            .iter()
            .any(|d| (d.identity.bus, d.identity.address) == handle.key);
        if plugged && state.open.contains(&handle.key) {
            Ok(())
        } else {
            Err(rusb::Error::NoDevice)
        }
    }
}

impl UsbBackend for MockBackend {
    type Device = (u8, u8);
    type Handle = MockHandle;
    type Error = rusb::Error;

    fn set_debug_level(&mut self, level: DebugLevel) {
        self.state().debug_level = Some(level);
    }

    fn enumerate(&self) -> Result<Vec<Enumerated<Self::Device>>, rusb::Error> {
        let state = self.state();
        if let Some(error) = state.enumerate_error {
            return Err(error);
        }
        Ok(state
            .devices
            .iter()
            .map(|d| Enumerated {
                identity: d.identity,
                name: d.name.clone(),
                device: (d.identity.bus, d.identity.address),
            })
            .collect())
    }

    fn open(&self, device: &Self::Device) -> Result<MockHandle, rusb::Error> {
        let mut state = self.state();
        if let Some(error) = state.open_errors.get(device) {
            return Err(*error);
        }
        if !state
            .devices
            .iter()
            .any(|d| (d.identity.bus, d.identity.address) == *device)
        {
            return Err(rusb::Error::NoDevice);
        }
        if !state.open.insert(*device) {
            return Err(rusb::Error::Busy);
        }
        Ok(MockHandle { key: *device })
    }

    fn close(&self, handle: MockHandle) {
        self.state().open.remove(&handle.key);
    }

    fn read_control(
        &self,
        handle: &MockHandle,
        setup: ControlSetup,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        self.check_open(handle)?;
        self.state().calls.push(MockCall::ReadControl {
            setup,
            len: buf.len(),
            timeout,
        });
        self.read(buf)
    }

    fn write_control(
        &self,
        handle: &MockHandle,
        setup: ControlSetup,
        buf: &[u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        self.check_open(handle)?;
        self.state().calls.push(MockCall::WriteControl {
            setup,
            data: buf.to_vec(),
            timeout,
        });
        self.write(buf)
    }

    fn read_bulk(
        &self,
        handle: &MockHandle,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        self.check_open(handle)?;
        self.state().calls.push(MockCall::ReadBulk {
            endpoint,
            len: buf.len(),
            timeout,
        });
        self.read(buf)
    }

    fn write_bulk(
        &self,
        handle: &MockHandle,
        endpoint: u8,
        buf: &[u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        self.check_open(handle)?;
        self.state().calls.push(MockCall::WriteBulk {
            endpoint,
            data: buf.to_vec(),
            timeout,
        });
        self.write(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_device_name() {
        let device = create_mock_device(1, 4, 0x0403, 0x6001, 0xff);
        assert_eq!(device.name, "/dev/bus/usb/001/004");
        assert_eq!(device.identity.class, DeviceClass::Vendor);
    }

    #[test]
    fn test_exclusive_open() {
        let backend = MockBackend::with_devices(vec![create_mock_device(1, 4, 0x0403, 0x6001, 0xff)]);
        let handle = backend.open(&(1, 4)).unwrap();
        assert!(matches!(backend.open(&(1, 4)), Err(rusb::Error::Busy)));
        backend.close(handle);
        assert!(backend.open(&(1, 4)).is_ok());
    }

    #[test]
    fn test_open_unplugged_device() {
        let backend = MockBackend::new();
        assert!(matches!(backend.open(&(1, 4)), Err(rusb::Error::NoDevice)));
    }
}
