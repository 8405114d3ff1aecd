//! USB transfer execution
//!
//! Synchronous control and bulk transfers on an open [`DeviceMut`], in
//! field form (`control_read`, `bulk_write`, ...) and descriptor form
//! (`control_transfer`, `bulk_transfer`).
//!
//! Every call either returns the number of bytes transferred or an error,
//! never both. Byte counters grow by exactly the reported count on success
//! and stay untouched on failure; `last_error` is overwritten on every call.

use crate::backend::UsbBackend;
use crate::device::DeviceMut;
use crate::error::{Result, UsbError};
use crate::types::{ControlSetup, Direction, Recipient, RequestType, request_type_byte};
use tracing::{debug, warn};

/// Control transfer descriptor
///
/// For IN transfers `data` is the receive buffer; its length is the number of
/// bytes requested and it is truncated to the bytes actually received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlTransfer {
    pub request_type: RequestType,
    pub recipient: Recipient,
    pub direction: Direction,
    pub request: u8,
    pub value: u8,
    pub index: u8,
    pub data: Vec<u8>,
}

impl ControlTransfer {
    /// Device-to-host transfer requesting `len` bytes
    pub fn read(
        request_type: RequestType,
        recipient: Recipient,
        request: u8,
        value: u8,
        index: u8,
        len: usize,
    ) -> Self {
        Self {
            request_type,
            recipient,
            direction: Direction::In,
            request,
            value,
            index,
            data: vec![0; len],
        }
    }

    /// Host-to-device transfer sending `data`
    pub fn write(
        request_type: RequestType,
        recipient: Recipient,
        request: u8,
        value: u8,
        index: u8,
        data: Vec<u8>,
    ) -> Self {
        Self {
            request_type,
            recipient,
            direction: Direction::Out,
            request,
            value,
            index,
            data,
        }
    }

    /// Raw setup fields for the backend
    pub fn setup(&self) -> ControlSetup {
        control_setup(
            self.direction,
            self.request_type,
            self.recipient,
            self.request,
            self.value,
            self.index,
        )
    }
}

/// Bulk transfer descriptor
///
/// For IN transfers `data` is the receive buffer and is truncated to the
/// bytes actually received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkTransfer {
    /// Endpoint number (1..=15, without the direction bit)
    pub endpoint_number: u8,
    pub direction: Direction,
    pub data: Vec<u8>,
}

impl BulkTransfer {
    pub fn read(endpoint_number: u8, len: usize) -> Self {
        Self {
            endpoint_number,
            direction: Direction::In,
            data: vec![0; len],
        }
    }

    pub fn write(endpoint_number: u8, data: Vec<u8>) -> Self {
        Self {
            endpoint_number,
            direction: Direction::Out,
            data,
        }
    }
}

fn control_setup(
    direction: Direction,
    request_type: RequestType,
    recipient: Recipient,
    request: u8,
    value: u8,
    index: u8,
) -> ControlSetup {
    ControlSetup {
        request_type: request_type_byte(direction, request_type, recipient),
        request,
        value: value.into(),
        index: index.into(),
    }
}

/// Full endpoint address for a bulk endpoint number
fn endpoint_address(endpoint_number: u8, direction: Direction) -> Result<u8> {
    if endpoint_number == 0 || endpoint_number > 0x0f {
        return Err(UsbError::InvalidParameter);
    }
    Ok(endpoint_number | direction.bit())
}

impl<B: UsbBackend> DeviceMut<'_, B> {
    /// Read control data from the device
    ///
    /// Returns the number of bytes received, which may be less than
    /// `data.len()`.
    pub fn control_read(
        &mut self,
        request_type: RequestType,
        recipient: Recipient,
        request: u8,
        value: u8,
        index: u8,
        data: &mut [u8],
    ) -> Result<usize> {
        let setup = control_setup(Direction::In, request_type, recipient, request, value, index);
        let requested = data.len();
        let result = self.handle().and_then(|handle| {
            self.backend
                .read_control(handle, setup, data, self.device.timeout)
                .map_err(Into::into)
        });
        self.complete("control", Direction::In, requested, result)
    }

    /// Write control data to the device
    ///
    /// Returns the number of bytes sent.
    pub fn control_write(
        &mut self,
        request_type: RequestType,
        recipient: Recipient,
        request: u8,
        value: u8,
        index: u8,
        data: &[u8],
    ) -> Result<usize> {
        let setup = control_setup(Direction::Out, request_type, recipient, request, value, index);
        let result = self.handle().and_then(|handle| {
            self.backend
                .write_control(handle, setup, data, self.device.timeout)
                .map_err(Into::into)
        });
        self.complete("control", Direction::Out, data.len(), result)
    }

    /// Read bulk data from endpoint `endpoint_number`
    pub fn bulk_read(&mut self, endpoint_number: u8, data: &mut [u8]) -> Result<usize> {
        let requested = data.len();
        let result = endpoint_address(endpoint_number, Direction::In).and_then(|endpoint| {
            let handle = self.handle()?;
            self.backend
                .read_bulk(handle, endpoint, data, self.device.timeout)
                .map_err(Into::into)
        });
        self.complete("bulk", Direction::In, requested, result)
    }

    /// Write bulk data to endpoint `endpoint_number`
    pub fn bulk_write(&mut self, endpoint_number: u8, data: &[u8]) -> Result<usize> {
        let result = endpoint_address(endpoint_number, Direction::Out).and_then(|endpoint| {
            let handle = self.handle()?;
            self.backend
                .write_bulk(handle, endpoint, data, self.device.timeout)
                .map_err(Into::into)
        });
        self.complete("bulk", Direction::Out, data.len(), result)
    }

    /// Perform a control transfer described by `transfer`
    pub fn control_transfer(&mut self, transfer: &mut ControlTransfer) -> Result<usize> {
        let ControlTransfer {
            request_type,
            recipient,
            direction,
            request,
            value,
            index,
            ref mut data,
        } = *transfer;

        match direction {
            Direction::In => {
                let len = self.control_read(request_type, recipient, request, value, index, data)?;
                data.truncate(len);
                Ok(len)
            }
            Direction::Out => {
                self.control_write(request_type, recipient, request, value, index, data)
            }
        }
    }

    /// Perform a bulk transfer described by `transfer`
    pub fn bulk_transfer(&mut self, transfer: &mut BulkTransfer) -> Result<usize> {
        match transfer.direction {
            Direction::In => {
                let len = self.bulk_read(transfer.endpoint_number, &mut transfer.data)?;
                transfer.data.truncate(len);
                Ok(len)
            }
            Direction::Out => self.bulk_write(transfer.endpoint_number, &transfer.data),
        }
    }

    fn handle(&self) -> Result<&B::Handle> {
        self.device
            .handle
            .as_ref()
            .ok_or(UsbError::InvalidParameter)
    }

    /// Account for a finished transfer and record its outcome
    fn complete(
        &mut self,
        kind: &str,
        direction: Direction,
        requested: usize,
        result: Result<usize>,
    ) -> Result<usize> {
        let result = result.and_then(|len| {
            if len > requested {
                Err(UsbError::Overflow)
            } else {
                Ok(len)
            }
        });

        match result {
            Ok(len) => {
                match direction {
                    Direction::In => self.device.bytes_read += len,
                    Direction::Out => self.device.bytes_written += len,
                }
                debug!(
                    "{} {:?} transfer on {}: {}/{} bytes",
                    kind,
                    direction,
                    self.device.name(),
                    len,
                    requested
                );
            }
            Err(e) => {
                warn!(
                    "{} {:?} transfer on {} failed: {}",
                    kind,
                    direction,
                    self.device.name(),
                    e
                );
            }
        }

        self.device.record(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_address() {
        assert_eq!(endpoint_address(1, Direction::In), Ok(0x81));
        assert_eq!(endpoint_address(2, Direction::Out), Ok(0x02));
        assert_eq!(endpoint_address(15, Direction::In), Ok(0x8f));
    }

    #[test]
    fn test_endpoint_address_out_of_range() {
        assert_eq!(
            endpoint_address(0, Direction::In),
            Err(UsbError::InvalidParameter)
        );
        assert_eq!(
            endpoint_address(16, Direction::Out),
            Err(UsbError::InvalidParameter)
        );
        assert_eq!(
            endpoint_address(0x81, Direction::In),
            Err(UsbError::InvalidParameter)
        );
    }

    #[test]
    fn test_control_descriptor_setup() {
        let transfer = ControlTransfer::write(
            RequestType::Vendor,
            Recipient::Device,
            0x03,
            0x1a,
            0x01,
            Vec::new(),
        );
        assert_eq!(
            transfer.setup(),
            ControlSetup {
                request_type: 0x40,
                request: 0x03,
                value: 0x1a,
                index: 0x01,
            }
        );

        let transfer = ControlTransfer::read(RequestType::Vendor, Recipient::Device, 0x05, 0, 1, 2);
        assert_eq!(transfer.setup().request_type, 0xc0);
        assert_eq!(transfer.data.len(), 2);
    }

    #[test]
    fn test_bulk_descriptor_constructors() {
        let read = BulkTransfer::read(1, 64);
        assert_eq!(read.direction, Direction::In);
        assert_eq!(read.data.len(), 64);

        let write = BulkTransfer::write(2, vec![1, 2, 3]);
        assert_eq!(write.direction, Direction::Out);
        assert_eq!(write.data, vec![1, 2, 3]);
    }
}
