//! Integration tests for session options
//!
//! Options parsed from command-line style parameters are applied to a
//! context backed by the mock backend.

use common::{ParamStore, UsbOptions};
use std::time::Duration;
use usb::test_utils::{MockBackend, MockCall, create_mock_device};
use usb::{Context, DebugLevel};

#[test]
fn test_options_applied_to_session() {
    let args = ["usb-list", "usb-debug-level=warning", "usb-timeout=0.2"];
    let options = UsbOptions::from_params(&ParamStore::from_args(args, "usb-"));

    let backend = MockBackend::with_devices(vec![create_mock_device(1, 4, 0x0403, 0x6001, 0xff)]);
    let mut ctx = Context::with_backend(backend.clone());
    ctx.setup(options.debug_level).unwrap();
    ctx.refresh().unwrap();

    let id = ctx.match_vendor_product(0x0403, 0x6001).unwrap();
    let mut dev = ctx.device_mut(id).unwrap();
    dev.open().unwrap();
    dev.setup(options.timeout);
    dev.bulk_write(2, &[0x55]).unwrap();

    assert_eq!(backend.debug_level(), Some(DebugLevel::Warning));
    assert!(matches!(
        &backend.calls()[0],
        MockCall::WriteBulk { timeout, .. } if *timeout == Duration::from_millis(200)
    ));
}

#[test]
fn test_common_error_wraps_usb_error() {
    fn open_missing() -> common::Result<()> {
        let mut ctx = Context::with_backend(MockBackend::new());
        ctx.refresh()?;
        let id = ctx
            .match_name("/dev/bus/usb/001/001")
            .ok_or(usb::UsbError::NotFound)?;
        ctx.device_mut(id)?.open()?;
        Ok(())
    }

    let err = open_missing().unwrap_err();
    assert!(matches!(err, common::Error::Usb(usb::UsbError::NotFound)));
}
