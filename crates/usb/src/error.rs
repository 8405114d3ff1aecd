//! USB error taxonomy
//!
//! Every fallible context, device and transfer operation returns one of these
//! kinds. Success is the absence of an error (`Ok` or a `None` last error).

use thiserror::Error;

/// USB error kinds
///
/// Mirrors the libusb error codes, plus [`UsbError::InvalidContext`] for
/// operations on a released context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum UsbError {
    /// Input/output error
    #[error("Input/output error")]
    Io,
    /// Invalid parameter
    #[error("Invalid parameter")]
    InvalidParameter,
    /// Access denied (insufficient permissions)
    #[error("Access denied")]
    Access,
    /// Device was disconnected
    #[error("No such device")]
    NoDevice,
    /// Entity not found (also returned for stale device identifiers)
    #[error("Entity not found")]
    NotFound,
    /// Resource busy (device claimed elsewhere)
    #[error("Resource busy")]
    Busy,
    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,
    /// More data than requested
    #[error("Overflow")]
    Overflow,
    /// Endpoint stalled
    #[error("Pipe error")]
    Pipe,
    /// System call interrupted
    #[error("System call interrupted")]
    Interrupted,
    /// Insufficient memory
    #[error("Insufficient memory")]
    NoMemory,
    /// Operation not supported on this platform
    #[error("Operation not supported")]
    NotSupported,
    /// Other error
    #[error("Other error")]
    Other,
    /// Context was released or never acquired a backend
    #[error("Invalid USB context")]
    InvalidContext,
}

/// Type alias for USB results
pub type Result<T> = std::result::Result<T, UsbError>;

impl UsbError {
    /// All error kinds, in code order
    pub const ALL: [UsbError; 14] = [
        UsbError::Io,
        UsbError::InvalidParameter,
        UsbError::Access,
        UsbError::NoDevice,
        UsbError::NotFound,
        UsbError::Busy,
        UsbError::Timeout,
        UsbError::Overflow,
        UsbError::Pipe,
        UsbError::Interrupted,
        UsbError::NoMemory,
        UsbError::NotSupported,
        UsbError::Other,
        UsbError::InvalidContext,
    ];

    /// Stable numeric code (1..=14). Code 0 is reserved for success.
    pub fn code(self) -> i32 {
        match self {
            UsbError::Io => 1,
            UsbError::InvalidParameter => 2,
            UsbError::Access => 3,
            UsbError::NoDevice => 4,
            UsbError::NotFound => 5,
            UsbError::Busy => 6,
            UsbError::Timeout => 7,
            UsbError::Overflow => 8,
            UsbError::Pipe => 9,
            UsbError::Interrupted => 10,
            UsbError::NoMemory => 11,
            UsbError::NotSupported => 12,
            UsbError::Other => 13,
            UsbError::InvalidContext => 14,
        }
    }

    /// Inverse of [`UsbError::code`]
    ///
    /// Returns `None` for code 0 (success) and for codes outside the table.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.code() == code)
    }

    /// Whether retrying the same call may succeed
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            UsbError::Busy | UsbError::Timeout | UsbError::Io | UsbError::Interrupted
        )
    }

    /// Whether the device is gone and the context needs a fresh refresh
    pub fn requires_refresh(self) -> bool {
        matches!(self, UsbError::NoDevice | UsbError::NotFound)
    }
}

/// Map a libusb error onto the USB error taxonomy
///
/// Total mapping: anything without a dedicated kind lands on `Other`.
impl From<rusb::Error> for UsbError {
    fn from(err: rusb::Error) -> Self {
        match err {
            rusb::Error::Io => UsbError::Io,
            rusb::Error::InvalidParam => UsbError::InvalidParameter,
            rusb::Error::Access => UsbError::Access,
            rusb::Error::NoDevice => UsbError::NoDevice,
            rusb::Error::NotFound => UsbError::NotFound,
            rusb::Error::Busy => UsbError::Busy,
            rusb::Error::Timeout => UsbError::Timeout,
            rusb::Error::Overflow => UsbError::Overflow,
            rusb::Error::Pipe => UsbError::Pipe,
            rusb::Error::Interrupted => UsbError::Interrupted,
            rusb::Error::NoMem => UsbError::NoMemory,
            rusb::Error::NotSupported => UsbError::NotSupported,
            _ => UsbError::Other,
        }
    }
}
