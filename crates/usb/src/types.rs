//! USB type definitions
//!
//! Debug levels, device class codes, control request fields and device
//! identifiers shared by the context, device and transfer modules.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Backend diagnostic verbosity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugLevel {
    /// No debugging output
    #[default]
    Minimal,
    /// Error messages only
    Error,
    /// Errors and warnings
    Warning,
    /// Everything the backend has to say
    Verbose,
}

impl DebugLevel {
    pub const ALL: [DebugLevel; 4] = [
        DebugLevel::Minimal,
        DebugLevel::Error,
        DebugLevel::Warning,
        DebugLevel::Verbose,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DebugLevel::Minimal => "minimal",
            DebugLevel::Error => "error",
            DebugLevel::Warning => "warning",
            DebugLevel::Verbose => "verbose",
        }
    }
}

impl fmt::Display for DebugLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DebugLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        DebugLevel::ALL
            .iter()
            .copied()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "Invalid debug level '{}', must be one of: minimal, error, warning, verbose",
                    s
                )
            })
    }
}

/// USB device class
///
/// Base class codes as assigned by the USB-IF. Codes without a dedicated
/// variant map to [`DeviceClass::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceClass {
    PerInterface,
    Audio,
    Communications,
    Hid,
    Physical,
    Image,
    Printer,
    MassStorage,
    Hub,
    Data,
    SmartCard,
    ContentSecurity,
    Video,
    Healthcare,
    Diagnostic,
    Wireless,
    Application,
    Vendor,
    Unknown,
}

impl DeviceClass {
    /// Map a `bDeviceClass` code onto a device class
    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => DeviceClass::PerInterface,
            0x01 => DeviceClass::Audio,
            0x02 => DeviceClass::Communications,
            0x03 => DeviceClass::Hid,
            0x05 => DeviceClass::Physical,
            0x06 => DeviceClass::Image,
            0x07 => DeviceClass::Printer,
            0x08 => DeviceClass::MassStorage,
            0x09 => DeviceClass::Hub,
            0x0a => DeviceClass::Data,
            0x0b => DeviceClass::SmartCard,
            0x0d => DeviceClass::ContentSecurity,
            0x0e => DeviceClass::Video,
            0x0f => DeviceClass::Healthcare,
            0xdc => DeviceClass::Diagnostic,
            0xe0 => DeviceClass::Wireless,
            0xfe => DeviceClass::Application,
            0xff => DeviceClass::Vendor,
            _ => DeviceClass::Unknown,
        }
    }

    /// Human-readable class name
    pub fn name(self) -> &'static str {
        match self {
            DeviceClass::PerInterface => "Per interface",
            DeviceClass::Audio => "Audio",
            DeviceClass::Communications => "Communications",
            DeviceClass::Hid => "Human interface device",
            DeviceClass::Physical => "Physical",
            DeviceClass::Image => "Image",
            DeviceClass::Printer => "Printer",
            DeviceClass::MassStorage => "Mass storage",
            DeviceClass::Hub => "Hub",
            DeviceClass::Data => "Data",
            DeviceClass::SmartCard => "Smart card",
            DeviceClass::ContentSecurity => "Content security",
            DeviceClass::Video => "Video",
            DeviceClass::Healthcare => "Healthcare",
            DeviceClass::Diagnostic => "Diagnostic",
            DeviceClass::Wireless => "Wireless",
            DeviceClass::Application => "Application",
            DeviceClass::Vendor => "Vendor specific",
            DeviceClass::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Control request type (bits 5..6 of `bmRequestType`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestType {
    Standard,
    Class,
    Vendor,
    Reserved,
}

/// Control request recipient (bits 0..4 of `bmRequestType`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recipient {
    Device,
    Interface,
    Endpoint,
    Other,
}

/// Transfer direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Host to device
    Out,
    /// Device to host
    In,
}

impl Direction {
    /// Direction bit as used in `bmRequestType` and endpoint addresses
    pub fn bit(self) -> u8 {
        match self {
            Direction::Out => 0x00,
            Direction::In => 0x80,
        }
    }
}

/// Compose a `bmRequestType` byte
pub fn request_type_byte(direction: Direction, request_type: RequestType, recipient: Recipient) -> u8 {
    let kind = match request_type {
        RequestType::Standard => 0x00,
        RequestType::Class => 0x20,
        RequestType::Vendor => 0x40,
        RequestType::Reserved => 0x60,
    };
    let target = match recipient {
        Recipient::Device => 0x00,
        Recipient::Interface => 0x01,
        Recipient::Endpoint => 0x02,
        Recipient::Other => 0x03,
    };
    direction.bit() | kind | target
}

/// Raw control setup fields handed to a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlSetup {
    /// `bmRequestType`
    pub request_type: u8,
    /// `bRequest`
    pub request: u8,
    /// `wValue`
    pub value: u16,
    /// `wIndex`
    pub index: u16,
}

/// Immutable identity of an enumerated device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceIdentity {
    /// Bus number the device is connected to
    pub bus: u8,
    /// Address on that bus
    pub address: u8,
    /// USB Vendor ID
    pub vendor_id: u16,
    /// USB Product ID
    pub product_id: u16,
    /// Device class
    pub class: DeviceClass,
}

/// Logical device identifier
///
/// Bound to the context generation that produced it. After a refresh or
/// release the identifier no longer resolves and lookups return
/// [`crate::UsbError::NotFound`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId {
    pub(crate) generation: u64,
    pub(crate) index: usize,
}

impl DeviceId {
    /// Position in the device list of the generation this id belongs to
    pub fn index(&self) -> usize {
        self.index
    }

    /// Context generation this id belongs to
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.generation, self.index)
    }
}
