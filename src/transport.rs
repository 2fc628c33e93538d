//! Seam between the print service and the HID transport.
//!
//! [`crate::UsbTransport`] is the real implementation; tests plug in their
//! own.

use crate::error::Result;

/// One device as reported by enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Opaque locator, only meaningful to the transport that produced it.
    pub path: String,
    /// `None` when the device has no serial number or it could not be read.
    pub serial_number: Option<String>,
    /// Reading the serial number was refused by the operating system.
    pub access_denied: bool,
    pub vendor_id: u16,
    pub product_id: u16,
}

pub trait HidTransport {
    type Handle: HidHandle;

    /// List attached devices. Every call reflects the current bus state.
    fn enumerate(&self) -> Result<Vec<DeviceInfo>>;

    /// Open `device` for exclusive access.
    fn open(&self, device: &DeviceInfo) -> Result<Self::Handle>;

    /// Whether the device at `path` is still attached.
    fn is_connected(&self, path: &str) -> bool;
}

/// An open device.
pub trait HidHandle {
    /// Send one output report.
    fn write_report(&mut self, report_id: u8, data: &[u8]) -> Result<()>;

    /// Read one input report into `buf`, returning its length.
    fn read_report(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Release the device. Closing twice is harmless.
    fn close(&mut self);
}
