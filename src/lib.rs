//! DYMO LabelManager Printer Driver
//!
//! This crate drives DYMO LabelManager label printers attached over USB HID.
//! It finds printers, checks a label image against the installed D1 tape,
//! encodes it into the printer's escape-sequence protocol and sends it in
//! 64 byte reports.
//!
//! # Example
//!
//! ```rust,no_run
//! use dymo_label::{Bitmap, Catalog, PrintService, Tape, UsbConfig, UsbTransport};
//!
//! let transport = UsbTransport::new(UsbConfig::default()).unwrap();
//! let service = PrintService::new(Catalog::default(), transport);
//!
//! // 12 mm tape takes 64 pixel high images
//! let label = Bitmap::from_fn(120, 64, |x, y| (x / 8 + y / 8) % 2 == 0);
//! service.print_label("0123456789", Tape::D1_12mm, &label).unwrap();
//! ```

mod bitmap;
mod catalog;
mod encoder;
mod error;
mod frames;
mod model;
mod printer;
mod tape;
mod transport;
mod usb;
mod validate;

pub use crate::{
    bitmap::{Bitmap, LabelBitmap},
    catalog::Catalog,
    encoder::{encode, pack_columns, status_request, ESC, SYN},
    error::{Error, Result, ValidationError},
    frames::split,
    model::PrinterProfile,
    printer::{DiscoveredPrinter, JobState, PrintService},
    tape::Tape,
    transport::{DeviceInfo, HidHandle, HidTransport},
    usb::{UsbConfig, UsbHandle, UsbTransport},
    validate::validate,
};

/// Size of one HID output report.
///
/// The encoded label is split into frames of this size and each frame is sent
/// as one report.
pub const REPORT_SIZE: usize = 64;

/// LabelManager printers do not number their reports.
pub const REPORT_ID: u8 = 0;

/// Pixels packed into one raster byte.
pub(crate) const BITS_IN_BYTE: u32 = 8;
