//! Error types for LabelManager printer operations.
//!
//! Validation problems are kept in their own enum so callers can tell a
//! rejected job from a transport failure without inspecting messages.

use thiserror::Error;

use crate::tape::Tape;

/// Reasons a print job is rejected before any byte reaches the device.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The printer has no entry for the requested cassette.
    #[error("Tape {tape} is not supported by this printer")]
    UnsupportedTape { tape: Tape },

    /// The image height does not equal the printed column height of the tape.
    #[error("Wrong image height: expected {expected} pixels, got {actual}")]
    HeightMismatch { expected: u32, actual: u32 },
}

/// Main error type for printer operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No profile-matched device carries the requested serial number.
    #[error("Printer not found: serial number {0}")]
    PrinterNotFound(String),

    /// The operating system refused access to the device.
    ///
    /// On Linux this usually means a udev rule granting the user access to
    /// the printer is missing.
    #[error("Permission denied! You are not allowed to access '{path}'. Please grant access to HID.")]
    PermissionDenied { path: String },

    /// USB communication error.
    #[error(transparent)]
    UsbError(#[from] rusb::Error),

    #[error("Device has no HID interrupt OUT endpoint")]
    MissingEndpoint,

    /// The device went away between opening and writing.
    #[error("Device at '{0}' was disconnected")]
    DeviceDisconnected(String),

    #[error("Incomplete report write: {written} of {expected} bytes")]
    IncompleteWrite { written: usize, expected: usize },

    /// Invalid configuration parameter provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Map a transport error on `path`, singling out access denials.
    pub(crate) fn from_usb(err: rusb::Error, path: &str) -> Self {
        match err {
            rusb::Error::Access => Error::PermissionDenied {
                path: path.to_string(),
            },
            err => Error::UsbError(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
