use log::error;

use crate::{bitmap::LabelBitmap, error::ValidationError, model::PrinterProfile, tape::Tape};

/// Check that `image` can be printed on `tape` by `profile`.
///
/// Returns the bytes per printed line for the encoder. This runs before the
/// device is opened.
pub fn validate<B: LabelBitmap + ?Sized>(
    profile: &PrinterProfile,
    tape: Tape,
    image: &B,
) -> Result<u8, ValidationError> {
    let bytes_per_line = match profile.bytes_per_line(tape) {
        Some(bytes) => bytes,
        None => {
            error!(
                "Tape is not supported by printer! tape={}, supportedTapes={:?}",
                tape,
                profile.supported_tapes().keys().collect::<Vec<_>>()
            );
            return Err(ValidationError::UnsupportedTape { tape });
        }
    };

    let expected = bytes_per_line as u32 * crate::BITS_IN_BYTE;
    let actual = image.height();
    if actual != expected {
        error!(
            "Wrong image height! imageHeight={} targetHeight={}",
            actual, expected
        );
        return Err(ValidationError::HeightMismatch { expected, actual });
    }

    Ok(bytes_per_line)
}
