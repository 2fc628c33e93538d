//! LabelManager raster protocol.
//!
//! A label job is a flat stream of escape sequences:
//!
//! ```text
//! 1B 43 <color>                   ESC C : tape color
//! 1B 42 <height code>             ESC B : head height for the tape
//! 1B 44 00 16 16                  two empty lines
//! 1B 44 <bytes per line>          ESC D : raster line width
//! [16 <bytes per line>] ...       one SYN-prefixed line per image column
//! 1B 44 00 16 ...                 one empty line per margin pixel
//! 1B 45                           ESC E : cut, if the printer has a cutter
//! ```

use log::debug;

use crate::{bitmap::LabelBitmap, model::PrinterProfile, tape::Tape};

pub const ESC: u8 = 0x1B;
pub const SYN: u8 = 0x16;

const CMD_A: u8 = b'A';
const CMD_B: u8 = b'B';
const CMD_C: u8 = b'C';
const CMD_D: u8 = b'D';
const CMD_E: u8 = b'E';

/// Encode `image` into the command stream for `profile` loaded with `tape`.
///
/// The function is pure. Callers run `validate` first, which guarantees the
/// image height matches the line width used here. For a tape missing from
/// the profile the tape's full head height is assumed.
pub fn encode<B: LabelBitmap + ?Sized>(profile: &PrinterProfile, tape: Tape, image: &B) -> Vec<u8> {
    let bytes_per_line = profile
        .bytes_per_line(tape)
        .unwrap_or_else(|| tape.bytes_per_line());
    let raster = pack_columns(image);

    let lines = raster.len() / bytes_per_line.max(1) as usize + 1;
    let mut buf: Vec<u8> = Vec::with_capacity(raster.len() + lines + profile.margin() as usize + 20);

    // tape color
    buf.extend_from_slice(&[ESC, CMD_C, profile.rgb() as u8]);

    // head height
    buf.extend_from_slice(&[ESC, CMD_B, tape.height_code()]);

    empty_lines(&mut buf, 2);

    buf.extend_from_slice(&[ESC, CMD_D, bytes_per_line]);
    // zero-width lines never reach here from a valid catalog
    for line in raster.chunks(bytes_per_line.max(1) as usize) {
        buf.push(SYN);
        buf.extend_from_slice(line);
    }

    // left margin
    empty_lines(&mut buf, profile.margin());

    if profile.supports_cutting() {
        buf.extend_from_slice(&[ESC, CMD_E]);
    }

    debug!(
        "Encoded {}x{} label for {} on {}: {} raster bytes, {} bytes total",
        image.width(),
        image.height(),
        profile.name(),
        tape,
        raster.len(),
        buf.len()
    );
    buf
}

/// Pack `image` column by column into printer raster bytes.
///
/// Columns are emitted from the last to the first, so the right edge of the
/// image prints first. Within a column rows run top to bottom and fill each
/// byte from the most significant bit down. A column of `height` pixels
/// yields `height / 8` bytes; bits of a trailing partial byte are dropped.
pub fn pack_columns<B: LabelBitmap + ?Sized>(image: &B) -> Vec<u8> {
    let width = image.width();
    let height = image.height();
    let mut raster: Vec<u8> = Vec::with_capacity((width as usize * height as usize) / 8);

    for x in (0..width).rev() {
        let mut byte: u8 = 0x00;
        for y in 0..height {
            let bit = 7 - (y % 8);
            if image.is_ink(x, y) {
                byte |= 1 << bit;
            }
            if bit == 0 {
                raster.push(byte);
                byte = 0x00;
            }
        }
    }
    raster
}

/// Command asking the printer to report its status (`ESC A`).
pub fn status_request() -> [u8; 2] {
    [ESC, CMD_A]
}

// `ESC D 0` declares zero-width lines, every SYN after it feeds one blank line.
fn empty_lines(buf: &mut Vec<u8>, count: u32) {
    buf.extend_from_slice(&[ESC, CMD_D, 0x00]);
    buf.extend(std::iter::repeat(SYN).take(count as usize));
}
