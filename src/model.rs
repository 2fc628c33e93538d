use std::collections::BTreeMap;

use crate::tape::Tape;

/// Static description of one printer model.
///
/// Profiles are plain values. Build one with [`PrinterProfile::new`] and the
/// consuming setters, then hand a list of them to [`crate::Catalog::new`]
/// which checks the invariants.
///
/// ```rust
/// use dymo_label::{PrinterProfile, Tape};
///
/// let profile = PrinterProfile::new("My LabelManager", 0x0922, 0x1002)
///     .left_margin(112)
///     .tape(Tape::D1_12mm, 8)
///     .cutting(false);
/// assert_eq!(profile.bytes_per_line(Tape::D1_12mm), Some(8));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterProfile {
    name: String,
    vendor_id: u16,
    product_id: u16,
    color: u32,
    left_margin: u32,
    supported_tapes: BTreeMap<Tape, u8>,
    supports_cutting: bool,
}

impl PrinterProfile {
    pub fn new(name: impl Into<String>, vendor_id: u16, product_id: u16) -> Self {
        PrinterProfile {
            name: name.into(),
            vendor_id,
            product_id,
            color: 0,
            left_margin: 0,
            supported_tapes: BTreeMap::new(),
            supports_cutting: false,
        }
    }

    /// DYMO LabelManager PnP (`0922:1002`).
    pub fn label_manager_pnp() -> Self {
        PrinterProfile::new("DYMO LabelManager PnP", 0x0922, 0x1002)
            .color(0)
            .left_margin(112)
            .tape(Tape::D1_6mm, 4)
            .tape(Tape::D1_9mm, 6)
            .tape(Tape::D1_12mm, 8)
            .cutting(false)
    }

    /// Print color as RGB. Only the low byte reaches the printer.
    pub fn color(self, color: u32) -> Self {
        PrinterProfile { color, ..self }
    }

    /// Blank feed in pixels emitted after the label.
    pub fn left_margin(self, left_margin: u32) -> Self {
        PrinterProfile {
            left_margin,
            ..self
        }
    }

    /// Add or replace a supported tape together with its bytes per line.
    pub fn tape(mut self, tape: Tape, bytes_per_line: u8) -> Self {
        self.supported_tapes.insert(tape, bytes_per_line);
        self
    }

    pub fn cutting(self, supports_cutting: bool) -> Self {
        PrinterProfile {
            supports_cutting,
            ..self
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    pub fn rgb(&self) -> u32 {
        self.color
    }

    pub fn margin(&self) -> u32 {
        self.left_margin
    }

    pub fn supports_cutting(&self) -> bool {
        self.supports_cutting
    }

    pub fn supported_tapes(&self) -> &BTreeMap<Tape, u8> {
        &self.supported_tapes
    }

    pub fn bytes_per_line(&self, tape: Tape) -> Option<u8> {
        self.supported_tapes.get(&tape).copied()
    }

    /// Pixel height an image must have for every supported tape.
    pub fn label_heights(&self) -> BTreeMap<Tape, u32> {
        self.supported_tapes
            .iter()
            .map(|(tape, bytes)| (*tape, *bytes as u32 * crate::BITS_IN_BYTE))
            .collect()
    }

    pub(crate) fn matches(&self, vendor_id: u16, product_id: u16) -> bool {
        self.vendor_id == vendor_id && self.product_id == product_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_manager_pnp_heights() {
        let profile = PrinterProfile::label_manager_pnp();
        let heights = profile.label_heights();

        assert_eq!(heights.get(&Tape::D1_6mm), Some(&32));
        assert_eq!(heights.get(&Tape::D1_9mm), Some(&48));
        assert_eq!(heights.get(&Tape::D1_12mm), Some(&64));
        assert_eq!(profile.margin(), 112);
        assert!(!profile.supports_cutting());
    }

    #[test]
    fn tape_setter_replaces_previous_value() {
        let profile = PrinterProfile::new("test", 1, 2)
            .tape(Tape::D1_9mm, 4)
            .tape(Tape::D1_9mm, 6);

        assert_eq!(profile.bytes_per_line(Tape::D1_9mm), Some(6));
        assert_eq!(profile.bytes_per_line(Tape::D1_6mm), None);
    }
}
