use log::debug;

use crate::{error::Error, model::PrinterProfile};

/// The set of printer models the driver will talk to.
///
/// Devices whose vendor/product id pair is not in the catalog are never
/// reported as printers.
#[derive(Debug, Clone)]
pub struct Catalog {
    profiles: Vec<PrinterProfile>,
}

impl Catalog {
    /// Build a catalog, rejecting profiles that break the model invariants.
    pub fn new(profiles: Vec<PrinterProfile>) -> Result<Self, Error> {
        for (i, profile) in profiles.iter().enumerate() {
            if let Some((tape, _)) = profile
                .supported_tapes()
                .iter()
                .find(|(_, bytes)| **bytes == 0)
            {
                return Err(Error::InvalidConfig(format!(
                    "{}: bytes per line for {} must be at least 1",
                    profile.name(),
                    tape
                )));
            }

            if let Some(other) = profiles[..i]
                .iter()
                .find(|other| other.matches(profile.vendor_id(), profile.product_id()))
            {
                return Err(Error::InvalidConfig(format!(
                    "{} and {} share the device id {:04x}:{:04x}",
                    other.name(),
                    profile.name(),
                    profile.vendor_id(),
                    profile.product_id()
                )));
            }
        }

        Ok(Catalog { profiles })
    }

    /// First profile whose vendor and product id equal the given ones.
    pub fn match_device(&self, vendor_id: u16, product_id: u16) -> Option<&PrinterProfile> {
        let found = self
            .profiles
            .iter()
            .find(|profile| profile.matches(vendor_id, product_id));

        if let Some(profile) = found {
            debug!(
                "{:04x}:{:04x} matched {}",
                vendor_id,
                product_id,
                profile.name()
            );
        }
        found
    }

    pub fn profiles(&self) -> &[PrinterProfile] {
        &self.profiles
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog {
            profiles: vec![PrinterProfile::label_manager_pnp()],
        }
    }
}
