use core::{fmt, str::FromStr};

use serde::Serialize;

use crate::{Error, hex::parse_hex};

/// A PCI slot address as printed by `lspci`.
///
/// `lspci` hides the domain when the machine has a single domain numbered 0,
/// so a missing domain parses as 0. With `-PP` the slot is printed as a bridge
/// path (`00:1c.0/02:00.0`): the last element is the device itself and the
/// elements before it end up in [`Slot::parents`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Slot {
    pub domain: u32,
    pub bus: u8,
    pub device: u8,
    pub function: u8,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<Slot>,
}

impl Slot {
    pub const fn new(domain: u32, bus: u8, device: u8, function: u8) -> Self {
        Self {
            domain,
            bus,
            device,
            function,
            parents: Vec::new(),
        }
    }

    /// Splits one `[domain:]bus:device.function` element.
    fn parse_element(value: &str, inherited_domain: Option<u32>) -> Option<Self> {
        let (rest, function) = value.rsplit_once('.')?;
        let mut parts = rest.rsplit(':');
        let device = parse_hex(parts.next()?)?;
        let bus = parse_hex(parts.next()?)?;
        let domain = match parts.next() {
            Some(domain) => parse_hex(domain)?,
            None => inherited_domain.unwrap_or(0),
        };
        if parts.next().is_some() {
            return None;
        }
        Some(Self::new(domain, bus, device, parse_hex(function)?))
    }
}

impl FromStr for Slot {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidSlot(value.into());

        let mut path = Vec::new();
        let mut domain = None;
        for element in value.trim().split('/') {
            let slot = Self::parse_element(element, domain).ok_or_else(invalid)?;
            domain = Some(slot.domain);
            path.push(slot);
        }

        let mut slot = path.pop().ok_or_else(invalid)?;
        slot.parents = path;
        Ok(slot)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:0>4x}:{:0>2x}:{:0>2x}.{:x}",
            self.domain, self.bus, self.device, self.function
        )
    }
}
