//! Device selection filters, passed to `lspci` as `-s` and `-d`.
//!
//! A field left as `None` matches anything; on the command line it is printed
//! as an empty component.

use core::{fmt, str::FromStr};

use crate::{Error, Result, hex::parse_hex};

const MAX_DEVICE: u8 = 0x1f;
const MAX_FUNCTION: u8 = 0x7;

/// Empty and `*` components mean "any"
fn component<T: num_traits::Num>(value: &str, raw: &str) -> Result<Option<T>> {
    if value.is_empty() || value == "*" {
        return Ok(None);
    }
    parse_hex(value).map(Some).ok_or_else(|| Error::InvalidFilter {
        value: raw.into(),
        reason: "components must be hexadecimal numbers",
    })
}

struct Hex<T>(Option<T>);

impl<T: fmt::LowerHex> fmt::Display for Hex<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(value) => write!(f, "{value:x}"),
            None => Ok(()),
        }
    }
}

/// Selects devices by address, `[[[[<domain>]:]<bus>]:][<device>][.[<func>]]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotFilter {
    pub domain: Option<u32>,
    pub bus: Option<u8>,
    pub device: Option<u8>,
    pub function: Option<u8>,
}

impl SlotFilter {
    pub fn validate(self) -> Result<Self> {
        let reason = if self.device.is_some_and(|device| device > MAX_DEVICE) {
            "device number out of range"
        } else if self.function.is_some_and(|function| function > MAX_FUNCTION) {
            "function number out of range"
        } else {
            return Ok(self);
        };
        Err(Error::InvalidFilter {
            value: self.to_string(),
            reason,
        })
    }
}

impl FromStr for SlotFilter {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let mut filter = Self::default();

        let (head, mid) = match raw.rsplit_once(':') {
            Some((head, mid)) => (Some(head), mid),
            None => (None, raw),
        };
        if let Some(head) = head {
            let (domain, bus) = match head.split_once(':') {
                Some((domain, bus)) => (Some(domain), bus),
                None => (None, head),
            };
            if let Some(domain) = domain {
                filter.domain = component(domain, raw)?;
            }
            filter.bus = component(bus, raw)?;
        }

        let (device, function) = match mid.split_once('.') {
            Some((device, function)) => (device, Some(function)),
            None => (mid, None),
        };
        filter.device = component(device, raw)?;
        if let Some(function) = function {
            filter.function = component(function, raw)?;
        }

        filter.validate()
    }
}

impl fmt::Display for SlotFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}.{}",
            Hex(self.domain),
            Hex(self.bus),
            Hex(self.device),
            Hex(self.function)
        )
    }
}

/// Selects devices by id, `[<vendor>]:[<device>][:<class>]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    pub vendor: Option<u16>,
    pub device: Option<u16>,
    pub cls: Option<u16>,
}

impl FromStr for DeviceFilter {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let mut parts = raw.split(':');
        let (Some(vendor), Some(device)) = (parts.next(), parts.next()) else {
            return Err(Error::InvalidFilter {
                value: raw.into(),
                reason: "':' expected",
            });
        };
        let cls = parts.next();
        if parts.next().is_some() {
            return Err(Error::InvalidFilter {
                value: raw.into(),
                reason: "too many components",
            });
        }

        Ok(Self {
            vendor: component(vendor, raw)?,
            device: component(device, raw)?,
            cls: match cls {
                Some(cls) => component(cls, raw)?,
                None => None,
            },
        })
    }
}

impl fmt::Display for DeviceFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", Hex(self.vendor), Hex(self.device))?;
        if self.cls.is_some() {
            write!(f, ":{}", Hex(self.cls))?;
        }
        Ok(())
    }
}
