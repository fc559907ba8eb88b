use core::{convert::Infallible, fmt, str::FromStr};

use serde::Serialize;

use crate::hex::parse_hex;

/// A class, vendor or device as printed by `lspci`: a name, an hexadecimal
/// id, or both as `Name [id]` depending on the `-n`/`-nn` flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct NameWithId {
    pub id: Option<u32>,
    pub name: Option<String>,
}

impl NameWithId {
    pub fn new(name: impl Into<String>, id: u32) -> Self {
        Self {
            id: Some(id),
            name: Some(name.into()),
        }
    }

    pub fn from_id(id: u32) -> Self {
        Self {
            id: Some(id),
            name: None,
        }
    }

    pub fn from_name(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
        }
    }

    /// Matches `Name [id]`, where the name may itself contain brackets and the
    /// id is the last bracketed group.
    fn split_name_and_id(value: &str) -> Option<(&str, u32)> {
        let inner = value.strip_suffix(']')?;
        let (name, id) = inner.rsplit_once('[')?;
        let name = name.strip_suffix(|c: char| c.is_whitespace())?;
        if name.is_empty() {
            return None;
        }
        Some((name, parse_hex(id)?))
    }
}

impl FromStr for NameWithId {
    type Err = Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if let Some((name, id)) = Self::split_name_and_id(value) {
            return Ok(Self::new(name, id));
        }
        Ok(match parse_hex(value) {
            Some(id) => Self::from_id(id),
            None => Self::from_name(value),
        })
    }
}

impl From<&str> for NameWithId {
    fn from(value: &str) -> Self {
        match value.parse() {
            Ok(parsed) => parsed,
            Err(never) => match never {},
        }
    }
}

impl fmt::Display for NameWithId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, self.id) {
            (Some(name), Some(id)) => write!(f, "{name} [{id:x}]"),
            (Some(name), None) => f.write_str(name),
            (None, Some(id)) => write!(f, "{id:x}"),
            (None, None) => Ok(()),
        }
    }
}
