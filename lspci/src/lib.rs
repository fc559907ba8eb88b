//! Runs the system `lspci` and parses what it prints into [`Device`]s.
//!
//! The simplest way in is [`CommandBuilder`]:
//! set the flags you need, then call [`CommandBuilder::run`] to get devices or
//! [`CommandBuilder::run_raw`] to get the text.
//!
//! Two output formats are understood: the one-line `lspci -mm` format
//! ([`SimpleParser`]) and the verbose `lspci -vvvmm` format
//! ([`VerboseParser`]), which also carries kernel drivers and modules.
//!
//! Everything else, from bus enumeration to `pci.ids` lookups, is left to
//! `lspci` itself.
mod builder;
mod command;
mod device;
mod error;
mod filter;
mod hex;
mod name;
pub mod parser;
pub mod pcilib;
mod slot;
#[cfg(test)]
mod testing;

pub use builder::*;
pub use command::*;
pub use device::Device;
pub use error::*;
pub use filter::*;
pub use name::*;
pub use parser::{Parser, SimpleParser, VerboseParser};
pub use pcilib::PcilibParameter;
pub use slot::*;
