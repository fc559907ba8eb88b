//! Introspection of the pcilib library `lspci` is built on.

use std::ffi::OsString;

use serde::Serialize;

use crate::{Executor, LspciOptions, Result, command::run_unchecked};

/// A parameter accepted by pcilib's access methods, from `lspci -Ohelp`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PcilibParameter {
    pub name: String,
    pub description: String,
    pub default: Option<String>,
}

impl PcilibParameter {
    /// Parses `name<whitespace>description (default)`. Returns `None` when
    /// the line has no description.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        let (name, rest) = line.split_once(char::is_whitespace)?;
        let rest = rest.trim_start();

        let (description, default) = match rest
            .strip_suffix(')')
            .and_then(|rest| rest.rsplit_once(" ("))
        {
            Some((description, default)) => (description, Some(default)),
            None => (rest, None),
        };
        if description.is_empty() {
            return None;
        }

        Some(Self {
            name: name.to_owned(),
            description: description.to_owned(),
            default: default.filter(|default| !default.is_empty()).map(str::to_owned),
        })
    }
}

/// Trimmed, non-empty lines without the header `lspci` prints first
fn help_lines<'a>(output: &'a str, header: &'a str) -> impl Iterator<Item = &'a str> {
    output
        .lines()
        .map(str::trim)
        .filter(move |line| !line.is_empty() && !line.contains(header))
}

/// The access methods pcilib can use to find devices (`lspci -Ahelp`).
pub fn list_access_methods(
    options: &LspciOptions,
    executor: &dyn Executor,
) -> Result<Vec<String>> {
    let options = LspciOptions {
        access_method: Some("help".into()),
        ..options.clone()
    };
    let output = run_unchecked(&options, executor)?;
    Ok(help_lines(&output, "Known PCI access methods")
        .map(str::to_owned)
        .collect())
}

/// The raw description lines of pcilib's parameters (`lspci -Ohelp`).
pub fn list_pcilib_params_raw(
    options: &LspciOptions,
    executor: &dyn Executor,
) -> Result<Vec<String>> {
    let output = executor.execute(options.program.as_os_str(), &[OsString::from("-Ohelp")])?;
    Ok(help_lines(&output, "Known PCI access parameters")
        .map(str::to_owned)
        .collect())
}

/// pcilib's parameters with their descriptions and default values. Lines that
/// do not look like a parameter are dropped.
pub fn list_pcilib_params(
    options: &LspciOptions,
    executor: &dyn Executor,
) -> Result<Vec<PcilibParameter>> {
    Ok(list_pcilib_params_raw(options, executor)?
        .iter()
        .filter_map(|line| PcilibParameter::parse(line))
        .collect())
}
