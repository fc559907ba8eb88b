use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use lspci::{CommandBuilder, DEFAULT_PROGRAM, DeviceFilter, IdResolveOption, SlotFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Ids {
    /// `Name [id]`
    Both,
    IdOnly,
    NameOnly,
}

impl From<Ids> for IdResolveOption {
    fn from(value: Ids) -> Self {
        match value {
            Ids::Both => Self::Both,
            Ids::IdOnly => Self::IdOnly,
            Ids::NameOnly => Self::NameOnly,
        }
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {s:?}"))?;
    if key.is_empty() {
        return Err(format!("empty key in {s:?}"));
    }
    Ok((key.into(), value.into()))
}

/// List PCI devices as JSON, using the system lspci
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// lspci executable to run
    #[arg(env = "LSPCI_PATH", long, default_value = DEFAULT_PROGRAM)]
    pub lspci_path: PathBuf,
    /// Use the verbose format, which adds NUMA node, IOMMU group and physical slot
    #[arg(short, long)]
    pub verbose: bool,
    /// Include kernel drivers and modules (implies --verbose)
    #[arg(short = 'k', long)]
    pub kernel_drivers: bool,
    /// Prefix slots with the path of bridges leading to them
    #[arg(long)]
    pub bridge_paths: bool,
    /// Always print the PCI domain, even with a single domain 0000
    #[arg(short = 'D', long)]
    pub show_domain: bool,
    #[arg(long, value_enum, default_value_t = Ids::Both)]
    pub ids: Ids,
    /// pci.ids file to resolve names with
    #[arg(short = 'i', long)]
    pub pciids: Option<PathBuf>,
    /// pcimap file linking kernel modules to devices
    #[arg(short = 'p', long)]
    pub pcimap: Option<PathBuf>,
    /// Read devices from an `lspci -x` hex dump
    #[arg(short = 'F', long)]
    pub file: Option<PathBuf>,
    /// Do not check that the files given above exist
    #[arg(long)]
    pub no_check: bool,
    /// pcilib access method
    #[arg(short = 'A', long)]
    pub access_method: Option<String>,
    /// pcilib parameter, can be repeated
    #[arg(short = 'O', value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub pcilib_param: Vec<(String, String)>,
    /// Only show devices in this slot, `[[[[<domain>]:]<bus>]:][<device>][.[<func>]]`
    #[arg(short, long)]
    pub slot: Option<SlotFilter>,
    /// Only show devices with these ids, `[<vendor>]:[<device>][:<class>]`
    #[arg(short, long)]
    pub device: Option<DeviceFilter>,
    /// Print the output of lspci instead of JSON
    #[arg(long, conflicts_with = "compact")]
    pub raw: bool,
    /// Print JSON on a single line
    #[arg(long)]
    pub compact: bool,
    /// List pcilib access methods and exit
    #[arg(long, conflicts_with_all = ["list_pcilib_params", "raw"])]
    pub list_access_methods: bool,
    /// List pcilib parameters and exit
    #[arg(long, conflicts_with = "raw")]
    pub list_pcilib_params: bool,
    #[arg(env = "LSPCI_LOG", long, default_value = "warn")]
    pub log_level: LevelFilter,
    /// Log JSON lines instead of text
    #[arg(env = "LSPCI_LOG_JSON", long)]
    pub log_json: bool,
}

impl Args {
    pub fn builder(&self) -> anyhow::Result<CommandBuilder> {
        let check = !self.no_check;
        let ids = IdResolveOption::from(self.ids);

        let mut builder = CommandBuilder::new()
            .with_program(&self.lspci_path)
            .verbose(self.verbose)
            .include_kernel_drivers(self.kernel_drivers)
            .include_bridge_paths(self.bridge_paths)
            .hide_single_domain(!self.show_domain)
            .with_ids(ids.has_ids())
            .with_names(ids.has_names())
            .with_pcilib_params(self.pcilib_param.iter().cloned());

        if let Some(path) = &self.pciids {
            builder = builder.use_pciids(path, check).context("--pciids")?;
        }
        if let Some(path) = &self.pcimap {
            builder = builder.use_pcimap(path, check).context("--pcimap")?;
        }
        if let Some(path) = &self.file {
            builder = builder.from_file(path, check).context("--file")?;
        }
        if let Some(method) = &self.access_method {
            builder = builder.use_access_method(method);
        }
        if let Some(filter) = self.slot {
            builder = builder.slot_filter(filter).context("--slot")?;
        }
        if let Some(filter) = self.device {
            builder = builder.device_filter(filter);
        }

        Ok(builder.with_default_parser())
    }
}
