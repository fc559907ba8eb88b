use std::io::Write;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;

mod args;

use args::Args;

fn print_json<T: Serialize + ?Sized>(value: &T, compact: bool) -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    if compact {
        serde_json::to_writer(&mut out, value)?;
    } else {
        serde_json::to_writer_pretty(&mut out, value)?;
    }
    writeln!(out)?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    lspci_log::init(args.log_level, args.log_json).context("installing the logger")?;

    let builder = args.builder()?;
    log::debug!("{builder:?}");

    if args.list_access_methods {
        let methods = builder
            .list_access_methods()
            .context("listing access methods")?;
        print_json(&methods, args.compact)
    } else if args.list_pcilib_params {
        let params = builder
            .list_pcilib_params()
            .context("listing pcilib parameters")?;
        print_json(&params, args.compact)
    } else if args.raw {
        print!("{}", builder.run_raw().context("running lspci")?);
        Ok(())
    } else {
        let devices = builder.run().context("listing devices")?;
        log::info!("Found {} devices", devices.len());
        print_json(&devices, args.compact)
    }
}
