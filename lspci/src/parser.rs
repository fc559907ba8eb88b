use core::fmt::Debug;

use crate::{Device, Executor, LspciOptions, Result, command::run_unchecked};

mod simple;
mod verbose;

pub use simple::SimpleParser;
pub use verbose::VerboseParser;

/// Turns the output of `lspci` into devices
pub trait Parser: Debug {
    fn parse(&self, data: &str) -> Result<Vec<Device>>;

    /// Options `lspci` has to be called with for its output to be parsable
    fn default_options(&self) -> LspciOptions {
        LspciOptions::default()
    }

    fn run(&self, executor: &dyn Executor) -> Result<Vec<Device>> {
        self.run_with(&self.default_options(), executor)
    }

    fn run_with(&self, options: &LspciOptions, executor: &dyn Executor) -> Result<Vec<Device>> {
        options.validate()?;
        self.parse(&run_unchecked(options, executor)?)
    }
}

/// The parser matching the format `lspci` prints with `options`
pub fn default_parser(options: &LspciOptions) -> Box<dyn Parser> {
    if options.verbose {
        Box::new(VerboseParser)
    } else {
        Box::new(SimpleParser)
    }
}
