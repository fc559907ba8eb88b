use core::fmt;
use std::path::PathBuf;

use crate::{
    Device, DeviceFilter, Executor, FileKind, IdResolveOption, LspciOptions, Parser,
    PcilibParameter, Result, SlotFilter, SystemExecutor,
    command::{check_file, run_unchecked},
    parser::default_parser,
    pcilib,
};

/// Fluent configuration of an `lspci` call.
///
/// ```no_run
/// use lspci::CommandBuilder;
///
/// let devices = CommandBuilder::new()
///     .include_kernel_drivers(true)
///     .device_filter_str("8086:")?
///     .run()?;
/// # Ok::<(), lspci::Error>(())
/// ```
pub struct CommandBuilder {
    options: LspciOptions,
    // lspci cannot hide both, so the wanted pair is kept apart from the option
    ids: bool,
    names: bool,
    parser: Option<Box<dyn Parser>>,
    executor: Box<dyn Executor>,
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CommandBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuilder")
            .field("options", &self.options)
            .field("parser", &self.parser)
            .finish_non_exhaustive()
    }
}

impl CommandBuilder {
    pub fn new() -> Self {
        Self::from_options(LspciOptions::default())
    }

    pub fn from_options(options: LspciOptions) -> Self {
        Self {
            ids: options.id_resolve_option.has_ids(),
            names: options.id_resolve_option.has_names(),
            options,
            parser: None,
            executor: Box::new(SystemExecutor),
        }
    }

    pub fn options(&self) -> &LspciOptions {
        &self.options
    }

    fn checked(kind: FileKind, path: PathBuf, check: bool) -> Result<PathBuf> {
        if check {
            check_file(kind, &path)?;
        }
        Ok(path)
    }

    /// Resolves ids with this `pci.ids` file. With `check`, the file has to exist now.
    pub fn use_pciids(mut self, path: impl Into<PathBuf>, check: bool) -> Result<Self> {
        self.options.pciids = Some(Self::checked(FileKind::PciIds, path.into(), check)?);
        Ok(self)
    }

    /// Looks kernel modules up in this `pcimap` file. With `check`, the file has to exist now.
    pub fn use_pcimap(mut self, path: impl Into<PathBuf>, check: bool) -> Result<Self> {
        self.options.pcimap = Some(Self::checked(FileKind::PciMap, path.into(), check)?);
        Ok(self)
    }

    /// Reads devices from an `lspci -x` hex dump instead of the hardware.
    pub fn from_file(mut self, path: impl Into<PathBuf>, check: bool) -> Result<Self> {
        self.options.file = Some(Self::checked(FileKind::HexDump, path.into(), check)?);
        Ok(self)
    }

    pub fn use_access_method(mut self, method: impl Into<String>) -> Self {
        self.options.access_method = Some(method.into());
        self
    }

    /// Adds pcilib parameters. Keys set earlier are overridden.
    pub fn with_pcilib_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToString,
    {
        for (key, value) in params {
            self.options.set_pcilib_param(key, value);
        }
        self
    }

    /// Verbose output has a different format, see [`crate::VerboseParser`].
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.options.verbose = verbose;
        self
    }

    /// Drivers and modules only show up in verbose output, so this turns it on.
    pub fn include_kernel_drivers(mut self, include: bool) -> Self {
        self.options.kernel_drivers = include;
        if include {
            self.options.verbose = true;
        }
        self
    }

    pub fn include_bridge_paths(mut self, include: bool) -> Self {
        self.options.bridge_paths = include;
        self
    }

    pub fn hide_single_domain(mut self, hide: bool) -> Self {
        self.options.hide_single_domain = hide;
        self
    }

    pub fn with_ids(mut self, ids: bool) -> Self {
        self.ids = ids;
        self.options.id_resolve_option = IdResolveOption::from_flags(self.ids, self.names);
        self
    }

    pub fn with_names(mut self, names: bool) -> Self {
        self.names = names;
        self.options.id_resolve_option = IdResolveOption::from_flags(self.ids, self.names);
        self
    }

    pub fn slot_filter(mut self, filter: SlotFilter) -> Result<Self> {
        self.options.slot_filter = Some(filter.validate()?);
        Ok(self)
    }

    pub fn slot_filter_str(self, filter: &str) -> Result<Self> {
        self.slot_filter(filter.parse()?)
    }

    pub fn device_filter(mut self, filter: DeviceFilter) -> Self {
        self.options.device_filter = Some(filter);
        self
    }

    pub fn device_filter_str(self, filter: &str) -> Result<Self> {
        Ok(self.device_filter(filter.parse()?))
    }

    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.options.program = program.into();
        self
    }

    pub fn with_executor(mut self, executor: impl Executor + 'static) -> Self {
        self.executor = Box::new(executor);
        self
    }

    pub fn with_parser(mut self, parser: impl Parser + 'static) -> Self {
        self.parser = Some(Box::new(parser));
        self
    }

    /// Picks the parser matching the output format of the current options.
    pub fn with_default_parser(mut self) -> Self {
        self.parser = Some(default_parser(&self.options));
        self
    }

    /// Runs `lspci` and returns its output untouched.
    pub fn run_raw(&self) -> Result<String> {
        run_unchecked(&self.options, &self.executor)
    }

    /// Runs `lspci` and parses its output, with the parser set on this
    /// builder or else the one matching the options.
    pub fn run(&self) -> Result<Vec<Device>> {
        let output = self.run_raw()?;
        match &self.parser {
            Some(parser) => parser.parse(&output),
            None => default_parser(&self.options).parse(&output),
        }
    }

    pub fn list_access_methods(&self) -> Result<Vec<String>> {
        pcilib::list_access_methods(&self.options, &self.executor)
    }

    pub fn list_pcilib_params(&self) -> Result<Vec<PcilibParameter>> {
        pcilib::list_pcilib_params(&self.options, &self.executor)
    }

    pub fn list_pcilib_params_raw(&self) -> Result<Vec<String>> {
        pcilib::list_pcilib_params_raw(&self.options, &self.executor)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::CommandBuilder;
    use crate::{
        Device, Error, FileKind, IdResolveOption, LspciOptions, Parser, Result, SlotFilter,
        VerboseParser,
        testing::FakeExecutor,
    };

    const EXISTING_FILE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml");

    const SIMPLE_LINE: &str = r#"00:1c.3 "PCI bridge [0604]" "Intel Corporation [8086]" "82801 PCI Bridge [244e]" -rd5 "" """#;

    fn run_args(builder: CommandBuilder) -> Vec<String> {
        let executor = FakeExecutor::new("");
        builder.with_executor(executor.clone()).run_raw().unwrap();
        executor.single_call_args()
    }

    #[test]
    fn default() {
        assert_eq!(run_args(CommandBuilder::new()), ["-mm", "-nn"]);
    }

    #[test]
    fn use_pciids() {
        let builder = CommandBuilder::new().use_pciids(EXISTING_FILE, true).unwrap();
        assert_eq!(builder.options().pciids, Some(PathBuf::from(EXISTING_FILE)));
        assert_eq!(run_args(builder), ["-mm", "-nn", "-i", EXISTING_FILE]);
    }

    #[test]
    fn missing_files_are_checked() {
        let err = CommandBuilder::new()
            .use_pciids("/nowhere/pci.ids", true)
            .unwrap_err();
        assert!(matches!(err, Error::FileNotFound { kind: FileKind::PciIds, .. }));
        assert!(err.to_string().contains("not found"));

        assert!(CommandBuilder::new().use_pcimap("/nowhere/pcimap", true).is_err());
        assert!(CommandBuilder::new().from_file("/nowhere/dump", true).is_err());
    }

    #[test]
    fn unchecked_files() {
        let builder = CommandBuilder::new()
            .use_pcimap("/nowhere/pcimap", false)
            .unwrap()
            .from_file("/nowhere/dump", false)
            .unwrap();
        assert_eq!(
            run_args(builder),
            ["-mm", "-nn", "-p", "/nowhere/pcimap", "-F", "/nowhere/dump"]
        );
    }

    #[test]
    fn last_access_method_wins() {
        let builder = CommandBuilder::new()
            .use_access_method("one")
            .use_access_method("two");
        assert_eq!(run_args(builder), ["-mm", "-Atwo", "-nn"]);
    }

    #[test]
    fn pcilib_params_merge() {
        let builder = CommandBuilder::new()
            .with_pcilib_params([("a", "1"), ("b", "2")])
            .with_pcilib_params([("b", "3"), ("c", "4")]);
        assert_eq!(run_args(builder), ["-mm", "-nn", "-Oa=1", "-Ob=3", "-Oc=4"]);
    }

    #[test]
    fn kernel_drivers_imply_verbose() {
        let builder = CommandBuilder::new()
            .include_kernel_drivers(false)
            .include_kernel_drivers(true);
        assert!(builder.options().verbose);
        assert_eq!(run_args(builder), ["-mm", "-vvv", "-k", "-nn"]);
    }

    #[test]
    fn bridge_paths_and_domains() {
        let builder = CommandBuilder::new()
            .include_bridge_paths(false)
            .include_bridge_paths(true)
            .hide_single_domain(false);
        assert_eq!(run_args(builder), ["-mm", "-PP", "-D", "-nn"]);
    }

    #[test]
    fn ids_and_names() {
        let builder = CommandBuilder::new().with_ids(false);
        assert_eq!(builder.options().id_resolve_option, IdResolveOption::NameOnly);
        let builder = builder.with_ids(true);
        assert_eq!(builder.options().id_resolve_option, IdResolveOption::Both);
        let builder = builder.with_names(false);
        assert_eq!(builder.options().id_resolve_option, IdResolveOption::IdOnly);
        let builder = builder.with_names(true);
        assert_eq!(builder.options().id_resolve_option, IdResolveOption::Both);
    }

    #[test]
    fn ids_and_names_remember_both_flags() {
        let builder = CommandBuilder::new().with_ids(false).with_names(false);
        assert_eq!(builder.options().id_resolve_option, IdResolveOption::NameOnly);
        let builder = builder.with_ids(true);
        assert_eq!(builder.options().id_resolve_option, IdResolveOption::IdOnly);

        let builder = CommandBuilder::from_options(LspciOptions {
            id_resolve_option: IdResolveOption::IdOnly,
            ..Default::default()
        })
        .with_ids(true);
        assert_eq!(builder.options().id_resolve_option, IdResolveOption::IdOnly);
    }

    #[test]
    fn filters() {
        let builder = CommandBuilder::new()
            .slot_filter_str("00:1c")
            .unwrap()
            .device_filter_str("8086::0604")
            .unwrap();
        assert_eq!(
            run_args(builder),
            ["-mm", "-nn", "-s", ":0:1c.", "-d", "8086::604"]
        );

        let out_of_range = SlotFilter {
            function: Some(9),
            ..Default::default()
        };
        assert!(CommandBuilder::new().slot_filter(out_of_range).is_err());
        assert!(CommandBuilder::new().device_filter_str("8086").is_err());
    }

    #[test]
    fn default_parser_follows_verbosity() {
        let executor = FakeExecutor::new(SIMPLE_LINE);
        let devices = CommandBuilder::new()
            .with_executor(executor)
            .with_default_parser()
            .run()
            .unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].revision(), Some(0xd5));

        let verbose = CommandBuilder::new().verbose(true).with_default_parser();
        assert!(format!("{verbose:?}").contains("VerboseParser"));
        assert!(format!("{:?}", CommandBuilder::new()).contains("parser: None"));
    }

    #[test]
    fn verbose_output_is_parsed_without_explicit_parser() {
        let executor = FakeExecutor::new("Slot:\t00:02.0\nClass:\t0300\nVendor:\t8086\nDevice:\t5917\nDriver:\ti915\n");
        let devices = CommandBuilder::new()
            .include_kernel_drivers(true)
            .with_executor(executor)
            .run()
            .unwrap();
        assert_eq!(devices[0].driver(), Some("i915"));
    }

    #[derive(Debug)]
    struct RenamingParser;

    impl Parser for RenamingParser {
        fn parse(&self, data: &str) -> Result<Vec<Device>> {
            VerboseParser.parse(&data.replace("Dev:", "Device:"))
        }
    }

    #[test]
    fn custom_parser() {
        let executor = FakeExecutor::new("Slot:\t00:02.0\nClass:\t0300\nVendor:\t8086\nDev:\t5917\n");
        let devices = CommandBuilder::new()
            .with_parser(RenamingParser)
            .with_executor(executor)
            .run()
            .unwrap();
        assert_eq!(devices[0].device().id, Some(0x5917));
    }

    #[test]
    fn listings_use_the_configured_program() {
        let executor = FakeExecutor::new("Known PCI access methods:\nlinux-sysfs\n");
        let methods = CommandBuilder::new()
            .with_program("/opt/pciutils/lspci")
            .with_executor(executor.clone())
            .list_access_methods()
            .unwrap();
        assert_eq!(methods, ["linux-sysfs"]);
        assert_eq!(executor.calls()[0].0, "/opt/pciutils/lspci");
    }
}
