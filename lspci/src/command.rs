use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use log::debug;

use crate::{DeviceFilter, Error, FileKind, Result, SlotFilter};

pub const DEFAULT_PROGRAM: &str = "lspci";

/// How `lspci` prints classes, vendors and devices
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum IdResolveOption {
    /// Names only. Needs a `pci.ids` database.
    NameOnly,
    /// Hexadecimal ids only (`-n`), the one mode that works without `pci.ids`.
    IdOnly,
    /// `Name [id]` (`-nn`)
    #[default]
    Both,
}

impl IdResolveOption {
    pub fn flag(self) -> Option<&'static str> {
        match self {
            Self::NameOnly => None,
            Self::IdOnly => Some("-n"),
            Self::Both => Some("-nn"),
        }
    }

    pub fn from_flags(ids: bool, names: bool) -> Self {
        match (ids, names) {
            (true, true) => Self::Both,
            (true, false) => Self::IdOnly,
            // lspci has no way to print nothing at all
            (false, _) => Self::NameOnly,
        }
    }

    pub fn has_ids(self) -> bool {
        self != Self::NameOnly
    }

    pub fn has_names(self) -> bool {
        self != Self::IdOnly
    }
}

/// Everything `lspci` can be asked to do by this crate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LspciOptions {
    pub program: PathBuf,
    /// `pci.ids` file used to turn ids into names
    pub pciids: Option<PathBuf>,
    /// `pcimap` file linking kernel modules to the ids they support
    pub pcimap: Option<PathBuf>,
    /// Hex dump from `lspci -x` to read instead of the real hardware
    pub file: Option<PathBuf>,
    pub access_method: Option<String>,
    /// Parameters for pcilib's access methods, in insertion order
    pub pcilib_params: Vec<(String, String)>,
    pub verbose: bool,
    pub kernel_drivers: bool,
    pub bridge_paths: bool,
    /// Hide the domain when it is the only one and numbered 0000
    pub hide_single_domain: bool,
    pub id_resolve_option: IdResolveOption,
    pub slot_filter: Option<SlotFilter>,
    pub device_filter: Option<DeviceFilter>,
}

impl Default for LspciOptions {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_PROGRAM),
            pciids: None,
            pcimap: None,
            file: None,
            access_method: None,
            pcilib_params: Vec::new(),
            verbose: false,
            kernel_drivers: false,
            bridge_paths: false,
            hide_single_domain: true,
            id_resolve_option: IdResolveOption::default(),
            slot_filter: None,
            device_filter: None,
        }
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Fails unless `path` is an existing regular file.
pub(crate) fn check_file(kind: FileKind, path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::FileNotFound {
            kind,
            path: path.to_path_buf(),
        })
    }
}

impl LspciOptions {
    /// Sets a pcilib parameter, replacing the value of an existing key in place.
    pub fn set_pcilib_param(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        match self.pcilib_params.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.pcilib_params.push((key, value)),
        }
    }

    /// Checks that every file handed to `lspci` exists.
    pub fn validate(&self) -> Result<()> {
        let files = [
            (FileKind::PciIds, &self.pciids),
            (FileKind::PciMap, &self.pcimap),
            (FileKind::HexDump, &self.file),
        ];
        for (kind, path) in files {
            if let Some(path) = path {
                check_file(kind, path)?;
            }
        }
        Ok(())
    }

    /// The argument list, without the program name.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-mm".into()];
        if self.verbose {
            args.push("-vvv".into());
        }
        if self.kernel_drivers {
            args.push("-k".into());
        }
        if self.bridge_paths {
            args.push("-PP".into());
        }
        if !self.hide_single_domain {
            args.push("-D".into());
        }
        if let Some(method) = &self.access_method {
            args.push(format!("-A{method}").into());
        }
        if let Some(flag) = self.id_resolve_option.flag() {
            args.push(flag.into());
        }

        let files = [("-i", &self.pciids), ("-p", &self.pcimap), ("-F", &self.file)];
        for (flag, path) in files {
            if let Some(path) = path {
                args.push(flag.into());
                args.push(absolute(path).into());
            }
        }

        if let Some(filter) = &self.slot_filter {
            args.push("-s".into());
            args.push(filter.to_string().into());
        }
        if let Some(filter) = &self.device_filter {
            args.push("-d".into());
            args.push(filter.to_string().into());
        }

        for (key, value) in &self.pcilib_params {
            args.push(format!("-O{key}={value}").into());
        }
        args
    }
}

/// Runs a program to completion and returns what it printed
pub trait Executor {
    fn execute(&self, program: &OsStr, args: &[OsString]) -> Result<String>;
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(&self, program: &OsStr, args: &[OsString]) -> Result<String> {
        (**self).execute(program, args)
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn execute(&self, program: &OsStr, args: &[OsString]) -> Result<String> {
        (**self).execute(program, args)
    }
}

/// Spawns real processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn execute(&self, program: &OsStr, args: &[OsString]) -> Result<String> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        cmd.stdin(Stdio::null());

        debug!("Running {cmd:?}");

        let out = cmd.output().map_err(|source| Error::Spawn {
            program: program.to_owned(),
            source,
        })?;
        if !out.status.success() {
            return Err(Error::CommandFailed {
                program: program.to_owned(),
                status: out.status,
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_owned(),
            });
        }
        String::from_utf8(out.stdout).map_err(|source| Error::InvalidUtf8 {
            program: program.to_owned(),
            source,
        })
    }
}

/// Runs `lspci` with `options` after checking that the files it needs exist.
pub fn lspci(options: &LspciOptions, executor: &dyn Executor) -> Result<String> {
    options.validate()?;
    run_unchecked(options, executor)
}

pub(crate) fn run_unchecked(options: &LspciOptions, executor: &dyn Executor) -> Result<String> {
    executor.execute(options.program.as_os_str(), &options.args())
}
