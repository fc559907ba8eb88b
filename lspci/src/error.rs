use std::{ffi::OsString, path::PathBuf, process::ExitStatus};

use thiserror::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to start {program:?}")]
    Spawn {
        program: OsString,
        #[source]
        source: std::io::Error,
    },
    #[error("{program:?} exited with {status}: {stderr}")]
    CommandFailed {
        program: OsString,
        status: ExitStatus,
        stderr: String,
    },
    #[error("{program:?} printed invalid UTF-8")]
    InvalidUtf8 {
        program: OsString,
        #[source]
        source: std::string::FromUtf8Error,
    },
    #[error("{kind} file not found: {}", .path.display())]
    FileNotFound { kind: FileKind, path: PathBuf },
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("invalid slot {0:?}")]
    InvalidSlot(String),
    #[error("invalid filter {value:?}: {reason}")]
    InvalidFilter { value: String, reason: &'static str },
}

impl Error {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }
}

/// Which of the files handed to `lspci` was missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    PciIds,
    PciMap,
    HexDump,
}

impl core::fmt::Display for FileKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::PciIds => "ID database",
            Self::PciMap => "kernel module mapping",
            Self::HexDump => "hex dump",
        })
    }
}
