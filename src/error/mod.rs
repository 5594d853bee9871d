use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub mod codes;

pub use codes::{describe_error_code, ErrorCode};

/// Errors that abort the whole scan
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("[E{code:04}] Input directory {path:?} is not accessible: {source}")]
    InputAccess {
        code: u16,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[E{code:04}] Input path {path:?} is not a directory")]
    NotADirectory { code: u16, path: PathBuf },

    #[error("[E{code:04}] Configuration error: {message}")]
    Config {
        code: u16,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("[E{code:04}] Cannot resolve worker executable: {source}")]
    WorkerProgram {
        code: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("[E{code:04}] Work distribution failed: {message}")]
    Distribution { code: u16, message: String },
}

impl ScanError {
    /// Create an input access error, picking the code from the io error kind
    pub fn input_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let code = match source.kind() {
            std::io::ErrorKind::NotFound => ErrorCode::INPUT_NOT_FOUND,
            std::io::ErrorKind::PermissionDenied => ErrorCode::INPUT_PERMISSION_DENIED,
            _ => ErrorCode::INPUT_GENERIC,
        };
        Self::InputAccess {
            code,
            path: path.into(),
            source,
        }
    }

    pub fn not_a_directory(path: impl Into<PathBuf>) -> Self {
        Self::NotADirectory {
            code: ErrorCode::INPUT_NOT_A_DIRECTORY,
            path: path.into(),
        }
    }

    /// Create a configuration error with default code
    pub fn config(message: impl Into<String>) -> Self {
        Self::config_with_code(ErrorCode::CONFIG_GENERIC, message)
    }

    /// Create a configuration error with specific code
    pub fn config_with_code(code: u16, message: impl Into<String>) -> Self {
        Self::Config {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn worker_program(source: std::io::Error) -> Self {
        Self::WorkerProgram {
            code: ErrorCode::EXEC_WORKER_PROGRAM,
            source,
        }
    }

    pub fn distribution(message: impl Into<String>) -> Self {
        Self::Distribution {
            code: ErrorCode::EXEC_QUEUE_CLOSED,
            message: message.into(),
        }
    }

    /// Attach an underlying cause to a configuration error
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        if let Self::Config { source: src, .. } = &mut self {
            *src = Some(source.into());
        }
        self
    }

    pub fn code(&self) -> u16 {
        match self {
            Self::InputAccess { code, .. }
            | Self::NotADirectory { code, .. }
            | Self::Config { code, .. }
            | Self::WorkerProgram { code, .. }
            | Self::Distribution { code, .. } => *code,
        }
    }
}

/// Why a single unit of work did not produce a result
///
/// This is also the payload an isolated worker sends back when it fails, so it
/// stays serializable and carries no live error sources.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitFailure {
    #[error("cannot read file: {message}")]
    Unreadable { message: String },

    #[error("file is empty, header line is missing")]
    MissingHeader,

    #[error("line {line}: expected 4 fields, found {found}")]
    FieldCount { line: u64, found: usize },

    #[error("line {line}: invalid price {value:?}")]
    InvalidPrice { line: u64, value: String },

    #[error("degenerate price range: midpoint of min {min} and max {max} is not positive")]
    Degenerate { min: f64, max: f64 },

    #[error("worker failed: {reason}")]
    WorkerCrashed { reason: String },

    #[error("worker timed out after {after:?}")]
    WorkerTimedOut {
        #[serde(with = "humantime_serde")]
        after: Duration,
    },
}

impl UnitFailure {
    pub fn kind(&self) -> UnitErrorKind {
        match self {
            Self::Unreadable { .. }
            | Self::MissingHeader
            | Self::FieldCount { .. }
            | Self::InvalidPrice { .. } => UnitErrorKind::FileProcessing,
            Self::WorkerCrashed { .. } | Self::WorkerTimedOut { .. } => {
                UnitErrorKind::WorkerFailure
            }
            Self::Degenerate { .. } => UnitErrorKind::DegenerateInput,
        }
    }

    pub fn worker_crashed(reason: impl Into<String>) -> Self {
        Self::WorkerCrashed {
            reason: reason.into(),
        }
    }
}

/// Category of a per-unit error, as reported to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitErrorKind {
    #[serde(rename = "FileProcessingError")]
    FileProcessing,
    #[serde(rename = "WorkerFailureError")]
    WorkerFailure,
    #[serde(rename = "DegenerateInputError")]
    DegenerateInput,
}

impl fmt::Display for UnitErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FileProcessing => "FileProcessingError",
            Self::WorkerFailure => "WorkerFailureError",
            Self::DegenerateInput => "DegenerateInputError",
        };
        f.write_str(name)
    }
}

/// A failed unit of work, bound to the file it was processing
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}: {failure}", .path.display())]
pub struct UnitError {
    pub path: PathBuf,
    pub failure: UnitFailure,
}

impl UnitError {
    pub fn new(path: impl Into<PathBuf>, failure: UnitFailure) -> Self {
        Self {
            path: path.into(),
            failure,
        }
    }

    pub fn kind(&self) -> UnitErrorKind {
        self.failure.kind()
    }
}
