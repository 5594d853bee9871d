//! Scan configuration
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `TICKERVOL_*` environment variables, then command-line flags.

use crate::aggregate::DEFAULT_RANKING_SIZE;
use crate::distributor::default_parallelism;
use crate::error::{ErrorCode, ScanError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub mod loader;

pub use loader::{load_config_file, load_layered, DEFAULT_INPUT_DIR};

pub const ENV_MODE: &str = "TICKERVOL_MODE";
pub const ENV_WORKERS: &str = "TICKERVOL_WORKERS";
pub const ENV_WORKER_TIMEOUT: &str = "TICKERVOL_WORKER_TIMEOUT";
pub const ENV_TOP: &str = "TICKERVOL_TOP";

/// Concurrency substrate used to run units of work
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Worker threads in this process
    #[default]
    Shared,
    /// One worker process per file
    Isolated,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    pub input_dir: PathBuf,
    pub mode: ExecutionMode,
    /// Pool size; `None` means one worker per available CPU
    pub workers: Option<usize>,
    #[serde(with = "humantime_serde")]
    pub worker_timeout: Duration,
    /// How many instruments to show at each end of the ranking
    pub top: usize,
    /// Only files with this extension are scanned
    pub extension: Option<String>,
    pub format: OutputFormat,
    /// Executable started for isolated workers; defaults to the current binary
    pub worker_program: Option<PathBuf>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from(DEFAULT_INPUT_DIR),
            mode: ExecutionMode::default(),
            workers: None,
            worker_timeout: Duration::from_secs(30),
            top: DEFAULT_RANKING_SIZE,
            extension: None,
            format: OutputFormat::default(),
            worker_program: None,
        }
    }
}

/// Values given explicitly on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub input_dir: Option<PathBuf>,
    pub mode: Option<ExecutionMode>,
    pub workers: Option<usize>,
    pub worker_timeout: Option<Duration>,
    pub top: Option<usize>,
    pub extension: Option<String>,
    pub format: Option<OutputFormat>,
}

fn invalid(message: String) -> ScanError {
    ScanError::config_with_code(ErrorCode::CONFIG_INVALID_VALUE, message)
}

impl ScanConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ScanError> {
        toml::from_str(content).map_err(|e| {
            ScanError::config_with_code(ErrorCode::CONFIG_PARSE_ERROR, "invalid TOML configuration")
                .with_source(e)
        })
    }

    /// Apply `TICKERVOL_*` variables from the process environment
    pub fn merge_env_vars(&mut self) -> Result<(), ScanError> {
        self.merge_env_with(|key| std::env::var(key).ok())
    }

    /// Apply `TICKERVOL_*` variables read through `lookup`
    pub fn merge_env_with<F>(&mut self, lookup: F) -> Result<(), ScanError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup(ENV_MODE) {
            self.mode = <ExecutionMode as clap::ValueEnum>::from_str(mode.trim(), true)
                .map_err(|_| invalid(format!("{ENV_MODE}: unknown mode {mode:?}")))?;
        }

        if let Some(workers) = lookup(ENV_WORKERS) {
            let value = workers
                .trim()
                .parse::<usize>()
                .map_err(|e| invalid(format!("{ENV_WORKERS}: {e}")))?;
            self.workers = Some(value);
        }

        if let Some(timeout) = lookup(ENV_WORKER_TIMEOUT) {
            self.worker_timeout = humantime_serde::re::humantime::parse_duration(timeout.trim())
                .map_err(|e| invalid(format!("{ENV_WORKER_TIMEOUT}: {e}")))?;
        }

        if let Some(top) = lookup(ENV_TOP) {
            self.top = top
                .trim()
                .parse::<usize>()
                .map_err(|e| invalid(format!("{ENV_TOP}: {e}")))?;
        }

        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(input_dir) = overrides.input_dir {
            self.input_dir = input_dir;
        }
        if let Some(mode) = overrides.mode {
            self.mode = mode;
        }
        if let Some(workers) = overrides.workers {
            self.workers = Some(workers);
        }
        if let Some(timeout) = overrides.worker_timeout {
            self.worker_timeout = timeout;
        }
        if let Some(top) = overrides.top {
            self.top = top;
        }
        if let Some(extension) = overrides.extension {
            self.extension = Some(extension);
        }
        if let Some(format) = overrides.format {
            self.format = format;
        }
    }

    pub fn validate(&self) -> Result<(), ScanError> {
        if self.workers == Some(0) {
            return Err(invalid("workers must be at least 1".to_string()));
        }
        if self.top == 0 {
            return Err(invalid("top must be at least 1".to_string()));
        }
        if self.worker_timeout.is_zero() {
            return Err(invalid("worker_timeout must be greater than zero".to_string()));
        }
        if let Some(ext) = &self.extension {
            if ext.trim_start_matches('.').is_empty() {
                return Err(invalid("extension must not be empty".to_string()));
            }
        }
        Ok(())
    }

    /// Pool size after applying the default
    pub fn resolved_workers(&self) -> usize {
        self.workers.unwrap_or_else(default_parallelism)
    }
}
