//! One complete scan: list the input directory, fan the files out, fold and rank

use crate::aggregate::{AggregateState, Ranking};
use crate::config::{ExecutionMode, ScanConfig};
use crate::distributor::{Distributor, IsolatedPool, SharedMemoryPool};
use crate::error::{ScanError, UnitError};
use crate::timing::{timed, timed_sync};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Everything a scan produced
#[derive(Debug, Clone, PartialEq)]
pub struct ScanSummary {
    pub state: AggregateState,
    pub ranking: Ranking,
    pub failures: Vec<UnitError>,
    /// Number of files submitted
    pub files: usize,
}

impl ScanSummary {
    pub fn duplicates(&self) -> &[String] {
        self.state.duplicates()
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

fn matches_extension(path: &Path, extension: Option<&str>) -> bool {
    let Some(wanted) = extension else {
        return true;
    };
    let wanted = wanted.trim_start_matches('.');
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(wanted))
        .unwrap_or(false)
}

/// List the regular files directly inside `dir`, sorted by path
pub fn list_input_files(dir: &Path, extension: Option<&str>) -> Result<Vec<PathBuf>, ScanError> {
    let metadata = std::fs::metadata(dir).map_err(|e| ScanError::input_access(dir, e))?;
    if !metadata.is_dir() {
        return Err(ScanError::not_a_directory(dir));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("directory walk failed"));
            ScanError::input_access(path, source)
        })?;

        if !entry.file_type().is_file() || is_hidden(entry.file_name()) {
            continue;
        }
        if !matches_extension(entry.path(), extension) {
            debug!("Skipping {} (extension filter)", entry.path().display());
            continue;
        }
        files.push(entry.into_path());
    }

    files.sort();
    Ok(files)
}

/// Pick the pool implementation for the configured mode
pub fn build_distributor(config: &ScanConfig) -> Result<Box<dyn Distributor>, ScanError> {
    let workers = config.resolved_workers();
    match config.mode {
        ExecutionMode::Shared => Ok(Box::new(SharedMemoryPool::new(workers))),
        ExecutionMode::Isolated => {
            let program = match &config.worker_program {
                Some(program) => program.clone(),
                None => std::env::current_exe().map_err(ScanError::worker_program)?,
            };
            Ok(Box::new(IsolatedPool::production(
                program,
                workers,
                config.worker_timeout,
            )))
        }
    }
}

/// Run a full scan with the given configuration
pub async fn run(config: &ScanConfig) -> Result<ScanSummary, ScanError> {
    config.validate()?;
    let files = list_input_files(&config.input_dir, config.extension.as_deref())?;
    let distributor = build_distributor(config)?;
    run_with(distributor.as_ref(), files, config.top).await
}

/// Run a scan over an explicit file list with any distributor
pub async fn run_with(
    distributor: &dyn Distributor,
    files: Vec<PathBuf>,
    top: usize,
) -> Result<ScanSummary, ScanError> {
    let total = files.len();
    info!(
        "Scanning {} file(s) in {} mode",
        total,
        distributor.name()
    );

    let mut outcomes = timed("distribute", distributor.distribute(files)).await?;
    // fold in path order so a repeated instrument id resolves the same way
    // whatever order the workers finished in
    outcomes.sort_by(|a, b| a.path.cmp(&b.path));

    let mut results = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome.into_result() {
            Ok(result) => results.push(result),
            Err(err) => {
                warn!("{} ({})", err, err.kind());
                failures.push(err);
            }
        }
    }

    let state = timed_sync("aggregate", || AggregateState::fold(results));
    let ranking = state.ranking(top);

    info!(
        "Processed {} file(s): {} ranked, {} failed",
        total,
        state.len(),
        failures.len()
    );

    Ok(ScanSummary {
        state,
        ranking,
        failures,
        files: total,
    })
}
