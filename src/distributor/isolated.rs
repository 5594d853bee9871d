//! Isolated-memory worker pool
//!
//! Every unit runs in a separate worker process (`<program> worker <path>`).
//! The worker writes one JSON [`WorkerMessage`] line to its stdout pipe and
//! exits. The coordinator keeps only the read ends of the child's pipes,
//! reads the message to EOF, then reaps the child. A semaphore bounds how many
//! workers run at once and every worker runs under a timeout.

use super::{reconcile, Distributor, UnitOutcome};
use crate::error::{ScanError, UnitFailure};
use crate::subprocess::{
    ChildProcessRunner, ProcessCommand, ProcessError, ProcessOutput, ProcessRunner,
};
use crate::unit::{VolatilityResult, WorkerMessage};
use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Hidden CLI subcommand that runs a single unit and reports on stdout
pub const WORKER_SUBCOMMAND: &str = "worker";

pub struct IsolatedPool {
    runner: Arc<dyn ProcessRunner>,
    program: PathBuf,
    max_workers: usize,
    timeout: Duration,
}

impl IsolatedPool {
    pub fn new(
        runner: Arc<dyn ProcessRunner>,
        program: impl Into<PathBuf>,
        max_workers: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            program: program.into(),
            max_workers: max_workers.max(1),
            timeout,
        }
    }

    /// Pool backed by real child processes
    pub fn production(program: impl Into<PathBuf>, max_workers: usize, timeout: Duration) -> Self {
        Self::new(Arc::new(ChildProcessRunner), program, max_workers, timeout)
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    fn worker_command(&self, path: &Path) -> ProcessCommand {
        ProcessCommand::new(&self.program)
            .arg(WORKER_SUBCOMMAND)
            .arg(path)
            .timeout(self.timeout)
    }
}

/// Interpret what a finished worker left on its pipes
///
/// Exactly one message line is expected. A worker that exits without one
/// (crash, kill, early exit) is a worker failure, never a silent omission.
pub fn decode_output(output: &ProcessOutput) -> Result<VolatilityResult, UnitFailure> {
    let mut lines = output.stdout.lines().filter(|line| !line.trim().is_empty());

    let Some(line) = lines.next() else {
        return Err(UnitFailure::worker_crashed(format!(
            "worker exited with {} without sending a result{}",
            output.status,
            stderr_hint(&output.stderr)
        )));
    };
    if lines.next().is_some() {
        return Err(UnitFailure::worker_crashed(
            "worker sent more than one message",
        ));
    }

    let message: WorkerMessage = serde_json::from_str(line).map_err(|e| {
        UnitFailure::worker_crashed(format!("undecodable worker message: {e}"))
    })?;

    if !output.status.success() {
        warn!(
            "Worker exited with {} after sending its result; keeping the result",
            output.status
        );
    }

    message.into_result()
}

fn stderr_hint(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| format!(" ({line})"))
        .unwrap_or_default()
}

async fn run_unit(
    runner: Arc<dyn ProcessRunner>,
    command: ProcessCommand,
    path: PathBuf,
) -> UnitOutcome {
    let result = match runner.run(command).await {
        Ok(output) => {
            debug!(
                "Worker for {} finished in {:?}",
                path.display(),
                output.duration
            );
            decode_output(&output)
        }
        Err(ProcessError::TimedOut(after)) => {
            warn!("Worker for {} timed out after {:?}", path.display(), after);
            Err(UnitFailure::WorkerTimedOut { after })
        }
        Err(e) => Err(UnitFailure::worker_crashed(format!(
            "failed to run worker: {e}"
        ))),
    };
    UnitOutcome { path, result }
}

#[async_trait]
impl Distributor for IsolatedPool {
    fn name(&self) -> &'static str {
        "isolated"
    }

    async fn distribute(&self, files: Vec<PathBuf>) -> Result<Vec<UnitOutcome>, ScanError> {
        let total = files.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        info!(
            "Distributing {} file(s) across up to {} worker process(es)",
            total,
            self.max_workers.min(total)
        );

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let mut pending = FuturesUnordered::new();

        for path in &files {
            let permit = semaphore.clone().acquire_owned().await.map_err(|e| {
                ScanError::distribution(format!("Failed to acquire worker slot: {e}"))
            })?;
            let runner = self.runner.clone();
            let command = self.worker_command(path);
            let path = path.clone();

            pending.push(tokio::spawn(async move {
                let outcome = run_unit(runner, command, path).await;
                drop(permit);
                outcome
            }));
        }

        let mut outcomes = Vec::with_capacity(total);
        while let Some(joined) = pending.next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(join_err) => warn!("Worker coordinator task failed: {}", join_err),
            }
        }

        Ok(reconcile(&files, outcomes))
    }
}
