//! Fan-out of unit work across a pool of workers
//!
//! Two interchangeable strategies implement [`Distributor`]:
//!
//! - [`SharedMemoryPool`] runs units on tokio's blocking pool and collects
//!   outcomes into a mutex-guarded vector.
//! - [`IsolatedPool`] runs each unit in its own worker process and receives the
//!   outcome as a single message over the child's stdout pipe.
//!
//! Both return exactly one [`UnitOutcome`] per submitted path, in no
//! particular order.

pub mod isolated;
pub mod shared;

pub use isolated::{IsolatedPool, WORKER_SUBCOMMAND};
pub use shared::SharedMemoryPool;

use crate::error::{ScanError, UnitError, UnitFailure};
use crate::unit::VolatilityResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::warn;

/// Outcome of one unit of work, tied to the file it processed
#[derive(Debug, Clone, PartialEq)]
pub struct UnitOutcome {
    pub path: PathBuf,
    pub result: Result<VolatilityResult, UnitFailure>,
}

impl UnitOutcome {
    pub fn failed(path: impl Into<PathBuf>, failure: UnitFailure) -> Self {
        Self {
            path: path.into(),
            result: Err(failure),
        }
    }

    pub fn into_result(self) -> Result<VolatilityResult, UnitError> {
        let path = self.path;
        self.result.map_err(|failure| UnitError::new(path, failure))
    }
}

#[async_trait]
pub trait Distributor: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Process every file and return one outcome per file
    async fn distribute(&self, files: Vec<PathBuf>) -> Result<Vec<UnitOutcome>, ScanError>;
}

/// Number of workers to use when none is configured
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|p| p.get())
        .unwrap_or(4)
}

/// Match collected outcomes against the submitted files
///
/// Every submitted path ends up with exactly one outcome: a path the workers
/// never reported on gets a worker failure, and outcomes for paths that were
/// not submitted (or were already reported) are discarded.
pub fn reconcile(submitted: &[PathBuf], outcomes: Vec<UnitOutcome>) -> Vec<UnitOutcome> {
    let mut pending: HashMap<&PathBuf, usize> = HashMap::new();
    for path in submitted {
        *pending.entry(path).or_default() += 1;
    }

    let mut reconciled = Vec::with_capacity(submitted.len());
    for outcome in outcomes {
        match pending.get_mut(&outcome.path) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                reconciled.push(outcome);
            }
            _ => warn!(
                "Discarding unexpected outcome for {}",
                outcome.path.display()
            ),
        }
    }

    for (path, missing) in pending {
        for _ in 0..missing {
            warn!("No result collected for {}", path.display());
            reconciled.push(UnitOutcome::failed(
                path.clone(),
                UnitFailure::worker_crashed("worker produced no result"),
            ));
        }
    }

    reconciled
}
