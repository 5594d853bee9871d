//! Shared-memory worker pool
//!
//! A fixed set of worker tasks pulls paths from one queue. Each unit runs on
//! tokio's blocking pool; its outcome is pushed whole into a mutex-guarded
//! results vector. Nothing else is shared between workers.

use super::{reconcile, Distributor, UnitOutcome};
use crate::error::{ScanError, UnitFailure};
use crate::unit;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type WorkQueue = Arc<Mutex<mpsc::Receiver<PathBuf>>>;
type Results = Arc<Mutex<Vec<UnitOutcome>>>;

#[derive(Debug, Clone)]
pub struct SharedMemoryPool {
    workers: usize,
}

impl SharedMemoryPool {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

/// Execute one unit off the async threads; a panic becomes a worker failure
async fn run_unit(path: PathBuf) -> UnitOutcome {
    let task_path = path.clone();
    let result = match tokio::task::spawn_blocking(move || unit::process_file(&task_path)).await
    {
        Ok(result) => result,
        Err(join_err) => {
            warn!("Unit for {} did not complete: {}", path.display(), join_err);
            Err(UnitFailure::worker_crashed(format!(
                "unit did not complete: {join_err}"
            )))
        }
    };
    UnitOutcome { path, result }
}

async fn run_worker(worker_index: usize, work_rx: WorkQueue, results: Results) -> usize {
    let mut processed = 0;
    loop {
        // the queue is fully loaded and closed before workers start, so the
        // lock is only held for an immediate receive
        let next = work_rx.lock().await.recv().await;
        let Some(path) = next else {
            break;
        };

        let outcome = run_unit(path).await;
        results.lock().await.push(outcome);
        processed += 1;
    }
    debug!("Worker {} processed {} file(s)", worker_index, processed);
    processed
}

#[async_trait]
impl Distributor for SharedMemoryPool {
    fn name(&self) -> &'static str {
        "shared"
    }

    async fn distribute(&self, files: Vec<PathBuf>) -> Result<Vec<UnitOutcome>, ScanError> {
        let total = files.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let workers = self.workers.min(total);
        info!(
            "Distributing {} file(s) across {} shared-memory worker(s)",
            total, workers
        );

        let (work_tx, work_rx) = mpsc::channel::<PathBuf>(total);
        for path in &files {
            work_tx.send(path.clone()).await.map_err(|e| {
                ScanError::distribution(format!("Failed to send work item to queue: {e}"))
            })?;
        }
        drop(work_tx);

        let work_rx: WorkQueue = Arc::new(Mutex::new(work_rx));
        let results: Results = Arc::new(Mutex::new(Vec::with_capacity(total)));

        let handles: Vec<JoinHandle<usize>> = (0..workers)
            .map(|index| tokio::spawn(run_worker(index, work_rx.clone(), results.clone())))
            .collect();

        for handle in handles {
            if let Err(join_err) = handle.await {
                warn!("Shared-memory worker task failed: {}", join_err);
            }
        }

        let collected = std::mem::take(&mut *results.lock().await);
        Ok(reconcile(&files, collected))
    }
}
