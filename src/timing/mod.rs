//! Scoped timing for top-level operations
//!
//! A `ScopedTimer` records its start on creation and logs the elapsed time
//! when dropped, so early returns and `?` are measured too.

use std::future::Future;
use std::time::{Duration, Instant};
use tracing::info;

/// Logs how long a scope took when it goes out of scope
#[derive(Debug)]
pub struct ScopedTimer {
    label: String,
    start: Instant,
}

impl ScopedTimer {
    pub fn start(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            start: Instant::now(),
        }
    }

    /// Time elapsed so far, without stopping the timer
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Drop for ScopedTimer {
    fn drop(&mut self) {
        info!(
            "{} finished in {:.3}s",
            self.label,
            self.start.elapsed().as_secs_f64()
        );
    }
}

/// Run a future and log its duration under `label`
pub async fn timed<F, T>(label: &str, future: F) -> T
where
    F: Future<Output = T>,
{
    let _timer = ScopedTimer::start(label);
    future.await
}

/// Run a closure and log its duration under `label`
pub fn timed_sync<F, T>(label: &str, f: F) -> T
where
    F: FnOnce() -> T,
{
    let _timer = ScopedTimer::start(label);
    f()
}
