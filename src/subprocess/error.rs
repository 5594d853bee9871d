use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("executable not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to start {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("process did not finish within {0:?}")]
    TimedOut(Duration),

    #[error("failed to collect process output: {0}")]
    Collect(#[source] std::io::Error),

    /// Only produced by [`super::MockProcessRunner`]
    #[error("unexpected invocation: {0}")]
    Unexpected(String),
}
