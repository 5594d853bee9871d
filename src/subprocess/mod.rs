//! Child-process execution used by the isolated worker pool

pub mod error;
pub mod mock;
pub mod runner;


pub use error::ProcessError;
pub use mock::{MockProcessRunner, MockRule};
pub use runner::{ChildProcessRunner, ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner};
