use async_trait::async_trait;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::Child;
use tracing::{debug, trace, warn};

use super::error::ProcessError;

/// A program invocation with an optional wall-clock limit
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub env: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl ProcessCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Last argument interpreted as a path, if any
    pub fn last_arg_path(&self) -> Option<&Path> {
        self.args.last().map(Path::new)
    }
}

impl fmt::Display for ProcessCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// How a child process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Code(i32),
    Signal(i32),
}

impl ExitStatus {
    pub fn success(&self) -> bool {
        *self == ExitStatus::Code(0)
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            ExitStatus::Code(code) => Some(*code),
            ExitStatus::Signal(_) => None,
        }
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return ExitStatus::Code(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt;
            if let Some(signal) = status.signal() {
                return ExitStatus::Signal(signal);
            }
        }
        ExitStatus::Code(-1)
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitStatus::Code(code) => write!(f, "exit code {code}"),
            ExitStatus::Signal(signal) => write!(f, "signal {signal}"),
        }
    }
}

/// Everything a finished child left behind
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError>;
}

/// Runs commands as real child processes
///
/// The child's stdin is `/dev/null`; its stdout and stderr are pipes whose
/// write ends live only in the child. Both pipes are drained to EOF before the
/// child is reaped. A child still running at its timeout is killed and reaped.
pub struct ChildProcessRunner;

fn spawn(command: &ProcessCommand) -> Result<Child, ProcessError> {
    tokio::process::Command::new(&command.program)
        .args(&command.args)
        .envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| match source.kind() {
            std::io::ErrorKind::NotFound => ProcessError::NotFound(command.program.clone()),
            _ => ProcessError::Spawn {
                program: command.program.clone(),
                source,
            },
        })
}

fn missing_pipe(name: &str) -> ProcessError {
    ProcessError::Collect(std::io::Error::other(format!("{name} was not captured")))
}

/// Drain both pipes to EOF, then reap the child
async fn collect(
    child: &mut Child,
) -> Result<(std::process::ExitStatus, Vec<u8>, Vec<u8>), ProcessError> {
    let mut stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
    let mut stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

    let mut out = Vec::new();
    let mut err = Vec::new();
    let (read_out, read_err) =
        tokio::join!(stdout.read_to_end(&mut out), stderr.read_to_end(&mut err));
    read_out.map_err(ProcessError::Collect)?;
    read_err.map_err(ProcessError::Collect)?;

    let status = child.wait().await.map_err(ProcessError::Collect)?;
    Ok((status, out, err))
}

async fn terminate(child: &mut Child, command: &ProcessCommand) {
    if let Err(e) = child.start_kill() {
        debug!("Could not kill {}: {}", command, e);
    }
    if let Err(e) = child.wait().await {
        warn!("Could not reap {}: {}", command, e);
    }
}

#[async_trait]
impl ProcessRunner for ChildProcessRunner {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        let started = Instant::now();
        trace!("Spawning {}", command);

        let mut child = spawn(&command)?;
        let collected = match command.timeout {
            Some(limit) => {
                let waited = tokio::time::timeout(limit, collect(&mut child)).await;
                match waited {
                    Ok(collected) => collected,
                    Err(_) => {
                        terminate(&mut child, &command).await;
                        return Err(ProcessError::TimedOut(limit));
                    }
                }
            }
            None => collect(&mut child).await,
        };
        let (status, stdout, stderr) = collected?;

        let output = ProcessOutput {
            status: status.into(),
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            duration: started.elapsed(),
        };

        match output.status {
            ExitStatus::Code(0) => trace!("{} finished in {:?}", command, output.duration),
            ExitStatus::Code(code) => debug!("{} exited with code {}", command, code),
            ExitStatus::Signal(signal) => warn!("{} terminated by signal {}", command, signal),
        }

        Ok(output)
    }
}
