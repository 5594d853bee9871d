//! Scripted process runner for tests
//!
//! Rules are checked in registration order; the first rule whose matcher
//! accepts the command and still has uses left produces the reply.

use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::error::ProcessError;
use super::runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner};

type Matcher = Box<dyn Fn(&ProcessCommand) -> bool + Send + Sync>;

enum Reply {
    Exit(ProcessOutput),
    TimedOut,
    NotFound,
}

struct Rule {
    matcher: Matcher,
    reply: Reply,
    remaining: Option<usize>,
}

#[derive(Clone, Default)]
pub struct MockProcessRunner {
    rules: Arc<Mutex<Vec<Rule>>>,
    calls: Arc<Mutex<Vec<ProcessCommand>>>,
}

/// A rule being configured; registered by one of the reply methods
pub struct MockRule<'a> {
    runner: &'a MockProcessRunner,
    matcher: Matcher,
    remaining: Option<usize>,
    stderr: String,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply to commands accepted by `matcher`
    pub fn when<F>(&self, matcher: F) -> MockRule<'_>
    where
        F: Fn(&ProcessCommand) -> bool + Send + Sync + 'static,
    {
        MockRule {
            runner: self,
            matcher: Box::new(matcher),
            remaining: None,
            stderr: String::new(),
        }
    }

    /// Reply to commands whose last argument is a path ending in `file_name`
    pub fn when_file(&self, file_name: &'static str) -> MockRule<'_> {
        self.when(move |command| {
            command
                .last_arg_path()
                .is_some_and(|path| path.ends_with(file_name))
        })
    }

    /// Every command run so far, in call order
    pub fn calls(&self) -> Vec<ProcessCommand> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

impl MockRule<'_> {
    /// Match at most `n` calls
    pub fn times(mut self, n: usize) -> Self {
        self.remaining = Some(n);
        self
    }

    pub fn with_stderr(mut self, stderr: &str) -> Self {
        self.stderr = stderr.to_string();
        self
    }

    pub fn exits(self, status: ExitStatus, stdout: &str) {
        let output = ProcessOutput {
            status,
            stdout: stdout.to_string(),
            stderr: self.stderr.clone(),
            duration: Duration::from_millis(1),
        };
        self.register(Reply::Exit(output));
    }

    pub fn prints(self, stdout: &str) {
        self.exits(ExitStatus::Code(0), stdout);
    }

    pub fn killed_by(self, signal: i32) {
        self.exits(ExitStatus::Signal(signal), "");
    }

    /// Fail with the command's own timeout
    pub fn hangs(self) {
        self.register(Reply::TimedOut);
    }

    pub fn not_found(self) {
        self.register(Reply::NotFound);
    }

    fn register(self, reply: Reply) {
        lock(&self.runner.rules).push(Rule {
            matcher: self.matcher,
            reply,
            remaining: self.remaining,
        });
    }
}

#[async_trait]
impl ProcessRunner for MockProcessRunner {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        lock(&self.calls).push(command.clone());

        let mut rules = lock(&self.rules);
        let rule = rules
            .iter_mut()
            .find(|rule| rule.remaining != Some(0) && (rule.matcher)(&command))
            .ok_or_else(|| ProcessError::Unexpected(command.to_string()))?;

        if let Some(remaining) = rule.remaining.as_mut() {
            *remaining -= 1;
        }

        match &rule.reply {
            Reply::Exit(output) => Ok(output.clone()),
            Reply::TimedOut => Err(ProcessError::TimedOut(command.timeout.unwrap_or_default())),
            Reply::NotFound => Err(ProcessError::NotFound(command.program.clone())),
        }
    }
}
