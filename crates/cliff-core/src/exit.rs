//! The exit funnel.
//!
//! Every invocation ends here exactly once: the outcome is classified, its
//! output written, and the resolved code handed to a [`Terminator`]. Tests
//! inject a [`RecordingTerminator`] instead of ending the process.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use crate::errors::{classify, ClassifyOptions, Failure};
use crate::help::HelpRenderer;
use crate::streams::Streams;

/// Ends the invocation with an exit code.
pub trait Terminator: Send + Sync + fmt::Debug {
    fn terminate(&self, code: i32);
}

/// Calls [`std::process::exit`]. Never returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessTerminator;

impl Terminator for ProcessTerminator {
    fn terminate(&self, code: i32) {
        std::process::exit(code);
    }
}

/// Records codes instead of exiting.
#[derive(Debug, Default)]
pub struct RecordingTerminator {
    codes: Mutex<Vec<i32>>,
}

impl RecordingTerminator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn codes(&self) -> Vec<i32> {
        self.codes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<i32> {
        self.codes().last().copied()
    }
}

impl Terminator for RecordingTerminator {
    fn terminate(&self, code: i32) {
        self.codes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(code);
    }
}

#[derive(Debug, Clone)]
pub struct ExitFunnel {
    streams: Streams,
    terminator: Arc<dyn Terminator>,
    help: Arc<dyn HelpRenderer>,
    options: ClassifyOptions,
    error_log: Option<PathBuf>,
}

impl ExitFunnel {
    pub fn new(
        streams: Streams,
        terminator: Arc<dyn Terminator>,
        help: Arc<dyn HelpRenderer>,
        options: ClassifyOptions,
    ) -> Self {
        Self {
            streams,
            terminator,
            help,
            options,
            error_log: None,
        }
    }

    #[must_use]
    pub fn with_error_log(mut self, path: Option<PathBuf>) -> Self {
        self.error_log = path;
        self
    }

    /// Report the outcome and terminate. Returns the code for callers whose
    /// terminator does return.
    pub fn handle(&self, outcome: Result<(), Failure>) -> i32 {
        let code = match outcome {
            Ok(()) => 0,
            Err(failure) => self.report(&failure),
        };
        tracing::debug!(code, "Terminating");
        self.terminator.terminate(code);
        code
    }

    /// Write a failure's output and return its exit code, without terminating.
    pub fn report(&self, failure: &Failure) -> i32 {
        let classified = classify(failure, &self.options);
        tracing::debug!(kind = %classified.kind, exit_code = classified.exit_code, "Classified failure");

        if let Some(request) = &classified.help {
            self.streams
                .write_stderr(&self.help.render_command(&request.command, &request.sections));
        }
        if let Some(message) = &classified.message {
            self.streams.write_stderr(message);
        }
        if let Some(line) = &classified.log {
            self.append_log(line);
        }

        classified.exit_code
    }

    fn append_log(&self, line: &str) {
        let Some(path) = &self.error_log else {
            return;
        };
        let written = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut file| {
                writeln!(file, "[{}] {line}", chrono::Utc::now().to_rfc3339())
            });
        if let Err(e) = written {
            tracing::warn!(?path, error = %e, "Failed to write error log");
        }
    }
}
