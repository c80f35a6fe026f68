//! # Failure taxonomy
//!
//! Everything a command, hook, or the framework itself can end an invocation
//! with. [`classify`] maps a [`Failure`] onto an exit code and display
//! policy; the exit funnel (`crate::exit`) carries that out.

mod classify;

pub use classify::{
    classify, pretty, Classified, ClassifyOptions, ErrorKind, HelpRequest, MARKER,
    PARSE_HELP_SECTIONS,
};

use std::fmt;

use thiserror::Error;

use crate::registry::CommandEntry;

/// Exit code of a structured error that does not name one.
pub const CLI_ERROR_EXIT: i32 = 2;

/// Exit code of anything else that does not name one.
pub const DEFAULT_EXIT: i32 = 1;

/// Message of the failure raised when the user interrupts the process.
pub const SIGINT_MESSAGE: &str = "SIGINT";

#[derive(Debug, Error)]
pub enum Failure {
    #[error(transparent)]
    Exit(#[from] ExitDirective),

    #[error(transparent)]
    Cli(#[from] CliError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl Failure {
    /// Intentional termination with `code` and no output.
    pub fn exit(code: i32) -> Self {
        Failure::Exit(ExitDirective { code })
    }

    /// Structured framework error with the default exit code.
    pub fn cli(message: impl Into<String>) -> Self {
        Failure::Cli(CliError::new(message))
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Failure::Parse(ParseError::new(message))
    }

    /// Generic error from a plain message.
    pub fn msg(message: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        Failure::Runtime(RuntimeError::new(anyhow::Error::msg(message)))
    }

    pub fn interrupted() -> Self {
        Self::msg(SIGINT_MESSAGE)
    }
}

impl From<anyhow::Error> for Failure {
    fn from(error: anyhow::Error) -> Self {
        Failure::Runtime(RuntimeError::new(error))
    }
}

/// Clean early termination, e.g. after printing `--version`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("EEXIT: {code}")]
pub struct ExitDirective {
    pub code: i32,
}

/// Structured framework error, shown behind the error marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CliError {
    pub message: String,
    /// Exit code; [`CLI_ERROR_EXIT`] when unset.
    pub exit: Option<i32>,
    /// Stable machine-readable error code, shown as `Code:`.
    pub code: Option<String>,
    pub suggestions: Vec<String>,
    /// Link to further reading, shown as `Reference:`.
    pub reference: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_exit(mut self, exit: i32) -> Self {
        self.exit = Some(exit);
        self
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions = suggestions.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// Argument or flag parsing/validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    /// Command whose usage help accompanies the message.
    pub command: Option<Box<CommandEntry>>,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            command: None,
        }
    }

    #[must_use]
    pub fn for_command(mut self, entry: &CommandEntry) -> Self {
        self.command = Some(Box::new(entry.clone()));
        self
    }
}

/// Anything else a command raised.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RuntimeError {
    pub error: anyhow::Error,
    /// Exit code carried by the error; the configured default when unset.
    pub exit: Option<i32>,
    /// The raiser already reported it; print nothing.
    pub skip_handling: bool,
}

impl RuntimeError {
    pub fn new(error: impl Into<anyhow::Error>) -> Self {
        Self {
            error: error.into(),
            exit: None,
            skip_handling: false,
        }
    }

    #[must_use]
    pub fn with_exit(mut self, exit: i32) -> Self {
        self.exit = Some(exit);
        self
    }

    #[must_use]
    pub fn skip_handling(mut self) -> Self {
        self.skip_handling = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert!(matches!(Failure::exit(3), Failure::Exit(ExitDirective { code: 3 })));
        assert_eq!(Failure::cli("uh oh!").to_string(), "uh oh!");
        assert_eq!(Failure::msg("foo bar baz").to_string(), "foo bar baz");
        assert_eq!(Failure::interrupted().to_string(), SIGINT_MESSAGE);
    }

    #[test]
    fn test_cli_error_builder() {
        let err = CliError::new("bad")
            .with_exit(9)
            .with_code("E_BAD")
            .with_suggestions(["try again", "try harder"])
            .with_reference("https://example.com/bad");
        assert_eq!(err.exit, Some(9));
        assert_eq!(err.code.as_deref(), Some("E_BAD"));
        assert_eq!(err.suggestions.len(), 2);
        assert_eq!(err.reference.as_deref(), Some("https://example.com/bad"));
    }

    #[test]
    fn test_anyhow_converts_to_runtime() {
        let failure: Failure = anyhow::anyhow!("wrapped").into();
        match failure {
            Failure::Runtime(e) => {
                assert!(!e.skip_handling);
                assert_eq!(e.exit, None);
                assert_eq!(e.to_string(), "wrapped");
            }
            other => panic!("expected runtime failure, got {other:?}"),
        }
    }
}
