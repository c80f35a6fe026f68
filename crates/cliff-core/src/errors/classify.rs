//! Failure classification: kind, exit code, and what (if anything) to print.
//!
//! | failure                         | kind             | exit                      | output                |
//! |---------------------------------|------------------|---------------------------|-----------------------|
//! | exit directive                  | `exit-directive` | its code                  | none                  |
//! | structured error                | `cli-error`      | its exit, else 2          | marker-prefixed       |
//! | parse failure                   | `generic-error`  | `failed-flag-parsing`, else default | usage help, then message |
//! | runtime error                   | `generic-error`  | its exit, else default (1)| message               |
//! | runtime error, `skip_handling`  | `suppressed`     | its exit, else default    | none                  |
//! | `SIGINT`                        | `suppressed`     | 1                         | none                  |

use std::fmt;

use super::{CliError, ExitDirective, Failure, CLI_ERROR_EXIT, DEFAULT_EXIT, SIGINT_MESSAGE};
use crate::help::HelpSection;
use crate::registry::CommandEntry;

/// Visual marker in front of structured errors.
pub const MARKER: char = if cfg!(windows) { '»' } else { '›' };

/// Help sections shown with a parse failure: just enough to fix the invocation.
pub const PARSE_HELP_SECTIONS: [HelpSection; 3] =
    [HelpSection::Flags, HelpSection::Usage, HelpSection::Arguments];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ExitDirective,
    CliError,
    GenericError,
    Suppressed,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ExitDirective => "exit-directive",
            ErrorKind::CliError => "cli-error",
            ErrorKind::GenericError => "generic-error",
            ErrorKind::Suppressed => "suppressed",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exit-code policy and presentation switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifyOptions {
    /// Exit code for generic failures.
    pub default_exit: i32,
    /// Exit code for parse failures; `default_exit` when unset.
    pub failed_flag_parsing: Option<i32>,
    /// Show generic errors with their full source chain.
    pub debug: bool,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            default_exit: DEFAULT_EXIT,
            failed_flag_parsing: None,
            debug: false,
        }
    }
}

/// Help to render on stderr before the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpRequest {
    pub command: CommandEntry,
    pub sections: Vec<HelpSection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub kind: ErrorKind,
    pub exit_code: i32,
    /// Text for stderr, newline-terminated. `None` means silent.
    pub message: Option<String>,
    pub help: Option<HelpRequest>,
    /// Line for the error log. `None` for exit directives.
    pub log: Option<String>,
}

impl Classified {
    fn silent(kind: ErrorKind, exit_code: i32, log: Option<String>) -> Self {
        Self {
            kind,
            exit_code,
            message: None,
            help: None,
            log,
        }
    }
}

pub fn classify(failure: &Failure, options: &ClassifyOptions) -> Classified {
    match failure {
        Failure::Exit(directive) => exit_directive(directive),
        Failure::Cli(error) => cli_error(error),
        Failure::Parse(error) => Classified {
            kind: ErrorKind::GenericError,
            exit_code: options
                .failed_flag_parsing
                .unwrap_or(options.default_exit),
            message: Some(format!("{}\n", error.message)),
            help: error.command.as_ref().map(|entry| HelpRequest {
                command: entry.as_ref().clone(),
                sections: PARSE_HELP_SECTIONS.to_vec(),
            }),
            log: Some(error.message.clone()),
        },
        Failure::Runtime(error) => {
            let exit_code = error.exit.unwrap_or(options.default_exit);
            let text = error.error.to_string();

            if error.skip_handling {
                return Classified::silent(ErrorKind::Suppressed, exit_code, Some(text));
            }
            if text == SIGINT_MESSAGE {
                return Classified::silent(ErrorKind::Suppressed, DEFAULT_EXIT, None);
            }
            // Structured failures that travelled inside an `anyhow::Error`.
            if let Some(directive) = error.error.downcast_ref::<ExitDirective>() {
                return exit_directive(directive);
            }
            if let Some(cli) = error.error.downcast_ref::<CliError>() {
                return cli_error(cli);
            }

            let message = if options.debug {
                format!("{:?}\n", error.error)
            } else {
                format!("{text}\n")
            };
            Classified {
                kind: ErrorKind::GenericError,
                exit_code,
                message: Some(message),
                help: None,
                log: Some(format!("{:?}", error.error)),
            }
        }
    }
}

fn exit_directive(directive: &ExitDirective) -> Classified {
    Classified::silent(ErrorKind::ExitDirective, directive.code, None)
}

fn cli_error(error: &CliError) -> Classified {
    Classified {
        kind: ErrorKind::CliError,
        exit_code: error.exit.unwrap_or(CLI_ERROR_EXIT),
        message: Some(pretty(error)),
        help: None,
        log: Some(error.message.clone()),
    }
}

/// Marker-prefixed rendering of a structured error.
pub fn pretty(error: &CliError) -> String {
    let mut lines = vec![format!("Error: {}", error.message)];
    if let Some(code) = &error.code {
        lines.push(format!("Code: {code}"));
    }
    if !error.suggestions.is_empty() {
        lines.push("Suggestions:".to_string());
        lines.extend(error.suggestions.iter().map(|s| format!("  * {s}")));
    }
    if let Some(reference) = &error.reference {
        lines.push(format!("Reference: {reference}"));
    }

    let mut out = String::new();
    for line in lines.iter().flat_map(|l| l.lines()) {
        out.push_str(&format!(" {MARKER}   {line}\n"));
    }
    out
}
