//! Resolution-and-execution core for plugin-based command-line tools.
//!
//! Given a root plugin directory (a `cliff-plugin.toml` descriptor plus its
//! command sources), the core loads the ordered plugin set, builds a merged
//! command registry and topic tree, resolves user input to a command, fires
//! lifecycle hooks around it, and funnels every outcome into terminal output
//! plus an exit code.
//!
//! # Modules
//!
//! ## Resolution
//! - [`descriptor`]: plugin descriptor (`cliff-plugin.toml`) parsing and validation
//! - [`manifest`]: precomputed command index (`cliff.manifest.json`)
//! - [`discovery`]: pattern / explicit / single command discovery strategies
//! - [`registry`]: merged command registry with deterministic shadowing
//! - [`topics`]: topic tree and separator handling
//! - [`resolver`]: identifier and argv resolution, aliases, default commands
//!
//! ## Plugins & hooks
//! - [`plugins`]: plugin loading order, location, and JIT installation
//! - [`hooks`]: ordered fan-out hook dispatch with failure aggregation
//! - [`command`] / [`loaders`]: the loading capability and its back-ends
//!
//! ## Exit handling
//! - [`errors`]: failure taxonomy and classification
//! - [`exit`]: the exit funnel and injectable terminator
//!
//! ## Wiring
//! - [`config`]: user settings discovery
//! - [`environment`]: the per-invocation environment value
//! - [`runner`]: the lifecycle driver
//! - [`help`] / [`theme`] / [`streams`]: presentation collaborators

pub mod command;
pub mod config;
pub mod descriptor;
pub mod discovery;
pub mod environment;
pub mod errors;
pub mod exit;
pub mod help;
pub mod hooks;
pub mod loaders;
pub mod manifest;
pub mod plugins;
pub mod registry;
pub mod resolver;
pub mod runner;
pub mod streams;
pub mod theme;
pub mod topics;

pub use command::{ArgMeta, Command, CommandLoader, CommandMeta, FlagMeta, Hook, RunContext, TargetRef};
pub use environment::{Environment, EnvironmentError, EnvironmentOptions};
pub use errors::{CliError, ExitDirective, Failure, ParseError, RuntimeError};
pub use exit::{ExitFunnel, ProcessTerminator, RecordingTerminator, Terminator};
pub use resolver::Resolution;
pub use runner::Runner;
pub use streams::Streams;
