//! Command and hook implementations, and the capability that loads them.
//!
//! Nothing in resolution or dispatch knows how a target becomes runnable code.
//! Every back-end (in-process table, executables on disk, anything else an
//! embedder provides) sits behind [`CommandLoader`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Failure;
use crate::hooks::{HookContext, HookFailure, HookSignal};
use crate::streams::Streams;
use crate::topics::Separator;

/// Reference to a loadable command or hook target inside a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetRef {
    /// Name of the plugin that owns the target.
    pub plugin: String,
    /// Plugin-relative path, `/`-separated, without a leading `./`.
    pub target: String,
    /// Named export within the target, when the target holds several.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export: Option<String>,
}

impl TargetRef {
    pub fn new(plugin: impl Into<String>, target: impl AsRef<str>, export: Option<String>) -> Self {
        Self {
            plugin: plugin.into(),
            target: normalize_target(target.as_ref()),
            export,
        }
    }

    /// Parse the `path#Export` string form.
    pub fn parse(plugin: impl Into<String>, raw: &str) -> Self {
        match raw.split_once('#') {
            Some((target, export)) if !export.is_empty() => {
                Self::new(plugin, target, Some(export.to_string()))
            }
            Some((target, _)) => Self::new(plugin, target, None),
            None => Self::new(plugin, raw, None),
        }
    }

    /// Lookup key that is unique across plugins.
    pub fn key(&self) -> String {
        format!("{}::{}", self.plugin, self)
    }

    /// Absolute location of the target below the plugin root.
    pub fn path_in(&self, plugin_root: &Path) -> PathBuf {
        plugin_root.join(&self.target)
    }
}

impl fmt::Display for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.export {
            Some(export) => write!(f, "{}#{}", self.target, export),
            None => f.write_str(&self.target),
        }
    }
}

pub(crate) fn normalize_target(raw: &str) -> String {
    let unified = raw.replace('\\', "/");
    let mut trimmed = unified.as_str();
    while let Some(rest) = trimmed.strip_prefix("./") {
        trimmed = rest;
    }
    trimmed.trim_end_matches('/').to_string()
}

/// Static metadata a command reports about itself.
///
/// Stored verbatim in the manifest cache so listings and help never need to
/// load the implementation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<FlagMeta>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ArgMeta>,
}

impl CommandMeta {
    /// Overlay declared metadata onto what the implementation reported.
    pub fn merged_with(mut self, declared: &CommandMeta) -> Self {
        if declared.description.is_some() {
            self.description.clone_from(&declared.description);
        }
        if declared.usage.is_some() {
            self.usage.clone_from(&declared.usage);
        }
        for alias in &declared.aliases {
            if !self.aliases.contains(alias) {
                self.aliases.push(alias.clone());
            }
        }
        self.hidden |= declared.hidden;
        if !declared.flags.is_empty() {
            self.flags.clone_from(&declared.flags);
        }
        if !declared.args.is_empty() {
            self.args.clone_from(&declared.args);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short: Option<char>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
}

/// What a running command sees of the invocation.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub bin: String,
    /// Canonical (`:`-joined) id of the running command.
    pub id: String,
    pub separator: Separator,
    pub plugin_root: PathBuf,
    pub streams: Streams,
    pub debug: bool,
}

impl RunContext {
    /// Write a line to stdout.
    pub fn log(&self, message: impl fmt::Display) {
        self.streams.write_stdout(&format!("{message}\n"));
    }

    /// Write a warning line to stderr.
    pub fn warn(&self, message: impl fmt::Display) {
        self.streams.write_stderr(&format!("Warning: {message}\n"));
    }
}

/// A runnable command implementation.
#[async_trait]
pub trait Command: Send + Sync + fmt::Debug {
    fn meta(&self) -> CommandMeta {
        CommandMeta::default()
    }

    async fn run(&self, ctx: &mut RunContext, argv: &[String]) -> Result<(), Failure>;
}

/// A hook listener.
///
/// Listeners share one mutable [`HookContext`] per dispatch round and may end
/// the round early by returning [`HookSignal::Stop`].
#[async_trait]
pub trait Hook: Send + Sync + fmt::Debug {
    async fn call(
        &self,
        ctx: &mut HookContext,
        input: &serde_json::Value,
    ) -> Result<HookSignal, HookFailure>;
}

/// Turns target references into runnable implementations.
pub trait CommandLoader: Send + Sync + fmt::Debug {
    fn load_command(
        &self,
        reference: &TargetRef,
        plugin_root: &Path,
    ) -> Result<Arc<dyn Command>, LoadError>;

    fn load_hook(&self, reference: &TargetRef, plugin_root: &Path)
        -> Result<Arc<dyn Hook>, LoadError>;
}

/// Errors that can occur while loading a target.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("no {kind} registered for '{reference}'")]
    NotFound {
        kind: &'static str,
        reference: String,
    },
    #[error("target '{}' is not an executable file", path.display())]
    NotExecutable { path: PathBuf },
    #[error("failed to inspect {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl LoadError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, LoadError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_ref_normalizes_path() {
        let r = TargetRef::new("p", "./commands\\foo/bar.sh", None);
        assert_eq!(r.target, "commands/foo/bar.sh");
    }

    #[test]
    fn test_target_ref_parse_export() {
        let r = TargetRef::parse("p", "./lib/commands.rs#Hello");
        assert_eq!(r.target, "lib/commands.rs");
        assert_eq!(r.export.as_deref(), Some("Hello"));
        assert_eq!(r.to_string(), "lib/commands.rs#Hello");
        assert_eq!(r.key(), "p::lib/commands.rs#Hello");
    }

    #[test]
    fn test_target_ref_parse_trailing_hash() {
        let r = TargetRef::parse("p", "hello#");
        assert_eq!(r.target, "hello");
        assert!(r.export.is_none());
    }

    #[test]
    fn test_meta_merge_prefers_declared() {
        let reported = CommandMeta {
            description: Some("reported".into()),
            aliases: vec!["a".into()],
            ..Default::default()
        };
        let declared = CommandMeta {
            description: Some("declared".into()),
            aliases: vec!["a".into(), "b".into()],
            hidden: true,
            ..Default::default()
        };
        let merged = reported.merged_with(&declared);
        assert_eq!(merged.description.as_deref(), Some("declared"));
        assert_eq!(merged.aliases, vec!["a", "b"]);
        assert!(merged.hidden);
    }
}
