//! Command discovery strategies.
//!
//! Each strategy turns a plugin's declared command source into `(id, target)`
//! pairs; [`discover`] then loads every target once to collect its metadata.
//! A present manifest cache short-circuits all of it and is trusted verbatim.

mod explicit;
mod pattern;
mod single;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::command::{CommandLoader, TargetRef};
use crate::descriptor::PluginDescriptor;
use crate::manifest::Manifest;
use crate::plugins::PluginType;
use crate::registry::CommandEntry;
use crate::topics::Separator;

/// Export read from an explicit target when no identifier is given.
pub const DEFAULT_EXPORT: &str = "default";

/// Patterns used by the pattern strategy when none are configured.
/// `!`-prefixed patterns exclude.
pub const DEFAULT_GLOB_PATTERNS: &[&str] = &[
    "**/*",
    "!**/.*",
    "!**/_*",
    "!**/*.md",
    "!**/*.test.*",
    "!**/*.spec.*",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Scan a directory; every matching file is a command.
    Pattern,
    /// Read an id-to-target mapping from one file.
    Explicit,
    /// The target is the root command of a single-command CLI.
    Single,
}

/// How a plugin declares its commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CommandDiscovery {
    pub strategy: Strategy,
    /// Directory for `pattern`, file for `explicit` and `single`.
    pub target: String,
    /// Only used by `pattern`, and only when no manifest cache exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glob_patterns: Option<Vec<String>>,
    /// Only used by `explicit`. Defaults to [`DEFAULT_EXPORT`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

impl CommandDiscovery {
    pub fn pattern(target: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::Pattern,
            target: target.into(),
            glob_patterns: None,
            identifier: None,
        }
    }

    pub fn explicit(target: impl Into<String>, identifier: Option<String>) -> Self {
        Self {
            strategy: Strategy::Explicit,
            target: target.into(),
            glob_patterns: None,
            identifier,
        }
    }

    pub fn single(target: impl Into<String>) -> Self {
        Self {
            strategy: Strategy::Single,
            target: target.into(),
            glob_patterns: None,
            identifier: None,
        }
    }

    pub fn identifier(&self) -> &str {
        self.identifier.as_deref().unwrap_or(DEFAULT_EXPORT)
    }

    pub fn glob_patterns(&self) -> Vec<&str> {
        match &self.glob_patterns {
            Some(patterns) => patterns.iter().map(String::as_str).collect(),
            None => DEFAULT_GLOB_PATTERNS.to_vec(),
        }
    }
}

/// Commands produced for one plugin.
#[derive(Debug, Clone, Default)]
pub struct Discovered {
    pub entries: Vec<CommandEntry>,
    /// True when the entries came verbatim from the manifest cache.
    pub from_manifest: bool,
}

/// Produce the command entries for one plugin.
///
/// With `use_manifest` set and a readable manifest cache present, the cache is
/// returned as-is. A missing or unreadable cache falls back to live discovery.
pub fn discover(
    descriptor: &PluginDescriptor,
    root: &Path,
    plugin_type: PluginType,
    use_manifest: bool,
    loader: &dyn CommandLoader,
) -> Result<Discovered, DiscoveryError> {
    let plugin = descriptor.plugin.name.as_str();

    if use_manifest {
        match Manifest::load(root) {
            Ok(Some(manifest)) => {
                tracing::debug!(plugin, count = manifest.commands.len(), "Using manifest cache");
                let entries = manifest
                    .commands
                    .into_values()
                    .map(|mut entry| {
                        if entry.target.plugin == plugin {
                            entry.plugin_type = plugin_type;
                        }
                        entry
                    })
                    .collect();
                return Ok(Discovered {
                    entries,
                    from_manifest: true,
                });
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(plugin, error = %e, "Ignoring unreadable manifest cache");
            }
        }
    }

    let Some(commands) = &descriptor.commands else {
        tracing::debug!(plugin, "Plugin declares no commands");
        return Ok(Discovered::default());
    };

    let discovery = commands.discovery();
    let targets = discover_targets(plugin, root, &discovery, descriptor.topic_separator)?;
    let mut entries = Vec::with_capacity(targets.len());

    for (id, target) in targets {
        let command = match loader.load_command(&target, root) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!(plugin, id = %id, target = %target, error = %e, "Skipping command that failed to load");
                continue;
            }
        };
        let meta = match descriptor.command_meta.get(&id) {
            Some(declared) => command.meta().merged_with(declared),
            None => command.meta(),
        };
        entries.push(CommandEntry {
            id,
            plugin_type,
            target,
            meta,
        });
    }

    tracing::debug!(plugin, strategy = ?discovery.strategy, count = entries.len(), "Discovered commands");
    Ok(Discovered {
        entries,
        from_manifest: false,
    })
}

/// Run one strategy without loading anything.
pub fn discover_targets(
    plugin: &str,
    root: &Path,
    discovery: &CommandDiscovery,
    separator: Separator,
) -> Result<Vec<(String, TargetRef)>, DiscoveryError> {
    match discovery.strategy {
        Strategy::Pattern => pattern::scan(plugin, root, discovery),
        Strategy::Explicit => explicit::read(plugin, root, discovery, separator),
        Strategy::Single => Ok(single::target(plugin, discovery)),
    }
}

/// Errors that can occur during live discovery.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        source: globset::Error,
    },
    #[error("failed to scan {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        source: walkdir::Error,
    },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
    #[error("malformed export '{identifier}' in {}: {reason}", path.display())]
    MalformedExport {
        path: PathBuf,
        identifier: String,
        reason: String,
    },
}
