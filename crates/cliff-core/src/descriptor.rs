//! Plugin descriptor parsing (`cliff-plugin.toml`).

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::command::CommandMeta;
use crate::discovery::{CommandDiscovery, Strategy};
use crate::topics::Separator;

pub const DESCRIPTOR_FILENAME: &str = "cliff-plugin.toml";

/// Top-level plugin descriptor parsed from `cliff-plugin.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PluginDescriptor {
    /// Plugin metadata.
    pub plugin: PluginMetadata,

    /// Where the plugin's commands come from.
    #[serde(default)]
    pub commands: Option<CommandsDecl>,

    #[serde(default)]
    pub topic_separator: Separator,

    /// Command run when a topic without its own command is invoked.
    #[serde(default)]
    pub default_command: Option<String>,

    /// Core plugins bundled with the root plugin.
    #[serde(default)]
    pub plugins: Vec<String>,

    /// Plugins loaded only in development mode.
    #[serde(default)]
    pub dev_plugins: Vec<String>,

    /// Just-in-time plugins: name to pinned version.
    #[serde(default)]
    pub jit_plugins: IndexMap<String, String>,

    #[serde(default)]
    pub additional_help_flags: Vec<String>,

    #[serde(default)]
    pub additional_version_flags: Vec<String>,

    /// Theme file, relative to the plugin root.
    #[serde(default)]
    pub theme: Option<String>,

    #[serde(default)]
    pub hooks: IndexMap<String, HookDecl>,

    #[serde(default)]
    pub topics: IndexMap<String, TopicDecl>,

    /// Alias id to command id. Direct substitution only.
    #[serde(default)]
    pub aliases: IndexMap<String, String>,

    /// Static command metadata, merged over what each implementation reports.
    #[serde(default)]
    pub command_meta: IndexMap<String, CommandMeta>,

    #[serde(default)]
    pub exit_codes: ExitCodes,
}

/// Core plugin metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginMetadata {
    /// Unique plugin name.
    pub name: String,

    /// Plugin version.
    pub version: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: Option<String>,

    /// Executable name, meaningful for the root plugin only.
    #[serde(default)]
    pub bin: Option<String>,
}

/// `commands` accepts either a bare directory (legacy pattern shorthand) or a
/// full discovery table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CommandsDecl {
    Legacy(String),
    Discovery(CommandDiscovery),
}

impl CommandsDecl {
    pub fn discovery(&self) -> CommandDiscovery {
        match self {
            CommandsDecl::Legacy(target) => CommandDiscovery::pattern(target),
            CommandsDecl::Discovery(discovery) => discovery.clone(),
        }
    }
}

/// One or many hook targets for a single hook name.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HookDecl {
    // Must come first: serde also accepts `["a", "b"]` as the table form.
    Many(Vec<HookTargetDecl>),
    One(HookTargetDecl),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum HookTargetDecl {
    Path(String),
    Target {
        target: String,
        #[serde(default)]
        identifier: Option<String>,
    },
}

impl HookDecl {
    /// `(target, export)` pairs in declaration order.
    pub fn targets(&self) -> Vec<(&str, Option<&str>)> {
        match self {
            HookDecl::One(decl) => vec![decl.parts()],
            HookDecl::Many(decls) => decls.iter().map(HookTargetDecl::parts).collect(),
        }
    }
}

impl HookTargetDecl {
    fn parts(&self) -> (&str, Option<&str>) {
        match self {
            HookTargetDecl::Path(path) => (path.as_str(), None),
            HookTargetDecl::Target { target, identifier } => {
                (target.as_str(), identifier.as_deref())
            }
        }
    }
}

/// Declared topic with optional nested subtopics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TopicDecl {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub subtopics: IndexMap<String, TopicDecl>,
}

/// Exit code policy overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExitCodes {
    /// Exit code for generic failures (default 1).
    #[serde(default)]
    pub default: Option<i32>,
    /// Exit code for argument/flag parsing failures (default: `default`).
    #[serde(default)]
    pub failed_flag_parsing: Option<i32>,
}

impl PluginDescriptor {
    /// Load a descriptor from a directory containing `cliff-plugin.toml`.
    pub fn load(dir: &Path) -> Result<Self, DescriptorError> {
        let descriptor_path = dir.join(DESCRIPTOR_FILENAME);
        let contents =
            std::fs::read_to_string(&descriptor_path).map_err(|e| DescriptorError::Io {
                path: descriptor_path.clone(),
                source: e,
            })?;
        let descriptor: Self = toml::from_str(&contents).map_err(|e| DescriptorError::Parse {
            path: descriptor_path,
            source: e,
        })?;
        Ok(descriptor)
    }

    /// Executable name: `plugin.bin`, falling back to the plugin name.
    pub fn bin(&self) -> &str {
        self.plugin.bin.as_deref().unwrap_or(&self.plugin.name)
    }

    /// Validate declared targets against the plugin directory.
    pub fn validate(&self, base_dir: &Path) -> Vec<String> {
        let mut errors = Vec::new();

        if self.plugin.name.is_empty() {
            errors.push("plugin.name is empty".to_string());
        }
        if self.plugin.version.is_empty() {
            errors.push("plugin.version is empty".to_string());
        }

        if let Some(commands) = &self.commands {
            let discovery = commands.discovery();
            let target = base_dir.join(&discovery.target);
            match discovery.strategy {
                Strategy::Pattern if !target.is_dir() => errors.push(format!(
                    "commands target '{}' is not a directory",
                    discovery.target
                )),
                Strategy::Explicit | Strategy::Single if !target.is_file() => errors.push(
                    format!("commands target '{}' is not a file", discovery.target),
                ),
                _ => {}
            }
            if discovery.glob_patterns.is_some() && discovery.strategy != Strategy::Pattern {
                errors.push("glob-patterns is only used by the pattern strategy".to_string());
            }
            if discovery.identifier.is_some() && discovery.strategy != Strategy::Explicit {
                errors.push("identifier is only used by the explicit strategy".to_string());
            }
        }

        for (hook, decl) in &self.hooks {
            for (target, _) in decl.targets() {
                let path = base_dir.join(target.split('#').next().unwrap_or(target));
                if !path.is_file() {
                    errors.push(format!("hook '{hook}' target '{target}' does not exist"));
                }
            }
        }

        for (alias, target) in &self.aliases {
            if alias == target {
                errors.push(format!("alias '{alias}' points at itself"));
            } else if self.aliases.contains_key(target) {
                errors.push(format!(
                    "alias '{alias}' points at another alias '{target}'; aliases do not chain"
                ));
            }
        }

        if let Some(theme) = &self.theme {
            if !base_dir.join(theme).is_file() {
                errors.push(format!("theme file '{theme}' does not exist"));
            }
        }

        errors
    }
}

/// Errors that can occur during descriptor loading.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
