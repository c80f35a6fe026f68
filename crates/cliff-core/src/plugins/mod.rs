//! Plugins: a directory with a `cliff-plugin.toml` descriptor.
//!
//! A [`Plugin`] is loaded once, has its commands discovered (or read from its
//! manifest cache) at load time, and is immutable afterwards. [`PluginSet`]
//! owns the process-wide load order.

mod install;
mod locate;
mod set;

pub use install::{DataDirInstaller, InstallError, PluginInstaller};
pub use locate::{find_plugin, plugin_dirs, PLUGIN_SUBDIR};
pub use set::PluginSet;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::command::{CommandLoader, TargetRef};
use crate::descriptor::{DescriptorError, PluginDescriptor};
use crate::discovery::{self, DiscoveryError};
use crate::registry::CommandEntry;

/// How a plugin came to be loaded.
///
/// The declaration order is also the shadowing rank: when two plugins provide
/// the same command id, the one with the lower variant wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginType {
    /// The CLI itself.
    Root,
    /// Bundled with the root plugin (`plugins = [...]`).
    Core,
    /// Installed by the user into the data directory.
    User,
    /// Linked from a local path.
    Link,
    /// Installed on first use.
    Jit,
    /// Only loaded in development mode.
    Dev,
}

impl PluginType {
    pub fn as_str(self) -> &'static str {
        match self {
            PluginType::Root => "root",
            PluginType::Core => "core",
            PluginType::User => "user",
            PluginType::Link => "link",
            PluginType::Jit => "jit",
            PluginType::Dev => "dev",
        }
    }
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Plugin {
    pub name: String,
    pub version: String,
    /// Directory containing the descriptor.
    pub root: PathBuf,
    pub plugin_type: PluginType,
    pub descriptor: PluginDescriptor,
    /// Commands this plugin provides, in discovery order.
    pub commands: Vec<CommandEntry>,
    /// Position in the overall load order.
    pub load_index: usize,
    /// Whether `commands` came from the manifest cache.
    pub from_manifest: bool,
}

impl Plugin {
    /// Read the descriptor under `root` and discover the plugin's commands.
    pub fn load(
        root: &Path,
        plugin_type: PluginType,
        load_index: usize,
        use_manifest: bool,
        loader: &dyn CommandLoader,
    ) -> Result<Self, PluginError> {
        let descriptor = PluginDescriptor::load(root)?;
        let name = descriptor.plugin.name.clone();
        let discovered = discovery::discover(&descriptor, root, plugin_type, use_manifest, loader)
            .map_err(|source| PluginError::Discovery {
                plugin: name.clone(),
                source,
            })?;

        tracing::debug!(
            plugin = %name,
            plugin_type = %plugin_type,
            load_index,
            commands = discovered.entries.len(),
            from_manifest = discovered.from_manifest,
            "Loaded plugin"
        );

        Ok(Self {
            version: descriptor.plugin.version.clone(),
            name,
            root: root.to_path_buf(),
            plugin_type,
            descriptor,
            commands: discovered.entries,
            load_index,
            from_manifest: discovered.from_manifest,
        })
    }

    /// Shadowing rank: plugin type first, then load order.
    pub fn rank(&self) -> (PluginType, usize) {
        (self.plugin_type, self.load_index)
    }

    /// `(hook name, target)` pairs in declaration order.
    pub fn hook_targets(&self) -> Vec<(&str, TargetRef)> {
        let mut targets = Vec::new();
        for (hook, decl) in &self.descriptor.hooks {
            for (target, identifier) in decl.targets() {
                let mut reference = TargetRef::parse(&self.name, target);
                if let Some(identifier) = identifier {
                    reference.export = Some(identifier.to_string());
                }
                targets.push((hook.as_str(), reference));
            }
        }
        targets
    }
}

/// Errors that can occur while loading a plugin.
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
    #[error("failed to discover commands for plugin {plugin}: {source}")]
    Discovery {
        plugin: String,
        source: DiscoveryError,
    },
    #[error("plugin {name} not found (searched {})", display_paths(searched))]
    NotFound { name: String, searched: Vec<PathBuf> },
    #[error(transparent)]
    Install(#[from] InstallError),
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nowhere".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::StaticLoader;
    use std::fs;

    #[test]
    fn test_plugin_type_rank_order() {
        assert!(PluginType::Root < PluginType::Core);
        assert!(PluginType::Core < PluginType::User);
        assert!(PluginType::User < PluginType::Link);
        assert!(PluginType::Link < PluginType::Jit);
        assert!(PluginType::Jit < PluginType::Dev);
    }

    #[test]
    fn test_hook_targets_in_declaration_order() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("cliff-plugin.toml"),
            r#"
[plugin]
name = "hooks"
version = "0.1.0"

[hooks]
prerun = ["hooks/a.sh", { target = "lib.toml", identifier = "B" }]
init = "hooks/init.sh#Init"
"#,
        )
        .unwrap();

        let plugin =
            Plugin::load(dir.path(), PluginType::Root, 0, true, &StaticLoader::new()).unwrap();
        let targets: Vec<(&str, String)> = plugin
            .hook_targets()
            .into_iter()
            .map(|(hook, target)| (hook, target.to_string()))
            .collect();
        assert_eq!(
            targets,
            vec![
                ("prerun", "hooks/a.sh".to_string()),
                ("prerun", "lib.toml#B".to_string()),
                ("init", "hooks/init.sh#Init".to_string()),
            ]
        );
    }

    #[test]
    fn test_load_without_descriptor_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Plugin::load(dir.path(), PluginType::Root, 0, true, &StaticLoader::new())
            .unwrap_err();
        assert!(matches!(err, PluginError::Descriptor(_)));
    }
}
