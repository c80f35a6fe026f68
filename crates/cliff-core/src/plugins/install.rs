//! Installing just-in-time plugins.
//!
//! Fetching packages is outside the core. [`PluginInstaller`] is the seam; the
//! default [`DataDirInstaller`] only finds a plugin that something else already
//! placed in the data directory.

use std::path::PathBuf;

use async_trait::async_trait;

use super::locate::find_plugin;
use crate::descriptor::PluginDescriptor;

#[async_trait]
pub trait PluginInstaller: Send + Sync + std::fmt::Debug {
    /// Make plugin `name` at `version` available and return its root.
    async fn install(&self, name: &str, version: &str) -> Result<PathBuf, InstallError>;
}

/// Looks for already-installed plugins under a list of directories.
#[derive(Debug, Clone, Default)]
pub struct DataDirInstaller {
    search_paths: Vec<PathBuf>,
}

impl DataDirInstaller {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }
}

#[async_trait]
impl PluginInstaller for DataDirInstaller {
    async fn install(&self, name: &str, version: &str) -> Result<PathBuf, InstallError> {
        let root = find_plugin(name, &self.search_paths).ok_or_else(|| {
            InstallError::NotInstalled {
                name: name.to_string(),
                version: version.to_string(),
            }
        })?;

        let installed = PluginDescriptor::load(&root)
            .map_err(|e| InstallError::Failed {
                name: name.to_string(),
                message: e.to_string(),
            })?
            .plugin
            .version;
        if installed != version {
            return Err(InstallError::VersionMismatch {
                name: name.to_string(),
                wanted: version.to_string(),
                installed,
            });
        }

        tracing::debug!(name, version, ?root, "Found installed JIT plugin");
        Ok(root)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("plugin {name}@{version} is not installed")]
    NotInstalled { name: String, version: String },
    #[error("plugin {name} is installed at {installed}, but {wanted} is required")]
    VersionMismatch {
        name: String,
        wanted: String,
        installed: String,
    },
    #[error("failed to install plugin {name}: {message}")]
    Failed { name: String, message: String },
}
