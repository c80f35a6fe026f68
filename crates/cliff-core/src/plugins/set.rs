//! Load order of every plugin in one invocation.
//!
//! root → core (`plugins`) → user and linked (settings order) → dev
//! (development mode only). JIT plugins join when first needed, ahead of any
//! dev plugins.

use std::path::{Path, PathBuf};

use super::locate::find_plugin;
use super::{Plugin, PluginError, PluginType};
use crate::command::CommandLoader;
use crate::config::{expand_path, PluginSource, Settings};

/// Directory below the root plugin searched for core and dev plugins.
const BUNDLED_PLUGINS_DIR: &str = "plugins";

#[derive(Debug, Clone)]
pub struct PluginSet {
    plugins: Vec<Plugin>,
}

impl PluginSet {
    /// Load the root plugin and everything it and the settings name.
    ///
    /// Only a broken root plugin is an error; any other plugin that fails to
    /// load is logged and skipped.
    pub fn load(
        root: &Path,
        settings: &Settings,
        loader: &dyn CommandLoader,
    ) -> Result<Self, PluginError> {
        let root_plugin = Plugin::load(root, PluginType::Root, 0, settings.use_manifest, loader)?;
        let bin = root_plugin.descriptor.bin().to_string();
        let bundled = vec![root.join(BUNDLED_PLUGINS_DIR)];
        let mut installed = settings.plugin_search_paths(&bin);
        installed.extend(bundled.iter().cloned());

        let core = root_plugin.descriptor.plugins.clone();
        let dev = root_plugin.descriptor.dev_plugins.clone();
        let mut set = Self {
            plugins: vec![root_plugin],
        };

        for name in &core {
            set.try_load_named(name, PluginType::Core, &bundled, settings, loader);
        }

        for source in &settings.plugins {
            match source {
                PluginSource::Name(name) => {
                    set.try_load_named(name, PluginType::User, &installed, settings, loader);
                }
                PluginSource::Link { link } => {
                    let path = resolve_link(root, link);
                    set.try_load_at(&path, PluginType::Link, settings, loader);
                }
            }
        }

        if settings.development {
            for name in &dev {
                set.try_load_named(name, PluginType::Dev, &bundled, settings, loader);
            }
        }

        tracing::debug!(
            count = set.plugins.len(),
            order = ?set.plugins.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            "Loaded plugins"
        );
        Ok(set)
    }

    fn try_load_named(
        &mut self,
        name: &str,
        plugin_type: PluginType,
        search_paths: &[PathBuf],
        settings: &Settings,
        loader: &dyn CommandLoader,
    ) {
        match find_plugin(name, search_paths) {
            Some(path) => self.try_load_at(&path, plugin_type, settings, loader),
            None => {
                let err = PluginError::NotFound {
                    name: name.to_string(),
                    searched: search_paths.to_vec(),
                };
                tracing::warn!(plugin = name, plugin_type = %plugin_type, error = %err, "Skipping plugin");
            }
        }
    }

    fn try_load_at(
        &mut self,
        path: &Path,
        plugin_type: PluginType,
        settings: &Settings,
        loader: &dyn CommandLoader,
    ) {
        if let Err(e) = self.add(path, plugin_type, settings.use_manifest, loader) {
            tracing::warn!(?path, plugin_type = %plugin_type, error = %e, "Skipping plugin that failed to load");
        }
    }

    /// Load one more plugin into the load order.
    ///
    /// JIT plugins go in front of the first dev plugin; every other type goes
    /// at the end. Load indices are renumbered to match. A plugin whose name
    /// is already loaded is not loaded twice; the existing one is returned.
    pub fn add(
        &mut self,
        path: &Path,
        plugin_type: PluginType,
        use_manifest: bool,
        loader: &dyn CommandLoader,
    ) -> Result<&Plugin, PluginError> {
        let index = self.insert_position(plugin_type);
        let plugin = Plugin::load(path, plugin_type, index, use_manifest, loader)?;
        if let Some(existing) = self.position(&plugin.name) {
            tracing::debug!(plugin = %plugin.name, "Plugin already loaded, ignoring duplicate");
            return Ok(&self.plugins[existing]);
        }
        self.plugins.insert(index, plugin);
        for (load_index, plugin) in self.plugins.iter_mut().enumerate().skip(index) {
            plugin.load_index = load_index;
        }
        Ok(&self.plugins[index])
    }

    fn insert_position(&self, plugin_type: PluginType) -> usize {
        let before_dev = match plugin_type {
            PluginType::Jit => self
                .plugins
                .iter()
                .position(|p| p.plugin_type == PluginType::Dev),
            _ => None,
        };
        before_dev.unwrap_or(self.plugins.len())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.plugins.iter().position(|p| p.name == name)
    }

    /// The root plugin. Always present.
    pub fn root(&self) -> &Plugin {
        &self.plugins[0]
    }

    pub fn get(&self, name: &str) -> Option<&Plugin> {
        self.plugins.iter().find(|p| p.name == name)
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Plugins in load order.
    pub fn as_slice(&self) -> &[Plugin] {
        &self.plugins
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Plugin> {
        self.plugins.iter()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl<'a> IntoIterator for &'a PluginSet {
    type Item = &'a Plugin;
    type IntoIter = std::slice::Iter<'a, Plugin>;

    fn into_iter(self) -> Self::IntoIter {
        self.plugins.iter()
    }
}

fn resolve_link(root: &Path, link: &str) -> PathBuf {
    let path = expand_path(link);
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}
