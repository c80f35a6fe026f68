//! Command handlers for `cliff-ctl`.
//!
//! Each module handles one subcommand, delegating to `cliff-core` for loading,
//! discovery, and execution.

pub(crate) mod manifest;
pub(crate) mod plugin;
pub(crate) mod run;

pub(crate) use manifest::handle_manifest_command;
pub(crate) use plugin::{handle_commands_command, handle_plugins_command, handle_validate_command};
pub(crate) use run::handle_run_command;

use std::path::Path;
use std::sync::Arc;

use cliff_core::config::{load_settings, Settings};
use cliff_core::descriptor::PluginDescriptor;
use cliff_core::loaders::{ChainLoader, ProcessLoader};
use cliff_core::{CommandLoader, Environment, EnvironmentOptions};

/// Loader for plugin trees on disk: executables below each plugin root.
pub(crate) fn disk_loader() -> Arc<dyn CommandLoader> {
    Arc::new(ChainLoader::new().with(Arc::new(ProcessLoader::new())))
}

/// Settings for the root at `root`, with command-line overrides applied.
fn settings_for(root: &Path, dev: bool, no_manifest: bool) -> anyhow::Result<Settings> {
    let descriptor = PluginDescriptor::load(root)?;
    let mut settings = load_settings(descriptor.bin());
    settings.development |= dev;
    if no_manifest {
        settings.use_manifest = false;
    }
    Ok(settings)
}

pub(crate) fn load_environment(
    root: &Path,
    dev: bool,
    no_manifest: bool,
) -> anyhow::Result<Environment> {
    let settings = settings_for(root, dev, no_manifest)?;
    let env = Environment::load(
        root,
        EnvironmentOptions::new(disk_loader()).with_settings(settings),
    )?;
    Ok(env)
}
