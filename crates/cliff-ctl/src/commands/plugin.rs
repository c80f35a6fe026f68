//! Plugin and command inspection.

use std::path::Path;

use cliff_core::descriptor::PluginDescriptor;
use cliff_core::plugins::{Plugin, PluginType};
use cliff_core::registry::CommandRegistry;

use super::{disk_loader, load_environment};
use crate::output;

pub(crate) fn handle_plugins_command(root: &Path, dev: bool) -> anyhow::Result<()> {
    let env = load_environment(root, dev, false)?;

    output::header(format!("Plugins of {} (load order):", env.bin()));
    output::blank();
    for plugin in env.plugins() {
        output::success(format!(
            "{} (v{}) [{}]",
            plugin.name, plugin.version, plugin.plugin_type
        ));
        if let Some(description) = &plugin.descriptor.plugin.description {
            output::label("  Description", description);
        }
        output::label("  Path", plugin.root.display());
        let source = if plugin.from_manifest { "manifest" } else { "discovery" };
        output::label("  Commands", format!("{} ({source})", plugin.commands.len()));
        let hooks = plugin.hook_targets().len();
        if hooks > 0 {
            output::label("  Hook listeners", hooks);
        }
    }

    let declared_jit = &env.root_descriptor().jit_plugins;
    let pending: Vec<_> = declared_jit
        .iter()
        .filter(|(name, _)| !env.plugins().is_loaded(name))
        .collect();
    if !pending.is_empty() {
        output::blank();
        output::plain("Not yet loaded (installed on first use):");
        for (name, version) in pending {
            output::plain(format!("  - {name}@{version}"));
        }
    }
    Ok(())
}

pub(crate) fn handle_commands_command(root: &Path, hidden: bool, json: bool) -> anyhow::Result<()> {
    let env = load_environment(root, false, false)?;
    let registry = env.registry();
    let entries: Vec<_> = registry
        .entries()
        .filter(|e| hidden || !e.meta.hidden)
        .collect();

    if json {
        output::plain(serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        output::warning("No commands found.");
        return Ok(());
    }

    let separator = env.separator();
    let display = |id: &str| {
        if id.is_empty() {
            "(root)".to_string()
        } else {
            separator.display_id(id)
        }
    };
    let width = entries
        .iter()
        .map(|e| display(&e.id).chars().count())
        .max()
        .unwrap_or(0);

    for entry in entries {
        let mut detail = format!("[{}]", entry.plugin());
        if let Some(description) = &entry.meta.description {
            detail.push(' ');
            detail.push_str(description);
        }
        let aliases: Vec<String> = registry.aliases_of(&entry.id).map(display).collect();
        if !aliases.is_empty() {
            detail.push_str(&format!(" (aliases: {})", aliases.join(", ")));
        }
        output::row(&display(&entry.id), width, detail);
    }
    Ok(())
}

pub(crate) fn handle_validate_command(dir: &Path) -> anyhow::Result<()> {
    if !dir.is_dir() {
        output::error(format!("'{}' is not a directory", dir.display()));
        std::process::exit(1);
    }

    let descriptor = match PluginDescriptor::load(dir) {
        Ok(descriptor) => descriptor,
        Err(e) => {
            output::error(format!("Error loading plugin: {e}"));
            std::process::exit(1);
        }
    };

    output::success(format!("Plugin descriptor loaded: {}", descriptor.plugin.name));
    output::label("  Version", &descriptor.plugin.version);
    output::label("  Bin", descriptor.bin());
    output::label("  Separator", format!("{:?}", descriptor.topic_separator.as_str()));

    let mut errors = descriptor.validate(dir);
    match Plugin::load(dir, PluginType::Root, 0, true, disk_loader().as_ref()) {
        Ok(plugin) => {
            output::label("  Commands", plugin.commands.len());
            let registry = CommandRegistry::build(std::slice::from_ref(&plugin));
            for (alias, target) in registry.aliases() {
                if !registry.contains(target) {
                    errors.push(format!("alias '{alias}' points at unknown command '{target}'"));
                }
            }
        }
        Err(e) => errors.push(format!("command discovery failed: {e}")),
    }

    output::blank();
    if errors.is_empty() {
        output::success("Validation passed.");
        return Ok(());
    }
    output::error("Validation errors:");
    for err in &errors {
        output::error(format!("  - {err}"));
    }
    std::process::exit(1);
}
