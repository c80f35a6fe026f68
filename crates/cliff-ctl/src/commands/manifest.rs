//! Manifest cache generation.

use std::path::Path;

use anyhow::Context;
use cliff_core::manifest::{Manifest, MANIFEST_FILENAME};
use cliff_core::plugins::{Plugin, PluginType};

use super::disk_loader;
use crate::output;

pub(crate) fn handle_manifest_command(dir: &Path, dry_run: bool) -> anyhow::Result<()> {
    // An existing cache must not feed its own regeneration.
    let plugin = Plugin::load(dir, PluginType::Root, 0, false, disk_loader().as_ref())
        .with_context(|| format!("cannot load plugin at {}", dir.display()))?;
    let manifest = Manifest::from_entries(&plugin.version, &plugin.commands);
    let json = manifest.to_json_pretty()?;

    if dry_run {
        output::plain(json);
        return Ok(());
    }

    let path = dir.join(MANIFEST_FILENAME);
    std::fs::write(&path, format!("{json}\n"))
        .with_context(|| format!("cannot write {}", path.display()))?;
    tracing::debug!(?path, commands = manifest.commands.len(), "Wrote manifest cache");
    output::success(format!(
        "Wrote {} command(s) for {} v{} to {}",
        manifest.commands.len(),
        plugin.name,
        plugin.version,
        path.display()
    ));
    Ok(())
}
