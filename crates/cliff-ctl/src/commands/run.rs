//! Hosting a plugin tree.

use std::path::Path;
use std::sync::Arc;

use cliff_core::{ProcessTerminator, Runner};

use super::load_environment;
use crate::output;

pub(crate) async fn handle_run_command(
    root: &Path,
    dev: bool,
    no_manifest: bool,
    argv: &[String],
) -> anyhow::Result<()> {
    let env = match load_environment(root, dev, no_manifest) {
        Ok(env) => env,
        Err(e) => {
            output::error(format!("Cannot load plugin tree at {}: {e}", root.display()));
            std::process::exit(1);
        }
    };

    tracing::debug!(bin = env.bin(), ?argv, "Running hosted CLI");
    let mut runner = Runner::new(env);
    // The process terminator exits; nothing below runs.
    runner.execute(argv, Arc::new(ProcessTerminator)).await;
    Ok(())
}
