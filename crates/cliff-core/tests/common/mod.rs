//! Helper functions for cliff-core integration tests
//!
// Note: Using #[allow(dead_code)] because not every test target uses every
// helper, which makes #[expect] inconsistent across compilation units.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cliff_core::config::Settings;
use cliff_core::loaders::{FnCommand, StaticLoader};
use cliff_core::streams::CapturedOutput;
use cliff_core::{Environment, EnvironmentOptions, Runner, Streams};

/// Write `cliff-plugin.toml` for `name` with `extra` above the `[plugin]` table.
pub fn write_descriptor(dir: &Path, name: &str, extra: &str) {
    fs::create_dir_all(dir).unwrap();
    fs::write(
        dir.join("cliff-plugin.toml"),
        format!("{extra}\n[plugin]\nname = \"{name}\"\nversion = \"1.0.0\"\n"),
    )
    .unwrap();
}

/// Create an empty file (and its parents) below `root`.
pub fn touch(root: &Path, relative: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, "").unwrap();
    path
}

/// A command that prints `line` and succeeds.
pub fn printing(line: &'static str) -> FnCommand {
    FnCommand::new(move |ctx, _| {
        ctx.log(line);
        Ok(())
    })
}

/// Settings isolated from the developer's machine.
pub fn isolated_settings(data_dir: &Path) -> Settings {
    Settings {
        data_dir: Some(data_dir.display().to_string()),
        ..Settings::default()
    }
}

/// Load an environment rooted at `root` with captured streams.
pub fn load_env(
    root: &Path,
    loader: StaticLoader,
    settings: Settings,
) -> (Environment, CapturedOutput) {
    let (streams, captured) = Streams::capture();
    let env = Environment::load(
        root,
        EnvironmentOptions::new(Arc::new(loader))
            .with_settings(settings)
            .with_streams(streams),
    )
    .unwrap();
    (env, captured)
}

pub fn load_runner(root: &Path, loader: StaticLoader) -> (Runner, CapturedOutput) {
    let (env, captured) = load_env(root, loader, Settings::default());
    (Runner::new(env), captured)
}

pub fn argv(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}
