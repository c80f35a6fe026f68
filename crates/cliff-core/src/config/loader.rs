//! Settings discovery and loading.
//!
//! Checks two locations in precedence order:
//! 1. `./.<bin>.toml` (project-local)
//! 2. `$XDG_CONFIG_HOME/<bin>.toml`, else `~/.config/<bin>.toml` (user-global)
//!
//! `<BIN>_DEBUG`, `<BIN>_DEVELOPMENT`, `<BIN>_DISABLE_MANIFEST` and
//! `<BIN>_DATA_DIR` override whatever the file says.

use std::path::{Path, PathBuf};

use super::Settings;

const GLOBAL_CONFIG_DIR: &str = ".config";

/// Load settings for `bin` from the first discovered location, or defaults.
pub fn load_settings(bin: &str) -> Settings {
    let settings = match find_settings_file(bin) {
        Some(path) => load_settings_from(&path),
        None => Settings::default(),
    };
    apply_env_overrides(settings, bin)
}

/// Load settings from one file, falling back to defaults on any error.
pub fn load_settings_from(path: &Path) -> Settings {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(settings) => {
                tracing::debug!(?path, "Loaded settings");
                settings
            }
            Err(e) => {
                tracing::warn!(?path, error = %e, "Failed to parse settings, using defaults");
                Settings::default()
            }
        },
        Err(e) => {
            tracing::warn!(?path, error = %e, "Failed to read settings, using defaults");
            Settings::default()
        }
    }
}

fn find_settings_file(bin: &str) -> Option<PathBuf> {
    let local = PathBuf::from(format!(".{bin}.toml"));
    if local.is_file() {
        return Some(local);
    }

    let global_dir = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(|| home_dir().map(|home| home.join(GLOBAL_CONFIG_DIR)))?;
    let global = global_dir.join(format!("{bin}.toml"));
    global.is_file().then_some(global)
}

/// Environment variable prefix for `bin`: `my-cli` becomes `MY_CLI`.
pub fn env_prefix(bin: &str) -> String {
    bin.chars()
        .map(|c| match c {
            'a'..='z' => c.to_ascii_uppercase(),
            'A'..='Z' | '0'..='9' => c,
            _ => '_',
        })
        .collect()
}

fn apply_env_overrides(mut settings: Settings, bin: &str) -> Settings {
    let prefix = env_prefix(bin);
    let var = |name: &str| std::env::var(format!("{prefix}_{name}")).ok();

    if let Some(value) = var("DEBUG") {
        settings.debug = is_truthy(&value);
    }
    if let Some(value) = var("DEVELOPMENT") {
        settings.development = is_truthy(&value);
    }
    if let Some(value) = var("DISABLE_MANIFEST") {
        settings.use_manifest = !is_truthy(&value);
    }
    if let Some(value) = var("DATA_DIR").filter(|v| !v.is_empty()) {
        settings.data_dir = Some(value);
    }
    settings
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Expand a leading `~/` to the home directory.
pub fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}
