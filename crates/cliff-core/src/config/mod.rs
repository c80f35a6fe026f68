//! Per-user settings for a CLI built on cliff.
//!
//! Separate from the plugin descriptor: the descriptor is shipped by the
//! plugin author, settings belong to whoever runs the CLI.

pub mod loader;

pub use loader::{env_prefix, expand_path, load_settings, load_settings_from};

use std::path::PathBuf;

use serde::Deserialize;

/// A user-configured plugin: installed by name, or linked from a path.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PluginSource {
    /// Installed into the data directory.
    Name(String),
    /// Loaded straight from a local directory.
    Link { link: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Settings {
    /// User and linked plugins, in load order.
    pub plugins: Vec<PluginSource>,

    /// Where installed plugins live. Default: `$XDG_DATA_HOME/<bin>`.
    pub data_dir: Option<String>,

    /// Print full error chains instead of pretty messages.
    pub debug: bool,

    /// Load `dev-plugins` from the root descriptor.
    pub development: bool,

    /// Read manifest caches when present.
    pub use_manifest: bool,

    /// Append every reported failure to this file.
    pub error_log: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            plugins: Vec::new(),
            data_dir: None,
            debug: false,
            development: false,
            use_manifest: true,
            error_log: None,
        }
    }
}

impl Settings {
    /// Resolved data directory for `bin`.
    pub fn data_dir(&self, bin: &str) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return expand_path(dir);
        }
        if let Some(xdg) = std::env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
            return PathBuf::from(xdg).join(bin);
        }
        expand_path(&format!("~/.local/share/{bin}"))
    }

    /// Directories searched for installed plugins.
    pub fn plugin_search_paths(&self, bin: &str) -> Vec<PathBuf> {
        vec![self.data_dir(bin).join("plugins")]
    }

    pub fn error_log(&self) -> Option<PathBuf> {
        self.error_log.as_deref().map(expand_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(settings.plugins.is_empty());
        assert!(settings.use_manifest);
        assert!(!settings.debug);
        assert!(!settings.development);
    }

    #[test]
    fn test_parse_settings_toml() {
        let toml_str = r#"
plugins = ["weather", { link = "../my-plugin" }]
data-dir = "/tmp/mycli"
debug = true
use-manifest = false
error-log = "/tmp/mycli/error.log"
"#;
        let settings: Settings = toml::from_str(toml_str).unwrap();
        assert_eq!(
            settings.plugins,
            vec![
                PluginSource::Name("weather".to_string()),
                PluginSource::Link {
                    link: "../my-plugin".to_string()
                },
            ]
        );
        assert!(settings.debug);
        assert!(!settings.use_manifest);
        assert!(!settings.development);
        assert_eq!(settings.data_dir("mycli"), PathBuf::from("/tmp/mycli"));
        assert_eq!(
            settings.plugin_search_paths("mycli"),
            vec![PathBuf::from("/tmp/mycli/plugins")]
        );
    }

    #[test]
    fn test_parse_minimal_settings_keeps_defaults() {
        let settings: Settings = toml::from_str("development = true\n").unwrap();
        assert!(settings.development);
        assert!(settings.use_manifest);
    }
}
