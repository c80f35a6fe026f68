//! Manifest cache (`cliff.manifest.json`).
//!
//! A precomputed index of a plugin's commands. When present it replaces live
//! discovery entirely and is trusted without checking the filesystem; keeping
//! it fresh is the job of whatever generates it (`cliff-ctl manifest`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::registry::CommandEntry;

pub const MANIFEST_FILENAME: &str = "cliff.manifest.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Version of the plugin the manifest was generated for.
    pub version: String,
    /// Command id to entry.
    #[serde(default)]
    pub commands: BTreeMap<String, CommandEntry>,
}

impl Manifest {
    pub fn from_entries<'a>(
        version: impl Into<String>,
        entries: impl IntoIterator<Item = &'a CommandEntry>,
    ) -> Self {
        Self {
            version: version.into(),
            commands: entries
                .into_iter()
                .map(|entry| (entry.id.clone(), entry.clone()))
                .collect(),
        }
    }

    /// Load the manifest from a plugin root. `Ok(None)` when there is none.
    pub fn load(dir: &Path) -> Result<Option<Self>, ManifestError> {
        let path = dir.join(MANIFEST_FILENAME);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(ManifestError::Io { path, source }),
        };
        let manifest =
            serde_json::from_str(&contents).map_err(|source| ManifestError::Parse { path, source })?;
        Ok(Some(manifest))
    }

    pub fn to_json_pretty(&self) -> Result<String, ManifestError> {
        serde_json::to_string_pretty(self).map_err(ManifestError::Serialize)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }
}

/// Errors that can occur while reading a manifest cache.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to serialize manifest: {0}")]
    Serialize(serde_json::Error),
}
