//! Pattern strategy: every matching file below the target directory is a command.
//!
//! `commands/foo/bar.sh` becomes `foo:bar`; an `index` file stands for its
//! directory, so `commands/foo/index.sh` is `foo` and `commands/index.sh` is the
//! root command.

use std::collections::HashSet;
use std::path::{Component, Path};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use super::{CommandDiscovery, DiscoveryError};
use crate::command::TargetRef;

const INDEX_STEM: &str = "index";

pub(super) fn scan(
    plugin: &str,
    root: &Path,
    discovery: &CommandDiscovery,
) -> Result<Vec<(String, TargetRef)>, DiscoveryError> {
    let dir = root.join(&discovery.target);
    if !dir.is_dir() {
        tracing::debug!(plugin, ?dir, "Command directory does not exist, skipping");
        return Ok(Vec::new());
    }

    let matcher = PatternMatcher::new(&discovery.glob_patterns())?;
    let mut found = Vec::new();
    let mut seen = HashSet::new();

    for entry in WalkDir::new(&dir).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|source| DiscoveryError::Walk {
            path: dir.clone(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(&dir) else {
            continue;
        };
        if !matcher.is_match(relative) {
            continue;
        }

        let id = id_from_path(relative);
        if !seen.insert(id.clone()) {
            tracing::warn!(plugin, id = %id, path = ?relative, "Duplicate command id, keeping the first file");
            continue;
        }

        let target = Path::new(&discovery.target).join(relative);
        found.push((id, TargetRef::new(plugin, target.to_string_lossy(), None)));
    }

    Ok(found)
}

/// Command id for a path relative to the command directory.
pub(crate) fn id_from_path(relative: &Path) -> String {
    let mut segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if let Some(last) = segments.pop() {
        let stem = Path::new(&last)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or(last);
        if stem != INDEX_STEM {
            segments.push(stem);
        }
    }

    segments.join(":")
}

/// Include patterns plus `!`-prefixed exclude patterns.
#[derive(Debug)]
struct PatternMatcher {
    include: GlobSet,
    exclude: GlobSet,
}

impl PatternMatcher {
    fn new(patterns: &[&str]) -> Result<Self, DiscoveryError> {
        let mut include = GlobSetBuilder::new();
        let mut exclude = GlobSetBuilder::new();

        for pattern in patterns {
            let (builder, glob) = match pattern.strip_prefix('!') {
                Some(negated) => (&mut exclude, negated),
                None => (&mut include, *pattern),
            };
            let compiled = GlobBuilder::new(glob)
                .literal_separator(true)
                .build()
                .map_err(|source| DiscoveryError::Pattern {
                    pattern: pattern.to_string(),
                    source,
                })?;
            builder.add(compiled);
        }

        let build = |builder: GlobSetBuilder| {
            builder.build().map_err(|source| DiscoveryError::Pattern {
                pattern: patterns.join(","),
                source,
            })
        };

        Ok(Self {
            include: build(include)?,
            exclude: build(exclude)?,
        })
    }

    fn is_match(&self, path: &Path) -> bool {
        self.include.is_match(path) && !self.exclude.is_match(path)
    }
}
