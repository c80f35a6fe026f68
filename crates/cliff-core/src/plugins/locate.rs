//! Finding plugin directories on disk.
//!
//! A plugin named `weather` is found under a search path at:
//! 1. `<path>/weather/cliff-plugin.toml`
//! 2. `<path>/weather/cliff-plugin/cliff-plugin.toml` (plugin nested in a larger repo)

use std::path::{Path, PathBuf};

use crate::descriptor::DESCRIPTOR_FILENAME;

/// Nested directory name checked below each candidate.
pub const PLUGIN_SUBDIR: &str = "cliff-plugin";

/// First directory holding plugin `name` across `search_paths`.
pub fn find_plugin(name: &str, search_paths: &[PathBuf]) -> Option<PathBuf> {
    for base in search_paths {
        let candidate = base.join(name);
        if has_descriptor(&candidate) {
            return Some(candidate);
        }
        let nested = candidate.join(PLUGIN_SUBDIR);
        if has_descriptor(&nested) {
            return Some(nested);
        }
    }
    tracing::debug!(name, ?search_paths, "Plugin not found in search paths");
    None
}

/// Every plugin directory directly below the search paths, sorted per path.
pub fn plugin_dirs(search_paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = Vec::new();

    for base in search_paths {
        let entries = match std::fs::read_dir(base) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(?base, error = %e, "Cannot read plugin search path");
                continue;
            }
        };

        let mut subdirs: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        subdirs.sort();

        for subdir in subdirs {
            if has_descriptor(&subdir) {
                found.push(subdir);
                continue;
            }
            let nested = subdir.join(PLUGIN_SUBDIR);
            if has_descriptor(&nested) {
                found.push(nested);
            }
        }
    }

    found
}

fn has_descriptor(dir: &Path) -> bool {
    dir.join(DESCRIPTOR_FILENAME).is_file()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_descriptor(dir: &Path, name: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join(DESCRIPTOR_FILENAME),
            format!("[plugin]\nname = \"{name}\"\nversion = \"0.1.0\"\n"),
        )
        .unwrap();
    }

    #[test]
    fn test_find_direct_and_nested() {
        let dir = tempfile::tempdir().unwrap();
        write_descriptor(&dir.path().join("weather"), "weather");
        write_descriptor(&dir.path().join("repo").join(PLUGIN_SUBDIR), "repo");

        let paths = vec![dir.path().to_path_buf()];
        assert_eq!(
            find_plugin("weather", &paths),
            Some(dir.path().join("weather"))
        );
        assert_eq!(
            find_plugin("repo", &paths),
            Some(dir.path().join("repo").join(PLUGIN_SUBDIR))
        );
        assert_eq!(find_plugin("missing", &paths), None);
    }

    #[test]
    fn test_find_respects_search_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write_descriptor(&first.path().join("dup"), "dup");
        write_descriptor(&second.path().join("dup"), "dup");

        let found = find_plugin(
            "dup",
            &[second.path().to_path_buf(), first.path().to_path_buf()],
        );
        assert_eq!(found, Some(second.path().join("dup")));
    }

    #[test]
    fn test_plugin_dirs_lists_sorted_and_skips_files() {
        let dir = tempfile::tempdir().unwrap();
        write_descriptor(&dir.path().join("b"), "b");
        write_descriptor(&dir.path().join("a"), "a");
        fs::create_dir(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("not-a-plugin.txt"), "hello").unwrap();

        let found = plugin_dirs(&[dir.path().to_path_buf()]);
        assert_eq!(found, vec![dir.path().join("a"), dir.path().join("b")]);
    }

    #[test]
    fn test_plugin_dirs_nonexistent_path() {
        assert!(plugin_dirs(&[PathBuf::from("/nonexistent/path")]).is_empty());
    }
}
