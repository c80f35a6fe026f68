//! Explicit strategy: one file maps command ids to targets.
//!
//! The file is TOML, or JSON when it ends in `.json`. The export named by the
//! discovery identifier must be a flat table of id to `path[#Export]` strings:
//!
//! ```toml
//! [default]
//! "hello" = "commands/hello.sh"
//! "hello:world" = "commands/hello/world.sh"
//! ```

use std::path::Path;

use serde_json::Value;

use super::{CommandDiscovery, DiscoveryError};
use crate::command::TargetRef;
use crate::topics::Separator;

pub(super) fn read(
    plugin: &str,
    root: &Path,
    discovery: &CommandDiscovery,
    separator: Separator,
) -> Result<Vec<(String, TargetRef)>, DiscoveryError> {
    let path = root.join(&discovery.target);
    let identifier = discovery.identifier();

    let contents = std::fs::read_to_string(&path).map_err(|source| DiscoveryError::Io {
        path: path.clone(),
        source,
    })?;
    let document = parse_document(&path, &contents)?;

    let malformed = |reason: String| DiscoveryError::MalformedExport {
        path: path.clone(),
        identifier: identifier.to_string(),
        reason,
    };

    let export = document
        .get(identifier)
        .ok_or_else(|| malformed("export not found".to_string()))?;
    let Value::Object(table) = export else {
        return Err(malformed("export is not a table of commands".to_string()));
    };

    let mut found = Vec::with_capacity(table.len());
    for (key, value) in table {
        let Value::String(reference) = value else {
            return Err(malformed(format!(
                "value for '{key}' is not a command reference"
            )));
        };
        found.push((separator.canonical(key), TargetRef::parse(plugin, reference)));
    }

    Ok(found)
}

fn parse_document(path: &Path, contents: &str) -> Result<Value, DiscoveryError> {
    let parse_error = |message: String| DiscoveryError::Parse {
        path: path.to_path_buf(),
        message,
    };

    if path.extension().is_some_and(|ext| ext == "json") {
        return serde_json::from_str(contents).map_err(|e| parse_error(e.to_string()));
    }

    let table: toml::Table = toml::from_str(contents).map_err(|e| parse_error(e.to_string()))?;
    serde_json::to_value(table).map_err(|e| parse_error(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, name: &str, contents: &str) {
        fs::write(root.join(name), contents).unwrap();
    }

    #[test]
    fn test_read_default_export() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "commands.toml",
            r#"
[default]
"foo:bar" = "./commands/foo/bar.sh"
"foo:baz" = "lib.rs#Baz"
"#,
        );

        let found = read(
            "p",
            dir.path(),
            &CommandDiscovery::explicit("commands.toml", None),
            Separator::Colon,
        )
        .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].0, "foo:bar");
        assert_eq!(found[0].1, TargetRef::new("p", "commands/foo/bar.sh", None));
        assert_eq!(found[1].1.export.as_deref(), Some("Baz"));
    }

    #[test]
    fn test_read_named_export_json() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "commands.json",
            r#"{"MY_COMMANDS": {"hello": "commands/hello.sh"}, "default": {}}"#,
        );

        let discovery = CommandDiscovery::explicit("commands.json", Some("MY_COMMANDS".into()));
        let found = read("p", dir.path(), &discovery, Separator::Colon).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, "hello");
    }

    #[test]
    fn test_space_separated_keys_are_canonicalized() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "c.toml", "[default]\n\"foo bar\" = \"x.sh\"\n");
        let found = read(
            "p",
            dir.path(),
            &CommandDiscovery::explicit("c.toml", None),
            Separator::Space,
        )
        .unwrap();
        assert_eq!(found[0].0, "foo:bar");
    }

    #[test]
    fn test_missing_export_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "c.toml", "[other]\nhello = \"x.sh\"\n");
        let err = read(
            "p",
            dir.path(),
            &CommandDiscovery::explicit("c.toml", None),
            Separator::Colon,
        )
        .unwrap_err();
        assert!(matches!(err, DiscoveryError::MalformedExport { .. }));
        assert!(err.to_string().contains("export not found"));
    }

    #[test]
    fn test_nested_values_are_malformed() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "c.toml", "[default.foo]\nbar = \"x.sh\"\n");
        let err = read(
            "p",
            dir.path(),
            &CommandDiscovery::explicit("c.toml", None),
            Separator::Colon,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not a command reference"));
    }

    #[test]
    fn test_non_table_export_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "c.toml", "default = \"x.sh\"\n");
        let err = read(
            "p",
            dir.path(),
            &CommandDiscovery::explicit("c.toml", None),
            Separator::Colon,
        )
        .unwrap_err();
        assert!(err.to_string().contains("not a table"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read(
            "p",
            dir.path(),
            &CommandDiscovery::explicit("nope.toml", None),
            Separator::Colon,
        )
        .unwrap_err();
        assert!(matches!(err, DiscoveryError::Io { .. }));
    }
}
