//! Topic tree and separator handling.
//!
//! Command ids are stored canonically with `:` between segments. The
//! configured [`Separator`] only controls how user input is split and how ids
//! are displayed.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::descriptor::TopicDecl;
use crate::plugins::Plugin;
use crate::registry::CommandRegistry;

/// Canonical separator between topic segments.
pub const CANONICAL_SEPARATOR: char = ':';

/// Separator between topic segments as typed and displayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Separator {
    #[default]
    Colon,
    Space,
}

impl Separator {
    pub fn as_str(self) -> &'static str {
        match self {
            Separator::Colon => ":",
            Separator::Space => " ",
        }
    }

    /// Render a canonical id for display.
    pub fn display_id(self, id: &str) -> String {
        match self {
            Separator::Colon => id.to_string(),
            Separator::Space => id.replace(CANONICAL_SEPARATOR, " "),
        }
    }

    /// Split a user-supplied identifier into its topic path.
    ///
    /// Colon-joined ids are accepted under both separators.
    pub fn split(self, identifier: &str) -> Vec<&str> {
        let parts: Vec<&str> = match self {
            Separator::Colon => identifier.split(CANONICAL_SEPARATOR).collect(),
            Separator::Space => identifier
                .split(|c: char| c == CANONICAL_SEPARATOR || c == ' ')
                .collect(),
        };
        parts.into_iter().filter(|s| !s.is_empty()).collect()
    }

    /// Canonical id for a user-supplied identifier.
    pub fn canonical(self, identifier: &str) -> String {
        self.split(identifier).join(":")
    }
}

impl fmt::Display for Separator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Separator {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            ":" => Ok(Separator::Colon),
            " " => Ok(Separator::Space),
            other => Err(format!(
                "invalid topic separator '{other}' (expected ':' or ' ')"
            )),
        }
    }
}

impl From<Separator> for String {
    fn from(value: Separator) -> Self {
        value.as_str().to_string()
    }
}

/// Parent id of a canonical id, `""` for top-level ids.
pub(crate) fn parent_id(id: &str) -> &str {
    id.rsplit_once(CANONICAL_SEPARATOR)
        .map(|(parent, _)| parent)
        .unwrap_or("")
}

/// One node of the topic tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: String,
    pub description: Option<String>,
    pub hidden: bool,
    /// Child topic ids, declared ones first in declaration order.
    pub subtopics: Vec<String>,
    declared: bool,
}

impl Topic {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            description: None,
            hidden: false,
            subtopics: Vec::new(),
            declared: false,
        }
    }
}

/// Topics declared by plugins plus every namespace implied by a command id.
#[derive(Debug, Clone, Default)]
pub struct TopicTree {
    topics: IndexMap<String, Topic>,
}

/// A rendered-ready view of one topic: visible subtopics and direct commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicListing {
    /// Canonical topic id; `""` for the root listing.
    pub id: String,
    pub description: Option<String>,
    pub subtopics: Vec<ListedItem>,
    pub commands: Vec<ListedItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedItem {
    pub id: String,
    pub description: Option<String>,
}

impl TopicTree {
    /// Build the tree. Declarations from higher-ranked plugins win.
    pub fn build(plugins: &[Plugin], registry: &CommandRegistry) -> Self {
        let mut tree = Self::default();

        let mut ranked: Vec<&Plugin> = plugins.iter().collect();
        ranked.sort_by_key(|p| p.rank());
        for plugin in ranked {
            tree.declare("", &plugin.descriptor.topics);
        }

        for id in registry.ids() {
            tree.imply(id);
        }
        for (alias, _) in registry.aliases() {
            if registry.alias_target(alias).is_some() {
                tree.imply(alias);
            }
        }

        tree
    }

    fn declare(&mut self, parent: &str, decls: &IndexMap<String, TopicDecl>) {
        for (name, decl) in decls {
            let id = if parent.is_empty() {
                name.clone()
            } else {
                format!("{parent}:{name}")
            };
            self.ensure(&id);
            if let Some(topic) = self.topics.get_mut(&id) {
                if !topic.declared {
                    topic.declared = true;
                    topic.hidden = decl.hidden;
                    topic.description.clone_from(&decl.description);
                }
            }
            self.declare(&id, &decl.subtopics);
        }
    }

    /// Register every proper prefix of a command id as a topic.
    fn imply(&mut self, command_id: &str) {
        let segments: Vec<&str> = command_id.split(CANONICAL_SEPARATOR).collect();
        for end in 1..segments.len() {
            self.ensure(&segments[..end].join(":"));
        }
    }

    fn ensure(&mut self, id: &str) {
        if id.is_empty() || self.topics.contains_key(id) {
            return;
        }
        let parent = parent_id(id);
        if !parent.is_empty() {
            self.ensure(parent);
        }
        self.topics.insert(id.to_string(), Topic::new(id));
        if let Some(parent_topic) = self.topics.get_mut(parent) {
            parent_topic.subtopics.push(id.to_string());
        }
    }

    pub fn get(&self, id: &str) -> Option<&Topic> {
        self.topics.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.topics.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Top-level topics in declaration/discovery order.
    pub fn roots(&self) -> impl Iterator<Item = &Topic> {
        self.topics
            .values()
            .filter(|t| !t.id.contains(CANONICAL_SEPARATOR))
    }

    /// Longest proper ancestor of `id` that is a known topic.
    pub fn nearest_ancestor(&self, id: &str) -> Option<&Topic> {
        let mut current = id;
        while let Some((parent, _)) = current.rsplit_once(CANONICAL_SEPARATOR) {
            if let Some(topic) = self.topics.get(parent) {
                return Some(topic);
            }
            current = parent;
        }
        None
    }

    /// Listing for a topic id (`""` is the root). Hidden entries are skipped.
    pub fn listing(&self, id: &str, registry: &CommandRegistry) -> Option<TopicListing> {
        let (description, subtopic_ids): (Option<String>, Vec<&str>) = if id.is_empty() {
            (None, self.roots().map(|t| t.id.as_str()).collect())
        } else {
            let topic = self.topics.get(id)?;
            (
                topic.description.clone(),
                topic.subtopics.iter().map(String::as_str).collect(),
            )
        };

        let subtopics = subtopic_ids
            .into_iter()
            .filter_map(|sub| self.topics.get(sub))
            .filter(|t| !t.hidden)
            .map(|t| ListedItem {
                id: t.id.clone(),
                description: t.description.clone(),
            })
            .collect();

        let mut commands: Vec<ListedItem> = registry
            .entries()
            .filter(|e| !e.id.is_empty() && !e.meta.hidden && parent_id(&e.id) == id)
            .map(|e| ListedItem {
                id: e.id.clone(),
                description: e.meta.description.clone(),
            })
            .collect();

        for (alias, target) in registry.aliases() {
            if parent_id(alias) != id {
                continue;
            }
            if let Some(entry) = registry.get(target).filter(|e| !e.meta.hidden) {
                commands.push(ListedItem {
                    id: alias.to_string(),
                    description: entry.meta.description.clone(),
                });
            }
        }
        commands.sort_by(|a, b| a.id.cmp(&b.id));

        Some(TopicListing {
            id: id.to_string(),
            description,
            subtopics,
            commands,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{CommandMeta, TargetRef};
    use crate::plugins::test_support::plugin_with;
    use crate::plugins::PluginType;
    use crate::registry::CommandEntry;

    #[test]
    fn test_separator_canonical_colon() {
        assert_eq!(Separator::Colon.canonical("foo:bar"), "foo:bar");
        assert_eq!(Separator::Colon.canonical("foo bar"), "foo bar");
        assert_eq!(Separator::Colon.canonical(":foo::bar:"), "foo:bar");
    }

    #[test]
    fn test_separator_canonical_space() {
        assert_eq!(Separator::Space.canonical("foo bar"), "foo:bar");
        assert_eq!(Separator::Space.canonical("foo:bar"), "foo:bar");
    }

    #[test]
    fn test_separator_display() {
        assert_eq!(Separator::Space.display_id("foo:bar:baz"), "foo bar baz");
        assert_eq!(Separator::Colon.display_id("foo:bar"), "foo:bar");
    }

    #[test]
    fn test_separator_rejects_other_values() {
        assert!(Separator::try_from("/".to_string()).is_err());
        assert_eq!(Separator::try_from(" ".to_string()), Ok(Separator::Space));
    }

    #[test]
    fn test_parent_id() {
        assert_eq!(parent_id("foo:bar:baz"), "foo:bar");
        assert_eq!(parent_id("foo"), "");
    }

    #[test]
    fn test_implied_topics_are_linked() {
        let mut tree = TopicTree::default();
        tree.imply("a:b:c");
        tree.imply("a:d");
        assert!(tree.contains("a"));
        assert!(tree.contains("a:b"));
        assert!(!tree.contains("a:b:c"));
        assert_eq!(tree.get("a").unwrap().subtopics, vec!["a:b"]);
        assert_eq!(tree.nearest_ancestor("a:b:zzz").unwrap().id, "a:b");
        assert_eq!(tree.nearest_ancestor("x:y").map(|t| t.id.as_str()), None);
    }

    #[test]
    fn test_only_resolvable_aliases_imply_topics() {
        let entry = |id: &str| CommandEntry {
            id: id.to_string(),
            plugin_type: PluginType::Root,
            target: TargetRef::new("root", format!("{}.sh", id.replace(':', "/")), None),
            meta: CommandMeta::default(),
        };
        let mut plugin = plugin_with("root", PluginType::Root, 0, vec![entry("hello")]);
        let aliases = &mut plugin.descriptor.aliases;
        aliases.insert("greet:loudly".to_string(), "hello".to_string());
        aliases.insert("x:y".to_string(), "nowhere".to_string());

        let plugins = vec![plugin];
        let registry = CommandRegistry::build(&plugins);
        let tree = TopicTree::build(&plugins, &registry);

        assert!(tree.contains("greet"));
        assert!(!tree.contains("x"));
        let roots: Vec<&str> = tree.roots().map(|t| t.id.as_str()).collect();
        assert_eq!(roots, vec!["greet"]);
    }

    #[test]
    fn test_declared_subtopics_keep_declaration_order() {
        let toml_str = r#"
[zeta]
description = "last alphabetically, first declared"
[zeta.subtopics.second]
[zeta.subtopics.first]
[alpha]
hidden = true
"#;
        let decls: IndexMap<String, TopicDecl> = toml::from_str(toml_str).unwrap();
        let mut tree = TopicTree::default();
        tree.declare("", &decls);

        let roots: Vec<&str> = tree.roots().map(|t| t.id.as_str()).collect();
        assert_eq!(roots, vec!["zeta", "alpha"]);
        assert_eq!(
            tree.get("zeta").unwrap().subtopics,
            vec!["zeta:second", "zeta:first"]
        );
        assert!(tree.get("alpha").unwrap().hidden);
    }
}
