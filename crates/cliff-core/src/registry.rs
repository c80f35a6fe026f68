//! Merged command registry across every loaded plugin.
//!
//! When two plugins provide the same id the higher-ranked plugin wins (see
//! [`Plugin::rank`]); the loser is shadowed, logged at debug, and otherwise
//! invisible.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::command::{CommandMeta, TargetRef};
use crate::plugins::{Plugin, PluginType};

/// One command as known to resolution, listings, and the manifest cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandEntry {
    /// Canonical `:`-joined id. `""` is the root command.
    pub id: String,
    pub plugin_type: PluginType,
    pub target: TargetRef,
    #[serde(flatten)]
    pub meta: CommandMeta,
}

impl CommandEntry {
    pub fn plugin(&self) -> &str {
        &self.target.plugin
    }
}

#[derive(Debug, Clone, Default)]
pub struct CommandRegistry {
    commands: IndexMap<String, CommandEntry>,
    /// Alias id to the id it substitutes.
    aliases: IndexMap<String, String>,
}

impl CommandRegistry {
    pub fn build(plugins: &[Plugin]) -> Self {
        let mut registry = Self::default();

        let loaded: Vec<&str> = plugins.iter().map(|p| p.name.as_str()).collect();
        let mut ranked: Vec<&Plugin> = plugins.iter().collect();
        ranked.sort_by_key(|p| p.rank());

        for plugin in &ranked {
            for entry in &plugin.commands {
                // Placeholders for not-yet-loaded JIT plugins give way to the
                // plugin's own entries once it is loaded.
                let placeholder = entry.plugin_type == PluginType::Jit
                    && entry.plugin() != plugin.name
                    && loaded.contains(&entry.plugin());
                if placeholder {
                    continue;
                }
                registry.insert(&plugin.name, entry.clone());
            }
        }

        for plugin in &ranked {
            let separator = plugin.descriptor.topic_separator;
            let command_aliases = plugin
                .commands
                .iter()
                .flat_map(|e| e.meta.aliases.iter().map(move |a| (a.as_str(), e.id.as_str())));
            let declared = plugin
                .descriptor
                .aliases
                .iter()
                .map(|(a, t)| (a.as_str(), t.as_str()));

            for (alias, target) in command_aliases.chain(declared) {
                let alias = separator.canonical(alias);
                let target = separator.canonical(target);
                if registry.commands.contains_key(&alias) {
                    tracing::debug!(plugin = %plugin.name, alias = %alias, "Alias shadowed by a command with the same id");
                    continue;
                }
                registry.aliases.entry(alias).or_insert(target);
            }
        }

        tracing::debug!(
            commands = registry.commands.len(),
            aliases = registry.aliases.len(),
            "Built command registry"
        );
        registry
    }

    fn insert(&mut self, provider: &str, entry: CommandEntry) {
        match self.commands.get(&entry.id) {
            Some(existing) => {
                tracing::debug!(
                    id = %entry.id,
                    winner = %existing.plugin(),
                    shadowed = %provider,
                    "Command shadowed by a higher-ranked plugin"
                );
            }
            None => {
                self.commands.insert(entry.id.clone(), entry);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&CommandEntry> {
        self.commands.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.commands.contains_key(id)
    }

    /// Command id an alias substitutes.
    ///
    /// Substitution is one step only: an alias whose target is itself an alias
    /// (or anything else that is not a command) yields `None`.
    pub fn alias_target(&self, alias: &str) -> Option<&str> {
        self.aliases
            .get(alias)
            .map(String::as_str)
            .filter(|target| self.commands.contains_key(*target))
    }

    /// Every alias that substitutes `id`.
    pub fn aliases_of<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.aliases
            .iter()
            .filter(move |(_, target)| target.as_str() == id)
            .map(|(alias, _)| alias.as_str())
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = &CommandEntry> {
        self.commands.values()
    }

    /// `(alias, target)` pairs, including unresolvable ones.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(a, t)| (a.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugins::test_support::plugin_with;

    fn entry(plugin: &str, plugin_type: PluginType, id: &str) -> CommandEntry {
        CommandEntry {
            id: id.to_string(),
            plugin_type,
            target: TargetRef::new(plugin, format!("commands/{id}.sh"), None),
            meta: CommandMeta::default(),
        }
    }

    #[test]
    fn test_higher_ranked_plugin_wins() {
        let user = plugin_with("user-a", PluginType::User, 1, vec![entry("user-a", PluginType::User, "hello")]);
        let root = plugin_with("root", PluginType::Root, 0, vec![entry("root", PluginType::Root, "hello")]);
        let dev = plugin_with("dev", PluginType::Dev, 2, vec![entry("dev", PluginType::Dev, "hello")]);

        // Input order must not matter.
        let registry = CommandRegistry::build(&[dev, user, root]);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("hello").unwrap().plugin(), "root");
    }

    #[test]
    fn test_same_type_ties_break_on_load_index() {
        let a = plugin_with("a", PluginType::User, 1, vec![entry("a", PluginType::User, "x")]);
        let b = plugin_with("b", PluginType::User, 2, vec![entry("b", PluginType::User, "x")]);
        let registry = CommandRegistry::build(&[b, a]);
        assert_eq!(registry.get("x").unwrap().plugin(), "a");
    }

    #[test]
    fn test_aliases_do_not_chain() {
        let mut root = plugin_with("root", PluginType::Root, 0, vec![entry("root", PluginType::Root, "foo:bar")]);
        root.descriptor
            .aliases
            .insert("foo:alias".to_string(), "foo:bar".to_string());
        root.descriptor
            .aliases
            .insert("foo:alias2".to_string(), "foo:alias".to_string());

        let registry = CommandRegistry::build(&[root]);
        assert_eq!(registry.alias_target("foo:alias"), Some("foo:bar"));
        assert_eq!(registry.alias_target("foo:alias2"), None);
        assert_eq!(registry.aliases_of("foo:bar").collect::<Vec<_>>(), vec!["foo:alias"]);
    }

    #[test]
    fn test_command_meta_aliases_are_registered() {
        let mut hello = entry("root", PluginType::Root, "hello");
        hello.meta.aliases = vec!["hi".to_string()];
        let root = plugin_with("root", PluginType::Root, 0, vec![hello]);
        let registry = CommandRegistry::build(&[root]);
        assert_eq!(registry.alias_target("hi"), Some("hello"));
    }

    #[test]
    fn test_alias_never_shadows_command() {
        let mut root = plugin_with(
            "root",
            PluginType::Root,
            0,
            vec![
                entry("root", PluginType::Root, "a"),
                entry("root", PluginType::Root, "b"),
            ],
        );
        root.descriptor.aliases.insert("a".to_string(), "b".to_string());
        let registry = CommandRegistry::build(&[root]);
        assert_eq!(registry.alias_target("a"), None);
        assert!(registry.contains("a"));
    }

    #[test]
    fn test_jit_placeholder_yields_to_loaded_plugin() {
        let placeholder = entry("weather", PluginType::Jit, "weather:today");
        let root = plugin_with("root", PluginType::Root, 0, vec![placeholder.clone()]);

        let before = CommandRegistry::build(std::slice::from_ref(&root));
        assert_eq!(before.get("weather:today").unwrap().plugin_type, PluginType::Jit);

        let mut real = entry("weather", PluginType::Jit, "weather:today");
        real.meta.description = Some("real".to_string());
        let weather = plugin_with("weather", PluginType::Jit, 1, vec![real]);
        let after = CommandRegistry::build(&[root, weather]);
        assert_eq!(
            after.get("weather:today").unwrap().meta.description.as_deref(),
            Some("real")
        );
    }

    #[test]
    fn test_entry_serializes_flat_camel_case() {
        let mut e = entry("root", PluginType::Root, "foo:bar");
        e.meta.hidden = true;
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["pluginType"], "root");
        assert_eq!(json["hidden"], true);
        assert_eq!(json["target"]["target"], "commands/foo:bar.sh");
    }
}
