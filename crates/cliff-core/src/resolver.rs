//! Turning user input into a command id.
//!
//! Lookup order for one candidate id: exact command, then alias (a single
//! substitution; aliases never chain), then topic. A topic resolves to a
//! plugin's default command when that command lives directly under it; when
//! several plugins declare one for the same topic the highest-ranked wins.
//!
//! With the `:` separator the id is `argv[0]`. With the space separator the
//! longest run of leading words that names a command wins.

use indexmap::IndexMap;

use crate::plugins::Plugin;
use crate::registry::CommandRegistry;
use crate::topics::{parent_id, Separator, TopicTree, CANONICAL_SEPARATOR};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A runnable command.
    Command {
        id: String,
        /// Alias ids that were substituted to reach `id`.
        aliases: Vec<String>,
        argv: Vec<String>,
    },
    /// A topic with no command of its own.
    Topic { id: String, argv: Vec<String> },
    NotFound {
        id: String,
        /// Deepest existing topic above `id`.
        nearest_topic: Option<String>,
        argv: Vec<String>,
    },
}

impl Resolution {
    pub fn id(&self) -> &str {
        match self {
            Resolution::Command { id, .. }
            | Resolution::Topic { id, .. }
            | Resolution::NotFound { id, .. } => id,
        }
    }

    /// Arguments left after the id.
    pub fn argv(&self) -> &[String] {
        match self {
            Resolution::Command { argv, .. }
            | Resolution::Topic { argv, .. }
            | Resolution::NotFound { argv, .. } => argv,
        }
    }

    pub fn is_command(&self) -> bool {
        matches!(self, Resolution::Command { .. })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    registry: &'a CommandRegistry,
    topics: &'a TopicTree,
    separator: Separator,
    defaults: &'a DefaultCommands,
}

impl<'a> Resolver<'a> {
    pub fn new(
        registry: &'a CommandRegistry,
        topics: &'a TopicTree,
        separator: Separator,
        defaults: &'a DefaultCommands,
    ) -> Self {
        Self {
            registry,
            topics,
            separator,
            defaults,
        }
    }

    /// Resolve a single identifier such as `foo:bar` (or `foo bar`).
    pub fn resolve(&self, identifier: &str) -> Resolution {
        let id = self.separator.canonical(identifier);
        self.lookup(id, Vec::new())
    }

    /// Resolve the leading words of `argv`.
    pub fn resolve_argv(&self, argv: &[String]) -> Resolution {
        let words = argv.iter().take_while(|a| !a.starts_with('-')).count();
        if words == 0 {
            return self.lookup(String::new(), argv.to_vec());
        }

        match self.separator {
            Separator::Colon => {
                let id = self.separator.canonical(&argv[0]);
                self.lookup(id, argv[1..].to_vec())
            }
            Separator::Space => self.resolve_words(argv, words),
        }
    }

    fn resolve_words(&self, argv: &[String], words: usize) -> Resolution {
        let candidate = |n: usize| self.separator.canonical(&argv[..n].join(" "));

        for n in (1..=words).rev() {
            let id = candidate(n);
            if self.registry.contains(&id) || self.registry.alias_target(&id).is_some() {
                return self.lookup(id, argv[n..].to_vec());
            }
        }
        for n in (1..=words).rev() {
            let id = candidate(n);
            if self.topics.contains(&id) {
                // One word past the deepest topic is what the user meant to run.
                if n < words {
                    let id = candidate(n + 1);
                    return self.lookup(id, argv[n + 1..].to_vec());
                }
                return self.lookup(id, argv[n..].to_vec());
            }
        }
        self.lookup(candidate(1), argv[1..].to_vec())
    }

    fn lookup(&self, id: String, argv: Vec<String>) -> Resolution {
        if self.registry.contains(&id) {
            return Resolution::Command {
                id,
                aliases: Vec::new(),
                argv,
            };
        }
        if let Some(target) = self.registry.alias_target(&id) {
            tracing::debug!(alias = %id, target, "Resolved alias");
            return Resolution::Command {
                id: target.to_string(),
                aliases: vec![id],
                argv,
            };
        }
        if id.is_empty() || self.topics.contains(&id) {
            if let Some(default) = self.default_for(&id) {
                tracing::debug!(topic = %id, command = default, "Using default command");
                return Resolution::Command {
                    id: default.to_string(),
                    aliases: Vec::new(),
                    argv,
                };
            }
            return Resolution::Topic { id, argv };
        }

        let nearest_topic = self.topics.nearest_ancestor(&id).map(|t| t.id.clone());
        tracing::debug!(id = %id, ?nearest_topic, "Command not found");
        Resolution::NotFound {
            id,
            nearest_topic,
            argv,
        }
    }

    fn default_for(&self, topic: &str) -> Option<&'a str> {
        self.defaults.get(topic)
    }
}

/// Default command per topic, keyed by topic id (`""` for the root).
#[derive(Debug, Clone, Default)]
pub struct DefaultCommands {
    by_topic: IndexMap<String, String>,
}

impl DefaultCommands {
    /// Collect `default-command` from every plugin.
    ///
    /// A default only counts when it names a command in `registry`. The
    /// highest-ranked plugin's default wins for each topic.
    pub fn build(plugins: &[Plugin], registry: &CommandRegistry) -> Self {
        let mut ranked: Vec<&Plugin> = plugins.iter().collect();
        ranked.sort_by_key(|p| p.rank());

        let mut by_topic = IndexMap::new();
        for plugin in ranked {
            let Some(default) = plugin.descriptor.default_command.as_deref() else {
                continue;
            };
            if !registry.contains(default) {
                tracing::debug!(plugin = %plugin.name, command = default, "Ignoring default command that is not registered");
                continue;
            }
            by_topic
                .entry(topic_of(default).to_string())
                .or_insert_with(|| default.to_string());
        }
        Self { by_topic }
    }

    /// Default command for `topic`.
    pub fn get(&self, topic: &str) -> Option<&str> {
        self.by_topic.get(topic).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_topic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_topic.is_empty()
    }
}

/// Topic a command lives directly under; `""` for top-level commands.
fn topic_of(id: &str) -> &str {
    if id.contains(CANONICAL_SEPARATOR) {
        parent_id(id)
    } else {
        ""
    }
}
