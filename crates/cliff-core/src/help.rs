//! Help rendering.
//!
//! Layout is a collaborator of the core: the runner and the exit funnel only
//! need something that turns a topic listing or a command entry into text.
//! [`PlainHelp`] is the built-in renderer.

use std::fmt;

use crate::registry::CommandEntry;
use crate::theme::{roles, Theme};
use crate::topics::{ListedItem, Separator, TopicListing};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HelpSection {
    Usage,
    Arguments,
    Flags,
    Description,
}

impl HelpSection {
    /// Every section, in render order.
    pub const ALL: [HelpSection; 4] = [
        HelpSection::Usage,
        HelpSection::Arguments,
        HelpSection::Flags,
        HelpSection::Description,
    ];

    fn header(self) -> &'static str {
        match self {
            HelpSection::Usage => "USAGE",
            HelpSection::Arguments => "ARGUMENTS",
            HelpSection::Flags => "FLAGS",
            HelpSection::Description => "DESCRIPTION",
        }
    }
}

pub trait HelpRenderer: Send + Sync + fmt::Debug {
    /// Listing of a topic (or the root, for id `""`).
    fn render_topic(&self, listing: &TopicListing) -> String;

    /// Help for one command, limited to `sections`.
    fn render_command(&self, entry: &CommandEntry, sections: &[HelpSection]) -> String;
}

#[derive(Debug, Clone)]
pub struct PlainHelp {
    bin: String,
    separator: Separator,
    theme: Theme,
}

impl PlainHelp {
    pub fn new(bin: impl Into<String>, separator: Separator, theme: Theme) -> Self {
        Self {
            bin: bin.into(),
            separator,
            theme,
        }
    }

    fn header(&self, section: &str) -> String {
        self.theme.paint(roles::SECTION_HEADER, section)
    }

    fn prompt(&self) -> String {
        format!(
            "{} {}",
            self.theme.paint(roles::DOLLAR_SIGN, "$"),
            self.theme.paint(roles::BIN, &self.bin)
        )
    }

    fn rows(&self, role: &str, items: &[ListedItem]) -> String {
        let width = items
            .iter()
            .map(|i| self.separator.display_id(&i.id).chars().count())
            .max()
            .unwrap_or(0);

        items
            .iter()
            .map(|item| {
                let id = self.separator.display_id(&item.id);
                let painted = self.theme.paint(role, &id);
                match &item.description {
                    Some(description) => {
                        let pad = " ".repeat(width - id.chars().count());
                        let description = self.theme.paint(roles::DESCRIPTION, description);
                        format!("  {painted}{pad}  {description}")
                    }
                    None => format!("  {painted}"),
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn usage_line(&self, entry: &CommandEntry) -> String {
        if let Some(usage) = &entry.meta.usage {
            return usage.clone();
        }
        let mut parts = Vec::new();
        if !entry.id.is_empty() {
            parts.push(self.theme.paint(roles::COMMAND, &self.separator.display_id(&entry.id)));
        }
        for arg in &entry.meta.args {
            let name = arg.name.to_uppercase();
            parts.push(if arg.required { name } else { format!("[{name}]") });
        }
        if !entry.meta.flags.is_empty() {
            parts.push("[FLAGS]".to_string());
        }
        parts.join(" ")
    }

    fn section(&self, entry: &CommandEntry, section: HelpSection) -> Option<String> {
        let body = match section {
            HelpSection::Usage => {
                let usage = self.usage_line(entry);
                if usage.is_empty() {
                    format!("  {}", self.prompt())
                } else {
                    format!("  {} {usage}", self.prompt())
                }
            }
            HelpSection::Arguments => {
                if entry.meta.args.is_empty() {
                    return None;
                }
                let items: Vec<ListedItem> = entry
                    .meta
                    .args
                    .iter()
                    .map(|a| ListedItem {
                        id: a.name.to_uppercase(),
                        description: a.description.clone(),
                    })
                    .collect();
                self.rows(roles::FLAG, &items)
            }
            HelpSection::Flags => {
                if entry.meta.flags.is_empty() {
                    return None;
                }
                let items: Vec<ListedItem> = entry
                    .meta
                    .flags
                    .iter()
                    .map(|f| ListedItem {
                        id: match f.short {
                            Some(short) => format!("-{short}, --{}", f.name),
                            None => format!("    --{}", f.name),
                        },
                        description: f.description.clone(),
                    })
                    .collect();
                self.rows(roles::FLAG, &items)
            }
            HelpSection::Description => format!("  {}", entry.meta.description.as_deref()?),
        };
        Some(format!("{}\n{body}", self.header(section.header())))
    }
}

impl HelpRenderer for PlainHelp {
    fn render_topic(&self, listing: &TopicListing) -> String {
        let mut parts = Vec::new();

        if let Some(description) = &listing.description {
            parts.push(description.clone());
        }

        let usage = if listing.id.is_empty() {
            format!("  {} [COMMAND]", self.prompt())
        } else {
            let topic = self.theme.paint(roles::TOPIC, &self.separator.display_id(&listing.id));
            format!("  {} {topic}{}COMMAND", self.prompt(), self.separator.as_str())
        };
        parts.push(format!("{}\n{usage}", self.header("USAGE")));

        if !listing.subtopics.is_empty() {
            parts.push(format!(
                "{}\n{}",
                self.header("TOPICS"),
                self.rows(roles::TOPIC, &listing.subtopics)
            ));
        }
        if !listing.commands.is_empty() {
            parts.push(format!(
                "{}\n{}",
                self.header("COMMANDS"),
                self.rows(roles::COMMAND, &listing.commands)
            ));
        }

        format!("{}\n\n", parts.join("\n\n"))
    }

    fn render_command(&self, entry: &CommandEntry, sections: &[HelpSection]) -> String {
        let parts: Vec<String> = HelpSection::ALL
            .iter()
            .filter(|s| sections.contains(s))
            .filter_map(|s| self.section(entry, *s))
            .collect();
        format!("{}\n\n", parts.join("\n\n"))
    }
}
