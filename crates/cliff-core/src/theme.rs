//! Help text colors.
//!
//! A theme file names the selected palette and maps semantic roles to colors:
//!
//! ```json
//! { "selected": "dark", "themes": { "dark": { "sectionHeader": "cyanBright", "bin": "#ff8800" } } }
//! ```
//!
//! Unknown or malformed colors are dropped; an unstyled role renders as plain text.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anstyle::{AnsiColor, Color, RgbColor, Style};
use serde::Deserialize;

/// Role names looked up by the help renderer.
pub mod roles {
    pub const SECTION_HEADER: &str = "sectionHeader";
    pub const DOLLAR_SIGN: &str = "dollarSign";
    pub const BIN: &str = "bin";
    pub const COMMAND: &str = "command";
    pub const TOPIC: &str = "topic";
    pub const FLAG: &str = "flag";
    pub const DESCRIPTION: &str = "commandSummary";
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThemeFile {
    #[serde(default)]
    pub selected: Option<String>,
    #[serde(default)]
    pub themes: BTreeMap<String, BTreeMap<String, String>>,
}

/// Resolved role-to-style mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Theme {
    styles: BTreeMap<String, Style>,
}

impl Theme {
    pub fn parse(file: &ThemeFile) -> Self {
        let Some(palette) = file.selected.as_ref().and_then(|s| file.themes.get(s)) else {
            return Self::default();
        };
        let styles = palette
            .iter()
            .filter_map(|(role, value)| match parse_color(value) {
                Some(color) => Some((role.clone(), Style::new().fg_color(Some(color)))),
                None => {
                    tracing::debug!(role = %role, value = %value, "Ignoring invalid theme color");
                    None
                }
            })
            .collect();
        Self { styles }
    }

    pub fn load(path: &Path) -> Result<Self, ThemeError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ThemeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: ThemeFile =
            serde_json::from_str(&contents).map_err(|source| ThemeError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::parse(&file))
    }

    pub fn style(&self, role: &str) -> Option<Style> {
        self.styles.get(role).copied()
    }

    /// `text` styled for `role`, or unchanged when the role has no color.
    pub fn paint(&self, role: &str, text: &str) -> String {
        colorize(self.style(role), text)
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

pub fn colorize(style: Option<Style>, text: &str) -> String {
    match style {
        Some(style) => format!("{style}{text}{style:#}"),
        None => text.to_string(),
    }
}

/// A standard color name (`red`, `cyanBright`, `gray`) or a hex value.
pub fn parse_color(value: &str) -> Option<Color> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        return parse_hex(hex).map(Color::Rgb);
    }
    let ansi = match value {
        "black" => AnsiColor::Black,
        "red" => AnsiColor::Red,
        "green" => AnsiColor::Green,
        "yellow" => AnsiColor::Yellow,
        "blue" => AnsiColor::Blue,
        "magenta" => AnsiColor::Magenta,
        "cyan" => AnsiColor::Cyan,
        "white" => AnsiColor::White,
        "gray" | "grey" | "blackBright" => AnsiColor::BrightBlack,
        "redBright" => AnsiColor::BrightRed,
        "greenBright" => AnsiColor::BrightGreen,
        "yellowBright" => AnsiColor::BrightYellow,
        "blueBright" => AnsiColor::BrightBlue,
        "magentaBright" => AnsiColor::BrightMagenta,
        "cyanBright" => AnsiColor::BrightCyan,
        "whiteBright" => AnsiColor::BrightWhite,
        _ => return None,
    };
    Some(Color::Ansi(ansi))
}

fn parse_hex(hex: &str) -> Option<RgbColor> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match hex.len() {
        3 => {
            let mut digits = hex.chars().map(|c| c.to_string().repeat(2));
            let r = channel(&digits.next()?)?;
            let g = channel(&digits.next()?)?;
            let b = channel(&digits.next()?)?;
            Some(RgbColor(r, g, b))
        }
        6 => Some(RgbColor(
            channel(&hex[0..2])?,
            channel(&hex[2..4])?,
            channel(&hex[4..6])?,
        )),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ThemeError {
    #[error("failed to read theme {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse theme {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}
