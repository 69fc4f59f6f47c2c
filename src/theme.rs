//! Color themes for highlighted output
//!
//! Provides YAML-based themes with compile-time embedded built-ins and
//! user-defined themes from the config directory.
//!
//! Theme loading priority:
//! 1. User config: `~/.config/xmlcolor/themes/{id}.yaml`
//! 2. Embedded: Built-in themes compiled into binary

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::highlight::ColorClass;

// Embed theme YAML files at compile time
pub const CLASSIC_YAML: &str = include_str!("../themes/classic.yaml");
pub const DARK_YAML: &str = include_str!("../themes/dark.yaml");

/// A built-in theme entry
pub struct BuiltinTheme {
    /// Stable identifier for config (e.g. "classic", "dark")
    pub id: &'static str,
    /// Embedded YAML content
    pub yaml: &'static str,
}

/// Registry of all built-in themes
pub const BUILTIN_THEMES: &[BuiltinTheme] = &[
    BuiltinTheme {
        id: "classic",
        yaml: CLASSIC_YAML,
    },
    BuiltinTheme {
        id: "dark",
        yaml: DARK_YAML,
    },
];

/// Load a theme from a YAML file
pub fn from_file(path: &Path) -> Result<Theme, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read theme file {}: {}", path.display(), e))?;
    Theme::from_yaml(&content)
}

/// Load theme by id with priority: user → builtin
pub fn load_theme(id: &str) -> Result<Theme, String> {
    if let Some(user_dir) = crate::config_paths::themes_dir() {
        let user_path = user_dir.join(format!("{}.yaml", id));
        if user_path.exists() {
            tracing::info!("Loading user theme from {}", user_path.display());
            return from_file(&user_path);
        }
    }

    tracing::debug!("Loading builtin theme: {}", id);
    Theme::from_builtin(id)
}

/// RGBA color (0-255 per channel)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Create a new color from RGB values (alpha defaults to 255)
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse `#RRGGBB` or `#RRGGBBAA`
    pub fn from_hex(s: &str) -> Result<Self, String> {
        let s = s.trim_start_matches('#');
        let channel = |range: std::ops::Range<usize>| {
            s.get(range)
                .ok_or_else(|| format!("Invalid color format: {}", s))
                .and_then(|hex| u8::from_str_radix(hex, 16).map_err(|e| e.to_string()))
        };
        match s.len() {
            6 => Ok(Color::rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
            8 => Ok(Color {
                r: channel(0..2)?,
                g: channel(2..4)?,
                b: channel(4..6)?,
                a: channel(6..8)?,
            }),
            _ => Err(format!("Invalid color format: {}", s)),
        }
    }
}

/// Raw theme data as parsed from YAML
#[derive(Debug, Clone, Deserialize)]
pub struct ThemeData {
    pub version: u32,
    pub name: String,
    pub colors: ThemeColorsData,
}

/// One hex color per [`ColorClass`]
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ThemeColorsData {
    pub delimiter: String,
    pub element_name: String,
    pub attribute_name: String,
    pub attribute_value: String,
    pub comment: String,
}

/// Resolved theme
#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    pub name: String,
    colors: HashMap<ColorClass, Color>,
}

impl Default for Theme {
    fn default() -> Self {
        // The embedded classic theme is covered by tests
        Self::from_yaml(CLASSIC_YAML).unwrap_or_else(|_| Self {
            name: "Classic".to_string(),
            colors: HashMap::new(),
        })
    }
}

impl Theme {
    /// Parse a theme from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, String> {
        let data: ThemeData =
            serde_yaml::from_str(yaml).map_err(|e| format!("YAML parse error: {}", e))?;
        Self::from_data(data)
    }

    /// Load a built-in theme by id
    pub fn from_builtin(id: &str) -> Result<Self, String> {
        let entry = BUILTIN_THEMES
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| format!("Unknown theme id: {}", id))?;
        Theme::from_yaml(entry.yaml)
    }

    /// Convert raw theme data to resolved theme
    pub fn from_data(data: ThemeData) -> Result<Self, String> {
        let c = &data.colors;
        let colors = [
            (ColorClass::Delimiter, &c.delimiter),
            (ColorClass::ElementName, &c.element_name),
            (ColorClass::AttributeName, &c.attribute_name),
            (ColorClass::AttributeValue, &c.attribute_value),
            (ColorClass::Comment, &c.comment),
        ]
        .into_iter()
        .map(|(class, hex)| {
            Color::from_hex(hex)
                .map(|color| (class, color))
                .map_err(|e| format!("{}: {}", class.name(), e))
        })
        .collect::<Result<HashMap<_, _>, String>>()?;

        Ok(Theme {
            name: data.name,
            colors,
        })
    }

    /// Color for `class`, if the theme styles it
    pub fn color(&self, class: ColorClass) -> Option<Color> {
        self.colors.get(&class).copied()
    }
}
