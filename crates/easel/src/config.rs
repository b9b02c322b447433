use serde::Deserialize;

use easel_core::color::Color;

/// Application configuration loaded from a TOML file by the host shell
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Style configuration section
    #[serde(default)]
    pub style: StyleConfig,

    /// Text configuration section
    #[serde(default)]
    pub text: TextConfig,
}

/// Style configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct StyleConfig {
    /// Default background color for diagrams
    #[serde(default)]
    background_color: Option<String>,

    /// Outer margin in pixels around the diagram contents
    #[serde(default = "default_margin")]
    pub margin: i32,

    /// Stroke width in pixels for edges and outlines
    #[serde(default = "default_line_width")]
    pub line_width: i32,
}

impl StyleConfig {
    /// Get the background color from configuration
    /// Returns None if no background color is configured
    pub fn background_color(&self) -> Result<Option<Color>, String> {
        self.background_color
            .as_ref()
            .map(|color| Color::new(color))
            .transpose()
            .map_err(|err| format!("Invalid background color in config: {err}"))
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            background_color: None,
            margin: default_margin(),
            line_width: default_line_width(),
        }
    }
}

/// Text configuration section.
///
/// The default font is what an attribute falls back to when constructed with
/// an empty font path; it replaces the process-wide environment lookup the
/// host used to perform.
#[derive(Debug, Clone, Deserialize)]
pub struct TextConfig {
    /// Font file used when an attribute does not name one.
    /// An empty string defers to the measurer's built-in fonts.
    #[serde(default)]
    pub default_font: String,

    /// Font size in points used for newly created attributes
    #[serde(default = "default_font_size")]
    pub default_size: u16,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            default_font: String::new(),
            default_size: default_font_size(),
        }
    }
}

fn default_margin() -> i32 {
    20
}

fn default_line_width() -> i32 {
    1
}

fn default_font_size() -> u16 {
    12
}
