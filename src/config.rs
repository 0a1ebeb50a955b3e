use serde::Deserialize;

use crate::{
    error::{TextError, TextResult},
    text::rasterizer::PRINTABLE,
};

/// Defaults applied to every text object the system creates.
///
/// Built in code with the `with_*` methods or loaded from toml:
///
/// ```toml
/// color = [1.0, 1.0, 1.0, 1.0]
/// line_spacing = 2.0
///
/// [console]
/// font_path = "fonts/mono.ttf"
/// font_size = 16
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TextConfig {
    pub color: [f32; 4],
    pub scale: f32,
    pub line_spacing: f32,
    /// Drawn in place of characters the font doesn't cover. Must be printable ascii.
    pub replacement: char,
    pub console: ConsoleConfig,
}

impl Default for TextConfig {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0, 1.0],
            scale: 1.0,
            line_spacing: 0.0,
            replacement: '?',
            console: ConsoleConfig::default(),
        }
    }
}

impl TextConfig {
    pub fn from_toml_str(source: &str) -> TextResult<Self> {
        let config: TextConfig =
            toml::from_str(source).map_err(|err| TextError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> TextResult<()> {
        if !PRINTABLE.contains(&self.replacement) {
            return Err(TextError::Config(format!(
                "replacement {:?} is outside the rasterized range",
                self.replacement
            )));
        }
        if self.scale <= 0.0 {
            return Err(TextError::Config(format!("scale must be positive, got {}", self.scale)));
        }
        self.console.validate()
    }

    pub fn with_color(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_line_spacing(mut self, line_spacing: f32) -> Self {
        self.line_spacing = line_spacing;
        self
    }

    pub fn with_replacement(mut self, replacement: char) -> Self {
        self.replacement = replacement;
        self
    }

    pub fn with_console(mut self, console: ConsoleConfig) -> Self {
        self.console = console;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub font_path: String,
    pub font_size: u32,
    /// Oldest lines are dropped past this.
    pub max_lines: usize,
    /// Bottom left corner of the newest line.
    pub origin: [f32; 2],
    pub color: [f32; 4],
    pub line_spacing: f32,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            font_path: "fonts/console.ttf".into(),
            font_size: 20,
            max_lines: 5,
            origin: [5.0, 5.0],
            color: [1.0, 0.3, 0.0, 1.0],
            line_spacing: 0.0,
        }
    }
}

impl ConsoleConfig {
    pub fn validate(&self) -> TextResult<()> {
        if self.font_size == 0 {
            return Err(TextError::Config("console font_size must be at least 1".into()));
        }
        if self.max_lines == 0 {
            return Err(TextError::Config("console max_lines must be at least 1".into()));
        }
        Ok(())
    }

    pub fn with_font(mut self, path: &str, size: u32) -> Self {
        self.font_path = path.into();
        self.font_size = size;
        self
    }

    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines;
        self
    }

    pub fn with_origin(mut self, x: f32, y: f32) -> Self {
        self.origin = [x, y];
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        TextConfig::default().validate().unwrap();
        assert_eq!(TextConfig::default().console.max_lines, 5);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = TextConfig::from_toml_str(
            r#"
            line_spacing = 2.0

            [console]
            font_path = "fonts/mono.ttf"
            font_size = 16
            "#,
        )
        .unwrap();

        assert_eq!(config.line_spacing, 2.0);
        assert_eq!(config.scale, 1.0);
        assert_eq!(config.replacement, '?');
        assert_eq!(config.console.font_path, "fonts/mono.ttf");
        assert_eq!(config.console.font_size, 16);
        assert_eq!(config.console.max_lines, 5);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            TextConfig::from_toml_str("replacement = \"\\u00e9\""),
            Err(TextError::Config(_))
        ));
        assert!(matches!(
            TextConfig::from_toml_str("scale = 0.0"),
            Err(TextError::Config(_))
        ));
        assert!(matches!(
            TextConfig::from_toml_str("[console]\nmax_lines = 0"),
            Err(TextError::Config(_))
        ));
        assert!(matches!(
            TextConfig::from_toml_str("color = \"red\""),
            Err(TextError::Config(_))
        ));
    }
}
