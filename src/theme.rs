//! Theme support
//!
//! A theme holds the attributes each construct is styled with. Themes
//! load from TOML; the viewer reads ~/.mdstyle.toml (or
//! %USERPROFILE%\.mdstyle.toml on Windows) when it exists.
//!
//! Sections left out of the file keep their default values. Level lists
//! (`header`, `list`, `numbered_list`, `quote`) are arrays of tables,
//! indexed by nesting level.
//!
//! Example:
//! ```toml
//! [default]
//! font = { family = "system", size = 14 }
//!
//! [[header]]
//! font = { size = 26, bold = true }
//! foreground = "cyan"
//!
//! [[header]]
//! font = { size = 20, bold = true }
//!
//! [link]
//! foreground = { rgb = [80, 120, 255] }
//! underline = true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::Result;
use crate::rules::inline::InlineStyleTable;
use crate::style::{AttributeKey, AttributeValue, Attributes, Color, Font};

/// One attribute set as written in a theme file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StyleSpec {
    pub font: Option<Font>,
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    pub underline: Option<bool>,
    pub strikethrough: Option<bool>,
}

impl StyleSpec {
    /// Convert to an attribute mapping, skipping unset fields
    pub fn to_attributes(&self) -> Attributes {
        let mut attributes = Attributes::new();
        if let Some(font) = &self.font {
            attributes.insert(AttributeKey::Font, AttributeValue::Font(font.clone()));
        }
        if let Some(color) = self.foreground {
            attributes.insert(AttributeKey::Foreground, AttributeValue::Color(color));
        }
        if let Some(color) = self.background {
            attributes.insert(AttributeKey::Background, AttributeValue::Color(color));
        }
        if let Some(flag) = self.underline {
            attributes.insert(AttributeKey::Underline, AttributeValue::Flag(flag));
        }
        if let Some(flag) = self.strikethrough {
            attributes.insert(AttributeKey::Strikethrough, AttributeValue::Flag(flag));
        }
        attributes
    }
}

/// Theme file layout; every section is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ThemeFile {
    default: Option<StyleSpec>,
    header: Option<Vec<StyleSpec>>,
    list: Option<Vec<StyleSpec>>,
    numbered_list: Option<Vec<StyleSpec>>,
    quote: Option<Vec<StyleSpec>>,
    image: Option<StyleSpec>,
    link: Option<StyleSpec>,
    monospace: Option<StyleSpec>,
    strong: Option<StyleSpec>,
    emphasis: Option<StyleSpec>,
    strong_emphasis: Option<StyleSpec>,
}

/// Attributes per construct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    /// Applied to the whole text before any rule runs
    pub default: Attributes,
    /// Per header level
    pub header: Vec<Attributes>,
    /// Per list level
    pub list: Vec<Attributes>,
    /// Per numbered list level
    pub numbered_list: Vec<Attributes>,
    /// Per quote level
    pub quote: Vec<Attributes>,
    /// Alt text of images that could not be loaded
    pub image: Attributes,
    pub link: Attributes,
    pub monospace: Attributes,
    pub strong: Attributes,
    pub emphasis: Attributes,
    pub strong_emphasis: Attributes,
}

impl Default for Theme {
    fn default() -> Self {
        let header = [23, 21, 19, 17, 15, 13]
            .into_iter()
            .map(|size| Attributes::new().with_font(Font::system(size).with_bold()))
            .collect();
        Self {
            default: Attributes::new().with_font(Font::system(12)),
            header,
            list: Vec::new(),
            numbered_list: Vec::new(),
            quote: Vec::new(),
            image: Attributes::new()
                .with_font(Font::system(12).with_italic())
                .with_fg(Color::BrightBlack),
            link: Attributes::new().with_fg(Color::Blue).with_underline(),
            monospace: Attributes::new()
                .with_font(Font::named("Menlo", 12))
                .with_fg(Color::Rgb(242, 138, 140)),
            strong: Attributes::new().with_font(Font::system(12).with_bold()),
            emphasis: Attributes::new().with_font(Font::system(12).with_italic()),
            strong_emphasis: Attributes::new()
                .with_font(Font::system(12).with_bold().with_italic()),
        }
    }
}

impl Theme {
    /// Get the theme file path
    pub fn config_path() -> Option<PathBuf> {
        #[cfg(windows)]
        {
            std::env::var("USERPROFILE")
                .ok()
                .map(|home| PathBuf::from(home).join(".mdstyle.toml"))
        }

        #[cfg(not(windows))]
        {
            std::env::var("HOME")
                .ok()
                .map(|home| PathBuf::from(home).join(".mdstyle.toml"))
        }
    }

    /// Load the theme file from its default location
    ///
    /// A missing file gives the default theme; a broken one is logged
    /// and ignored.
    pub fn load_default() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load(&path) {
            Ok(theme) => theme,
            Err(e) => {
                log::warn!("ignoring theme {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load a theme file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse a theme from TOML, layered over the default theme
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: ThemeFile = toml::from_str(contents)?;
        let mut theme = Self::default();
        theme.apply(file);
        Ok(theme)
    }

    /// Apply the sections present in a theme file
    fn apply(&mut self, file: ThemeFile) {
        let levels = |specs: Vec<StyleSpec>| -> Vec<Attributes> {
            specs.iter().map(StyleSpec::to_attributes).collect()
        };

        if let Some(spec) = file.default {
            self.default = spec.to_attributes();
        }
        if let Some(specs) = file.header {
            self.header = levels(specs);
        }
        if let Some(specs) = file.list {
            self.list = levels(specs);
        }
        if let Some(specs) = file.numbered_list {
            self.numbered_list = levels(specs);
        }
        if let Some(specs) = file.quote {
            self.quote = levels(specs);
        }

        let flat = [
            (file.image, &mut self.image),
            (file.link, &mut self.link),
            (file.monospace, &mut self.monospace),
            (file.strong, &mut self.strong),
            (file.emphasis, &mut self.emphasis),
            (file.strong_emphasis, &mut self.strong_emphasis),
        ];
        for (spec, target) in flat {
            if let Some(spec) = spec {
                *target = spec.to_attributes();
            }
        }
    }

    /// Inline attribute sets picked by strong/emphasis/monospace flags
    pub fn inline_table(&self) -> InlineStyleTable {
        InlineStyleTable {
            strong: self.strong.clone(),
            emphasis: self.emphasis.clone(),
            strong_emphasis: self.strong_emphasis.clone(),
            monospace: self.monospace.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::error::ParseError;

    #[test]
    fn test_default_theme() {
        let theme = Theme::default();
        assert_eq!(theme.header.len(), 6);
        assert_eq!(theme.header[0].font().map(|f| f.size), Some(23));
        assert_eq!(theme.header[5].font().map(|f| f.size), Some(13));
        assert!(theme.link.flag(&AttributeKey::Underline));
        assert_eq!(theme.monospace.font().map(|f| f.family.as_str()), Some("Menlo"));
        assert!(theme.list.is_empty());
    }

    #[test]
    fn test_parse_theme() {
        let theme = Theme::from_toml_str(
            r#"
            [[header]]
            font = { size = 30, bold = true }
            foreground = "cyan"

            [link]
            foreground = { rgb = [1, 2, 3] }
            strikethrough = true
            "#,
        )
        .unwrap();
        assert_eq!(theme.header.len(), 1);
        assert_eq!(theme.header[0].font().map(|f| (f.size, f.bold)), Some((30, true)));
        assert_eq!(theme.header[0].font().map(|f| f.family.as_str()), Some("system"));
        assert_eq!(theme.header[0].color(&AttributeKey::Foreground), Some(Color::Cyan));
        assert_eq!(theme.link.color(&AttributeKey::Foreground), Some(Color::Rgb(1, 2, 3)));
        assert!(theme.link.flag(&AttributeKey::Strikethrough));
        assert!(!theme.link.flag(&AttributeKey::Underline));
        // Untouched sections keep defaults
        assert_eq!(theme.strong, Theme::default().strong);
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result = Theme::from_toml_str("[tables]\nforeground = \"red\"\n");
        assert!(matches!(result, Err(ParseError::Theme(_))));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[[quote]]\nforeground = \"green\"").unwrap();
        let theme = Theme::load(file.path()).unwrap();
        assert_eq!(theme.quote.len(), 1);
        assert_eq!(theme.quote[0].color(&AttributeKey::Foreground), Some(Color::Green));

        let missing = Theme::load(Path::new("/nonexistent/mdstyle/theme.toml"));
        assert!(matches!(missing, Err(ParseError::Io(_))));
    }
}
