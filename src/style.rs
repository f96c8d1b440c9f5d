//! Attribute types attached to styled text
//!
//! The engine treats almost every value here as opaque presentation
//! data. The two exceptions are [`AttributeValue::Link`], which the link
//! rules produce, and [`InlineStyle`], which the strong/emphasis rules
//! read back to decide whether a range should get the combined style.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::ops::BitOr;

use serde::{Deserialize, Serialize};
use url::Url;

/// Colors (ANSI 16-color palette plus true color)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    #[default]
    Default,
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
    Rgb(u8, u8, u8),
}

/// Font description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Font {
    /// Family name; "system" means the platform default
    pub family: String,
    /// Point size
    pub size: u16,
    pub bold: bool,
    pub italic: bool,
}

impl Default for Font {
    fn default() -> Self {
        Self::system(12)
    }
}

impl Font {
    /// Create a regular system font
    pub fn system(size: u16) -> Self {
        Self {
            family: "system".to_string(),
            size,
            bold: false,
            italic: false,
        }
    }

    /// Create a regular font of the given family
    pub fn named(family: &str, size: u16) -> Self {
        Self {
            family: family.to_string(),
            ..Self::system(size)
        }
    }

    /// Builder: set bold
    pub fn with_bold(mut self) -> Self {
        self.bold = true;
        self
    }

    /// Builder: set italic
    pub fn with_italic(mut self) -> Self {
        self.italic = true;
        self
    }
}

/// Inline formatting flags recorded on text by the enclosed rules
///
/// Flags combine by union, so a range that was made strong and later
/// emphasized carries `STRONG | EMPHASIS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct InlineStyle(u8);

impl InlineStyle {
    pub const NONE: InlineStyle = InlineStyle(0);
    pub const STRONG: InlineStyle = InlineStyle(0b001);
    pub const EMPHASIS: InlineStyle = InlineStyle(0b010);
    pub const MONOSPACE: InlineStyle = InlineStyle(0b100);

    /// Raw bit value
    pub fn bits(self) -> u8 {
        self.0
    }

    /// Check whether every flag in `other` is set
    pub fn contains(self, other: InlineStyle) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for InlineStyle {
    type Output = InlineStyle;

    fn bitor(self, rhs: InlineStyle) -> InlineStyle {
        InlineStyle(self.0 | rhs.0)
    }
}

/// Attribute keys (unique within one [`Attributes`] map)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttributeKey {
    Font,
    Foreground,
    Background,
    Underline,
    Strikethrough,
    /// Resolved hyperlink target
    Link,
    /// [`InlineStyle`] flags set by strong/emphasis/monospace rules
    Inline,
    /// Anything a custom rule wants to tag text with
    Custom(String),
}

/// Attribute values
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeValue {
    Font(Font),
    Color(Color),
    Flag(bool),
    Link(Url),
    Inline(InlineStyle),
    Text(String),
    Integer(i64),
}

/// An attribute mapping (key -> value, keys unique)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(BTreeMap<AttributeKey, AttributeValue>);

impl Attributes {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: insert a key/value pair
    pub fn with(mut self, key: AttributeKey, value: AttributeValue) -> Self {
        self.insert(key, value);
        self
    }

    /// Builder: set the font
    pub fn with_font(self, font: Font) -> Self {
        self.with(AttributeKey::Font, AttributeValue::Font(font))
    }

    /// Builder: set the foreground color
    pub fn with_fg(self, color: Color) -> Self {
        self.with(AttributeKey::Foreground, AttributeValue::Color(color))
    }

    /// Builder: set the background color
    pub fn with_bg(self, color: Color) -> Self {
        self.with(AttributeKey::Background, AttributeValue::Color(color))
    }

    /// Builder: set underline
    pub fn with_underline(self) -> Self {
        self.with(AttributeKey::Underline, AttributeValue::Flag(true))
    }

    /// Insert a value, returning the one it replaced
    pub fn insert(&mut self, key: AttributeKey, value: AttributeValue) -> Option<AttributeValue> {
        self.0.insert(key, value)
    }

    pub fn remove(&mut self, key: &AttributeKey) -> Option<AttributeValue> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &AttributeKey) -> Option<&AttributeValue> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &AttributeKey) -> bool {
        self.0.contains_key(key)
    }

    /// Merge `other` into this mapping; values from `other` win
    pub fn merge(&mut self, other: &Attributes) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, AttributeKey, AttributeValue> {
        self.0.iter()
    }

    /// Inline flags carried by this mapping (empty if none)
    pub fn inline_style(&self) -> InlineStyle {
        match self.0.get(&AttributeKey::Inline) {
            Some(AttributeValue::Inline(style)) => *style,
            _ => InlineStyle::NONE,
        }
    }

    /// Link target carried by this mapping
    pub fn link(&self) -> Option<&Url> {
        match self.0.get(&AttributeKey::Link) {
            Some(AttributeValue::Link(url)) => Some(url),
            _ => None,
        }
    }

    /// Font carried by this mapping
    pub fn font(&self) -> Option<&Font> {
        match self.0.get(&AttributeKey::Font) {
            Some(AttributeValue::Font(font)) => Some(font),
            _ => None,
        }
    }

    /// Color stored under a color key
    pub fn color(&self, key: &AttributeKey) -> Option<Color> {
        match self.0.get(key) {
            Some(AttributeValue::Color(color)) => Some(*color),
            _ => None,
        }
    }

    /// Check whether a boolean flag key is set to true
    pub fn flag(&self, key: &AttributeKey) -> bool {
        matches!(self.0.get(key), Some(AttributeValue::Flag(true)))
    }
}

impl FromIterator<(AttributeKey, AttributeValue)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (AttributeKey, AttributeValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = (&'a AttributeKey, &'a AttributeValue);
    type IntoIter = btree_map::Iter<'a, AttributeKey, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
