//! Leveled block rules
//!
//! Headers, lists, numbered lists and quotes are recognized by a lead
//! marker at the start of a line. Group 1 of each pattern is the lead,
//! group 2 the rest of the line. The content is formatted first, then
//! the lead is rewritten, since rewriting the lead moves the content.

use std::sync::Arc;

use super::{LevelFormat, Rule};
use crate::error::Result;
use crate::style::Attributes;

const NBSP: &str = "\u{a0}";
const BULLET: &str = "\u{2022}";

/// Block construct recognized by its lead marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LeadKind {
    Header,
    List,
    NumberedList,
    Quote,
}

/// Pattern options for a block rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LeadOptions {
    /// Longest marker run accepted (0 = unbounded)
    pub max_level: usize,
    /// Forbid a further marker right after the run and allow the content
    /// to follow without whitespace
    pub short: bool,
}

impl LeadOptions {
    /// Long variant, unbounded
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: bound the marker run
    pub fn with_max_level(mut self, max_level: usize) -> Self {
        self.max_level = max_level;
        self
    }

    /// Builder: use the short variant
    pub fn with_short(mut self) -> Self {
        self.short = true;
        self
    }

    fn repeat(&self) -> String {
        if self.max_level == 0 {
            "{1,}".to_string()
        } else {
            format!("{{1,{}}}", self.max_level)
        }
    }
}

impl LeadKind {
    /// Rule name for logs and diagnostics
    pub fn name(self, options: LeadOptions) -> &'static str {
        match (self, options.short) {
            (LeadKind::Header, false) => "header",
            (LeadKind::Header, true) => "short-header",
            (LeadKind::List, false) => "list",
            (LeadKind::List, true) => "short-list",
            (LeadKind::NumberedList, _) => "numbered-list",
            (LeadKind::Quote, false) => "quote",
            (LeadKind::Quote, true) => "short-quote",
        }
    }

    /// Line pattern for this construct
    ///
    /// Numbered lists have no marker run, so the options do not apply.
    pub fn pattern(self, options: LeadOptions) -> String {
        let n = options.repeat();
        match (self, options.short) {
            (LeadKind::Header, false) => format!(r"(?m)^(#{n})[ \t]+([^\r\n]+)\r?$"),
            (LeadKind::Header, true) => format!(r"(?m)^(#{n})(?!#)[ \t]*([^\r\n]+)\r?$"),
            (LeadKind::List, false) => format!(r"(?m)^([ \t]*[*+\-]{n})[ \t]+([^\r\n]+)\r?$"),
            (LeadKind::List, true) => format!(r"(?m)^([ \t]*[*+\-]{n})(?![*+\-])[ \t]*([^\r\n]+)\r?$"),
            (LeadKind::NumberedList, _) => r"(?m)^([ \t]*[0-9]+\.)[ \t]+([^\r\n]+)\r?$".to_string(),
            (LeadKind::Quote, false) => format!(r"(?m)^(>{n})[ \t]*([^\r\n]+)\r?$"),
            (LeadKind::Quote, true) => format!(r"(?m)^(>{n})(?!>)[ \t]*([^\r\n]+)\r?$"),
        }
    }

    /// Nesting level encoded by a lead (group 1 text), at least 1
    pub fn level(self, lead: &str) -> usize {
        match self {
            LeadKind::Header => lead.matches('#').count().max(1),
            LeadKind::Quote => lead.matches('>').count().max(1),
            LeadKind::List => {
                let markers = lead.chars().filter(|c| matches!(c, '*' | '+' | '-')).count();
                indent_steps(lead) + markers.max(1)
            }
            LeadKind::NumberedList => indent_steps(lead) + 1,
        }
    }
}

/// Leading indentation in steps: one per tab, one per two spaces
fn indent_steps(lead: &str) -> usize {
    let mut tabs = 0;
    let mut spaces = 0;
    for c in lead.chars() {
        match c {
            '\t' => tabs += 1,
            ' ' => spaces += 1,
            _ => break,
        }
    }
    tabs + spaces / 2
}

/// Build a block rule from a lead formatter and a content formatter
pub fn lead_rule(
    kind: LeadKind,
    options: LeadOptions,
    lead: LevelFormat,
    text: LevelFormat,
) -> Result<Rule> {
    let pattern = kind.pattern(options);
    Rule::from_pattern(kind.name(options), &pattern, move |found, buffer| {
        let marker = found.require(1)?;
        let content = found.require(2)?;
        let level = kind.level(buffer.substring(marker.clone())?);

        text(buffer, content.clone(), level)?;
        lead(buffer, marker.start..content.start, level)
    })
}

/// Attribute set for `level` (1-based), clamped to the last entry
pub fn level_attributes(levels: &[Attributes], level: usize) -> Option<&Attributes> {
    levels.get(level.saturating_sub(1)).or_else(|| levels.last())
}

/// Header lead: delete it
pub fn remove_lead() -> LevelFormat {
    Arc::new(|buffer, range, _level| buffer.delete(range))
}

/// List lead: `level` non-breaking spaces, a bullet and one more space
pub fn bullet_lead(levels: Vec<Attributes>) -> LevelFormat {
    Arc::new(move |buffer, range, level| {
        let bullet = format!("{}{}{}", NBSP.repeat(level), BULLET, NBSP);
        buffer.replace(range.clone(), &bullet)?;
        match level_attributes(&levels, level) {
            Some(attributes) => {
                buffer.add_attributes(range.start..range.start + bullet.len(), attributes)
            }
            None => Ok(()),
        }
    })
}

/// Numbered lead: keep the numeral, make its spaces non-breaking
pub fn numbered_lead(levels: Vec<Attributes>) -> LevelFormat {
    Arc::new(move |buffer, range, level| {
        let lead = buffer.substring(range.clone())?.replace(' ', NBSP);
        buffer.replace(range.clone(), &lead)?;
        match level_attributes(&levels, level) {
            Some(attributes) => buffer.add_attributes(range.start..range.start + lead.len(), attributes),
            None => Ok(()),
        }
    })
}

/// Quote lead: one tab per level
pub fn indent_lead() -> LevelFormat {
    Arc::new(|buffer, range, level| buffer.replace(range, &"\t".repeat(level)))
}

/// Content formatter applying the level-indexed attributes
pub fn level_text(levels: Vec<Attributes>) -> LevelFormat {
    Arc::new(move |buffer, range, level| match level_attributes(&levels, level) {
        Some(attributes) => buffer.add_attributes(range, attributes),
        None => Ok(()),
    })
}
