//! Inline enclosed rules
//!
//! Strong, emphasis, their combination and monospace are spans enclosed
//! by a delimiter run. The closing delimiter is deleted first, then the
//! body is formatted, then the opening delimiter is deleted, so the
//! ranges still to be processed keep their offsets.
//!
//! Overlap is resolved through the [`InlineStyle`] flags already on the
//! body: emphasis applied inside a strong span (or the other way round)
//! unions the flags and picks the combined style from the table.

use std::sync::Arc;

use super::{RangeFormat, Rule};
use crate::error::Result;
use crate::style::{AttributeKey, AttributeValue, Attributes, InlineStyle};

/// `***text***` or `___text___`
pub const STRONG_EMPHASIS_DELIMITERS: &str = r"\*\*\*|___";
/// `**text**` or `__text__`
pub const STRONG_DELIMITERS: &str = r"\*\*|__";
/// `*text*` or `_text_`
pub const EMPHASIS_DELIMITERS: &str = r"\*|_";
/// `` `text` `` with any fence length
pub const MONOSPACE_PATTERN: &str = r"(`+)(\s*.*?[^`]\s*)(\1)(?!`)";

/// Pattern for a span enclosed by one of `delimiters`
///
/// The closing run may not be followed by another delimiter character
/// of the same kind.
pub fn enclosed_pattern(delimiters: &str) -> String {
    format!(r"(?s)({delimiters})(.+?)(\1)(?:(?<=\*)(?!\*)|(?<=_)(?!_))")
}

/// Attribute sets picked by inline flag combination
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyleTable {
    pub strong: Attributes,
    pub emphasis: Attributes,
    pub strong_emphasis: Attributes,
    pub monospace: Attributes,
}

impl InlineStyleTable {
    /// Final attributes for a flag combination, including the flags
    pub fn lookup(&self, style: InlineStyle) -> Attributes {
        let mut attributes = Attributes::new();
        if style.contains(InlineStyle::STRONG | InlineStyle::EMPHASIS) {
            attributes.merge(&self.strong_emphasis);
        } else if style.contains(InlineStyle::STRONG) {
            attributes.merge(&self.strong);
        } else if style.contains(InlineStyle::EMPHASIS) {
            attributes.merge(&self.emphasis);
        }
        // Code keeps its font inside strong or emphasized text
        if style.contains(InlineStyle::MONOSPACE) {
            attributes.merge(&self.monospace);
        }
        attributes.insert(AttributeKey::Inline, AttributeValue::Inline(style));
        attributes
    }
}

/// Formatter adding `flag` to each run's existing flags
pub fn inline_format(table: Arc<InlineStyleTable>, flag: InlineStyle) -> RangeFormat {
    Arc::new(move |buffer, range| {
        for run in buffer.attributes_at(range)? {
            let style = run.attributes.inline_style() | flag;
            buffer.add_attributes(run.range, &table.lookup(style))?;
        }
        Ok(())
    })
}

/// Formatter merging a fixed attribute set
pub fn attributes_format(attributes: Attributes) -> RangeFormat {
    Arc::new(move |buffer, range| buffer.add_attributes(range, &attributes))
}

/// Build an enclosed rule: groups 1 and 3 are delimiters, group 2 the body
pub fn enclosed_rule(name: &str, pattern: &str, format: RangeFormat) -> Result<Rule> {
    Rule::from_pattern(name, pattern, move |found, buffer| {
        let open = found.require(1)?;
        let body = found.require(2)?;
        let close = found.require(3)?;

        buffer.delete(close)?;
        format(buffer, body)?;
        buffer.delete(open)
    })
}

pub fn strong(table: Arc<InlineStyleTable>) -> Result<Rule> {
    enclosed_rule(
        "strong",
        &enclosed_pattern(STRONG_DELIMITERS),
        inline_format(table, InlineStyle::STRONG),
    )
}

pub fn emphasis(table: Arc<InlineStyleTable>) -> Result<Rule> {
    enclosed_rule(
        "emphasis",
        &enclosed_pattern(EMPHASIS_DELIMITERS),
        inline_format(table, InlineStyle::EMPHASIS),
    )
}

pub fn strong_emphasis(table: Arc<InlineStyleTable>) -> Result<Rule> {
    enclosed_rule(
        "strong-emphasis",
        &enclosed_pattern(STRONG_EMPHASIS_DELIMITERS),
        inline_format(table, InlineStyle::STRONG | InlineStyle::EMPHASIS),
    )
}

/// Single-line code span, for rule sets without code escaping
pub fn monospace(table: Arc<InlineStyleTable>) -> Result<Rule> {
    enclosed_rule(
        "monospace",
        MONOSPACE_PATTERN,
        inline_format(table, InlineStyle::MONOSPACE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{StyledText, StyledTextBuffer};
    use crate::engine::{RuleSet, DEFAULT_ITERATION_LIMIT};
    use crate::style::{Color, Font};

    fn table() -> Arc<InlineStyleTable> {
        Arc::new(InlineStyleTable {
            strong: Attributes::new().with_font(Font::system(12).with_bold()),
            emphasis: Attributes::new().with_font(Font::system(12).with_italic()),
            strong_emphasis: Attributes::new()
                .with_font(Font::system(12).with_bold().with_italic()),
            monospace: Attributes::new().with_font(Font::named("Menlo", 12)),
        })
    }

    fn parse(text: &str) -> StyledText {
        let table = table();
        let mut set = RuleSet::new();
        set.push(strong(table.clone()).unwrap());
        set.push(emphasis(table.clone()).unwrap());
        set.push(strong_emphasis(table).unwrap());
        let mut buffer = StyledTextBuffer::new(text);
        assert!(set.apply(&mut buffer, DEFAULT_ITERATION_LIMIT).is_empty());
        buffer.into_styled_text()
    }

    fn style_of(styled: &StyledText, needle: &str) -> InlineStyle {
        styled
            .attributes_of(needle)
            .map(|a| a.inline_style())
            .unwrap_or_default()
    }

    #[test]
    fn test_lookup() {
        let table = table();
        let both = table.lookup(InlineStyle::STRONG | InlineStyle::EMPHASIS);
        assert!(both.font().is_some_and(|f| f.bold && f.italic));
        assert_eq!(both.inline_style(), InlineStyle::STRONG | InlineStyle::EMPHASIS);

        let code = table.lookup(InlineStyle::STRONG | InlineStyle::MONOSPACE);
        assert_eq!(code.font().map(|f| f.family.as_str()), Some("Menlo"));
    }

    #[test]
    fn test_strong_and_emphasis() {
        let styled = parse("a **b** c *d* e");
        assert_eq!(styled.text(), "a b c d e");
        assert_eq!(style_of(&styled, "b"), InlineStyle::STRONG);
        assert_eq!(style_of(&styled, "d"), InlineStyle::EMPHASIS);
        assert_eq!(style_of(&styled, "e"), InlineStyle::NONE);
    }

    #[test]
    fn test_nested_combination() {
        let styled = parse("**bold *and italic* end**");
        assert_eq!(styled.text(), "bold and italic end");
        assert_eq!(style_of(&styled, "bold"), InlineStyle::STRONG);
        assert_eq!(
            style_of(&styled, "and italic"),
            InlineStyle::STRONG | InlineStyle::EMPHASIS
        );
        assert_eq!(style_of(&styled, " end"), InlineStyle::STRONG);
    }

    #[test]
    fn test_triple_delimiters() {
        let styled = parse("***both***");
        assert_eq!(styled.text(), "both");
        assert_eq!(
            style_of(&styled, "both"),
            InlineStyle::STRONG | InlineStyle::EMPHASIS
        );

        let styled = parse("___both___");
        assert_eq!(styled.text(), "both");
        assert_eq!(
            style_of(&styled, "both"),
            InlineStyle::STRONG | InlineStyle::EMPHASIS
        );
    }

    #[test]
    fn test_unclosed_delimiters_left_alone() {
        let styled = parse("2 * 3 and __init");
        assert_eq!(styled.text(), "2 * 3 and __init");
        assert!(styled.spans().is_empty());
    }

    #[test]
    fn test_monospace_rule() {
        let mut set = RuleSet::new();
        set.push(monospace(table()).unwrap());
        let mut buffer = StyledTextBuffer::new("x ``a`b`` y");
        assert!(set.apply(&mut buffer, DEFAULT_ITERATION_LIMIT).is_empty());
        let styled = buffer.into_styled_text();
        assert_eq!(styled.text(), "x a`b y");
        assert_eq!(style_of(&styled, "a`b"), InlineStyle::MONOSPACE);
    }

    #[test]
    fn test_attributes_format() {
        let format = attributes_format(Attributes::new().with_fg(Color::Red));
        let mut buffer = StyledTextBuffer::new("abc");
        format(&mut buffer, 1..2).unwrap();
        let styled = buffer.into_styled_text();
        assert_eq!(styled.spans().len(), 1);
        assert_eq!(styled.spans()[0].range, 1..2);
    }
}
