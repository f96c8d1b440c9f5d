//! mdstyle - rule-based conversion of lightweight markup into styled text
//!
//! A [`Parser`] applies an ordered list of pattern/action rules to a
//! mutable [`StyledTextBuffer`]. Each rule rescans the buffer until it
//! finds no more matches; later rules see the output of earlier ones.
//! The result is a [`StyledText`]: the final text, attribute spans over
//! it, and embedded images.
//!
//! ```
//! use mdstyle::{InlineStyle, Parser};
//!
//! let parser = Parser::standard();
//! let styled = parser.parse("**bold *and italic* end**");
//! assert_eq!(styled.text(), "bold and italic end");
//!
//! let style = styled.attributes_of("and").unwrap().inline_style();
//! assert!(style.contains(InlineStyle::STRONG | InlineStyle::EMPHASIS));
//! ```

pub mod buffer;
pub mod engine;
pub mod error;
pub mod parser;
pub mod resource;
pub mod rules;
pub mod style;
pub mod theme;

pub use buffer::{
    Attachment, AttributeRun, StyledText, StyledTextBuffer, IMAGE_BASELINE_OFFSET,
    OBJECT_REPLACEMENT,
};
pub use engine::{Diagnostic, RuleSet, DEFAULT_ITERATION_LIMIT};
pub use error::{ParseError, Result};
pub use parser::{Parser, ParserBuilder};
pub use resource::{ImageResource, NoResources, ResourceLoader};
pub use rules::block::{LeadKind, LeadOptions};
pub use rules::{LevelFormat, RangeFormat, Rule, RuleMatch};
pub use style::{AttributeKey, AttributeValue, Attributes, Color, Font, InlineStyle};
pub use theme::{StyleSpec, Theme};
