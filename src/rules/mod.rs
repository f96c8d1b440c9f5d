//! Pattern/action rules
//!
//! A rule pairs a [`Matcher`] that locates the next occurrence of some
//! syntax with an action that rewrites the buffer at that occurrence.
//! The constructors for the built-in markup rules live in the
//! submodules:
//! - `escape`: hiding escaped characters and code spans, then restoring them
//! - `block`: headers, lists, numbered lists and quotes
//! - `inline`: monospace, strong, emphasis and their combination
//! - `link`: images, links and bare URLs

pub mod block;
pub mod escape;
pub mod inline;
pub mod link;

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use linkify::{LinkFinder, LinkKind};

use crate::buffer::StyledTextBuffer;
use crate::error::{ParseError, Result};

/// Backtracking budget for patterns that need look-around or back-references
pub const BACKTRACK_LIMIT: usize = 1_000_000;

/// Formatting callback over a range
pub type RangeFormat = Arc<dyn Fn(&mut StyledTextBuffer, Range<usize>) -> Result<()> + Send + Sync>;

/// Formatting callback over a range with a nesting level (1-based)
pub type LevelFormat =
    Arc<dyn Fn(&mut StyledTextBuffer, Range<usize>, usize) -> Result<()> + Send + Sync>;

/// Rule action
///
/// An `Err` is recorded as a diagnostic for the parse. It does not undo
/// edits the action already made, so actions that fall back to a
/// degraded rewrite may still report why.
pub type Action = Box<dyn Fn(&RuleMatch, &mut StyledTextBuffer) -> Result<()> + Send + Sync>;

/// A located match with numbered capture ranges (group 0 is the whole match)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleMatch {
    groups: Vec<Option<Range<usize>>>,
}

impl RuleMatch {
    /// Create a match from its capture ranges; `groups[0]` must be set
    pub fn new(groups: Vec<Option<Range<usize>>>) -> Self {
        debug_assert!(matches!(groups.first(), Some(Some(_))));
        Self { groups }
    }

    /// Range of the whole match
    pub fn range(&self) -> Range<usize> {
        self.groups.first().cloned().flatten().unwrap_or(0..0)
    }

    pub fn start(&self) -> usize {
        self.range().start
    }

    pub fn end(&self) -> usize {
        self.range().end
    }

    pub fn is_empty(&self) -> bool {
        self.range().is_empty()
    }

    /// Range of a capture group, `None` if it did not participate
    pub fn group(&self, index: usize) -> Option<Range<usize>> {
        self.groups.get(index).cloned().flatten()
    }

    /// Range of a capture group the pattern always sets
    pub fn require(&self, index: usize) -> Result<Range<usize>> {
        self.group(index).ok_or(ParseError::MissingGroup(index))
    }

    /// Number of groups including group 0
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }
}

/// Locates the next occurrence of a rule's syntax
pub trait Matcher: Send + Sync {
    /// Find the first match starting at or after byte offset `start`
    ///
    /// Text before `start` stays visible to anchors and look-behind.
    fn find_at(&self, text: &str, start: usize) -> Result<Option<RuleMatch>>;

    /// Human-readable description for logs
    fn describe(&self) -> &str;
}

enum Compiled {
    /// Linear-time engine, for patterns it accepts
    Plain(regex::Regex),
    /// Backtracking engine for look-around and back-references
    Fancy(fancy_regex::Regex),
}

/// Regular-expression matcher
pub struct RegexMatcher {
    pattern: String,
    compiled: Compiled,
}

impl RegexMatcher {
    /// Compile a pattern, preferring the linear-time engine
    pub fn new(pattern: &str) -> std::result::Result<Self, fancy_regex::Error> {
        let compiled = match regex::Regex::new(pattern) {
            Ok(regex) => Compiled::Plain(regex),
            Err(_) => Compiled::Fancy(
                fancy_regex::RegexBuilder::new(pattern)
                    .backtrack_limit(BACKTRACK_LIMIT)
                    .build()?,
            ),
        };
        Ok(Self {
            pattern: pattern.to_string(),
            compiled,
        })
    }

    /// Whether the pattern needed the backtracking engine
    pub fn is_backtracking(&self) -> bool {
        matches!(self.compiled, Compiled::Fancy(_))
    }
}

impl Matcher for RegexMatcher {
    fn find_at(&self, text: &str, start: usize) -> Result<Option<RuleMatch>> {
        if start > text.len() {
            return Ok(None);
        }
        let groups = match &self.compiled {
            Compiled::Plain(regex) => regex.captures_at(text, start).map(|caps| {
                (0..caps.len())
                    .map(|i| caps.get(i).map(|m| m.start()..m.end()))
                    .collect::<Vec<_>>()
            }),
            Compiled::Fancy(regex) => regex
                .captures_from_pos(text, start)
                .map_err(|_| ParseError::BacktrackLimit {
                    pattern: self.pattern.clone(),
                })?
                .map(|caps| {
                    (0..caps.len())
                        .map(|i| caps.get(i).map(|m| m.start()..m.end()))
                        .collect::<Vec<_>>()
                }),
        };
        Ok(groups.map(RuleMatch::new))
    }

    fn describe(&self) -> &str {
        &self.pattern
    }
}

/// URL detector for plain text
pub struct LinkMatcher {
    finder: LinkFinder,
}

impl LinkMatcher {
    pub fn new() -> Self {
        let mut finder = LinkFinder::new();
        finder.kinds(&[LinkKind::Url]);
        Self { finder }
    }
}

impl Default for LinkMatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Matcher for LinkMatcher {
    fn find_at(&self, text: &str, start: usize) -> Result<Option<RuleMatch>> {
        if start > text.len() || !text.is_char_boundary(start) {
            return Ok(None);
        }
        Ok(self
            .finder
            .links(&text[start..])
            .next()
            .map(|link| RuleMatch::new(vec![Some(start + link.start()..start + link.end())])))
    }

    fn describe(&self) -> &str {
        "<url detector>"
    }
}

/// A named (matcher, action) pair
pub struct Rule {
    name: String,
    matcher: Box<dyn Matcher>,
    action: Action,
}

impl Rule {
    /// Create a rule from any matcher
    pub fn new<M, F>(name: &str, matcher: M, action: F) -> Self
    where
        M: Matcher + 'static,
        F: Fn(&RuleMatch, &mut StyledTextBuffer) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            matcher: Box::new(matcher),
            action: Box::new(action),
        }
    }

    /// Create a rule from a regular expression
    ///
    /// A malformed pattern is a configuration error for this rule only.
    pub fn from_pattern<F>(name: &str, pattern: &str, action: F) -> Result<Self>
    where
        F: Fn(&RuleMatch, &mut StyledTextBuffer) -> Result<()> + Send + Sync + 'static,
    {
        let matcher = RegexMatcher::new(pattern).map_err(|e| ParseError::Configuration {
            rule: name.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::new(name, matcher, action))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Find the first match at or after `start`
    pub fn find_at(&self, text: &str, start: usize) -> Result<Option<RuleMatch>> {
        self.matcher.find_at(text, start)
    }

    /// Run the action for one match
    pub fn apply(&self, found: &RuleMatch, buffer: &mut StyledTextBuffer) -> Result<()> {
        (self.action)(found, buffer)
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("pattern", &self.matcher.describe())
            .finish()
    }
}
