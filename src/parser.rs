//! Parser configuration and entry points
//!
//! Rules are registered on a [`ParserBuilder`], which is consumed by
//! [`ParserBuilder::build`]. The resulting [`Parser`] is immutable, so
//! one instance can serve any number of parses, from any thread.
//!
//! Built-in rules are compiled at build time against the final theme, so
//! attribute setters may be called before or after the rules they
//! affect are added.

use std::sync::Arc;

use url::Url;

use crate::buffer::{StyledText, StyledTextBuffer};
use crate::engine::{Diagnostic, RuleSet, DEFAULT_ITERATION_LIMIT};
use crate::error::Result;
use crate::resource::{NoResources, ResourceLoader};
use crate::rules::block::{self, LeadKind, LeadOptions};
use crate::rules::inline::{self, attributes_format, InlineStyleTable};
use crate::rules::{escape, link, LevelFormat, RangeFormat, Rule, RuleMatch};
use crate::style::{Attributes, InlineStyle};
use crate::theme::Theme;

/// Rules that take their styling from the theme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    CodeEscaping,
    Escaping,
    Lead(LeadKind, LeadOptions),
    Image,
    Link,
    Autolink,
    Monospace,
    Strong,
    Emphasis,
    StrongEmphasis,
    CodeUnescaping,
    Unescaping,
}

#[derive(Debug)]
enum Entry {
    Builtin(Builtin),
    Rule(Rule),
}

/// Everything a built-in rule may be styled or resolved with
struct Styles {
    theme: Theme,
    table: Arc<InlineStyleTable>,
    resources: Arc<dyn ResourceLoader>,
    base_url: Option<Url>,
}

impl Styles {
    fn compile(&self, builtin: Builtin) -> Result<Rule> {
        let theme = &self.theme;
        match builtin {
            Builtin::CodeEscaping => escape::code_escaping(),
            Builtin::Escaping => escape::escaping(),
            Builtin::Lead(kind, options) => {
                let (lead, text) = match kind {
                    LeadKind::Header => (block::remove_lead(), block::level_text(theme.header.clone())),
                    LeadKind::List => (
                        block::bullet_lead(theme.list.clone()),
                        block::level_text(theme.list.clone()),
                    ),
                    LeadKind::NumberedList => (
                        block::numbered_lead(theme.numbered_list.clone()),
                        block::level_text(theme.numbered_list.clone()),
                    ),
                    LeadKind::Quote => (block::indent_lead(), block::level_text(theme.quote.clone())),
                };
                block::lead_rule(kind, options, lead, text)
            }
            Builtin::Image => link::image(
                self.resources.clone(),
                Arc::new(|_, _| Ok(())),
                attributes_format(theme.image.clone()),
            ),
            Builtin::Link => link::link(self.base_url.clone(), attributes_format(theme.link.clone())),
            Builtin::Autolink => Ok(link::autolink(attributes_format(theme.link.clone()))),
            Builtin::Monospace => inline::monospace(self.table.clone()),
            Builtin::Strong => inline::strong(self.table.clone()),
            Builtin::Emphasis => inline::emphasis(self.table.clone()),
            Builtin::StrongEmphasis => inline::strong_emphasis(self.table.clone()),
            Builtin::CodeUnescaping => escape::code_unescaping(inline::inline_format(
                self.table.clone(),
                InlineStyle::MONOSPACE,
            )),
            Builtin::Unescaping => escape::unescaping(),
        }
    }
}

/// Rule set and settings under construction
pub struct ParserBuilder {
    theme: Theme,
    entries: Vec<Entry>,
    resources: Arc<dyn ResourceLoader>,
    base_url: Option<Url>,
    iteration_limit: usize,
    errors: Vec<Diagnostic>,
}

impl Default for ParserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserBuilder {
    /// Builder with no rules and the default theme
    pub fn new() -> Self {
        Self {
            theme: Theme::default(),
            entries: Vec::new(),
            resources: Arc::new(NoResources),
            base_url: None,
            iteration_limit: DEFAULT_ITERATION_LIMIT,
            errors: Vec::new(),
        }
    }

    /// Builder with the default rule set
    pub fn standard() -> Self {
        Self::new().add_default_rules()
    }

    /// Append the default rule set, in dependency order
    pub fn add_default_rules(self) -> Self {
        self.add_code_escaping()
            .add_escaping()
            .add_numbered_list()
            .add_header(LeadOptions::new())
            .add_list(LeadOptions::new())
            .add_quote(LeadOptions::new())
            .add_image()
            .add_link()
            .add_autolink()
            .add_strong()
            .add_emphasis()
            .add_strong_emphasis()
            .add_code_unescaping()
            .add_unescaping()
    }

    fn push_builtin(mut self, builtin: Builtin) -> Self {
        self.entries.push(Entry::Builtin(builtin));
        self
    }

    /// Add a block rule, replacing any variant of the same construct
    fn put_lead(mut self, kind: LeadKind, options: LeadOptions) -> Self {
        let existing = self
            .entries
            .iter()
            .position(|entry| matches!(entry, Entry::Builtin(Builtin::Lead(k, _)) if *k == kind));
        let entry = Entry::Builtin(Builtin::Lead(kind, options));
        match existing {
            Some(index) => {
                log::debug!("replacing {:?} rule variant", kind);
                self.entries[index] = entry;
            }
            None => self.entries.push(entry),
        }
        self
    }

    pub fn add_code_escaping(self) -> Self {
        self.push_builtin(Builtin::CodeEscaping)
    }

    pub fn add_escaping(self) -> Self {
        self.push_builtin(Builtin::Escaping)
    }

    pub fn add_header(self, options: LeadOptions) -> Self {
        self.put_lead(LeadKind::Header, options)
    }

    pub fn add_list(self, options: LeadOptions) -> Self {
        self.put_lead(LeadKind::List, options)
    }

    pub fn add_numbered_list(self) -> Self {
        self.put_lead(LeadKind::NumberedList, LeadOptions::new())
    }

    pub fn add_quote(self, options: LeadOptions) -> Self {
        self.put_lead(LeadKind::Quote, options)
    }

    pub fn add_image(self) -> Self {
        self.push_builtin(Builtin::Image)
    }

    pub fn add_link(self) -> Self {
        self.push_builtin(Builtin::Link)
    }

    pub fn add_autolink(self) -> Self {
        self.push_builtin(Builtin::Autolink)
    }

    /// Single-line code spans without escaping; an alternative to the
    /// code escaping pair
    pub fn add_monospace(self) -> Self {
        self.push_builtin(Builtin::Monospace)
    }

    pub fn add_strong(self) -> Self {
        self.push_builtin(Builtin::Strong)
    }

    pub fn add_emphasis(self) -> Self {
        self.push_builtin(Builtin::Emphasis)
    }

    pub fn add_strong_emphasis(self) -> Self {
        self.push_builtin(Builtin::StrongEmphasis)
    }

    pub fn add_code_unescaping(self) -> Self {
        self.push_builtin(Builtin::CodeUnescaping)
    }

    pub fn add_unescaping(self) -> Self {
        self.push_builtin(Builtin::Unescaping)
    }

    /// Record a rule that failed to compile; the rest of the set is kept
    fn reject(&mut self, name: &str, error: crate::error::ParseError) {
        log::warn!("dropping rule `{}`: {}", name, error);
        self.errors.push(Diagnostic::new(name, error));
    }

    /// Append a custom rule
    pub fn add_rule<F>(mut self, name: &str, pattern: &str, action: F) -> Self
    where
        F: Fn(&RuleMatch, &mut StyledTextBuffer) -> Result<()> + Send + Sync + 'static,
    {
        match Rule::from_pattern(name, pattern, action) {
            Ok(rule) => self.entries.push(Entry::Rule(rule)),
            Err(e) => self.reject(name, e),
        }
        self
    }

    /// Prepend a custom rule, ahead of any conflicting rule already added
    pub fn prepend_rule<F>(mut self, name: &str, pattern: &str, action: F) -> Self
    where
        F: Fn(&RuleMatch, &mut StyledTextBuffer) -> Result<()> + Send + Sync + 'static,
    {
        match Rule::from_pattern(name, pattern, action) {
            Ok(rule) => self.entries.insert(0, Entry::Rule(rule)),
            Err(e) => self.reject(name, e),
        }
        self
    }

    /// Append a prebuilt rule
    pub fn push_rule(mut self, rule: Rule) -> Self {
        self.entries.push(Entry::Rule(rule));
        self
    }

    /// Prepend a prebuilt rule
    pub fn push_front_rule(mut self, rule: Rule) -> Self {
        self.entries.insert(0, Entry::Rule(rule));
        self
    }

    /// Append a block rule with custom formatters
    pub fn add_lead_rule(
        mut self,
        kind: LeadKind,
        options: LeadOptions,
        lead: LevelFormat,
        text: LevelFormat,
    ) -> Self {
        match block::lead_rule(kind, options, lead, text) {
            Ok(rule) => self.entries.push(Entry::Rule(rule)),
            Err(e) => self.reject(kind.name(options), e),
        }
        self
    }

    /// Append an enclosed rule: groups 1 and 3 delimit, group 2 is formatted
    pub fn add_enclosed(mut self, name: &str, pattern: &str, format: RangeFormat) -> Self {
        match inline::enclosed_rule(name, pattern, format) {
            Ok(rule) => self.entries.push(Entry::Rule(rule)),
            Err(e) => self.reject(name, e),
        }
        self
    }

    /// Replace the whole theme
    pub fn theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Attributes applied to the whole text before any rule runs
    pub fn default_attributes(mut self, attributes: Attributes) -> Self {
        self.theme.default = attributes;
        self
    }

    pub fn header_attributes(mut self, levels: Vec<Attributes>) -> Self {
        self.theme.header = levels;
        self
    }

    pub fn list_attributes(mut self, levels: Vec<Attributes>) -> Self {
        self.theme.list = levels;
        self
    }

    pub fn numbered_list_attributes(mut self, levels: Vec<Attributes>) -> Self {
        self.theme.numbered_list = levels;
        self
    }

    pub fn quote_attributes(mut self, levels: Vec<Attributes>) -> Self {
        self.theme.quote = levels;
        self
    }

    pub fn image_attributes(mut self, attributes: Attributes) -> Self {
        self.theme.image = attributes;
        self
    }

    pub fn link_attributes(mut self, attributes: Attributes) -> Self {
        self.theme.link = attributes;
        self
    }

    pub fn monospace_attributes(mut self, attributes: Attributes) -> Self {
        self.theme.monospace = attributes;
        self
    }

    pub fn strong_attributes(mut self, attributes: Attributes) -> Self {
        self.theme.strong = attributes;
        self
    }

    pub fn emphasis_attributes(mut self, attributes: Attributes) -> Self {
        self.theme.emphasis = attributes;
        self
    }

    pub fn strong_emphasis_attributes(mut self, attributes: Attributes) -> Self {
        self.theme.strong_emphasis = attributes;
        self
    }

    /// Base for link targets that are not absolute URLs
    pub fn base_url(mut self, url: Url) -> Self {
        self.base_url = Some(url);
        self
    }

    /// Image lookup used by the image rule
    pub fn resource_loader<L: ResourceLoader + 'static>(mut self, loader: L) -> Self {
        self.resources = Arc::new(loader);
        self
    }

    /// Matches a single rule may act on per parse
    pub fn iteration_limit(mut self, limit: usize) -> Self {
        self.iteration_limit = limit;
        self
    }

    /// Rules dropped so far because their pattern did not compile
    pub fn configuration_errors(&self) -> &[Diagnostic] {
        &self.errors
    }

    /// Compile the built-in rules and freeze the rule set
    pub fn build(self) -> Parser {
        let styles = Styles {
            table: Arc::new(self.theme.inline_table()),
            theme: self.theme,
            resources: self.resources,
            base_url: self.base_url,
        };
        let mut errors = self.errors;
        let mut rules = RuleSet::new();

        for entry in self.entries {
            match entry {
                Entry::Rule(rule) => rules.push(rule),
                Entry::Builtin(builtin) => match styles.compile(builtin) {
                    Ok(rule) => rules.push(rule),
                    Err(e) => {
                        log::warn!("dropping built-in rule {:?}: {}", builtin, e);
                        errors.push(Diagnostic::new(&format!("{:?}", builtin), e));
                    }
                },
            }
        }

        Parser {
            rules,
            default_attributes: styles.theme.default,
            iteration_limit: self.iteration_limit,
            configuration_errors: errors,
        }
    }
}

/// A frozen rule set
#[derive(Debug)]
pub struct Parser {
    rules: RuleSet,
    default_attributes: Attributes,
    iteration_limit: usize,
    configuration_errors: Vec<Diagnostic>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::standard()
    }
}

impl Parser {
    /// A fresh parser with the default rule set and theme
    pub fn standard() -> Self {
        ParserBuilder::standard().build()
    }

    /// Start configuring a parser with no rules
    pub fn builder() -> ParserBuilder {
        ParserBuilder::new()
    }

    /// Parse markup; never fails
    pub fn parse(&self, text: &str) -> StyledText {
        self.parse_with_diagnostics(text).0
    }

    /// Parse markup and report what went wrong along the way
    pub fn parse_with_diagnostics(&self, text: &str) -> (StyledText, Vec<Diagnostic>) {
        let mut buffer = StyledTextBuffer::with_attributes(text, self.default_attributes.clone());
        let diagnostics = self.parse_buffer(&mut buffer);
        (buffer.into_styled_text(), diagnostics)
    }

    /// Parse markup whose whole text starts with `base` merged over the
    /// default attributes
    pub fn parse_attributed(&self, text: &str, base: &Attributes) -> StyledText {
        let mut attributes = self.default_attributes.clone();
        attributes.merge(base);
        let mut buffer = StyledTextBuffer::with_attributes(text, attributes);
        self.parse_buffer(&mut buffer);
        buffer.into_styled_text()
    }

    /// Apply the rule set to a caller-owned buffer
    pub fn parse_buffer(&self, buffer: &mut StyledTextBuffer) -> Vec<Diagnostic> {
        let diagnostics = self.rules.apply(buffer, self.iteration_limit);
        if !diagnostics.is_empty() {
            log::debug!("parse finished with {} diagnostics", diagnostics.len());
        }
        diagnostics
    }

    /// Rule names in application order
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.names()
    }

    /// Rules dropped at configuration time
    pub fn configuration_errors(&self) -> &[Diagnostic] {
        &self.configuration_errors
    }
}
