//! Rule engine
//!
//! Each rule scans the whole buffer on its own, in registration order.
//! After every action the scan cursor is re-anchored by the change in
//! buffer length, so the next search starts right after the text the
//! action produced:
//!
//! ```text
//! location = match.end + (new_len - old_len)
//! ```

use std::fmt;

use crate::buffer::{ceil_char_boundary, StyledTextBuffer};
use crate::error::ParseError;
use crate::rules::{Rule, RuleMatch};

/// Matches a single rule may act on in one parse
pub const DEFAULT_ITERATION_LIMIT: usize = 100_000;

/// A non-fatal problem recorded while applying a rule
#[derive(Debug)]
pub struct Diagnostic {
    /// Name of the rule that reported it
    pub rule: String,
    pub error: ParseError,
}

impl Diagnostic {
    pub fn new(rule: &str, error: ParseError) -> Self {
        Self {
            rule: rule.to_string(),
            error,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.rule, self.error)
    }
}

/// Ordered rules; order is application order
#[derive(Debug, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule (runs after every rule already registered)
    pub fn push(&mut self, rule: Rule) {
        log::debug!("registered rule `{}`", rule.name());
        self.rules.push(rule);
    }

    /// Prepend a rule (runs before every rule already registered)
    pub fn prepend(&mut self, rule: Rule) {
        log::debug!("registered rule `{}` at front", rule.name());
        self.rules.insert(0, rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    /// Rule names in application order
    pub fn names(&self) -> Vec<&str> {
        self.iter().map(Rule::name).collect()
    }

    /// Apply every rule to `buffer` in order
    ///
    /// Each rule acts on at most `limit` matches.
    pub fn apply(&self, buffer: &mut StyledTextBuffer, limit: usize) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for rule in self.iter() {
            apply_rule(rule, buffer, limit, &mut diagnostics);
        }
        diagnostics
    }
}

/// Match/act/rescan loop for one rule
fn apply_rule(
    rule: &Rule,
    buffer: &mut StyledTextBuffer,
    limit: usize,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let mut location = 0;
    let mut iterations = 0;

    loop {
        let found = match rule.find_at(buffer.text(), location) {
            Ok(Some(found)) => found,
            Ok(None) => break,
            Err(error) => {
                log::warn!("rule `{}` stopped scanning: {}", rule.name(), error);
                diagnostics.push(Diagnostic::new(rule.name(), error));
                break;
            }
        };

        if iterations == limit {
            log::warn!("rule `{}` abandoned after {} matches", rule.name(), limit);
            diagnostics.push(Diagnostic::new(
                rule.name(),
                ParseError::RuleDidNotTerminate {
                    rule: rule.name().to_string(),
                    iterations,
                },
            ));
            break;
        }
        iterations += 1;

        log::trace!("rule `{}` matched {:?}", rule.name(), found.range());
        let old_len = buffer.len();
        if let Err(error) = rule.apply(&found, buffer) {
            if error.is_fatal() {
                log::error!("rule `{}` broke buffer bounds: {}", rule.name(), error);
                if cfg!(debug_assertions) {
                    panic!("rule `{}` broke buffer bounds: {}", rule.name(), error);
                }
                diagnostics.push(Diagnostic::new(rule.name(), error));
                break;
            }
            report(rule, &error);
            diagnostics.push(Diagnostic::new(rule.name(), error));
        }

        match next_location(buffer.text(), &found, old_len) {
            Some(next) => location = next,
            None => break,
        }
    }
}

fn report(rule: &Rule, error: &ParseError) {
    match error {
        ParseError::InvalidEscapeToken(_) => log::error!("rule `{}`: {}", rule.name(), error),
        ParseError::UnresolvableLink(_) | ParseError::UnresolvableImage(_) => {
            log::debug!("rule `{}`: {}", rule.name(), error)
        }
        _ => log::warn!("rule `{}`: {}", rule.name(), error),
    }
}

/// Where the next search starts, `None` when the scan is finished
///
/// An empty match that left the text unchanged moves one character on.
fn next_location(text: &str, found: &RuleMatch, old_len: usize) -> Option<usize> {
    let new_len = text.len();
    let mut next = (found.end() + new_len).saturating_sub(old_len).min(new_len);
    if found.is_empty() && new_len == old_len {
        if next >= new_len {
            return None;
        }
        next += 1;
    }
    Some(ceil_char_boundary(text, next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Matcher, RegexMatcher};

    fn replace_rule(name: &str, pattern: &str, with: &'static str) -> Rule {
        Rule::from_pattern(name, pattern, move |found, buffer| buffer.replace(found.range(), with))
            .unwrap()
    }

    #[test]
    fn test_rules_apply_in_order() {
        let mut set = RuleSet::new();
        set.push(replace_rule("a-to-b", "a", "b"));
        set.push(replace_rule("b-to-c", "b", "c"));
        let mut buffer = StyledTextBuffer::new("aba");
        assert!(set.apply(&mut buffer, DEFAULT_ITERATION_LIMIT).is_empty());
        assert_eq!(buffer.text(), "ccc");
    }

    #[test]
    fn test_prepend() {
        let mut set = RuleSet::new();
        set.push(replace_rule("a-to-b", "a", "b"));
        set.prepend(replace_rule("b-to-a", "b", "a"));
        assert_eq!(set.names(), vec!["b-to-a", "a-to-b"]);
        let mut buffer = StyledTextBuffer::new("ab");
        set.apply(&mut buffer, DEFAULT_ITERATION_LIMIT);
        assert_eq!(buffer.text(), "bb");
    }

    #[test]
    fn test_cursor_follows_length_changes() {
        // Growing replacement must not be rescanned
        let mut set = RuleSet::new();
        set.push(replace_rule("grow", "x", "xx"));
        let mut buffer = StyledTextBuffer::new("x-x");
        assert!(set.apply(&mut buffer, DEFAULT_ITERATION_LIMIT).is_empty());
        assert_eq!(buffer.text(), "xx-xx");

        // Shrinking replacement must not skip the next match
        let mut set = RuleSet::new();
        set.push(replace_rule("shrink", "ab", ""));
        let mut buffer = StyledTextBuffer::new("abab-ab");
        set.apply(&mut buffer, DEFAULT_ITERATION_LIMIT);
        assert_eq!(buffer.text(), "-");
    }

    /// Matches the first character no matter where the scan is
    struct Stubborn;

    impl Matcher for Stubborn {
        fn find_at(&self, text: &str, _start: usize) -> crate::error::Result<Option<RuleMatch>> {
            Ok((!text.is_empty()).then(|| RuleMatch::new(vec![Some(0..1)])))
        }

        fn describe(&self) -> &str {
            "stubborn"
        }
    }

    #[test]
    fn test_iteration_limit() {
        let mut set = RuleSet::new();
        set.push(Rule::new("stubborn", Stubborn, |_, _| Ok(())));
        let mut buffer = StyledTextBuffer::new("a");
        let diagnostics = set.apply(&mut buffer, 10);
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(
            diagnostics[0].error,
            ParseError::RuleDidNotTerminate { iterations: 10, .. }
        ));
    }

    #[test]
    fn test_empty_matches_progress() {
        let rule = Rule::from_pattern("empty", "x*", |_, _| Ok(())).unwrap();
        let mut set = RuleSet::new();
        set.push(rule);
        let mut buffer = StyledTextBuffer::new("héllo");
        assert!(set.apply(&mut buffer, DEFAULT_ITERATION_LIMIT).is_empty());
    }

    #[test]
    fn test_action_errors_are_recorded() {
        let rule = Rule::from_pattern("fails", "b", |found, _| {
            Err(ParseError::UnresolvableLink(format!("{:?}", found.range())))
        })
        .unwrap();
        let mut set = RuleSet::new();
        set.push(rule);
        let mut buffer = StyledTextBuffer::new("abcb");
        let diagnostics = set.apply(&mut buffer, DEFAULT_ITERATION_LIMIT);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].rule, "fails");
        assert_eq!(diagnostics[1].to_string(), "fails: cannot resolve link target `3..4`");
    }

    #[test]
    fn test_backtrack_limit_ends_scan() {
        let mut set = RuleSet::new();
        set.push(Rule::from_pattern("runaway", "(?i)(a|b|ab)*(?=c)", |_, _| Ok(())).unwrap());
        set.push(replace_rule("b-to-c", "b", "c"));
        let mut buffer = StyledTextBuffer::new("ab".repeat(28));

        let diagnostics = set.apply(&mut buffer, DEFAULT_ITERATION_LIMIT);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].rule, "runaway");
        assert!(matches!(
            &diagnostics[0].error,
            ParseError::BacktrackLimit { pattern } if pattern == "(?i)(a|b|ab)*(?=c)"
        ));
        // Later rules still run
        assert_eq!(buffer.text(), "ac".repeat(28));
    }

    #[test]
    #[cfg_attr(debug_assertions, should_panic(expected = "broke buffer bounds"))]
    fn test_bounds_error_abandons_rule() {
        let rule = Rule::from_pattern("overreach", "a", |found, buffer| {
            buffer.delete(found.start()..found.end() + 100)
        })
        .unwrap();
        let mut set = RuleSet::new();
        set.push(rule);
        set.push(replace_rule("a-to-b", "a", "b"));
        let mut buffer = StyledTextBuffer::new("aaa");

        let diagnostics = set.apply(&mut buffer, DEFAULT_ITERATION_LIMIT);
        assert_eq!(diagnostics.len(), 1);
        assert!(matches!(diagnostics[0].error, ParseError::Bounds { .. }));
        assert_eq!(buffer.text(), "bbb");
    }

    #[test]
    fn test_next_location() {
        let found = RegexMatcher::new("b").unwrap().find_at("abc", 0).unwrap().unwrap();
        assert_eq!(next_location("abc", &found, 3), Some(2));
        assert_eq!(next_location("ac", &found, 3), Some(1));
        assert_eq!(next_location("abbbc", &found, 3), Some(4));

        let empty = RegexMatcher::new("").unwrap().find_at("é", 2).unwrap().unwrap();
        assert_eq!(next_location("é", &empty, 2), None);
        let empty = RegexMatcher::new("").unwrap().find_at("éa", 0).unwrap().unwrap();
        assert_eq!(next_location("éa", &empty, 3), Some(2));
    }
}
