//! Escape tokens
//!
//! Escaped characters and code spans are hidden from the structural and
//! inline rules by rewriting them as hex tokens, one per UTF-16 code
//! unit, and restored by the unescaping rules that run last.
//!
//! - `\*` becomes `\002a`
//! - `\😀` becomes `\d83d\de00`
//! - `` `a*b` `` becomes `` `0061002a0062` `` (no backslashes inside code)

use super::{RangeFormat, Rule};
use crate::error::{ParseError, Result};

/// A backslash and the character it escapes
pub const ESCAPE_PATTERN: &str = r"\\.";

/// A code span fenced by a run of backticks
///
/// A backtick preceded by an odd number of backslashes is escaped and
/// cannot open a span.
pub const CODE_SPAN_PATTERN: &str = r"(?s)(?<!\\)(?:\\\\)*(`+)(.*?[^`].*?)(\1)(?!`)";

/// One token, or a high/low surrogate token pair
pub const TOKEN_PATTERN: &str = r"\\[0-9a-z]{4}(?:\\d[c-f][0-9a-f]{2})?";

fn hex_units(ch: char) -> Vec<String> {
    let mut units = [0u16; 2];
    ch.encode_utf16(&mut units)
        .iter()
        .map(|unit| format!("{:04x}", unit))
        .collect()
}

/// Hex digits of a character's UTF-16 code units, without backslashes
pub fn encode_char(ch: char) -> String {
    hex_units(ch).concat()
}

/// Hex digits of every UTF-16 code unit of `text`, without backslashes
pub fn encode_str(text: &str) -> String {
    text.encode_utf16().map(|unit| format!("{:04x}", unit)).collect()
}

/// Token text that follows the escaping backslash, e.g. `d83d\de00`
fn token_body(ch: char) -> String {
    hex_units(ch).join("\\")
}

/// Decode a run of 4-digit hex code units back into text
pub fn decode_tokens(hex: &str) -> Result<String> {
    let invalid = || ParseError::InvalidEscapeToken(hex.to_string());
    if hex.len() % 4 != 0 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid());
    }
    let units = hex
        .as_bytes()
        .chunks(4)
        .map(|chunk| {
            std::str::from_utf8(chunk)
                .ok()
                .and_then(|digits| u16::from_str_radix(digits, 16).ok())
        })
        .collect::<Option<Vec<u16>>>()
        .ok_or_else(invalid)?;
    char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|_| invalid())
}

/// Decode every `\hhhh` token in `text`, leaving other text alone
///
/// Adjacent tokens are decoded together so surrogate pairs survive.
pub fn unescape(text: &str) -> Result<String> {
    let mut out = String::with_capacity(text.len());
    let mut pending = String::new();
    let mut rest = text;

    while let Some(pos) = rest.find('\\') {
        let (before, after) = rest.split_at(pos);
        if !before.is_empty() {
            flush(&mut pending, &mut out)?;
            out.push_str(before);
        }
        let token = after
            .get(1..5)
            .filter(|t| t.bytes().all(|b| b.is_ascii_alphanumeric()));
        match token {
            Some(hex) => {
                pending.push_str(hex);
                rest = &after[5..];
            }
            None => {
                flush(&mut pending, &mut out)?;
                out.push('\\');
                rest = &after[1..];
            }
        }
    }
    flush(&mut pending, &mut out)?;
    out.push_str(rest);
    Ok(out)
}

fn flush(pending: &mut String, out: &mut String) -> Result<()> {
    if !pending.is_empty() {
        out.push_str(&decode_tokens(pending)?);
        pending.clear();
    }
    Ok(())
}

/// `\X` -> `\hhhh`
pub fn escaping() -> Result<Rule> {
    Rule::from_pattern("escaping", ESCAPE_PATTERN, |found, buffer| {
        let range = found.range();
        let escaped = buffer
            .substring(range.clone())?
            .chars()
            .nth(1)
            .ok_or_else(|| ParseError::Bounds {
                range: range.clone(),
                len: buffer.len(),
            })?;
        buffer.replace(range.start + 1..range.end, &token_body(escaped))
    })
}

/// Freeze code span contents as bare hex
pub fn code_escaping() -> Result<Rule> {
    Rule::from_pattern("code-escaping", CODE_SPAN_PATTERN, |found, buffer| {
        let body = found.require(2)?;
        let encoded = encode_str(buffer.substring(body.clone())?);
        buffer.replace(body, &encoded)
    })
}

/// Thaw code spans, strip their fences and format the decoded text
///
/// Content that does not decode is left untouched, fences included.
pub fn code_unescaping(format: RangeFormat) -> Result<Rule> {
    Rule::from_pattern("code-unescaping", CODE_SPAN_PATTERN, move |found, buffer| {
        let open = found.require(1)?;
        let body = found.require(2)?;
        let close = found.require(3)?;
        let decoded = decode_tokens(buffer.substring(body.clone())?)?;

        buffer.delete(close)?;
        buffer.replace(body.clone(), &decoded)?;
        format(buffer, body.start..body.start + decoded.len())?;
        buffer.delete(open)
    })
}

/// `\hhhh` -> the character it encodes
///
/// A token that does not decode stays in the text verbatim.
pub fn unescaping() -> Result<Rule> {
    Rule::from_pattern("unescaping", TOKEN_PATTERN, |found, buffer| {
        let range = found.range();
        let decoded = unescape(buffer.substring(range.clone())?)?;
        buffer.replace(range, &decoded)
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::buffer::StyledTextBuffer;
    use crate::engine::{RuleSet, DEFAULT_ITERATION_LIMIT};
    use crate::style::{AttributeKey, AttributeValue};

    fn run(rules: Vec<Rule>, text: &str) -> (String, usize) {
        let mut set = RuleSet::new();
        for rule in rules {
            set.push(rule);
        }
        let mut buffer = StyledTextBuffer::new(text);
        let diagnostics = set.apply(&mut buffer, DEFAULT_ITERATION_LIMIT);
        (buffer.text().to_string(), diagnostics.len())
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode_char('*'), "002a");
        assert_eq!(encode_char('😀'), "d83dde00");
        assert_eq!(encode_str("a*"), "0061002a");
        assert_eq!(token_body('😀'), "d83d\\de00");
    }

    #[test]
    fn test_decode_tokens() {
        assert_eq!(decode_tokens("0061002a").unwrap(), "a*");
        assert_eq!(decode_tokens("d83dde00").unwrap(), "😀");
        assert!(matches!(
            decode_tokens("zzzz"),
            Err(ParseError::InvalidEscapeToken(_))
        ));
        assert!(decode_tokens("d83d").is_err());
        assert!(decode_tokens("006").is_err());
        assert!(decode_tokens("+061").is_err());
    }

    #[test]
    fn test_unescape_mixed_text() {
        assert_eq!(unescape(r"a\002ab").unwrap(), "a*b");
        assert_eq!(unescape(r"\d83d\de00!").unwrap(), "😀!");
        assert_eq!(unescape(r"trailing \").unwrap(), r"trailing \");
        assert_eq!(unescape(r"\\-x").unwrap(), r"\\-x");
        assert!(unescape(r"\d83d x").is_err());
    }

    #[test]
    fn test_escape_round_trip() {
        let (escaped, _) = run(vec![escaping().unwrap()], r"\*not\* \😀");
        assert_eq!(escaped, r"\002anot\002a \d83d\de00");
        let (restored, diagnostics) = run(vec![unescaping().unwrap()], &escaped);
        assert_eq!(restored, "*not* 😀");
        assert_eq!(diagnostics, 0);
    }

    #[test]
    fn test_escaped_backslash() {
        let (text, _) = run(
            vec![escaping().unwrap(), unescaping().unwrap()],
            r"a\\b\c",
        );
        assert_eq!(text, r"a\bc");
    }

    #[test]
    fn test_code_span_frozen() {
        let (text, _) = run(vec![code_escaping().unwrap()], "x `a*b` y");
        assert_eq!(text, "x `0061002a0062` y");

        let (text, _) = run(vec![code_escaping().unwrap()], "``a`b``");
        assert_eq!(text, format!("``{}``", encode_str("a`b")));
    }

    #[test]
    fn test_escaped_backtick_does_not_open_code() {
        let (text, _) = run(vec![code_escaping().unwrap()], r"\`a` b");
        assert_eq!(text, r"\`a` b");
    }

    #[test]
    fn test_code_unescaping_formats_content() {
        let format: RangeFormat = Arc::new(|buffer, range| {
            buffer.add_attribute(
                range,
                AttributeKey::Custom("code".into()),
                AttributeValue::Flag(true),
            )
        });
        let mut set = RuleSet::new();
        set.push(code_escaping().unwrap());
        set.push(code_unescaping(format).unwrap());
        let mut buffer = StyledTextBuffer::new("see `a_b` here");
        assert!(set.apply(&mut buffer, DEFAULT_ITERATION_LIMIT).is_empty());

        let styled = buffer.into_styled_text();
        assert_eq!(styled.text(), "see a_b here");
        let code = AttributeKey::Custom("code".into());
        let spans: Vec<_> = styled.spans_with(&code).collect();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].range, 4..7);
    }

    #[test]
    fn test_invalid_token_left_verbatim() {
        let (text, diagnostics) = run(vec![unescaping().unwrap()], r"a \zzzz b");
        assert_eq!(text, r"a \zzzz b");
        assert_eq!(diagnostics, 1);
    }
}
