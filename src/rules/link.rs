//! Images, links and bare URLs

use std::sync::Arc;

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use url::Url;

use super::escape::unescape;
use super::{LinkMatcher, RangeFormat, Rule};
use crate::error::{ParseError, Result};
use crate::resource::ResourceLoader;
use crate::style::{AttributeKey, AttributeValue};

/// `![alt](target)`
pub const IMAGE_PATTERN: &str = r"!\[([^\[]*?)\]\((\S*)\)";

/// `[text](target)`; targets cannot contain `)`
pub const LINK_PATTERN: &str = r"\[([^\[]*?)\]\(([^\)]*)\)";

/// Characters encoded when a link target does not parse as written
const TARGET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Resolve a link target
///
/// Tries the target as written, then percent-encoded, then relative to
/// `base` when one is given.
pub fn resolve_url(target: &str, base: Option<&Url>) -> Option<Url> {
    let target = target.trim();
    if target.is_empty() {
        return None;
    }
    if let Ok(url) = Url::parse(target) {
        return Some(url);
    }
    let encoded = utf8_percent_encode(target, TARGET).to_string();
    if let Ok(url) = Url::parse(&encoded) {
        return Some(url);
    }
    base.and_then(|base| base.join(&encoded).ok())
}

/// Replace an image reference with the image, or with its alt text
pub fn image(
    loader: Arc<dyn ResourceLoader>,
    image_format: RangeFormat,
    alt_format: RangeFormat,
) -> Result<Rule> {
    Rule::from_pattern("image", IMAGE_PATTERN, move |found, buffer| {
        let alt = found.require(1)?;
        let target = found.require(2)?;
        let name = unescape(buffer.substring(target)?)?;

        match loader.load_image(&name) {
            Some(resource) => {
                log::debug!("embedding image `{}` ({}x{})", name, resource.width, resource.height);
                let unit = buffer.insert_attachment(found.range(), resource)?;
                image_format(buffer, unit)
            }
            None => {
                let alt_text = buffer.substring(alt)?.to_string();
                let start = found.start();
                buffer.replace(found.range(), &alt_text)?;
                alt_format(buffer, start..start + alt_text.len())?;
                Err(ParseError::UnresolvableImage(name))
            }
        }
    })
}

/// Turn `[text](target)` into `text` carrying a link attribute
///
/// Text whose target cannot be resolved is kept as plain text.
pub fn link(base: Option<Url>, format: RangeFormat) -> Result<Rule> {
    Rule::from_pattern("link", LINK_PATTERN, move |found, buffer| {
        let label = found.require(1)?;
        let target = found.require(2)?;
        let target = unescape(buffer.substring(target)?)?;

        buffer.delete(label.end..found.end())?;
        let resolved = resolve_url(&target, base.as_ref());
        if let Some(url) = &resolved {
            buffer.add_attribute(label.clone(), AttributeKey::Link, AttributeValue::Link(url.clone()))?;
            format(buffer, label.clone())?;
        }
        buffer.delete(found.start()..label.start)?;

        match resolved {
            Some(_) => Ok(()),
            None => Err(ParseError::UnresolvableLink(target)),
        }
    })
}

/// Attach links to URLs found in plain text, leaving the text as is
///
/// Text that already links somewhere is skipped.
pub fn autolink(format: RangeFormat) -> Rule {
    Rule::new("autolink", LinkMatcher::new(), move |found, buffer| {
        let range = found.range();
        if buffer
            .attributes_at(range.clone())?
            .iter()
            .any(|run| run.attributes.link().is_some())
        {
            return Ok(());
        }
        let raw = buffer.substring(range.clone())?;
        let decoded = unescape(&percent_decode_str(raw).decode_utf8_lossy())?;
        let url = Url::parse(&decoded).map_err(|_| ParseError::UnresolvableLink(decoded.clone()))?;

        buffer.add_attribute(range.clone(), AttributeKey::Link, AttributeValue::Link(url))?;
        format(buffer, range)
    })
}
