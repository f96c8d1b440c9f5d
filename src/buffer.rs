//! Styled text buffer - text plus runs of uniform attributes
//!
//! The buffer keeps its attributes as a list of contiguous runs that
//! cover the text exactly, so every edit keeps spans inside the text by
//! construction. Embedded images are anchored on a single U+FFFC
//! character and shift with the text around them.

use std::fmt;
use std::ops::Range;

use crate::error::{ParseError, Result};
use crate::resource::ImageResource;
use crate::style::{AttributeKey, AttributeValue, Attributes};

/// Placeholder character an embedded image occupies in the text
pub const OBJECT_REPLACEMENT: char = '\u{FFFC}';

const OBJECT_REPLACEMENT_STR: &str = "\u{FFFC}";

/// Vertical offset applied to embedded images so they sit on the baseline
pub const IMAGE_BASELINE_OFFSET: i32 = -5;

/// A run of text sharing one attribute mapping
#[derive(Debug, Clone, PartialEq, Eq)]
struct Run {
    len: usize,
    attributes: Attributes,
}

/// An attribute mapping over a byte range of the text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeRun {
    pub range: Range<usize>,
    pub attributes: Attributes,
}

impl AttributeRun {
    /// Check if this run contains a byte position
    pub fn contains(&self, pos: usize) -> bool {
        self.range.contains(&pos)
    }
}

/// A non-text unit embedded in the text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Byte offset of the placeholder character
    pub offset: usize,
    pub image: ImageResource,
    pub baseline_offset: i32,
}

/// Mutable text with attributes, owned by a single parse
#[derive(Debug, Clone, Default)]
pub struct StyledTextBuffer {
    text: String,
    /// Contiguous runs; lengths sum to `text.len()`, none are empty
    runs: Vec<Run>,
    /// Sorted by offset
    attachments: Vec<Attachment>,
}

impl StyledTextBuffer {
    /// Create a buffer with no attributes
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_attributes(text, Attributes::new())
    }

    /// Create a buffer whose whole text carries `attributes`
    pub fn with_attributes(text: impl Into<String>, attributes: Attributes) -> Self {
        let text = text.into();
        let runs = if text.is_empty() {
            Vec::new()
        } else {
            vec![Run {
                len: text.len(),
                attributes,
            }]
        };
        Self {
            text,
            runs,
            attachments: Vec::new(),
        }
    }

    /// Get the text content
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Get the length in bytes
    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Embedded units, sorted by offset
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Fail with a bounds error unless `range` is a valid slice of the text
    pub fn check_range(&self, range: &Range<usize>) -> Result<()> {
        let valid = range.start <= range.end
            && range.end <= self.text.len()
            && self.text.is_char_boundary(range.start)
            && self.text.is_char_boundary(range.end);
        if valid {
            Ok(())
        } else {
            Err(ParseError::Bounds {
                range: range.clone(),
                len: self.text.len(),
            })
        }
    }

    /// Slice the text
    pub fn substring(&self, range: Range<usize>) -> Result<&str> {
        self.check_range(&range)?;
        Ok(&self.text[range])
    }

    /// Enumerate the runs of uniform attributes intersecting `range`
    ///
    /// Returned ranges are clipped to `range`. An empty range yields
    /// nothing.
    pub fn attributes_at(&self, range: Range<usize>) -> Result<Vec<AttributeRun>> {
        self.check_range(&range)?;
        let mut found = Vec::new();
        let mut start = 0;
        for run in &self.runs {
            let end = start + run.len;
            if start >= range.end {
                break;
            }
            if end > range.start {
                found.push(AttributeRun {
                    range: start.max(range.start)..end.min(range.end),
                    attributes: run.attributes.clone(),
                });
            }
            start = end;
        }
        Ok(found)
    }

    /// Attributes of the character at `offset`
    pub fn attributes_at_offset(&self, offset: usize) -> Option<&Attributes> {
        let mut start = 0;
        for run in &self.runs {
            if offset < start + run.len {
                return Some(&run.attributes);
            }
            start += run.len;
        }
        None
    }

    /// Replace `range` with `with`
    ///
    /// The new text takes the attributes of the first replaced character,
    /// or of the preceding character when inserting. Attachments inside
    /// the range are dropped; those after it shift by the length delta.
    pub fn replace(&mut self, range: Range<usize>, with: &str) -> Result<()> {
        self.check_range(&range)?;
        let inherited = self.inherited_attributes(&range);

        let first = self.split_at(range.start);
        let last = self.split_at(range.end);
        self.runs.drain(first..last);
        if !with.is_empty() {
            self.runs.insert(
                first,
                Run {
                    len: with.len(),
                    attributes: inherited,
                },
            );
        }
        self.text.replace_range(range.clone(), with);

        self.attachments
            .retain(|a| !(range.start <= a.offset && a.offset < range.end));
        for attachment in &mut self.attachments {
            if attachment.offset >= range.end {
                attachment.offset = attachment.offset - range.end + range.start + with.len();
            }
        }

        self.coalesce();
        Ok(())
    }

    /// Delete a range of text
    pub fn delete(&mut self, range: Range<usize>) -> Result<()> {
        self.replace(range, "")
    }

    /// Insert text at a byte position
    pub fn insert(&mut self, offset: usize, text: &str) -> Result<()> {
        self.replace(offset..offset, text)
    }

    /// Merge `attributes` into every run overlapping `range`
    pub fn add_attributes(&mut self, range: Range<usize>, attributes: &Attributes) -> Result<()> {
        self.check_range(&range)?;
        if range.is_empty() || attributes.is_empty() {
            return Ok(());
        }
        let first = self.split_at(range.start);
        let last = self.split_at(range.end);
        for run in &mut self.runs[first..last] {
            run.attributes.merge(attributes);
        }
        self.coalesce();
        Ok(())
    }

    /// Set a single attribute over `range`
    pub fn add_attribute(
        &mut self,
        range: Range<usize>,
        key: AttributeKey,
        value: AttributeValue,
    ) -> Result<()> {
        self.add_attributes(range, &Attributes::new().with(key, value))
    }

    /// Remove one attribute key from `range`
    pub fn remove_attribute(&mut self, range: Range<usize>, key: &AttributeKey) -> Result<()> {
        self.check_range(&range)?;
        if range.is_empty() {
            return Ok(());
        }
        let first = self.split_at(range.start);
        let last = self.split_at(range.end);
        for run in &mut self.runs[first..last] {
            run.attributes.remove(key);
        }
        self.coalesce();
        Ok(())
    }

    /// Replace `range` with one embedded image unit
    ///
    /// Returns the range of the placeholder character.
    pub fn insert_attachment(
        &mut self,
        range: Range<usize>,
        image: ImageResource,
    ) -> Result<Range<usize>> {
        let offset = range.start;
        self.replace(range, OBJECT_REPLACEMENT_STR)?;
        let index = self.attachments.partition_point(|a| a.offset < offset);
        self.attachments.insert(
            index,
            Attachment {
                offset,
                image,
                baseline_offset: IMAGE_BASELINE_OFFSET,
            },
        );
        Ok(offset..offset + OBJECT_REPLACEMENT_STR.len())
    }

    /// Finish editing and produce the immutable result
    pub fn into_styled_text(self) -> StyledText {
        let mut spans = Vec::new();
        let mut start = 0;
        for run in self.runs {
            let end = start + run.len;
            if !run.attributes.is_empty() {
                spans.push(AttributeRun {
                    range: start..end,
                    attributes: run.attributes,
                });
            }
            start = end;
        }
        StyledText {
            text: self.text,
            spans,
            attachments: self.attachments,
        }
    }

    /// Attributes new text at `range` should start with
    fn inherited_attributes(&self, range: &Range<usize>) -> Attributes {
        let probe = if range.is_empty() && range.start > 0 {
            // Insertion continues the character before it
            floor_char_boundary(&self.text, range.start - 1)
        } else {
            range.start
        };
        self.attributes_at_offset(probe)
            .or_else(|| self.runs.last().map(|r| &r.attributes))
            .cloned()
            .unwrap_or_default()
    }

    /// Make sure a run starts at `offset`, returning that run's index
    ///
    /// `offset == len` returns the number of runs.
    fn split_at(&mut self, offset: usize) -> usize {
        let mut start = 0;
        for i in 0..self.runs.len() {
            if offset == start {
                return i;
            }
            let end = start + self.runs[i].len;
            if offset < end {
                let tail = Run {
                    len: end - offset,
                    attributes: self.runs[i].attributes.clone(),
                };
                self.runs[i].len = offset - start;
                self.runs.insert(i + 1, tail);
                return i + 1;
            }
            start = end;
        }
        self.runs.len()
    }

    /// Drop empty runs and merge neighbours with equal attributes
    fn coalesce(&mut self) {
        let mut merged: Vec<Run> = Vec::with_capacity(self.runs.len());
        for run in self.runs.drain(..) {
            if run.len == 0 {
                continue;
            }
            match merged.last_mut() {
                Some(last) if last.attributes == run.attributes => last.len += run.len,
                _ => merged.push(run),
            }
        }
        self.runs = merged;
    }
}

/// Find the nearest valid UTF-8 char boundary at or before `pos`
pub(crate) fn floor_char_boundary(text: &str, pos: usize) -> usize {
    if pos >= text.len() {
        return text.len();
    }
    let mut p = pos;
    while p > 0 && !text.is_char_boundary(p) {
        p -= 1;
    }
    p
}

/// Find the nearest valid UTF-8 char boundary at or after `pos`
pub(crate) fn ceil_char_boundary(text: &str, pos: usize) -> usize {
    if pos >= text.len() {
        return text.len();
    }
    let mut p = pos;
    while p < text.len() && !text.is_char_boundary(p) {
        p += 1;
    }
    p
}

/// The final result of a parse: text, style spans and embedded units
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyledText {
    text: String,
    spans: Vec<AttributeRun>,
    attachments: Vec<Attachment>,
}

impl StyledText {
    /// The decoded text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The text with embedded units removed
    pub fn plain_text(&self) -> String {
        self.text.chars().filter(|&c| c != OBJECT_REPLACEMENT).collect()
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Styled runs in text order; unstyled text has no span
    pub fn spans(&self) -> &[AttributeRun] {
        &self.spans
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Attributes of the character at `offset`
    pub fn attributes_at(&self, offset: usize) -> Option<&Attributes> {
        self.spans
            .iter()
            .find(|span| span.contains(offset))
            .map(|span| &span.attributes)
    }

    /// Attributes at the first occurrence of `needle` in the text
    pub fn attributes_of(&self, needle: &str) -> Option<&Attributes> {
        let start = self.text.find(needle)?;
        self.attributes_at(start)
    }

    /// Spans that carry `key`
    pub fn spans_with<'a>(
        &'a self,
        key: &'a AttributeKey,
    ) -> impl Iterator<Item = &'a AttributeRun> + 'a {
        self.spans
            .iter()
            .filter(move |span| span.attributes.contains_key(key))
    }
}

impl fmt::Display for StyledText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
