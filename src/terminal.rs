//! ANSI rendering of styled text using crossterm

use std::io::Write;

use crossterm::queue;
use crossterm::style::{
    Attribute, Color as TermColor, Print, ResetColor, SetAttribute, SetBackgroundColor,
    SetForegroundColor,
};
use unicode_width::UnicodeWidthChar;

use mdstyle::{AttributeKey, Attributes, Color, Result, StyledText, OBJECT_REPLACEMENT};

/// Writes a [`StyledText`] as ANSI-styled lines, wrapped to a width
pub struct Renderer {
    /// Display width in columns
    width: usize,
    /// Tab stop interval
    tab_width: usize,
}

impl Renderer {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
            tab_width: 4,
        }
    }

    /// Renderer sized to the current terminal (80 columns if unknown)
    pub fn detect() -> Self {
        let cols = crossterm::terminal::size().map(|(cols, _)| cols as usize).unwrap_or(80);
        Self::new(cols)
    }

    /// Render the whole text, one styled segment at a time
    pub fn render<W: Write>(&self, out: &mut W, styled: &StyledText) -> Result<()> {
        let text = styled.text();
        let mut column = 0;
        let mut pos = 0;

        while pos < text.len() {
            let end = segment_end(styled, pos);
            let attributes = styled.attributes_at(pos);
            if let Some(attributes) = attributes {
                apply_style(out, attributes)?;
            }
            for (offset, ch) in text[pos..end].char_indices() {
                if ch == OBJECT_REPLACEMENT {
                    let label = image_label(styled, pos + offset);
                    self.write_str(out, &label, &mut column)?;
                } else {
                    self.write_char(out, ch, &mut column)?;
                }
            }
            if attributes.is_some() {
                queue!(out, ResetColor, SetAttribute(Attribute::Reset))?;
            }
            pos = end;
        }

        if column > 0 {
            queue!(out, Print('\n'))?;
        }
        out.flush()?;
        Ok(())
    }

    fn write_str<W: Write>(&self, out: &mut W, s: &str, column: &mut usize) -> Result<()> {
        for ch in s.chars() {
            self.write_char(out, ch, column)?;
        }
        Ok(())
    }

    /// Write one character, expanding tabs and wrapping at the width
    fn write_char<W: Write>(&self, out: &mut W, ch: char, column: &mut usize) -> Result<()> {
        match ch {
            '\n' => {
                queue!(out, Print('\n'))?;
                *column = 0;
            }
            '\t' => {
                let spaces = self.tab_width - (*column % self.tab_width);
                for _ in 0..spaces {
                    self.write_char(out, ' ', column)?;
                }
            }
            '\u{a0}' => self.write_char(out, ' ', column)?,
            _ => {
                let width = UnicodeWidthChar::width(ch).unwrap_or(0);
                if *column + width > self.width {
                    queue!(out, Print('\n'))?;
                    *column = 0;
                }
                queue!(out, Print(ch))?;
                *column += width;
            }
        }
        Ok(())
    }
}

/// End of the uniform segment starting at `pos`
fn segment_end(styled: &StyledText, pos: usize) -> usize {
    match styled.spans().iter().find(|span| span.range.end > pos) {
        Some(span) if span.range.start <= pos => span.range.end,
        Some(span) => span.range.start,
        None => styled.len(),
    }
}

fn image_label(styled: &StyledText, offset: usize) -> String {
    match styled.attachments().iter().find(|a| a.offset == offset) {
        Some(a) => format!("[image: {} {}x{}]", a.image.name, a.image.width, a.image.height),
        None => "[image]".to_string(),
    }
}

fn apply_style<W: Write>(out: &mut W, attributes: &Attributes) -> Result<()> {
    if let Some(color) = attributes.color(&AttributeKey::Foreground) {
        queue!(out, SetForegroundColor(term_color(color)))?;
    }
    if let Some(color) = attributes.color(&AttributeKey::Background) {
        queue!(out, SetBackgroundColor(term_color(color)))?;
    }
    if let Some(font) = attributes.font() {
        if font.bold {
            queue!(out, SetAttribute(Attribute::Bold))?;
        }
        if font.italic {
            queue!(out, SetAttribute(Attribute::Italic))?;
        }
    }
    if attributes.flag(&AttributeKey::Underline) || attributes.link().is_some() {
        queue!(out, SetAttribute(Attribute::Underlined))?;
    }
    if attributes.flag(&AttributeKey::Strikethrough) {
        queue!(out, SetAttribute(Attribute::CrossedOut))?;
    }
    Ok(())
}

fn term_color(color: Color) -> TermColor {
    match color {
        Color::Default => TermColor::Reset,
        Color::Black => TermColor::Black,
        Color::Red => TermColor::DarkRed,
        Color::Green => TermColor::DarkGreen,
        Color::Yellow => TermColor::DarkYellow,
        Color::Blue => TermColor::DarkBlue,
        Color::Magenta => TermColor::DarkMagenta,
        Color::Cyan => TermColor::DarkCyan,
        Color::White => TermColor::Grey,
        Color::BrightBlack => TermColor::DarkGrey,
        Color::BrightRed => TermColor::Red,
        Color::BrightGreen => TermColor::Green,
        Color::BrightYellow => TermColor::Yellow,
        Color::BrightBlue => TermColor::Blue,
        Color::BrightMagenta => TermColor::Magenta,
        Color::BrightCyan => TermColor::Cyan,
        Color::BrightWhite => TermColor::White,
        Color::Rgb(r, g, b) => TermColor::Rgb { r, g, b },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdstyle::Parser;

    fn render_plain(width: usize, text: &str) -> String {
        let parser = Parser::builder().build();
        let mut out = Vec::new();
        Renderer::new(width).render(&mut out, &parser.parse(text)).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_plain_text_passes_through() {
        // Default attributes only carry a font, so no color codes appear
        let out = render_plain(80, "hello\nworld");
        assert!(out.contains("hello\nworld"));
    }

    #[test]
    fn test_wraps_and_expands_tabs() {
        let out = render_plain(4, "abcdef");
        assert!(out.contains("abcd\nef"));
        let out = render_plain(80, "\tx");
        assert!(out.contains("    x"));
    }

    #[test]
    fn test_styles_emit_escapes() {
        let parser = Parser::standard();
        let mut out = Vec::new();
        Renderer::new(80)
            .render(&mut out, &parser.parse("[a](http://example.com)"))
            .unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains('\u{1b}'));
        assert!(out.contains('a'));
    }

    #[test]
    fn test_term_color() {
        assert_eq!(term_color(Color::BrightBlack), TermColor::DarkGrey);
        assert_eq!(term_color(Color::Rgb(1, 2, 3)), TermColor::Rgb { r: 1, g: 2, b: 3 });
    }
}
