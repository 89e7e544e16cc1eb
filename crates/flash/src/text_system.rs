use crate::{Hsla, Pixels, black, px};

/// Metrics of a single shaped line.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LineLayout {
    pub width: Pixels,
    pub ascent: Pixels,
    pub descent: Pixels,
}

impl LineLayout {
    pub fn height(&self) -> Pixels {
        self.ascent + self.descent
    }
}

/// Measures text for measured layout leaves. Shaping and glyph rasterization are the
/// platform's concern.
pub trait TextSystem {
    fn layout_line(&self, text: &str, font_size: Pixels) -> LineLayout;

    fn line_height(&self, font_size: Pixels) -> Pixels {
        font_size * 1.25
    }
}

/// Treats every character as the same advance. Used when the platform has no text
/// system of its own and in tests.
#[derive(Clone, Copy, Debug)]
pub struct MonospaceTextSystem {
    /// Advance of one character as a fraction of the font size.
    pub advance: f32,
}

impl Default for MonospaceTextSystem {
    fn default() -> Self {
        Self { advance: 0.5 }
    }
}

impl TextSystem for MonospaceTextSystem {
    fn layout_line(&self, text: &str, font_size: Pixels) -> LineLayout {
        let width = font_size * (self.advance * text.chars().count() as f32);
        LineLayout {
            width,
            ascent: font_size * 0.8,
            descent: font_size * 0.2,
        }
    }
}

/// Splits `text` into lines no wider than `max_width`, breaking at whitespace. Words
/// longer than a line are kept whole.
pub fn wrap_line(
    text_system: &dyn TextSystem,
    text: &str,
    font_size: Pixels,
    max_width: Pixels,
) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if !current.is_empty() && text_system.layout_line(&candidate, font_size).width > max_width
        {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

pub(crate) const DEFAULT_FONT_SIZE: Pixels = px(16.);

/// Text properties inherited from enclosing containers.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub color: Hsla,
    pub font_size: Pixels,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            color: black(),
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

impl TextStyle {
    pub fn refined(self, color: Option<Hsla>, font_size: Option<Pixels>) -> Self {
        Self {
            color: color.unwrap_or(self.color),
            font_size: font_size.unwrap_or(self.font_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_breaks_at_whitespace() {
        let text_system = MonospaceTextSystem { advance: 1. };
        let lines = wrap_line(&text_system, "one two three", px(1.), px(7.));
        assert_eq!(lines, vec!["one two", "three"]);

        let lines = wrap_line(&text_system, "enormous", px(1.), px(3.));
        assert_eq!(lines, vec!["enormous"]);

        assert_eq!(wrap_line(&text_system, "", px(1.), px(3.)), vec![""]);
    }
}
