use crate::{
    App, AvailableSpace, Bounds, Element, ElementId, GlobalElementId, GlyphRun, IntoElement,
    LayoutId, Pixels, SharedString, Size, Style, Window, point, wrap_line,
};
use std::{cell::RefCell, rc::Rc};

/// A run of text measured by the window's [`crate::TextSystem`] and wrapped at
/// whitespace to the width the layout engine offers it. Color and font size are
/// inherited from the enclosing containers.
pub struct Text {
    text: SharedString,
    layout: TextLayout,
}

impl Text {
    pub fn new(text: impl Into<SharedString>) -> Self {
        Self {
            text: text.into(),
            layout: TextLayout::default(),
        }
    }

    /// The lines and metrics from the most recent measurement.
    pub fn layout(&self) -> &TextLayout {
        &self.layout
    }
}

/// Measurement results shared between the layout engine's measure callback and the
/// element.
#[derive(Clone, Default)]
pub struct TextLayout(Rc<RefCell<Option<TextLayoutInner>>>);

struct TextLayoutInner {
    lines: Vec<String>,
    line_height: Pixels,
    wrap_width: Option<Pixels>,
    size: Size<Pixels>,
}

impl TextLayout {
    fn layout(&self, text: SharedString, window: &mut Window) -> LayoutId {
        let text_style = window.text_style();
        let text_system = window.text_system().clone();
        let element_state = self.clone();

        window.request_measured_layout(
            &Style::default(),
            move |known_dimensions, available_space| {
                let wrap_width = known_dimensions.width.or(match available_space.width {
                    AvailableSpace::Definite(width) => Some(width),
                    AvailableSpace::MinContent | AvailableSpace::MaxContent => None,
                });

                if let Some(layout) = element_state.0.borrow().as_ref()
                    && layout.wrap_width == wrap_width
                {
                    return layout.size;
                }

                let font_size = text_style.font_size;
                let line_height = text_system.line_height(font_size);
                let lines = match wrap_width {
                    Some(width) => wrap_line(text_system.as_ref(), &text, font_size, width),
                    None => text.lines().map(str::to_string).collect(),
                };
                let width = lines
                    .iter()
                    .map(|line| text_system.layout_line(line, font_size).width)
                    .fold(Pixels::ZERO, Pixels::max);
                let size = Size {
                    width: width.ceil(),
                    height: line_height * lines.len().max(1) as f32,
                };

                element_state.0.borrow_mut().replace(TextLayoutInner {
                    lines,
                    line_height,
                    wrap_width,
                    size,
                });
                size
            },
        )
    }

    /// The wrapped lines, or `None` before the text has been measured.
    pub fn lines(&self) -> Option<Vec<String>> {
        self.0.borrow().as_ref().map(|layout| layout.lines.clone())
    }

    pub fn size(&self) -> Option<Size<Pixels>> {
        self.0.borrow().as_ref().map(|layout| layout.size)
    }

    fn paint(&self, text: &SharedString, bounds: Bounds<Pixels>, window: &mut Window) {
        let text_style = window.text_style();
        let layout = self.0.borrow();
        let (lines, line_height) = match layout.as_ref() {
            Some(layout) => (layout.lines.clone(), layout.line_height),
            None => (
                vec![text.to_string()],
                window.text_system().line_height(text_style.font_size),
            ),
        };
        drop(layout);

        for (ix, line) in lines.into_iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            window.paint_glyph_run(GlyphRun {
                origin: point(bounds.left(), bounds.top() + line_height * ix as f32),
                text: line.into(),
                font_size: text_style.font_size,
                color: text_style.color,
                ..Default::default()
            });
        }
    }
}

impl Element for Text {
    type RequestLayoutState = ();
    type PrepaintState = ();

    fn id(&self) -> Option<ElementId> {
        None
    }

    fn request_layout(
        &mut self,
        _id: &GlobalElementId,
        window: &mut Window,
        _cx: &mut App,
    ) -> (LayoutId, Self::RequestLayoutState) {
        (self.layout.layout(self.text.clone(), window), ())
    }

    fn prepaint(
        &mut self,
        _id: &GlobalElementId,
        _bounds: Bounds<Pixels>,
        _request_layout: &mut Self::RequestLayoutState,
        _window: &mut Window,
        _cx: &mut App,
    ) {
    }

    fn paint(
        &mut self,
        _id: &GlobalElementId,
        bounds: Bounds<Pixels>,
        _request_layout: &mut Self::RequestLayoutState,
        _prepaint: &mut Self::PrepaintState,
        window: &mut Window,
        _cx: &mut App,
    ) {
        self.layout.paint(&self.text, bounds, window);
    }
}

impl IntoElement for Text {
    type Element = Self;

    fn into_element(self) -> Self::Element {
        self
    }
}

impl IntoElement for SharedString {
    type Element = Text;

    fn into_element(self) -> Self::Element {
        Text::new(self)
    }
}

impl IntoElement for &'static str {
    type Element = Text;

    fn into_element(self) -> Self::Element {
        Text::new(self)
    }
}

impl IntoElement for String {
    type Element = Text;

    fn into_element(self) -> Self::Element {
        Text::new(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::{ParentElement, Styled, TestAppContext, div, px, rgb};

    #[test]
    fn test_text_wraps_to_container_width() {
        let mut cx = TestAppContext::new();
        // The test text system advances half the font size per character.
        let window_id = cx.open_window_with(|| {
            div()
                .flex()
                .flex_col()
                .w(px(40.))
                .text_size(px(10.))
                .text_color(rgb(0x336699))
                .child("wrap these words")
        });
        cx.run_frame();

        let runs = cx
            .read_window(window_id, |window, _| {
                window
                    .rendered_scene()
                    .glyph_runs()
                    .map(|run| (run.text.to_string(), run.origin.y, run.color))
                    .collect::<Vec<_>>()
            })
            .unwrap();
        assert_eq!(
            runs,
            vec![
                ("wrap".to_string(), px(0.), rgb(0x336699)),
                ("these".to_string(), px(12.5), rgb(0x336699)),
                ("words".to_string(), px(25.), rgb(0x336699)),
            ]
        );
    }
}
