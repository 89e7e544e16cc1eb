use crate::{
    Bounds, Corners, Edges, Hsla, Pixels, Point, Quad, Shadow, Size, Window, point, px,
};
use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Display {
    #[default]
    Flex,
    Block,
    None,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Position {
    #[default]
    Relative,
    Absolute,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlexDirection {
    #[default]
    Row,
    Column,
    RowReverse,
    ColumnReverse,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    Scroll,
}

impl Overflow {
    pub fn clips(self) -> bool {
        !matches!(self, Overflow::Visible)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlignItems {
    Start,
    End,
    Center,
    Stretch,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JustifyContent {
    Start,
    End,
    Center,
    SpaceBetween,
}

/// A length that is resolved by the layout engine.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Length {
    Definite(Pixels),
    /// A fraction of the parent's size, `1.0` being the full size.
    Fraction(f32),
    #[default]
    Auto,
}

impl From<Pixels> for Length {
    fn from(pixels: Pixels) -> Self {
        Length::Definite(pixels)
    }
}

pub fn relative(fraction: f32) -> Length {
    Length::Fraction(fraction)
}

pub fn auto() -> Length {
    Length::Auto
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CursorStyle {
    #[default]
    Arrow,
    PointingHand,
    IBeam,
    ResizeLeftRight,
    ResizeUpDown,
    NotAllowed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoxShadow {
    pub color: Hsla,
    pub offset: Point<Pixels>,
    pub blur_radius: Pixels,
    pub spread_radius: Pixels,
}

/// The layout and paint properties of an element.
#[derive(Clone, Debug, PartialEq)]
pub struct Style {
    pub display: Display,
    pub position: Position,
    pub inset: Edges<Length>,
    pub flex_direction: FlexDirection,
    pub flex_grow: f32,
    pub flex_shrink: f32,
    pub flex_basis: Length,
    pub align_items: Option<AlignItems>,
    pub justify_content: Option<JustifyContent>,
    pub size: Size<Length>,
    pub min_size: Size<Length>,
    pub max_size: Size<Length>,
    pub margin: Edges<Length>,
    pub padding: Edges<Pixels>,
    pub gap: Size<Pixels>,
    pub overflow: Point<Overflow>,
    pub background: Option<Hsla>,
    pub border_widths: Edges<Pixels>,
    pub border_color: Option<Hsla>,
    pub corner_radii: Corners<Pixels>,
    pub box_shadow: SmallVec<[BoxShadow; 1]>,
    pub cursor: Option<CursorStyle>,
    pub text_color: Option<Hsla>,
    pub font_size: Option<Pixels>,
    pub opacity: Option<f32>,
}

impl Default for Style {
    fn default() -> Self {
        Style {
            display: Display::Flex,
            position: Position::Relative,
            inset: Edges::all(Length::Auto),
            flex_direction: FlexDirection::Row,
            flex_grow: 0.,
            flex_shrink: 1.,
            flex_basis: Length::Auto,
            align_items: None,
            justify_content: None,
            size: Size {
                width: Length::Auto,
                height: Length::Auto,
            },
            min_size: Size {
                width: Length::Auto,
                height: Length::Auto,
            },
            max_size: Size {
                width: Length::Auto,
                height: Length::Auto,
            },
            margin: Edges::all(Length::Definite(Pixels::ZERO)),
            padding: Edges::default(),
            gap: Size::default(),
            overflow: Point {
                x: Overflow::Visible,
                y: Overflow::Visible,
            },
            background: None,
            border_widths: Edges::default(),
            border_color: None,
            corner_radii: Corners::default(),
            box_shadow: SmallVec::new(),
            cursor: None,
            text_color: None,
            font_size: None,
            opacity: None,
        }
    }
}

/// Paint-only overrides applied for hover, active and focus states. Variants never
/// change layout, so they can be chosen during paint against live input state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyleRefinement {
    pub background: Option<Hsla>,
    pub border_color: Option<Hsla>,
    pub box_shadow: Option<SmallVec<[BoxShadow; 1]>>,
    pub cursor: Option<CursorStyle>,
    pub text_color: Option<Hsla>,
    pub opacity: Option<f32>,
}

impl StyleRefinement {
    pub fn bg(mut self, color: impl Into<Hsla>) -> Self {
        self.background = Some(color.into());
        self
    }

    pub fn border_color(mut self, color: impl Into<Hsla>) -> Self {
        self.border_color = Some(color.into());
        self
    }

    pub fn text_color(mut self, color: impl Into<Hsla>) -> Self {
        self.text_color = Some(color.into());
        self
    }

    pub fn shadow(mut self, shadows: impl IntoIterator<Item = BoxShadow>) -> Self {
        self.box_shadow = Some(shadows.into_iter().collect());
        self
    }

    pub fn cursor(mut self, cursor: CursorStyle) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn opacity(mut self, opacity: f32) -> Self {
        self.opacity = Some(opacity);
        self
    }
}

impl Style {
    pub fn refine(&mut self, refinement: &StyleRefinement) {
        if let Some(background) = refinement.background {
            self.background = Some(background);
        }
        if let Some(border_color) = refinement.border_color {
            self.border_color = Some(border_color);
        }
        if let Some(box_shadow) = &refinement.box_shadow {
            self.box_shadow = box_shadow.clone();
        }
        if let Some(cursor) = refinement.cursor {
            self.cursor = Some(cursor);
        }
        if let Some(text_color) = refinement.text_color {
            self.text_color = Some(text_color);
        }
        if let Some(opacity) = refinement.opacity {
            self.opacity = Some(opacity);
        }
    }

    pub fn refined(mut self, refinement: &StyleRefinement) -> Self {
        self.refine(refinement);
        self
    }

    /// Whether the content of this element is clipped to its bounds.
    pub fn clips_content(&self) -> bool {
        self.overflow.x.clips() || self.overflow.y.clips()
    }

    /// Paints shadows, background and border for an element occupying `bounds`.
    pub fn paint_background(&self, bounds: Bounds<Pixels>, window: &mut Window) {
        let opacity = self.opacity.unwrap_or(1.);
        if opacity <= 0. {
            return;
        }

        for shadow in &self.box_shadow {
            let shadow_bounds = bounds
                .offset(shadow.offset)
                .dilate(shadow.spread_radius);
            window.paint_shadow(Shadow {
                bounds: shadow_bounds,
                corner_radii: self.corner_radii,
                color: shadow.color.opacity(opacity),
                blur_radius: shadow.blur_radius,
                ..Default::default()
            });
        }

        let background = self.background.filter(|color| !color.is_transparent());
        let border_color = self
            .border_color
            .filter(|color| !color.is_transparent() && !self.border_widths.is_zero());
        if background.is_none() && border_color.is_none() {
            return;
        }
        window.paint_quad(Quad {
            bounds,
            background: background.unwrap_or_default().opacity(opacity),
            border_color: border_color.unwrap_or_default().opacity(opacity),
            border_widths: self.border_widths,
            corner_radii: self.corner_radii,
            ..Default::default()
        });
    }
}

/// Fluent setters for the [`Style`] of an element.
pub trait Styled: Sized {
    fn style(&mut self) -> &mut Style;

    fn block(mut self) -> Self {
        self.style().display = Display::Block;
        self
    }

    fn flex(mut self) -> Self {
        self.style().display = Display::Flex;
        self
    }

    fn hidden(mut self) -> Self {
        self.style().display = Display::None;
        self
    }

    fn flex_row(mut self) -> Self {
        self.style().flex_direction = FlexDirection::Row;
        self
    }

    fn flex_col(mut self) -> Self {
        self.style().flex_direction = FlexDirection::Column;
        self
    }

    fn flex_grow(mut self) -> Self {
        self.style().flex_grow = 1.;
        self
    }

    fn flex_none(mut self) -> Self {
        let style = self.style();
        style.flex_grow = 0.;
        style.flex_shrink = 0.;
        self
    }

    fn items_center(mut self) -> Self {
        self.style().align_items = Some(AlignItems::Center);
        self
    }

    fn items_start(mut self) -> Self {
        self.style().align_items = Some(AlignItems::Start);
        self
    }

    fn justify_center(mut self) -> Self {
        self.style().justify_content = Some(JustifyContent::Center);
        self
    }

    fn justify_between(mut self) -> Self {
        self.style().justify_content = Some(JustifyContent::SpaceBetween);
        self
    }

    fn w(mut self, width: impl Into<Length>) -> Self {
        self.style().size.width = width.into();
        self
    }

    fn h(mut self, height: impl Into<Length>) -> Self {
        self.style().size.height = height.into();
        self
    }

    fn size(mut self, size: impl Into<Length>) -> Self {
        let size = size.into();
        self.style().size = Size {
            width: size,
            height: size,
        };
        self
    }

    fn size_full(mut self) -> Self {
        self.style().size = Size {
            width: relative(1.),
            height: relative(1.),
        };
        self
    }

    fn w_full(mut self) -> Self {
        self.style().size.width = relative(1.);
        self
    }

    fn min_w(mut self, width: impl Into<Length>) -> Self {
        self.style().min_size.width = width.into();
        self
    }

    fn min_h(mut self, height: impl Into<Length>) -> Self {
        self.style().min_size.height = height.into();
        self
    }

    fn max_w(mut self, width: impl Into<Length>) -> Self {
        self.style().max_size.width = width.into();
        self
    }

    fn max_h(mut self, height: impl Into<Length>) -> Self {
        self.style().max_size.height = height.into();
        self
    }

    fn p(mut self, padding: Pixels) -> Self {
        self.style().padding = Edges::all(padding);
        self
    }

    fn px(mut self, padding: Pixels) -> Self {
        let style = self.style();
        style.padding.left = padding;
        style.padding.right = padding;
        self
    }

    fn py(mut self, padding: Pixels) -> Self {
        let style = self.style();
        style.padding.top = padding;
        style.padding.bottom = padding;
        self
    }

    fn m(mut self, margin: impl Into<Length>) -> Self {
        self.style().margin = Edges::all(margin.into());
        self
    }

    fn gap(mut self, gap: Pixels) -> Self {
        self.style().gap = Size {
            width: gap,
            height: gap,
        };
        self
    }

    fn absolute(mut self) -> Self {
        self.style().position = Position::Absolute;
        self
    }

    fn relative(mut self) -> Self {
        self.style().position = Position::Relative;
        self
    }

    fn top(mut self, top: impl Into<Length>) -> Self {
        self.style().inset.top = top.into();
        self
    }

    fn left(mut self, left: impl Into<Length>) -> Self {
        self.style().inset.left = left.into();
        self
    }

    fn right(mut self, right: impl Into<Length>) -> Self {
        self.style().inset.right = right.into();
        self
    }

    fn bottom(mut self, bottom: impl Into<Length>) -> Self {
        self.style().inset.bottom = bottom.into();
        self
    }

    fn overflow_hidden(mut self) -> Self {
        self.style().overflow = point(Overflow::Hidden, Overflow::Hidden);
        self
    }

    fn overflow_y_scroll(mut self) -> Self {
        self.style().overflow.y = Overflow::Scroll;
        self
    }

    fn overflow_x_scroll(mut self) -> Self {
        self.style().overflow.x = Overflow::Scroll;
        self
    }

    fn bg(mut self, color: impl Into<Hsla>) -> Self {
        self.style().background = Some(color.into());
        self
    }

    fn border(mut self, width: Pixels) -> Self {
        self.style().border_widths = Edges::all(width);
        self
    }

    fn border_color(mut self, color: impl Into<Hsla>) -> Self {
        self.style().border_color = Some(color.into());
        self
    }

    fn rounded(mut self, radius: Pixels) -> Self {
        self.style().corner_radii = Corners::all(radius);
        self
    }

    fn shadow(mut self, shadows: impl IntoIterator<Item = BoxShadow>) -> Self {
        self.style().box_shadow = shadows.into_iter().collect();
        self
    }

    fn shadow_md(self) -> Self {
        self.shadow([BoxShadow {
            color: crate::hsla(0., 0., 0., 0.1),
            offset: point(px(0.), px(4.)),
            blur_radius: px(6.),
            spread_radius: px(-1.),
        }])
    }

    fn cursor(mut self, cursor: CursorStyle) -> Self {
        self.style().cursor = Some(cursor);
        self
    }

    fn cursor_pointer(self) -> Self {
        self.cursor(CursorStyle::PointingHand)
    }

    fn text_color(mut self, color: impl Into<Hsla>) -> Self {
        self.style().text_color = Some(color.into());
        self
    }

    fn text_size(mut self, size: Pixels) -> Self {
        self.style().font_size = Some(size);
        self
    }

    fn opacity(mut self, opacity: f32) -> Self {
        self.style().opacity = Some(opacity);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{rgb, size};

    #[test]
    fn test_refinement_overrides_paint_properties_only() {
        let base = Style {
            size: size(Length::Definite(px(10.)), Length::Auto),
            background: Some(rgb(0x111111)),
            cursor: Some(CursorStyle::Arrow),
            ..Default::default()
        };
        let hovered = base.clone().refined(
            &StyleRefinement::default()
                .bg(rgb(0x222222))
                .cursor(CursorStyle::PointingHand),
        );
        assert_eq!(hovered.background, Some(rgb(0x222222)));
        assert_eq!(hovered.cursor, Some(CursorStyle::PointingHand));
        assert_eq!(hovered.size, base.size);

        let unchanged = base.clone().refined(&StyleRefinement::default());
        assert_eq!(unchanged, base);
    }
}
