use crate::{
    AlignItems, Bounds, Display, Edges, FlexDirection, JustifyContent, Length, Overflow, Pixels,
    Position, Size, Style, point, size,
};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt::Debug;
use taffy::{
    TaffyTree,
    geometry::{Rect as TaffyRect, Size as TaffySize},
    style::{
        AvailableSpace as TaffyAvailableSpace, Dimension, LengthPercentage, LengthPercentageAuto,
    },
    tree::NodeId,
};

/// A unique identifier for a layout node.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash)]
#[repr(transparent)]
pub struct LayoutId(NodeId);

impl From<LayoutId> for NodeId {
    fn from(layout_id: LayoutId) -> NodeId {
        layout_id.0
    }
}

impl From<NodeId> for LayoutId {
    fn from(node_id: NodeId) -> Self {
        LayoutId(node_id)
    }
}

/// Measures a leaf from its known dimensions and the space available to it.
pub type MeasureFn = Box<dyn FnMut(Size<Option<Pixels>>, Size<AvailableSpace>) -> Size<Pixels>>;

/// The layout collaborator. Nodes live for one frame and are discarded by
/// [`LayoutEngine::clear`].
pub trait LayoutEngine {
    fn request_layout(&mut self, style: &Style, children: &[LayoutId]) -> LayoutId;

    fn request_measured_layout(&mut self, style: &Style, measure: MeasureFn) -> LayoutId;

    fn compute_layout(&mut self, root: LayoutId, available_space: Size<AvailableSpace>);

    /// Bounds of a node relative to the window's origin.
    fn layout_bounds(&mut self, id: LayoutId) -> Bounds<Pixels>;

    fn clear(&mut self);
}

const EXPECT_MESSAGE: &str = "we should avoid taffy layout errors by construction if possible";

struct NodeContext {
    measure: MeasureFn,
}

/// The default [`LayoutEngine`], backed by Taffy's flexbox and block solvers.
pub struct TaffyLayoutEngine {
    taffy: TaffyTree<NodeContext>,
    absolute_layout_bounds: FxHashMap<LayoutId, Bounds<Pixels>>,
}

impl Default for TaffyLayoutEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TaffyLayoutEngine {
    pub fn new() -> Self {
        let mut taffy = TaffyTree::new();
        taffy.disable_rounding();
        TaffyLayoutEngine {
            taffy,
            absolute_layout_bounds: FxHashMap::default(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.taffy.total_node_count()
    }
}

impl LayoutEngine for TaffyLayoutEngine {
    fn request_layout(&mut self, style: &Style, children: &[LayoutId]) -> LayoutId {
        let taffy_style = style.to_taffy();
        if children.is_empty() {
            self.taffy.new_leaf(taffy_style).expect(EXPECT_MESSAGE).into()
        } else {
            let children = children
                .iter()
                .map(|child| NodeId::from(*child))
                .collect::<SmallVec<[NodeId; 8]>>();
            self.taffy
                .new_with_children(taffy_style, &children)
                .expect(EXPECT_MESSAGE)
                .into()
        }
    }

    fn request_measured_layout(&mut self, style: &Style, measure: MeasureFn) -> LayoutId {
        self.taffy
            .new_leaf_with_context(style.to_taffy(), NodeContext { measure })
            .expect(EXPECT_MESSAGE)
            .into()
    }

    fn compute_layout(&mut self, root: LayoutId, available_space: Size<AvailableSpace>) {
        self.absolute_layout_bounds.clear();
        self.taffy
            .compute_layout_with_measure(
                root.into(),
                available_space.into(),
                |known_dimensions, available_space, _node_id, node_context, _style| {
                    let Some(node_context) = node_context else {
                        return TaffySize::ZERO;
                    };
                    let known_dimensions = Size {
                        width: known_dimensions.width.map(Pixels),
                        height: known_dimensions.height.map(Pixels),
                    };
                    let available_space = Size {
                        width: available_space.width.into(),
                        height: available_space.height.into(),
                    };
                    let measured = (node_context.measure)(known_dimensions, available_space);
                    TaffySize {
                        width: known_dimensions.width.unwrap_or(measured.width).0,
                        height: known_dimensions.height.unwrap_or(measured.height).0,
                    }
                },
            )
            .expect(EXPECT_MESSAGE);
    }

    fn layout_bounds(&mut self, id: LayoutId) -> Bounds<Pixels> {
        if let Some(bounds) = self.absolute_layout_bounds.get(&id) {
            return *bounds;
        }

        let layout = self.taffy.layout(id.into()).expect(EXPECT_MESSAGE);
        let mut bounds = Bounds {
            origin: point(Pixels(layout.location.x), Pixels(layout.location.y)),
            size: size(Pixels(layout.size.width), Pixels(layout.size.height)),
        };

        if let Some(parent_id) = self.taffy.parent(id.0) {
            let parent_bounds = self.layout_bounds(parent_id.into());
            bounds.origin = bounds.origin + parent_bounds.origin;
        }
        self.absolute_layout_bounds.insert(id, bounds);
        bounds
    }

    fn clear(&mut self) {
        self.taffy.clear();
        self.absolute_layout_bounds.clear();
    }
}

/// The amount of space available to an element during layout.
#[derive(Copy, Clone, Default, Debug, PartialEq)]
pub enum AvailableSpace {
    /// The amount of space available is the specified number of pixels.
    Definite(Pixels),
    /// The amount of space available is indefinite and the node should be laid out
    /// under a min-content constraint.
    #[default]
    MinContent,
    /// The amount of space available is indefinite and the node should be laid out
    /// under a max-content constraint.
    MaxContent,
}

impl AvailableSpace {
    pub const fn min_size() -> Size<Self> {
        Size {
            width: Self::MinContent,
            height: Self::MinContent,
        }
    }

    pub const fn max_size() -> Size<Self> {
        Size {
            width: Self::MaxContent,
            height: Self::MaxContent,
        }
    }

    /// The definite amount of space, if any.
    pub fn definite(self) -> Option<Pixels> {
        match self {
            AvailableSpace::Definite(pixels) => Some(pixels),
            _ => None,
        }
    }
}

impl From<AvailableSpace> for TaffyAvailableSpace {
    fn from(space: AvailableSpace) -> TaffyAvailableSpace {
        match space {
            AvailableSpace::Definite(Pixels(value)) => TaffyAvailableSpace::Definite(value),
            AvailableSpace::MinContent => TaffyAvailableSpace::MinContent,
            AvailableSpace::MaxContent => TaffyAvailableSpace::MaxContent,
        }
    }
}

impl From<TaffyAvailableSpace> for AvailableSpace {
    fn from(space: TaffyAvailableSpace) -> AvailableSpace {
        match space {
            TaffyAvailableSpace::Definite(value) => AvailableSpace::Definite(Pixels(value)),
            TaffyAvailableSpace::MinContent => AvailableSpace::MinContent,
            TaffyAvailableSpace::MaxContent => AvailableSpace::MaxContent,
        }
    }
}

impl From<Pixels> for AvailableSpace {
    fn from(pixels: Pixels) -> Self {
        AvailableSpace::Definite(pixels)
    }
}

impl From<Size<Pixels>> for Size<AvailableSpace> {
    fn from(size: Size<Pixels>) -> Self {
        Size {
            width: AvailableSpace::Definite(size.width),
            height: AvailableSpace::Definite(size.height),
        }
    }
}

impl From<Size<AvailableSpace>> for TaffySize<TaffyAvailableSpace> {
    fn from(size: Size<AvailableSpace>) -> Self {
        TaffySize {
            width: size.width.into(),
            height: size.height.into(),
        }
    }
}

trait ToTaffy<Output> {
    fn to_taffy(&self) -> Output;
}

impl ToTaffy<taffy::style::Style> for Style {
    fn to_taffy(&self) -> taffy::style::Style {
        let mut style = taffy::style::Style::default();
        style.display = match self.display {
            Display::Flex => taffy::style::Display::Flex,
            Display::Block => taffy::style::Display::Block,
            Display::None => taffy::style::Display::None,
        };
        style.position = match self.position {
            Position::Relative => taffy::style::Position::Relative,
            Position::Absolute => taffy::style::Position::Absolute,
        };
        style.inset = self.inset.to_taffy();
        style.overflow = taffy::geometry::Point {
            x: self.overflow.x.to_taffy(),
            y: self.overflow.y.to_taffy(),
        };
        style.flex_direction = match self.flex_direction {
            FlexDirection::Row => taffy::style::FlexDirection::Row,
            FlexDirection::Column => taffy::style::FlexDirection::Column,
            FlexDirection::RowReverse => taffy::style::FlexDirection::RowReverse,
            FlexDirection::ColumnReverse => taffy::style::FlexDirection::ColumnReverse,
        };
        style.flex_grow = self.flex_grow;
        style.flex_shrink = self.flex_shrink;
        style.flex_basis = self.flex_basis.to_taffy();
        style.align_items = self.align_items.map(|align| match align {
            AlignItems::Start => taffy::style::AlignItems::Start,
            AlignItems::End => taffy::style::AlignItems::End,
            AlignItems::Center => taffy::style::AlignItems::Center,
            AlignItems::Stretch => taffy::style::AlignItems::Stretch,
        });
        style.justify_content = self.justify_content.map(|justify| match justify {
            JustifyContent::Start => taffy::style::JustifyContent::Start,
            JustifyContent::End => taffy::style::JustifyContent::End,
            JustifyContent::Center => taffy::style::JustifyContent::Center,
            JustifyContent::SpaceBetween => taffy::style::JustifyContent::SpaceBetween,
        });
        style.size = self.size.to_taffy();
        style.min_size = self.min_size.to_taffy();
        style.max_size = self.max_size.to_taffy();
        style.margin = self.margin.to_taffy();
        style.padding = self.padding.to_taffy();
        style.border = self.border_widths.to_taffy();
        style.gap = TaffySize {
            width: LengthPercentage::length(self.gap.width.0),
            height: LengthPercentage::length(self.gap.height.0),
        };
        style
    }
}

impl ToTaffy<taffy::style::Overflow> for Overflow {
    fn to_taffy(&self) -> taffy::style::Overflow {
        match self {
            Overflow::Visible => taffy::style::Overflow::Visible,
            Overflow::Hidden => taffy::style::Overflow::Hidden,
            Overflow::Scroll => taffy::style::Overflow::Scroll,
        }
    }
}

impl ToTaffy<Dimension> for Length {
    fn to_taffy(&self) -> Dimension {
        match self {
            Length::Definite(pixels) => Dimension::length(pixels.0),
            Length::Fraction(fraction) => Dimension::percent(*fraction),
            Length::Auto => Dimension::auto(),
        }
    }
}

impl ToTaffy<LengthPercentageAuto> for Length {
    fn to_taffy(&self) -> LengthPercentageAuto {
        match self {
            Length::Definite(pixels) => LengthPercentageAuto::length(pixels.0),
            Length::Fraction(fraction) => LengthPercentageAuto::percent(*fraction),
            Length::Auto => LengthPercentageAuto::auto(),
        }
    }
}

impl ToTaffy<LengthPercentage> for Pixels {
    fn to_taffy(&self) -> LengthPercentage {
        LengthPercentage::length(self.0)
    }
}

impl<T, U> ToTaffy<TaffySize<U>> for Size<T>
where
    T: ToTaffy<U> + Clone + Debug,
{
    fn to_taffy(&self) -> TaffySize<U> {
        TaffySize {
            width: self.width.to_taffy(),
            height: self.height.to_taffy(),
        }
    }
}

impl<T, U> ToTaffy<TaffyRect<U>> for Edges<T>
where
    T: ToTaffy<U> + Clone + Debug,
{
    fn to_taffy(&self) -> TaffyRect<U> {
        TaffyRect {
            top: self.top.to_taffy(),
            right: self.right.to_taffy(),
            bottom: self.bottom.to_taffy(),
            left: self.left.to_taffy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::px;

    fn fixed(width: f32, height: f32) -> Style {
        Style {
            size: size(Length::Definite(px(width)), Length::Definite(px(height))),
            ..Default::default()
        }
    }

    #[test]
    fn test_child_bounds_are_absolute() {
        let mut engine = TaffyLayoutEngine::new();
        let first = engine.request_layout(&fixed(30., 10.), &[]);
        let second = engine.request_layout(&fixed(20., 10.), &[]);
        let root = engine.request_layout(
            &Style {
                padding: Edges::all(px(5.)),
                gap: size(px(4.), px(4.)),
                ..fixed(100., 40.)
            },
            &[first, second],
        );
        engine.compute_layout(root, size(px(100.), px(40.)).into());

        assert_eq!(
            engine.layout_bounds(second),
            Bounds::new(point(px(39.), px(5.)), size(px(20.), px(10.)))
        );
        assert_eq!(engine.layout_bounds(root).size, size(px(100.), px(40.)));
    }

    #[test]
    fn test_measured_leaf_is_sized_by_measure() {
        let mut engine = TaffyLayoutEngine::new();
        let calls = std::rc::Rc::new(std::cell::Cell::new(0));
        let leaf = engine.request_measured_layout(&Style::default(), {
            let calls = calls.clone();
            Box::new(move |_known, _available| {
                calls.set(calls.get() + 1);
                size(px(40.), px(16.))
            })
        });
        let root = engine.request_layout(
            &Style {
                flex_direction: FlexDirection::Column,
                align_items: Some(AlignItems::Start),
                ..fixed(50., 50.)
            },
            &[leaf],
        );
        engine.compute_layout(root, AvailableSpace::max_size());
        assert!(calls.get() > 0);
        assert_eq!(engine.layout_bounds(leaf).size, size(px(40.), px(16.)));

        engine.clear();
        assert_eq!(engine.node_count(), 0);
    }
}
