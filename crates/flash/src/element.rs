//! Elements are the per-frame descriptors that make up a window's contents. Application
//! code rebuilds the element tree on every frame from [`crate::Render::render`], and the
//! window drives each element through three phases:
//!
//! 1. [`Element::request_layout`], bottom-up. Children request their layout first and
//!    the element asks the layout engine for a box that contains them.
//! 2. [`Element::prepaint`], top-down, once the layout engine has resolved bounds.
//!    Elements register hit-test nodes, focus and scroll handles and overlays here.
//! 3. [`Element::paint`], top-down. Elements push primitives into the scene, choosing
//!    style variants against the live hover, press and focus state.
//!
//! Overlays registered during prepaint are laid out as separate roots and painted after
//! the main tree, so they can never change the size of the element that triggered them.
//!
//! State that has to outlive a frame is stored with [`Window::with_element_state`],
//! keyed by the element's [`GlobalElementId`]. Give elements an explicit id when their
//! position among siblings can change; positional ids follow the allocation order.

use crate::{
    App, AvailableSpace, Bounds, Display, EntityId, LayoutId, Pixels, Point, SharedString, Size,
    Style, Window, util::FluentBuilder,
};
use smallvec::SmallVec;
use std::{any::Any, fmt, mem};

/// Implemented by types that participate in laying out and painting the contents of a
/// window.
pub trait Element: 'static + IntoElement {
    /// Returned from [`Element::request_layout`] and handed back to the later phases.
    type RequestLayoutState: 'static;

    /// Returned from [`Element::prepaint`] and handed back to [`Element::paint`].
    type PrepaintState: 'static;

    /// An explicit identity for this element among its siblings. Elements without one
    /// are identified by their position.
    fn id(&self) -> Option<ElementId>;

    fn request_layout(
        &mut self,
        id: &GlobalElementId,
        window: &mut Window,
        cx: &mut App,
    ) -> (LayoutId, Self::RequestLayoutState);

    fn prepaint(
        &mut self,
        id: &GlobalElementId,
        bounds: Bounds<Pixels>,
        request_layout: &mut Self::RequestLayoutState,
        window: &mut Window,
        cx: &mut App,
    ) -> Self::PrepaintState;

    fn paint(
        &mut self,
        id: &GlobalElementId,
        bounds: Bounds<Pixels>,
        request_layout: &mut Self::RequestLayoutState,
        prepaint: &mut Self::PrepaintState,
        window: &mut Window,
        cx: &mut App,
    );

    fn into_any(self) -> AnyElement {
        AnyElement::new(self)
    }
}

/// Implemented by any type that can be converted into an element.
pub trait IntoElement: Sized {
    type Element: Element;

    fn into_element(self) -> Self::Element;

    fn into_any_element(self) -> AnyElement {
        self.into_element().into_any()
    }
}

impl<T: IntoElement> FluentBuilder for T {}

/// Elements that accept any number of children.
pub trait ParentElement {
    fn extend(&mut self, elements: impl IntoIterator<Item = AnyElement>);

    fn child(mut self, child: impl IntoElement) -> Self
    where
        Self: Sized,
    {
        self.extend(std::iter::once(child.into_any_element()));
        self
    }

    fn children(mut self, children: impl IntoIterator<Item = impl IntoElement>) -> Self
    where
        Self: Sized,
    {
        self.extend(children.into_iter().map(|child| child.into_any_element()));
        self
    }
}

/// Identifies an element among its siblings.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ElementId {
    /// The root element of a view.
    View(EntityId),
    Integer(u64),
    Name(SharedString),
    /// Allocated from the element's position when it has no explicit id.
    Child(usize),
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementId::View(entity_id) => write!(f, "view-{entity_id}"),
            ElementId::Integer(id) => write!(f, "{id}"),
            ElementId::Name(name) => write!(f, "{name}"),
            ElementId::Child(index) => write!(f, "#{index}"),
        }
    }
}

impl From<&'static str> for ElementId {
    fn from(name: &'static str) -> Self {
        ElementId::Name(name.into())
    }
}

impl From<SharedString> for ElementId {
    fn from(name: SharedString) -> Self {
        ElementId::Name(name)
    }
}

impl From<String> for ElementId {
    fn from(name: String) -> Self {
        ElementId::Name(name.into())
    }
}

impl From<u64> for ElementId {
    fn from(id: u64) -> Self {
        ElementId::Integer(id)
    }
}

impl From<usize> for ElementId {
    fn from(id: usize) -> Self {
        ElementId::Integer(id as u64)
    }
}

/// The path of [`ElementId`]s from the window root to an element. Stable across frames
/// as long as the element is drawn at the same position, or with the same explicit id,
/// under the same parents.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct GlobalElementId(pub(crate) SmallVec<[ElementId; 8]>);

impl GlobalElementId {
    pub fn last(&self) -> Option<&ElementId> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `self` is `ancestor` or nested inside it.
    pub fn starts_with(&self, ancestor: &GlobalElementId) -> bool {
        self.0.starts_with(&ancestor.0)
    }
}

impl fmt::Debug for GlobalElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (ix, id) in self.0.iter().enumerate() {
            if ix > 0 {
                f.write_str("/")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

pub(crate) trait ElementObject {
    fn inner_element(&mut self) -> &mut dyn Any;

    fn request_layout(&mut self, window: &mut Window, cx: &mut App) -> LayoutId;

    fn prepaint(&mut self, window: &mut Window, cx: &mut App);

    fn paint(&mut self, window: &mut Window, cx: &mut App);

    fn layout_as_root(
        &mut self,
        available_space: Size<AvailableSpace>,
        window: &mut Window,
        cx: &mut App,
    ) -> Size<Pixels>;

    fn bounds(&self) -> Option<Bounds<Pixels>>;
}

/// A wrapper around an implementer of [`Element`] that tracks which phase it is in.
pub struct Drawable<E: Element> {
    pub element: E,
    phase: ElementDrawPhase<E::RequestLayoutState, E::PrepaintState>,
}

#[derive(Default)]
enum ElementDrawPhase<RequestLayoutState, PrepaintState> {
    #[default]
    Start,
    RequestLayout {
        layout_id: LayoutId,
        global_id: GlobalElementId,
        request_layout: RequestLayoutState,
    },
    LayoutComputed {
        layout_id: LayoutId,
        global_id: GlobalElementId,
        available_space: Size<AvailableSpace>,
        request_layout: RequestLayoutState,
    },
    Prepaint {
        global_id: GlobalElementId,
        bounds: Bounds<Pixels>,
        request_layout: RequestLayoutState,
        prepaint: PrepaintState,
    },
    Painted {
        bounds: Bounds<Pixels>,
    },
}

impl<R, P> ElementDrawPhase<R, P> {
    fn name(&self) -> &'static str {
        match self {
            ElementDrawPhase::Start => "start",
            ElementDrawPhase::RequestLayout { .. } => "request_layout",
            ElementDrawPhase::LayoutComputed { .. } => "layout_computed",
            ElementDrawPhase::Prepaint { .. } => "prepaint",
            ElementDrawPhase::Painted { .. } => "painted",
        }
    }
}

impl<E: Element> Drawable<E> {
    pub(crate) fn new(element: E) -> Self {
        Drawable {
            element,
            phase: ElementDrawPhase::Start,
        }
    }

    fn request_layout(&mut self, window: &mut Window, cx: &mut App) -> LayoutId {
        match mem::take(&mut self.phase) {
            ElementDrawPhase::Start => {
                let (global_id, (layout_id, request_layout)) =
                    window.with_element_id(self.element.id(), |global_id, window| {
                        let result = self.element.request_layout(global_id, window, cx);
                        (global_id.clone(), result)
                    });
                self.phase = ElementDrawPhase::RequestLayout {
                    layout_id,
                    global_id,
                    request_layout,
                };
                layout_id
            }
            phase => panic!(
                "must call request_layout only once, element was in {} phase",
                phase.name()
            ),
        }
    }

    fn prepaint(&mut self, window: &mut Window, cx: &mut App) {
        match mem::take(&mut self.phase) {
            ElementDrawPhase::RequestLayout {
                layout_id,
                global_id,
                mut request_layout,
            }
            | ElementDrawPhase::LayoutComputed {
                layout_id,
                global_id,
                mut request_layout,
                ..
            } => {
                let bounds = window.layout_bounds(layout_id);
                let prepaint = window.with_global_id(&global_id, |window| {
                    self.element
                        .prepaint(&global_id, bounds, &mut request_layout, window, cx)
                });
                self.phase = ElementDrawPhase::Prepaint {
                    global_id,
                    bounds,
                    request_layout,
                    prepaint,
                };
            }
            phase => panic!(
                "must call request_layout before prepaint, element was in {} phase",
                phase.name()
            ),
        }
    }

    fn paint(&mut self, window: &mut Window, cx: &mut App) {
        match mem::take(&mut self.phase) {
            ElementDrawPhase::Prepaint {
                global_id,
                bounds,
                mut request_layout,
                mut prepaint,
            } => {
                window.with_global_id(&global_id, |window| {
                    self.element.paint(
                        &global_id,
                        bounds,
                        &mut request_layout,
                        &mut prepaint,
                        window,
                        cx,
                    )
                });
                self.phase = ElementDrawPhase::Painted { bounds };
            }
            phase => panic!(
                "must call prepaint before paint, element was in {} phase",
                phase.name()
            ),
        }
    }

    fn layout_as_root(
        &mut self,
        available_space: Size<AvailableSpace>,
        window: &mut Window,
        cx: &mut App,
    ) -> Size<Pixels> {
        if matches!(&self.phase, ElementDrawPhase::Start) {
            self.request_layout(window, cx);
        }

        let layout_id = match mem::take(&mut self.phase) {
            ElementDrawPhase::RequestLayout {
                layout_id,
                global_id,
                request_layout,
            } => {
                window.compute_layout(layout_id, available_space);
                self.phase = ElementDrawPhase::LayoutComputed {
                    layout_id,
                    global_id,
                    available_space,
                    request_layout,
                };
                layout_id
            }
            ElementDrawPhase::LayoutComputed {
                layout_id,
                global_id,
                available_space: prev_available_space,
                request_layout,
            } => {
                if available_space != prev_available_space {
                    window.compute_layout(layout_id, available_space);
                }
                self.phase = ElementDrawPhase::LayoutComputed {
                    layout_id,
                    global_id,
                    available_space,
                    request_layout,
                };
                layout_id
            }
            _ => panic!("cannot measure after painting"),
        };

        window.layout_bounds(layout_id).size
    }
}

impl<E: Element> ElementObject for Drawable<E> {
    fn inner_element(&mut self) -> &mut dyn Any {
        &mut self.element
    }

    fn request_layout(&mut self, window: &mut Window, cx: &mut App) -> LayoutId {
        Drawable::request_layout(self, window, cx)
    }

    fn prepaint(&mut self, window: &mut Window, cx: &mut App) {
        Drawable::prepaint(self, window, cx);
    }

    fn paint(&mut self, window: &mut Window, cx: &mut App) {
        Drawable::paint(self, window, cx);
    }

    fn layout_as_root(
        &mut self,
        available_space: Size<AvailableSpace>,
        window: &mut Window,
        cx: &mut App,
    ) -> Size<Pixels> {
        Drawable::layout_as_root(self, available_space, window, cx)
    }

    fn bounds(&self) -> Option<Bounds<Pixels>> {
        match &self.phase {
            ElementDrawPhase::Prepaint { bounds, .. } | ElementDrawPhase::Painted { bounds } => {
                Some(*bounds)
            }
            _ => None,
        }
    }
}

/// A type-erased element.
pub struct AnyElement(Box<dyn ElementObject>);

impl AnyElement {
    pub(crate) fn new<E: Element>(element: E) -> Self {
        AnyElement(Box::new(Drawable::new(element)))
    }

    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.0.inner_element().downcast_mut::<T>()
    }

    pub fn request_layout(&mut self, window: &mut Window, cx: &mut App) -> LayoutId {
        self.0.request_layout(window, cx)
    }

    pub fn prepaint(&mut self, window: &mut Window, cx: &mut App) {
        self.0.prepaint(window, cx);
    }

    pub fn paint(&mut self, window: &mut Window, cx: &mut App) {
        self.0.paint(window, cx);
    }

    /// Requests layout if needed and computes it with this element as the root.
    pub fn layout_as_root(
        &mut self,
        available_space: Size<AvailableSpace>,
        window: &mut Window,
        cx: &mut App,
    ) -> Size<Pixels> {
        self.0.layout_as_root(available_space, window, cx)
    }

    /// Prepaints this element with its layout shifted to `origin`.
    pub fn prepaint_at(&mut self, origin: Point<Pixels>, window: &mut Window, cx: &mut App) {
        window.with_absolute_element_offset(origin, |window| self.prepaint(window, cx));
    }

    /// The bounds resolved for this element, once it has been prepainted.
    pub fn bounds(&self) -> Option<Bounds<Pixels>> {
        self.0.bounds()
    }
}

impl Default for AnyElement {
    fn default() -> Self {
        Empty.into_any()
    }
}

impl IntoElement for AnyElement {
    type Element = Self;

    fn into_element(self) -> Self::Element {
        self
    }

    fn into_any_element(self) -> AnyElement {
        self
    }
}

impl Element for AnyElement {
    type RequestLayoutState = ();
    type PrepaintState = ();

    fn id(&self) -> Option<ElementId> {
        None
    }

    fn request_layout(
        &mut self,
        _: &GlobalElementId,
        window: &mut Window,
        cx: &mut App,
    ) -> (LayoutId, Self::RequestLayoutState) {
        (AnyElement::request_layout(self, window, cx), ())
    }

    fn prepaint(
        &mut self,
        _: &GlobalElementId,
        _: Bounds<Pixels>,
        _: &mut Self::RequestLayoutState,
        window: &mut Window,
        cx: &mut App,
    ) {
        AnyElement::prepaint(self, window, cx);
    }

    fn paint(
        &mut self,
        _: &GlobalElementId,
        _: Bounds<Pixels>,
        _: &mut Self::RequestLayoutState,
        _: &mut Self::PrepaintState,
        window: &mut Window,
        cx: &mut App,
    ) {
        AnyElement::paint(self, window, cx);
    }
}

/// An element that takes no space and paints nothing.
pub struct Empty;

impl IntoElement for Empty {
    type Element = Self;

    fn into_element(self) -> Self::Element {
        self
    }
}

impl Element for Empty {
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
        let style = Style {
            display: Display::None,
            ..Default::default()
        };
        (window.request_layout(&style, &[]), ())
    }

    fn prepaint(
        &mut self,
        _id: &GlobalElementId,
        _bounds: Bounds<Pixels>,
        _state: &mut Self::RequestLayoutState,
        _window: &mut Window,
        _cx: &mut App,
    ) {
    }

    fn paint(
        &mut self,
        _id: &GlobalElementId,
        _bounds: Bounds<Pixels>,
        _request_layout: &mut Self::RequestLayoutState,
        _prepaint: &mut Self::PrepaintState,
        _window: &mut Window,
        _cx: &mut App,
    ) {
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Styled, TestAppContext, div, px, size};

    #[test]
    fn test_phases_run_in_order() {
        let mut cx = TestAppContext::new();
        let window_id = cx.open_empty_window();
        cx.update_window(window_id, |window, cx| {
            window.begin_layout_pass();
            let mut element = div().size(px(20.)).into_any_element();
            let size = element.layout_as_root(size(px(100.), px(100.)).into(), window, cx);
            assert_eq!(size, crate::size(px(20.), px(20.)));
            assert_eq!(element.bounds(), None);
            window.begin_prepaint_pass();
            element.prepaint_at(crate::point(px(5.), px(5.)), window, cx);
            assert_eq!(
                element.bounds().map(|bounds| bounds.origin),
                Some(crate::point(px(5.), px(5.)))
            );
            window.begin_paint_pass(cx);
            element.paint(window, cx);
        })
        .unwrap();
    }

    #[test]
    #[should_panic(expected = "must call request_layout before prepaint")]
    fn test_prepaint_before_layout_panics() {
        let mut cx = TestAppContext::new();
        let window_id = cx.open_empty_window();
        cx.update_window(window_id, |window, cx| {
            let mut element = Empty.into_any_element();
            element.prepaint(window, cx);
        })
        .ok();
    }

    #[test]
    fn test_global_id_debug_format() {
        let id = GlobalElementId(smallvec::smallvec![
            ElementId::Name("root".into()),
            ElementId::Child(2),
            ElementId::Integer(7),
        ]);
        assert_eq!(format!("{id:?}"), "root/#2/7");
    }
}
