//! `Div` is the general purpose container. It lays out its children with flexbox, paints
//! a background, and carries every kind of interactivity an element can have: event
//! handlers, hover/active/focus style variants, focus tracking, scrolling, a key context
//! and overlay triggers.

use crate::{
    AnyElement, App, Bounds, ClickEvent, DismissHandler, DispatchFlags, Element, ElementId,
    EventHandlers, FocusHandle, GlobalElementId, HitNodeId, HitTestNode, HitboxBehavior,
    IntoElement, KeyContext, KeyDownEvent, KeyUpEvent, LayoutId, MouseDownEvent,
    MouseEnterEvent, MouseLeaveEvent, MouseMoveEvent, MouseUpEvent, OverlayBuilder, OverlayKind,
    ParentElement, Pixels, Placement, Point, ResultExt, ScrollHandle, ScrollWheelEvent, Style,
    StyleRefinement, Styled, TextInputEvent, Window, size,
};
use smallvec::SmallVec;
use std::rc::Rc;

/// Interaction state shared by elements that can register a hit-test node.
#[derive(Default)]
pub struct Interactivity {
    pub(crate) element_id: Option<ElementId>,
    pub(crate) base_style: Style,
    hover_style: Option<StyleRefinement>,
    active_style: Option<StyleRefinement>,
    focus_style: Option<StyleRefinement>,
    handlers: EventHandlers,
    focus_handle: Option<FocusHandle>,
    scroll_handle: Option<ScrollHandle>,
    key_context: Option<KeyContext>,
    block_mouse: bool,
    allow_overflow: bool,
    tooltip: Option<OverlayBuilder>,
    popover: Option<PopoverTrigger>,
    modal: Option<ModalTrigger>,
}

struct PopoverTrigger {
    placement: Placement,
    builder: OverlayBuilder,
    on_dismiss: Option<DismissHandler>,
}

struct ModalTrigger {
    builder: OverlayBuilder,
    on_dismiss: Option<DismissHandler>,
}

fn wrap<E: 'static, R: Into<DispatchFlags>>(
    listener: impl Fn(&E, &mut Window, &mut App) -> R + 'static,
) -> impl Fn(&E, &mut Window, &mut App) -> DispatchFlags + 'static {
    move |event: &E, window: &mut Window, cx: &mut App| listener(event, window, cx).into()
}

impl Interactivity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this element needs a node in the hit-test tree.
    fn is_interactive(&self) -> bool {
        self.element_id.is_some()
            || !self.handlers.is_empty()
            || self.focus_handle.is_some()
            || self.scroll_handle.is_some()
            || self.key_context.is_some()
            || self.hover_style.is_some()
            || self.active_style.is_some()
            || self.block_mouse
            || self.tooltip.is_some()
            || self.base_style.cursor.is_some()
    }

    /// Registers the hit-test node and any overlays that are showing. Returns the node so
    /// children can be nested under it.
    pub(crate) fn prepaint(
        &mut self,
        global_id: &GlobalElementId,
        bounds: Bounds<Pixels>,
        window: &mut Window,
        cx: &mut App,
    ) -> Option<HitNodeId> {
        if let Some(tooltip) = &self.tooltip
            && window.is_hovered(global_id)
        {
            let element = tooltip(window, cx);
            window.register_overlay(OverlayKind::Tooltip, bounds, Placement::Below, element, None);
        }
        if let Some(popover) = self.popover.take() {
            let element = (popover.builder)(window, cx);
            window.register_overlay(
                OverlayKind::Popover,
                bounds,
                popover.placement,
                element,
                popover.on_dismiss,
            );
        }
        if let Some(modal) = self.modal.take() {
            let element = (modal.builder)(window, cx);
            window.register_overlay(
                OverlayKind::Modal,
                bounds,
                Placement::default(),
                element,
                modal.on_dismiss,
            );
        }

        if !self.is_interactive() {
            return None;
        }

        let mut node = HitTestNode::new(global_id.clone(), bounds);
        node.handlers = std::mem::take(&mut self.handlers);
        node.focus_handle = self.focus_handle;
        node.scroll_handle = self.scroll_handle.clone();
        node.key_context = self.key_context.clone();
        node.cursor = self
            .hover_style
            .as_ref()
            .and_then(|style| style.cursor)
            .or(self.base_style.cursor);
        node.allow_overflow = self.allow_overflow;
        if self.block_mouse {
            node.behavior = HitboxBehavior::BlockMouse;
        }
        Some(window.insert_hit_node(node))
    }

    /// The base style refined by the variants matching the live input state.
    pub(crate) fn computed_style(
        &self,
        global_id: &GlobalElementId,
        window: &Window,
        cx: &App,
    ) -> Style {
        let mut style = self.base_style.clone();
        if let Some(focus_style) = &self.focus_style
            && let Some(focus_handle) = &self.focus_handle
            && cx.is_focused(focus_handle)
        {
            style.refine(focus_style);
        }
        if let Some(hover_style) = &self.hover_style
            && window.is_hovered(global_id)
        {
            style.refine(hover_style);
        }
        if let Some(active_style) = &self.active_style
            && window.is_pressed(global_id)
        {
            style.refine(active_style);
        }
        style
    }
}

/// Builder methods for elements that own an [`Interactivity`].
pub trait InteractiveElement: Sized {
    fn interactivity(&mut self) -> &mut Interactivity;

    /// Gives the element a stable identity among its siblings. Elements keep their
    /// state, hover and press tracking across frames through this id.
    fn id(mut self, id: impl Into<ElementId>) -> Self {
        self.interactivity().element_id = Some(id.into());
        self
    }

    fn on_click<R: Into<DispatchFlags>>(
        mut self,
        listener: impl Fn(&ClickEvent, &mut Window, &mut App) -> R + 'static,
    ) -> Self {
        self.interactivity().handlers.on_click(wrap(listener));
        self
    }

    fn on_mouse_down<R: Into<DispatchFlags>>(
        mut self,
        listener: impl Fn(&MouseDownEvent, &mut Window, &mut App) -> R + 'static,
    ) -> Self {
        self.interactivity().handlers.on_mouse_down(wrap(listener));
        self
    }

    fn on_mouse_up<R: Into<DispatchFlags>>(
        mut self,
        listener: impl Fn(&MouseUpEvent, &mut Window, &mut App) -> R + 'static,
    ) -> Self {
        self.interactivity().handlers.on_mouse_up(wrap(listener));
        self
    }

    fn on_mouse_move<R: Into<DispatchFlags>>(
        mut self,
        listener: impl Fn(&MouseMoveEvent, &mut Window, &mut App) -> R + 'static,
    ) -> Self {
        self.interactivity().handlers.on_mouse_move(wrap(listener));
        self
    }

    fn on_mouse_enter<R: Into<DispatchFlags>>(
        mut self,
        listener: impl Fn(&MouseEnterEvent, &mut Window, &mut App) -> R + 'static,
    ) -> Self {
        self.interactivity().handlers.on_mouse_enter(wrap(listener));
        self
    }

    fn on_mouse_leave<R: Into<DispatchFlags>>(
        mut self,
        listener: impl Fn(&MouseLeaveEvent, &mut Window, &mut App) -> R + 'static,
    ) -> Self {
        self.interactivity().handlers.on_mouse_leave(wrap(listener));
        self
    }

    fn on_scroll_wheel<R: Into<DispatchFlags>>(
        mut self,
        listener: impl Fn(&ScrollWheelEvent, &mut Window, &mut App) -> R + 'static,
    ) -> Self {
        self.interactivity().handlers.on_scroll_wheel(wrap(listener));
        self
    }

    /// Key events reach the element while it or one of its descendants is focused.
    fn on_key_down<R: Into<DispatchFlags>>(
        mut self,
        listener: impl Fn(&KeyDownEvent, &mut Window, &mut App) -> R + 'static,
    ) -> Self {
        self.interactivity().handlers.on_key_down(wrap(listener));
        self
    }

    fn on_key_up<R: Into<DispatchFlags>>(
        mut self,
        listener: impl Fn(&KeyUpEvent, &mut Window, &mut App) -> R + 'static,
    ) -> Self {
        self.interactivity().handlers.on_key_up(wrap(listener));
        self
    }

    fn on_text_input<R: Into<DispatchFlags>>(
        mut self,
        listener: impl Fn(&TextInputEvent, &mut Window, &mut App) -> R + 'static,
    ) -> Self {
        self.interactivity().handlers.on_text_input(wrap(listener));
        self
    }

    /// Makes the element focusable. Clicking it focuses `handle` unless a mouse down
    /// handler prevents the default.
    fn track_focus(mut self, handle: &FocusHandle) -> Self {
        self.interactivity().focus_handle = Some(*handle);
        self
    }

    /// Makes the element a scroll container driven by `handle`. Overflowing content is
    /// clipped.
    fn track_scroll(mut self, handle: &ScrollHandle) -> Self {
        let interactivity = self.interactivity();
        interactivity.scroll_handle = Some(handle.clone());
        if !interactivity.base_style.clips_content() {
            interactivity.base_style.overflow.y = crate::Overflow::Scroll;
        }
        self
    }

    /// Sets the key context seen by key handlers on the focus path. Contexts that fail
    /// to parse are logged and ignored.
    fn key_context<C, E>(mut self, key_context: C) -> Self
    where
        C: TryInto<KeyContext, Error = E>,
        E: std::fmt::Debug,
    {
        if let Some(key_context) = key_context.try_into().log_err() {
            self.interactivity().key_context = Some(key_context);
        }
        self
    }

    fn hover(mut self, f: impl FnOnce(StyleRefinement) -> StyleRefinement) -> Self {
        self.interactivity().hover_style = Some(f(StyleRefinement::default()));
        self
    }

    /// Applied while the mouse is pressed on the element.
    fn active(mut self, f: impl FnOnce(StyleRefinement) -> StyleRefinement) -> Self {
        self.interactivity().active_style = Some(f(StyleRefinement::default()));
        self
    }

    /// Applied while the tracked focus handle is focused.
    fn focus(mut self, f: impl FnOnce(StyleRefinement) -> StyleRefinement) -> Self {
        self.interactivity().focus_style = Some(f(StyleRefinement::default()));
        self
    }

    /// Elements painted beneath this one do not receive mouse events where they
    /// overlap it.
    fn occlude(mut self) -> Self {
        self.interactivity().block_mouse = true;
        self
    }

    /// Children positioned outside this element's bounds still receive mouse events.
    fn allow_overflow(mut self) -> Self {
        self.interactivity().allow_overflow = true;
        self
    }

    /// Shows the built element below this one while it is hovered.
    fn tooltip(mut self, build: impl Fn(&mut Window, &mut App) -> AnyElement + 'static) -> Self {
        self.interactivity().tooltip = Some(Rc::new(build));
        self
    }

    /// Shows the built element next to this one. Attach it only while the popover is
    /// open; `on_dismiss` is kept for the popover's owner to close it.
    fn popover(
        mut self,
        placement: Placement,
        build: impl Fn(&mut Window, &mut App) -> AnyElement + 'static,
    ) -> Self {
        self.interactivity().popover = Some(PopoverTrigger {
            placement,
            builder: Rc::new(build),
            on_dismiss: None,
        });
        self
    }

    /// Shows the built element centered in the window above a backdrop that blocks the
    /// rest of the window. Clicking the backdrop calls `on_dismiss`.
    fn modal(
        mut self,
        build: impl Fn(&mut Window, &mut App) -> AnyElement + 'static,
        on_dismiss: impl Fn(&mut Window, &mut App) + 'static,
    ) -> Self {
        self.interactivity().modal = Some(ModalTrigger {
            builder: Rc::new(build),
            on_dismiss: Some(Rc::new(on_dismiss)),
        });
        self
    }
}

/// A flexbox container.
pub struct Div {
    interactivity: Interactivity,
    children: SmallVec<[AnyElement; 2]>,
}

#[track_caller]
pub fn div() -> Div {
    Div {
        interactivity: Interactivity::new(),
        children: SmallVec::new(),
    }
}

impl Styled for Div {
    fn style(&mut self) -> &mut Style {
        &mut self.interactivity.base_style
    }
}

impl InteractiveElement for Div {
    fn interactivity(&mut self) -> &mut Interactivity {
        &mut self.interactivity
    }
}

impl ParentElement for Div {
    fn extend(&mut self, elements: impl IntoIterator<Item = AnyElement>) {
        self.children.extend(elements);
    }
}

impl IntoElement for Div {
    type Element = Self;

    fn into_element(self) -> Self::Element {
        self
    }
}

impl Element for Div {
    type RequestLayoutState = ();
    type PrepaintState = Option<HitNodeId>;

    fn id(&self) -> Option<ElementId> {
        self.interactivity.element_id.clone()
    }

    fn request_layout(
        &mut self,
        _id: &GlobalElementId,
        window: &mut Window,
        cx: &mut App,
    ) -> (LayoutId, Self::RequestLayoutState) {
        let style = &self.interactivity.base_style;
        let children = &mut self.children;
        let child_layout_ids = window.with_text_style(style.text_color, style.font_size, |window| {
            children
                .iter_mut()
                .map(|child| child.request_layout(window, cx))
                .collect::<SmallVec<[LayoutId; 4]>>()
        });
        let layout_id = window.request_layout(&self.interactivity.base_style, &child_layout_ids);
        (layout_id, ())
    }

    fn prepaint(
        &mut self,
        id: &GlobalElementId,
        bounds: Bounds<Pixels>,
        _request_layout: &mut Self::RequestLayoutState,
        window: &mut Window,
        cx: &mut App,
    ) -> Self::PrepaintState {
        let hit_node = self.interactivity.prepaint(id, bounds, window, cx);
        let content_mask = self
            .interactivity
            .base_style
            .clips_content()
            .then_some(bounds);
        let scroll_offset = self
            .interactivity
            .scroll_handle
            .as_ref()
            .map(|handle| handle.offset())
            .unwrap_or_default();

        let children = &mut self.children;
        let mut prepaint_children = |window: &mut Window| {
            window.with_content_mask(content_mask, |window| {
                window.with_element_offset(-scroll_offset, |window| {
                    for child in children.iter_mut() {
                        child.prepaint(window, cx);
                    }
                })
            })
        };
        match hit_node {
            Some(hit_node) => window.with_hit_node(hit_node, prepaint_children),
            None => prepaint_children(window),
        }

        if let Some(scroll_handle) = &self.interactivity.scroll_handle {
            let padding = self.interactivity.base_style.padding;
            let content_bottom_right = self
                .children
                .iter()
                .filter_map(|child| child.bounds())
                .fold(bounds.origin, |corner, child| {
                    let child_corner = child.bottom_right() + scroll_offset;
                    Point {
                        x: corner.x.max(child_corner.x),
                        y: corner.y.max(child_corner.y),
                    }
                });
            let content_size = size(
                content_bottom_right.x - bounds.origin.x + padding.right,
                content_bottom_right.y - bounds.origin.y + padding.bottom,
            );
            scroll_handle.update_layout(bounds, content_size);
            if scroll_handle.offset() != scroll_offset {
                log::trace!("scroll offset of {id:?} was clamped to its content");
                cx.mark_window_dirty(scroll_handle.window_id());
            }
        }
        hit_node
    }

    fn paint(
        &mut self,
        id: &GlobalElementId,
        bounds: Bounds<Pixels>,
        _request_layout: &mut Self::RequestLayoutState,
        _hit_node: &mut Self::PrepaintState,
        window: &mut Window,
        cx: &mut App,
    ) {
        let style = self.interactivity.computed_style(id, window, cx);
        style.paint_background(bounds, window);

        let content_mask = style.clips_content().then_some(bounds);
        window.with_content_mask(content_mask, |window| {
            window.with_text_style(style.text_color, style.font_size, |window| {
                for child in &mut self.children {
                    child.paint(window, cx);
                }
            })
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Render, TestAppContext, ViewContext, black, point, px, rgb};

    #[test]
    fn test_only_interactive_divs_register_nodes() {
        let mut cx = TestAppContext::new();
        let window_id = cx.open_window_with(|| {
            div()
                .size_full()
                .child(div().size(px(10.)))
                .child(div().id("named").size(px(10.)))
                .child(div().size(px(10.)).on_click(|_, _, _| {}))
        });
        cx.run_frame();
        let nodes = cx
            .read_window(window_id, |window, _| window.hit_tree().len())
            .unwrap();
        assert_eq!(nodes, 2);
    }

    #[test]
    fn test_hover_style_follows_pointer() {
        let mut cx = TestAppContext::new();
        let window_id = cx.open_window_with(|| {
            div()
                .id("target")
                .size(px(20.))
                .bg(black())
                .hover(|style| style.bg(rgb(0xff0000)))
        });
        let background = |cx: &TestAppContext| {
            cx.read_window(window_id, |window, _| {
                window
                    .rendered_scene()
                    .quads()
                    .last()
                    .map(|quad| quad.background)
            })
            .unwrap()
        };
        cx.simulate_mouse_move(window_id, point(px(100.), px(100.)));
        cx.run_frame();
        assert_eq!(background(&cx), Some(black()));

        cx.simulate_mouse_move(window_id, point(px(5.), px(5.)));
        assert!(cx.is_window_dirty(window_id));
        cx.run_frame();
        assert_eq!(background(&cx), Some(rgb(0xff0000)));
    }

    struct ScrollList {
        handle: ScrollHandle,
        rows: usize,
    }

    impl Render for ScrollList {
        fn render(&mut self, _cx: &mut ViewContext<Self>) -> impl IntoElement {
            div()
                .id("list")
                .flex()
                .flex_col()
                .size(px(20.))
                .track_scroll(&self.handle)
                .children((0..self.rows).map(|row| {
                    div()
                        .id(format!("row-{row}"))
                        .flex_none()
                        .w_full()
                        .h(px(20.))
                }))
        }
    }

    #[test]
    fn test_scroll_container_offsets_children() {
        let mut cx = TestAppContext::new();
        let (view, window_id) = cx.add_window_view(|window, cx| ScrollList {
            handle: cx.new_scroll_handle(window.id()),
            rows: 4,
        });
        let handle = view.read(&*cx).unwrap().handle.clone();
        let topmost = |cx: &TestAppContext| {
            cx.read_window(window_id, |window, _| {
                let tree = window.hit_tree();
                let path = tree.hit_test(point(px(5.), px(5.)));
                path.first()
                    .map(|id| format!("{:?}", tree.node(*id).id))
                    .unwrap_or_default()
            })
            .unwrap()
        };

        cx.run_frame();
        assert_eq!(handle.max_offset(), point(px(0.), px(60.)));
        assert!(topmost(&cx).ends_with("row-0"), "{}", topmost(&cx));

        cx.scroll_by(&handle, point(px(0.), px(25.)));
        assert!(cx.is_window_dirty(window_id));
        cx.run_frame();
        assert!(topmost(&cx).ends_with("row-1"), "{}", topmost(&cx));

        // Rows scrolled out of the container are clipped away from hit testing.
        let hit_above = cx
            .read_window(window_id, |window, _| {
                window.hit_tree().hit_test(point(px(5.), px(-3.))).len()
            })
            .unwrap();
        assert_eq!(hit_above, 0);
    }
}
