use crate::{
    AnyElement, AnyView, App, AvailableSpace, Bounds, ClickEvent, CursorStyle, DispatchFlags,
    DispatchResult, DismissHandler, ElementId, EntityId, EventHandlers, FlashError,
    FocusHandle, FocusTree, GlobalElementId, GlyphRun, HitNodeId, Hsla, HitTestBuilder, HitTestNode,
    HitTestTree, HitboxBehavior, ImagePrimitive, IntoElement, KeyContext, KeyDownEvent,
    LayoutEngine, LayoutId, Listener, MeasureFn, Modifiers, MouseDownEvent,
    MouseEnterEvent, MouseLeaveEvent, MouseMoveEvent, MouseUpEvent, OverlayKind, OverlayManager,
    OverlayRequest, POPOVER_GAP, Path, Pixels, Placement, PlatformInput, PlatformWindow, Point,
    PreparedOverlay, Quad, RenderError, Result, Scene, ScrollWheelEvent, Shadow, Size, Style,
    SurfacePrimitive, TaffyLayoutEngine, TextStyle, TextSystem, WindowAppearance,
    WindowOptions, black, place_overlay, point,
};
use anyhow::Context as _;
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use std::{
    any::{Any, TypeId},
    mem,
    rc::Rc,
    time::Instant,
};


slotmap::new_key_type! {
    /// Identifies a window within its [`App`].
    pub struct WindowId;
}

/// The phase of the draw pass a window is in. Layout, prepaint and paint operations
/// assert the phase in debug builds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum DrawPhase {
    #[default]
    None,
    Layout,
    Prepaint,
    Paint,
}

/// Everything produced by one draw of a window.
#[derive(Default)]
pub(crate) struct Frame {
    pub(crate) scene: Scene,
    pub(crate) hit_tree: HitTestTree,
    element_states: FxHashMap<(GlobalElementId, TypeId), Box<dyn Any>>,
    pub(crate) rendered_views: FxHashSet<EntityId>,
}

impl Frame {
    fn clear(&mut self) {
        self.scene.clear();
        self.hit_tree = HitTestTree::default();
        self.element_states.clear();
        self.rendered_views.clear();
    }
}

struct PressState {
    event: MouseDownEvent,
    ids: SmallVec<[GlobalElementId; 8]>,
}

/// A platform window and the state of its last rendered frame.
///
/// Windows are owned by the [`App`]; use [`App::update_window`] to borrow one. The
/// window is redrawn by the frame scheduler whenever it is marked dirty.
pub struct Window {
    id: WindowId,
    platform_window: Box<dyn PlatformWindow>,
    options: WindowOptions,
    viewport_size: Size<Pixels>,
    scale_factor: f32,
    appearance: WindowAppearance,
    active: bool,
    pub(crate) root_view: Option<AnyView>,
    layout_engine: Box<dyn LayoutEngine>,
    text_system: Rc<dyn TextSystem>,
    pub(crate) rendered_frame: Frame,
    next_frame: Frame,
    next_focus_tree: FocusTree,
    hit_test_builder: HitTestBuilder,
    element_id_stack: GlobalElementId,
    child_counters: Vec<usize>,
    element_offset_stack: Vec<Point<Pixels>>,
    content_mask_stack: Vec<Bounds<Pixels>>,
    text_style_stack: Vec<TextStyle>,
    mouse_position: Point<Pixels>,
    modifiers: Modifiers,
    hovered: SmallVec<[GlobalElementId; 8]>,
    pressed: Option<PressState>,
    cursor: CursorStyle,
    key_context_stack: Vec<KeyContext>,
    pub(crate) overlays: OverlayManager,
    draw_phase: DrawPhase,
    removed: bool,
    debug_layout: bool,
}

impl Window {
    pub(crate) fn new(id: WindowId, options: WindowOptions, cx: &mut App) -> Result<Self> {
        let mut platform_window = cx
            .platform
            .open_window(id, &options)
            .with_context(|| format!("opening window {:?}", options.title.as_str()))?;
        if let Some(renderer) = platform_window.renderer() {
            renderer.initialize().context("initializing renderer")?;
        } else {
            log::warn!("window {id:?} has no renderer, frames will not be presented");
        }

        Ok(Window {
            id,
            viewport_size: platform_window.content_size(),
            scale_factor: platform_window.scale_factor(),
            platform_window,
            options,
            appearance: cx.platform.appearance(),
            active: true,
            root_view: None,
            layout_engine: Box::new(TaffyLayoutEngine::new()),
            text_system: cx.text_system.clone(),
            rendered_frame: Frame::default(),
            next_frame: Frame::default(),
            next_focus_tree: FocusTree::default(),
            hit_test_builder: HitTestBuilder::default(),
            element_id_stack: GlobalElementId::default(),
            child_counters: vec![0],
            element_offset_stack: Vec::new(),
            content_mask_stack: Vec::new(),
            text_style_stack: Vec::new(),
            mouse_position: Point::default(),
            modifiers: Modifiers::default(),
            hovered: SmallVec::new(),
            pressed: None,
            cursor: CursorStyle::Arrow,
            key_context_stack: Vec::new(),
            overlays: OverlayManager::default(),
            draw_phase: DrawPhase::None,
            removed: false,
            debug_layout: std::env::var_os("FLASH_DEBUG_LAYOUT").is_some(),
        })
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn options(&self) -> &WindowOptions {
        &self.options
    }

    pub fn viewport_size(&self) -> Size<Pixels> {
        self.viewport_size
    }

    /// The content area of the window in window coordinates.
    pub fn bounds(&self) -> Bounds<Pixels> {
        Bounds::new(Point::default(), self.viewport_size)
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    pub fn appearance(&self) -> WindowAppearance {
        self.appearance
    }

    pub fn is_window_active(&self) -> bool {
        self.active
    }

    pub fn mouse_position(&self) -> Point<Pixels> {
        self.mouse_position
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn text_system(&self) -> &Rc<dyn TextSystem> {
        &self.text_system
    }

    pub fn root_view(&self) -> Option<AnyView> {
        self.root_view
    }

    pub fn set_window_title(&mut self, title: &str) {
        self.platform_window.set_title(title);
    }

    /// The scene presented for the last frame.
    pub fn rendered_scene(&self) -> &Scene {
        &self.rendered_frame.scene
    }

    pub fn hit_tree(&self) -> &HitTestTree {
        &self.rendered_frame.hit_tree
    }

    pub fn overlays(&self) -> &OverlayManager {
        &self.overlays
    }

    pub fn overlays_mut(&mut self) -> &mut OverlayManager {
        &mut self.overlays
    }

    pub fn focused(&self, cx: &App) -> Option<FocusHandle> {
        cx.focused(self.id)
    }

    /// Key contexts along the focus path, outermost first. Only populated while a
    /// keyboard event is being dispatched.
    pub fn key_context_stack(&self) -> &[KeyContext] {
        &self.key_context_stack
    }

    /// Closes the window. It is removed on the next animation frame.
    pub fn remove_window(&mut self, cx: &mut App) {
        self.removed = true;
        cx.mark_window_dirty(self.id);
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    #[track_caller]
    fn debug_assert_layout_or_prepaint(&self) {
        debug_assert!(
            matches!(self.draw_phase, DrawPhase::Layout | DrawPhase::Prepaint),
            "this method can only be called during layout or prepaint"
        );
    }

    #[track_caller]
    fn debug_assert_prepaint(&self) {
        debug_assert!(
            matches!(self.draw_phase, DrawPhase::Prepaint),
            "this method can only be called during prepaint"
        );
    }

    #[track_caller]
    fn debug_assert_paint(&self) {
        debug_assert!(
            matches!(self.draw_phase, DrawPhase::Paint),
            "this method can only be called during paint"
        );
    }

    /// Produces a new frame: lays out, prepaints and paints the root view and the
    /// overlays it registered.
    pub(crate) fn draw(&mut self, cx: &mut App) {
        let Some(root_view) = self.root_view else {
            log::warn!("window {:?} has no root view", self.id);
            return;
        };
        let started = Instant::now();

        self.begin_layout_pass();
        let mut root = root_view.into_any_element();
        let root_size = root.layout_as_root(self.viewport_size.into(), self, cx);

        self.begin_prepaint_pass();
        root.prepaint_at(Point::default(), self, cx);
        self.prepaint_overlays(cx);

        self.begin_paint_pass(cx);
        let background = self.options.background;
        self.paint_quad(Quad {
            bounds: self.bounds(),
            background,
            ..Default::default()
        });
        root.paint(self, cx);
        self.paint_overlays(cx);

        self.end_frame(cx);
        if self.debug_layout {
            log::debug!(
                "window {:?}: root {:?}, {} hit-test nodes, {} primitives in {:?}",
                self.id,
                root_size,
                self.rendered_frame.hit_tree.len(),
                self.rendered_frame.scene.len(),
                started.elapsed()
            );
        }
    }

    pub(crate) fn begin_layout_pass(&mut self) {
        self.next_frame.clear();
        self.layout_engine.clear();
        self.hit_test_builder = HitTestBuilder::default();
        self.overlays.begin_frame();
        self.element_id_stack = GlobalElementId::default();
        self.child_counters = vec![0];
        self.element_offset_stack.clear();
        self.content_mask_stack.clear();
        self.text_style_stack.clear();
        self.draw_phase = DrawPhase::Layout;
    }

    pub(crate) fn begin_prepaint_pass(&mut self) {
        self.draw_phase = DrawPhase::Prepaint;
    }

    pub(crate) fn begin_paint_pass(&mut self, cx: &mut App) {
        let builder = mem::take(&mut self.hit_test_builder);
        let (hit_tree, focus_tree) = builder.finish();
        self.hovered = hit_tree
            .hit_test(self.mouse_position)
            .into_iter()
            .map(|id| hit_tree.node(id).id.clone())
            .collect();
        self.next_frame.hit_tree = hit_tree;
        self.next_focus_tree = focus_tree;

        let focus = cx.focus.entry(self.id).or_default();
        focus.tree = mem::take(&mut self.next_focus_tree);
        if focus.retain_rendered() {
            log::debug!("focused element of window {:?} was not rendered", self.id);
        }
        self.draw_phase = DrawPhase::Paint;
    }

    fn end_frame(&mut self, cx: &mut App) {
        self.draw_phase = DrawPhase::None;
        self.overlays.end_frame();
        mem::swap(&mut self.rendered_frame, &mut self.next_frame);
        self.next_frame.clear();
        cx.rendered_views
            .insert(self.id, self.rendered_frame.rendered_views.clone());
        self.update_cursor();
    }

    fn prepaint_overlays(&mut self, cx: &mut App) {
        let viewport = self.bounds();
        while let Some(request) = self.overlays.take_next() {
            let OverlayRequest {
                owner,
                kind,
                trigger,
                placement,
                mut element,
                on_dismiss,
            } = request;
            let prepared = self.with_global_id(&owner, |window| {
                let size = element.layout_as_root(AvailableSpace::max_size(), window, cx);
                let bounds = match kind {
                    OverlayKind::Modal => Bounds::new(
                        point(
                            viewport.left() + (viewport.size.width - size.width) / 2.,
                            viewport.top() + (viewport.size.height - size.height) / 2.,
                        ),
                        size,
                    ),
                    OverlayKind::Tooltip | OverlayKind::Popover => {
                        place_overlay(trigger, placement, POPOVER_GAP, size, viewport)
                    }
                };
                if kind == OverlayKind::Modal {
                    window.insert_modal_backdrop(on_dismiss);
                }
                element.prepaint_at(bounds.origin, window, cx);
                PreparedOverlay {
                    kind,
                    bounds,
                    element,
                }
            });
            self.overlays.prepared.push(prepared);
        }
    }

    fn insert_modal_backdrop(&mut self, on_dismiss: Option<DismissHandler>) {
        let id = self.with_element_id(Some(ElementId::from("modal-backdrop")), |id, _| {
            id.clone()
        });
        let mut node = HitTestNode::new(id, self.bounds());
        node.behavior = HitboxBehavior::BlockMouse;
        if let Some(on_dismiss) = on_dismiss {
            node.handlers
                .on_click(move |_: &ClickEvent, window: &mut Window, cx: &mut App| {
                    on_dismiss(window, cx);
                    DispatchFlags::STOP_PROPAGATION
                });
        }
        self.hit_test_builder.insert(node);
    }

    fn paint_overlays(&mut self, cx: &mut App) {
        let mut prepared = mem::take(&mut self.overlays.prepared);
        for overlay in &mut prepared {
            self.next_frame.scene.push_layer(overlay.bounds);
            if overlay.kind == OverlayKind::Modal {
                self.paint_quad(Quad {
                    bounds: self.bounds(),
                    background: black().opacity(0.4),
                    ..Default::default()
                });
            }
            overlay.element.paint(self, cx);
            self.next_frame.scene.pop_layer();
        }
        self.overlays.prepared = prepared;
    }

    /// Submits the last rendered scene to the window's renderer. A renderer that lost
    /// its device is reinitialized and the window is scheduled to draw again.
    pub(crate) fn present(&mut self, cx: &mut App) -> Result<()> {
        let Some(renderer) = self.platform_window.renderer() else {
            return Err(FlashError::MissingCollaborator("renderer"));
        };
        if !renderer.is_initialized() {
            log::debug!("reinitializing renderer of window {:?}", self.id);
            renderer.initialize().context("reinitializing renderer")?;
        }
        match renderer.draw(&self.rendered_frame.scene) {
            Ok(()) => Ok(()),
            Err(RenderError::DeviceLost) => {
                log::warn!(
                    "graphics device of window {:?} was lost, redrawing next frame",
                    self.id
                );
                cx.mark_window_dirty(self.id);
                Err(RenderError::DeviceLost.into())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Runs `f` with `id` (or the next positional id when `None`) pushed on the element
    /// id stack.
    pub(crate) fn with_element_id<R>(
        &mut self,
        id: Option<ElementId>,
        f: impl FnOnce(&GlobalElementId, &mut Self) -> R,
    ) -> R {
        let id = id.unwrap_or_else(|| self.allocate_child_id());
        self.element_id_stack.0.push(id);
        self.child_counters.push(0);
        let global_id = self.element_id_stack.clone();
        let result = f(&global_id, self);
        self.child_counters.pop();
        self.element_id_stack.0.pop();
        result
    }

    /// The next positional id among the children of the current element.
    pub fn allocate_child_id(&mut self) -> ElementId {
        let index = match self.child_counters.last_mut() {
            Some(counter) => {
                *counter += 1;
                *counter - 1
            }
            None => 0,
        };
        ElementId::Child(index)
    }

    /// Runs `f` with the element id stack replaced by `global_id`.
    pub(crate) fn with_global_id<R>(
        &mut self,
        global_id: &GlobalElementId,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let previous = mem::replace(&mut self.element_id_stack, global_id.clone());
        self.child_counters.push(0);
        let result = f(self);
        self.child_counters.pop();
        self.element_id_stack = previous;
        result
    }

    /// The id of the element currently being drawn.
    pub fn current_element_id(&self) -> &GlobalElementId {
        &self.element_id_stack
    }

    pub(crate) fn record_rendered_view(&mut self, entity_id: EntityId) {
        self.next_frame.rendered_views.insert(entity_id);
    }

    /// Whether `entity_id` was drawn in the last frame.
    pub fn rendered_view(&self, entity_id: EntityId) -> bool {
        self.rendered_frame.rendered_views.contains(&entity_id)
    }

    pub fn request_layout(&mut self, style: &Style, children: &[LayoutId]) -> LayoutId {
        self.debug_assert_layout_or_prepaint();
        self.layout_engine.request_layout(style, children)
    }

    /// Requests a leaf whose size is provided by `measure` while the layout engine
    /// solves the tree.
    pub fn request_measured_layout(
        &mut self,
        style: &Style,
        measure: impl FnMut(Size<Option<Pixels>>, Size<AvailableSpace>) -> Size<Pixels> + 'static,
    ) -> LayoutId {
        self.debug_assert_layout_or_prepaint();
        let measure: MeasureFn = Box::new(measure);
        self.layout_engine.request_measured_layout(style, measure)
    }

    pub fn compute_layout(&mut self, layout_id: LayoutId, available_space: Size<AvailableSpace>) {
        self.debug_assert_layout_or_prepaint();
        self.layout_engine.compute_layout(layout_id, available_space);
    }

    /// Bounds of a node computed by [`Window::compute_layout`], shifted by the current
    /// element offset.
    pub fn layout_bounds(&mut self, layout_id: LayoutId) -> Bounds<Pixels> {
        self.debug_assert_layout_or_prepaint();
        self.layout_engine
            .layout_bounds(layout_id)
            .offset(self.element_offset())
    }

    /// Registers a hit-test node for the current element. The node's bounds are clipped
    /// to the current content mask.
    pub fn insert_hit_node(&mut self, mut node: HitTestNode) -> HitNodeId {
        self.debug_assert_prepaint();
        if !node.allow_overflow {
            node.bounds = node.bounds.intersect(&self.content_mask());
        }
        self.hit_test_builder.insert(node)
    }

    /// Nodes inserted by `f` become children of `parent`.
    pub fn with_hit_node<R>(&mut self, parent: HitNodeId, f: impl FnOnce(&mut Self) -> R) -> R {
        self.hit_test_builder.push(parent);
        let result = f(self);
        self.hit_test_builder.pop();
        result
    }

    /// Registers an overlay for the current element. It is laid out once the main tree
    /// has been prepainted and painted above it.
    pub fn register_overlay(
        &mut self,
        kind: OverlayKind,
        trigger: Bounds<Pixels>,
        placement: Placement,
        element: AnyElement,
        on_dismiss: Option<DismissHandler>,
    ) {
        self.debug_assert_prepaint();
        self.overlays.register(OverlayRequest {
            owner: self.element_id_stack.clone(),
            kind,
            trigger,
            placement,
            element,
            on_dismiss,
        });
    }

    /// Gives `f` the state stored for `global_id` in the previous frame, if any, and keeps
    /// the state it returns for the next one. State not accessed during a frame is
    /// dropped.
    pub fn with_element_state<S: 'static, R>(
        &mut self,
        global_id: &GlobalElementId,
        f: impl FnOnce(Option<S>, &mut Self) -> (R, S),
    ) -> R {
        let key = (global_id.clone(), TypeId::of::<S>());
        let state = self
            .next_frame
            .element_states
            .remove(&key)
            .or_else(|| self.rendered_frame.element_states.remove(&key))
            .and_then(|state| state.downcast::<S>().ok())
            .map(|state| *state);
        let (result, state) = f(state, self);
        self.next_frame.element_states.insert(key, Box::new(state));
        result
    }

    pub fn element_offset(&self) -> Point<Pixels> {
        self.element_offset_stack.last().copied().unwrap_or_default()
    }

    /// Shifts the layout of elements prepainted by `f` by `offset`, relative to the
    /// current offset. Used by scroll containers.
    pub fn with_element_offset<R>(
        &mut self,
        offset: Point<Pixels>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        if offset == Point::default() {
            return f(self);
        }
        let offset = self.element_offset() + offset;
        self.with_absolute_element_offset(offset, f)
    }

    pub fn with_absolute_element_offset<R>(
        &mut self,
        offset: Point<Pixels>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        self.element_offset_stack.push(offset);
        let result = f(self);
        self.element_offset_stack.pop();
        result
    }

    /// The area primitives and hit-test nodes are clipped to.
    pub fn content_mask(&self) -> Bounds<Pixels> {
        self.content_mask_stack
            .last()
            .copied()
            .unwrap_or_else(|| self.bounds())
    }

    pub fn with_content_mask<R>(
        &mut self,
        mask: Option<Bounds<Pixels>>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let Some(mask) = mask else {
            return f(self);
        };
        let mask = mask.intersect(&self.content_mask());
        self.content_mask_stack.push(mask);
        let result = f(self);
        self.content_mask_stack.pop();
        result
    }

    /// The text style inherited by the element being drawn.
    pub fn text_style(&self) -> TextStyle {
        self.text_style_stack.last().copied().unwrap_or_default()
    }

    pub fn with_text_style<R>(
        &mut self,
        color: Option<Hsla>,
        font_size: Option<Pixels>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        if color.is_none() && font_size.is_none() {
            return f(self);
        }
        let style = self.text_style().refined(color, font_size);
        self.text_style_stack.push(style);
        let result = f(self);
        self.text_style_stack.pop();
        result
    }

    /// Whether the pointer was over the element `id` when this frame's hit-test tree
    /// was finished, or at the last mouse move since.
    pub fn is_hovered(&self, id: &GlobalElementId) -> bool {
        self.hovered.contains(id)
    }

    /// Whether the mouse was pressed on the element `id` and not released yet.
    pub fn is_pressed(&self, id: &GlobalElementId) -> bool {
        self.pressed
            .as_ref()
            .is_some_and(|pressed| pressed.ids.contains(id))
    }

    pub fn paint_quad(&mut self, mut quad: Quad) {
        self.debug_assert_paint();
        quad.content_mask = self.content_mask();
        self.next_frame.scene.insert(quad);
    }

    pub fn paint_shadow(&mut self, mut shadow: Shadow) {
        self.debug_assert_paint();
        shadow.content_mask = self.content_mask();
        self.next_frame.scene.insert(shadow);
    }

    pub fn paint_glyph_run(&mut self, mut glyph_run: GlyphRun) {
        self.debug_assert_paint();
        glyph_run.content_mask = self.content_mask();
        self.next_frame.scene.insert(glyph_run);
    }

    pub fn paint_path(&mut self, mut path: Path) {
        self.debug_assert_paint();
        path.content_mask = self.content_mask();
        self.next_frame.scene.insert(path);
    }

    pub fn paint_image(&mut self, mut image: ImagePrimitive) {
        self.debug_assert_paint();
        image.content_mask = self.content_mask();
        self.next_frame.scene.insert(image);
    }

    pub fn paint_surface(&mut self, mut surface: SurfacePrimitive) {
        self.debug_assert_paint();
        surface.content_mask = self.content_mask();
        self.next_frame.scene.insert(surface);
    }

    /// Routes `input` through the last rendered frame.
    pub(crate) fn dispatch_input(&mut self, input: PlatformInput, cx: &mut App) -> DispatchResult {
        if let Some(position) = input.mouse_position() {
            self.mouse_position = position;
        }
        if let Some(modifiers) = input.modifiers() {
            self.modifiers = modifiers;
        }
        log::trace!("window {:?} dispatching {input:?}", self.id);

        match input {
            PlatformInput::MouseDown(event) => self.dispatch_mouse_down(event, cx),
            PlatformInput::MouseUp(event) => self.dispatch_mouse_up(event, cx),
            PlatformInput::MouseMove(event) => self.dispatch_mouse_move(event, cx),
            PlatformInput::ScrollWheel(event) => self.dispatch_scroll_wheel(event, cx),
            PlatformInput::KeyDown(event) => self.dispatch_key_down(event, cx),
            PlatformInput::KeyUp(event) => {
                self.dispatch_to_focus_path(&event, |handlers| &handlers.key_up, cx)
            }
            PlatformInput::TextInput(event) => {
                self.dispatch_to_focus_path(&event, |handlers| &handlers.text_input, cx)
            }
            PlatformInput::Resize(size) => {
                self.viewport_size = size;
                self.scale_factor = self.platform_window.scale_factor();
                cx.mark_window_dirty(self.id);
                DispatchResult::propagated()
            }
            PlatformInput::ActiveStatusChanged(active) => {
                self.active = active;
                cx.mark_window_dirty(self.id);
                DispatchResult::propagated()
            }
            PlatformInput::AppearanceChanged(appearance) => {
                self.appearance = appearance;
                cx.mark_window_dirty(self.id);
                DispatchResult::propagated()
            }
            PlatformInput::Close => {
                self.remove_window(cx);
                DispatchResult::propagated()
            }
        }
    }

    /// Invokes the listeners selected by `select` on each node of `path` in order, until
    /// one stops propagation.
    fn dispatch_along<E>(
        &mut self,
        path: &[HitNodeId],
        event: &E,
        select: fn(&EventHandlers) -> &SmallVec<[Listener<E>; 1]>,
        cx: &mut App,
    ) -> DispatchResult {
        let listeners = path
            .iter()
            .flat_map(|id| select(&self.rendered_frame.hit_tree.node(*id).handlers).iter())
            .cloned()
            .collect::<SmallVec<[Listener<E>; 8]>>();

        let mut result = DispatchResult::propagated();
        for listener in listeners {
            result.handled = true;
            let flags = listener(event, self, cx);
            if flags.contains(DispatchFlags::PREVENT_DEFAULT) {
                result.default_prevented = true;
            }
            if flags.contains(DispatchFlags::STOP_PROPAGATION) {
                result.propagate = false;
                break;
            }
        }
        result
    }

    fn path_ids(&self, path: &[HitNodeId]) -> SmallVec<[GlobalElementId; 8]> {
        path.iter()
            .map(|id| self.rendered_frame.hit_tree.node(*id).id.clone())
            .collect()
    }

    fn dispatch_mouse_down(&mut self, event: MouseDownEvent, cx: &mut App) -> DispatchResult {
        let path = self.rendered_frame.hit_tree.hit_test(event.position);
        let result = self.dispatch_along(&path, &event, |handlers| &handlers.mouse_down, cx);

        if !result.default_prevented && self.options.focus_enabled {
            let focus_handle = path
                .iter()
                .find_map(|id| self.rendered_frame.hit_tree.node(*id).focus_handle);
            if let Some(focus_handle) = focus_handle {
                cx.focus(&focus_handle);
            }
        }

        if !path.is_empty() {
            cx.mark_window_dirty(self.id);
        }
        self.pressed = Some(PressState {
            event,
            ids: self.path_ids(&path),
        });
        result
    }

    fn dispatch_mouse_up(&mut self, event: MouseUpEvent, cx: &mut App) -> DispatchResult {
        let path = self.rendered_frame.hit_tree.hit_test(event.position);
        let mut result = self.dispatch_along(&path, &event, |handlers| &handlers.mouse_up, cx);

        if let Some(pressed) = self.pressed.take() {
            if !pressed.ids.is_empty() {
                cx.mark_window_dirty(self.id);
            }
            if pressed.event.button == event.button {
                let clicked = path
                    .iter()
                    .copied()
                    .filter(|id| {
                        pressed
                            .ids
                            .contains(&self.rendered_frame.hit_tree.node(*id).id)
                    })
                    .collect::<SmallVec<[HitNodeId; 8]>>();
                let click = ClickEvent {
                    down: pressed.event,
                    up: event,
                };
                let click_result =
                    self.dispatch_along(&clicked, &click, |handlers| &handlers.click, cx);
                result.merge(click_result);
            }
        }
        result
    }

    fn dispatch_mouse_move(&mut self, event: MouseMoveEvent, cx: &mut App) -> DispatchResult {
        let path = self.rendered_frame.hit_tree.hit_test(event.position);
        let hovered = self.path_ids(&path);
        let previous = mem::replace(&mut self.hovered, hovered);

        let left = previous
            .iter()
            .filter(|id| !self.hovered.contains(id))
            .filter_map(|id| self.rendered_frame.hit_tree.find(id))
            .collect::<SmallVec<[HitNodeId; 4]>>();
        let entered = path
            .iter()
            .copied()
            .filter(|id| !previous.contains(&self.rendered_frame.hit_tree.node(*id).id))
            .collect::<SmallVec<[HitNodeId; 4]>>();

        let leave = MouseLeaveEvent {
            position: event.position,
        };
        for id in &left {
            self.dispatch_along(&[*id], &leave, |handlers| &handlers.mouse_leave, cx);
        }
        let enter = MouseEnterEvent {
            position: event.position,
        };
        for id in &entered {
            self.dispatch_along(&[*id], &enter, |handlers| &handlers.mouse_enter, cx);
        }

        if previous != self.hovered {
            cx.mark_window_dirty(self.id);
            self.update_cursor();
        }
        self.dispatch_along(&path, &event, |handlers| &handlers.mouse_move, cx)
    }

    fn dispatch_scroll_wheel(&mut self, event: ScrollWheelEvent, cx: &mut App) -> DispatchResult {
        let path = self.rendered_frame.hit_tree.hit_test(event.position);
        let mut result =
            self.dispatch_along(&path, &event, |handlers| &handlers.scroll_wheel, cx);
        if result.default_prevented || !result.propagate {
            return result;
        }

        let scroll_handle = path.iter().find_map(|id| {
            self.rendered_frame
                .hit_tree
                .node(*id)
                .scroll_handle
                .clone()
                .filter(|handle| handle.max_offset() != Point::default())
        });
        if let Some(scroll_handle) = scroll_handle {
            cx.scroll_by(&scroll_handle, event.delta);
            result.handled = true;
        }
        result
    }

    fn focus_path(&self, cx: &App) -> SmallVec<[HitNodeId; 8]> {
        let tree = &self.rendered_frame.hit_tree;
        let path = cx
            .focused(self.id)
            .map(|handle| tree.focus_path(handle.id))
            .unwrap_or_default();
        if !path.is_empty() {
            return path;
        }
        tree.roots().last().copied().into_iter().collect()
    }

    fn dispatch_to_focus_path<E>(
        &mut self,
        event: &E,
        select: fn(&EventHandlers) -> &SmallVec<[Listener<E>; 1]>,
        cx: &mut App,
    ) -> DispatchResult {
        let path = self.focus_path(cx);
        self.key_context_stack = self.rendered_frame.hit_tree.key_context_stack(&path);
        let result = self.dispatch_along(&path, event, select, cx);
        self.key_context_stack.clear();
        result
    }

    fn dispatch_key_down(&mut self, event: KeyDownEvent, cx: &mut App) -> DispatchResult {
        let mut result =
            self.dispatch_to_focus_path(&event, |handlers| &handlers.key_down, cx);
        let keystroke = &event.keystroke;
        let plain_tab = keystroke.key.as_str() == "tab"
            && !keystroke.modifiers.control
            && !keystroke.modifiers.alt
            && !keystroke.modifiers.platform;
        if plain_tab && result.propagate && !result.default_prevented {
            let moved = if keystroke.modifiers.shift {
                cx.focus_prev(self.id)
            } else {
                cx.focus_next(self.id)
            };
            result.handled |= moved;
        }
        result
    }

    fn update_cursor(&mut self) {
        let tree = &self.rendered_frame.hit_tree;
        let cursor = tree.cursor_at(&tree.hit_test(self.mouse_position));
        if cursor != self.cursor {
            self.cursor = cursor;
            self.platform_window.set_cursor_style(cursor);
        }
    }
}

impl DispatchResult {
    fn propagated() -> Self {
        DispatchResult {
            propagate: true,
            ..Default::default()
        }
    }

    fn merge(&mut self, other: DispatchResult) {
        self.propagate &= other.propagate;
        self.default_prevented |= other.default_prevented;
        self.handled |= other.handled;
    }
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("id", &self.id)
            .field("viewport_size", &self.viewport_size)
            .field("root_view", &self.root_view)
            .field("removed", &self.removed)
            .finish_non_exhaustive()
    }
}
