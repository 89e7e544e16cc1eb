use crate::{
    AnyElement, AnyEntity, App, AppContext, Bounds, Context, DispatchFlags, Element, ElementId,
    Entity, EntityId, FocusHandle, GlobalElementId, IntoElement, LayoutId, Pixels, ReadContext,
    Result, ResultExt, Window, WindowId,
};
use derive_more::{Deref, DerefMut};
use std::{any::TypeId, fmt};

/// An entity that describes its contents as an element tree, rebuilt every frame the
/// window it is drawn in is dirty.
pub trait Render: 'static + Sized {
    fn render(&mut self, cx: &mut ViewContext<Self>) -> impl IntoElement;
}

/// A handle to an entity that implements [`Render`]. Usable as an element.
#[derive(Deref)]
pub struct View<V> {
    #[deref]
    pub(crate) entity: Entity<V>,
}

impl<V> Clone for View<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for View<V> {}

impl<V> PartialEq for View<V> {
    fn eq(&self, other: &Self) -> bool {
        self.entity == other.entity
    }
}

impl<V> fmt::Debug for View<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("entity_id", &self.entity.entity_id)
            .field("type", &std::any::type_name::<V>())
            .finish()
    }
}

impl<V: Render> View<V> {
    pub fn entity(&self) -> Entity<V> {
        self.entity
    }

    /// Updates the view with a context scoped to `window`.
    pub fn update_in<R>(
        &self,
        window: &mut Window,
        cx: &mut App,
        update: impl FnOnce(&mut V, &mut ViewContext<V>) -> R,
    ) -> Result<R> {
        cx.update_entity(&self.entity, |view, cx| {
            update(view, &mut ViewContext::new(window, cx.reborrow()))
        })
    }
}

/// The context handed to a view while it renders or handles input. Derefs to the
/// view's [`Context`], so `notify`, `emit` and friends work as they do for entities.
#[derive(Deref, DerefMut)]
pub struct ViewContext<'a, V> {
    window: &'a mut Window,
    #[deref]
    #[deref_mut]
    cx: Context<'a, V>,
}

impl<'a, V: Render> ViewContext<'a, V> {
    pub(crate) fn new(window: &'a mut Window, cx: Context<'a, V>) -> Self {
        Self { window, cx }
    }

    pub fn window(&mut self) -> &mut Window {
        self.window
    }

    pub fn window_id(&self) -> WindowId {
        self.window.id()
    }

    pub fn view(&self) -> View<V> {
        View {
            entity: self.cx.entity(),
        }
    }

    /// Wraps `handler` into an event listener for this view. The listener holds the
    /// view's identity only, so it always runs against the view's state at dispatch
    /// time. Dispatching to a released view does nothing.
    pub fn listener<E: ?Sized, R: Into<DispatchFlags>>(
        &self,
        handler: impl Fn(&mut V, &E, &mut ViewContext<V>) -> R + 'static,
    ) -> impl Fn(&E, &mut Window, &mut App) -> DispatchFlags + 'static {
        let view = self.view();
        move |event: &E, window: &mut Window, cx: &mut App| {
            view.update_in(window, cx, |view, cx| handler(view, event, cx).into())
                .log_err()
                .unwrap_or_default()
        }
    }

    /// The focus handle of this view in this window, allocated on first use.
    pub fn focus_handle(&mut self) -> FocusHandle {
        let entity_id = self.cx.entity_id();
        let window_id = self.window.id();
        if let Some(handle) = self.cx.view_focus_handles.get(&(window_id, entity_id)) {
            return *handle;
        }
        let handle = self.cx.app.new_focus_handle(window_id);
        self.cx
            .view_focus_handles
            .insert((window_id, entity_id), handle);
        handle
    }

    pub fn focus_self(&mut self) {
        let handle = self.focus_handle();
        self.cx.app.focus(&handle);
    }

    /// Redraws this view's window on the next frame without notifying observers.
    pub fn refresh(&mut self) {
        let window_id = self.window.id();
        self.cx.app.mark_window_dirty(window_id);
    }
}

impl<V> ReadContext for ViewContext<'_, V> {
    fn app(&self) -> &App {
        self.cx.app
    }
}

impl<V> AppContext for ViewContext<'_, V> {
    fn app_mut(&mut self) -> &mut App {
        self.cx.app
    }
}

/// A type-erased [`View`].
#[derive(Clone, Copy)]
pub struct AnyView {
    entity: AnyEntity,
    render: fn(EntityId, &mut Window, &mut App) -> Result<AnyElement>,
}

impl AnyView {
    pub fn entity_id(&self) -> EntityId {
        self.entity.entity_id()
    }

    pub fn entity_type(&self) -> TypeId {
        self.entity.entity_type()
    }

    pub fn downcast<V: Render>(self) -> Option<View<V>> {
        self.entity.downcast().map(|entity| View { entity })
    }
}

impl fmt::Debug for AnyView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyView")
            .field("entity_id", &self.entity_id())
            .finish_non_exhaustive()
    }
}

impl<V: Render> From<View<V>> for AnyView {
    fn from(view: View<V>) -> Self {
        AnyView {
            entity: view.entity.into_any(),
            render: render_view::<V>,
        }
    }
}

fn render_view<V: Render>(
    entity_id: EntityId,
    window: &mut Window,
    cx: &mut App,
) -> Result<AnyElement> {
    View::<V> {
        entity: Entity::new(entity_id),
    }
    .update_in(window, cx, |view, cx| view.render(cx).into_any_element())
}

impl<V: Render> IntoElement for View<V> {
    type Element = AnyView;

    fn into_element(self) -> Self::Element {
        self.into()
    }
}

impl IntoElement for AnyView {
    type Element = Self;

    fn into_element(self) -> Self::Element {
        self
    }
}

impl Element for AnyView {
    type RequestLayoutState = AnyElement;
    type PrepaintState = ();

    fn id(&self) -> Option<ElementId> {
        Some(ElementId::View(self.entity_id()))
    }

    fn request_layout(
        &mut self,
        _id: &GlobalElementId,
        window: &mut Window,
        cx: &mut App,
    ) -> (LayoutId, Self::RequestLayoutState) {
        window.record_rendered_view(self.entity_id());
        // A view that was released, or that is already being updated further up the
        // stack, renders as nothing for this frame.
        let mut element = (self.render)(self.entity_id(), window, cx)
            .log_err()
            .unwrap_or_default();
        let layout_id = element.request_layout(window, cx);
        (layout_id, element)
    }

    fn prepaint(
        &mut self,
        _id: &GlobalElementId,
        _bounds: Bounds<Pixels>,
        element: &mut Self::RequestLayoutState,
        window: &mut Window,
        cx: &mut App,
    ) {
        element.prepaint(window, cx);
    }

    fn paint(
        &mut self,
        _id: &GlobalElementId,
        _bounds: Bounds<Pixels>,
        element: &mut Self::RequestLayoutState,
        _prepaint: &mut Self::PrepaintState,
        window: &mut Window,
        cx: &mut App,
    ) {
        element.paint(window, cx);
    }
}
