use crate::{
    App, Bounds, Entity, EntityId, FocusHandle, Pixels, Point, Render, Result, ResultExt,
    ScrollHandle, Subscription, Task, View, WindowId,
};
use std::{
    any::Any,
    future::Future,
    ops::{Deref, DerefMut},
};

/// Marks `Self` as able to emit events of type `E` to subscribers.
pub trait EventEmitter<E: Any>: 'static {}

/// Read-only access to entities, focus and scroll state.
pub trait ReadContext {
    #[doc(hidden)]
    fn app(&self) -> &App;

    fn read_entity<T: 'static>(&self, entity: &Entity<T>) -> Result<&T> {
        self.app().read_entity(entity)
    }

    fn is_focused(&self, handle: &FocusHandle) -> bool {
        self.app().is_focused(handle)
    }

    fn scroll_offset(&self, handle: &ScrollHandle) -> Point<Pixels> {
        self.app().scroll_offset(handle)
    }

    fn scroll_viewport(&self, handle: &ScrollHandle) -> Bounds<Pixels> {
        self.app().scroll_viewport(handle)
    }
}

/// The operations available to every context that may change application state.
pub trait AppContext: ReadContext {
    #[doc(hidden)]
    fn app_mut(&mut self) -> &mut App;

    fn new_entity<T: 'static>(&mut self, build: impl FnOnce(&mut Context<T>) -> T) -> Entity<T> {
        self.app_mut().new_entity(build)
    }

    fn new_view<V: Render>(&mut self, build: impl FnOnce(&mut Context<V>) -> V) -> View<V> {
        self.app_mut().new_view(build)
    }

    fn update_entity<T: 'static, R>(
        &mut self,
        entity: &Entity<T>,
        update: impl FnOnce(&mut T, &mut Context<T>) -> R,
    ) -> Result<R> {
        self.app_mut().update_entity(entity, update)
    }

    fn observe<T: 'static>(
        &mut self,
        entity: &Entity<T>,
        on_notify: impl FnMut(Entity<T>, &mut App) + 'static,
    ) -> Subscription {
        self.app_mut().observe(entity, on_notify)
    }

    fn subscribe<T: EventEmitter<E>, E: 'static>(
        &mut self,
        entity: &Entity<T>,
        on_event: impl FnMut(Entity<T>, &E, &mut App) + 'static,
    ) -> Subscription {
        self.app_mut().subscribe(entity, on_event)
    }

    fn release<T: 'static>(&mut self, entity: &Entity<T>) {
        self.app_mut().release(entity)
    }

    fn focus(&mut self, handle: &FocusHandle) {
        self.app_mut().focus(handle)
    }

    fn blur(&mut self, handle: &FocusHandle) {
        self.app_mut().blur(handle)
    }

    fn new_focus_handle(&mut self, window_id: WindowId) -> FocusHandle {
        self.app_mut().new_focus_handle(window_id)
    }

    fn focus_first_child(&mut self, handle: &FocusHandle) -> bool {
        self.app_mut().focus_first_child(handle)
    }

    fn focus_next_sibling(&mut self, handle: &FocusHandle) -> bool {
        self.app_mut().focus_next_sibling(handle)
    }

    fn new_scroll_handle(&mut self, window_id: WindowId) -> ScrollHandle {
        self.app_mut().new_scroll_handle(window_id)
    }

    fn set_scroll_offset(&mut self, handle: &ScrollHandle, offset: Point<Pixels>) {
        self.app_mut().set_scroll_offset(handle, offset)
    }

    fn scroll_by(&mut self, handle: &ScrollHandle, delta: Point<Pixels>) {
        self.app_mut().scroll_by(handle, delta)
    }

    fn mark_window_dirty(&mut self, window_id: WindowId) {
        self.app_mut().mark_window_dirty(window_id)
    }

    fn defer(&mut self, callback: impl FnOnce(&mut App) + 'static) {
        self.app_mut().defer(callback)
    }

    fn spawn<R: 'static>(
        &mut self,
        future: impl Future<Output = R> + 'static,
        on_complete: impl FnOnce(R, &mut App) + 'static,
    ) -> Task<()> {
        self.app_mut().spawn(future, on_complete)
    }
}

impl ReadContext for App {
    fn app(&self) -> &App {
        self
    }
}

impl AppContext for App {
    fn app_mut(&mut self) -> &mut App {
        self
    }
}

/// The context handed to code updating an entity. Derefs to [`App`] for everything
/// that is not tied to the entity itself.
pub struct Context<'a, T> {
    pub(crate) app: &'a mut App,
    entity: Entity<T>,
}

impl<'a, T: 'static> Context<'a, T> {
    pub(crate) fn new(app: &'a mut App, entity: Entity<T>) -> Self {
        Self { app, entity }
    }

    pub(crate) fn reborrow(&mut self) -> Context<'_, T> {
        Context {
            app: &mut *self.app,
            entity: self.entity,
        }
    }

    pub fn entity(&self) -> Entity<T> {
        self.entity
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity.entity_id
    }

    /// Tells observers that this entity changed. Windows that rendered it as a view are
    /// redrawn on the next frame.
    pub fn notify(&mut self) {
        self.app.notify(self.entity.entity_id);
    }

    pub fn emit<E: Any>(&mut self, event: E)
    where
        T: EventEmitter<E>,
    {
        self.app.emit_event(self.entity.entity_id, event);
    }

    /// Runs `on_drop` with the value when this entity is released.
    pub fn on_drop(&mut self, on_drop: impl FnOnce(&mut T, &mut App) + 'static) -> Subscription {
        self.app
            .on_release_internal(self.entity.entity_id, on_drop)
    }

    /// Requests the release of this entity. It is dropped after the current update.
    pub fn release_self(&mut self) {
        self.app.release_entity(self.entity.entity_id);
    }

    /// Calls `on_notify` with this entity's value whenever `other` notifies. The
    /// registration ends when either entity is released.
    pub fn observe_entity<U: 'static>(
        &mut self,
        other: &Entity<U>,
        mut on_notify: impl FnMut(&mut T, Entity<U>, &mut Context<T>) + 'static,
    ) -> Subscription {
        let this = self.entity;
        self.app.observe_internal(other, move |other, cx| {
            if !cx.entities.contains(this.entity_id) {
                return false;
            }
            cx.update_entity(&this, |this, cx| on_notify(this, other, cx))
                .warn_on_err();
            true
        })
    }

    /// Calls `on_event` with this entity's value for each `E` emitted by `other`.
    pub fn subscribe_entity<U: EventEmitter<E>, E: 'static>(
        &mut self,
        other: &Entity<U>,
        mut on_event: impl FnMut(&mut T, Entity<U>, &E, &mut Context<T>) + 'static,
    ) -> Subscription {
        let this = self.entity;
        self.app.subscribe_internal(other, move |other, event, cx| {
            if !cx.entities.contains(this.entity_id) {
                return false;
            }
            cx.update_entity(&this, |this, cx| on_event(this, other, event, cx))
                .warn_on_err();
            true
        })
    }

    /// Spawns `future` and hands its output to this entity once it completes. The
    /// output is dropped if the entity was released in the meantime.
    pub fn spawn_for_entity<R: 'static>(
        &mut self,
        future: impl Future<Output = R> + 'static,
        on_complete: impl FnOnce(&mut T, R, &mut Context<T>) + 'static,
    ) -> Task<()> {
        let this = self.entity;
        self.app.spawn(future, move |output, cx| {
            cx.update_entity(&this, |this, cx| on_complete(this, output, cx))
                .warn_on_err();
        })
    }
}

impl<T> Deref for Context<'_, T> {
    type Target = App;

    fn deref(&self) -> &App {
        self.app
    }
}

impl<T> DerefMut for Context<'_, T> {
    fn deref_mut(&mut self) -> &mut App {
        self.app
    }
}

impl<T> ReadContext for Context<'_, T> {
    fn app(&self) -> &App {
        self.app
    }
}

impl<T> AppContext for Context<'_, T> {
    fn app_mut(&mut self) -> &mut App {
        self.app
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TestAppContext;
    use std::{cell::RefCell, rc::Rc};

    struct Source {
        value: usize,
    }

    struct Mirror {
        seen: Vec<usize>,
    }

    struct Changed(usize);

    impl EventEmitter<Changed> for Source {}

    #[test]
    fn test_observe_entity_reads_new_state() {
        let mut cx = TestAppContext::new();
        let source = cx.new_entity(|_| Source { value: 0 });
        let mirror = cx.new_entity(|cx| {
            cx.observe_entity(&source, |mirror: &mut Mirror, source, cx| {
                let value = source.read(&**cx).unwrap().value;
                mirror.seen.push(value);
            })
            .detach();
            Mirror { seen: Vec::new() }
        });

        source
            .update(&mut *cx, |source, cx| {
                source.value = 1;
                cx.notify();
                source.value = 2;
                cx.notify();
            })
            .unwrap();

        // One callback per notify, both reading the state at flush time.
        assert_eq!(mirror.read(&*cx).unwrap().seen, vec![2, 2]);
    }

    #[test]
    fn test_subscribe_entity_stops_after_release() {
        let mut cx = TestAppContext::new();
        let source = cx.new_entity(|_| Source { value: 0 });
        let log = Rc::new(RefCell::new(Vec::new()));
        let mirror = cx.new_entity(|cx| {
            let log = log.clone();
            cx.subscribe_entity(&source, move |_: &mut Mirror, _, event: &Changed, _| {
                log.borrow_mut().push(event.0)
            })
            .detach();
            Mirror { seen: Vec::new() }
        });

        source.update(&mut *cx, |_, cx| cx.emit(Changed(1))).unwrap();
        mirror.release(&mut *cx);
        source.update(&mut *cx, |_, cx| cx.emit(Changed(2))).unwrap();
        assert_eq!(*log.borrow(), vec![1]);
    }

    #[test]
    fn test_spawn_for_entity_updates_value() {
        let mut cx = TestAppContext::new();
        let source = cx.new_entity(|_| Source { value: 0 });
        source
            .update(&mut *cx, |_, cx| {
                cx.spawn_for_entity(async { 41 }, |source, value, _| {
                    source.value = value + 1
                })
                .detach();
            })
            .unwrap();
        cx.run_until_parked();
        assert_eq!(source.read(&*cx).unwrap().value, 42);
    }
}
