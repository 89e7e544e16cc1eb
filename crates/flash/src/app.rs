mod context;
mod entity_map;
#[cfg(any(test, feature = "test-support"))]
mod test_context;

pub use context::*;
pub use entity_map::*;
#[cfg(any(test, feature = "test-support"))]
pub use test_context::*;

use crate::{
    Bounds, DispatchResult, FlashError, FocusHandle, FocusId, FocusState, ForegroundExecutor,
    FrameScheduler, Pixels, Platform, PlatformInput, Point, Render, Result, ScrollHandle,
    ScrollId, Subscription, Task, TextSystem, View, Window, WindowId, WindowOptions,
    subscription::SubscriberSet,
};
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;
use std::{
    any::{Any, TypeId, type_name},
    cell::RefCell,
    collections::VecDeque,
    future::Future,
    panic::{self, AssertUnwindSafe},
    rc::Rc,
    time::Duration,
};

/// Settings that apply to every window of an [`App`].
#[derive(Clone, Debug)]
pub struct AppOptions {
    /// Frames that take longer than this are logged at `warn` level.
    pub frame_budget: Duration,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            frame_budget: Duration::from_millis(16),
        }
    }
}

/// A deferred side effect. Effects are queued while an update is in progress and
/// applied in order once the outermost update returns.
pub(crate) enum Effect {
    Notify {
        emitter: EntityId,
    },
    Emit {
        emitter: EntityId,
        event_type: TypeId,
        event: Box<dyn Any>,
    },
    Focus {
        window_id: WindowId,
        focus_id: FocusId,
    },
    Blur {
        window_id: WindowId,
        focus_id: FocusId,
    },
    Release {
        entity_id: EntityId,
    },
    Callback(Box<dyn FnOnce(&mut App)>),
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::Notify { emitter } => write!(f, "Notify({emitter})"),
            Effect::Emit { emitter, .. } => write!(f, "Emit({emitter})"),
            Effect::Focus { focus_id, .. } => write!(f, "Focus({focus_id:?})"),
            Effect::Blur { focus_id, .. } => write!(f, "Blur({focus_id:?})"),
            Effect::Release { entity_id } => write!(f, "Release({entity_id})"),
            Effect::Callback(_) => f.write_str("Callback"),
        }
    }
}

pub(crate) type ObserverCallback = Box<dyn FnMut(&mut App) -> bool>;
pub(crate) type EventCallback = Box<dyn FnMut(&dyn Any, &mut App) -> bool>;
pub(crate) type ReleaseCallback = Box<dyn FnOnce(&mut dyn Any, &mut App)>;

/// Registrations attached to entities. They are removed together with the entity.
pub(crate) struct EntityMeta {
    pub observers: SubscriberSet<EntityId, ObserverCallback>,
    pub event_listeners: SubscriberSet<(EntityId, TypeId), EventCallback>,
    pub release_listeners: SubscriberSet<EntityId, ReleaseCallback>,
}

impl EntityMeta {
    fn new() -> Self {
        Self {
            observers: SubscriberSet::new(),
            event_listeners: SubscriberSet::new(),
            release_listeners: SubscriberSet::new(),
        }
    }

    fn remove(&self, entity_id: EntityId) {
        self.observers.remove(&entity_id);
        self.event_listeners
            .remove_where(|(emitter, _)| *emitter == entity_id);
        self.release_listeners.remove(&entity_id);
    }
}

/// Owns every entity and window and applies effects.
///
/// All state changes go through [`App::update`]-scoped operations. Effects queued while
/// an update is running are flushed, in order, when the outermost update returns.
pub struct App {
    pub(crate) platform: Rc<dyn Platform>,
    pub(crate) text_system: Rc<dyn TextSystem>,
    pub(crate) options: AppOptions,
    pub(crate) entities: EntityMap,
    pub(crate) meta: EntityMeta,
    pub(crate) windows: SlotMap<WindowId, Option<Box<Window>>>,
    pub(crate) focus: FxHashMap<WindowId, FocusState>,
    pub(crate) rendered_views: FxHashMap<WindowId, FxHashSet<EntityId>>,
    pub(crate) view_focus_handles: FxHashMap<(WindowId, EntityId), FocusHandle>,
    pub(crate) dirty_windows: FxHashSet<WindowId>,
    pub(crate) frame_scheduler: FrameScheduler,
    pending_effects: VecDeque<Effect>,
    flushing_effects: bool,
    pending_updates: usize,
    released_during_lease: FxHashSet<EntityId>,
    executor: ForegroundExecutor,
    completed_tasks: Rc<RefCell<VecDeque<Box<dyn FnOnce(&mut App)>>>>,
    next_focus_id: u64,
    next_scroll_id: u64,
    effects_flushed: usize,
}

impl App {
    pub fn new(platform: Rc<dyn Platform>) -> Self {
        Self::with_options(platform, AppOptions::default())
    }

    pub fn with_options(platform: Rc<dyn Platform>, options: AppOptions) -> Self {
        let text_system = platform.text_system();
        Self {
            platform,
            text_system,
            options,
            entities: EntityMap::new(),
            meta: EntityMeta::new(),
            windows: SlotMap::with_key(),
            focus: FxHashMap::default(),
            rendered_views: FxHashMap::default(),
            view_focus_handles: FxHashMap::default(),
            dirty_windows: FxHashSet::default(),
            frame_scheduler: FrameScheduler::default(),
            pending_effects: VecDeque::new(),
            flushing_effects: false,
            pending_updates: 0,
            released_during_lease: FxHashSet::default(),
            executor: ForegroundExecutor::new(),
            completed_tasks: Rc::default(),
            next_focus_id: 0,
            next_scroll_id: 0,
            effects_flushed: 0,
        }
    }

    pub fn platform(&self) -> &Rc<dyn Platform> {
        &self.platform
    }

    pub fn text_system(&self) -> &Rc<dyn TextSystem> {
        &self.text_system
    }

    pub fn options(&self) -> &AppOptions {
        &self.options
    }

    /// Runs `update` as a unit. Effects it queues are flushed once the outermost update
    /// returns.
    ///
    /// A panic inside `update` still closes the unit, so later updates flush as usual.
    /// Effects queued before the panic stay queued for the next flush.
    pub(crate) fn update<R>(&mut self, update: impl FnOnce(&mut Self) -> R) -> R {
        self.pending_updates += 1;
        let result = panic::catch_unwind(AssertUnwindSafe(|| update(self)));
        self.pending_updates -= 1;
        match result {
            Ok(result) => {
                if self.pending_updates == 0 {
                    self.flush_effects();
                }
                result
            }
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    pub(crate) fn push_effect(&mut self, effect: Effect) {
        log::trace!("queued {effect:?}");
        self.pending_effects.push_back(effect);
    }

    /// Applies queued effects in FIFO order until the queue is empty, including effects
    /// queued by the effects being applied. Does nothing when called from within a flush
    /// or while an update is still running.
    pub fn flush_effects(&mut self) {
        if self.flushing_effects || self.pending_updates > 0 {
            return;
        }
        self.flushing_effects = true;
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            while let Some(effect) = self.pending_effects.pop_front() {
                self.apply_effect(effect);
            }
        }));
        self.flushing_effects = false;
        if let Err(payload) = result {
            log::error!("effect panicked, {} effects left queued", self.pending_effects.len());
            panic::resume_unwind(payload);
        }
    }

    fn apply_effect(&mut self, effect: Effect) {
        self.effects_flushed += 1;
        match effect {
            Effect::Notify { emitter } => self.apply_notify_effect(emitter),
            Effect::Emit {
                emitter,
                event_type,
                event,
            } => self.apply_emit_effect(emitter, event_type, event),
            Effect::Focus {
                window_id,
                focus_id,
            } => {
                if self.windows.contains_key(window_id)
                    && self.focus.entry(window_id).or_default().push(focus_id)
                {
                    self.mark_window_dirty(window_id);
                }
            }
            Effect::Blur {
                window_id,
                focus_id,
            } => {
                if self
                    .focus
                    .get_mut(&window_id)
                    .is_some_and(|focus| focus.remove(focus_id))
                {
                    self.mark_window_dirty(window_id);
                }
            }
            Effect::Release { entity_id } => self.apply_release_effect(entity_id),
            Effect::Callback(callback) => callback(self),
        }
    }

    /// Number of effects applied since the app was created.
    pub fn effects_flushed(&self) -> usize {
        self.effects_flushed
    }

    fn apply_notify_effect(&mut self, emitter: EntityId) {
        self.meta
            .observers
            .clone()
            .retain(&emitter, |handler| handler(self));

        let windows = self
            .rendered_views
            .iter()
            .filter(|(_, views)| views.contains(&emitter))
            .map(|(window_id, _)| *window_id)
            .collect::<Vec<_>>();
        for window_id in windows {
            self.mark_window_dirty(window_id);
        }
    }

    fn apply_emit_effect(&mut self, emitter: EntityId, event_type: TypeId, event: Box<dyn Any>) {
        self.meta
            .event_listeners
            .clone()
            .retain(&(emitter, event_type), |listener| listener(event.as_ref(), self));
    }

    fn apply_release_effect(&mut self, entity_id: EntityId) {
        if self.entities.is_leased(entity_id) {
            self.released_during_lease.insert(entity_id);
            return;
        }
        let Some(mut value) = self.entities.take_released(entity_id) else {
            return;
        };
        log::debug!(
            "releasing entity {entity_id} ({})",
            self.entities.type_name(entity_id)
        );
        for on_release in self.meta.release_listeners.remove(&entity_id) {
            on_release(value.as_mut(), self);
        }
        self.meta.remove(entity_id);
        self.view_focus_handles
            .retain(|(_, view_id), _| *view_id != entity_id);
        for views in self.rendered_views.values_mut() {
            views.remove(&entity_id);
        }
        self.entities.remove_id(entity_id);
    }

    pub fn new_entity<T: 'static>(&mut self, build: impl FnOnce(&mut Context<T>) -> T) -> Entity<T> {
        self.update(|cx| {
            let slot = cx.entities.reserve::<T>();
            let entity = slot.entity();
            let value = match panic::catch_unwind(AssertUnwindSafe(|| {
                build(&mut Context::new(cx, entity))
            })) {
                Ok(value) => value,
                Err(payload) => {
                    cx.forget_reserved(entity.entity_id);
                    panic::resume_unwind(payload)
                }
            };
            let entity = cx.entities.insert(slot, value);
            if cx.released_during_lease.remove(&entity.entity_id) {
                cx.push_effect(Effect::Release {
                    entity_id: entity.entity_id,
                });
            }
            entity
        })
    }

    /// Drops the id of an entity whose initializer never returned, along with anything
    /// registered against it in the meantime.
    fn forget_reserved(&mut self, entity_id: EntityId) {
        self.released_during_lease.remove(&entity_id);
        self.meta.remove(entity_id);
        self.entities.remove_id(entity_id);
    }

    pub fn new_view<V: Render>(&mut self, build: impl FnOnce(&mut Context<V>) -> V) -> View<V> {
        View {
            entity: self.new_entity(build),
        }
    }

    pub fn read_entity<T: 'static>(&self, entity: &Entity<T>) -> Result<&T> {
        self.entities.read(entity)
    }

    /// Leases the entity's value to `update`. While the lease is held the entity cannot
    /// be read or updated again. If `update` panics the value is put back (or parked
    /// when a release was requested) before the panic resumes.
    pub fn update_entity<T: 'static, R>(
        &mut self,
        entity: &Entity<T>,
        update: impl FnOnce(&mut T, &mut Context<T>) -> R,
    ) -> Result<R> {
        let result = self.update(|cx| {
            let mut lease = cx.entities.lease(entity)?;
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                update(&mut lease, &mut Context::new(cx, *entity))
            }));
            let outcome = if cx.released_during_lease.remove(&entity.entity_id) {
                LeaseOutcome::Release
            } else {
                LeaseOutcome::Keep
            };
            cx.entities.end_lease(lease, outcome);
            if outcome == LeaseOutcome::Release {
                cx.push_effect(Effect::Release {
                    entity_id: entity.entity_id,
                });
            }
            Ok::<_, FlashError>(result)
        })?;
        match result {
            Ok(result) => Ok(result),
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Requests the entity's release. Drop callbacks run when the release effect is
    /// applied, which for an entity being updated is after its lease ends.
    pub fn release<T: 'static>(&mut self, entity: &Entity<T>) {
        self.release_entity(entity.entity_id);
    }

    pub(crate) fn release_entity(&mut self, entity_id: EntityId) {
        if !self.entities.contains(entity_id) {
            return;
        }
        if self.entities.is_leased(entity_id) {
            self.released_during_lease.insert(entity_id);
        } else {
            self.update(|cx| cx.push_effect(Effect::Release { entity_id }));
        }
    }

    pub(crate) fn notify(&mut self, emitter: EntityId) {
        self.update(|cx| cx.push_effect(Effect::Notify { emitter }));
    }

    pub(crate) fn emit_event<E: Any>(&mut self, emitter: EntityId, event: E) {
        self.update(|cx| {
            cx.push_effect(Effect::Emit {
                emitter,
                event_type: TypeId::of::<E>(),
                event: Box::new(event),
            })
        });
    }

    /// Calls `on_notify` after every flushed notification of `entity`, until the
    /// subscription is dropped or the entity is released.
    pub fn observe<T: 'static>(
        &mut self,
        entity: &Entity<T>,
        mut on_notify: impl FnMut(Entity<T>, &mut App) + 'static,
    ) -> Subscription {
        self.observe_internal(entity, move |entity, cx| {
            on_notify(entity, cx);
            true
        })
    }

    /// Like [`App::observe`], but the callback is dropped once it returns false.
    pub(crate) fn observe_internal<T: 'static>(
        &mut self,
        entity: &Entity<T>,
        mut on_notify: impl FnMut(Entity<T>, &mut App) -> bool + 'static,
    ) -> Subscription {
        let observed = *entity;
        self.meta.observers.insert(
            entity.entity_id,
            Box::new(move |cx: &mut App| {
                cx.entities.contains(observed.entity_id) && on_notify(observed, cx)
            }),
        )
    }

    /// Calls `on_event` for every event of type `E` emitted by `entity`.
    pub fn subscribe<T: EventEmitter<E>, E: 'static>(
        &mut self,
        entity: &Entity<T>,
        mut on_event: impl FnMut(Entity<T>, &E, &mut App) + 'static,
    ) -> Subscription {
        self.subscribe_internal(entity, move |entity, event, cx| {
            on_event(entity, event, cx);
            true
        })
    }

    pub(crate) fn subscribe_internal<T: EventEmitter<E>, E: 'static>(
        &mut self,
        entity: &Entity<T>,
        mut on_event: impl FnMut(Entity<T>, &E, &mut App) -> bool + 'static,
    ) -> Subscription {
        let emitter = *entity;
        self.meta.event_listeners.insert(
            (entity.entity_id, TypeId::of::<E>()),
            Box::new(move |event: &dyn Any, cx: &mut App| {
                if !cx.entities.contains(emitter.entity_id) {
                    return false;
                }
                match event.downcast_ref::<E>() {
                    Some(event) => on_event(emitter, event, cx),
                    None => {
                        log::error!("event for {} was not a {}", emitter.entity_id, type_name::<E>());
                        true
                    }
                }
            }),
        )
    }

    pub(crate) fn on_release_internal<T: 'static>(
        &mut self,
        entity_id: EntityId,
        on_release: impl FnOnce(&mut T, &mut App) + 'static,
    ) -> Subscription {
        self.meta.release_listeners.insert(
            entity_id,
            Box::new(move |value: &mut dyn Any, cx: &mut App| {
                if let Some(value) = value.downcast_mut::<T>() {
                    on_release(value, cx);
                }
            }),
        )
    }

    /// Runs `callback` once the current effects have been applied.
    pub fn defer(&mut self, callback: impl FnOnce(&mut App) + 'static) {
        self.update(|cx| cx.push_effect(Effect::Callback(Box::new(callback))));
    }

    /// Polls `future` on the foreground executor. When it completes, `on_complete` is
    /// queued as a callback effect; the future itself never touches app state.
    ///
    /// Dropping the returned task cancels the future. Use [`Task::detach`] to let it run
    /// to completion.
    pub fn spawn<R: 'static>(
        &mut self,
        future: impl Future<Output = R> + 'static,
        on_complete: impl FnOnce(R, &mut App) + 'static,
    ) -> Task<()> {
        let completed_tasks = self.completed_tasks.clone();
        self.executor.spawn(async move {
            let output = future.await;
            completed_tasks
                .borrow_mut()
                .push_back(Box::new(move |cx: &mut App| on_complete(output, cx)));
        })
    }

    /// Polls spawned futures until none can make progress, applying the completion
    /// callbacks of those that finished.
    pub fn run_until_parked(&mut self) {
        loop {
            self.executor.run_until_stalled();
            let completed = self.completed_tasks.borrow_mut().drain(..).collect::<Vec<_>>();
            if completed.is_empty() {
                break;
            }
            self.update(|cx| {
                for callback in completed {
                    cx.push_effect(Effect::Callback(callback));
                }
            });
        }
    }

    pub fn new_focus_handle(&mut self, window_id: WindowId) -> FocusHandle {
        self.next_focus_id += 1;
        FocusHandle {
            id: FocusId(self.next_focus_id),
            window_id,
        }
    }

    pub fn focus(&mut self, handle: &FocusHandle) {
        self.update(|cx| {
            cx.push_effect(Effect::Focus {
                window_id: handle.window_id,
                focus_id: handle.id,
            })
        });
    }

    pub fn blur(&mut self, handle: &FocusHandle) {
        self.update(|cx| {
            cx.push_effect(Effect::Blur {
                window_id: handle.window_id,
                focus_id: handle.id,
            })
        });
    }

    pub fn focused(&self, window_id: WindowId) -> Option<FocusHandle> {
        let id = self.focus.get(&window_id)?.focused()?;
        Some(FocusHandle { id, window_id })
    }

    pub fn is_focused(&self, handle: &FocusHandle) -> bool {
        self.focus
            .get(&handle.window_id)
            .and_then(|focus| focus.focused())
            == Some(handle.id)
    }

    /// Whether `handle` or a focusable element nested inside it holds focus.
    pub fn contains_focused(&self, handle: &FocusHandle) -> bool {
        let Some(focus) = self.focus.get(&handle.window_id) else {
            return false;
        };
        focus
            .focused()
            .is_some_and(|focused| focus.tree.is_ancestor(handle.id, focused))
    }

    /// Focuses the first focusable child of `handle` in the last rendered frame.
    /// Returns false when it has none.
    pub fn focus_first_child(&mut self, handle: &FocusHandle) -> bool {
        let child = self
            .focus
            .get(&handle.window_id)
            .and_then(|focus| focus.tree.first_child(handle.id));
        self.focus_id(handle.window_id, child)
    }

    pub fn focus_next_sibling(&mut self, handle: &FocusHandle) -> bool {
        let sibling = self
            .focus
            .get(&handle.window_id)
            .and_then(|focus| focus.tree.next_sibling(handle.id));
        self.focus_id(handle.window_id, sibling)
    }

    /// Moves focus forward in tab order, wrapping at the end.
    pub fn focus_next(&mut self, window_id: WindowId) -> bool {
        let next = self
            .focus
            .get(&window_id)
            .and_then(|focus| focus.tree.next(focus.focused()));
        self.focus_id(window_id, next)
    }

    pub fn focus_prev(&mut self, window_id: WindowId) -> bool {
        let prev = self
            .focus
            .get(&window_id)
            .and_then(|focus| focus.tree.prev(focus.focused()));
        self.focus_id(window_id, prev)
    }

    fn focus_id(&mut self, window_id: WindowId, focus_id: Option<FocusId>) -> bool {
        match focus_id {
            Some(id) => {
                self.focus(&FocusHandle { id, window_id });
                true
            }
            None => false,
        }
    }

    pub fn new_scroll_handle(&mut self, window_id: WindowId) -> ScrollHandle {
        self.next_scroll_id += 1;
        ScrollHandle::new(ScrollId(self.next_scroll_id), window_id)
    }

    pub fn scroll_offset(&self, handle: &ScrollHandle) -> Point<Pixels> {
        handle.offset()
    }

    pub fn scroll_viewport(&self, handle: &ScrollHandle) -> Bounds<Pixels> {
        handle.viewport()
    }

    /// Moves the container to `offset`, clamped to its scrollable range.
    pub fn set_scroll_offset(&mut self, handle: &ScrollHandle, offset: Point<Pixels>) {
        if handle.set_offset(offset) {
            self.mark_window_dirty(handle.window_id);
        }
    }

    pub fn scroll_by(&mut self, handle: &ScrollHandle, delta: Point<Pixels>) {
        self.set_scroll_offset(handle, handle.offset() + delta);
    }

    /// Schedules `window_id` to be drawn on the next animation frame. Marking an already
    /// dirty window does nothing.
    pub fn mark_window_dirty(&mut self, window_id: WindowId) {
        if self.windows.contains_key(window_id) && self.dirty_windows.insert(window_id) {
            self.platform.request_animation_frame(window_id);
        }
    }

    pub fn is_window_dirty(&self, window_id: WindowId) -> bool {
        self.dirty_windows.contains(&window_id)
    }

    /// Opens a platform window and builds its root view. The window is drawn on the next
    /// animation frame.
    pub fn open_window<V: Render>(
        &mut self,
        options: WindowOptions,
        build_root_view: impl FnOnce(&mut Window, &mut App) -> View<V>,
    ) -> Result<WindowId> {
        self.update(|cx| {
            let window_id = cx.windows.insert(None);
            let mut window = match Window::new(window_id, options, cx) {
                Ok(window) => Box::new(window),
                Err(error) => {
                    cx.windows.remove(window_id);
                    return Err(error);
                }
            };
            let root_view = build_root_view(&mut window, cx);
            window.root_view = Some(root_view.into());
            if let Some(slot) = cx.windows.get_mut(window_id) {
                *slot = Some(window);
            }
            cx.focus.insert(window_id, FocusState::default());
            cx.mark_window_dirty(window_id);
            log::debug!("opened window {window_id:?}");
            Ok(window_id)
        })
    }

    pub fn window_ids(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.windows.keys()
    }

    /// Leases the window to `update`. Fails with [`FlashError::WindowClosed`] when the
    /// window was removed or is already being updated.
    pub fn update_window<R>(
        &mut self,
        window_id: WindowId,
        update: impl FnOnce(&mut Window, &mut App) -> R,
    ) -> Result<R> {
        self.update(|cx| {
            let mut window = cx
                .windows
                .get_mut(window_id)
                .and_then(|slot| slot.take())
                .ok_or(FlashError::WindowClosed(window_id))?;
            let result = update(&mut window, cx);
            if let Some(slot) = cx.windows.get_mut(window_id) {
                *slot = Some(window);
            }
            Ok(result)
        })
    }

    pub fn read_window<R>(
        &self,
        window_id: WindowId,
        read: impl FnOnce(&Window, &App) -> R,
    ) -> Result<R> {
        let window = self
            .windows
            .get(window_id)
            .and_then(|slot| slot.as_deref())
            .ok_or(FlashError::WindowClosed(window_id))?;
        Ok(read(window, self))
    }

    pub fn remove_window(&mut self, window_id: WindowId) {
        if self.windows.remove(window_id).is_none() {
            return;
        }
        self.focus.remove(&window_id);
        self.rendered_views.remove(&window_id);
        self.view_focus_handles
            .retain(|(view_window_id, _), _| *view_window_id != window_id);
        self.dirty_windows.remove(&window_id);
        self.platform.cancel_animation_frame(window_id);
        log::debug!("removed window {window_id:?}");
    }

    /// Routes raw platform input to the window's hit-test tree.
    pub fn dispatch_input(
        &mut self,
        window_id: WindowId,
        input: PlatformInput,
    ) -> Result<DispatchResult> {
        self.update_window(window_id, |window, cx| window.dispatch_input(input, cx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{TestAppContext, point, px};
    use std::cell::Cell;

    #[derive(Debug, PartialEq)]
    struct Counter {
        count: usize,
    }

    #[test]
    fn test_read_after_create() {
        let mut cx = TestAppContext::new();
        let counter = cx.new_entity(|_| Counter { count: 7 });
        assert_eq!(counter.read(&*cx).unwrap(), &Counter { count: 7 });
    }

    #[test]
    fn test_counter_scenario() {
        let mut cx = TestAppContext::new();
        let counter = cx.new_entity(|_| Counter { count: 0 });
        counter.update(&mut *cx, |counter, _| counter.count += 1).unwrap();
        assert_eq!(counter.read(&*cx).unwrap().count, 1);
    }

    #[test]
    fn test_reentrant_update_fails() {
        let mut cx = TestAppContext::new();
        let counter = cx.new_entity(|_| Counter { count: 0 });
        let nested = counter
            .update(&mut *cx, |_, cx| {
                let read_failed = counter.read(&*cx).is_err();
                let nested = counter.update(cx, |counter, _| counter.count += 1);
                (read_failed, nested)
            })
            .unwrap();
        assert!(nested.0);
        assert!(matches!(nested.1, Err(FlashError::EntityNotFound { .. })));
        assert_eq!(counter.read(&*cx).unwrap().count, 0);
    }

    #[test]
    fn test_panicking_update_restores_value() {
        let mut cx = TestAppContext::new();
        let counter = cx.new_entity(|_| Counter { count: 3 });
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            counter
                .update(&mut *cx, |counter, _| {
                    counter.count = 100;
                    panic!("boom");
                })
                .ok();
        }));
        assert!(result.is_err());
        // Mutations made before the panic stay, but the value is back in the store and
        // the app keeps flushing.
        assert_eq!(counter.read(&*cx).unwrap().count, 100);
        counter.update(&mut *cx, |counter, _| counter.count = 4).unwrap();
        assert_eq!(counter.read(&*cx).unwrap().count, 4);
    }

    #[test]
    fn test_release_requested_before_panic_is_honored() {
        let mut cx = TestAppContext::new();
        let dropped = Rc::new(Cell::new(0));
        let counter = cx.new_entity(|cx| {
            let dropped = dropped.clone();
            cx.on_drop(move |_: &mut Counter, _| dropped.set(dropped.get() + 1))
                .detach();
            Counter { count: 0 }
        });
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            counter
                .update(&mut *cx, |_, cx| {
                    cx.release_self();
                    panic!("boom");
                })
                .ok();
        }));
        assert!(result.is_err());
        assert!(counter.read(&*cx).is_err());
        assert_eq!(dropped.get(), 1);
    }

    #[test]
    fn test_release_inside_update() {
        let mut cx = TestAppContext::new();
        let dropped = Rc::new(RefCell::new(Vec::new()));
        let counter = cx.new_entity(|cx| {
            for tag in ["first", "second"] {
                let dropped = dropped.clone();
                cx.on_drop(move |counter: &mut Counter, _| {
                    dropped.borrow_mut().push((tag, counter.count))
                })
                .detach();
            }
            Counter { count: 0 }
        });

        counter
            .update(&mut *cx, |state, cx| {
                state.count = 5;
                counter.release(cx);
                assert!(dropped.borrow().is_empty());
            })
            .unwrap();

        assert!(matches!(
            counter.read(&*cx),
            Err(FlashError::EntityNotFound { .. })
        ));
        assert_eq!(*dropped.borrow(), vec![("first", 5), ("second", 5)]);

        counter.release(&mut *cx);
        cx.flush_effects();
        assert_eq!(dropped.borrow().len(), 2);
    }

    #[test]
    fn test_effects_flush_in_fifo_order() {
        let mut cx = TestAppContext::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        cx.update(|cx| {
            let log_a = log.clone();
            cx.defer(move |cx| {
                log_a.borrow_mut().push("a");
                let log_c = log_a.clone();
                cx.defer(move |_| log_c.borrow_mut().push("c"));
            });
            let log_b = log.clone();
            cx.defer(move |_| log_b.borrow_mut().push("b"));
            assert!(log.borrow().is_empty());
        });
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_nested_flush_is_a_no_op() {
        let mut cx = TestAppContext::new();
        let counter = cx.new_entity(|_| Counter { count: 0 });
        let log = Rc::new(RefCell::new(Vec::new()));
        cx.observe(&counter, {
            let log = log.clone();
            move |_, cx| {
                log.borrow_mut().push("observer");
                let deferred_log = log.clone();
                cx.defer(move |_| deferred_log.borrow_mut().push("deferred by observer"));
                cx.flush_effects();
                log.borrow_mut().push("observer done");
            }
        })
        .detach();

        cx.update(|cx| {
            counter.update(cx, |_, cx| cx.notify()).unwrap();
            let log = log.clone();
            cx.defer(move |_| log.borrow_mut().push("queued earlier"));
        });
        assert_eq!(
            *log.borrow(),
            [
                "observer",
                "observer done",
                "queued earlier",
                "deferred by observer"
            ]
        );
    }

    #[test]
    fn test_panicking_observer_does_not_stop_later_flushes() {
        let mut cx = TestAppContext::new();
        let first = cx.new_entity(|_| Counter { count: 0 });
        let second = cx.new_entity(|_| Counter { count: 0 });
        let failing = cx.observe(&first, |_, _| panic!("observer failed"));
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            first.update(&mut *cx, |_, cx| cx.notify()).ok();
        }));
        assert!(result.is_err());
        drop(failing);

        let calls = Rc::new(Cell::new(0));
        cx.observe(&second, {
            let calls = calls.clone();
            move |_, _| calls.set(calls.get() + 1)
        })
        .detach();
        second.update(&mut *cx, |_, cx| cx.notify()).unwrap();
        assert_eq!(calls.get(), 1);

        // The failed observer is gone and the first entity can be notified again.
        first.update(&mut *cx, |_, cx| cx.notify()).unwrap();
    }

    #[test]
    fn test_panicking_initializer_leaves_no_entity_behind() {
        let mut cx = TestAppContext::new();
        let entity_count = cx.entities.len();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            cx.new_entity::<Counter>(|_| panic!("initializer failed"));
        }));
        assert!(result.is_err());
        assert_eq!(cx.entities.len(), entity_count);

        let counter = cx.new_entity(|_| Counter { count: 0 });
        let calls = Rc::new(Cell::new(0));
        cx.observe(&counter, {
            let calls = calls.clone();
            move |_, _| calls.set(calls.get() + 1)
        })
        .detach();
        counter.update(&mut *cx, |_, cx| cx.notify()).unwrap();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_observe_requires_notify() {
        let mut cx = TestAppContext::new();
        let counter = cx.new_entity(|_| Counter { count: 0 });
        let seen = Rc::new(RefCell::new(Vec::new()));
        let _subscription = cx.observe(&counter, {
            let seen = seen.clone();
            move |counter, cx| seen.borrow_mut().push(counter.read(&*cx).unwrap().count)
        });

        counter.update(&mut *cx, |counter, _| counter.count += 1).unwrap();
        assert!(seen.borrow().is_empty());

        counter
            .update(&mut *cx, |counter, cx| {
                counter.count += 1;
                cx.notify();
            })
            .unwrap();
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn test_dropped_subscription_stops_observing() {
        let mut cx = TestAppContext::new();
        let counter = cx.new_entity(|_| Counter { count: 0 });
        let calls = Rc::new(Cell::new(0));
        let subscription = cx.observe(&counter, {
            let calls = calls.clone();
            move |_, _| calls.set(calls.get() + 1)
        });
        counter.update(&mut *cx, |_, cx| cx.notify()).unwrap();
        drop(subscription);
        counter.update(&mut *cx, |_, cx| cx.notify()).unwrap();
        assert_eq!(calls.get(), 1);
    }

    struct Renamed(&'static str);
    struct Closed;

    impl EventEmitter<Renamed> for Counter {}
    impl EventEmitter<Closed> for Counter {}

    #[test]
    fn test_subscribers_only_see_their_event_type() {
        let mut cx = TestAppContext::new();
        let counter = cx.new_entity(|_| Counter { count: 0 });
        let renamed = Rc::new(RefCell::new(Vec::new()));
        let closed = Rc::new(Cell::new(0));
        cx.subscribe(&counter, {
            let renamed = renamed.clone();
            move |_, event: &Renamed, _| renamed.borrow_mut().push(event.0)
        })
        .detach();
        cx.subscribe(&counter, {
            let closed = closed.clone();
            move |_, _: &Closed, _| closed.set(closed.get() + 1)
        })
        .detach();

        counter
            .update(&mut *cx, |_, cx| cx.emit(Renamed("foo")))
            .unwrap();
        assert_eq!(*renamed.borrow(), vec!["foo"]);
        assert_eq!(closed.get(), 0);

        counter.update(&mut *cx, |_, cx| cx.emit(Closed)).unwrap();
        assert_eq!(renamed.borrow().len(), 1);
        assert_eq!(closed.get(), 1);
    }

    #[test]
    fn test_observer_registered_during_flush_sees_next_notify() {
        let mut cx = TestAppContext::new();
        let counter = cx.new_entity(|_| Counter { count: 0 });
        let late_calls = Rc::new(Cell::new(0));
        let registered = Rc::new(Cell::new(false));
        cx.observe(&counter, {
            let late_calls = late_calls.clone();
            let registered = registered.clone();
            move |counter, cx| {
                if !registered.replace(true) {
                    let late_calls = late_calls.clone();
                    cx.observe(&counter, move |_, _| late_calls.set(late_calls.get() + 1))
                        .detach();
                }
            }
        })
        .detach();

        counter.update(&mut *cx, |_, cx| cx.notify()).unwrap();
        assert_eq!(late_calls.get(), 0);
        counter.update(&mut *cx, |_, cx| cx.notify()).unwrap();
        assert_eq!(late_calls.get(), 1);
    }

    #[test]
    fn test_spawn_posts_completion_callback() {
        let mut cx = TestAppContext::new();
        let counter = cx.new_entity(|_| Counter { count: 0 });
        let (sender, receiver) = futures::channel::oneshot::channel::<usize>();
        cx.spawn(async move { receiver.await.unwrap_or(0) }, move |value, cx| {
            counter
                .update(cx, |counter, _| counter.count = value)
                .unwrap();
        })
        .detach();

        cx.run_until_parked();
        assert_eq!(counter.read(&*cx).unwrap().count, 0);

        sender.send(9).unwrap();
        cx.run_until_parked();
        assert_eq!(counter.read(&*cx).unwrap().count, 9);
    }

    #[test]
    fn test_dropped_task_never_completes() {
        let mut cx = TestAppContext::new();
        let completed = Rc::new(Cell::new(false));
        let (sender, receiver) = futures::channel::oneshot::channel::<()>();
        let task = cx.spawn(async move { receiver.await.ok() }, {
            let completed = completed.clone();
            move |_, _| completed.set(true)
        });
        drop(task);
        sender.send(()).ok();
        cx.run_until_parked();
        assert!(!completed.get());
    }

    #[test]
    fn test_scroll_offset_is_clamped() {
        let mut cx = TestAppContext::new();
        let window = cx.open_empty_window();
        let handle = cx.new_scroll_handle(window);
        handle.update_layout(
            Bounds::new(point(px(0.), px(0.)), crate::size(px(100.), px(100.))),
            crate::size(px(100.), px(250.)),
        );
        cx.scroll_by(&handle, point(px(0.), px(400.)));
        assert_eq!(cx.scroll_offset(&handle), point(px(0.), px(150.)));
        cx.scroll_by(&handle, point(px(0.), px(-500.)));
        assert_eq!(cx.scroll_offset(&handle), point(px(0.), px(0.)));
    }
}
