use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    fmt::Debug,
    mem,
    panic::{self, AssertUnwindSafe},
    rc::{Rc, Weak},
};

/// A set of callbacks keyed by the emitter they listen to.
///
/// While the callbacks of a key are being invoked with [`SubscriberSet::retain`], new
/// registrations for that key are staged and only merged once the pass finishes, so an
/// in-flight effect is delivered to exactly the callbacks that existed when it started.
pub(crate) struct SubscriberSet<EmitterKey, Callback>(
    Rc<RefCell<SubscriberSetState<EmitterKey, Callback>>>,
);

impl<EmitterKey, Callback> Clone for SubscriberSet<EmitterKey, Callback> {
    fn clone(&self) -> Self {
        SubscriberSet(self.0.clone())
    }
}

struct SubscriberSetState<EmitterKey, Callback> {
    /// `None` marks a key whose callbacks are currently checked out by `retain`.
    subscribers: BTreeMap<EmitterKey, Option<BTreeMap<usize, Callback>>>,
    dropped_subscribers: BTreeSet<(EmitterKey, usize)>,
    next_subscriber_id: usize,
}

impl<EmitterKey, Callback> SubscriberSet<EmitterKey, Callback>
where
    EmitterKey: 'static + Ord + Clone + Debug,
    Callback: 'static,
{
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(SubscriberSetState {
            subscribers: Default::default(),
            dropped_subscribers: Default::default(),
            next_subscriber_id: 0,
        })))
    }

    /// Registers `callback` for `emitter_key`. Dropping the returned subscription
    /// removes it again.
    pub fn insert(&self, emitter_key: EmitterKey, callback: Callback) -> Subscription {
        let mut lock = self.0.borrow_mut();
        let subscriber_id = lock.next_subscriber_id;
        lock.next_subscriber_id += 1;
        lock.subscribers
            .entry(emitter_key.clone())
            .or_default()
            .get_or_insert_with(Default::default)
            .insert(subscriber_id, callback);
        drop(lock);

        let this: Weak<RefCell<SubscriberSetState<EmitterKey, Callback>>> = Rc::downgrade(&self.0);
        Subscription::new(move || {
            let Some(this) = this.upgrade() else {
                return;
            };
            let mut lock = this.borrow_mut();
            let Some(subscribers) = lock.subscribers.get_mut(&emitter_key) else {
                return;
            };
            match subscribers {
                Some(subscribers) => {
                    subscribers.remove(&subscriber_id);
                    if subscribers.is_empty() {
                        lock.subscribers.remove(&emitter_key);
                    }
                }
                None => {
                    lock.dropped_subscribers
                        .insert((emitter_key, subscriber_id));
                }
            }
        })
    }

    /// Removes and returns every callback registered for `emitter`.
    pub fn remove(&self, emitter: &EmitterKey) -> Vec<Callback> {
        let subscribers = self.0.borrow_mut().subscribers.remove(emitter);
        subscribers
            .flatten()
            .map(|subscribers| subscribers.into_values().collect())
            .unwrap_or_default()
    }

    /// Removes every key matching `predicate`, dropping its callbacks.
    pub fn remove_where(&self, predicate: impl Fn(&EmitterKey) -> bool) {
        let removed = {
            let mut lock = self.0.borrow_mut();
            let keys = lock
                .subscribers
                .keys()
                .filter(|key| predicate(key))
                .cloned()
                .collect::<Vec<_>>();
            keys.into_iter()
                .filter_map(|key| lock.subscribers.remove(&key))
                .collect::<Vec<_>>()
        };
        // Callbacks may own subscriptions into this set, so drop them unlocked.
        drop(removed);
    }

    pub fn is_empty(&self, emitter: &EmitterKey) -> bool {
        self.0
            .borrow()
            .subscribers
            .get(emitter)
            .and_then(|subscribers| subscribers.as_ref())
            .is_none_or(|subscribers| subscribers.is_empty())
    }

    /// Invokes every callback of `emitter`, removing those for which `f` returns
    /// false.
    pub fn retain<F>(&self, emitter: &EmitterKey, mut f: F)
    where
        F: FnMut(&mut Callback) -> bool,
    {
        let Some(mut subscribers) = self
            .0
            .borrow_mut()
            .subscribers
            .get_mut(emitter)
            .and_then(|subscribers| subscribers.take())
        else {
            return;
        };

        // Callbacks that already ran are put back even if a later one panics.
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            subscribers.retain(|_, callback| f(callback))
        }));

        let mut lock = self.0.borrow_mut();
        if let Some(Some(new_subscribers)) = lock.subscribers.remove(emitter) {
            subscribers.extend(new_subscribers);
        }
        for (dropped_emitter, dropped_subscription_id) in mem::take(&mut lock.dropped_subscribers)
        {
            debug_assert_eq!(*emitter, dropped_emitter);
            subscribers.remove(&dropped_subscription_id);
        }
        if !subscribers.is_empty() {
            lock.subscribers.insert(emitter.clone(), Some(subscribers));
        }
        drop(lock);
        if let Err(payload) = result {
            panic::resume_unwind(payload);
        }
    }
}

/// A handle to a registered callback. Dropping it unregisters the callback; call
/// [`Subscription::detach`] to keep the callback alive for as long as its emitter.
#[must_use]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + 'static>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl 'static + FnOnce()) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Keeps the callback registered after this handle is dropped.
    pub fn detach(mut self) {
        self.unsubscribe.take();
    }

    /// Combines two subscriptions into one that unregisters both.
    pub fn join(mut subscription_a: Self, mut subscription_b: Self) -> Self {
        let a_unsubscribe = subscription_a.unsubscribe.take();
        let b_unsubscribe = subscription_b.unsubscribe.take();
        Self {
            unsubscribe: Some(Box::new(move || {
                if let Some(unsubscribe) = a_unsubscribe {
                    unsubscribe();
                }
                if let Some(unsubscribe) = b_unsubscribe {
                    unsubscribe();
                }
            })),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
