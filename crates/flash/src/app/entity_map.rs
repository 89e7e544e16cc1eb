use crate::{App, AppContext, Context, FlashError, ReadContext, Result};
use rustc_hash::FxHashMap;
use std::{
    any::{Any, TypeId, type_name},
    fmt,
    hash::{Hash, Hasher},
    marker::PhantomData,
    num::NonZeroU64,
};

/// A unique identifier for an entity. Ids are allocated in increasing order and never
/// reused, so a later entity always has a greater id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(NonZeroU64);

impl EntityId {
    pub fn as_u64(self) -> u64 {
        self.0.get()
    }

    /// Returns `None` for zero, which is never allocated.
    pub fn from_u64(id: u64) -> Option<Self> {
        NonZeroU64::new(id).map(Self)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u64())
    }
}

/// What happens to a leased value when its lease ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeaseOutcome {
    /// The value goes back into the map.
    Keep,
    /// The entity was released while leased. The value is parked until its release
    /// effect runs the drop callbacks.
    Release,
}

struct EntityInfo {
    type_id: TypeId,
    type_name: &'static str,
}

/// Owns every entity value behind its [`EntityId`].
pub(crate) struct EntityMap {
    ids: FxHashMap<EntityId, EntityInfo>,
    entities: FxHashMap<EntityId, Box<dyn Any>>,
    parked: FxHashMap<EntityId, Box<dyn Any>>,
    next_entity_id: NonZeroU64,
}

/// An allocated id whose value has not been inserted yet, so initializers can refer
/// to their own handle.
#[must_use]
pub(crate) struct Slot<T>(Entity<T>);

impl<T> Slot<T> {
    pub fn entity(&self) -> Entity<T> {
        self.0
    }
}

/// Exclusive ownership of an entity's value for the duration of an update.
#[must_use]
pub(crate) struct Lease<T> {
    entity_id: EntityId,
    value: Box<T>,
}

impl<T> std::ops::Deref for Lease<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> std::ops::DerefMut for Lease<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl EntityMap {
    pub fn new() -> Self {
        Self {
            ids: FxHashMap::default(),
            entities: FxHashMap::default(),
            parked: FxHashMap::default(),
            next_entity_id: NonZeroU64::MIN,
        }
    }

    /// Allocates an id for an entity that will be inserted with [`EntityMap::insert`].
    pub fn reserve<T: 'static>(&mut self) -> Slot<T> {
        let entity_id = EntityId(self.next_entity_id);
        self.next_entity_id = self.next_entity_id.saturating_add(1);
        self.ids.insert(
            entity_id,
            EntityInfo {
                type_id: TypeId::of::<T>(),
                type_name: type_name::<T>(),
            },
        );
        Slot(Entity::new(entity_id))
    }

    pub fn insert<T: 'static>(&mut self, slot: Slot<T>, value: T) -> Entity<T> {
        let entity = slot.0;
        self.entities.insert(entity.entity_id, Box::new(value));
        entity
    }

    pub fn contains(&self, entity_id: EntityId) -> bool {
        self.ids.contains_key(&entity_id)
    }

    /// Whether the entity exists but its value is checked out by a lease.
    pub fn is_leased(&self, entity_id: EntityId) -> bool {
        self.ids.contains_key(&entity_id)
            && !self.entities.contains_key(&entity_id)
            && !self.parked.contains_key(&entity_id)
    }

    pub fn type_name(&self, entity_id: EntityId) -> &'static str {
        self.ids
            .get(&entity_id)
            .map_or("<released>", |info| info.type_name)
    }

    pub fn read<T: 'static>(&self, entity: &Entity<T>) -> Result<&T> {
        self.entities
            .get(&entity.entity_id)
            .and_then(|value| value.downcast_ref::<T>())
            .ok_or_else(|| entity.not_found())
    }

    /// Removes the value from the map for the duration of an update. Reading or
    /// leasing the same entity again before [`EntityMap::end_lease`] fails.
    pub fn lease<T: 'static>(&mut self, entity: &Entity<T>) -> Result<Lease<T>> {
        let value = self
            .entities
            .remove(&entity.entity_id)
            .ok_or_else(|| entity.not_found())?;
        match value.downcast::<T>() {
            Ok(value) => Ok(Lease {
                entity_id: entity.entity_id,
                value,
            }),
            Err(value) => {
                log::error!(
                    "entity {} is not a {}",
                    entity.entity_id,
                    type_name::<T>()
                );
                self.entities.insert(entity.entity_id, value);
                Err(entity.not_found())
            }
        }
    }

    pub fn end_lease<T: 'static>(&mut self, lease: Lease<T>, outcome: LeaseOutcome) {
        let value: Box<dyn Any> = lease.value;
        match outcome {
            LeaseOutcome::Keep => {
                self.entities.insert(lease.entity_id, value);
            }
            LeaseOutcome::Release => {
                self.parked.insert(lease.entity_id, value);
            }
        }
    }

    /// Takes the value out for its release effect, whether it is stored or parked.
    /// Returns `None` for unknown ids and for values still checked out.
    pub fn take_released(&mut self, entity_id: EntityId) -> Option<Box<dyn Any>> {
        self.parked
            .remove(&entity_id)
            .or_else(|| self.entities.remove(&entity_id))
    }

    /// Forgets the id of a released entity.
    pub fn remove_id(&mut self, entity_id: EntityId) {
        self.ids.remove(&entity_id);
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn type_id(&self, entity_id: EntityId) -> Option<TypeId> {
        self.ids.get(&entity_id).map(|info| info.type_id)
    }
}

/// A typed handle to an entity. Handles are plain identifiers: they own nothing, and an
/// entity lives until it is explicitly released.
pub struct Entity<T> {
    pub(crate) entity_id: EntityId,
    entity_type: PhantomData<fn() -> T>,
}

impl<T> Clone for Entity<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Entity<T> {}

impl<T> PartialEq for Entity<T> {
    fn eq(&self, other: &Self) -> bool {
        self.entity_id == other.entity_id
    }
}

impl<T> Eq for Entity<T> {}

impl<T> Hash for Entity<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.entity_id.hash(state);
    }
}

impl<T> fmt::Debug for Entity<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("entity_id", &self.entity_id)
            .field("entity_type", &type_name::<T>())
            .finish()
    }
}

impl<T> Entity<T> {
    pub(crate) fn new(entity_id: EntityId) -> Self {
        Self {
            entity_id,
            entity_type: PhantomData,
        }
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    fn not_found(&self) -> FlashError {
        FlashError::EntityNotFound {
            id: self.entity_id,
            type_name: type_name::<T>(),
        }
    }
}

impl<T: 'static> Entity<T> {
    /// Borrows the entity's current value.
    pub fn read<'a, C: ReadContext>(&self, cx: &'a C) -> Result<&'a T> {
        cx.read_entity(self)
    }

    /// Updates the entity's value under a lease.
    pub fn update<C, R>(
        &self,
        cx: &mut C,
        update: impl FnOnce(&mut T, &mut Context<T>) -> R,
    ) -> Result<R>
    where
        C: AppContext,
    {
        cx.update_entity(self, update)
    }

    /// Requests the entity's release. The value is dropped when the release effect is
    /// flushed.
    pub fn release(&self, cx: &mut impl AppContext) {
        cx.release(self);
    }

    pub fn into_any(self) -> AnyEntity {
        AnyEntity {
            entity_id: self.entity_id,
            entity_type: TypeId::of::<T>(),
        }
    }
}

/// A type-erased [`Entity`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AnyEntity {
    pub(crate) entity_id: EntityId,
    pub(crate) entity_type: TypeId,
}

impl AnyEntity {
    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    pub fn entity_type(&self) -> TypeId {
        self.entity_type
    }

    pub fn downcast<T: 'static>(self) -> Option<Entity<T>> {
        (self.entity_type == TypeId::of::<T>()).then(|| Entity::new(self.entity_id))
    }

    /// Whether the entity still exists in `cx`.
    pub fn is_alive(&self, cx: &App) -> bool {
        cx.entities.contains(self.entity_id)
    }
}

impl<T: 'static> From<Entity<T>> for AnyEntity {
    fn from(entity: Entity<T>) -> Self {
        entity.into_any()
    }
}
