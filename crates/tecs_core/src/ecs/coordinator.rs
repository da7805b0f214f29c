//! # Coordinator
//!
//! The central container for all entities, components and interests.
//!
//! Every component attach or detach updates the entity's existence mask and
//! every interest membership set in the same call, so there is never an
//! observable moment where a set disagrees with a mask.
//!
//! # Destruction
//!
//! Destroying an entity mutates membership sets, so it must not happen while
//! systems are being dispatched. Systems call
//! [`Coordinator::queue_destroy_entity`] instead and the driving loop drains
//! the queue with [`Coordinator::destroy_queued`] at a safe point.
//!
//! # Example
//!
//! ```rust
//! use tecs_core::{ComponentMask, Coordinator, InterestCondition};
//!
//! struct Position(f32);
//! struct Frozen;
//!
//! let mut world = Coordinator::new();
//! let position = world.register_component::<Position>();
//! let frozen = world.register_component::<Frozen>();
//!
//! let movable = world.register_interests(&[InterestCondition::new(
//!     ComponentMask::single(position),
//!     ComponentMask::single(frozen),
//! )]);
//!
//! let e = world.new_entity().unwrap();
//! world.add_component(e, Position(1.0));
//! assert!(world.interests_of(movable)[0].contains(e));
//!
//! world.add_component(e, Frozen);
//! assert!(world.interests_of(movable)[0].is_empty());
//! ```

use std::any::type_name;

use tracing::{debug, trace, warn};

use super::component::{Component, ComponentBundle, ComponentRegistry};
use super::entity::{ComponentId, ComponentMask, Entity, EntityRecord};
use super::interest::{EntitySet, InterestCondition, InterestId, InterestRegistry};
use crate::config::WorldConfig;
use crate::error::EcsResult;
use crate::memory::{BoundedQueue, IdAllocator};

/// The ECS world - owner of all entity and component state.
///
/// Single-threaded: every operation runs to completion before returning.
pub struct Coordinator {
    /// Configuration the world was created with.
    config: WorldConfig,
    /// Entity id allocator.
    entities: IdAllocator<Entity>,
    /// Existence mask and liveness per entity slot.
    records: Vec<EntityRecord>,
    /// Number of currently alive entities.
    alive_count: usize,
    /// Component ids and stores.
    components: ComponentRegistry,
    /// Interest conditions and membership sets.
    interests: InterestRegistry,
    /// Entities awaiting destruction at the next safe point.
    pending_destructions: BoundedQueue<Entity>,
    /// Nesting depth of running system handlers.
    dispatch_depth: u32,
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl Coordinator {
    /// Creates a world with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::build(WorldConfig::default())
    }

    /// Creates a world with an explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`](crate::EcsError::InvalidConfig) if
    /// the configuration fails validation.
    pub fn with_config(config: WorldConfig) -> EcsResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: WorldConfig) -> Self {
        let entities = match config.max_entities {
            Some(limit) => IdAllocator::with_limit(config.recycle_capacity, u64::from(limit)),
            None => IdAllocator::new(config.recycle_capacity),
        };
        let mut world = Self {
            entities,
            records: Vec::with_capacity(config.initial_entity_capacity),
            alive_count: 0,
            components: ComponentRegistry::new(),
            interests: InterestRegistry::new(),
            pending_destructions: BoundedQueue::new(config.destroy_queue_capacity),
            dispatch_depth: 0,
            config,
        };
        world.register_system_components();
        debug!(
            recycle_capacity = world.config.recycle_capacity,
            destroy_queue_capacity = world.config.destroy_queue_capacity,
            "created world"
        );
        world
    }

    /// Configuration the world was created with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    // =========================================================================
    // Entity lifecycle
    // =========================================================================

    /// Creates an entity with no components.
    ///
    /// Reuses a destroyed id when one is waiting, otherwise issues a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IdSpaceExhausted`](crate::EcsError::IdSpaceExhausted)
    /// when `max_entities` ids are live and none are waiting for reuse.
    pub fn new_entity(&mut self) -> EcsResult<Entity> {
        let entity = self.entities.allocate()?;
        let index = entity.index();
        if self.records.len() <= index {
            self.records.resize(index + 1, EntityRecord::dead());
        }
        self.records[index] = EntityRecord::spawned();
        self.alive_count += 1;
        self.interests.on_entity_created(entity);
        trace!(%entity, "spawned entity");
        Ok(entity)
    }

    /// Destroys an entity immediately.
    ///
    /// Clears its mask, drops every component it holds, removes it from every
    /// membership set and returns its id for reuse.
    ///
    /// # Panics
    ///
    /// Panics if called while systems are being dispatched, or if the entity
    /// is not alive.
    pub fn destroy_entity(&mut self, entity: Entity) {
        assert!(
            !self.is_dispatching(),
            "destroy_entity({entity}) called during system dispatch; use queue_destroy_entity"
        );
        let mask = self.live_record(entity).mask;
        let index = entity.index();

        self.records[index] = EntityRecord::dead();
        self.components.invalidate(index, mask);
        self.interests.on_entity_destroyed(entity);
        self.entities.release(entity);
        self.alive_count -= 1;
        trace!(%entity, ?mask, "destroyed entity");
    }

    /// Queues an entity for destruction at the next [`Self::destroy_queued`].
    ///
    /// Safe to call from a running system. Queuing an entity that is already
    /// pending does nothing; it will still be destroyed exactly once.
    ///
    /// Returns `true` if the entity was newly queued.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive or the destruction queue is full.
    pub fn queue_destroy_entity(&mut self, entity: Entity) -> bool {
        let _ = self.live_record(entity);
        if self.pending_destructions.contains(&entity) {
            return false;
        }
        if self.pending_destructions.push(entity).is_err() {
            panic!(
                "destruction queue overflow: more than {} entities pending",
                self.pending_destructions.capacity()
            );
        }
        true
    }

    /// Destroys every queued entity in FIFO order.
    ///
    /// Returns the number of entities destroyed. Entries whose entity died in
    /// the meantime are skipped.
    ///
    /// # Panics
    ///
    /// Panics if called while systems are being dispatched.
    pub fn destroy_queued(&mut self) -> usize {
        assert!(
            !self.is_dispatching(),
            "destroy_queued called during system dispatch"
        );
        let mut destroyed = 0;
        while let Some(entity) = self.pending_destructions.pop() {
            if self.is_alive(entity) {
                self.destroy_entity(entity);
                destroyed += 1;
            } else {
                warn!(%entity, "queued entity was already destroyed");
            }
        }
        destroyed
    }

    /// Number of entities waiting in the destruction queue.
    #[inline]
    #[must_use]
    pub fn pending_destruction_count(&self) -> usize {
        self.pending_destructions.len()
    }

    /// Returns `true` if `entity` is currently alive.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.records.get(entity.index()).is_some_and(|r| r.alive)
    }

    /// Number of currently alive entities.
    #[inline]
    #[must_use]
    pub const fn alive_count(&self) -> usize {
        self.alive_count
    }

    /// Iterates over all alive entities in id order.
    pub fn live_entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.alive)
            .map(|(index, _)| Self::entity_at(index))
    }

    /// Existence mask of `entity`. Dead entities have an empty mask.
    #[inline]
    #[must_use]
    pub fn mask(&self, entity: Entity) -> ComponentMask {
        self.records
            .get(entity.index())
            .filter(|r| r.alive)
            .map_or(ComponentMask::EMPTY, |r| r.mask)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn entity_at(index: usize) -> Entity {
        Entity::from_raw(index as u32)
    }

    fn live_record(&self, entity: Entity) -> &EntityRecord {
        match self.records.get(entity.index()) {
            Some(record) if record.alive => record,
            _ => panic!("entity {entity} is not alive"),
        }
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Registers component type `T` with this world.
    ///
    /// # Panics
    ///
    /// Panics if `T` is already registered or all 64 component ids are taken.
    pub fn register_component<T: Component>(&mut self) -> ComponentId {
        let id = self.components.register::<T>();
        debug!(id, component = type_name::<T>(), "registered component");
        id
    }

    /// Id of component type `T`.
    ///
    /// # Panics
    ///
    /// Panics if `T` was not registered.
    #[inline]
    #[must_use]
    pub fn component_id<T: Component>(&self) -> ComponentId {
        self.components.require_id::<T>()
    }

    /// Id of component type `T`, if registered.
    #[inline]
    #[must_use]
    pub fn try_component_id<T: Component>(&self) -> Option<ComponentId> {
        self.components.id_of::<T>()
    }

    /// Combined mask of the component types in bundle `B`.
    ///
    /// ```rust
    /// # use tecs_core::{ComponentMask, Coordinator};
    /// struct A;
    /// struct B;
    /// let mut world = Coordinator::new();
    /// let a = world.register_component::<A>();
    /// let b = world.register_component::<B>();
    /// assert_eq!(world.mask_of::<(A, B)>(), ComponentMask::of(&[a, b]));
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if a component in the bundle was not registered.
    #[must_use]
    pub fn mask_of<B: ComponentBundle>(&self) -> ComponentMask {
        B::mask(self)
    }

    /// Attaches `value` to `entity`, replacing any previous value.
    ///
    /// Returns a mutable reference to the stored component.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive or `T` was not registered.
    pub fn add_component<T: Component>(&mut self, entity: Entity, value: T) -> &mut T {
        let id = self.components.require_id::<T>();
        let old = self.live_record(entity).mask;
        let new = old.with(id);
        let index = entity.index();

        self.records[index].mask = new;
        if new != old {
            self.interests.on_component_added(entity, new, old);
        }
        self.components.store_mut::<T>().insert(index, value)
    }

    /// Attaches `T::default()` to `entity`. Handy for tag components.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive or `T` was not registered.
    pub fn add_default_component<T: Component + Default>(&mut self, entity: Entity) -> &mut T {
        self.add_component(entity, T::default())
    }

    /// Attaches every component of `bundle` to `entity`.
    ///
    /// Returns mutable references to the stored components, in bundle order.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive, a component was not registered, or
    /// the bundle names the same type twice.
    pub fn add_components<B: ComponentBundle>(&mut self, entity: Entity, bundle: B) -> B::Refs<'_> {
        bundle.attach(self, entity);
        B::refs(self, entity)
    }

    /// Detaches `T` from `entity`, returning the removed value.
    ///
    /// Returns `None` if the entity did not hold `T`.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive or `T` was not registered.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        let id = self.components.require_id::<T>();
        let old = self.live_record(entity).mask;
        if !old.contains(id) {
            return None;
        }
        let new = old.without(id);
        let index = entity.index();

        self.records[index].mask = new;
        self.interests.on_component_removed(entity, new, old);
        self.components.store_mut::<T>().take(index)
    }

    /// Returns `true` if `entity` holds component `T`.
    ///
    /// Unregistered types and dead entities hold nothing.
    #[inline]
    #[must_use]
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.components
            .id_of::<T>()
            .is_some_and(|id| self.mask(entity).contains(id))
    }

    /// Mutable access to component `T` of `entity`.
    ///
    /// # Panics
    ///
    /// Panics if the entity does not hold `T`. There is no "not found" at
    /// runtime: callers must only ask for components they know are attached.
    pub fn get<T: Component>(&mut self, entity: Entity) -> &mut T {
        match self.try_get_mut::<T>(entity) {
            Some(component) => component,
            None => panic!("entity {entity} has no {} component", type_name::<T>()),
        }
    }

    /// Shared access to component `T` of `entity`.
    ///
    /// # Panics
    ///
    /// Panics if the entity does not hold `T`.
    #[must_use]
    pub fn get_ref<T: Component>(&self, entity: Entity) -> &T {
        match self.try_get::<T>(entity) {
            Some(component) => component,
            None => panic!("entity {entity} has no {} component", type_name::<T>()),
        }
    }

    /// Shared access to component `T` of `entity`, if attached.
    #[must_use]
    pub fn try_get<T: Component>(&self, entity: Entity) -> Option<&T> {
        if !self.has::<T>(entity) {
            return None;
        }
        self.components.store::<T>().get(entity.index())
    }

    /// Mutable access to component `T` of `entity`, if attached.
    pub fn try_get_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.has::<T>(entity) {
            return None;
        }
        self.components.store_mut::<T>().get_mut(entity.index())
    }

    /// The component registry.
    #[inline]
    #[must_use]
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    pub(crate) fn components_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.components
    }

    // =========================================================================
    // Interests
    // =========================================================================

    /// Registers a group of conditions under one interest id.
    ///
    /// The new membership sets already contain every live entity that
    /// matches, regardless of when it was created.
    ///
    /// # Panics
    ///
    /// Panics if `conditions` is empty.
    pub fn register_interests(&mut self, conditions: &[InterestCondition]) -> InterestId {
        let live = self
            .records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.alive)
            .map(|(index, record)| (Self::entity_at(index), record.mask));
        let id = self.interests.register(conditions, live);
        debug!(interest = id.index(), conditions = conditions.len(), "registered interest");
        id
    }

    /// Membership sets of interest `id`, one per condition.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this world.
    #[inline]
    #[must_use]
    pub fn interests_of(&self, id: InterestId) -> &[EntitySet] {
        self.interests.interests_of(id)
    }

    /// The interest registry.
    #[inline]
    #[must_use]
    pub fn interests(&self) -> &InterestRegistry {
        &self.interests
    }

    // =========================================================================
    // Dispatch bookkeeping
    // =========================================================================

    /// Returns `true` while a system handler is running.
    #[inline]
    #[must_use]
    pub const fn is_dispatching(&self) -> bool {
        self.dispatch_depth > 0
    }

    pub(crate) fn enter_dispatch(&mut self) {
        self.dispatch_depth += 1;
    }

    pub(crate) fn exit_dispatch(&mut self) {
        self.dispatch_depth -= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EcsError;

    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    struct Velocity {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Default)]
    struct Zombie;

    fn world() -> Coordinator {
        let mut world = Coordinator::new();
        world.register_component::<Position>();
        world.register_component::<Velocity>();
        world.register_component::<Zombie>();
        world
    }

    #[test]
    fn test_spawn_destroy() {
        let mut world = world();

        let e0 = world.new_entity().unwrap();
        let e1 = world.new_entity().unwrap();
        assert!(world.is_alive(e0));
        assert_eq!(world.alive_count(), 2);
        assert_eq!(world.mask(e1), ComponentMask::EMPTY);

        world.destroy_entity(e0);
        assert!(!world.is_alive(e0));
        assert_eq!(world.alive_count(), 1);

        // Spawn again - should reuse the id
        let e2 = world.new_entity().unwrap();
        assert_eq!(e2, e0);
        assert_eq!(world.live_entities().collect::<Vec<_>>(), vec![e0, e1]);
    }

    #[test]
    fn test_add_get_remove() {
        let mut world = world();
        let e = world.new_entity().unwrap();

        world.add_component(e, Position { x: 1.0, y: 2.0 });
        assert!(world.has::<Position>(e));
        assert!(!world.has::<Velocity>(e));

        world.get::<Position>(e).x += 1.0;
        assert_eq!(world.get_ref::<Position>(e).x, 2.0);
        assert_eq!(world.get_ref::<Position>(e).y, 2.0);

        let removed = world.remove_component::<Position>(e);
        assert_eq!(removed.map(|p| p.x), Some(2.0));
        assert!(!world.has::<Position>(e));
        assert!(world.try_get::<Position>(e).is_none());
        assert!(world.remove_component::<Position>(e).is_none());
    }

    #[test]
    fn test_mask_tracks_store_validity() {
        let mut world = world();
        let e = world.new_entity().unwrap();
        world.add_components(e, (Position::default(), Velocity { x: 0.5, y: 0.0 }, Zombie));

        for id in 0..world.components().len() {
            #[allow(clippy::cast_possible_truncation)]
            let id = id as ComponentId;
            assert_eq!(
                world.mask(e).contains(id),
                world.components().slot_is_valid(id, e.index())
            );
        }
        assert_eq!(world.get_ref::<Velocity>(e).x, 0.5);
        assert_eq!(world.get_ref::<Velocity>(e).y, 0.0);

        world.destroy_entity(e);
        for id in 0..world.components().len() {
            #[allow(clippy::cast_possible_truncation)]
            let id = id as ComponentId;
            assert!(!world.components().slot_is_valid(id, e.index()));
        }
    }

    #[test]
    fn test_add_components_returns_stored_values() {
        let mut world = world();
        let e = world.new_entity().unwrap();

        let (position, velocity) =
            world.add_components(e, (Position { x: 1.0, y: 1.0 }, Velocity::default()));
        position.x = 4.0;
        velocity.y = -2.0;

        assert_eq!(*world.get_ref::<Position>(e), Position { x: 4.0, y: 1.0 });
        assert_eq!(*world.get_ref::<Velocity>(e), Velocity { x: 0.0, y: -2.0 });
        assert_eq!(world.mask(e), world.mask_of::<(Position, Velocity)>());
    }

    #[test]
    #[should_panic(expected = "has no")]
    fn test_bundle_with_repeated_type_panics() {
        let mut world = world();
        let e = world.new_entity().unwrap();
        let _ = world.add_components(e, (Zombie, Zombie));
    }

    #[test]
    fn test_recycled_entity_starts_empty() {
        let mut world = world();
        let e = world.new_entity().unwrap();
        world.add_default_component::<Zombie>(e);
        world.destroy_entity(e);

        let reused = world.new_entity().unwrap();
        assert_eq!(reused, e);
        assert!(!world.has::<Zombie>(reused));
        assert_eq!(world.mask(reused), ComponentMask::EMPTY);
    }

    #[test]
    #[should_panic(expected = "has no")]
    fn test_get_unattached_panics() {
        let mut world = world();
        let e = world.new_entity().unwrap();
        let _ = world.get::<Velocity>(e);
    }

    #[test]
    #[should_panic(expected = "is not alive")]
    fn test_double_destroy_panics() {
        let mut world = world();
        let e = world.new_entity().unwrap();
        world.destroy_entity(e);
        world.destroy_entity(e);
    }

    #[test]
    fn test_queue_is_idempotent() {
        let mut world = world();
        let e = world.new_entity().unwrap();
        let other = world.new_entity().unwrap();

        assert!(world.queue_destroy_entity(e));
        assert!(!world.queue_destroy_entity(e));
        assert_eq!(world.pending_destruction_count(), 1);

        assert_eq!(world.destroy_queued(), 1);
        assert!(!world.is_alive(e));
        assert!(world.is_alive(other));

        // The id went back to the allocator exactly once.
        let a = world.new_entity().unwrap();
        let b = world.new_entity().unwrap();
        assert_eq!(a, e);
        assert_ne!(b, e);
    }

    #[test]
    fn test_queued_entity_destroyed_directly_is_skipped() {
        let mut world = world();
        let e = world.new_entity().unwrap();
        world.queue_destroy_entity(e);
        world.destroy_entity(e);
        assert_eq!(world.destroy_queued(), 0);
        assert_eq!(world.pending_destruction_count(), 0);
    }

    #[test]
    #[should_panic(expected = "destruction queue overflow")]
    fn test_destroy_queue_overflow_panics() {
        let config = WorldConfig {
            destroy_queue_capacity: 1,
            ..WorldConfig::default()
        };
        let mut world = Coordinator::with_config(config).unwrap();
        let a = world.new_entity().unwrap();
        let b = world.new_entity().unwrap();
        world.queue_destroy_entity(a);
        world.queue_destroy_entity(b);
    }

    #[test]
    fn test_entity_limit() {
        let config = WorldConfig {
            max_entities: Some(2),
            ..WorldConfig::default()
        };
        let mut world = Coordinator::with_config(config).unwrap();
        let a = world.new_entity().unwrap();
        world.new_entity().unwrap();
        assert_eq!(world.new_entity(), Err(EcsError::IdSpaceExhausted { limit: 2 }));

        world.destroy_entity(a);
        assert_eq!(world.new_entity(), Ok(a));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = WorldConfig {
            recycle_capacity: 0,
            ..WorldConfig::default()
        };
        assert!(matches!(
            Coordinator::with_config(config),
            Err(EcsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_interest_scenario_required_and_excluded() {
        let mut world = world();
        let a = world.component_id::<Position>();
        let b = world.component_id::<Velocity>();
        let c = world.component_id::<Zombie>();
        let id = world.register_interests(&[InterestCondition::new(
            ComponentMask::of(&[a, b]),
            ComponentMask::single(c),
        )]);
        let e = world.new_entity().unwrap();

        world.add_component(e, Position::default());
        assert!(!world.interests_of(id)[0].contains(e));
        world.add_component(e, Velocity::default());
        assert!(world.interests_of(id)[0].contains(e));
        world.add_component(e, Zombie);
        assert!(!world.interests_of(id)[0].contains(e));
        world.remove_component::<Zombie>(e);
        assert!(world.interests_of(id)[0].contains(e));
    }

    #[test]
    fn test_wildcard_interest_sees_new_entities() {
        let mut world = world();
        let everything = world.register_interests(&[InterestCondition::matching_all()]);
        let e = world.new_entity().unwrap();
        assert!(world.interests_of(everything)[0].contains(e));
        world.destroy_entity(e);
        assert!(world.interests_of(everything)[0].is_empty());
    }

    #[test]
    fn test_readding_keeps_single_membership() {
        let mut world = world();
        let position = world.component_id::<Position>();
        let id = world.register_interests(&[InterestCondition::requiring(ComponentMask::single(position))]);
        let e = world.new_entity().unwrap();
        world.add_component(e, Position { x: 1.0, y: 0.0 });
        world.add_component(e, Position { x: 3.0, y: 0.0 });
        assert_eq!(world.interests_of(id)[0].len(), 1);
        assert_eq!(world.get_ref::<Position>(e).x, 3.0);
    }
}
