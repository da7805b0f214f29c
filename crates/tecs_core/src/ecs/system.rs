//! # Systems
//!
//! Systems are entities too. A system-entity carries a [`System`] component
//! (the handler plus the interest it operates on), a kind marker matching the
//! handler shape, and any number of user tag components that place it in
//! categories.
//!
//! A category is a system interest built by
//! [`Coordinator::make_system_interest`]: three conditions, one per handler
//! kind, each requiring the category tags plus that kind's marker.
//! [`Coordinator::run_systems`] walks the three sets in order
//! per-entity, single-set, multi-set and invokes every handler found.
//!
//! Handlers receive `&mut Coordinator` and may freely attach or detach
//! components. Membership is snapshotted before each handler runs, so a
//! handler never iterates a set that is changing under it. Destruction must
//! go through [`Coordinator::queue_destroy_entity`] while dispatching.

use std::fmt;
use std::rc::Rc;

use tracing::trace;

use super::component::ComponentBundle;
use super::coordinator::Coordinator;
use super::entity::{ComponentMask, Entity};
use super::interest::{EntitySet, InterestCondition, InterestId};
use crate::error::EcsResult;

/// Handler invoked once per member of the target's first set.
pub type PerEntityFn = Rc<dyn Fn(&mut Coordinator, Entity)>;

/// Handler invoked once with the target's first set.
pub type SingleSetFn = Rc<dyn Fn(&mut Coordinator, &[Entity])>;

/// Handler invoked once with every set of the target.
pub type MultiSetFn = Rc<dyn Fn(&mut Coordinator, &[Vec<Entity>])>;

/// Shape of a system handler. Also the dispatch order within a category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SystemKind {
    /// One call per entity.
    PerEntity,
    /// One call per membership set.
    SingleSet,
    /// One call for a whole interest.
    MultiSet,
}

impl SystemKind {
    /// All kinds in dispatch order.
    pub const ALL: [Self; 3] = [Self::PerEntity, Self::SingleSet, Self::MultiSet];

    /// Position of this kind's set inside a system interest.
    #[inline]
    #[must_use]
    pub const fn slot(self) -> usize {
        self as usize
    }
}

/// The callable part of a system.
#[derive(Clone)]
pub enum SystemHandler {
    /// See [`PerEntityFn`].
    PerEntity(PerEntityFn),
    /// See [`SingleSetFn`].
    SingleSet(SingleSetFn),
    /// See [`MultiSetFn`].
    MultiSet(MultiSetFn),
}

impl SystemHandler {
    /// Kind of this handler.
    #[must_use]
    pub const fn kind(&self) -> SystemKind {
        match self {
            Self::PerEntity(_) => SystemKind::PerEntity,
            Self::SingleSet(_) => SystemKind::SingleSet,
            Self::MultiSet(_) => SystemKind::MultiSet,
        }
    }
}

/// Component stored on every system-entity.
#[derive(Clone)]
pub struct System {
    handler: SystemHandler,
    target: InterestId,
}

impl System {
    /// A system called once per entity in `target`'s first set.
    pub fn per_entity(target: InterestId, run: impl Fn(&mut Coordinator, Entity) + 'static) -> Self {
        Self {
            handler: SystemHandler::PerEntity(Rc::new(run)),
            target,
        }
    }

    /// A system called once with `target`'s first set.
    pub fn single_set(target: InterestId, run: impl Fn(&mut Coordinator, &[Entity]) + 'static) -> Self {
        Self {
            handler: SystemHandler::SingleSet(Rc::new(run)),
            target,
        }
    }

    /// A system called once with all of `target`'s sets.
    pub fn multi_set(
        target: InterestId,
        run: impl Fn(&mut Coordinator, &[Vec<Entity>]) + 'static,
    ) -> Self {
        Self {
            handler: SystemHandler::MultiSet(Rc::new(run)),
            target,
        }
    }

    /// Interest the handler operates on.
    #[inline]
    #[must_use]
    pub const fn target(&self) -> InterestId {
        self.target
    }

    /// Kind of the handler.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> SystemKind {
        self.handler.kind()
    }

    /// The handler itself.
    #[inline]
    #[must_use]
    pub const fn handler(&self) -> &SystemHandler {
        &self.handler
    }
}

impl fmt::Debug for System {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("System")
            .field("kind", &self.kind())
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Marker attached to per-entity system-entities.
#[derive(Clone, Copy, Debug, Default)]
pub struct PerEntitySystem;

/// Marker attached to single-set system-entities.
#[derive(Clone, Copy, Debug, Default)]
pub struct SingleSetSystem;

/// Marker attached to multi-set system-entities.
#[derive(Clone, Copy, Debug, Default)]
pub struct MultiSetSystem;

impl Coordinator {
    /// Registers [`System`] and the three kind markers.
    pub(crate) fn register_system_components(&mut self) {
        self.register_component::<System>();
        self.register_component::<PerEntitySystem>();
        self.register_component::<SingleSetSystem>();
        self.register_component::<MultiSetSystem>();
    }

    /// Mask of the [`System`] component plus the marker for `kind`.
    #[must_use]
    pub fn system_kind_mask(&self, kind: SystemKind) -> ComponentMask {
        let marker = match kind {
            SystemKind::PerEntity => self.component_id::<PerEntitySystem>(),
            SystemKind::SingleSet => self.component_id::<SingleSetSystem>(),
            SystemKind::MultiSet => self.component_id::<MultiSetSystem>(),
        };
        ComponentMask::single(self.component_id::<System>()).with(marker)
    }

    /// Registers a system category.
    ///
    /// The resulting interest has three conditions, one per [`SystemKind`] in
    /// dispatch order. Each requires `required` plus the kind's marker and
    /// excludes `excluded`.
    pub fn make_system_interest(&mut self, required: ComponentMask, excluded: ComponentMask) -> InterestId {
        let conditions = SystemKind::ALL
            .map(|kind| InterestCondition::new(required | self.system_kind_mask(kind), excluded));
        self.register_interests(&conditions)
    }

    /// Turns `entity` into a system-entity running `system`.
    ///
    /// Replaces any system the entity already ran, including its kind marker.
    ///
    /// # Panics
    ///
    /// Panics if the entity is not alive.
    pub fn add_system(&mut self, entity: Entity, system: System) {
        if let Some(previous) = self.try_get::<System>(entity).map(System::kind) {
            if previous != system.kind() {
                self.remove_kind_marker(entity, previous);
            }
        }
        match system.kind() {
            SystemKind::PerEntity => {
                self.add_component(entity, PerEntitySystem);
            }
            SystemKind::SingleSet => {
                self.add_component(entity, SingleSetSystem);
            }
            SystemKind::MultiSet => {
                self.add_component(entity, MultiSetSystem);
            }
        }
        self.add_component(entity, system);
    }

    fn remove_kind_marker(&mut self, entity: Entity, kind: SystemKind) {
        match kind {
            SystemKind::PerEntity => {
                self.remove_component::<PerEntitySystem>(entity);
            }
            SystemKind::SingleSet => {
                self.remove_component::<SingleSetSystem>(entity);
            }
            SystemKind::MultiSet => {
                self.remove_component::<MultiSetSystem>(entity);
            }
        }
    }

    /// Creates a system-entity carrying `system` and the category `tags`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IdSpaceExhausted`](crate::EcsError::IdSpaceExhausted)
    /// if no entity id is available.
    pub fn spawn_system<B: ComponentBundle>(&mut self, system: System, tags: B) -> EcsResult<Entity> {
        let entity = self.new_entity()?;
        self.add_components(entity, tags);
        self.add_system(entity, system);
        trace!(%entity, "spawned system");
        Ok(entity)
    }

    /// Runs every system in the category `category`.
    ///
    /// Per-entity systems run first, then single-set, then multi-set. Within
    /// a kind, systems run in membership order. A system that stops matching
    /// the category before its turn is skipped.
    ///
    /// # Panics
    ///
    /// Panics if `category` was not built by [`Self::make_system_interest`].
    pub fn run_systems(&mut self, category: InterestId) {
        let conditions: Vec<InterestCondition> = self.interests().conditions_of(category).to_vec();
        assert_eq!(
            conditions.len(),
            SystemKind::ALL.len(),
            "interest {category:?} is not a system category"
        );

        for kind in SystemKind::ALL {
            let slot = kind.slot();
            let systems = self.interests_of(category)[slot].to_vec();
            for system_entity in systems {
                if !self.is_alive(system_entity) || !conditions[slot].matches(self.mask(system_entity)) {
                    continue;
                }
                let system = self.get_ref::<System>(system_entity).clone();
                trace!(system = %system_entity, ?kind, "dispatching system");
                self.dispatch(&system);
            }
        }
    }

    fn dispatch(&mut self, system: &System) {
        let target = system.target();
        self.enter_dispatch();
        match system.handler() {
            SystemHandler::PerEntity(run) => {
                let members = self.interests_of(target)[0].to_vec();
                for entity in members {
                    // Earlier calls may have moved this entity out of the set.
                    if self.interests_of(target)[0].contains(entity) {
                        run(self, entity);
                    }
                }
            }
            SystemHandler::SingleSet(run) => {
                let members = self.interests_of(target)[0].to_vec();
                run(self, &members);
            }
            SystemHandler::MultiSet(run) => {
                let sets: Vec<Vec<Entity>> = self
                    .interests_of(target)
                    .iter()
                    .map(EntitySet::to_vec)
                    .collect();
                run(self, &sets);
            }
        }
        self.exit_dispatch();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    #[derive(Debug, Default)]
    struct Counter(u32);

    #[derive(Debug, Default)]
    struct Physics;

    #[derive(Debug, Default)]
    struct Render;

    #[derive(Debug, Default)]
    struct Paused;

    fn world() -> Coordinator {
        let mut world = Coordinator::new();
        world.register_component::<Counter>();
        world.register_component::<Physics>();
        world.register_component::<Render>();
        world.register_component::<Paused>();
        world
    }

    fn counters(world: &mut Coordinator) -> InterestId {
        let counter = world.component_id::<Counter>();
        world.register_interests(&[InterestCondition::requiring(ComponentMask::single(counter))])
    }

    #[test]
    fn test_per_entity_system_runs_once_per_member() {
        let mut world = world();
        let target = counters(&mut world);
        let physics = world.mask_of::<(Physics,)>();
        let category = world.make_system_interest(physics, ComponentMask::EMPTY);

        let entities: Vec<_> = (0..3)
            .map(|_| {
                let e = world.new_entity().unwrap();
                world.add_default_component::<Counter>(e);
                e
            })
            .collect();

        world
            .spawn_system(
                System::per_entity(target, |world, e| world.get::<Counter>(e).0 += 1),
                (Physics,),
            )
            .unwrap();

        world.run_systems(category);
        world.run_systems(category);
        for e in entities {
            assert_eq!(world.get_ref::<Counter>(e).0, 2);
        }
    }

    #[test]
    fn test_dispatch_order_by_kind() {
        let mut world = world();
        let target = counters(&mut world);
        let physics = world.mask_of::<(Physics,)>();
        let category = world.make_system_interest(physics, ComponentMask::EMPTY);
        let e = world.new_entity().unwrap();
        world.add_default_component::<Counter>(e);

        let log = Rc::new(RefCell::new(Vec::new()));
        let (a, b, c) = (log.clone(), log.clone(), log.clone());
        // Spawned in reverse of dispatch order.
        world
            .spawn_system(System::multi_set(target, move |_, _| a.borrow_mut().push("multi")), (Physics,))
            .unwrap();
        world
            .spawn_system(System::single_set(target, move |_, _| b.borrow_mut().push("single")), (Physics,))
            .unwrap();
        world
            .spawn_system(System::per_entity(target, move |_, _| c.borrow_mut().push("per-entity")), (Physics,))
            .unwrap();

        world.run_systems(category);
        assert_eq!(*log.borrow(), vec!["per-entity", "single", "multi"]);
    }

    #[test]
    fn test_categories_are_disjoint_and_exclusions_apply() {
        let mut world = world();
        let target = counters(&mut world);
        let physics = world.mask_of::<(Physics,)>();
        let render = world.mask_of::<(Render,)>();
        let paused = world.mask_of::<(Paused,)>();
        let physics_category = world.make_system_interest(physics, paused);
        let render_category = world.make_system_interest(render, ComponentMask::EMPTY);

        let e = world.new_entity().unwrap();
        world.add_default_component::<Counter>(e);
        let system = world
            .spawn_system(
                System::per_entity(target, |world, e| world.get::<Counter>(e).0 += 1),
                (Physics,),
            )
            .unwrap();

        world.run_systems(render_category);
        assert_eq!(world.get_ref::<Counter>(e).0, 0);

        world.run_systems(physics_category);
        assert_eq!(world.get_ref::<Counter>(e).0, 1);

        world.add_component(system, Paused);
        world.run_systems(physics_category);
        assert_eq!(world.get_ref::<Counter>(e).0, 1);
    }

    #[test]
    fn test_system_sees_snapshot() {
        let mut world = world();
        let target = counters(&mut world);
        let physics = world.mask_of::<(Physics,)>();
        let category = world.make_system_interest(physics, ComponentMask::EMPTY);
        for _ in 0..4 {
            let e = world.new_entity().unwrap();
            world.add_default_component::<Counter>(e);
        }

        let seen = Rc::new(RefCell::new(0));
        let observed = seen.clone();
        world
            .spawn_system(
                System::single_set(target, move |world, members| {
                    *observed.borrow_mut() = members.len();
                    for &e in members {
                        world.remove_component::<Counter>(e);
                    }
                }),
                (Physics,),
            )
            .unwrap();

        world.run_systems(category);
        assert_eq!(*seen.borrow(), 4);
        assert!(world.interests_of(target)[0].is_empty());
    }

    #[test]
    fn test_per_entity_skips_entities_that_left() {
        let mut world = world();
        let target = counters(&mut world);
        let physics = world.mask_of::<(Physics,)>();
        let category = world.make_system_interest(physics, ComponentMask::EMPTY);
        let entities: Vec<_> = (0..3)
            .map(|_| {
                let e = world.new_entity().unwrap();
                world.add_default_component::<Counter>(e);
                e
            })
            .collect();

        let calls = Rc::new(RefCell::new(0));
        let counted = calls.clone();
        let all = entities.clone();
        world
            .spawn_system(
                System::per_entity(target, move |world, e| {
                    *counted.borrow_mut() += 1;
                    // The first visited entity strips everyone else.
                    for &other in &all {
                        if other != e && world.has::<Counter>(other) {
                            world.remove_component::<Counter>(other);
                        }
                    }
                }),
                (Physics,),
            )
            .unwrap();

        world.run_systems(category);
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_queue_destroy_during_dispatch() {
        let mut world = world();
        let target = counters(&mut world);
        let physics = world.mask_of::<(Physics,)>();
        let category = world.make_system_interest(physics, ComponentMask::EMPTY);
        let e = world.new_entity().unwrap();
        world.add_default_component::<Counter>(e);

        world
            .spawn_system(
                System::per_entity(target, |world, e| {
                    assert!(world.is_dispatching());
                    world.queue_destroy_entity(e);
                    world.queue_destroy_entity(e);
                }),
                (Physics,),
            )
            .unwrap();

        world.run_systems(category);
        assert!(!world.is_dispatching());
        assert!(world.is_alive(e));
        assert_eq!(world.destroy_queued(), 1);
        assert!(!world.is_alive(e));
    }

    #[test]
    #[should_panic(expected = "during system dispatch")]
    fn test_destroy_during_dispatch_panics() {
        let mut world = world();
        let target = counters(&mut world);
        let physics = world.mask_of::<(Physics,)>();
        let category = world.make_system_interest(physics, ComponentMask::EMPTY);
        let e = world.new_entity().unwrap();
        world.add_default_component::<Counter>(e);
        world
            .spawn_system(System::per_entity(target, |world, e| world.destroy_entity(e)), (Physics,))
            .unwrap();
        world.run_systems(category);
    }

    #[test]
    #[should_panic(expected = "destroy_queued called during system dispatch")]
    fn test_draining_queue_during_dispatch_panics() {
        let mut world = world();
        let target = counters(&mut world);
        let physics = world.mask_of::<(Physics,)>();
        let category = world.make_system_interest(physics, ComponentMask::EMPTY);
        let e = world.new_entity().unwrap();
        world.add_component(e, Counter(0));
        world
            .spawn_system(
                System::single_set(target, |world, members| {
                    for &e in members {
                        world.queue_destroy_entity(e);
                    }
                    world.destroy_queued();
                }),
                (Physics,),
            )
            .unwrap();
        world.run_systems(category);
    }

    #[test]
    fn test_replacing_system_swaps_marker() {
        let mut world = world();
        let target = counters(&mut world);
        let e = world.new_entity().unwrap();
        world.add_system(e, System::per_entity(target, |_, _| {}));
        assert!(world.has::<PerEntitySystem>(e));

        world.add_system(e, System::multi_set(target, |_, _| {}));
        assert!(!world.has::<PerEntitySystem>(e));
        assert!(world.has::<MultiSetSystem>(e));
        assert_eq!(world.get_ref::<System>(e).kind(), SystemKind::MultiSet);
    }

    #[test]
    fn test_multi_set_receives_every_condition() {
        let mut world = world();
        let counter = world.component_id::<Counter>();
        let render = world.component_id::<Render>();
        let target = world.register_interests(&[
            InterestCondition::requiring(ComponentMask::single(counter)),
            InterestCondition::requiring(ComponentMask::single(render)),
        ]);
        let physics = world.mask_of::<(Physics,)>();
        let category = world.make_system_interest(physics, ComponentMask::EMPTY);

        let a = world.new_entity().unwrap();
        world.add_default_component::<Counter>(a);
        let b = world.new_entity().unwrap();
        world.add_component(b, Render);
        world.add_component(b, Counter(5));
        world.remove_component::<Counter>(b);

        let sizes = Rc::new(RefCell::new(Vec::new()));
        let out = sizes.clone();
        world
            .spawn_system(
                System::multi_set(target, move |_, sets| {
                    out.borrow_mut().extend(sets.iter().map(Vec::len));
                }),
                (Physics,),
            )
            .unwrap();
        world.run_systems(category);
        assert_eq!(*sizes.borrow(), vec![1, 1]);
    }
}
