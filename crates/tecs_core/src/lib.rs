//! # TECS Core Runtime
//!
//! A small Entity Component System built around *interests*: registered
//! required / excluded component masks whose matching entities are tracked
//! incrementally, so systems never search for their data.
//!
//! ## Architecture Rules
//!
//! 1. **Masks are the source of truth** - an entity holds a component exactly
//!    when its existence mask has the component's bit
//! 2. **Sets never lag** - every attach, detach and destroy updates all
//!    interest membership sets before returning
//! 3. **No destruction during dispatch** - systems queue destruction and the
//!    game loop drains the queue at a safe point
//!
//! ## Example
//!
//! ```rust
//! use tecs_core::{ComponentMask, Coordinator, InterestCondition, System};
//!
//! struct Health(i32);
//! struct Physics;
//!
//! let mut world = Coordinator::new();
//! let health = world.register_component::<Health>();
//! world.register_component::<Physics>();
//!
//! let living = world.register_interests(&[InterestCondition::requiring(ComponentMask::single(health))]);
//! let physics = world.make_system_interest(world.mask_of::<(Physics,)>(), ComponentMask::EMPTY);
//!
//! world
//!     .spawn_system(System::per_entity(living, |world, e| world.get::<Health>(e).0 -= 1), (Physics,))
//!     .unwrap();
//!
//! let zombie = world.new_entity().unwrap();
//! world.add_component(zombie, Health(3));
//! world.run_systems(physics);
//! assert_eq!(world.get_ref::<Health>(zombie).0, 2);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod memory;

pub use config::WorldConfig;
pub use ecs::{
    Component, ComponentBundle, ComponentId, ComponentMask, ComponentRegistry, ComponentStore,
    Coordinator, Entity, EntitySet, InterestCondition, InterestId, InterestRegistry, System,
    SystemHandler, SystemKind, MAX_COMPONENTS,
};
pub use error::{EcsError, EcsResult};
pub use memory::{BoundedQueue, IdAllocator, RecyclableId};
