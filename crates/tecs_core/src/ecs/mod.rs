//! # Entity Component System
//!
//! An interest-driven ECS: instead of scanning storage, every query is a
//! registered interest whose membership sets are kept up to date as
//! components come and go.
//!
//! ## Design Philosophy
//!
//! - Entities are plain integer ids, recycled after destruction
//! - Components live in one dense array per type, indexed by entity id
//! - Each entity carries a 64-bit existence mask of its components
//! - Systems are entities, grouped into categories by tag components

mod component;
mod coordinator;
mod entity;
mod interest;
mod storage;
mod system;

pub use component::{Component, ComponentBundle, ComponentRegistry};
pub use coordinator::Coordinator;
pub use entity::{ComponentId, ComponentMask, Entity, EntityRecord, MAX_COMPONENTS};
pub use interest::{EntitySet, InterestCondition, InterestId, InterestRegistry};
pub use storage::{ComponentStore, ErasedStore};
pub use system::{
    MultiSetFn, MultiSetSystem, PerEntityFn, PerEntitySystem, SingleSetFn, SingleSetSystem,
    System, SystemHandler, SystemKind,
};
