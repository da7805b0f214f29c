//! # Memory Management
//!
//! Recycling id allocators and fixed-capacity queues.
//!
//! ## Design Philosophy
//!
//! Ids are small and dense so they can index plain arrays. Everything that
//! queues ids has a fixed capacity chosen at startup; overflowing it means
//! destruction outpaced reuse beyond the designed working set.

mod id_manager;
mod queue;

pub use id_manager::{IdAllocator, RecyclableId};
pub use queue::BoundedQueue;
