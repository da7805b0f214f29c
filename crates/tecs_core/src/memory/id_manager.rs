//! # Recycling Id Allocator
//!
//! Issues small dense integer ids and takes them back for reuse.
//!
//! Used for entity handles and for sub-resources such as sprite or palette
//! slots. Released ids are handed out again in FIFO order before any
//! never-used id is issued.

use super::queue::BoundedQueue;
use crate::error::{EcsError, EcsResult};

/// An integer-like handle the allocator can issue.
pub trait RecyclableId: Copy + PartialEq + std::fmt::Debug {
    /// Number of distinct values the type can represent.
    const ID_SPACE: u64;

    /// Builds the id for a dense index below [`Self::ID_SPACE`].
    fn from_index(index: u64) -> Self;

    /// Returns the dense index of this id.
    fn index(self) -> u64;
}

macro_rules! impl_recyclable_id {
    ($($ty:ty),*) => {
        $(
            impl RecyclableId for $ty {
                const ID_SPACE: u64 = (<$ty>::MAX as u64).saturating_add(1);

                #[inline]
                #[allow(clippy::cast_possible_truncation)]
                fn from_index(index: u64) -> Self {
                    index as $ty
                }

                #[inline]
                fn index(self) -> u64 {
                    self as u64
                }
            }
        )*
    };
}

impl_recyclable_id!(u8, u16, u32, u64, usize);

/// Allocator of reusable ids.
///
/// # Invariants
///
/// - No two live allocations hold the same id.
/// - The high-water mark only grows when a never-used id is issued.
/// - At most `recycle_capacity` released ids wait for reuse; releasing beyond
///   that is a programming error and panics.
///
/// # Example
///
/// ```rust
/// use tecs_core::IdAllocator;
///
/// let mut ids: IdAllocator<u32> = IdAllocator::new(8);
/// let a = ids.allocate().unwrap();
/// let b = ids.allocate().unwrap();
/// ids.release(a);
/// assert_eq!(ids.allocate().unwrap(), a);
/// assert_eq!(ids.allocate().unwrap(), b + 1);
/// ```
#[derive(Clone, Debug)]
pub struct IdAllocator<T: RecyclableId> {
    /// Next never-used index.
    high_water: u64,
    /// Number of distinct ids this allocator may issue.
    limit: u64,
    /// Released ids awaiting reuse.
    recycled: BoundedQueue<T>,
}

impl<T: RecyclableId> IdAllocator<T> {
    /// Creates an allocator covering the whole id type.
    ///
    /// # Arguments
    ///
    /// * `recycle_capacity` - Maximum number of released ids queued at once
    #[must_use]
    pub fn new(recycle_capacity: usize) -> Self {
        Self::with_limit(recycle_capacity, T::ID_SPACE)
    }

    /// Creates an allocator that issues at most `limit` distinct ids.
    ///
    /// # Panics
    ///
    /// Panics if `limit` is zero or `recycle_capacity` is zero.
    #[must_use]
    pub fn with_limit(recycle_capacity: usize, limit: u64) -> Self {
        assert!(limit > 0, "Id limit must be greater than zero");
        Self {
            high_water: 0,
            limit: limit.min(T::ID_SPACE),
            recycled: BoundedQueue::new(recycle_capacity),
        }
    }

    /// Issues an id, preferring the oldest released one.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::IdSpaceExhausted`] when every id below the limit is
    /// live and nothing is queued for reuse.
    pub fn allocate(&mut self) -> EcsResult<T> {
        if let Some(id) = self.recycled.pop() {
            return Ok(id);
        }
        if self.high_water >= self.limit {
            return Err(EcsError::IdSpaceExhausted { limit: self.limit });
        }
        let id = T::from_index(self.high_water);
        self.high_water += 1;
        Ok(id)
    }

    /// Returns an id for reuse.
    ///
    /// # Panics
    ///
    /// Panics if the id was never issued or the recycle queue is full. Both
    /// mean the caller's bookkeeping is broken.
    pub fn release(&mut self, id: T) {
        assert!(
            id.index() < self.high_water,
            "released id {id:?} was never allocated"
        );
        debug_assert!(!self.recycled.contains(&id), "id {id:?} released twice");
        if self.recycled.push(id).is_err() {
            panic!(
                "recycle queue overflow: more than {} ids awaiting reuse",
                self.recycled.capacity()
            );
        }
    }

    /// Number of ids ever issued fresh.
    #[inline]
    #[must_use]
    pub const fn high_water_mark(&self) -> u64 {
        self.high_water
    }

    /// Number of released ids waiting for reuse.
    #[inline]
    #[must_use]
    pub fn recycled_len(&self) -> usize {
        self.recycled.len()
    }

    /// Number of ids currently held by callers.
    #[inline]
    #[must_use]
    pub fn live_count(&self) -> u64 {
        self.high_water - self.recycled.len() as u64
    }

    /// Distinct ids this allocator may issue.
    #[inline]
    #[must_use]
    pub const fn limit(&self) -> u64 {
        self.limit
    }

    /// Forgets every issued id. Used at world-reset boundaries.
    pub fn reset(&mut self) {
        self.high_water = 0;
        self.recycled.clear();
    }
}
