//! # Bounded Queue
//!
//! Fixed-capacity FIFO used for recycled ids and deferred destructions.

use std::collections::VecDeque;

/// A first-in first-out queue that never grows past its capacity.
///
/// All memory is reserved at creation. Pushing into a full queue hands the
/// value back instead of reallocating; callers decide whether that is fatal.
///
/// # Example
///
/// ```rust
/// use tecs_core::BoundedQueue;
///
/// let mut queue = BoundedQueue::new(2);
/// queue.push(1).unwrap();
/// queue.push(2).unwrap();
/// assert_eq!(queue.push(3), Err(3));
/// assert_eq!(queue.pop(), Some(1));
/// ```
#[derive(Clone, Debug)]
pub struct BoundedQueue<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedQueue<T> {
    /// Creates an empty queue holding at most `capacity` items.
    ///
    /// # Panics
    ///
    /// Panics if capacity is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than zero");
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Maximum number of items the queue can hold.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of queued items.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if nothing is queued.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns `true` if another push would be rejected.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    /// Appends a value at the back.
    ///
    /// # Errors
    ///
    /// Returns the value unchanged if the queue is full.
    pub fn push(&mut self, value: T) -> Result<(), T> {
        if self.is_full() {
            return Err(value);
        }
        self.items.push_back(value);
        Ok(())
    }

    /// Removes and returns the oldest value.
    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Peeks at the oldest value.
    #[inline]
    #[must_use]
    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }

    /// Iterates from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Drops every queued value, keeping the reserved memory.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: PartialEq> BoundedQueue<T> {
    /// Returns `true` if `value` is currently queued.
    ///
    /// Linear in the queue length.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.items.contains(value)
    }
}
