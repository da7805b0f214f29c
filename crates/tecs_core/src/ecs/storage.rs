//! # Component Storage
//!
//! Dense, growable storage for a single component type.
//!
//! The storage uses a dense array strategy:
//! - Slot `i` belongs to the entity with id `i`
//! - Access is O(1) via entity index
//! - The array grows geometrically on demand, never shrinks
//!
//! A slot is either valid (the entity holds the component) or empty. The
//! coordinator keeps slot validity in lockstep with the entity's existence
//! mask, so an empty slot is never observed through the public API.

use std::any::{type_name, Any};

use super::component::Component;

/// Storage for a single component type.
///
/// # Type Parameters
///
/// * `C` - The component type to store
///
/// # Example
///
/// ```rust
/// use tecs_core::ComponentStore;
///
/// let mut storage: ComponentStore<f32> = ComponentStore::new();
/// storage.insert(10, 1.5);
/// assert!(storage.contains(10));
/// assert!(storage.len() >= 11);
/// ```
#[derive(Debug)]
pub struct ComponentStore<C: Component> {
    data: Vec<Option<C>>,
}

impl<C: Component> Default for ComponentStore<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Component> ComponentStore<C> {
    /// Creates empty storage.
    #[must_use]
    pub const fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Number of slots (highest stored index + 1 at least).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if no slot was ever created.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Grows the backing array so that `index` is addressable.
    #[inline]
    fn ensure_slot(&mut self, index: usize) {
        if self.data.len() <= index {
            self.data.resize_with(index + 1, || None);
        }
    }

    /// Writes a component into slot `index`, growing storage if needed.
    ///
    /// Returns a mutable reference to the stored value.
    pub fn insert(&mut self, index: usize, component: C) -> &mut C {
        self.ensure_slot(index);
        self.data[index].insert(component)
    }

    /// Returns `true` if slot `index` holds a value.
    #[inline]
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        matches!(self.data.get(index), Some(Some(_)))
    }

    /// Gets the component in slot `index`.
    #[inline]
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&C> {
        self.data.get(index)?.as_ref()
    }

    /// Gets the component in slot `index` mutably.
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Option<&mut C> {
        self.data.get_mut(index)?.as_mut()
    }

    /// Takes the component out of slot `index`, leaving it empty.
    #[inline]
    pub fn take(&mut self, index: usize) -> Option<C> {
        self.data.get_mut(index)?.take()
    }

    /// Iterates over valid slots with their indices.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &C)> {
        self.data
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|c| (index, c)))
    }
}

/// Type-erased view of a [`ComponentStore`].
///
/// Lets the coordinator invalidate a destroyed entity's slots across every
/// store without knowing the concrete types.
pub trait ErasedStore: Any {
    /// Empties slot `index` if it exists.
    fn invalidate(&mut self, index: usize);

    /// Returns `true` if slot `index` holds a value.
    fn contains(&self, index: usize) -> bool;

    /// Rust name of the stored type.
    fn component_name(&self) -> &'static str;

    /// Upcast for downcasting to the concrete store.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete store.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: Component> ErasedStore for ComponentStore<C> {
    fn invalidate(&mut self, index: usize) {
        self.take(index);
    }

    fn contains(&self, index: usize) -> bool {
        ComponentStore::contains(self, index)
    }

    fn component_name(&self) -> &'static str {
        type_name::<C>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[test]
    fn test_storage_grows_on_insert() {
        let mut storage: ComponentStore<Position> = ComponentStore::new();
        assert!(storage.is_empty());

        storage.insert(50, Position { x: 1.0, y: 2.0 });
        assert!(storage.len() >= 51);
        assert!(storage.contains(50));
        assert!(!storage.contains(49));
        assert!(!storage.contains(1000));
    }

    #[test]
    fn test_storage_get_set() {
        let mut storage: ComponentStore<Position> = ComponentStore::new();
        storage.insert(3, Position { x: 1.0, y: 2.0 });
        storage.get_mut(3).unwrap().x = 5.0;
        assert_eq!(storage.get(3).map(|p| (p.x, p.y)), Some((5.0, 2.0)));
        assert_eq!(storage.iter().map(|(i, _)| i).collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn test_erased_invalidate() {
        let mut storage: ComponentStore<u32> = ComponentStore::new();
        storage.insert(2, 7);
        storage.insert(4, 9);

        let erased: &mut dyn ErasedStore = &mut storage;
        erased.invalidate(2);
        erased.invalidate(100);
        assert!(!erased.contains(2));
        assert!(erased.contains(4));
        assert_eq!(erased.component_name(), "u32");

        let concrete = erased.as_any().downcast_ref::<ComponentStore<u32>>().unwrap();
        assert_eq!(concrete.get(4), Some(&9));
    }
}
