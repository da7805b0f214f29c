//! # Interest Registry
//!
//! An interest is a group of one or more conditions over existence masks.
//! Every condition owns a membership set holding exactly the live entities
//! whose mask currently satisfies it.
//!
//! ## Incremental maintenance
//!
//! Sets are never recomputed. The coordinator reports every mask change as an
//! `(old, new)` pair and the registry inserts or removes the entity in each set
//! whose match status flipped:
//!
//! ```text
//! condition: required = {A, B}, excluded = {C}
//!
//! mask {}      -> {A}       : false -> false   (no change)
//! mask {A}     -> {A, B}    : false -> true    (insert)
//! mask {A, B}  -> {A, B, C} : true  -> false   (remove)
//! ```
//!
//! Each mutation costs O(registered conditions). Conditions are registered
//! once per world at startup, so this stays small.

use std::ops::Range;

use super::entity::{ComponentMask, Entity};

/// A required / excluded pair of component masks.
///
/// An entity matches when it holds every required component and none of the
/// excluded ones. A condition with both masks empty matches every entity,
/// including system-entities.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct InterestCondition {
    /// Components an entity must hold.
    pub required: ComponentMask,
    /// Components an entity must not hold.
    pub excluded: ComponentMask,
}

impl InterestCondition {
    /// Creates a condition from both masks.
    #[inline]
    #[must_use]
    pub const fn new(required: ComponentMask, excluded: ComponentMask) -> Self {
        Self { required, excluded }
    }

    /// A condition requiring `required` and excluding nothing.
    #[inline]
    #[must_use]
    pub const fn requiring(required: ComponentMask) -> Self {
        Self::new(required, ComponentMask::EMPTY)
    }

    /// The wildcard condition. Matches every live entity.
    #[inline]
    #[must_use]
    pub const fn matching_all() -> Self {
        Self::new(ComponentMask::EMPTY, ComponentMask::EMPTY)
    }

    /// Copy that additionally requires `mask`.
    #[inline]
    #[must_use]
    pub fn require(self, mask: ComponentMask) -> Self {
        Self::new(self.required | mask, self.excluded)
    }

    /// Copy that additionally excludes `mask`.
    #[inline]
    #[must_use]
    pub fn exclude(self, mask: ComponentMask) -> Self {
        Self::new(self.required, self.excluded | mask)
    }

    /// Returns `true` if an entity with `mask` satisfies this condition.
    #[inline]
    #[must_use]
    pub const fn matches(&self, mask: ComponentMask) -> bool {
        mask.contains_all(self.required) && !mask.intersects(self.excluded)
    }
}

/// Identifier of a registered interest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterestId(u32);

impl InterestId {
    /// Raw index of the interest in registration order.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Unordered set of entities with O(1) insert, remove and lookup.
///
/// A sparse set: `dense` holds the members contiguously and `sparse` maps an
/// entity index to its position in `dense`. Removal swaps the last member
/// into the hole, so iteration order depends only on the sequence of
/// operations applied to the set, never on hashing.
#[derive(Clone, Debug, Default)]
pub struct EntitySet {
    dense: Vec<Entity>,
    sparse: Vec<Option<u32>>,
}

impl EntitySet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            dense: Vec::new(),
            sparse: Vec::new(),
        }
    }

    /// Number of members.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.dense.len()
    }

    /// Returns `true` if the set has no members.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// Returns `true` if `entity` is a member.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        matches!(self.sparse.get(entity.index()), Some(Some(_)))
    }

    /// Adds `entity`. Returns `false` if it was already a member.
    pub fn insert(&mut self, entity: Entity) -> bool {
        if self.contains(entity) {
            return false;
        }
        let index = entity.index();
        if self.sparse.len() <= index {
            self.sparse.resize(index + 1, None);
        }
        #[allow(clippy::cast_possible_truncation)]
        let position = self.dense.len() as u32;
        self.sparse[index] = Some(position);
        self.dense.push(entity);
        true
    }

    /// Removes `entity`. Returns `false` if it was not a member.
    pub fn remove(&mut self, entity: Entity) -> bool {
        let Some(position) = self.sparse.get_mut(entity.index()).and_then(Option::take) else {
            return false;
        };
        let position = position as usize;
        self.dense.swap_remove(position);
        if let Some(&moved) = self.dense.get(position) {
            #[allow(clippy::cast_possible_truncation)]
            let slot = position as u32;
            self.sparse[moved.index()] = Some(slot);
        }
        true
    }

    /// Members as a slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Entity] {
        &self.dense
    }

    /// Iterates over the members.
    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.dense.iter()
    }

    /// Copies the members into a new vector.
    #[must_use]
    pub fn to_vec(&self) -> Vec<Entity> {
        self.dense.clone()
    }

    /// Removes every member.
    pub fn clear(&mut self) {
        for entity in self.dense.drain(..) {
            self.sparse[entity.index()] = None;
        }
    }
}

impl<'a> IntoIterator for &'a EntitySet {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Registered conditions and their live membership sets.
///
/// # Invariants
///
/// - `conditions.len() == members.len()`.
/// - `groups[id]` is a contiguous range into both vectors.
/// - `members[i]` equals the set of live entities matching `conditions[i]`
///   whenever no coordinator mutation is in progress.
#[derive(Debug, Default)]
pub struct InterestRegistry {
    conditions: Vec<InterestCondition>,
    members: Vec<EntitySet>,
    groups: Vec<Range<usize>>,
}

impl InterestRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure match predicate.
    #[inline]
    #[must_use]
    pub const fn is_interesting(mask: ComponentMask, condition: &InterestCondition) -> bool {
        condition.matches(mask)
    }

    /// Registers a group of conditions under one id.
    ///
    /// `live` yields every currently live entity with its mask; the new sets
    /// are seeded from it so they are consistent from the start.
    ///
    /// # Panics
    ///
    /// Panics if `conditions` is empty.
    pub fn register<I>(&mut self, conditions: &[InterestCondition], live: I) -> InterestId
    where
        I: IntoIterator<Item = (Entity, ComponentMask)>,
    {
        assert!(!conditions.is_empty(), "an interest needs at least one condition");

        let start = self.conditions.len();
        self.conditions.extend_from_slice(conditions);
        self.members
            .extend(std::iter::repeat_with(EntitySet::new).take(conditions.len()));

        for (entity, mask) in live {
            for (condition, set) in conditions.iter().zip(&mut self.members[start..]) {
                if condition.matches(mask) {
                    set.insert(entity);
                }
            }
        }

        #[allow(clippy::cast_possible_truncation)]
        let id = InterestId(self.groups.len() as u32);
        self.groups.push(start..self.conditions.len());
        id
    }

    fn group(&self, id: InterestId) -> Range<usize> {
        match self.groups.get(id.index()) {
            Some(range) => range.clone(),
            None => panic!("unknown interest {id:?}"),
        }
    }

    /// Membership sets of an interest, one per condition, in registration order.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this registry.
    #[must_use]
    pub fn interests_of(&self, id: InterestId) -> &[EntitySet] {
        &self.members[self.group(id)]
    }

    /// Conditions of an interest, in registration order.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this registry.
    #[must_use]
    pub fn conditions_of(&self, id: InterestId) -> &[InterestCondition] {
        &self.conditions[self.group(id)]
    }

    /// Total number of registered conditions across all interests.
    #[inline]
    #[must_use]
    pub fn condition_count(&self) -> usize {
        self.conditions.len()
    }

    /// Number of registered interests.
    #[inline]
    #[must_use]
    pub fn interest_count(&self) -> usize {
        self.groups.len()
    }

    /// Applies a mask change of `entity` to every membership set.
    ///
    /// Inserts on an unmatched -> matched flip and removes on the reverse.
    pub fn on_mask_changed(&mut self, entity: Entity, new_mask: ComponentMask, old_mask: ComponentMask) {
        for (condition, set) in self.conditions.iter().zip(&mut self.members) {
            match (condition.matches(old_mask), condition.matches(new_mask)) {
                (false, true) => {
                    set.insert(entity);
                }
                (true, false) => {
                    set.remove(entity);
                }
                _ => {}
            }
        }
    }

    /// Reports that a component was attached to `entity`.
    ///
    /// Attaching an excluded component flips a condition from matched to
    /// unmatched, so both directions are applied.
    #[inline]
    pub fn on_component_added(&mut self, entity: Entity, new_mask: ComponentMask, old_mask: ComponentMask) {
        self.on_mask_changed(entity, new_mask, old_mask);
    }

    /// Reports that a component was detached from `entity`.
    #[inline]
    pub fn on_component_removed(&mut self, entity: Entity, new_mask: ComponentMask, old_mask: ComponentMask) {
        self.on_mask_changed(entity, new_mask, old_mask);
    }

    /// Inserts a freshly created entity into every set matching the empty mask.
    pub fn on_entity_created(&mut self, entity: Entity) {
        for (condition, set) in self.conditions.iter().zip(&mut self.members) {
            if condition.matches(ComponentMask::EMPTY) {
                set.insert(entity);
            }
        }
    }

    /// Removes `entity` from every set.
    pub fn on_entity_destroyed(&mut self, entity: Entity) {
        for set in &mut self.members {
            set.remove(entity);
        }
    }
}
