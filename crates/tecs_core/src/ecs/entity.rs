//! # Entity Management
//!
//! Entities are plain integer handles. Everything an entity "is" lives in
//! component stores indexed by that integer; the only per-entity state kept
//! here is the existence mask and a liveness flag.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

use crate::memory::RecyclableId;

/// Identifier of a registered component type (0-63).
pub type ComponentId = u8;

/// Maximum number of component types per world.
///
/// This keeps a [`ComponentMask`] inside a single `u64`.
pub const MAX_COMPONENTS: usize = 64;

/// Handle to an entity.
///
/// Unique among live entities and reused after destruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Entity(u32);

impl Entity {
    /// Wraps a raw id.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw id.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the id as an array index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

impl RecyclableId for Entity {
    const ID_SPACE: u64 = u32::MAX as u64 + 1;

    #[inline]
    #[allow(clippy::cast_possible_truncation)]
    fn from_index(index: u64) -> Self {
        Self(index as u32)
    }

    #[inline]
    fn index(self) -> u64 {
        u64::from(self.0)
    }
}

/// Bitset of component ids.
///
/// Used both as an entity's existence mask and as the required / excluded
/// halves of an interest condition.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct ComponentMask(u64);

impl ComponentMask {
    /// The empty mask.
    pub const EMPTY: Self = Self(0);

    /// Builds a mask from raw bits.
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Mask with the single bit for `id` set.
    #[inline]
    #[must_use]
    pub const fn single(id: ComponentId) -> Self {
        Self(1 << id)
    }

    /// Builds a mask from a list of component ids.
    #[must_use]
    pub fn of(ids: &[ComponentId]) -> Self {
        ids.iter().fold(Self::EMPTY, |mask, &id| mask.with(id))
    }

    /// Raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns `true` if bit `id` is set.
    #[inline]
    #[must_use]
    pub const fn contains(self, id: ComponentId) -> bool {
        self.0 & (1 << id) != 0
    }

    /// Returns `true` if every bit of `other` is set in `self`.
    #[inline]
    #[must_use]
    pub const fn contains_all(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if `self` and `other` share a bit.
    #[inline]
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns `true` if no bit is set.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of set bits.
    #[inline]
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Copy with bit `id` set.
    #[inline]
    #[must_use]
    pub const fn with(self, id: ComponentId) -> Self {
        Self(self.0 | (1 << id))
    }

    /// Copy with bit `id` cleared.
    #[inline]
    #[must_use]
    pub const fn without(self, id: ComponentId) -> Self {
        Self(self.0 & !(1 << id))
    }

    /// Sets bit `id`.
    #[inline]
    pub fn insert(&mut self, id: ComponentId) {
        self.0 |= 1 << id;
    }

    /// Clears bit `id`.
    #[inline]
    pub fn remove(&mut self, id: ComponentId) {
        self.0 &= !(1 << id);
    }

    /// Iterates over the set component ids in ascending order.
    pub fn iter(self) -> impl Iterator<Item = ComponentId> {
        let mut bits = self.0;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            #[allow(clippy::cast_possible_truncation)]
            let id = bits.trailing_zeros() as ComponentId;
            bits &= bits - 1;
            Some(id)
        })
    }
}

impl fmt::Debug for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl BitOr for ComponentMask {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for ComponentMask {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ComponentMask {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl Not for ComponentMask {
    type Output = Self;

    #[inline]
    fn not(self) -> Self {
        Self(!self.0)
    }
}

/// Per-slot entity bookkeeping.
///
/// Tracks which components are attached via the existence mask.
#[derive(Clone, Copy, Debug, Default)]
pub struct EntityRecord {
    /// Bitmask of attached components.
    pub mask: ComponentMask,
    /// Whether this slot currently holds a live entity.
    pub alive: bool,
}

impl EntityRecord {
    /// A freshly created entity with no components.
    #[inline]
    #[must_use]
    pub const fn spawned() -> Self {
        Self {
            mask: ComponentMask::EMPTY,
            alive: true,
        }
    }

    /// A dead or never-used slot.
    #[inline]
    #[must_use]
    pub const fn dead() -> Self {
        Self {
            mask: ComponentMask::EMPTY,
            alive: false,
        }
    }
}
