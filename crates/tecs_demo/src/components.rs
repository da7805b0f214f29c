//! # Game Components
//!
//! Plain data attached to game entities, plus the category tags that sort
//! system-entities into passes.

use std::ops::{Add, AddAssign, Mul, Sub};

use tecs_core::{Coordinator, Entity, IdAllocator};

// ============================================================================
// MATH
// ============================================================================

/// A 2D vector in screen pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec2 {
    /// Horizontal component, growing to the right.
    pub x: f32,
    /// Vertical component, growing downwards.
    pub y: f32,
}

impl Vec2 {
    /// The zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Creates a vector.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Squared length.
    #[must_use]
    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y
    }

    /// Length.
    #[must_use]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Unit vector in the same direction, or zero for the zero vector.
    #[must_use]
    pub fn normalized(self) -> Self {
        let length = self.length();
        if length <= f32::EPSILON {
            Self::ZERO
        } else {
            self * (1.0 / length)
        }
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// Squared radius of a circle with the given diameter.
#[must_use]
pub fn radius_squared_from_diameter(diameter: f32) -> f32 {
    let radius = diameter / 2.0;
    radius * radius
}

/// Returns `true` if two circles overlap.
#[must_use]
pub fn circle_circle(a: Vec2, a_radius_squared: f32, b: Vec2, b_radius_squared: f32) -> bool {
    (a - b).length_squared() < a_radius_squared + b_radius_squared
}

// ============================================================================
// GAMEPLAY COMPONENTS
// ============================================================================

/// Where an entity is.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Position(pub Vec2);

/// Movement applied every physics pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Velocity(pub Vec2);

/// Steers an entity towards another one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Following {
    /// Entity being followed.
    pub target: Entity,
    /// Pixels moved per frame.
    pub speed: f32,
}

/// Remaining hits before death.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Health(pub i32);

/// Collision layer bits.
pub mod layers {
    /// The player.
    pub const PLAYER: u8 = 1 << 0;
    /// Zombies.
    pub const ZOMBIE: u8 = 1 << 1;
    /// Fireballs and explosions.
    pub const PLAYER_ATTACK: u8 = 1 << 2;
}

/// Called on the entity that was hit, with the entity that hit it.
pub type HitFn = fn(&mut Coordinator, Entity, Entity);

/// Circular collider.
#[derive(Clone, Copy, Debug)]
pub struct Collision {
    /// Layer this entity lives on.
    pub layer: u8,
    /// Layers that hurt this entity.
    pub mask: u8,
    /// Squared collision radius.
    pub radius_squared: f32,
    /// Reaction when something in `mask` touches this entity.
    pub on_hit: HitFn,
}

/// Marks an entity for removal during the cleanup pass.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeathMark;

/// A drawable entity's sprite slot and half extents.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpriteInfo {
    /// Hardware sprite slot.
    pub slot: u8,
    /// Half the sprite width.
    pub half_width: f32,
    /// Half the sprite height.
    pub half_height: f32,
}

/// Called once when the frame counter reaches the due frame.
pub type TimerFn = fn(&mut Coordinator, Entity);

/// A one-shot timer.
#[derive(Clone, Copy, Debug)]
pub struct TimerCallback {
    /// Frame at which the callback fires.
    pub due_frame: u64,
    /// What to do.
    pub callback: TimerFn,
}

/// Zombie marker.
#[derive(Clone, Copy, Debug, Default)]
pub struct Zombie;

/// Player marker.
#[derive(Clone, Copy, Debug, Default)]
pub struct Player;

// ============================================================================
// RESOURCES
// ============================================================================
//
// Shared state lives on a single resource entity so systems can reach it
// through the coordinator.

/// Current frame number.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameClock(pub u64);

/// Sprite slots not currently drawn.
#[derive(Debug)]
pub struct SpritePool(pub IdAllocator<u8>);

/// One sprite placement for the current frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawCommand {
    /// Sprite slot.
    pub slot: u8,
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
}

/// Every sprite placement produced by the last render pass.
#[derive(Clone, Debug, Default)]
pub struct RenderList(pub Vec<DrawCommand>);

// ============================================================================
// SYSTEM CATEGORIES
// ============================================================================

/// Runs before input, draws last frame's state.
#[derive(Clone, Copy, Debug, Default)]
pub struct RenderTag;

/// Movement, steering and collision.
#[derive(Clone, Copy, Debug, Default)]
pub struct PhysicsTag;

/// Timers and health bookkeeping.
#[derive(Clone, Copy, Debug, Default)]
pub struct AdminTag;

/// Releases resources of marked entities and queues their destruction.
#[derive(Clone, Copy, Debug, Default)]
pub struct CleanupTag;

/// Registers every game component with `world`.
pub fn register_all(world: &mut Coordinator) {
    world.register_component::<Position>();
    world.register_component::<Velocity>();
    world.register_component::<Following>();
    world.register_component::<Health>();
    world.register_component::<Collision>();
    world.register_component::<DeathMark>();
    world.register_component::<SpriteInfo>();
    world.register_component::<TimerCallback>();
    world.register_component::<Zombie>();
    world.register_component::<Player>();
    world.register_component::<FrameClock>();
    world.register_component::<SpritePool>();
    world.register_component::<RenderList>();
    world.register_component::<RenderTag>();
    world.register_component::<PhysicsTag>();
    world.register_component::<AdminTag>();
    world.register_component::<CleanupTag>();
}
