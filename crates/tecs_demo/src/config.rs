//! # Game Configuration
//!
//! All tuning constants of the survival game. Defaults match the
//! handheld release: a 256x192 screen at 60 frames per second, ten hits of
//! player health and a magic meter that refills at 0.3 per frame.
//!
//! ```toml
//! seed = 42
//! frames = 7200
//!
//! [world]
//! recycle_capacity = 256
//! ```

use std::path::Path;

use serde::Deserialize;
use tecs_core::WorldConfig;

use crate::error::{GameError, GameResult};

/// Number of hardware sprite slots on the handheld target.
pub const DEFAULT_SPRITE_SLOTS: u8 = 128;

/// Upper bound on live entities that never hold a sprite: the resource
/// entity, the player's target and every system-entity.
pub const SPRITELESS_ENTITIES: usize = 16;

/// Tuning for one game session.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    /// Seed for zombie spawning.
    pub seed: u64,
    /// Frames the driver simulates before stopping.
    pub frames: u64,
    /// Simulation rate, used to report time alive.
    pub fps: u32,

    /// Screen width in pixels.
    pub screen_width: f32,
    /// Screen height in pixels.
    pub screen_height: f32,
    /// How far off screen zombies appear.
    pub offscreen_margin: f32,

    /// Hits the player can take.
    pub player_health: i32,
    /// Player movement per frame towards its target.
    pub player_speed: f32,

    /// Zombie movement per frame.
    pub zombie_speed: f32,
    /// Per-frame spawn probability at level 1.
    pub initial_zombie_rate: f64,
    /// Added to the spawn probability at each new level.
    pub zombie_rate_increase: f64,
    /// Frames per zombie level.
    pub zombie_level_period: u32,

    /// Magic meter capacity.
    pub max_magic: f32,
    /// Magic regained per frame.
    pub magic_build_rate: f32,
    /// Cost of a fireball.
    pub fireball_cost: f32,
    /// Cost of a teleport.
    pub teleport_cost: f32,
    /// Cost of an explosion.
    pub explosion_cost: f32,
    /// Fireball speed in pixels per frame.
    pub fireball_speed: f32,
    /// Frames before a fireball burns out.
    pub fireball_lifetime: u64,
    /// Frames an explosion lingers.
    pub explosion_lifetime: u64,

    /// Sprite slots available for drawing.
    pub sprite_slots: u8,

    /// Sizing of the underlying ECS world.
    pub world: WorldConfig,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: 0x5eed,
            frames: 3_600,
            fps: 60,
            screen_width: 256.0,
            screen_height: 192.0,
            offscreen_margin: 5.0,
            player_health: 10,
            player_speed: 5.0,
            zombie_speed: 0.25,
            initial_zombie_rate: 0.015,
            zombie_rate_increase: 0.002,
            zombie_level_period: 20 * 60,
            max_magic: 100.0,
            magic_build_rate: 0.3,
            fireball_cost: 25.0,
            teleport_cost: 0.0,
            explosion_cost: 50.0,
            fireball_speed: 1.0,
            fireball_lifetime: 4 * 60,
            explosion_lifetime: 60,
            sprite_slots: DEFAULT_SPRITE_SLOTS,
            world: WorldConfig::default(),
        }
    }
}

impl GameConfig {
    /// Parses and validates a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::ConfigParse`] for malformed documents and
    /// [`GameError::InvalidConfig`] or [`GameError::Ecs`] for bad values.
    pub fn from_toml_str(text: &str) -> GameResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Io`] if the file cannot be read, otherwise as
    /// [`Self::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> GameResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| GameError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] naming the first offending field,
    /// or [`GameError::Ecs`] if the nested world configuration is invalid.
    pub fn validate(&self) -> GameResult<()> {
        let invalid = |msg: &str| Err(GameError::InvalidConfig(msg.to_owned()));

        if self.fps == 0 {
            return invalid("fps must be > 0");
        }
        if self.screen_width < 1.0 || self.screen_height < 1.0 {
            return invalid("screen dimensions must be at least one pixel");
        }
        if self.player_health <= 0 {
            return invalid("player_health must be > 0");
        }
        if !(0.0..=1.0).contains(&self.initial_zombie_rate) {
            return invalid("initial_zombie_rate must be within 0..=1");
        }
        if self.zombie_level_period == 0 {
            return invalid("zombie_level_period must be > 0");
        }
        if self.max_magic < 0.0 || self.magic_build_rate < 0.0 {
            return invalid("magic values must not be negative");
        }
        if self.sprite_slots == 0 {
            return invalid("sprite_slots must be > 0");
        }
        if let Some(max) = self.world.max_entities {
            if usize::try_from(max).is_ok_and(|max| max < self.entity_budget()) {
                return invalid(&format!(
                    "world.max_entities must be at least sprite_slots + {SPRITELESS_ENTITIES}"
                ));
            }
        }
        self.world.validate()?;
        Ok(())
    }

    /// Most entities a session can have alive at once.
    #[must_use]
    pub fn entity_budget(&self) -> usize {
        usize::from(self.sprite_slots) + SPRITELESS_ENTITIES
    }

    /// The world configuration with queues large enough for this session.
    ///
    /// Only sprite holders die, so one frame can queue at most `sprite_slots`
    /// destructions, and no more than [`Self::entity_budget`] ids ever wait
    /// for reuse.
    #[must_use]
    pub fn sized_world(&self) -> WorldConfig {
        let mut world = self.world.clone();
        world.destroy_queue_capacity = world.destroy_queue_capacity.max(usize::from(self.sprite_slots));
        world.recycle_capacity = world.recycle_capacity.max(self.entity_budget());
        world
    }
}
