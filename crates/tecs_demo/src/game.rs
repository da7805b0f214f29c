//! # Game Loop
//!
//! One [`Game`] owns a world, its system categories and the session state
//! that lives outside the ECS (magic meter, zombie level, spawn RNG).
//!
//! ```text
//! Frame N:
//!   1. render     draw last frame's positions into the render list
//!   2. physics    steer, move, collide
//!   3. input      cast the requested spell if magic allows
//!   4. magic      refill the meter
//!   5. check      player out of health -> game over
//!   6. spawn      level up on schedule, maybe spawn a zombie at an edge
//!   7. admin      fire due timers, mark the dead
//!   8. cleanup    reclaim sprite slots, queue marked entities
//!   9. destroy    drain the destruction queue
//! ```

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tecs_core::{ComponentMask, Coordinator, EcsError, Entity, IdAllocator, InterestCondition, InterestId, System};
use tracing::{debug, info};

use crate::components::{
    layers, radius_squared_from_diameter, AdminTag, CleanupTag, Collision, DeathMark,
    DrawCommand, Following, FrameClock, Health, PhysicsTag, Player, Position, RenderList,
    RenderTag, SpriteInfo, SpritePool, TimerCallback, Vec2, Velocity, Zombie,
};
use crate::config::GameConfig;
use crate::error::GameResult;
use crate::systems;

/// Sprite sizes in pixels.
const PLAYER_SPRITE: f32 = 16.0;
const ZOMBIE_SPRITE: f32 = 16.0;
const FIREBALL_SPRITE: f32 = 8.0;
const EXPLOSION_SPRITE: f32 = 64.0;

/// Health of spell entities; each zombie contact costs one.
const FIREBALL_HEALTH: i32 = 2;
const EXPLOSION_HEALTH: i32 = 20;

/// A spell the player can cast at a touched point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Spell {
    /// Launches a projectile from the player towards the point.
    #[default]
    Fireball,
    /// Moves the player's target to the point.
    Teleport,
    /// Detonates around the player's target.
    Explosion,
}

impl Spell {
    /// Display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fireball => "fireball",
            Self::Teleport => "teleport",
            Self::Explosion => "explosion",
        }
    }
}

/// Player input for one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    /// Touched screen point, if any.
    pub touch: Option<Vec2>,
    /// Spell selected by held buttons.
    pub spell: Spell,
}

/// Summary of the game state after a frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    /// Frames simulated so far.
    pub frame: u64,
    /// Remaining player health.
    pub player_health: i32,
    /// Current magic.
    pub magic: f32,
    /// Current zombie level, starting at 1.
    pub zombie_level: u32,
    /// Zombies currently alive.
    pub zombies_alive: usize,
    /// Zombies spawned so far.
    pub zombies_spawned: u64,
    /// Sprites placed by the last render pass.
    pub sprites_drawn: usize,
    /// Spell cast this frame, if any.
    pub cast: Option<Spell>,
    /// Whether the player has died.
    pub game_over: bool,
}

/// The four system categories of the frame loop.
#[derive(Clone, Copy, Debug)]
struct Categories {
    render: InterestId,
    physics: InterestId,
    admin: InterestId,
    cleanup: InterestId,
}

/// A running game session.
pub struct Game {
    config: GameConfig,
    world: Coordinator,
    categories: Categories,
    /// Entity holding the frame clock, sprite pool and render list.
    resources: Entity,
    player: Entity,
    /// Where the player is walking to. Moved by touch and teleport.
    player_target: Entity,
    zombies: InterestId,
    rng: ChaCha8Rng,
    frame: u64,
    magic: f32,
    zombie_rate: f64,
    zombie_clock: u32,
    zombie_level: u32,
    zombies_spawned: u64,
    last_cast: Option<Spell>,
    game_over: bool,
}

impl Game {
    /// Sets up the world, systems, player and resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the world runs out
    /// of entity ids during setup.
    pub fn new(config: GameConfig) -> GameResult<Self> {
        config.validate()?;
        let mut world = Coordinator::with_config(config.sized_world())?;
        crate::components::register_all(&mut world);

        let resources = world.new_entity()?;
        world.add_components(
            resources,
            (
                FrameClock(0),
                SpritePool(IdAllocator::with_limit(
                    usize::from(config.sprite_slots),
                    u64::from(config.sprite_slots),
                )),
                RenderList::default(),
            ),
        );

        let categories = Self::spawn_systems(&mut world, resources)?;
        let zombies = world.register_interests(&[InterestCondition::requiring(world.mask_of::<(Zombie,)>())]);

        let start = Vec2::new(config.screen_width / 2.0, config.screen_height / 2.0);
        let player_target = world.new_entity()?;
        world.add_component(player_target, Position(start));
        let player = Self::spawn_player(&mut world, &config, resources, player_target, start)?;
        info!(seed = config.seed, %player, "game started");

        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            magic: config.max_magic,
            zombie_rate: config.initial_zombie_rate,
            config,
            world,
            categories,
            resources,
            player,
            player_target,
            zombies,
            frame: 0,
            zombie_clock: 0,
            zombie_level: 1,
            zombies_spawned: 0,
            last_cast: None,
            game_over: false,
        })
    }

    fn spawn_systems(world: &mut Coordinator, resources: Entity) -> GameResult<Categories> {
        let no_tags = ComponentMask::EMPTY;
        let categories = Categories {
            render: world.make_system_interest(world.mask_of::<(RenderTag,)>(), no_tags),
            physics: world.make_system_interest(world.mask_of::<(PhysicsTag,)>(), no_tags),
            admin: world.make_system_interest(world.mask_of::<(AdminTag,)>(), no_tags),
            cleanup: world.make_system_interest(world.mask_of::<(CleanupTag,)>(), no_tags),
        };

        let interest = |world: &mut Coordinator, required: ComponentMask, excluded: ComponentMask| {
            world.register_interests(&[InterestCondition::new(required, excluded)])
        };

        let mask = world.mask_of::<(Position, SpriteInfo)>();
        let drawable = interest(world, mask, no_tags);
        world.spawn_system(System::single_set(drawable, systems::draw_sprites(resources)), (RenderTag,))?;

        let mask = world.mask_of::<(Position, Velocity)>();
        let moving = interest(world, mask, no_tags);
        world.spawn_system(System::single_set(moving, systems::apply_velocity), (PhysicsTag,))?;

        let mask = world.mask_of::<(Following, Position, Velocity)>();
        let following = interest(world, mask, no_tags);
        world.spawn_system(System::single_set(following, systems::following_ai), (PhysicsTag,))?;

        let mask = world.mask_of::<(Position, Collision)>();
        let colliding = interest(world, mask, no_tags);
        world.spawn_system(
            System::single_set(colliding, systems::circular_collision_detection),
            (PhysicsTag,),
        )?;

        let mask = world.mask_of::<(TimerCallback,)>();
        let timed = interest(world, mask, no_tags);
        world.spawn_system(System::single_set(timed, systems::run_timers(resources)), (AdminTag,))?;

        let (mask, dead) = (world.mask_of::<(Health,)>(), world.mask_of::<(DeathMark,)>());
        let mortal = interest(world, mask, dead);
        world.spawn_system(System::single_set(mortal, systems::mark_dead), (AdminTag,))?;

        let mask = world.mask_of::<(DeathMark, SpriteInfo)>();
        let dying_sprites = interest(world, mask, no_tags);
        world.spawn_system(
            System::per_entity(dying_sprites, systems::reclaim_sprite(resources)),
            (CleanupTag,),
        )?;

        let dying = interest(world, dead, no_tags);
        world.spawn_system(System::per_entity(dying, systems::destroy_marked), (CleanupTag,))?;

        Ok(categories)
    }

    // =========================================================================
    // Spawning
    // =========================================================================

    /// Takes a sprite slot, or `None` if every slot is drawn.
    fn take_sprite(world: &mut Coordinator, resources: Entity, diameter: f32) -> Option<SpriteInfo> {
        let slot = world.get::<SpritePool>(resources).0.allocate().ok()?;
        Some(SpriteInfo {
            slot,
            half_width: diameter / 2.0,
            half_height: diameter / 2.0,
        })
    }

    fn spawn_player(
        world: &mut Coordinator,
        config: &GameConfig,
        resources: Entity,
        target: Entity,
        at: Vec2,
    ) -> GameResult<Entity> {
        let sprite = Self::take_sprite(world, resources, PLAYER_SPRITE)
            .ok_or(EcsError::IdSpaceExhausted { limit: u64::from(config.sprite_slots) })?;
        let player = world.new_entity()?;
        world.add_components(
            player,
            (
                Position(at),
                Velocity::default(),
                Following { target, speed: config.player_speed },
                Health(config.player_health),
                Collision {
                    layer: layers::PLAYER,
                    mask: layers::ZOMBIE,
                    radius_squared: radius_squared_from_diameter(PLAYER_SPRITE),
                    on_hit: systems::take_damage,
                },
                Player,
                sprite,
            ),
        );
        Ok(player)
    }

    /// Spawns a zombie chasing the player. Skipped when no sprite slot is free.
    fn spawn_zombie(&mut self, at: Vec2) -> GameResult<Option<Entity>> {
        let Some(sprite) = Self::take_sprite(&mut self.world, self.resources, ZOMBIE_SPRITE) else {
            debug!("no sprite slot free, zombie skipped");
            return Ok(None);
        };
        let zombie = self.world.new_entity()?;
        self.world.add_components(
            zombie,
            (
                Position(at),
                Velocity::default(),
                Collision {
                    layer: layers::ZOMBIE,
                    mask: layers::PLAYER_ATTACK | layers::PLAYER,
                    radius_squared: radius_squared_from_diameter(ZOMBIE_SPRITE),
                    on_hit: systems::take_damage,
                },
                Following { target: self.player, speed: self.config.zombie_speed },
                Health(1),
                Zombie,
                sprite,
            ),
        );
        self.zombies_spawned += 1;
        debug!(%zombie, x = at.x, y = at.y, "zombie spawned");
        Ok(Some(zombie))
    }

    fn spawn_fireball(&mut self, from: Vec2, towards: Vec2) -> GameResult<bool> {
        let Some(sprite) = Self::take_sprite(&mut self.world, self.resources, FIREBALL_SPRITE) else {
            return Ok(false);
        };
        let fireball = self.world.new_entity()?;
        self.world.add_components(
            fireball,
            (
                Position(from),
                Velocity((towards - from).normalized() * self.config.fireball_speed),
                Collision {
                    layer: layers::PLAYER_ATTACK,
                    mask: layers::ZOMBIE,
                    radius_squared: radius_squared_from_diameter(FIREBALL_SPRITE),
                    on_hit: systems::take_damage,
                },
                TimerCallback {
                    due_frame: self.frame + self.config.fireball_lifetime,
                    callback: systems::self_destruct,
                },
                Health(FIREBALL_HEALTH),
                sprite,
            ),
        );
        Ok(true)
    }

    fn spawn_explosion(&mut self, at: Vec2) -> GameResult<bool> {
        let Some(sprite) = Self::take_sprite(&mut self.world, self.resources, EXPLOSION_SPRITE) else {
            return Ok(false);
        };
        let explosion = self.world.new_entity()?;
        self.world.add_components(
            explosion,
            (
                Position(at),
                Collision {
                    layer: layers::PLAYER_ATTACK,
                    mask: layers::ZOMBIE,
                    radius_squared: radius_squared_from_diameter(EXPLOSION_SPRITE),
                    on_hit: systems::take_damage,
                },
                Health(EXPLOSION_HEALTH),
                TimerCallback {
                    due_frame: self.frame + self.config.explosion_lifetime,
                    callback: systems::self_destruct,
                },
                sprite,
            ),
        );
        Ok(true)
    }

    /// A point just outside a random screen edge.
    fn edge_spawn_point(&mut self) -> Vec2 {
        let (width, height, margin) = (
            self.config.screen_width,
            self.config.screen_height,
            self.config.offscreen_margin,
        );
        let along_x = self.rng.gen_range(0.0..width).floor();
        let along_y = self.rng.gen_range(0.0..height).floor();
        match self.rng.gen_range(0..4) {
            0 => Vec2::new(-margin, along_y),
            1 => Vec2::new(width + margin, along_y),
            2 => Vec2::new(along_x, -margin),
            _ => Vec2::new(along_x, height + margin),
        }
    }

    // =========================================================================
    // Frame loop
    // =========================================================================

    fn cast(&mut self, spell: Spell, at: Vec2) -> GameResult<bool> {
        let cost = match spell {
            Spell::Fireball => self.config.fireball_cost,
            Spell::Teleport => self.config.teleport_cost,
            Spell::Explosion => self.config.explosion_cost,
        };
        if self.magic <= cost {
            return Ok(false);
        }

        let origin = self.world.get_ref::<Position>(self.player_target).0;
        let cast = match spell {
            Spell::Teleport => {
                self.world.get::<Position>(self.player_target).0 = at;
                true
            }
            Spell::Fireball => self.spawn_fireball(origin, at)?,
            Spell::Explosion => self.spawn_explosion(origin)?,
        };
        if cast {
            self.magic -= cost;
            debug!(spell = spell.name(), x = at.x, y = at.y, "spell cast");
        }
        Ok(cast)
    }

    /// Advances the game by one frame.
    ///
    /// Once the player has died, further calls change nothing and return the
    /// final report.
    ///
    /// # Errors
    ///
    /// Returns an error if the world runs out of entity ids.
    pub fn step(&mut self, input: FrameInput) -> GameResult<FrameReport> {
        if self.game_over {
            return Ok(self.report());
        }
        self.frame += 1;
        self.last_cast = None;
        self.world.get::<FrameClock>(self.resources).0 = self.frame;

        self.world.run_systems(self.categories.render);
        self.world.run_systems(self.categories.physics);

        if let Some(at) = input.touch {
            if self.cast(input.spell, at)? {
                self.last_cast = Some(input.spell);
            }
        }

        self.magic = (self.magic + self.config.magic_build_rate).min(self.config.max_magic);

        if self.world.get_ref::<Health>(self.player).0 <= 0 {
            self.game_over = true;
            info!(
                frame = self.frame,
                seconds = self.seconds_alive(),
                zombies_spawned = self.zombies_spawned,
                "game over"
            );
            return Ok(self.report());
        }

        self.zombie_clock += 1;
        if self.zombie_clock > self.config.zombie_level_period {
            self.zombie_rate += self.config.zombie_rate_increase;
            self.zombie_level += 1;
            self.zombie_clock = 0;
            info!(level = self.zombie_level, rate = self.zombie_rate, "zombie level up");
        }
        if self.rng.gen_bool(self.zombie_rate.clamp(0.0, 1.0)) {
            let at = self.edge_spawn_point();
            self.spawn_zombie(at)?;
        }

        self.world.run_systems(self.categories.admin);
        self.world.run_systems(self.categories.cleanup);
        self.world.destroy_queued();

        Ok(self.report())
    }

    /// Runs up to `frames` frames, feeding each one the input chosen by
    /// `input`. Stops early on game over.
    ///
    /// # Errors
    ///
    /// Propagates the first error from [`Self::step`].
    pub fn run_with(
        &mut self,
        frames: u64,
        mut input: impl FnMut(&Self) -> FrameInput,
    ) -> GameResult<FrameReport> {
        let mut report = self.report();
        for _ in 0..frames {
            let frame_input = input(&*self);
            report = self.step(frame_input)?;
            if report.game_over {
                break;
            }
            if report.frame % u64::from(self.config.fps * 10) == 0 {
                info!(
                    frame = report.frame,
                    health = report.player_health,
                    magic = report.magic,
                    level = report.zombie_level,
                    zombies = report.zombies_alive,
                    "status"
                );
            }
        }
        Ok(report)
    }

    /// Runs up to `frames` frames under [`Self::autopilot`].
    ///
    /// # Errors
    ///
    /// Propagates the first error from [`Self::step`].
    pub fn run(&mut self, frames: u64) -> GameResult<FrameReport> {
        self.run_with(frames, Self::autopilot)
    }

    /// A simple scripted player: explode when a zombie is close, otherwise
    /// throw a fireball at the nearest zombie.
    #[must_use]
    pub fn autopilot(&self) -> FrameInput {
        let here = self.world.get_ref::<Position>(self.player).0;
        let nearest = self
            .world
            .interests_of(self.zombies)[0]
            .iter()
            .map(|&z| self.world.get_ref::<Position>(z).0)
            .min_by(|a, b| (*a - here).length_squared().total_cmp(&(*b - here).length_squared()));

        match nearest {
            Some(zombie) if (zombie - here).length_squared() < 32.0 * 32.0 => FrameInput {
                touch: Some(here),
                spell: Spell::Explosion,
            },
            Some(zombie) => FrameInput {
                touch: Some(zombie),
                spell: Spell::Fireball,
            },
            None => FrameInput::default(),
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Snapshot of the current state.
    #[must_use]
    pub fn report(&self) -> FrameReport {
        FrameReport {
            frame: self.frame,
            player_health: self.world.get_ref::<Health>(self.player).0,
            magic: self.magic,
            zombie_level: self.zombie_level,
            zombies_alive: self.world.interests_of(self.zombies)[0].len(),
            zombies_spawned: self.zombies_spawned,
            sprites_drawn: self.draw_list().len(),
            cast: self.last_cast,
            game_over: self.game_over,
        }
    }

    /// Seconds survived at the configured frame rate.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn seconds_alive(&self) -> f64 {
        self.frame as f64 / f64::from(self.config.fps)
    }

    /// Sprite placements from the last render pass.
    #[must_use]
    pub fn draw_list(&self) -> &[DrawCommand] {
        &self.world.get_ref::<RenderList>(self.resources).0
    }

    /// The player entity.
    #[must_use]
    pub const fn player(&self) -> Entity {
        self.player
    }

    /// Entity the player walks towards.
    #[must_use]
    pub const fn player_target(&self) -> Entity {
        self.player_target
    }

    /// Current magic.
    #[must_use]
    pub const fn magic(&self) -> f32 {
        self.magic
    }

    /// Returns `true` once the player has died.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.game_over
    }

    /// The session's configuration.
    #[must_use]
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The underlying world.
    #[must_use]
    pub const fn world(&self) -> &Coordinator {
        &self.world
    }

    /// Mutable access to the underlying world, for scripted scenarios.
    pub fn world_mut(&mut self) -> &mut Coordinator {
        &mut self.world
    }

    /// Spawns a zombie at `at` outside the random schedule.
    ///
    /// Returns `None` if no sprite slot is free.
    ///
    /// # Errors
    ///
    /// Returns an error if the world runs out of entity ids.
    pub fn spawn_zombie_at(&mut self, at: Vec2) -> GameResult<Option<Entity>> {
        self.spawn_zombie(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet_config() -> GameConfig {
        GameConfig {
            initial_zombie_rate: 0.0,
            zombie_rate_increase: 0.0,
            ..GameConfig::default()
        }
    }

    #[test]
    fn test_new_game_state() {
        let game = Game::new(quiet_config()).unwrap();
        let report = game.report();
        assert_eq!(report.frame, 0);
        assert_eq!(report.player_health, 10);
        assert_eq!(report.zombie_level, 1);
        assert!(game.world().has::<Player>(game.player()));
        assert!(!game.is_over());
    }

    #[test]
    fn test_teleport_moves_target() {
        let mut game = Game::new(quiet_config()).unwrap();
        let report = game
            .step(FrameInput { touch: Some(Vec2::new(10.0, 20.0)), spell: Spell::Teleport })
            .unwrap();
        assert_eq!(report.cast, Some(Spell::Teleport));
        assert_eq!(
            game.world().get_ref::<Position>(game.player_target()).0,
            Vec2::new(10.0, 20.0)
        );
    }

    #[test]
    fn test_fireball_costs_magic_and_burns_out() {
        let config = GameConfig {
            fireball_lifetime: 3,
            ..quiet_config()
        };
        let mut game = Game::new(config).unwrap();
        let report = game
            .step(FrameInput { touch: Some(Vec2::new(0.0, 0.0)), spell: Spell::Fireball })
            .unwrap();
        assert_eq!(report.cast, Some(Spell::Fireball));
        assert!(game.magic() < 80.0);

        // Player plus fireball are drawn from the second frame on.
        let report = game.step(FrameInput::default()).unwrap();
        assert_eq!(report.sprites_drawn, 2);

        for _ in 0..4 {
            game.step(FrameInput::default()).unwrap();
        }
        let report = game.step(FrameInput::default()).unwrap();
        assert_eq!(report.sprites_drawn, 1);
    }

    #[test]
    fn test_spell_refused_without_magic() {
        let config = GameConfig {
            max_magic: 10.0,
            ..quiet_config()
        };
        let mut game = Game::new(config).unwrap();
        let report = game
            .step(FrameInput { touch: Some(Vec2::ZERO), spell: Spell::Explosion })
            .unwrap();
        assert_eq!(report.cast, None);
    }

    #[test]
    fn test_zombie_reaches_player_and_dies() {
        let mut game = Game::new(quiet_config()).unwrap();
        let start = game.world().get_ref::<Position>(game.player()).0;
        let zombie = game
            .spawn_zombie_at(start + Vec2::new(20.0, 0.0))
            .unwrap()
            .unwrap();

        let mut report = game.report();
        for _ in 0..200 {
            report = game.step(FrameInput::default()).unwrap();
            if !game.world().is_alive(zombie) {
                break;
            }
        }
        assert!(!game.world().is_alive(zombie));
        assert_eq!(report.zombies_alive, 0);
        assert!(report.player_health < 10);
    }

    #[test]
    fn test_sprite_exhaustion_skips_zombies() {
        let config = GameConfig {
            sprite_slots: 2,
            ..quiet_config()
        };
        let mut game = Game::new(config).unwrap();
        assert!(game.spawn_zombie_at(Vec2::ZERO).unwrap().is_some());
        assert!(game.spawn_zombie_at(Vec2::ZERO).unwrap().is_none());
    }

    #[test]
    fn test_whole_horde_dies_in_one_frame() {
        let config = GameConfig {
            player_health: 1_000,
            sprite_slots: u8::MAX,
            ..quiet_config()
        };
        let mut game = Game::new(config).unwrap();
        let player_at = game.world().get_ref::<Position>(game.player()).0;

        // Every free slot twice over: the second wave reuses the recycled ids.
        for wave in 0..2 {
            for _ in 1..u8::MAX {
                assert!(game.spawn_zombie_at(player_at).unwrap().is_some());
            }
            let report = game.step(FrameInput::default()).unwrap();
            assert_eq!(report.zombies_alive, 0);
            assert_eq!(report.player_health, 1_000 - 254 * (wave + 1));
            assert!(!report.game_over);
        }
    }

    #[test]
    fn test_game_over_is_terminal() {
        let config = GameConfig {
            player_health: 1,
            ..quiet_config()
        };
        let mut game = Game::new(config).unwrap();
        let player_at = game.world().get_ref::<Position>(game.player()).0;
        game.spawn_zombie_at(player_at).unwrap();

        let report = game.step(FrameInput::default()).unwrap();
        assert!(report.game_over);
        assert_eq!(report.player_health, 0);

        let again = game.step(FrameInput::default()).unwrap();
        assert_eq!(again, report);
    }
}
