//! # Game Systems
//!
//! Handlers for every pass of the frame loop. Plain functions are used where
//! a system needs nothing but its membership set; systems that touch shared
//! state are built by a factory that captures the resource entity.
//!
//! | System                        | Kind        | Category | Interest                  |
//! |-------------------------------|-------------|----------|---------------------------|
//! | [`draw_sprites`]              | single-set  | render   | Position + SpriteInfo     |
//! | [`apply_velocity`]            | single-set  | physics  | Position + Velocity       |
//! | [`following_ai`]              | single-set  | physics  | Following + Position + Velocity |
//! | [`circular_collision_detection`] | single-set | physics | Position + Collision     |
//! | [`run_timers`]                | single-set  | admin    | TimerCallback             |
//! | [`mark_dead`]                 | single-set  | admin    | Health, not DeathMark     |
//! | [`reclaim_sprite`]            | per-entity  | cleanup  | DeathMark + SpriteInfo    |
//! | [`destroy_marked`]            | per-entity  | cleanup  | DeathMark                 |

use tecs_core::{Coordinator, Entity};
use tracing::debug;

use crate::components::{
    circle_circle, Collision, DeathMark, DrawCommand, FrameClock, Following, Health, Position,
    RenderList, SpriteInfo, SpritePool, TimerCallback, Velocity,
};

/// Moves every entity by its velocity.
pub fn apply_velocity(world: &mut Coordinator, entities: &[Entity]) {
    for &entity in entities {
        let velocity = world.get_ref::<Velocity>(entity).0;
        world.get::<Position>(entity).0 += velocity;
    }
}

/// Points every follower's velocity at its target.
///
/// A follower closer than one step lands exactly on the target. Followers of
/// dead or position-less targets stop.
pub fn following_ai(world: &mut Coordinator, entities: &[Entity]) {
    for &entity in entities {
        let Following { target, speed } = *world.get_ref::<Following>(entity);
        let here = world.get_ref::<Position>(entity).0;

        let velocity = match world.try_get::<Position>(target) {
            Some(there) => {
                let offset = there.0 - here;
                if offset.length_squared() <= speed * speed {
                    offset
                } else {
                    offset.normalized() * speed
                }
            }
            None => Default::default(),
        };
        world.get::<Velocity>(entity).0 = velocity;
    }
}

/// Tests every pair of colliders and calls `on_hit` on each side that is
/// vulnerable to the other's layer.
pub fn circular_collision_detection(world: &mut Coordinator, entities: &[Entity]) {
    let colliders: Vec<(Entity, Position, Collision)> = entities
        .iter()
        .map(|&e| (e, *world.get_ref::<Position>(e), *world.get_ref::<Collision>(e)))
        .collect();

    for (i, &(a, a_position, a_collision)) in colliders.iter().enumerate() {
        for &(b, b_position, b_collision) in &colliders[i + 1..] {
            if !circle_circle(
                a_position.0,
                a_collision.radius_squared,
                b_position.0,
                b_collision.radius_squared,
            ) {
                continue;
            }
            if a_collision.mask & b_collision.layer != 0 {
                (a_collision.on_hit)(world, a, b);
            }
            if b_collision.mask & a_collision.layer != 0 {
                (b_collision.on_hit)(world, b, a);
            }
        }
    }
}

/// Collision response: lose one hit point.
pub fn take_damage(world: &mut Coordinator, this: Entity, _other: Entity) {
    if let Some(health) = world.try_get_mut::<Health>(this) {
        health.0 -= 1;
    }
}

/// Timer response: mark for removal.
pub fn self_destruct(world: &mut Coordinator, this: Entity) {
    world.add_component(this, DeathMark);
}

/// Builds the timer system. Fires and removes every timer that is due.
pub fn run_timers(resources: Entity) -> impl Fn(&mut Coordinator, &[Entity]) {
    move |world, entities| {
        let now = world.get_ref::<FrameClock>(resources).0;
        for &entity in entities {
            let timer = *world.get_ref::<TimerCallback>(entity);
            if timer.due_frame <= now {
                world.remove_component::<TimerCallback>(entity);
                (timer.callback)(world, entity);
            }
        }
    }
}

/// Marks every entity whose health ran out.
pub fn mark_dead(world: &mut Coordinator, entities: &[Entity]) {
    for &entity in entities {
        if world.get_ref::<Health>(entity).0 <= 0 {
            debug!(%entity, "entity died");
            world.add_component(entity, DeathMark);
        }
    }
}

/// Builds the sprite reclamation system. Returns a dying entity's sprite slot
/// to the pool.
pub fn reclaim_sprite(resources: Entity) -> impl Fn(&mut Coordinator, Entity) {
    move |world, entity| {
        if let Some(sprite) = world.remove_component::<SpriteInfo>(entity) {
            world.get::<SpritePool>(resources).0.release(sprite.slot);
        }
    }
}

/// Queues a marked entity for destruction.
pub fn destroy_marked(world: &mut Coordinator, entity: Entity) {
    world.queue_destroy_entity(entity);
}

/// Builds the render system. Replaces the render list with one placement
/// per drawable entity.
pub fn draw_sprites(resources: Entity) -> impl Fn(&mut Coordinator, &[Entity]) {
    move |world, entities| {
        let commands: Vec<DrawCommand> = entities
            .iter()
            .map(|&entity| {
                let sprite = world.get_ref::<SpriteInfo>(entity);
                let position = world.get_ref::<Position>(entity).0;
                DrawCommand {
                    slot: sprite.slot,
                    x: position.x - sprite.half_width,
                    y: position.y - sprite.half_height,
                }
            })
            .collect();
        world.get::<RenderList>(resources).0 = commands;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{layers, register_all, Vec2};
    use tecs_core::IdAllocator;

    fn world() -> Coordinator {
        let mut world = Coordinator::new();
        register_all(&mut world);
        world
    }

    fn spawn_at(world: &mut Coordinator, at: Vec2) -> Entity {
        let e = world.new_entity().unwrap();
        world.add_components(e, (Position(at), Velocity::default()));
        e
    }

    #[test]
    fn test_following_moves_at_speed_then_arrives() {
        let mut world = world();
        let target = spawn_at(&mut world, Vec2::new(10.0, 0.0));
        let follower = spawn_at(&mut world, Vec2::ZERO);
        world.add_component(follower, Following { target, speed: 4.0 });

        for expected in [4.0, 8.0, 10.0, 10.0] {
            following_ai(&mut world, &[follower]);
            apply_velocity(&mut world, &[follower]);
            assert_eq!(world.get_ref::<Position>(follower).0, Vec2::new(expected, 0.0));
        }
    }

    #[test]
    fn test_following_dead_target_stops() {
        let mut world = world();
        let target = spawn_at(&mut world, Vec2::new(10.0, 0.0));
        let follower = spawn_at(&mut world, Vec2::ZERO);
        world.add_component(follower, Following { target, speed: 4.0 });
        world.destroy_entity(target);

        following_ai(&mut world, &[follower]);
        assert_eq!(world.get_ref::<Velocity>(follower).0, Vec2::ZERO);
    }

    #[test]
    fn test_collision_respects_layers() {
        let mut world = world();
        let zombie = spawn_at(&mut world, Vec2::ZERO);
        let fireball = spawn_at(&mut world, Vec2::new(3.0, 0.0));
        let far = spawn_at(&mut world, Vec2::new(100.0, 0.0));
        let collider = |layer, mask| Collision {
            layer,
            mask,
            radius_squared: 16.0,
            on_hit: take_damage,
        };
        world.add_components(zombie, (collider(layers::ZOMBIE, layers::PLAYER_ATTACK), Health(1)));
        world.add_components(fireball, (collider(layers::PLAYER_ATTACK, layers::ZOMBIE), Health(2)));
        world.add_components(far, (collider(layers::PLAYER, layers::ZOMBIE), Health(5)));

        circular_collision_detection(&mut world, &[zombie, fireball, far]);
        assert_eq!(*world.get_ref::<Health>(zombie), Health(0));
        assert_eq!(*world.get_ref::<Health>(fireball), Health(1));
        assert_eq!(*world.get_ref::<Health>(far), Health(5));

        mark_dead(&mut world, &[zombie, fireball, far]);
        assert!(world.has::<DeathMark>(zombie));
        assert!(!world.has::<DeathMark>(fireball));
    }

    #[test]
    fn test_timer_fires_once_when_due() {
        let mut world = world();
        let resources = world.new_entity().unwrap();
        world.add_component(resources, FrameClock(9));
        let e = world.new_entity().unwrap();
        world.add_component(e, TimerCallback { due_frame: 10, callback: self_destruct });

        let timers = run_timers(resources);
        timers(&mut world, &[e]);
        assert!(!world.has::<DeathMark>(e));

        world.get::<FrameClock>(resources).0 = 10;
        timers(&mut world, &[e]);
        assert!(world.has::<DeathMark>(e));
        assert!(!world.has::<TimerCallback>(e));
    }

    #[test]
    fn test_reclaim_and_draw() {
        let mut world = world();
        let resources = world.new_entity().unwrap();
        let mut pool = IdAllocator::with_limit(4, 4);
        let slot = pool.allocate().unwrap();
        world.add_components(resources, (SpritePool(pool), RenderList::default()));

        let e = spawn_at(&mut world, Vec2::new(20.0, 30.0));
        world.add_component(e, SpriteInfo { slot, half_width: 8.0, half_height: 4.0 });

        draw_sprites(resources)(&mut world, &[e]);
        assert_eq!(
            world.get_ref::<RenderList>(resources).0,
            vec![DrawCommand { slot, x: 12.0, y: 26.0 }]
        );

        reclaim_sprite(resources)(&mut world, e);
        assert!(!world.has::<SpriteInfo>(e));
        assert_eq!(world.get_ref::<SpritePool>(resources).0.live_count(), 0);
    }
}
