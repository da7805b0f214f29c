//! # ECS Performance Benchmark
//!
//! Entity churn, component attach/detach and per-entity system dispatch.
//!
//! Run with: `cargo bench --package tecs_core`

// Benchmarks don't need docs
#![allow(missing_docs)]

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use tecs_core::{ComponentMask, Coordinator, InterestCondition, System, WorldConfig};

#[derive(Clone, Copy, Default)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Clone, Copy, Default)]
struct Velocity {
    x: f32,
    y: f32,
}

#[derive(Default)]
struct Physics;

fn world(capacity: usize) -> Coordinator {
    let config = WorldConfig {
        recycle_capacity: capacity,
        initial_entity_capacity: capacity,
        ..WorldConfig::default()
    };
    let Ok(mut world) = Coordinator::with_config(config) else {
        unreachable!("benchmark config is valid");
    };
    world.register_component::<Position>();
    world.register_component::<Velocity>();
    world.register_component::<Physics>();
    world
}

/// Benchmark: spawn N entities then destroy them all, reusing ids.
fn bench_spawn_destroy(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn_destroy");

    for count in [1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut world = world(count);
            let mut entities = Vec::with_capacity(count);
            b.iter(|| {
                for _ in 0..count {
                    entities.push(world.new_entity().unwrap());
                }
                for e in entities.drain(..) {
                    world.destroy_entity(e);
                }
                black_box(world.alive_count())
            });
        });
    }

    group.finish();
}

/// Benchmark: attach and detach a component with one interest watching.
fn bench_add_remove(c: &mut Criterion) {
    let mut world = world(10_000);
    let velocity = world.component_id::<Velocity>();
    world.register_interests(&[InterestCondition::requiring(ComponentMask::single(velocity))]);
    let entities: Vec<_> = (0..10_000).map(|_| world.new_entity().unwrap()).collect();

    c.bench_function("add_remove_10k", |b| {
        b.iter(|| {
            for &e in &entities {
                world.add_component(e, Velocity { x: 1.0, y: 0.5 });
            }
            for &e in &entities {
                black_box(world.remove_component::<Velocity>(e));
            }
        });
    });
}

/// Benchmark: integrate velocity over 10k entities via a per-entity system.
fn bench_per_entity_dispatch(c: &mut Criterion) {
    let mut world = world(10_000);
    let moving = world.mask_of::<(Position, Velocity)>();
    let target = world.register_interests(&[InterestCondition::requiring(moving)]);
    let physics = world.mask_of::<(Physics,)>();
    let category = world.make_system_interest(physics, ComponentMask::EMPTY);

    for i in 0..10_000u16 {
        let e = world.new_entity().unwrap();
        let f = f32::from(i);
        world.add_components(e, (Position { x: f, y: f }, Velocity { x: 0.1, y: 0.2 }));
    }
    world
        .spawn_system(
            System::per_entity(target, |world, e| {
                let v = *world.get_ref::<Velocity>(e);
                let p = world.get::<Position>(e);
                p.x += v.x;
                p.y += v.y;
            }),
            (Physics,),
        )
        .unwrap();

    c.bench_function("per_entity_dispatch_10k", |b| {
        b.iter(|| world.run_systems(black_box(category)));
    });
}

criterion_group!(benches, bench_spawn_destroy, bench_add_remove, bench_per_entity_dispatch);
criterion_main!(benches);
