#![allow(missing_docs)]
//! Benchmarks for ambient temperature sampling.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::{hint::black_box, sync::Arc};

use strata_core::{
    Environment,
    config::EnvironmentConfig,
    store::{MaterialType, PhysicalState, RamOnlyStore, StoredParticle, WorldConfig},
};
use strata_utils::{CellPos, ParticleId, WorldId};
use tokio::runtime::Runtime;

/// A world with a small lake of `lake_radius` cells around the origin.
fn lake_world(lake_radius: i32) -> (Environment, WorldId) {
    let store = Arc::new(RamOnlyStore::new());
    let world = WorldId::new_random();
    store.insert_world(
        world,
        WorldConfig {
            chunk_size: None,
            width_meters: 1000.0,
            height_meters: 1000.0,
            min_z: 0,
            max_z: 256,
            cell_size_meters: 1.0,
        },
    );
    store.insert_material(MaterialType {
        name: "water".to_owned(),
        albedo: Some(0.06),
        thermal_conductivity: 0.6,
        thermal_inertia: 4.0,
        physical_state: PhysicalState::Liquid,
    });
    for x in -lake_radius..=lake_radius {
        for y in -lake_radius..=lake_radius {
            store.insert_particle(StoredParticle {
                id: ParticleId::new_random(),
                world,
                position: CellPos::new(250 + x, 250 + y, 0),
                material: "water".to_owned(),
                temperature: Some(12.0),
                extracted: false,
            });
        }
    }
    let env = Environment::from_store(EnvironmentConfig::default(), store)
        .expect("default config is valid");
    (env, world)
}

fn bench_ambient_temperature(c: &mut Criterion) {
    let runtime = Runtime::new().expect("tokio runtime");
    let mut group = c.benchmark_group("ambient_temperature");

    for lake_radius in [0, 4, 12] {
        let (env, world) = lake_world(lake_radius);
        let world_id = world.to_string();
        group.bench_with_input(
            BenchmarkId::new("lake_radius", lake_radius),
            &lake_radius,
            |b, _| {
                b.iter(|| {
                    let t = runtime.block_on(env.temperature_at(
                        black_box(&world_id),
                        black_box(251.0),
                        black_box(249.0),
                        black_box(1.0),
                        None,
                    ));
                    black_box(t)
                });
            },
        );
    }

    group.finish();
}

fn bench_chunk_temperature(c: &mut Criterion) {
    let runtime = Runtime::new().expect("tokio runtime");
    let (env, world) = lake_world(4);

    c.bench_function("cached_chunk_temperature", |b| {
        b.iter(|| {
            let t = runtime.block_on(
                env.chunk_temperature_at(black_box(world), black_box(CellPos::new(250, 250, 1))),
            );
            black_box(t)
        });
    });
}

criterion_group!(benches, bench_ambient_temperature, bench_chunk_temperature);
criterion_main!(benches);
