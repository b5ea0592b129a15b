use std::sync::Arc;

use bevy::math::{Rect, Vec2, Vec3};
use criterion::{criterion_group, criterion_main, Criterion};

use bevy_pathgrid::prelude::*;

/// A maze-ish environment: vertical walls every eight units with alternating gaps.
fn walled_environment(size: f32) -> Arc<RectEnvironment> {
    let env = Arc::new(RectEnvironment::new());
    let half = size * 0.5;

    let mut x = -half + 8.0;
    let mut flip = false;
    while x < half {
        let (from, to) = if flip {
            (-half + 4.0, half)
        } else {
            (-half, half - 4.0)
        };
        env.block(Rect::new(x, from, x + 1.0, to));
        env.paint(Rect::new(x + 2.0, from, x + 4.0, to), "Grass");
        x += 8.0;
        flip = !flip;
    }

    env
}

fn walled_grid(size: f32) -> SpatialGrid {
    let settings = GridSettingsBuilder::new(Vec2::splat(size), 1.0)
        .build()
        .unwrap();
    SpatialGrid::scan(settings, walled_environment(size))
}

fn benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("pathfinding");
    group.sample_size(10);

    let penalties = SurfacePenaltiesBuilder::new().fill_missing(20).build().unwrap();

    for size in [64.0, 256.0] {
        let corner = size * 0.5 - 0.5;
        let start = Vec3::new(-corner, 0.0, -corner);
        let target = Vec3::new(corner, 0.0, corner);

        let settings = GridSettingsBuilder::new(Vec2::splat(size), 1.0)
            .build()
            .unwrap();
        let env = walled_environment(size);
        let mut scanned = SpatialGrid::new(settings, env);

        group.bench_function(format!("build_grid_{size}x{size}"), |b| {
            b.iter(|| scanned.build())
        });

        let mut grid = walled_grid(size);
        let mut pathfinder = Pathfinder::new(grid.len(), penalties);

        group.bench_function(format!("pathfind_{size}x{size}"), |b| {
            b.iter(|| pathfinder.find_path(&mut grid, start, target, &[], None))
        });

        group.bench_function(format!("pathfind_penalized_{size}x{size}"), |b| {
            b.iter(|| {
                pathfinder.find_path(&mut grid, start, target, &[SurfaceKind::Grass], None)
            })
        });

        let mut navigator = Navigator::from_grid(walled_grid(size), penalties);
        group.bench_function(format!("queue_round_trip_{size}x{size}"), |b| {
            b.iter(|| {
                navigator.submit_path_request(start, target, &[], None, |_, _| {});
                navigator.step()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, benchmarks);
criterion_main!(benches);
