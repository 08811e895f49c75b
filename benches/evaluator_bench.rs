//! Criterion benchmarks for geofence evaluation.
//!
//! - Haversine distance, single pair
//! - Polygon containment, 64 vertices
//! - Full evaluation over 100 and 1000 mixed fences

use std::f64::consts::TAU;

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use fleetwatch_core::geo::{distance_meters, point_in_polygon, GeoPoint};
use fleetwatch_core::geofence::evaluate;
use fleetwatch_core::models::{BoundaryType, Geofence, Position};

/// Regular polygon approximating a circle of `radius_deg` degrees.
fn ring(center: GeoPoint, radius_deg: f64, vertices: usize) -> Vec<GeoPoint> {
    (0..vertices)
        .map(|i| {
            let angle = TAU * i as f64 / vertices as f64;
            GeoPoint::new(
                center.latitude + radius_deg * angle.sin(),
                center.longitude + radius_deg * angle.cos(),
            )
        })
        .collect()
}

fn fences(count: usize) -> Vec<Geofence> {
    (0..count)
        .filter_map(|i| {
            let center = GeoPoint::new((i % 90) as f64 * 0.5, (i % 180) as f64 * 0.5);
            let boundary = if i % 2 == 0 {
                BoundaryType::Exclusion
            } else {
                BoundaryType::Inclusion
            };
            let fence = if i % 3 == 0 {
                Geofence::polygonal(&format!("poly-{i}"), boundary, ring(center, 0.2, 16))
            } else {
                Geofence::circular(&format!("circle-{i}"), boundary, center, 5_000.0)
            };
            fence.ok()
        })
        .collect()
}

fn bench_distance(c: &mut Criterion) {
    let a = GeoPoint::new(47.6062, -122.3321);
    let b = GeoPoint::new(51.5074, -0.1278);
    c.bench_function("distance_meters", |bench| {
        bench.iter(|| distance_meters(black_box(a), black_box(b)))
    });
}

fn bench_polygon(c: &mut Criterion) {
    let vertices = ring(GeoPoint::new(0.0, 0.0), 1.0, 64);
    let point = GeoPoint::new(0.3, 0.4);
    c.bench_function("point_in_polygon_64", |bench| {
        bench.iter(|| point_in_polygon(black_box(point), black_box(&vertices)))
    });
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    let position = Position::new(10.0, 20.0, Utc::now()).with_altitude(120.0);
    let now = Utc::now();

    for count in [100, 1000] {
        let fences = fences(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &fences, |bench, fences| {
            bench.iter(|| evaluate(black_box(&position), black_box(fences), now))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_distance, bench_polygon, bench_evaluate);
criterion_main!(benches);
