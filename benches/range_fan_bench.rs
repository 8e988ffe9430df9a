//! Criterion benchmarks for range-fan construction and the LLOS loop.
//!
//! Run with: `cargo bench`

use criterion::{criterion_group, criterion_main, Criterion};
use los_engine::range_fan::{build_range_fan, RangeFanSpec};
use los_engine::types::{Point, Point3, SpatialReference};
use los_engine::units::DistanceUnit;
use los_engine::visibility::{run_llos, ElevationSurface, LineOfSightTracer, LlosParams, Trace};

// -- JSON fixtures --

/// Wraparound sector with an inner radius, default 1 degree step.
const SECTOR_JSON: &str = r#"{
  "center": {"x": 500000.0, "y": 4100000.0},
  "inner_radius": 250.0,
  "outer_radius": 5000.0,
  "start_bearing": 300.0,
  "end_bearing": 60.0,
  "spatial_reference": {"wkid": 32611},
  "include_observer_buffer": true
}"#;

/// Full-circle donut at a tiny step, exercising the step guard.
const DONUT_JSON: &str = r#"{
  "center": {"x": 0.0, "y": 0.0},
  "inner_radius": 100.0,
  "outer_radius": 1000.0,
  "start_bearing": 0.0,
  "end_bearing": 360.0,
  "spatial_reference": {"wkid": 3857},
  "angle_step": 0.0001
}"#;

struct Ripples;

impl ElevationSurface for Ripples {
    fn elevation(&self, x: f64, y: f64) -> f64 {
        100.0 + 5.0 * (x * 0.01).sin() * (y * 0.01).cos()
    }

    fn linear_unit(&self) -> Option<DistanceUnit> {
        Some(DistanceUnit::Meters)
    }

    fn spatial_reference(&self) -> Option<SpatialReference> {
        None
    }
}

/// Samples the surface along the segment and blocks on the first rise
/// above the sight line.
struct SampledTracer {
    samples: usize,
}

impl LineOfSightTracer for SampledTracer {
    fn trace(&self, surface: &dyn ElevationSurface, from: &Point3, to: &Point3) -> Trace {
        for i in 1..self.samples {
            let t = i as f64 / self.samples as f64;
            let x = from.x + t * (to.x - from.x);
            let y = from.y + t * (to.y - from.y);
            let z = from.z + t * (to.z - from.z);
            if surface.elevation(x, y) > z {
                return Trace {
                    obstruction: Some(Point3::new(x, y, z)),
                    target_visible: false,
                    ..Trace::default()
                };
            }
        }
        Trace {
            target_visible: true,
            ..Trace::default()
        }
    }
}

fn grid(n: usize, spacing: f64) -> Vec<Point> {
    (0..n * n)
        .map(|i| Point::new((i % n) as f64 * spacing, (i / n) as f64 * spacing))
        .collect()
}

fn bench_sector(c: &mut Criterion) {
    let spec: RangeFanSpec = serde_json::from_str(SECTOR_JSON).unwrap();
    c.bench_function("range_fan_wraparound_sector", |b| {
        b.iter(|| build_range_fan(&spec).unwrap());
    });
}

fn bench_donut(c: &mut Criterion) {
    let spec: RangeFanSpec = serde_json::from_str(DONUT_JSON).unwrap();
    c.bench_function("range_fan_donut_step_guard", |b| {
        b.iter(|| build_range_fan(&spec).unwrap());
    });
}

fn bench_llos(c: &mut Criterion) {
    let observers = grid(10, 150.0);
    let targets = grid(10, 137.0);
    let tracer = SampledTracer { samples: 64 };
    let params = LlosParams::default();
    c.bench_function("llos_100_observers_x_100_targets", |b| {
        b.iter(|| run_llos(&observers, &targets, &Ripples, &tracer, &params).unwrap());
    });
}

criterion_group!(benches, bench_sector, bench_donut, bench_llos);
criterion_main!(benches);
