use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use glam::DVec3;
use sky_graph::orbit_math::{calculate_eccentric_anomaly, OrbitalElements, KEPLER_ITERATIONS};
use sky_graph::time::FixedTime;
use sky_graph::{FixedCamera, GraphUpdater, Node, SceneGraph, SimInstant, UniversalPos};

fn orbit(i: usize) -> OrbitalElements {
    OrbitalElements {
        period: 100.0 + i as f64,
        epoch: 2451545.0,
        semi_major_axis: 1.0e6 * (1.0 + i as f64),
        eccentricity: 0.01 * (i % 20) as f64,
        inclination: (i % 7) as f64,
        ..Default::default()
    }
}

/// A star with `planets` bodies, each carrying `moons` satellites.
fn system(planets: usize, moons: usize) -> SceneGraph {
    let mut graph = SceneGraph::new();
    let root = graph.add(Node::new("universe"));
    let Ok(star) = graph.add_child(root, Node::new("star").with_size(0.7)) else {
        return graph;
    };
    for p in 0..planets {
        let planet = Node::new(format!("planet {p}"))
            .with_size(0.006)
            .with_coordinates(orbit(p));
        let Ok(planet) = graph.add_child(star, planet) else {
            continue;
        };
        for m in 0..moons {
            let moon = Node::new(format!("moon {p}.{m}"))
                .with_size(0.001)
                .with_coordinates(orbit(m));
            let _ = graph.add_child(planet, moon);
        }
    }
    graph
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("kepler");
    group.throughput(Throughput::Elements(1));
    group.bench_function("eccentric_anomaly", |b| {
        b.iter(|| calculate_eccentric_anomaly(black_box(0.2f64), black_box(0.1), KEPLER_ITERATIONS))
    });
    let elements = orbit(3);
    group.bench_function("position_at_offset", |b| {
        b.iter(|| elements.position_at_offset(black_box(1023.666)))
    });
    group.finish();

    let mut group = c.benchmark_group("graph_update");
    for &(planets, moons) in &[(8, 4), (64, 16)] {
        let mut graph = system(planets, moons);
        let mut updater = GraphUpdater::default();
        let camera = FixedCamera::new(UniversalPos::from_dvec3(DVec3::new(0.0, 300.0, -400.0)));
        let mut time = FixedTime {
            instant: SimInstant::J2000,
            hdiff: 1.0,
            dt: 1.0 / 60.0,
            session_ms: 0,
        };

        group.throughput(Throughput::Elements(graph.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(graph.len()),
            &graph.len(),
            |b, _| {
                b.iter(|| {
                    time.instant = time.instant.offset_hours(1.0);
                    time.session_ms += 16;
                    black_box(updater.update(&mut graph, &time, &camera))
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
