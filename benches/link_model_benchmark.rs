use vanet_cosim_core::agents::{EmergencyMatcher, Vehicle};
use vanet_cosim_core::bridge::NetworkBridge;
use vanet_cosim_core::client::mock::vehicle_snapshot;
use vanet_cosim_core::radio::{LinkKind, LinkModel};
use vanet_cosim_core::topology::NetworkTopology;

use criterion::{Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashMap;
use std::hint::black_box;

pub fn benchmark_link_attempts(c: &mut Criterion) {
    let model = LinkModel::default();
    let mut rng = StdRng::seed_from_u64(42);

    c.bench_function("link_model_attempt", |b| {
        b.iter(|| {
            let outcome = model.attempt(
                black_box(LinkKind::ShortRange),
                black_box(187.5),
                &mut rng,
            );
            let _ = outcome;
        })
    });
}

pub fn benchmark_bridge_sweep(c: &mut Criterion) {
    // 100 vehicles scattered over a 1 km square, one RSU-free topology
    let matcher = EmergencyMatcher::default();
    let vehicles: Vec<Vehicle> = (0..100)
        .map(|i| {
            let x = (i % 10) as f64 * 100.0;
            let y = (i / 10) as f64 * 100.0;
            let id = if i == 0 { "ambulance_0".to_string() } else { format!("veh_{}", i) };
            Vehicle::from_snapshot(vehicle_snapshot(&id, x, y, 10.0, 0.0, "e_0"), &matcher)
        })
        .collect();
    let topology = NetworkTopology::from_parts(vec![], vec![], HashMap::new()).unwrap();

    c.bench_function("bridge_sweep_100_vehicles", |b| {
        let mut bridge = NetworkBridge::new(LinkModel::default(), 42, 1, None);
        let mut tick = 0u64;
        b.iter(|| {
            tick += 1;
            let record = bridge.step(black_box(tick), black_box(&vehicles), &topology);
            let _ = record;
        })
    });
}

criterion_group!(benches, benchmark_link_attempts, benchmark_bridge_sweep);
criterion_main!(benches);
