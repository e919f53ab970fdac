//! Load tests for ridepool_core: validate dispatch throughput under realistic demand.

use std::time::Instant;

use ridepool_core::demand::DemandConfig;
use ridepool_core::{DispatchConfig, Simulation};

fn run_load(num_vehicles: usize, demand_factor: f64, parallel: bool) -> (usize, f64) {
    let records = DemandConfig::default()
        .with_seed(42)
        .with_horizon_ms(4 * 60 * 60 * 1000)
        .with_demand_factor(demand_factor)
        .generate()
        .expect("demand");
    let config = DispatchConfig::default()
        .with_num_vehicles(num_vehicles)
        .with_parallel(parallel);

    let start = Instant::now();
    let report = Simulation::with_haversine(&config)
        .expect("config")
        .run(&records)
        .expect("run");
    let duration = start.elapsed();

    assert_eq!(report.outcomes.len(), records.len());
    (records.len(), records.len() as f64 / duration.as_secs_f64())
}

#[test]
#[ignore] // Only run explicitly: cargo test --package ridepool_core --test load_tests -- --ignored
fn test_sustained_load() {
    let (requests, per_sec) = run_load(50, 1.0, true);
    println!(
        "Sustained load test: {} requests ({:.0} requests/sec)",
        requests, per_sec
    );

    assert!(
        per_sec > 100.0,
        "Should dispatch >100 requests/sec, got {:.0}",
        per_sec
    );
}

#[test]
#[ignore]
fn test_peak_load() {
    // Demand spike: every step produces a request.
    let (requests, per_sec) = run_load(20, 5.0, true);
    println!(
        "Peak load test: {} requests ({:.0} requests/sec)",
        requests, per_sec
    );

    assert!(
        per_sec > 50.0,
        "Should dispatch >50 requests/sec under peak load, got {:.0}",
        per_sec
    );
}
