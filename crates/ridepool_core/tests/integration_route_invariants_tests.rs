mod support;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use ridepool_core::constraints::evaluate;
use ridepool_core::demand::{DemandArea, DemandConfig};
use ridepool_core::route::StopRole;
use ridepool_core::travel::HaversineTravelModel;
use ridepool_core::{DispatchConfig, RequestId, RequestRecord, Simulation, SimulationReport};

use support::requests::line_point;

const HOUR_MS: u64 = 60 * 60 * 1000;

fn demand(seed: u64) -> Vec<RequestRecord> {
    DemandConfig::default()
        .with_seed(seed)
        .with_horizon_ms(2 * HOUR_MS)
        .with_demand_factor(1.5)
        .with_area(DemandArea::Bounds {
            lat_min: 52.49,
            lat_max: 52.54,
            lng_min: 13.37,
            lng_max: 13.45,
        })
        .generate()
        .expect("demand")
}

fn fleet_config(parallel: bool) -> DispatchConfig {
    DispatchConfig::default()
        .with_num_vehicles(4)
        .with_capacity(3)
        .with_start_locations(vec![line_point(0), line_point(2), line_point(4), line_point(1)])
        .with_parallel(parallel)
}

fn run(records: &[RequestRecord], parallel: bool) -> SimulationReport {
    Simulation::with_haversine(&fleet_config(parallel))
        .expect("config")
        .run(records)
        .expect("run")
}

#[test]
fn committed_routes_respect_every_invariant() {
    for seed in 1..=4 {
        let records = demand(seed);
        assert!(!records.is_empty(), "seed {seed} produced no demand");
        let report = run(&records, false);

        let mut placed: HashMap<RequestId, usize> = HashMap::new();
        for route in report.schedules.routes() {
            let capacity = route.vehicle().capacity;

            assert!(
                evaluate(route.stops(), capacity).is_feasible(),
                "seed {seed}: committed route of vehicle {} is infeasible",
                route.vehicle().id
            );
            assert!(route.occupancy_profile().iter().all(|&o| o <= capacity));

            let mut picked = HashSet::new();
            for pair in route.stops().windows(2) {
                assert!(pair[0].scheduled_ms <= pair[1].scheduled_ms);
            }
            for stop in route.stops() {
                *placed.entry(stop.request_id()).or_default() += 1;
                match stop.role {
                    StopRole::Pickup => {
                        assert!(picked.insert(stop.request_id()));
                        assert!(
                            stop.request.pickup_delay_ms(stop.scheduled_ms)
                                <= stop.request.max_delay_ms
                        );
                    }
                    StopRole::Dropoff => {
                        assert!(picked.contains(&stop.request_id()), "dropoff before pickup");
                        assert!(
                            stop.request.dropoff_delay_ms(stop.scheduled_ms)
                                <= stop.request.max_delay_ms
                        );
                    }
                }
            }
        }

        for outcome in &report.outcomes {
            let expected = if outcome.is_committed() { 2 } else { 0 };
            assert_eq!(
                placed.get(&outcome.request_id).copied().unwrap_or(0),
                expected,
                "seed {seed}: request {}",
                outcome.request_id
            );
        }
        assert_eq!(
            report.outcomes.len(),
            report.committed() + report.rejections.len()
        );
    }
}

#[test]
fn identical_inputs_give_identical_results() {
    let records = demand(11);
    let first = run(&records, false);
    let second = run(&records, false);

    assert_eq!(first.outcomes, second.outcomes);
    assert_eq!(first.rejections, second.rejections);
    assert_eq!(first.schedules, second.schedules);
}

#[test]
fn parallel_evaluation_matches_sequential() {
    for seed in [3, 17] {
        let records = demand(seed);
        let sequential = run(&records, false);
        let parallel = run(&records, true);

        assert_eq!(sequential.outcomes, parallel.outcomes, "seed {seed}");
        assert_eq!(sequential.rejections, parallel.rejections, "seed {seed}");
        assert_eq!(sequential.schedules, parallel.schedules, "seed {seed}");
    }
}

#[test]
fn explicit_travel_model_is_used() {
    let records = demand(5);
    let config = fleet_config(false);
    let slow = Simulation::new(&config, Arc::new(HaversineTravelModel::new(5.0)))
        .expect("config")
        .run(&records)
        .expect("run");
    let normal = run(&records, false);

    assert!(normal.committed() > 0);
    assert_ne!(slow.outcomes, normal.outcomes);
}
