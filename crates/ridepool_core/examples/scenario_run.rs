//! Run four hours of synthetic demand against a 20-vehicle fleet and print the schedules.
//!
//! Run with: cargo run -p ridepool_core --example scenario_run

use ridepool_core::demand::DemandConfig;
use ridepool_core::spatial::GeoPoint;
use ridepool_core::{DispatchConfig, Simulation};

fn main() {
    const NUM_VEHICLES: usize = 20;
    const SIMULATION_HOURS: u64 = 4;
    const ONE_SEC_MS: u64 = 1000;

    let records = DemandConfig::default()
        .with_seed(123)
        .with_horizon_ms(SIMULATION_HOURS * 60 * 60 * 1000)
        .generate()
        .expect("default demand config is valid");
    let config = DispatchConfig::default().with_num_vehicles(NUM_VEHICLES);
    let report = Simulation::with_haversine(&config)
        .expect("default dispatch config is valid")
        .run(&records)
        .expect("dispatch run");

    println!(
        "--- Scenario run ({} requests, {} vehicles, {}h, seed 123) ---",
        records.len(),
        NUM_VEHICLES,
        SIMULATION_HOURS
    );
    println!("Committed: {}", report.committed());
    println!("Rejected: {}", report.rejections.len());

    println!("\nSchedules:");
    for route in report.schedules.routes() {
        let vehicle = route.vehicle();
        println!(
            "  {} ({} seats): {} requests, {} stops",
            vehicle.name,
            vehicle.capacity,
            route.served_requests(),
            route.len()
        );
        for (stop, occupancy) in route.stops().iter().zip(route.occupancy_profile()).take(6) {
            let point = GeoPoint::from(stop.location);
            println!(
                "    {:>6} s  {:<7} request {:<4} ({:.4}, {:.4})  on board {}",
                stop.scheduled_ms / ONE_SEC_MS,
                stop.role,
                stop.request_id(),
                point.lat,
                point.lng,
                occupancy
            );
        }
        if route.len() > 6 {
            println!("    ... and {} more stops", route.len() - 6);
        }
    }
}
