use std::fs;
use std::sync::Arc;

use ridepool_core::travel::{HaversineTravelModel, TravelModel};
use ridepool_core::spatial::GeoPoint;
use ridepool_core::{DispatchConfig, Simulation};
use ridepool_experiments::export::{export_schedule_csv, schedule_legs};
use ridepool_experiments::{read_requests_csv, read_travel_table_csv, summarize};
use tempfile::TempDir;

const REQUESTS: &str = "\
id,origin_lat,origin_lng,destination_lat,destination_lng,request_time_ms,submitted_at_ms,passengers
1,52.500,13.400,52.536,13.400,0,0,1
2,52.509,13.400,52.536,13.400,120000,0,1
3,52.540,13.380,52.500,13.420,3600000,,2
";

fn config() -> DispatchConfig {
    DispatchConfig::default()
        .with_num_vehicles(2)
        .with_start_locations(vec![GeoPoint::new(52.500, 13.400)])
        .with_parallel(false)
}

#[test]
fn imported_requests_run_end_to_end() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("requests.csv");
    fs::write(&path, REQUESTS).unwrap();

    let records = read_requests_csv(&path, None).unwrap();
    assert_eq!(records.len(), 3);

    let config = config();
    let travel = HaversineTravelModel::new(config.speed_kmh);
    let report = Simulation::with_haversine(&config).unwrap().run(&records).unwrap();
    let summary = summarize(&report, &travel);

    assert_eq!(summary.total_requests, 3);
    assert_eq!(summary.committed, 3);
    assert!(summary.total_distance_km > 0.0);

    let legs = schedule_legs(&report.schedules, &travel, config.dwell_ms);
    let out = dir.path().join("schedule.csv");
    export_schedule_csv(&legs, &out).unwrap();
    let written = fs::read_to_string(out).unwrap();
    assert_eq!(written.lines().count(), 1 + 2 * 3);
}

#[test]
fn travel_table_changes_schedule_times() {
    let dir = TempDir::new().unwrap();
    let requests = dir.path().join("requests.csv");
    fs::write(&requests, REQUESTS).unwrap();
    // Start location to the first destination takes an hour instead of minutes.
    let table = dir.path().join("travel.csv");
    fs::write(
        &table,
        "from_lat,from_lng,to_lat,to_lng,distance_km,duration_s\n\
         52.500,13.400,52.536,13.400,4.0,3600\n",
    )
    .unwrap();

    let config = config();
    let records = read_requests_csv(&requests, None).unwrap();
    let table = read_travel_table_csv(
        &table,
        config.resolution().unwrap(),
        HaversineTravelModel::new(config.speed_kmh),
    )
    .unwrap();
    assert_eq!(table.len(), 1);
    let travel: Arc<dyn TravelModel> = Arc::new(table);

    let with_table = Simulation::new(&config, travel).unwrap().run(&records).unwrap();
    let straight = Simulation::with_haversine(&config).unwrap().run(&records).unwrap();

    let first_dropoff = |report: &ridepool_core::SimulationReport| {
        report.outcomes[0].assigned_dropoff_time_ms
    };
    assert!(first_dropoff(&with_table) > first_dropoff(&straight));
}
