//! Result export: schedules, outcomes, rejections, summaries and sweep tables.
//!
//! Every exporter takes a path, creates (or truncates) the file and writes one artifact.

use std::path::Path;

use ridepool_core::route::StopRole;
use ridepool_core::spatial::GeoPoint;
use ridepool_core::travel::TravelModel;
use ridepool_core::{FleetState, Rejection, RequestId, RequestOutcome, VehicleId};
use serde::Serialize;

use crate::metrics::SimulationSummary;
use crate::sweep::SweepResult;

#[path = "export/csv.rs"]
mod csv;
#[path = "export/json.rs"]
mod json;
#[path = "export/parquet.rs"]
mod parquet;
#[path = "export/writer_utils.rs"]
mod writer_utils;

/// One driven leg of a committed schedule, ending at a stop.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScheduleLeg {
    pub vehicle_id: VehicleId,
    pub vehicle_name: String,
    pub stop_index: usize,
    pub from: GeoPoint,
    pub to: GeoPoint,
    /// Previous stop's scheduled time plus dwell (0 for the first leg).
    pub departure_ms: u64,
    pub driving_ms: u64,
    /// Idle time between arriving and serving the stop.
    pub pause_ms: u64,
    pub scheduled_ms: u64,
    pub distance_km: f64,
    pub role: StopRole,
    pub request_id: RequestId,
    pub passengers: u32,
    pub occupancy: u32,
}

/// Flatten the fleet's routes into legs, vehicle by vehicle in id order.
pub fn schedule_legs(fleet: &FleetState, travel: &dyn TravelModel, dwell_ms: u64) -> Vec<ScheduleLeg> {
    let mut legs = Vec::new();
    for route in fleet.routes() {
        let vehicle = route.vehicle();
        let mut position = vehicle.start;
        let mut departure_ms = 0;
        for (index, (stop, occupancy)) in route
            .stops()
            .iter()
            .zip(route.occupancy_profile())
            .enumerate()
        {
            let driving_ms = travel.travel_ms(position, stop.location);
            legs.push(ScheduleLeg {
                vehicle_id: vehicle.id,
                vehicle_name: vehicle.name.clone(),
                stop_index: index,
                from: GeoPoint::from(position),
                to: GeoPoint::from(stop.location),
                departure_ms,
                driving_ms,
                pause_ms: stop.scheduled_ms.saturating_sub(departure_ms + driving_ms),
                scheduled_ms: stop.scheduled_ms,
                distance_km: travel.distance_km(position, stop.location),
                role: stop.role,
                request_id: stop.request_id(),
                passengers: stop.request.passengers,
                occupancy,
            });
            position = stop.location;
            departure_ms = stop.scheduled_ms + dwell_ms;
        }
    }
    legs
}

/// Export schedule legs to CSV.
///
/// # Errors
///
/// Returns an error if file creation or CSV writing fails.
pub fn export_schedule_csv(
    legs: &[ScheduleLeg],
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = writer_utils::create_output_file(path)?;
    csv::export_schedule_impl(legs, file)
}

/// Export schedule stops to Parquet, one row per leg.
///
/// # Errors
///
/// Returns an error if there are no legs, or if file creation or Parquet writing fails.
pub fn export_schedule_parquet(
    legs: &[ScheduleLeg],
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    writer_utils::ensure_not_empty(legs)?;
    let file = writer_utils::create_output_file(path)?;
    parquet::export_schedule_impl(legs, file)
}

/// Export rejected requests to CSV.
pub fn export_rejections_csv(
    rejections: &[Rejection],
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = writer_utils::create_output_file(path)?;
    csv::export_rejections_impl(rejections, file)
}

/// Export per-request outcomes as a pretty-printed JSON array.
pub fn export_outcomes_json(
    outcomes: &[RequestOutcome],
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = writer_utils::create_output_file(path)?;
    json::export_to_json_impl(outcomes, file)
}

pub fn export_summary_json(
    summary: &SimulationSummary,
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = writer_utils::create_output_file(path)?;
    json::export_to_json_impl(summary, file)
}

/// Export sweep results with their ranking scores to CSV.
///
/// Results and scores are paired by index.
///
/// # Errors
///
/// Returns an error if file creation or CSV writing fails, or if the lengths don't match.
pub fn export_sweep_csv(
    results: &[SweepResult],
    scores: &[f64],
    path: impl AsRef<Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    writer_utils::ensure_not_empty(results)?;
    let file = writer_utils::create_output_file(path)?;
    csv::export_sweep_impl(results, scores, file)
}
