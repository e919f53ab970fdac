//! Read-only statistics over a finished dispatch run.
//!
//! Distances are measured with the same travel model the run used, leg by leg from each
//! vehicle's start location through its committed stops.

use std::collections::HashSet;

use ridepool_core::route::{Route, StopRole};
use ridepool_core::travel::TravelModel;
use ridepool_core::{RequestId, SimulationReport, VehicleId};
use serde::Serialize;

/// Per-vehicle totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleStats {
    pub vehicle_id: VehicleId,
    pub name: String,
    pub capacity: u32,
    pub served_requests: usize,
    pub stops: usize,
    pub distance_km: f64,
    pub occupied_km: f64,
    pub passenger_km: f64,
    pub max_occupancy: u32,
}

/// Aggregated metrics of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationSummary {
    pub total_requests: usize,
    pub committed: usize,
    pub rejected: usize,
    /// committed / total requests.
    pub acceptance_rate: f64,
    /// Share of committed requests that shared the vehicle with another request.
    pub pooled_share: f64,
    pub avg_pickup_delay_ms: f64,
    pub median_pickup_delay_ms: f64,
    pub p90_pickup_delay_ms: f64,
    pub avg_dropoff_delay_ms: f64,
    pub median_dropoff_delay_ms: f64,
    pub p90_dropoff_delay_ms: f64,
    pub total_distance_km: f64,
    pub occupied_distance_km: f64,
    pub passenger_km: f64,
    pub vehicles: Vec<VehicleStats>,
}

impl SimulationSummary {
    /// Calculate statistics from a vector of values.
    pub(crate) fn calculate_stats(values: &[u64]) -> (f64, f64, f64) {
        if values.is_empty() {
            return (0.0, 0.0, 0.0);
        }

        let mut sorted = values.to_vec();
        sorted.sort_unstable();

        let avg = sorted.iter().sum::<u64>() as f64 / sorted.len() as f64;
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
        } else {
            sorted[mid] as f64
        };
        let p90_idx = ((sorted.len() - 1) as f64 * 0.9) as usize;
        let p90 = sorted[p90_idx] as f64;

        (avg, median, p90)
    }
}

/// Walk a route's legs and collect distances plus the ids of requests that rode together.
fn vehicle_stats(
    route: &Route,
    travel: &dyn TravelModel,
    pooled: &mut HashSet<RequestId>,
) -> VehicleStats {
    let vehicle = route.vehicle();
    let occupancy = route.occupancy_profile();

    let mut position = vehicle.start;
    let mut on_board_passengers = 0u32;
    let mut on_board: Vec<RequestId> = Vec::new();
    let (mut distance_km, mut occupied_km, mut passenger_km) = (0.0, 0.0, 0.0);

    for (stop, &after) in route.stops().iter().zip(&occupancy) {
        let leg_km = travel.distance_km(position, stop.location);
        distance_km += leg_km;
        if on_board_passengers > 0 {
            occupied_km += leg_km;
            passenger_km += leg_km * f64::from(on_board_passengers);
        }

        match stop.role {
            StopRole::Pickup => {
                if !on_board.is_empty() {
                    pooled.extend(on_board.iter().copied());
                    pooled.insert(stop.request_id());
                }
                on_board.push(stop.request_id());
            }
            StopRole::Dropoff => on_board.retain(|id| *id != stop.request_id()),
        }
        position = stop.location;
        on_board_passengers = after;
    }

    VehicleStats {
        vehicle_id: vehicle.id,
        name: vehicle.name.clone(),
        capacity: vehicle.capacity,
        served_requests: route.served_requests(),
        stops: route.len(),
        distance_km,
        occupied_km,
        passenger_km,
        max_occupancy: occupancy.iter().copied().max().unwrap_or(0),
    }
}

/// Summarize the final schedules and outcomes of a run.
pub fn summarize(report: &SimulationReport, travel: &dyn TravelModel) -> SimulationSummary {
    let mut pooled = HashSet::new();
    let vehicles: Vec<VehicleStats> = report
        .schedules
        .routes()
        .map(|route| vehicle_stats(route, travel, &mut pooled))
        .collect();

    let mut pickup_delays = Vec::new();
    let mut dropoff_delays = Vec::new();
    for stop in report.schedules.routes().flat_map(|route| route.stops()) {
        match stop.role {
            StopRole::Pickup => pickup_delays.push(stop.request.pickup_delay_ms(stop.scheduled_ms)),
            StopRole::Dropoff => {
                dropoff_delays.push(stop.request.dropoff_delay_ms(stop.scheduled_ms))
            }
        }
    }
    let (avg_pickup, median_pickup, p90_pickup) =
        SimulationSummary::calculate_stats(&pickup_delays);
    let (avg_dropoff, median_dropoff, p90_dropoff) =
        SimulationSummary::calculate_stats(&dropoff_delays);

    let total_requests = report.outcomes.len();
    let committed = report.committed();
    let ratio = |part: usize, whole: usize| {
        if whole > 0 {
            part as f64 / whole as f64
        } else {
            0.0
        }
    };

    SimulationSummary {
        total_requests,
        committed,
        rejected: report.rejections.len(),
        acceptance_rate: ratio(committed, total_requests),
        pooled_share: ratio(pooled.len(), committed),
        avg_pickup_delay_ms: avg_pickup,
        median_pickup_delay_ms: median_pickup,
        p90_pickup_delay_ms: p90_pickup,
        avg_dropoff_delay_ms: avg_dropoff,
        median_dropoff_delay_ms: median_dropoff,
        p90_dropoff_delay_ms: p90_dropoff,
        total_distance_km: vehicles.iter().map(|v| v.distance_km).sum(),
        occupied_distance_km: vehicles.iter().map(|v| v.occupied_km).sum(),
        passenger_km: vehicles.iter().map(|v| v.passenger_km).sum(),
        vehicles,
    }
}
