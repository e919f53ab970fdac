//! Test helpers for common test setup and utilities.
//!
//! Cells lie on one meridian in Berlin, roughly 1 km apart; at [`TEST_SPEED_KMH`] a vehicle
//! covers one step in about 100 seconds.

use std::sync::Arc;

use h3o::{CellIndex, Resolution};

use crate::fleet::{VehicleId, VehicleSpec};
use crate::request::{DelayTolerance, Request, RequestId, RequestPolicy};
use crate::route::{Stop, StopRole};
use crate::spatial::GeoPoint;
use crate::travel::HaversineTravelModel;

/// A standard test cell used across test files for consistency.
/// This is a valid H3 cell at resolution 10 in the San Francisco Bay Area.
pub const TEST_CELL: u64 = 0x8a1fb46622dffff;

pub const TEST_SPEED_KMH: f64 = 36.0;

const LINE_ORIGIN_LAT: f64 = 52.50;
const LINE_LNG: f64 = 13.40;
/// Degrees of latitude per step (~1.0 km).
const LINE_STEP_DEG: f64 = 0.009;

/// Get the test cell as a `CellIndex`.
///
/// # Panics
///
/// Panics if the test cell constant is invalid (should never happen).
pub fn test_cell() -> CellIndex {
    CellIndex::try_from(TEST_CELL).expect("TEST_CELL should be a valid H3 cell")
}

/// Cell `step` kilometres north of the line origin (resolution 12).
pub fn line_cell(step: u32) -> CellIndex {
    offset_cell(step, 0.0)
}

/// Cell at `step` along the line, moved `east_km` to the east.
pub fn offset_cell(step: u32, east_km: f64) -> CellIndex {
    let lat = LINE_ORIGIN_LAT + LINE_STEP_DEG * f64::from(step);
    let lng = LINE_LNG + east_km / (111.32 * lat.to_radians().cos());
    GeoPoint::new(lat, lng)
        .to_cell(Resolution::Twelve)
        .expect("line cells are valid coordinates")
}

pub fn test_travel() -> HaversineTravelModel {
    HaversineTravelModel::new(TEST_SPEED_KMH)
}

/// Zero dwell, generous tolerance.
pub fn test_policy() -> RequestPolicy {
    RequestPolicy {
        resolution: Resolution::Twelve,
        dwell_ms: 0,
        tolerance: DelayTolerance::default(),
    }
}

pub fn test_vehicle(id: u32, capacity: u32, start: CellIndex) -> VehicleSpec {
    VehicleSpec::new(VehicleId(id), capacity, start)
}

/// One-passenger request between two cells, timed with [`test_travel`].
pub fn test_request_between(
    id: u64,
    origin: CellIndex,
    destination: CellIndex,
    request_time_ms: u64,
) -> Arc<Request> {
    Arc::new(Request::new(
        RequestId(id),
        origin,
        destination,
        request_time_ms,
        1,
        &test_policy(),
        &test_travel(),
    ))
}

/// Request from line step 0 to step 2.
pub fn test_request(id: u64, request_time_ms: u64, passengers: u32) -> Arc<Request> {
    let mut request = Request::clone(&test_request_between(
        id,
        line_cell(0),
        line_cell(2),
        request_time_ms,
    ));
    request.passengers = passengers;
    Arc::new(request)
}

/// A stop with an explicit schedule time.
pub fn stop(request: &Arc<Request>, role: StopRole, scheduled_ms: u64) -> Stop {
    Stop {
        scheduled_ms,
        ..Stop::new(Arc::clone(request), role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::distance_km_between_cells;

    #[test]
    fn test_cell_is_valid() {
        assert_eq!(test_cell(), CellIndex::try_from(TEST_CELL).unwrap());
    }

    #[test]
    fn line_cells_are_about_a_kilometre_apart() {
        let d = distance_km_between_cells(line_cell(0), line_cell(1));
        assert!((d - 1.0).abs() < 0.05, "unexpected step {d}");
        let east = distance_km_between_cells(line_cell(1), offset_cell(1, 1.0));
        assert!((east - 1.0).abs() < 0.05, "unexpected offset {east}");
    }

    #[test]
    fn test_request_has_direct_timing() {
        let request = test_request(1, 0, 2);
        assert_eq!(request.passengers, 2);
        assert!(request.direct_travel_ms > 190_000 && request.direct_travel_ms < 210_000);
        assert_eq!(request.earliest_dropoff_ms, request.direct_travel_ms);
    }
}
