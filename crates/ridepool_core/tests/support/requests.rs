#![allow(dead_code)]

use std::sync::Arc;

use ridepool_core::request::RequestPolicy;
use ridepool_core::spatial::GeoPoint;
use ridepool_core::travel::TravelModel;
use ridepool_core::{Request, RequestId, RequestRecord};

const LINE_ORIGIN_LAT: f64 = 52.50;
const LINE_LNG: f64 = 13.40;
const LINE_STEP_DEG: f64 = 0.009;

/// Point `step` kilometres (approx.) north of the seeded line origin.
pub fn line_point(step: u32) -> GeoPoint {
    offset_point(step, 0.0)
}

/// Point at `step` along the line, moved `east_km` east of it.
pub fn offset_point(step: u32, east_km: f64) -> GeoPoint {
    let lat = LINE_ORIGIN_LAT + LINE_STEP_DEG * f64::from(step);
    let lng = LINE_LNG + east_km / (111.32 * lat.to_radians().cos());
    GeoPoint::new(lat, lng)
}

/// A one-passenger record submitted at `submitted_at_ms`.
pub fn record(
    id: u64,
    origin: GeoPoint,
    destination: GeoPoint,
    request_time_ms: u64,
    submitted_at_ms: u64,
) -> RequestRecord {
    RequestRecord {
        id: RequestId(id),
        origin,
        destination,
        request_time_ms,
        submitted_at_ms: Some(submitted_at_ms),
        passenger_count: 1,
    }
}

pub fn with_passengers(mut record: RequestRecord, passengers: u32) -> RequestRecord {
    record.passenger_count = passengers;
    record
}

pub fn build_request(
    record: &RequestRecord,
    policy: &RequestPolicy,
    travel: &dyn TravelModel,
) -> Arc<Request> {
    Arc::new(Request::from_record(record, policy, travel).expect("valid test record"))
}
