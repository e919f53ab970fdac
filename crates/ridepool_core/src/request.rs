//! Ride requests: the inbound record format and the immutable dispatch-ready [`Request`].

use std::fmt;

use h3o::{CellIndex, Resolution};
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;
use crate::spatial::GeoPoint;
use crate::travel::TravelModel;

/// Request identifier as it appears in the inbound stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of the inbound request stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub id: RequestId,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    /// Desired pickup time (simulation ms).
    pub request_time_ms: u64,
    /// When the request reached the dispatcher. Defaults to `request_time_ms`.
    #[serde(default)]
    pub submitted_at_ms: Option<u64>,
    pub passenger_count: u32,
}

impl RequestRecord {
    pub fn submitted_at(&self) -> u64 {
        self.submitted_at_ms.unwrap_or(self.request_time_ms)
    }
}

/// Maximum acceptable delay as a function of the direct travel time:
/// `max_delay = fixed_ms + direct_ratio * direct_travel_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelayTolerance {
    pub fixed_ms: u64,
    pub direct_ratio: f64,
}

impl DelayTolerance {
    pub fn new(fixed_ms: u64, direct_ratio: f64) -> Self {
        Self {
            fixed_ms,
            direct_ratio,
        }
    }

    /// No delay allowed at all.
    pub fn zero() -> Self {
        Self::new(0, 0.0)
    }

    pub fn max_delay_ms(&self, direct_travel_ms: u64) -> u64 {
        let proportional = (self.direct_ratio.max(0.0) * direct_travel_ms as f64).round() as u64;
        self.fixed_ms.saturating_add(proportional)
    }
}

impl Default for DelayTolerance {
    fn default() -> Self {
        // 10 minutes plus half the direct ride.
        Self::new(10 * 60 * 1000, 0.5)
    }
}

/// Parameters shared by every request of a run: snapping resolution, dwell time and
/// delay tolerance.
#[derive(Debug, Clone, Copy)]
pub struct RequestPolicy {
    pub resolution: Resolution,
    pub dwell_ms: u64,
    pub tolerance: DelayTolerance,
}

/// A dispatch-ready request. Immutable once built; stops share it through an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: RequestId,
    pub origin: CellIndex,
    pub destination: CellIndex,
    pub request_time_ms: u64,
    pub submitted_at_ms: u64,
    pub passengers: u32,
    pub direct_travel_ms: u64,
    pub direct_distance_km: f64,
    pub max_delay_ms: u64,
    /// `request_time + dwell + direct_travel`: the dropoff time of an undisturbed direct ride.
    pub earliest_dropoff_ms: u64,
}

impl Request {
    pub fn new(
        id: RequestId,
        origin: CellIndex,
        destination: CellIndex,
        request_time_ms: u64,
        passengers: u32,
        policy: &RequestPolicy,
        travel: &dyn TravelModel,
    ) -> Self {
        let direct_travel_ms = travel.travel_ms(origin, destination);
        let direct_distance_km = travel.distance_km(origin, destination);
        Self {
            id,
            origin,
            destination,
            request_time_ms,
            submitted_at_ms: request_time_ms,
            passengers,
            direct_travel_ms,
            direct_distance_km,
            max_delay_ms: policy.tolerance.max_delay_ms(direct_travel_ms),
            earliest_dropoff_ms: request_time_ms
                .saturating_add(policy.dwell_ms)
                .saturating_add(direct_travel_ms),
        }
    }

    pub fn with_submitted_at(mut self, submitted_at_ms: u64) -> Self {
        self.submitted_at_ms = submitted_at_ms;
        self
    }

    /// Snap a record's coordinates and derive direct travel and delay bounds.
    pub fn from_record(
        record: &RequestRecord,
        policy: &RequestPolicy,
        travel: &dyn TravelModel,
    ) -> Result<Self, DispatchError> {
        if record.passenger_count == 0 {
            return Err(DispatchError::InvalidRequest {
                id: record.id,
                reason: "passenger count must be at least 1".to_string(),
            });
        }
        let origin = record
            .origin
            .to_cell(policy.resolution)
            .ok_or_else(|| DispatchError::InvalidRequest {
                id: record.id,
                reason: format!("invalid origin {:?}", record.origin),
            })?;
        let destination = record
            .destination
            .to_cell(policy.resolution)
            .ok_or_else(|| DispatchError::InvalidRequest {
                id: record.id,
                reason: format!("invalid destination {:?}", record.destination),
            })?;

        Ok(Self::new(
            record.id,
            origin,
            destination,
            record.request_time_ms,
            record.passenger_count,
            policy,
            travel,
        )
        .with_submitted_at(record.submitted_at()))
    }

    pub fn latest_pickup_ms(&self) -> u64 {
        self.request_time_ms.saturating_add(self.max_delay_ms)
    }

    pub fn latest_dropoff_ms(&self) -> u64 {
        self.earliest_dropoff_ms.saturating_add(self.max_delay_ms)
    }

    pub fn pickup_delay_ms(&self, scheduled_ms: u64) -> u64 {
        scheduled_ms.saturating_sub(self.request_time_ms)
    }

    pub fn dropoff_delay_ms(&self, scheduled_ms: u64) -> u64 {
        scheduled_ms.saturating_sub(self.earliest_dropoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::travel::HaversineTravelModel;

    fn policy(tolerance: DelayTolerance) -> RequestPolicy {
        RequestPolicy {
            resolution: Resolution::Twelve,
            dwell_ms: 60_000,
            tolerance,
        }
    }

    fn record(id: u64) -> RequestRecord {
        RequestRecord {
            id: RequestId(id),
            origin: GeoPoint::new(52.50, 13.40),
            destination: GeoPoint::new(52.52, 13.40),
            request_time_ms: 1_000_000,
            submitted_at_ms: None,
            passenger_count: 2,
        }
    }

    #[test]
    fn tolerance_combines_fixed_and_proportional_parts() {
        let tolerance = DelayTolerance::new(120_000, 0.5);
        assert_eq!(tolerance.max_delay_ms(600_000), 420_000);
        assert_eq!(DelayTolerance::zero().max_delay_ms(600_000), 0);
    }

    #[test]
    fn from_record_derives_bounds() {
        let travel = HaversineTravelModel::new(36.0);
        let request =
            Request::from_record(&record(7), &policy(DelayTolerance::new(60_000, 0.0)), &travel)
                .expect("valid record");

        assert_eq!(request.submitted_at_ms, 1_000_000);
        assert!(request.direct_travel_ms > 200_000);
        assert_eq!(request.max_delay_ms, 60_000);
        assert_eq!(request.latest_pickup_ms(), 1_060_000);
        assert_eq!(
            request.earliest_dropoff_ms,
            1_000_000 + 60_000 + request.direct_travel_ms
        );
        assert_eq!(request.dropoff_delay_ms(request.earliest_dropoff_ms - 5), 0);
    }

    #[test]
    fn from_record_rejects_bad_input() {
        let travel = HaversineTravelModel::default();
        let mut empty = record(1);
        empty.passenger_count = 0;
        assert!(matches!(
            Request::from_record(&empty, &policy(DelayTolerance::default()), &travel),
            Err(DispatchError::InvalidRequest { .. })
        ));

        let mut off_map = record(2);
        off_map.destination = GeoPoint::new(123.0, 13.4);
        assert!(Request::from_record(&off_map, &policy(DelayTolerance::default()), &travel).is_err());
    }

    #[test]
    fn explicit_submission_time_is_kept() {
        let travel = HaversineTravelModel::default();
        let mut early = record(3);
        early.submitted_at_ms = Some(400_000);
        let request = Request::from_record(&early, &policy(DelayTolerance::default()), &travel)
            .expect("valid record");
        assert_eq!(request.submitted_at_ms, 400_000);
        assert_eq!(request.request_time_ms, 1_000_000);
    }
}
