use std::fmt;

use crate::constraints::Violation;
use crate::fleet::VehicleId;
use crate::request::RequestId;

/// Fatal dispatch errors. A request that simply cannot be served is a rejection, not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// The record cannot be turned into a request (bad coordinates, no passengers).
    InvalidRequest { id: RequestId, reason: String },
    /// Submission time went backwards.
    OutOfOrderRequest {
        id: RequestId,
        submitted_at_ms: u64,
        previous_ms: u64,
    },
    DuplicateRequest(RequestId),
    UnknownVehicle(VehicleId),
    /// The candidate was built against another vehicle or an older route revision.
    StaleCandidate {
        vehicle: VehicleId,
        candidate_vehicle: VehicleId,
        route_revision: u64,
        candidate_revision: u64,
    },
    /// A route about to be committed breaks a hard rule.
    InvariantViolation {
        vehicle: VehicleId,
        violation: Violation,
    },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::InvalidRequest { id, reason } => {
                write!(f, "invalid request {id}: {reason}")
            }
            DispatchError::OutOfOrderRequest {
                id,
                submitted_at_ms,
                previous_ms,
            } => write!(
                f,
                "request {id} submitted at {submitted_at_ms}ms after a request submitted at {previous_ms}ms"
            ),
            DispatchError::DuplicateRequest(id) => write!(f, "duplicate request id {id}"),
            DispatchError::UnknownVehicle(id) => write!(f, "unknown vehicle {id}"),
            DispatchError::StaleCandidate {
                vehicle,
                candidate_vehicle,
                route_revision,
                candidate_revision,
            } => write!(
                f,
                "stale candidate for vehicle {vehicle} (candidate vehicle {candidate_vehicle}, revision {candidate_revision}, route revision {route_revision})"
            ),
            DispatchError::InvariantViolation { vehicle, violation } => {
                write!(f, "route of vehicle {vehicle} is infeasible: {violation}")
            }
        }
    }
}

impl std::error::Error for DispatchError {}
