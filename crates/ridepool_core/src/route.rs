//! Per-vehicle routes: ordered pickup/dropoff stops with derived schedule times.
//!
//! A [`Route`] never changes in place while candidates are explored.
//! [`Route::with_insertion`] builds a [`Candidate`] copy with the new request spliced in and
//! every stop from the pickup onwards re-timed; [`Route::commit`] is the only mutator.
//!
//! Timing rules for a stop following `prev` (the vehicle start at time 0 for the first stop):
//!
//! - departure = `max(prev.scheduled + dwell, now)` (no dwell at the vehicle start)
//! - arrival = departure + travel(prev, stop)
//! - pickup is scheduled at `max(arrival, request_time)`, dropoff at arrival

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use h3o::CellIndex;
use serde::{Deserialize, Serialize};

use crate::constraints::{evaluate, Feasibility};
use crate::error::DispatchError;
use crate::fleet::{VehicleId, VehicleSpec};
use crate::request::{Request, RequestId};
use crate::travel::TravelModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopRole {
    Pickup,
    Dropoff,
}

impl fmt::Display for StopRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopRole::Pickup => write!(f, "pickup"),
            StopRole::Dropoff => write!(f, "dropoff"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stop {
    pub request: Arc<Request>,
    pub role: StopRole,
    pub location: CellIndex,
    pub scheduled_ms: u64,
}

impl Stop {
    /// An unscheduled stop at the request's origin or destination.
    pub fn new(request: Arc<Request>, role: StopRole) -> Self {
        let location = match role {
            StopRole::Pickup => request.origin,
            StopRole::Dropoff => request.destination,
        };
        Self {
            request,
            role,
            location,
            scheduled_ms: 0,
        }
    }

    pub fn request_id(&self) -> RequestId {
        self.request.id
    }

    /// Occupancy change when the stop is served.
    pub fn passenger_delta(&self) -> i64 {
        match self.role {
            StopRole::Pickup => i64::from(self.request.passengers),
            StopRole::Dropoff => -i64::from(self.request.passengers),
        }
    }
}

/// What re-timing needs: travel estimates, dwell per stop and the dispatch time.
#[derive(Clone, Copy)]
pub struct TimingContext<'a> {
    pub travel: &'a dyn TravelModel,
    pub dwell_ms: u64,
    pub now_ms: u64,
}

impl fmt::Debug for TimingContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimingContext")
            .field("dwell_ms", &self.dwell_ms)
            .field("now_ms", &self.now_ms)
            .finish_non_exhaustive()
    }
}

/// How much an already accepted dropoff moves because of an insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropoffShift {
    pub request: RequestId,
    pub shift_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InsertionMeta {
    /// Existing dropoffs the insertion pushes later, with their added delay. Dropoffs
    /// whose schedule does not move are left out.
    pub dropoff_shifts: Vec<DropoffShift>,
    /// Distinct requests on board between the new pickup and dropoff, the new one included.
    pub pooled_requests: usize,
}

/// A proposed route for one vehicle with one new request spliced in.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub vehicle: VehicleId,
    pub base_revision: u64,
    /// Pickup is inserted before original index `pickup_pos`.
    pub pickup_pos: usize,
    /// Dropoff is inserted before original index `dropoff_pos`.
    pub dropoff_pos: usize,
    pub request: Arc<Request>,
    pub stops: Vec<Stop>,
    pub meta: InsertionMeta,
}

impl Candidate {
    pub fn pickup_index(&self) -> usize {
        self.pickup_pos
    }

    /// Index of the new dropoff in `stops`, shifted by the inserted pickup.
    pub fn dropoff_index(&self) -> usize {
        self.dropoff_pos + 1
    }

    pub fn pickup_ms(&self) -> u64 {
        self.stops[self.pickup_index()].scheduled_ms
    }

    pub fn dropoff_ms(&self) -> u64 {
        self.stops[self.dropoff_index()].scheduled_ms
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    vehicle: VehicleSpec,
    stops: Vec<Stop>,
    revision: u64,
}

impl Route {
    pub fn new(vehicle: VehicleSpec) -> Self {
        Self {
            vehicle,
            stops: Vec::new(),
            revision: 0,
        }
    }

    pub fn vehicle(&self) -> &VehicleSpec {
        &self.vehicle
    }

    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    pub fn len(&self) -> usize {
        self.stops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Bumped by every commit.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of leading stops already served at `now_ms`.
    pub fn locked_len(&self, now_ms: u64) -> usize {
        self.stops
            .iter()
            .take_while(|stop| stop.scheduled_ms <= now_ms)
            .count()
    }

    /// Location of the last stop served at or before `at_ms`, else the vehicle start.
    pub fn position_at(&self, at_ms: u64) -> CellIndex {
        self.stops[..self.locked_len(at_ms)]
            .last()
            .map_or(self.vehicle.start, |stop| stop.location)
    }

    /// Number of requests bound to this route.
    pub fn served_requests(&self) -> usize {
        self.stops
            .iter()
            .filter(|stop| stop.role == StopRole::Pickup)
            .count()
    }

    /// Passengers on board after each stop.
    pub fn occupancy_profile(&self) -> Vec<u32> {
        let mut occupancy: i64 = 0;
        self.stops
            .iter()
            .map(|stop| {
                occupancy += stop.passenger_delta();
                occupancy.max(0) as u32
            })
            .collect()
    }

    /// Splice `request` in with its pickup before original index `pickup_pos` and its dropoff
    /// before original index `dropoff_pos` (`pickup_pos <= dropoff_pos <= len`). The route
    /// itself is left untouched.
    pub fn with_insertion(
        &self,
        pickup_pos: usize,
        dropoff_pos: usize,
        request: Arc<Request>,
        timing: &TimingContext<'_>,
    ) -> Candidate {
        debug_assert!(pickup_pos <= dropoff_pos && dropoff_pos <= self.stops.len());

        let mut stops = Vec::with_capacity(self.stops.len() + 2);
        stops.extend_from_slice(&self.stops[..pickup_pos]);
        stops.push(Stop::new(Arc::clone(&request), StopRole::Pickup));
        stops.extend_from_slice(&self.stops[pickup_pos..dropoff_pos]);
        stops.push(Stop::new(Arc::clone(&request), StopRole::Dropoff));
        stops.extend_from_slice(&self.stops[dropoff_pos..]);

        retime(&mut stops, self.vehicle.start, pickup_pos, timing);

        let dropoff_index = dropoff_pos + 1;
        let dropoff_shifts = stops
            .iter()
            .enumerate()
            .skip(pickup_pos + 1)
            .filter(|(index, stop)| *index != dropoff_index && stop.role == StopRole::Dropoff)
            .map(|(index, stop)| {
                let original = if index < dropoff_index { index - 1 } else { index - 2 };
                DropoffShift {
                    request: stop.request.id,
                    shift_ms: stop
                        .scheduled_ms
                        .saturating_sub(self.stops[original].scheduled_ms),
                    max_delay_ms: stop.request.max_delay_ms,
                }
            })
            .filter(|shift| shift.shift_ms > 0)
            .collect();

        let pooled_requests = pooled_between(&stops, pickup_pos, dropoff_index);

        Candidate {
            vehicle: self.vehicle.id,
            base_revision: self.revision,
            pickup_pos,
            dropoff_pos,
            request,
            stops,
            meta: InsertionMeta {
                dropoff_shifts,
                pooled_requests,
            },
        }
    }

    /// Apply a candidate built from this route's current revision. The stop sequence is
    /// re-checked before it replaces the current one; on error the route is unchanged.
    pub fn commit(&mut self, candidate: Candidate) -> Result<(), DispatchError> {
        if candidate.vehicle != self.vehicle.id || candidate.base_revision != self.revision {
            return Err(DispatchError::StaleCandidate {
                vehicle: self.vehicle.id,
                candidate_vehicle: candidate.vehicle,
                route_revision: self.revision,
                candidate_revision: candidate.base_revision,
            });
        }
        if let Feasibility::Infeasible(violation) = evaluate(&candidate.stops, self.vehicle.capacity)
        {
            return Err(DispatchError::InvariantViolation {
                vehicle: self.vehicle.id,
                violation,
            });
        }
        self.stops = candidate.stops;
        self.revision += 1;
        Ok(())
    }
}

/// Recompute scheduled times from index `from` to the end.
fn retime(stops: &mut [Stop], start: CellIndex, from: usize, timing: &TimingContext<'_>) {
    for index in from..stops.len() {
        let (prev_location, ready_ms) = match index {
            0 => (start, 0),
            _ => {
                let prev = &stops[index - 1];
                (prev.location, prev.scheduled_ms.saturating_add(timing.dwell_ms))
            }
        };
        let departure_ms = ready_ms.max(timing.now_ms);
        let stop = &mut stops[index];
        let arrival_ms =
            departure_ms.saturating_add(timing.travel.travel_ms(prev_location, stop.location));
        stop.scheduled_ms = match stop.role {
            StopRole::Pickup => arrival_ms.max(stop.request.request_time_ms),
            StopRole::Dropoff => arrival_ms,
        };
    }
}

/// Distinct requests on board anywhere from `pickup_index` to `dropoff_index`.
fn pooled_between(stops: &[Stop], pickup_index: usize, dropoff_index: usize) -> usize {
    let mut on_board = HashSet::new();
    for stop in &stops[..pickup_index] {
        match stop.role {
            StopRole::Pickup => on_board.insert(stop.request.id),
            StopRole::Dropoff => on_board.remove(&stop.request.id),
        };
    }
    let boarding_between = stops[pickup_index..dropoff_index]
        .iter()
        .filter(|stop| stop.role == StopRole::Pickup)
        .count();
    on_board.len() + boarding_between
}
