//! Feasibility rules for a stop sequence: ordering, timing, capacity and delay bounds.

use std::collections::HashSet;
use std::fmt;

use crate::request::RequestId;
use crate::route::{Stop, StopRole};

/// The first rule a stop sequence breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    /// Passengers on board after stop `index` exceed the vehicle's seats.
    CapacityExceeded {
        index: usize,
        occupancy: u32,
        capacity: u32,
    },
    /// The stop at `index` is later than its request allows.
    DelayExceeded {
        request: RequestId,
        index: usize,
        delay_ms: u64,
        max_delay_ms: u64,
    },
    /// Stop `index` is scheduled before its predecessor.
    TimeRegression { index: usize },
    /// Pickup/dropoff pairing is broken (missing, duplicated or reversed).
    OrderBroken { request: RequestId },
}

impl Violation {
    /// Structural breaches can only come from a bug in route construction.
    pub fn is_structural(&self) -> bool {
        matches!(self, Violation::OrderBroken { .. })
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::CapacityExceeded {
                index,
                occupancy,
                capacity,
            } => write!(
                f,
                "occupancy {occupancy} exceeds capacity {capacity} after stop {index}"
            ),
            Violation::DelayExceeded {
                request,
                index,
                delay_ms,
                max_delay_ms,
            } => write!(
                f,
                "request {request} delayed {delay_ms}ms at stop {index} (max {max_delay_ms}ms)"
            ),
            Violation::TimeRegression { index } => {
                write!(f, "stop {index} is scheduled before its predecessor")
            }
            Violation::OrderBroken { request } => {
                write!(f, "pickup/dropoff order broken for request {request}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feasibility {
    Feasible,
    Infeasible(Violation),
}

impl Feasibility {
    pub fn is_feasible(&self) -> bool {
        matches!(self, Feasibility::Feasible)
    }
}

/// Check a stop sequence against a vehicle's seat count.
///
/// Structural pairing is checked over the whole sequence first, then the sequence is walked
/// once for timing, occupancy and deadlines. The first breach found is returned.
pub fn evaluate(stops: &[Stop], capacity: u32) -> Feasibility {
    if let Some(violation) = check_pairing(stops) {
        return Feasibility::Infeasible(violation);
    }

    let mut occupancy: u32 = 0;
    let mut previous_ms: Option<u64> = None;
    for (index, stop) in stops.iter().enumerate() {
        if previous_ms.is_some_and(|prev| stop.scheduled_ms < prev) {
            return Feasibility::Infeasible(Violation::TimeRegression { index });
        }
        previous_ms = Some(stop.scheduled_ms);

        let request = &stop.request;
        let delay_ms = match stop.role {
            StopRole::Pickup => {
                occupancy = occupancy.saturating_add(request.passengers);
                request.pickup_delay_ms(stop.scheduled_ms)
            }
            StopRole::Dropoff => {
                occupancy = occupancy.saturating_sub(request.passengers);
                request.dropoff_delay_ms(stop.scheduled_ms)
            }
        };
        if occupancy > capacity {
            return Feasibility::Infeasible(Violation::CapacityExceeded {
                index,
                occupancy,
                capacity,
            });
        }
        if delay_ms > request.max_delay_ms {
            return Feasibility::Infeasible(Violation::DelayExceeded {
                request: request.id,
                index,
                delay_ms,
                max_delay_ms: request.max_delay_ms,
            });
        }
    }
    Feasibility::Feasible
}

fn check_pairing(stops: &[Stop]) -> Option<Violation> {
    let mut picked = HashSet::new();
    let mut dropped = HashSet::new();
    for stop in stops {
        let id = stop.request.id;
        let ok = match stop.role {
            StopRole::Pickup => picked.insert(id),
            StopRole::Dropoff => picked.contains(&id) && dropped.insert(id),
        };
        if !ok {
            return Some(Violation::OrderBroken { request: id });
        }
    }
    // Sorted so the reported request does not depend on hash order.
    let mut open: Vec<_> = picked.difference(&dropped).copied().collect();
    open.sort();
    open.first().map(|&request| Violation::OrderBroken { request })
}
