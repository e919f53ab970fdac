//! Greedy request-at-a-time insertion.
//!
//! For each request every vehicle's route is expanded into its insertion candidates,
//! infeasible ones are dropped, the survivors are scored and the single cheapest one is
//! committed. Ties go to the lowest vehicle id, then the lowest `(pickup, dropoff)` position.
//! Vehicles can be evaluated on the rayon pool; the reduction is order independent, so the
//! decision is the same either way.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, error, trace};

use crate::candidates::CandidateGenerator;
use crate::config::{ConfigError, DispatchConfig};
use crate::constraints::{evaluate, Feasibility};
use crate::error::DispatchError;
use crate::fleet::{FleetState, VehicleId};
use crate::objective::{score, CostBreakdown, ObjectiveWeights, ScoringContext};
use crate::request::{Request, RequestId};
use crate::route::{Candidate, Route, TimingContext};
use crate::travel::TravelModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RejectionReason {
    NoFeasibleInsertion,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectionReason::NoFeasibleInsertion => write!(f, "NoFeasibleInsertion"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub request_id: RequestId,
    pub reason: RejectionReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OutcomeKind {
    Committed,
    Rejected,
}

/// Per-request result. Assignment fields are set only for committed requests. `dispatch`
/// reports the schedule at commit; a finished simulation run rewrites the indices and times
/// from the final routes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestOutcome {
    pub request_id: RequestId,
    pub outcome: OutcomeKind,
    pub vehicle_id: Option<VehicleId>,
    pub pickup_index: Option<usize>,
    pub dropoff_index: Option<usize>,
    pub assigned_pickup_time_ms: Option<u64>,
    pub assigned_dropoff_time_ms: Option<u64>,
    pub cost: Option<CostBreakdown>,
}

impl RequestOutcome {
    fn rejected(request_id: RequestId) -> Self {
        Self {
            request_id,
            outcome: OutcomeKind::Rejected,
            vehicle_id: None,
            pickup_index: None,
            dropoff_index: None,
            assigned_pickup_time_ms: None,
            assigned_dropoff_time_ms: None,
            cost: None,
        }
    }

    pub fn is_committed(&self) -> bool {
        self.outcome == OutcomeKind::Committed
    }
}

/// A feasible candidate with its cost.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub cost: CostBreakdown,
}

impl ScoredCandidate {
    fn key(&self) -> (VehicleId, usize, usize) {
        (
            self.candidate.vehicle,
            self.candidate.pickup_pos,
            self.candidate.dropoff_pos,
        )
    }
}

/// Total order used for selection: cost, then vehicle id, then positions.
pub fn compare_scored(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    a.cost
        .total
        .total_cmp(&b.cost.total)
        .then_with(|| a.key().cmp(&b.key()))
}

#[derive(Debug, Default)]
struct VehicleEvaluation {
    best: Option<ScoredCandidate>,
    generated: usize,
    feasible: usize,
}

pub struct Dispatcher {
    fleet: FleetState,
    travel: Arc<dyn TravelModel>,
    weights: ObjectiveWeights,
    max_pickup_radius_km: f64,
    dwell_ms: u64,
    parallel: bool,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("vehicles", &self.fleet.len())
            .field("weights", &self.weights)
            .field("max_pickup_radius_km", &self.max_pickup_radius_km)
            .field("dwell_ms", &self.dwell_ms)
            .field("parallel", &self.parallel)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Validate the configuration and start with one empty route per vehicle.
    pub fn new(config: &DispatchConfig, travel: Arc<dyn TravelModel>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            fleet: FleetState::new(config.vehicle_specs()?),
            travel,
            weights: config.weights,
            max_pickup_radius_km: config.max_pickup_radius_km,
            dwell_ms: config.dwell_ms,
            parallel: config.parallel,
        })
    }

    pub fn fleet(&self) -> &FleetState {
        &self.fleet
    }

    pub fn into_fleet(self) -> FleetState {
        self.fleet
    }

    pub fn travel(&self) -> &dyn TravelModel {
        self.travel.as_ref()
    }

    /// Every feasible candidate for `request`, scored, across the fleet (unsorted).
    /// Infeasible candidates are filtered out; the fleet is not touched.
    pub fn feasible_candidates(
        &self,
        request: &Arc<Request>,
    ) -> Result<Vec<ScoredCandidate>, DispatchError> {
        let fleet_load = self.fleet.total_load();
        let mut scored = Vec::new();
        for route in self.fleet.routes() {
            self.scored_candidates(route, request, fleet_load, |candidate| scored.push(candidate))?;
        }
        Ok(scored)
    }

    /// Decide and apply one request. A request nobody can take is a rejection, not an error.
    pub fn dispatch(&mut self, request: Arc<Request>) -> Result<RequestOutcome, DispatchError> {
        let fleet_load = self.fleet.total_load();
        let evaluations: Vec<VehicleEvaluation> = if self.parallel {
            self.fleet
                .route_map()
                .par_iter()
                .map(|(_, route)| self.evaluate_vehicle(route, &request, fleet_load))
                .collect::<Result<_, _>>()?
        } else {
            self.fleet
                .routes()
                .map(|route| self.evaluate_vehicle(route, &request, fleet_load))
                .collect::<Result<_, _>>()?
        };

        let generated: usize = evaluations.iter().map(|e| e.generated).sum();
        let feasible: usize = evaluations.iter().map(|e| e.feasible).sum();
        trace!(
            request = %request.id,
            generated,
            feasible,
            "Evaluated insertion candidates"
        );

        let best = evaluations
            .into_iter()
            .filter_map(|evaluation| evaluation.best)
            .min_by(compare_scored);

        let Some(ScoredCandidate { candidate, cost }) = best else {
            debug!(request = %request.id, "Rejected: no feasible insertion");
            return Ok(RequestOutcome::rejected(request.id));
        };

        let outcome = RequestOutcome {
            request_id: request.id,
            outcome: OutcomeKind::Committed,
            vehicle_id: Some(candidate.vehicle),
            pickup_index: Some(candidate.pickup_index()),
            dropoff_index: Some(candidate.dropoff_index()),
            assigned_pickup_time_ms: Some(candidate.pickup_ms()),
            assigned_dropoff_time_ms: Some(candidate.dropoff_ms()),
            cost: Some(cost),
        };
        let vehicle = candidate.vehicle;
        if let Err(err) = self.fleet.route_mut(vehicle)?.commit(candidate) {
            error!(request = %request.id, vehicle = %vehicle, error = %err, "Commit refused");
            return Err(err);
        }
        debug!(
            request = %request.id,
            vehicle = %vehicle,
            pickup_ms = ?outcome.assigned_pickup_time_ms,
            dropoff_ms = ?outcome.assigned_dropoff_time_ms,
            cost = cost.total,
            "Committed"
        );
        Ok(outcome)
    }

    fn generator<'a>(&'a self, route: &'a Route, request: &Arc<Request>) -> CandidateGenerator<'a> {
        CandidateGenerator::new(
            route,
            Arc::clone(request),
            TimingContext {
                travel: self.travel.as_ref(),
                dwell_ms: self.dwell_ms,
                now_ms: request.submitted_at_ms,
            },
        )
    }

    fn scoring_context<'a>(
        &'a self,
        route: &Route,
        request: &Request,
        fleet_load: usize,
    ) -> ScoringContext<'a> {
        ScoringContext {
            travel: self.travel.as_ref(),
            fleet_size: self.fleet.len(),
            fleet_load,
            vehicle_load: route.served_requests(),
            vehicle_position: route.position_at(request.submitted_at_ms),
            max_pickup_radius_km: self.max_pickup_radius_km,
        }
    }

    /// `Ok(false)` for business infeasibility, `Err` for a structurally broken candidate.
    fn check(&self, candidate: &Candidate, route: &Route) -> Result<bool, DispatchError> {
        match evaluate(&candidate.stops, route.vehicle().capacity) {
            Feasibility::Feasible => Ok(true),
            Feasibility::Infeasible(violation) if violation.is_structural() => {
                error!(vehicle = %candidate.vehicle, %violation, "Generated a broken candidate");
                Err(DispatchError::InvariantViolation {
                    vehicle: candidate.vehicle,
                    violation,
                })
            }
            Feasibility::Infeasible(_) => Ok(false),
        }
    }

    /// Generate, check and score every insertion into `route`, handing each feasible
    /// candidate to `visit`. Returns how many candidates were generated.
    fn scored_candidates(
        &self,
        route: &Route,
        request: &Arc<Request>,
        fleet_load: usize,
        mut visit: impl FnMut(ScoredCandidate),
    ) -> Result<usize, DispatchError> {
        let ctx = self.scoring_context(route, request, fleet_load);
        let mut generated = 0;
        for candidate in self.generator(route, request) {
            generated += 1;
            if self.check(&candidate, route)? {
                let cost = score(&candidate, &self.weights, &ctx);
                visit(ScoredCandidate { candidate, cost });
            }
        }
        Ok(generated)
    }

    fn evaluate_vehicle(
        &self,
        route: &Route,
        request: &Arc<Request>,
        fleet_load: usize,
    ) -> Result<VehicleEvaluation, DispatchError> {
        let mut best: Option<ScoredCandidate> = None;
        let mut feasible = 0;
        let generated = self.scored_candidates(route, request, fleet_load, |scored| {
            feasible += 1;
            best = match best.take() {
                Some(current) if compare_scored(&current, &scored) != Ordering::Greater => {
                    Some(current)
                }
                _ => Some(scored),
            };
        })?;
        Ok(VehicleEvaluation {
            best,
            generated,
            feasible,
        })
    }
}
