//! Simulation driver: feeds a time-ordered request stream through the dispatcher.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::{ConfigError, DispatchConfig};
use crate::dispatcher::{Dispatcher, Rejection, RejectionReason, RequestOutcome};
use crate::error::DispatchError;
use crate::fleet::FleetState;
use crate::route::StopRole;
use crate::request::{Request, RequestPolicy, RequestRecord};
use crate::travel::{HaversineTravelModel, TravelModel};

/// Everything a run produced: one outcome per request in input order, the rejections in
/// order, and the final routes.
#[derive(Debug, Clone)]
pub struct SimulationReport {
    pub outcomes: Vec<RequestOutcome>,
    pub rejections: Vec<Rejection>,
    pub schedules: FleetState,
}

impl SimulationReport {
    pub fn committed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_committed()).count()
    }
}

#[derive(Debug)]
pub struct Simulation {
    dispatcher: Dispatcher,
    policy: RequestPolicy,
}

impl Simulation {
    pub fn new(config: &DispatchConfig, travel: Arc<dyn TravelModel>) -> Result<Self, ConfigError> {
        let dispatcher = Dispatcher::new(config, travel)?;
        Ok(Self {
            dispatcher,
            policy: config.request_policy()?,
        })
    }

    /// Straight-line travel at the configured speed.
    pub fn with_haversine(config: &DispatchConfig) -> Result<Self, ConfigError> {
        Self::new(config, Arc::new(HaversineTravelModel::new(config.speed_kmh)))
    }

    pub fn fleet(&self) -> &FleetState {
        self.dispatcher.fleet()
    }

    /// Dispatch every record in order. Stops at the first fatal error: an invalid record,
    /// a submission time going backwards, a repeated id, or a broken route invariant.
    pub fn run(mut self, records: &[RequestRecord]) -> Result<SimulationReport, DispatchError> {
        info!(
            requests = records.len(),
            vehicles = self.dispatcher.fleet().len(),
            "Simulation started"
        );

        let mut outcomes = Vec::with_capacity(records.len());
        let mut rejections = Vec::new();
        let mut seen = HashSet::with_capacity(records.len());
        let mut previous_ms = 0u64;

        for (index, record) in records.iter().enumerate() {
            let submitted_at_ms = record.submitted_at();
            if submitted_at_ms < previous_ms {
                let err = DispatchError::OutOfOrderRequest {
                    id: record.id,
                    submitted_at_ms,
                    previous_ms,
                };
                error!(error = %err, "Aborting run");
                return Err(err);
            }
            if !seen.insert(record.id) {
                let err = DispatchError::DuplicateRequest(record.id);
                error!(error = %err, "Aborting run");
                return Err(err);
            }
            previous_ms = submitted_at_ms;

            let request = Request::from_record(record, &self.policy, self.dispatcher.travel())?;
            let outcome = self.dispatcher.dispatch(Arc::new(request))?;
            if !outcome.is_committed() {
                rejections.push(Rejection {
                    request_id: outcome.request_id,
                    reason: RejectionReason::NoFeasibleInsertion,
                });
            }
            outcomes.push(outcome);

            if (index + 1) % 1000 == 0 {
                debug!(
                    processed = index + 1,
                    rejected = rejections.len(),
                    "Dispatch progress"
                );
            }
        }

        let schedules = self.dispatcher.into_fleet();
        sync_with_schedules(&mut outcomes, &schedules);
        let report = SimulationReport {
            outcomes,
            rejections,
            schedules,
        };
        info!(
            committed = report.committed(),
            rejected = report.rejections.len(),
            "Simulation finished"
        );
        Ok(report)
    }
}

/// Rewrite committed outcomes' stop indices and times from the final routes, since later
/// insertions shift both.
fn sync_with_schedules(outcomes: &mut [RequestOutcome], schedules: &FleetState) {
    let by_request: HashMap<_, _> = outcomes
        .iter()
        .enumerate()
        .filter(|(_, outcome)| outcome.is_committed())
        .map(|(index, outcome)| (outcome.request_id, index))
        .collect();

    for route in schedules.routes() {
        for (stop_index, stop) in route.stops().iter().enumerate() {
            let Some(&index) = by_request.get(&stop.request.id) else {
                continue;
            };
            let outcome = &mut outcomes[index];
            outcome.vehicle_id = Some(route.vehicle().id);
            match stop.role {
                StopRole::Pickup => {
                    outcome.pickup_index = Some(stop_index);
                    outcome.assigned_pickup_time_ms = Some(stop.scheduled_ms);
                }
                StopRole::Dropoff => {
                    outcome.dropoff_index = Some(stop_index);
                    outcome.assigned_dropoff_time_ms = Some(stop.scheduled_ms);
                }
            }
        }
    }
}
