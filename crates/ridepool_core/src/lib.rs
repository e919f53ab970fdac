pub mod spatial;
pub mod travel;
pub mod request;
pub mod route;
pub mod candidates;
pub mod constraints;
pub mod objective;
pub mod fleet;
pub mod dispatcher;
pub mod error;
pub mod config;
pub mod demand;
pub mod simulation;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use config::{ConfigError, DispatchConfig, VehicleConfig};
pub use dispatcher::{Dispatcher, OutcomeKind, Rejection, RejectionReason, RequestOutcome};
pub use error::DispatchError;
pub use fleet::{FleetState, VehicleId, VehicleSpec};
pub use request::{DelayTolerance, Request, RequestId, RequestRecord};
pub use simulation::{Simulation, SimulationReport};
