//! Experiment tooling around the ridepool dispatch engine.
//!
//! Reads request streams and travel tables from CSV, runs simulations, summarizes the
//! committed schedules and exports them, and sweeps the objective weights in parallel.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use ridepool_core::demand::DemandConfig;
//! use ridepool_core::travel::{HaversineTravelModel, TravelModel};
//! use ridepool_core::DispatchConfig;
//! use ridepool_experiments::{find_best_result_index, run_parallel_sweeps, ScoreWeights, WeightSpace};
//!
//! let records = DemandConfig::default().generate().unwrap();
//! let config = DispatchConfig::default();
//! let travel: Arc<dyn TravelModel> = Arc::new(HaversineTravelModel::new(config.speed_kmh));
//!
//! let points = WeightSpace::grid()
//!     .pooling(vec![0.0, 1.0, 2.0])
//!     .balance(vec![0.0, 1.0])
//!     .generate();
//! let results = run_parallel_sweeps(&config, &records, travel, &points, None, true).unwrap();
//! let best = find_best_result_index(&results, &ScoreWeights::default()).unwrap();
//! println!("best weights: {:?}", results[best].point.weights);
//! ```
//!
//! # Modules
//!
//! - [`import`]: request and travel-table CSV readers
//! - [`metrics`]: run summaries
//! - [`export`]: CSV / JSON / Parquet writers
//! - [`sweep`]: weight spaces and the parallel runner
//! - [`ranking`]: scoring sweep results
//! - [`logging`]: subscriber setup for the `ridepool` binary

pub mod export;
pub mod import;
pub mod logging;
pub mod metrics;
pub mod ranking;
pub mod sweep;

pub use import::{read_requests_csv, read_travel_table_csv, ImportError, RequestWindow};
pub use metrics::{summarize, SimulationSummary, VehicleStats};
pub use ranking::{calculate_sweep_scores, find_best_result_index, rank_results, ScoreWeights};
pub use sweep::{run_parallel_sweeps, SweepError, SweepPoint, SweepResult, WeightSpace};
