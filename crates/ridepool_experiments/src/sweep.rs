//! Objective-weight sweeps: enumerate or sample weight vectors and replay one request stream
//! against each of them in parallel.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use ridepool_core::objective::ObjectiveWeights;
use ridepool_core::travel::TravelModel;
use ridepool_core::{ConfigError, DispatchConfig, DispatchError, RequestRecord, Simulation};
use serde::Serialize;
use tracing::{debug, info};

use crate::metrics::{summarize, SimulationSummary};

#[derive(Debug)]
pub enum SweepError {
    Config(ConfigError),
    Dispatch(DispatchError),
    ThreadPool(String),
}

impl fmt::Display for SweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepError::Config(err) => write!(f, "invalid sweep point: {err}"),
            SweepError::Dispatch(err) => write!(f, "sweep run failed: {err}"),
            SweepError::ThreadPool(message) => write!(f, "cannot build thread pool: {message}"),
        }
    }
}

impl std::error::Error for SweepError {}

impl From<ConfigError> for SweepError {
    fn from(err: ConfigError) -> Self {
        SweepError::Config(err)
    }
}

impl From<DispatchError> for SweepError {
    fn from(err: DispatchError) -> Self {
        SweepError::Dispatch(err)
    }
}

/// One weight vector to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SweepPoint {
    pub run_id: usize,
    pub weights: ObjectiveWeights,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepResult {
    pub point: SweepPoint,
    pub summary: SimulationSummary,
}

/// Values to explore per weight. An axis left empty keeps the base weight.
#[derive(Debug, Clone, Default)]
pub struct WeightSpace {
    base: ObjectiveWeights,
    delay: Vec<f64>,
    pooling: Vec<f64>,
    balance: Vec<f64>,
    distance: Vec<f64>,
}

impl WeightSpace {
    pub fn grid() -> Self {
        Self::default()
    }

    pub fn with_base(mut self, base: ObjectiveWeights) -> Self {
        self.base = base;
        self
    }

    pub fn delay(mut self, values: Vec<f64>) -> Self {
        self.delay = values;
        self
    }

    pub fn pooling(mut self, values: Vec<f64>) -> Self {
        self.pooling = values;
        self
    }

    pub fn balance(mut self, values: Vec<f64>) -> Self {
        self.balance = values;
        self
    }

    pub fn distance(mut self, values: Vec<f64>) -> Self {
        self.distance = values;
        self
    }

    fn axes(&self) -> [Vec<f64>; 4] {
        let axis = |values: &Vec<f64>, base: f64| {
            if values.is_empty() {
                vec![base]
            } else {
                values.clone()
            }
        };
        [
            axis(&self.delay, self.base.delay),
            axis(&self.pooling, self.base.pooling),
            axis(&self.balance, self.base.balance),
            axis(&self.distance, self.base.distance),
        ]
    }

    /// Number of points `generate` yields.
    pub fn len(&self) -> usize {
        self.axes().iter().map(Vec::len).product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Full Cartesian product, delay varying slowest.
    pub fn generate(&self) -> Vec<SweepPoint> {
        let [delay, pooling, balance, distance] = self.axes();
        let mut points = Vec::with_capacity(self.len());
        for &d in &delay {
            for &p in &pooling {
                for &b in &balance {
                    for &k in &distance {
                        points.push(SweepPoint {
                            run_id: points.len(),
                            weights: ObjectiveWeights::new(d, p, b, k),
                        });
                    }
                }
            }
        }
        points
    }

    /// Draw up to `count` distinct points. Stops early once the space is exhausted.
    pub fn sample_random(&self, count: usize, seed: u64) -> Vec<SweepPoint> {
        let axes = self.axes();
        let mut rng = StdRng::seed_from_u64(seed);
        let mut seen = HashSet::new();
        let mut points = Vec::new();
        let target = count.min(self.len());
        let mut attempts = 0;
        const MAX_ATTEMPTS: usize = 10_000;

        while points.len() < target && attempts < MAX_ATTEMPTS {
            attempts += 1;
            let mut pick = |axis: &Vec<f64>| axis[rng.gen_range(0..axis.len())];
            let weights = ObjectiveWeights::new(
                pick(&axes[0]),
                pick(&axes[1]),
                pick(&axes[2]),
                pick(&axes[3]),
            );
            let key = [
                weights.delay.to_bits(),
                weights.pooling.to_bits(),
                weights.balance.to_bits(),
                weights.distance.to_bits(),
            ];
            if seen.insert(key) {
                points.push(SweepPoint {
                    run_id: points.len(),
                    weights,
                });
            }
        }
        points
    }
}

/// Replay `records` with the point's weights and summarize the result.
pub fn run_single_sweep(
    config: &DispatchConfig,
    records: &[RequestRecord],
    travel: Arc<dyn TravelModel>,
    point: &SweepPoint,
) -> Result<SweepResult, SweepError> {
    // Runs already execute side by side; keep each dispatch on its own thread.
    let config = config
        .clone()
        .with_weights(point.weights)
        .with_parallel(false);
    let report = Simulation::new(&config, travel.clone())?.run(records)?;
    let summary = summarize(&report, travel.as_ref());
    debug!(
        run_id = point.run_id,
        committed = summary.committed,
        rejected = summary.rejected,
        "sweep point finished"
    );
    Ok(SweepResult {
        point: *point,
        summary,
    })
}

/// Run every point on a rayon pool. Results come back in input order.
pub fn run_parallel_sweeps(
    config: &DispatchConfig,
    records: &[RequestRecord],
    travel: Arc<dyn TravelModel>,
    points: &[SweepPoint],
    num_threads: Option<usize>,
    show_progress: bool,
) -> Result<Vec<SweepResult>, SweepError> {
    let total = points.len();
    info!(points = total, requests = records.len(), "starting weight sweep");

    let pb = if show_progress && total > 0 {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
            )
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Some(bar)
    } else {
        None
    };

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(threads) = num_threads {
        builder = builder.num_threads(threads);
    }
    let pool = builder
        .build()
        .map_err(|err| SweepError::ThreadPool(err.to_string()))?;

    let results = pool.install(|| {
        points
            .par_iter()
            .map(|point| {
                let result = run_single_sweep(config, records, travel.clone(), point);
                if let Some(progress_bar) = &pb {
                    progress_bar.inc(1);
                }
                result
            })
            .collect::<Result<Vec<_>, _>>()
    });

    if let Some(progress_bar) = &pb {
        progress_bar.finish_with_message("Completed");
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridepool_core::demand::DemandConfig;
    use ridepool_core::travel::HaversineTravelModel;

    #[test]
    fn grid_is_cartesian_product() {
        let space = WeightSpace::grid()
            .delay(vec![0.5, 1.0])
            .balance(vec![0.0, 1.0, 2.0]);
        let points = space.generate();

        assert_eq!(space.len(), 6);
        assert_eq!(points.len(), 6);
        assert_eq!(points[0].weights, ObjectiveWeights::new(0.5, 1.0, 0.0, 1.0));
        assert_eq!(points[5].weights, ObjectiveWeights::new(1.0, 1.0, 2.0, 1.0));
        let ids: Vec<usize> = points.iter().map(|p| p.run_id).collect();
        assert_eq!(ids, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn random_sampling_is_unique_and_bounded() {
        let space = WeightSpace::grid()
            .delay(vec![0.0, 1.0])
            .pooling(vec![0.0, 1.0]);
        let points = space.sample_random(10, 42);

        assert_eq!(points.len(), 4);
        let unique: HashSet<_> = points
            .iter()
            .map(|p| (p.weights.delay.to_bits(), p.weights.pooling.to_bits()))
            .collect();
        assert_eq!(unique.len(), 4);
        assert_eq!(space.sample_random(10, 42), points);
    }

    #[test]
    fn parallel_sweep_keeps_input_order() {
        let records = DemandConfig::default()
            .with_seed(3)
            .with_horizon_ms(30 * 60 * 1000)
            .generate()
            .unwrap();
        let config = DispatchConfig::default().with_num_vehicles(3);
        let travel: Arc<dyn TravelModel> = Arc::new(HaversineTravelModel::new(config.speed_kmh));
        let points = WeightSpace::grid().balance(vec![0.0, 5.0]).generate();

        let results =
            run_parallel_sweeps(&config, &records, travel.clone(), &points, Some(2), false)
                .unwrap();

        assert_eq!(results.len(), 2);
        for (result, point) in results.iter().zip(&points) {
            assert_eq!(result.point, *point);
            assert_eq!(result.summary.total_requests, records.len());
        }
        let single = run_single_sweep(&config, &records, travel, &points[1]).unwrap();
        assert_eq!(single, results[1]);
    }

    #[test]
    fn negative_weight_fails_the_sweep() {
        let config = DispatchConfig::default().with_num_vehicles(1);
        let travel: Arc<dyn TravelModel> = Arc::new(HaversineTravelModel::default());
        let points = WeightSpace::grid().pooling(vec![-1.0]).generate();

        let err = run_parallel_sweeps(&config, &[], travel, &points, Some(1), false).unwrap_err();
        assert!(matches!(err, SweepError::Config(_)));
    }
}
