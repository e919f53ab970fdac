//! Ranking of sweep results by a weighted service-quality score.
//!
//! Each metric is min-max normalized across the compared results, inverted where lower is
//! better, and combined with [`ScoreWeights`]. Scores are only comparable within one call.

use std::cmp::Ordering;

use crate::metrics::SimulationSummary;
use crate::sweep::SweepResult;

/// Configurable weights for the sweep ranking score.
///
/// # Default Weights
///
/// - Acceptance: 0.4
/// - Pooled share: 0.2
/// - Dropoff delay: 0.2 (inverted)
/// - Distance per committed request: 0.2 (inverted)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub acceptance_weight: f64,
    pub pooling_weight: f64,
    pub delay_weight: f64,
    pub distance_weight: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            acceptance_weight: 0.4,
            pooling_weight: 0.2,
            delay_weight: 0.2,
            distance_weight: 0.2,
        }
    }
}

/// Min-max normalization into `[0, 1]`; 0.5 when every result has the same value.
fn normalize_metric(value: f64, min: f64, max: f64) -> f64 {
    if max == min {
        0.5
    } else {
        ((value - min) / (max - min)).clamp(0.0, 1.0)
    }
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
        (min.min(v), max.max(v))
    })
}

fn km_per_request(summary: &SimulationSummary) -> f64 {
    if summary.committed == 0 {
        0.0
    } else {
        summary.total_distance_km / summary.committed as f64
    }
}

/// Score every result; higher is better. Output is in input order.
pub fn calculate_sweep_scores(results: &[SweepResult], weights: &ScoreWeights) -> Vec<f64> {
    if results.is_empty() {
        return vec![];
    }

    let summaries = || results.iter().map(|result| &result.summary);
    let (acceptance_min, acceptance_max) = min_max(summaries().map(|s| s.acceptance_rate));
    let (pooling_min, pooling_max) = min_max(summaries().map(|s| s.pooled_share));
    let (delay_min, delay_max) = min_max(summaries().map(|s| s.avg_dropoff_delay_ms));
    let (distance_min, distance_max) = min_max(summaries().map(km_per_request));

    summaries()
        .map(|summary| {
            let acceptance =
                normalize_metric(summary.acceptance_rate, acceptance_min, acceptance_max);
            let pooling = normalize_metric(summary.pooled_share, pooling_min, pooling_max);
            let delay =
                1.0 - normalize_metric(summary.avg_dropoff_delay_ms, delay_min, delay_max);
            let distance =
                1.0 - normalize_metric(km_per_request(summary), distance_min, distance_max);

            acceptance * weights.acceptance_weight
                + pooling * weights.pooling_weight
                + delay * weights.delay_weight
                + distance * weights.distance_weight
        })
        .collect()
}

/// Result indices ordered best first; equal scores keep the lower run id first.
pub fn rank_results(results: &[SweepResult], weights: &ScoreWeights) -> Vec<usize> {
    let scores = calculate_sweep_scores(results, weights);
    let mut order: Vec<usize> = (0..results.len()).collect();
    order.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(Ordering::Equal)
            .then(results[a].point.run_id.cmp(&results[b].point.run_id))
    });
    order
}

pub fn find_best_result_index(results: &[SweepResult], weights: &ScoreWeights) -> Option<usize> {
    rank_results(results, weights).first().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::SweepPoint;
    use ridepool_core::objective::ObjectiveWeights;

    fn result(run_id: usize, acceptance_rate: f64, delay_ms: f64) -> SweepResult {
        SweepResult {
            point: SweepPoint {
                run_id,
                weights: ObjectiveWeights::default(),
            },
            summary: SimulationSummary {
                total_requests: 100,
                committed: (acceptance_rate * 100.0) as usize,
                rejected: 100 - (acceptance_rate * 100.0) as usize,
                acceptance_rate,
                pooled_share: 0.3,
                avg_pickup_delay_ms: 0.0,
                median_pickup_delay_ms: 0.0,
                p90_pickup_delay_ms: 0.0,
                avg_dropoff_delay_ms: delay_ms,
                median_dropoff_delay_ms: delay_ms,
                p90_dropoff_delay_ms: delay_ms,
                total_distance_km: 0.0,
                occupied_distance_km: 0.0,
                passenger_km: 0.0,
                vehicles: vec![],
            },
        }
    }

    #[test]
    fn test_normalize_metric() {
        assert_eq!(normalize_metric(50.0, 0.0, 100.0), 0.5);
        assert_eq!(normalize_metric(0.0, 0.0, 100.0), 0.0);
        assert_eq!(normalize_metric(100.0, 0.0, 100.0), 1.0);
        assert_eq!(normalize_metric(50.0, 50.0, 50.0), 0.5);
    }

    #[test]
    fn better_service_scores_higher() {
        let results = vec![result(0, 0.6, 300_000.0), result(1, 0.9, 120_000.0)];
        let scores = calculate_sweep_scores(&results, &ScoreWeights::default());

        assert_eq!(scores.len(), 2);
        assert!(scores[1] > scores[0]);
        assert_eq!(find_best_result_index(&results, &ScoreWeights::default()), Some(1));
    }

    #[test]
    fn ties_keep_lower_run_id_first() {
        let results = vec![result(4, 0.8, 100.0), result(2, 0.8, 100.0)];
        assert_eq!(rank_results(&results, &ScoreWeights::default()), vec![1, 0]);
    }

    #[test]
    fn empty_results_have_no_best() {
        assert!(calculate_sweep_scores(&[], &ScoreWeights::default()).is_empty());
        assert_eq!(find_best_result_index(&[], &ScoreWeights::default()), None);
    }
}
