//! Weighted cost of a feasible insertion. Lower is better.
//!
//! Four sub-costs, each normalized to `[0, 1]`:
//!
//! - **delay**: mean of `added_delay / max_delay` over the new request and every existing
//!   request whose dropoff the insertion pushes later (0 when `max_delay` is 0)
//! - **pooling**: `1 / k` for `k` distinct requests on board during the new ride
//! - **balance**: how far the vehicle's post-insertion load exceeds the fleet mean
//! - **distance**: vehicle position at dispatch time to the pickup, over the pickup radius

use h3o::CellIndex;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::route::Candidate;
use crate::travel::TravelModel;

/// Objective weights. Non-negative and finite; a zero weight disables its factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectiveWeights {
    pub delay: f64,
    pub pooling: f64,
    pub balance: f64,
    pub distance: f64,
}

impl ObjectiveWeights {
    pub fn new(delay: f64, pooling: f64, balance: f64, distance: f64) -> Self {
        Self {
            delay,
            pooling,
            balance,
            distance,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("delay", self.delay),
            ("pooling", self.pooling),
            ("balance", self.balance),
            ("distance", self.distance),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    name: name.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}

impl Default for ObjectiveWeights {
    fn default() -> Self {
        Self::new(1.0, 1.0, 1.0, 1.0)
    }
}

/// Sub-costs and the weighted total of one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CostBreakdown {
    pub delay: f64,
    pub pooling: f64,
    pub balance: f64,
    pub distance: f64,
    pub total: f64,
}

/// Fleet-level inputs to scoring, fixed for one vehicle within one dispatch.
#[derive(Clone, Copy)]
pub struct ScoringContext<'a> {
    pub travel: &'a dyn TravelModel,
    pub fleet_size: usize,
    /// Requests served by the whole fleet before this dispatch.
    pub fleet_load: usize,
    /// Requests served by the candidate's vehicle before this dispatch.
    pub vehicle_load: usize,
    pub vehicle_position: CellIndex,
    pub max_pickup_radius_km: f64,
}

fn ratio(added_ms: u64, max_ms: u64) -> f64 {
    if max_ms == 0 {
        return 0.0;
    }
    (added_ms as f64 / max_ms as f64).min(1.0)
}

/// Mean delay ratio over the new request and the existing dropoffs it actually pushes back.
pub fn delay_cost(candidate: &Candidate) -> f64 {
    let request = &candidate.request;
    let own = ratio(request.dropoff_delay_ms(candidate.dropoff_ms()), request.max_delay_ms);
    let (shifted, total) = candidate
        .meta
        .dropoff_shifts
        .iter()
        .filter(|shift| shift.shift_ms > 0)
        .fold((0usize, own), |(count, sum), shift| {
            (count + 1, sum + ratio(shift.shift_ms, shift.max_delay_ms))
        });
    total / (shifted + 1) as f64
}

pub fn pooling_cost(candidate: &Candidate) -> f64 {
    1.0 / candidate.meta.pooled_requests.max(1) as f64
}

/// One-sided load penalty: zero unless this vehicle would end up above the fleet mean
/// after taking the request. Under-loaded vehicles get no bonus.
pub fn balance_cost(fleet_size: usize, fleet_load: usize, vehicle_load: usize) -> f64 {
    if fleet_size == 0 {
        return 0.0;
    }
    let n = fleet_size as f64;
    let mean_post = (fleet_load + 1) as f64 / n;
    let post = (vehicle_load + 1) as f64;
    (post - mean_post).max(0.0) / (n * mean_post)
}

pub fn distance_cost(km: f64, max_pickup_radius_km: f64) -> f64 {
    if max_pickup_radius_km <= 0.0 {
        return 0.0;
    }
    (km / max_pickup_radius_km).min(1.0)
}

pub fn score(
    candidate: &Candidate,
    weights: &ObjectiveWeights,
    ctx: &ScoringContext<'_>,
) -> CostBreakdown {
    let delay = delay_cost(candidate);
    let pooling = pooling_cost(candidate);
    let balance = balance_cost(ctx.fleet_size, ctx.fleet_load, ctx.vehicle_load);
    let km = ctx
        .travel
        .distance_km(ctx.vehicle_position, candidate.request.origin);
    let distance = distance_cost(km, ctx.max_pickup_radius_km);

    CostBreakdown {
        delay,
        pooling,
        balance,
        distance,
        total: weights.delay * delay
            + weights.pooling * pooling
            + weights.balance * balance
            + weights.distance * distance,
    }
}
