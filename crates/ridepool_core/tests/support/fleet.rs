#![allow(dead_code)]

use std::sync::Arc;

use ridepool_core::objective::ObjectiveWeights;
use ridepool_core::spatial::GeoPoint;
use ridepool_core::travel::{HaversineTravelModel, TravelModel};
use ridepool_core::{DelayTolerance, DispatchConfig, Dispatcher, Simulation, VehicleConfig};

use super::requests::line_point;

/// Speed used by every test fleet: one line step (~1 km) takes ~100 s.
pub const TEST_SPEED_KMH: f64 = 36.0;

/// Builder for reproducible test fleets on the seeded geography.
///
/// Defaults: one 4-seat vehicle at line step 0, resolution 12, no dwell, default tolerance
/// and weights, sequential evaluation.
#[derive(Debug, Clone)]
pub struct TestFleetBuilder {
    config: DispatchConfig,
}

impl Default for TestFleetBuilder {
    fn default() -> Self {
        Self {
            config: DispatchConfig::default()
                .with_capacity(4)
                .with_num_vehicles(1)
                .with_start_locations(vec![line_point(0)])
                .with_h3_resolution(12)
                .with_dwell_ms(0)
                .with_speed_kmh(TEST_SPEED_KMH)
                .with_parallel(false),
        }
    }
}

impl TestFleetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.config = self.config.with_capacity(capacity);
        self
    }

    /// `count` identical vehicles sharing one start point.
    pub fn with_vehicles_at(mut self, count: usize, start: GeoPoint) -> Self {
        self.config = self
            .config
            .with_num_vehicles(count)
            .with_start_locations(vec![start]);
        self
    }

    /// Explicit `(seats, start)` per vehicle, ids in order.
    pub fn with_explicit_vehicles(mut self, vehicles: &[(u32, GeoPoint)]) -> Self {
        let listed = vehicles
            .iter()
            .enumerate()
            .map(|(index, &(seats, start))| VehicleConfig {
                name: format!("test-{index}"),
                seats,
                start,
            })
            .collect();
        self.config = self.config.with_vehicles(listed);
        self
    }

    pub fn with_tolerance(mut self, tolerance: DelayTolerance) -> Self {
        self.config = self.config.with_delay_tolerance(tolerance);
        self
    }

    pub fn with_weights(mut self, weights: ObjectiveWeights) -> Self {
        self.config = self.config.with_weights(weights);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.config = self.config.with_parallel(parallel);
        self
    }

    pub fn config(&self) -> DispatchConfig {
        self.config.clone()
    }

    pub fn travel(&self) -> Arc<dyn TravelModel> {
        Arc::new(HaversineTravelModel::new(self.config.speed_kmh))
    }

    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(&self.config, self.travel()).expect("test fleet config is valid")
    }

    pub fn simulation(&self) -> Simulation {
        Simulation::new(&self.config, self.travel()).expect("test fleet config is valid")
    }
}
