//! Dispatch configuration: fleet, hard constraints and objective weights.
//!
//! Loaded from JSON (every field optional, defaults below) or built in code with the
//! `with_*` methods. [`DispatchConfig::validate`] runs before anything is dispatched.

use std::fmt;
use std::fs;
use std::path::Path;

use h3o::Resolution;
use serde::{Deserialize, Serialize};

use crate::fleet::{VehicleId, VehicleSpec};
use crate::objective::ObjectiveWeights;
use crate::request::{DelayTolerance, RequestPolicy};
use crate::spatial::{resolution_from_u8, GeoPoint};
use crate::travel::DEFAULT_SPEED_KMH;

/// Default depot: Berlin, Alexanderplatz (approx).
const DEFAULT_START_LAT: f64 = 52.5219;
const DEFAULT_START_LNG: f64 = 13.4132;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    InvalidWeight { name: String, value: f64 },
    ZeroCapacity { vehicle: String },
    ZeroVehicles,
    StartLocationMismatch { expected: usize, found: usize },
    InvalidLocation { vehicle: String, point: GeoPoint },
    NonPositive { name: &'static str, value: f64 },
    Negative { name: &'static str, value: f64 },
    InvalidResolution(u8),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(message) => write!(f, "cannot read config: {message}"),
            ConfigError::Parse(message) => write!(f, "cannot parse config: {message}"),
            ConfigError::InvalidWeight { name, value } => {
                write!(f, "weight `{name}` must be finite and non-negative, got {value}")
            }
            ConfigError::ZeroCapacity { vehicle } => {
                write!(f, "vehicle {vehicle} must have at least one seat")
            }
            ConfigError::ZeroVehicles => write!(f, "fleet must have at least one vehicle"),
            ConfigError::StartLocationMismatch { expected, found } => write!(
                f,
                "expected 1 or {expected} vehicle start locations, got {found}"
            ),
            ConfigError::InvalidLocation { vehicle, point } => write!(
                f,
                "vehicle {vehicle} starts at invalid location ({}, {})",
                point.lat, point.lng
            ),
            ConfigError::NonPositive { name, value } => {
                write!(f, "`{name}` must be positive, got {value}")
            }
            ConfigError::Negative { name, value } => {
                write!(f, "`{name}` must be finite and non-negative, got {value}")
            }
            ConfigError::InvalidResolution(raw) => write!(f, "invalid H3 resolution {raw}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// One explicitly listed vehicle; overrides the uniform fleet fields when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleConfig {
    pub name: String,
    pub seats: u32,
    pub start: GeoPoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub capacity_per_vehicle: u32,
    pub num_vehicles: usize,
    /// One per vehicle, or a single location shared by the whole fleet.
    pub vehicle_start_locations: Vec<GeoPoint>,
    pub vehicles: Vec<VehicleConfig>,
    pub delay_tolerance: DelayTolerance,
    pub weights: ObjectiveWeights,
    pub max_pickup_radius_km: f64,
    /// Standing time at every stop (ms).
    pub dwell_ms: u64,
    pub speed_kmh: f64,
    pub h3_resolution: u8,
    /// Evaluate vehicles on the rayon pool.
    pub parallel: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            capacity_per_vehicle: 4,
            num_vehicles: 10,
            vehicle_start_locations: vec![GeoPoint::new(DEFAULT_START_LAT, DEFAULT_START_LNG)],
            vehicles: Vec::new(),
            delay_tolerance: DelayTolerance::default(),
            weights: ObjectiveWeights::default(),
            max_pickup_radius_km: 5.0,
            dwell_ms: 60_000,
            speed_kmh: DEFAULT_SPEED_KMH,
            h3_resolution: 9,
            parallel: true,
        }
    }
}

impl DispatchConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|err| ConfigError::Io(format!("{}: {err}", path.display())))?;
        Self::from_json_str(&raw)
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity_per_vehicle = capacity;
        self
    }

    pub fn with_num_vehicles(mut self, num_vehicles: usize) -> Self {
        self.num_vehicles = num_vehicles;
        self
    }

    pub fn with_start_locations(mut self, locations: Vec<GeoPoint>) -> Self {
        self.vehicle_start_locations = locations;
        self
    }

    pub fn with_vehicles(mut self, vehicles: Vec<VehicleConfig>) -> Self {
        self.vehicles = vehicles;
        self
    }

    pub fn with_delay_tolerance(mut self, tolerance: DelayTolerance) -> Self {
        self.delay_tolerance = tolerance;
        self
    }

    pub fn with_weights(mut self, weights: ObjectiveWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_max_pickup_radius_km(mut self, radius_km: f64) -> Self {
        self.max_pickup_radius_km = radius_km;
        self
    }

    pub fn with_dwell_ms(mut self, dwell_ms: u64) -> Self {
        self.dwell_ms = dwell_ms;
        self
    }

    pub fn with_speed_kmh(mut self, speed_kmh: f64) -> Self {
        self.speed_kmh = speed_kmh;
        self
    }

    pub fn with_h3_resolution(mut self, resolution: u8) -> Self {
        self.h3_resolution = resolution;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        for (name, value) in [
            ("max_pickup_radius_km", self.max_pickup_radius_km),
            ("speed_kmh", self.speed_kmh),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }
        if !self.delay_tolerance.direct_ratio.is_finite() || self.delay_tolerance.direct_ratio < 0.0
        {
            return Err(ConfigError::Negative {
                name: "delay_tolerance.direct_ratio",
                value: self.delay_tolerance.direct_ratio,
            });
        }
        self.resolution()?;
        self.vehicle_specs().map(|_| ())
    }

    pub fn resolution(&self) -> Result<Resolution, ConfigError> {
        resolution_from_u8(self.h3_resolution)
            .ok_or(ConfigError::InvalidResolution(self.h3_resolution))
    }

    pub fn request_policy(&self) -> Result<RequestPolicy, ConfigError> {
        Ok(RequestPolicy {
            resolution: self.resolution()?,
            dwell_ms: self.dwell_ms,
            tolerance: self.delay_tolerance,
        })
    }

    /// The fleet with ids `0..n`, either from `vehicles` or from the uniform fields.
    pub fn vehicle_specs(&self) -> Result<Vec<VehicleSpec>, ConfigError> {
        let resolution = self.resolution()?;
        let listed: Vec<VehicleConfig> = if self.vehicles.is_empty() {
            self.uniform_vehicles()?
        } else {
            self.vehicles.clone()
        };

        listed
            .into_iter()
            .enumerate()
            .map(|(index, vehicle)| {
                if vehicle.seats == 0 {
                    return Err(ConfigError::ZeroCapacity {
                        vehicle: vehicle.name,
                    });
                }
                let start = vehicle.start.to_cell(resolution).ok_or_else(|| {
                    ConfigError::InvalidLocation {
                        vehicle: vehicle.name.clone(),
                        point: vehicle.start,
                    }
                })?;
                Ok(VehicleSpec::new(VehicleId(index as u32), vehicle.seats, start)
                    .with_name(vehicle.name))
            })
            .collect()
    }

    fn uniform_vehicles(&self) -> Result<Vec<VehicleConfig>, ConfigError> {
        if self.num_vehicles == 0 {
            return Err(ConfigError::ZeroVehicles);
        }
        let starts = &self.vehicle_start_locations;
        if starts.len() != 1 && starts.len() != self.num_vehicles {
            return Err(ConfigError::StartLocationMismatch {
                expected: self.num_vehicles,
                found: starts.len(),
            });
        }
        Ok((0..self.num_vehicles)
            .map(|index| VehicleConfig {
                name: format!("vehicle-{index}"),
                seats: self.capacity_per_vehicle,
                start: starts[index.min(starts.len() - 1)],
            })
            .collect())
    }
}
