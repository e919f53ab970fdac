//! Pluggable travel models: distance and travel-time estimates between stop locations.
//!
//! The route timing code never computes distances itself; it asks the injected
//! [`TravelModel`]. Two implementations:
//!
//! - **`HaversineTravelModel`**: great-circle distance at a constant average speed.
//! - **`TableTravelModel`**: explicit origin/destination table (e.g. station distance and
//!   way-time matrices), falling back to haversine for pairs the table does not cover.

use std::collections::HashMap;

use h3o::CellIndex;

use crate::spatial::distance_km_between_cells;

/// Average city speed used when no speed is configured (km/h).
pub const DEFAULT_SPEED_KMH: f64 = 30.0;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Trait for travel estimates. Implementations must be `Send + Sync` so one model can be
/// shared by the evaluation workers of a dispatch cycle.
pub trait TravelModel: Send + Sync {
    /// Distance in kilometres between two locations.
    fn distance_km(&self, from: CellIndex, to: CellIndex) -> f64;

    /// Travel time in milliseconds between two locations.
    fn travel_ms(&self, from: CellIndex, to: CellIndex) -> u64;
}

/// Convert a distance at a constant speed into whole milliseconds.
pub fn travel_ms_at_speed(distance_km: f64, speed_kmh: f64) -> u64 {
    if distance_km <= 0.0 || speed_kmh <= 0.0 {
        return 0;
    }
    (distance_km / speed_kmh * MS_PER_HOUR).round() as u64
}

/// Straight-line travel between cell centres at a constant speed.
#[derive(Debug, Clone, Copy)]
pub struct HaversineTravelModel {
    pub speed_kmh: f64,
}

impl HaversineTravelModel {
    pub fn new(speed_kmh: f64) -> Self {
        Self { speed_kmh }
    }
}

impl Default for HaversineTravelModel {
    fn default() -> Self {
        Self::new(DEFAULT_SPEED_KMH)
    }
}

impl TravelModel for HaversineTravelModel {
    fn distance_km(&self, from: CellIndex, to: CellIndex) -> f64 {
        distance_km_between_cells(from, to)
    }

    fn travel_ms(&self, from: CellIndex, to: CellIndex) -> u64 {
        travel_ms_at_speed(self.distance_km(from, to), self.speed_kmh)
    }
}

/// One directed entry of a travel table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TravelLeg {
    pub distance_km: f64,
    pub duration_ms: u64,
}

/// Directed origin/destination table with a haversine fallback.
#[derive(Debug, Clone, Default)]
pub struct TableTravelModel {
    legs: HashMap<(CellIndex, CellIndex), TravelLeg>,
    fallback: HaversineTravelModel,
}

impl TableTravelModel {
    pub fn new(fallback: HaversineTravelModel) -> Self {
        Self {
            legs: HashMap::new(),
            fallback,
        }
    }

    /// Insert or replace the directed leg `from -> to`.
    pub fn insert(&mut self, from: CellIndex, to: CellIndex, leg: TravelLeg) {
        self.legs.insert((from, to), leg);
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    fn leg(&self, from: CellIndex, to: CellIndex) -> Option<&TravelLeg> {
        if from == to {
            return None;
        }
        self.legs.get(&(from, to))
    }
}

impl TravelModel for TableTravelModel {
    fn distance_km(&self, from: CellIndex, to: CellIndex) -> f64 {
        match self.leg(from, to) {
            Some(leg) => leg.distance_km,
            None => self.fallback.distance_km(from, to),
        }
    }

    fn travel_ms(&self, from: CellIndex, to: CellIndex) -> u64 {
        match self.leg(from, to) {
            Some(leg) => leg.duration_ms,
            None => self.fallback.travel_ms(from, to),
        }
    }
}
