//! Synthetic demand: a seeded, time-ordered stream of ride requests.
//!
//! The horizon is walked in fixed steps. At every step one request appears with the
//! probability configured for that hour of day (scaled by `demand_factor`). Its desired
//! pickup time is the step time; it was booked either at short notice or well in advance,
//! so the submission time lies before it. Origins and destinations are drawn from a
//! bounding box or from weighted hotspots (stations), always as two distinct points.

use std::fmt;
use std::fs;
use std::path::Path;

use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::request::{RequestId, RequestRecord};
use crate::spatial::GeoPoint;

const MS_PER_HOUR: u64 = 60 * 60 * 1000;
const MS_PER_MINUTE: u64 = 60 * 1000;
/// Destination redraws before a step is given up.
const MAX_DESTINATION_DRAWS: usize = 32;

/// Share of bookings for 1..=6 passengers.
pub const DEFAULT_PASSENGER_WEIGHTS: [f64; 6] = [0.61, 0.25, 0.05, 0.05, 0.025, 0.015];

/// Per-minute request probability by hour of day: quiet nights, morning and evening peaks.
const DEFAULT_HOURLY_PROBABILITY: [f64; 24] = [
    0.05, 0.03, 0.02, 0.02, 0.03, 0.08, 0.20, 0.45, 0.60, 0.45, 0.30, 0.30, 0.35, 0.35, 0.30,
    0.35, 0.45, 0.60, 0.55, 0.40, 0.30, 0.20, 0.12, 0.08,
];

#[derive(Debug, Clone, PartialEq)]
pub enum DemandError {
    Io(String),
    Parse(String),
    InvalidProbability { name: &'static str, value: f64 },
    InvalidWeights(String),
    EmptyArea,
    InvalidWindow { name: &'static str },
}

impl fmt::Display for DemandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DemandError::Io(message) => write!(f, "cannot read demand config: {message}"),
            DemandError::Parse(message) => write!(f, "cannot parse demand config: {message}"),
            DemandError::InvalidProbability { name, value } => {
                write!(f, "`{name}` must be a probability in [0, 1], got {value}")
            }
            DemandError::InvalidWeights(message) => write!(f, "invalid weights: {message}"),
            DemandError::EmptyArea => write!(f, "demand area needs at least two distinct points"),
            DemandError::InvalidWindow { name } => write!(f, "invalid time window `{name}`"),
        }
    }
}

impl std::error::Error for DemandError {}

/// A weighted origin/destination candidate, e.g. a station.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub point: GeoPoint,
    pub weight: f64,
}

/// Where trips start and end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DemandArea {
    /// Uniform over a lat/lng box.
    Bounds {
        lat_min: f64,
        lat_max: f64,
        lng_min: f64,
        lng_max: f64,
    },
    /// Weighted choice between fixed points.
    Hotspots { points: Vec<Hotspot> },
}

impl Default for DemandArea {
    fn default() -> Self {
        // Central Berlin.
        DemandArea::Bounds {
            lat_min: 52.48,
            lat_max: 52.56,
            lng_min: 13.30,
            lng_max: 13.48,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemandConfig {
    pub seed: u64,
    /// Length of the simulated period (ms).
    pub horizon_ms: u64,
    /// One draw per step (ms).
    pub step_ms: u64,
    /// Hour of day at simulation time 0.
    pub start_hour: u8,
    pub hourly_probability: [f64; 24],
    pub demand_factor: f64,
    pub area: DemandArea,
    /// Probability that a booking is made at short notice rather than in advance.
    pub short_notice_probability: f64,
    pub short_notice_ms: u64,
    pub order_ahead_min_ms: u64,
    pub order_ahead_max_ms: u64,
    pub passenger_weights: Vec<f64>,
    /// Minimum straight-line trip length.
    pub min_trip_km: f64,
}

impl Default for DemandConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            horizon_ms: 4 * MS_PER_HOUR,
            step_ms: MS_PER_MINUTE,
            start_hour: 7,
            hourly_probability: DEFAULT_HOURLY_PROBABILITY,
            demand_factor: 1.0,
            area: DemandArea::default(),
            short_notice_probability: 0.1,
            short_notice_ms: 3 * MS_PER_MINUTE,
            order_ahead_min_ms: 20 * MS_PER_MINUTE,
            order_ahead_max_ms: 60 * MS_PER_MINUTE,
            passenger_weights: DEFAULT_PASSENGER_WEIGHTS.to_vec(),
            min_trip_km: 0.5,
        }
    }
}

impl DemandConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DemandError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|err| DemandError::Io(format!("{}: {err}", path.display())))?;
        serde_json::from_str(&raw).map_err(|err| DemandError::Parse(err.to_string()))
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_horizon_ms(mut self, horizon_ms: u64) -> Self {
        self.horizon_ms = horizon_ms;
        self
    }

    pub fn with_area(mut self, area: DemandArea) -> Self {
        self.area = area;
        self
    }

    pub fn with_demand_factor(mut self, demand_factor: f64) -> Self {
        self.demand_factor = demand_factor;
        self
    }

    pub fn validate(&self) -> Result<(), DemandError> {
        if self.step_ms == 0 {
            return Err(DemandError::InvalidWindow { name: "step_ms" });
        }
        if self.start_hour >= 24 {
            return Err(DemandError::InvalidWindow { name: "start_hour" });
        }
        if self.order_ahead_min_ms > self.order_ahead_max_ms {
            return Err(DemandError::InvalidWindow {
                name: "order_ahead_min_ms..order_ahead_max_ms",
            });
        }
        check_probability("short_notice_probability", self.short_notice_probability)?;
        if !self.demand_factor.is_finite() || self.demand_factor < 0.0 {
            return Err(DemandError::InvalidProbability {
                name: "demand_factor",
                value: self.demand_factor,
            });
        }
        for &p in &self.hourly_probability {
            check_probability("hourly_probability", p)?;
        }
        WeightedIndex::new(&self.passenger_weights)
            .map_err(|err| DemandError::InvalidWeights(format!("passenger_weights: {err}")))?;
        match &self.area {
            DemandArea::Bounds {
                lat_min,
                lat_max,
                lng_min,
                lng_max,
            } => {
                if !(lat_min < lat_max && lng_min < lng_max) {
                    return Err(DemandError::EmptyArea);
                }
            }
            DemandArea::Hotspots { points } => {
                if points.len() < 2 {
                    return Err(DemandError::EmptyArea);
                }
                WeightedIndex::new(points.iter().map(|h| h.weight))
                    .map_err(|err| DemandError::InvalidWeights(format!("hotspots: {err}")))?;
            }
        }
        Ok(())
    }

    /// Request probability for the step starting at `t_ms`.
    pub fn probability_at(&self, t_ms: u64) -> f64 {
        let hour = (u64::from(self.start_hour) + t_ms / MS_PER_HOUR) % 24;
        (self.hourly_probability[hour as usize] * self.demand_factor).min(1.0)
    }

    /// Generate the request stream, sorted by submission time then id.
    pub fn generate(&self) -> Result<Vec<RequestRecord>, DemandError> {
        self.validate()?;
        let mut rng = StdRng::seed_from_u64(self.seed);
        let passengers = WeightedIndex::new(&self.passenger_weights)
            .map_err(|err| DemandError::InvalidWeights(err.to_string()))?;
        let sampler = PointSampler::new(&self.area)?;

        let mut records = Vec::new();
        let mut next_id = 0u64;
        let mut t_ms = 0u64;
        while t_ms < self.horizon_ms {
            if rng.gen::<f64>() < self.probability_at(t_ms) {
                if let Some((origin, destination)) = self.draw_trip(&sampler, &mut rng) {
                    let lead_ms = if rng.gen::<f64>() < self.short_notice_probability {
                        self.short_notice_ms
                    } else {
                        rng.gen_range(self.order_ahead_min_ms..=self.order_ahead_max_ms)
                    };
                    records.push(RequestRecord {
                        id: RequestId(next_id),
                        origin,
                        destination,
                        request_time_ms: t_ms,
                        submitted_at_ms: Some(t_ms.saturating_sub(lead_ms)),
                        passenger_count: passengers.sample(&mut rng) as u32 + 1,
                    });
                    next_id += 1;
                }
            }
            t_ms += self.step_ms;
        }

        records.sort_by_key(|record| (record.submitted_at(), record.id));
        Ok(records)
    }

    fn draw_trip(&self, sampler: &PointSampler, rng: &mut StdRng) -> Option<(GeoPoint, GeoPoint)> {
        let origin = sampler.sample(rng);
        (0..MAX_DESTINATION_DRAWS)
            .map(|_| sampler.sample(rng))
            .find(|destination| {
                *destination != origin && origin.distance_km(*destination) >= self.min_trip_km
            })
            .map(|destination| (origin, destination))
    }
}

fn check_probability(name: &'static str, value: f64) -> Result<(), DemandError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(DemandError::InvalidProbability { name, value })
    }
}

enum PointSampler {
    Bounds {
        lat: (f64, f64),
        lng: (f64, f64),
    },
    Hotspots {
        points: Vec<GeoPoint>,
        index: WeightedIndex<f64>,
    },
}

impl PointSampler {
    fn new(area: &DemandArea) -> Result<Self, DemandError> {
        Ok(match area {
            DemandArea::Bounds {
                lat_min,
                lat_max,
                lng_min,
                lng_max,
            } => PointSampler::Bounds {
                lat: (*lat_min, *lat_max),
                lng: (*lng_min, *lng_max),
            },
            DemandArea::Hotspots { points } => PointSampler::Hotspots {
                points: points.iter().map(|h| h.point).collect(),
                index: WeightedIndex::new(points.iter().map(|h| h.weight))
                    .map_err(|err| DemandError::InvalidWeights(err.to_string()))?,
            },
        })
    }

    fn sample(&self, rng: &mut StdRng) -> GeoPoint {
        match self {
            PointSampler::Bounds { lat, lng } => {
                GeoPoint::new(rng.gen_range(lat.0..lat.1), rng.gen_range(lng.0..lng.1))
            }
            PointSampler::Hotspots { points, index } => points[index.sample(rng)],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let config = DemandConfig::default().with_horizon_ms(2 * MS_PER_HOUR);
        let a = config.generate().expect("generate");
        let b = config.generate().expect("generate");
        assert!(!a.is_empty());
        assert_eq!(a, b);

        let other = config.clone().with_seed(7).generate().expect("generate");
        assert_ne!(a, other);
    }

    #[test]
    fn stream_is_ordered_and_well_formed() {
        let config = DemandConfig::default();
        let records = config.generate().expect("generate");
        for pair in records.windows(2) {
            assert!(pair[0].submitted_at() <= pair[1].submitted_at());
        }
        for record in &records {
            assert!(record.submitted_at() <= record.request_time_ms);
            assert!((1..=6).contains(&record.passenger_count));
            assert_ne!(record.origin, record.destination);
            assert!(record.origin.distance_km(record.destination) >= config.min_trip_km);
        }
    }

    #[test]
    fn zero_demand_factor_generates_nothing() {
        let records = DemandConfig::default()
            .with_demand_factor(0.0)
            .generate()
            .expect("generate");
        assert!(records.is_empty());
    }

    #[test]
    fn hotspots_use_only_listed_points() {
        let points = vec![
            Hotspot {
                point: GeoPoint::new(52.50, 13.40),
                weight: 3.0,
            },
            Hotspot {
                point: GeoPoint::new(52.52, 13.42),
                weight: 1.0,
            },
            Hotspot {
                point: GeoPoint::new(52.54, 13.38),
                weight: 1.0,
            },
        ];
        let config = DemandConfig::default()
            .with_area(DemandArea::Hotspots {
                points: points.clone(),
            })
            .with_horizon_ms(MS_PER_HOUR);
        let records = config.generate().expect("generate");
        assert!(!records.is_empty());
        let listed: Vec<GeoPoint> = points.iter().map(|h| h.point).collect();
        assert!(records
            .iter()
            .all(|r| listed.contains(&r.origin) && listed.contains(&r.destination)));
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let mut config = DemandConfig::default();
        config.short_notice_probability = 1.5;
        assert!(config.validate().is_err());

        let mut config = DemandConfig::default();
        config.passenger_weights = vec![0.0, 0.0];
        assert!(matches!(
            config.validate(),
            Err(DemandError::InvalidWeights(_))
        ));

        let config = DemandConfig::default().with_area(DemandArea::Hotspots { points: vec![] });
        assert_eq!(config.validate(), Err(DemandError::EmptyArea));
    }

    #[test]
    fn probability_follows_hour_of_day() {
        let config = DemandConfig::default();
        assert_eq!(config.probability_at(0), DEFAULT_HOURLY_PROBABILITY[7]);
        assert_eq!(
            config.probability_at(18 * MS_PER_HOUR),
            DEFAULT_HOURLY_PROBABILITY[1]
        );
    }
}
