//! Spatial operations: H3 cells as stop locations and distance calculations.
//!
//! Every pickup and dropoff location is an H3 cell. Inputs arrive as lat/lng pairs
//! ([`GeoPoint`]) and are snapped to a cell at the configured resolution; distances are
//! great-circle distances between cell centres, memoized in a process-wide LRU cache.

use std::num::NonZeroUsize;
use std::sync::{Mutex, OnceLock};

use h3o::{CellIndex, LatLng, Resolution};
use lru::LruCache;
use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default snapping resolution (~240m cells), suitable for city-scale pooling.
pub const DEFAULT_RESOLUTION: Resolution = Resolution::Nine;

/// A WGS84 coordinate as it appears in configuration and CSV inputs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Great-circle distance to another point in kilometres (uncached).
    pub fn distance_km(self, other: GeoPoint) -> f64 {
        haversine_km(self.lat, self.lng, other.lat, other.lng)
    }

    /// Snap the point to the H3 cell containing it. Returns `None` for invalid coordinates.
    pub fn to_cell(self, resolution: Resolution) -> Option<CellIndex> {
        if !(-90.0..=90.0).contains(&self.lat) || !(-180.0..=180.0).contains(&self.lng) {
            return None;
        }
        LatLng::new(self.lat, self.lng)
            .ok()
            .map(|ll| ll.to_cell(resolution))
    }
}

impl From<CellIndex> for GeoPoint {
    fn from(cell: CellIndex) -> Self {
        let ll: LatLng = cell.into();
        Self {
            lat: ll.lat(),
            lng: ll.lng(),
        }
    }
}

/// Parse a raw H3 resolution number (0..=15).
pub fn resolution_from_u8(raw: u8) -> Option<Resolution> {
    Resolution::try_from(raw).ok()
}

fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let (lat1, lon1) = (lat1.to_radians(), lng1.to_radians());
    let (lat2, lon2) = (lat2.to_radians(), lng2.to_radians());
    let sin_dlat = ((lat2 - lat1) * 0.5).sin();
    let sin_dlon = ((lon2 - lon1) * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

fn distance_km_between_cells_uncached(a: CellIndex, b: CellIndex) -> f64 {
    let a: LatLng = a.into();
    let b: LatLng = b.into();
    haversine_km(a.lat(), a.lng(), b.lat(), b.lng())
}

/// Global distance cache (50,000 entries).
fn distance_cache() -> &'static Mutex<LruCache<(CellIndex, CellIndex), f64>> {
    static CACHE: OnceLock<Mutex<LruCache<(CellIndex, CellIndex), f64>>> = OnceLock::new();
    CACHE.get_or_init(|| {
        Mutex::new(LruCache::new(
            NonZeroUsize::new(50_000).expect("cache size must be non-zero"),
        ))
    })
}

/// Great-circle distance between two cell centres in kilometres, with LRU caching.
///
/// The key is symmetric (smaller cell first), so `d(a, b)` and `d(b, a)` share an entry and
/// are bit-identical.
pub fn distance_km_between_cells(a: CellIndex, b: CellIndex) -> f64 {
    if a == b {
        return 0.0;
    }
    let key = if a < b { (a, b) } else { (b, a) };

    let mut cache = match distance_cache().lock() {
        Ok(guard) => guard,
        Err(_) => return distance_km_between_cells_uncached(key.0, key.1), // poisoned: compute directly
    };

    *cache.get_or_insert(key, || distance_km_between_cells_uncached(key.0, key.1))
}
