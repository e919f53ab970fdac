//! CSV inputs: request streams and origin/destination travel tables.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use h3o::Resolution;
use ridepool_core::spatial::GeoPoint;
use ridepool_core::travel::{HaversineTravelModel, TableTravelModel, TravelLeg};
use ridepool_core::{RequestId, RequestRecord};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub enum ImportError {
    Io(String),
    Csv { line: Option<u64>, message: String },
    InvalidLocation { line: Option<u64>, point: GeoPoint },
    InvalidValue { line: Option<u64>, name: &'static str, value: f64 },
    InvalidWindow { start_ms: u64, end_ms: u64 },
}

impl fmt::Display for ImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportError::Io(message) => write!(f, "cannot read input: {message}"),
            ImportError::Csv { line, message } => {
                write!(f, "malformed csv{}: {message}", at_line(*line))
            }
            ImportError::InvalidLocation { line, point } => write!(
                f,
                "invalid coordinate ({}, {}){}",
                point.lat,
                point.lng,
                at_line(*line)
            ),
            ImportError::InvalidValue { line, name, value } => {
                write!(f, "invalid `{name}` {value}{}", at_line(*line))
            }
            ImportError::InvalidWindow { start_ms, end_ms } => {
                write!(f, "window start {start_ms} is after end {end_ms}")
            }
        }
    }
}

impl std::error::Error for ImportError {}

fn at_line(line: Option<u64>) -> String {
    line.map(|line| format!(" at line {line}")).unwrap_or_default()
}

impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::Csv {
            line: err.position().map(|position| position.line()),
            message: err.to_string(),
        }
    }
}

/// Inclusive bounds on `request_time_ms`; rows outside are dropped on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestWindow {
    pub start_ms: u64,
    pub end_ms: u64,
}

impl RequestWindow {
    pub fn new(start_ms: u64, end_ms: u64) -> Result<Self, ImportError> {
        if start_ms > end_ms {
            return Err(ImportError::InvalidWindow { start_ms, end_ms });
        }
        Ok(Self { start_ms, end_ms })
    }

    pub fn contains(&self, at_ms: u64) -> bool {
        (self.start_ms..=self.end_ms).contains(&at_ms)
    }
}

#[derive(Debug, Deserialize)]
struct CsvRequest {
    id: u64,
    origin_lat: f64,
    origin_lng: f64,
    destination_lat: f64,
    destination_lng: f64,
    request_time_ms: u64,
    #[serde(default)]
    submitted_at_ms: Option<u64>,
    passengers: u32,
}

impl From<CsvRequest> for RequestRecord {
    fn from(row: CsvRequest) -> Self {
        RequestRecord {
            id: RequestId(row.id),
            origin: GeoPoint::new(row.origin_lat, row.origin_lng),
            destination: GeoPoint::new(row.destination_lat, row.destination_lng),
            request_time_ms: row.request_time_ms,
            submitted_at_ms: row.submitted_at_ms,
            passenger_count: row.passengers,
        }
    }
}

/// Read a request stream, keeping rows inside `window`, ordered by submission time then id.
pub fn read_requests<R: Read>(
    reader: R,
    window: Option<RequestWindow>,
) -> Result<Vec<RequestRecord>, ImportError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();
    for row in reader.deserialize::<CsvRequest>() {
        let record = RequestRecord::from(row?);
        if window.map_or(true, |window| window.contains(record.request_time_ms)) {
            records.push(record);
        }
    }
    records.sort_by_key(|record| (record.submitted_at(), record.id));
    Ok(records)
}

pub fn read_requests_csv(
    path: impl AsRef<Path>,
    window: Option<RequestWindow>,
) -> Result<Vec<RequestRecord>, ImportError> {
    read_requests(open(path.as_ref())?, window)
}

#[derive(Debug, Deserialize)]
struct CsvTravelLeg {
    from_lat: f64,
    from_lng: f64,
    to_lat: f64,
    to_lng: f64,
    distance_km: f64,
    duration_s: f64,
}

/// Read a directed travel table. Pairs missing from the table fall back to `fallback`.
pub fn read_travel_table<R: Read>(
    reader: R,
    resolution: Resolution,
    fallback: HaversineTravelModel,
) -> Result<TableTravelModel, ImportError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut table = TableTravelModel::new(fallback);
    let headers = reader.headers()?.clone();
    for raw in reader.records() {
        let raw = raw?;
        let line = raw.position().map(|position| position.line());
        let row: CsvTravelLeg = raw.deserialize(Some(&headers))?;
        let from = snap(GeoPoint::new(row.from_lat, row.from_lng), resolution, line)?;
        let to = snap(GeoPoint::new(row.to_lat, row.to_lng), resolution, line)?;
        for (name, value) in [("distance_km", row.distance_km), ("duration_s", row.duration_s)] {
            if !value.is_finite() || value < 0.0 {
                return Err(ImportError::InvalidValue { line, name, value });
            }
        }
        table.insert(
            from,
            to,
            TravelLeg {
                distance_km: row.distance_km,
                duration_ms: (row.duration_s * 1000.0).round() as u64,
            },
        );
    }
    Ok(table)
}

pub fn read_travel_table_csv(
    path: impl AsRef<Path>,
    resolution: Resolution,
    fallback: HaversineTravelModel,
) -> Result<TableTravelModel, ImportError> {
    read_travel_table(open(path.as_ref())?, resolution, fallback)
}

fn snap(
    point: GeoPoint,
    resolution: Resolution,
    line: Option<u64>,
) -> Result<h3o::CellIndex, ImportError> {
    point
        .to_cell(resolution)
        .ok_or(ImportError::InvalidLocation { line, point })
}

fn open(path: &Path) -> Result<File, ImportError> {
    File::open(path).map_err(|err| ImportError::Io(format!("{}: {err}", path.display())))
}
