//! Fix ingestion and chronological ordering.
//!
//! Reads delimited text with a header row, locates the track, timestamp and
//! coordinate columns by name, and groups the fixes into tracks sorted by time.
//! Any unparseable row fails the whole batch.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use csv::StringRecord;
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::{Fix, GpsPoint, Track, TrackError};

/// Naive layouts, read as UTC. `%.f` also matches an absent fraction.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Layouts carrying an explicit offset that RFC 3339 rejects: a space
/// separator, or a basic `±HHMM` offset.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Column layout of the input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Column holding the subject identity. Default: "track_id"
    pub track_column: String,
    /// Column holding the fix time. Default: "timestamp"
    pub timestamp_column: String,
    /// Default: "longitude"
    pub longitude_column: String,
    /// Default: "latitude"
    pub latitude_column: String,
    /// Field delimiter, must be ASCII. Default: ','
    pub delimiter: char,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            track_column: "track_id".to_string(),
            timestamp_column: "timestamp".to_string(),
            longitude_column: "longitude".to_string(),
            latitude_column: "latitude".to_string(),
            delimiter: ',',
        }
    }
}

/// Header positions of the four required columns.
struct Columns {
    track: usize,
    timestamp: usize,
    longitude: usize,
    latitude: usize,
}

impl Columns {
    fn locate(headers: &StringRecord, config: &IngestConfig) -> Result<Self, TrackError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| TrackError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            track: find(&config.track_column)?,
            timestamp: find(&config.timestamp_column)?,
            longitude: find(&config.longitude_column)?,
            latitude: find(&config.latitude_column)?,
        })
    }

    fn parse(&self, record: &StringRecord, row: usize, config: &IngestConfig) -> Result<Fix, TrackError> {
        let field = |idx: usize| record.get(idx).unwrap_or("");

        let raw_timestamp = field(self.timestamp);
        let timestamp = parse_timestamp(raw_timestamp).ok_or_else(|| TrackError::InvalidTimestamp {
            row,
            value: raw_timestamp.to_string(),
        })?;

        let longitude = parse_coordinate(field(self.longitude), row, &config.longitude_column)?;
        let latitude = parse_coordinate(field(self.latitude), row, &config.latitude_column)?;

        if !GpsPoint::new(latitude, longitude).is_valid() {
            let (column, value) = if latitude.abs() > 90.0 {
                (&config.latitude_column, latitude)
            } else {
                (&config.longitude_column, longitude)
            };
            return Err(TrackError::InvalidCoordinate {
                row,
                column: column.clone(),
                value: value.to_string(),
            });
        }

        Ok(Fix::new(field(self.track), timestamp, longitude, latitude))
    }
}

fn parse_coordinate(value: &str, row: usize, column: &str) -> Result<f64, TrackError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| TrackError::InvalidCoordinate {
            row,
            column: column.to_string(),
            value: value.to_string(),
        })
}

/// Parse an ISO-8601-like timestamp into UTC.
///
/// Accepts RFC 3339, `YYYY-MM-DD[T ]HH:MM:SS[.f]` with an optional `±HH:MM`
/// or `±HHMM` offset, and naive minute precision `YYYY-MM-DD[T ]HH:MM`.
/// Naive times are taken as UTC.
///
/// # Example
/// ```
/// use movement_metrics::ingest::parse_timestamp;
///
/// let a = parse_timestamp("2021-06-01T12:00:00+02:00").unwrap();
/// let b = parse_timestamp("2021-06-01 10:00:00").unwrap();
/// assert_eq!(a, b);
/// assert!(parse_timestamp("yesterday").is_none());
/// ```
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Read every fix from delimited text with a header row.
///
/// Rows are numbered from 1, excluding the header, in error messages.
pub fn read_fixes<R: Read>(reader: R, config: &IngestConfig) -> Result<Vec<Fix>, TrackError> {
    let delimiter = u8::try_from(config.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or(TrackError::InvalidDelimiter(config.delimiter))?;

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let columns = Columns::locate(&headers, config)?;

    let mut fixes = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        fixes.push(columns.parse(&record, i + 1, config)?);
    }

    info!("[ingest] read {} fixes", fixes.len());
    Ok(fixes)
}

/// Read every fix from a delimited file.
pub fn read_fixes_from_path<P: AsRef<Path>>(path: P, config: &IngestConfig) -> Result<Vec<Fix>, TrackError> {
    let file = File::open(path.as_ref())?;
    info!("[ingest] reading {}", path.as_ref().display());
    read_fixes(file, config)
}

/// Group fixes into tracks ordered by track id, each sorted by time.
///
/// The sort is stable, so fixes sharing a timestamp keep their input order.
/// Duplicates are kept.
pub fn order_tracks(mut fixes: Vec<Fix>) -> Vec<Track> {
    fixes.sort_by(|a, b| {
        a.track_id
            .cmp(&b.track_id)
            .then_with(|| a.timestamp.cmp(&b.timestamp))
    });

    let mut tracks: Vec<Track> = Vec::new();
    for fix in fixes {
        match tracks.last_mut() {
            Some(track) if track.track_id == fix.track_id => track.fixes.push(fix),
            _ => tracks.push(Track {
                track_id: fix.track_id.clone(),
                fixes: vec![fix],
            }),
        }
    }

    tracks
}
