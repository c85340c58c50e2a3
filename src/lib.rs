//! # Movement Metrics
//!
//! Per-step movement metrics for GPS-tracked animals.
//!
//! This library provides:
//! - Ingestion of delimited fix files into chronologically ordered tracks
//! - Step metrics between consecutive fixes (distance, elapsed time, speed)
//! - Speed-based anomaly filtering
//! - Heading and turning angle per step, followed by a completeness pass
//! - A land-cover join, per-track summaries and CSV/JSON export for reporting
//!
//! ## Features
//!
//! - **`parallel`** - Process tracks in parallel with rayon
//! - **`landcover`** - Land-cover join against GeoJSON polygon layers (default)
//! - **`cli`** - The `movement-metrics` command line tool
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use movement_metrics::{process_reader, IngestConfig, PipelineConfig};
//!
//! let csv = "\
//! track_id,timestamp,longitude,latitude
//! A,2021-06-01T10:00:00Z,0.0,0.0
//! A,2021-06-01T10:00:10Z,0.0001,0.0
//! A,2021-06-01T10:00:20Z,0.0001,0.0001
//! ";
//!
//! let output = process_reader(
//!     csv.as_bytes(),
//!     &IngestConfig::default(),
//!     &PipelineConfig::default(),
//! ).unwrap();
//!
//! // Only the third fix has both a step and a previous heading
//! assert_eq!(output.stats.retained, 1);
//! let fix = output.fixes().next().unwrap();
//! assert!((fix.turn_angle_rad.unwrap() - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
//! ```

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::io::Read;

pub mod error;
pub use error::TrackError;

pub mod geo_utils;

// Stage 1: parsing and chronological ordering
pub mod ingest;
pub use ingest::{order_tracks, read_fixes, read_fixes_from_path, IngestConfig};

// Stage 2: distance, elapsed time and speed
pub mod steps;
pub use steps::derive_steps;

// Stage 3 and the completeness pass
pub mod filter;
pub use filter::{complete_rows, filter_anomalies, is_complete, sanitize};

// Stage 4: heading and turning angle
pub mod heading;
pub use heading::derive_headings;

// Land-cover join (GeoJSON polygons)
#[cfg(feature = "landcover")]
pub mod landcover;

#[cfg(feature = "landcover")]
pub use landcover::LandCoverLayer;

// Reporting
pub mod summary;
pub use summary::{summarize, summarize_track, TrackSummary};

pub mod export;
pub use export::{write_fixes_csv, write_summaries_json};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use movement_metrics::GpsPoint;
/// let point = GpsPoint::new(47.3769, 8.5417); // Zurich
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Bounding box of a set of fixes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

/// One GPS observation of a tracked subject.
#[derive(Debug, Clone, PartialEq)]
pub struct Fix {
    /// Identity of the tracked subject
    pub track_id: String,
    /// Observation time, normalized to UTC
    pub timestamp: DateTime<Utc>,
    /// WGS84 longitude in degrees
    pub longitude: f64,
    /// WGS84 latitude in degrees
    pub latitude: f64,
}

impl Fix {
    pub fn new(track_id: &str, timestamp: DateTime<Utc>, longitude: f64, latitude: f64) -> Self {
        Self {
            track_id: track_id.to_string(),
            timestamp,
            longitude,
            latitude,
        }
    }

    pub fn point(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// The chronologically ordered fixes of one subject.
#[derive(Debug, Clone)]
pub struct Track {
    pub track_id: String,
    pub fixes: Vec<Fix>,
}

/// Position and time of the fix immediately preceding a [`DerivedFix`] in the
/// same track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrevFix {
    pub longitude: f64,
    pub latitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl PrevFix {
    pub fn point(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }
}

/// A fix together with the metrics of the step that led to it.
///
/// Every derived field is absent on the first fix of a track.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedFix {
    pub fix: Fix,
    /// Position of the fix in its track's ordered sequence, before any filtering
    pub seq: usize,
    pub prev: Option<PrevFix>,
    /// Great-circle step length in meters
    pub distance_m: Option<f64>,
    /// Seconds since the previous fix (may be zero or negative)
    pub elapsed_s: Option<f64>,
    /// `distance_m / elapsed_s`, untrapped
    pub speed_mps: Option<f64>,
    /// Planar direction of travel in (−π, π], 0 = east
    pub heading_rad: Option<f64>,
    /// Absolute heading change from the previous retained fix
    pub turn_angle_rad: Option<f64>,
}

impl DerivedFix {
    /// A fix with no derived fields.
    pub fn bare(fix: Fix, seq: usize) -> Self {
        Self {
            fix,
            seq,
            prev: None,
            distance_m: None,
            elapsed_s: None,
            speed_mps: None,
            heading_rad: None,
            turn_angle_rad: None,
        }
    }

    pub fn point(&self) -> GpsPoint {
        self.fix.point()
    }

    pub fn is_track_start(&self) -> bool {
        self.prev.is_none()
    }
}

/// The derived fixes of one subject, in chronological order.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedTrack {
    pub track_id: String,
    pub fixes: Vec<DerivedFix>,
}

// ============================================================================
// Configuration
// ============================================================================

/// Which fix a turning angle is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum TurnPolicy {
    /// Previous heading comes from the immediately preceding retained fix,
    /// even when filtering removed fixes in between.
    #[default]
    RetainedPredecessor,
    /// As above, but no turning angle is produced across a filtering gap.
    ContiguousOnly,
}

/// Configuration for the movement pipeline.
///
/// Deserializes from partial JSON; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Exclusive lower speed bound in m/s. Steps at or below it are dropped.
    /// Default: 0.0 (drops zero-distance repeats and negative time steps)
    pub min_speed_mps: f64,

    /// Exclusive upper speed bound in m/s. Steps at or above it are dropped.
    /// Default: 10.0 (above a dog's sustained running speed)
    pub max_speed_mps: f64,

    /// Steps spanning more than this many seconds are dropped as well.
    /// Default: None (no gap limit)
    pub max_elapsed_s: Option<f64>,

    /// Turning angle lookback after filtering.
    /// Default: RetainedPredecessor
    pub turn_policy: TurnPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_speed_mps: 0.0,
            max_speed_mps: 10.0,
            max_elapsed_s: None,
            turn_policy: TurnPolicy::RetainedPredecessor,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file and validate it.
    pub fn from_json_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self, TrackError> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject bounds under which no step could ever pass the speed filter.
    ///
    /// # Example
    /// ```
    /// use movement_metrics::PipelineConfig;
    ///
    /// assert!(PipelineConfig::default().validate().is_ok());
    ///
    /// let inverted = PipelineConfig { min_speed_mps: 5.0, max_speed_mps: 2.0, ..PipelineConfig::default() };
    /// assert!(inverted.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), TrackError> {
        if self.min_speed_mps.is_nan() {
            return Err(TrackError::InvalidConfig("min_speed_mps is NaN".to_string()));
        }
        if self.max_speed_mps.is_nan() {
            return Err(TrackError::InvalidConfig("max_speed_mps is NaN".to_string()));
        }
        // The lower bound is clamped at zero by the filter
        let floor = self.min_speed_mps.max(0.0);
        if self.max_speed_mps <= floor {
            return Err(TrackError::InvalidConfig(format!(
                "max_speed_mps {} must exceed min_speed_mps {}",
                self.max_speed_mps, floor
            )));
        }
        if let Some(limit) = self.max_elapsed_s {
            if limit.is_nan() || limit <= 0.0 {
                return Err(TrackError::InvalidConfig(format!(
                    "max_elapsed_s {limit} must be a positive number of seconds"
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Row counts for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Fixes read from input
    pub ingested: usize,
    /// Distinct track ids in input
    pub tracks: usize,
    /// Fixes removed by the speed filter
    pub dropped_anomalous: usize,
    /// Fixes removed by the completeness pass
    pub dropped_incomplete: usize,
    /// Fixes in the final output
    pub retained: usize,
}

/// Final, fully enriched tracks. Tracks with no complete rows are omitted.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub tracks: Vec<DerivedTrack>,
    pub stats: PipelineStats,
}

impl PipelineOutput {
    /// All retained fixes in (track id, timestamp) order.
    pub fn fixes(&self) -> impl Iterator<Item = &DerivedFix> {
        self.tracks.iter().flat_map(|t| t.fixes.iter())
    }
}

/// Run every stage on one track. Returns the complete rows and the number of
/// rows dropped by the speed filter and by the completeness pass.
fn process_track(track: Track, config: &PipelineConfig) -> (DerivedTrack, usize, usize) {
    let derived = derive_steps(&track);
    let (mut filtered, anomalous) = filter_anomalies(derived, config);
    derive_headings(&mut filtered, config.turn_policy);
    let (complete, incomplete) = complete_rows(filtered);

    debug!(
        "[pipeline] track {}: {} fixes, {} anomalous, {} incomplete, {} retained",
        track.track_id,
        track.fixes.len(),
        anomalous,
        incomplete,
        complete.fixes.len()
    );

    (complete, anomalous, incomplete)
}

/// Run the full pipeline over a batch of fixes.
///
/// Fixes are grouped and ordered by track, then each track passes through
/// step derivation, anomaly filtering, heading derivation and the
/// completeness pass. The result is deterministic for a given input.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use movement_metrics::{run_pipeline, Fix, PipelineConfig};
///
/// let t0 = Utc.with_ymd_and_hms(2021, 6, 1, 10, 0, 0).unwrap();
/// let fixes = vec![Fix::new("solo", t0, 8.54, 47.37)];
///
/// let output = run_pipeline(fixes, &PipelineConfig::default());
/// assert_eq!(output.stats.ingested, 1);
/// assert!(output.tracks.is_empty());
/// ```
pub fn run_pipeline(fixes: Vec<Fix>, config: &PipelineConfig) -> PipelineOutput {
    let ingested = fixes.len();
    let tracks = order_tracks(fixes);
    let track_count = tracks.len();

    #[cfg(feature = "parallel")]
    let processed: Vec<(DerivedTrack, usize, usize)> = {
        use rayon::prelude::*;
        tracks
            .into_par_iter()
            .map(|track| process_track(track, config))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let processed: Vec<(DerivedTrack, usize, usize)> = tracks
        .into_iter()
        .map(|track| process_track(track, config))
        .collect();

    let mut stats = PipelineStats {
        ingested,
        tracks: track_count,
        ..PipelineStats::default()
    };
    let mut output_tracks = Vec::with_capacity(processed.len());

    for (track, anomalous, incomplete) in processed {
        stats.dropped_anomalous += anomalous;
        stats.dropped_incomplete += incomplete;
        stats.retained += track.fixes.len();
        if !track.fixes.is_empty() {
            output_tracks.push(track);
        }
    }

    info!(
        "[pipeline] {} fixes in {} tracks: {} anomalous, {} incomplete, {} retained",
        stats.ingested, stats.tracks, stats.dropped_anomalous, stats.dropped_incomplete, stats.retained
    );

    PipelineOutput {
        tracks: output_tracks,
        stats,
    }
}

/// Read fixes from delimited text and run the full pipeline.
///
/// Ingestion errors are fatal; nothing is processed from a malformed batch.
/// An invalid `config` is rejected before any input is read.
pub fn process_reader<R: Read>(
    reader: R,
    ingest_config: &IngestConfig,
    config: &PipelineConfig,
) -> Result<PipelineOutput, TrackError> {
    config.validate()?;
    let fixes = read_fixes(reader, ingest_config)?;
    Ok(run_pipeline(fixes, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use std::f64::consts::{FRAC_PI_2, PI};

    fn t(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 6, 1, 10, 0, 0).unwrap() + Duration::seconds(seconds)
    }

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    /// A dog walking east at ~1.1 m/s with a gentle zig-zag.
    fn walk(track_id: &str, start_lng: f64, n: usize) -> Vec<Fix> {
        (0..n)
            .map(|i| {
                let lat = if i % 2 == 0 { 0.0 } else { 0.00002 };
                Fix::new(track_id, t(i as i64 * 10), start_lng + i as f64 * 0.0001, lat)
            })
            .collect()
    }

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(51.5074, -0.1278).is_valid());
        assert!(!GpsPoint::new(91.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 181.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_three_fix_scenario() {
        let fixes = vec![
            Fix::new("A", t(0), 0.0, 0.0),
            Fix::new("A", t(10), 0.0001, 0.0),
            Fix::new("A", t(20), 0.0001, 0.0001),
        ];

        let output = run_pipeline(fixes, &PipelineConfig::default());
        assert_eq!(output.stats.ingested, 3);
        assert_eq!(output.stats.dropped_anomalous, 0);
        assert_eq!(output.stats.dropped_incomplete, 2);
        assert_eq!(output.stats.retained, 1);

        let third = output.fixes().next().unwrap();
        assert_eq!(third.seq, 2);
        assert!(approx_eq(third.distance_m.unwrap(), 11.12, 0.05));
        assert_eq!(third.elapsed_s, Some(10.0));
        assert!(approx_eq(third.speed_mps.unwrap(), 1.112, 0.01));
        assert!(approx_eq(third.heading_rad.unwrap(), FRAC_PI_2, 1e-9));
        assert!(approx_eq(third.turn_angle_rad.unwrap(), FRAC_PI_2, 1e-9));
    }

    #[test]
    fn test_duplicate_timestamp_dropped() {
        let mut fixes = walk("A", 0.0, 5);
        // Same time as the previous fix but moved: infinite speed
        fixes[3].timestamp = fixes[2].timestamp;

        let output = run_pipeline(fixes, &PipelineConfig::default());
        assert!(output.fixes().all(|f| f.seq != 3));
        assert_eq!(output.stats.dropped_anomalous, 1);
    }

    #[test]
    fn test_fast_step_dropped() {
        let mut fixes = walk("A", 0.0, 5);
        // ~150 m in 10 s = 15 m/s
        fixes[2].longitude = fixes[1].longitude + 150.0 / 111_195.0;

        let output = run_pipeline(fixes, &PipelineConfig::default());
        assert!(output.fixes().all(|f| f.seq != 2));
        assert!(output.stats.dropped_anomalous >= 1);
    }

    #[test]
    fn test_single_fix_track_contributes_nothing() {
        let mut fixes = walk("A", 0.0, 6);
        fixes.push(Fix::new("solo", t(0), 8.54, 47.37));

        let output = run_pipeline(fixes, &PipelineConfig::default());
        assert_eq!(output.stats.tracks, 2);
        assert_eq!(output.tracks.len(), 1);
        assert!(output.fixes().all(|f| f.fix.track_id == "A"));
    }

    #[test]
    fn test_output_invariants() {
        let mut fixes = walk("B", 10.0, 30);
        fixes.extend(walk("A", 0.0, 30));
        // A stationary repeat and a teleport
        fixes[5].longitude = fixes[4].longitude;
        fixes[5].latitude = fixes[4].latitude;
        fixes[40].longitude += 0.01;

        let output = run_pipeline(fixes, &PipelineConfig::default());
        assert_eq!(output.tracks.len(), 2);
        assert_eq!(output.tracks[0].track_id, "A");

        for track in &output.tracks {
            for pair in track.fixes.windows(2) {
                assert!(pair[0].fix.timestamp <= pair[1].fix.timestamp);
            }
            for f in &track.fixes {
                assert!(is_complete(f));
                assert_eq!(f.fix.track_id, track.track_id);
                let speed = f.speed_mps.unwrap();
                assert!(speed > 0.0 && speed < 10.0);
                assert!(f.elapsed_s.unwrap() > 0.0);
                assert!(f.distance_m.unwrap() >= 0.0);
                let heading = f.heading_rad.unwrap();
                assert!(heading > -PI && heading <= PI);
                assert!(f.turn_angle_rad.unwrap().is_finite());
            }
        }
    }

    #[test]
    fn test_prev_never_crosses_tracks() {
        // Interleaved input for two subjects at the same times
        let mut fixes = Vec::new();
        for (a, b) in walk("A", 0.0, 10).into_iter().zip(walk("B", 50.0, 10)) {
            fixes.push(a);
            fixes.push(b);
        }

        let output = run_pipeline(fixes, &PipelineConfig::default());
        for f in output.fixes() {
            let prev = f.prev.unwrap();
            let same_track_lng = if f.fix.track_id == "A" { prev.longitude < 1.0 } else { prev.longitude >= 50.0 };
            assert!(same_track_lng);
        }
    }

    #[test]
    fn test_deterministic() {
        let mut fixes = walk("B", 10.0, 20);
        fixes.extend(walk("A", 0.0, 20));
        fixes.swap(3, 27);

        let first = run_pipeline(fixes.clone(), &PipelineConfig::default());
        let second = run_pipeline(fixes, &PipelineConfig::default());
        assert_eq!(first, second);
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"max_speed_mps": 4.5, "turn_policy": "contiguous_only"}"#).unwrap();
        assert_eq!(config.max_speed_mps, 4.5);
        assert_eq!(config.min_speed_mps, 0.0);
        assert_eq!(config.max_elapsed_s, None);
        assert_eq!(config.turn_policy, TurnPolicy::ContiguousOnly);
    }

    #[test]
    fn test_config_validation() {
        let valid = [
            PipelineConfig::default(),
            PipelineConfig {
                min_speed_mps: -5.0,
                max_speed_mps: 2.0,
                max_elapsed_s: Some(60.0),
                ..PipelineConfig::default()
            },
        ];
        for config in &valid {
            assert!(config.validate().is_ok(), "{config:?}");
        }

        let invalid = [
            PipelineConfig { max_speed_mps: f64::NAN, ..PipelineConfig::default() },
            PipelineConfig { min_speed_mps: f64::NAN, ..PipelineConfig::default() },
            PipelineConfig { max_elapsed_s: Some(f64::NAN), ..PipelineConfig::default() },
            PipelineConfig { max_elapsed_s: Some(0.0), ..PipelineConfig::default() },
            PipelineConfig { min_speed_mps: 10.0, ..PipelineConfig::default() },
            PipelineConfig { max_speed_mps: -1.0, ..PipelineConfig::default() },
        ];
        for config in &invalid {
            assert!(matches!(config.validate(), Err(TrackError::InvalidConfig(_))), "{config:?}");
        }
    }

    #[test]
    fn test_config_from_json_path_rejects_inverted_bounds() {
        let path = std::env::temp_dir().join(format!("movement-metrics-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"min_speed_mps": 4.0, "max_speed_mps": 4.0}"#).unwrap();
        let result = PipelineConfig::from_json_path(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(result, Err(TrackError::InvalidConfig(_))));
    }

    #[test]
    fn test_process_reader_rejects_invalid_config() {
        let config = PipelineConfig {
            max_speed_mps: f64::NAN,
            ..PipelineConfig::default()
        };
        let err = process_reader("not,a,header\n".as_bytes(), &IngestConfig::default(), &config).unwrap_err();
        assert!(matches!(err, TrackError::InvalidConfig(_)));
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn test_parallel_matches_sequential() {
        let mut fixes = Vec::new();
        for (i, id) in ["C", "A", "D", "B", "E"].iter().enumerate() {
            let mut track = walk(id, i as f64 * 5.0, 25);
            track[7].longitude += 0.01;
            fixes.extend(track);
        }
        let config = PipelineConfig::default();

        let parallel = run_pipeline(fixes.clone(), &config);

        let mut expected = Vec::new();
        let (mut anomalous, mut incomplete) = (0, 0);
        for track in order_tracks(fixes) {
            let (complete, a, i) = process_track(track, &config);
            anomalous += a;
            incomplete += i;
            if !complete.fixes.is_empty() {
                expected.push(complete);
            }
        }

        assert_eq!(parallel.tracks, expected);
        assert_eq!(parallel.stats.dropped_anomalous, anomalous);
        assert_eq!(parallel.stats.dropped_incomplete, incomplete);
        let ids: Vec<&str> = parallel.tracks.iter().map(|t| t.track_id.as_str()).collect();
        assert_eq!(ids, vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn test_process_reader() {
        let csv = "track_id,timestamp,longitude,latitude\n\
                   A,2021-06-01T10:00:00Z,0.0,0.0\n\
                   A,2021-06-01T10:00:10Z,0.0001,0.0\n\
                   A,2021-06-01T10:00:20Z,0.0001,0.0001\n";
        let output = process_reader(csv.as_bytes(), &IngestConfig::default(), &PipelineConfig::default()).unwrap();
        assert_eq!(output.stats.retained, 1);
    }
}
