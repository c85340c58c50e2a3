//! Per-track summaries of the final fixes, for reports.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::geo_utils::{compute_bounds, compute_center};
use crate::steps::elapsed_seconds;
use crate::{Bounds, DerivedTrack, GpsPoint, PipelineOutput};

/// Aggregate movement figures for one track.
///
/// Distances and speeds are taken from retained steps only, so
/// `total_distance_m` undercounts a track that lost fixes to filtering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackSummary {
    pub track_id: String,
    /// Number of retained fixes
    pub fixes: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Seconds from first to last retained fix
    pub duration_s: f64,
    /// Sum of retained step lengths in meters
    pub total_distance_m: f64,
    pub mean_speed_mps: f64,
    pub median_speed_mps: f64,
    pub max_speed_mps: f64,
    pub mean_turn_angle_rad: f64,
    pub bounds: Bounds,
    pub center: GpsPoint,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Summarize one track. Returns `None` for a track with no fixes.
pub fn summarize_track(track: &DerivedTrack) -> Option<TrackSummary> {
    let first = track.fixes.first()?;
    let last = track.fixes.last()?;

    let points: Vec<GpsPoint> = track.fixes.iter().map(|f| f.point()).collect();
    let bounds = compute_bounds(&points)?;
    let speeds: Vec<f64> = track.fixes.iter().filter_map(|f| f.speed_mps).collect();
    let turns: Vec<f64> = track.fixes.iter().filter_map(|f| f.turn_angle_rad).collect();

    Some(TrackSummary {
        track_id: track.track_id.clone(),
        fixes: track.fixes.len(),
        start: first.fix.timestamp,
        end: last.fix.timestamp,
        duration_s: elapsed_seconds(first.fix.timestamp, last.fix.timestamp),
        total_distance_m: track.fixes.iter().filter_map(|f| f.distance_m).sum(),
        mean_speed_mps: mean(&speeds),
        median_speed_mps: median(&speeds),
        max_speed_mps: speeds.iter().copied().fold(0.0, f64::max),
        mean_turn_angle_rad: mean(&turns),
        bounds,
        center: compute_center(&points),
    })
}

/// Summaries for every output track, in track order.
pub fn summarize(output: &PipelineOutput) -> Vec<TrackSummary> {
    output.tracks.iter().filter_map(summarize_track).collect()
}
