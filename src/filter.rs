//! Anomaly filtering and the final completeness pass.
//!
//! Both are pure filters: values are never corrected or imputed, only rows
//! dropped.

use crate::{DerivedFix, DerivedTrack, PipelineConfig};

// =============================================================================
// Anomaly Filter
// =============================================================================

/// Whether a fix's step describes plausible movement.
///
/// Track starts always pass; they carry no step. Otherwise the speed must be
/// finite and strictly between the configured bounds. The lower bound is never
/// allowed below zero, so stationary repeats and time reversals always fail.
pub fn is_plausible(fix: &DerivedFix, config: &PipelineConfig) -> bool {
    if fix.is_track_start() {
        return true;
    }

    let speed = match fix.speed_mps {
        Some(speed) if speed.is_finite() => speed,
        _ => return false,
    };

    if speed <= config.min_speed_mps.max(0.0) || speed >= config.max_speed_mps {
        return false;
    }

    match (config.max_elapsed_s, fix.elapsed_s) {
        (Some(max), Some(elapsed)) => elapsed <= max,
        _ => true,
    }
}

/// Drop fixes whose step is implausible. Returns the filtered track and the
/// number of fixes removed.
pub fn filter_anomalies(track: DerivedTrack, config: &PipelineConfig) -> (DerivedTrack, usize) {
    let before = track.fixes.len();
    let fixes: Vec<DerivedFix> = track
        .fixes
        .into_iter()
        .filter(|fix| is_plausible(fix, config))
        .collect();
    let dropped = before - fixes.len();

    (
        DerivedTrack {
            track_id: track.track_id,
            fixes,
        },
        dropped,
    )
}

// =============================================================================
// Completeness Pass
// =============================================================================

/// Map an infinite or NaN value to missing.
///
/// ```
/// use movement_metrics::sanitize;
///
/// assert_eq!(sanitize(Some(1.5)), Some(1.5));
/// assert_eq!(sanitize(Some(f64::INFINITY)), None);
/// assert_eq!(sanitize(Some(f64::NAN)), None);
/// assert_eq!(sanitize(None), None);
/// ```
#[inline]
pub fn sanitize(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn sanitize_fix(mut fix: DerivedFix) -> DerivedFix {
    fix.distance_m = sanitize(fix.distance_m);
    fix.elapsed_s = sanitize(fix.elapsed_s);
    fix.speed_mps = sanitize(fix.speed_mps);
    fix.heading_rad = sanitize(fix.heading_rad);
    fix.turn_angle_rad = sanitize(fix.turn_angle_rad);
    fix.prev = fix
        .prev
        .filter(|prev| prev.longitude.is_finite() && prev.latitude.is_finite());
    fix
}

/// Whether every numeric derived field of a fix is present.
pub fn is_complete(fix: &DerivedFix) -> bool {
    fix.prev.is_some()
        && fix.distance_m.is_some()
        && fix.elapsed_s.is_some()
        && fix.speed_mps.is_some()
        && fix.heading_rad.is_some()
        && fix.turn_angle_rad.is_some()
}

/// Sanitize every numeric field, then keep only complete rows. Returns the
/// remaining track and the number of rows dropped.
pub fn complete_rows(track: DerivedTrack) -> (DerivedTrack, usize) {
    let before = track.fixes.len();
    let fixes: Vec<DerivedFix> = track
        .fixes
        .into_iter()
        .map(sanitize_fix)
        .filter(is_complete)
        .collect();
    let dropped = before - fixes.len();

    (
        DerivedTrack {
            track_id: track.track_id,
            fixes,
        },
        dropped,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Fix, PrevFix};
    use chrono::{TimeZone, Utc};

    fn step(seq: usize, distance: f64, elapsed: f64) -> DerivedFix {
        let t = Utc.with_ymd_and_hms(2021, 6, 1, 10, 0, 0).unwrap();
        let mut fix = DerivedFix::bare(Fix::new("A", t, 0.0, 0.0), seq);
        if seq > 0 {
            fix.prev = Some(PrevFix { longitude: 0.0, latitude: 0.0, timestamp: t });
            fix.distance_m = Some(distance);
            fix.elapsed_s = Some(elapsed);
            fix.speed_mps = Some(distance / elapsed);
        }
        fix
    }

    fn complete(seq: usize) -> DerivedFix {
        let mut fix = step(seq, 10.0, 10.0);
        fix.heading_rad = Some(0.0);
        fix.turn_angle_rad = Some(0.0);
        fix
    }

    #[test]
    fn test_track_start_passes() {
        assert!(is_plausible(&step(0, 0.0, 0.0), &PipelineConfig::default()));
    }

    #[test]
    fn test_speed_bounds() {
        let config = PipelineConfig::default();
        assert!(is_plausible(&step(1, 11.0, 10.0), &config));
        assert!(is_plausible(&step(1, 99.0, 10.0), &config));
        assert!(!is_plausible(&step(1, 100.0, 10.0), &config)); // exactly 10 m/s
        assert!(!is_plausible(&step(1, 150.0, 10.0), &config));
        assert!(!is_plausible(&step(1, 0.0, 10.0), &config));
        assert!(!is_plausible(&step(1, 10.0, -10.0), &config));
        assert!(!is_plausible(&step(1, 10.0, 0.0), &config)); // infinite
        assert!(!is_plausible(&step(1, 0.0, 0.0), &config)); // NaN
    }

    #[test]
    fn test_missing_speed_rejected() {
        let mut fix = step(1, 10.0, 10.0);
        fix.speed_mps = None;
        assert!(!is_plausible(&fix, &PipelineConfig::default()));
    }

    #[test]
    fn test_configured_bounds() {
        let config = PipelineConfig {
            min_speed_mps: -5.0,
            max_speed_mps: 2.0,
            max_elapsed_s: Some(60.0),
            ..PipelineConfig::default()
        };
        // Lower bound is clamped at zero
        assert!(!is_plausible(&step(1, 10.0, -10.0), &config));
        assert!(!is_plausible(&step(1, 25.0, 10.0), &config));
        assert!(is_plausible(&step(1, 15.0, 10.0), &config));
        assert!(!is_plausible(&step(1, 100.0, 120.0), &config));
    }

    #[test]
    fn test_filter_anomalies_counts() {
        let track = DerivedTrack {
            track_id: "A".to_string(),
            fixes: vec![step(0, 0.0, 0.0), step(1, 10.0, 10.0), step(2, 10.0, 0.0), step(3, 500.0, 10.0)],
        };
        let (filtered, dropped) = filter_anomalies(track, &PipelineConfig::default());
        assert_eq!(dropped, 2);
        let seqs: Vec<usize> = filtered.fixes.iter().map(|f| f.seq).collect();
        assert_eq!(seqs, vec![0, 1]);
    }

    #[test]
    fn test_is_complete() {
        assert!(is_complete(&complete(1)));
        assert!(!is_complete(&step(0, 0.0, 0.0)));

        let mut no_turn = complete(1);
        no_turn.turn_angle_rad = None;
        assert!(!is_complete(&no_turn));
    }

    #[test]
    fn test_complete_rows_drops_non_finite() {
        let mut infinite_heading = complete(2);
        infinite_heading.heading_rad = Some(f64::INFINITY);
        let mut nan_turn = complete(3);
        nan_turn.turn_angle_rad = Some(f64::NAN);

        let track = DerivedTrack {
            track_id: "A".to_string(),
            fixes: vec![step(0, 0.0, 0.0), complete(1), infinite_heading, nan_turn, complete(4)],
        };
        let (done, dropped) = complete_rows(track);
        assert_eq!(dropped, 3);
        let seqs: Vec<usize> = done.fixes.iter().map(|f| f.seq).collect();
        assert_eq!(seqs, vec![1, 4]);
    }
}
