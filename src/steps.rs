//! Step metrics between consecutive fixes of a track.
//!
//! Lookback is by index into the track's own ordered fixes, so a step never
//! spans two subjects. Nothing is trapped here: zero or negative elapsed times
//! produce infinite, NaN or negative speeds that the filter stage removes.

use chrono::{DateTime, Utc};

use crate::geo_utils::haversine_distance;
use crate::{DerivedFix, DerivedTrack, PrevFix, Track};

/// Seconds from `prev` to `current`, with microsecond resolution.
pub fn elapsed_seconds(prev: DateTime<Utc>, current: DateTime<Utc>) -> f64 {
    let delta = current - prev;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1e6,
        // Spans beyond ~292k years overflow microseconds
        None => delta.num_seconds() as f64,
    }
}

/// Attach previous-fix references, distance, elapsed time and speed to every
/// fix of a track except the first.
///
/// # Example
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use movement_metrics::{derive_steps, Fix, Track};
///
/// let t0 = Utc.with_ymd_and_hms(2021, 6, 1, 10, 0, 0).unwrap();
/// let track = Track {
///     track_id: "A".to_string(),
///     fixes: vec![
///         Fix::new("A", t0, 0.0, 0.0),
///         Fix::new("A", t0 + Duration::seconds(10), 0.0001, 0.0),
///     ],
/// };
///
/// let derived = derive_steps(&track);
/// assert!(derived.fixes[0].distance_m.is_none());
/// assert_eq!(derived.fixes[1].elapsed_s, Some(10.0));
/// ```
pub fn derive_steps(track: &Track) -> DerivedTrack {
    let fixes = track
        .fixes
        .iter()
        .enumerate()
        .map(|(seq, fix)| {
            let mut derived = DerivedFix::bare(fix.clone(), seq);
            if seq == 0 {
                return derived;
            }

            let prev = &track.fixes[seq - 1];
            let distance = haversine_distance(&prev.point(), &fix.point());
            let elapsed = elapsed_seconds(prev.timestamp, fix.timestamp);

            derived.prev = Some(PrevFix {
                longitude: prev.longitude,
                latitude: prev.latitude,
                timestamp: prev.timestamp,
            });
            derived.distance_m = Some(distance);
            derived.elapsed_s = Some(elapsed);
            derived.speed_mps = Some(distance / elapsed);
            derived
        })
        .collect();

    DerivedTrack {
        track_id: track.track_id.clone(),
        fixes,
    }
}
