//! CSV and JSON export of pipeline results.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

use crate::{DerivedFix, TrackError, TrackSummary};

/// One flat output row. Missing values are written as empty fields.
#[derive(Debug, Serialize)]
struct FixRecord<'a> {
    track_id: &'a str,
    timestamp: DateTime<Utc>,
    longitude: f64,
    latitude: f64,
    prev_longitude: Option<f64>,
    prev_latitude: Option<f64>,
    prev_timestamp: Option<DateTime<Utc>>,
    distance_m: Option<f64>,
    elapsed_s: Option<f64>,
    speed_mps: Option<f64>,
    heading_rad: Option<f64>,
    turn_angle_rad: Option<f64>,
    land_use_class: Option<&'a str>,
}

impl<'a> FixRecord<'a> {
    fn new(fix: &'a DerivedFix, land_use_class: Option<&'a str>) -> Self {
        Self {
            track_id: &fix.fix.track_id,
            timestamp: fix.fix.timestamp,
            longitude: fix.fix.longitude,
            latitude: fix.fix.latitude,
            prev_longitude: fix.prev.map(|p| p.longitude),
            prev_latitude: fix.prev.map(|p| p.latitude),
            prev_timestamp: fix.prev.map(|p| p.timestamp),
            distance_m: fix.distance_m,
            elapsed_s: fix.elapsed_s,
            speed_mps: fix.speed_mps,
            heading_rad: fix.heading_rad,
            turn_angle_rad: fix.turn_angle_rad,
            land_use_class,
        }
    }
}

/// Write fixes as CSV with a header row. `land_use` holds one class per fix,
/// in the same order, as produced by the land-cover join.
///
/// Returns the number of rows written.
pub fn write_fixes_csv<'a, W, I>(
    writer: W,
    fixes: I,
    land_use: Option<&'a [Option<String>]>,
) -> Result<usize, TrackError>
where
    W: Write,
    I: IntoIterator<Item = &'a DerivedFix>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    let mut rows = 0;

    for (i, fix) in fixes.into_iter().enumerate() {
        let class = land_use
            .and_then(|classes| classes.get(i))
            .and_then(|class| class.as_deref());
        wtr.serialize(FixRecord::new(fix, class))?;
        rows += 1;
    }

    wtr.flush()?;
    Ok(rows)
}

/// Write track summaries as pretty-printed JSON.
pub fn write_summaries_json<W: Write>(writer: W, summaries: &[TrackSummary]) -> Result<(), TrackError> {
    serde_json::to_writer_pretty(writer, summaries)?;
    Ok(())
}
