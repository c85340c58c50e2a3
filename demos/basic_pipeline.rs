//! Run the movement pipeline over a small in-memory batch of dog fixes.
//!
//! Run with: cargo run --example basic_pipeline

use movement_metrics::{process_reader, summarize, IngestConfig, PipelineConfig};

const FIXES: &str = "\
track_id,timestamp,longitude,latitude
rex,2021-06-01 10:00:00,8.54000,47.37000
rex,2021-06-01 10:00:10,8.54010,47.37002
rex,2021-06-01 10:00:20,8.54020,47.37000
rex,2021-06-01 10:00:20,8.54030,47.37000
rex,2021-06-01 10:00:30,8.54900,47.37000
rex,2021-06-01 10:00:40,8.54040,47.37005
rex,2021-06-01 10:00:50,8.54050,47.37010
bella,2021-06-01 10:00:00,8.60000,47.40000
bella,2021-06-01 10:00:15,8.60000,47.40010
bella,2021-06-01 10:00:30,8.60008,47.40018
bella,2021-06-01 10:00:45,8.60016,47.40018
fido,2021-06-01 10:00:00,8.70000,47.50000
";

fn main() {
    let config = PipelineConfig::default();
    println!("Movement Pipeline Example\n");
    println!(
        "Config: speed in ({}, {}) m/s, turn policy {:?}\n",
        config.min_speed_mps, config.max_speed_mps, config.turn_policy
    );

    let output = match process_reader(FIXES.as_bytes(), &IngestConfig::default(), &config) {
        Ok(output) => output,
        Err(e) => {
            eprintln!("Failed to process fixes: {}", e);
            return;
        }
    };

    let stats = output.stats;
    println!(
        "{} fixes in {} tracks: {} anomalous, {} incomplete, {} retained\n",
        stats.ingested, stats.tracks, stats.dropped_anomalous, stats.dropped_incomplete, stats.retained
    );

    for fix in output.fixes() {
        println!(
            "  {} {}  {:6.1}m  {:4.1}s  {:4.2}m/s  heading {:+.2}  turn {:.2}",
            fix.fix.track_id,
            fix.fix.timestamp.format("%H:%M:%S"),
            fix.distance_m.unwrap_or(f64::NAN),
            fix.elapsed_s.unwrap_or(f64::NAN),
            fix.speed_mps.unwrap_or(f64::NAN),
            fix.heading_rad.unwrap_or(f64::NAN),
            fix.turn_angle_rad.unwrap_or(f64::NAN),
        );
    }

    println!("\nTrack summaries:");
    for summary in summarize(&output) {
        println!(
            "  {}: {} fixes, {:.0}m over {:.0}s, median speed {:.2}m/s",
            summary.track_id, summary.fixes, summary.total_distance_m, summary.duration_s, summary.median_speed_mps
        );
    }
}
