use clap::Parser;
use movement_metrics::{IngestConfig, PipelineConfig, TurnPolicy};
use std::path::PathBuf;

/// Derive per-step movement metrics from GPS fixes and drop anomalous steps.
#[derive(Parser, Debug, Clone)]
pub struct Cli {
    /// Delimited input file with a header row.
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output CSV of retained fixes. Written to stdout when omitted.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write per-track summaries as JSON to this file.
    #[arg(short, long)]
    pub summary: Option<PathBuf>,

    /// GeoJSON land-cover layer to join retained fixes against.
    #[arg(long)]
    pub land_cover: Option<PathBuf>,

    /// Feature property holding the land-use class.
    #[arg(long, default_value = "landuse")]
    pub class_property: String,

    /// JSON pipeline configuration; flags below override it.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Exclusive upper speed bound, in m/s.
    #[arg(long)]
    pub max_speed: Option<f64>,

    /// Exclusive lower speed bound, in m/s.
    #[arg(long)]
    pub min_speed: Option<f64>,

    /// Drop steps spanning more than this many seconds.
    #[arg(long)]
    pub max_elapsed: Option<f64>,

    #[arg(long, value_enum)]
    pub turn_policy: Option<TurnPolicy>,

    #[arg(long, default_value = "track_id")]
    pub track_column: String,

    #[arg(long, default_value = "timestamp")]
    pub timestamp_column: String,

    #[arg(long, default_value = "longitude")]
    pub longitude_column: String,

    #[arg(long, default_value = "latitude")]
    pub latitude_column: String,

    #[arg(long, default_value_t = ',')]
    pub delimiter: char,
}

impl Cli {
    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig {
            track_column: self.track_column.clone(),
            timestamp_column: self.timestamp_column.clone(),
            longitude_column: self.longitude_column.clone(),
            latitude_column: self.latitude_column.clone(),
            delimiter: self.delimiter,
        }
    }

    /// Apply command line overrides on top of `base`.
    pub fn pipeline_config(&self, base: PipelineConfig) -> PipelineConfig {
        PipelineConfig {
            min_speed_mps: self.min_speed.unwrap_or(base.min_speed_mps),
            max_speed_mps: self.max_speed.unwrap_or(base.max_speed_mps),
            max_elapsed_s: self.max_elapsed.or(base.max_elapsed_s),
            turn_policy: self.turn_policy.unwrap_or(base.turn_policy),
        }
    }
}
