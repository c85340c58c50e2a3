mod options;

use anyhow::{Context, Error as AnyError};
use clap::Parser;
use log::info;
use movement_metrics::{
    read_fixes_from_path, run_pipeline, summarize, write_fixes_csv, write_summaries_json, LandCoverLayer,
    PipelineConfig,
};
use options::Cli;
use std::fs::File;
use std::io::{self, BufWriter, Write};

fn main() -> Result<(), AnyError> {
    let cli = Cli::parse();

    env_logger::init();

    let base = match &cli.config {
        Some(path) => PipelineConfig::from_json_path(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let config = cli.pipeline_config(base);
    config.validate().context("checking pipeline config")?;
    info!("{config:?}");

    let fixes = read_fixes_from_path(&cli.input, &cli.ingest_config())
        .with_context(|| format!("reading fixes from {}", cli.input.display()))?;
    let output = run_pipeline(fixes, &config);

    let land_use = match &cli.land_cover {
        Some(path) => {
            let layer = LandCoverLayer::from_geojson_path(path, &cli.class_property)
                .with_context(|| format!("reading land cover {}", path.display()))?;
            for (class, count) in layer.class_counts(output.fixes()) {
                info!("land use {class}: {count} fixes");
            }
            Some(layer.join(output.fixes()))
        }
        None => None,
    };

    let out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    };
    let rows = write_fixes_csv(out, output.fixes(), land_use.as_deref())?;
    info!("wrote {rows} fixes");

    if let Some(path) = &cli.summary {
        let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
        write_summaries_json(BufWriter::new(file), &summarize(&output))?;
    }

    eprintln!(
        "{} fixes in {} tracks: {} anomalous, {} incomplete, {} retained",
        output.stats.ingested,
        output.stats.tracks,
        output.stats.dropped_anomalous,
        output.stats.dropped_incomplete,
        output.stats.retained
    );

    Ok(())
}
