//! Runs one valuation batch from the command line.
//!
//! The input file is a JSON array of source records exactly as the
//! collection adapters hand them over; the output is the full run report.
//! Collection itself (HTTP, scraping, CSV parsing) lives outside this
//! workspace.

use chrono::Utc;
use valuation_core::SourceRecord;
use valuation_pipeline::{PipelineConfig, ValuationPipeline};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eva_cli=info,valuation_pipeline=info".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let batch_path = flag_value(&args, "--batch")
        .ok_or_else(|| anyhow::anyhow!("--batch <file> is required (run with --help for usage)"))?;

    let config: PipelineConfig = match flag_value(&args, "--config") {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => PipelineConfig::default(),
    };

    let batch: Vec<SourceRecord> = serde_json::from_str(&std::fs::read_to_string(batch_path)?)?;
    tracing::info!(records = batch.len(), "loaded source records");

    let pipeline = ValuationPipeline::new(config)?;
    let report = pipeline.run(batch, Utc::now());

    let json = serde_json::to_string_pretty(&report)?;
    match flag_value(&args, "--output") {
        Some(path) => {
            std::fs::write(path, json)?;
            tracing::info!(path, "report written");
        }
        None => println!("{json}"),
    }

    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn print_usage() {
    println!(
        "Usage: eva-cli --batch <records.json> [--config <config.json>] [--output <report.json>]\n\
         \n\
         --batch   JSON array of source records (one entry per source per ticker)\n\
         --config  Pipeline configuration: assumptions, merger, engine, thresholds\n\
         --output  Write the run report here instead of stdout"
    );
}
