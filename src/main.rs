use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use postenrich::{Config, EnrichError, EnrichmentPipelineBuilder};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();

    let config = Config::parse();

    if let Err(e) = run(&config) {
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code(&e));
    }
}

/// Installs a compact stderr subscriber filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

fn run(config: &Config) -> Result<()> {
    let oracle = config.build_oracle()?;
    info!(model = %oracle.model(), base_url = %oracle.base_url(), "using oracle");

    let pipeline = EnrichmentPipelineBuilder::new()
        .oracle(Arc::new(oracle))
        .validation(config.validation_mode())
        .build();

    let report = pipeline
        .run(&config.source, &config.destination)
        .with_context(|| format!("Failed to enrich posts from {}", config.source.display()))?;

    info!(
        loaded = report.loaded,
        enriched = report.enriched,
        skipped_missing_caption = report.skipped_missing_caption,
        failed_extraction = report.failed_extraction,
        vocabulary = report.vocabulary_size,
        canonical_tags = report.canonical_tags,
        "enrichment complete"
    );
    Ok(())
}

/// Exit code 1 for problems with the input batch, 2 for everything else.
fn exit_code(error: &anyhow::Error) -> i32 {
    match error.downcast_ref::<EnrichError>() {
        Some(e) if e.is_input_error() => 1,
        _ => 2,
    }
}
