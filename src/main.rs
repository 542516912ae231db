//! # Gen-AI Newsletter
//!
//! Extracts Gen-AI industry news items from web pages with an LLM, aggregates
//! them across sources into one snapshot, and later writes a newsletter from
//! that snapshot with a second LLM pass.
//!
//! ## Usage
//!
//! ```sh
//! genai_newsletter --settings newsletter.yaml extract
//! genai_newsletter --settings newsletter.yaml write
//! ```
//!
//! ## Architecture
//!
//! 1. **Loading**: Fetch each configured source page and keep its readable text
//! 2. **Extraction**: Ask the model for news items matching the active schema
//! 3. **Normalization**: Attach the source URL, repair and parse publish dates
//! 4. **Aggregation**: Concatenate items in source order and overwrite the snapshot
//! 5. **Writing**: Reload, sort by date, and ask the model for the newsletter

use awful_aj::config_dir;
use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod aggregator;
mod api;
mod cli;
mod config;
mod error;
mod extractor;
mod loader;
mod models;
mod newsletter;
mod normalizer;
mod schema;
mod snapshot;
mod utils;

use aggregator::Aggregator;
use api::{AwfulClient, RetryAsk};
use cli::{Cli, Command};
use config::Settings;
use extractor::Extractor;
use loader::HttpPageLoader;
use newsletter::NewsletterWriter;
use utils::ensure_writable_dir;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut settings = Settings::load(&args.settings)?;
    if let Some(dir) = &args.output_dir {
        settings.output_directory = dir.clone();
        settings.validate()?;
    }
    info!(
        settings = %args.settings.display(),
        output_directory = %settings.output_directory.display(),
        variant = ?settings.schema_variant,
        sources = settings.sources.len(),
        "Loaded settings"
    );

    if let Err(e) = ensure_writable_dir(&settings.output_directory).await {
        error!(
            path = %settings.output_directory.display(),
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let aj_config = match &args.aj_config {
        Some(path) => path.clone(),
        None => config_dir()?.join("config.yaml"),
    };

    match args.command {
        Command::Extract => extract(settings, aj_config).await?,
        Command::Write => write(settings, aj_config).await?,
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn extract(settings: Settings, aj_config: PathBuf) -> Result<(), Box<dyn Error>> {
    let client = AwfulClient::load(&aj_config, &settings.extraction_template).await?;
    let extractor = Extractor::new(
        RetryAsk::with_default_backoff(client),
        settings.schema_variant,
        settings.extraction_instructions.clone(),
    );
    let loader = HttpPageLoader::new(settings.fetch_timeout())?;

    let aggregator = Aggregator::new(settings, loader, extractor);
    let report = aggregator.run().await?;
    info!(
        sources = report.sources_processed,
        failed = report.failures.len(),
        items = report.items.len(),
        "Extraction run finished"
    );
    Ok(())
}

#[instrument(level = "info", skip_all)]
async fn write(settings: Settings, aj_config: PathBuf) -> Result<(), Box<dyn Error>> {
    let client = AwfulClient::load(&aj_config, &settings.newsletter_template).await?;
    let writer = NewsletterWriter::new(
        RetryAsk::with_default_backoff(client),
        settings.schema_variant,
        settings.newsletter_instructions.clone(),
    );
    writer
        .write(&settings.snapshot_path(), &settings.newsletter_path())
        .await?;
    Ok(())
}
