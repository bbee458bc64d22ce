//! Listing Harvester - classifieds real-estate crawler
//!
//! Walks a paginated listing feed, extracts a fixed record from every item page
//! (markup plus embedded structured data), and writes full and USD-normalized
//! datasets.

pub mod crawling;
pub mod domain;
pub mod infrastructure;
pub mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::crawling::{HarvestOrchestrator, HarvestOutcome};
use crate::infrastructure::{AppConfig, DatasetWriter, HttpClient, WrittenDatasets};

/// Summary of a finished run
#[derive(Debug)]
pub struct RunSummary {
    pub outcome: HarvestOutcome,
    pub written: WrittenDatasets,
}

/// Harvest with the configured transport and write every dataset.
pub async fn run_harvest(config: &AppConfig) -> Result<RunSummary> {
    let client = HttpClient::new(&config.http).context("Failed to build HTTP client")?;
    let orchestrator = HarvestOrchestrator::from_config(config, Arc::new(client))
        .context("Failed to build page parsers")?;

    info!("Collecting links from: {}", config.crawling.base_url);
    let outcome = orchestrator.run().await?;

    let writer = DatasetWriter::new(config.output.clone());
    let written = writer
        .write_all(&outcome.records, config.crawling.fx_rate_kgs_per_usd)
        .context("Failed to write datasets")?;

    info!(
        "Harvest complete: {} records ({} failed) from {} listing pages",
        outcome.records.len(),
        outcome.failed_items(),
        outcome.pages_fetched
    );
    Ok(RunSummary { outcome, written })
}
