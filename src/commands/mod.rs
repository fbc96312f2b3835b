//! CLI command implementations.

pub mod batch;
pub mod search;

use crate::acquire::PageSource;
use crate::config::{Backend, Config};
use crate::ebay::{ApiSource, MarketClient, ScrapeSource};
use anyhow::{Context, Result};

pub use batch::BatchCommand;
pub use search::SearchCommand;

/// Builds the acquisition source for the configured backend.
pub fn build_source(config: &Config) -> Result<Box<dyn PageSource>> {
    let client = MarketClient::new(config).context("Failed to create HTTP client")?;

    Ok(match config.backend {
        Backend::Scrape => Box::new(ScrapeSource::new(client, config)),
        Backend::Api => Box::new(ApiSource::new(client, config)?),
    })
}
