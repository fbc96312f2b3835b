//! eBay acquisition backends: HTTP client, HTML scraping, Finding API.

pub mod api;
pub mod client;
pub mod parser;
pub mod scrape;
pub mod selectors;

pub use api::ApiSource;
pub use client::{AbortOnTimeout, FixedEscalation, MarketClient, TimeoutPolicy};
pub use scrape::ScrapeSource;
