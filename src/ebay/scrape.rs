//! Scraping backend: sold-listing search pages over plain HTTP.

use crate::acquire::PageSource;
use crate::config::Config;
use crate::ebay::client::MarketClient;
use crate::ebay::parser;
use crate::error::FetchError;
use crate::filters::ExclusionFilter;
use async_trait::async_trait;

/// Items requested per search page.
const SCRAPE_PAGE_SIZE: usize = 100;

/// Completed-and-sold listing search via HTML scraping. No credential
/// needed; relies on the client's browser emulation and pacing.
pub struct ScrapeSource {
    client: MarketClient,
    base_url: String,
}

impl ScrapeSource {
    /// Creates a scrape source for the configured eBay site.
    pub fn new(client: MarketClient, config: &Config) -> Self {
        Self::with_base_url(client, format!("https://www.ebay.{}", config.site))
    }

    /// Creates a scrape source against a custom base URL (for testing).
    pub fn with_base_url(client: MarketClient, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Builds the sold-and-completed search URL for one page.
    fn search_url(&self, query: &str, page: u32) -> String {
        format!(
            "{}/sch/i.html?_nkw={}&LH_Sold=1&LH_Complete=1&_pgn={}&_ipg={}",
            self.base_url,
            urlencoding::encode(query),
            page,
            SCRAPE_PAGE_SIZE
        )
    }
}

#[async_trait]
impl PageSource for ScrapeSource {
    async fn fetch_page(&self, query: &str, page: u32) -> Result<String, FetchError> {
        self.client.fetch(&self.search_url(query, page)).await
    }

    fn extract(&self, payload: &str, filter: &ExclusionFilter) -> Vec<f64> {
        parser::extract_prices(payload, filter)
    }

    fn page_size(&self) -> usize {
        SCRAPE_PAGE_SIZE
    }
}
