//! Finding API backend: request shaping and JSON sample extraction.

use crate::acquire::PageSource;
use crate::budget::{CallBudget, DEFAULT_WARN_THRESHOLDS};
use crate::config::Config;
use crate::ebay::client::MarketClient;
use crate::error::FetchError;
use crate::filters::ExclusionFilter;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use tracing::{trace, warn};

const FINDING_API_BASE: &str = "https://svcs.ebay.com/services/search/FindingService/v1";

/// Entries requested per Finding API page.
const API_PAGE_SIZE: usize = 25;

/// Completed-items search over the Finding API.
///
/// Carries the session's [`CallBudget`], wired into the client as a
/// pre-attempt charge gate: every HTTP attempt, retries included, is
/// charged before it goes out, and an exhausted budget fails closed
/// without spending another metered call.
pub struct ApiSource {
    client: MarketClient,
    base_url: String,
    app_id: String,
    condition: Option<String>,
    located_in: Option<String>,
    // Shared with the client's charge gate; locked only to charge or
    // read, never across an await.
    budget: Arc<Mutex<CallBudget>>,
}

impl std::fmt::Debug for ApiSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiSource")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiSource {
    /// Creates an API source. Fails if no credential is configured.
    pub fn new(client: MarketClient, config: &Config) -> Result<Self> {
        Self::with_base_url(client, config, FINDING_API_BASE.to_string())
    }

    /// Creates an API source against a custom endpoint (for testing).
    pub fn with_base_url(client: MarketClient, config: &Config, base_url: String) -> Result<Self> {
        let app_id = config
            .app_id
            .clone()
            .context("The api backend requires an app id (--app-id or EBAY_APP_ID)")?;

        let budget = Arc::new(Mutex::new(CallBudget::with_limits(
            config.call_cap,
            &DEFAULT_WARN_THRESHOLDS,
        )));

        let gate = Arc::clone(&budget);
        let client = client.with_charge(move || gate.lock().unwrap().charge());

        Ok(Self {
            client,
            base_url,
            app_id,
            condition: config.condition.clone(),
            located_in: config.located_in.clone(),
            budget,
        })
    }

    /// Calls charged against the budget so far.
    pub fn calls_used(&self) -> u32 {
        self.budget.lock().unwrap().used()
    }

    /// Builds the findCompletedItems request URL for one page.
    fn request_url(&self, query: &str, page: u32) -> String {
        let mut params = vec![
            ("OPERATION-NAME".to_string(), "findCompletedItems".to_string()),
            ("SERVICE-VERSION".to_string(), "1.13.0".to_string()),
            ("SECURITY-APPNAME".to_string(), self.app_id.clone()),
            ("RESPONSE-DATA-FORMAT".to_string(), "JSON".to_string()),
            ("REST-PAYLOAD".to_string(), "true".to_string()),
            ("keywords".to_string(), query.to_string()),
        ];

        let mut filter_idx = 0;
        let mut push_item_filter = |name: &str, value: &str| {
            params.push((format!("itemFilter({}).name", filter_idx), name.to_string()));
            params.push((format!("itemFilter({}).value", filter_idx), value.to_string()));
            filter_idx += 1;
        };

        if let Some(condition) = &self.condition {
            push_item_filter("Condition", condition);
        }
        push_item_filter("SoldItemsOnly", "true");
        if let Some(country) = &self.located_in {
            push_item_filter("LocatedIn", country);
        }

        params.push(("paginationInput.entriesPerPage".to_string(), API_PAGE_SIZE.to_string()));
        params.push(("paginationInput.pageNumber".to_string(), page.to_string()));

        let query_string = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", self.base_url, query_string)
    }
}

#[async_trait]
impl PageSource for ApiSource {
    async fn fetch_page(&self, query: &str, page: u32) -> Result<String, FetchError> {
        // The client charges the budget before every attempt.
        self.client.fetch(&self.request_url(query, page)).await
    }

    fn extract(&self, payload: &str, filter: &ExclusionFilter) -> Vec<f64> {
        extract_prices(payload, filter)
    }

    fn page_size(&self) -> usize {
        API_PAGE_SIZE
    }

    fn metered_calls(&self) -> Option<u32> {
        Some(self.calls_used())
    }
}

// The Finding API wraps every field in a single-element array; the schema
// mirrors that and defaults each level so a shape mismatch degrades to an
// empty list instead of failing the page.

#[derive(Debug, Deserialize)]
struct FindingDocument {
    #[serde(rename = "findCompletedItemsResponse", default)]
    responses: Vec<ResponseEnvelope>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseEnvelope {
    #[serde(rename = "searchResult", default)]
    search_results: Vec<SearchResult>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchResult {
    #[serde(default)]
    item: Vec<Item>,
}

#[derive(Debug, Default, Deserialize)]
struct Item {
    #[serde(default)]
    title: Vec<String>,
    #[serde(rename = "sellingStatus", default)]
    selling_status: Vec<SellingStatus>,
}

#[derive(Debug, Default, Deserialize)]
struct SellingStatus {
    #[serde(rename = "currentPrice", default)]
    current_price: Vec<CurrentPrice>,
}

#[derive(Debug, Default, Deserialize)]
struct CurrentPrice {
    #[serde(rename = "__value__", default)]
    value: String,
}

/// Extracts filtered prices from a findCompletedItems JSON payload.
///
/// A malformed item (missing or unparseable price) is skipped on its own;
/// a payload that is not the expected document yields an empty page.
pub fn extract_prices(payload: &str, filter: &ExclusionFilter) -> Vec<f64> {
    let document: FindingDocument = match serde_json::from_str(payload) {
        Ok(d) => d,
        Err(e) => {
            warn!("Malformed API payload: {}", e);
            return Vec::new();
        }
    };

    let items = document
        .responses
        .into_iter()
        .next()
        .and_then(|r| r.search_results.into_iter().next())
        .map(|s| s.item)
        .unwrap_or_default();

    let mut prices = Vec::new();

    for item in items {
        let title = item.title.first().map(String::as_str).unwrap_or_default();
        if filter.excludes(title) {
            trace!("Excluded by keyword filter: {}", title);
            continue;
        }

        let price = item
            .selling_status
            .first()
            .and_then(|s| s.current_price.first())
            .and_then(|p| p.value.parse::<f64>().ok())
            .filter(|&p| p > 0.0);

        match price {
            Some(p) => prices.push(p),
            None => trace!("Skipping item without parseable price: {}", title),
        }
    }

    prices
}
