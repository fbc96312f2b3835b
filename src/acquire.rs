//! Paginated price-sample acquisition over a backend-agnostic page source.

use crate::config::Config;
use crate::error::{BudgetExhausted, FetchError};
use crate::filters::ExclusionFilter;
use async_trait::async_trait;
use tracing::{debug, warn};

/// One acquisition backend: fetches a page payload and extracts prices
/// from it. Implemented by the scrape and API sources.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches the raw payload of one 1-indexed result page.
    async fn fetch_page(&self, query: &str, page: u32) -> Result<String, FetchError>;

    /// Extracts filtered prices from one page payload.
    fn extract(&self, payload: &str, filter: &ExclusionFilter) -> Vec<f64>;

    /// Listings requested per page.
    fn page_size(&self) -> usize;

    /// Metered calls spent so far, for backends that charge a budget.
    fn metered_calls(&self) -> Option<u32> {
        None
    }
}

/// Page and item budgets for one query.
#[derive(Debug, Clone, Copy)]
pub struct AcquireOptions {
    /// Target number of price observations; the sample is truncated to
    /// exactly this count when reached.
    pub max_items: usize,
    /// Upper bound on pages requested.
    pub max_pages: u32,
}

impl From<&Config> for AcquireOptions {
    fn from(config: &Config) -> Self {
        Self { max_items: config.max_items, max_pages: config.max_pages }
    }
}

/// Collects a price sample for one query, page by page.
///
/// Pages are requested strictly sequentially. A failed page does not fail
/// the query: the loop logs it and returns whatever was accumulated
/// (partial-results policy). The only propagated error is an exhausted
/// call budget, which ends the session.
pub async fn acquire(
    source: &(impl PageSource + ?Sized),
    query: &str,
    opts: AcquireOptions,
    filter: &ExclusionFilter,
) -> Result<Vec<f64>, BudgetExhausted> {
    // No point requesting more pages than the item target can fill.
    let pages_for_items = opts.max_items.div_ceil(source.page_size()) as u32;
    let page_budget = opts.max_pages.min(pages_for_items).max(1);

    let mut sample: Vec<f64> = Vec::new();

    for page in 1..=page_budget {
        debug!(query, page, page_budget, "Fetching results page");

        let payload = match source.fetch_page(query, page).await {
            Ok(payload) => payload,
            Err(FetchError::Budget(exhausted)) => {
                warn!(query, page, "Call budget exhausted mid-query");
                return Err(exhausted);
            }
            Err(e) => {
                warn!(query, page, error = %e, "Page fetch failed, keeping partial sample");
                break;
            }
        };

        let prices = source.extract(&payload, filter);
        debug!(query, page, count = prices.len(), "Extracted prices");
        sample.extend(prices);

        if sample.len() >= opts.max_items {
            sample.truncate(opts.max_items);
            break;
        }
    }

    debug!(query, total = sample.len(), "Acquisition complete");
    Ok(sample)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    /// Scripted page source: one outcome per page, in order.
    struct ScriptedSource {
        pages: Vec<Result<Vec<f64>, FetchError>>,
        page_size: usize,
        fetches: AtomicU32,
    }

    impl ScriptedSource {
        fn new(pages: Vec<Result<Vec<f64>, FetchError>>) -> Self {
            Self { pages, page_size: 5, fetches: AtomicU32::new(0) }
        }

        fn fetch_count(&self) -> u32 {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PageSource for ScriptedSource {
        async fn fetch_page(&self, _query: &str, page: u32) -> Result<String, FetchError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            match &self.pages[(page - 1) as usize] {
                // Encode the page's prices into the payload for extract().
                Ok(prices) => Ok(prices
                    .iter()
                    .map(f64::to_string)
                    .collect::<Vec<_>>()
                    .join(",")),
                Err(FetchError::Budget(b)) => Err(FetchError::Budget(*b)),
                Err(FetchError::Timeout(d)) => Err(FetchError::Timeout(*d)),
                Err(FetchError::Blocked) => Err(FetchError::Blocked),
                Err(FetchError::Http(code)) => Err(FetchError::Http(*code)),
                Err(FetchError::Network(msg)) => Err(FetchError::Network(msg.clone())),
            }
        }

        fn extract(&self, payload: &str, _filter: &ExclusionFilter) -> Vec<f64> {
            payload.split(',').filter_map(|p| p.parse().ok()).collect()
        }

        fn page_size(&self) -> usize {
            self.page_size
        }
    }

    fn opts(max_items: usize, max_pages: u32) -> AcquireOptions {
        AcquireOptions { max_items, max_pages }
    }

    #[tokio::test]
    async fn test_accumulates_across_pages() {
        let source = ScriptedSource::new(vec![
            Ok(vec![10.0, 11.0]),
            Ok(vec![12.0, 13.0]),
        ]);

        let sample =
            acquire(&source, "gpu", opts(100, 2), &ExclusionFilter::default()).await.unwrap();
        assert_eq!(sample, vec![10.0, 11.0, 12.0, 13.0]);
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_truncates_at_item_target() {
        let source = ScriptedSource::new(vec![
            Ok(vec![1.0, 2.0, 3.0]),
            Ok(vec![4.0, 5.0, 6.0]),
            Ok(vec![7.0]),
        ]);

        let sample =
            acquire(&source, "gpu", opts(5, 3), &ExclusionFilter::default()).await.unwrap();
        // Stopped after page 2, truncated to exactly 5.
        assert_eq!(sample, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_page_budget_limits_requests() {
        let source = ScriptedSource::new(vec![
            Ok(vec![1.0]),
            Ok(vec![2.0]),
            Ok(vec![3.0]),
        ]);

        let sample =
            acquire(&source, "gpu", opts(100, 2), &ExclusionFilter::default()).await.unwrap();
        assert_eq!(sample, vec![1.0, 2.0]);
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_pages_capped_by_item_target() {
        // page_size 5, max_items 8 -> only 2 pages are worth requesting
        // even though the page budget allows 10.
        let source = ScriptedSource::new(vec![
            Ok(vec![1.0]),
            Ok(vec![2.0]),
            Ok(vec![3.0]),
        ]);

        let sample =
            acquire(&source, "gpu", opts(8, 10), &ExclusionFilter::default()).await.unwrap();
        assert_eq!(sample, vec![1.0, 2.0]);
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_page_yields_partial_sample() {
        let source = ScriptedSource::new(vec![
            Ok(vec![10.0, 11.0]),
            Err(FetchError::Timeout(Duration::from_secs(15))),
            Ok(vec![99.0]),
        ]);

        let sample =
            acquire(&source, "gpu", opts(100, 3), &ExclusionFilter::default()).await.unwrap();
        // Partial results, not empty, and no error escapes the query level.
        assert_eq!(sample, vec![10.0, 11.0]);
        assert_eq!(source.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_first_page_failure_yields_empty_sample() {
        let source = ScriptedSource::new(vec![Err(FetchError::Blocked)]);

        let sample =
            acquire(&source, "gpu", opts(100, 1), &ExclusionFilter::default()).await.unwrap();
        assert!(sample.is_empty());
    }

    #[tokio::test]
    async fn test_budget_exhaustion_propagates() {
        let source = ScriptedSource::new(vec![
            Ok(vec![10.0]),
            Err(FetchError::Budget(BudgetExhausted { cap: 4750 })),
        ]);

        let err = acquire(&source, "gpu", opts(100, 2), &ExclusionFilter::default())
            .await
            .unwrap_err();
        assert_eq!(err.cap, 4750);
    }

    #[tokio::test]
    async fn test_empty_pages_do_not_stop_pagination() {
        let source = ScriptedSource::new(vec![
            Ok(vec![]),
            Ok(vec![42.0]),
        ]);

        let sample =
            acquire(&source, "gpu", opts(100, 2), &ExclusionFilter::default()).await.unwrap();
        assert_eq!(sample, vec![42.0]);
    }
}
