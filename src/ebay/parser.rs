//! Price extraction from sold-listing search HTML.

use crate::ebay::selectors;
use crate::filters::ExclusionFilter;
use regex_lite::Regex;
use scraper::{ElementRef, Html};
use std::sync::LazyLock;
use tracing::{debug, trace};

/// Currency symbol followed by a numeral, after thousands separators are
/// stripped: "£1,234.56" -> 1234.56.
static PRICE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([£$€])\s?(\d+(?:\.\d+)?)").unwrap());

/// Extracts prices from one page of sold-listing search HTML.
///
/// Listings with empty or placeholder titles, titles matching the exclusion
/// filter, or no parseable price are skipped individually; a malformed block
/// never fails the page.
pub fn extract_prices(html: &str, filter: &ExclusionFilter) -> Vec<f64> {
    let document = Html::parse_document(html);

    let mut prices = Vec::new();
    let mut blocks = 0usize;

    for item in document.select(&selectors::ITEM) {
        blocks += 1;

        let title = item
            .select(&selectors::TITLE)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        // eBay pads results with an ad template carrying this title.
        if title.is_empty() || title.to_lowercase().contains("shop on ebay") {
            trace!("Skipping placeholder listing block");
            continue;
        }

        if filter.excludes(&title) {
            trace!("Excluded by keyword filter: {}", title);
            continue;
        }

        let Some(price_text) = price_fragment(item) else {
            trace!("No price fragment in listing: {}", title);
            continue;
        };

        let found = parse_price_text(&price_text);
        if found.is_empty() {
            trace!("Unparseable price text '{}' for: {}", price_text, title);
            continue;
        }
        prices.extend(found);
    }

    debug!("Extracted {} prices from {} listing blocks", prices.len(), blocks);
    prices
}

/// Finds the price-bearing text of a listing block, trying the primary
/// location, then the detail fallback, then any span with a currency symbol.
fn price_fragment(item: ElementRef) -> Option<String> {
    if let Some(e) = item.select(&selectors::PRICE).next() {
        return Some(e.text().collect());
    }

    if let Some(e) = item.select(&selectors::PRICE_FALLBACK).next() {
        return Some(e.text().collect());
    }

    item.select(&selectors::ANY_SPAN)
        .map(|e| e.text().collect::<String>())
        .find(|text| text.contains('£') || text.contains('$') || text.contains('€'))
}

/// Parses every currency amount out of a free-text fragment.
///
/// A fragment like "£120.00 to £150.00" yields both bounds; the caller
/// keeps them all, as the original sample should reflect what was listed.
pub fn parse_price_text(text: &str) -> Vec<f64> {
    let text = text.replace(',', "");

    PRICE_PATTERN
        .captures_iter(&text)
        .filter_map(|cap| cap[2].parse::<f64>().ok())
        .filter(|&p| p > 0.0)
        .collect()
}
