//! CSS selectors for eBay sold-listing search pages.
//!
//! Update this file when eBay changes their HTML structure.
//!
//! **Update process**: When extraction returns zero prices for a query that
//! should have results, capture an HTML sample, update selectors, and add a
//! test fixture.

use scraper::Selector;
use std::sync::LazyLock;

/// Listing block container - one sold item per block.
pub static ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse(".s-item").unwrap());

/// Listing title text.
pub static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".s-item__title").unwrap());

/// Primary price element.
pub static PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".s-item__price").unwrap());

/// Fallback price location used on some layouts.
pub static PRICE_FALLBACK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".s-item__detail--primary").unwrap());

/// Last-resort sweep over spans for a currency-bearing fragment.
pub static ANY_SPAN: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span").unwrap());

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_selectors_parse() {
        // Force every LazyLock so a bad selector string fails here, not in
        // production extraction.
        let html = Html::parse_document("<html></html>");
        assert!(html.select(&ITEM).next().is_none());
        assert!(html.select(&TITLE).next().is_none());
        assert!(html.select(&PRICE).next().is_none());
        assert!(html.select(&PRICE_FALLBACK).next().is_none());
        assert!(html.select(&ANY_SPAN).next().is_none());
    }
}
