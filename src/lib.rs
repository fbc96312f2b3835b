//! pricegauge - What did it actually sell for?
//!
//! Collects sold-listing prices from eBay (HTML scraping or the Finding
//! API) and estimates a robust market price per query: IQR outlier
//! rejection with a MAD fallback, a 5% trimmed mean, and a population
//! standard deviation over the surviving sample.

pub mod acquire;
pub mod budget;
pub mod commands;
pub mod config;
pub mod ebay;
pub mod error;
pub mod filters;
pub mod format;
pub mod report;
pub mod stats;

pub use acquire::{acquire, AcquireOptions, PageSource};
pub use budget::CallBudget;
pub use config::{Backend, Config, OutputFormat};
pub use error::{BudgetExhausted, FetchError};
pub use filters::ExclusionFilter;
pub use report::QueryStats;
pub use stats::{estimate, RobustEstimate};
