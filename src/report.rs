//! Per-query result record tying a raw sample to its robust estimate.

use crate::stats::{self, RobustEstimate};
use serde::Serialize;

/// Everything reported for one query: the raw sample's summary plus the
/// estimator's output.
#[derive(Debug, Clone, Serialize)]
pub struct QueryStats {
    pub query: String,
    /// Raw observations collected before outlier rejection.
    pub total_samples: usize,
    /// Arithmetic mean of the raw sample, for comparison against the
    /// corrected mean.
    pub raw_mean: Option<f64>,
    pub estimate: RobustEstimate,
}

impl QueryStats {
    /// Runs the estimator over a collected sample.
    pub fn from_sample(query: impl Into<String>, sample: &[f64]) -> Self {
        let raw_mean = if sample.is_empty() { None } else { Some(stats::mean(sample)) };

        Self {
            query: query.into(),
            total_samples: sample.len(),
            raw_mean,
            estimate: stats::estimate(sample),
        }
    }

    /// Observations rejected as outliers.
    pub fn anomalies_removed(&self) -> usize {
        self.estimate.rejected(self.total_samples)
    }

    /// Observations that fed the corrected mean.
    pub fn used_for_avg(&self) -> usize {
        self.estimate.filtered.len()
    }

    /// True when acquisition found nothing for the query.
    pub fn is_empty(&self) -> bool {
        self.total_samples == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_sample() {
        let stats = QueryStats::from_sample("rtx 3080", &[10.0, 12.0, 11.0, 13.0, 1000.0]);

        assert_eq!(stats.query, "rtx 3080");
        assert_eq!(stats.total_samples, 5);
        assert_eq!(stats.anomalies_removed(), 1);
        assert_eq!(stats.used_for_avg(), 4);
        assert!(stats.raw_mean.unwrap() > 200.0); // dragged up by the outlier
        assert!(stats.estimate.corrected_mean.unwrap() < 20.0);
        assert!(!stats.is_empty());
    }

    #[test]
    fn test_empty_sample() {
        let stats = QueryStats::from_sample("nothing sold", &[]);

        assert!(stats.is_empty());
        assert!(stats.raw_mean.is_none());
        assert!(stats.estimate.corrected_mean.is_none());
        assert_eq!(stats.anomalies_removed(), 0);
    }
}
