//! Robust price estimation: layered outlier rejection and trimmed mean.
//!
//! The pipeline is IQR rejection first, a MAD (median absolute deviation)
//! fallback when IQR is too aggressive, then a symmetric trimmed mean over
//! the surviving points.

use serde::Serialize;

/// Samples smaller than this skip statistical filtering entirely.
const MIN_SAMPLE_FOR_FILTERING: usize = 5;

/// Fraction trimmed from each end before averaging.
const TRIM_FRACTION: f64 = 0.05;

/// Result of running a raw price sample through the estimator.
#[derive(Debug, Clone, Serialize)]
pub struct RobustEstimate {
    /// Surviving prices, a subsequence of the input (order preserved).
    pub filtered: Vec<f64>,
    /// Trimmed mean of the filtered sample. None iff the input was empty.
    pub corrected_mean: Option<f64>,
    /// Population standard deviation of the filtered sample. None for
    /// empty or small (< 5) inputs.
    pub dispersion: Option<f64>,
    /// IQR rejection bounds (lower, upper). None when filtering was skipped.
    pub bounds: Option<(f64, f64)>,
}

impl RobustEstimate {
    /// Number of input points rejected as outliers.
    pub fn rejected(&self, input_len: usize) -> usize {
        input_len.saturating_sub(self.filtered.len())
    }
}

/// Produces a corrected mean and dispersion from a raw price sample.
///
/// - Empty input: all-None result.
/// - Fewer than 5 points: no outlier rejection, plain arithmetic mean.
/// - Otherwise: drop points outside `[Q1 - 1.5*IQR, Q3 + 1.5*IQR]`. If that
///   leaves fewer than 5 points, replace the result with the MAD rule on the
///   original sample (keep `|p - median| <= 3*MAD`). The corrected mean is a
///   5% trimmed mean (at least one point from each end) of the survivors.
pub fn estimate(sample: &[f64]) -> RobustEstimate {
    if sample.is_empty() {
        return RobustEstimate {
            filtered: Vec::new(),
            corrected_mean: None,
            dispersion: None,
            bounds: None,
        };
    }

    if sample.len() < MIN_SAMPLE_FOR_FILTERING {
        return RobustEstimate {
            filtered: sample.to_vec(),
            corrected_mean: Some(mean(sample)),
            dispersion: None,
            bounds: None,
        };
    }

    let mut sorted = sample.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q1 = percentile(&sorted, 25.0);
    let q3 = percentile(&sorted, 75.0);
    let iqr = q3 - q1;
    let bounds = (q1 - 1.5 * iqr, q3 + 1.5 * iqr);

    let mut filtered: Vec<f64> =
        sample.iter().copied().filter(|&p| bounds.0 <= p && p <= bounds.1).collect();

    if filtered.len() < MIN_SAMPLE_FOR_FILTERING {
        // IQR was too aggressive; the MAD rule replaces its result outright.
        let med = median(&sorted);
        let mut deviations: Vec<f64> = sample.iter().map(|p| (p - med).abs()).collect();
        deviations.sort_by(|a, b| a.total_cmp(b));
        let mad = median(&deviations);

        filtered = sample.iter().copied().filter(|&p| (p - med).abs() <= 3.0 * mad).collect();
    }

    let corrected_mean = trimmed_mean(&filtered);
    let dispersion = if filtered.is_empty() { None } else { Some(population_std(&filtered)) };

    RobustEstimate { filtered, corrected_mean, dispersion, bounds: Some(bounds) }
}

/// Arithmetic mean. Caller guarantees a non-empty slice.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divide by N, not N-1).
pub fn population_std(values: &[f64]) -> f64 {
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Linear-interpolated percentile over a pre-sorted slice, matching the
/// behavior of numpy's default method.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    debug_assert!(!sorted.is_empty());
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Median of a pre-sorted slice.
fn median(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Mean after dropping `max(1, floor(0.05 * n))` values from each end of the
/// sorted sample. Trimming is skipped when the sample cannot afford a
/// symmetric cut (`n <= 2 * cut`).
fn trimmed_mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let cut = ((sorted.len() as f64 * TRIM_FRACTION) as usize).max(1);
    let trimmed = if sorted.len() > 2 * cut { &sorted[cut..sorted.len() - cut] } else { &sorted[..] };

    Some(mean(trimmed))
}
