use crate::acquire::{acquire, AcquireOptions, PageSource};
use crate::commands::build_source;
use crate::config::Config;
use crate::error::BudgetExhausted;
use crate::filters::ExclusionFilter;
use crate::format::Formatter;
use crate::report::QueryStats;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{error, info, warn};

/// Runs many queries from a CSV file sequentially and exports the
/// per-query estimates.
pub struct BatchCommand {
    config: Config,
}

#[derive(Debug, Deserialize)]
struct QueryRow {
    query: String,
}

/// One exported summary line, matching the single-query table columns.
#[derive(Debug, Serialize)]
struct SummaryRow<'a> {
    query: &'a str,
    mean_price: Option<f64>,
    std: Option<f64>,
    count: usize,
}

/// Extended per-query breakdown for the optional diagnostics export.
#[derive(Debug, Serialize)]
struct DiagnosticsRow<'a> {
    query: &'a str,
    total_samples: usize,
    anomalies_removed: usize,
    used_for_avg: usize,
    raw_mean: Option<f64>,
    corrected_mean: Option<f64>,
    iqr_low: Option<f64>,
    iqr_high: Option<f64>,
    std_dev: Option<f64>,
}

impl BatchCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Reads the `query` column of a CSV file, skipping blank entries.
    pub fn read_queries(path: &Path) -> Result<Vec<String>> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open batch file: {}", path.display()))?;

        let mut queries = Vec::new();
        for row in reader.deserialize::<QueryRow>() {
            let row = row
                .with_context(|| format!("Malformed row in batch file: {}", path.display()))?;
            let query = row.query.trim().to_string();
            if !query.is_empty() {
                queries.push(query);
            }
        }
        Ok(queries)
    }

    pub async fn execute(
        &self,
        input: &Path,
        output: Option<&Path>,
        diagnostics: Option<&Path>,
        filter: &ExclusionFilter,
    ) -> Result<String> {
        let queries = Self::read_queries(input)?;
        if queries.is_empty() {
            bail!("No queries found in {}", input.display());
        }
        info!(count = queries.len(), "Starting batch run");

        let source = build_source(&self.config)?;
        let (batch, exhausted) =
            self.collect_with_source(source.as_ref(), &queries, filter).await;

        if let Some(calls) = source.metered_calls() {
            info!(calls, "Metered API calls spent");
        }

        if let Some(path) = output {
            write_summary(path, &batch)?;
            info!(path = %path.display(), rows = batch.len(), "Wrote summary CSV");
        }
        if let Some(path) = diagnostics {
            write_diagnostics(path, &batch)?;
            info!(path = %path.display(), rows = batch.len(), "Wrote diagnostics CSV");
        }

        // Results collected before the cap was hit are already exported;
        // the run itself still ends with an error.
        if let Some(e) = exhausted {
            error!(completed = batch.len(), total = queries.len(), "Batch aborted: {e}");
            return Err(e).with_context(|| {
                format!("Batch stopped after {} of {} queries", batch.len(), queries.len())
            });
        }

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_batch(&batch))
    }

    /// Runs the queries against one source. A failed query yields an
    /// empty-sample row and the batch continues; only an exhausted call
    /// budget stops the run early.
    pub async fn collect_with_source(
        &self,
        source: &(impl PageSource + ?Sized),
        queries: &[String],
        filter: &ExclusionFilter,
    ) -> (Vec<QueryStats>, Option<BudgetExhausted>) {
        let opts = AcquireOptions::from(&self.config);
        let mut batch = Vec::with_capacity(queries.len());

        for query in queries {
            info!(query, "Batch query");
            match acquire(source, query, opts, filter).await {
                Ok(sample) => {
                    if sample.is_empty() {
                        warn!(query, "No prices collected");
                    }
                    batch.push(QueryStats::from_sample(query, &sample));
                }
                Err(e) => return (batch, Some(e)),
            }
        }

        (batch, None)
    }
}

fn write_summary(path: &Path, batch: &[QueryStats]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;

    for stats in batch {
        writer.serialize(SummaryRow {
            query: &stats.query,
            mean_price: stats.estimate.corrected_mean,
            std: stats.estimate.dispersion,
            count: stats.used_for_avg(),
        })?;
    }
    writer.flush().context("Failed to flush output file")?;
    Ok(())
}

fn write_diagnostics(path: &Path, batch: &[QueryStats]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create diagnostics file: {}", path.display()))?;

    for stats in batch {
        let bounds = stats.estimate.bounds;
        writer.serialize(DiagnosticsRow {
            query: &stats.query,
            total_samples: stats.total_samples,
            anomalies_removed: stats.anomalies_removed(),
            used_for_avg: stats.used_for_avg(),
            raw_mean: stats.raw_mean,
            corrected_mean: stats.estimate.corrected_mean,
            iqr_low: bounds.map(|(low, _)| low),
            iqr_high: bounds.map(|(_, high)| high),
            std_dev: stats.estimate.dispersion,
        })?;
    }
    writer.flush().context("Failed to flush diagnostics file")?;
    Ok(())
}
