use crate::acquire::{acquire, AcquireOptions, PageSource};
use crate::commands::build_source;
use crate::config::Config;
use crate::filters::ExclusionFilter;
use crate::format::Formatter;
use crate::report::QueryStats;
use anyhow::Result;
use tracing::info;

/// Runs one query end to end: acquire a price sample, estimate a
/// robust mean, render it in the configured output format.
pub struct SearchCommand {
    config: Config,
}

impl SearchCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub async fn execute(&self, query: &str, filter: &ExclusionFilter) -> Result<String> {
        let source = build_source(&self.config)?;
        self.execute_with_source(source.as_ref(), query, filter).await
    }

    pub async fn execute_with_source(
        &self,
        source: &(impl PageSource + ?Sized),
        query: &str,
        filter: &ExclusionFilter,
    ) -> Result<String> {
        info!(query, backend = ?self.config.backend, "Searching sold listings");

        let sample = acquire(source, query, AcquireOptions::from(&self.config), filter).await?;
        let stats = QueryStats::from_sample(query, &sample);

        if let Some(calls) = source.metered_calls() {
            info!(calls, "Metered API calls spent");
        }

        info!(
            query,
            samples = stats.total_samples,
            removed = stats.anomalies_removed(),
            "Estimate complete"
        );

        let formatter = Formatter::new(self.config.format);
        Ok(formatter.format_stats(&stats))
    }
}
