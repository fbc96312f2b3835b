//! Output formatting for query statistics (table, JSON, markdown, CSV).

use crate::config::OutputFormat;
use crate::report::QueryStats;
use serde::Serialize;

/// Formats query statistics for output.
pub struct Formatter {
    format: OutputFormat,
}

/// Flat row shape used for CSV and markdown batch output.
#[derive(Serialize)]
struct SummaryRow<'a> {
    query: &'a str,
    mean_price: Option<f64>,
    std: Option<f64>,
    count: usize,
}

impl<'a> From<&'a QueryStats> for SummaryRow<'a> {
    fn from(stats: &'a QueryStats) -> Self {
        Self {
            query: &stats.query,
            mean_price: stats.estimate.corrected_mean,
            std: stats.estimate.dispersion,
            count: stats.used_for_avg(),
        }
    }
}

impl Formatter {
    /// Creates a new formatter.
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the result of a single query.
    pub fn format_stats(&self, stats: &QueryStats) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(stats).unwrap_or_else(|_| "{}".to_string())
            }
            OutputFormat::Table => self.table_single(stats),
            OutputFormat::Markdown => self.markdown_batch(std::slice::from_ref(stats)),
            OutputFormat::Csv => self.csv_batch(std::slice::from_ref(stats)),
        }
    }

    /// Formats a batch of query results.
    pub fn format_batch(&self, batch: &[QueryStats]) -> String {
        if batch.is_empty() {
            return match self.format {
                OutputFormat::Json => "[]".to_string(),
                OutputFormat::Csv => self.csv_batch(batch),
                _ => "No queries processed.".to_string(),
            };
        }

        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(batch).unwrap_or_else(|_| "[]".to_string())
            }
            OutputFormat::Table => self.table_batch(batch),
            OutputFormat::Markdown => self.markdown_batch(batch),
            OutputFormat::Csv => self.csv_batch(batch),
        }
    }

    // Table formatting

    fn table_single(&self, stats: &QueryStats) -> String {
        if stats.is_empty() {
            return format!("No prices found for '{}'.", stats.query);
        }

        let mut lines = Vec::new();

        lines.push(format!("Query:           {}", stats.query));
        lines.push(format!("Samples:         {}", stats.total_samples));
        lines.push(format!("Outliers removed: {}", stats.anomalies_removed()));
        lines.push(format!("Used for mean:   {}", stats.used_for_avg()));

        if let Some(raw) = stats.raw_mean {
            lines.push(format!("Raw mean:        {:.2}", raw));
        }
        if let Some(mean) = stats.estimate.corrected_mean {
            lines.push(format!("Corrected mean:  {:.2}", mean));
        }
        match stats.estimate.dispersion {
            Some(std) => lines.push(format!("Std dev:         {:.2}", std)),
            None => lines.push("Std dev:         N/A (sample too small)".to_string()),
        }
        if let Some((lo, hi)) = stats.estimate.bounds {
            lines.push(format!("IQR bounds:      {:.2} – {:.2}", lo, hi));
        }

        lines.join("\n")
    }

    fn table_batch(&self, batch: &[QueryStats]) -> String {
        let query_width = 40;

        let mut lines = Vec::new();

        lines.push(format!(
            "{:<query_width$}  {:>10}  {:>10}  {:>6}",
            "Query", "Mean", "Std", "Count"
        ));
        lines.push(format!(
            "{:-<query_width$}  {:->10}  {:->10}  {:->6}",
            "", "", "", ""
        ));

        for stats in batch {
            let row = SummaryRow::from(stats);

            // Truncate on char boundaries; byte indexing panics mid-codepoint.
            let query = if row.query.chars().count() > query_width {
                let head: String = row.query.chars().take(query_width - 3).collect();
                format!("{}...", head)
            } else {
                row.query.to_string()
            };

            let mean = row.mean_price.map(|m| format!("{:.2}", m)).unwrap_or_else(|| "N/A".into());
            let std = row.std.map(|s| format!("{:.2}", s)).unwrap_or_else(|| "N/A".into());

            lines.push(format!(
                "{:<query_width$}  {:>10}  {:>10}  {:>6}",
                query, mean, std, row.count
            ));
        }

        lines.join("\n")
    }

    // Markdown formatting

    fn markdown_batch(&self, batch: &[QueryStats]) -> String {
        let mut lines = Vec::new();

        lines.push("| Query | Mean | Std | Count |".to_string());
        lines.push("|-------|------|-----|-------|".to_string());

        for stats in batch {
            let row = SummaryRow::from(stats);
            let mean = row.mean_price.map(|m| format!("{:.2}", m)).unwrap_or_else(|| "N/A".into());
            let std = row.std.map(|s| format!("{:.2}", s)).unwrap_or_else(|| "N/A".into());
            lines.push(format!("| {} | {} | {} | {} |", row.query, mean, std, row.count));
        }

        lines.join("\n")
    }

    // CSV formatting

    fn csv_batch(&self, batch: &[QueryStats]) -> String {
        let mut writer = csv::Writer::from_writer(Vec::new());

        for stats in batch {
            if writer.serialize(SummaryRow::from(stats)).is_err() {
                break;
            }
        }

        // Header-only output when the batch is empty.
        if batch.is_empty() {
            let _ = writer.write_record(["query", "mean_price", "std", "count"]);
        }

        writer
            .into_inner()
            .ok()
            .and_then(|buf| String::from_utf8(buf).ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::QueryStats;

    fn sample_stats() -> QueryStats {
        QueryStats::from_sample("rtx 3080 10gb", &[10.0, 12.0, 11.0, 13.0, 1000.0])
    }

    #[test]
    fn test_table_single() {
        let out = Formatter::new(OutputFormat::Table).format_stats(&sample_stats());
        assert!(out.contains("rtx 3080 10gb"));
        assert!(out.contains("Corrected mean:  11.50"));
        assert!(out.contains("Outliers removed: 1"));
    }

    #[test]
    fn test_table_single_empty() {
        let stats = QueryStats::from_sample("nothing", &[]);
        let out = Formatter::new(OutputFormat::Table).format_stats(&stats);
        assert!(out.contains("No prices found"));
    }

    #[test]
    fn test_table_batch() {
        let batch = vec![sample_stats(), QueryStats::from_sample("empty query", &[])];
        let out = Formatter::new(OutputFormat::Table).format_batch(&batch);

        assert!(out.contains("Query"));
        assert!(out.contains("rtx 3080 10gb"));
        assert!(out.contains("11.50"));
        assert!(out.contains("N/A"));
    }

    #[test]
    fn test_table_batch_truncates_multibyte_queries_safely() {
        // 25 chars but 50 bytes: fits the column, must render untouched.
        let short = "é".repeat(25);
        // 45 chars: truncated, cut must land on a char boundary.
        let long = "é".repeat(45);

        let batch = vec![
            QueryStats::from_sample(short.clone(), &[10.0]),
            QueryStats::from_sample(long.clone(), &[20.0]),
        ];
        let out = Formatter::new(OutputFormat::Table).format_batch(&batch);

        assert!(out.contains(&short));
        assert!(out.contains(&format!("{}...", "é".repeat(37))));
        assert!(!out.contains(&long));
    }

    #[test]
    fn test_json_single() {
        let out = Formatter::new(OutputFormat::Json).format_stats(&sample_stats());
        assert!(out.contains("\"corrected_mean\""));
        assert!(out.contains("rtx 3080 10gb"));
    }

    #[test]
    fn test_json_batch_empty() {
        let out = Formatter::new(OutputFormat::Json).format_batch(&[]);
        assert_eq!(out, "[]");
    }

    #[test]
    fn test_markdown_batch() {
        let out = Formatter::new(OutputFormat::Markdown).format_batch(&[sample_stats()]);
        assert!(out.starts_with("| Query |"));
        assert!(out.contains("| rtx 3080 10gb | 11.50 |"));
    }

    #[test]
    fn test_csv_batch() {
        let out = Formatter::new(OutputFormat::Csv).format_batch(&[sample_stats()]);
        let mut lines = out.lines();
        assert_eq!(lines.next().unwrap(), "query,mean_price,std,count");
        let row = lines.next().unwrap();
        assert!(row.starts_with("rtx 3080 10gb,11.5"));
        assert!(row.ends_with(",4"));
    }

    #[test]
    fn test_csv_empty_batch_has_header() {
        let out = Formatter::new(OutputFormat::Csv).format_batch(&[]);
        assert!(out.trim_end().ends_with("query,mean_price,std,count"));
    }
}
