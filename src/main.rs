//! pricegauge - Robust sold-price estimation from eBay completed listings.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use pricegauge::commands::{BatchCommand, SearchCommand};
use pricegauge::config::{Backend, Config, OutputFormat};
use pricegauge::filters::{self, ExclusionFilter};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pricegauge",
    version,
    about = "Robust sold-price estimation from eBay completed listings",
    long_about = "Collects sold-listing prices (HTML scraping or the Finding API) and \
                  reports an outlier-corrected market price per query."
)]
struct Cli {
    /// Acquisition backend (scrape or api)
    #[arg(short, long, default_value = "scrape", global = true)]
    backend: Backend,

    /// eBay site suffix (e.g. co.uk, com, de)
    #[arg(long, global = true)]
    site: Option<String>,

    /// Finding API application key (api backend only)
    #[arg(long, global = true, env = "EBAY_APP_ID")]
    app_id: Option<String>,

    /// Base delay between requests in milliseconds
    #[arg(long, global = true, env = "PRICEGAUGE_DELAY")]
    delay: Option<u64>,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "table", global = true)]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Title-exclusion flags shared by search and batch.
#[derive(Args)]
struct FilterArgs {
    /// Excluded title keywords (comma-separated)
    #[arg(long, value_delimiter = ',')]
    exclude: Option<Vec<String>>,

    /// Add the built-in parts-and-bundles exclusions
    #[arg(long)]
    exclude_defaults: bool,

    /// Named filter set to load from the filters file
    #[arg(long)]
    filter_set: Option<String>,

    /// Path to the JSON filters file
    #[arg(long)]
    filters_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the sold price for one query
    #[command(alias = "s")]
    Search {
        /// Search query
        query: String,

        /// Target number of price observations
        #[arg(short, long, default_value = "100")]
        max_items: usize,

        /// Maximum result pages to request
        #[arg(short, long, default_value = "4")]
        pages: u32,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Run queries from a CSV file (column: query)
    #[command(alias = "b")]
    Batch {
        /// Input CSV file
        input: PathBuf,

        /// Write a per-query summary CSV here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write an extended per-query diagnostics CSV here
        #[arg(long)]
        diagnostics: Option<PathBuf>,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// List the available filter sets
    Filters {
        /// Path to the JSON filters file
        #[arg(long)]
        filters_file: Option<PathBuf>,
    },
}

/// Resolves the exclusion filter from config and CLI flags. Sources are
/// additive: config keywords, then the built-in defaults, then a named
/// set, then ad-hoc --exclude keywords.
fn build_filter(config: &Config, args: &FilterArgs) -> Result<ExclusionFilter> {
    let mut keywords = config.exclude_keywords.clone();

    if args.exclude_defaults {
        keywords.extend(filters::DEFAULT_EXCLUDE.iter().map(|s| s.to_string()));
    }

    if let Some(set_name) = &args.filter_set {
        let path = resolve_filters_file(args.filters_file.as_ref())?;
        let set = filters::filter_from_set(&path, set_name)?;
        keywords.extend(set.keywords().iter().cloned());
    }

    if let Some(extra) = &args.exclude {
        keywords.extend(extra.iter().cloned());
    }

    Ok(ExclusionFilter::new(keywords))
}

fn resolve_filters_file(explicit: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.clone());
    }

    let local = PathBuf::from("filters.json");
    if local.exists() {
        return Ok(local);
    }

    Config::default_filters_file()
        .ok_or_else(|| anyhow::anyhow!("No config directory available; pass --filters-file"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new(Level::DEBUG.to_string())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    // Load config with layered overrides
    let mut config = Config::load(cli.config.as_deref())?.with_env();

    // Apply CLI overrides
    config.backend = cli.backend;
    config.format = cli.format;

    if let Some(site) = cli.site {
        config.site = site;
    }
    if let Some(app_id) = cli.app_id {
        config.app_id = Some(app_id);
    }
    if let Some(delay) = cli.delay {
        config.delay_ms = delay;
    }

    match cli.command {
        Commands::Search { query, max_items, pages, filter } => {
            config.max_items = max_items;
            config.max_pages = pages;

            let exclusions = build_filter(&config, &filter)?;
            let cmd = SearchCommand::new(config);
            let output = cmd.execute(&query, &exclusions).await?;
            println!("{}", output);
        }

        Commands::Batch { input, output, diagnostics, filter } => {
            let exclusions = build_filter(&config, &filter)?;
            let cmd = BatchCommand::new(config);
            let report = cmd
                .execute(&input, output.as_deref(), diagnostics.as_deref(), &exclusions)
                .await?;
            println!("{}", report);
        }

        Commands::Filters { filters_file } => {
            let path = resolve_filters_file(filters_file.as_ref())?;
            let sets = filters::load_filter_sets(&path)?;

            println!("Filter sets in {}:\n", path.display());
            for (name, keywords) in &sets {
                println!("{:<20} {}", name, keywords.join(", "));
            }
        }
    }

    Ok(())
}
