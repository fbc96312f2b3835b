//! Configuration management with TOML, environment variables, and CLI overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Application configuration with layered loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Acquisition backend
    #[serde(default)]
    pub backend: Backend,

    /// eBay site suffix (e.g. "co.uk", "com", "de")
    #[serde(default = "default_site")]
    pub site: String,

    /// Finding API credential (required for the api backend)
    #[serde(default)]
    pub app_id: Option<String>,

    /// Base delay before each request in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Random jitter added to delay (0 to this value)
    #[serde(default = "default_delay_jitter_ms")]
    pub delay_jitter_ms: u64,

    /// Starting per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Attempts per page before giving up
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Target number of price observations per query
    #[serde(default = "default_max_items")]
    pub max_items: usize,

    /// Page budget per query
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,

    /// Hard cap on Finding API calls per session
    #[serde(default = "default_call_cap")]
    pub call_cap: u32,

    /// Restrict API results to this item condition (e.g. "Used")
    #[serde(default)]
    pub condition: Option<String>,

    /// Restrict API results to items located in this country code
    #[serde(default)]
    pub located_in: Option<String>,

    /// Output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Keywords that must NOT appear in listing titles
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
}

fn default_site() -> String {
    "co.uk".to_string()
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_delay_jitter_ms() -> u64 {
    2000
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_attempts() -> u32 {
    3
}

fn default_max_items() -> usize {
    100
}

fn default_max_pages() -> u32 {
    4
}

fn default_call_cap() -> u32 {
    crate::budget::DEFAULT_CALL_CAP
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: Backend::Scrape,
            site: default_site(),
            app_id: None,
            delay_ms: default_delay_ms(),
            delay_jitter_ms: default_delay_jitter_ms(),
            timeout_secs: default_timeout_secs(),
            attempts: default_attempts(),
            max_items: default_max_items(),
            max_pages: default_max_pages(),
            call_cap: default_call_cap(),
            condition: None,
            located_in: None,
            format: OutputFormat::Table,
            exclude_keywords: Vec::new(),
        }
    }
}

impl Config {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading config from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads configuration with fallback to default locations.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // 1. Explicit path takes precedence
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // 2. Try current directory
        let local_config = Path::new("config.toml");
        if local_config.exists() {
            debug!("Found config.toml in current directory");
            return Self::from_file(local_config);
        }

        // 3. Try XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("pricegauge").join("config.toml");
            if xdg_config.exists() {
                debug!("Found config in XDG config directory");
                return Self::from_file(xdg_config);
            }
        }

        // 4. Return default config
        debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Applies environment variable overrides.
    pub fn with_env(mut self) -> Self {
        if let Ok(site) = std::env::var("PRICEGAUGE_SITE") {
            self.site = site;
        }

        if let Ok(app_id) = std::env::var("EBAY_APP_ID") {
            self.app_id = Some(app_id);
        }

        if let Ok(delay) = std::env::var("PRICEGAUGE_DELAY") {
            if let Ok(d) = delay.parse() {
                self.delay_ms = d;
            }
        }

        self
    }

    /// Default XDG location of the filter-set template file.
    pub fn default_filters_file() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|d| d.join("pricegauge").join("filters.json"))
    }
}

/// Price acquisition backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// HTML scraping of sold-listing search pages; no credential needed.
    #[default]
    Scrape,
    /// The Finding API; requires an application key and is call-metered.
    Api,
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "scrape" | "web" => Ok(Backend::Scrape),
            "api" => Ok(Backend::Api),
            _ => Err(format!("Unknown backend: {}. Use: scrape, api", s)),
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Backend::Scrape => write!(f, "scrape"),
            Backend::Api => write!(f, "api"),
        }
    }
}

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Markdown,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use: table, json, markdown, csv", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.backend, Backend::Scrape);
        assert_eq!(config.site, "co.uk");
        assert!(config.app_id.is_none());
        assert_eq!(config.delay_ms, 1000);
        assert_eq!(config.delay_jitter_ms, 2000);
        assert_eq!(config.timeout_secs, 15);
        assert_eq!(config.attempts, 3);
        assert_eq!(config.max_items, 100);
        assert_eq!(config.max_pages, 4);
        assert_eq!(config.call_cap, 4750);
        assert_eq!(config.format, OutputFormat::Table);
        assert!(config.exclude_keywords.is_empty());
    }

    #[test]
    fn test_backend_parsing() {
        assert_eq!("scrape".parse::<Backend>().unwrap(), Backend::Scrape);
        assert_eq!("web".parse::<Backend>().unwrap(), Backend::Scrape);
        assert_eq!("API".parse::<Backend>().unwrap(), Backend::Api);

        let err = "ftp".parse::<Backend>().unwrap_err();
        assert!(err.contains("Unknown backend"));
    }

    #[test]
    fn test_backend_display() {
        assert_eq!(Backend::Scrape.to_string(), "scrape");
        assert_eq!(Backend::Api.to_string(), "api");
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("table".parse::<OutputFormat>().unwrap(), OutputFormat::Table);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("md".parse::<OutputFormat>().unwrap(), OutputFormat::Markdown);
        assert_eq!("csv".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);

        let err = "invalid".parse::<OutputFormat>().unwrap_err();
        assert!(err.contains("Unknown format"));
    }

    #[test]
    fn test_config_from_toml() {
        let toml = r#"
            backend = "api"
            site = "com"
            app_id = "my-app-id"
            max_items = 50
            condition = "Used"
            located_in = "GB"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.backend, Backend::Api);
        assert_eq!(config.site, "com");
        assert_eq!(config.app_id, Some("my-app-id".to_string()));
        assert_eq!(config.max_items, 50);
        assert_eq!(config.condition, Some("Used".to_string()));
        assert_eq!(config.located_in, Some("GB".to_string()));
        // Unset fields keep their defaults
        assert_eq!(config.delay_ms, 1000);
    }

    #[test]
    fn test_config_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            site = "de"
            delay_ms = 4000
            exclude_keywords = ["for parts", "bundle"]
            "#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.site, "de");
        assert_eq!(config.delay_ms, 4000);
        assert_eq!(config.exclude_keywords, vec!["for parts", "bundle"]);
    }

    #[test]
    fn test_config_from_file_not_found() {
        let result = Config::from_file("/nonexistent/path/config.toml");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_config_from_file_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "not valid toml {{{{").unwrap();

        let result = Config::from_file(file.path());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_config_load_explicit_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, r#"max_pages = 9"#).unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.max_pages, 9);
    }

    #[test]
    fn test_config_with_env() {
        let orig_site = std::env::var("PRICEGAUGE_SITE").ok();
        let orig_app = std::env::var("EBAY_APP_ID").ok();
        let orig_delay = std::env::var("PRICEGAUGE_DELAY").ok();

        std::env::set_var("PRICEGAUGE_SITE", "fr");
        std::env::set_var("EBAY_APP_ID", "env-key");
        std::env::set_var("PRICEGAUGE_DELAY", "5000");

        let config = Config::new().with_env();
        assert_eq!(config.site, "fr");
        assert_eq!(config.app_id, Some("env-key".to_string()));
        assert_eq!(config.delay_ms, 5000);

        match orig_site {
            Some(v) => std::env::set_var("PRICEGAUGE_SITE", v),
            None => std::env::remove_var("PRICEGAUGE_SITE"),
        }
        match orig_app {
            Some(v) => std::env::set_var("EBAY_APP_ID", v),
            None => std::env::remove_var("EBAY_APP_ID"),
        }
        match orig_delay {
            Some(v) => std::env::set_var("PRICEGAUGE_DELAY", v),
            None => std::env::remove_var("PRICEGAUGE_DELAY"),
        }
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let mut config = Config::default();
        config.backend = Backend::Api;
        config.app_id = Some("key".to_string());
        config.exclude_keywords = vec!["spares".to_string()];

        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.backend, config.backend);
        assert_eq!(parsed.app_id, config.app_id);
        assert_eq!(parsed.exclude_keywords, config.exclude_keywords);
    }
}
