//! Title-keyword exclusion filtering and JSON filter-set templates.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Keywords that flag parts, bundles, and other listings whose price does
/// not reflect a single working unit.
pub const DEFAULT_EXCLUDE: &[&str] = &[
    "for parts",
    "spares",
    "faulty",
    "not working",
    "broken",
    "bundle",
    "system",
    "pc",
    "lot",
    "job lot",
    "combo",
];

/// Drops listings whose title contains any of a set of keywords.
///
/// Matching is case-insensitive substring containment. An empty filter
/// passes everything. Built once per query and never mutated.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    keywords: Vec<String>,
}

impl ExclusionFilter {
    /// Creates a filter from keywords, normalizing them to lowercase.
    pub fn new(keywords: Vec<String>) -> Self {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// The built-in parts-and-bundles preset.
    pub fn defaults() -> Self {
        Self::new(DEFAULT_EXCLUDE.iter().map(|s| s.to_string()).collect())
    }

    /// True if the title matches an excluded keyword.
    pub fn excludes(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.keywords.iter().any(|kw| title.contains(kw))
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

/// Named filter sets loaded from a JSON template file.
///
/// The file maps a set label to its keyword list:
/// `{ "gpu": ["for parts", "bundle"], "phones": ["cracked"] }`.
pub type FilterSets = BTreeMap<String, Vec<String>>;

/// Loads filter sets from a template file.
pub fn load_filter_sets(path: impl AsRef<Path>) -> Result<FilterSets> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read filters file: {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse filters file: {}", path.display()))
}

/// Looks up one named set from a template file and builds a filter from it.
pub fn filter_from_set(path: impl AsRef<Path>, set_name: &str) -> Result<ExclusionFilter> {
    let sets = load_filter_sets(&path)?;
    let keywords = sets
        .get(set_name)
        .with_context(|| format!("No filter set named '{}' in {}", set_name, path.as_ref().display()))?;

    Ok(ExclusionFilter::new(keywords.clone()))
}
