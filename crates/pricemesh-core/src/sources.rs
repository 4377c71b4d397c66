use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::listings::SourceId;
use crate::ConfigError;

/// Which built-in extractor turns a source's search page into listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    /// schema.org `Product` objects in `application/ld+json` scripts.
    JsonLd,
    /// Product-shaped objects inside a Next.js `__NEXT_DATA__` payload.
    NextData,
}

impl std::fmt::Display for ExtractorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractorKind::JsonLd => write!(f, "json_ld"),
            ExtractorKind::NextData => write!(f, "next_data"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: SourceId,
    /// Human-readable name, e.g. `"FreshMart"`.
    pub name: String,
    /// Lower values sort first when listings are clustered.
    pub priority: u32,
    /// Search page template with `{query}`, `{lat}` and `{lon}` placeholders.
    pub search_url: String,
    pub extractor: ExtractorKind,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesFile {
    pub sources: Vec<SourceConfig>,
}

impl SourcesFile {
    /// Entries sorted by priority, lowest first.
    #[must_use]
    pub fn by_priority(&self) -> Vec<&SourceConfig> {
        let mut sources: Vec<&SourceConfig> = self.sources.iter().collect();
        sources.sort_by_key(|s| s.priority);
        sources
    }
}

/// Load and validate the source registry from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sources(path: &Path) -> Result<SourcesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_sources(&content)
}

/// Parse and validate a source registry from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_sources(content: &str) -> Result<SourcesFile, ConfigError> {
    let sources_file: SourcesFile = serde_yaml::from_str(content)?;
    validate_sources(&sources_file)?;
    Ok(sources_file)
}

fn validate_sources(sources_file: &SourcesFile) -> Result<(), ConfigError> {
    if sources_file.sources.is_empty() {
        return Err(ConfigError::Validation(
            "at least one source must be configured".to_string(),
        ));
    }

    let mut seen_ids = HashSet::new();
    let mut seen_priorities = HashSet::new();

    for source in &sources_file.sources {
        if source.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "source '{}' has an empty name",
                source.id
            )));
        }

        if !seen_ids.insert(source.id.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate source id: '{}'",
                source.id
            )));
        }

        if !seen_priorities.insert(source.priority) {
            return Err(ConfigError::Validation(format!(
                "source '{}' reuses priority {}; priorities must be unique",
                source.id, source.priority
            )));
        }

        let template = source.search_url.trim();
        if !(template.starts_with("https://") || template.starts_with("http://")) {
            return Err(ConfigError::Validation(format!(
                "source '{}' search_url must be an absolute http(s) URL",
                source.id
            )));
        }

        if !template.contains("{query}") {
            return Err(ConfigError::Validation(format!(
                "source '{}' search_url is missing the {{query}} placeholder",
                source.id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "sources_test.rs"]
mod tests;
