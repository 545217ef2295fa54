//! Lookup table from source tags to the location polled for them.

use crate::config::{Config, FetchMode};
use crate::error::{Error, Result};

/// Where a source's entries come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub url: String,
    pub mode: FetchMode,
}

/// Immutable registry built once from configuration.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    entries: Vec<(String, SourceLocation)>,
}

impl SourceRegistry {
    pub fn from_config(config: &Config) -> Self {
        let entries = config
            .sources
            .iter()
            .map(|s| {
                (
                    s.tag.clone(),
                    SourceLocation {
                        url: s.url.clone(),
                        mode: config.fetch_mode,
                    },
                )
            })
            .collect();
        Self { entries }
    }

    pub fn resolve(&self, tag: &str) -> Result<&SourceLocation> {
        self.entries
            .iter()
            .find(|(t, _)| t == tag)
            .map(|(_, location)| location)
            .ok_or_else(|| Error::UnknownSource(tag.to_string()))
    }

    /// Tags in configuration order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(t, _)| t.as_str())
    }
}
