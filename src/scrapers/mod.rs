//! Article fetchers for the registered sources.
//!
//! Two retrieval methods share one output contract ([`RawEntry`]):
//!
//! | Mode | Module | Method |
//! |------|--------|--------|
//! | RSS/Atom | [`rss`] | Feed download and XML parsing |
//! | HTML | [`html`] | Section page scraping with per-site CSS selectors |
//!
//! [`fetch_all`] walks the selected sources in order. A source that fails to
//! download or parse is logged and contributes zero entries; it never aborts
//! the other sources.

pub mod html;
pub mod rss;

use crate::config::FetchMode;
use crate::error::{Error, Result};
use crate::models::RawEntry;
use crate::registry::{SourceLocation, SourceRegistry};
use reqwest::Client;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Lower bound on entries requested from each source.
pub const MIN_PER_SOURCE: usize = 5;

/// Spread `total_cap` evenly across `source_count` sources, never below [`MIN_PER_SOURCE`].
pub fn per_source_cap(total_cap: usize, source_count: usize) -> usize {
    if source_count == 0 {
        return MIN_PER_SOURCE.max(total_cap);
    }
    MIN_PER_SOURCE.max(total_cap / source_count)
}

/// Something that can produce raw entries for a source location.
pub trait EntrySource {
    /// Retrieve at most `cap` entries from `location`.
    async fn fetch_entries(&self, location: &SourceLocation, cap: usize) -> Result<Vec<RawEntry>>;
}

/// Network-backed [`EntrySource`] dispatching on the location's [`FetchMode`].
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(Error::Http)?;
        Ok(Self { client })
    }
}

impl EntrySource for HttpSource {
    async fn fetch_entries(&self, location: &SourceLocation, cap: usize) -> Result<Vec<RawEntry>> {
        match location.mode {
            FetchMode::Rss => rss::fetch(&self.client, &location.url, cap).await,
            FetchMode::Html => html::fetch(&self.client, &location.url, cap).await,
        }
    }
}

/// Fetch every selected source in order, truncating each to `cap` entries.
///
/// All tags are resolved before any request is made, so an unknown tag fails
/// the whole call. Per-source fetch failures are recovered as empty batches.
#[instrument(level = "info", skip(source, registry), fields(sources = tags.len()))]
pub async fn fetch_all<S: EntrySource>(
    source: &S,
    registry: &SourceRegistry,
    tags: &[String],
    cap: usize,
) -> Result<Vec<(String, Vec<RawEntry>)>> {
    let locations = tags
        .iter()
        .map(|tag| registry.resolve(tag).map(|loc| (tag.clone(), loc)))
        .collect::<Result<Vec<_>>>()?;

    let mut batches = Vec::with_capacity(locations.len());
    for (tag, location) in locations {
        let entries = match source.fetch_entries(location, cap).await {
            Ok(mut entries) => {
                entries.truncate(cap);
                info!(source = %tag, count = entries.len(), "Fetched source");
                entries
            }
            Err(e) => {
                warn!(source = %tag, url = %location.url, error = %e, "Source fetch failed; treating as empty");
                Vec::new()
            }
        };
        batches.push((tag, entries));
    }
    Ok(batches)
}
