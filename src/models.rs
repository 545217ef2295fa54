//! Data models for raw feed entries and aggregated articles.
//!
//! This module defines the core data structures used throughout the application:
//! - [`RawEntry`]: One entry as retrieved from a feed or scraped page
//! - [`Article`]: An entry after digest generation and sentiment scoring
//! - [`ResultSet`]: The ordered, immutable output of one pipeline run
//! - [`PublishedAt`] and [`Sentiment`]: value types shared by the above

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text shown in place of a publication date the feed never provided.
pub const MISSING_DATE_LABEL: &str = "Fecha no disponible";

/// Polarity bucket of a digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Label used in tables and exports.
    pub fn label(&self) -> &'static str {
        match self {
            Sentiment::Positive => "Positiva",
            Sentiment::Neutral => "Neutra",
            Sentiment::Negative => "Negativa",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Publication timestamp of an entry.
///
/// Feeds are inconsistent about dates: some omit them, some use formats that
/// do not parse even leniently. Both end up as [`PublishedAt::Missing`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PublishedAt {
    /// A parsed timestamp, normalized to the target offset once it reaches an [`Article`].
    Parsed(DateTime<FixedOffset>),
    #[default]
    Missing,
}

impl PublishedAt {
    pub fn from_utc(timestamp: Option<DateTime<Utc>>) -> Self {
        match timestamp {
            Some(dt) => PublishedAt::Parsed(dt.fixed_offset()),
            None => PublishedAt::Missing,
        }
    }

    /// Shift a parsed timestamp into `offset`. `Missing` is returned as-is.
    pub fn with_offset(self, offset: FixedOffset) -> Self {
        match self {
            PublishedAt::Parsed(dt) => PublishedAt::Parsed(dt.with_timezone(&offset)),
            other => other,
        }
    }

    /// Calendar date of a parsed timestamp, in the offset it carries.
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            PublishedAt::Parsed(dt) => Some(dt.date_naive()),
            _ => None,
        }
    }

    /// Render as `dd-mm-yyyy`, or [`MISSING_DATE_LABEL`].
    pub fn display_date(&self) -> String {
        match self {
            PublishedAt::Parsed(dt) => dt.format("%d-%m-%Y").to_string(),
            PublishedAt::Missing => MISSING_DATE_LABEL.to_string(),
        }
    }
}

/// A raw entry as retrieved from a source, before summarization.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawEntry {
    /// Headline text.
    pub title: String,
    /// Absolute link to the story.
    pub link: String,
    /// Summary/body text; empty when the source provides none.
    pub summary: String,
    /// Publication date as the source reported it.
    pub published: PublishedAt,
}

/// One aggregated news item.
///
/// Articles are built once by the pipeline and never modified afterwards;
/// `sentiment` is always computed from `digest`.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    /// Registry tag of the source.
    pub source: String,
    /// Publication date, normalized to the target offset when parsed.
    pub published_at: PublishedAt,
    pub title: String,
    pub link: String,
    /// One-sentence digest, or the fallback text when generation failed.
    pub digest: String,
    pub sentiment: Sentiment,
}

/// The ordered output of one pipeline run.
///
/// Articles appear in source-then-entry order. A `ResultSet` is read-only;
/// refreshing replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    articles: Vec<Article>,
}

impl ResultSet {
    pub fn new(articles: Vec<Article>) -> Self {
        Self { articles }
    }

    pub fn len(&self) -> usize {
        self.articles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Article> {
        self.articles.iter()
    }
}
