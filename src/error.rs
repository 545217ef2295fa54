//! Crate-wide error type.
//!
//! Only configuration and programmer errors (unknown source tags, malformed
//! configuration) are meant to escape to the caller. Network-facing failures
//! are carried by these variants inside the fetcher, exporter and notifier so
//! they can be logged and converted into degraded data or a user message.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Feed error: {0}")]
    Feed(String),

    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Notification error: {0}")]
    Notification(String),
}

pub type Result<T> = std::result::Result<T, Error>;
