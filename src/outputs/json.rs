//! JSON export.
//!
//! The file holds a pretty-printed array of [`ExportRow`](super::ExportRow)
//! objects, in the same order as the table.

use super::rows;
use crate::error::Result;
use crate::models::Article;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// Write `articles` as a JSON array to `path`.
///
/// # Arguments
///
/// * `articles` - The filtered articles, in display order
/// * `path` - Destination file; its parent directory must exist
///
/// # Returns
///
/// `Ok(())` on success, or an error if serialization or the write fails.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_json(articles: &[Article], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&rows(articles))?;
    info!(bytes = json.len(), "Writing JSON");
    fs::write(path, json).await?;
    Ok(())
}
