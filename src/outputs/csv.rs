//! CSV export.
//!
//! The file starts with a UTF-8 byte order mark so spreadsheet programs pick
//! up the accented characters correctly.

use super::rows;
use crate::error::{Error, Result};
use crate::models::Article;
use std::path::Path;
use tokio::fs;
use tracing::instrument;

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// Serialize `articles` to CSV bytes, header included.
pub fn to_csv_bytes(articles: &[Article]) -> Result<Vec<u8>> {
    let mut writer = ::csv::Writer::from_writer(BOM.to_vec());
    for row in rows(articles) {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| Error::Export(format!("flushing CSV: {}", e.error())))
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_csv(articles: &[Article], path: &Path) -> Result<()> {
    let bytes = to_csv_bytes(articles)?;
    fs::write(path, bytes).await?;
    Ok(())
}
