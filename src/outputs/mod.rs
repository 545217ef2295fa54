//! Rendering and export of filtered articles.
//!
//! # Submodules
//!
//! - [`table`]: Terminal table and per-source sentiment summary
//! - [`csv`]: Spreadsheet-friendly CSV (UTF-8 with BOM)
//! - [`json`]: Array of rows for other tools
//! - [`markdown`]: Printable report, one section per article
//! - [`xlsx`]: Excel workbook with a "Noticias" sheet
//! - [`docx`]: Word document laid out like the Markdown report
//!
//! Every exporter works on the same flattened [`ExportRow`], so all files
//! agree on column names and date rendering.

pub mod csv;
pub mod docx;
pub mod json;
pub mod markdown;
pub mod table;
pub mod xlsx;

use crate::error::{Error, Result};
use crate::models::Article;
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// One article flattened to display strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    pub source: String,
    pub date: String,
    pub title: String,
    pub sentiment: String,
    pub digest: String,
    pub link: String,
}

impl From<&Article> for ExportRow {
    fn from(article: &Article) -> Self {
        Self {
            source: article.source.clone(),
            date: article.published_at.display_date(),
            title: article.title.clone(),
            sentiment: article.sentiment.label().to_string(),
            digest: article.digest.clone(),
            link: article.link.clone(),
        }
    }
}

pub fn rows(articles: &[Article]) -> Vec<ExportRow> {
    articles.iter().map(ExportRow::from).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Markdown,
    Xlsx,
    Docx,
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "docx" | "word" => Ok(ExportFormat::Docx),
            other => Err(Error::Export(format!("unknown export format: {}", other))),
        }
    }
}

/// Write `articles` to `path` in `format`.
pub async fn export(articles: &[Article], format: ExportFormat, path: &Path) -> Result<()> {
    ensure_parent(path).await?;
    match format {
        ExportFormat::Csv => csv::write_csv(articles, path).await?,
        ExportFormat::Json => json::write_json(articles, path).await?,
        ExportFormat::Markdown => markdown::write_report(articles, path).await?,
        ExportFormat::Xlsx => xlsx::write_xlsx(articles, path).await?,
        ExportFormat::Docx => docx::write_docx(articles, path).await?,
    }
    info!(path = %path.display(), ?format, rows = articles.len(), "Exported articles");
    Ok(())
}

async fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            tokio::fs::create_dir_all(dir).await?;
            Ok(())
        }
        _ => Ok(()),
    }
}
