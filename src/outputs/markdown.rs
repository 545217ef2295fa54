//! Markdown report export.
//!
//! A single document headed "Noticias de Economía" with one section per
//! article listing source, date, digest, sentiment and link.

use super::{ExportRow, rows};
use crate::error::{Error, Result};
use crate::models::Article;
use std::fmt::Write;
use std::path::Path;
use tokio::fs;
use tracing::instrument;

pub const REPORT_TITLE: &str = "Noticias de Economía";

/// Render the report for `articles`.
pub fn render_report(articles: &[Article]) -> Result<String> {
    let mut md = String::new();
    writeln!(md, "# {}\n", REPORT_TITLE).map_err(fmt_error)?;
    for ExportRow { source, date, title, sentiment, digest, link } in rows(articles) {
        writeln!(md, "## {}\n", title).map_err(fmt_error)?;
        writeln!(md, "- **Fuente:** {}", source).map_err(fmt_error)?;
        writeln!(md, "- **Fecha:** {}", date).map_err(fmt_error)?;
        writeln!(md, "- **Resumen:** {}", digest).map_err(fmt_error)?;
        writeln!(md, "- **Sentimiento:** {}", sentiment).map_err(fmt_error)?;
        writeln!(md, "- **Enlace:** <{}>\n", link).map_err(fmt_error)?;
    }
    Ok(md)
}

fn fmt_error(e: std::fmt::Error) -> Error {
    Error::Export(format!("rendering report: {}", e))
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_report(articles: &[Article], path: &Path) -> Result<()> {
    let md = render_report(articles)?;
    fs::write(path, md).await?;
    Ok(())
}
