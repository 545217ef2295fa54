//! Excel export.
//!
//! One worksheet named "Noticias" with a bold header row and one row per
//! article.

use super::{ExportRow, rows};
use crate::error::{Error, Result};
use crate::models::Article;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::path::Path;
use tokio::fs;
use tracing::instrument;

pub const SHEET_NAME: &str = "Noticias";

const HEADERS: [(&str, f64); 6] = [
    ("Fuente", 14.0),
    ("Fecha", 20.0),
    ("Título", 50.0),
    ("Sentimiento", 12.0),
    ("Resumen", 80.0),
    ("Enlace", 50.0),
];

fn xlsx_error(e: XlsxError) -> Error {
    Error::Export(format!("building workbook: {}", e))
}

/// Lay out `articles` on the "Noticias" sheet.
pub fn workbook(articles: &[Article]) -> Result<Workbook> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME).map_err(xlsx_error)?;

    let bold = Format::new().set_bold();
    for (col, (header, width)) in (0u16..).zip(HEADERS) {
        sheet.write_string_with_format(0, col, header, &bold).map_err(xlsx_error)?;
        sheet.set_column_width(col, width).map_err(xlsx_error)?;
    }
    sheet.set_freeze_panes(1, 0).map_err(xlsx_error)?;

    for (row, ExportRow { source, date, title, sentiment, digest, link }) in (1u32..).zip(rows(articles)) {
        for (col, value) in (0u16..).zip([source, date, title, sentiment, digest, link]) {
            sheet.write_string(row, col, value).map_err(xlsx_error)?;
        }
    }
    Ok(workbook)
}

pub fn to_xlsx_bytes(articles: &[Article]) -> Result<Vec<u8>> {
    workbook(articles)?.save_to_buffer().map_err(xlsx_error)
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_xlsx(articles: &[Article], path: &Path) -> Result<()> {
    let bytes = to_xlsx_bytes(articles)?;
    fs::write(path, bytes).await?;
    Ok(())
}
