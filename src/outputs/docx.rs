//! Word document export.
//!
//! Same layout as the Markdown report: the "Noticias de Economía" heading,
//! then one titled block per article.

use super::markdown::REPORT_TITLE;
use super::{ExportRow, rows};
use crate::error::{Error, Result};
use crate::models::Article;
use docx_rs::{Docx, Paragraph, Run};
use std::io::Cursor;
use std::path::Path;
use tokio::fs;
use tracing::instrument;

fn field(label: &str, value: &str) -> Paragraph {
    Paragraph::new()
        .add_run(Run::new().add_text(format!("{}: ", label)).bold())
        .add_run(Run::new().add_text(value))
}

/// Build the document for `articles`.
pub fn document(articles: &[Article]) -> Docx {
    let heading = Paragraph::new().add_run(Run::new().add_text(REPORT_TITLE).bold().size(32));
    rows(articles).into_iter().fold(
        Docx::new().add_paragraph(heading),
        |doc, ExportRow { source, date, title, sentiment, digest, link }| {
            doc.add_paragraph(Paragraph::new().add_run(Run::new().add_text(title).bold().size(26)))
                .add_paragraph(field("Fuente", &source))
                .add_paragraph(field("Fecha", &date))
                .add_paragraph(field("Resumen", &digest))
                .add_paragraph(field("Sentimiento", &sentiment))
                .add_paragraph(field("Enlace", &link))
                .add_paragraph(Paragraph::new())
        },
    )
}

pub fn to_docx_bytes(articles: &[Article]) -> Result<Vec<u8>> {
    let mut buf = Cursor::new(Vec::new());
    document(articles)
        .build()
        .pack(&mut buf)
        .map_err(|e| Error::Export(format!("packing document: {}", e)))?;
    Ok(buf.into_inner())
}

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_docx(articles: &[Article], path: &Path) -> Result<()> {
    let bytes = to_docx_bytes(articles)?;
    fs::write(path, bytes).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outputs::testing::sample;

    #[test]
    fn test_document_reads_back() {
        let bytes = to_docx_bytes(&sample()).unwrap();
        assert!(bytes.starts_with(b"PK"));

        let json = docx_rs::read_docx(&bytes).unwrap().json();
        assert!(json.contains("Crece la actividad"));
        assert!(json.contains("https://www.clarin.com/economia/2"));
    }

    #[tokio::test]
    async fn test_write_docx() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noticias.docx");
        write_docx(&sample(), &path).await.unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
