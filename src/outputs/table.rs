//! Plain-text rendering for the terminal session.

use crate::models::{Article, Sentiment};
use crate::utils::{fit_width, squash_whitespace};
use itertools::Itertools;

/// Shown instead of an empty table.
pub const EMPTY_MESSAGE: &str = "No se encontraron noticias para mostrar.";

const SOURCE_WIDTH: usize = 12;
const DATE_WIDTH: usize = 19;
const SENTIMENT_WIDTH: usize = 11;
const TITLE_WIDTH: usize = 44;
const DIGEST_WIDTH: usize = 70;

/// Fixed-width table of `articles`, or [`EMPTY_MESSAGE`].
pub fn render_table(articles: &[Article]) -> String {
    if articles.is_empty() {
        return format!("{}\n", EMPTY_MESSAGE);
    }

    let header = [
        fit_width("Fuente", SOURCE_WIDTH),
        fit_width("Fecha", DATE_WIDTH),
        fit_width("Sentimiento", SENTIMENT_WIDTH),
        fit_width("Título", TITLE_WIDTH),
        "Resumen".to_string(),
    ]
    .join(" | ");
    let rule = "-".repeat(SOURCE_WIDTH + DATE_WIDTH + SENTIMENT_WIDTH + TITLE_WIDTH + DIGEST_WIDTH + 12);

    let mut out = String::new();
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(&rule);
    out.push('\n');
    for article in articles {
        let line = [
            fit_width(&article.source, SOURCE_WIDTH),
            fit_width(&article.published_at.display_date(), DATE_WIDTH),
            fit_width(article.sentiment.label(), SENTIMENT_WIDTH),
            fit_width(&squash_whitespace(&article.title), TITLE_WIDTH),
            fit_width(&squash_whitespace(&article.digest), DIGEST_WIDTH),
        ]
        .join(" | ");
        out.push_str(line.trim_end());
        out.push('\n');
        out.push_str("    ");
        out.push_str(&article.link);
        out.push('\n');
    }
    out.push_str(&format!("{} noticias\n", articles.len()));
    out
}

/// Count of each sentiment per source, sources in order of first appearance.
pub fn sentiment_counts(articles: &[Article]) -> Vec<(String, [usize; 3])> {
    let counts = articles
        .iter()
        .counts_by(|a| (a.source.as_str(), a.sentiment));
    articles
        .iter()
        .map(|a| a.source.as_str())
        .unique()
        .map(|source| {
            let get = |s: Sentiment| counts.get(&(source, s)).copied().unwrap_or(0);
            (
                source.to_string(),
                [get(Sentiment::Positive), get(Sentiment::Neutral), get(Sentiment::Negative)],
            )
        })
        .collect()
}

/// Per-source sentiment breakdown as text.
pub fn render_summary(articles: &[Article]) -> String {
    if articles.is_empty() {
        return format!("{}\n", EMPTY_MESSAGE);
    }
    let mut out = format!(
        "{} {:>8} {:>8} {:>8}\n",
        fit_width("Fuente", SOURCE_WIDTH),
        Sentiment::Positive.label(),
        Sentiment::Neutral.label(),
        Sentiment::Negative.label()
    );
    for (source, [pos, neu, neg]) in sentiment_counts(articles) {
        out.push_str(&format!(
            "{} {:>8} {:>8} {:>8}\n",
            fit_width(&source, SOURCE_WIDTH),
            pos,
            neu,
            neg
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PublishedAt;
    use crate::outputs::testing::sample;

    #[test]
    fn test_empty_table_message() {
        assert_eq!(render_table(&[]), "No se encontraron noticias para mostrar.\n");
        assert_eq!(render_summary(&[]), "No se encontraron noticias para mostrar.\n");
    }

    #[test]
    fn test_table_rows() {
        let table = render_table(&sample());
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[0].starts_with("Fuente"));
        assert!(lines[2].starts_with("Infobae"));
        assert!(lines[2].contains("06-05-2025"));
        assert!(lines[2].contains("Positiva"));
        assert_eq!(lines[3].trim(), "https://www.infobae.com/economia/1");
        assert!(lines[4].contains("Fecha no disponible"));
        assert_eq!(lines.last(), Some(&"2 noticias"));
    }

    #[test]
    fn test_sentiment_counts_by_source() {
        let mut articles = sample();
        let mut extra = articles[0].clone();
        extra.sentiment = Sentiment::Neutral;
        extra.published_at = PublishedAt::Missing;
        articles.push(extra);

        let counts = sentiment_counts(&articles);
        assert_eq!(
            counts,
            vec![
                ("Infobae".to_string(), [1, 1, 0]),
                ("Clarin".to_string(), [0, 0, 1]),
            ]
        );
        let summary = render_summary(&articles);
        assert_eq!(summary.lines().count(), 3);
    }
}
