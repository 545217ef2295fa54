//! RSS 2.0 and Atom feed reader.
//!
//! Documents are parsed with `feed-rs`. Entries without a title or link are
//! skipped, and a missing summary becomes an empty string. Dates go through
//! [`parse_timestamp`], which accepts the sloppy variants Argentine outlets
//! publish; a date that still does not parse is treated as missing.

use crate::error::{Error, Result};
use crate::models::{PublishedAt, RawEntry};
use crate::utils::{clean_summary, squash_whitespace};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use feed_rs::model::{Entry, Link};
use feed_rs::parser;
use reqwest::Client;
use tracing::{debug, info, instrument};

/// Zone abbreviations seen in feeds, as numeric offsets.
const ZONES: [(&str, &str); 13] = [
    ("GMT", "+0000"),
    ("UTC", "+0000"),
    ("UT", "+0000"),
    ("Z", "+0000"),
    ("ART", "-0300"),
    ("EST", "-0500"),
    ("EDT", "-0400"),
    ("CST", "-0600"),
    ("CDT", "-0500"),
    ("MST", "-0700"),
    ("MDT", "-0600"),
    ("PST", "-0800"),
    ("PDT", "-0700"),
];

const ZONED_FORMATS: [&str; 4] = [
    "%d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M %z",
    "%d %B %Y %H:%M:%S %z",
    "%Y-%m-%d %H:%M:%S %z",
];

/// Zone-less timestamps are taken as UTC.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Download a feed and parse at most `cap` entries from it.
#[instrument(level = "info", skip(client), fields(%url))]
pub async fn fetch(client: &Client, url: &str, cap: usize) -> Result<Vec<RawEntry>> {
    let body = client.get(url).send().await?.error_for_status()?.bytes().await?;
    let entries = parse_feed(&body, cap)?;
    info!(count = entries.len(), bytes = body.len(), "Parsed feed");
    Ok(entries)
}

/// Parse RSS or Atom bytes into at most `cap` entries, in document order.
pub fn parse_feed(xml: &[u8], cap: usize) -> Result<Vec<RawEntry>> {
    let feed = parser::Builder::new()
        .timestamp_parser(parse_timestamp)
        .build()
        .parse(xml)
        .map_err(|e| Error::Feed(e.to_string()))?;

    Ok(feed.entries.into_iter().filter_map(raw_entry).take(cap).collect())
}

fn raw_entry(entry: Entry) -> Option<RawEntry> {
    let title = entry.title.map(|t| squash_whitespace(&t.content)).unwrap_or_default();
    let link = entry_link(&entry.links).unwrap_or_default();
    if title.is_empty() || link.is_empty() {
        debug!(%title, %link, "Skipping feed entry without title or link");
        return None;
    }
    let summary = entry
        .summary
        .map(|s| s.content)
        .filter(|s| !s.trim().is_empty())
        .or_else(|| entry.content.and_then(|c| c.body))
        .unwrap_or_default();

    Some(RawEntry {
        title,
        link,
        summary: clean_summary(&summary),
        published: PublishedAt::from_utc(entry.published.or(entry.updated)),
    })
}

/// The article link: `rel="alternate"` or no `rel`, else the first one.
fn entry_link(links: &[Link]) -> Option<String> {
    links
        .iter()
        .find(|l| l.rel.as_deref().is_none_or(|rel| rel == "alternate"))
        .or_else(|| links.first())
        .map(|l| l.href.trim().to_string())
}

/// Lenient feed timestamp parsing.
///
/// Tries RFC 3339 and RFC 2822 first. Failing those, a leading weekday is
/// dropped (feeds often get it wrong), zone abbreviations such as `ART` are
/// turned into offsets, and zone-less ISO timestamps or bare dates are read
/// as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = squash_whitespace(text);
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(&text) {
        return Some(dt.to_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(&text) {
        return Some(dt.to_utc());
    }

    let undated = match text.split_once(',') {
        Some((day, rest)) if !day.is_empty() && day.chars().all(char::is_alphabetic) => rest.trim(),
        _ => text.as_str(),
    };
    let zoned = with_numeric_zone(undated);
    if let Some(dt) = ZONED_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(&zoned, fmt).ok())
    {
        return Some(dt.to_utc());
    }
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&text, fmt).ok())
    {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(&text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn with_numeric_zone(text: &str) -> String {
    if let Some((head, zone)) = text.rsplit_once(' ') {
        if let Some((_, offset)) = ZONES.iter().find(|(name, _)| zone.eq_ignore_ascii_case(name)) {
            return format!("{} {}", head, offset);
        }
    }
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>Economía</title>
    <link>https://www.example.com.ar</link>
    <item>
      <title>El dólar blue &amp; el oficial</title>
      <link>https://www.example.com.ar/nota-1</link>
      <description><![CDATA[<p>Los mercados
      cerraron en alza.</p>]]></description>
      <pubDate>Tue, 06 May 2025 14:30:00 GMT</pubDate>
    </item>
    <item>
      <title>Sin resumen</title>
      <link>https://www.example.com.ar/nota-2</link>
    </item>
    <item>
      <title>Fecha rara</title>
      <link>https://www.example.com.ar/nota-3</link>
      <description>Texto</description>
      <pubDate>ayer a la tarde</pubDate>
    </item>
    <item>
      <title>Solo contenido</title>
      <link>https://www.example.com.ar/nota-4</link>
      <content:encoded><![CDATA[<p>El BCRA compró reservas.</p>]]></content:encoded>
      <pubDate>Mon, 06 May 2025 09:15:00 ART</pubDate>
    </item>
    <item>
      <description>Sin título ni enlace</description>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Finanzas</title>
  <id>urn:finanzas</id>
  <updated>2025-05-06T10:00:00-03:00</updated>
  <link href="https://finanzas.example.com/"/>
  <entry>
    <title>Bonos en baja</title>
    <id>urn:finanzas:1</id>
    <link rel="self" href="https://finanzas.example.com/api/1"/>
    <link rel="alternate" href="https://finanzas.example.com/bonos"/>
    <published>2025-05-06T10:00:00-03:00</published>
    <updated>2025-05-06T11:00:00-03:00</updated>
    <summary>Caen los bonos soberanos.</summary>
  </entry>
</feed>"#;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_parse_rss_items() {
        let entries = parse_feed(RSS.as_bytes(), 10).unwrap();
        assert_eq!(entries.len(), 4);

        let first = &entries[0];
        assert_eq!(first.title, "El dólar blue & el oficial");
        assert_eq!(first.link, "https://www.example.com.ar/nota-1");
        assert_eq!(first.summary, "Los mercados cerraron en alza.");
        assert_eq!(first.published, PublishedAt::from_utc(Some(utc(2025, 5, 6, 14, 30))));
    }

    #[test]
    fn test_missing_summary_defaults_to_empty() {
        let entries = parse_feed(RSS.as_bytes(), 10).unwrap();
        assert_eq!(entries[1].summary, "");
        assert_eq!(entries[1].published, PublishedAt::Missing);
    }

    #[test]
    fn test_unparseable_pub_date_is_missing() {
        let entries = parse_feed(RSS.as_bytes(), 10).unwrap();
        assert_eq!(entries[2].title, "Fecha rara");
        assert_eq!(entries[2].published, PublishedAt::Missing);
    }

    #[test]
    fn test_content_used_when_description_absent() {
        let entries = parse_feed(RSS.as_bytes(), 10).unwrap();
        assert_eq!(entries[3].summary, "El BCRA compró reservas.");
        // wrong weekday and a named Argentine zone
        assert_eq!(entries[3].published, PublishedAt::from_utc(Some(utc(2025, 5, 6, 12, 15))));
    }

    #[test]
    fn test_cap_truncates() {
        let entries = parse_feed(RSS.as_bytes(), 2).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].title, "Sin resumen");
        assert!(parse_feed(RSS.as_bytes(), 0).unwrap().is_empty());
    }

    #[test]
    fn test_parse_atom_entry() {
        let entries = parse_feed(ATOM.as_bytes(), 5).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link, "https://finanzas.example.com/bonos");
        assert_eq!(entries[0].summary, "Caen los bonos soberanos.");
        // published wins over updated
        assert_eq!(entries[0].published, PublishedAt::from_utc(Some(utc(2025, 5, 6, 13, 0))));
    }

    #[test]
    fn test_non_feed_document_is_an_error() {
        let err = parse_feed(b"<html><body>Not found</body></html>", 5).unwrap_err();
        assert!(matches!(err, Error::Feed(_)));
    }

    #[test]
    fn test_empty_channel_is_not_an_error() {
        let xml = br#"<rss version="2.0"><channel><title>x</title></channel></rss>"#;
        assert!(parse_feed(xml, 5).unwrap().is_empty());
    }

    #[test]
    fn test_lenient_timestamps() {
        let cases = [
            ("Tue, 06 May 2025 14:30:00 GMT", utc(2025, 5, 6, 14, 30)),
            ("Mon, 06 May 2025 14:30:00 GMT", utc(2025, 5, 6, 14, 30)),
            ("Tue, 06 May 2025 14:30:00 ART", utc(2025, 5, 6, 17, 30)),
            ("06 May 2025 14:30 -0300", utc(2025, 5, 6, 17, 30)),
            ("Tue,  6 May 2025 14:30:00 EDT", utc(2025, 5, 6, 18, 30)),
            ("2025-05-06T14:30:00-03:00", utc(2025, 5, 6, 17, 30)),
            ("2025-05-06T14:30:00Z", utc(2025, 5, 6, 14, 30)),
            ("2025-05-06T14:30:00", utc(2025, 5, 6, 14, 30)),
            ("2025-05-06T14:30:00.250", utc(2025, 5, 6, 14, 30) + chrono::Duration::milliseconds(250)),
            ("2025-05-06 14:30:00", utc(2025, 5, 6, 14, 30)),
            ("2025-05-06", utc(2025, 5, 6, 0, 0)),
        ];
        for (text, expected) in cases {
            assert_eq!(parse_timestamp(text), Some(expected), "{}", text);
        }
    }

    #[test]
    fn test_garbage_timestamps_are_rejected() {
        for text in ["", "   ", "ayer a la tarde", "2025-05-06 hace un rato", "Tue, 99 Foo 2025"] {
            assert_eq!(parse_timestamp(text), None, "{}", text);
        }
    }
}
