//! Section page scraper for sites without a usable feed.
//!
//! Each supported site publishes headline links under a known CSS class. The
//! layout is picked by host name; pages from unknown hosts yield no entries.
//!
//! | Host | Selector |
//! |------|----------|
//! | infobae.com | `.article-title a` |
//! | ambito.com | `.title a` |
//! | cronista.com | `.title a` |
//!
//! Scraped entries carry neither a summary nor a publication date.

use crate::error::Result;
use crate::models::{PublishedAt, RawEntry};
use crate::utils::squash_whitespace;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};
use url::Url;

static ARTICLE_TITLE_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".article-title a").expect("valid selector"));
static TITLE_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".title a").expect("valid selector"));

/// Headline selector for a page, chosen by host.
fn layout_for(page: &Url) -> Option<&'static Selector> {
    let host = page.host_str()?;
    if host.ends_with("infobae.com") {
        Some(&*ARTICLE_TITLE_LINK)
    } else if host.ends_with("ambito.com") || host.ends_with("cronista.com") {
        Some(&*TITLE_LINK)
    } else {
        None
    }
}

/// Download a section page and extract at most `cap` headline entries.
#[instrument(level = "info", skip(client), fields(%url))]
pub async fn fetch(client: &Client, url: &str, cap: usize) -> Result<Vec<RawEntry>> {
    let page = Url::parse(url)?;
    let html = client.get(url).send().await?.error_for_status()?.text().await?;
    let entries = extract_entries(&html, &page, cap);
    info!(count = entries.len(), source = %page, "Indexed headline links");
    Ok(entries)
}

/// Pull headline entries out of a page using the layout for its host.
pub fn extract_entries(html: &str, page: &Url, cap: usize) -> Vec<RawEntry> {
    let Some(selector) = layout_for(page) else {
        warn!(%page, "No known layout for host");
        return Vec::new();
    };

    let document = Html::parse_document(html);
    let mut entries = Vec::new();
    for element in document.select(selector) {
        if entries.len() >= cap {
            break;
        }
        let title = squash_whitespace(&element.text().collect::<Vec<_>>().join(" "));
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        let Ok(link) = page.join(href) else {
            debug!(%href, "Unresolvable headline link");
            continue;
        };
        if title.is_empty() {
            continue;
        }
        entries.push(RawEntry {
            title,
            link: link.to_string(),
            summary: String::new(),
            published: PublishedAt::Missing,
        });
    }
    entries
}
