//! View-time narrowing of a cached result set.

use crate::models::{Article, ResultSet};
use chrono::{Days, NaiveDate};

/// Publication date window relative to "today" in the target offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateWindow {
    /// No date restriction; undated articles are kept.
    #[default]
    Any,
    /// Inclusive `[today - N, today]`; undated articles are dropped.
    LastDays(u32),
}

impl DateWindow {
    fn admits(&self, article: &Article, today: NaiveDate) -> bool {
        match self {
            DateWindow::Any => true,
            DateWindow::LastDays(n) => {
                let Some(date) = article.published_at.date() else {
                    return false;
                };
                let start = today.checked_sub_days(Days::new(u64::from(*n))).unwrap_or(NaiveDate::MIN);
                start <= date && date <= today
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub window: DateWindow,
    /// Case-insensitive substring matched against digest or title.
    pub keyword: Option<String>,
}

impl Filter {
    fn needle(&self) -> Option<String> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_lowercase)
    }
}

/// Articles of `results` passing both the date window and the keyword, in order.
pub fn filter(results: &ResultSet, filter: &Filter, today: NaiveDate) -> Vec<Article> {
    let needle = filter.needle();
    results
        .iter()
        .filter(|article| filter.window.admits(article, today))
        .filter(|article| match &needle {
            Some(needle) => {
                article.digest.to_lowercase().contains(needle.as_str())
                    || article.title.to_lowercase().contains(needle.as_str())
            }
            None => true,
        })
        .cloned()
        .collect()
}
