//! The fetch → digest → classify pipeline behind the cache.
//!
//! One pass walks the selected sources in registry order, and each source's
//! entries in feed order. Every entry's summary goes to the summarizer, the
//! resulting digest (or its fallback text) is classified, and the article is
//! appended to the result. Passes are memoized by [`PipelineCache`].

use crate::api::Summarize;
use crate::cache::{CacheKey, CacheStats, Clock, PipelineCache, SystemClock};
use crate::config::FetchMode;
use crate::error::Result;
use crate::models::{Article, ResultSet};
use crate::registry::SourceRegistry;
use crate::scrapers::{EntrySource, fetch_all, per_source_cap};
use crate::sentiment;
use chrono::FixedOffset;
use itertools::Itertools;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{info, instrument, warn};

/// Text sent to the model for scraped headlines, which carry no body.
pub const NO_SUMMARY_PLACEHOLDER: &str = "No summary available";

pub struct Pipeline<S, G, C: Clock = SystemClock> {
    registry: SourceRegistry,
    source: S,
    summarizer: G,
    cache: PipelineCache<C>,
    offset: FixedOffset,
    polite_delay: Duration,
}

impl<S, G, C> Pipeline<S, G, C>
where
    S: EntrySource,
    G: Summarize,
    C: Clock,
{
    pub fn new(
        registry: SourceRegistry,
        source: S,
        summarizer: G,
        cache: PipelineCache<C>,
        offset: FixedOffset,
        polite_delay: Duration,
    ) -> Self {
        Self {
            registry,
            source,
            summarizer,
            cache,
            offset,
            polite_delay,
        }
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Results for `sources` with `total_cap` spread across them, from cache when fresh.
    ///
    /// Repeated tags count once. Fails only when a tag is not registered.
    pub async fn run(&self, sources: &[String], total_cap: usize) -> Result<Arc<ResultSet>> {
        for tag in sources {
            self.registry.resolve(tag)?;
        }
        let distinct = sources.iter().unique().count();
        let key = CacheKey::new(sources.iter().cloned(), per_source_cap(total_cap, distinct));
        self.cache
            .get_or_compute(key.clone(), || self.compute(key))
            .await
    }

    /// Forget every cached run.
    pub fn refresh(&self) {
        self.cache.invalidate();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    #[instrument(level = "info", skip_all, fields(sources = key.source_count(), cap = key.per_source_cap()))]
    async fn compute(&self, key: CacheKey) -> Result<ResultSet> {
        let t0 = Instant::now();
        let tags: Vec<String> = self
            .registry
            .tags()
            .filter(|tag| key.contains(tag))
            .map(str::to_string)
            .collect();

        let batches = fetch_all(&self.source, &self.registry, &tags, key.per_source_cap()).await?;

        let mut articles = Vec::new();
        let mut fallbacks = 0usize;
        for (tag, entries) in batches {
            let mode = self.registry.resolve(&tag)?.mode;
            for entry in entries {
                let text = if entry.summary.is_empty() && mode == FetchMode::Html {
                    NO_SUMMARY_PLACEHOLDER
                } else {
                    entry.summary.as_str()
                };

                let digest = self.summarizer.summarize(text).await;
                if !digest.is_generated() {
                    fallbacks += 1;
                }
                let digest = digest.into_text();
                let sentiment = sentiment::classify(&digest);

                articles.push(Article {
                    source: tag.clone(),
                    published_at: entry.published.with_offset(self.offset),
                    title: entry.title,
                    link: entry.link,
                    digest,
                    sentiment,
                });

                if !self.polite_delay.is_zero() {
                    sleep(self.polite_delay).await;
                }
            }
        }

        let result = ResultSet::new(articles);
        if result.is_empty() && !tags.is_empty() {
            warn!(?tags, "No selected source returned entries");
        }
        info!(
            articles = result.len(),
            fallbacks,
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "Pipeline pass complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::CannedSummarizer;
    use crate::cache::testing::ManualClock;
    use crate::config::{Config, SourceConfig, Variant};
    use crate::error::Error;
    use crate::models::{PublishedAt, Sentiment};
    use crate::scrapers::testing::{ScriptedSource, entries};
    use chrono::{NaiveDate, TimeZone};

    type TestPipeline = Pipeline<ScriptedSource, CannedSummarizer, Arc<ManualClock>>;

    fn registry(mode: FetchMode) -> SourceRegistry {
        let mut config = Config::preset(Variant::Gemma);
        config.fetch_mode = mode;
        config.sources = vec![
            SourceConfig { tag: "A".to_string(), url: "https://a.example/rss".to_string() },
            SourceConfig { tag: "B".to_string(), url: "https://b.example/rss".to_string() },
        ];
        SourceRegistry::from_config(&config)
    }

    fn pipeline(source: ScriptedSource, summarizer: CannedSummarizer) -> (Arc<ManualClock>, TestPipeline) {
        pipeline_with(FetchMode::Rss, source, summarizer, Duration::ZERO)
    }

    fn pipeline_with(
        mode: FetchMode,
        source: ScriptedSource,
        summarizer: CannedSummarizer,
        delay: Duration,
    ) -> (Arc<ManualClock>, TestPipeline) {
        let clock = Arc::new(ManualClock::default());
        let cache = PipelineCache::with_clock(Duration::from_secs(3600), Arc::clone(&clock));
        let offset = FixedOffset::west_opt(3 * 3600).unwrap();
        (clock, Pipeline::new(registry(mode), source, summarizer, cache, offset, delay))
    }

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    #[tokio::test]
    async fn test_failed_source_is_skipped_end_to_end() {
        let source = ScriptedSource::default().with_feed("https://a.example/rss", entries("a", 8));
        let (_clock, pipeline) = pipeline(source, CannedSummarizer::default());

        let result = pipeline.run(&tags(&["A", "B"]), 10).await.unwrap();
        assert_eq!(result.len(), 5);
        assert!(result.iter().all(|a| a.source == "A"));
        let titles: Vec<&str> = result.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["a 0", "a 1", "a 2", "a 3", "a 4"]);
        assert_eq!(pipeline.summarizer.calls(), 5);
    }

    #[tokio::test]
    async fn test_sentiment_comes_from_digest() {
        let mut feed = entries("a", 2);
        feed[0].title = "Crisis total".to_string();
        let source = ScriptedSource::default().with_feed("https://a.example/rss", feed);
        let summarizer = CannedSummarizer::default().with("Resumen a 0", "La economía crece con fuerza.");
        let (_clock, pipeline) = pipeline(source, summarizer);

        let result = pipeline.run(&tags(&["A"]), 5).await.unwrap();
        assert_eq!(result.iter().next().unwrap().digest, "La economía crece con fuerza.");
        assert_eq!(result.iter().next().unwrap().sentiment, Sentiment::Positive);
        // no canned digest: fallback text, still classified
        assert!(result.iter().nth(1).unwrap().digest.contains("no disponible"));
        assert_eq!(result.iter().nth(1).unwrap().sentiment, Sentiment::Neutral);
    }

    #[tokio::test]
    async fn test_repeated_run_is_served_from_cache() {
        let source = ScriptedSource::default()
            .with_feed("https://a.example/rss", entries("a", 5))
            .with_feed("https://b.example/rss", entries("b", 5));
        let (_clock, pipeline) = pipeline(source, CannedSummarizer::default());

        let first = pipeline.run(&tags(&["A", "B"]), 10).await.unwrap();
        let second = pipeline.run(&tags(&["B", "A"]), 10).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
        assert_eq!(pipeline.source.calls(), 2);
        assert_eq!(pipeline.summarizer.calls(), 10);

        pipeline.refresh();
        let third = pipeline.run(&tags(&["A", "B"]), 10).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(pipeline.source.calls(), 4);
        assert_eq!(pipeline.cache_stats().computed, 2);
    }

    #[tokio::test]
    async fn test_ttl_expiry_triggers_new_pass() {
        let source = ScriptedSource::default().with_feed("https://a.example/rss", entries("a", 5));
        let (clock, pipeline) = pipeline(source, CannedSummarizer::default());

        pipeline.run(&tags(&["A"]), 10).await.unwrap();
        clock.advance(Duration::from_secs(3600));
        pipeline.run(&tags(&["A"]), 10).await.unwrap();
        assert_eq!(pipeline.source.calls(), 2);
    }

    #[tokio::test]
    async fn test_sources_follow_registry_order() {
        let source = ScriptedSource::default()
            .with_feed("https://a.example/rss", entries("a", 1))
            .with_feed("https://b.example/rss", entries("b", 1));
        let (_clock, pipeline) = pipeline(source, CannedSummarizer::default());

        let result = pipeline.run(&tags(&["B", "A"]), 10).await.unwrap();
        let sources: Vec<&str> = result.iter().map(|a| a.source.as_str()).collect();
        assert_eq!(sources, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_unknown_source_is_a_hard_error() {
        let (_clock, pipeline) = pipeline(ScriptedSource::default(), CannedSummarizer::default());
        let result = pipeline.run(&tags(&["A", "Nope"]), 10).await;
        assert!(matches!(result, Err(Error::UnknownSource(_))));
        assert_eq!(pipeline.source.calls(), 0);
    }

    #[tokio::test]
    async fn test_dates_normalized_to_target_offset() {
        let mut feed = entries("a", 1);
        let utc = FixedOffset::east_opt(0).unwrap();
        feed[0].published = PublishedAt::Parsed(utc.with_ymd_and_hms(2025, 5, 6, 1, 30, 0).unwrap());
        let source = ScriptedSource::default().with_feed("https://a.example/rss", feed);
        let (_clock, pipeline) = pipeline(source, CannedSummarizer::default());

        let result = pipeline.run(&tags(&["A"]), 5).await.unwrap();
        let published = &result.iter().next().unwrap().published_at;
        assert_eq!(published.date(), Some(NaiveDate::from_ymd_opt(2025, 5, 5).unwrap()));
        assert_eq!(published.display_date(), "05-05-2025");
    }

    #[tokio::test]
    async fn test_scraped_entries_use_placeholder_text() {
        let mut feed = entries("a", 1);
        feed[0].summary = String::new();
        let source = ScriptedSource::default().with_feed("https://a.example/rss", feed);
        let summarizer = CannedSummarizer::default().with(NO_SUMMARY_PLACEHOLDER, "Sin novedades.");
        let (_clock, pipeline) = pipeline_with(FetchMode::Html, source, summarizer, Duration::ZERO);

        let result = pipeline.run(&tags(&["A"]), 5).await.unwrap();
        assert_eq!(result.iter().next().unwrap().digest, "Sin novedades.");
    }

    #[tokio::test]
    async fn test_concurrent_runs_share_one_pass() {
        let source = ScriptedSource::default().with_feed("https://a.example/rss", entries("a", 2));
        let (_clock, pipeline) = pipeline_with(
            FetchMode::Rss,
            source,
            CannedSummarizer::default(),
            Duration::from_millis(5),
        );

        let sel = tags(&["A"]);
        let (x, y) = tokio::join!(pipeline.run(&sel, 5), pipeline.run(&sel, 5));
        assert!(Arc::ptr_eq(&x.unwrap(), &y.unwrap()));
        assert_eq!(pipeline.source.calls(), 1);
        assert_eq!(pipeline.summarizer.calls(), 2);
    }

    #[tokio::test]
    async fn test_repeated_tags_do_not_split_the_cap() {
        let source = ScriptedSource::default().with_feed("https://a.example/rss", entries("a", 25));
        let (_clock, pipeline) = pipeline(source, CannedSummarizer::default());

        let single = pipeline.run(&tags(&["A"]), 20).await.unwrap();
        let doubled = pipeline.run(&tags(&["A", "A"]), 20).await.unwrap();

        assert_eq!(single.len(), 20);
        assert!(Arc::ptr_eq(&single, &doubled));
        assert_eq!(pipeline.cache_stats().computed, 1);
        assert_eq!(pipeline.source.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_selection_yields_empty_result() {
        let (_clock, pipeline) = pipeline(ScriptedSource::default(), CannedSummarizer::default());
        let result = pipeline.run(&[], 10).await.unwrap();
        assert!(result.is_empty());
        assert_eq!(pipeline.source.calls(), 0);
    }
}
