//! Time-to-live cache for whole pipeline runs.
//!
//! A run is keyed by the canonical (sorted, de-duplicated) set of selected
//! sources plus the per-source cap. Within the TTL a key returns the exact
//! [`ResultSet`] computed the first time, shared by `Arc`. Each key has its own
//! async mutex, so concurrent callers for one key wait for a single
//! computation instead of starting their own, and a result becomes visible
//! only once it is complete.

use crate::error::Result;
use crate::models::ResultSet;
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Source of "now" for expiry decisions.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock [`Clock`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> Instant {
        (**self).now()
    }
}

/// Identity of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    sources: BTreeSet<String>,
    per_source_cap: usize,
}

impl CacheKey {
    pub fn new<I, S>(sources: I, per_source_cap: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sources: sources.into_iter().map(Into::into).collect(),
            per_source_cap,
        }
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.sources.contains(tag)
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn per_source_cap(&self) -> usize {
        self.per_source_cap
    }
}

type KeyLock = Arc<tokio::sync::Mutex<()>>;

struct Entry {
    created_at: Instant,
    value: Arc<ResultSet>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Entries currently stored (fresh or not yet evicted).
    pub entries: usize,
    /// Pipeline passes computed since startup.
    pub computed: u64,
}

pub struct PipelineCache<C: Clock = SystemClock> {
    clock: C,
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, Entry>>,
    locks: Mutex<HashMap<CacheKey, KeyLock>>,
    computed: AtomicU64,
    generation: AtomicU64,
}

impl PipelineCache<SystemClock> {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<C: Clock> PipelineCache<C> {
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            clock,
            ttl,
            entries: Mutex::new(HashMap::new()),
            locks: Mutex::new(HashMap::new()),
            computed: AtomicU64::new(0),
            generation: AtomicU64::new(0),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, Entry>> {
        // A panic while holding the map cannot leave an entry half-written.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fresh value for `key`, evicting it if it has expired.
    fn fresh(&self, key: &CacheKey) -> Option<Arc<ResultSet>> {
        let now = self.clock.now();
        let mut entries = self.entries();
        match entries.get(key) {
            Some(entry) if now.saturating_duration_since(entry.created_at) < self.ttl => {
                Some(Arc::clone(&entry.value))
            }
            Some(_) => {
                debug!(sources = key.source_count(), cap = key.per_source_cap, "Cache entry expired");
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn locks(&self) -> MutexGuard<'_, HashMap<CacheKey, KeyLock>> {
        self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn key_lock(&self, key: &CacheKey) -> KeyLock {
        let mut locks = self.locks();
        Arc::clone(
            locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }

    /// Return the cached value for `key`, or run `compute` and publish its result.
    ///
    /// Errors are returned to the caller and never cached.
    pub async fn get_or_compute<F, Fut>(&self, key: CacheKey, compute: F) -> Result<Arc<ResultSet>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ResultSet>>,
    {
        if let Some(hit) = self.fresh(&key) {
            debug!(articles = hit.len(), "Cache hit");
            return Ok(hit);
        }

        let lock = self.key_lock(&key);
        let result = {
            let _guard = lock.lock().await;
            self.compute_locked(key.clone(), compute).await
        };
        drop(lock);
        self.release_lock(&key);
        result
    }

    /// Forget the lock for `key` once no caller holds or waits on it.
    fn release_lock(&self, key: &CacheKey) {
        let mut locks = self.locks();
        if locks.get(key).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(key);
        }
    }

    async fn compute_locked<F, Fut>(&self, key: CacheKey, compute: F) -> Result<Arc<ResultSet>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ResultSet>>,
    {
        // Someone else may have published while we waited.
        if let Some(hit) = self.fresh(&key) {
            debug!(articles = hit.len(), "Cache hit after waiting for in-flight run");
            return Ok(hit);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let value = Arc::new(compute().await?);
        self.computed.fetch_add(1, Ordering::SeqCst);

        if self.generation.load(Ordering::SeqCst) == generation {
            self.entries().insert(
                key,
                Entry {
                    created_at: self.clock.now(),
                    value: Arc::clone(&value),
                },
            );
        } else {
            info!("Cache invalidated during run; result not stored");
        }
        Ok(value)
    }

    /// Drop every cached result regardless of key.
    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let dropped = {
            let mut entries = self.entries();
            let n = entries.len();
            entries.clear();
            n
        };
        self.locks().retain(|_, lock| Arc::strong_count(lock) > 1);
        info!(dropped, "Cache invalidated");
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries().len(),
            computed: self.computed.load(Ordering::SeqCst),
        }
    }
}
