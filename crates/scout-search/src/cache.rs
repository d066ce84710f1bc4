//! In-process TTL caches with single-flight computation.
//!
//! Three instances back the search path: results, suggestions, and
//! translations. Each pairs a bounded moka store with an in-flight table so
//! concurrent misses on the same key run the computation once. Followers wait
//! on the leader's watch channel for at most `wait`. On timeout, or when the
//! leader fails or is cancelled, they compute on their own.
//!
//! Entries are insert-only. A late writer never replaces a live entry.
//! Outcomes that lost a channel are returned but not stored; a result served
//! by the lexical fallback is stored with its flags.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use moka::future::Cache;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use scout_core::{defaults, Degradation, Outcome, Result};

/// Sizing and timing for one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_entries: u64,
    /// How long a follower waits for the in-flight leader.
    pub wait: Duration,
}

impl CacheConfig {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            max_entries: defaults::CACHE_MAX_ENTRIES,
            wait: Duration::from_millis(defaults::SINGLE_FLIGHT_WAIT_MS),
        }
    }

    pub fn with_max_entries(mut self, max_entries: u64) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    /// `RESULT_CACHE_TTL_SECS`, plus the shared size and wait settings.
    pub fn results_from_env() -> Self {
        Self::from_env("RESULT_CACHE_TTL_SECS", defaults::RESULT_CACHE_TTL_SECS)
    }

    /// `SUGGESTION_CACHE_TTL_SECS`, plus the shared size and wait settings.
    pub fn suggestions_from_env() -> Self {
        Self::from_env(
            "SUGGESTION_CACHE_TTL_SECS",
            defaults::SUGGESTION_CACHE_TTL_SECS,
        )
    }

    /// `TRANSLATION_CACHE_TTL_SECS`, plus the shared size and wait settings.
    pub fn translations_from_env() -> Self {
        Self::from_env(
            "TRANSLATION_CACHE_TTL_SECS",
            defaults::TRANSLATION_CACHE_TTL_SECS,
        )
    }

    fn from_env(ttl_var: &str, ttl_default: u64) -> Self {
        fn read<T: std::str::FromStr>(key: &str, default: T) -> T {
            std::env::var(key)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }
        Self {
            ttl: Duration::from_secs(read(ttl_var, ttl_default)),
            max_entries: read("CACHE_MAX_ENTRIES", defaults::CACHE_MAX_ENTRIES),
            wait: Duration::from_millis(read(
                "SINGLE_FLIGHT_WAIT_MS",
                defaults::SINGLE_FLIGHT_WAIT_MS,
            )),
        }
    }
}

/// Where a returned value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    /// Served from a stored entry.
    Hit,
    /// Computed by this caller.
    Computed,
    /// Shared from a concurrent caller's computation.
    Coalesced,
}

/// A value returned by [`SingleFlightCache::get_or_compute`].
#[derive(Debug, Clone)]
pub struct Cached<V> {
    pub value: Arc<V>,
    pub degradation: Degradation,
    pub source: CacheSource,
}

impl<V> Cached<V> {
    pub fn is_hit(&self) -> bool {
        self.source == CacheSource::Hit
    }
}

/// Counters reported on the stats endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub name: &'static str,
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
    pub wait_timeouts: u64,
    pub entries: u64,
}

enum Slot<V> {
    Pending,
    Ready(Arc<V>, Degradation),
    Failed,
}

impl<V> Clone for Slot<V> {
    fn clone(&self) -> Self {
        match self {
            Slot::Pending => Slot::Pending,
            Slot::Ready(v, d) => Slot::Ready(v.clone(), *d),
            Slot::Failed => Slot::Failed,
        }
    }
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    wait_timeouts: AtomicU64,
}

/// Removes the in-flight marker when the leader finishes or is dropped.
struct InFlightGuard<'a, V> {
    in_flight: &'a DashMap<String, watch::Receiver<Slot<V>>>,
    key: &'a str,
}

impl<V> Drop for InFlightGuard<'_, V> {
    fn drop(&mut self) {
        self.in_flight.remove(self.key);
    }
}

/// TTL cache keyed by string with at most one in-flight computation per key.
pub struct SingleFlightCache<V> {
    name: &'static str,
    entries: Cache<String, (Arc<V>, Degradation)>,
    in_flight: DashMap<String, watch::Receiver<Slot<V>>>,
    wait: Duration,
    counters: Counters,
}

impl<V> SingleFlightCache<V>
where
    V: Send + Sync + 'static,
{
    pub fn new(name: &'static str, config: CacheConfig) -> Self {
        let entries = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();
        Self {
            name,
            entries,
            in_flight: DashMap::new(),
            wait: config.wait,
            counters: Counters::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stored value for `key`, if live.
    pub async fn get(&self, key: &str) -> Option<Arc<V>> {
        self.entries.get(key).await.map(|(value, _)| value)
    }

    /// Return the cached value or run `compute` once for all concurrent
    /// callers of the same key.
    ///
    /// Errors from `compute` are returned to the leader only. Followers of a
    /// failed leader compute for themselves.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> Result<Cached<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Outcome<V>>>,
    {
        if let Some((value, degradation)) = self.entries.get(key).await {
            return Ok(self.hit(key, value, degradation));
        }

        let claim = match self.in_flight.entry(key.to_string()) {
            Entry::Occupied(existing) => Err(existing.get().clone()),
            Entry::Vacant(vacant) => {
                let (tx, rx) = watch::channel(Slot::Pending);
                vacant.insert(rx);
                Ok(tx)
            }
        };

        match claim {
            Ok(tx) => self.lead(key, tx, compute).await,
            Err(rx) => self.follow(key, rx, compute).await,
        }
    }

    async fn lead<F, Fut>(
        &self,
        key: &str,
        tx: watch::Sender<Slot<V>>,
        compute: F,
    ) -> Result<Cached<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Outcome<V>>>,
    {
        let _guard = InFlightGuard {
            in_flight: &self.in_flight,
            key,
        };

        // A previous leader may have stored the value after our first lookup.
        if let Some((value, degradation)) = self.entries.get(key).await {
            let _ = tx.send(Slot::Ready(value.clone(), degradation));
            return Ok(self.hit(key, value, degradation));
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        match compute().await {
            Ok(outcome) => {
                let (value, degradation) = outcome.into_parts();
                let value = Arc::new(value);
                self.store(key, &value, degradation).await;
                let _ = tx.send(Slot::Ready(value.clone(), degradation));
                debug!(
                    subsystem = "search",
                    component = "cache",
                    cache = self.name,
                    cache_hit = false,
                    degraded = degradation.is_degraded(),
                    "Computed cache value"
                );
                Ok(Cached {
                    value,
                    degradation,
                    source: CacheSource::Computed,
                })
            }
            Err(e) => {
                let _ = tx.send(Slot::Failed);
                Err(e)
            }
        }
    }

    async fn follow<F, Fut>(
        &self,
        key: &str,
        mut rx: watch::Receiver<Slot<V>>,
        compute: F,
    ) -> Result<Cached<V>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Outcome<V>>>,
    {
        self.counters.coalesced.fetch_add(1, Ordering::Relaxed);
        let settled = match tokio::time::timeout(
            self.wait,
            rx.wait_for(|slot| !matches!(slot, Slot::Pending)),
        )
        .await
        {
            Ok(Ok(slot)) => Some(slot.clone()),
            Ok(Err(_)) => None,
            Err(_) => {
                self.counters.wait_timeouts.fetch_add(1, Ordering::Relaxed);
                warn!(
                    subsystem = "search",
                    component = "cache",
                    cache = self.name,
                    wait_ms = self.wait.as_millis() as u64,
                    "Timed out waiting for in-flight computation, computing independently"
                );
                None
            }
        };

        if let Some(Slot::Ready(value, degradation)) = settled {
            return Ok(Cached {
                value,
                degradation,
                source: CacheSource::Coalesced,
            });
        }

        let (value, degradation) = compute().await?.into_parts();
        let value = Arc::new(value);
        self.store(key, &value, degradation).await;
        Ok(Cached {
            value,
            degradation,
            source: CacheSource::Computed,
        })
    }

    async fn store(&self, key: &str, value: &Arc<V>, degradation: Degradation) {
        if !degradation.is_cacheable() {
            return;
        }
        self.entries
            .entry(key.to_string())
            .or_insert((value.clone(), degradation))
            .await;
    }

    fn hit(&self, key: &str, value: Arc<V>, degradation: Degradation) -> Cached<V> {
        self.counters.hits.fetch_add(1, Ordering::Relaxed);
        debug!(
            subsystem = "search",
            component = "cache",
            cache = self.name,
            cache_hit = true,
            key,
            "Cache hit"
        );
        Cached {
            value,
            degradation,
            source: CacheSource::Hit,
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            name: self.name,
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            coalesced: self.counters.coalesced.load(Ordering::Relaxed),
            wait_timeouts: self.counters.wait_timeouts.load(Ordering::Relaxed),
            entries: self.entries.entry_count(),
        }
    }

    /// Evict expired entries now instead of on the next access.
    pub async fn reclaim(&self) {
        self.entries.run_pending_tasks().await;
    }

    /// Run [`reclaim`](Self::reclaim) every `every`.
    pub fn spawn_reclaim(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.reclaim().await;
            }
        })
    }
}

/// Prefixed SHA-256 key over the given parts.
pub fn cache_key(prefix: &str, parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_le_bytes());
        hasher.update(part);
    }
    let hash = hex::encode(hasher.finalize());
    format!("{}{}", prefix, &hash[..32])
}
