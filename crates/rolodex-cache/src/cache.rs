//! TTL-keyed result cache with single-flight miss de-duplication.
//!
//! Values are stored as `serde_json::Value` so one cache serves every
//! operation class. Expiry is lazy (checked on access); an optional periodic
//! sweeper and an LRU bound keep memory in check. On a miss, exactly one
//! caller per key runs the compute function while concurrent callers for the
//! same key wait on a `watch` channel for the leader's outcome. Flights are
//! per key, so unrelated queries never contend.

use crate::config::{CacheConfig, TtlClass};
use crate::error::CacheError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Outcome a single-flight leader publishes to its waiters.
type FlightOutcome = Result<serde_json::Value, String>;

/// One cached value with its freshness window.
#[derive(Debug, Clone)]
struct CacheEntry {
    value: serde_json::Value,
    created_at: Instant,
    ttl: Duration,
    last_access: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.created_at) >= self.ttl
    }
}

/// A value returned by [`ResultCache::get_or_compute`], tagged with whether
/// it was served from a fresh cache entry.
///
/// `hit` is false both for the leader that computed the value and for the
/// waiters that shared its flight.
#[derive(Debug, Clone)]
pub struct Cached<T> {
    /// The cached or freshly computed value
    pub value: T,
    /// True when served from an unexpired entry without computing
    pub hit: bool,
}

/// Hit/miss counters and current size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Fresh-entry hits served without computing
    pub hits: u64,
    /// Misses that ran the compute function
    pub misses: u64,
    /// Entries currently stored
    pub entries: usize,
}

/// TTL cache shared by the discovery pipeline.
///
/// Constructed explicitly and passed by `Arc` into its consumers; there is no
/// ambient global instance.
pub struct ResultCache {
    entries: DashMap<String, CacheEntry>,
    flights: DashMap<String, watch::Receiver<Option<FlightOutcome>>>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    /// Create a cache with the given configuration.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: DashMap::new(),
            flights: DashMap::new(),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Create a cache with default TTLs and bounds.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Get a fresh cached value for `key`, or run `compute` to produce one.
    ///
    /// - Fresh hit: the cached value is returned and `compute` is never
    ///   invoked.
    /// - Miss: exactly one caller per key (the leader) runs `compute`;
    ///   concurrent callers for the same key block until the leader publishes
    ///   its outcome and then share it.
    /// - Leader failure: the error reaches every waiter and nothing is
    ///   stored, so the next caller recomputes.
    pub async fn get_or_compute<T, E, F, Fut>(
        &self,
        class: TtlClass,
        key: &str,
        compute: F,
    ) -> Result<Cached<T>, CacheError<E>>
    where
        T: Serialize + DeserializeOwned,
        E: std::error::Error,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let full_key = format!("{class}:{key}");

        if let Some(value) = self.lookup(&full_key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %full_key, "cache hit");
            return Ok(Cached {
                value: serde_json::from_value(value)?,
                hit: true,
            });
        }

        match self.join_or_lead(&full_key) {
            FlightRole::Waiter(rx) => self.wait_for_leader(&full_key, rx).await,
            FlightRole::Leader(tx) => {
                // Removes the flight when the leader finishes or is dropped
                // mid-compute; a dropped sender surfaces as `LeaderVanished`
                // to the waiters instead of a hang.
                let _guard = FlightGuard {
                    cache: self,
                    key: &full_key,
                };

                // A previous leader may have landed a value between our
                // lookup and taking the flight slot.
                if let Some(value) = self.lookup(&full_key) {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    let _ = tx.send(Some(Ok(value.clone())));
                    return Ok(Cached {
                        value: serde_json::from_value(value)?,
                        hit: true,
                    });
                }

                self.misses.fetch_add(1, Ordering::Relaxed);
                trace!(key = %full_key, "cache miss, computing");

                match compute().await {
                    Ok(value) => match serde_json::to_value(&value) {
                        Ok(json) => {
                            self.insert(&full_key, class, json.clone());
                            let _ = tx.send(Some(Ok(json)));
                            Ok(Cached { value, hit: false })
                        }
                        Err(err) => {
                            let _ = tx.send(Some(Err(err.to_string())));
                            Err(CacheError::Serialization(err))
                        }
                    },
                    Err(err) => {
                        let _ = tx.send(Some(Err(err.to_string())));
                        Err(CacheError::Compute(err))
                    }
                }
            }
        }
    }

    /// Drop the cached value for `key` in the given class, if present.
    pub fn invalidate(&self, class: TtlClass, key: &str) {
        let full_key = format!("{class}:{key}");
        if self.entries.remove(&full_key).is_some() {
            debug!(key = %full_key, "cache entry invalidated");
        }
    }

    /// Drop every cached value and reset the counters.
    pub fn clear(&self) {
        self.entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        debug!("cache cleared");
    }

    /// Current counters and size.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }

    /// Remove every expired entry. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "swept expired cache entries");
        }
        removed
    }

    /// Spawn a background task sweeping expired entries until `shutdown`
    /// fires.
    pub fn spawn_sweeper(self: &Arc<Self>, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cache.config.sweep_interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    () = shutdown.cancelled() => {
                        debug!("cache sweeper shutting down");
                        break;
                    }
                    _ = interval.tick() => {
                        cache.sweep();
                    }
                }
            }
        })
    }

    /// Fetch a fresh value, updating its recency; expired entries are dropped.
    fn lookup(&self, full_key: &str) -> Option<serde_json::Value> {
        let now = Instant::now();
        let expired = {
            let mut entry = self.entries.get_mut(full_key)?;
            if entry.is_expired(now) {
                true
            } else {
                entry.last_access = now;
                return Some(entry.value.clone());
            }
        };
        if expired {
            self.entries.remove(full_key);
        }
        None
    }

    /// Take the flight slot for `full_key`, or subscribe to the current one.
    fn join_or_lead(&self, full_key: &str) -> FlightRole {
        match self.flights.entry(full_key.to_string()) {
            Entry::Occupied(occupied) => FlightRole::Waiter(occupied.get().clone()),
            Entry::Vacant(vacant) => {
                let (tx, rx) = watch::channel(None);
                vacant.insert(rx);
                FlightRole::Leader(tx)
            }
        }
    }

    async fn wait_for_leader<T, E>(
        &self,
        full_key: &str,
        mut rx: watch::Receiver<Option<FlightOutcome>>,
    ) -> Result<Cached<T>, CacheError<E>>
    where
        T: DeserializeOwned,
        E: std::error::Error,
    {
        trace!(key = %full_key, "waiting on in-flight compute");
        loop {
            let outcome = rx.borrow_and_update().clone();
            match outcome {
                Some(Ok(json)) => {
                    return Ok(Cached {
                        value: serde_json::from_value(json)?,
                        hit: false,
                    })
                }
                Some(Err(message)) => return Err(CacheError::Shared(message)),
                None => {
                    if rx.changed().await.is_err() {
                        // Sender dropped; take whatever was published last.
                        let last = rx.borrow().clone();
                        return match last {
                            Some(Ok(json)) => Ok(Cached {
                                value: serde_json::from_value(json)?,
                                hit: false,
                            }),
                            Some(Err(message)) => Err(CacheError::Shared(message)),
                            None => Err(CacheError::LeaderVanished),
                        };
                    }
                }
            }
        }
    }

    fn insert(&self, full_key: &str, class: TtlClass, value: serde_json::Value) {
        let now = Instant::now();
        if self.entries.len() >= self.config.max_entries && !self.entries.contains_key(full_key) {
            self.evict_lru();
        }
        self.entries.insert(
            full_key.to_string(),
            CacheEntry {
                value,
                created_at: now,
                ttl: self.config.ttl(class),
                last_access: now,
            },
        );
    }

    fn evict_lru(&self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().last_access)
            .map(|entry| entry.key().clone());
        if let Some(key) = victim {
            self.entries.remove(&key);
            debug!(key = %key, "evicted least-recently-used cache entry");
        }
    }
}

enum FlightRole {
    Leader(watch::Sender<Option<FlightOutcome>>),
    Waiter(watch::Receiver<Option<FlightOutcome>>),
}

/// Removes the flight slot when the leader completes or is cancelled.
struct FlightGuard<'a> {
    cache: &'a ResultCache,
    key: &'a str,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.cache.flights.remove(self.key);
    }
}
