use ahash::AHashMap;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::domain::{CacheKey, Namespace};
use crate::observability::{CacheMetrics, TimingGuard};

use super::clock::{Clock, SystemClock};
use super::codec::ValueCodec;

/// Value as held at rest.
enum Stored<V> {
    Raw(V),
    Encoded(Vec<u8>),
}

struct Entry<V> {
    value: Stored<V>,
    stored_at: DateTime<Utc>,
    touched_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    version: Option<String>,
    /// Recency marker; strictly increasing across set and successful get
    tick: u64,
}

impl<V> Entry<V> {
    #[inline]
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Why a lookup found nothing usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissReason {
    Absent,
    Expired,
    VersionMismatch,
    Undecodable,
}

/// Entries plus the recency index. Only ever touched under the cache mutex.
struct Store<V> {
    entries: AHashMap<CacheKey, Entry<V>>,
    recency: BTreeMap<u64, CacheKey>,
    next_tick: u64,
}

impl<V> Store<V> {
    fn new() -> Self {
        Store {
            entries: AHashMap::new(),
            recency: BTreeMap::new(),
            next_tick: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    fn remove(&mut self, key: &CacheKey) -> Option<Entry<V>> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.tick);
        Some(entry)
    }

    fn touch(&mut self, key: &CacheKey, now: DateTime<Utc>) {
        let tick = self.tick();
        if let Some(entry) = self.entries.get_mut(key) {
            self.recency.remove(&entry.tick);
            entry.tick = tick;
            entry.touched_at = now;
            self.recency.insert(tick, key.clone());
        }
    }

    /// Remove the least recently touched entry.
    fn evict_lru(&mut self) -> Option<CacheKey> {
        let (_, key) = self.recency.pop_first()?;
        self.entries.remove(&key);
        Some(key)
    }

    fn retain(&mut self, mut keep: impl FnMut(&CacheKey, &Entry<V>) -> bool) -> usize {
        let before = self.entries.len();
        let recency = &mut self.recency;
        self.entries.retain(|key, entry| {
            let kept = keep(key, entry);
            if !kept {
                recency.remove(&entry.tick);
            }
            kept
        });
        before - self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.recency.clear();
    }
}

/// Introspection snapshot returned by [`PolicyCache::stats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub by_namespace: BTreeMap<Namespace, usize>,
}

/// Metadata of a live entry, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub stored_at: DateTime<Utc>,
    pub touched_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub version: Option<String>,
    pub encoded: bool,
}

/// Bounded, namespaced, time- and version-aware key/value store.
///
/// Each operation takes the store lock exactly once, so operations are atomic
/// with respect to each other and to the background sweep. Entries past their
/// expiry are treated as absent whether or not the sweep has removed them.
/// At capacity, inserting a new key first evicts the entry with the oldest
/// recency marker.
pub struct PolicyCache<V> {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    codec: Option<Arc<dyn ValueCodec<V>>>,
    store: Mutex<Store<V>>,
    metrics: CacheMetrics,
    sweeper: Mutex<Option<JoinHandle<()>>>,
    destroyed: AtomicBool,
}

impl<V> PolicyCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a cache on the system clock, storing values as-is.
    pub fn new(config: CacheConfig) -> Self {
        PolicyCache::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache on the given clock.
    pub fn with_clock(mut config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        if config.capacity == 0 {
            warn!("Cache capacity of 0 requested, using 1");
            config.capacity = 1;
        }

        PolicyCache {
            config,
            clock,
            codec: None,
            store: Mutex::new(Store::new()),
            metrics: CacheMetrics::new(),
            sweeper: Mutex::new(None),
            destroyed: AtomicBool::new(false),
        }
    }

    /// Store values through a codec instead of as-is.
    pub fn with_codec(mut self, codec: Arc<dyn ValueCodec<V>>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Create a cache and start its background sweep.
    ///
    /// Must be called from within a Tokio runtime for the sweep to run.
    pub fn create(config: CacheConfig) -> Arc<Self> {
        let cache = Arc::new(PolicyCache::new(config));
        cache.start_sweeper();
        cache
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Insert or replace the entry for `(namespace, identifier)`.
    ///
    /// Uses the configured default TTL when `ttl` is `None`. Never fails: if
    /// encoding fails the raw value is stored.
    pub fn set(
        &self,
        namespace: Namespace,
        identifier: &str,
        value: V,
        ttl: Option<Duration>,
        version: Option<&str>,
    ) {
        let key = CacheKey::new(namespace, identifier);
        let ttl = ttl.unwrap_or(self.config.default_ttl);
        let stored = self.encode(&key, value);

        let now = self.clock.now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut store = self.store.lock();

        if let Some(old) = store.entries.get(&key) {
            let tick = old.tick;
            store.recency.remove(&tick);
        } else if store.entries.len() >= self.config.capacity {
            if let Some(evicted) = store.evict_lru() {
                self.metrics.record_eviction();
                debug!(key = %evicted, "Evicted least recently used entry");
            }
        }

        let tick = store.tick();
        store.recency.insert(tick, key.clone());
        store.entries.insert(
            key.clone(),
            Entry {
                value: stored,
                stored_at: now,
                touched_at: now,
                expires_at,
                version: version.map(str::to_string),
                tick,
            },
        );

        debug!(key = %key, ttl_ms = ttl.as_millis() as u64, version, "Cache set");
    }

    /// Look up a value, refreshing its recency on a hit.
    ///
    /// Returns `None` when the entry is missing, expired, or stored under a
    /// different version than `version` (when both are given); expired and
    /// mismatched entries are removed.
    pub fn get(&self, namespace: Namespace, identifier: &str, version: Option<&str>) -> Option<V> {
        self.try_get(namespace, identifier, version).ok()
    }

    /// Like [`get`](Self::get), but reports why nothing was returned.
    pub fn try_get(
        &self,
        namespace: Namespace,
        identifier: &str,
        version: Option<&str>,
    ) -> Result<V, MissReason> {
        let key = CacheKey::new(namespace, identifier);
        let outcome = self.lookup(&key, version);

        match &outcome {
            Ok(_) => debug!(key = %key, "Cache hit"),
            Err(reason) => debug!(key = %key, reason = ?reason, "Cache miss"),
        }
        self.metrics.record_lookup(outcome.is_ok());

        outcome
    }

    /// True if `get` would return a value. Same removal behaviour as `get`.
    pub fn has(&self, namespace: Namespace, identifier: &str, version: Option<&str>) -> bool {
        self.get(namespace, identifier, version).is_some()
    }

    /// Remove one entry; returns whether it existed.
    pub fn delete(&self, namespace: Namespace, identifier: &str) -> bool {
        let key = CacheKey::new(namespace, identifier);
        let existed = self.store.lock().remove(&key).is_some();
        debug!(key = %key, existed, "Cache delete");
        existed
    }

    /// Remove every entry of a namespace; returns how many were removed.
    pub fn clear_namespace(&self, namespace: Namespace) -> usize {
        let removed = self.store.lock().retain(|key, _| key.namespace != namespace);
        debug!(namespace = %namespace, removed, "Cleared namespace");
        removed
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.store.lock().clear();
        debug!("Cleared cache");
    }

    /// Current size, capacity and per-namespace counts. No side effects.
    pub fn stats(&self) -> CacheStats {
        let store = self.store.lock();
        let mut by_namespace = BTreeMap::new();
        for key in store.entries.keys() {
            *by_namespace.entry(key.namespace).or_insert(0) += 1;
        }

        CacheStats {
            size: store.entries.len(),
            capacity: self.config.capacity,
            by_namespace,
        }
    }

    /// Metadata of an entry as stored, without expiry checks or recency refresh.
    pub fn entry_info(&self, namespace: Namespace, identifier: &str) -> Option<EntryInfo> {
        let key = CacheKey::new(namespace, identifier);
        let store = self.store.lock();
        store.entries.get(&key).map(|e| EntryInfo {
            stored_at: e.stored_at,
            touched_at: e.touched_at,
            expires_at: e.expires_at,
            version: e.version.clone(),
            encoded: matches!(e.value, Stored::Encoded(_)),
        })
    }

    /// Remove every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let removed = self.store.lock().retain(|_, entry| !entry.is_expired(now));
        if removed > 0 {
            debug!(removed, "Purged expired entries");
        }
        removed
    }

    /// Return the cached value or derive, store and return a fresh one.
    pub fn get_or_insert_with<F>(
        &self,
        namespace: Namespace,
        identifier: &str,
        ttl: Option<Duration>,
        version: Option<&str>,
        derive: F,
    ) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(namespace, identifier, version) {
            return value;
        }

        let value = {
            let _timing = TimingGuard::new(&self.metrics);
            derive()
        };
        self.set(namespace, identifier, value.clone(), ttl, version);
        value
    }

    /// Async, fallible variant of [`get_or_insert_with`](Self::get_or_insert_with).
    ///
    /// Only a successfully completed derivation is stored. If the returned
    /// future is dropped before completion nothing is stored.
    pub async fn get_or_try_insert_async<F, Fut, E>(
        &self,
        namespace: Namespace,
        identifier: &str,
        ttl: Option<Duration>,
        version: Option<&str>,
        derive: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(namespace, identifier, version) {
            return Ok(value);
        }

        let value = {
            let _timing = TimingGuard::new(&self.metrics);
            derive().await?
        };
        self.set(namespace, identifier, value.clone(), ttl, version);
        Ok(value)
    }

    /// Start the periodic expiry sweep.
    ///
    /// Returns false if the cache was destroyed or no Tokio runtime is
    /// available. A running sweep is replaced.
    pub fn start_sweeper(self: &Arc<Self>) -> bool {
        if self.is_destroyed() {
            return false;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No Tokio runtime, expiry sweep disabled");
                return false;
            }
        };

        let weak: Weak<Self> = Arc::downgrade(self);
        let period = self.config.sweep_interval.max(Duration::from_millis(1));

        let handle = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // the first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let Some(cache) = weak.upgrade() else { break };
                if cache.is_destroyed() {
                    break;
                }
                let removed = cache.purge_expired();
                cache.metrics().record_sweep(removed);
            }
        });

        if let Some(previous) = self.sweeper.lock().replace(handle) {
            previous.abort();
        }

        info!(interval_ms = period.as_millis() as u64, "Started cache sweep");
        true
    }

    /// Stop the sweep and clear the store. No sweep runs afterwards.
    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::SeqCst);
        if let Some(handle) = self.sweeper.lock().take() {
            handle.abort();
        }
        self.clear();
        info!("Cache destroyed");
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::SeqCst)
    }

    fn encode(&self, key: &CacheKey, value: V) -> Stored<V> {
        let Some(codec) = &self.codec else {
            return Stored::Raw(value);
        };

        match codec.encode(&value) {
            Ok(bytes) => Stored::Encoded(bytes),
            Err(e) => {
                self.metrics.record_transform_error();
                warn!(key = %key, codec = codec.name(), error = %e, "Encoding failed, storing raw value");
                Stored::Raw(value)
            }
        }
    }

    fn lookup(&self, key: &CacheKey, version: Option<&str>) -> Result<V, MissReason> {
        let now = self.clock.now();
        let mut store = self.store.lock();

        let entry = store.entries.get(key).ok_or(MissReason::Absent)?;

        if entry.is_expired(now) {
            store.remove(key);
            self.metrics.record_expiration();
            return Err(MissReason::Expired);
        }

        if let (Some(wanted), Some(stored)) = (version, entry.version.as_deref()) {
            if wanted != stored {
                debug!(key = %key, cached = stored, requested = wanted, "Version mismatch");
                store.remove(key);
                self.metrics.record_version_mismatch();
                return Err(MissReason::VersionMismatch);
            }
        }

        let decoded = match &entry.value {
            Stored::Raw(value) => Ok(value.clone()),
            Stored::Encoded(bytes) => match &self.codec {
                Some(codec) => codec.decode(bytes).map_err(|e| e.to_string()),
                None => Err("no codec configured".to_string()),
            },
        };

        let value = match decoded {
            Ok(value) => value,
            Err(error) => {
                warn!(key = %key, error = %error, "Decoding failed, dropping entry");
                store.remove(key);
                self.metrics.record_transform_error();
                return Err(MissReason::Undecodable);
            }
        };

        store.touch(key, now);
        Ok(value)
    }
}

impl<V> Drop for PolicyCache<V> {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.get_mut().take() {
            handle.abort();
        }
    }
}
