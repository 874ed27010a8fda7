use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counters describing cache and derivation behaviour.
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Lookups answered from the cache
    pub hits: AtomicU64,
    /// Lookups that found nothing usable
    pub misses: AtomicU64,

    /// Entries found expired on lookup
    pub expirations: AtomicU64,
    /// Entries dropped because the requested version differed
    pub version_mismatches: AtomicU64,
    /// Entries evicted to stay within capacity
    pub evictions: AtomicU64,
    /// Encode or decode failures (recovered)
    pub transform_errors: AtomicU64,

    /// Background sweeps run
    pub sweeps: AtomicU64,
    /// Entries removed by sweeps
    pub swept_entries: AtomicU64,

    /// Derivations run on a miss
    pub derivations: AtomicU64,

    /// Derivation latency buckets
    pub latency_under_1ms: AtomicU64,
    pub latency_1_5ms: AtomicU64,
    pub latency_5_10ms: AtomicU64,
    pub latency_10_50ms: AtomicU64,
    pub latency_50_100ms: AtomicU64,
    pub latency_over_100ms: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub expirations: u64,
    pub version_mismatches: u64,
    pub evictions: u64,
    pub transform_errors: u64,
    pub sweeps: u64,
    pub swept_entries: u64,
    pub derivations: u64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        CacheMetrics::default()
    }

    #[inline]
    pub fn record_lookup(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_expiration(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_version_mismatch(&self) {
        self.version_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_transform_error(&self) {
        self.transform_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a sweep and how many entries it removed.
    pub fn record_sweep(&self, removed: usize) {
        self.sweeps.fetch_add(1, Ordering::Relaxed);
        self.swept_entries.fetch_add(removed as u64, Ordering::Relaxed);
    }

    /// Record a derivation that started at `start`.
    pub fn record_derivation(&self, start: Instant) {
        self.derivations.fetch_add(1, Ordering::Relaxed);

        let micros = start.elapsed().as_micros() as u64;

        if micros < 1000 {
            self.latency_under_1ms.fetch_add(1, Ordering::Relaxed);
        } else if micros < 5000 {
            self.latency_1_5ms.fetch_add(1, Ordering::Relaxed);
        } else if micros < 10000 {
            self.latency_5_10ms.fetch_add(1, Ordering::Relaxed);
        } else if micros < 50000 {
            self.latency_10_50ms.fetch_add(1, Ordering::Relaxed);
        } else if micros < 100000 {
            self.latency_50_100ms.fetch_add(1, Ordering::Relaxed);
        } else {
            self.latency_over_100ms.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Hit ratio over all lookups, `None` before the first lookup.
    pub fn hit_rate(&self) -> Option<f64> {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed);
        (total > 0).then(|| hits as f64 / total as f64)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            version_mismatches: self.version_mismatches.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            transform_errors: self.transform_errors.load(Ordering::Relaxed),
            sweeps: self.sweeps.load(Ordering::Relaxed),
            swept_entries: self.swept_entries.load(Ordering::Relaxed),
            derivations: self.derivations.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        format!(
            r#"# HELP flowpolicy_cache_lookups_total Cache lookups by outcome
# TYPE flowpolicy_cache_lookups_total counter
flowpolicy_cache_lookups_total{{outcome="hit"}} {}
flowpolicy_cache_lookups_total{{outcome="miss"}} {}

# HELP flowpolicy_cache_removals_total Entries removed by cause
# TYPE flowpolicy_cache_removals_total counter
flowpolicy_cache_removals_total{{cause="expired"}} {}
flowpolicy_cache_removals_total{{cause="version_mismatch"}} {}
flowpolicy_cache_removals_total{{cause="evicted"}} {}
flowpolicy_cache_removals_total{{cause="swept"}} {}

# HELP flowpolicy_cache_transform_errors_total Recovered encode/decode failures
# TYPE flowpolicy_cache_transform_errors_total counter
flowpolicy_cache_transform_errors_total {}

# HELP flowpolicy_cache_sweeps_total Background sweeps run
# TYPE flowpolicy_cache_sweeps_total counter
flowpolicy_cache_sweeps_total {}

# HELP flowpolicy_derivations_total Derivations run on cache miss
# TYPE flowpolicy_derivations_total counter
flowpolicy_derivations_total {}

# HELP flowpolicy_derivation_latency_bucket Derivation latency histogram
# TYPE flowpolicy_derivation_latency_bucket counter
flowpolicy_derivation_latency_bucket{{le="0.001"}} {}
flowpolicy_derivation_latency_bucket{{le="0.005"}} {}
flowpolicy_derivation_latency_bucket{{le="0.01"}} {}
flowpolicy_derivation_latency_bucket{{le="0.05"}} {}
flowpolicy_derivation_latency_bucket{{le="0.1"}} {}
flowpolicy_derivation_latency_bucket{{le="+Inf"}} {}
"#,
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
            self.expirations.load(Ordering::Relaxed),
            self.version_mismatches.load(Ordering::Relaxed),
            self.evictions.load(Ordering::Relaxed),
            self.swept_entries.load(Ordering::Relaxed),
            self.transform_errors.load(Ordering::Relaxed),
            self.sweeps.load(Ordering::Relaxed),
            self.derivations.load(Ordering::Relaxed),
            self.latency_under_1ms.load(Ordering::Relaxed),
            self.latency_1_5ms.load(Ordering::Relaxed),
            self.latency_5_10ms.load(Ordering::Relaxed),
            self.latency_10_50ms.load(Ordering::Relaxed),
            self.latency_50_100ms.load(Ordering::Relaxed),
            self.latency_over_100ms.load(Ordering::Relaxed),
        )
    }
}

/// Records derivation latency when dropped.
pub struct TimingGuard<'a> {
    metrics: &'a CacheMetrics,
    start: Instant,
}

impl<'a> TimingGuard<'a> {
    pub fn new(metrics: &'a CacheMetrics) -> Self {
        TimingGuard {
            metrics,
            start: Instant::now(),
        }
    }
}

impl<'a> Drop for TimingGuard<'a> {
    fn drop(&mut self) {
        self.metrics.record_derivation(self.start);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_lookup() {
        let metrics = CacheMetrics::new();
        assert_eq!(metrics.hit_rate(), None);

        metrics.record_lookup(true);
        metrics.record_lookup(true);
        metrics.record_lookup(false);
        metrics.record_lookup(true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.hits, 3);
        assert_eq!(snapshot.misses, 1);
        assert_eq!(metrics.hit_rate(), Some(0.75));
    }

    #[test]
    fn test_timing_guard_records_derivation() {
        let metrics = CacheMetrics::new();

        {
            let _guard = TimingGuard::new(&metrics);
        }

        assert_eq!(metrics.snapshot().derivations, 1);
        assert!(metrics.latency_under_1ms.load(Ordering::Relaxed) >= 1);
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = CacheMetrics::new();
        metrics.record_lookup(true);
        metrics.record_sweep(4);

        let output = metrics.to_prometheus();

        assert!(output.contains("flowpolicy_cache_lookups_total{outcome=\"hit\"} 1"));
        assert!(output.contains("flowpolicy_cache_removals_total{cause=\"swept\"} 4"));
        assert!(output.contains("flowpolicy_cache_sweeps_total 1"));
    }
}
