use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::cache::{CacheStats, JsonCodec, PolicyCache};
use crate::config::CacheConfig;
use crate::domain::{Context, Decision, Namespace};
use crate::observability::CacheMetrics;
use crate::rules::{PolicyResolver, RuleTable};

/// Resolves decisions through a cache.
///
/// The only place where cache and resolver meet: on a hit the cached
/// [`Decision`] is returned unchanged, on a miss (absent, expired or stored
/// under another version) the decision is derived, stored under the same key,
/// TTL and version, and returned.
pub struct PolicyEngine {
    cache: Arc<PolicyCache<Decision>>,
    resolver: PolicyResolver,
}

impl PolicyEngine {
    /// Build an engine around an existing cache.
    pub fn new(cache: Arc<PolicyCache<Decision>>, resolver: PolicyResolver) -> Self {
        PolicyEngine { cache, resolver }
    }

    /// Build an engine with its own cache and start the cache's expiry sweep.
    ///
    /// With `compress` set, decisions are held as encoded JSON.
    pub fn create(config: CacheConfig, resolver: PolicyResolver) -> Self {
        let mut cache = PolicyCache::new(config.clone());
        if config.compress {
            cache = cache.with_codec(Arc::new(JsonCodec::<Decision>::new()));
        }

        let cache = Arc::new(cache);
        cache.start_sweeper();

        info!(
            capacity = config.capacity,
            default_ttl_secs = config.default_ttl.as_secs(),
            compress = config.compress,
            "Policy engine created"
        );

        PolicyEngine::new(cache, resolver)
    }

    pub fn cache(&self) -> &Arc<PolicyCache<Decision>> {
        &self.cache
    }

    pub fn resolver(&self) -> &PolicyResolver {
        &self.resolver
    }

    pub fn metrics(&self) -> &CacheMetrics {
        self.cache.metrics()
    }

    /// Resolve `ctx` against `table`, consulting the cache first.
    ///
    /// Without an explicit `ttl` the namespace's recommended TTL applies, or
    /// the cache default if it has none.
    pub fn resolve_cached(
        &self,
        namespace: Namespace,
        identifier: &str,
        ctx: &Context,
        table: &RuleTable,
        ttl: Option<Duration>,
        version: Option<&str>,
    ) -> Decision {
        self.resolve_with(namespace, identifier, ttl, version, || {
            self.resolver.resolve(ctx, table)
        })
    }

    /// Like [`resolve_cached`](Self::resolve_cached) with any derivation.
    pub fn resolve_with<F>(
        &self,
        namespace: Namespace,
        identifier: &str,
        ttl: Option<Duration>,
        version: Option<&str>,
        derive: F,
    ) -> Decision
    where
        F: FnOnce() -> Decision,
    {
        let ttl = ttl.or_else(|| namespace.recommended_ttl());
        self.cache
            .get_or_insert_with(namespace, identifier, ttl, version, derive)
    }

    /// Resolve through a fallible async derivation.
    ///
    /// Only an `Ok` decision is stored. Dropping the returned future before
    /// it completes stores nothing.
    pub async fn resolve_async<F, Fut, E>(
        &self,
        namespace: Namespace,
        identifier: &str,
        ttl: Option<Duration>,
        version: Option<&str>,
        derive: F,
    ) -> Result<Decision, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Decision, E>>,
    {
        let ttl = ttl.or_else(|| namespace.recommended_ttl());
        self.cache
            .get_or_try_insert_async(namespace, identifier, ttl, version, derive)
            .await
    }

    /// Drop one cached decision; returns whether it existed.
    pub fn invalidate(&self, namespace: Namespace, identifier: &str) -> bool {
        self.cache.delete(namespace, identifier)
    }

    /// Drop every cached value of a namespace.
    pub fn invalidate_namespace(&self, namespace: Namespace) -> usize {
        self.cache.clear_namespace(namespace)
    }

    /// Drop what depends on a task: its actions and all process details.
    pub fn clear_task_related(&self, task_id: &str) {
        let buttons = self.cache.delete(Namespace::WorkflowButtons, task_id);
        let processes = self.cache.clear_namespace(Namespace::ProcessInfo);
        debug!(task_id, buttons, processes, "Cleared task related entries");
    }

    /// Drop what depends on form definitions.
    pub fn clear_form_related(&self) {
        let removed: usize = [
            Namespace::FormConfig,
            Namespace::FormData,
            Namespace::PermissionConfig,
        ]
        .into_iter()
        .map(|ns| self.cache.clear_namespace(ns))
        .sum();
        debug!(removed, "Cleared form related entries");
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Stop the expiry sweep and clear the cache.
    pub fn destroy(&self) {
        self.cache.destroy();
    }
}
