use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::Namespace;

use super::store::PolicyCache;

/// Start wrapping a derivation with `cache`.
///
/// `key_fn` maps the derivation's argument to the identifier within
/// `namespace`. The returned layer is completed with [`CacheLayer::wrap`] or
/// [`CacheLayer::wrap_async`].
///
/// ```ignore
/// let permissions = with_cache(cache, Namespace::PermissionConfig, |q: &Query| q.key(), None)
///     .wrap(|q: &Query| load_permissions(q));
/// let first = permissions.call(&query);
/// ```
pub fn with_cache<V, K>(
    cache: Arc<PolicyCache<V>>,
    namespace: Namespace,
    key_fn: K,
    ttl: Option<Duration>,
) -> CacheLayer<V, K> {
    CacheLayer {
        cache,
        namespace,
        key_fn,
        ttl,
    }
}

/// A cache binding waiting for the derivation it wraps.
pub struct CacheLayer<V, K> {
    cache: Arc<PolicyCache<V>>,
    namespace: Namespace,
    key_fn: K,
    ttl: Option<Duration>,
}

impl<V, K> CacheLayer<V, K> {
    /// Wrap a synchronous derivation.
    pub fn wrap<F>(self, derive: F) -> CachedFn<V, K, F> {
        CachedFn {
            layer: self,
            derive,
        }
    }

    /// Wrap a fallible async derivation. Only `Ok` results are cached.
    pub fn wrap_async<F>(self, derive: F) -> AsyncCachedFn<V, K, F> {
        AsyncCachedFn {
            layer: self,
            derive,
        }
    }
}

/// A derivation that consults the cache first.
pub struct CachedFn<V, K, F> {
    layer: CacheLayer<V, K>,
    derive: F,
}

impl<V, K, F> CachedFn<V, K, F>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn call<A: ?Sized>(&self, arg: &A) -> V
    where
        K: Fn(&A) -> String,
        F: Fn(&A) -> V,
    {
        let layer = &self.layer;
        let identifier = (layer.key_fn)(arg);

        layer
            .cache
            .get_or_insert_with(layer.namespace, &identifier, layer.ttl, None, || {
                (self.derive)(arg)
            })
    }

    pub fn cache(&self) -> &Arc<PolicyCache<V>> {
        &self.layer.cache
    }
}

/// An async, fallible derivation that consults the cache first.
pub struct AsyncCachedFn<V, K, F> {
    layer: CacheLayer<V, K>,
    derive: F,
}

impl<V, K, F> AsyncCachedFn<V, K, F>
where
    V: Clone + Send + Sync + 'static,
{
    pub async fn call<A, Fut, E>(&self, arg: &A) -> Result<V, E>
    where
        A: ?Sized,
        K: Fn(&A) -> String,
        F: Fn(&A) -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let layer = &self.layer;
        let identifier = (layer.key_fn)(arg);

        layer
            .cache
            .get_or_try_insert_async(layer.namespace, &identifier, layer.ttl, None, || {
                (self.derive)(arg)
            })
            .await
    }

    pub fn cache(&self) -> &Arc<PolicyCache<V>> {
        &self.layer.cache
    }
}
