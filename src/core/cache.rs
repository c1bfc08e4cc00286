//! Model caching utilities for sharing loaded weights across requests.
//!
//! Loading a classifier downloads and initializes its weights, so each model
//! is loaded at most once per cache. Entries are keyed by the value type and
//! a string key; every key owns its own initialization cell, which means
//! concurrent first requests for the same model share one load while loads
//! of different models proceed independently.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

/// Trait implemented by model option types to generate a stable cache key.
pub trait ModelOptions {
    fn cache_key(&self) -> String;
}

type Entry = Arc<dyn Any + Send + Sync>;
type Slot = Arc<OnceCell<Entry>>;
type CacheStorage = HashMap<(TypeId, String), Slot>;

/// A thread-safe, load-once cache.
///
/// Values are handed out as `Arc<M>` and are read-only after load.
pub struct ModelCache {
    slots: Mutex<CacheStorage>,
}

impl ModelCache {
    /// Create a new empty model cache.
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Get a cached value or load it.
    ///
    /// The map lock is only held while looking up the slot for `key`; the
    /// loader itself runs under the slot's `OnceCell`, so callers racing on
    /// the same key wait for the first load instead of starting their own.
    /// If the loader fails the slot stays empty and the next call retries.
    pub async fn get_or_create<M, F, Fut>(&self, key: &str, loader: F) -> anyhow::Result<Arc<M>>
    where
        M: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<M>>,
    {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots
                .entry((TypeId::of::<M>(), key.to_string()))
                .or_default()
                .clone()
        };

        if slot.initialized() {
            tracing::debug!(key, "model cache hit");
        }

        let entry = slot
            .get_or_try_init(|| async {
                tracing::debug!(key, "model cache miss, loading");
                let value = loader().await?;
                Ok::<Entry, anyhow::Error>(Arc::new(value))
            })
            .await?;

        Arc::clone(entry)
            .downcast::<M>()
            .map_err(|_| anyhow::anyhow!("cache entry `{key}` holds an unexpected type"))
    }

    /// Whether a value is loaded for `key`.
    pub async fn contains<M: 'static>(&self, key: &str) -> bool {
        let slots = self.slots.lock().await;
        slots
            .get(&(TypeId::of::<M>(), key.to_string()))
            .is_some_and(|slot| slot.initialized())
    }

    /// Drop every cached value. Pipelines already handed out stay alive.
    pub async fn clear(&self) {
        self.slots.lock().await.clear();
    }

    /// Number of loaded values.
    pub async fn len(&self) -> usize {
        let slots = self.slots.lock().await;
        slots.values().filter(|slot| slot.initialized()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide cache used by pipeline builders.
static GLOBAL_MODEL_CACHE: once_cell::sync::Lazy<ModelCache> =
    once_cell::sync::Lazy::new(ModelCache::new);

/// Get a reference to the global model cache.
pub fn global_cache() -> &'static ModelCache {
    &GLOBAL_MODEL_CACHE
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct TestModel {
        id: String,
    }

    #[tokio::test]
    async fn test_cache_returns_same_instance() {
        let cache = ModelCache::new();

        let model1 = cache
            .get_or_create("test-model", || async {
                Ok(TestModel {
                    id: "original".to_string(),
                })
            })
            .await
            .unwrap();

        let model2 = cache
            .get_or_create("test-model", || async {
                Ok(TestModel {
                    id: "new".to_string(),
                })
            })
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&model1, &model2));
        assert_eq!(model2.id, "original");
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_requests_load_once() {
        let cache = ModelCache::new();
        let counter = AtomicUsize::new(0);
        let loads = &counter;

        let load = move || async move {
            loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(TestModel {
                id: "shared".to_string(),
            })
        };

        let (a, b, c) = tokio::join!(
            cache.get_or_create("shared", load),
            cache.get_or_create("shared", load),
            cache.get_or_create("shared", load),
        );

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(c.unwrap().id, "shared");
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let cache = ModelCache::new();

        let first = cache
            .get_or_create::<TestModel, _, _>("flaky", || async {
                Err(anyhow::anyhow!("weights unavailable"))
            })
            .await;
        assert!(first.is_err());
        assert!(!cache.contains::<TestModel>("flaky").await);

        let second = cache
            .get_or_create("flaky", || async {
                Ok(TestModel {
                    id: "recovered".to_string(),
                })
            })
            .await
            .unwrap();
        assert_eq!(second.id, "recovered");
        assert!(cache.contains::<TestModel>("flaky").await);
    }

    #[tokio::test]
    async fn test_keys_and_types_are_independent() {
        let cache = ModelCache::new();

        cache
            .get_or_create("a", || async { Ok(TestModel { id: "a".into() }) })
            .await
            .unwrap();
        cache
            .get_or_create("a", || async { Ok(42u32) })
            .await
            .unwrap();
        cache
            .get_or_create("b", || async { Ok(TestModel { id: "b".into() }) })
            .await
            .unwrap();

        assert_eq!(cache.len().await, 3);
        cache.clear().await;
        assert!(cache.is_empty().await);
    }
}
