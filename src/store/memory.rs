use crate::core::cache::Cache;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

struct StoredValue {
    value: Value,
    inserted_at: Instant,
}

/// In-memory cache with the same contract as the file store, used by
/// tests as a substitutable cache capability. Bucketed keys collapse to
/// plain entries here; callers observe identical behavior.
pub struct MemoryCache {
    inner: Mutex<HashMap<String, StoredValue>>,
    ttl: Option<Duration>,
}

impl MemoryCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
            ttl,
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let mut cache = self.inner.lock().await;
        if let Some(ttl) = self.ttl
            && cache
                .get(key)
                .is_some_and(|entry| entry.inserted_at.elapsed() > ttl)
        {
            debug!(key, "cache entry expired");
            cache.remove(key);
            return None;
        }
        cache.get(key).map(|entry| entry.value.clone())
    }

    async fn get_stale(&self, key: &str) -> Option<Value> {
        let cache = self.inner.lock().await;
        cache.get(key).map(|entry| entry.value.clone())
    }

    async fn put(&self, key: &str, value: Value) {
        let mut cache = self.inner.lock().await;
        cache.insert(
            key.to_string(),
            StoredValue {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    async fn invalidate(&self, key: &str) {
        let mut cache = self.inner.lock().await;
        cache.remove(key);
    }

    async fn clear(&self) {
        let mut cache = self.inner.lock().await;
        cache.clear();
    }
}
