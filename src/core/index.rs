use crate::core::cache::{Cache, nav_series_key};
use chrono::Utc;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// File name of the persisted index, one JSON object mapping fund code to
/// last-access epoch seconds.
pub const INDEX_FILE_NAME: &str = "fund_cache_index.json";

/// Registry of last-access times per cached fund. Once the registry grows
/// past `capacity`, the least recently accessed funds are evicted together
/// with their NAV cache entries.
pub struct FundCacheIndex {
    path: PathBuf,
    capacity: usize,
    cache: Arc<dyn Cache>,
}

impl FundCacheIndex {
    pub fn new(dir: impl AsRef<Path>, capacity: usize, cache: Arc<dyn Cache>) -> Self {
        Self {
            path: dir.as_ref().join(INDEX_FILE_NAME),
            capacity,
            cache,
        }
    }

    fn load(&self) -> HashMap<String, f64> {
        match fs::read(&self.path) {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(index) => index,
                Err(e) => {
                    warn!(error = %e, "unreadable fund cache index, starting empty");
                    HashMap::new()
                }
            },
            // A missing index file is the normal first run.
            Err(_) => HashMap::new(),
        }
    }

    /// Records an access to `fund_code`, evicting the least recently
    /// accessed funds when the index exceeds capacity. Ties on the access
    /// time break by fund code order, so eviction is deterministic.
    pub async fn touch(&self, fund_code: &str) {
        let mut index = self.load();
        let now = Utc::now().timestamp_micros() as f64 / 1_000_000.0;
        index.insert(fund_code.to_string(), now);

        if index.len() > self.capacity {
            let mut by_age: Vec<(String, f64)> =
                index.iter().map(|(code, ts)| (code.clone(), *ts)).collect();
            by_age.sort_by(|a, b| {
                a.1.partial_cmp(&b.1)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.0.cmp(&b.0))
            });

            let excess = index.len() - self.capacity;
            for (code, _) in by_age.into_iter().take(excess) {
                self.cache.invalidate(&nav_series_key(&code)).await;
                index.remove(&code);
                debug!(fund_code = %code, "evicted least recently used fund cache");
            }
        }

        let persisted = serde_json::to_vec(&index)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| fs::write(&self.path, bytes).map_err(anyhow::Error::from));
        if let Err(e) = persisted {
            // Non-fatal: the current request already saw the in-memory
            // effect; the next touch rewrites the file.
            warn!(error = %e, "failed to persist fund cache index");
        }
    }
}
