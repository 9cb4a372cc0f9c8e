use crate::core::cache::{Cache, split_key};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Disk-backed cache: one JSON file per key prefix under the cache
/// directory, with the file mtime as the TTL clock.
///
/// Bucketed keys (`prefix__subkey`) share the prefix file; each write
/// rewrites the whole deserialized bucket, so siblings survive but
/// concurrent writers race with last-writer-wins.
pub struct FileCache {
    dir: PathBuf,
    ttl: Option<Duration>,
}

impl FileCache {
    /// Opens a cache rooted at `dir`, creating the directory if needed.
    /// `ttl: None` disables expiry for this instance.
    pub fn new(dir: impl Into<PathBuf>, ttl: Option<Duration>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, ttl })
    }

    fn entry_path(&self, prefix: &str) -> PathBuf {
        self.dir.join(format!("{prefix}.json"))
    }

    fn is_expired(&self, path: &Path) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };
        match fs::metadata(path).and_then(|meta| meta.modified()) {
            // A modification time in the future reads as age zero.
            Ok(mtime) => mtime.elapsed().is_ok_and(|age| age > ttl),
            Err(e) => {
                debug!(error = %e, path = %path.display(), "could not read cache file mtime");
                false
            }
        }
    }

    fn read_entry(&self, prefix: &str, subkey: Option<&str>, honor_ttl: bool) -> Option<Value> {
        let path = self.entry_path(prefix);
        if !path.exists() {
            return None;
        }

        if honor_ttl && self.is_expired(&path) {
            debug!(prefix, "cache entry expired, removing");
            if let Err(e) = fs::remove_file(&path) {
                warn!(error = %e, path = %path.display(), "failed to remove expired cache file");
            }
            return None;
        }

        let document: Value = match fs::read(&path)
            .map_err(anyhow::Error::from)
            .and_then(|bytes| serde_json::from_slice(&bytes).map_err(anyhow::Error::from))
        {
            Ok(document) => document,
            Err(e) => {
                debug!(error = %e, prefix, "unreadable cache file treated as miss");
                return None;
            }
        };

        match subkey {
            Some(sub) => document.get(sub).cloned(),
            None => Some(document),
        }
    }

    fn write_entry(&self, prefix: &str, subkey: Option<&str>, value: Value) -> Result<()> {
        let path = self.entry_path(prefix);
        let document = match subkey {
            Some(sub) => {
                // Sibling subkeys already in the bucket must survive the
                // write; a corrupt bucket is replaced wholesale.
                let mut bucket = match fs::read(&path)
                    .ok()
                    .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok())
                {
                    Some(Value::Object(map)) => map,
                    _ => serde_json::Map::new(),
                };
                bucket.insert(sub.to_string(), value);
                Value::Object(bucket)
            }
            None => value,
        };
        fs::write(&path, serde_json::to_vec(&document)?)?;
        Ok(())
    }
}

#[async_trait]
impl Cache for FileCache {
    async fn get(&self, key: &str) -> Option<Value> {
        let (prefix, subkey) = split_key(key);
        let value = self.read_entry(prefix, subkey, true);
        if value.is_some() {
            debug!(key, "cache HIT");
        } else {
            debug!(key, "cache MISS");
        }
        value
    }

    async fn get_stale(&self, key: &str) -> Option<Value> {
        let (prefix, subkey) = split_key(key);
        self.read_entry(prefix, subkey, false)
    }

    async fn put(&self, key: &str, value: Value) {
        let (prefix, subkey) = split_key(key);
        match self.write_entry(prefix, subkey, value) {
            Ok(()) => debug!(key, "cache PUT"),
            Err(e) => warn!(error = %e, key, "cache put failed"),
        }
    }

    async fn invalidate(&self, key: &str) {
        let (prefix, subkey) = split_key(key);
        let path = self.entry_path(prefix);
        if !path.exists() {
            return;
        }

        let result = match subkey {
            None => fs::remove_file(&path).map_err(anyhow::Error::from),
            Some(sub) => (|| -> Result<()> {
                let bytes = fs::read(&path)?;
                let mut document: Value = serde_json::from_slice(&bytes)?;
                if let Some(bucket) = document.as_object_mut() {
                    bucket.remove(sub);
                }
                fs::write(&path, serde_json::to_vec(&document)?)?;
                Ok(())
            })(),
        };
        if let Err(e) = result {
            warn!(error = %e, key, "cache invalidate failed");
        }
    }

    async fn clear(&self) {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, dir = %self.dir.display(), "cache clear failed");
                return;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Err(e) = fs::remove_file(&path) {
                    warn!(error = %e, path = %path.display(), "failed to remove cache file");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_get_put_plain_key() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path(), None).unwrap();

        assert!(cache.get("fund_nav_004898").await.is_none());

        cache.put("fund_nav_004898", json!({"nav": 1.23})).await;
        assert_eq!(
            cache.get("fund_nav_004898").await,
            Some(json!({"nav": 1.23}))
        );
        assert!(dir.path().join("fund_nav_004898.json").exists());
    }

    #[tokio::test]
    async fn test_ttl_expiry_removes_file() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path(), Some(Duration::from_millis(10))).unwrap();

        cache.put("fund_directory", json!(["a", "b"])).await;
        assert!(cache.get("fund_directory").await.is_some());

        sleep(Duration::from_millis(30)).await;
        assert!(cache.get("fund_directory").await.is_none());
        // Expiry is expire-on-read: the file is gone afterwards.
        assert!(!dir.path().join("fund_directory.json").exists());
    }

    #[tokio::test]
    async fn test_get_stale_ignores_ttl() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path(), Some(Duration::from_millis(10))).unwrap();

        cache.put("fund_nav_004898", json!({"nav": 1.0})).await;
        sleep(Duration::from_millis(30)).await;

        assert_eq!(
            cache.get_stale("fund_nav_004898").await,
            Some(json!({"nav": 1.0}))
        );
        // The stale read must not have deleted the entry.
        assert!(cache.get_stale("fund_nav_004898").await.is_some());
    }

    #[tokio::test]
    async fn test_bucket_preserves_siblings() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path(), None).unwrap();

        cache.put("fund_info__A", json!({"name": "fund a"})).await;
        cache.put("fund_info__B", json!({"name": "fund b"})).await;
        cache.put("fund_info__A", json!({"name": "fund a v2"})).await;

        assert_eq!(
            cache.get("fund_info__B").await,
            Some(json!({"name": "fund b"}))
        );
        assert_eq!(
            cache.get("fund_info__A").await,
            Some(json!({"name": "fund a v2"}))
        );
        // Both subkeys share a single storage location.
        assert!(dir.path().join("fund_info.json").exists());
        assert!(!dir.path().join("fund_info__A.json").exists());
    }

    #[tokio::test]
    async fn test_invalidate_subkey_keeps_siblings() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path(), None).unwrap();

        cache.put("fund_info__A", json!(1)).await;
        cache.put("fund_info__B", json!(2)).await;

        cache.invalidate("fund_info__A").await;
        assert!(cache.get("fund_info__A").await.is_none());
        assert_eq!(cache.get("fund_info__B").await, Some(json!(2)));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_miss() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path(), None).unwrap();

        fs::write(dir.path().join("fund_nav_004898.json"), b"not json {{").unwrap();
        assert!(cache.get("fund_nav_004898").await.is_none());
        assert!(cache.get_stale("fund_nav_004898").await.is_none());

        // A refetch overwrites the corrupt entry.
        cache.put("fund_nav_004898", json!({"ok": true})).await;
        assert_eq!(
            cache.get("fund_nav_004898").await,
            Some(json!({"ok": true}))
        );
    }

    #[tokio::test]
    async fn test_missing_subkey_is_a_miss() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path(), None).unwrap();

        cache.put("fund_info__A", json!(1)).await;
        assert!(cache.get("fund_info__B").await.is_none());
    }

    #[tokio::test]
    async fn test_clear_removes_all_entries() {
        let dir = tempdir().unwrap();
        let cache = FileCache::new(dir.path(), None).unwrap();

        cache.put("fund_nav_004898", json!(1)).await;
        cache.put("fund_info__A", json!(2)).await;
        cache.clear().await;

        assert!(cache.get("fund_nav_004898").await.is_none());
        assert!(cache.get("fund_info__A").await.is_none());
    }
}
