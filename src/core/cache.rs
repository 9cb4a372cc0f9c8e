//! Cache capability injected into the repository layer.

use async_trait::async_trait;
use serde_json::Value;

/// Delimiter splitting a bucketed key into a storage prefix and a subkey.
pub const BUCKET_DELIMITER: &str = "__";

/// Plain cache key holding the full fund directory.
pub const FUND_DIRECTORY_KEY: &str = "fund_directory";

/// Splits a key into its storage prefix and optional bucket subkey.
pub fn split_key(key: &str) -> (&str, Option<&str>) {
    match key.split_once(BUCKET_DELIMITER) {
        Some((prefix, subkey)) => (prefix, Some(subkey)),
        None => (key, None),
    }
}

/// Cache key for a fund's NAV series. Plain key, one storage location per
/// fund, so index eviction removes exactly that fund's data.
pub fn nav_series_key(fund_code: &str) -> String {
    format!("fund_nav_{fund_code}")
}

/// Bucketed cache key for a fund's resolved directory info. All funds
/// share the `fund_info` storage location.
pub fn fund_info_key(fund_code: &str) -> String {
    format!("fund_info{BUCKET_DELIMITER}{fund_code}")
}

/// A key-value cache with TTL expiry and delimiter-based bucketing.
///
/// Keys containing [`BUCKET_DELIMITER`] share one storage location per
/// prefix; writing one subkey must preserve its siblings. Values are
/// opaque JSON documents; typed callers round-trip through `serde_json`.
///
/// Implementations do no record locking. Concurrent writers to the same
/// bucket race and the last writer wins; a multi-process deployment needs
/// an external mutual-exclusion lock around the read-modify-write.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Fresh read. An entry older than the store's TTL is removed and
    /// reported as missing. A corrupt entry also reads as missing so the
    /// caller refetches.
    async fn get(&self, key: &str) -> Option<Value>;

    /// Read ignoring TTL, without deleting anything. Backs the
    /// stale-but-available fallback when a refresh fails.
    async fn get_stale(&self, key: &str) -> Option<Value>;

    async fn put(&self, key: &str, value: Value);

    async fn invalidate(&self, key: &str);

    /// Removes every storage location managed by this cache.
    async fn clear(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_key() {
        assert_eq!(split_key("fund_directory"), ("fund_directory", None));
        assert_eq!(split_key("fund_info__004898"), ("fund_info", Some("004898")));
        // Only the first delimiter splits; the rest belongs to the subkey.
        assert_eq!(split_key("a__b__c"), ("a", Some("b__c")));
    }

    #[test]
    fn test_key_builders() {
        assert_eq!(nav_series_key("004898"), "fund_nav_004898");
        assert_eq!(split_key(&fund_info_key("004898")), ("fund_info", Some("004898")));
        assert_eq!(split_key(&nav_series_key("004898")).1, None);
    }
}
