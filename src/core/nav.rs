//! NAV series types and the remote fetch abstractions

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::core::error::FetchError;

/// A single NAV observation for a fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavPoint {
    pub date: NaiveDate,
    /// Unit NAV (per-10k-share yield for money market funds). `f64::NAN`
    /// when the upstream field was missing or unparseable, never zero.
    pub unit_value: f64,
    /// Cumulative NAV (7-day annualized yield for money market funds).
    /// Same NAN convention as `unit_value`.
    pub cumulative_value: f64,
    /// Daily growth rate in percent, as reported by the upstream.
    pub daily_growth_rate: Option<f64>,
}

/// NAV observations for one fund, strictly ascending by date with unique
/// dates. The repository guarantees the ordering; consumers must not
/// re-sort.
pub type NavSeries = Vec<NavPoint>;

/// Basic fund identity resolved from the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundInfo {
    pub code: String,
    pub name: String,
    pub fund_type: String,
}

impl FundInfo {
    /// Whether the fund type label carries the money market marker. The
    /// marker comes from configuration; upstream labels change.
    pub fn is_money_market(&self, marker: &str) -> bool {
        !marker.is_empty() && self.fund_type.contains(marker)
    }
}

/// One row of the public fund directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub code: String,
    pub name: String,
    pub fund_type: String,
    pub subscription_status: String,
    pub redemption_status: String,
}

/// One raw row from the NAV endpoint, fields kept as the upstream sends
/// them. Numeric parsing happens in the repository so the sentinel rules
/// live in one place.
#[derive(Debug, Clone, PartialEq)]
pub struct RawNavRecord {
    pub date: String,
    pub unit_value: String,
    pub cumulative_value: String,
    pub growth_rate: Option<String>,
}

#[async_trait]
pub trait NavFetcher: Send + Sync {
    async fn fetch_nav(&self, fund_code: &str) -> Result<Vec<RawNavRecord>, FetchError>;
}

#[async_trait]
pub trait FundDirectory: Send + Sync {
    async fn fetch_directory(&self) -> Result<Vec<DirectoryEntry>, FetchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_market_detection() {
        let info = FundInfo {
            code: "000198".to_string(),
            name: "天弘余额宝".to_string(),
            fund_type: "货币型-普通货币".to_string(),
        };
        assert!(info.is_money_market("货币型"));
        assert!(!info.is_money_market("债券型"));
        // An empty marker must never match everything.
        assert!(!info.is_money_market(""));
    }
}
