//! Cached access to fund NAV series and fund identity.

use crate::core::cache::{Cache, FUND_DIRECTORY_KEY, fund_info_key, nav_series_key};
use crate::core::error::{FetchError, ReportError};
use crate::core::index::FundCacheIndex;
use crate::core::nav::{
    DirectoryEntry, FundDirectory, FundInfo, NavFetcher, NavPoint, NavSeries, RawNavRecord,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Cache payload: the value plus the local calendar date it was written.
/// Same-day reuse keys off this date, not the file TTL.
#[derive(Debug, Serialize, Deserialize)]
struct DatedEntry<T> {
    date: NaiveDate,
    data: T,
}

/// Which upstream fields feed the NAV slots of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NavFieldMapping {
    /// Unit NAV and cumulative NAV.
    Standard,
    /// Money market feed: per-10k-share yield and 7-day annualized yield
    /// occupy the same slots and there is no growth-rate column.
    MoneyMarket,
}

/// Produces canonical, date-ascending NAV series per fund, backed by the
/// remote fetch collaborators and the disk cache.
pub struct NavRepository {
    cache: Arc<dyn Cache>,
    index: FundCacheIndex,
    nav_fetcher: Arc<dyn NavFetcher>,
    directory: Arc<dyn FundDirectory>,
    money_market_marker: String,
}

impl NavRepository {
    pub fn new(
        cache: Arc<dyn Cache>,
        index: FundCacheIndex,
        nav_fetcher: Arc<dyn NavFetcher>,
        directory: Arc<dyn FundDirectory>,
        money_market_marker: &str,
    ) -> Self {
        Self {
            cache,
            index,
            nav_fetcher,
            directory,
            money_market_marker: money_market_marker.to_string(),
        }
    }

    /// Returns the fund's NAV series, reusing today's cached copy when
    /// present and falling back to a stale copy when the fetch fails.
    pub async fn get_fund_nav_series(&self, fund_code: &str) -> Result<NavSeries, ReportError> {
        let key = nav_series_key(fund_code);
        let today = Local::now().date_naive();

        let cached: Option<DatedEntry<NavSeries>> = self
            .cache
            .get_stale(&key)
            .await
            .and_then(|value| serde_json::from_value(value).ok());

        if let Some(entry) = &cached
            && entry.date == today
        {
            debug!(fund_code, "using same-day cached NAV series");
            self.index.touch(fund_code).await;
            return Ok(entry.data.clone());
        }

        let info = self.get_fund_info(fund_code).await?;
        let mapping = if info.is_money_market(&self.money_market_marker) {
            NavFieldMapping::MoneyMarket
        } else {
            NavFieldMapping::Standard
        };

        match self.nav_fetcher.fetch_nav(fund_code).await {
            Ok(records) => {
                let series = parse_nav_series(fund_code, records, mapping);
                // Touch before put: capacity eviction must only ever hit
                // other funds' entries, never the one being written.
                self.index.touch(fund_code).await;
                self.put_dated(&key, &series, today).await;
                Ok(series)
            }
            Err(e) => match cached {
                Some(entry) => {
                    warn!(fund_code, error = %e, "NAV fetch failed, serving stale cache");
                    self.index.touch(fund_code).await;
                    Ok(entry.data)
                }
                None => {
                    warn!(fund_code, error = %e, "NAV fetch failed with no cached fallback");
                    Err(ReportError::DataUnavailable {
                        code: fund_code.to_string(),
                    })
                }
            },
        }
    }

    /// Resolves a fund's name and type from the (cached) directory.
    pub async fn get_fund_info(&self, fund_code: &str) -> Result<FundInfo, ReportError> {
        let key = fund_info_key(fund_code);
        if let Some(value) = self.cache.get(&key).await
            && let Ok(info) = serde_json::from_value::<FundInfo>(value)
        {
            return Ok(info);
        }

        let directory = self.get_directory().await.map_err(|e| {
            warn!(fund_code, error = %e, "fund directory unavailable");
            ReportError::DataUnavailable {
                code: fund_code.to_string(),
            }
        })?;

        let entry = directory
            .iter()
            .find(|entry| entry.code == fund_code)
            .ok_or_else(|| {
                warn!(fund_code, "fund code not present in directory");
                ReportError::DataUnavailable {
                    code: fund_code.to_string(),
                }
            })?;

        let info = FundInfo {
            code: entry.code.clone(),
            name: entry.name.clone(),
            fund_type: entry.fund_type.clone(),
        };
        match serde_json::to_value(&info) {
            Ok(value) => self.cache.put(&key, value).await,
            Err(e) => warn!(fund_code, error = %e, "failed to serialize fund info"),
        }
        Ok(info)
    }

    async fn get_directory(&self) -> Result<Vec<DirectoryEntry>, FetchError> {
        let today = Local::now().date_naive();

        let cached: Option<DatedEntry<Vec<DirectoryEntry>>> = self
            .cache
            .get_stale(FUND_DIRECTORY_KEY)
            .await
            .and_then(|value| serde_json::from_value(value).ok());

        if let Some(entry) = &cached
            && entry.date == today
        {
            debug!("using same-day cached fund directory");
            return Ok(entry.data.clone());
        }

        match self.directory.fetch_directory().await {
            Ok(entries) => {
                self.put_dated(FUND_DIRECTORY_KEY, &entries, today).await;
                Ok(entries)
            }
            Err(e) => match cached {
                Some(entry) => {
                    warn!(error = %e, "directory fetch failed, serving stale cache");
                    Ok(entry.data)
                }
                None => Err(e),
            },
        }
    }

    async fn put_dated<T: Serialize>(&self, key: &str, data: &T, date: NaiveDate) {
        match serde_json::to_value(DatedEntry { date, data }) {
            Ok(value) => self.cache.put(key, value).await,
            Err(e) => warn!(key, error = %e, "failed to serialize cache entry"),
        }
    }
}

/// Builds a canonical series out of raw records: numeric fields parse to
/// NAN on failure (never zero), rows without a parseable date are
/// dropped, and the result is sorted ascending with duplicate dates
/// collapsed.
fn parse_nav_series(
    fund_code: &str,
    records: Vec<RawNavRecord>,
    mapping: NavFieldMapping,
) -> NavSeries {
    let mut series: NavSeries = records
        .into_iter()
        .filter_map(|record| {
            let Ok(date) = NaiveDate::parse_from_str(&record.date, "%Y-%m-%d") else {
                warn!(fund_code, date = %record.date, "dropping NAV row with unparseable date");
                return None;
            };
            let daily_growth_rate = match mapping {
                NavFieldMapping::MoneyMarket => None,
                NavFieldMapping::Standard => record
                    .growth_rate
                    .as_deref()
                    .and_then(|raw| raw.trim().parse().ok()),
            };
            Some(NavPoint {
                date,
                unit_value: parse_decimal_field(&record.unit_value),
                cumulative_value: parse_decimal_field(&record.cumulative_value),
                daily_growth_rate,
            })
        })
        .collect();

    series.sort_by_key(|point| point.date);
    series.dedup_by_key(|point| point.date);
    series
}

fn parse_decimal_field(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}
