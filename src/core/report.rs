//! Report assembly: one complete `FundReport` per fund, or one error.

use crate::core::error::ReportError;
use crate::core::repository::NavRepository;
use crate::core::returns::{
    self, AnnualizedReturns, LookbackWindow, NavPointDisplay, RecentWeek, WeeklyStats,
};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Everything the display layer needs for one fund, assembled fresh per
/// request.
#[derive(Debug, Clone)]
pub struct FundReport {
    pub fund_code: String,
    pub fund_name: String,
    pub fund_type: String,
    pub latest_value: f64,
    pub latest_date: NaiveDate,
    pub investment_amount: f64,
    pub weekly_stats: WeeklyStats,
    pub weekly_data: Vec<RecentWeek>,
    pub annualized_returns: AnnualizedReturns,
    pub historical_performance: HashMap<LookbackWindow, Option<f64>>,
    pub net_worth_points: Vec<NavPointDisplay>,
}

/// The single entry point for the report use case.
pub struct FundFacade {
    repository: NavRepository,
}

impl FundFacade {
    pub fn new(repository: NavRepository) -> Self {
        Self { repository }
    }

    pub async fn build_report(
        &self,
        fund_code: &str,
        investment_amount: f64,
    ) -> Result<FundReport, ReportError> {
        let info = self.repository.get_fund_info(fund_code).await?;
        let series = self.repository.get_fund_nav_series(fund_code).await?;

        let latest = series.last().ok_or_else(|| ReportError::EmptySeries {
            code: fund_code.to_string(),
        })?;

        let (weekly, weekly_stats) = returns::weekly_aggregate(&series, investment_amount);
        let weekly_data = returns::recent_weeks(&weekly, returns::RECENT_WEEKS_DEFAULT);
        let annualized = returns::annualized_returns(&series);
        let historical = returns::historical_performance(&series);
        let net_worth_points =
            returns::recent_nav_points(&series, returns::RECENT_NAV_POINTS_DEFAULT);

        Ok(FundReport {
            fund_code: fund_code.to_string(),
            fund_name: info.name,
            fund_type: info.fund_type,
            latest_value: latest.unit_value,
            latest_date: latest.date,
            investment_amount,
            weekly_stats,
            weekly_data,
            annualized_returns: annualized,
            historical_performance: historical,
            net_worth_points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cache::Cache;
    use crate::core::error::FetchError;
    use crate::core::index::FundCacheIndex;
    use crate::core::nav::{DirectoryEntry, FundDirectory, NavFetcher, RawNavRecord};
    use crate::store::MemoryCache;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tempfile::tempdir;

    struct FixedNavFetcher {
        records: Vec<RawNavRecord>,
    }

    #[async_trait]
    impl NavFetcher for FixedNavFetcher {
        async fn fetch_nav(&self, _fund_code: &str) -> Result<Vec<RawNavRecord>, FetchError> {
            Ok(self.records.clone())
        }
    }

    struct FixedDirectory {
        entries: Vec<DirectoryEntry>,
    }

    #[async_trait]
    impl FundDirectory for FixedDirectory {
        async fn fetch_directory(&self) -> Result<Vec<DirectoryEntry>, FetchError> {
            Ok(self.entries.clone())
        }
    }

    fn facade(records: Vec<RawNavRecord>, index_dir: &std::path::Path) -> FundFacade {
        let cache: Arc<dyn Cache> = Arc::new(MemoryCache::default());
        let index = FundCacheIndex::new(index_dir, 100, Arc::clone(&cache));
        let repository = NavRepository::new(
            cache,
            index,
            Arc::new(FixedNavFetcher { records }),
            Arc::new(FixedDirectory {
                entries: vec![DirectoryEntry {
                    code: "004898".to_string(),
                    name: "华夏成长".to_string(),
                    fund_type: "混合型".to_string(),
                    subscription_status: "开放申购".to_string(),
                    redemption_status: "开放赎回".to_string(),
                }],
            }),
            "货币型",
        );
        FundFacade::new(repository)
    }

    fn raw_record(date: &str, value: &str) -> RawNavRecord {
        RawNavRecord {
            date: date.to_string(),
            unit_value: value.to_string(),
            cumulative_value: value.to_string(),
            growth_rate: None,
        }
    }

    #[tokio::test]
    async fn test_empty_series_is_an_error() {
        let dir = tempdir().unwrap();
        let facade = facade(Vec::new(), dir.path());

        let err = facade.build_report("004898", 100_000.0).await.unwrap_err();
        assert!(matches!(err, ReportError::EmptySeries { code } if code == "004898"));
    }

    #[tokio::test]
    async fn test_report_assembly() {
        let dir = tempdir().unwrap();
        let facade = facade(
            vec![
                raw_record("2024-01-01", "1.0"),
                raw_record("2024-01-08", "1.1"),
            ],
            dir.path(),
        );

        let report = facade.build_report("004898", 100_000.0).await.unwrap();

        assert_eq!(report.fund_code, "004898");
        assert_eq!(report.fund_name, "华夏成长");
        assert_eq!(report.fund_type, "混合型");
        assert_eq!(report.latest_value, 1.1);
        assert_eq!(
            report.latest_date,
            NaiveDate::from_ymd_opt(2024, 1, 8).unwrap()
        );
        assert_eq!(report.investment_amount, 100_000.0);

        assert_eq!(report.weekly_data.len(), 2);
        assert!((report.weekly_data[1].week.pnl_amount - 10_000.0).abs() < 1e-6);
        assert_eq!(report.weekly_stats.positive_weeks_count, 1);
        assert_eq!(report.net_worth_points.len(), 2);
        assert_eq!(
            report.historical_performance[&LookbackWindow::OneWeek],
            Some(10.0)
        );
    }
}
