//! Pure return and performance calculations over a NAV series.
//!
//! Every function here is total over a well-formed series: empty input,
//! a single point, sparse calendars and NAN sentinels all produce a
//! result, never a panic. Input must already be date-ascending (the
//! repository guarantees it); nothing here re-sorts.

use crate::core::nav::{NavPoint, NavSeries};
use chrono::{Datelike, Duration, Months, NaiveDate};
use std::collections::HashMap;
use std::fmt::Display;

/// Number of week groups included in the recent-weeks slice.
pub const RECENT_WEEKS_DEFAULT: usize = 12;

/// Number of NAV points included in the recent-points slice.
pub const RECENT_NAV_POINTS_DEFAULT: usize = 30;

/// Fixed lookback windows for annualized and historical performance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LookbackWindow {
    OneWeek,
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
}

impl LookbackWindow {
    pub const ALL: [LookbackWindow; 5] = [
        LookbackWindow::OneWeek,
        LookbackWindow::OneMonth,
        LookbackWindow::ThreeMonths,
        LookbackWindow::SixMonths,
        LookbackWindow::OneYear,
    ];

    /// Window start relative to `latest`. One week is a fixed seven days;
    /// month and year windows land on the same day N months earlier,
    /// clamped to the month end when that day does not exist.
    pub fn start_from(&self, latest: NaiveDate) -> NaiveDate {
        let months = match self {
            LookbackWindow::OneWeek => return latest - Duration::days(7),
            LookbackWindow::OneMonth => 1,
            LookbackWindow::ThreeMonths => 3,
            LookbackWindow::SixMonths => 6,
            LookbackWindow::OneYear => 12,
        };
        latest
            .checked_sub_months(Months::new(months))
            .unwrap_or(NaiveDate::MIN)
    }
}

impl Display for LookbackWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                LookbackWindow::OneWeek => "1week",
                LookbackWindow::OneMonth => "1month",
                LookbackWindow::ThreeMonths => "3months",
                LookbackWindow::SixMonths => "6months",
                LookbackWindow::OneYear => "1year",
            }
        )
    }
}

/// P&L of one ISO week of NAV observations.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyReturn {
    pub iso_year: i32,
    pub iso_week: u32,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub pnl_amount: f64,
}

/// Summary statistics over the full weekly history.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyStats {
    pub positive_weeks_count: usize,
    pub avg_weekly_return: f64,
    /// Label of the averaging period: `"1年"` once a full year of weeks
    /// exists, `"<N>周"` before that, `"N/A"` for an empty history.
    pub period_text: String,
}

/// One week of the recent-weeks slice, numbered for display.
#[derive(Debug, Clone, PartialEq)]
pub struct RecentWeek {
    pub seq: usize,
    pub week: WeeklyReturn,
}

/// Annualized percentage returns per lookback window plus the
/// since-inception figure.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnualizedReturns {
    pub windows: HashMap<LookbackWindow, f64>,
    pub since_inception: f64,
}

/// A NAV point prepared for display: values rounded, absent growth rate
/// shown as zero.
#[derive(Debug, Clone, PartialEq)]
pub struct NavPointDisplay {
    pub date: NaiveDate,
    pub unit_value: f64,
    pub daily_growth_rate: f64,
}

/// Day-over-day relative returns, one per point.
///
/// `r[0]` is zero. A previous value of zero or NAN makes the day's return
/// NAN; the sentinel propagates instead of dividing by zero.
pub fn daily_returns(series: &NavSeries) -> Vec<f64> {
    let mut returns = Vec::with_capacity(series.len());
    for (i, point) in series.iter().enumerate() {
        if i == 0 {
            returns.push(0.0);
            continue;
        }
        let prev = series[i - 1].unit_value;
        if prev.is_finite() && prev != 0.0 {
            returns.push((point.unit_value - prev) / prev);
        } else {
            returns.push(f64::NAN);
        }
    }
    returns
}

/// Groups daily P&L by ISO (year, week).
///
/// Per group: `week_start`/`week_end` span the observed dates and
/// `pnl_amount` sums `daily_return × investment_amount` over the group's
/// days, skipping NAN days. Groups come back ascending by `week_start`.
pub fn weekly_aggregate(
    series: &NavSeries,
    investment_amount: f64,
) -> (Vec<WeeklyReturn>, WeeklyStats) {
    let daily = daily_returns(series);

    let mut groups: HashMap<(i32, u32), WeeklyReturn> = HashMap::new();
    for (point, daily_return) in series.iter().zip(&daily) {
        let iso = point.date.iso_week();
        let group = groups
            .entry((iso.year(), iso.week()))
            .or_insert_with(|| WeeklyReturn {
                iso_year: iso.year(),
                iso_week: iso.week(),
                week_start: point.date,
                week_end: point.date,
                pnl_amount: 0.0,
            });
        group.week_start = group.week_start.min(point.date);
        group.week_end = group.week_end.max(point.date);
        if daily_return.is_finite() {
            group.pnl_amount += daily_return * investment_amount;
        }
    }

    let mut weekly: Vec<WeeklyReturn> = groups.into_values().collect();
    weekly.sort_by_key(|week| week.week_start);

    let stats = weekly_stats(&weekly);
    (weekly, stats)
}

fn weekly_stats(weekly: &[WeeklyReturn]) -> WeeklyStats {
    let Some(last) = weekly.last() else {
        return WeeklyStats {
            positive_weeks_count: 0,
            avg_weekly_return: 0.0,
            period_text: "N/A".to_string(),
        };
    };

    let positive_weeks_count = weekly.iter().filter(|week| week.pnl_amount > 0.0).count();

    // With a full year of history the average covers the trailing 365
    // calendar days; before that, everything we have.
    let (avg_weekly_return, period_text) = if weekly.len() >= 52 {
        let window_start = last.week_end - Duration::days(365);
        let recent: Vec<f64> = weekly
            .iter()
            .filter(|week| week.week_start >= window_start)
            .map(|week| week.pnl_amount)
            .collect();
        (mean(&recent), "1年".to_string())
    } else {
        let all: Vec<f64> = weekly.iter().map(|week| week.pnl_amount).collect();
        (mean(&all), format!("{}周", weekly.len()))
    };

    WeeklyStats {
        positive_weeks_count,
        avg_weekly_return,
        period_text,
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Last `count` week groups, ascending by `week_start`, each numbered
/// 1-based within the slice.
pub fn recent_weeks(weekly: &[WeeklyReturn], count: usize) -> Vec<RecentWeek> {
    let start = weekly.len().saturating_sub(count);
    weekly[start..]
        .iter()
        .enumerate()
        .map(|(i, week)| RecentWeek {
            seq: i + 1,
            week: week.clone(),
        })
        .collect()
}

/// Annualized percentage returns over the fixed lookback windows and
/// since inception.
///
/// A window without a point on or before its start, a non-positive day
/// span, or an unusable start value yields `0.0`.
pub fn annualized_returns(series: &NavSeries) -> AnnualizedReturns {
    let mut windows: HashMap<LookbackWindow, f64> =
        LookbackWindow::ALL.iter().map(|w| (*w, 0.0)).collect();

    let Some(latest) = series.last() else {
        return AnnualizedReturns {
            windows,
            since_inception: 0.0,
        };
    };

    for window in LookbackWindow::ALL {
        let target = window.start_from(latest.date);
        if let Some(start) = series.iter().rev().find(|point| point.date <= target) {
            windows.insert(window, annualized_pct(start, latest));
        }
    }

    // The repository guarantees ascending order, so the first row is the
    // inception observation.
    let since_inception = annualized_pct(&series[0], latest);

    AnnualizedReturns {
        windows,
        since_inception,
    }
}

/// Linear annualization over the actual elapsed days between two points,
/// in percent.
fn annualized_pct(start: &NavPoint, latest: &NavPoint) -> f64 {
    let days = (latest.date - start.date).num_days();
    if days <= 0
        || !start.unit_value.is_finite()
        || start.unit_value == 0.0
        || !latest.unit_value.is_finite()
    {
        return 0.0;
    }
    (latest.unit_value - start.unit_value) / start.unit_value / days as f64 * 365.0 * 100.0
}

/// Simple (non-annualized) percentage change per lookback window, rounded
/// to two decimals. A window with no usable prior point reports `None`:
/// "cannot compute" stays distinct from "computed zero change".
pub fn historical_performance(series: &NavSeries) -> HashMap<LookbackWindow, Option<f64>> {
    let mut results: HashMap<LookbackWindow, Option<f64>> =
        LookbackWindow::ALL.iter().map(|w| (*w, None)).collect();

    let Some(latest) = series.last() else {
        return results;
    };

    for window in LookbackWindow::ALL {
        let target = window.start_from(latest.date);
        let Some(start) = series.iter().rev().find(|point| point.date <= target) else {
            continue;
        };
        if !start.unit_value.is_finite()
            || start.unit_value == 0.0
            || !latest.unit_value.is_finite()
        {
            continue;
        }
        let pct = (latest.unit_value - start.unit_value) / start.unit_value * 100.0;
        results.insert(window, Some(round_to(pct, 2)));
    }
    results
}

/// Last `count` points prepared for display: unit value rounded to four
/// decimals, growth rate to two. An absent growth rate displays as zero;
/// upstream math never sees that substitution.
pub fn recent_nav_points(series: &NavSeries, count: usize) -> Vec<NavPointDisplay> {
    let start = series.len().saturating_sub(count);
    series[start..]
        .iter()
        .map(|point| NavPointDisplay {
            date: point.date,
            unit_value: round_to(point.unit_value, 4),
            daily_growth_rate: round_to(point.daily_growth_rate.unwrap_or(0.0), 2),
        })
        .collect()
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
