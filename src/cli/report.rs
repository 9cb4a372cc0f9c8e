use crate::cli::ui;
use crate::core::cache::Cache;
use crate::core::config::{
    AppConfig, DEFAULT_DIRECTORY_BASE_URL, DEFAULT_EASTMONEY_BASE_URL,
};
use crate::core::index::FundCacheIndex;
use crate::core::report::{FundFacade, FundReport};
use crate::core::repository::NavRepository;
use crate::core::returns::LookbackWindow;
use crate::providers::{EastmoneyDirectoryProvider, EastmoneyNavProvider};
use crate::store::FileCache;
use anyhow::Result;
use comfy_table::Cell;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{error, info};

/// Builds and prints a NAV performance report for each fund code.
pub async fn run(config: &AppConfig, fund_codes: &[String], amount: Option<f64>) -> Result<()> {
    info!("Building fund reports...");

    let amount = amount.unwrap_or(config.investment_amount);
    let cache_dir = config.cache_dir()?;
    let cache: Arc<dyn Cache> = Arc::new(FileCache::new(&cache_dir, Some(config.cache_ttl()))?);
    let index = FundCacheIndex::new(&cache_dir, config.max_fund_cache, Arc::clone(&cache));

    let eastmoney_base_url = config
        .providers
        .eastmoney
        .as_ref()
        .map_or(DEFAULT_EASTMONEY_BASE_URL, |p| p.base_url.as_str());
    let directory_base_url = config
        .providers
        .directory
        .as_ref()
        .map_or(DEFAULT_DIRECTORY_BASE_URL, |p| p.base_url.as_str());

    let repository = NavRepository::new(
        cache,
        index,
        Arc::new(EastmoneyNavProvider::new(eastmoney_base_url)),
        Arc::new(EastmoneyDirectoryProvider::new(directory_base_url)),
        &config.money_market_marker,
    );
    let facade = FundFacade::new(repository);

    let pb = ui::new_progress_bar(fund_codes.len() as u64);
    let facade_ref = &facade;
    let futures = fund_codes.iter().map(|code| {
        let pb = pb.clone();
        async move {
            let result = facade_ref.build_report(code, amount).await;
            pb.inc(1);
            (code.clone(), result)
        }
    });
    let results = join_all(futures).await;
    pb.finish_and_clear();

    for (code, result) in results {
        match result {
            Ok(report) => println!("{}", render_report(&report)),
            Err(e) => {
                error!(fund_code = %code, error = %e, "report failed");
                println!("{code}: {}", ui::style_text(&e.to_string(), ui::StyleType::Error));
            }
        }
    }

    Ok(())
}

fn render_report(report: &FundReport) -> String {
    let mut output = format!(
        "{} ({}) [{}]\n",
        ui::style_text(&report.fund_name, ui::StyleType::Title),
        report.fund_code,
        report.fund_type,
    );
    output.push_str(&format!(
        "Latest NAV: {} ({})    Investment: {:.0}\n",
        ui::style_text(&format!("{:.4}", report.latest_value), ui::StyleType::Label),
        report.latest_date,
        report.investment_amount,
    ));
    output.push_str(&format!(
        "Positive weeks: {}    Avg weekly P&L ({}): {:.2}\n\n",
        report.weekly_stats.positive_weeks_count,
        report.weekly_stats.period_text,
        report.weekly_stats.avg_weekly_return,
    ));

    output.push_str(&weekly_table(report));
    output.push_str("\n\n");
    output.push_str(&returns_table(report));
    output.push_str("\n\n");
    output.push_str(&nav_points_table(report));
    output.push('\n');
    output
}

fn weekly_table(report: &FundReport) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Week"),
        ui::header_cell("P&L"),
    ]);

    for entry in &report.weekly_data {
        let range = format!(
            "{} - {}",
            entry.week.week_start.format("%m.%d"),
            entry.week.week_end.format("%m.%d")
        );
        table.add_row(vec![
            Cell::new(entry.seq),
            Cell::new(range),
            ui::change_cell(
                entry.week.pnl_amount,
                format!("{:.2}", entry.week.pnl_amount),
            ),
        ]);
    }

    format!(
        "Recent weekly P&L\n{}",
        if report.weekly_data.is_empty() {
            ui::style_text("No weekly data", ui::StyleType::Subtle)
        } else {
            table.to_string()
        }
    )
}

fn returns_table(report: &FundReport) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Period"),
        ui::header_cell("Annualized (%)"),
        ui::header_cell("Change (%)"),
    ]);

    for window in LookbackWindow::ALL {
        let annualized = report
            .annualized_returns
            .windows
            .get(&window)
            .copied()
            .unwrap_or(0.0);
        let historical = report
            .historical_performance
            .get(&window)
            .copied()
            .flatten();
        table.add_row(vec![
            Cell::new(window.to_string()),
            ui::change_cell(annualized, format!("{annualized:.2}%")),
            match historical {
                Some(pct) => ui::change_cell(pct, format!("{pct:.2}%")),
                None => ui::na_cell(),
            },
        ]);
    }
    table.add_row(vec![
        Cell::new("since inception"),
        ui::change_cell(
            report.annualized_returns.since_inception,
            format!("{:.2}%", report.annualized_returns.since_inception),
        ),
        ui::na_cell(),
    ]);

    format!("Returns\n{table}")
}

fn nav_points_table(report: &FundReport) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("NAV"),
        ui::header_cell("Growth (%)"),
    ]);

    for point in &report.net_worth_points {
        table.add_row(vec![
            Cell::new(point.date),
            Cell::new(format!("{:.4}", point.unit_value)),
            ui::change_cell(
                point.daily_growth_rate,
                format!("{:.2}%", point.daily_growth_rate),
            ),
        ]);
    }

    format!("Recent NAV\n{table}")
}
