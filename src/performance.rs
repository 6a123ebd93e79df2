//! Sales performance over invoiced orders of one crate type.
//!
//! Both reports share the same front half: join orders to invoices, keep the
//! invoiced rows of the configured crate type, and split each order's gross
//! value evenly across its salesowners. The monthly ranking then sums per
//! `(salesowner, month)`, adds a trailing window over the months each owner
//! actually sold in, and keeps the best performers per month. The trailing
//! twelve-month report sums per salesowner only.

use crate::config::ReportConfig;
use crate::ledger::{apply_duplicate_policy, merge_orders, InvoiceIndex, MergedOrder};
use crate::schema::{CrateType, Invoice, Order, SalesPerformanceEntry, TopPerformerEntry};
use crate::utils::{lookback_start, round2, year_month_label};
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::BTreeMap;

/// Stand-in owner for orders that list no salesowner.
pub const UNKNOWN_SALESOWNER: &str = "Unknown";

/// One salesowner's even share of one order.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnerShare {
    pub order_id: String,
    pub salesowner: String,
    pub date: Option<NaiveDate>,
    pub gross_per_salesowner: f64,
}

/// Monthly total for one salesowner, with the trailing window sum once
/// [`apply_rolling_window`] has run.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyPerformance {
    pub salesowner: String,
    pub year_month: String,
    pub gross_per_salesowner: f64,
    pub gross_rolling: f64,
}

/// Keeps invoiced rows of the given crate type.
pub fn invoiced_of_type<'a>(merged: &[MergedOrder<'a>], crate_type: CrateType) -> Vec<MergedOrder<'a>> {
    let kept: Vec<MergedOrder<'a>> = merged
        .iter()
        .filter(|row| row.is_invoiced() && row.order.crate_kind() == Some(crate_type))
        .copied()
        .collect();

    info!(
        "Kept {} of {} orders as invoiced {} orders",
        kept.len(),
        merged.len(),
        crate_type
    );
    kept
}

/// One row per salesowner per order, each carrying an equal share of the
/// order's gross value rounded to cents. An order without salesowners is
/// credited to [`UNKNOWN_SALESOWNER`].
pub fn explode_salesowners(rows: &[MergedOrder]) -> Vec<OwnerShare> {
    let unknown = [UNKNOWN_SALESOWNER.to_string()];

    rows.iter()
        .flat_map(|row| {
            let owners: &[String] = if row.order.salesowners.is_empty() {
                &unknown
            } else {
                &row.order.salesowners
            };
            let share = round2(row.gross_value() / owners.len() as f64);

            owners
                .iter()
                .map(|owner| OwnerShare {
                    order_id: row.order.order_id.clone(),
                    salesowner: owner.clone(),
                    date: row.order.date,
                    gross_per_salesowner: share,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Sums shares per `(salesowner, month)`. The result is ordered by owner and
/// then month. Shares without a date cannot be placed in a month and are
/// dropped with a warning.
pub fn monthly_totals(shares: &[OwnerShare]) -> Vec<MonthlyPerformance> {
    let mut totals: BTreeMap<(&str, String), f64> = BTreeMap::new();
    let mut undated = 0usize;

    for share in shares {
        let Some(date) = share.date else {
            undated += 1;
            continue;
        };
        *totals
            .entry((share.salesowner.as_str(), year_month_label(date)))
            .or_insert(0.0) += share.gross_per_salesowner;
    }

    if undated > 0 {
        warn!(
            "{} salesowner shares have no order date and are excluded from the monthly totals",
            undated
        );
    }

    totals
        .into_iter()
        .map(|((salesowner, year_month), total)| MonthlyPerformance {
            salesowner: salesowner.to_string(),
            year_month,
            gross_per_salesowner: round2(total),
            gross_rolling: 0.0,
        })
        .collect()
}

/// Fills `gross_rolling` with the sum of the current month and up to
/// `window - 1` preceding months in which the same owner has a total. Gaps in
/// the calendar are not counted. Expects the owner/month order produced by
/// [`monthly_totals`].
pub fn apply_rolling_window(monthly: &mut [MonthlyPerformance], window: usize) {
    let window = window.max(1);
    let mut start = 0;

    while start < monthly.len() {
        let owner_len = monthly[start..]
            .iter()
            .take_while(|m| m.salesowner == monthly[start].salesowner)
            .count();
        let owner_rows = &mut monthly[start..start + owner_len];

        for i in 0..owner_rows.len() {
            let from = (i + 1).saturating_sub(window);
            let sum: f64 = owner_rows[from..=i].iter().map(|m| m.gross_per_salesowner).sum();
            owner_rows[i].gross_rolling = round2(sum);
        }

        start += owner_len;
    }
}

/// Orders by month, then by rolling total (highest first), keeps the first
/// `top_n` per month and numbers them from 1. Equal rolling totals keep their
/// input order.
pub fn rank_top_performers(monthly: &[MonthlyPerformance], top_n: usize) -> Vec<TopPerformerEntry> {
    let mut ordered: Vec<&MonthlyPerformance> = monthly.iter().collect();
    ordered.sort_by(|a, b| {
        a.year_month
            .cmp(&b.year_month)
            .then_with(|| b.gross_rolling.total_cmp(&a.gross_rolling))
    });

    let mut ranked = Vec::new();
    let mut current_month: Option<&str> = None;
    let mut rank = 0;

    for row in ordered {
        if current_month != Some(row.year_month.as_str()) {
            current_month = Some(row.year_month.as_str());
            rank = 0;
        }
        if rank >= top_n {
            continue;
        }
        rank += 1;
        ranked.push(TopPerformerEntry {
            salesowners: row.salesowner.clone(),
            year_month: row.year_month.clone(),
            gross_per_salesowner: row.gross_per_salesowner,
            gross_rolling_3m: row.gross_rolling,
            rank,
        });
    }

    ranked
}

/// Monthly top performers by trailing gross value.
pub fn calculate_top_performers(
    orders: &[Order],
    invoices: &[Invoice],
    config: &ReportConfig,
) -> Vec<TopPerformerEntry> {
    let deduplicated = apply_duplicate_policy(orders, config.duplicates.top_performers, "top_performers");
    let index = InvoiceIndex::new(invoices);
    let merged = merge_orders(deduplicated, &index);

    let relevant = invoiced_of_type(&merged, config.performance_crate_type);
    let shares = explode_salesowners(&relevant);
    let mut monthly = monthly_totals(&shares);
    apply_rolling_window(&mut monthly, config.rolling_window_months);

    let ranked = rank_top_performers(&monthly, config.top_n);
    info!(
        "Top {} performers calculated for each {}-month rolling window ({} rows)",
        config.top_n,
        config.rolling_window_months,
        ranked.len()
    );
    ranked
}

/// Gross value per salesowner over the trailing `lookback_days` before the
/// latest invoiced order date, lowest first.
pub fn calculate_sales_performance(
    orders: &[Order],
    invoices: &[Invoice],
    config: &ReportConfig,
) -> Vec<SalesPerformanceEntry> {
    let deduplicated =
        apply_duplicate_policy(orders, config.duplicates.sales_performance, "sales_performance");
    let index = InvoiceIndex::new(invoices);
    let invoiced: Vec<MergedOrder> = merge_orders(deduplicated, &index)
        .into_iter()
        .filter(MergedOrder::is_invoiced)
        .collect();

    let Some(latest) = invoiced.iter().filter_map(|row| row.order.date).max() else {
        warn!("No dated invoiced orders; sales performance is empty");
        return Vec::new();
    };
    let since = lookback_start(latest, config.lookback_days);

    let recent: Vec<MergedOrder> = invoiced
        .into_iter()
        .filter(|row| row.order.date.is_some_and(|d| d >= since))
        .collect();
    info!(
        "{} invoiced orders dated between {} and {}",
        recent.len(),
        since,
        latest
    );

    let relevant = invoiced_of_type(&recent, config.performance_crate_type);
    let shares = explode_salesowners(&relevant);

    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for share in &shares {
        *totals.entry(share.salesowner.as_str()).or_insert(0.0) += share.gross_per_salesowner;
    }

    let mut entries: Vec<SalesPerformanceEntry> = totals
        .into_iter()
        .map(|(owner, total)| SalesPerformanceEntry {
            salesowners: owner.to_string(),
            gross_per_salesowner: round2(total),
        })
        .collect();
    entries.sort_by(|a, b| a.gross_per_salesowner.total_cmp(&b.gross_per_salesowner));

    info!("Sales performance calculated for {} salesowners", entries.len());
    entries
}
