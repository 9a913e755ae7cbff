use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::types::FinancialSummaryResult;
use crate::records::{total_amount, ActivityLog, FinanceEntry, PipelineItem};
use crate::window::{Granularity, Period, TimeWindow};

/// Revenue totals from finance entries.
///
/// `total_revenue` covers every entry passed in. The month, quarter and
/// year figures cover the calendar periods containing `now`, including
/// entries dated later in the same period.
pub fn calculate_financial_summary(
    _pipeline_items: &[PipelineItem],
    _activity_logs: &[ActivityLog],
    now: DateTime<Utc>,
    finance_entries: &[FinanceEntry],
) -> FinancialSummaryResult {
    let today = now.date_naive();
    let month = Period::containing(Granularity::Month, today);
    let quarter = Period::containing(Granularity::Quarter, today).window();
    let year = Period::containing(Granularity::Year, today).window();

    let revenue_in = |window| revenue_within(finance_entries, window);

    let total_revenue = total_amount(finance_entries);
    let monthly_revenue = revenue_in(month.window());
    let previous_month_revenue = revenue_in(month.previous().and_then(|p| p.window()));

    let month_over_month_change = if previous_month_revenue > 0.0 {
        Some((monthly_revenue - previous_month_revenue) / previous_month_revenue)
    } else {
        None
    };

    let mut revenue_by_status: BTreeMap<String, f64> = BTreeMap::new();
    let mut revenue_by_bdr: BTreeMap<String, f64> = BTreeMap::new();
    for entry in finance_entries {
        *revenue_by_status.entry(entry.status.clone()).or_default() += entry.amount();
        *revenue_by_bdr.entry(entry.bdr.clone()).or_default() += entry.amount();
    }

    let sales_count = finance_entries.len() as u64;
    let average_deal_size = if sales_count > 0 {
        total_revenue / sales_count as f64
    } else {
        0.0
    };

    log::debug!("financial summary: {sales_count} entries, total {total_revenue:.2}");

    FinancialSummaryResult {
        total_revenue,
        monthly_revenue,
        quarterly_revenue: revenue_in(quarter),
        year_to_date_revenue: revenue_in(year),
        previous_month_revenue,
        month_over_month_change,
        sales_count,
        average_deal_size,
        revenue_by_status,
        revenue_by_bdr,
    }
}

/// A period outside the calendar range holds no entries.
fn revenue_within(entries: &[FinanceEntry], window: Option<TimeWindow>) -> f64 {
    match window {
        Some(w) => total_amount(entries.iter().filter(|e| w.contains(e.created_at))),
        None => 0.0,
    }
}
