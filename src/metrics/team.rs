use std::collections::{BTreeMap, HashMap};

use super::median;
use super::types::{BdrPerformance, BenchmarkMetrics, TeamPerformanceResult};
use crate::records::{ActivityLog, ActivityType, FinanceEntry, PipelineItem};

#[derive(Default)]
struct Tally {
    sales: u64,
    revenue: f64,
}

/// Rank BDRs by finance-entry sales and revenue and split them into top
/// performers and those needing support.
///
/// Only `finance_entries` produce sales or revenue. Activity logs and
/// pipeline items feed the auxiliary `calls` and `open_deals` columns.
/// A BDR is a top performer when their sales count is above the team
/// median, or equal to it with revenue at or above the median revenue.
pub fn calculate_team_performance(
    pipeline_items: &[PipelineItem],
    activity_logs: &[ActivityLog],
    finance_entries: &[FinanceEntry],
) -> TeamPerformanceResult {
    if finance_entries.is_empty() {
        log::debug!("team performance: no finance entries");
        return TeamPerformanceResult::default();
    }

    let mut tallies: BTreeMap<&str, Tally> = BTreeMap::new();
    for entry in finance_entries {
        let tally = tallies.entry(entry.bdr.as_str()).or_default();
        tally.sales += 1;
        tally.revenue += entry.amount();
    }

    let mut calls_by_bdr: HashMap<&str, u64> = HashMap::new();
    let mut total_calls: u64 = 0;
    for log in activity_logs {
        if log.activity_type == ActivityType::CallCompleted {
            *calls_by_bdr.entry(log.bdr.as_str()).or_default() += 1;
            total_calls += 1;
        }
    }

    let mut open_by_bdr: HashMap<&str, u64> = HashMap::new();
    for item in pipeline_items.iter().filter(|i| i.status.is_open()) {
        *open_by_bdr.entry(item.bdr.as_str()).or_default() += 1;
    }

    let mut rankings: Vec<BdrPerformance> = tallies
        .iter()
        .map(|(bdr, tally)| {
            let calls = calls_by_bdr.get(bdr).copied().unwrap_or(0);
            BdrPerformance {
                rank: 0,
                bdr: bdr.to_string(),
                sales_count: tally.sales,
                revenue: tally.revenue,
                calls,
                activity_to_sale_ratio: calls as f64 / tally.sales as f64,
                open_deals: open_by_bdr.get(bdr).copied().unwrap_or(0),
            }
        })
        .collect();

    rankings.sort_by(|a, b| {
        b.sales_count
            .cmp(&a.sales_count)
            .then_with(|| b.revenue.total_cmp(&a.revenue))
            .then_with(|| a.bdr.cmp(&b.bdr))
    });
    for (i, perf) in rankings.iter_mut().enumerate() {
        perf.rank = i + 1;
    }

    let sales: Vec<f64> = rankings.iter().map(|p| p.sales_count as f64).collect();
    let revenues: Vec<f64> = rankings.iter().map(|p| p.revenue).collect();
    let median_sales = median(&sales);
    let median_revenue = median(&revenues);

    let mut top_performers = Vec::new();
    let mut needs_support = Vec::new();
    for perf in &rankings {
        let sales = perf.sales_count as f64;
        let at_median = sales == median_sales && perf.revenue >= median_revenue;
        if sales > median_sales || at_median {
            top_performers.push(perf.bdr.clone());
        } else {
            needs_support.push(perf.bdr.clone());
        }
    }

    let total_sales = finance_entries.len() as u64;
    let total_revenue: f64 = revenues.iter().sum();
    let bdr_count = rankings.len() as f64;

    let benchmark_metrics = BenchmarkMetrics {
        // Floor the denominator at the sales count so the rate stays positive
        // when sales exist without logged calls.
        team_conversion_rate: total_sales as f64 / total_calls.max(total_sales) as f64,
        total_sales,
        total_revenue,
        average_revenue_per_bdr: total_revenue / bdr_count,
        average_sales_per_bdr: total_sales as f64 / bdr_count,
        median_sales_count: median_sales,
        median_revenue,
        average_deal_size: total_revenue / total_sales as f64,
    };

    log::debug!(
        "team performance: {} BDRs, {} top, {} need support",
        rankings.len(),
        top_performers.len(),
        needs_support.len()
    );

    TeamPerformanceResult {
        top_performers,
        needs_support,
        rankings,
        benchmark_metrics,
    }
}
