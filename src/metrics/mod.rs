//! Pure calculators turning pipeline items, activity logs and finance
//! entries into KPI, team, funnel, trend and revenue reports.
//!
//! Finance entries are the only source of sales and revenue. Nothing here
//! reads a clock, touches storage or mutates its inputs.

pub mod finance;
pub mod funnel;
pub mod kpi;
pub mod team;
pub mod trends;
pub mod types;

pub use finance::calculate_financial_summary;
pub use funnel::{assess_pipeline_health, assess_pipeline_health_in};
pub use kpi::calculate_kpis;
pub use team::calculate_team_performance;
pub use trends::{calculate_trends, calculate_trends_with, TrendOptions};
pub use types::*;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::records::{ActivityLog, ActivityType, FinanceEntry, PipelineItem, Targets};
use crate::window::{TimeWindow, WindowSpec};

/// The three record streams as fetched for one report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub pipeline_items: Vec<PipelineItem>,
    pub activity_logs: Vec<ActivityLog>,
    pub finance_entries: Vec<FinanceEntry>,
}

/// Every report computed over a single snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub now: DateTime<Utc>,
    pub kpis: KpiReport,
    pub team_performance: TeamPerformanceResult,
    pub pipeline_health: PipelineHealthResult,
    pub trends: TrendResult,
    pub financial_summary: FinancialSummaryResult,
}

impl Dashboard {
    /// `window` scopes the KPI counts and the funnel's activity stages.
    pub fn compute(
        snapshot: &Snapshot,
        targets: &Targets,
        now: DateTime<Utc>,
        window: &WindowSpec,
    ) -> Self {
        let Snapshot {
            pipeline_items,
            activity_logs,
            finance_entries,
        } = snapshot;

        Self {
            now,
            kpis: calculate_kpis(pipeline_items, activity_logs, targets, now, window),
            team_performance: calculate_team_performance(
                pipeline_items,
                activity_logs,
                finance_entries,
            ),
            pipeline_health: assess_pipeline_health_in(
                pipeline_items,
                activity_logs,
                now,
                finance_entries,
                window,
            ),
            trends: calculate_trends(pipeline_items, activity_logs, now, finance_entries),
            financial_summary: calculate_financial_summary(
                pipeline_items,
                activity_logs,
                now,
                finance_entries,
            ),
        }
    }
}

/// Logs of exactly `kind` whose timestamp is inside `window`.
fn count_activities(logs: &[ActivityLog], kind: &ActivityType, window: &TimeWindow) -> u64 {
    logs.iter()
        .filter(|l| &l.activity_type == kind && window.contains(l.timestamp))
        .count() as u64
}

/// `num / den`, or 0 when `den` is 0.
fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if mid * 2 == sorted.len() {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
