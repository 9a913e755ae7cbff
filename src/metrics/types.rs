use std::collections::BTreeMap;

use serde::Serialize;

use crate::window::TimeWindow;

/// How a KPI's current value compares to its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiStatus {
    /// At or above target.
    Met,
    /// At least 75% of target.
    OnTrack,
    Behind,
    /// Target is zero or negative, so attainment is meaningless.
    NoTarget,
}

/// One KPI: live count against its configured goal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiResult {
    pub current: u64,
    pub target: f64,
    /// `current / target`, 0 when there is no target.
    pub attainment: f64,
    pub status: KpiStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiReport {
    pub window: TimeWindow,
    pub steady_call_volume: KpiResult,
    pub agreement_rate: KpiResult,
    pub lists_out: KpiResult,
}

/// Per-BDR figures behind the team ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BdrPerformance {
    /// 1-based position in the ranking.
    pub rank: usize,
    pub bdr: String,
    pub sales_count: u64,
    pub revenue: f64,
    pub calls: u64,
    /// Completed calls per sale.
    pub activity_to_sale_ratio: f64,
    pub open_deals: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkMetrics {
    /// Sales over completed calls, in `[0, 1]`.
    pub team_conversion_rate: f64,
    pub total_sales: u64,
    pub total_revenue: f64,
    pub average_revenue_per_bdr: f64,
    pub average_sales_per_bdr: f64,
    pub median_sales_count: f64,
    pub median_revenue: f64,
    pub average_deal_size: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamPerformanceResult {
    pub top_performers: Vec<String>,
    pub needs_support: Vec<String>,
    pub rankings: Vec<BdrPerformance>,
    pub benchmark_metrics: BenchmarkMetrics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FunnelStage {
    CallsConducted,
    ProposalsSent,
    AgreementsSigned,
    ListsSent,
    SalesGenerated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionFunnel {
    pub calls_conducted: u64,
    pub proposals_sent: u64,
    pub agreements_signed: u64,
    pub lists_sent: u64,
    pub sales_generated: u64,
}

impl ConversionFunnel {
    /// Stages in funnel order with their counts.
    pub fn stages(&self) -> [(FunnelStage, u64); 5] {
        [
            (FunnelStage::CallsConducted, self.calls_conducted),
            (FunnelStage::ProposalsSent, self.proposals_sent),
            (FunnelStage::AgreementsSigned, self.agreements_signed),
            (FunnelStage::ListsSent, self.lists_sent),
            (FunnelStage::SalesGenerated, self.sales_generated),
        ]
    }
}

/// Conversion between two adjacent funnel stages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageConversion {
    pub from: FunnelStage,
    pub to: FunnelStage,
    /// `to / from`, 0 when `from` is empty.
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineHealthResult {
    pub window: TimeWindow,
    pub conversion_funnel: ConversionFunnel,
    pub stage_conversions: Vec<StageConversion>,
    pub overall_conversion_rate: f64,
    /// Open deals keyed by their status text.
    pub open_deals_by_status: BTreeMap<String, u64>,
    /// Activity logs in the window whose type was not recognised.
    pub unknown_activity_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarterTrend {
    /// Quarter key, e.g. `2026-Q4`.
    pub quarter: String,
    pub lists: u64,
    pub revenue: f64,
    pub sales: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthTrend {
    /// Month key, e.g. `2026-10`.
    pub month: String,
    pub revenue: f64,
    pub sales: u64,
    pub calls: u64,
    pub lists: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendResult {
    /// Oldest quarter first; the last entry is the quarter containing `now`.
    pub quarterly_lists_out: Vec<QuarterTrend>,
    /// Oldest month first; the last entry is the month containing `now`.
    pub monthly: Vec<MonthTrend>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummaryResult {
    pub total_revenue: f64,
    pub monthly_revenue: f64,
    pub quarterly_revenue: f64,
    pub year_to_date_revenue: f64,
    pub previous_month_revenue: f64,
    /// Fractional change against the previous month. `None` when the
    /// previous month had no revenue.
    pub month_over_month_change: Option<f64>,
    pub sales_count: u64,
    pub average_deal_size: f64,
    pub revenue_by_status: BTreeMap<String, f64>,
    pub revenue_by_bdr: BTreeMap<String, f64>,
}
