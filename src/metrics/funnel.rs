use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::types::{ConversionFunnel, PipelineHealthResult, StageConversion};
use super::{count_activities, ratio};
use crate::records::{ActivityLog, ActivityType, FinanceEntry, PipelineItem};
use crate::window::{Granularity, WindowSpec};

/// Build the conversion funnel for the calendar month containing `now`.
///
/// See [`assess_pipeline_health_in`] for the stage definitions.
pub fn assess_pipeline_health(
    pipeline_items: &[PipelineItem],
    activity_logs: &[ActivityLog],
    now: DateTime<Utc>,
    finance_entries: &[FinanceEntry],
) -> PipelineHealthResult {
    assess_pipeline_health_in(
        pipeline_items,
        activity_logs,
        now,
        finance_entries,
        &WindowSpec::Current(Granularity::Month),
    )
}

/// Build the conversion funnel with activity stages scoped to `window`.
///
/// Calls, proposals, signed agreements and lists come from activity logs in
/// the window. `sales_generated` is the number of finance entries passed in,
/// whatever the pipeline says: the caller scopes finance entries, and a
/// `Sold` pipeline item is never a sale on its own.
pub fn assess_pipeline_health_in(
    pipeline_items: &[PipelineItem],
    activity_logs: &[ActivityLog],
    now: DateTime<Utc>,
    finance_entries: &[FinanceEntry],
    window: &WindowSpec,
) -> PipelineHealthResult {
    let window = window.resolve(now);

    let conversion_funnel = ConversionFunnel {
        calls_conducted: count_activities(activity_logs, &ActivityType::CallCompleted, &window),
        proposals_sent: count_activities(activity_logs, &ActivityType::ProposalSent, &window),
        agreements_signed: count_activities(
            activity_logs,
            &ActivityType::AgreementSigned,
            &window,
        ),
        lists_sent: count_activities(activity_logs, &ActivityType::PartnerListSent, &window),
        sales_generated: finance_entries.len() as u64,
    };

    let stages = conversion_funnel.stages();
    let stage_conversions = stages
        .windows(2)
        .map(|pair| StageConversion {
            from: pair[0].0,
            to: pair[1].0,
            rate: ratio(pair[1].1, pair[0].1),
        })
        .collect();

    let overall_conversion_rate = ratio(
        conversion_funnel.sales_generated,
        conversion_funnel.calls_conducted,
    );

    let mut open_deals_by_status: BTreeMap<String, u64> = BTreeMap::new();
    for item in pipeline_items.iter().filter(|i| i.status.is_open()) {
        *open_deals_by_status
            .entry(item.status.as_str().to_string())
            .or_default() += 1;
    }

    let unknown_activity_count = activity_logs
        .iter()
        .filter(|l| !l.activity_type.is_known() && window.contains(l.timestamp))
        .count() as u64;
    if unknown_activity_count > 0 {
        log::debug!("pipeline health: {unknown_activity_count} unrecognised activity logs ignored");
    }

    PipelineHealthResult {
        window,
        conversion_funnel,
        stage_conversions,
        overall_conversion_rate,
        open_deals_by_status,
        unknown_activity_count,
    }
}
