use chrono::{DateTime, Utc};

use super::count_activities;
use super::types::{KpiReport, KpiResult, KpiStatus};
use crate::records::{ActivityLog, ActivityType, PipelineItem, Targets};
use crate::window::WindowSpec;

/// Attainment at or above this fraction of target counts as on track.
const ON_TRACK_THRESHOLD: f64 = 0.75;

/// Compare live activity counts in `window` against the configured targets.
///
/// `pipeline_items` is accepted for signature parity with the other
/// calculators; no KPI is derived from it.
pub fn calculate_kpis(
    _pipeline_items: &[PipelineItem],
    activity_logs: &[ActivityLog],
    targets: &Targets,
    now: DateTime<Utc>,
    window: &WindowSpec,
) -> KpiReport {
    let window = window.resolve(now);

    let calls = count_activities(activity_logs, &ActivityType::CallCompleted, &window);
    let agreements = count_activities(activity_logs, &ActivityType::AgreementSent, &window);
    let lists = count_activities(activity_logs, &ActivityType::PartnerListSent, &window);

    log::debug!(
        "KPIs for {} .. {}: calls={calls} agreements={agreements} lists={lists}",
        window.start,
        window.end
    );

    KpiReport {
        window,
        steady_call_volume: kpi_result(calls, targets.steady_call_volume),
        agreement_rate: kpi_result(agreements, targets.agreement_rate),
        lists_out: kpi_result(lists, targets.lists_out),
    }
}

fn kpi_result(current: u64, target: f64) -> KpiResult {
    if target <= 0.0 {
        return KpiResult {
            current,
            target,
            attainment: 0.0,
            status: KpiStatus::NoTarget,
        };
    }

    let attainment = current as f64 / target;
    let status = if attainment >= 1.0 {
        KpiStatus::Met
    } else if attainment >= ON_TRACK_THRESHOLD {
        KpiStatus::OnTrack
    } else {
        KpiStatus::Behind
    };

    KpiResult {
        current,
        target,
        attainment,
        status,
    }
}
