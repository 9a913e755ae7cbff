use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::types::{MonthTrend, QuarterTrend, TrendResult};
use crate::error::{Error, Result};
use crate::records::{ActivityLog, ActivityType, FinanceEntry, PipelineItem};
use crate::window::{Granularity, Period};

/// Longest quarterly series a report may ask for.
pub const MAX_TREND_QUARTERS: u32 = 400;
/// Longest monthly series a report may ask for.
pub const MAX_TREND_MONTHS: u32 = 1200;

/// How many periods the rolling series cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrendOptions {
    pub quarters: u32,
    pub months: u32,
}

impl TrendOptions {
    pub fn new(quarters: u32, months: u32) -> Result<Self> {
        let too_long = if quarters > MAX_TREND_QUARTERS {
            Some(format!("{quarters} quarters (max {MAX_TREND_QUARTERS})"))
        } else if months > MAX_TREND_MONTHS {
            Some(format!("{months} months (max {MAX_TREND_MONTHS})"))
        } else {
            None
        };
        match too_long {
            Some(msg) => Err(Error::WindowParse(format!("trend series too long: {msg}"))),
            None => Ok(Self { quarters, months }),
        }
    }
}

impl Default for TrendOptions {
    fn default() -> Self {
        Self {
            quarters: 4,
            months: 12,
        }
    }
}

/// Quarterly and monthly series over the default rolling windows.
pub fn calculate_trends(
    pipeline_items: &[PipelineItem],
    activity_logs: &[ActivityLog],
    now: DateTime<Utc>,
    finance_entries: &[FinanceEntry],
) -> TrendResult {
    calculate_trends_with(
        pipeline_items,
        activity_logs,
        now,
        finance_entries,
        &TrendOptions::default(),
    )
}

/// Quarterly and monthly series ending with the periods containing `now`.
///
/// Records are bucketed by the calendar period their timestamp falls in,
/// so each finance entry lands in at most one quarter and one month.
/// Series lengths are capped at [`MAX_TREND_QUARTERS`] and
/// [`MAX_TREND_MONTHS`].
pub fn calculate_trends_with(
    _pipeline_items: &[PipelineItem],
    activity_logs: &[ActivityLog],
    now: DateTime<Utc>,
    finance_entries: &[FinanceEntry],
    options: &TrendOptions,
) -> TrendResult {
    let today = now.date_naive();

    let this_quarter = Period::containing(Granularity::Quarter, today);
    let quarters = rolling_periods(this_quarter, options.quarters.min(MAX_TREND_QUARTERS));
    let quarter_index = index_of(&quarters);
    let mut quarterly_lists_out: Vec<QuarterTrend> = quarters
        .iter()
        .map(|p| QuarterTrend {
            quarter: p.to_key(),
            lists: 0,
            revenue: 0.0,
            sales: 0,
        })
        .collect();

    let this_month = Period::containing(Granularity::Month, today);
    let months = rolling_periods(this_month, options.months.min(MAX_TREND_MONTHS));
    let month_index = index_of(&months);
    let mut monthly: Vec<MonthTrend> = months
        .iter()
        .map(|p| MonthTrend {
            month: p.to_key(),
            revenue: 0.0,
            sales: 0,
            calls: 0,
            lists: 0,
        })
        .collect();

    let buckets = |t: DateTime<Utc>| {
        let date = t.date_naive();
        (
            quarter_index.get(&Period::containing(Granularity::Quarter, date)),
            month_index.get(&Period::containing(Granularity::Month, date)),
        )
    };

    for entry in finance_entries {
        let (quarter, month) = buckets(entry.created_at);
        if let Some(&i) = quarter {
            quarterly_lists_out[i].revenue += entry.amount();
            quarterly_lists_out[i].sales += 1;
        }
        if let Some(&i) = month {
            monthly[i].revenue += entry.amount();
            monthly[i].sales += 1;
        }
    }

    for log in activity_logs {
        let (quarter, month) = buckets(log.timestamp);
        match log.activity_type {
            ActivityType::PartnerListSent => {
                if let Some(&i) = quarter {
                    quarterly_lists_out[i].lists += 1;
                }
                if let Some(&i) = month {
                    monthly[i].lists += 1;
                }
            }
            ActivityType::CallCompleted => {
                if let Some(&i) = month {
                    monthly[i].calls += 1;
                }
            }
            _ => {}
        }
    }

    log::debug!(
        "trends: {} quarters, {} months ending {}",
        quarterly_lists_out.len(),
        monthly.len(),
        today
    );

    TrendResult {
        quarterly_lists_out,
        monthly,
    }
}

/// Up to `count` periods ending with `current`, oldest first. Periods
/// before the start of the calendar are left out.
fn rolling_periods(current: Period, count: u32) -> Vec<Period> {
    (0..count)
        .rev()
        .filter_map(|n| current.shift_back(n))
        .collect()
}

fn index_of(periods: &[Period]) -> HashMap<Period, usize> {
    periods.iter().enumerate().map(|(i, p)| (*p, i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::testing::{activity, at, finance, now};
    use crate::records::total_amount;
    use crate::window::TimeWindow;

    fn sample_entries() -> Vec<FinanceEntry> {
        vec![
            finance("A", Some(1000.0), now()),
            finance("A", Some(2000.0), now()),
            finance("B", Some(1500.0), now()),
        ]
    }

    #[test]
    fn test_revenue_sums_across_quarters() {
        let result = calculate_trends(&[], &[], now(), &sample_entries());
        let total: f64 = result.quarterly_lists_out.iter().map(|q| q.revenue).sum();
        assert_eq!(total, 4500.0);
    }

    #[test]
    fn test_quarter_labels_oldest_first() {
        let result = calculate_trends(&[], &[], now(), &[]);
        let labels: Vec<&str> = result
            .quarterly_lists_out
            .iter()
            .map(|q| q.quarter.as_str())
            .collect();
        assert_eq!(labels, vec!["2026-Q1", "2026-Q2", "2026-Q3", "2026-Q4"]);

        assert_eq!(result.monthly.len(), 12);
        assert_eq!(result.monthly[0].month, "2025-11");
        assert_eq!(result.monthly[11].month, "2026-10");
    }

    #[test]
    fn test_entries_bucketed_by_quarter() {
        let entries = vec![
            finance("A", Some(100.0), at(2026, 1, 1, 0, 0)),
            finance("A", Some(200.0), at(2026, 3, 31, 23, 59)),
            finance("B", Some(300.0), at(2026, 4, 1, 0, 0)),
            finance("B", None, at(2026, 9, 30, 12, 0)),
            // Outside the four-quarter range
            finance("C", Some(9999.0), at(2025, 12, 31, 23, 59)),
        ];
        let result = calculate_trends(&[], &[], now(), &entries);
        let q = &result.quarterly_lists_out;

        assert_eq!(q[0].revenue, 300.0);
        assert_eq!(q[0].sales, 2);
        assert_eq!(q[1].revenue, 300.0);
        assert_eq!(q[2].revenue, 0.0);
        assert_eq!(q[2].sales, 1);
        assert_eq!(q[3].revenue, 0.0);
    }

    #[test]
    fn test_quarter_revenue_matches_union_of_windows() {
        let entries = vec![
            finance("A", Some(120.0), at(2025, 8, 3, 10, 0)),
            finance("A", Some(80.5), at(2025, 10, 1, 0, 0)),
            finance("B", Some(40.0), at(2026, 2, 14, 9, 0)),
            finance("B", Some(17.25), at(2026, 10, 16, 12, 0)),
            finance("C", None, at(2026, 6, 30, 23, 59)),
        ];
        let options = TrendOptions {
            quarters: 6,
            months: 3,
        };
        let result = calculate_trends_with(&[], &[], now(), &entries, &options);

        let union = TimeWindow::new(
            Period::Quarter(2025, 3).window().unwrap().start,
            Period::Quarter(2026, 4).window().unwrap().end,
        );
        let expected = total_amount(entries.iter().filter(|e| union.contains(e.created_at)));
        let actual: f64 = result.quarterly_lists_out.iter().map(|q| q.revenue).sum();
        assert_eq!(result.quarterly_lists_out.len(), 6);
        assert_eq!(result.quarterly_lists_out[0].quarter, "2025-Q3");
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_lists_and_calls_counted() {
        let logs = vec![
            activity("Partner_List_Sent", now(), "A"),
            activity("Partner_List_Sent", at(2026, 7, 2, 9, 0), "A"),
            activity("Partner_List_Sent", at(2020, 7, 2, 9, 0), "A"),
            activity("Call_Completed", now(), "A"),
            activity("Call_Completed", at(2026, 9, 30, 9, 0), "B"),
            activity("partner_list_sent", now(), "A"),
        ];
        let result = calculate_trends(&[], &logs, now(), &[]);
        let q = &result.quarterly_lists_out;
        assert_eq!(q[3].lists, 1);
        assert_eq!(q[2].lists, 1);
        assert_eq!(q.iter().map(|x| x.lists).sum::<u64>(), 2);

        let oct = &result.monthly[11];
        assert_eq!(oct.calls, 1);
        assert_eq!(oct.lists, 1);
        assert_eq!(result.monthly[10].calls, 1);
    }

    #[test]
    fn test_options_are_bounded() {
        assert_eq!(TrendOptions::new(8, 24).unwrap().quarters, 8);
        let err = TrendOptions::new(u32::MAX, 12).unwrap_err();
        assert!(matches!(err, Error::WindowParse(_)));
        assert!(TrendOptions::new(4, MAX_TREND_MONTHS + 1).is_err());
    }

    #[test]
    fn test_oversized_options_are_capped() {
        let options = TrendOptions {
            quarters: u32::MAX,
            months: u32::MAX,
        };
        let result = calculate_trends_with(&[], &[], now(), &sample_entries(), &options);
        let quarters = &result.quarterly_lists_out;
        assert_eq!(quarters.len(), MAX_TREND_QUARTERS as usize);
        assert_eq!(quarters[0].quarter, "1927-Q1");
        assert_eq!(result.monthly.len(), MAX_TREND_MONTHS as usize);
        assert_eq!(quarters.iter().map(|q| q.revenue).sum::<f64>(), 4500.0);
    }

    #[test]
    fn test_series_stops_at_start_of_calendar() {
        let earliest = DateTime::<Utc>::MIN_UTC;
        let result = calculate_trends(&[], &[], earliest, &[]);
        assert_eq!(result.quarterly_lists_out.len(), 1);
        assert_eq!(result.monthly.len(), 1);
    }

    #[test]
    fn test_zero_periods() {
        let options = TrendOptions {
            quarters: 0,
            months: 0,
        };
        let result = calculate_trends_with(&[], &[], now(), &sample_entries(), &options);
        assert!(result.quarterly_lists_out.is_empty());
        assert!(result.monthly.is_empty());
    }
}
