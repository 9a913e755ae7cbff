//! Calendar-aligned time windows relative to an explicit reference instant.
//!
//! Every boundary is computed in UTC and every window is closed: a timestamp
//! equal to `start` or `end` is inside it.

pub mod period;

pub use period::Period;

use std::sync::LazyLock;

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use serde::Serialize;

use crate::error::{Error, Result};

static RE_ROLLING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)d$").unwrap());
static RE_BACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(day|week|month|quarter|year)-(\d+)$").unwrap());
static RE_LAST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^last-(day|week|month|quarter|year)$").unwrap());

/// Furthest a parsed window may reach into the past.
pub const MAX_LOOKBACK_YEARS: u32 = 10_000;

/// A closed interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// From the first instant of `start` to the last instant of `end`.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: start.and_time(NaiveTime::MIN).and_utc(),
            end: last_instant_of(end),
        }
    }

    /// A window containing no instant at all.
    pub fn empty() -> Self {
        Self {
            start: DateTime::<Utc>::MAX_UTC,
            end: DateTime::<Utc>::MIN_UTC,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t <= self.end
    }
}

fn last_instant_of(date: NaiveDate) -> DateTime<Utc> {
    match date.succ_opt() {
        Some(next) => next.and_time(NaiveTime::MIN).and_utc() - Duration::nanoseconds(1),
        None => DateTime::<Utc>::MAX_UTC,
    }
}

/// Calendar granularity for periods and windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Granularity {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "day" => Ok(Granularity::Day),
            "week" => Ok(Granularity::Week),
            "month" => Ok(Granularity::Month),
            "quarter" => Ok(Granularity::Quarter),
            "year" => Ok(Granularity::Year),
            other => Err(Error::WindowParse(format!("unknown granularity: {other}"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Quarter => "quarter",
            Granularity::Year => "year",
        }
    }

    /// Upper bound on how many periods of this size fit in a year.
    fn per_year(&self) -> u32 {
        match self {
            Granularity::Day => 366,
            Granularity::Week => 53,
            Granularity::Month => 12,
            Granularity::Quarter => 4,
            Granularity::Year => 1,
        }
    }

    /// Most periods a parsed window may step back.
    pub fn max_lookback(&self) -> u32 {
        self.per_year() * MAX_LOOKBACK_YEARS
    }
}

fn start_of(granularity: Granularity, t: DateTime<Utc>) -> DateTime<Utc> {
    Period::containing(granularity, t.date_naive())
        .window()
        .map_or(DateTime::<Utc>::MIN_UTC, |w| w.start)
}

fn end_of(granularity: Granularity, t: DateTime<Utc>) -> DateTime<Utc> {
    Period::containing(granularity, t.date_naive())
        .window()
        .map_or(DateTime::<Utc>::MAX_UTC, |w| w.end)
}

pub fn start_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    start_of(Granularity::Day, t)
}

pub fn end_of_day(t: DateTime<Utc>) -> DateTime<Utc> {
    end_of(Granularity::Day, t)
}

/// Monday 00:00 of the week containing `t`.
pub fn start_of_week(t: DateTime<Utc>) -> DateTime<Utc> {
    start_of(Granularity::Week, t)
}

/// Last instant of the Sunday closing the week containing `t`.
pub fn end_of_week(t: DateTime<Utc>) -> DateTime<Utc> {
    end_of(Granularity::Week, t)
}

pub fn start_of_month(t: DateTime<Utc>) -> DateTime<Utc> {
    start_of(Granularity::Month, t)
}

pub fn end_of_month(t: DateTime<Utc>) -> DateTime<Utc> {
    end_of(Granularity::Month, t)
}

pub fn start_of_quarter(t: DateTime<Utc>) -> DateTime<Utc> {
    start_of(Granularity::Quarter, t)
}

pub fn end_of_quarter(t: DateTime<Utc>) -> DateTime<Utc> {
    end_of(Granularity::Quarter, t)
}

pub fn start_of_year(t: DateTime<Utc>) -> DateTime<Utc> {
    start_of(Granularity::Year, t)
}

pub fn end_of_year(t: DateTime<Utc>) -> DateTime<Utc> {
    end_of(Granularity::Year, t)
}

/// The `sub_*` helpers saturate at the earliest representable instant.
pub fn sub_days(t: DateTime<Utc>, n: u32) -> DateTime<Utc> {
    t.checked_sub_signed(Duration::days(n as i64))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub fn sub_weeks(t: DateTime<Utc>, n: u32) -> DateTime<Utc> {
    t.checked_sub_signed(Duration::weeks(n as i64))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Same instant `n` months earlier; the day clamps to the target month's
/// last day (Mar 31 minus one month is Feb 28/29).
pub fn sub_months(t: DateTime<Utc>, n: u32) -> DateTime<Utc> {
    t.checked_sub_months(Months::new(n))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub fn sub_quarters(t: DateTime<Utc>, n: u32) -> DateTime<Utc> {
    sub_months(t, n.saturating_mul(3))
}

pub fn sub_years(t: DateTime<Utc>, n: u32) -> DateTime<Utc> {
    sub_months(t, n.saturating_mul(12))
}

/// How to derive a window from a reference instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowSpec {
    /// The whole calendar period containing `now`.
    Current(Granularity),
    /// The whole calendar period `n` periods before the current one.
    Back(Granularity, u32),
    /// Start of the current period through `now`.
    ToDate(Granularity),
    /// The last `n` whole days, ending with the day containing `now`.
    Rolling(u32),
    Between(DateTime<Utc>, DateTime<Utc>),
}

impl WindowSpec {
    /// Parse a window string.
    ///
    /// Supported formats:
    /// - `today`, `day`, `week`, `month`, `quarter`, `year`: current period
    /// - `yesterday`, `last-week`, `last-month`, ...: previous period
    /// - `week-2`, `month-3`, ...: N periods back
    /// - `wtd`, `mtd`, `qtd`, `ytd`: period to date
    /// - `30d`: rolling last N days
    ///
    /// Counts reaching back more than [`MAX_LOOKBACK_YEARS`] are rejected.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();

        match s.as_str() {
            "today" => return Ok(WindowSpec::Current(Granularity::Day)),
            "yesterday" => return Ok(WindowSpec::Back(Granularity::Day, 1)),
            "wtd" => return Ok(WindowSpec::ToDate(Granularity::Week)),
            "mtd" => return Ok(WindowSpec::ToDate(Granularity::Month)),
            "qtd" => return Ok(WindowSpec::ToDate(Granularity::Quarter)),
            "ytd" => return Ok(WindowSpec::ToDate(Granularity::Year)),
            _ => {}
        }

        if let Ok(g) = Granularity::parse(&s) {
            return Ok(WindowSpec::Current(g));
        }

        if let Some(caps) = RE_LAST.captures(&s) {
            let g = Granularity::parse(&caps[1])?;
            return Ok(WindowSpec::Back(g, 1));
        }

        if let Some(caps) = RE_BACK.captures(&s) {
            let g = Granularity::parse(&caps[1])?;
            let n = parse_count(&caps[2], g.max_lookback(), &s)?;
            return Ok(WindowSpec::Back(g, n));
        }

        if let Some(caps) = RE_ROLLING.captures(&s) {
            let n = parse_count(&caps[1], Granularity::Day.max_lookback(), &s)?;
            if n == 0 {
                return Err(Error::WindowParse("rolling window needs at least 1 day".into()));
            }
            return Ok(WindowSpec::Rolling(n));
        }

        Err(Error::WindowParse(format!("unrecognized window: {s}")))
    }

    /// Concrete boundaries relative to `now`, or `None` when the window
    /// falls outside the representable calendar.
    pub fn try_resolve(&self, now: DateTime<Utc>) -> Option<TimeWindow> {
        let today = now.date_naive();
        match self {
            WindowSpec::Current(g) => Period::containing(*g, today).window(),
            WindowSpec::Back(g, n) => Period::containing(*g, today).shift_back(*n)?.window(),
            WindowSpec::ToDate(g) => {
                let current = Period::containing(*g, today).window()?;
                Some(TimeWindow::new(current.start, now))
            }
            WindowSpec::Rolling(n) => {
                let days = (*n).max(1) - 1;
                let first = now.checked_sub_signed(Duration::days(days as i64))?;
                Some(TimeWindow::new(start_of_day(first), end_of_day(now)))
            }
            WindowSpec::Between(start, end) => Some(TimeWindow::new(*start, *end)),
        }
    }

    /// Resolve to concrete boundaries relative to `now`. A window outside
    /// the representable calendar resolves to [`TimeWindow::empty`].
    pub fn resolve(&self, now: DateTime<Utc>) -> TimeWindow {
        self.try_resolve(now).unwrap_or_else(|| {
            log::warn!("window {self} is outside the calendar range at {now}");
            TimeWindow::empty()
        })
    }

    pub fn to_key(&self) -> String {
        match self {
            WindowSpec::Current(g) => g.as_str().to_string(),
            WindowSpec::Back(g, n) => format!("{}-{n}", g.as_str()),
            WindowSpec::ToDate(g) => format!("{}td", &g.as_str()[..1]),
            WindowSpec::Rolling(n) => format!("{n}d"),
            WindowSpec::Between(start, end) => {
                format!("{}..{}", start.to_rfc3339(), end.to_rfc3339())
            }
        }
    }
}

fn parse_count(digits: &str, max: u32, input: &str) -> Result<u32> {
    match digits.parse::<u32>() {
        Ok(n) if n <= max => Ok(n),
        _ => {
            let msg = format!("{input} goes back more than {MAX_LOOKBACK_YEARS} years");
            Err(Error::WindowParse(msg))
        }
    }
}

impl std::fmt::Display for WindowSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone, Timelike, Weekday};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn parsed(s: &str) -> WindowSpec {
        WindowSpec::parse(s).unwrap()
    }

    #[test]
    fn test_week_starts_monday() {
        // Friday 2026-10-16
        let now = at(2026, 10, 16, 14, 30);
        let start = start_of_week(now);
        let end = end_of_week(now);
        assert_eq!(start, at(2026, 10, 12, 0, 0));
        assert_eq!(start.weekday(), Weekday::Mon);
        assert_eq!(end.date_naive(), date(2026, 10, 18));
        assert_eq!(end.hour(), 23);
        assert_eq!(end.nanosecond(), 999_999_999);
    }

    #[test]
    fn test_week_containing_sunday() {
        // Sunday belongs to the week that started the previous Monday
        let sunday = at(2026, 10, 18, 9, 0);
        assert_eq!(start_of_week(sunday), at(2026, 10, 12, 0, 0));
    }

    #[test]
    fn test_month_and_quarter_boundaries() {
        let now = at(2026, 2, 10, 8, 0);
        assert_eq!(start_of_month(now), at(2026, 2, 1, 0, 0));
        assert_eq!(end_of_month(now).date_naive().day(), 28);
        assert_eq!(start_of_quarter(now), at(2026, 1, 1, 0, 0));
        assert_eq!(end_of_quarter(now).date_naive(), date(2026, 3, 31));
        assert_eq!(start_of_year(now), at(2026, 1, 1, 0, 0));
        assert_eq!(end_of_year(now).date_naive(), date(2026, 12, 31));
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let now = at(2026, 10, 16, 12, 0);
        let w = WindowSpec::Current(Granularity::Month).resolve(now);
        assert!(w.contains(w.start));
        assert!(w.contains(w.end));
        assert!(!w.contains(w.start - Duration::nanoseconds(1)));
        assert!(!w.contains(w.end + Duration::nanoseconds(1)));
    }

    #[test]
    fn test_sub_helpers() {
        let now = at(2026, 3, 31, 10, 0);
        assert_eq!(sub_weeks(now, 1), at(2026, 3, 24, 10, 0));
        assert_eq!(sub_months(now, 1), at(2026, 2, 28, 10, 0));
        assert_eq!(sub_quarters(now, 1), at(2025, 12, 31, 10, 0));
        assert_eq!(sub_years(now, 1), at(2025, 3, 31, 10, 0));
        assert_eq!(sub_days(now, 31), at(2026, 2, 28, 10, 0));
    }

    #[test]
    fn test_sub_helpers_saturate() {
        let now = at(2026, 3, 31, 10, 0);
        let min = DateTime::<Utc>::MIN_UTC;
        assert_eq!(sub_days(now, u32::MAX), min);
        assert_eq!(sub_weeks(now, u32::MAX), min);
        assert_eq!(sub_years(now, u32::MAX), min);
    }

    #[test]
    fn test_resolve_back() {
        let now = at(2026, 10, 16, 12, 0);
        let last_week = WindowSpec::Back(Granularity::Week, 1).resolve(now);
        assert_eq!(last_week.start, at(2026, 10, 5, 0, 0));
        assert_eq!(last_week.end.date_naive(), date(2026, 10, 11));

        let q = WindowSpec::Back(Granularity::Quarter, 2).resolve(now);
        assert_eq!(q.start, at(2026, 4, 1, 0, 0));
        assert_eq!(q.end.date_naive(), date(2026, 6, 30));

        assert_eq!(
            WindowSpec::Back(Granularity::Month, 0).resolve(now),
            WindowSpec::Current(Granularity::Month).resolve(now)
        );
    }

    #[test]
    fn test_resolve_to_date_ends_at_now() {
        let now = at(2026, 10, 16, 12, 0);
        let w = WindowSpec::ToDate(Granularity::Quarter).resolve(now);
        assert_eq!(w.start, at(2026, 10, 1, 0, 0));
        assert_eq!(w.end, now);
        assert!(!w.contains(now + Duration::seconds(1)));
    }

    #[test]
    fn test_resolve_rolling() {
        let now = at(2026, 10, 16, 12, 0);
        let w = WindowSpec::Rolling(7).resolve(now);
        assert_eq!(w.start, at(2026, 10, 10, 0, 0));
        assert_eq!(w.end, end_of_day(now));

        let one = WindowSpec::Rolling(1).resolve(now);
        assert_eq!(one, WindowSpec::Current(Granularity::Day).resolve(now));
    }

    #[test]
    fn test_resolve_outside_calendar_is_empty() {
        let now = at(2026, 10, 16, 12, 0);
        for window in [
            WindowSpec::Back(Granularity::Year, u32::MAX),
            WindowSpec::Back(Granularity::Month, 5_000_000),
            WindowSpec::Back(Granularity::Quarter, u32::MAX),
            WindowSpec::Rolling(4_000_000_000),
        ] {
            assert_eq!(window.try_resolve(now), None, "{window}");
            let w = window.resolve(now);
            assert!(w.is_empty());
            assert!(!w.contains(now));
            assert!(!w.contains(DateTime::<Utc>::MIN_UTC));
        }
    }

    #[test]
    fn test_parse_window() {
        assert_eq!(parsed("week"), WindowSpec::Current(Granularity::Week));
        assert_eq!(parsed("Today"), WindowSpec::Current(Granularity::Day));
        assert_eq!(parsed("mtd"), WindowSpec::ToDate(Granularity::Month));
        assert_eq!(parsed("30d"), WindowSpec::Rolling(30));
        assert_eq!(parsed("last-week"), WindowSpec::Back(Granularity::Week, 1));
        assert_eq!(
            parsed("quarter-3"),
            WindowSpec::Back(Granularity::Quarter, 3)
        );
        assert!(WindowSpec::parse("0d").is_err());
        assert!(WindowSpec::parse("fortnight").is_err());
    }

    #[test]
    fn test_parse_rejects_unresolvable_counts() {
        let too_far = ["year-4294967295", "month-5000000", "4000000000d"];
        for input in too_far.into_iter().chain(["week-99999999999"]) {
            assert!(
                matches!(WindowSpec::parse(input), Err(Error::WindowParse(_))),
                "{input}"
            );
        }
    }

    #[test]
    fn test_parse_accepts_counts_up_to_the_lookback_limit() {
        let now = at(2026, 10, 16, 12, 0);
        for input in ["year-10000", "quarter-40000", "month-120000", "3660000d"] {
            let w = parsed(input).resolve(now);
            assert!(!w.is_empty(), "{input}");
            assert!(w.start < now);
        }
        assert!(WindowSpec::parse("year-10001").is_err());
    }

    #[test]
    fn test_to_key_round_trips_through_parse() {
        for key in ["week", "month-2", "qtd", "ytd", "14d", "day"] {
            assert_eq!(parsed(key).to_key(), key);
        }
    }
}
