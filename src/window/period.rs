use std::sync::LazyLock;

use chrono::{Datelike, Days, Duration, NaiveDate, Weekday};
use regex::Regex;

use crate::date_util::{first_month_of_quarter, last_day_of_month, months_back, quarter_of};
use crate::error::{Error, Result};
use crate::window::{Granularity, TimeWindow};

static RE_QUARTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-Q([1-4])$").unwrap());
static RE_WEEK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-W(\d{1,2})$").unwrap());
static RE_MONTH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})$").unwrap());
static RE_DAY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap());

/// A concrete calendar period. Weeks are ISO weeks (Monday start).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Period {
    Day(NaiveDate),
    Week(i32, u8),
    Month(i32, u8),
    Quarter(i32, u8),
    Year(i32),
}

impl Period {
    /// The period of the given granularity that contains `date`.
    pub fn containing(granularity: Granularity, date: NaiveDate) -> Self {
        match granularity {
            Granularity::Day => Period::Day(date),
            Granularity::Week => {
                let iw = date.iso_week();
                Period::Week(iw.year(), iw.week() as u8)
            }
            Granularity::Month => Period::Month(date.year(), date.month() as u8),
            Granularity::Quarter => Period::Quarter(date.year(), quarter_of(date)),
            Granularity::Year => Period::Year(date.year()),
        }
    }

    /// Parse a period string.
    ///
    /// Supported formats:
    /// - `2026`: year
    /// - `2026-Q3`: quarter
    /// - `2026-07`: month
    /// - `2026-W05`: ISO week
    /// - `2026-07-14`: single day
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.len() == 4 {
            if let Ok(year) = s.parse::<i32>() {
                return Ok(Period::Year(year));
            }
        }

        if let Some(caps) = RE_QUARTER.captures(s) {
            let year: i32 = caps[1].parse().unwrap();
            let q: u8 = caps[2].parse().unwrap();
            return Ok(Period::Quarter(year, q));
        }

        if let Some(caps) = RE_WEEK.captures(s) {
            let year: i32 = caps[1].parse().unwrap();
            let week: u8 = caps[2].parse().unwrap();
            // Week 53 only exists in some ISO years
            if NaiveDate::from_isoywd_opt(year, week as u32, Weekday::Mon).is_some() {
                return Ok(Period::Week(year, week));
            }
        }

        if let Some(caps) = RE_MONTH.captures(s) {
            let year: i32 = caps[1].parse().unwrap();
            let month: u8 = caps[2].parse().unwrap();
            if (1..=12).contains(&month) {
                return Ok(Period::Month(year, month));
            }
        }

        if RE_DAY.is_match(s) {
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return Ok(Period::Day(date));
            }
        }

        Err(Error::PeriodParse(format!("unrecognized period: {s}")))
    }

    /// Convert to a canonical key string, used as the series label in reports.
    pub fn to_key(&self) -> String {
        match self {
            Period::Day(d) => d.format("%Y-%m-%d").to_string(),
            Period::Week(y, w) => format!("{y}-W{w:02}"),
            Period::Month(y, m) => format!("{y}-{m:02}"),
            Period::Quarter(y, q) => format!("{y}-Q{q}"),
            Period::Year(y) => format!("{y}"),
        }
    }

    /// Inclusive first and last day, or `None` when the period lies outside
    /// chrono's calendar range.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            Period::Day(d) => Some((*d, *d)),
            Period::Week(y, w) => {
                let start = NaiveDate::from_isoywd_opt(*y, *w as u32, Weekday::Mon)?;
                Some((start, start.checked_add_days(Days::new(6))?))
            }
            Period::Month(y, m) => Some((
                NaiveDate::from_ymd_opt(*y, *m as u32, 1)?,
                last_day_of_month(*y, *m as u32)?,
            )),
            Period::Quarter(y, q) => {
                let start_month = first_month_of_quarter(*q);
                Some((
                    NaiveDate::from_ymd_opt(*y, start_month, 1)?,
                    last_day_of_month(*y, start_month + 2)?,
                ))
            }
            Period::Year(y) => Some((
                NaiveDate::from_ymd_opt(*y, 1, 1)?,
                NaiveDate::from_ymd_opt(*y, 12, 31)?,
            )),
        }
    }

    /// Closed UTC window spanning the whole period.
    pub fn window(&self) -> Option<TimeWindow> {
        let (start, end) = self.date_range()?;
        Some(TimeWindow::from_dates(start, end))
    }

    /// The previous period of the same type.
    pub fn previous(&self) -> Option<Self> {
        self.shift_back(1)
    }

    /// The period of the same type `n` steps earlier, or `None` when that
    /// falls outside the calendar range.
    pub fn shift_back(&self, n: u32) -> Option<Self> {
        let shifted = match self {
            Period::Day(d) => Period::Day(d.checked_sub_days(Days::new(n as u64))?),
            Period::Week(..) => {
                let (start, _) = self.date_range()?;
                let start = start.checked_sub_signed(Duration::weeks(n as i64))?;
                Period::containing(Granularity::Week, start)
            }
            Period::Month(y, m) => {
                let (y, m) = months_back(*y, *m as u32, n)?;
                Period::Month(y, m as u8)
            }
            Period::Quarter(y, q) => {
                let (y, m) = months_back(*y, first_month_of_quarter(*q), n.checked_mul(3)?)?;
                Period::Quarter(y, ((m - 1) / 3 + 1) as u8)
            }
            Period::Year(y) => Period::Year(y.checked_sub(i32::try_from(n).ok()?)?),
        };
        shifted.date_range().map(|_| shifted)
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_key())
    }
}
