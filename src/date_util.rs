use chrono::{Datelike, NaiveDate};

/// Last day of a month, or `None` outside chrono's calendar range.
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

/// Get the quarter (1-4) for a given date.
pub fn quarter_of(d: NaiveDate) -> u8 {
    ((d.month() - 1) / 3 + 1) as u8
}

/// First calendar month (1, 4, 7 or 10) of a quarter.
pub fn first_month_of_quarter(quarter: u8) -> u32 {
    (quarter as u32 - 1) * 3 + 1
}

/// Step a (year, month) pair back by `n` months. `None` when the result
/// does not fit in an `i32` year.
pub fn months_back(year: i32, month: u32, n: u32) -> Option<(i32, u32)> {
    let index = year.checked_mul(12)?.checked_add(month as i32 - 1)?;
    let index = index.checked_sub(i32::try_from(n).ok()?)?;
    Some((index.div_euclid(12), index.rem_euclid(12) as u32 + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(last_day_of_month(2025, 1), Some(date(2025, 1, 31)));
        assert_eq!(last_day_of_month(2025, 2), Some(date(2025, 2, 28)));
        assert_eq!(last_day_of_month(2024, 2), Some(date(2024, 2, 29))); // Leap year
        assert_eq!(last_day_of_month(2025, 12), Some(date(2025, 12, 31)));
    }

    #[test]
    fn test_last_day_of_month_out_of_range() {
        assert_eq!(last_day_of_month(i32::MAX, 12), None);
        assert_eq!(last_day_of_month(-400_000, 6), None);
    }

    #[test]
    fn test_quarter_of() {
        assert_eq!(quarter_of(date(2025, 1, 15)), 1);
        assert_eq!(quarter_of(date(2025, 3, 31)), 1);
        assert_eq!(quarter_of(date(2025, 4, 1)), 2);
        assert_eq!(quarter_of(date(2025, 6, 30)), 2);
        assert_eq!(quarter_of(date(2025, 7, 1)), 3);
        assert_eq!(quarter_of(date(2025, 12, 31)), 4);
    }

    #[test]
    fn test_first_month_of_quarter() {
        assert_eq!(first_month_of_quarter(1), 1);
        assert_eq!(first_month_of_quarter(2), 4);
        assert_eq!(first_month_of_quarter(3), 7);
        assert_eq!(first_month_of_quarter(4), 10);
    }

    #[test]
    fn test_months_back() {
        assert_eq!(months_back(2026, 10, 0), Some((2026, 10)));
        assert_eq!(months_back(2026, 10, 9), Some((2026, 1)));
        assert_eq!(months_back(2026, 10, 10), Some((2025, 12)));
        assert_eq!(months_back(2026, 1, 25), Some((2023, 12)));
    }

    #[test]
    fn test_months_back_overflow() {
        assert_eq!(months_back(2026, 10, u32::MAX), None);
        assert_eq!(months_back(i32::MIN / 12, 1, 1), None);
    }
}
