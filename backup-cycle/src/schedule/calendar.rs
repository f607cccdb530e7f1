//! Calendar arithmetic on local dates.

use chrono::{Datelike, Days, Local, NaiveDate};

/// Today's date in the host's local calendar.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// The date `n` days before today.
pub fn days_ago(n: u64) -> NaiveDate {
    days_from_date(today(), -(n as i64))
}

/// Shift `date` by `delta` days, forwards or backwards.
pub fn days_from_date(date: NaiveDate, delta: i64) -> NaiveDate {
    let shifted = if delta >= 0 {
        date.checked_add_days(Days::new(delta as u64))
    } else {
        date.checked_sub_days(Days::new(delta.unsigned_abs()))
    };
    debug_assert!(shifted.is_some(), "date {date} shifted by {delta} days is out of range");
    shifted.unwrap_or(date)
}

/// The date `weeks` whole weeks before `date`.
pub fn weeks_ago_from_date(date: NaiveDate, weeks: u32) -> NaiveDate {
    days_from_date(date, -7 * i64::from(weeks))
}

/// ISO day of week, 1 = Monday .. 7 = Sunday.
pub fn weekday_of(date: NaiveDate) -> u32 {
    date.weekday().number_from_monday()
}

/// Compact `YYYYMMDD` form used in backup set names.
pub fn compact(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_from_date_crosses_month_and_year() {
        assert_eq!(days_from_date(date(2024, 2, 28), 2), date(2024, 3, 1));
        assert_eq!(days_from_date(date(2025, 1, 3), -5), date(2024, 12, 29));
        assert_eq!(days_from_date(date(2025, 1, 3), 0), date(2025, 1, 3));
    }

    #[test]
    fn test_weeks_ago_from_date() {
        assert_eq!(weeks_ago_from_date(date(2024, 5, 2), 2), date(2024, 4, 18));
        assert_eq!(weeks_ago_from_date(date(2024, 1, 4), 1), date(2023, 12, 28));
    }

    #[test]
    fn test_weekday_of_is_monday_based() {
        assert_eq!(weekday_of(date(2024, 4, 29)), 1); // Monday
        assert_eq!(weekday_of(date(2024, 5, 2)), 4); // Thursday
        assert_eq!(weekday_of(date(2024, 5, 5)), 7); // Sunday
    }

    #[test]
    fn test_days_ago_relative_to_today() {
        assert_eq!(days_ago(0), today());
        assert_eq!(days_from_date(days_ago(3), 3), today());
    }

    #[test]
    fn test_compact_format() {
        assert_eq!(compact(date(2024, 5, 2)), "20240502");
    }
}
