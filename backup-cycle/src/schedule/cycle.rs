//! Decides which kind of backup runs on a given day and where its anchor is.

use super::calendar::{days_from_date, weekday_of};
use chrono::NaiveDate;
use std::fmt;

/// Kind of backup set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BackupKind {
    Full,
    Incremental,
}

impl BackupKind {
    /// Directory name suffix for sets of this kind.
    pub fn suffix(self) -> &'static str {
        match self {
            BackupKind::Full => "full",
            BackupKind::Incremental => "incr",
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupKind::Full => f.write_str("full"),
            BackupKind::Incremental => f.write_str("incremental"),
        }
    }
}

/// Full on the configured weekday, incremental on every other day.
pub fn resolve_today(today: NaiveDate, full_weekday: u32) -> BackupKind {
    debug_assert!((1..=7).contains(&full_weekday));
    if weekday_of(today) == full_weekday {
        BackupKind::Full
    } else {
        BackupKind::Incremental
    }
}

/// Most recent date on or before `today` that falls on `full_weekday`.
pub fn anchor_full_date(today: NaiveDate, full_weekday: u32) -> NaiveDate {
    debug_assert!((1..=7).contains(&full_weekday));
    let diff = (i64::from(weekday_of(today)) - i64::from(full_weekday)).rem_euclid(7);
    days_from_date(today, -diff)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_full_day_anchors_on_itself() {
        // 2024-05-02 is a Thursday
        let today = date(2024, 5, 2);
        assert_eq!(resolve_today(today, 4), BackupKind::Full);
        assert_eq!(anchor_full_date(today, 4), today);
    }

    #[test]
    fn test_monday_after_thursday_full() {
        let today = date(2024, 5, 6);
        assert_eq!(resolve_today(today, 4), BackupKind::Incremental);
        assert_eq!(anchor_full_date(today, 4), date(2024, 5, 2));
    }

    #[test]
    fn test_anchor_wraps_to_previous_week() {
        // Sunday full, Saturday run anchors six days back
        let saturday = date(2024, 5, 11);
        assert_eq!(anchor_full_date(saturday, 7), date(2024, 5, 5));
        // Monday full, Sunday run
        assert_eq!(anchor_full_date(date(2024, 5, 5), 1), date(2024, 4, 29));
    }

    #[test]
    fn test_anchor_properties_hold_for_every_weekday() {
        let start = date(2023, 12, 20);
        for offset in 0..400 {
            let today = days_from_date(start, offset);
            for full_weekday in 1..=7 {
                let anchor = anchor_full_date(today, full_weekday);
                assert_eq!(weekday_of(anchor), full_weekday);
                assert!(anchor <= today);
                assert!((today - anchor).num_days() < 7);
            }
        }
    }

    #[test]
    fn test_exactly_one_full_per_week() {
        let start = date(2024, 1, 1);
        for full_weekday in 1..=7 {
            let fulls = (0..7)
                .map(|offset| resolve_today(days_from_date(start, offset), full_weekday))
                .filter(|kind| *kind == BackupKind::Full)
                .count();
            assert_eq!(fulls, 1);
        }
    }
}
