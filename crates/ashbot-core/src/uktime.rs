//! UK wall-clock helpers.
//!
//! The community runs on UK time: user-visible reminder times carry a
//! BST/GMT suffix and the clock-aligned sweeps fire on UK local time.
//! BST is in force from the last Sunday of March, 01:00 UTC, to the last
//! Sunday of October, 01:00 UTC.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday};

/// True when `instant` falls inside British Summer Time.
pub fn is_bst(instant: DateTime<Utc>) -> bool {
    let year = instant.year();
    let start = transition(year, 3);
    let end = transition(year, 10);
    instant >= start && instant < end
}

/// Timezone suffix for user-visible times.
pub fn tz_suffix(instant: DateTime<Utc>) -> &'static str {
    if is_bst(instant) {
        "BST"
    } else {
        "GMT"
    }
}

/// UTC offset of the UK clock at `instant`.
pub fn uk_offset(instant: DateTime<Utc>) -> Duration {
    if is_bst(instant) {
        Duration::hours(1)
    } else {
        Duration::zero()
    }
}

/// UK wall-clock time of a UTC instant.
pub fn to_uk_wall(instant: DateTime<Utc>) -> NaiveDateTime {
    (instant + uk_offset(instant)).naive_utc()
}

/// UTC instant of a UK wall-clock time.
///
/// Inside the one-hour transition windows this resolves using the offset in
/// force at the naive time read as UTC, which is the standard-time reading.
pub fn from_uk_wall(wall: NaiveDateTime) -> DateTime<Utc> {
    let guess = Utc.from_utc_datetime(&wall);
    guess - uk_offset(guess)
}

/// DST transition instant (01:00 UTC on the last Sunday of `month`).
fn transition(year: i32, month: u32) -> DateTime<Utc> {
    let day = last_sunday(year, month);
    Utc.with_ymd_and_hms(year, month, day, 1, 0, 0)
        .single()
        .expect("transition date is always valid")
}

/// Day-of-month of the last Sunday of the given month.
fn last_sunday(year: i32, month: u32) -> u32 {
    let last_day = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("month rollover is always valid")
    .pred_opt()
    .expect("previous day exists");

    let mut d = last_day;
    while d.weekday() != Weekday::Sun {
        d = d.pred_opt().expect("walking back within the month");
    }
    d.day()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_sundays_2025() {
        assert_eq!(last_sunday(2025, 3), 30);
        assert_eq!(last_sunday(2025, 10), 26);
    }

    #[test]
    fn january_is_gmt() {
        let t = Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap();
        assert!(!is_bst(t));
        assert_eq!(tz_suffix(t), "GMT");
        assert_eq!(to_uk_wall(t).format("%H:%M").to_string(), "10:00");
    }

    #[test]
    fn july_is_bst() {
        let t = Utc.with_ymd_and_hms(2025, 7, 15, 10, 0, 0).unwrap();
        assert!(is_bst(t));
        assert_eq!(tz_suffix(t), "BST");
        assert_eq!(to_uk_wall(t).format("%H:%M").to_string(), "11:00");
    }

    #[test]
    fn transition_boundaries() {
        // 2025-03-30 00:59 UTC is still GMT, 01:00 UTC is BST.
        let before = Utc.with_ymd_and_hms(2025, 3, 30, 0, 59, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2025, 3, 30, 1, 0, 0).unwrap();
        assert!(!is_bst(before));
        assert!(is_bst(after));
    }

    #[test]
    fn wall_round_trip_in_summer() {
        let t = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(from_uk_wall(to_uk_wall(t)), t);
    }
}
