use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};

use ashbot_core::uktime;

use crate::types::Cadence;

/// Compute the next execution time for `cadence` strictly after `from`.
pub fn compute_next_run(cadence: Cadence, from: DateTime<Utc>) -> DateTime<Utc> {
    match cadence {
        Cadence::Every { secs } => from + Duration::seconds(secs as i64),

        Cadence::WeeklyUk { weekday, hour, minute } => {
            // Work in UK wall-clock time so the slot tracks BST/GMT.
            let wall = uktime::to_uk_wall(from);
            let slot = NaiveTime::from_hms_opt(hour, minute, 0)
                .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).expect("midnight is valid"));

            let today_dow = wall.weekday().num_days_from_monday() as i64;
            let target_dow = weekday.num_days_from_monday() as i64;
            let mut days_ahead = (target_dow - today_dow).rem_euclid(7);

            // Same weekday: today only if the slot is still ahead.
            if days_ahead == 0 && wall.time() >= slot {
                days_ahead = 7;
            }

            let candidate = (wall.date() + Duration::days(days_ahead)).and_time(slot);
            uktime::from_uk_wall(candidate)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Weekday};

    #[test]
    fn interval_is_simple_offset() {
        let from = Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap();
        assert_eq!(
            compute_next_run(Cadence::Every { secs: 30 }, from),
            from + Duration::seconds(30)
        );
    }

    #[test]
    fn weekly_from_midweek() {
        // Wednesday 2025-01-15 → next Sunday 12:00 UK (GMT in January).
        let from = Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap();
        let next = compute_next_run(
            Cadence::WeeklyUk { weekday: Weekday::Sun, hour: 12, minute: 0 },
            from,
        );
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 19, 12, 0, 0).unwrap());
    }

    #[test]
    fn weekly_same_day_before_slot() {
        // Sunday morning → same day at noon.
        let from = Utc.with_ymd_and_hms(2025, 1, 19, 9, 0, 0).unwrap();
        let next = compute_next_run(
            Cadence::WeeklyUk { weekday: Weekday::Sun, hour: 12, minute: 0 },
            from,
        );
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 19, 12, 0, 0).unwrap());
    }

    #[test]
    fn weekly_same_day_after_slot_pushes_a_week() {
        let from = Utc.with_ymd_and_hms(2025, 1, 19, 13, 0, 0).unwrap();
        let next = compute_next_run(
            Cadence::WeeklyUk { weekday: Weekday::Sun, hour: 12, minute: 0 },
            from,
        );
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 26, 12, 0, 0).unwrap());
    }

    #[test]
    fn weekly_slot_tracks_bst() {
        // In July, Monday 09:00 UK is 08:00 UTC.
        let from = Utc.with_ymd_and_hms(2025, 7, 2, 10, 0, 0).unwrap();
        let next = compute_next_run(
            Cadence::WeeklyUk { weekday: Weekday::Mon, hour: 9, minute: 0 },
            from,
        );
        assert_eq!(next, Utc.with_ymd_and_hms(2025, 7, 7, 8, 0, 0).unwrap());
    }
}
