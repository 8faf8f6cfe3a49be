//! Error-reply backpressure: repeated failures of the same kind to the same
//! user go quiet after the third occurrence within a minute.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

const WINDOW_SECS: i64 = 60;
const MAX_REPLIES: usize = 3;

#[derive(Default)]
pub struct ErrorThrottle {
    events: Mutex<HashMap<(u64, &'static str), Vec<DateTime<Utc>>>>,
}

impl ErrorThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error occurrence; returns whether a reply should be sent.
    pub fn should_reply(&self, user_id: u64, kind: &'static str, now: DateTime<Utc>) -> bool {
        let mut events = self.events.lock().unwrap();
        let entry = events.entry((user_id, kind)).or_default();
        entry.retain(|t| now - *t <= Duration::seconds(WINDOW_SECS));
        entry.push(now);
        entry.len() <= MAX_REPLIES
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn silences_after_third_in_window() {
        let throttle = ErrorThrottle::new();
        let t0 = Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap();

        assert!(throttle.should_reply(1, "INTERNAL_ERROR", t0));
        assert!(throttle.should_reply(1, "INTERNAL_ERROR", t0 + Duration::seconds(10)));
        assert!(throttle.should_reply(1, "INTERNAL_ERROR", t0 + Duration::seconds(20)));
        assert!(!throttle.should_reply(1, "INTERNAL_ERROR", t0 + Duration::seconds(30)));

        // A different error kind or user is unaffected.
        assert!(throttle.should_reply(1, "USER_INPUT", t0 + Duration::seconds(30)));
        assert!(throttle.should_reply(2, "INTERNAL_ERROR", t0 + Duration::seconds(30)));

        // The window slides: a minute later replies resume.
        assert!(throttle.should_reply(1, "INTERNAL_ERROR", t0 + Duration::seconds(95)));
    }
}
