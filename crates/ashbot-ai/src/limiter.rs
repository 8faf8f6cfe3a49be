//! Priority-tiered request pacing with progressive cooldowns.
//!
//! Per-user minimum intervals depend on the request priority (1 s / 2 s /
//! 3 s). Denials escalate a per-user cooldown ladder (30 s → 60 s → 120 s →
//! 300 s) that decays with sustained compliance. A global requests-per-
//! minute window protects the provider quota independently of any one user.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use tracing::debug;

use ashbot_core::types::RequestPriority;

/// Offense count decays by one per this many compliant minutes.
const OFFENSE_DECAY_MINS: i64 = 10;

/// Cooldown ladder by offense count (1st, 2nd, 3rd, persistent).
fn cooldown_for(offenses: u32) -> Duration {
    match offenses {
        0 | 1 => Duration::seconds(30),
        2 => Duration::seconds(60),
        3 => Duration::seconds(120),
        _ => Duration::seconds(300),
    }
}

/// Outcome of a limiter check. Denials carry no side effects beyond the
/// offense bookkeeping — no request is recorded and no quota is charged.
#[derive(Debug, Clone, PartialEq)]
pub enum RateDecision {
    Allow,
    Deny {
        reason: &'static str,
        retry_after: Duration,
    },
}

#[derive(Debug, Default)]
struct UserState {
    last_request: HashMap<RequestPriority, DateTime<Utc>>,
    offenses: u32,
    cooldown_until: Option<DateTime<Utc>>,
    /// Watermark for offense decay.
    last_offense_at: Option<DateTime<Utc>>,
}

struct GlobalWindow {
    window_start: DateTime<Utc>,
    count: u32,
}

pub struct RateLimiter {
    users: DashMap<u64, UserState>,
    global: Mutex<GlobalWindow>,
    /// Requests per minute across all users.
    global_limit: u32,
}

impl RateLimiter {
    pub fn new(global_limit: u32, start: DateTime<Utc>) -> Self {
        Self {
            users: DashMap::new(),
            global: Mutex::new(GlobalWindow {
                window_start: start,
                count: 0,
            }),
            global_limit,
        }
    }

    /// Check whether `user_id` may issue a request at `priority`.
    pub fn check(&self, user_id: u64, priority: RequestPriority, now: DateTime<Utc>) -> RateDecision {
        let mut user = self.users.entry(user_id).or_default();

        // Compliance decay: each full decay period since the last offense
        // forgives one offense.
        if user.offenses > 0 {
            if let Some(last) = user.last_offense_at {
                let lapsed = (now - last).num_minutes() / OFFENSE_DECAY_MINS;
                if lapsed > 0 {
                    user.offenses = user.offenses.saturating_sub(lapsed as u32);
                    user.last_offense_at = Some(now);
                    debug!(user_id, offenses = user.offenses, "rate-limit offenses decayed");
                }
            }
        }

        if let Some(until) = user.cooldown_until {
            if now < until {
                return RateDecision::Deny {
                    reason: "cooldown active",
                    retry_after: until - now,
                };
            }
            user.cooldown_until = None;
        }

        // Global provider window, checked before the per-user interval so a
        // saturated quota denies even compliant users.
        {
            let mut global = self.global.lock().unwrap();
            if now - global.window_start >= Duration::minutes(1) {
                // Window start only moves forward.
                global.window_start = now;
                global.count = 0;
            }
            if global.count >= self.global_limit {
                let reset = global.window_start + Duration::minutes(1);
                return RateDecision::Deny {
                    reason: "global quota exceeded",
                    retry_after: reset - now,
                };
            }
        }

        let min_interval = Duration::milliseconds(priority.min_interval_ms() as i64);
        if let Some(last) = user.last_request.get(&priority) {
            if now - *last < min_interval {
                user.offenses += 1;
                user.last_offense_at = Some(now);
                let cooldown = cooldown_for(user.offenses);
                user.cooldown_until = Some(now + cooldown);
                debug!(
                    user_id,
                    offenses = user.offenses,
                    cooldown_secs = cooldown.num_seconds(),
                    "rate-limit cooldown applied"
                );
                return RateDecision::Deny {
                    reason: "too many requests",
                    retry_after: cooldown,
                };
            }
        }

        // Allowed: record the request and charge the global window.
        user.last_request.insert(priority, now);
        let mut global = self.global.lock().unwrap();
        global.count += 1;
        RateDecision::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap()
    }

    fn assert_denied(decision: RateDecision, expected_retry_secs: i64) {
        match decision {
            RateDecision::Deny { retry_after, .. } => {
                assert_eq!(retry_after.num_seconds(), expected_retry_secs);
            }
            RateDecision::Allow => panic!("expected deny"),
        }
    }

    #[test]
    fn per_priority_intervals() {
        let limiter = RateLimiter::new(1_000, t0());
        assert_eq!(limiter.check(1, RequestPriority::High, t0()), RateDecision::Allow);
        // 1.0 s later a high-priority request passes again.
        assert_eq!(
            limiter.check(1, RequestPriority::High, t0() + Duration::seconds(1)),
            RateDecision::Allow
        );

        assert_eq!(limiter.check(2, RequestPriority::Low, t0()), RateDecision::Allow);
        // Low priority needs 3.0 s; 2 s is too soon.
        assert!(matches!(
            limiter.check(2, RequestPriority::Low, t0() + Duration::seconds(2)),
            RateDecision::Deny { .. }
        ));
    }

    #[test]
    fn progressive_cooldown_ladder() {
        let limiter = RateLimiter::new(1_000, t0());
        let mut now = t0();
        assert_eq!(limiter.check(1, RequestPriority::Medium, now), RateDecision::Allow);

        // 1st offense: 30 s cooldown.
        now += Duration::milliseconds(100);
        assert_denied(limiter.check(1, RequestPriority::Medium, now), 30);

        // 2nd offense after the cooldown lapses: 60 s.
        now += Duration::seconds(31);
        assert_eq!(limiter.check(1, RequestPriority::Medium, now), RateDecision::Allow);
        now += Duration::milliseconds(100);
        assert_denied(limiter.check(1, RequestPriority::Medium, now), 60);

        // 3rd offense: 120 s.
        now += Duration::seconds(61);
        assert_eq!(limiter.check(1, RequestPriority::Medium, now), RateDecision::Allow);
        now += Duration::milliseconds(100);
        assert_denied(limiter.check(1, RequestPriority::Medium, now), 120);

        // 4th and later: 300 s.
        now += Duration::seconds(121);
        assert_eq!(limiter.check(1, RequestPriority::Medium, now), RateDecision::Allow);
        now += Duration::milliseconds(100);
        assert_denied(limiter.check(1, RequestPriority::Medium, now), 300);
    }

    #[test]
    fn offenses_decay_with_compliance() {
        let limiter = RateLimiter::new(1_000, t0());
        let mut now = t0();
        assert_eq!(limiter.check(1, RequestPriority::Medium, now), RateDecision::Allow);
        now += Duration::milliseconds(100);
        assert_denied(limiter.check(1, RequestPriority::Medium, now), 30);

        // 20 minutes of silence forgives the offense; the next violation is
        // treated as a first offense again.
        now += Duration::minutes(20);
        assert_eq!(limiter.check(1, RequestPriority::Medium, now), RateDecision::Allow);
        now += Duration::milliseconds(100);
        assert_denied(limiter.check(1, RequestPriority::Medium, now), 30);
    }

    #[test]
    fn global_window_denies_compliant_users() {
        let limiter = RateLimiter::new(2, t0());
        assert_eq!(limiter.check(1, RequestPriority::High, t0()), RateDecision::Allow);
        assert_eq!(limiter.check(2, RequestPriority::High, t0()), RateDecision::Allow);

        // Third user is clean but the window is spent.
        let decision = limiter.check(3, RequestPriority::High, t0() + Duration::seconds(10));
        match decision {
            RateDecision::Deny { reason, retry_after } => {
                assert_eq!(reason, "global quota exceeded");
                assert_eq!(retry_after.num_seconds(), 50);
            }
            RateDecision::Allow => panic!("expected deny"),
        }

        // A new window admits requests again.
        assert_eq!(
            limiter.check(3, RequestPriority::High, t0() + Duration::seconds(61)),
            RateDecision::Allow
        );
    }

    #[test]
    fn separate_users_do_not_interfere() {
        let limiter = RateLimiter::new(1_000, t0());
        assert_eq!(limiter.check(1, RequestPriority::High, t0()), RateDecision::Allow);
        assert_eq!(limiter.check(2, RequestPriority::High, t0()), RateDecision::Allow);
    }
}
