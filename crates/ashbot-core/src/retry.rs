//! Per-service retry policies.
//!
//! Every external call site takes an explicit policy object instead of
//! open-coding sleep loops. Backoff is exponential from `base_delay`,
//! clamped to `max_delay`; `retriable_codes` lists the upstream HTTP
//! statuses worth retrying (transport failures always retry).

use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total tries, including the initial attempt.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// HTTP statuses that warrant a retry. Everything else — notably the
    /// 4xx family — fails immediately.
    pub retriable_codes: &'static [u16],
}

impl RetryPolicy {
    /// Platform sends: three retries at 1 s, 2 s, 4 s. No retry on 4xx,
    /// including rate limits — the platform client handles those itself.
    pub fn platform_send() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            retriable_codes: &[500, 502, 503, 504],
        }
    }

    /// Metadata lookups: fail fast, the ingestor degrades per record.
    pub fn metadata_lookup() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(1),
            retriable_codes: &[429, 500, 502, 503, 504],
        }
    }

    /// Video/stream page fetches.
    pub fn media_source() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            retriable_codes: &[429, 500, 502, 503, 504],
        }
    }

    /// Delay before retry `attempt` (0-based). `None` once attempts are spent.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt + 1 >= self.max_attempts {
            return None;
        }
        let factor = 2u32.saturating_pow(attempt);
        Some(self.base_delay.saturating_mul(factor).min(self.max_delay))
    }

    /// Whether an upstream HTTP status is worth retrying under this policy.
    pub fn is_retriable_status(&self, status: u16) -> bool {
        self.retriable_codes.contains(&status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_send_backoff_ladder() {
        let p = RetryPolicy::platform_send();
        assert_eq!(p.delay_for(0), Some(Duration::from_secs(1)));
        assert_eq!(p.delay_for(1), Some(Duration::from_secs(2)));
        assert_eq!(p.delay_for(2), Some(Duration::from_secs(4)));
        // Fourth attempt is the last; no further delay.
        assert_eq!(p.delay_for(3), None);
    }

    #[test]
    fn metadata_ladder_reaches_its_cap() {
        let p = RetryPolicy::metadata_lookup();
        assert_eq!(p.delay_for(0), Some(Duration::from_millis(500)));
        assert_eq!(p.delay_for(1), Some(Duration::from_secs(1)));
        assert_eq!(p.delay_for(2), None);
    }

    #[test]
    fn delay_clamps_to_max() {
        let p = RetryPolicy {
            max_attempts: 6,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(4),
            retriable_codes: &[],
        };
        assert_eq!(p.delay_for(4), Some(Duration::from_secs(4)));
    }

    #[test]
    fn retriable_codes_gate_by_service() {
        let platform = RetryPolicy::platform_send();
        assert!(platform.is_retriable_status(503));
        assert!(!platform.is_retriable_status(404));
        assert!(!platform.is_retriable_status(429));

        let metadata = RetryPolicy::metadata_lookup();
        assert!(metadata.is_retriable_status(429));
        assert!(!metadata.is_retriable_status(400));
    }
}
