use std::fmt;

use serde::{Deserialize, Serialize};

/// User authority hierarchy: streamer > creator > moderator > member > standard.
///
/// Governs both the AI persona addenda and command permissions. The streamer
/// and creator are configured identities; moderator is derived from the
/// platform's manage-messages permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserTier {
    Streamer,
    Creator,
    Moderator,
    Member,
    #[default]
    Standard,
}

impl UserTier {
    /// Operators may run privileged commands: the two configured identities
    /// plus anyone with the platform moderator permission.
    pub fn is_operator(&self) -> bool {
        matches!(self, UserTier::Streamer | UserTier::Creator | UserTier::Moderator)
    }
}

impl fmt::Display for UserTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserTier::Streamer => "streamer",
            UserTier::Creator => "creator",
            UserTier::Moderator => "moderator",
            UserTier::Member => "member",
            UserTier::Standard => "standard",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for UserTier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "streamer" => Ok(UserTier::Streamer),
            "creator" => Ok(UserTier::Creator),
            "moderator" => Ok(UserTier::Moderator),
            "member" => Ok(UserTier::Member),
            "standard" => Ok(UserTier::Standard),
            other => Err(format!("unknown tier: {}", other)),
        }
    }
}

/// Priority tier for outbound AI requests.
///
/// Assignment rules: trivia answers and direct operator interactions are
/// high; catalog questions and chat responses are medium; auto-actions and
/// background refreshes are low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPriority {
    High,
    Medium,
    Low,
}

impl RequestPriority {
    /// Minimum inter-request interval per user at this priority, in milliseconds.
    pub fn min_interval_ms(&self) -> u64 {
        match self {
            RequestPriority::High => 1_000,
            RequestPriority::Medium => 2_000,
            RequestPriority::Low => 3_000,
        }
    }
}

impl fmt::Display for RequestPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RequestPriority::High => "high",
            RequestPriority::Medium => "medium",
            RequestPriority::Low => "low",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_tiers() {
        assert!(UserTier::Streamer.is_operator());
        assert!(UserTier::Creator.is_operator());
        assert!(UserTier::Moderator.is_operator());
        assert!(!UserTier::Member.is_operator());
        assert!(!UserTier::Standard.is_operator());
    }

    #[test]
    fn tier_round_trips_through_str() {
        for tier in [
            UserTier::Streamer,
            UserTier::Creator,
            UserTier::Moderator,
            UserTier::Member,
            UserTier::Standard,
        ] {
            assert_eq!(tier.to_string().parse::<UserTier>().unwrap(), tier);
        }
    }

    #[test]
    fn priority_intervals() {
        assert_eq!(RequestPriority::High.min_interval_ms(), 1_000);
        assert_eq!(RequestPriority::Medium.min_interval_ms(), 2_000);
        assert_eq!(RequestPriority::Low.min_interval_ms(), 3_000);
    }
}
