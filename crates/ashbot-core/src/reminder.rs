//! Reminder data model, duration parsing, and user-visible time formatting.
//!
//! Natural-language reminder parsing lives with the message handlers; the
//! pieces here are shared between command handling, the delivery sweep, and
//! confirmation messages.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::uktime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryKind {
    DirectMessage,
    Channel,
}

impl fmt::Display for DeliveryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryKind::DirectMessage => write!(f, "direct_message"),
            DeliveryKind::Channel => write!(f, "channel"),
        }
    }
}

impl std::str::FromStr for DeliveryKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "direct_message" => Ok(DeliveryKind::DirectMessage),
            "channel" => Ok(DeliveryKind::Channel),
            other => Err(format!("unknown delivery kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Pending,
    Delivered,
    Cancelled,
    Failed,
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReminderStatus::Pending => "pending",
            ReminderStatus::Delivered => "delivered",
            ReminderStatus::Cancelled => "cancelled",
            ReminderStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ReminderStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReminderStatus::Pending),
            "delivered" => Ok(ReminderStatus::Delivered),
            "cancelled" => Ok(ReminderStatus::Cancelled),
            "failed" => Ok(ReminderStatus::Failed),
            other => Err(format!("unknown reminder status: {}", other)),
        }
    }
}

/// Action executed when the reminder fires and no operator responds within
/// the five-minute grace window.
///
/// Stored as a JSON string in the `reminders.auto_action` column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AutoAction {
    Mute,
    Kick,
    Ban,
    /// Posts the payload URL to the designated channel on behalf of the
    /// reminder's originator.
    YoutubePost { url: String },
}

impl AutoAction {
    /// Parse the `auto:<action>` command suffix.
    pub fn parse_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_lowercase().as_str() {
            "mute" => Some(AutoAction::Mute),
            "kick" => Some(AutoAction::Kick),
            "ban" => Some(AutoAction::Ban),
            _ => None,
        }
    }
}

/// A scheduled reminder row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    /// Target user.
    pub user_id: u64,
    pub text: String,
    pub scheduled_at: DateTime<Utc>,
    pub delivery: DeliveryKind,
    /// Required iff `delivery` is `Channel`.
    pub channel_id: Option<u64>,
    pub status: ReminderStatus,
    pub auto_action: Option<AutoAction>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

/// Parse a concatenated duration such as `2m`, `1h30m`, or `2d5h`.
///
/// Units are `s`, `m`, `h`, `d`; the whole input must be consumed by
/// integer-unit pairs. Returns `None` on anything else, including an empty
/// string or a zero total.
pub fn parse_duration(input: &str) -> Option<Duration> {
    let mut total: i64 = 0;
    let mut digits = String::new();
    let mut pairs = 0;

    for c in input.trim().chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        if digits.is_empty() {
            return None;
        }
        let amount: i64 = digits.parse().ok()?;
        digits.clear();
        let unit_secs = match c.to_ascii_lowercase() {
            's' => 1,
            'm' => 60,
            'h' => 3_600,
            'd' => 86_400,
            _ => return None,
        };
        total = total.checked_add(amount.checked_mul(unit_secs)?)?;
        pairs += 1;
    }

    // Trailing digits without a unit are malformed.
    if !digits.is_empty() || pairs == 0 || total == 0 {
        return None;
    }
    Some(Duration::seconds(total))
}

/// Render a duration as `"1 hour 30 minutes"`, with singular/plural handled.
///
/// Sub-minute durations round to `"1 minute"` at 30 seconds and above,
/// otherwise `"less than a minute"`.
pub fn format_duration(d: Duration) -> String {
    let total = d.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(plural(days, "day"));
    }
    if hours > 0 {
        parts.push(plural(hours, "hour"));
    }
    if minutes > 0 {
        parts.push(plural(minutes, "minute"));
    }
    if parts.is_empty() {
        return if seconds >= 30 {
            "1 minute".to_string()
        } else {
            "less than a minute".to_string()
        };
    }
    if days == 0 && hours == 0 && seconds > 0 {
        parts.push(plural(seconds, "second"));
    }
    parts.join(" ")
}

/// Format a scheduled instant for the user: relative lead-in plus a 12-hour
/// UK clock time with a BST/GMT suffix, e.g. `"in 2 minutes at 10:02 AM GMT"`.
pub fn format_reminder_time(scheduled: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let wall = uktime::to_uk_wall(scheduled);
    let clock = format!(
        "{} {}",
        wall.format("%I:%M %p"),
        uktime::tz_suffix(scheduled)
    );

    let diff = scheduled - now;
    let days = diff.num_days();
    if days > 0 {
        if days == 1 {
            return format!("tomorrow at {}", clock);
        }
        let date = wall.format("%B %d");
        return format!("in {} days at {} on {}", days, clock, date);
    }

    format!("in {} at {}", format_duration(diff), clock)
}

/// Reject reminder text that carries no actionable content: under three
/// characters, a bare `test`, pure punctuation, pure digits, or a single
/// letter. The upper bound is the platform message limit.
pub fn validate_reminder_text(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.len() < 3 || trimmed.len() > 2_000 {
        return false;
    }
    if trimmed.eq_ignore_ascii_case("test") {
        return false;
    }
    if trimmed.chars().all(|c| matches!(c, '.' | '!' | '?')) {
        return false;
    }
    if trimmed.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let letters: Vec<char> = trimmed.chars().filter(|c| !c.is_whitespace()).collect();
    if letters.len() == 1 {
        return false;
    }
    true
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_then_format_round_trip() {
        let d = parse_duration("1h30m").unwrap();
        assert_eq!(format_duration(d), "1 hour 30 minutes");
    }

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("2m").unwrap(), Duration::minutes(2));
        assert_eq!(parse_duration("90s").unwrap(), Duration::seconds(90));
        assert_eq!(parse_duration("2d5h").unwrap(), Duration::hours(53));
    }

    #[test]
    fn parse_duration_rejects_garbage() {
        assert!(parse_duration("").is_none());
        assert!(parse_duration("h").is_none());
        assert!(parse_duration("12").is_none());
        assert!(parse_duration("5x").is_none());
        assert!(parse_duration("0m").is_none());
    }

    #[test]
    fn format_duration_singulars() {
        assert_eq!(format_duration(Duration::minutes(1)), "1 minute");
        assert_eq!(format_duration(Duration::minutes(2)), "2 minutes");
        assert_eq!(format_duration(Duration::hours(1)), "1 hour");
        assert_eq!(format_duration(Duration::seconds(45)), "1 minute");
        assert_eq!(format_duration(Duration::seconds(10)), "less than a minute");
        assert_eq!(format_duration(Duration::seconds(90)), "1 minute 30 seconds");
    }

    #[test]
    fn reminder_time_winter_gmt() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap();
        let sched = now + Duration::minutes(2);
        assert_eq!(
            format_reminder_time(sched, now),
            "in 2 minutes at 10:02 AM GMT"
        );
    }

    #[test]
    fn reminder_time_summer_bst() {
        let now = Utc.with_ymd_and_hms(2025, 7, 1, 16, 0, 0).unwrap();
        let sched = now + Duration::hours(1);
        assert_eq!(format_reminder_time(sched, now), "in 1 hour at 06:00 PM BST");
    }

    #[test]
    fn reminder_time_tomorrow() {
        let now = Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap();
        let sched = now + Duration::days(1);
        assert_eq!(
            format_reminder_time(sched, now),
            "tomorrow at 10:00 AM GMT"
        );
    }

    #[test]
    fn text_validation_boundaries() {
        assert!(validate_reminder_text("abc"));
        assert!(!validate_reminder_text("ab"));
        assert!(!validate_reminder_text("   "));
        assert!(!validate_reminder_text("!!!"));
        assert!(!validate_reminder_text("12345"));
        assert!(!validate_reminder_text("x"));
        assert!(!validate_reminder_text("test"));
        assert!(validate_reminder_text("check the stream"));
    }

    #[test]
    fn auto_action_tags() {
        assert_eq!(AutoAction::parse_tag("mute"), Some(AutoAction::Mute));
        assert_eq!(AutoAction::parse_tag("KICK"), Some(AutoAction::Kick));
        assert_eq!(AutoAction::parse_tag("ban"), Some(AutoAction::Ban));
        assert_eq!(AutoAction::parse_tag("nuke"), None);
    }
}
