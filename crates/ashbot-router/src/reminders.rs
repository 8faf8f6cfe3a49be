//! Natural-language reminder parsing.
//!
//! Times are interpreted on the UK clock: "at 10.47" means 10:47 UK wall
//! time today if still ahead, otherwise tomorrow. The mention format
//! (`@user 1h30m text`) is handled by the `!remind` command; this module
//! covers the free-text family.

use chrono::{DateTime, Duration, NaiveTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use ashbot_core::uktime;

/// A successfully parsed natural-language reminder.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReminder {
    pub text: String,
    pub scheduled_at: DateTime<Utc>,
}

static RELATIVE_MINUTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bin\s+(\d+)\s*(?:minute|min|m)s?\b").unwrap());
static RELATIVE_HOURS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bin\s+(\d+)\s*(?:hour|hr|h)s?\b").unwrap());
static RELATIVE_SECONDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bin\s+(\d+)\s*(?:second|sec|s)s?\b").unwrap());
static RELATIVE_DAYS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bin\s+(\d+)\s*(?:day|d)s?\b").unwrap());

static AT_12H: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bat\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)\b").unwrap());
static AT_DOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bat\s+(\d{1,2})\.(\d{2})\s*(am|pm)?\b").unwrap());
static AT_24H: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bat\s+(\d{1,2})(?::(\d{2}))?\b").unwrap());

static FOR_PM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bfor\s+(\d{1,2})(?::(\d{2}))?\s*pm\b").unwrap());

static TOMORROW_AT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\btomorrow\s+(?:at\s+)?(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b").unwrap()
});
static TOMORROW: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\btomorrow\b").unwrap());

static SIX_PM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bat\s+(?:six\s*pm|18:00|1800)\b").unwrap());

/// Command-prefix noise around the reminder text.
static COMMAND_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:(?:ash\s+)?remind\s+me\s+(?:to\s+|of\s+|at\s+|in\s+)?|(?:set|create|schedule)\s+(?:a\s+)?remind(?:er)?\s+(?:for\s+|to\s+|of\s+)?)",
    )
    .unwrap()
});
static LEADING_CONNECTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:to\s+|of\s+|about\s+|that\s+)").unwrap());

/// True when the text looks like a reminder request at all (used by the
/// router's natural-language command rule).
pub fn looks_like_reminder(text: &str) -> bool {
    static INTENT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)^(?:ash\s+)?(?:remind\s+me\b|(?:set|create|schedule)\s+(?:a\s+)?remind(?:er)?\b)")
            .unwrap()
    });
    INTENT.is_match(text.trim())
}

/// Parse a free-text reminder request. Patterns run in order; the first hit
/// fixes the time and is cut from the reminder text. With no time phrase
/// the reminder defaults to one hour out.
pub fn parse_natural_reminder(content: &str, now: DateTime<Utc>) -> ParsedReminder {
    let uk_now = uktime::to_uk_wall(now);
    let mut remaining = content.trim().to_string();
    let mut scheduled: Option<DateTime<Utc>> = None;

    // Order matters: "tomorrow at 2pm" must not be read as a plain "at 2pm",
    // and specific phrasings come before the bare 24-hour form.
    let matchers: Vec<(&Lazy<Regex>, MatchKind)> = vec![
        (&RELATIVE_MINUTES, MatchKind::Minutes),
        (&RELATIVE_HOURS, MatchKind::Hours),
        (&RELATIVE_SECONDS, MatchKind::Seconds),
        (&RELATIVE_DAYS, MatchKind::Days),
        (&SIX_PM, MatchKind::SixPm),
        (&TOMORROW_AT, MatchKind::TomorrowAt),
        (&AT_12H, MatchKind::At12h),
        (&AT_DOT, MatchKind::AtDot),
        (&FOR_PM, MatchKind::ForPm),
        (&TOMORROW, MatchKind::Tomorrow),
        (&AT_24H, MatchKind::At24h),
    ];

    for (re, kind) in matchers {
        let Some(cap) = re.captures(&remaining) else {
            continue;
        };
        let whole = cap.get(0).map(|m| m.as_str().to_string()).unwrap_or_default();

        let resolved = match kind {
            MatchKind::Minutes => group_int(&cap, 1).map(|n| now + Duration::minutes(n)),
            MatchKind::Hours => group_int(&cap, 1).map(|n| now + Duration::hours(n)),
            MatchKind::Seconds => group_int(&cap, 1).map(|n| now + Duration::seconds(n)),
            MatchKind::Days => group_int(&cap, 1).map(|n| now + Duration::days(n)),
            MatchKind::SixPm => at_uk_time(uk_now, 18, 0),
            MatchKind::At12h => {
                let hour = group_int(&cap, 1).unwrap_or(0) as u32;
                let minute = group_int(&cap, 2).unwrap_or(0) as u32;
                let pm = cap.get(3).map(|m| m.as_str().eq_ignore_ascii_case("pm"));
                twelve_hour(hour, pm).and_then(|h| at_uk_time(uk_now, h, minute))
            }
            MatchKind::AtDot => {
                let hour = group_int(&cap, 1).unwrap_or(0) as u32;
                let minute = group_int(&cap, 2).unwrap_or(0) as u32;
                let pm = cap.get(3).map(|m| m.as_str().eq_ignore_ascii_case("pm"));
                match pm {
                    Some(_) => twelve_hour(hour, pm).and_then(|h| at_uk_time(uk_now, h, minute)),
                    // No suffix: 24-hour reading.
                    None => at_uk_time(uk_now, hour, minute),
                }
            }
            MatchKind::ForPm => {
                let hour = group_int(&cap, 1).unwrap_or(0) as u32;
                let minute = group_int(&cap, 2).unwrap_or(0) as u32;
                twelve_hour(hour, Some(true)).and_then(|h| at_uk_time(uk_now, h, minute))
            }
            MatchKind::TomorrowAt => {
                let hour = group_int(&cap, 1).unwrap_or(9) as u32;
                let minute = group_int(&cap, 2).unwrap_or(0) as u32;
                let pm = cap.get(3).map(|m| m.as_str().eq_ignore_ascii_case("pm"));
                let hour = match pm {
                    Some(_) => twelve_hour(hour, pm),
                    None => Some(hour),
                };
                hour.and_then(|h| tomorrow_uk_time(uk_now, h, minute))
            }
            MatchKind::Tomorrow => tomorrow_uk_time(uk_now, 9, 0),
            MatchKind::At24h => {
                let hour = group_int(&cap, 1).unwrap_or(0) as u32;
                if hour > 23 {
                    continue;
                }
                let minute = group_int(&cap, 2).unwrap_or(0) as u32;
                at_uk_time(uk_now, hour, minute)
            }
        };

        if let Some(at) = resolved {
            scheduled = Some(at);
            remaining = remaining.replace(&whole, " ");
            break;
        }
    }

    let text = clean_reminder_text(&remaining);
    ParsedReminder {
        text,
        scheduled_at: scheduled.unwrap_or_else(|| now + Duration::hours(1)),
    }
}

enum MatchKind {
    Minutes,
    Hours,
    Seconds,
    Days,
    SixPm,
    At12h,
    AtDot,
    ForPm,
    TomorrowAt,
    Tomorrow,
    At24h,
}

fn group_int(cap: &regex::Captures<'_>, idx: usize) -> Option<i64> {
    cap.get(idx).and_then(|m| m.as_str().parse().ok())
}

/// 12-hour → 24-hour. `pm = None` leaves the hour alone.
fn twelve_hour(hour: u32, pm: Option<bool>) -> Option<u32> {
    if hour == 0 || hour > 12 {
        return None;
    }
    Some(match pm {
        Some(true) if hour != 12 => hour + 12,
        Some(false) if hour == 12 => 0,
        _ => hour,
    })
}

/// UK wall-clock time today if still ahead, else tomorrow.
fn at_uk_time(uk_now: chrono::NaiveDateTime, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    if hour > 23 || minute > 59 {
        return None;
    }
    let slot = NaiveTime::from_hms_opt(hour, minute, 0)?;
    let mut candidate = uk_now.date().and_time(slot);
    if candidate <= uk_now {
        candidate += Duration::days(1);
    }
    Some(uktime::from_uk_wall(candidate))
}

fn tomorrow_uk_time(uk_now: chrono::NaiveDateTime, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    let slot = NaiveTime::from_hms_opt(hour.min(23), minute.min(59), 0)?;
    let candidate = (uk_now.date() + Duration::days(1)).and_time(slot);
    Some(uktime::from_uk_wall(candidate))
}

/// Strip command prefixes, leftover connectors, and time fragments.
fn clean_reminder_text(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut text = COMMAND_PREFIX.replace(&collapsed, "").to_string();
    loop {
        let next = LEADING_CONNECTOR.replace(&text, "").to_string();
        if next == text {
            break;
        }
        text = next;
    }
    // Time fragments the pattern cut can leave behind ("at", dangling dots).
    static DANGLING_TIME: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?i)^(?:at\s+|\.?\d+\s+)").unwrap());
    loop {
        let next = DANGLING_TIME.replace(&text, "").to_string();
        if next == text {
            break;
        }
        text = next;
    }
    text.trim().to_string()
}
