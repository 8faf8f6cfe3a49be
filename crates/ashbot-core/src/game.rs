//! Catalog data model: played games and community recommendations.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Alternative-name arrays are capped at this length everywhere.
pub const MAX_ALT_NAMES: usize = 5;

/// Confidence at or above which a (title → game) mapping is accepted.
pub const CONFIDENCE_ACCEPT: f64 = 0.8;

/// Confidence entries are reduced to when the metadata match looks suspect.
pub const CONFIDENCE_REVIEW: f64 = 0.5;

/// Where a catalog entry stands in the streamer's playthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    #[default]
    Unknown,
    InProgress,
    Completed,
    Dropped,
}

impl fmt::Display for CompletionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompletionStatus::Unknown => "unknown",
            CompletionStatus::InProgress => "in_progress",
            CompletionStatus::Completed => "completed",
            CompletionStatus::Dropped => "dropped",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for CompletionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(CompletionStatus::Unknown),
            "in_progress" => Ok(CompletionStatus::InProgress),
            "completed" => Ok(CompletionStatus::Completed),
            "dropped" => Ok(CompletionStatus::Dropped),
            other => Err(format!("unknown completion status: {}", other)),
        }
    }
}

/// Canonical record of a game the streamer has played.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: i64,
    pub canonical_name: String,
    /// Latin-script only, case-insensitively deduped, at most [`MAX_ALT_NAMES`].
    pub alternative_names: Vec<String>,
    pub series_name: Option<String>,
    pub genre: Option<String>,
    pub release_year: Option<i32>,
    pub completion_status: CompletionStatus,
    pub total_episodes: u32,
    pub total_playtime_minutes: u32,
    /// Opaque identifier at the external metadata service.
    pub igdb_id: Option<i64>,
    /// Trust in the (title → game) mapping, in [0, 1].
    pub confidence: f64,
    pub last_validated_at: Option<DateTime<Utc>>,
    pub playlist_url: Option<String>,
    pub stream_urls: Vec<String>,
    pub first_played_at: Option<NaiveDate>,
}

impl Game {
    /// Entries below the accept threshold are queued for moderator review.
    pub fn needs_review(&self) -> bool {
        self.confidence < CONFIDENCE_ACCEPT
    }

    /// True when `name` matches the canonical name or any alternative name,
    /// case-insensitively.
    pub fn matches_name(&self, name: &str) -> bool {
        let needle = name.trim().to_lowercase();
        self.canonical_name.to_lowercase() == needle
            || self
                .alternative_names
                .iter()
                .any(|alt| alt.to_lowercase() == needle)
    }
}

/// A community game suggestion (`!addgame` / `!recommend`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecommendation {
    pub id: i64,
    pub name: String,
    pub reason: String,
    pub added_by: String,
    pub created_at: DateTime<Utc>,
}

/// Apply the alternative-name storage contract: Latin-script only (all code
/// points below U+0250), case-insensitively deduped preserving first
/// occurrence, capped at [`MAX_ALT_NAMES`].
pub fn normalize_alt_names<I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let mut seen = Vec::new();
    let mut out = Vec::new();
    for raw in names {
        let name = raw.trim();
        if name.len() < 2 {
            continue;
        }
        if !name.chars().all(|c| (c as u32) < 0x250) {
            continue;
        }
        let lower = name.to_lowercase();
        if seen.contains(&lower) {
            continue;
        }
        seen.push(lower);
        out.push(name.to_string());
        if out.len() == MAX_ALT_NAMES {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips() {
        for s in [
            CompletionStatus::Unknown,
            CompletionStatus::InProgress,
            CompletionStatus::Completed,
            CompletionStatus::Dropped,
        ] {
            assert_eq!(s.to_string().parse::<CompletionStatus>().unwrap(), s);
        }
    }

    #[test]
    fn alt_names_filter_non_latin() {
        let names = vec![
            "Biohazard".to_string(),
            "バイオハザード".to_string(),
            "Обитель зла".to_string(),
            "Résident Évil".to_string(),
        ];
        let out = normalize_alt_names(names);
        assert_eq!(out, vec!["Biohazard".to_string(), "Résident Évil".to_string()]);
        for name in &out {
            assert!(name.chars().all(|c| (c as u32) < 0x250));
        }
    }

    #[test]
    fn alt_names_dedup_case_insensitive_and_cap() {
        let names = vec![
            "GTA".to_string(),
            "gta".to_string(),
            "One".to_string(),
            "Two".to_string(),
            "Three".to_string(),
            "Four".to_string(),
            "Five".to_string(),
        ];
        let out = normalize_alt_names(names);
        assert_eq!(out.len(), MAX_ALT_NAMES);
        assert_eq!(out[0], "GTA");
        assert!(!out.contains(&"gta".to_string()));
    }

    #[test]
    fn alt_names_drop_short_fragments() {
        let out = normalize_alt_names(vec!["a".to_string(), "ok".to_string()]);
        assert_eq!(out, vec!["ok".to_string()]);
    }

    #[test]
    fn matches_name_checks_alternatives() {
        let game = Game {
            id: 1,
            canonical_name: "Grand Theft Auto V".to_string(),
            alternative_names: vec!["GTA 5".to_string()],
            series_name: None,
            genre: None,
            release_year: None,
            completion_status: CompletionStatus::Completed,
            total_episodes: 0,
            total_playtime_minutes: 0,
            igdb_id: None,
            confidence: 1.0,
            last_validated_at: None,
            playlist_url: None,
            stream_urls: Vec::new(),
            first_played_at: None,
        };
        assert!(game.matches_name("grand theft auto v"));
        assert!(game.matches_name("gta 5"));
        assert!(!game.matches_name("gta 4"));
    }
}
