//! Pattern-based routing of natural-language catalog questions.
//!
//! Patterns are deliberately specific — question structure or anchored
//! forms — so trivia answers and conversational snippets fall through to
//! the AI path instead of triggering catalog lookups.

use once_cell::sync::Lazy;
use regex::Regex;

/// Which statistic a statistical query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatMetric {
    MostPlaytime,
    MostEpisodes,
    LongestCompletion,
}

/// Classified catalog query with arm-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryKind {
    Statistical { metric: StatMetric },
    GameStatus { name: String },
    Genre { genre: String },
    Year { year: i32 },
    GameDetails { name: String },
    Recommendation { name: String, asking_who: bool },
    YoutubeViews { name: Option<String> },
    Unknown,
}

// Anchored patterns first; within a category, declaration order decides.
static GAME_STATUS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)^has (?:captain )?jonesy played (.+?)\??$").unwrap(),
        Regex::new(r"(?i)^did (?:captain )?jonesy play (.+?)\??$").unwrap(),
    ]
});

static RECOMMENDATION_IS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^is (.+?) recommended\??$").unwrap());
static RECOMMENDATION_WHO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^who recommended (.+?)\??$").unwrap());

static GAME_DETAILS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)^tell me about (.+?)\??$").unwrap(),
        Regex::new(r"(?i)^what do you know about (.+?)\??$").unwrap(),
    ]
});

static YOUTUBE_VIEWS_NAMED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^how many views (?:does|did) (.+?) (?:have|get)\??$").unwrap());
static YOUTUBE_VIEWS_TOP: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)which game has the most views").unwrap());

static STAT_PLAYTIME: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)what game (?:series )?.* most playtime").unwrap(),
        Regex::new(r"(?i)what .* most hours").unwrap(),
    ]
});
static STAT_EPISODES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)which game .* most episodes").unwrap());
static STAT_LONGEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)what .* longest .* complete").unwrap());

static GENRE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)what (\w+) games has jonesy played").unwrap());
static YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)what games from (\d{4}) has jonesy played").unwrap());

/// Casual narrative markers; third-party chatter must not trigger catalog
/// lookups. The list is curated by example and extended in code only.
static CASUAL_SPEECH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:and then|someone said|remember when|jam says)\b").unwrap()
});

/// True when the text reads as third-party narration rather than a question
/// to the bot.
pub fn is_casual_speech(text: &str) -> bool {
    CASUAL_SPEECH.is_match(text)
}

/// Classify a natural-language catalog question. First matching category in
/// table order wins; anchored patterns come first.
pub fn classify(text: &str) -> QueryKind {
    let text = text.trim();

    for re in GAME_STATUS.iter() {
        if let Some(cap) = re.captures(text) {
            return QueryKind::GameStatus {
                name: cap[1].trim().to_string(),
            };
        }
    }

    if let Some(cap) = RECOMMENDATION_IS.captures(text) {
        return QueryKind::Recommendation {
            name: cap[1].trim().to_string(),
            asking_who: false,
        };
    }
    if let Some(cap) = RECOMMENDATION_WHO.captures(text) {
        return QueryKind::Recommendation {
            name: cap[1].trim().to_string(),
            asking_who: true,
        };
    }

    for re in GAME_DETAILS.iter() {
        if let Some(cap) = re.captures(text) {
            return QueryKind::GameDetails {
                name: cap[1].trim().to_string(),
            };
        }
    }

    if let Some(cap) = YOUTUBE_VIEWS_NAMED.captures(text) {
        return QueryKind::YoutubeViews {
            name: Some(cap[1].trim().to_string()),
        };
    }
    if YOUTUBE_VIEWS_TOP.is_match(text) {
        return QueryKind::YoutubeViews { name: None };
    }

    if STAT_PLAYTIME.iter().any(|re| re.is_match(text)) {
        return QueryKind::Statistical {
            metric: StatMetric::MostPlaytime,
        };
    }
    if STAT_EPISODES.is_match(text) {
        return QueryKind::Statistical {
            metric: StatMetric::MostEpisodes,
        };
    }
    if STAT_LONGEST.is_match(text) {
        return QueryKind::Statistical {
            metric: StatMetric::LongestCompletion,
        };
    }

    if let Some(cap) = GENRE.captures(text) {
        return QueryKind::Genre {
            genre: cap[1].to_string(),
        };
    }
    if let Some(cap) = YEAR.captures(text) {
        if let Ok(year) = cap[1].parse() {
            return QueryKind::Year { year };
        }
    }

    QueryKind::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_status_patterns_are_anchored() {
        assert_eq!(
            classify("has jonesy played dark souls?"),
            QueryKind::GameStatus {
                name: "dark souls".to_string()
            }
        );
        assert_eq!(
            classify("did captain jonesy play Portal"),
            QueryKind::GameStatus {
                name: "Portal".to_string()
            }
        );
        // Embedded in chatter the anchor fails.
        assert_eq!(
            classify("I wonder, has jonesy played dark souls, anyone know"),
            QueryKind::Unknown
        );
    }

    #[test]
    fn recommendation_patterns() {
        assert_eq!(
            classify("is Hades recommended?"),
            QueryKind::Recommendation {
                name: "Hades".to_string(),
                asking_who: false
            }
        );
        assert_eq!(
            classify("who recommended Hades"),
            QueryKind::Recommendation {
                name: "Hades".to_string(),
                asking_who: true
            }
        );
    }

    #[test]
    fn statistical_patterns() {
        assert_eq!(
            classify("what game has the most playtime"),
            QueryKind::Statistical {
                metric: StatMetric::MostPlaytime
            }
        );
        assert_eq!(
            classify("which game has the most episodes"),
            QueryKind::Statistical {
                metric: StatMetric::MostEpisodes
            }
        );
        assert_eq!(
            classify("what took the longest to complete"),
            QueryKind::Statistical {
                metric: StatMetric::LongestCompletion
            }
        );
    }

    #[test]
    fn genre_and_year_patterns() {
        assert_eq!(
            classify("what horror games has jonesy played"),
            QueryKind::Genre {
                genre: "horror".to_string()
            }
        );
        assert_eq!(
            classify("what games from 2019 has jonesy played"),
            QueryKind::Year { year: 2019 }
        );
    }

    #[test]
    fn casual_speech_guard() {
        assert!(is_casual_speech("and then someone recommends Portal"));
        assert!(is_casual_speech("remember when she played Alien Isolation"));
        assert!(is_casual_speech("jam says it's great"));
        assert!(!is_casual_speech("has jonesy played Portal"));
    }

    #[test]
    fn trivia_answers_do_not_classify() {
        assert_eq!(classify("blue"), QueryKind::Unknown);
        assert_eq!(classify("Grand Theft Auto"), QueryKind::Unknown);
    }

    #[test]
    fn anchored_status_beats_unanchored_statistical() {
        // Contains "play" wording but matches the anchored status pattern
        // first.
        assert_eq!(
            classify("has jonesy played the game with the most hours"),
            QueryKind::GameStatus {
                name: "the game with the most hours".to_string()
            }
        );
    }
}
