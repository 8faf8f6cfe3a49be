//! Trivia data model and answer evaluation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::similarity::sequence_ratio;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleAnswer,
    MultipleChoice,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuestionType::SingleAnswer => write!(f, "single_answer"),
            QuestionType::MultipleChoice => write!(f, "multiple_choice"),
        }
    }
}

impl std::str::FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "single_answer" => Ok(QuestionType::SingleAnswer),
            "multiple_choice" => Ok(QuestionType::MultipleChoice),
            other => Err(format!("unknown question type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApprovalStatus::Pending),
            "approved" => Ok(ApprovalStatus::Approved),
            "rejected" => Ok(ApprovalStatus::Rejected),
            other => Err(format!("unknown approval status: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Active,
    Completed,
    Cancelled,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Active => "active",
            SessionState::Completed => "completed",
            SessionState::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for SessionState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(SessionState::Active),
            "completed" => Ok(SessionState::Completed),
            "cancelled" => Ok(SessionState::Cancelled),
            other => Err(format!("unknown session state: {}", other)),
        }
    }
}

/// How a submitted answer matched the correct one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    CaseInsensitive,
    Fuzzy,
    Abbreviation,
    Expansion,
    NoMatch,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchKind::Exact => "exact",
            MatchKind::CaseInsensitive => "case_insensitive",
            MatchKind::Fuzzy => "fuzzy",
            MatchKind::Abbreviation => "abbreviation",
            MatchKind::Expansion => "expansion",
            MatchKind::NoMatch => "no_match",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for MatchKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "exact" => Ok(MatchKind::Exact),
            "case_insensitive" => Ok(MatchKind::CaseInsensitive),
            "fuzzy" => Ok(MatchKind::Fuzzy),
            "abbreviation" => Ok(MatchKind::Abbreviation),
            "expansion" => Ok(MatchKind::Expansion),
            "no_match" => Ok(MatchKind::NoMatch),
            other => Err(format!("unknown match kind: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriviaQuestion {
    pub id: i64,
    pub text: String,
    pub question_type: QuestionType,
    /// Canonical form of the correct answer.
    pub correct_answer: String,
    pub choices: Vec<String>,
    pub submitted_by: u64,
    pub status: ApprovalStatus,
    pub category: String,
}

/// One active round of Q&A bound to a posted question message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriviaSession {
    pub id: i64,
    pub question_id: i64,
    pub state: SessionState,
    pub channel_id: u64,
    /// The posted question message; replies to it are treated as answers.
    pub question_message_id: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriviaAnswer {
    pub session_id: i64,
    pub user_id: u64,
    pub text: String,
    pub score: f64,
    pub match_kind: MatchKind,
    /// Arrival order at the router; first-correct is decided by ordinal.
    pub ordinal: u32,
}

/// Known answer abbreviations, expanded during normalized matching.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("gta", "grand theft auto"),
    ("cod", "call of duty"),
    ("tlou", "the last of us"),
    ("botw", "breath of the wild"),
    ("re", "resident evil"),
    ("b", "blue"),
    ("r", "red"),
    ("g", "green"),
    ("y", "yellow"),
];

/// Evaluate a submitted answer against the canonical one.
///
/// Seven levels, first match wins:
/// 1. exact string match                       → 1.0, exact
/// 2. case-insensitive match after trim        → 1.0, case_insensitive
/// 3. normalized match with abbreviations      → 1.0, abbreviation
/// 4. single character = first letter          → 1.0, expansion
/// 5. sequence ratio ≥ 0.90                    → 1.0, fuzzy
/// 6. sequence ratio ≥ 0.70                    → 0.5, fuzzy (partial credit)
/// 7. otherwise                                → 0.0, no_match
///
/// Partial credit counts toward score totals but never claims the winner
/// slot; only 1.0-scored answers compete on ordinal.
pub fn evaluate_answer(submitted: &str, correct: &str) -> (f64, MatchKind) {
    if submitted == correct {
        return (1.0, MatchKind::Exact);
    }

    let sub_trim = submitted.trim();
    let cor_trim = correct.trim();
    if sub_trim.eq_ignore_ascii_case(cor_trim) {
        return (1.0, MatchKind::CaseInsensitive);
    }

    let sub_norm = normalize_answer(sub_trim);
    let cor_norm = normalize_answer(cor_trim);
    if !sub_norm.is_empty() && sub_norm == cor_norm {
        return (1.0, MatchKind::Abbreviation);
    }

    // A lone character counts when it opens the correct answer.
    let mut sub_chars = sub_norm.chars();
    if let (Some(first), None) = (sub_chars.next(), sub_chars.next()) {
        if cor_norm.starts_with(first) {
            return (1.0, MatchKind::Expansion);
        }
    }

    let ratio = sequence_ratio(&sub_norm, &cor_norm);
    if ratio >= 0.90 {
        return (1.0, MatchKind::Fuzzy);
    }
    if ratio >= 0.70 {
        return (0.5, MatchKind::Fuzzy);
    }

    (0.0, MatchKind::NoMatch)
}

/// Lowercase, strip punctuation, collapse whitespace, expand known
/// abbreviations whole-word.
fn normalize_answer(text: &str) -> String {
    let stripped: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();

    let words: Vec<String> = stripped
        .split_whitespace()
        .map(|w| {
            ABBREVIATIONS
                .iter()
                .find(|(abbr, _)| *abbr == w)
                .map(|(_, full)| full.to_string())
                .unwrap_or_else(|| w.to_string())
        })
        .collect();

    words.join(" ")
}
