//! Trivia persistence: questions, sessions, answers.

use ashbot_core::trivia::{
    ApprovalStatus, MatchKind, QuestionType, SessionState, TriviaAnswer, TriviaQuestion,
    TriviaSession,
};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use tracing::info;

use crate::error::{DbError, Result};
use crate::recommendations::parse_ts;
use crate::Database;

/// Fields for a newly submitted question; enters the approval queue pending.
#[derive(Debug, Clone)]
pub struct NewQuestion {
    pub text: String,
    pub question_type: QuestionType,
    pub correct_answer: String,
    pub choices: Vec<String>,
    pub submitted_by: u64,
    pub category: String,
}

impl Database {
    pub fn add_question(&self, new: &NewQuestion) -> Result<i64> {
        let choices = serde_json::to_string(&new.choices)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO trivia_questions
             (text, type, correct_answer, choices, submitted_by, status, category)
             VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
            params![
                new.text,
                new.question_type.to_string(),
                new.correct_answer,
                choices,
                new.submitted_by.to_string(),
                new.category,
            ],
        )?;
        let id = conn.last_insert_rowid();
        info!(id, submitted_by = new.submitted_by, "trivia question queued for approval");
        Ok(id)
    }

    pub fn question_by_id(&self, id: i64) -> Result<Option<TriviaQuestion>> {
        let conn = self.conn.lock().unwrap();
        match conn.query_row(
            &format!("{} WHERE id = ?1", SELECT_QUESTION),
            params![id],
            row_to_question,
        ) {
            Ok(q) => Ok(Some(q)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DbError::Database(e)),
        }
    }

    /// Questions awaiting moderator approval, oldest first.
    pub fn pending_questions(&self) -> Result<Vec<TriviaQuestion>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "{} WHERE status = 'pending' ORDER BY id",
            SELECT_QUESTION
        ))?;
        let rows = stmt
            .query_map([], row_to_question)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub fn set_question_status(&self, id: i64, status: ApprovalStatus) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE trivia_questions SET status = ?2 WHERE id = ?1",
            params![id, status.to_string()],
        )?;
        if n == 0 {
            return Err(DbError::NotFound {
                what: "trivia question",
                id: id.to_string(),
            });
        }
        info!(id, status = %status, "trivia question status changed");
        Ok(())
    }

    /// Replace the editable fields of a question (the approval `modify` path).
    pub fn update_question(&self, q: &TriviaQuestion) -> Result<()> {
        let choices = serde_json::to_string(&q.choices)?;
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE trivia_questions
             SET text = ?2, type = ?3, correct_answer = ?4, choices = ?5, category = ?6
             WHERE id = ?1",
            params![
                q.id,
                q.text,
                q.question_type.to_string(),
                q.correct_answer,
                choices,
                q.category,
            ],
        )?;
        if n == 0 {
            return Err(DbError::NotFound {
                what: "trivia question",
                id: q.id.to_string(),
            });
        }
        Ok(())
    }

    /// Pick the approved question used least recently (fewest sessions,
    /// then lowest id) for the next session.
    pub fn next_session_question(&self) -> Result<Option<TriviaQuestion>> {
        let conn = self.conn.lock().unwrap();
        match conn.query_row(
            "SELECT q.id, q.text, q.type, q.correct_answer, q.choices, q.submitted_by,
                    q.status, q.category
             FROM trivia_questions q
             LEFT JOIN trivia_sessions s ON s.question_id = q.id
             WHERE q.status = 'approved'
             GROUP BY q.id
             ORDER BY COUNT(s.id), q.id
             LIMIT 1",
            [],
            row_to_question,
        ) {
            Ok(q) => Ok(Some(q)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DbError::Database(e)),
        }
    }

    pub fn create_session(
        &self,
        question_id: i64,
        channel_id: u64,
        question_message_id: u64,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO trivia_sessions
             (question_id, state, channel_id, question_message_id, started_at)
             VALUES (?1, 'active', ?2, ?3, ?4)",
            params![
                question_id,
                channel_id.to_string(),
                question_message_id.to_string(),
                now.to_rfc3339(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        info!(id, question_id, channel_id, "trivia session started");
        Ok(id)
    }

    pub fn active_sessions(&self) -> Result<Vec<TriviaSession>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "{} WHERE state = 'active' ORDER BY id",
            SELECT_SESSION
        ))?;
        let rows = stmt
            .query_map([], row_to_session)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// The active session whose posted question message is `message_id`,
    /// used by the router to recognise trivia replies.
    pub fn session_by_question_message(&self, message_id: u64) -> Result<Option<TriviaSession>> {
        let conn = self.conn.lock().unwrap();
        match conn.query_row(
            &format!(
                "{} WHERE state = 'active' AND question_message_id = ?1",
                SELECT_SESSION
            ),
            params![message_id.to_string()],
            row_to_session,
        ) {
            Ok(s) => Ok(Some(s)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DbError::Database(e)),
        }
    }

    /// active → completed (compare-and-set).
    pub fn complete_session(&self, id: i64, now: DateTime<Utc>) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE trivia_sessions SET state = 'completed', ended_at = ?2
             WHERE id = ?1 AND state = 'active'",
            params![id, now.to_rfc3339()],
        )?;
        Ok(n == 1)
    }

    /// active → cancelled (compare-and-set).
    pub fn cancel_session(&self, id: i64, now: DateTime<Utc>) -> Result<bool> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE trivia_sessions SET state = 'cancelled', ended_at = ?2
             WHERE id = ?1 AND state = 'active'",
            params![id, now.to_rfc3339()],
        )?;
        Ok(n == 1)
    }

    /// Store an answer, assigning the next ordinal under the connection
    /// lock. The router processes messages in arrival order, so insert
    /// order here matches arrival order.
    pub fn add_answer(
        &self,
        session_id: i64,
        user_id: u64,
        text: &str,
        score: f64,
        match_kind: MatchKind,
    ) -> Result<u32> {
        let conn = self.conn.lock().unwrap();
        let ordinal: i64 = conn.query_row(
            "SELECT COALESCE(MAX(ordinal), 0) + 1 FROM trivia_answers WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        conn.execute(
            "INSERT INTO trivia_answers (session_id, user_id, text, score, match_kind, ordinal)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session_id,
                user_id.to_string(),
                text,
                score,
                match_kind.to_string(),
                ordinal,
            ],
        )?;
        Ok(ordinal as u32)
    }

    pub fn answers_for_session(&self, session_id: i64) -> Result<Vec<TriviaAnswer>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT session_id, user_id, text, score, match_kind, ordinal
             FROM trivia_answers WHERE session_id = ?1 ORDER BY ordinal",
        )?;
        let rows = stmt
            .query_map(params![session_id], |row| {
                let user_id: String = row.get(1)?;
                let kind: String = row.get(4)?;
                Ok(TriviaAnswer {
                    session_id: row.get(0)?,
                    user_id: user_id.parse().unwrap_or_default(),
                    text: row.get(2)?,
                    score: row.get(3)?,
                    match_kind: kind.parse().unwrap_or(MatchKind::NoMatch),
                    ordinal: row.get::<_, i64>(5)? as u32,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// The winner is the earliest ordinal among full-score answers.
    pub fn session_winner(&self, session_id: i64) -> Result<Option<TriviaAnswer>> {
        let answers = self.answers_for_session(session_id)?;
        Ok(answers
            .into_iter()
            .filter(|a| a.score == 1.0)
            .min_by_key(|a| a.ordinal))
    }
}

const SELECT_QUESTION: &str = "SELECT id, text, type, correct_answer, choices, submitted_by, status, category
 FROM trivia_questions";

const SELECT_SESSION: &str = "SELECT id, question_id, state, channel_id, question_message_id, started_at, ended_at
 FROM trivia_sessions";

fn row_to_question(row: &Row<'_>) -> rusqlite::Result<TriviaQuestion> {
    let qtype: String = row.get(2)?;
    let choices_raw: String = row.get(4)?;
    let submitted: String = row.get(5)?;
    let status: String = row.get(6)?;
    Ok(TriviaQuestion {
        id: row.get(0)?,
        text: row.get(1)?,
        question_type: qtype.parse().unwrap_or(QuestionType::SingleAnswer),
        correct_answer: row.get(3)?,
        choices: serde_json::from_str(&choices_raw).unwrap_or_default(),
        submitted_by: submitted.parse().unwrap_or_default(),
        status: status.parse().unwrap_or(ApprovalStatus::Pending),
        category: row.get(7)?,
    })
}

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<TriviaSession> {
    let state: String = row.get(2)?;
    let channel: String = row.get(3)?;
    let message: String = row.get(4)?;
    let started: String = row.get(5)?;
    let ended: Option<String> = row.get(6)?;
    Ok(TriviaSession {
        id: row.get(0)?,
        question_id: row.get(1)?,
        state: state.parse().unwrap_or(SessionState::Active),
        channel_id: channel.parse().unwrap_or_default(),
        question_message_id: message.parse().unwrap_or_default(),
        started_at: parse_ts(&started),
        ended_at: ended.map(|t| parse_ts(&t)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 20, 0, 0).unwrap()
    }

    fn sample_question(db: &Database) -> i64 {
        db.add_question(&NewQuestion {
            text: "What colour is the sky in Morrowind's ash storms?".to_string(),
            question_type: QuestionType::SingleAnswer,
            correct_answer: "blue".to_string(),
            choices: Vec::new(),
            submitted_by: 7,
            category: "games".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn approval_queue_flow() {
        let db = Database::open_in_memory(0).unwrap();
        let id = sample_question(&db);

        let pending = db.pending_questions().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].status, ApprovalStatus::Pending);

        db.set_question_status(id, ApprovalStatus::Approved).unwrap();
        assert!(db.pending_questions().unwrap().is_empty());
        assert_eq!(
            db.question_by_id(id).unwrap().unwrap().status,
            ApprovalStatus::Approved
        );
    }

    #[test]
    fn session_reply_matching_and_winner() {
        let db = Database::open_in_memory(0).unwrap();
        let qid = sample_question(&db);
        db.set_question_status(qid, ApprovalStatus::Approved).unwrap();

        let sid = db.create_session(qid, 100, 555, now()).unwrap();
        let found = db.session_by_question_message(555).unwrap().unwrap();
        assert_eq!(found.id, sid);
        assert!(db.session_by_question_message(556).unwrap().is_none());

        // A: case-insensitive hit, B: exact hit, C: miss.
        assert_eq!(db.add_answer(sid, 1, "Blue", 1.0, MatchKind::CaseInsensitive).unwrap(), 1);
        assert_eq!(db.add_answer(sid, 2, "blue", 1.0, MatchKind::Exact).unwrap(), 2);
        assert_eq!(db.add_answer(sid, 3, "green", 0.0, MatchKind::NoMatch).unwrap(), 3);

        let winner = db.session_winner(sid).unwrap().unwrap();
        assert_eq!(winner.user_id, 1);
        assert_eq!(winner.ordinal, 1);

        assert!(db.complete_session(sid, now()).unwrap());
        assert!(!db.complete_session(sid, now()).unwrap());
        assert!(db.session_by_question_message(555).unwrap().is_none());
    }

    #[test]
    fn zero_correct_answers_has_no_winner() {
        let db = Database::open_in_memory(0).unwrap();
        let qid = sample_question(&db);
        let sid = db.create_session(qid, 100, 555, now()).unwrap();
        db.add_answer(sid, 3, "green", 0.0, MatchKind::NoMatch).unwrap();
        // Partial credit does not claim the winner slot.
        db.add_answer(sid, 4, "bluu", 0.5, MatchKind::Fuzzy).unwrap();
        assert!(db.session_winner(sid).unwrap().is_none());
    }

    #[test]
    fn least_used_question_is_picked_next() {
        let db = Database::open_in_memory(0).unwrap();
        let q1 = sample_question(&db);
        let q2 = sample_question(&db);
        db.set_question_status(q1, ApprovalStatus::Approved).unwrap();
        db.set_question_status(q2, ApprovalStatus::Approved).unwrap();

        // q1 has a session already; q2 should be picked.
        db.create_session(q1, 100, 1, now()).unwrap();
        let next = db.next_session_question().unwrap().unwrap();
        assert_eq!(next.id, q2);
    }
}
