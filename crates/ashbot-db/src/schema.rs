use rusqlite::Connection;

use crate::error::Result;

/// Initialise all tables. Safe to call on every startup (idempotent).
///
/// Platform identifiers (users, channels, messages) are stored as TEXT to
/// sidestep signed-integer overflow on snowflake ids; timestamps are
/// RFC 3339 TEXT; array-valued columns are JSON.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS strikes (
            user_id  TEXT PRIMARY KEY,
            count    INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS game_recommendations (
            id         INTEGER PRIMARY KEY AUTOINCREMENT,
            name       TEXT NOT NULL,
            reason     TEXT NOT NULL,
            added_by   TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS played_games (
            id                     INTEGER PRIMARY KEY AUTOINCREMENT,
            canonical_name         TEXT NOT NULL UNIQUE,
            alternative_names      TEXT NOT NULL DEFAULT '[]',
            series_name            TEXT,
            genre                  TEXT,
            release_year           INTEGER,
            completion_status      TEXT NOT NULL DEFAULT 'unknown',
            total_episodes         INTEGER NOT NULL DEFAULT 0,
            total_playtime_minutes INTEGER NOT NULL DEFAULT 0,
            igdb_id                INTEGER,
            confidence             REAL NOT NULL DEFAULT 0,
            last_validated_at      TEXT,
            playlist_url           TEXT,
            stream_urls            TEXT NOT NULL DEFAULT '[]',
            first_played_at        TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_played_games_status
            ON played_games(completion_status);

        CREATE TABLE IF NOT EXISTS reminders (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id       TEXT NOT NULL,
            text          TEXT NOT NULL,
            scheduled_at  TEXT NOT NULL,
            delivery_kind TEXT NOT NULL,
            channel_id    TEXT,
            status        TEXT NOT NULL DEFAULT 'pending',
            auto_action   TEXT,
            last_error    TEXT,
            delivered_at  TEXT,
            cancelled_at  TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_reminders_due
            ON reminders(status, scheduled_at);

        CREATE TABLE IF NOT EXISTS trivia_questions (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            text           TEXT NOT NULL,
            type           TEXT NOT NULL,
            correct_answer TEXT NOT NULL,
            choices        TEXT NOT NULL DEFAULT '[]',
            submitted_by   TEXT NOT NULL,
            status         TEXT NOT NULL DEFAULT 'pending',
            category       TEXT NOT NULL DEFAULT 'general'
        );

        CREATE TABLE IF NOT EXISTS trivia_sessions (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            question_id         INTEGER NOT NULL REFERENCES trivia_questions(id),
            state               TEXT NOT NULL DEFAULT 'active',
            channel_id          TEXT NOT NULL,
            question_message_id TEXT NOT NULL,
            started_at          TEXT NOT NULL,
            ended_at            TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_trivia_sessions_state
            ON trivia_sessions(state);

        CREATE TABLE IF NOT EXISTS trivia_answers (
            session_id INTEGER NOT NULL REFERENCES trivia_sessions(id),
            user_id    TEXT NOT NULL,
            text       TEXT NOT NULL,
            score      REAL NOT NULL,
            match_kind TEXT NOT NULL,
            ordinal    INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_trivia_answers_session
            ON trivia_answers(session_id, ordinal);

        CREATE TABLE IF NOT EXISTS config (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );",
    )?;
    Ok(())
}
