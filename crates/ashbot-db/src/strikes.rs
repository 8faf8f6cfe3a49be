//! Strike ledger: user id → nonnegative count.

use rusqlite::params;
use tracing::{info, warn};

use crate::error::{DbError, Result};
use crate::Database;

impl Database {
    /// Current strike count for a user (0 when no row exists).
    pub fn strike_count(&self, user_id: u64) -> Result<u32> {
        let conn = self.conn.lock().unwrap();
        let count = conn
            .query_row(
                "SELECT count FROM strikes WHERE user_id = ?1",
                params![user_id.to_string()],
                |row| row.get::<_, i64>(0),
            )
            .unwrap_or(0);
        Ok(count.max(0) as u32)
    }

    /// Record one strike and return the new count.
    ///
    /// The streamer identity is refused here rather than in the handlers so
    /// no caller can slip a write past the rule.
    pub fn add_strike(&self, user_id: u64) -> Result<u32> {
        if user_id == self.strike_exempt {
            warn!(user_id, "strike attempted against the streamer identity");
            return Err(DbError::StrikeExempt);
        }
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO strikes (user_id, count) VALUES (?1, 1)
             ON CONFLICT(user_id) DO UPDATE SET count = count + 1",
            params![user_id.to_string()],
        )?;
        let count: i64 = conn.query_row(
            "SELECT count FROM strikes WHERE user_id = ?1",
            params![user_id.to_string()],
            |row| row.get(0),
        )?;
        info!(user_id, count, "strike recorded");
        Ok(count as u32)
    }

    /// Reset a user's strikes to zero.
    pub fn reset_strikes(&self, user_id: u64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO strikes (user_id, count) VALUES (?1, 0)
             ON CONFLICT(user_id) DO UPDATE SET count = 0",
            params![user_id.to_string()],
        )?;
        info!(user_id, "strikes reset");
        Ok(())
    }

    /// All users with a nonzero count, highest first.
    pub fn all_strikes(&self) -> Result<Vec<(u64, u32)>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT user_id, count FROM strikes WHERE count > 0 ORDER BY count DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .filter_map(|r| r.ok())
            .filter_map(|(uid, count)| Some((uid.parse::<u64>().ok()?, count as u32)))
            .collect();
        Ok(rows)
    }
}
