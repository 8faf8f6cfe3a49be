//! Community game recommendations (`!addgame` / `!recommend`).

use ashbot_core::game::GameRecommendation;
use chrono::{DateTime, Utc};
use rusqlite::params;
use tracing::info;

use crate::error::{DbError, Result};
use crate::Database;

impl Database {
    pub fn add_recommendation(
        &self,
        name: &str,
        reason: &str,
        added_by: &str,
        now: DateTime<Utc>,
    ) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO game_recommendations (name, reason, added_by, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![name, reason, added_by, now.to_rfc3339()],
        )?;
        let id = conn.last_insert_rowid();
        info!(id, name, "recommendation added");
        Ok(id)
    }

    /// All recommendations, oldest first (stable list indices for removal).
    pub fn list_recommendations(&self) -> Result<Vec<GameRecommendation>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, name, reason, added_by, created_at
             FROM game_recommendations ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                ))
            })?
            .filter_map(|r| r.ok())
            .map(|(id, name, reason, added_by, created_at)| GameRecommendation {
                id,
                name,
                reason,
                added_by,
                created_at: parse_ts(&created_at),
            })
            .collect();
        Ok(rows)
    }

    pub fn remove_recommendation(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "DELETE FROM game_recommendations WHERE id = ?1",
            params![id],
        )?;
        if n == 0 {
            return Err(DbError::NotFound {
                what: "recommendation",
                id: id.to_string(),
            });
        }
        info!(id, "recommendation removed");
        Ok(())
    }
}

pub(crate) fn parse_ts(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn add_list_remove() {
        let db = Database::open_in_memory(0).unwrap();
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let id = db.add_recommendation("Portal 2", "great puzzles", "alice", now).unwrap();
        db.add_recommendation("Hades", "tight combat", "bob", now).unwrap();

        let list = db.list_recommendations().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].name, "Portal 2");
        assert_eq!(list[0].created_at, now);

        db.remove_recommendation(id).unwrap();
        assert_eq!(db.list_recommendations().unwrap().len(), 1);
        assert!(db.remove_recommendation(id).is_err());
    }
}
