//! Key-value config table (AI kill switch, persona extra, sweep watermarks).

use rusqlite::params;

use crate::error::Result;
use crate::Database;

impl Database {
    pub fn get_config(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        match conn.query_row(
            "SELECT value FROM config WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        ) {
            Ok(v) => Ok(Some(v)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn set_config(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO config (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_overwrites() {
        let db = Database::open_in_memory(0).unwrap();
        assert_eq!(db.get_config("ai_enabled").unwrap(), None);
        db.set_config("ai_enabled", "true").unwrap();
        db.set_config("ai_enabled", "false").unwrap();
        assert_eq!(db.get_config("ai_enabled").unwrap().as_deref(), Some("false"));
    }
}
