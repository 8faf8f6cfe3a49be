//! Played-games catalog persistence.

use ashbot_core::game::{normalize_alt_names, CompletionStatus, Game};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Row};
use tracing::info;

use crate::error::{DbError, Result};
use crate::names::parse_legacy_array;
use crate::recommendations::parse_ts;
use crate::Database;

/// Fields for a brand-new catalog entry; the repository assigns the id.
#[derive(Debug, Clone, Default)]
pub struct NewGame {
    pub canonical_name: String,
    pub alternative_names: Vec<String>,
    pub series_name: Option<String>,
    pub genre: Option<String>,
    pub release_year: Option<i32>,
    pub completion_status: CompletionStatus,
    pub total_episodes: u32,
    pub total_playtime_minutes: u32,
    pub igdb_id: Option<i64>,
    pub confidence: f64,
    pub playlist_url: Option<String>,
    pub stream_urls: Vec<String>,
    pub first_played_at: Option<NaiveDate>,
}

impl Database {
    /// Insert a new catalog entry. Rejects a duplicate canonical name
    /// (case-insensitive) so the UNIQUE constraint surfaces as a typed error.
    pub fn insert_game(&self, new: &NewGame, now: DateTime<Utc>) -> Result<Game> {
        if self.find_game(&new.canonical_name)?.is_some() {
            return Err(DbError::DuplicateName {
                name: new.canonical_name.clone(),
            });
        }
        let alt = serde_json::to_string(&normalize_alt_names(new.alternative_names.clone()))?;
        let streams = serde_json::to_string(&new.stream_urls)?;

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO played_games
             (canonical_name, alternative_names, series_name, genre, release_year,
              completion_status, total_episodes, total_playtime_minutes, igdb_id,
              confidence, last_validated_at, playlist_url, stream_urls, first_played_at)
             VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14)",
            params![
                new.canonical_name,
                alt,
                new.series_name,
                new.genre,
                new.release_year,
                new.completion_status.to_string(),
                new.total_episodes,
                new.total_playtime_minutes,
                new.igdb_id,
                new.confidence,
                now.to_rfc3339(),
                new.playlist_url,
                streams,
                new.first_played_at.map(|d| d.to_string()),
            ],
        )?;
        let id = conn.last_insert_rowid();
        info!(id, name = %new.canonical_name, confidence = new.confidence, "catalog entry created");
        drop(conn);
        self.game_by_id(id)?.ok_or(DbError::NotFound {
            what: "game",
            id: id.to_string(),
        })
    }

    /// Full-row update of an existing entry. The alternative-name contract
    /// is re-applied on every write.
    pub fn save_game(&self, game: &Game) -> Result<()> {
        let alt = serde_json::to_string(&normalize_alt_names(game.alternative_names.clone()))?;
        let streams = serde_json::to_string(&game.stream_urls)?;
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "UPDATE played_games SET
                canonical_name = ?2, alternative_names = ?3, series_name = ?4,
                genre = ?5, release_year = ?6, completion_status = ?7,
                total_episodes = ?8, total_playtime_minutes = ?9, igdb_id = ?10,
                confidence = ?11, last_validated_at = ?12, playlist_url = ?13,
                stream_urls = ?14, first_played_at = ?15
             WHERE id = ?1",
            params![
                game.id,
                game.canonical_name,
                alt,
                game.series_name,
                game.genre,
                game.release_year,
                game.completion_status.to_string(),
                game.total_episodes,
                game.total_playtime_minutes,
                game.igdb_id,
                game.confidence,
                game.last_validated_at.map(|t| t.to_rfc3339()),
                game.playlist_url,
                streams,
                game.first_played_at.map(|d| d.to_string()),
            ],
        )?;
        if n == 0 {
            return Err(DbError::NotFound {
                what: "game",
                id: game.id.to_string(),
            });
        }
        Ok(())
    }

    pub fn game_by_id(&self, id: i64) -> Result<Option<Game>> {
        let conn = self.conn.lock().unwrap();
        match conn.query_row(
            &format!("{} WHERE id = ?1", SELECT_GAME),
            params![id],
            row_to_game,
        ) {
            Ok(g) => Ok(Some(g)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DbError::Database(e)),
        }
    }

    pub fn game_by_igdb_id(&self, igdb_id: i64) -> Result<Option<Game>> {
        let conn = self.conn.lock().unwrap();
        match conn.query_row(
            &format!("{} WHERE igdb_id = ?1", SELECT_GAME),
            params![igdb_id],
            row_to_game,
        ) {
            Ok(g) => Ok(Some(g)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(DbError::Database(e)),
        }
    }

    /// Find by canonical name (case-insensitive) or alternative-name
    /// membership. Alternative names are JSON, so the membership check runs
    /// over the loaded rows.
    pub fn find_game(&self, name: &str) -> Result<Option<Game>> {
        {
            let conn = self.conn.lock().unwrap();
            match conn.query_row(
                &format!("{} WHERE canonical_name = ?1 COLLATE NOCASE", SELECT_GAME),
                params![name.trim()],
                row_to_game,
            ) {
                Ok(g) => return Ok(Some(g)),
                Err(rusqlite::Error::QueryReturnedNoRows) => {}
                Err(e) => return Err(DbError::Database(e)),
            }
        }
        Ok(self.all_games()?.into_iter().find(|g| g.matches_name(name)))
    }

    pub fn all_games(&self) -> Result<Vec<Game>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt =
            conn.prepare(&format!("{} ORDER BY canonical_name COLLATE NOCASE", SELECT_GAME))?;
        let rows = stmt
            .query_map([], row_to_game)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    pub fn games_by_status(&self, status: CompletionStatus) -> Result<Vec<Game>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "{} WHERE completion_status = ?1 ORDER BY canonical_name",
            SELECT_GAME
        ))?;
        let rows = stmt
            .query_map(params![status.to_string()], row_to_game)?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows)
    }

    /// Explicit moderator removal is the only delete path.
    pub fn remove_game(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute("DELETE FROM played_games WHERE id = ?1", params![id])?;
        if n == 0 {
            return Err(DbError::NotFound {
                what: "game",
                id: id.to_string(),
            });
        }
        info!(id, "catalog entry removed");
        Ok(())
    }
}

const SELECT_GAME: &str = "SELECT id, canonical_name, alternative_names, series_name, genre,
        release_year, completion_status, total_episodes, total_playtime_minutes,
        igdb_id, confidence, last_validated_at, playlist_url, stream_urls,
        first_played_at
 FROM played_games";

fn row_to_game(row: &Row<'_>) -> rusqlite::Result<Game> {
    let alt_raw: String = row.get(2)?;
    let status_str: String = row.get(6)?;
    let streams_raw: String = row.get(13)?;
    let validated: Option<String> = row.get(11)?;
    let first_played: Option<String> = row.get(14)?;

    Ok(Game {
        id: row.get(0)?,
        canonical_name: row.get(1)?,
        // Legacy rows may carry escaped array syntax; recover then re-apply
        // the storage contract.
        alternative_names: normalize_alt_names(parse_legacy_array(&alt_raw)),
        series_name: row.get(3)?,
        genre: row.get(4)?,
        release_year: row.get(5)?,
        completion_status: status_str.parse().unwrap_or_default(),
        total_episodes: row.get::<_, i64>(7)?.max(0) as u32,
        total_playtime_minutes: row.get::<_, i64>(8)?.max(0) as u32,
        igdb_id: row.get(9)?,
        confidence: row.get(10)?,
        last_validated_at: validated.map(|t| parse_ts(&t)),
        playlist_url: row.get(12)?,
        stream_urls: parse_legacy_array(&streams_raw),
        first_played_at: first_played.and_then(|d| d.parse().ok()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn insert_and_find_by_alt_name() {
        let db = Database::open_in_memory(0).unwrap();
        let game = db
            .insert_game(
                &NewGame {
                    canonical_name: "Grand Theft Auto V".to_string(),
                    alternative_names: vec!["GTA 5".to_string(), "GTA V".to_string()],
                    confidence: 1.0,
                    ..Default::default()
                },
                now(),
            )
            .unwrap();
        assert!(game.id > 0);

        let found = db.find_game("gta 5").unwrap().unwrap();
        assert_eq!(found.canonical_name, "Grand Theft Auto V");

        let found = db.find_game("GRAND THEFT AUTO V").unwrap().unwrap();
        assert_eq!(found.id, game.id);
    }

    #[test]
    fn duplicate_canonical_name_rejected() {
        let db = Database::open_in_memory(0).unwrap();
        let new = NewGame {
            canonical_name: "Portal".to_string(),
            ..Default::default()
        };
        db.insert_game(&new, now()).unwrap();
        let dup = NewGame {
            canonical_name: "portal".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            db.insert_game(&dup, now()),
            Err(DbError::DuplicateName { .. })
        ));
    }

    #[test]
    fn save_round_trips_fields() {
        let db = Database::open_in_memory(0).unwrap();
        let mut game = db
            .insert_game(
                &NewGame {
                    canonical_name: "Dark Souls".to_string(),
                    confidence: 0.9,
                    igdb_id: Some(2368),
                    ..Default::default()
                },
                now(),
            )
            .unwrap();

        game.total_episodes = 12;
        game.total_playtime_minutes = 800;
        game.completion_status = CompletionStatus::Completed;
        game.genre = Some("Action-RPG".to_string());
        db.save_game(&game).unwrap();

        let loaded = db.game_by_id(game.id).unwrap().unwrap();
        assert_eq!(loaded.total_episodes, 12);
        assert_eq!(loaded.total_playtime_minutes, 800);
        assert_eq!(loaded.completion_status, CompletionStatus::Completed);
        assert_eq!(loaded.genre.as_deref(), Some("Action-RPG"));

        let by_igdb = db.game_by_igdb_id(2368).unwrap().unwrap();
        assert_eq!(by_igdb.id, game.id);
    }

    #[test]
    fn alt_names_contract_enforced_on_write() {
        let db = Database::open_in_memory(0).unwrap();
        let game = db
            .insert_game(
                &NewGame {
                    canonical_name: "Resident Evil".to_string(),
                    alternative_names: vec![
                        "Biohazard".to_string(),
                        "biohazard".to_string(),
                        "バイオハザード".to_string(),
                    ],
                    ..Default::default()
                },
                now(),
            )
            .unwrap();
        assert_eq!(game.alternative_names, vec!["Biohazard".to_string()]);
    }

    #[test]
    fn remove_game_is_the_only_delete() {
        let db = Database::open_in_memory(0).unwrap();
        let game = db
            .insert_game(
                &NewGame {
                    canonical_name: "Hades".to_string(),
                    ..Default::default()
                },
                now(),
            )
            .unwrap();
        db.remove_game(game.id).unwrap();
        assert!(db.game_by_id(game.id).unwrap().is_none());
        assert!(db.remove_game(game.id).is_err());
    }
}
