//! Recommendation-list and played-games catalog commands.

use chrono::Utc;

use ashbot_core::game::CompletionStatus;
use ashbot_core::gateway::InboundMessage;
use ashbot_core::similarity::sequence_ratio;
use ashbot_core::{AshError, Result};
use ashbot_db::NewGame;

use crate::commands::{parse_kv_options, require_operator};
use crate::context::BotContext;
use crate::handlers::queries::format_game_details;

/// Fuzzy threshold for duplicate recommendation names.
const DUP_THRESHOLD: f64 = 0.85;

const PAGE_SIZE: usize = 10;

/// Recognized keys of the played-game option bag.
const GAME_OPTION_KEYS: &[&str] = &["series", "year", "status", "episodes", "playtime", "genre"];

/// Typed option bag for `!addplayedgame` / `!updateplayedgame`.
#[derive(Debug, Default, PartialEq)]
pub struct GameOptions {
    pub series: Option<String>,
    pub year: Option<i32>,
    pub status: Option<CompletionStatus>,
    pub episodes: Option<u32>,
    pub playtime: Option<u32>,
    pub genre: Option<String>,
}

impl GameOptions {
    /// Parse ` | key:value` pairs; unknown keys and untypeable values are
    /// user errors.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut options = GameOptions::default();
        for (key, value) in parse_kv_options(raw, GAME_OPTION_KEYS)? {
            match key.as_str() {
                "series" => options.series = Some(value.to_string()),
                "genre" => options.genre = Some(value.to_string()),
                "year" => {
                    options.year = Some(value.parse().map_err(|_| {
                        AshError::UserInput(format!("`{value}` is not a valid year."))
                    })?)
                }
                "status" => {
                    options.status = Some(value.parse().map_err(|_| {
                        AshError::UserInput(
                            "Status must be one of unknown, in_progress, completed, dropped."
                                .to_string(),
                        )
                    })?)
                }
                "episodes" => {
                    options.episodes = Some(value.parse().map_err(|_| {
                        AshError::UserInput(format!("`{value}` is not a valid episode count."))
                    })?)
                }
                "playtime" => {
                    options.playtime = Some(value.parse().map_err(|_| {
                        AshError::UserInput(format!("`{value}` is not a valid minute count."))
                    })?)
                }
                _ => unreachable!("parse_kv_options filters unknown keys"),
            }
        }
        Ok(options)
    }
}

pub async fn add_recommendation(ctx: &BotContext, msg: &InboundMessage, rest: &str) -> Result<()> {
    let (name, reason) = match rest.split_once(" - ") {
        Some((name, reason)) => (name.trim(), reason.trim()),
        None => (rest.trim(), "no reason given"),
    };
    if name.is_empty() {
        return Err(AshError::UserInput(
            "Usage: `!recommend <name> - <reason>`.".to_string(),
        ));
    }

    let existing = ctx
        .db
        .list_recommendations()
        .map_err(|e| AshError::Database(e.to_string()))?;
    let needle = name.to_lowercase();
    if let Some(dup) = existing
        .iter()
        .find(|r| sequence_ratio(&r.name.to_lowercase(), &needle) >= DUP_THRESHOLD)
    {
        return Err(AshError::UserInput(format!(
            "{} is already on the list (as \"{}\").",
            name, dup.name
        )));
    }

    ctx.db
        .add_recommendation(name, reason, &msg.author_name, Utc::now())
        .map_err(|e| AshError::Database(e.to_string()))?;
    ctx.reply(msg, &format!("Noted. {} added to the recommendation list.", name))
        .await
}

pub async fn list_recommendations(
    ctx: &BotContext,
    msg: &InboundMessage,
    rest: &str,
) -> Result<()> {
    let recs = ctx
        .db
        .list_recommendations()
        .map_err(|e| AshError::Database(e.to_string()))?;
    if recs.is_empty() {
        return ctx.reply(msg, "The recommendation list is empty.").await;
    }

    let page: usize = rest.trim().parse().unwrap_or(1).max(1);
    let pages = recs.len().div_ceil(PAGE_SIZE);
    let page = page.min(pages);
    let start = (page - 1) * PAGE_SIZE;

    let lines: Vec<String> = recs
        .iter()
        .enumerate()
        .skip(start)
        .take(PAGE_SIZE)
        .map(|(i, r)| format!("`{}` **{}** — {} (by {})", i + 1, r.name, r.reason, r.added_by))
        .collect();

    let mut reply = format!("**Recommendations (page {page}/{pages}):**\n{}", lines.join("\n"));
    if pages > 1 {
        reply.push_str("\n`!listgames <page>` for more.");
    }
    ctx.reply(msg, &reply).await
}

pub async fn remove_recommendation(
    ctx: &BotContext,
    msg: &InboundMessage,
    rest: &str,
) -> Result<()> {
    require_operator(ctx, msg)?;
    let recs = ctx
        .db
        .list_recommendations()
        .map_err(|e| AshError::Database(e.to_string()))?;

    let target = if let Ok(index) = rest.trim().parse::<usize>() {
        recs.get(index.wrapping_sub(1)).cloned()
    } else {
        let needle = rest.trim().to_lowercase();
        recs.iter()
            .find(|r| r.name.to_lowercase() == needle)
            .cloned()
    };

    let Some(rec) = target else {
        return Err(AshError::UserInput(format!(
            "No recommendation matching `{}`. Use `!listgames` for indices.",
            rest.trim()
        )));
    };

    ctx.db
        .remove_recommendation(rec.id)
        .map_err(|e| AshError::Database(e.to_string()))?;
    ctx.reply(msg, &format!("{} removed from the list.", rec.name))
        .await
}

pub async fn add_played_game(ctx: &BotContext, msg: &InboundMessage, rest: &str) -> Result<()> {
    require_operator(ctx, msg)?;
    let mut parts = rest.splitn(2, '|');
    let name = parts.next().unwrap_or("").trim();
    if name.is_empty() {
        return Err(AshError::UserInput(
            "Usage: `!addplayedgame <name> [| key:value]*`.".to_string(),
        ));
    }
    let options = GameOptions::parse(parts.next().unwrap_or(""))?;

    let new = NewGame {
        canonical_name: name.to_string(),
        series_name: options.series,
        genre: options.genre,
        release_year: options.year,
        completion_status: options.status.unwrap_or_default(),
        total_episodes: options.episodes.unwrap_or(0),
        total_playtime_minutes: options.playtime.unwrap_or(0),
        confidence: 1.0,
        ..Default::default()
    };
    let game = ctx.db.insert_game(&new, Utc::now()).map_err(|e| match e {
        ashbot_db::DbError::DuplicateName { name } => {
            AshError::UserInput(format!("{} is already in the catalog.", name))
        }
        other => AshError::Database(other.to_string()),
    })?;
    ctx.reply(
        msg,
        &format!("Catalog entry #{} created for {}.", game.id, game.canonical_name),
    )
    .await
}

pub async fn game_info(ctx: &BotContext, msg: &InboundMessage, rest: &str) -> Result<()> {
    let game = lookup(ctx, rest)?;
    ctx.reply(msg, &format_game_details(&game)).await
}

pub async fn update_played_game(ctx: &BotContext, msg: &InboundMessage, rest: &str) -> Result<()> {
    require_operator(ctx, msg)?;
    let mut parts = rest.splitn(2, '|');
    let name = parts.next().unwrap_or("").trim();
    let raw_options = parts.next().unwrap_or("").trim();
    if name.is_empty() || raw_options.is_empty() {
        return Err(AshError::UserInput(
            "Usage: `!updateplayedgame <name or id> | key:value`.".to_string(),
        ));
    }

    let mut game = lookup(ctx, name)?;
    let options = GameOptions::parse(raw_options)?;

    if let Some(series) = options.series {
        game.series_name = Some(series);
    }
    if let Some(genre) = options.genre {
        game.genre = Some(genre);
    }
    if let Some(year) = options.year {
        game.release_year = Some(year);
    }
    if let Some(status) = options.status {
        game.completion_status = status;
    }
    if let Some(episodes) = options.episodes {
        game.total_episodes = episodes;
    }
    if let Some(playtime) = options.playtime {
        game.total_playtime_minutes = playtime;
    }

    ctx.db
        .save_game(&game)
        .map_err(|e| AshError::Database(e.to_string()))?;
    ctx.reply(msg, &format!("Catalog entry {} updated.", game.canonical_name))
        .await
}

pub async fn bulk_import(ctx: &BotContext, msg: &InboundMessage) -> Result<()> {
    require_operator(ctx, msg)?;
    ctx.reply(msg, "Full catalog synchronisation initiated. This may take a while.")
        .await?;

    let mut records = Vec::new();
    if let (Some(youtube), Some(channel)) = (&ctx.youtube, &ctx.media.youtube_channel_id) {
        records.extend(
            youtube
                .fetch_playlists(channel)
                .await
                .map_err(|e| AshError::Source(e.to_string()))?,
        );
    }
    if let (Some(twitch), Some(username)) = (&ctx.twitch, &ctx.media.twitch_username) {
        records.extend(
            twitch
                .fetch_archives(username)
                .await
                .map_err(|e| AshError::Source(e.to_string()))?,
        );
    }
    if records.is_empty() {
        return ctx
            .reply(msg, "No media sources configured; nothing to import.")
            .await;
    }

    let report = ctx
        .ingestor
        .ingest(&records, Utc::now())
        .await
        .map_err(|e| AshError::Source(e.to_string()))?;

    let summary = format!(
        "Synchronisation {}: {} records processed, {} created, {} updated, {} flagged for review, {} failed.",
        if report.aborted { "aborted" } else { "complete" },
        report.processed,
        report.created,
        report.updated,
        report.flagged_for_review,
        report.failed
    );
    ctx.reply(msg, &summary).await
}

fn lookup(ctx: &BotContext, key: &str) -> Result<ashbot_core::game::Game> {
    let key = key.trim();
    let found = if let Ok(id) = key.parse::<i64>() {
        ctx.db
            .game_by_id(id)
            .map_err(|e| AshError::Database(e.to_string()))?
    } else {
        ctx.db
            .find_game(key)
            .map_err(|e| AshError::Database(e.to_string()))?
    };
    found.ok_or_else(|| AshError::UserInput(format!("No catalog entry matching `{}`.", key)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_options_typed_parsing() {
        let options =
            GameOptions::parse("series:Dark Souls | year:2011 | status:completed | episodes:14")
                .unwrap();
        assert_eq!(options.series.as_deref(), Some("Dark Souls"));
        assert_eq!(options.year, Some(2011));
        assert_eq!(options.status, Some(CompletionStatus::Completed));
        assert_eq!(options.episodes, Some(14));
        assert_eq!(options.playtime, None);
    }

    #[test]
    fn game_options_reject_bad_values() {
        assert!(GameOptions::parse("year:soon").is_err());
        assert!(GameOptions::parse("status:finished").is_err());
        assert!(GameOptions::parse("mystery:value").is_err());
    }

    #[test]
    fn empty_options_are_fine() {
        assert_eq!(GameOptions::parse("").unwrap(), GameOptions::default());
    }
}
