//! Catalog query handlers: each classified query kind maps to one reply
//! built from repository state. Replies stay in the persona voice without
//! spending a model call.

use ashbot_core::game::{CompletionStatus, Game};
use ashbot_core::gateway::InboundMessage;
use ashbot_core::similarity::sequence_ratio;
use ashbot_core::Result;

use crate::classify::{QueryKind, StatMetric};
use crate::context::BotContext;

pub async fn handle(ctx: &BotContext, msg: &InboundMessage, kind: QueryKind) -> Result<()> {
    let reply = match kind {
        QueryKind::Statistical { metric } => statistical(ctx, metric)?,
        QueryKind::GameStatus { name } => game_status(ctx, &name)?,
        QueryKind::Genre { genre } => genre_list(ctx, &genre)?,
        QueryKind::Year { year } => year_list(ctx, year)?,
        QueryKind::GameDetails { name } => game_details(ctx, &name)?,
        QueryKind::Recommendation { name, asking_who } => recommendation(ctx, &name, asking_who)?,
        QueryKind::YoutubeViews { name } => youtube_views(ctx, name.as_deref())?,
        QueryKind::Unknown => return Ok(()),
    };
    ctx.reply(msg, &reply).await
}

fn statistical(ctx: &BotContext, metric: StatMetric) -> Result<String> {
    let games = all_games(ctx)?;
    if games.is_empty() {
        return Ok("Analysis: the catalog is empty. No conclusions available.".to_string());
    }

    let reply = match metric {
        StatMetric::MostPlaytime => games
            .iter()
            .max_by_key(|g| g.total_playtime_minutes)
            .map(|g| {
                format!(
                    "Analysis: {} leads on recorded playtime at {}.",
                    g.canonical_name,
                    hours(g.total_playtime_minutes)
                )
            }),
        StatMetric::MostEpisodes => games
            .iter()
            .max_by_key(|g| g.total_episodes)
            .map(|g| {
                format!(
                    "Analysis: {} holds the episode record at {} episodes.",
                    g.canonical_name, g.total_episodes
                )
            }),
        StatMetric::LongestCompletion => games
            .iter()
            .filter(|g| g.completion_status == CompletionStatus::Completed)
            .max_by_key(|g| g.total_playtime_minutes)
            .map(|g| {
                format!(
                    "Analysis: among completed titles, {} took the longest at {}.",
                    g.canonical_name,
                    hours(g.total_playtime_minutes)
                )
            }),
    };
    Ok(reply.unwrap_or_else(|| "Analysis: no completed titles on record yet.".to_string()))
}

fn game_status(ctx: &BotContext, name: &str) -> Result<String> {
    match find(ctx, name)? {
        Some(game) => {
            let status = match game.completion_status {
                CompletionStatus::Completed => "completed",
                CompletionStatus::InProgress => "currently in progress",
                CompletionStatus::Dropped => "dropped",
                CompletionStatus::Unknown => "of undetermined status",
            };
            Ok(format!(
                "Affirmative. {} is on record — {} episode{}, {}.",
                game.canonical_name,
                game.total_episodes,
                if game.total_episodes == 1 { "" } else { "s" },
                status
            ))
        }
        None => Ok(format!(
            "Negative. {} does not appear in the catalog.",
            name
        )),
    }
}

fn genre_list(ctx: &BotContext, genre: &str) -> Result<String> {
    let needle = genre.to_lowercase();
    let games: Vec<Game> = all_games(ctx)?
        .into_iter()
        .filter(|g| {
            g.genre
                .as_deref()
                .is_some_and(|gg| gg.to_lowercase().contains(&needle))
        })
        .collect();

    if games.is_empty() {
        return Ok(format!("No {} titles on record.", genre));
    }
    Ok(format!(
        "{} {} title{} on record: {}.",
        games.len(),
        genre,
        if games.len() == 1 { "" } else { "s" },
        names(&games, 10)
    ))
}

fn year_list(ctx: &BotContext, year: i32) -> Result<String> {
    let games: Vec<Game> = all_games(ctx)?
        .into_iter()
        .filter(|g| g.release_year == Some(year))
        .collect();

    if games.is_empty() {
        return Ok(format!("No titles from {} on record.", year));
    }
    Ok(format!(
        "From {}: {}.",
        year,
        names(&games, 10)
    ))
}

fn game_details(ctx: &BotContext, name: &str) -> Result<String> {
    match find(ctx, name)? {
        Some(game) => Ok(format_game_details(&game)),
        None => Ok(format!("No catalog entry for {}.", name)),
    }
}

/// Shared detail renderer, also used by `!gameinfo`.
pub fn format_game_details(game: &Game) -> String {
    let mut lines = vec![format!("**{}**", game.canonical_name)];
    if let Some(series) = &game.series_name {
        lines.push(format!("Series: {}", series));
    }
    if let Some(genre) = &game.genre {
        lines.push(format!("Genre: {}", genre));
    }
    if let Some(year) = game.release_year {
        lines.push(format!("Released: {}", year));
    }
    lines.push(format!("Status: {}", game.completion_status));
    lines.push(format!(
        "Episodes: {} — playtime {}",
        game.total_episodes,
        hours(game.total_playtime_minutes)
    ));
    if !game.alternative_names.is_empty() {
        lines.push(format!("Also known as: {}", game.alternative_names.join(", ")));
    }
    if let Some(url) = &game.playlist_url {
        lines.push(format!("Playlist: {}", url));
    }
    if game.needs_review() {
        lines.push("Flagged for review (low-confidence identification).".to_string());
    }
    lines.join("\n")
}

fn recommendation(ctx: &BotContext, name: &str, asking_who: bool) -> Result<String> {
    let recs = ctx
        .db
        .list_recommendations()
        .map_err(|e| ashbot_core::AshError::Database(e.to_string()))?;

    let needle = name.to_lowercase();
    let hit = recs.iter().find(|r| {
        let candidate = r.name.to_lowercase();
        candidate == needle || sequence_ratio(&candidate, &needle) >= 0.85
    });

    Ok(match (hit, asking_who) {
        (Some(rec), true) => format!("{} was recommended by {}.", rec.name, rec.added_by),
        (Some(rec), false) => format!(
            "Affirmative. {} is on the recommendation list (\"{}\").",
            rec.name, rec.reason
        ),
        (None, _) => format!("{} is not on the recommendation list.", name),
    })
}

fn youtube_views(ctx: &BotContext, name: Option<&str>) -> Result<String> {
    // View counts live on the video service; the catalog stores the
    // playlist pointer.
    match name {
        Some(n) => match find(ctx, n)? {
            Some(game) => Ok(match &game.playlist_url {
                Some(url) => format!(
                    "View statistics for {} live on the video service: {}",
                    game.canonical_name, url
                ),
                None => format!(
                    "{} has no playlist on record, so no view data is available.",
                    game.canonical_name
                ),
            }),
            None => Ok(format!("No catalog entry for {}.", n)),
        },
        None => {
            let games = all_games(ctx)?;
            let with_playlists = games.iter().filter(|g| g.playlist_url.is_some()).count();
            Ok(format!(
                "View rankings live on the video service. {} of {} catalog entries carry a playlist link.",
                with_playlists,
                games.len()
            ))
        }
    }
}

/// Catalog facts for AI context injection on catalog-adjacent questions.
pub fn catalog_context(ctx: &BotContext) -> Result<String> {
    let games = all_games(ctx)?;
    let completed = games
        .iter()
        .filter(|g| g.completion_status == CompletionStatus::Completed)
        .count();
    let in_progress = games
        .iter()
        .filter(|g| g.completion_status == CompletionStatus::InProgress)
        .count();
    let total_minutes: u64 = games.iter().map(|g| g.total_playtime_minutes as u64).sum();

    Ok(format!(
        "The catalog holds {} games: {} completed, {} in progress. Total recorded playtime {} hours.",
        games.len(),
        completed,
        in_progress,
        total_minutes / 60
    ))
}

fn all_games(ctx: &BotContext) -> Result<Vec<Game>> {
    ctx.db
        .all_games()
        .map_err(|e| ashbot_core::AshError::Database(e.to_string()))
}

fn find(ctx: &BotContext, name: &str) -> Result<Option<Game>> {
    ctx.db
        .find_game(name)
        .map_err(|e| ashbot_core::AshError::Database(e.to_string()))
}

fn names(games: &[Game], limit: usize) -> String {
    let mut listed: Vec<&str> = games
        .iter()
        .take(limit)
        .map(|g| g.canonical_name.as_str())
        .collect();
    if games.len() > limit {
        listed.push("…");
    }
    listed.join(", ")
}

fn hours(minutes: u32) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}
