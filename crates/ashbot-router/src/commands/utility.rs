//! Operator utility commands: health summary, AI configuration, and the
//! announcement flow entry point.

use chrono::Utc;

use ashbot_core::gateway::InboundMessage;
use ashbot_core::{AshError, Result};

use crate::commands::require_operator;
use crate::context::BotContext;
use crate::handlers::conversation;

pub async fn ash_status(ctx: &BotContext, msg: &InboundMessage) -> Result<()> {
    if !ctx.is_operator(msg) {
        // Public callers get the short form.
        return ctx
            .reply(msg, "All systems functional. Efficiency within parameters.")
            .await;
    }

    let games = ctx
        .db
        .all_games()
        .map_err(|e| AshError::Database(e.to_string()))?;
    let flagged = games.iter().filter(|g| g.needs_review()).count();
    let missing_genre = games.iter().filter(|g| g.genre.is_none()).count();
    let missing_series = games.iter().filter(|g| g.series_name.is_none()).count();
    let pending_reminders = ctx
        .db
        .pending_reminders(None)
        .map_err(|e| AshError::Database(e.to_string()))?
        .len();
    let pending_questions = ctx
        .db
        .pending_questions()
        .map_err(|e| AshError::Database(e.to_string()))?
        .len();
    let cache = ctx.ai.cache().stats();

    let mut report = format!(
        "**System status**\n\
         Catalog: {} entries ({} flagged for review, {} missing genre, {} missing series)\n\
         Reminders pending: {}\n\
         Trivia approvals pending: {}\n\
         Conversations active: {}\n\
         AI: {} — cache {} entries, {:.1}% hit rate, {} calls saved",
        games.len(),
        flagged,
        missing_genre,
        missing_series,
        pending_reminders,
        pending_questions,
        ctx.conversations.active_count(),
        if ctx.ai.is_enabled() { "online" } else { "offline" },
        cache.cache_size,
        cache.hit_rate(),
        cache.api_calls_saved,
    );

    let top = ctx.ai.cache().info(3, Utc::now());
    if !top.is_empty() {
        report.push_str("\nHot cache entries:");
        for entry in top {
            report.push_str(&format!("\n• \"{}\" ({} hits)", entry.query, entry.hits));
        }
    }

    ctx.reply(msg, &report).await
}

pub async fn toggle_ai(ctx: &BotContext, msg: &InboundMessage) -> Result<()> {
    require_operator(ctx, msg)?;
    let enabled = ctx.ai.toggle_enabled();
    ctx.db
        .set_config("ai_enabled", if enabled { "true" } else { "false" })
        .map_err(|e| AshError::Database(e.to_string()))?;
    ctx.reply(
        msg,
        if enabled {
            "Conversational subsystems restored."
        } else {
            "Conversational subsystems suspended."
        },
    )
    .await
}

pub async fn set_persona(ctx: &BotContext, msg: &InboundMessage, rest: &str) -> Result<()> {
    require_operator(ctx, msg)?;
    if rest.is_empty() {
        ctx.ai.set_persona_extra(None);
        ctx.db
            .set_config("persona_extra", "")
            .map_err(|e| AshError::Database(e.to_string()))?;
        return ctx.reply(msg, "Persona addendum cleared.").await;
    }

    ctx.ai.set_persona_extra(Some(rest.to_string()));
    ctx.db
        .set_config("persona_extra", rest)
        .map_err(|e| AshError::Database(e.to_string()))?;
    ctx.reply(msg, "Persona addendum recorded.").await
}

pub async fn announce_update(ctx: &BotContext, msg: &InboundMessage) -> Result<()> {
    require_operator(ctx, msg)?;
    conversation::start_announcement(ctx, msg.author_id).await?;
    if !msg.is_dm {
        ctx.reply(msg, "Check your DMs — drafting continues there.").await?;
    }
    Ok(())
}
