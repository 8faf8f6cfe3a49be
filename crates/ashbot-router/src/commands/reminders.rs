//! The `!remind` command family.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

use ashbot_core::gateway::InboundMessage;
use ashbot_core::reminder::{
    format_reminder_time, parse_duration, validate_reminder_text, AutoAction, DeliveryKind,
};
use ashbot_core::{AshError, Result};
use ashbot_db::NewReminder;

use crate::commands::require_operator;
use crate::context::BotContext;
use crate::reminders::parse_natural_reminder;

/// `@user 2m text` — duration is concatenated integer-unit pairs.
static MENTION_FORMAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<@!?(\d+)>\s+(\S+)\s+(.+)$").unwrap());

static YOUTUBE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)https?://(?:www\.)?(?:youtube\.com/watch\?v=|youtu\.be/)[\w-]+").unwrap()
});

const USAGE: &str = "**Quick examples:**\n\
    • `!remind @user 2m Stand up` — mention format\n\
    • `!remind @user 1h30m Check the issue | auto:mute` — with auto-action\n\
    • `!remind me in 5 minutes to check stream` — natural language\n\
    • `!remind set reminder for 7pm to review reports`\n\n\
    Auto-actions: `auto:mute`, `auto:kick`, `auto:ban` (fire if no operator responds within 5 minutes).";

pub async fn remind(ctx: &BotContext, msg: &InboundMessage, rest: &str) -> Result<()> {
    if rest.is_empty() {
        return ctx.reply(msg, USAGE).await;
    }

    let now = Utc::now();
    let (delivery, channel_id) = if msg.is_dm {
        (DeliveryKind::DirectMessage, None)
    } else {
        (DeliveryKind::Channel, Some(msg.channel_id))
    };

    if let Some(cap) = MENTION_FORMAT.captures(rest) {
        let target: u64 = cap[1]
            .parse()
            .map_err(|_| AshError::UserInput("Unparseable user mention.".to_string()))?;
        let duration = parse_duration(&cap[2]).ok_or_else(|| {
            AshError::UserInput(
                "Invalid duration. Examples: `2m`, `1h30m`, `2d` — units s/m/h/d.".to_string(),
            )
        })?;
        let remainder = cap[3].trim();

        if target != msg.author_id && !ctx.is_operator(msg) {
            return Err(AshError::PermissionDenied {
                reason: "only operators can set reminders for other users".to_string(),
            });
        }

        let (text, auto_action) = split_auto_action(remainder)?;
        if !validate_reminder_text(&text) {
            return Err(AshError::UserInput(
                "Reminder text must be at least 3 characters of actual content.".to_string(),
            ));
        }

        let scheduled_at = now + duration;
        ctx.db
            .add_reminder(&NewReminder {
                user_id: target,
                text: text.clone(),
                scheduled_at,
                delivery,
                channel_id,
                auto_action: auto_action.clone(),
            })
            .map_err(|e| AshError::Database(e.to_string()))?;

        let mut confirmation = format!(
            "✅ Reminder set {}\n{}",
            format_reminder_time(scheduled_at, now),
            text
        );
        if let Some(action) = auto_action {
            confirmation.push_str(&format!(
                "\n⚡ Auto-action armed: {:?} (if no operator response within 5 minutes).",
                action
            ));
        }
        return ctx.reply(msg, &confirmation).await;
    }

    // Natural-language family; always targets the author.
    let parsed = parse_natural_reminder(rest, now);
    if !validate_reminder_text(&parsed.text) {
        return Err(AshError::UserInput(
            "Could not find a usable reminder message in that. Try `remind me in 10 minutes to <something>`.".to_string(),
        ));
    }

    // A video link in a reminder is a request to publish it.
    let auto_action = YOUTUBE_URL
        .find(&parsed.text)
        .map(|m| AutoAction::YoutubePost {
            url: m.as_str().to_string(),
        });

    ctx.db
        .add_reminder(&NewReminder {
            user_id: msg.author_id,
            text: parsed.text.clone(),
            scheduled_at: parsed.scheduled_at,
            delivery,
            channel_id,
            auto_action,
        })
        .map_err(|e| AshError::Database(e.to_string()))?;

    let confirmation = format!(
        "✅ Reminder set {}\n{}",
        format_reminder_time(parsed.scheduled_at, now),
        parsed.text
    );
    ctx.reply(msg, &confirmation).await
}

pub async fn list_reminders(ctx: &BotContext, msg: &InboundMessage, rest: &str) -> Result<()> {
    require_operator(ctx, msg)?;
    let filter = crate::commands::parse_mention(rest);
    let reminders = ctx
        .db
        .pending_reminders(filter)
        .map_err(|e| AshError::Database(e.to_string()))?;

    if reminders.is_empty() {
        return ctx.reply(msg, "No pending reminders.").await;
    }

    let now = Utc::now();
    let lines: Vec<String> = reminders
        .iter()
        .take(10)
        .map(|r| {
            let preview: String = r.text.chars().take(50).collect();
            format!(
                "`#{}` <@{}> — *{}* ({})",
                r.id,
                r.user_id,
                preview,
                format_reminder_time(r.scheduled_at, now)
            )
        })
        .collect();

    let mut reply = format!("**Pending reminders:**\n{}", lines.join("\n"));
    if reminders.len() > 10 {
        reply.push_str(&format!("\n…and {} more.", reminders.len() - 10));
    }
    reply.push_str("\n`!cancelreminder <id>` to cancel.");
    ctx.reply(msg, &reply).await
}

pub async fn cancel_reminder(ctx: &BotContext, msg: &InboundMessage, rest: &str) -> Result<()> {
    require_operator(ctx, msg)?;
    let id: i64 = rest.trim().parse().map_err(|_| {
        AshError::UserInput("Provide a reminder id from `!listreminders`.".to_string())
    })?;

    let cancelled = ctx
        .db
        .cancel_reminder(id, Utc::now())
        .map_err(|e| AshError::Database(e.to_string()))?;
    if cancelled {
        ctx.reply(msg, &format!("Reminder #{} cancelled.", id)).await
    } else {
        Err(AshError::UserInput(format!(
            "Reminder #{} is not pending — already delivered, cancelled, or unknown.",
            id
        )))
    }
}

/// Split a trailing ` | auto:<action>` tag off the reminder text.
fn split_auto_action(text: &str) -> Result<(String, Option<AutoAction>)> {
    let Some((body, tag)) = text.split_once(" | auto:") else {
        return Ok((text.to_string(), None));
    };
    let action = AutoAction::parse_tag(tag).ok_or_else(|| {
        AshError::UserInput(
            "Invalid auto-action. Supported: `auto:mute`, `auto:kick`, `auto:ban`.".to_string(),
        )
    })?;
    Ok((body.trim().to_string(), Some(action)))
}
