//! Strike ledger commands (operator only).

use ashbot_core::gateway::InboundMessage;
use ashbot_core::{AshError, Result};

use crate::commands::{parse_mention, require_operator};
use crate::context::BotContext;

pub async fn strikes(ctx: &BotContext, msg: &InboundMessage, rest: &str) -> Result<()> {
    require_operator(ctx, msg)?;
    let Some(user_id) = parse_mention(rest).or_else(|| msg.mentions.first().copied()) else {
        return Err(AshError::UserInput(
            "Specify a user: `!strikes @user`.".to_string(),
        ));
    };

    let count = ctx
        .db
        .strike_count(user_id)
        .map_err(|e| AshError::Database(e.to_string()))?;
    ctx.reply(
        msg,
        &format!(
            "<@{}> has {} strike{} on record.",
            user_id,
            count,
            if count == 1 { "" } else { "s" }
        ),
    )
    .await
}

pub async fn reset_strikes(ctx: &BotContext, msg: &InboundMessage, rest: &str) -> Result<()> {
    require_operator(ctx, msg)?;
    let Some(user_id) = parse_mention(rest).or_else(|| msg.mentions.first().copied()) else {
        return Err(AshError::UserInput(
            "Specify a user: `!resetstrikes @user`.".to_string(),
        ));
    };

    ctx.db
        .reset_strikes(user_id)
        .map_err(|e| AshError::Database(e.to_string()))?;
    ctx.reply(msg, &format!("Strike record for <@{}> cleared.", user_id))
        .await
}

pub async fn all_strikes(ctx: &BotContext, msg: &InboundMessage) -> Result<()> {
    require_operator(ctx, msg)?;
    let all = ctx
        .db
        .all_strikes()
        .map_err(|e| AshError::Database(e.to_string()))?;

    if all.is_empty() {
        return ctx.reply(msg, "No strikes on record. Commendable.").await;
    }

    let lines: Vec<String> = all
        .iter()
        .map(|(user_id, count)| format!("<@{}>: {}", user_id, count))
        .collect();
    ctx.reply(msg, &format!("**Strike register:**\n{}", lines.join("\n")))
        .await
}
