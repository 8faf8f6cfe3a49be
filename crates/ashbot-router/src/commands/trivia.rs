//! Trivia commands: submission flow entry and session control.

use ashbot_core::gateway::InboundMessage;
use ashbot_core::Result;

use crate::commands::require_operator;
use crate::context::BotContext;
use crate::handlers::{conversation, trivia};

pub async fn add_trivia_question(ctx: &BotContext, msg: &InboundMessage) -> Result<()> {
    conversation::start_submission(ctx, msg.author_id).await?;
    if !msg.is_dm {
        ctx.reply(msg, "Check your DMs — submission continues there.").await?;
    }
    Ok(())
}

pub async fn start_trivia(ctx: &BotContext, msg: &InboundMessage) -> Result<()> {
    require_operator(ctx, msg)?;
    let summary = trivia::start_session(ctx).await?;
    ctx.reply(msg, &summary).await
}

pub async fn end_trivia(ctx: &BotContext, msg: &InboundMessage) -> Result<()> {
    require_operator(ctx, msg)?;
    let summary = trivia::end_session(ctx).await?;
    if msg.channel_id != ctx.guild.trivia_channel_id {
        ctx.reply(msg, &summary).await?;
    }
    Ok(())
}
