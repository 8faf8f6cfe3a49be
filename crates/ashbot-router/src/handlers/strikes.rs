//! Violation-channel strike detection: every mentioned user takes one
//! strike; the streamer identity is excluded at the repository layer.

use tracing::warn;

use ashbot_core::gateway::InboundMessage;
use ashbot_core::Result;
use ashbot_db::DbError;

use crate::context::BotContext;

pub async fn handle(ctx: &BotContext, msg: &InboundMessage) -> Result<()> {
    let mut lines = Vec::new();

    for &user_id in &msg.mentions {
        match ctx.db.add_strike(user_id) {
            Ok(count) => {
                lines.push(format!(
                    "<@{}> now has {} strike{}.",
                    user_id,
                    count,
                    if count == 1 { "" } else { "s" }
                ));
            }
            Err(DbError::StrikeExempt) => {
                // Alert logged at the repository; no state change, no reply.
                warn!(user_id, "strike against the streamer identity ignored");
            }
            Err(e) => return Err(ashbot_core::AshError::Database(e.to_string())),
        }
    }

    if lines.is_empty() {
        return Ok(());
    }

    let report = format!("Strike recorded. {}", lines.join(" "));
    ctx.gateway
        .send_channel(ctx.guild.mod_alert_channel_id, &report)
        .await?;
    ctx.reply(msg, &report).await
}
