//! General conversation: the AI path for addressed messages that matched
//! neither a command nor a catalog query.

use ashbot_ai::cache::QueryType;
use ashbot_ai::AiOutcome;
use ashbot_core::gateway::InboundMessage;
use ashbot_core::types::RequestPriority;
use ashbot_core::Result;

use crate::context::BotContext;
use crate::handlers::queries::catalog_context;

pub async fn handle(ctx: &BotContext, msg: &InboundMessage, text: &str) -> Result<()> {
    let tier = ctx.tier_of(msg);
    let priority = if tier.is_operator() {
        RequestPriority::High
    } else {
        RequestPriority::Medium
    };

    // Catalog facts go in only for catalog-adjacent questions.
    let query_type = QueryType::detect(text);
    let context = if query_type == QueryType::GamingQuery {
        Some(catalog_context(ctx)?)
    } else {
        None
    };

    let outcome = ctx
        .ai
        .dispatch(
            msg.author_id,
            tier,
            priority,
            text,
            Some(query_type),
            context.as_deref(),
        )
        .await;

    let reply = match outcome {
        AiOutcome::Ok(text) => text,
        AiOutcome::Disabled => {
            "Conversational subsystems are offline by operator directive.".to_string()
        }
        AiOutcome::RateLimited { retry_after_secs } => format!(
            "Processing queue saturated. Retry in {} seconds.",
            retry_after_secs.max(1)
        ),
        AiOutcome::QuotaExhausted | AiOutcome::UpstreamError | AiOutcome::Timeout => {
            "Cognitive subsystems are busy. Try again shortly.".to_string()
        }
    };
    ctx.reply(msg, &reply).await
}
