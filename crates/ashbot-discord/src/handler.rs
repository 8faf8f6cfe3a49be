//! Serenity event handler wired to the router.

use std::sync::{Arc, OnceLock};

use serenity::async_trait;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::UserId;
use serenity::model::permissions::Permissions;
use serenity::prelude::{Context, EventHandler};
use tracing::info;

use ashbot_core::gateway::InboundMessage;
use ashbot_router::Router;

pub struct AshHandler {
    pub router: Arc<Router>,
    pub bot_id: OnceLock<UserId>,
}

impl AshHandler {
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            bot_id: OnceLock::new(),
        }
    }
}

#[async_trait]
impl EventHandler for AshHandler {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        self.bot_id.set(ready.user.id).ok();
        info!(name = %ready.user.name, guilds = ready.guilds.len(), "gateway connected");
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let bot_id = self.bot_id.get().copied();
        let inbound = to_inbound(&ctx, &msg, bot_id);
        // Awaiting here (rather than spawning) keeps per-user arrival order
        // intact through the router.
        self.router.handle(&inbound).await;
    }
}

/// Reduce a platform message to the router's view of it.
fn to_inbound(ctx: &Context, msg: &Message, bot_id: Option<UserId>) -> InboundMessage {
    let mentions_bot = bot_id.is_some_and(|id| msg.mentions_user_id(id));
    let (is_moderator, is_member) = member_flags(ctx, msg);

    InboundMessage {
        message_id: msg.id.get(),
        channel_id: msg.channel_id.get(),
        author_id: msg.author.id.get(),
        author_name: msg.author.name.clone(),
        author_is_bot: msg.author.bot,
        author_is_moderator: is_moderator,
        author_is_member: is_member,
        content: msg.content.clone(),
        is_dm: msg.guild_id.is_none(),
        mentions: msg.mentions.iter().map(|u| u.id.get()).collect(),
        mentions_bot,
        reply_to: msg
            .referenced_message
            .as_ref()
            .map(|m| m.id.get())
            .or_else(|| {
                msg.message_reference
                    .as_ref()
                    .and_then(|r| r.message_id)
                    .map(|id| id.get())
            }),
    }
}

/// (manage-messages, has-any-role), resolved from the cached guild roles.
fn member_flags(ctx: &Context, msg: &Message) -> (bool, bool) {
    let Some(guild_id) = msg.guild_id else {
        return (false, false);
    };
    let Some(member) = msg.member.as_deref() else {
        return (false, false);
    };
    let is_member = !member.roles.is_empty();

    let Some(guild) = ctx.cache.guild(guild_id) else {
        return (false, is_member);
    };
    if guild.owner_id == msg.author.id {
        return (true, is_member);
    }

    let is_moderator = member
        .roles
        .iter()
        .filter_map(|role_id| guild.roles.get(role_id))
        .any(|role| {
            role.permissions.contains(Permissions::MANAGE_MESSAGES)
                || role.permissions.contains(Permissions::ADMINISTRATOR)
        });

    (is_moderator, is_member)
}
