//! Shared service handles, passed to every handler by reference.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use ashbot_ai::AiDispatcher;
use ashbot_catalog::sources::{TwitchSource, YouTubeSource};
use ashbot_catalog::CatalogIngestor;
use ashbot_conversations::ConversationStore;
use ashbot_core::config::{GuildConfig, MediaConfig};
use ashbot_core::gateway::{Gateway, InboundMessage};
use ashbot_core::types::UserTier;
use ashbot_db::Database;

/// Everything the router and its handlers need. Built once at startup and
/// shared behind an `Arc`; there is no global lookup.
pub struct BotContext {
    pub db: Arc<Database>,
    pub gateway: Arc<dyn Gateway>,
    pub ai: Arc<AiDispatcher>,
    pub conversations: Arc<ConversationStore>,
    pub ingestor: Arc<CatalogIngestor>,
    pub youtube: Option<Arc<YouTubeSource>>,
    pub twitch: Option<Arc<TwitchSource>>,
    pub guild: GuildConfig,
    pub media: MediaConfig,
    /// Most recent operator message in the moderator alert channel; armed
    /// auto-actions stand down when an operator responded in the grace
    /// window.
    pub last_operator_response: Mutex<Option<DateTime<Utc>>>,
}

impl BotContext {
    /// Authority tier for a message author.
    pub fn tier_of(&self, msg: &InboundMessage) -> UserTier {
        if msg.author_id == self.guild.streamer_user_id {
            UserTier::Streamer
        } else if msg.author_id == self.guild.creator_user_id {
            UserTier::Creator
        } else if msg.author_is_moderator {
            UserTier::Moderator
        } else if msg.author_is_member {
            UserTier::Member
        } else {
            UserTier::Standard
        }
    }

    /// Operators: the two configured identities plus platform moderators.
    pub fn is_operator(&self, msg: &InboundMessage) -> bool {
        self.tier_of(msg).is_operator()
    }

    /// Reply in the channel the message arrived in (or by DM for DMs).
    pub async fn reply(&self, msg: &InboundMessage, text: &str) -> ashbot_core::Result<()> {
        if msg.is_dm {
            self.gateway.send_dm(msg.author_id, text).await
        } else {
            self.gateway.send_channel(msg.channel_id, text).await.map(|_| ())
        }
    }

    pub fn note_operator_response(&self, now: DateTime<Utc>) {
        *self.last_operator_response.lock().unwrap() = Some(now);
    }

    /// Whether any operator responded in the alert channel since `since`.
    pub fn operator_responded_since(&self, since: DateTime<Utc>) -> bool {
        self.last_operator_response
            .lock()
            .unwrap()
            .is_some_and(|t| t > since)
    }
}
