//! Platform gateway contract.
//!
//! The chat platform client itself lives in its own adapter crate; the rest
//! of the workspace sees inbound traffic as [`InboundMessage`] values and
//! performs all outbound actions through the [`Gateway`] trait.

use async_trait::async_trait;

use crate::error::Result;

/// A non-bot message as seen by the router, already resolved by the adapter:
/// mention lists are user ids, and the moderator flag reflects the
/// platform's manage-messages permission.
#[derive(Debug, Clone, Default)]
pub struct InboundMessage {
    pub message_id: u64,
    pub channel_id: u64,
    pub author_id: u64,
    pub author_name: String,
    pub author_is_bot: bool,
    pub author_is_moderator: bool,
    /// Holds the community member role (affects the AI persona register).
    pub author_is_member: bool,
    pub content: String,
    pub is_dm: bool,
    /// Users mentioned in the message, in order of appearance.
    pub mentions: Vec<u64>,
    pub mentions_bot: bool,
    /// Message this one replies to, when the platform reports one.
    pub reply_to: Option<u64>,
}

/// Outbound surface of the chat platform.
///
/// Implementations own chunking and retry; callers treat each method as a
/// single logical send.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Post to a channel. Returns the posted message's identifier (needed by
    /// trivia to match replies).
    async fn send_channel(&self, channel_id: u64, text: &str) -> Result<u64>;

    /// Send a direct message.
    async fn send_dm(&self, user_id: u64, text: &str) -> Result<()>;

    /// Add a reaction to an existing message.
    async fn react(&self, channel_id: u64, message_id: u64, emoji: &str) -> Result<()>;

    /// Time a member out (reminder auto-action).
    async fn mute(&self, user_id: u64, reason: &str) -> Result<()>;

    /// Remove a member from the guild (reminder auto-action).
    async fn kick(&self, user_id: u64, reason: &str) -> Result<()>;

    /// Ban a member (reminder auto-action).
    async fn ban(&self, user_id: u64, reason: &str) -> Result<()>;
}
