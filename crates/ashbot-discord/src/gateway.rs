//! Outbound platform surface: the core `Gateway` trait over serenity's HTTP
//! client, with chunking and bounded retry on transient failures.

use std::sync::Arc;

use async_trait::async_trait;
use serenity::builder::EditMember;
use serenity::http::Http;
use serenity::model::channel::ReactionType;
use serenity::model::id::{ChannelId, GuildId, UserId};
use serenity::model::Timestamp;
use tracing::warn;

use ashbot_core::gateway::Gateway;
use ashbot_core::retry::RetryPolicy;
use ashbot_core::{AshError, Result};

use crate::send::split_chunks;

/// Auto-action mutes last this long.
const MUTE_SECS: i64 = 600;

pub struct DiscordGateway {
    http: Arc<Http>,
    guild_id: GuildId,
    retry: RetryPolicy,
}

impl DiscordGateway {
    pub fn new(http: Arc<Http>, guild_id: u64) -> Self {
        Self {
            http,
            guild_id: GuildId::new(guild_id.max(1)),
            retry: RetryPolicy::platform_send(),
        }
    }

    /// Run `op` under the platform-send retry policy. Upstream statuses
    /// retry only when the policy lists them; transport errors always do.
    async fn with_retry<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = std::result::Result<T, serenity::Error>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    let retriable = match response_status(&e) {
                        Some(status) => self.retry.is_retriable_status(status),
                        None => true,
                    };
                    match self.retry.delay_for(attempt) {
                        Some(delay) if retriable => {
                            warn!(err = %e, attempt, "platform send failed, retrying");
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        }
                        _ => return Err(AshError::Gateway(e.to_string())),
                    }
                }
            }
        }
    }
}

/// HTTP status carried by a failed request, when the platform answered.
fn response_status(e: &serenity::Error) -> Option<u16> {
    match e {
        serenity::Error::Http(serenity::http::HttpError::UnsuccessfulRequest(resp)) => {
            Some(resp.status_code.as_u16())
        }
        _ => None,
    }
}

#[async_trait]
impl Gateway for DiscordGateway {
    async fn send_channel(&self, channel_id: u64, text: &str) -> Result<u64> {
        let channel = ChannelId::new(channel_id);
        let mut first_id = None;
        for chunk in split_chunks(text) {
            let message = self
                .with_retry(|| channel.say(self.http.as_ref(), chunk.clone()))
                .await?;
            first_id.get_or_insert(message.id.get());
        }
        first_id.ok_or_else(|| AshError::Gateway("empty message".to_string()))
    }

    async fn send_dm(&self, user_id: u64, text: &str) -> Result<()> {
        let user = UserId::new(user_id);
        let dm = self
            .with_retry(|| user.create_dm_channel(self.http.as_ref()))
            .await?;
        for chunk in split_chunks(text) {
            self.with_retry(|| dm.id.say(self.http.as_ref(), chunk.clone()))
                .await?;
        }
        Ok(())
    }

    async fn react(&self, channel_id: u64, message_id: u64, emoji: &str) -> Result<()> {
        let reaction = ReactionType::Unicode(emoji.to_string());
        self.with_retry(|| {
            self.http.create_reaction(
                ChannelId::new(channel_id),
                serenity::model::id::MessageId::new(message_id),
                &reaction,
            )
        })
        .await
    }

    async fn mute(&self, user_id: u64, _reason: &str) -> Result<()> {
        let until = Timestamp::from_unix_timestamp(chrono::Utc::now().timestamp() + MUTE_SECS)
            .map_err(|e| AshError::Gateway(e.to_string()))?;
        let builder = EditMember::new().disable_communication_until_datetime(until);
        self.guild_id
            .edit_member(self.http.as_ref(), UserId::new(user_id), builder)
            .await
            .map(|_| ())
            .map_err(|e| AshError::Gateway(e.to_string()))
    }

    async fn kick(&self, user_id: u64, reason: &str) -> Result<()> {
        self.guild_id
            .kick_with_reason(self.http.as_ref(), UserId::new(user_id), reason)
            .await
            .map_err(|e| AshError::Gateway(e.to_string()))
    }

    async fn ban(&self, user_id: u64, reason: &str) -> Result<()> {
        self.guild_id
            .ban_with_reason(self.http.as_ref(), UserId::new(user_id), 0, reason)
            .await
            .map_err(|e| AshError::Gateway(e.to_string()))
    }
}
