//! Configuration loading (ashbot.toml + ASHBOT_* env overrides + the
//! well-known environment variables).

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{AshError, Result};

/// Seconds a conversation flow may idle before the sweep abandons it.
pub const CONVERSATION_IDLE_TTL_SECS: i64 = 3_600;

/// Grace period after a reminder fires before its auto-action executes.
pub const AUTO_ACTION_GRACE_SECS: i64 = 300;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AshConfig {
    /// Defaulted so a bare environment-variable deployment (no TOML file)
    /// still extracts; validation catches genuinely missing values.
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub guild: GuildConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DiscordConfig {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DatabaseConfig {
    /// SQLite path (the `DATABASE_URL` environment variable).
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AiConfig {
    pub primary_api_key: Option<String>,
    pub backup_api_key: Option<String>,
    /// Operator kill switch (`!toggleai`). Persisted in the config table;
    /// this is only the startup default.
    #[serde(default = "bool_true")]
    pub enabled: bool,
    /// Extra persona text appended by `!setpersona`.
    #[serde(default)]
    pub persona_extra: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MediaConfig {
    pub youtube_api_key: Option<String>,
    pub youtube_channel_id: Option<String>,
    pub twitch_client_id: Option<String>,
    pub twitch_client_secret: Option<String>,
    pub twitch_username: Option<String>,
    /// Fall back to the Twitch credentials when unset (IGDB is Twitch-owned).
    pub igdb_client_id: Option<String>,
    pub igdb_client_secret: Option<String>,
}

impl MediaConfig {
    pub fn igdb_credentials(&self) -> Option<(String, String)> {
        let id = self.igdb_client_id.clone().or_else(|| self.twitch_client_id.clone())?;
        let secret = self
            .igdb_client_secret
            .clone()
            .or_else(|| self.twitch_client_secret.clone())?;
        Some((id, secret))
    }
}

/// Guild identities and designated channels.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GuildConfig {
    pub guild_id: u64,
    /// The streamer identity — never accrues strikes, gets deferential phrasing.
    pub streamer_user_id: u64,
    /// The bot's creator — receives trivia approval DMs.
    pub creator_user_id: u64,
    /// Channel where mentions trigger strike increments.
    pub violation_channel_id: u64,
    /// Channel receiving strike alerts and auto-action notices.
    pub mod_alert_channel_id: u64,
    /// Channels where the bot only answers when explicitly addressed.
    #[serde(default)]
    pub moderator_channel_ids: Vec<u64>,
    /// Target for the announcement flow and the weekly summary.
    pub announcements_channel_id: u64,
    /// Channel trivia sessions post into.
    pub trivia_channel_id: u64,
    /// Channel `youtube_post` auto-actions post into.
    pub youtube_post_channel_id: u64,
}

impl AshConfig {
    /// Load from a TOML file with `ASHBOT_*` overrides, then pick up the
    /// well-known environment variables. Fails with a config error when the
    /// database location is missing and a credentials error when the
    /// platform token is missing.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path.unwrap_or("ashbot.toml");

        let mut config: AshConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("ASHBOT_").split("_"))
            .extract()
            .map_err(|e| AshError::Config(e.to_string()))?;

        config.apply_env_vars();
        config.validate()?;
        Ok(config)
    }

    /// The deployment contract names these variables directly, without the
    /// ASHBOT_ prefix; they win over file values when present.
    fn apply_env_vars(&mut self) {
        if let Ok(v) = std::env::var("DISCORD_TOKEN") {
            self.discord.token = v;
        }
        if let Ok(v) = std::env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = std::env::var("PRIMARY_AI_API_KEY") {
            self.ai.primary_api_key = Some(v);
        }
        if let Ok(v) = std::env::var("BACKUP_AI_API_KEY") {
            self.ai.backup_api_key = Some(v);
        }
        if let Ok(v) = std::env::var("YOUTUBE_API_KEY") {
            self.media.youtube_api_key = Some(v);
        }
        if let Ok(v) = std::env::var("TWITCH_CLIENT_ID") {
            self.media.twitch_client_id = Some(v);
        }
        if let Ok(v) = std::env::var("TWITCH_CLIENT_SECRET") {
            self.media.twitch_client_secret = Some(v);
        }
        if let Ok(v) = std::env::var("IGDB_CLIENT_ID") {
            self.media.igdb_client_id = Some(v);
        }
        if let Ok(v) = std::env::var("IGDB_CLIENT_SECRET") {
            self.media.igdb_client_secret = Some(v);
        }
    }

    fn validate(&self) -> Result<()> {
        if self.database.url.trim().is_empty() {
            return Err(AshError::Config("DATABASE_URL is not set".to_string()));
        }
        if self.discord.token.trim().is_empty() {
            return Err(AshError::Credentials("DISCORD_TOKEN is not set".to_string()));
        }
        Ok(())
    }
}

fn bool_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn igdb_falls_back_to_twitch_credentials() {
        let media = MediaConfig {
            twitch_client_id: Some("tid".to_string()),
            twitch_client_secret: Some("tsecret".to_string()),
            ..Default::default()
        };
        assert_eq!(
            media.igdb_credentials(),
            Some(("tid".to_string(), "tsecret".to_string()))
        );

        let media = MediaConfig {
            igdb_client_id: Some("iid".to_string()),
            igdb_client_secret: Some("isecret".to_string()),
            twitch_client_id: Some("tid".to_string()),
            twitch_client_secret: Some("tsecret".to_string()),
            ..Default::default()
        };
        assert_eq!(
            media.igdb_credentials(),
            Some(("iid".to_string(), "isecret".to_string()))
        );
    }

    #[test]
    fn missing_credentials_are_distinct_from_config_errors() {
        let config = AshConfig {
            discord: DiscordConfig { token: String::new() },
            database: DatabaseConfig { url: "/tmp/ash.db".to_string() },
            ai: AiConfig::default(),
            media: MediaConfig::default(),
            guild: GuildConfig::default(),
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let config = AshConfig {
            discord: DiscordConfig { token: "t".to_string() },
            database: DatabaseConfig { url: String::new() },
            ai: AiConfig::default(),
            media: MediaConfig::default(),
            guild: GuildConfig::default(),
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }
}
