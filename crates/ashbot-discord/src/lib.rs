//! Thin serenity adapter: inbound events become [`InboundMessage`] values
//! for the router; outbound traffic goes through the [`DiscordGateway`]
//! implementation of the core `Gateway` trait.
//!
//! [`InboundMessage`]: ashbot_core::gateway::InboundMessage

pub mod gateway;
pub mod handler;
pub mod send;

use std::sync::Arc;

use serenity::prelude::GatewayIntents;
use tokio::sync::watch;
use tracing::info;

use handler::AshHandler;

/// Build and run the platform client until the shutdown signal fires.
pub async fn run_client(
    token: &str,
    handler: AshHandler,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), serenity::Error> {
    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_MEMBERS
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = serenity::Client::builder(token, intents)
        .event_handler(handler)
        .await?;

    let shard_manager = Arc::clone(&client.shard_manager);
    tokio::spawn(async move {
        loop {
            if shutdown.changed().await.is_err() {
                break;
            }
            if *shutdown.borrow() {
                info!("shutdown signal received, stopping gateway shards");
                shard_manager.shutdown_all().await;
                break;
            }
        }
    });

    client.start().await
}
