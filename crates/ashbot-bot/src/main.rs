//! Process entry point: configuration, wiring, scheduler, gateway, shutdown.
//!
//! Exit codes: 0 normal shutdown, 1 configuration error, 2 invalid
//! credentials, 3 unrecoverable platform/provider failure.

use std::sync::{Arc, Mutex};

use chrono::Utc;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use ashbot_ai::anthropic::AnthropicProvider;
use ashbot_ai::gemini::GeminiProvider;
use ashbot_ai::{AiDispatcher, LlmProvider, RateLimiter};
use ashbot_catalog::igdb::OfflineMetadata;
use ashbot_catalog::sources::{TwitchSource, YouTubeSource};
use ashbot_catalog::{CatalogIngestor, IgdbClient, MetadataClient};
use ashbot_conversations::ConversationStore;
use ashbot_core::config::AshConfig;
use ashbot_db::Database;
use ashbot_discord::gateway::DiscordGateway;
use ashbot_discord::handler::AshHandler;
use ashbot_router::sweeps::{
    CacheSweep, CatalogRefreshSweep, ConversationSweep, ReminderSweep, WeeklyAnnouncementSweep,
};
use ashbot_router::{BotContext, Router};
use ashbot_scheduler::SweepEngine;

/// Requests per minute shared across both model providers.
const GLOBAL_AI_RPM: u32 = 60;

#[derive(Parser)]
#[command(name = "ashbot", about = "Discord-resident automation service")]
struct Args {
    /// Path to the TOML config file (env vars still take precedence).
    #[arg(long, default_value = "ashbot.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ashbot=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = match AshConfig::load(Some(&args.config)) {
        Ok(config) => config,
        Err(e) => {
            error!(err = %e, "startup failed");
            std::process::exit(e.exit_code());
        }
    };

    let db = match Database::open(&config.database.url, config.guild.streamer_user_id) {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!(err = %e, "repository unreachable at startup");
            std::process::exit(1);
        }
    };

    // AI stack. Persisted operator settings win over file defaults.
    let ai_enabled = match db.get_config("ai_enabled") {
        Ok(Some(v)) => v == "true",
        _ => config.ai.enabled,
    };
    let persona_extra = db
        .get_config("persona_extra")
        .ok()
        .flatten()
        .filter(|v| !v.is_empty())
        .or_else(|| config.ai.persona_extra.clone());

    let primary: Option<Box<dyn LlmProvider>> = config
        .ai
        .primary_api_key
        .clone()
        .map(|key| Box::new(GeminiProvider::new(key, None)) as Box<dyn LlmProvider>);
    let backup: Option<Box<dyn LlmProvider>> = config
        .ai
        .backup_api_key
        .clone()
        .map(|key| Box::new(AnthropicProvider::new(key, None)) as Box<dyn LlmProvider>);
    if ai_enabled && primary.is_none() && backup.is_none() {
        warn!("AI enabled but no provider keys configured; conversational replies degrade");
    }
    let ai = Arc::new(AiDispatcher::new(
        primary,
        backup,
        RateLimiter::new(GLOBAL_AI_RPM, Utc::now()),
        ai_enabled,
        persona_extra,
    ));

    // Catalog stack. The metadata client falls back to Twitch credentials;
    // without any it degrades to extraction-only (everything flagged).
    let metadata: Arc<dyn MetadataClient> = match config.media.igdb_credentials() {
        Some((igdb_id, igdb_secret)) => Arc::new(IgdbClient::new(igdb_id, igdb_secret)),
        None => {
            warn!("metadata service credentials missing; catalog validation degraded");
            Arc::new(OfflineMetadata)
        }
    };
    let ingestor = Arc::new(CatalogIngestor::new(Arc::clone(&db), metadata));

    let youtube = config
        .media
        .youtube_api_key
        .clone()
        .map(|key| Arc::new(YouTubeSource::new(key)));
    let twitch = match (
        config.media.twitch_client_id.clone(),
        config.media.twitch_client_secret.clone(),
    ) {
        (Some(id), Some(secret)) => Some(Arc::new(TwitchSource::new(id, secret))),
        _ => None,
    };

    // Gateway and router.
    let http = Arc::new(serenity::http::Http::new(&config.discord.token));
    let gateway = Arc::new(DiscordGateway::new(http, config.guild.guild_id));
    let ctx = Arc::new(BotContext {
        db,
        gateway,
        ai,
        conversations: Arc::new(ConversationStore::new()),
        ingestor,
        youtube,
        twitch,
        guild: config.guild.clone(),
        media: config.media.clone(),
        last_operator_response: Mutex::new(None),
    });
    let router = Arc::new(Router::new(Arc::clone(&ctx)));

    // Scheduler.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut engine = SweepEngine::new();
    let now = Utc::now();
    engine.register(Arc::new(ReminderSweep { ctx: Arc::clone(&ctx) }), now);
    engine.register(Arc::new(CacheSweep { ctx: Arc::clone(&ctx) }), now);
    engine.register(Arc::new(ConversationSweep { ctx: Arc::clone(&ctx) }), now);
    engine.register(Arc::new(CatalogRefreshSweep { ctx: Arc::clone(&ctx) }), now);
    engine.register(Arc::new(WeeklyAnnouncementSweep { ctx: Arc::clone(&ctx) }), now);
    let engine_task = tokio::spawn(engine.run(shutdown_rx.clone()));

    // Ctrl-C triggers the coordinated shutdown.
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            let _ = signal_tx.send(true);
        }
    });

    info!("starting gateway client");
    let handler = AshHandler::new(router);
    let result = ashbot_discord::run_client(&config.discord.token, handler, shutdown_rx).await;

    // Gateway exit: either the shutdown signal stopped the shards (normal)
    // or the connection failed outright.
    let exit_code = match result {
        Ok(()) => 0,
        Err(e) => {
            let text = e.to_string();
            error!(err = %text, "gateway client terminated");
            if text.to_lowercase().contains("authentication") {
                2
            } else {
                3
            }
        }
    };

    // Give in-flight sweeps their grace, flush dialog state, leave.
    let _ = shutdown_tx.send(true);
    let _ = engine_task.await;
    ctx.conversations.clear();
    info!("shutdown complete");

    if exit_code != 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}
