//! Sweep implementations wired into the scheduler by the binary.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc, Weekday};
use tracing::{info, warn};

use ashbot_core::config::AUTO_ACTION_GRACE_SECS;
use ashbot_core::game::CompletionStatus;
use ashbot_core::reminder::{AutoAction, DeliveryKind, Reminder};
use ashbot_scheduler::{Cadence, Sweep, SweepError};

use crate::context::BotContext;
use crate::handlers::queries::catalog_context;

/// Delivers due reminders every 30 seconds and arms their auto-actions.
pub struct ReminderSweep {
    pub ctx: Arc<BotContext>,
}

#[async_trait]
impl Sweep for ReminderSweep {
    fn name(&self) -> &'static str {
        "reminder-delivery"
    }

    fn cadence(&self) -> Cadence {
        Cadence::Every { secs: 30 }
    }

    async fn run(&self) -> Result<(), SweepError> {
        let now = Utc::now();
        let due = self.ctx.db.due_reminders(now)?;

        for reminder in due {
            match deliver(&self.ctx, &reminder).await {
                Ok(()) => {
                    // Compare-and-set: a concurrent cancel wins; a crash
                    // between send and this write shows up as a tolerated
                    // duplicate after restart.
                    if !self.ctx.db.mark_delivered(reminder.id, Utc::now())? {
                        warn!(id = reminder.id, "reminder resolved concurrently, send duplicated");
                        continue;
                    }
                    info!(id = reminder.id, user_id = reminder.user_id, "reminder delivered");

                    if let Some(action) = reminder.auto_action.clone() {
                        arm_auto_action(Arc::clone(&self.ctx), reminder.clone(), action);
                    }
                }
                Err(e) => {
                    warn!(id = reminder.id, err = %e, "reminder delivery failed");
                    self.ctx.db.mark_failed(reminder.id, &e.to_string())?;
                }
            }
        }
        Ok(())
    }
}

async fn deliver(ctx: &BotContext, reminder: &Reminder) -> ashbot_core::Result<()> {
    let text = format!("⏰ Reminder: {}", reminder.text);
    match reminder.delivery {
        DeliveryKind::DirectMessage => ctx.gateway.send_dm(reminder.user_id, &text).await,
        DeliveryKind::Channel => {
            let channel = reminder.channel_id.unwrap_or(ctx.guild.mod_alert_channel_id);
            ctx.gateway
                .send_channel(channel, &format!("<@{}> {}", reminder.user_id, text))
                .await
                .map(|_| ())
        }
    }
}

/// Spawn the grace timer: the action executes once the five-minute window
/// after the scheduled instant passes without an operator response.
fn arm_auto_action(ctx: Arc<BotContext>, reminder: Reminder, action: AutoAction) {
    tokio::spawn(async move {
        let fire_at = reminder.scheduled_at + Duration::seconds(AUTO_ACTION_GRACE_SECS);
        let wait = (fire_at - Utc::now()).num_seconds().max(0) as u64;
        tokio::time::sleep(std::time::Duration::from_secs(wait)).await;

        if ctx.operator_responded_since(reminder.scheduled_at) {
            info!(id = reminder.id, "auto-action stood down — operator responded");
            return;
        }

        let reason = format!("Auto-action from reminder #{}", reminder.id);
        let result = match &action {
            AutoAction::Mute => ctx.gateway.mute(reminder.user_id, &reason).await,
            AutoAction::Kick => ctx.gateway.kick(reminder.user_id, &reason).await,
            AutoAction::Ban => ctx.gateway.ban(reminder.user_id, &reason).await,
            AutoAction::YoutubePost { url } => ctx
                .gateway
                .send_channel(
                    ctx.guild.youtube_post_channel_id,
                    &format!("New video from <@{}>: {}", reminder.user_id, url),
                )
                .await
                .map(|_| ()),
        };

        let notice = match result {
            Ok(()) => format!("⚡ Auto-action executed for reminder #{}.", reminder.id),
            Err(e) => {
                warn!(id = reminder.id, err = %e, "auto-action failed");
                format!("⚡ Auto-action for reminder #{} failed: platform refused.", reminder.id)
            }
        };
        let _ = ctx
            .gateway
            .send_channel(ctx.guild.mod_alert_channel_id, &notice)
            .await;
    });
}

/// Purges expired AI cache entries hourly.
pub struct CacheSweep {
    pub ctx: Arc<BotContext>,
}

#[async_trait]
impl Sweep for CacheSweep {
    fn name(&self) -> &'static str {
        "cache-purge"
    }

    fn cadence(&self) -> Cadence {
        Cadence::Every { secs: 3_600 }
    }

    async fn run(&self) -> Result<(), SweepError> {
        self.ctx.ai.cache().sweep_expired(Utc::now());
        Ok(())
    }
}

/// Expires idle conversation flows every 15 minutes.
pub struct ConversationSweep {
    pub ctx: Arc<BotContext>,
}

#[async_trait]
impl Sweep for ConversationSweep {
    fn name(&self) -> &'static str {
        "conversation-expiry"
    }

    fn cadence(&self) -> Cadence {
        Cadence::Every { secs: 900 }
    }

    async fn run(&self) -> Result<(), SweepError> {
        self.ctx.conversations.sweep_expired(Utc::now());
        Ok(())
    }
}

/// Sunday 12:00 UK: re-synchronise in-progress games against their playlist
/// sources, then merge near-duplicates.
pub struct CatalogRefreshSweep {
    pub ctx: Arc<BotContext>,
}

#[async_trait]
impl Sweep for CatalogRefreshSweep {
    fn name(&self) -> &'static str {
        "catalog-refresh"
    }

    fn cadence(&self) -> Cadence {
        Cadence::WeeklyUk {
            weekday: Weekday::Sun,
            hour: 12,
            minute: 0,
        }
    }

    async fn run(&self) -> Result<(), SweepError> {
        let in_progress = self.ctx.db.games_by_status(CompletionStatus::InProgress)?;
        if in_progress.is_empty() {
            return Ok(());
        }

        let (Some(youtube), Some(channel)) =
            (&self.ctx.youtube, &self.ctx.media.youtube_channel_id)
        else {
            info!("catalog refresh skipped — video source not configured");
            return Ok(());
        };

        // Fetch the playlist catalog and keep the records belonging to
        // in-progress entries; the merge rules keep totals monotone.
        let records = youtube.fetch_playlists(channel).await?;
        let report = self.ctx.ingestor.ingest(&records, Utc::now()).await?;
        let merged = self.ctx.ingestor.dedup_sweep(Utc::now())?;
        info!(
            refreshed = report.updated,
            created = report.created,
            deduped = merged,
            "weekly catalog refresh complete"
        );
        Ok(())
    }
}

/// Monday 09:00 UK: post the weekly summary announcement.
pub struct WeeklyAnnouncementSweep {
    pub ctx: Arc<BotContext>,
}

#[async_trait]
impl Sweep for WeeklyAnnouncementSweep {
    fn name(&self) -> &'static str {
        "weekly-announcement"
    }

    fn cadence(&self) -> Cadence {
        Cadence::WeeklyUk {
            weekday: Weekday::Mon,
            hour: 9,
            minute: 0,
        }
    }

    async fn run(&self) -> Result<(), SweepError> {
        let summary = catalog_context(&self.ctx)?;
        let post = format!(
            "📋 **Monday briefing**\n\n{}\n\nAll systems nominal. — Ash",
            summary
        );
        self.ctx
            .gateway
            .send_channel(self.ctx.guild.announcements_channel_id, &post)
            .await?;
        Ok(())
    }
}
