//! Priority-ordered classification and dispatch of inbound messages.
//!
//! Every non-bot message is evaluated against a fixed rule ladder; the
//! first rule that matches consumes the message. Command-shaped text can
//! never fall through to the conversational or query paths.

use std::sync::Arc;

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info};

use ashbot_core::gateway::InboundMessage;
use ashbot_core::{AshError, Result};

use crate::backpressure::ErrorThrottle;
use crate::classify::{self, QueryKind};
use crate::commands;
use crate::context::BotContext;
use crate::handlers::{chat, conversation, queries, strikes, trivia};
use crate::reminders::looks_like_reminder;

/// Mention tokens are noise once the adapter resolved them to ids.
static MENTION_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"<@!?\d+>\s*").unwrap());

static ANNOUNCE_INTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:ash\s+)?(?:create|make|post|draft)\s+(?:an?\s+)?announcement\b").unwrap()
});

pub struct Router {
    ctx: Arc<BotContext>,
    throttle: ErrorThrottle,
}

impl Router {
    pub fn new(ctx: Arc<BotContext>) -> Self {
        Self {
            ctx,
            throttle: ErrorThrottle::new(),
        }
    }

    pub fn context(&self) -> &Arc<BotContext> {
        &self.ctx
    }

    /// Entry point for every inbound message. Never panics, never
    /// propagates: handler failures become a single user-visible line,
    /// throttled per user and error kind.
    pub async fn handle(&self, msg: &InboundMessage) {
        if msg.author_is_bot {
            return;
        }

        // Operator traffic in the alert channel stands down armed
        // auto-actions.
        if !msg.is_dm
            && msg.channel_id == self.ctx.guild.mod_alert_channel_id
            && self.ctx.is_operator(msg)
        {
            self.ctx.note_operator_response(Utc::now());
        }

        let Err(e) = self.route(msg).await else {
            return;
        };

        // Repeated errors of one kind to one user go quiet after the third
        // occurrence in a minute.
        let may_reply = self.throttle.should_reply(msg.author_id, e.code(), Utc::now());
        match &e {
            AshError::UserInput(reason) => {
                if may_reply {
                    let _ = self.ctx.reply(msg, reason).await;
                }
            }
            AshError::PermissionDenied { reason } => {
                info!(user_id = msg.author_id, reason, "permission denied");
                if may_reply {
                    let _ = self
                        .ctx
                        .reply(msg, "Access denied. This operation requires operator clearance.")
                        .await;
                }
            }
            other => {
                error!(user_id = msg.author_id, err = %other, code = other.code(), "handler error");
                if may_reply {
                    let _ = self.ctx.reply(msg, "System error — try again.").await;
                }
            }
        }
    }

    async fn route(&self, msg: &InboundMessage) -> Result<()> {
        let ctx = self.ctx.as_ref();
        let content = msg.content.trim();

        // Rule 1: explicit command. Fires everywhere, addressed or not.
        if content.starts_with('!') {
            return commands::dispatch(ctx, msg, content).await;
        }

        // Rule 2: active multi-step dialog (direct messages only).
        if msg.is_dm {
            if let Some(state) = ctx.conversations.active_flow(msg.author_id) {
                return conversation::handle_step(ctx, msg, state).await;
            }
        }

        // Trivia replies: a reply to an active session's question message is
        // an answer, wherever the rest of the ladder would send it.
        if let Some(reply_to) = msg.reply_to {
            if let Some(session) = ctx
                .db
                .session_by_question_message(reply_to)
                .map_err(|e| AshError::Database(e.to_string()))?
            {
                return trivia::handle_answer(ctx, msg, session).await;
            }
        }

        // Rule 3: violation-channel mentions.
        if !msg.is_dm && msg.channel_id == ctx.guild.violation_channel_id {
            if msg.mentions.is_empty() {
                return Ok(());
            }
            return strikes::handle(ctx, msg).await;
        }

        let stripped = MENTION_TOKEN.replace_all(content, "").trim().to_string();
        let lower = stripped.to_lowercase();
        let ash_prefixed = lower.starts_with("ash ");
        let normalized = if ash_prefixed {
            stripped[4..].trim().to_string()
        } else {
            stripped
        };

        let addressed = msg.is_dm || msg.mentions_bot || ash_prefixed;
        let in_mod_channel = ctx.guild.moderator_channel_ids.contains(&msg.channel_id);

        // Rule 4: addressed natural-language commands.
        if addressed {
            if looks_like_reminder(&normalized) {
                return commands::reminders::remind(ctx, msg, &normalized).await;
            }
            if ANNOUNCE_INTENT.is_match(&normalized) {
                commands::require_operator(ctx, msg)?;
                return conversation::start_announcement(ctx, msg.author_id).await;
            }
        }

        // Rule 5: catalog queries. Implicit matches are suppressed in
        // moderator channels and behind the casual-speech guard.
        let kind = classify::classify(&normalized);
        if kind != QueryKind::Unknown {
            let implicit_allowed = !in_mod_channel && !classify::is_casual_speech(&normalized);
            if addressed || implicit_allowed {
                return queries::handle(ctx, msg, kind).await;
            }
        }

        // Rule 6: general conversation for addressed messages.
        if addressed && !normalized.is_empty() {
            return chat::handle(ctx, msg, &normalized).await;
        }

        // Rule 7: background noise.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    use ashbot_ai::{AiDispatcher, RateLimiter};
    use ashbot_catalog::{CatalogIngestor, IgdbEnrichment, MetadataClient};
    use ashbot_conversations::ConversationStore;
    use ashbot_core::config::{GuildConfig, MediaConfig};
    use ashbot_core::gateway::Gateway;
    use ashbot_core::reminder::{DeliveryKind, ReminderStatus};
    use ashbot_core::trivia::QuestionType;
    use ashbot_db::{Database, NewQuestion};

    struct MockGateway {
        sent: Mutex<Vec<(u64, String)>>,
        dms: Mutex<Vec<(u64, String)>>,
        reactions: Mutex<Vec<(u64, u64, String)>>,
        next_message_id: AtomicU64,
    }

    impl MockGateway {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                dms: Mutex::new(Vec::new()),
                reactions: Mutex::new(Vec::new()),
                next_message_id: AtomicU64::new(9_000),
            }
        }

        fn channel_messages(&self) -> Vec<(u64, String)> {
            self.sent.lock().unwrap().clone()
        }

        fn dm_messages(&self) -> Vec<(u64, String)> {
            self.dms.lock().unwrap().clone()
        }

        fn reaction_count(&self) -> usize {
            self.reactions.lock().unwrap().len()
        }

        fn total_outbound(&self) -> usize {
            self.sent.lock().unwrap().len() + self.dms.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Gateway for MockGateway {
        async fn send_channel(&self, channel_id: u64, text: &str) -> ashbot_core::Result<u64> {
            self.sent.lock().unwrap().push((channel_id, text.to_string()));
            Ok(self.next_message_id.fetch_add(1, Ordering::SeqCst))
        }
        async fn send_dm(&self, user_id: u64, text: &str) -> ashbot_core::Result<()> {
            self.dms.lock().unwrap().push((user_id, text.to_string()));
            Ok(())
        }
        async fn react(
            &self,
            channel_id: u64,
            message_id: u64,
            emoji: &str,
        ) -> ashbot_core::Result<()> {
            self.reactions
                .lock()
                .unwrap()
                .push((channel_id, message_id, emoji.to_string()));
            Ok(())
        }
        async fn mute(&self, _user_id: u64, _reason: &str) -> ashbot_core::Result<()> {
            Ok(())
        }
        async fn kick(&self, _user_id: u64, _reason: &str) -> ashbot_core::Result<()> {
            Ok(())
        }
        async fn ban(&self, _user_id: u64, _reason: &str) -> ashbot_core::Result<()> {
            Ok(())
        }
    }

    struct NullMetadata;

    #[async_trait]
    impl MetadataClient for NullMetadata {
        async fn validate_and_enrich(
            &self,
            game_name: &str,
        ) -> ashbot_catalog::Result<IgdbEnrichment> {
            Ok(IgdbEnrichment {
                canonical_name: game_name.to_string(),
                ..Default::default()
            })
        }
    }

    fn guild_config() -> GuildConfig {
        GuildConfig {
            guild_id: 1,
            streamer_user_id: 900,
            creator_user_id: 901,
            violation_channel_id: 10,
            mod_alert_channel_id: 11,
            moderator_channel_ids: vec![12],
            announcements_channel_id: 13,
            trivia_channel_id: 14,
            youtube_post_channel_id: 15,
        }
    }

    fn build() -> (Router, Arc<MockGateway>, Arc<Database>) {
        let db = Arc::new(Database::open_in_memory(900).unwrap());
        let gateway = Arc::new(MockGateway::new());
        let ai = Arc::new(AiDispatcher::new(
            None,
            None,
            RateLimiter::new(1_000, Utc::now()),
            true,
            None,
        ));
        let ingestor = Arc::new(CatalogIngestor::new(db.clone(), Arc::new(NullMetadata)));
        let ctx = Arc::new(BotContext {
            db: db.clone(),
            gateway: gateway.clone(),
            ai,
            conversations: Arc::new(ConversationStore::new()),
            ingestor,
            youtube: None,
            twitch: None,
            guild: guild_config(),
            media: MediaConfig::default(),
            last_operator_response: Mutex::new(None),
        });
        (Router::new(ctx), gateway, db)
    }

    fn guild_message(author_id: u64, channel_id: u64, content: &str) -> InboundMessage {
        InboundMessage {
            message_id: 1,
            channel_id,
            author_id,
            author_name: "tester".to_string(),
            author_is_bot: false,
            author_is_moderator: false,
            author_is_member: false,
            content: content.to_string(),
            is_dm: false,
            mentions: Vec::new(),
            mentions_bot: false,
            reply_to: None,
        }
    }

    #[tokio::test]
    async fn bang_prefix_always_goes_to_the_command_engine() {
        let (router, gateway, _db) = build();

        // A known command replies through the command engine.
        router.handle(&guild_message(1, 50, "!listgames")).await;
        let sent = gateway.channel_messages();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("recommendation list is empty"));

        // Command-shaped text never reaches the query or chat paths, even
        // when it would classify.
        router
            .handle(&guild_message(1, 50, "!has jonesy played portal"))
            .await;
        assert_eq!(gateway.total_outbound(), 1);
    }

    #[tokio::test]
    async fn traditional_reminder_in_guild_channel() {
        let (router, gateway, db) = build();
        let mut msg = guild_message(42, 50, "!remind <@42> 2m Stand up");
        msg.author_is_moderator = true;

        router.handle(&msg).await;

        let sent = gateway.channel_messages();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.starts_with("✅ Reminder set in 2 minutes at"));
        assert!(sent[0].1.ends_with("Stand up"));

        let pending = db.pending_reminders(Some(42)).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].delivery, DeliveryKind::Channel);
        assert_eq!(pending[0].channel_id, Some(50));
        assert_eq!(pending[0].status, ReminderStatus::Pending);
    }

    #[tokio::test]
    async fn short_reminder_text_is_rejected() {
        let (router, gateway, db) = build();
        let mut msg = guild_message(42, 50, "!remind <@42> 2m ab");
        msg.author_is_moderator = true;

        router.handle(&msg).await;
        assert!(db.pending_reminders(None).unwrap().is_empty());
        let sent = gateway.channel_messages();
        assert!(sent[0].1.contains("at least 3 characters"));
    }

    #[tokio::test]
    async fn permission_denied_in_mod_command() {
        let (router, gateway, db) = build();
        let mut msg = guild_message(5, 12, "!strikes <@77>");
        msg.mentions = vec![77];

        router.handle(&msg).await;

        let sent = gateway.channel_messages();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("Access denied"));
        assert_eq!(db.strike_count(77).unwrap(), 0);
    }

    #[tokio::test]
    async fn violation_channel_mentions_strike() {
        let (router, gateway, db) = build();
        let mut msg = guild_message(5, 10, "<@77> spoilers again");
        msg.mentions = vec![77];

        router.handle(&msg).await;
        assert_eq!(db.strike_count(77).unwrap(), 1);

        // Alert goes to the moderator channel plus the origin channel.
        let sent = gateway.channel_messages();
        assert!(sent.iter().any(|(ch, _)| *ch == 11));

        // The streamer identity never takes a strike.
        let mut msg = guild_message(5, 10, "<@900> spoilers");
        msg.mentions = vec![900];
        router.handle(&msg).await;
        assert_eq!(db.strike_count(900).unwrap(), 0);
    }

    #[tokio::test]
    async fn violation_channel_without_mentions_is_ignored() {
        let (router, gateway, _db) = build();
        router.handle(&guild_message(5, 10, "general grumbling")).await;
        assert_eq!(gateway.total_outbound(), 0);
    }

    #[tokio::test]
    async fn casual_chatter_is_not_routed() {
        let (router, gateway, _db) = build();
        router
            .handle(&guild_message(5, 50, "and then someone recommends Portal"))
            .await;
        assert_eq!(gateway.total_outbound(), 0);
    }

    #[tokio::test]
    async fn implicit_query_fires_outside_mod_channels_only() {
        let (router, gateway, db) = build();
        db.insert_game(
            &ashbot_db::NewGame {
                canonical_name: "Portal".to_string(),
                confidence: 1.0,
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();

        // Implicit game query in a normal channel answers.
        router
            .handle(&guild_message(5, 50, "has jonesy played Portal?"))
            .await;
        assert_eq!(gateway.channel_messages().len(), 1);
        assert!(gateway.channel_messages()[0].1.contains("Affirmative"));

        // The same text in a moderator channel stays silent without
        // explicit addressing.
        router
            .handle(&guild_message(5, 12, "has jonesy played Portal?"))
            .await;
        assert_eq!(gateway.channel_messages().len(), 1);

        // Addressed with the "ash " prefix it answers there too.
        router
            .handle(&guild_message(5, 12, "ash has jonesy played Portal?"))
            .await;
        assert_eq!(gateway.channel_messages().len(), 2);
    }

    #[tokio::test]
    async fn trivia_reply_flow_first_correct_wins() {
        let (router, gateway, db) = build();

        let question_id = db
            .add_question(&NewQuestion {
                text: "What colour is the access corridor lighting?".to_string(),
                question_type: QuestionType::SingleAnswer,
                correct_answer: "blue".to_string(),
                choices: Vec::new(),
                submitted_by: 7,
                category: "community".to_string(),
            })
            .unwrap();
        db.set_question_status(question_id, ashbot_core::trivia::ApprovalStatus::Approved)
            .unwrap();
        let session_id = db.create_session(question_id, 14, 777, Utc::now()).unwrap();

        for (user, answer) in [(1u64, "Blue"), (2, "BLUE"), (3, "green")] {
            let mut msg = guild_message(user, 14, answer);
            msg.reply_to = Some(777);
            router.handle(&msg).await;
        }

        // Every answer got the acknowledgement reaction.
        assert_eq!(gateway.reaction_count(), 3);

        let answers = db.answers_for_session(session_id).unwrap();
        assert_eq!(answers.len(), 3);
        assert_eq!(answers[0].score, 1.0);
        assert_eq!(answers[1].score, 1.0);
        assert_eq!(answers[2].score, 0.0);

        let winner = db.session_winner(session_id).unwrap().unwrap();
        assert_eq!(winner.user_id, 1);
    }

    #[tokio::test]
    async fn dm_dialog_consumes_messages_first() {
        let (router, gateway, _db) = build();
        let ctx = router.context().clone();

        conversation::start_announcement(&ctx, 901).await.unwrap();
        assert_eq!(gateway.dm_messages().len(), 1);

        let msg = InboundMessage {
            message_id: 2,
            channel_id: 0,
            author_id: 901,
            author_name: "creator".to_string(),
            author_is_bot: false,
            author_is_moderator: false,
            author_is_member: false,
            content: "cancel".to_string(),
            is_dm: true,
            mentions: Vec::new(),
            mentions_bot: false,
            reply_to: None,
        };
        router.handle(&msg).await;

        assert!(ctx.conversations.active_flow(901).is_none());
        let dms = gateway.dm_messages();
        assert!(dms.last().unwrap().1.contains("cancelled"));
    }

    #[tokio::test]
    async fn bot_authors_are_ignored() {
        let (router, gateway, _db) = build();
        let mut msg = guild_message(5, 50, "!listgames");
        msg.author_is_bot = true;
        router.handle(&msg).await;
        assert_eq!(gateway.total_outbound(), 0);
    }
}
