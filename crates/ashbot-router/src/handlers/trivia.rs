//! Trivia sessions: question posting, reply-matched answers, completion.

use chrono::Utc;
use tracing::info;

use ashbot_core::gateway::InboundMessage;
use ashbot_core::trivia::{evaluate_answer, SessionState, TriviaSession};
use ashbot_core::{AshError, Result};

use crate::context::BotContext;

/// Reaction acknowledging a recorded answer.
const ANSWER_ACK: &str = "\u{1f4dd}"; // 📝

/// Start a session with the least-recently-used approved question.
pub async fn start_session(ctx: &BotContext) -> Result<String> {
    let question = ctx
        .db
        .next_session_question()
        .map_err(db_err)?
        .ok_or_else(|| AshError::UserInput("No approved trivia questions available.".to_string()))?;

    let active = ctx.db.active_sessions().map_err(db_err)?;
    if !active.is_empty() {
        return Err(AshError::UserInput(
            "A trivia session is already active.".to_string(),
        ));
    }

    let post = format!(
        "**Trivia time.** {}\n\nReply to this message with your answer.",
        question.text
    );
    let message_id = ctx
        .gateway
        .send_channel(ctx.guild.trivia_channel_id, &post)
        .await?;

    let session_id = ctx
        .db
        .create_session(question.id, ctx.guild.trivia_channel_id, message_id, Utc::now())
        .map_err(db_err)?;

    info!(session_id, question_id = question.id, "trivia session started");
    Ok(format!("Trivia session #{} started.", session_id))
}

/// Handle a reply to an active session's question message.
pub async fn handle_answer(
    ctx: &BotContext,
    msg: &InboundMessage,
    session: TriviaSession,
) -> Result<()> {
    let question = ctx
        .db
        .question_by_id(session.question_id)
        .map_err(db_err)?
        .ok_or_else(|| AshError::Internal(format!("session {} has no question", session.id)))?;

    let (score, match_kind) = evaluate_answer(msg.content.trim(), &question.correct_answer);
    let ordinal = ctx
        .db
        .add_answer(session.id, msg.author_id, msg.content.trim(), score, match_kind)
        .map_err(db_err)?;

    info!(
        session_id = session.id,
        user_id = msg.author_id,
        score,
        kind = %match_kind,
        ordinal,
        "trivia answer recorded"
    );

    ctx.gateway
        .react(msg.channel_id, msg.message_id, ANSWER_ACK)
        .await
}

/// Complete the active session: the first full-score answer wins; with none,
/// the session still ends and the correct answer is revealed.
pub async fn end_session(ctx: &BotContext) -> Result<String> {
    let sessions = ctx.db.active_sessions().map_err(db_err)?;
    let Some(session) = sessions.into_iter().next() else {
        return Err(AshError::UserInput("No active trivia session.".to_string()));
    };
    debug_assert_eq!(session.state, SessionState::Active);

    if !ctx.db.complete_session(session.id, Utc::now()).map_err(db_err)? {
        return Err(AshError::UserInput("Session already resolved.".to_string()));
    }

    let question = ctx
        .db
        .question_by_id(session.question_id)
        .map_err(db_err)?
        .ok_or_else(|| AshError::Internal(format!("session {} has no question", session.id)))?;
    let winner = ctx.db.session_winner(session.id).map_err(db_err)?;

    let summary = match winner {
        Some(answer) => format!(
            "Trivia concluded. Correct answer: **{}**. First correct: <@{}>.",
            question.correct_answer, answer.user_id
        ),
        None => format!(
            "Trivia concluded. Correct answer: **{}**. No correct answers this round.",
            question.correct_answer
        ),
    };
    ctx.gateway
        .send_channel(session.channel_id, &summary)
        .await?;
    Ok(summary)
}

fn db_err(e: ashbot_db::DbError) -> AshError {
    AshError::Database(e.to_string())
}
