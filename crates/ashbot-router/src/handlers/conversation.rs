//! Multi-step DM dialog flows: announcement drafting, trivia submission,
//! and the creator's approval queue. Each handler consumes one message and
//! either advances the flow, finishes it, or cancels it.

use chrono::Utc;
use serde_json::json;
use tracing::info;

use ashbot_conversations::{ConversationState, FlowName};
use ashbot_core::gateway::InboundMessage;
use ashbot_core::trivia::{ApprovalStatus, QuestionType};
use ashbot_core::{AshError, Result};
use ashbot_db::NewQuestion;

use crate::context::BotContext;

pub async fn handle_step(
    ctx: &BotContext,
    msg: &InboundMessage,
    state: ConversationState,
) -> Result<()> {
    let input = msg.content.trim();

    // Explicit cancel works at every step of every flow.
    if input.eq_ignore_ascii_case("cancel") {
        ctx.conversations.end(msg.author_id, state.flow);
        return ctx.reply(msg, "Understood. Procedure cancelled.").await;
    }

    match state.flow {
        FlowName::Announcement => announcement_step(ctx, msg, &state, input).await,
        FlowName::TriviaSubmission => submission_step(ctx, msg, &state, input).await,
        FlowName::Approval => approval_step(ctx, msg, &state, input).await,
    }
}

// ── announcement ─────────────────────────────────────────────────────────

pub async fn start_announcement(ctx: &BotContext, user_id: u64) -> Result<()> {
    ctx.conversations
        .begin(user_id, FlowName::Announcement, "text_input", Utc::now());
    ctx.gateway
        .send_dm(
            user_id,
            "Announcement drafting initiated. Send the announcement text, or `cancel`.",
        )
        .await
}

async fn announcement_step(
    ctx: &BotContext,
    msg: &InboundMessage,
    state: &ConversationState,
    input: &str,
) -> Result<()> {
    match state.step.as_str() {
        "text_input" => {
            ctx.conversations.advance(
                msg.author_id,
                FlowName::Announcement,
                "preview",
                vec![("text".to_string(), json!(input))],
                Utc::now(),
            );
            let preview = format!(
                "**Preview:**\n{}\n\n`1` post — `2` edit — `3` cancel",
                format_announcement(input)
            );
            ctx.reply(msg, &preview).await
        }
        "preview" => {
            let text = state
                .data
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            match input {
                "1" | "post" | "confirm" => {
                    ctx.gateway
                        .send_channel(
                            ctx.guild.announcements_channel_id,
                            &format_announcement(&text),
                        )
                        .await?;
                    ctx.conversations.end(msg.author_id, FlowName::Announcement);
                    info!(user_id = msg.author_id, "announcement posted");
                    ctx.reply(msg, "Announcement deployed.").await
                }
                "2" | "edit" => {
                    ctx.conversations.advance(
                        msg.author_id,
                        FlowName::Announcement,
                        "text_input",
                        Vec::new(),
                        Utc::now(),
                    );
                    ctx.reply(msg, "Send the revised announcement text.").await
                }
                "3" => {
                    ctx.conversations.end(msg.author_id, FlowName::Announcement);
                    ctx.reply(msg, "Announcement discarded.").await
                }
                _ => ctx.reply(msg, "Respond `1` to post, `2` to edit, `3` to cancel.").await,
            }
        }
        other => Err(AshError::Internal(format!("unknown announcement step: {other}"))),
    }
}

fn format_announcement(text: &str) -> String {
    format!("📢 **Community update**\n\n{}\n\n— Ash, Science Officer", text)
}

// ── trivia submission ────────────────────────────────────────────────────

pub async fn start_submission(ctx: &BotContext, user_id: u64) -> Result<()> {
    ctx.conversations.begin(
        user_id,
        FlowName::TriviaSubmission,
        "question_type_selection",
        Utc::now(),
    );
    ctx.gateway
        .send_dm(
            user_id,
            "Trivia submission initiated. Question type?\n`1` single answer — `2` multiple choice\n(`cancel` at any point.)",
        )
        .await
}

async fn submission_step(
    ctx: &BotContext,
    msg: &InboundMessage,
    state: &ConversationState,
    input: &str,
) -> Result<()> {
    match state.step.as_str() {
        "question_type_selection" => {
            let qtype = match input {
                "1" => QuestionType::SingleAnswer,
                "2" => QuestionType::MultipleChoice,
                _ => {
                    return ctx
                        .reply(msg, "Respond `1` for single answer or `2` for multiple choice.")
                        .await
                }
            };
            ctx.conversations.advance(
                msg.author_id,
                FlowName::TriviaSubmission,
                "question_input",
                vec![("type".to_string(), json!(qtype))],
                Utc::now(),
            );
            ctx.reply(msg, "Send the question text.").await
        }
        "question_input" => {
            if input.len() < 10 {
                return ctx.reply(msg, "Too short for a usable question. Try again.").await;
            }
            let is_multiple = question_type(state) == QuestionType::MultipleChoice;
            ctx.conversations.advance(
                msg.author_id,
                FlowName::TriviaSubmission,
                "answer_input",
                vec![("question".to_string(), json!(input))],
                Utc::now(),
            );
            let prompt = if is_multiple {
                "Send the correct answer followed by the other choices, separated by `|`:\n`correct | choice 2 | choice 3`"
            } else {
                "Send the correct answer."
            };
            ctx.reply(msg, prompt).await
        }
        "answer_input" => {
            let parts: Vec<String> = input.split('|').map(|p| p.trim().to_string()).collect();
            let answer = parts.first().cloned().unwrap_or_default();
            if answer.is_empty() {
                return ctx.reply(msg, "An empty answer is not evaluable. Try again.").await;
            }
            let choices: Vec<String> = if parts.len() > 1 { parts } else { Vec::new() };

            ctx.conversations.advance(
                msg.author_id,
                FlowName::TriviaSubmission,
                "preview",
                vec![
                    ("answer".to_string(), json!(answer)),
                    ("choices".to_string(), json!(choices)),
                ],
                Utc::now(),
            );

            let question = state
                .data
                .get("question")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let preview = format!(
                "**Preview**\nQ: {}\nA: {}\n\n`1` submit for approval — `2` edit — `3` cancel",
                question, answer
            );
            ctx.reply(msg, &preview).await
        }
        "preview" => match input {
            "1" | "submit" | "confirm" => {
                let question = NewQuestion {
                    text: data_str(state, "question"),
                    question_type: question_type(state),
                    correct_answer: data_str(state, "answer"),
                    choices: state
                        .data
                        .get("choices")
                        .and_then(|v| serde_json::from_value(v.clone()).ok())
                        .unwrap_or_default(),
                    submitted_by: msg.author_id,
                    category: "community".to_string(),
                };
                let question_id = ctx
                    .db
                    .add_question(&question)
                    .map_err(|e| AshError::Database(e.to_string()))?;
                ctx.conversations.end(msg.author_id, FlowName::TriviaSubmission);

                start_approval(ctx, question_id).await?;
                ctx.reply(msg, "Question lodged in the approval queue. You will be notified.")
                    .await
            }
            "2" | "edit" => {
                ctx.conversations.advance(
                    msg.author_id,
                    FlowName::TriviaSubmission,
                    "question_input",
                    Vec::new(),
                    Utc::now(),
                );
                ctx.reply(msg, "Send the revised question text.").await
            }
            "3" => {
                ctx.conversations.end(msg.author_id, FlowName::TriviaSubmission);
                ctx.reply(msg, "Submission discarded.").await
            }
            _ => ctx.reply(msg, "Respond `1` to submit, `2` to edit, `3` to cancel.").await,
        },
        other => Err(AshError::Internal(format!("unknown submission step: {other}"))),
    }
}

fn question_type(state: &ConversationState) -> QuestionType {
    state
        .data
        .get("type")
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or(QuestionType::SingleAnswer)
}

fn data_str(state: &ConversationState, key: &str) -> String {
    state
        .data
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

// ── approval ─────────────────────────────────────────────────────────────

/// DM the creator a pending question and open the approval flow.
pub async fn start_approval(ctx: &BotContext, question_id: i64) -> Result<()> {
    let question = ctx
        .db
        .question_by_id(question_id)
        .map_err(|e| AshError::Database(e.to_string()))?
        .ok_or_else(|| AshError::Internal(format!("question {question_id} missing")))?;

    ctx.conversations
        .begin(ctx.guild.creator_user_id, FlowName::Approval, "decision", Utc::now());
    ctx.conversations.advance(
        ctx.guild.creator_user_id,
        FlowName::Approval,
        "decision",
        vec![("question_id".to_string(), json!(question_id))],
        Utc::now(),
    );

    let prompt = format!(
        "**Trivia approval required**\nQ: {}\nA: {}\n\n`1` approve — `2` modify — `3` reject",
        question.text, question.correct_answer
    );
    ctx.gateway.send_dm(ctx.guild.creator_user_id, &prompt).await
}

async fn approval_step(
    ctx: &BotContext,
    msg: &InboundMessage,
    state: &ConversationState,
    input: &str,
) -> Result<()> {
    let question_id = state
        .data
        .get("question_id")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| AshError::Internal("approval flow lost its question id".to_string()))?;

    match state.step.as_str() {
        "decision" => match input {
            "1" | "approve" => {
                ctx.db
                    .set_question_status(question_id, ApprovalStatus::Approved)
                    .map_err(|e| AshError::Database(e.to_string()))?;
                ctx.conversations.end(msg.author_id, FlowName::Approval);
                ctx.reply(msg, "Approved. The question is eligible for sessions.").await
            }
            "3" | "reject" => {
                ctx.db
                    .set_question_status(question_id, ApprovalStatus::Rejected)
                    .map_err(|e| AshError::Database(e.to_string()))?;
                ctx.conversations.end(msg.author_id, FlowName::Approval);
                ctx.reply(msg, "Rejected and discarded.").await
            }
            "2" | "modify" => {
                ctx.conversations.advance(
                    msg.author_id,
                    FlowName::Approval,
                    "modify_question",
                    Vec::new(),
                    Utc::now(),
                );
                ctx.reply(msg, "Send the corrected question text.").await
            }
            _ => ctx.reply(msg, "Respond `1` approve, `2` modify, `3` reject.").await,
        },
        "modify_question" => {
            let mut question = ctx
                .db
                .question_by_id(question_id)
                .map_err(|e| AshError::Database(e.to_string()))?
                .ok_or_else(|| AshError::Internal(format!("question {question_id} missing")))?;
            question.text = input.to_string();
            ctx.db
                .update_question(&question)
                .map_err(|e| AshError::Database(e.to_string()))?;

            ctx.conversations.advance(
                msg.author_id,
                FlowName::Approval,
                "modify_answer",
                Vec::new(),
                Utc::now(),
            );
            ctx.reply(msg, "Send the corrected answer (or `keep` to leave it).").await
        }
        "modify_answer" => {
            if !input.eq_ignore_ascii_case("keep") {
                let mut question = ctx
                    .db
                    .question_by_id(question_id)
                    .map_err(|e| AshError::Database(e.to_string()))?
                    .ok_or_else(|| AshError::Internal(format!("question {question_id} missing")))?;
                question.correct_answer = input.to_string();
                ctx.db
                    .update_question(&question)
                    .map_err(|e| AshError::Database(e.to_string()))?;
            }

            ctx.conversations.advance(
                msg.author_id,
                FlowName::Approval,
                "decision",
                Vec::new(),
                Utc::now(),
            );
            let question = ctx
                .db
                .question_by_id(question_id)
                .map_err(|e| AshError::Database(e.to_string()))?
                .ok_or_else(|| AshError::Internal(format!("question {question_id} missing")))?;
            let prompt = format!(
                "Updated.\nQ: {}\nA: {}\n\n`1` approve — `2` modify — `3` reject",
                question.text, question.correct_answer
            );
            ctx.reply(msg, &prompt).await
        }
        other => Err(AshError::Internal(format!("unknown approval step: {other}"))),
    }
}
