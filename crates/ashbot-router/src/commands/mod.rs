//! Sigil-prefixed command engine. Case-insensitive names; unknown commands
//! are ignored (they may belong to other bots).

pub mod games;
pub mod reminders;
pub mod strikes;
pub mod trivia;
pub mod utility;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use ashbot_core::gateway::InboundMessage;
use ashbot_core::{AshError, Result};

use crate::context::BotContext;

pub async fn dispatch(ctx: &BotContext, msg: &InboundMessage, text: &str) -> Result<()> {
    let body = text.trim_start().trim_start_matches('!');
    let mut parts = body.splitn(2, char::is_whitespace);
    let Some(command) = parts.next() else {
        return Ok(());
    };
    let rest = parts.next().unwrap_or("").trim();
    let command = command.to_lowercase();

    match command.as_str() {
        "strikes" => strikes::strikes(ctx, msg, rest).await,
        "resetstrikes" => strikes::reset_strikes(ctx, msg, rest).await,
        "allstrikes" => strikes::all_strikes(ctx, msg).await,
        "addgame" | "recommend" => games::add_recommendation(ctx, msg, rest).await,
        "listgames" => games::list_recommendations(ctx, msg, rest).await,
        "removegame" => games::remove_recommendation(ctx, msg, rest).await,
        "remind" => reminders::remind(ctx, msg, rest).await,
        "listreminders" => reminders::list_reminders(ctx, msg, rest).await,
        "cancelreminder" => reminders::cancel_reminder(ctx, msg, rest).await,
        "addplayedgame" => games::add_played_game(ctx, msg, rest).await,
        "gameinfo" => games::game_info(ctx, msg, rest).await,
        "updateplayedgame" => games::update_played_game(ctx, msg, rest).await,
        "bulkimportplayedgames" => games::bulk_import(ctx, msg).await,
        "ashstatus" => utility::ash_status(ctx, msg).await,
        "toggleai" => utility::toggle_ai(ctx, msg).await,
        "setpersona" => utility::set_persona(ctx, msg, rest).await,
        "announceupdate" => utility::announce_update(ctx, msg).await,
        "addtriviaquestion" => trivia::add_trivia_question(ctx, msg).await,
        "starttrivia" => trivia::start_trivia(ctx, msg).await,
        "endtrivia" => trivia::end_trivia(ctx, msg).await,
        other => {
            debug!(command = other, "unknown command ignored");
            Ok(())
        }
    }
}

/// Operator gate for privileged commands.
pub fn require_operator(ctx: &BotContext, msg: &InboundMessage) -> Result<()> {
    if ctx.is_operator(msg) {
        return Ok(());
    }
    Err(AshError::PermissionDenied {
        reason: "operator permission required".to_string(),
    })
}

/// First `<@id>` / `<@!id>` token in a string.
pub fn parse_mention(text: &str) -> Option<u64> {
    static MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"<@!?(\d+)>").unwrap());
    MENTION
        .captures(text)
        .and_then(|cap| cap[1].parse().ok())
}

/// Parse `key:value` options split on `|`, against a fixed key list.
/// Unrecognized keys error rather than silently dropping.
pub fn parse_kv_options<'a>(
    raw: &'a str,
    recognized: &[&str],
) -> Result<Vec<(String, &'a str)>> {
    let mut out = Vec::new();
    for part in raw.split('|') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let Some((key, value)) = part.split_once(':') else {
            return Err(AshError::UserInput(format!(
                "Malformed option `{part}` — expected `key:value`."
            )));
        };
        let key = key.trim().to_lowercase();
        if !recognized.contains(&key.as_str()) {
            return Err(AshError::UserInput(format!(
                "Unrecognized option `{key}`. Known keys: {}.",
                recognized.join(", ")
            )));
        }
        out.push((key, value.trim()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mention_parsing() {
        assert_eq!(parse_mention("<@123> hello"), Some(123));
        assert_eq!(parse_mention("<@!456>"), Some(456));
        assert_eq!(parse_mention("no mention"), None);
    }

    #[test]
    fn kv_options_parse_and_reject_unknown() {
        let opts = parse_kv_options("series:Dark Souls | year:2011", &["series", "year"]).unwrap();
        assert_eq!(opts[0], ("series".to_string(), "Dark Souls"));
        assert_eq!(opts[1], ("year".to_string(), "2011"));

        let err = parse_kv_options("colour:red", &["series", "year"]).unwrap_err();
        assert!(err.to_string().contains("Unrecognized option"));

        let err = parse_kv_options("justtext", &["series"]).unwrap_err();
        assert!(err.to_string().contains("Malformed option"));
    }
}
