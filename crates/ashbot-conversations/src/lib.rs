//! Per-user multi-step dialog state.
//!
//! Flows are short DM dialogs (announcement drafting, trivia submission,
//! approval). State lives in memory with an owned lifecycle: created at
//! startup, flushed on shutdown, swept on idle expiry. At most one active
//! flow per (user, flow name).

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use ashbot_core::config::CONVERSATION_IDLE_TTL_SECS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowName {
    Announcement,
    TriviaSubmission,
    Approval,
}

impl fmt::Display for FlowName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FlowName::Announcement => "announcement",
            FlowName::TriviaSubmission => "trivia_submission",
            FlowName::Approval => "approval",
        };
        write!(f, "{s}")
    }
}

/// One user's position inside a flow.
#[derive(Debug, Clone)]
pub struct ConversationState {
    pub flow: FlowName,
    pub step: String,
    /// Data accumulated across steps (typed by the flow's step handlers).
    pub data: HashMap<String, serde_json::Value>,
    pub last_activity: DateTime<Utc>,
}

pub struct ConversationStore {
    states: Mutex<HashMap<(u64, FlowName), ConversationState>>,
}

impl Default for ConversationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationStore {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Start (or restart) a flow for a user at the given step. An existing
    /// flow of the same name is replaced.
    pub fn begin(&self, user_id: u64, flow: FlowName, step: &str, now: DateTime<Utc>) {
        let mut states = self.states.lock().unwrap();
        states.insert(
            (user_id, flow),
            ConversationState {
                flow,
                step: step.to_string(),
                data: HashMap::new(),
                last_activity: now,
            },
        );
        info!(user_id, %flow, step, "conversation flow started");
    }

    /// The user's active flow, if any. A user can be in at most one flow
    /// per flow name; when several names are active the earliest-started is
    /// not tracked — callers check by name or use this to find any.
    pub fn active_flow(&self, user_id: u64) -> Option<ConversationState> {
        let states = self.states.lock().unwrap();
        [FlowName::Approval, FlowName::TriviaSubmission, FlowName::Announcement]
            .iter()
            .find_map(|flow| states.get(&(user_id, *flow)).cloned())
    }

    pub fn get(&self, user_id: u64, flow: FlowName) -> Option<ConversationState> {
        let states = self.states.lock().unwrap();
        states.get(&(user_id, flow)).cloned()
    }

    /// Advance the flow to a new step, merging in accumulated data and
    /// refreshing the activity timestamp.
    pub fn advance(
        &self,
        user_id: u64,
        flow: FlowName,
        step: &str,
        data: Vec<(String, serde_json::Value)>,
        now: DateTime<Utc>,
    ) {
        let mut states = self.states.lock().unwrap();
        if let Some(state) = states.get_mut(&(user_id, flow)) {
            state.step = step.to_string();
            state.data.extend(data);
            state.last_activity = now;
            debug!(user_id, %flow, step, "conversation advanced");
        }
    }

    /// End a flow (user confirmed, cancelled, or the handler finished it).
    pub fn end(&self, user_id: u64, flow: FlowName) {
        let mut states = self.states.lock().unwrap();
        if states.remove(&(user_id, flow)).is_some() {
            info!(user_id, %flow, "conversation flow ended");
        }
    }

    /// Drop flows idle past the TTL. Returns how many were abandoned.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let ttl = Duration::seconds(CONVERSATION_IDLE_TTL_SECS);
        let mut states = self.states.lock().unwrap();
        let before = states.len();
        states.retain(|_, s| now - s.last_activity <= ttl);
        let removed = before - states.len();
        if removed > 0 {
            info!(removed, "abandoned conversation flows swept");
        }
        removed
    }

    /// Flush everything (shutdown path).
    pub fn clear(&self) {
        self.states.lock().unwrap().clear();
    }

    pub fn active_count(&self) -> usize {
        self.states.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap()
    }

    #[test]
    fn begin_advance_end() {
        let store = ConversationStore::new();
        store.begin(1, FlowName::TriviaSubmission, "question_type_selection", t0());

        store.advance(
            1,
            FlowName::TriviaSubmission,
            "question_input",
            vec![("question_type".to_string(), serde_json::json!("single_answer"))],
            t0(),
        );

        let state = store.get(1, FlowName::TriviaSubmission).unwrap();
        assert_eq!(state.step, "question_input");
        assert_eq!(state.data["question_type"], serde_json::json!("single_answer"));

        store.end(1, FlowName::TriviaSubmission);
        assert!(store.get(1, FlowName::TriviaSubmission).is_none());
    }

    #[test]
    fn one_flow_per_name_latest_wins() {
        let store = ConversationStore::new();
        store.begin(1, FlowName::Announcement, "text_input", t0());
        store.begin(1, FlowName::Announcement, "preview", t0());
        assert_eq!(store.active_count(), 1);
        assert_eq!(store.get(1, FlowName::Announcement).unwrap().step, "preview");
    }

    #[test]
    fn idle_flows_are_swept() {
        let store = ConversationStore::new();
        store.begin(1, FlowName::Announcement, "text_input", t0());
        store.begin(2, FlowName::Approval, "decision", t0() + Duration::minutes(50));

        // One hour after t0: user 1 idle > TTL, user 2 still fresh.
        let removed = store.sweep_expired(t0() + Duration::seconds(3_601));
        assert_eq!(removed, 1);
        assert!(store.get(1, FlowName::Announcement).is_none());
        assert!(store.get(2, FlowName::Approval).is_some());
    }

    #[test]
    fn activity_refresh_defers_expiry() {
        let store = ConversationStore::new();
        store.begin(1, FlowName::Announcement, "text_input", t0());
        store.advance(1, FlowName::Announcement, "preview", Vec::new(), t0() + Duration::minutes(55));

        let removed = store.sweep_expired(t0() + Duration::minutes(70));
        assert_eq!(removed, 0);
        assert!(store.get(1, FlowName::Announcement).is_some());
    }

    #[test]
    fn active_flow_finds_any_name() {
        let store = ConversationStore::new();
        assert!(store.active_flow(1).is_none());
        store.begin(1, FlowName::Approval, "decision", t0());
        assert_eq!(store.active_flow(1).unwrap().flow, FlowName::Approval);
    }
}
