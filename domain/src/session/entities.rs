//! Per-session conversational state

use crate::answer::AggregatedAnswer;
use crate::plan::CallPlan;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;

/// Default number of turns retained per session.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

/// One completed turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub turn: String,
    pub plan: CallPlan,
    pub answer: AggregatedAnswer,
    pub recorded_at: DateTime<Utc>,
}

/// A follow-up question the user has not answered yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingClarification {
    pub tool_name: String,
    pub missing_param: String,
}

/// Conversation state for one session id.
///
/// Only the session store mutates this; the interpreter and resolver read a
/// snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    session_id: String,
    history: VecDeque<TurnRecord>,
    history_limit: usize,
    resolved_defaults: IndexMap<String, Value>,
    pending_clarification: Option<PendingClarification>,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self::with_history_limit(session_id, DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(session_id: impl Into<String>, history_limit: usize) -> Self {
        Self {
            session_id: session_id.into(),
            history: VecDeque::new(),
            history_limit: history_limit.max(1),
            resolved_defaults: IndexMap::new(),
            pending_clarification: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Oldest first.
    pub fn history(&self) -> std::collections::vec_deque::Iter<'_, TurnRecord> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn last_turn(&self) -> Option<&TurnRecord> {
        self.history.back()
    }

    /// Append a turn, evicting the oldest once the limit is reached.
    pub fn record_turn(&mut self, record: TurnRecord) {
        while self.history.len() >= self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(record);
    }

    pub fn resolved_defaults(&self) -> &IndexMap<String, Value> {
        &self.resolved_defaults
    }

    pub fn resolved_default(&self, name: &str) -> Option<&Value> {
        self.resolved_defaults.get(name)
    }

    /// Overwrite a sticky parameter value.
    pub fn remember(&mut self, name: impl Into<String>, value: Value) {
        self.resolved_defaults.insert(name.into(), value);
    }

    pub fn remember_all(&mut self, values: impl IntoIterator<Item = (String, Value)>) {
        for (name, value) in values {
            self.remember(name, value);
        }
    }

    pub fn pending_clarification(&self) -> Option<&PendingClarification> {
        self.pending_clarification.as_ref()
    }

    pub fn set_pending_clarification(&mut self, pending: Option<PendingClarification>) {
        self.pending_clarification = pending;
    }
}
