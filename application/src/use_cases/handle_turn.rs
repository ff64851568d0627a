//! Handle Turn use case
//!
//! The inbound turn interface: text in, [`AggregatedAnswer`] out.
//!
//! A turn takes a ticket from the [`SessionStore`] (superseding any turn
//! still running on the session), interprets the text against the session
//! snapshot, dispatches the plan, synthesizes the answer and commits the
//! outcome back to the session. A turn superseded before its commit leaves
//! no trace in the session.

use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger};
use crate::ports::progress::{DispatchProgressNotifier, NoProgress};
use crate::session_store::{SessionStore, SessionStoreError};
use crate::use_cases::dispatch_plan::{DispatchError, DispatchOutcome, DispatchPlanInput, DispatchPlanUseCase};
use chrono::Utc;
use insights_domain::{
    AggregatedAnswer, CallPlan, NarrativeStyle, PendingClarification, QueryInterpreter,
    SessionContext, TurnRecord, synthesize,
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Errors that can occur while handling a turn
///
/// Everything else (tool failures, missing parameters, unrecognised text)
/// is reported inside the answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleTurnError {
    #[error("turn superseded by a newer turn on session '{0}'")]
    Superseded(String),

    #[error("session '{0}' was closed during the turn")]
    SessionClosed(String),
}

impl From<SessionStoreError> for HandleTurnError {
    fn from(error: SessionStoreError) -> Self {
        match error {
            SessionStoreError::Superseded(id) => HandleTurnError::Superseded(id),
            SessionStoreError::Closed(id) => HandleTurnError::SessionClosed(id),
        }
    }
}

/// Use case for answering one user turn
pub struct HandleTurnUseCase {
    interpreter: Arc<dyn QueryInterpreter>,
    dispatcher: DispatchPlanUseCase,
    sessions: Arc<SessionStore>,
    style: NarrativeStyle,
    logger: Arc<dyn ConversationLogger>,
}

impl HandleTurnUseCase {
    pub fn new(
        interpreter: Arc<dyn QueryInterpreter>,
        dispatcher: DispatchPlanUseCase,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            interpreter,
            dispatcher,
            sessions,
            style: NarrativeStyle::default(),
            logger: Arc::new(NoConversationLogger),
        }
    }

    pub fn with_style(mut self, style: NarrativeStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn dispatcher(&self) -> &DispatchPlanUseCase {
        &self.dispatcher
    }

    /// Answer a turn with default (no-op) progress
    pub async fn handle_turn(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<AggregatedAnswer, HandleTurnError> {
        self.handle_turn_with_progress(session_id, text, &NoProgress).await
    }

    /// Answer a turn with progress callbacks
    pub async fn handle_turn_with_progress(
        &self,
        session_id: &str,
        text: &str,
        progress: &dyn DispatchProgressNotifier,
    ) -> Result<AggregatedAnswer, HandleTurnError> {
        let ticket = self.sessions.begin_turn(session_id).await;
        info!("Turn received on session {}", session_id);
        self.logger.log(ConversationEvent::new(
            "turn_received",
            json!({ "session_id": session_id, "text": text }),
        ));

        let plan = self.interpreter.interpret(text, &ticket.context);
        self.logger.log(ConversationEvent::new(
            "plan_built",
            json!({ "session_id": session_id, "plan": plan }),
        ));

        let outcome = if !is_dispatchable(&plan) {
            info!("No tool matched the turn");
            DispatchOutcome::default()
        } else {
            let input = DispatchPlanInput::new(plan.clone())
                .with_session_defaults(ticket.context.resolved_defaults().clone())
                .with_cancellation(ticket.cancellation.clone());
            match self.dispatcher.execute_with_progress(input, progress).await {
                Ok(outcome) => outcome,
                Err(DispatchError::Cancelled) => {
                    info!("Turn on session {} superseded before completion", session_id);
                    return Err(HandleTurnError::Superseded(session_id.to_string()));
                }
                Err(DispatchError::InvalidPlan(e)) => {
                    error!(
                        alert = true,
                        session_id,
                        "Aborting turn, malformed call plan: {}",
                        e
                    );
                    let answer = AggregatedAnswer::apology();
                    self.log_answer(session_id, &answer);
                    return Ok(answer);
                }
            }
        };

        for result in &outcome.results {
            self.logger.log(ConversationEvent::new(
                "step_result",
                json!({ "session_id": session_id, "result": result }),
            ));
        }

        let answer = synthesize(&plan, &outcome.results, self.style);
        if answer.degraded {
            warn!(
                "Degraded answer: {} tool(s) unavailable",
                answer.unavailable.len()
            );
        }

        let record = TurnRecord {
            turn: text.to_string(),
            plan,
            answer: answer.clone(),
            recorded_at: Utc::now(),
        };
        let sticky = outcome.sticky_updates;
        self.sessions
            .commit(&ticket, move |context| {
                apply_turn(context, record, sticky)
            })
            .await?;

        self.log_answer(session_id, &answer);
        Ok(answer)
    }

    /// Explicit teardown. Returns `false` for unknown sessions.
    pub async fn close_session(&self, session_id: &str) -> bool {
        let closed = self.sessions.close(session_id).await;
        if closed {
            self.logger.log(ConversationEvent::new(
                "session_closed",
                json!({ "session_id": session_id }),
            ));
        }
        closed
    }

    fn log_answer(&self, session_id: &str, answer: &AggregatedAnswer) {
        self.logger.log(ConversationEvent::new(
            "answer",
            json!({ "session_id": session_id, "answer": answer }),
        ));
    }
}

/// Write a finished turn into the session.
fn apply_turn(
    context: &mut SessionContext,
    record: TurnRecord,
    sticky: indexmap::IndexMap<String, serde_json::Value>,
) {
    context.remember_all(sticky);
    let pending = record
        .answer
        .clarification
        .as_ref()
        .map(|c| PendingClarification {
            tool_name: c.tool_name.clone(),
            missing_param: c.parameter.clone(),
        });
    // An unrecognised turn keeps any open question open
    if !record.plan.is_unrecognized() {
        context.set_pending_clarification(pending);
    }
    context.record_turn(record);
}

fn is_dispatchable(plan: &CallPlan) -> bool {
    !plan.is_unrecognized() && !plan.is_empty()
}
