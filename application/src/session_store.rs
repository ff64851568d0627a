//! Session Context Store
//!
//! Keyed, TTL-scoped store of [`SessionContext`] values.
//!
//! Each session has its own async mutex; sessions never contend with each
//! other. A turn works on a snapshot taken by [`SessionStore::begin_turn`]
//! and writes back through [`SessionStore::commit`], which only succeeds
//! while the turn is still the session's latest. Starting a new turn cancels
//! the previous one.

use crate::config::SessionParams;
use crate::config::session_params::MIN_JANITOR_INTERVAL;
use insights_domain::SessionContext;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionStoreError {
    #[error("turn was superseded by a newer turn on session '{0}'")]
    Superseded(String),

    #[error("session '{0}' was closed")]
    Closed(String),
}

/// Handle for one in-flight turn.
#[derive(Debug, Clone)]
pub struct TurnTicket {
    pub session_id: String,
    generation: u64,
    /// Cancelled when a newer turn starts or the session closes
    pub cancellation: CancellationToken,
    /// Session state as of the start of the turn
    pub context: SessionContext,
    /// Marks the session busy for as long as any copy of the ticket lives
    in_flight: Arc<()>,
}

impl TurnTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug)]
struct SessionState {
    context: SessionContext,
    generation: u64,
    cancellation: CancellationToken,
    last_active: Instant,
    /// Shared with every live ticket; a count above one means a turn is running
    turns: Arc<()>,
}

impl SessionState {
    fn has_turn_in_flight(&self) -> bool {
        Arc::strong_count(&self.turns) > 1
    }
}

type Slot = Arc<Mutex<SessionState>>;

/// In-memory session store.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Slot>>,
    params: SessionParams,
    /// Generations are unique across the store so a ticket from a closed
    /// session can never match a reopened one
    next_generation: AtomicU64,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionParams::default())
    }
}

impl SessionStore {
    pub fn new(params: SessionParams) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            params,
            next_generation: AtomicU64::new(1),
        }
    }

    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    async fn slot(&self, session_id: &str) -> Option<Slot> {
        self.sessions.lock().await.get(session_id).cloned()
    }

    async fn slot_or_create(&self, session_id: &str) -> Slot {
        let mut sessions = self.sessions.lock().await;
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!("Creating session {}", session_id);
                Arc::new(Mutex::new(SessionState {
                    context: SessionContext::with_history_limit(
                        session_id,
                        self.params.history_limit,
                    ),
                    generation: 0,
                    cancellation: CancellationToken::new(),
                    last_active: Instant::now(),
                    turns: Arc::new(()),
                }))
            })
            .clone()
    }

    /// Start a turn, superseding any turn still running on the session.
    pub async fn begin_turn(&self, session_id: &str) -> TurnTicket {
        let slot = self.slot_or_create(session_id).await;
        let mut state = slot.lock().await;

        if !state.cancellation.is_cancelled() && state.generation != 0 {
            debug!(
                "Superseding turn {} on session {}",
                state.generation, session_id
            );
        }
        state.cancellation.cancel();
        state.generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        state.cancellation = CancellationToken::new();
        state.last_active = Instant::now();

        TurnTicket {
            session_id: session_id.to_string(),
            generation: state.generation,
            cancellation: state.cancellation.clone(),
            context: state.context.clone(),
            in_flight: Arc::clone(&state.turns),
        }
    }

    /// Apply a read-modify-write for the turn, if it is still current.
    pub async fn commit<F, R>(&self, ticket: &TurnTicket, apply: F) -> Result<R, SessionStoreError>
    where
        F: FnOnce(&mut SessionContext) -> R,
    {
        let slot = self
            .slot(&ticket.session_id)
            .await
            .ok_or_else(|| SessionStoreError::Closed(ticket.session_id.clone()))?;
        let mut state = slot.lock().await;

        if state.generation != ticket.generation || ticket.cancellation.is_cancelled() {
            return Err(SessionStoreError::Superseded(ticket.session_id.clone()));
        }

        let output = apply(&mut state.context);
        state.last_active = Instant::now();
        Ok(output)
    }

    /// Copy of the session's current state.
    pub async fn snapshot(&self, session_id: &str) -> Option<SessionContext> {
        let slot = self.slot(session_id).await?;
        let state = slot.lock().await;
        Some(state.context.clone())
    }

    /// Drop a session, cancelling its in-flight turn.
    ///
    /// Returns `false` if the session did not exist.
    pub async fn close(&self, session_id: &str) -> bool {
        let removed = self.sessions.lock().await.remove(session_id);
        match removed {
            Some(slot) => {
                slot.lock().await.cancellation.cancel();
                info!("Closed session {}", session_id);
                true
            }
            None => false,
        }
    }

    /// Remove sessions idle for longer than the TTL. Returns how many went.
    ///
    /// Sessions whose lock is held or that have a turn in flight are in use
    /// and never evicted.
    pub async fn evict_idle(&self) -> usize {
        let ttl = self.params.idle_ttl;
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;

        let expired: Vec<String> = sessions
            .iter()
            .filter_map(|(id, slot)| {
                let state = slot.try_lock().ok()?;
                let idle = now.saturating_duration_since(state.last_active) >= ttl;
                (idle && !state.has_turn_in_flight()).then(|| id.clone())
            })
            .collect();

        for id in &expired {
            if let Some(slot) = sessions.remove(id)
                && let Ok(state) = slot.try_lock()
            {
                state.cancellation.cancel();
            }
            debug!("Evicted idle session {}", id);
        }
        if !expired.is_empty() {
            info!("Evicted {} idle session(s)", expired.len());
        }
        expired.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.lock().await.contains_key(session_id)
    }

    /// Run [`evict_idle`](Self::evict_idle) every `janitor_interval` until
    /// `shutdown` is cancelled.
    pub fn spawn_janitor(self: &Arc<Self>, shutdown: CancellationToken) -> JoinHandle<()> {
        let store = Arc::clone(self);
        let period = store.params.janitor_interval.max(MIN_JANITOR_INTERVAL);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        debug!("Session janitor stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        store.evict_idle().await;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    fn store(ttl_secs: u64) -> SessionStore {
        SessionStore::new(
            SessionParams::default()
                .with_idle_ttl(Duration::from_secs(ttl_secs))
                .with_janitor_interval(Duration::from_secs(10)),
        )
    }

    #[tokio::test]
    async fn test_begin_and_commit() {
        let store = store(60);
        let ticket = store.begin_turn("s1").await;
        assert!(ticket.context.resolved_defaults().is_empty());

        store
            .commit(&ticket, |ctx| ctx.remember("region", json!("us-west-2")))
            .await
            .unwrap();

        let next = store.begin_turn("s1").await;
        assert_eq!(next.context.resolved_default("region"), Some(&json!("us-west-2")));
        assert!(next.generation() > ticket.generation());
    }

    #[tokio::test]
    async fn test_new_turn_supersedes_old() {
        let store = store(60);
        let first = store.begin_turn("s1").await;
        let second = store.begin_turn("s1").await;

        assert!(first.cancellation.is_cancelled());
        assert!(!second.cancellation.is_cancelled());

        let stale = store
            .commit(&first, |ctx| ctx.remember("region", json!("eu-west-1")))
            .await;
        assert_eq!(stale, Err(SessionStoreError::Superseded("s1".to_string())));

        store
            .commit(&second, |ctx| ctx.remember("region", json!("us-east-1")))
            .await
            .unwrap();
        let snapshot = store.snapshot("s1").await.unwrap();
        assert_eq!(snapshot.resolved_default("region"), Some(&json!("us-east-1")));
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = store(60);
        let a = store.begin_turn("a").await;
        let b = store.begin_turn("b").await;
        assert!(!a.cancellation.is_cancelled());

        store.commit(&a, |ctx| ctx.remember("region", json!("us-west-2"))).await.unwrap();
        store.commit(&b, |_| ()).await.unwrap();

        assert!(store.snapshot("b").await.unwrap().resolved_defaults().is_empty());
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_close_cancels_and_rejects_commit() {
        let store = store(60);
        let ticket = store.begin_turn("s1").await;

        assert!(store.close("s1").await);
        assert!(ticket.cancellation.is_cancelled());
        assert!(!store.contains("s1").await);
        assert!(!store.close("s1").await);

        let result = store.commit(&ticket, |_| ()).await;
        assert_eq!(result, Err(SessionStoreError::Closed("s1".to_string())));

        // A reopened session starts empty and ignores the old ticket
        let reopened = store.begin_turn("s1").await;
        assert_ne!(reopened.generation(), ticket.generation());
        assert!(store.commit(&ticket, |_| ()).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_idle_after_ttl() {
        let store = store(60);
        store.begin_turn("old").await;
        tokio::time::advance(Duration::from_secs(45)).await;
        store.begin_turn("fresh").await;

        tokio::time::advance(Duration::from_secs(20)).await;
        assert_eq!(store.evict_idle().await, 1);
        assert!(!store.contains("old").await);
        assert!(store.contains("fresh").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_in_flight_outlives_ttl() {
        let store = store(30);
        let ticket = store.begin_turn("busy").await;

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(store.evict_idle().await, 0);
        assert!(!ticket.cancellation.is_cancelled());
        store.commit(&ticket, |_| ()).await.unwrap();

        drop(ticket);
        tokio::time::advance(Duration::from_secs(31)).await;
        assert_eq!(store.evict_idle().await, 1);
        assert!(!store.contains("busy").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_commit_refreshes_activity() {
        let store = store(60);
        let ticket = store.begin_turn("s1").await;
        tokio::time::advance(Duration::from_secs(50)).await;
        store.commit(&ticket, |_| ()).await.unwrap();

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(store.evict_idle().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_janitor_evicts_periodically() {
        let store = Arc::new(store(30));
        store.begin_turn("s1").await;
        let shutdown = CancellationToken::new();
        let janitor = store.spawn_janitor(shutdown.clone());

        tokio::time::sleep(Duration::from_secs(45)).await;
        assert!(store.is_empty().await);

        shutdown.cancel();
        janitor.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_janitor_with_zero_interval_still_runs() {
        let params = SessionParams {
            idle_ttl: Duration::from_secs(30),
            janitor_interval: Duration::ZERO,
            ..SessionParams::default()
        };
        let store = Arc::new(SessionStore::new(params));
        store.begin_turn("s1").await;
        let shutdown = CancellationToken::new();
        let janitor = store.spawn_janitor(shutdown.clone());

        tokio::time::sleep(Duration::from_secs(45)).await;
        assert!(store.is_empty().await);
        assert!(!janitor.is_finished());

        shutdown.cancel();
        janitor.await.unwrap();
    }
}
