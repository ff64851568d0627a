//! Session store parameters.

use insights_domain::session::DEFAULT_HISTORY_LIMIT;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shortest janitor period; `tokio::time::interval` rejects zero.
pub const MIN_JANITOR_INTERVAL: Duration = Duration::from_secs(1);

/// Lifetime and size limits for session state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionParams {
    /// Sessions without a turn for this long are evicted.
    pub idle_ttl: Duration,
    /// Turns kept per session.
    pub history_limit: usize,
    /// How often the janitor looks for idle sessions.
    pub janitor_interval: Duration,
}

impl Default for SessionParams {
    fn default() -> Self {
        Self {
            idle_ttl: Duration::from_secs(30 * 60),
            history_limit: DEFAULT_HISTORY_LIMIT,
            janitor_interval: Duration::from_secs(60),
        }
    }
}

impl SessionParams {
    pub fn with_idle_ttl(mut self, ttl: Duration) -> Self {
        self.idle_ttl = ttl;
        self
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn with_janitor_interval(mut self, interval: Duration) -> Self {
        self.janitor_interval = interval.max(MIN_JANITOR_INTERVAL);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_janitor_interval_is_never_zero() {
        let params = SessionParams::default().with_janitor_interval(Duration::ZERO);
        assert_eq!(params.janitor_interval, MIN_JANITOR_INTERVAL);

        let params = SessionParams::default().with_janitor_interval(Duration::from_secs(30));
        assert_eq!(params.janitor_interval, Duration::from_secs(30));
    }
}
