//! Liveness monitor: ends a session whose server has gone silent.
//!
//! The server sends a zero-byte ping every couple of seconds, and every
//! successful read refreshes the session's activity timestamp.  The monitor
//! wakes on a fixed interval and terminates the session with
//! [`SessionError::LivenessTimeout`] once the gap exceeds the timeout.
//!
//! ```text
//! Armed ──(idle > timeout)──▶ Expired (session terminated)
//!   │
//!   └──(terminated by someone else)──▶ exit
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use super::session_state::{SessionError, SessionState};

/// Liveness settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessConfig {
    /// Longest tolerated silence.
    pub timeout: Duration,
    /// How often the timestamp is checked.
    pub poll_interval: Duration,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(2),
        }
    }
}

/// Watches one session's activity timestamp.
pub struct LivenessMonitor {
    state: Arc<SessionState>,
    config: LivenessConfig,
}

impl LivenessMonitor {
    pub fn new(state: Arc<SessionState>, config: LivenessConfig) -> Self {
        Self { state, config }
    }

    /// Checks once; returns `true` if this check expired the session.
    pub fn check(&self) -> bool {
        let idle = self.state.idle_for();
        if idle <= self.config.timeout {
            return false;
        }
        let expired = self.state.terminate(SessionError::LivenessTimeout { idle });
        if expired {
            warn!(idle_ms = idle.as_millis() as u64, "liveness timeout; terminating session");
        }
        expired
    }

    /// Runs until the session expires or is terminated elsewhere.
    pub async fn run(self) {
        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; nothing can have timed out yet.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = self.state.terminated() => {
                    debug!("liveness monitor stopping");
                    return;
                }
                _ = ticker.tick() => {
                    if self.check() {
                        return;
                    }
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
