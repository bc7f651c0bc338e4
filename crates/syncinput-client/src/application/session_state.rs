//! State shared between the tasks of one session.
//!
//! A session runs three tasks: the receive loop, the liveness monitor, and
//! the target tracker.  They never join or call each other; everything they
//! need to agree on lives in one [`SessionState`] handed out by `Arc`.
//!
//! # What is shared? (for beginners)
//!
//! | Field               | Writer(s)               | Reader(s)                   |
//! |---------------------|-------------------------|-----------------------------|
//! | last activity       | receive loop            | liveness monitor            |
//! | termination         | anyone (first one wins) | every task                  |
//! | target              | target tracker          | dispatch (receive loop)     |
//! | target invalidated  | dispatch                | target tracker              |
//!
//! The activity timestamp and the invalidation flag are atomics.  The target
//! sits behind a `std::sync::RwLock` that is only held long enough to copy
//! values in or out, never across an `.await` or an OS call.
//!
//! Termination is a `tokio::sync::watch` channel holding
//! `Option<SessionError>`.  It starts as `None`; the first
//! [`terminate`](SessionState::terminate) call stores its reason and every
//! later call is ignored, so a session can only ever die once.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use syncinput_core::{Placement, WindowId};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;

/// Pattern value that selects the OS foreground window instead of a title match.
pub const TRACK_FOREGROUND: &str = "track-foreground";

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Nothing, not even a ping, arrived within the liveness timeout.
    #[error("no data received for {idle:?}; server presumed dead")]
    LivenessTimeout { idle: Duration },

    /// The server closed the connection (a read returned zero bytes).
    #[error("connection closed by server")]
    Disconnected,

    /// A read failed with a non-transient error.
    #[error("read failed ({kind:?}): {message}")]
    ReadFailed {
        kind: std::io::ErrorKind,
        message: String,
    },

    /// The process is shutting down.
    #[error("session shut down")]
    Shutdown,
}

impl SessionError {
    /// Returns `true` for termination requested locally rather than caused by
    /// the connection.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, SessionError::Shutdown)
    }
}

// ── Target ────────────────────────────────────────────────────────────────────

/// How the target window is chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetMode {
    /// First window whose title contains this substring (case-insensitive).
    Title(String),
    /// Whatever window currently has the OS foreground.
    Foreground,
}

impl TargetMode {
    /// Builds the mode from a configured pattern; [`TRACK_FOREGROUND`] selects
    /// foreground tracking.
    pub fn from_pattern(pattern: &str) -> Self {
        if pattern.eq_ignore_ascii_case(TRACK_FOREGROUND) {
            TargetMode::Foreground
        } else {
            TargetMode::Title(pattern.to_string())
        }
    }
}

impl std::fmt::Display for TargetMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetMode::Title(pattern) => write!(f, "title contains {pattern:?}"),
            TargetMode::Foreground => f.write_str(TRACK_FOREGROUND),
        }
    }
}

/// The window currently designated to receive injected input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub mode: TargetMode,
    /// Unset until the tracker first finds a window.
    pub id: Option<WindowId>,
    /// Placement observed when the window was last formatted or checked.
    pub placement: Option<Placement>,
}

impl Target {
    pub fn new(mode: TargetMode) -> Self {
        Self {
            mode,
            id: None,
            placement: None,
        }
    }
}

// ── SessionState ──────────────────────────────────────────────────────────────

/// Shared state of one session.  Construct a fresh one per connection.
#[derive(Debug)]
pub struct SessionState {
    started: Instant,
    /// Milliseconds since `started` at the last successful read.
    last_activity_ms: AtomicU64,
    termination: watch::Sender<Option<SessionError>>,
    target: RwLock<Target>,
    target_invalidated: AtomicBool,
}

impl SessionState {
    /// Creates running state with the activity clock starting now.
    pub fn new(mode: TargetMode) -> Self {
        let (termination, _) = watch::channel(None);
        Self {
            started: Instant::now(),
            last_activity_ms: AtomicU64::new(0),
            termination,
            target: RwLock::new(Target::new(mode)),
            target_invalidated: AtomicBool::new(false),
        }
    }

    // ── Liveness ──────────────────────────────────────────────────────────────

    /// Records that data (a record or a ping) was just received.
    pub fn touch(&self) {
        let now_ms = self.started.elapsed().as_millis() as u64;
        self.last_activity_ms.fetch_max(now_ms, Ordering::Relaxed);
    }

    /// Time since the last [`touch`](Self::touch), or since creation.
    pub fn idle_for(&self) -> Duration {
        let now_ms = self.started.elapsed().as_millis() as u64;
        let last_ms = self.last_activity_ms.load(Ordering::Relaxed);
        Duration::from_millis(now_ms.saturating_sub(last_ms))
    }

    // ── Termination ───────────────────────────────────────────────────────────

    /// Terminates the session with `reason`.
    ///
    /// Returns `true` if this call terminated the session, `false` if it was
    /// already terminated (the earlier reason is kept).
    pub fn terminate(&self, reason: SessionError) -> bool {
        self.termination.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        })
    }

    /// Requests a local shutdown.
    pub fn shutdown(&self) -> bool {
        self.terminate(SessionError::Shutdown)
    }

    pub fn is_terminated(&self) -> bool {
        self.termination.borrow().is_some()
    }

    /// The reason the session ended, if it has.
    pub fn termination_reason(&self) -> Option<SessionError> {
        self.termination.borrow().clone()
    }

    /// Resolves once the session is terminated, yielding the winning reason.
    pub async fn terminated(&self) -> SessionError {
        let mut rx = self.termination.subscribe();
        let reason = rx.wait_for(Option::is_some).await.ok().and_then(|r| r.clone());
        // The sender lives in `self`, so the channel cannot close while we wait.
        reason.unwrap_or(SessionError::Shutdown)
    }

    // ── Target ────────────────────────────────────────────────────────────────

    /// A copy of the current target.
    pub fn target(&self) -> Target {
        self.target
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn target_id(&self) -> Option<WindowId> {
        self.target.read().unwrap_or_else(PoisonError::into_inner).id
    }

    /// Replaces the target window and its placement snapshot.
    pub fn set_target(&self, id: WindowId, placement: Placement) {
        let mut target = self.target.write().unwrap_or_else(PoisonError::into_inner);
        target.id = Some(id);
        target.placement = Some(placement);
    }

    /// Forgets the target window; dispatch falls back to the foreground window.
    pub fn clear_target(&self) {
        let mut target = self.target.write().unwrap_or_else(PoisonError::into_inner);
        target.id = None;
        target.placement = None;
    }

    /// Flags the target as suspect after a failed backend call.
    pub fn invalidate_target(&self) {
        self.target_invalidated.store(true, Ordering::Release);
    }

    /// Returns and clears the invalidation flag.
    pub fn take_target_invalidated(&self) -> bool {
        self.target_invalidated.swap(false, Ordering::AcqRel)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn make_state() -> SessionState {
        SessionState::new(TargetMode::Title("Notepad".to_string()))
    }

    #[test]
    fn test_target_mode_from_sentinel_is_foreground() {
        assert_eq!(TargetMode::from_pattern("track-foreground"), TargetMode::Foreground);
        assert_eq!(
            TargetMode::from_pattern("Notepad"),
            TargetMode::Title("Notepad".to_string())
        );
    }

    #[test]
    fn test_new_state_is_running_with_unset_target() {
        let state = make_state();
        assert!(!state.is_terminated());
        assert_eq!(state.target_id(), None);
        assert!(!state.take_target_invalidated());
    }

    #[test]
    fn test_first_termination_reason_wins() {
        // Arrange
        let state = make_state();

        // Act
        let first = state.terminate(SessionError::Disconnected);
        let second = state.terminate(SessionError::LivenessTimeout {
            idle: Duration::from_secs(11),
        });

        // Assert
        assert!(first);
        assert!(!second);
        assert_eq!(state.termination_reason(), Some(SessionError::Disconnected));
    }

    #[test]
    fn test_shutdown_after_termination_is_ignored() {
        let state = make_state();
        state.terminate(SessionError::Disconnected);
        assert!(!state.shutdown());
        assert!(!state.termination_reason().is_some_and(|r| r.is_shutdown()));
    }

    #[test]
    fn test_set_and_clear_target() {
        // Arrange
        let state = make_state();
        let placement = Placement { x: 0, y: 0, width: 800, height: 600 };

        // Act
        state.set_target(WindowId(7), placement);
        let set = state.target();
        state.clear_target();

        // Assert
        assert_eq!(set.id, Some(WindowId(7)));
        assert_eq!(set.placement, Some(placement));
        assert_eq!(state.target_id(), None);
        assert_eq!(state.target().mode, TargetMode::Title("Notepad".to_string()));
    }

    #[test]
    fn test_take_target_invalidated_clears_flag() {
        let state = make_state();
        state.invalidate_target();
        assert!(state.take_target_invalidated());
        assert!(!state.take_target_invalidated());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_for_resets_on_touch() {
        // Arrange
        let state = make_state();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(state.idle_for(), Duration::from_secs(3));

        // Act
        state.touch();
        tokio::time::advance(Duration::from_millis(500)).await;

        // Assert
        assert_eq!(state.idle_for(), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_terminated_wakes_waiters_with_reason() {
        // Arrange
        let state = Arc::new(make_state());
        let waiter = {
            let state = Arc::clone(&state);
            tokio::spawn(async move { state.terminated().await })
        };

        // Act
        state.terminate(SessionError::Disconnected);

        // Assert
        let reason = waiter.await.expect("waiter task panicked");
        assert_eq!(reason, SessionError::Disconnected);
    }

    #[tokio::test]
    async fn test_terminated_returns_immediately_when_already_terminated() {
        let state = make_state();
        state.shutdown();
        assert_eq!(state.terminated().await, SessionError::Shutdown);
    }
}
