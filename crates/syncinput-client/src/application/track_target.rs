//! TargetTracker: keeps the target window found and fitted to the capture area.
//!
//! Every tick the tracker asks the backend for the current candidate (a title
//! match, or the foreground window in track-foreground mode) and compares it
//! with the session's target:
//!
//! | Situation                                   | Action                          |
//! |---------------------------------------------|---------------------------------|
//! | candidate is a new window                   | format it, make it the target   |
//! | same window, periodic recheck or invalidated| reformat only if it has drifted |
//! | same window, ordinary tick                  | nothing                         |
//! | no candidate                                | keep target; clear if invalid   |
//!
//! Backend failures are logged and retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use syncinput_core::{CaptureArea, WindowId};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::dispatch_input::{BackendError, InputBackend};
use super::session_state::{SessionState, TargetMode};

/// Target tracker settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Area the target window is fitted to.
    pub capture_area: CaptureArea,
    pub poll_interval: Duration,
    /// Every this many ticks the placement of an unchanged target is checked.
    pub recheck_every: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            capture_area: CaptureArea::default(),
            poll_interval: Duration::from_secs(2),
            recheck_every: 5,
        }
    }
}

/// Result of one tracker tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// A different window became the target and was formatted.
    Acquired(WindowId),
    /// The target had drifted and was formatted again.
    Reformatted(WindowId),
    /// The target is unchanged.
    Unchanged(WindowId),
    /// No candidate window exists.
    NotFound,
}

/// Periodically re-resolves the session's target window.
pub struct TargetTracker {
    state: Arc<SessionState>,
    backend: Arc<dyn InputBackend>,
    config: TrackerConfig,
    ticks: u64,
}

impl TargetTracker {
    pub fn new(
        state: Arc<SessionState>,
        backend: Arc<dyn InputBackend>,
        config: TrackerConfig,
    ) -> Self {
        Self {
            state,
            backend,
            config,
            ticks: 0,
        }
    }

    /// Runs one tick.
    ///
    /// # Errors
    ///
    /// Returns the failing [`BackendError`].  The target is flagged invalid so
    /// the next tick looks at it again.
    pub fn poll_once(&mut self) -> Result<TrackOutcome, BackendError> {
        self.ticks += 1;
        let invalidated = self.state.take_target_invalidated();
        let result = self.resolve(invalidated);
        if result.is_err() {
            self.state.invalidate_target();
        }
        result
    }

    /// Fits `id` to the capture area unless it already covers it exactly.
    ///
    /// Returns `true` if a format request was issued.
    pub fn ensure_formatted(&self, id: WindowId) -> Result<bool, BackendError> {
        let area = self.config.capture_area;
        let placement = self.backend.window_placement(id)?;
        if area.is_covered_by(&placement) {
            self.state.set_target(id, placement);
            return Ok(false);
        }

        debug!(
            window = %id,
            last_seen = ?self.state.target().placement,
            ?placement,
            "target drifted from capture area; reformatting"
        );
        self.backend.format_window(id, area)?;
        let placement = self.backend.window_placement(id)?;
        self.state.set_target(id, placement);
        Ok(true)
    }

    /// Ticks until the session is terminated.
    pub async fn run(mut self) {
        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.state.terminated() => {
                    debug!("target tracker stopping");
                    return;
                }
                _ = ticker.tick() => {
                    match self.poll_once() {
                        Ok(TrackOutcome::Acquired(id)) => info!(window = %id, "target window acquired"),
                        Ok(TrackOutcome::Reformatted(id)) => info!(window = %id, "target window reformatted"),
                        Ok(TrackOutcome::Unchanged(_)) => {}
                        Ok(TrackOutcome::NotFound) => {
                            debug!(mode = %self.state.target().mode, "no target window found");
                        }
                        Err(e) => warn!("target tracking failed: {e}"),
                    }
                }
            }
        }
    }

    fn candidate(&self, mode: &TargetMode) -> Result<Option<WindowId>, BackendError> {
        match mode {
            TargetMode::Title(pattern) => self.backend.find_window_by_title(pattern),
            TargetMode::Foreground => self.backend.foreground_window(),
        }
    }

    fn resolve(&self, invalidated: bool) -> Result<TrackOutcome, BackendError> {
        let target = self.state.target();

        let Some(candidate) = self.candidate(&target.mode)? else {
            if invalidated && target.id.is_some() {
                debug!("invalid target cleared; dispatch falls back to the foreground window");
                self.state.clear_target();
            }
            return Ok(TrackOutcome::NotFound);
        };

        if target.id != Some(candidate) {
            self.backend.format_window(candidate, self.config.capture_area)?;
            let placement = self.backend.window_placement(candidate)?;
            self.state.set_target(candidate, placement);
            return Ok(TrackOutcome::Acquired(candidate));
        }

        let recheck_every = u64::from(self.config.recheck_every.max(1));
        if invalidated || self.ticks % recheck_every == 0 {
            if self.ensure_formatted(candidate)? {
                return Ok(TrackOutcome::Reformatted(candidate));
            }
        }
        Ok(TrackOutcome::Unchanged(candidate))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
