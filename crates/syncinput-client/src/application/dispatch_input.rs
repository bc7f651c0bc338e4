//! DispatchInputUseCase: routes decoded events to the platform input backend.
//!
//! This use case sits at the application layer and delegates to an
//! [`InputBackend`] trait object for OS-level event injection and window
//! management.  The platform-specific implementations are in the
//! infrastructure layer.
//!
//! # Routing rules
//!
//! - **Key** – the target window (or, when no target is known, the OS
//!   foreground window) is focused, then the key is injected using the
//!   configured [`KeyEncoding`].
//! - **Pointer** – the cursor is moved to the event position, then the
//!   button transition is injected unless the action is a plain move.
//!
//! A target that has been closed is flagged invalid and the event goes to the
//! foreground window instead.  With neither a target nor a foreground window
//! the event is dropped.  Backend failures never end the session: they flag
//! the target as suspect so the tracker re-resolves it on its next tick.

use std::sync::Arc;

use syncinput_core::{
    CaptureArea, InputEvent, KeyEncoding, KeyEvent, Placement, PointerEvent, WindowId,
};
use thiserror::Error;
use tracing::{debug, trace};

use super::session_state::SessionState;

/// Error type for input backend operations.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("platform error: {0}")]
    Platform(String),
    #[error("window {0} no longer exists")]
    WindowGone(WindowId),
    #[error("invalid key code: {0}")]
    InvalidKeyCode(u32),
}

/// Platform-agnostic input and window-management interface.
///
/// Each supported OS provides an implementation in the infrastructure layer.
#[cfg_attr(test, mockall::automock)]
pub trait InputBackend: Send + Sync {
    /// Injects one key transition.
    fn inject_key(&self, code: u32, pressed: bool, encoding: KeyEncoding)
        -> Result<(), BackendError>;

    /// Injects a press or release of the primary (left) or secondary (right) button.
    fn inject_pointer_button(&self, primary: bool, pressed: bool) -> Result<(), BackendError>;

    /// Moves the cursor to an absolute position in screen pixels.
    fn move_pointer(&self, x: f32, y: f32) -> Result<(), BackendError>;

    /// Restores, raises, and focuses a window.
    fn focus_window(&self, id: WindowId) -> Result<(), BackendError>;

    /// Strips decoration from a window and fits it to `area` at the screen origin.
    fn format_window(&self, id: WindowId, area: CaptureArea) -> Result<(), BackendError>;

    /// Current outer rectangle of a window.
    fn window_placement(&self, id: WindowId) -> Result<Placement, BackendError>;

    /// The window that currently has the OS foreground, if any.
    fn foreground_window(&self) -> Result<Option<WindowId>, BackendError>;

    /// First visible window whose title contains `pattern` (case-insensitive).
    fn find_window_by_title(&self, pattern: &str) -> Result<Option<WindowId>, BackendError>;
}

/// What happened to one dispatched event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// The event reached the backend, aimed at this window.
    Injected(WindowId),
    /// A move to the position the cursor already has; skipped.
    Deduplicated,
    /// No target and no foreground window; dropped.
    NoWindow,
}

/// Filters duplicate consecutive move-only pointer events.
///
/// A position is only remembered once the cursor has actually been moved
/// there, so a failed move is never mistaken for a repeat.
#[derive(Default)]
struct DedupFilter {
    last_move: Option<(f32, f32)>,
}

impl DedupFilter {
    fn is_repeat(&self, x: f32, y: f32) -> bool {
        self.last_move == Some((x, y))
    }

    fn record(&mut self, x: f32, y: f32) {
        self.last_move = Some((x, y));
    }

    fn reset(&mut self) {
        self.last_move = None;
    }
}

/// The Dispatch Input use case.
pub struct DispatchInputUseCase {
    backend: Arc<dyn InputBackend>,
    encoding: KeyEncoding,
    dedup: DedupFilter,
}

impl DispatchInputUseCase {
    /// Creates a new use case with the given backend and key encoding.
    pub fn new(backend: Arc<dyn InputBackend>, encoding: KeyEncoding) -> Self {
        Self {
            backend,
            encoding,
            dedup: DedupFilter::default(),
        }
    }

    /// Dispatches one event to the current target of `state`.
    ///
    /// When the target window has been closed, the target is flagged invalid
    /// and the event is delivered to the foreground window instead.
    ///
    /// # Errors
    ///
    /// Returns the [`BackendError`] of the first failing call.  The target has
    /// already been flagged invalid when this returns an error; callers only
    /// need to log it.
    pub fn dispatch(
        &mut self,
        state: &SessionState,
        event: &InputEvent,
    ) -> Result<Dispatched, BackendError> {
        let result = match state.target_id() {
            Some(target) => match self.dispatch_to(target, event) {
                Err(BackendError::WindowGone(id)) => {
                    debug!(window = %id, "target window gone; using the foreground window");
                    state.invalidate_target();
                    self.dispatch_to_foreground(event)
                }
                other => other,
            },
            None => self.dispatch_to_foreground(event),
        };
        if result.is_err() {
            state.invalidate_target();
            self.reset();
        }
        result
    }

    /// Forgets the last pointer position, so the next move is always sent.
    pub fn reset(&mut self) {
        self.dedup.reset();
    }

    fn dispatch_to_foreground(&mut self, event: &InputEvent) -> Result<Dispatched, BackendError> {
        match self.backend.foreground_window()? {
            Some(window) => self.dispatch_to(window, event),
            None => {
                debug!(?event, "no target or foreground window; event dropped");
                Ok(Dispatched::NoWindow)
            }
        }
    }

    fn dispatch_to(
        &mut self,
        window: WindowId,
        event: &InputEvent,
    ) -> Result<Dispatched, BackendError> {
        match event {
            InputEvent::Key(key) => self.dispatch_key(window, key),
            InputEvent::Pointer(pointer) => self.dispatch_pointer(window, pointer),
        }
    }

    fn dispatch_key(&mut self, window: WindowId, key: &KeyEvent) -> Result<Dispatched, BackendError> {
        self.backend.focus_window(window)?;
        self.backend.inject_key(key.code, key.pressed, self.encoding)?;
        trace!(code = key.code, pressed = key.pressed, %window, "key injected");
        Ok(Dispatched::Injected(window))
    }

    fn dispatch_pointer(
        &mut self,
        window: WindowId,
        pointer: &PointerEvent,
    ) -> Result<Dispatched, BackendError> {
        let transition = pointer.has_button_transition();
        if !transition && self.dedup.is_repeat(pointer.x, pointer.y) {
            return Ok(Dispatched::Deduplicated);
        }

        self.backend.move_pointer(pointer.x, pointer.y)?;
        self.dedup.record(pointer.x, pointer.y);
        if transition {
            self.backend
                .inject_pointer_button(pointer.primary, pointer.pressed())?;
        }
        trace!(x = pointer.x, y = pointer.y, action = ?pointer.action, %window, "pointer injected");
        Ok(Dispatched::Injected(window))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
