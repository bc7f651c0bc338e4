//! In-memory input backend for tests and dry runs.
//!
//! # Why a mock backend?
//!
//! The real backend makes OS API calls that:
//!
//! - Require a desktop session to run.
//! - Actually move the cursor, press keys, and resize windows on the test machine.
//! - Cannot be observed directly from Rust test code.
//!
//! `MockInputBackend` keeps a small model of the desktop instead: a list of
//! windows with titles and placements, and a foreground window.  Formatting a
//! window updates its placement; focusing it makes it the foreground window.
//! Every injected event is pushed into a `Mutex<Vec<...>>` so assertions can
//! inspect exactly what was sent and in what order.
//!
//! # Usage in tests
//!
//! ```ignore
//! let backend = Arc::new(MockInputBackend::new());
//! backend.add_window(WindowId(1), "Untitled - Notepad", Placement::default());
//!
//! // ... run a session against it ...
//!
//! assert_eq!(backend.keys().len(), 2);
//! assert_eq!(backend.placement_of(WindowId(1)), Some(CaptureArea::default().placement()));
//! ```
//!
//! # `should_fail` flag
//!
//! Call `set_should_fail(true)` to make every method return
//! `BackendError::Platform`, to exercise error handling in callers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use syncinput_core::{CaptureArea, KeyEncoding, Placement, WindowId};
use tracing::trace;

use crate::application::dispatch_input::{BackendError, InputBackend};

/// One window of the simulated desktop.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MockWindow {
    id: WindowId,
    title: String,
    placement: Placement,
}

/// A backend that records all calls without touching the OS.
#[derive(Default)]
pub struct MockInputBackend {
    windows: Mutex<Vec<MockWindow>>,
    foreground: Mutex<Option<WindowId>>,
    keys: Mutex<Vec<(u32, bool, KeyEncoding)>>,
    pointer_moves: Mutex<Vec<(f32, f32)>>,
    pointer_buttons: Mutex<Vec<(bool, bool)>>,
    focused: Mutex<Vec<WindowId>>,
    formatted: Mutex<Vec<WindowId>>,
    should_fail: AtomicBool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockInputBackend {
    /// Creates an empty desktop with no windows and no foreground window.
    pub fn new() -> Self {
        Self::default()
    }

    // ── Desktop model ─────────────────────────────────────────────────────────

    pub fn add_window(&self, id: WindowId, title: &str, placement: Placement) {
        lock(&self.windows).push(MockWindow {
            id,
            title: title.to_string(),
            placement,
        });
    }

    /// Closes a window; later calls against its id fail with `WindowGone`.
    pub fn remove_window(&self, id: WindowId) {
        lock(&self.windows).retain(|w| w.id != id);
        let mut fg = lock(&self.foreground);
        if *fg == Some(id) {
            *fg = None;
        }
    }

    /// Moves or resizes a window, as a user dragging it would.
    pub fn set_placement(&self, id: WindowId, placement: Placement) {
        if let Some(w) = lock(&self.windows).iter_mut().find(|w| w.id == id) {
            w.placement = placement;
        }
    }

    pub fn set_foreground(&self, id: Option<WindowId>) {
        *lock(&self.foreground) = id;
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    pub fn placement_of(&self, id: WindowId) -> Option<Placement> {
        lock(&self.windows).iter().find(|w| w.id == id).map(|w| w.placement)
    }

    // ── Recorded calls ────────────────────────────────────────────────────────

    /// Injected key transitions in order.
    pub fn keys(&self) -> Vec<(u32, bool, KeyEncoding)> {
        lock(&self.keys).clone()
    }

    pub fn pointer_moves(&self) -> Vec<(f32, f32)> {
        lock(&self.pointer_moves).clone()
    }

    /// `(primary, pressed)` pairs in order.
    pub fn pointer_buttons(&self) -> Vec<(bool, bool)> {
        lock(&self.pointer_buttons).clone()
    }

    pub fn focused(&self) -> Vec<WindowId> {
        lock(&self.focused).clone()
    }

    /// Windows a format request was issued for, in order.
    pub fn formatted(&self) -> Vec<WindowId> {
        lock(&self.formatted).clone()
    }

    fn check_fail(&self) -> Result<(), BackendError> {
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(BackendError::Platform("mock failure".into()));
        }
        Ok(())
    }

    fn ensure_exists(&self, id: WindowId) -> Result<(), BackendError> {
        if lock(&self.windows).iter().any(|w| w.id == id) {
            Ok(())
        } else {
            Err(BackendError::WindowGone(id))
        }
    }
}

impl InputBackend for MockInputBackend {
    fn inject_key(
        &self,
        code: u32,
        pressed: bool,
        encoding: KeyEncoding,
    ) -> Result<(), BackendError> {
        self.check_fail()?;
        trace!(code, pressed, %encoding, "mock key");
        lock(&self.keys).push((code, pressed, encoding));
        Ok(())
    }

    fn inject_pointer_button(&self, primary: bool, pressed: bool) -> Result<(), BackendError> {
        self.check_fail()?;
        trace!(primary, pressed, "mock pointer button");
        lock(&self.pointer_buttons).push((primary, pressed));
        Ok(())
    }

    fn move_pointer(&self, x: f32, y: f32) -> Result<(), BackendError> {
        self.check_fail()?;
        lock(&self.pointer_moves).push((x, y));
        Ok(())
    }

    fn focus_window(&self, id: WindowId) -> Result<(), BackendError> {
        self.check_fail()?;
        self.ensure_exists(id)?;
        lock(&self.focused).push(id);
        *lock(&self.foreground) = Some(id);
        Ok(())
    }

    fn format_window(&self, id: WindowId, area: CaptureArea) -> Result<(), BackendError> {
        self.check_fail()?;
        self.ensure_exists(id)?;
        self.set_placement(id, area.placement());
        lock(&self.formatted).push(id);
        Ok(())
    }

    fn window_placement(&self, id: WindowId) -> Result<Placement, BackendError> {
        self.check_fail()?;
        self.placement_of(id).ok_or(BackendError::WindowGone(id))
    }

    fn foreground_window(&self) -> Result<Option<WindowId>, BackendError> {
        self.check_fail()?;
        Ok(*lock(&self.foreground))
    }

    fn find_window_by_title(&self, pattern: &str) -> Result<Option<WindowId>, BackendError> {
        self.check_fail()?;
        let needle = pattern.to_lowercase();
        Ok(lock(&self.windows)
            .iter()
            .find(|w| w.title.to_lowercase().contains(&needle))
            .map(|w| w.id))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_window_by_title_is_case_insensitive_substring() {
        // Arrange
        let backend = MockInputBackend::new();
        backend.add_window(WindowId(1), "Calculator", Placement::default());
        backend.add_window(WindowId(2), "Untitled - Notepad", Placement::default());

        // Act
        let found = backend.find_window_by_title("notepad").unwrap();

        // Assert
        assert_eq!(found, Some(WindowId(2)));
        assert_eq!(backend.find_window_by_title("paint").unwrap(), None);
    }

    #[test]
    fn test_format_window_moves_window_to_capture_area() {
        let backend = MockInputBackend::new();
        backend.add_window(WindowId(1), "game", Placement { x: 50, y: 60, width: 1024, height: 768 });

        backend.format_window(WindowId(1), CaptureArea::new(800, 600)).unwrap();

        assert_eq!(
            backend.placement_of(WindowId(1)),
            Some(Placement { x: 0, y: 0, width: 800, height: 600 })
        );
        assert_eq!(backend.formatted(), vec![WindowId(1)]);
    }

    #[test]
    fn test_calls_on_removed_window_fail_with_window_gone() {
        let backend = MockInputBackend::new();
        backend.add_window(WindowId(3), "x", Placement::default());
        backend.set_foreground(Some(WindowId(3)));

        backend.remove_window(WindowId(3));

        assert!(matches!(
            backend.focus_window(WindowId(3)),
            Err(BackendError::WindowGone(WindowId(3)))
        ));
        assert_eq!(backend.foreground_window().unwrap(), None);
    }

    #[test]
    fn test_should_fail_makes_every_call_fail() {
        let backend = MockInputBackend::new();
        backend.set_should_fail(true);

        assert!(backend.inject_key(65, true, KeyEncoding::VirtualKey).is_err());
        assert!(backend.move_pointer(1.0, 1.0).is_err());
        assert!(backend.foreground_window().is_err());
        assert!(backend.keys().is_empty());
    }

    #[test]
    fn test_focus_makes_window_foreground() {
        let backend = MockInputBackend::new();
        backend.add_window(WindowId(4), "x", Placement::default());

        backend.focus_window(WindowId(4)).unwrap();

        assert_eq!(backend.foreground_window().unwrap(), Some(WindowId(4)));
        assert_eq!(backend.focused(), vec![WindowId(4)]);
    }
}
