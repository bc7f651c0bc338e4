//! Decoded input events carried by the syncinput wire protocol.
//!
//! Each wire record decodes to exactly one [`InputEvent`].  Values are taken
//! as-is from the payload: key codes are not range-checked against any OS
//! table and pointer coordinates are not clamped.  Scaling against the real
//! screen is the input backend's job.

use serde::{Deserialize, Serialize};

// ── Wire tags and state values ────────────────────────────────────────────────

/// Leading tag of a keyboard record (`K<code>,<state>`).
pub const KEY_TAG: char = 'K';

/// Leading tag of a pointer record (`M<isLeft>,<state>,<x>,<y>,<w>,<h>`).
pub const POINTER_TAG: char = 'M';

/// Key state value for a released key.
pub const KEY_UP: u8 = 0;

/// Key state value for a pressed key.
pub const KEY_DOWN: u8 = 1;

// ── Keyboard ──────────────────────────────────────────────────────────────────

/// A single key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Key code as sent by the server (a Windows virtual-key code in practice).
    pub code: u32,
    /// `true` for key-down, `false` for key-up.
    pub pressed: bool,
}

// ── Pointer ───────────────────────────────────────────────────────────────────

/// What a pointer record asks the backend to do after moving the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum PointerAction {
    /// Move only; no button transition.
    Move = 0,
    /// Press the button.
    Press = 1,
    /// Release the button.
    Release = 2,
}

impl TryFrom<u8> for PointerAction {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PointerAction::Move),
            1 => Ok(PointerAction::Press),
            2 => Ok(PointerAction::Release),
            _ => Err(()),
        }
    }
}

/// A pointer movement, optionally followed by a button transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// `true` for the primary (left) button, `false` for the secondary one.
    pub primary: bool,
    pub action: PointerAction,
    /// Target X coordinate in the capture area's pixel space.
    pub x: f32,
    /// Target Y coordinate in the capture area's pixel space.
    pub y: f32,
    /// Width of the reference frame the server computed `x` against.
    pub ref_width: f32,
    /// Height of the reference frame the server computed `y` against.
    pub ref_height: f32,
}

impl PointerEvent {
    /// Returns `true` only for a button press.
    pub fn pressed(&self) -> bool {
        self.action == PointerAction::Press
    }

    /// Returns `true` when the event carries a button transition.
    pub fn has_button_transition(&self) -> bool {
        self.action != PointerAction::Move
    }
}

// ── Event ─────────────────────────────────────────────────────────────────────

/// One decoded unit of remote input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    Key(KeyEvent),
    Pointer(PointerEvent),
}

impl From<KeyEvent> for InputEvent {
    fn from(event: KeyEvent) -> Self {
        InputEvent::Key(event)
    }
}

impl From<PointerEvent> for InputEvent {
    fn from(event: PointerEvent) -> Self {
        InputEvent::Pointer(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pointer(action: PointerAction) -> PointerEvent {
        PointerEvent {
            primary: true,
            action,
            x: 1.0,
            y: 2.0,
            ref_width: 800.0,
            ref_height: 600.0,
        }
    }

    #[test]
    fn test_pointer_action_try_from_accepts_wire_values() {
        assert_eq!(PointerAction::try_from(0), Ok(PointerAction::Move));
        assert_eq!(PointerAction::try_from(1), Ok(PointerAction::Press));
        assert_eq!(PointerAction::try_from(2), Ok(PointerAction::Release));
    }

    #[test]
    fn test_pointer_action_try_from_rejects_unknown_value() {
        assert!(PointerAction::try_from(3).is_err());
    }

    #[test]
    fn test_pressed_is_true_only_for_press() {
        assert!(pointer(PointerAction::Press).pressed());
        assert!(!pointer(PointerAction::Release).pressed());
        assert!(!pointer(PointerAction::Move).pressed());
    }

    #[test]
    fn test_move_has_no_button_transition() {
        assert!(!pointer(PointerAction::Move).has_button_transition());
        assert!(pointer(PointerAction::Release).has_button_transition());
    }

    #[test]
    fn test_input_event_from_key_event() {
        let key = KeyEvent { code: 65, pressed: true };
        assert_eq!(InputEvent::from(key), InputEvent::Key(key));
    }
}
