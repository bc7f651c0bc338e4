//! Window identity and placement.
//!
//! The client keeps a single *target* window sized to the *capture area*: the
//! region the streaming server grabs video from, anchored at the screen
//! origin.  Pointer coordinates on the wire are expressed in that area's pixel
//! space, so a target that drifts away from it would receive clicks in the
//! wrong place.

use serde::{Deserialize, Serialize};

/// Opaque OS window handle.
///
/// On Windows this is the numeric value of an `HWND`.  The value is only
/// meaningful to the backend that produced it; a handle may go stale at any
/// time when the window is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowId(pub u64);

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Position and size of a window in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Size of the region the target window must cover, anchored at (0, 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureArea {
    pub width: u32,
    pub height: u32,
}

impl CaptureArea {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The placement a correctly formatted target window has.
    pub fn placement(&self) -> Placement {
        Placement {
            x: 0,
            y: 0,
            width: self.width,
            height: self.height,
        }
    }

    /// Returns `true` when `placement` exactly covers this area.
    pub fn is_covered_by(&self, placement: &Placement) -> bool {
        *placement == self.placement()
    }
}

impl Default for CaptureArea {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_area_placement_is_anchored_at_origin() {
        let area = CaptureArea::new(1280, 720);
        assert_eq!(
            area.placement(),
            Placement { x: 0, y: 0, width: 1280, height: 720 }
        );
    }

    #[test]
    fn test_is_covered_by_detects_offset_window() {
        let area = CaptureArea::default();
        let drifted = Placement { x: 10, y: 0, width: 800, height: 600 };
        assert!(!area.is_covered_by(&drifted));
        assert!(area.is_covered_by(&area.placement()));
    }

    #[test]
    fn test_is_covered_by_detects_resized_window() {
        let area = CaptureArea::default();
        let resized = Placement { x: 0, y: 0, width: 640, height: 480 };
        assert!(!area.is_covered_by(&resized));
    }

    #[test]
    fn test_window_id_displays_as_hex() {
        assert_eq!(WindowId(0x1a2b).to_string(), "0x1a2b");
    }
}
