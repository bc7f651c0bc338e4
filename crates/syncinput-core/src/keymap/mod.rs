//! Key encoding policy for injected keyboard events.
//!
//! The server sends Windows virtual-key (VK) codes.  Most desktop
//! applications accept those directly, but games reading the keyboard through
//! DirectInput only see hardware scan codes.  The target application's input
//! mode therefore decides how the backend encodes each key:
//!
//! | Encoding      | What the backend sends                                      |
//! |---------------|-------------------------------------------------------------|
//! | `VirtualKey`  | the VK code as-is                                           |
//! | `ScanCode`    | the VK mapped to a scan code, plus the extended-key flag    |
//! |               | for keys that live on the extended part of the keyboard    |
//!
//! The session engine only forwards the logical event together with the
//! configured [`KeyEncoding`]; it never picks the encoding itself.

use serde::{Deserialize, Serialize};

/// How key transitions are handed to the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyEncoding {
    /// Send the virtual-key code directly (desktop applications).
    #[default]
    #[serde(alias = "app")]
    VirtualKey,
    /// Send hardware scan codes (DirectInput games).
    #[serde(alias = "game")]
    ScanCode,
}

impl std::fmt::Display for KeyEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyEncoding::VirtualKey => f.write_str("virtual-key"),
            KeyEncoding::ScanCode => f.write_str("scan-code"),
        }
    }
}

// ── Virtual-key constants ─────────────────────────────────────────────────────

pub const VK_PRIOR: u32 = 0x21;
pub const VK_NEXT: u32 = 0x22;
pub const VK_END: u32 = 0x23;
pub const VK_HOME: u32 = 0x24;
pub const VK_LEFT: u32 = 0x25;
pub const VK_UP: u32 = 0x26;
pub const VK_RIGHT: u32 = 0x27;
pub const VK_DOWN: u32 = 0x28;
pub const VK_INSERT: u32 = 0x2D;
pub const VK_DELETE: u32 = 0x2E;
pub const VK_LWIN: u32 = 0x5B;
pub const VK_RWIN: u32 = 0x5C;
pub const VK_RCONTROL: u32 = 0xA3;
pub const VK_RMENU: u32 = 0xA5;

/// VK codes whose scan codes need the extended-key flag.
const EXTENDED_VKS: [u32; 14] = [
    VK_PRIOR, VK_NEXT, VK_END, VK_HOME, // navigation cluster
    VK_LEFT, VK_UP, VK_RIGHT, VK_DOWN, // arrows
    VK_INSERT, VK_DELETE, //
    VK_LWIN, VK_RWIN, //
    VK_RCONTROL, VK_RMENU,
];

/// Returns `true` if `vk` must be sent with the extended-key flag when
/// encoded as a scan code.
pub fn is_extended_key(vk: u32) -> bool {
    EXTENDED_VKS.contains(&vk)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arrow_keys_are_extended() {
        for vk in [VK_LEFT, VK_UP, VK_RIGHT, VK_DOWN] {
            assert!(is_extended_key(vk), "VK {vk:#x} must be extended");
        }
    }

    #[test]
    fn test_letter_keys_are_not_extended() {
        assert!(!is_extended_key(0x41)); // 'A'
        assert!(!is_extended_key(0x20)); // space
    }

    #[test]
    fn test_default_encoding_is_virtual_key() {
        assert_eq!(KeyEncoding::default(), KeyEncoding::VirtualKey);
    }

    #[test]
    fn test_encoding_display_matches_config_spelling() {
        assert_eq!(KeyEncoding::ScanCode.to_string(), "scan-code");
        assert_eq!(KeyEncoding::VirtualKey.to_string(), "virtual-key");
    }
}
