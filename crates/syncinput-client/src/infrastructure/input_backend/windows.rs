//! Windows input backend via the SendInput and window-management APIs.
//!
//! Keys are injected as virtual-key codes or, for DirectInput games, as scan
//! codes obtained with `MapVirtualKeyW`.  Pointer coordinates arrive in
//! screen pixels and are normalized to the `[0, 65535]` absolute range that
//! `MOUSEEVENTF_ABSOLUTE` expects.
//!
//! Window handles cross the [`InputBackend`] boundary as [`WindowId`]s
//! holding the numeric `HWND` value.  Every window call checks `IsWindow`
//! first and reports a closed window as [`BackendError::WindowGone`].

#![cfg(target_os = "windows")]

use std::ffi::c_void;

use syncinput_core::keymap::is_extended_key;
use syncinput_core::{CaptureArea, KeyEncoding, Placement, WindowId};
use windows::Win32::Foundation::{BOOL, HWND, LPARAM, RECT};
use windows::Win32::UI::Input::KeyboardAndMouse::{
    MapVirtualKeyW, SendInput, SetActiveWindow, SetFocus, INPUT, INPUT_0, INPUT_KEYBOARD,
    INPUT_MOUSE, KEYBDINPUT, KEYBD_EVENT_FLAGS, KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP,
    KEYEVENTF_SCANCODE, MAPVK_VK_TO_VSC, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN,
    MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MOVE, MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP,
    MOUSEINPUT, MOUSE_EVENT_FLAGS, VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    BringWindowToTop, EnumWindows, GetForegroundWindow, GetSystemMetrics, GetWindowLongPtrW,
    GetWindowRect, GetWindowTextLengthW, GetWindowTextW, IsWindow, IsWindowVisible,
    SetForegroundWindow, SetWindowLongPtrW, SetWindowPos, ShowWindow, GWL_STYLE, HWND_TOP,
    SM_CXSCREEN, SM_CYSCREEN, SWP_FRAMECHANGED, SWP_SHOWWINDOW, SW_RESTORE, WS_CAPTION,
    WS_THICKFRAME,
};

use crate::application::dispatch_input::{BackendError, InputBackend};

/// Windows implementation of [`InputBackend`].
#[derive(Debug, Default)]
pub struct WindowsInputBackend;

impl WindowsInputBackend {
    pub fn new() -> Self {
        Self
    }
}

// ── Handle conversion ─────────────────────────────────────────────────────────

fn to_hwnd(id: WindowId) -> HWND {
    HWND(id.0 as usize as *mut c_void)
}

fn to_window_id(hwnd: HWND) -> Option<WindowId> {
    if hwnd.0.is_null() {
        None
    } else {
        Some(WindowId(hwnd.0 as usize as u64))
    }
}

/// Returns the live `HWND` for `id`, or `WindowGone` if it was closed.
fn live_hwnd(id: WindowId) -> Result<HWND, BackendError> {
    let hwnd = to_hwnd(id);
    // SAFETY: IsWindow accepts any handle value.
    if unsafe { IsWindow(hwnd) }.as_bool() {
        Ok(hwnd)
    } else {
        Err(BackendError::WindowGone(id))
    }
}

// ── Input ─────────────────────────────────────────────────────────────────────

fn send(inputs: &[INPUT]) -> Result<(), BackendError> {
    // SAFETY: every element is a fully initialised INPUT structure.
    let sent = unsafe { SendInput(inputs, std::mem::size_of::<INPUT>() as i32) };
    if sent as usize != inputs.len() {
        return Err(BackendError::Platform(format!(
            "SendInput injected {sent} of {} events",
            inputs.len()
        )));
    }
    Ok(())
}

fn mouse_input(dx: i32, dy: i32, flags: MOUSE_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx,
                dy,
                mouseData: 0,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

/// Normalizes a pixel coordinate to the absolute `[0, 65535]` range.
fn normalize(value: f32, screen_extent: i32) -> i32 {
    if screen_extent <= 1 {
        return 0;
    }
    let scaled = f64::from(value) * (65535.0 / f64::from(screen_extent - 1));
    scaled.round().clamp(0.0, 65535.0) as i32
}

impl InputBackend for WindowsInputBackend {
    fn inject_key(
        &self,
        code: u32,
        pressed: bool,
        encoding: KeyEncoding,
    ) -> Result<(), BackendError> {
        if code == 0 || code > 0xFE {
            return Err(BackendError::InvalidKeyCode(code));
        }

        let mut flags = KEYBD_EVENT_FLAGS(0);
        if !pressed {
            flags |= KEYEVENTF_KEYUP;
        }

        let (vk, scan) = match encoding {
            KeyEncoding::VirtualKey => (VIRTUAL_KEY(code as u16), 0u16),
            KeyEncoding::ScanCode => {
                // SAFETY: MapVirtualKeyW has no preconditions.
                let scan = unsafe { MapVirtualKeyW(code, MAPVK_VK_TO_VSC) };
                if scan == 0 {
                    return Err(BackendError::InvalidKeyCode(code));
                }
                flags |= KEYEVENTF_SCANCODE;
                if is_extended_key(code) {
                    flags |= KEYEVENTF_EXTENDEDKEY;
                }
                (VIRTUAL_KEY(0), scan as u16)
            }
        };

        let input = INPUT {
            r#type: INPUT_KEYBOARD,
            Anonymous: INPUT_0 {
                ki: KEYBDINPUT {
                    wVk: vk,
                    wScan: scan,
                    dwFlags: flags,
                    time: 0,
                    dwExtraInfo: 0,
                },
            },
        };
        send(&[input])
    }

    fn inject_pointer_button(&self, primary: bool, pressed: bool) -> Result<(), BackendError> {
        let flags = match (primary, pressed) {
            (true, true) => MOUSEEVENTF_LEFTDOWN,
            (true, false) => MOUSEEVENTF_LEFTUP,
            (false, true) => MOUSEEVENTF_RIGHTDOWN,
            (false, false) => MOUSEEVENTF_RIGHTUP,
        };
        send(&[mouse_input(0, 0, flags)])
    }

    fn move_pointer(&self, x: f32, y: f32) -> Result<(), BackendError> {
        // SAFETY: GetSystemMetrics is always safe to call.
        let (screen_w, screen_h) =
            unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
        let input = mouse_input(
            normalize(x, screen_w),
            normalize(y, screen_h),
            MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE,
        );
        send(&[input])
    }

    fn focus_window(&self, id: WindowId) -> Result<(), BackendError> {
        let hwnd = live_hwnd(id)?;
        // SAFETY: hwnd was just checked with IsWindow.  Focus changes are
        // best-effort; Windows may refuse them for background processes.
        unsafe {
            let _ = SetActiveWindow(hwnd);
            let _ = ShowWindow(hwnd, SW_RESTORE);
            let _ = SetFocus(hwnd);
            let _ = BringWindowToTop(hwnd);
        }
        Ok(())
    }

    fn format_window(&self, id: WindowId, area: CaptureArea) -> Result<(), BackendError> {
        let hwnd = live_hwnd(id)?;
        // SAFETY: hwnd was just checked with IsWindow.
        unsafe {
            let style = GetWindowLongPtrW(hwnd, GWL_STYLE);
            let borderless = style & !((WS_CAPTION.0 | WS_THICKFRAME.0) as isize);
            if borderless != style {
                SetWindowLongPtrW(hwnd, GWL_STYLE, borderless);
            }
            SetWindowPos(
                hwnd,
                HWND_TOP,
                0,
                0,
                area.width as i32,
                area.height as i32,
                SWP_FRAMECHANGED | SWP_SHOWWINDOW,
            )
            .map_err(|e| BackendError::Platform(format!("SetWindowPos failed: {e}")))?;
            let _ = SetForegroundWindow(hwnd);
        }
        Ok(())
    }

    fn window_placement(&self, id: WindowId) -> Result<Placement, BackendError> {
        let hwnd = live_hwnd(id)?;
        let mut rect = RECT::default();
        // SAFETY: hwnd is live and rect is a valid out-pointer.
        unsafe { GetWindowRect(hwnd, &mut rect) }
            .map_err(|e| BackendError::Platform(format!("GetWindowRect failed: {e}")))?;
        Ok(Placement {
            x: rect.left,
            y: rect.top,
            width: (rect.right - rect.left).max(0) as u32,
            height: (rect.bottom - rect.top).max(0) as u32,
        })
    }

    fn foreground_window(&self) -> Result<Option<WindowId>, BackendError> {
        // SAFETY: GetForegroundWindow has no preconditions.
        Ok(to_window_id(unsafe { GetForegroundWindow() }))
    }

    fn find_window_by_title(&self, pattern: &str) -> Result<Option<WindowId>, BackendError> {
        let mut search = TitleSearch {
            needle: pattern.to_lowercase(),
            found: None,
        };
        // SAFETY: the callback only dereferences lparam as the TitleSearch
        // borrowed here, which outlives the EnumWindows call.  A callback that
        // stops early makes EnumWindows report an error, so its result is not
        // checked.
        unsafe {
            let _ = EnumWindows(
                Some(match_title),
                LPARAM(&mut search as *mut TitleSearch as isize),
            );
        }
        Ok(search.found)
    }
}

// ── Window enumeration ────────────────────────────────────────────────────────

struct TitleSearch {
    needle: String,
    found: Option<WindowId>,
}

unsafe extern "system" fn match_title(hwnd: HWND, lparam: LPARAM) -> BOOL {
    let search = &mut *(lparam.0 as *mut TitleSearch);

    if !IsWindowVisible(hwnd).as_bool() {
        return BOOL(1);
    }
    let len = GetWindowTextLengthW(hwnd);
    if len <= 0 {
        return BOOL(1);
    }

    let mut buf = vec![0u16; len as usize + 1];
    let copied = GetWindowTextW(hwnd, &mut buf);
    let title = String::from_utf16_lossy(&buf[..copied.max(0) as usize]);
    if title.to_lowercase().contains(&search.needle) {
        search.found = to_window_id(hwnd);
        return BOOL(0);
    }
    BOOL(1)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
