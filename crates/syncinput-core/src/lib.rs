//! # syncinput-core
//!
//! Shared library for syncinput containing the wire framing, the text payload
//! codec, window domain types, and key encoding tables.
//!
//! This crate has zero dependencies on OS APIs or network sockets, so every
//! piece of protocol logic can be tested without a desktop or a server.
//!
//! # Architecture overview (for beginners)
//!
//! syncinput is a small client that sits next to a GUI application (often a
//! game running under Wine in a container).  A control server streams
//! keyboard and mouse events to it over TCP, and the client replays them into
//! the application window as if a person were at the keyboard.
//!
//! This crate defines:
//!
//! - **`protocol`** – How bytes travel over the wire.  Events are short ASCII
//!   records such as `K65,1` or `M1,1,100.0,200.0,800.0,600.0`, separated by
//!   `|`.  A single zero byte is a liveness ping.
//!
//! - **`domain`** – Window identifiers and placement rectangles used when the
//!   client keeps the target window sized to the capture area.
//!
//! - **`keymap`** – How key codes are handed to the OS: directly as virtual
//!   keys, or as hardware scan codes for DirectInput games.

pub mod domain;
pub mod keymap;
pub mod protocol;

pub use domain::window::{CaptureArea, Placement, WindowId};
pub use keymap::KeyEncoding;
pub use protocol::codec::{decode_record, encode_event, DecodeError};
pub use protocol::events::{InputEvent, KeyEvent, PointerAction, PointerEvent};
pub use protocol::frame::{Frame, FrameSplitter};
