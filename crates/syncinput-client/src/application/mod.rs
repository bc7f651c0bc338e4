//! Application layer for the client.
//!
//! # What lives here?
//!
//! - **`session_state`** – State shared by the three tasks of a session: the
//!   last-activity timestamp, the one-shot termination broadcast, and the
//!   current target window.
//!
//! - **`dispatch_input`** – The [`InputBackend`](dispatch_input::InputBackend)
//!   trait the OS adapters implement, and the use case that routes decoded
//!   events to it.
//!
//! - **`liveness`** – Ends the session when nothing has been received for
//!   longer than the configured timeout.
//!
//! - **`track_target`** – Periodically finds the target window and keeps it
//!   formatted to the capture area.
//!
//! - **`session`** – The receive loop that ties the above together.

pub mod dispatch_input;
pub mod liveness;
pub mod session;
pub mod session_state;
pub mod track_target;
