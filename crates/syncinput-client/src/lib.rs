//! syncinput-client library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does syncinput-client do? (for beginners)
//!
//! The client runs on the machine (or inside the VM/container) where the
//! controlled application lives.  A control server streams keyboard and
//! mouse events to it, and the client replays them into the application.
//!
//! For each connection the client:
//!
//! 1. Opens a TCP stream to the server (loopback, a mapped host name such as
//!    `host.docker.internal`, or a fixed IP address).
//! 2. Reads `|`-delimited records and zero-byte pings from the stream.
//! 3. Decodes each record into a key or pointer event and injects it through
//!    the platform [`InputBackend`](application::dispatch_input::InputBackend).
//! 4. Meanwhile a liveness monitor ends the session when the server goes
//!    silent, and a target tracker keeps the application window found,
//!    focused, and sized to the capture area.
//!
//! When a session ends for any reason other than Ctrl-C, the binary waits
//! briefly and starts a fresh one.

/// Application layer: session engine and use cases.
pub mod application;

/// Infrastructure layer: OS input backends, network transport, and config.
pub mod infrastructure;
