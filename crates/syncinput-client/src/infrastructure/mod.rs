//! Infrastructure layer for the client application.
//!
//! Contains OS-facing adapters: input injection and window management, TCP
//! transport setup, and the configuration file.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `syncinput_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`input_backend`** – OS-specific implementations of `InputBackend`.
//!   The Windows implementation is selected at compile time; other targets get
//!   the in-memory `MockInputBackend`, which tests use as well.
//!
//! - **`network`** – Resolves the server address for the configured
//!   connection mode and opens the TCP stream a session reads from.
//!
//! - **`config`** – TOML configuration file, command-line overrides, and the
//!   conversion into runtime settings.

pub mod config;
pub mod input_backend;
pub mod network;
