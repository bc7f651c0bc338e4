//! Platform-specific input backend implementations.
//!
//! The correct implementation is selected at compile time via
//! `#[cfg(target_os = ...)]` and exported as [`NativeInputBackend`].  Targets
//! without a native implementation fall back to [`MockInputBackend`], which
//! records events instead of injecting them (a dry run).

pub mod mock;

#[cfg(target_os = "windows")]
pub mod windows;

pub use mock::MockInputBackend;

#[cfg(target_os = "windows")]
pub type NativeInputBackend = windows::WindowsInputBackend;

#[cfg(not(target_os = "windows"))]
pub type NativeInputBackend = mock::MockInputBackend;
