//! TOML-based configuration for the client, with command-line overrides.
//!
//! The config file lives in the platform-appropriate directory:
//! - Windows:  `%APPDATA%\syncinput\config.toml`
//! - Linux:    `~/.config/syncinput/config.toml`
//! - macOS:    `~/Library/Application Support/syncinput/config.toml`
//!
//! A missing file is not an error: every field has a default, so the client
//! works out of the box against a server on the same machine.  Example:
//!
//! ```toml
//! [target]
//! pattern = "Untitled - Notepad"   # or "track-foreground"
//! input_encoding = "scan-code"     # "virtual-key" for desktop apps
//!
//! [connection]
//! mode = "mapped-host"             # "loopback" | "mapped-host" | "direct-ip"
//! port = 9090
//!
//! [session]
//! liveness_timeout_secs = 10
//! ```
//!
//! # Precedence (for beginners)
//!
//! 1. Built-in defaults (the `default_*` functions below).
//! 2. Values present in the TOML file.
//! 3. Command-line flags parsed by [`CliArgs`].
//!
//! [`validate`](AppConfig::validate) runs after all three layers are merged,
//! so a bad value is reported no matter where it came from.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::de::{value::StrDeserializer, DeserializeOwned, IntoDeserializer};
use serde::{Deserialize, Serialize};
use syncinput_core::{CaptureArea, KeyEncoding};
use thiserror::Error;

use crate::application::liveness::LivenessConfig;
use crate::application::session::SessionConfig;
use crate::application::session_state::TargetMode;
use crate::application::track_target::TrackerConfig;
use crate::infrastructure::network::{
    ConnectionMode, TransportConfig, DEFAULT_MAPPED_HOST, DEFAULT_PORT,
};

/// Allowed range of `session.liveness_timeout_secs`.
pub const LIVENESS_TIMEOUT_RANGE: std::ops::RangeInclusive<u64> = 1..=600;

/// Error type for configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range or inconsistent with another value.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub target: TargetConfig,
    pub connection: ConnectionConfig,
    pub session: SessionSettings,
}

/// Process-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Which window receives input and how it is laid out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetConfig {
    /// Title substring, or `"track-foreground"`.
    #[serde(default = "default_pattern")]
    pub pattern: String,
    #[serde(default)]
    pub input_encoding: KeyEncoding,
    #[serde(default = "default_capture_width")]
    pub capture_width: u32,
    #[serde(default = "default_capture_height")]
    pub capture_height: u32,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Check the placement of an unchanged target every N polls.
    #[serde(default = "default_recheck_every")]
    pub recheck_every: u32,
}

/// Where the server is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub mode: ConnectionMode,
    /// Required when `mode = "direct-ip"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_address: Option<IpAddr>,
    #[serde(default = "default_mapped_host")]
    pub mapped_host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Pause between a session ending and the next connection attempt.
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,
}

/// Liveness and read-loop timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionSettings {
    #[serde(default = "default_liveness_timeout_secs")]
    pub liveness_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub liveness_poll_interval_ms: u64,
    #[serde(default = "default_read_poll_timeout_ms")]
    pub read_poll_timeout_ms: u64,
    #[serde(default = "default_read_retry_backoff_ms")]
    pub read_retry_backoff_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_pattern() -> String {
    "Notepad".to_string()
}
fn default_capture_width() -> u32 {
    800
}
fn default_capture_height() -> u32 {
    600
}
fn default_poll_interval_ms() -> u64 {
    2000
}
fn default_recheck_every() -> u32 {
    5
}
fn default_mapped_host() -> String {
    DEFAULT_MAPPED_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_reconnect_interval_ms() -> u64 {
    2000
}
fn default_liveness_timeout_secs() -> u64 {
    10
}
fn default_read_poll_timeout_ms() -> u64 {
    1000
}
fn default_read_retry_backoff_ms() -> u64 {
    1000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            input_encoding: KeyEncoding::default(),
            capture_width: default_capture_width(),
            capture_height: default_capture_height(),
            poll_interval_ms: default_poll_interval_ms(),
            recheck_every: default_recheck_every(),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            mode: ConnectionMode::default(),
            server_address: None,
            mapped_host: default_mapped_host(),
            port: default_port(),
            connect_timeout_ms: default_connect_timeout_ms(),
            reconnect_interval_ms: default_reconnect_interval_ms(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            liveness_timeout_secs: default_liveness_timeout_secs(),
            liveness_poll_interval_ms: default_poll_interval_ms(),
            read_poll_timeout_ms: default_read_poll_timeout_ms(),
            read_retry_backoff_ms: default_read_retry_backoff_ms(),
        }
    }
}

// ── Validation and conversion ─────────────────────────────────────────────────

impl AppConfig {
    /// Checks ranges and cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if !LIVENESS_TIMEOUT_RANGE.contains(&self.session.liveness_timeout_secs) {
            return invalid(format!(
                "session.liveness_timeout_secs must be within {}..={}, got {}",
                LIVENESS_TIMEOUT_RANGE.start(),
                LIVENESS_TIMEOUT_RANGE.end(),
                self.session.liveness_timeout_secs
            ));
        }
        let intervals = [
            ("target.poll_interval_ms", self.target.poll_interval_ms),
            ("session.liveness_poll_interval_ms", self.session.liveness_poll_interval_ms),
            ("session.read_poll_timeout_ms", self.session.read_poll_timeout_ms),
            ("connection.connect_timeout_ms", self.connection.connect_timeout_ms),
        ];
        if let Some((name, _)) = intervals.iter().find(|(_, ms)| *ms == 0) {
            return invalid(format!("{name} must be greater than zero"));
        }
        if self.target.pattern.trim().is_empty() {
            return invalid("target.pattern must not be empty".to_string());
        }
        if self.target.capture_width == 0 || self.target.capture_height == 0 {
            return invalid(format!(
                "capture area must be non-empty, got {}x{}",
                self.target.capture_width, self.target.capture_height
            ));
        }
        if self.target.recheck_every == 0 {
            return invalid("target.recheck_every must be at least 1".to_string());
        }
        if self.connection.mode == ConnectionMode::DirectIp
            && self.connection.server_address.is_none()
        {
            return invalid("connection.server_address is required for mode direct-ip".to_string());
        }
        if self.connection.mode == ConnectionMode::MappedHost
            && self.connection.mapped_host.trim().is_empty()
        {
            return invalid("connection.mapped_host must not be empty".to_string());
        }
        Ok(())
    }

    /// Transport settings for `network::connect`.
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            mode: self.connection.mode,
            server_address: self.connection.server_address,
            mapped_host: self.connection.mapped_host.clone(),
            port: self.connection.port,
            connect_timeout: Duration::from_millis(self.connection.connect_timeout_ms),
        }
    }

    /// Settings for one `Session`.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            target_mode: TargetMode::from_pattern(&self.target.pattern),
            encoding: self.target.input_encoding,
            liveness: LivenessConfig {
                timeout: Duration::from_secs(self.session.liveness_timeout_secs),
                poll_interval: Duration::from_millis(self.session.liveness_poll_interval_ms),
            },
            tracker: TrackerConfig {
                capture_area: CaptureArea::new(
                    self.target.capture_width,
                    self.target.capture_height,
                ),
                poll_interval: Duration::from_millis(self.target.poll_interval_ms),
                recheck_every: self.target.recheck_every,
            },
            read_poll_timeout: Duration::from_millis(self.session.read_poll_timeout_ms),
            read_retry_backoff: Duration::from_millis(self.session.read_retry_backoff_ms),
        }
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.connection.reconnect_interval_ms)
    }
}

// ── Command line ──────────────────────────────────────────────────────────────

/// Command-line flags; each one overrides the matching config value.
#[derive(Parser, Debug, Default)]
#[command(
    name = "syncinput",
    version,
    about = "Receive remote keyboard/mouse events over TCP and inject them into a window"
)]
pub struct CliArgs {
    /// Config file to load instead of the platform default.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Window title substring to target, or `track-foreground`.
    #[arg(long, value_name = "PATTERN")]
    pub target: Option<String>,

    /// Key encoding: `virtual-key` (alias `app`) or `scan-code` (alias `game`).
    #[arg(long, value_parser = parse_kebab::<KeyEncoding>)]
    pub encoding: Option<KeyEncoding>,

    /// How to reach the server: `loopback`, `mapped-host`, or `direct-ip`.
    #[arg(long, value_parser = parse_kebab::<ConnectionMode>)]
    pub mode: Option<ConnectionMode>,

    /// Server IP address for `direct-ip` mode.  Implies `--mode direct-ip`
    /// when no mode is given.
    #[arg(long, value_name = "IP")]
    pub server: Option<IpAddr>,

    /// Server TCP port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Seconds of silence after which the session is considered dead.
    #[arg(long, value_name = "SECS")]
    pub liveness_timeout: Option<u64>,

    /// Log filter used when `RUST_LOG` is not set (e.g. `debug`).
    #[arg(long, value_name = "FILTER")]
    pub log_level: Option<String>,
}

/// Parses a kebab-case enum value with the same spelling and aliases the
/// config file accepts.
fn parse_kebab<T: DeserializeOwned>(value: &str) -> Result<T, String> {
    let de: StrDeserializer<'_, serde::de::value::Error> = value.into_deserializer();
    T::deserialize(de).map_err(|e| e.to_string())
}

impl CliArgs {
    /// Writes every flag that was given into `config`.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(target) = &self.target {
            config.target.pattern = target.clone();
        }
        if let Some(encoding) = self.encoding {
            config.target.input_encoding = encoding;
        }
        if let Some(server) = self.server {
            config.connection.server_address = Some(server);
            if self.mode.is_none() {
                config.connection.mode = ConnectionMode::DirectIp;
            }
        }
        if let Some(mode) = self.mode {
            config.connection.mode = mode;
        }
        if let Some(port) = self.port {
            config.connection.port = port;
        }
        if let Some(secs) = self.liveness_timeout {
            config.session.liveness_timeout_secs = secs;
        }
        if let Some(level) = &self.log_level {
            config.client.log_level = level.clone();
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Resolves the full path to the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined from the environment.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Parses a config from TOML text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the TOML is malformed or has wrong types.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Loads the config file.
///
/// With an explicit `path` the file must exist.  Without one, the platform
/// default location is used and a missing file (or an undeterminable config
/// directory) yields `AppConfig::default()`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors and
/// [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let (path, required) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => match config_file_path() {
            Ok(p) => (p, false),
            Err(ConfigError::NoPlatformConfigDir) => return Ok(AppConfig::default()),
            Err(e) => return Err(e),
        },
    };

    match std::fs::read_to_string(&path) {
        Ok(content) => parse_config(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
            Ok(AppConfig::default())
        }
        Err(source) => Err(ConfigError::Io { path, source }),
    }
}

/// Resolves the platform config directory including the `syncinput` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("syncinput"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("syncinput"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("syncinput")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
