//! Network infrastructure for the client application.
//!
//! Opens the TCP stream a [`Session`](crate::application::session::Session)
//! reads from.  The server address depends on where the client runs:
//!
//! | Mode          | Address                                   | Typical setup                 |
//! |---------------|-------------------------------------------|-------------------------------|
//! | `loopback`    | `127.0.0.1`                               | server on the same host       |
//! | `mapped-host` | DNS lookup of `mapped_host`               | client inside a container     |
//! |               | (default `host.docker.internal`)          | talking to the host           |
//! | `direct-ip`   | `server_address`                          | VM on a bridged network       |
//!
//! The stream is server → client only; the client never writes to it.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::net::{lookup_host, TcpStream};
use tracing::{debug, info};

/// Default TCP port of the control server.
pub const DEFAULT_PORT: u16 = 9090;

/// Host name Docker maps to the host machine.
pub const DEFAULT_MAPPED_HOST: &str = "host.docker.internal";

/// Errors that can occur while establishing the transport.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The mapped host name could not be resolved.
    #[error("failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },
    /// The mapped host name resolved to no addresses.
    #[error("{0} resolved to no addresses")]
    NoAddress(String),
    /// `direct-ip` mode was selected without a server address.
    #[error("connection mode direct-ip requires a server address")]
    MissingServerAddress,
    /// TCP connection to the server failed.
    #[error("failed to connect to server at {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// The connection attempt did not complete in time.
    #[error("timed out connecting to server at {addr} after {after:?}")]
    Timeout { addr: SocketAddr, after: Duration },
}

/// Where the server is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionMode {
    #[default]
    Loopback,
    MappedHost,
    DirectIp,
}

impl std::fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionMode::Loopback => f.write_str("loopback"),
            ConnectionMode::MappedHost => f.write_str("mapped-host"),
            ConnectionMode::DirectIp => f.write_str("direct-ip"),
        }
    }
}

/// Configuration for the client's transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub mode: ConnectionMode,
    /// Server IP for [`ConnectionMode::DirectIp`].
    pub server_address: Option<IpAddr>,
    /// Host name for [`ConnectionMode::MappedHost`].
    pub mapped_host: String,
    pub port: u16,
    pub connect_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: ConnectionMode::Loopback,
            server_address: None,
            mapped_host: DEFAULT_MAPPED_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Resolves the socket address for `config`.
///
/// # Errors
///
/// Returns [`ConnectionError::MissingServerAddress`] for `direct-ip` without
/// an address, and [`ConnectionError::Resolve`] / [`ConnectionError::NoAddress`]
/// when the mapped host cannot be resolved.
pub async fn resolve_server_addr(config: &TransportConfig) -> Result<SocketAddr, ConnectionError> {
    match config.mode {
        ConnectionMode::Loopback => Ok(SocketAddr::new(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            config.port,
        )),
        ConnectionMode::DirectIp => config
            .server_address
            .map(|ip| SocketAddr::new(ip, config.port))
            .ok_or(ConnectionError::MissingServerAddress),
        ConnectionMode::MappedHost => {
            let host = config.mapped_host.as_str();
            let resolved: Vec<SocketAddr> = lookup_host((host, config.port))
                .await
                .map_err(|source| ConnectionError::Resolve {
                    host: host.to_string(),
                    source,
                })?
                .collect();
            // The server listens on IPv4; prefer an IPv4 answer when there is one.
            resolved
                .iter()
                .find(|a| a.is_ipv4())
                .or_else(|| resolved.first())
                .copied()
                .ok_or_else(|| ConnectionError::NoAddress(host.to_string()))
        }
    }
}

/// Opens the TCP transport to the server.
///
/// # Errors
///
/// Returns a [`ConnectionError`] if the address cannot be resolved, the
/// connection is refused, or it does not complete within the timeout.
pub async fn connect(config: &TransportConfig) -> Result<TcpStream, ConnectionError> {
    let addr = resolve_server_addr(config).await?;
    debug!(mode = %config.mode, %addr, "connecting to server");

    let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(addr))
        .await
        .map_err(|_| ConnectionError::Timeout {
            addr,
            after: config.connect_timeout,
        })?
        .map_err(|source| ConnectionError::ConnectFailed { addr, source })?;

    if let Err(e) = stream.set_nodelay(true) {
        debug!("could not set TCP_NODELAY: {e}");
    }
    info!(%addr, "connected to server");
    Ok(stream)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_loopback_resolves_to_localhost() {
        let config = TransportConfig {
            port: 9191,
            ..Default::default()
        };

        let addr = resolve_server_addr(&config).await.unwrap();

        assert_eq!(addr, "127.0.0.1:9191".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_direct_ip_without_address_is_error() {
        let config = TransportConfig {
            mode: ConnectionMode::DirectIp,
            ..Default::default()
        };

        let result = resolve_server_addr(&config).await;

        assert!(matches!(result, Err(ConnectionError::MissingServerAddress)));
    }

    #[tokio::test]
    async fn test_direct_ip_uses_configured_address() {
        let config = TransportConfig {
            mode: ConnectionMode::DirectIp,
            server_address: Some("10.0.0.7".parse().unwrap()),
            ..Default::default()
        };

        let addr = resolve_server_addr(&config).await.unwrap();

        assert_eq!(addr, "10.0.0.7:9090".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_mapped_host_resolves_through_dns() {
        let config = TransportConfig {
            mode: ConnectionMode::MappedHost,
            mapped_host: "localhost".to_string(),
            port: 4242,
            ..Default::default()
        };

        let addr = resolve_server_addr(&config).await.unwrap();

        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 4242);
    }

    #[tokio::test]
    async fn test_connect_reaches_listening_server() {
        // Arrange
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let config = TransportConfig {
            port,
            ..Default::default()
        };

        // Act
        let (client, accepted) = tokio::join!(connect(&config), listener.accept());

        // Assert
        assert!(client.is_ok());
        assert!(accepted.is_ok());
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        // Arrange: bind then drop so the port is very likely closed
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let config = TransportConfig {
            port,
            ..Default::default()
        };

        // Act
        let result = connect(&config).await;

        // Assert
        assert!(matches!(result, Err(ConnectionError::ConnectFailed { .. })));
    }

    #[test]
    fn test_connection_mode_parses_kebab_case() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: ConnectionMode,
        }
        let w: Wrapper = toml::from_str(r#"mode = "mapped-host""#).unwrap();
        assert_eq!(w.mode, ConnectionMode::MappedHost);
        assert_eq!(ConnectionMode::DirectIp.to_string(), "direct-ip");
    }
}
