//! syncinput client entry point.
//!
//! Loads the configuration, installs logging, and then keeps one session
//! alive at a time until Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config() + CliArgs::apply_overrides()
//!  └─ reconnect loop
//!       ├─ network::connect()        -- TCP stream per connection mode
//!       ├─ Session::run()            -- receive loop + liveness + tracker
//!       └─ sleep(reconnect_interval) -- after any session end but Ctrl-C
//! ```
//!
//! # Reconnect loop (for beginners)
//!
//! Sessions are never revived.  When one ends (the server went silent,
//! closed the connection, or a read failed) the loop waits for the
//! reconnect interval, opens a new stream, and builds a brand-new `Session`
//! with fresh state around it.  Ctrl-C asks the running session to shut down,
//! waits for it to stop, and exits.
//!
//! # Input backend
//!
//! On Windows the native `SendInput` backend is used.  Other platforms get the
//! in-memory `MockInputBackend`, so the client still runs as a dry run that
//! logs what it would inject.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use syncinput_client::application::dispatch_input::InputBackend;
use syncinput_client::application::session::Session;
use syncinput_client::infrastructure::{
    config::{load_config, CliArgs},
    input_backend::NativeInputBackend,
    network::connect,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    let mut config = load_config(args.config.as_deref()).context("loading configuration")?;
    args.apply_overrides(&mut config);
    config.validate()?;

    // Initialise structured logging.  RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&config.client.log_level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        target_pattern = %config.target.pattern,
        encoding = %config.target.input_encoding,
        mode = %config.connection.mode,
        port = config.connection.port,
        "syncinput starting"
    );

    // ── Input backend ─────────────────────────────────────────────────────────
    let backend: Arc<dyn InputBackend> = Arc::new(NativeInputBackend::new());
    #[cfg(not(target_os = "windows"))]
    warn!("no native input backend on this platform; events are logged, not injected");

    let transport = config.transport_config();
    let session_config = config.session_config();
    let reconnect_interval = config.reconnect_interval();

    // ── Ctrl-C ────────────────────────────────────────────────────────────────
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    // ── Reconnect loop ────────────────────────────────────────────────────────
    loop {
        let connected = tokio::select! {
            _ = &mut ctrl_c => break,
            result = connect(&transport) => result,
        };

        match connected {
            Ok(stream) => {
                let session = Session::new(stream, session_config.clone(), Arc::clone(&backend));
                info!(session = %session.id(), "connected");
                let state = session.state();
                let run = session.run();
                tokio::pin!(run);

                let result = tokio::select! {
                    result = &mut run => result,
                    _ = &mut ctrl_c => {
                        info!("shutdown signal received");
                        state.shutdown();
                        if let Err(e) = run.await {
                            error!("session ended during shutdown: {e}");
                        }
                        break;
                    }
                };

                match result {
                    Ok(()) => break,
                    Err(e) => warn!("session ended: {e}; reconnecting in {reconnect_interval:?}"),
                }
            }
            Err(e) => warn!("{e}; retrying in {reconnect_interval:?}"),
        }

        tokio::select! {
            _ = &mut ctrl_c => break,
            _ = tokio::time::sleep(reconnect_interval) => {}
        }
    }

    info!("syncinput stopped");
    Ok(())
}
