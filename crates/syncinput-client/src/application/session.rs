//! Session engine: the receive loop of one server connection.
//!
//! A [`Session`] owns the transport and a fresh [`SessionState`].  Running it
//! spawns the liveness monitor and the target tracker, then reads from the
//! transport until the session is terminated:
//!
//! ```text
//!            ┌──────────────────────── Session::run ─────────────────────────┐
//! transport ─┤ read ─▶ touch ─▶ FrameSplitter ─▶ decode_record ─▶ dispatch ──┼─▶ InputBackend
//!            └───────────────────────────────────────────────────────────────┘
//!                 ▲ termination broadcast            ▲ target
//!     LivenessMonitor (spawned)            TargetTracker (spawned)
//! ```
//!
//! # How does a session end? (for beginners)
//!
//! Whoever notices a problem first calls `SessionState::terminate` with a
//! reason: the monitor on silence, the receive loop on EOF or a fatal read
//! error, the binary on Ctrl-C.  Every task selects on the same broadcast and
//! exits by itself; the receive loop only reaps the two helpers once the
//! session is already over.  Each read is also bounded by a short timeout,
//! which keeps the loop responsive even on transports whose reads never
//! wake up.
//!
//! A terminated session is finished for good.  Reconnecting means opening a
//! new transport and building a new `Session` around it.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use syncinput_core::{decode_record, Frame, FrameSplitter, KeyEncoding};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{sleep, timeout};
use tracing::{debug, info, info_span, trace, warn, Instrument};
use uuid::Uuid;

use super::dispatch_input::{DispatchInputUseCase, InputBackend};
use super::liveness::{LivenessConfig, LivenessMonitor};
use super::session_state::{SessionError, SessionState, TargetMode};
use super::track_target::{TargetTracker, TrackerConfig};

/// Bytes requested per read.
const READ_BUFFER_LEN: usize = 2048;

/// Everything a session needs besides its transport and backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub target_mode: TargetMode,
    pub encoding: KeyEncoding,
    pub liveness: LivenessConfig,
    pub tracker: TrackerConfig,
    /// Upper bound on a single read before the loop re-checks termination.
    pub read_poll_timeout: Duration,
    /// Pause after a transient read error.
    pub read_retry_backoff: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target_mode: TargetMode::Title("Notepad".to_string()),
            encoding: KeyEncoding::default(),
            liveness: LivenessConfig::default(),
            tracker: TrackerConfig::default(),
            read_poll_timeout: Duration::from_secs(1),
            read_retry_backoff: Duration::from_secs(1),
        }
    }
}

/// One connection to the control server.
pub struct Session<T> {
    id: Uuid,
    transport: T,
    state: Arc<SessionState>,
    backend: Arc<dyn InputBackend>,
    config: SessionConfig,
}

impl<T> Session<T>
where
    T: AsyncRead + Unpin + Send,
{
    /// Wraps a connected transport with fresh session state.
    pub fn new(transport: T, config: SessionConfig, backend: Arc<dyn InputBackend>) -> Self {
        let state = Arc::new(SessionState::new(config.target_mode.clone()));
        Self {
            id: Uuid::new_v4(),
            transport,
            state,
            backend,
            config,
        }
    }

    /// Log-correlation id of this session.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Handle to the shared state, e.g. to request shutdown from outside.
    pub fn state(&self) -> Arc<SessionState> {
        Arc::clone(&self.state)
    }

    /// Runs the session to completion.
    ///
    /// # Errors
    ///
    /// Returns the [`SessionError`] that ended the session, unless it was ended
    /// by [`SessionState::shutdown`], in which case `Ok(())` is returned.
    pub async fn run(self) -> Result<(), SessionError> {
        let span = info_span!("session", id = %self.id);
        let reason = self.run_loop().instrument(span).await;
        if reason.is_shutdown() {
            Ok(())
        } else {
            Err(reason)
        }
    }

    async fn run_loop(self) -> SessionError {
        let Session {
            mut transport,
            state,
            backend,
            config,
            ..
        } = self;

        info!(target_mode = %config.target_mode, encoding = %config.encoding, "session started");

        let monitor = LivenessMonitor::new(Arc::clone(&state), config.liveness);
        let monitor = tokio::spawn(monitor.run().in_current_span());

        let tracker = TargetTracker::new(Arc::clone(&state), Arc::clone(&backend), config.tracker);
        let tracker = tokio::spawn(tracker.run().in_current_span());

        let mut dispatcher = DispatchInputUseCase::new(backend, config.encoding);
        let mut splitter = FrameSplitter::new();
        let mut buf = vec![0u8; READ_BUFFER_LEN];

        let reason = loop {
            let read = tokio::select! {
                biased;
                reason = state.terminated() => break reason,
                read = timeout(config.read_poll_timeout, transport.read(&mut buf)) => read,
            };

            match read {
                // Nothing arrived within the poll window; go round and re-check.
                Err(_elapsed) => {}
                Ok(Ok(0)) => {
                    state.terminate(SessionError::Disconnected);
                }
                Ok(Ok(n)) => {
                    state.touch();
                    for frame in splitter.push(&buf[..n]) {
                        handle_frame(&state, &mut dispatcher, frame);
                    }
                }
                Ok(Err(e)) if is_transient(&e) => {
                    debug!("transient read error, retrying: {e}");
                    tokio::select! {
                        biased;
                        _ = state.terminated() => {}
                        _ = sleep(config.read_retry_backoff) => {}
                    }
                }
                Ok(Err(e)) => {
                    state.terminate(SessionError::ReadFailed {
                        kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        };

        if splitter.pending_len() > 0 {
            debug!(bytes = splitter.pending_len(), "discarding unterminated record");
        }
        // Both tasks select on the termination broadcast and exit promptly.
        for (name, task) in [("liveness monitor", monitor), ("target tracker", tracker)] {
            if let Err(e) = task.await {
                warn!("{name} task failed: {e}");
            }
        }
        info!("session ended: {reason}");
        reason
    }
}

fn handle_frame(state: &SessionState, dispatcher: &mut DispatchInputUseCase, frame: Frame) {
    let record = match frame {
        Frame::Ping => {
            trace!("ping");
            return;
        }
        Frame::Record(record) => record,
    };

    let event = match decode_record(&record) {
        Ok(event) => event,
        Err(e) => {
            warn!(record = %String::from_utf8_lossy(&record), "dropping malformed record: {e}");
            return;
        }
    };

    debug!(?event, "event received");
    if let Err(e) = dispatcher.dispatch(state, &event) {
        warn!("input dispatch failed: {e}");
    }
}

/// Read errors that are worth retrying on the same connection.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
    )
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dispatch_input::BackendError;
    use std::sync::Mutex;
    use syncinput_core::{CaptureArea, Placement, WindowId};
    use tokio_test::io::Builder;

    // ── Recording backend ─────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingBackend {
        keys: Mutex<Vec<(u32, bool)>>,
        moves: Mutex<Vec<(f32, f32)>>,
        buttons: Mutex<Vec<(bool, bool)>>,
    }

    impl InputBackend for RecordingBackend {
        fn inject_key(&self, code: u32, pressed: bool, _: KeyEncoding) -> Result<(), BackendError> {
            self.keys.lock().unwrap().push((code, pressed));
            Ok(())
        }

        fn inject_pointer_button(&self, primary: bool, pressed: bool) -> Result<(), BackendError> {
            self.buttons.lock().unwrap().push((primary, pressed));
            Ok(())
        }

        fn move_pointer(&self, x: f32, y: f32) -> Result<(), BackendError> {
            self.moves.lock().unwrap().push((x, y));
            Ok(())
        }

        fn focus_window(&self, _: WindowId) -> Result<(), BackendError> {
            Ok(())
        }

        fn format_window(&self, _: WindowId, _: CaptureArea) -> Result<(), BackendError> {
            Ok(())
        }

        fn window_placement(&self, _: WindowId) -> Result<Placement, BackendError> {
            Ok(CaptureArea::default().placement())
        }

        fn foreground_window(&self) -> Result<Option<WindowId>, BackendError> {
            Ok(Some(WindowId(1)))
        }

        fn find_window_by_title(&self, _: &str) -> Result<Option<WindowId>, BackendError> {
            Ok(None)
        }
    }

    fn make_session(mock: tokio_test::io::Mock) -> (Session<tokio_test::io::Mock>, Arc<RecordingBackend>) {
        let backend = Arc::new(RecordingBackend::default());
        let session = Session::new(mock, SessionConfig::default(), backend.clone());
        (session, backend)
    }

    #[tokio::test(start_paused = true)]
    async fn test_records_are_dispatched_until_server_closes() {
        // Arrange
        let mock = Builder::new()
            .read(b"K65,1|\0M1,1,100.0,200.0,800.0,600.0|")
            .read(b"K65,0|")
            .build();
        let (session, backend) = make_session(mock);

        // Act
        let result = session.run().await;

        // Assert
        assert_eq!(result, Err(SessionError::Disconnected));
        assert_eq!(*backend.keys.lock().unwrap(), vec![(65, true), (65, false)]);
        assert_eq!(*backend.moves.lock().unwrap(), vec![(100.0, 200.0)]);
        assert_eq!(*backend.buttons.lock().unwrap(), vec![(true, true)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_record_split_across_reads_is_reassembled() {
        let mock = Builder::new().read(b"K6").read(b"5,").read(b"1|").build();
        let (session, backend) = make_session(mock);

        let _ = session.run().await;

        assert_eq!(*backend.keys.lock().unwrap(), vec![(65, true)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_record_is_dropped_and_session_continues() {
        let mock = Builder::new().read(b"M1,1,abc|K5,1|").build();
        let (session, backend) = make_session(mock);

        let result = session.run().await;

        assert_eq!(result, Err(SessionError::Disconnected));
        assert_eq!(*backend.keys.lock().unwrap(), vec![(5, true)]);
        assert!(backend.moves.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pings_alone_keep_session_alive() {
        // Arrange: a ping every 2 s for 30 s, three times the liveness timeout
        let mut builder = Builder::new();
        for _ in 0..15 {
            builder.wait(Duration::from_secs(2)).read(&[0]);
        }
        let (session, backend) = make_session(builder.build());

        // Act
        let result = session.run().await;

        // Assert: ended by EOF, not by the liveness monitor
        assert_eq!(result, Err(SessionError::Disconnected));
        assert!(backend.keys.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_silence_ends_session_with_liveness_timeout() {
        // Arrange
        let mock = Builder::new().read(b"K1,1|").wait(Duration::from_secs(60)).build();
        let (session, _backend) = make_session(mock);
        let state = session.state();
        let started = tokio::time::Instant::now();

        // Act
        let result = session.run().await;

        // Assert
        assert!(matches!(result, Err(SessionError::LivenessTimeout { .. })));
        let elapsed = started.elapsed();
        assert!(elapsed > Duration::from_secs(10));
        assert!(elapsed <= Duration::from_secs(13), "loop noticed within a poll interval");
        // The monitor and tracker tasks have exited and released their handles.
        assert_eq!(Arc::strong_count(&state), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_read_error_is_retried() {
        let mock = Builder::new()
            .read_error(io::Error::new(io::ErrorKind::Interrupted, "interrupted"))
            .read(b"K7,1|")
            .build();
        let (session, backend) = make_session(mock);

        let result = session.run().await;

        assert_eq!(result, Err(SessionError::Disconnected));
        assert_eq!(*backend.keys.lock().unwrap(), vec![(7, true)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fatal_read_error_ends_session() {
        let mock = Builder::new()
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let (session, _backend) = make_session(mock);

        let result = session.run().await;

        assert!(matches!(
            result,
            Err(SessionError::ReadFailed { kind: io::ErrorKind::ConnectionReset, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_returns_ok() {
        // Arrange
        let mock = Builder::new().wait(Duration::from_secs(5)).build();
        let (session, _backend) = make_session(mock);
        let state = session.state();
        let handle = tokio::spawn(session.run());

        // Act
        tokio::time::sleep(Duration::from_secs(1)).await;
        state.shutdown();

        // Assert
        assert_eq!(handle.await.expect("session panicked"), Ok(()));
        assert_eq!(state.termination_reason(), Some(SessionError::Shutdown));
    }

    #[test]
    fn test_is_transient_classification() {
        assert!(is_transient(&io::Error::from(io::ErrorKind::WouldBlock)));
        assert!(is_transient(&io::Error::from(io::ErrorKind::TimedOut)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::ConnectionAborted)));
    }
}
