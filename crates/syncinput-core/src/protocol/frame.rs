//! Splits the inbound byte stream into wire frames.
//!
//! The transport gives no guarantee that read boundaries line up with record
//! boundaries: one read may hold several records, half a record, or a record
//! plus the start of the next one.  [`FrameSplitter`] keeps the unterminated
//! tail between reads so that the sequence of frames it yields depends only on
//! the concatenated bytes, never on how they were chunked.
//!
//! ```text
//! read 1: "K65,1|M1,1,10"        -> Record("K65,1")          pending "M1,1,10"
//! read 2: ",20,800,600|\0"       -> Record("M1,1,10,20,800,600"), Ping
//! ```
//!
//! # Pings
//!
//! The server sends a single zero byte every couple of seconds as a liveness
//! ping, and some servers send one straight after each record.  A zero byte
//! is never part of an ASCII record, so every zero byte is reported as
//! [`Frame::Ping`] wherever it appears and is removed from the record stream.

use tracing::warn;

/// Byte that terminates every record on the wire.
pub const RECORD_DELIMITER: u8 = b'|';

/// Liveness ping byte.
pub const PING_BYTE: u8 = 0x00;

/// Longest record the splitter will buffer before giving up on it.
///
/// Real records are well under 64 bytes; anything this long means the
/// stream is not speaking the protocol.
pub const MAX_RECORD_LEN: usize = 1024;

/// One unit of the wire protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A liveness ping; carries no event.
    Ping,
    /// One complete record with its delimiter stripped.  May be empty.
    Record(Vec<u8>),
}

/// Stateful splitter turning arbitrary read chunks into [`Frame`]s.
#[derive(Debug, Default)]
pub struct FrameSplitter {
    /// Bytes of the record currently being assembled.
    pending: Vec<u8>,
    /// Set while discarding an oversize record up to its delimiter.
    skipping: bool,
}

impl FrameSplitter {
    /// Creates a splitter with an empty pending buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the bytes of one read and returns the frames they complete.
    ///
    /// Frames are returned in stream order.  Bytes after the last delimiter
    /// are kept and prepended to the next call.  An empty slice yields no
    /// frames; detecting a closed connection is the caller's job.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();

        for &byte in bytes {
            match byte {
                PING_BYTE => frames.push(Frame::Ping),
                RECORD_DELIMITER => {
                    if self.skipping {
                        self.skipping = false;
                    } else {
                        frames.push(Frame::Record(std::mem::take(&mut self.pending)));
                    }
                }
                _ if self.skipping => {}
                _ => {
                    if self.pending.len() >= MAX_RECORD_LEN {
                        warn!(
                            "discarding record longer than {MAX_RECORD_LEN} bytes without a delimiter"
                        );
                        self.pending.clear();
                        self.skipping = true;
                    } else {
                        self.pending.push(byte);
                    }
                }
            }
        }

        frames
    }

    /// Number of bytes buffered for the next, not yet terminated, record.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
