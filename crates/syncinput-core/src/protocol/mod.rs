//! Protocol module containing the event types, the record codec, and the
//! frame splitter.

pub mod codec;
pub mod events;
pub mod frame;

pub use codec::{decode_record, encode_event, DecodeError};
pub use events::*;
pub use frame::{Frame, FrameSplitter, MAX_RECORD_LEN, PING_BYTE, RECORD_DELIMITER};
