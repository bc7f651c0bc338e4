//! Text codec for syncinput wire records.
//!
//! Record grammar (one record, delimiter already stripped):
//! ```text
//! K<code>,<state>                      state: 0 = released, 1 = pressed
//! M<isLeft>,<state>,<x>,<y>,<w>,<h>    state: 0 = move, 1 = pressed, 2 = released
//! ```
//! Fields are comma-separated decimals in fixed order.  Coordinates may be
//! written as integers or floats (`100`, `100.0`, `100.000000`).

use crate::protocol::events::{
    InputEvent, KeyEvent, PointerAction, PointerEvent, KEY_DOWN, KEY_TAG, KEY_UP, POINTER_TAG,
};
use crate::protocol::frame::RECORD_DELIMITER;
use thiserror::Error;

/// Errors produced while decoding a single record.
///
/// A decode error only ever affects the record it came from; the session
/// logs it and moves on to the next record.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    /// The record contained no characters (e.g. `||` on the wire).
    #[error("empty record")]
    Empty,

    /// The record is not valid UTF-8 (the protocol is ASCII only).
    #[error("record is not valid ASCII/UTF-8")]
    NotUtf8,

    /// The leading tag is neither `K` nor `M`.
    #[error("unknown record tag {0:?}")]
    UnknownTag(char),

    /// The record has the wrong number of comma-separated fields.
    #[error("{kind} record needs {expected} fields, got {found}")]
    FieldCount {
        kind: &'static str,
        expected: usize,
        found: usize,
    },

    /// A field could not be parsed as the number it is supposed to be.
    #[error("invalid {field} field: {value:?}")]
    InvalidField { field: &'static str, value: String },

    /// The key state was not `0` or `1`.
    #[error("invalid key state {0}")]
    InvalidKeyState(u8),

    /// The pointer state was not `0`, `1` or `2`.
    #[error("invalid pointer state {0}")]
    InvalidPointerState(u8),
}

const KEY_FIELDS: usize = 2;
const POINTER_FIELDS: usize = 6;

// ── Public API ────────────────────────────────────────────────────────────────

/// Decodes one record (without its trailing `|`) into an [`InputEvent`].
///
/// Surrounding ASCII whitespace is ignored.
///
/// # Errors
///
/// Returns [`DecodeError`] for empty records, unknown tags, wrong field
/// counts, non-numeric fields and out-of-range state values.
///
/// # Examples
///
/// ```rust
/// use syncinput_core::{decode_record, InputEvent, KeyEvent};
///
/// let event = decode_record(b"K5,1").unwrap();
/// assert_eq!(event, InputEvent::Key(KeyEvent { code: 5, pressed: true }));
/// assert!(decode_record(b"K5,2").is_err());
/// ```
pub fn decode_record(record: &[u8]) -> Result<InputEvent, DecodeError> {
    let text = std::str::from_utf8(record).map_err(|_| DecodeError::NotUtf8)?;
    let text = text.trim_matches(|c: char| c.is_ascii_whitespace());

    let mut chars = text.chars();
    let tag = chars.next().ok_or(DecodeError::Empty)?;
    let body = chars.as_str();

    match tag {
        KEY_TAG => decode_key(body).map(InputEvent::Key),
        POINTER_TAG => decode_pointer(body).map(InputEvent::Pointer),
        other => Err(DecodeError::UnknownTag(other)),
    }
}

/// Encodes an event as a complete wire record, including the trailing `|`.
///
/// This is the server-side half of the codec; the client only decodes, but
/// test harnesses and benchmarks use it to play the server's role.
pub fn encode_event(event: &InputEvent) -> String {
    let delimiter = RECORD_DELIMITER as char;
    match event {
        InputEvent::Key(k) => format!("{KEY_TAG}{},{}{delimiter}", k.code, u8::from(k.pressed)),
        InputEvent::Pointer(p) => format!(
            "{POINTER_TAG}{},{},{},{},{},{}{delimiter}",
            u8::from(p.primary),
            p.action as u8,
            p.x,
            p.y,
            p.ref_width,
            p.ref_height
        ),
    }
}

// ── Record bodies ─────────────────────────────────────────────────────────────

fn decode_key(body: &str) -> Result<KeyEvent, DecodeError> {
    let [code, state] = split_fields::<KEY_FIELDS>(body, "key")?;

    let code = parse_u32(code, "key code")?;
    let pressed = match parse_u8(state, "key state")? {
        KEY_DOWN => true,
        KEY_UP => false,
        other => return Err(DecodeError::InvalidKeyState(other)),
    };

    Ok(KeyEvent { code, pressed })
}

fn decode_pointer(body: &str) -> Result<PointerEvent, DecodeError> {
    let [is_left, state, x, y, w, h] = split_fields::<POINTER_FIELDS>(body, "pointer")?;

    let primary = parse_u8(is_left, "pointer button")? != 0;
    let state = parse_u8(state, "pointer state")?;
    let action = PointerAction::try_from(state).map_err(|_| DecodeError::InvalidPointerState(state))?;

    Ok(PointerEvent {
        primary,
        action,
        x: parse_coord(x, "x")?,
        y: parse_coord(y, "y")?,
        ref_width: parse_coord(w, "width")?,
        ref_height: parse_coord(h, "height")?,
    })
}

// ── Field helpers ─────────────────────────────────────────────────────────────

fn split_fields<'a, const N: usize>(
    body: &'a str,
    kind: &'static str,
) -> Result<[&'a str; N], DecodeError> {
    let fields: Vec<&str> = body.split(',').map(str::trim).collect();
    if fields.len() != N {
        return Err(DecodeError::FieldCount {
            kind,
            expected: N,
            found: fields.len(),
        });
    }

    let mut out = [""; N];
    for (slot, field) in out.iter_mut().zip(fields) {
        *slot = field;
    }
    Ok(out)
}

fn invalid(field: &'static str, value: &str) -> DecodeError {
    DecodeError::InvalidField {
        field,
        value: value.to_string(),
    }
}

fn parse_u8(value: &str, field: &'static str) -> Result<u8, DecodeError> {
    value.parse().map_err(|_| invalid(field, value))
}

fn parse_u32(value: &str, field: &'static str) -> Result<u32, DecodeError> {
    value.parse().map_err(|_| invalid(field, value))
}

fn parse_coord(value: &str, field: &'static str) -> Result<f32, DecodeError> {
    match value.parse::<f32>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(invalid(field, value)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
