//! Integration tests for the frame splitter and record codec working together.
//!
//! The transport delivers bytes in arbitrary chunks.  These tests feed the
//! same stream through the public API split at every possible position (and
//! every pair of positions) and check that the decoded events never depend on
//! where the chunk boundaries fell.

use syncinput_core::{
    decode_record, encode_event, DecodeError, Frame, FrameSplitter, InputEvent, KeyEvent,
    PointerAction, PointerEvent,
};

/// Outcome of one frame, as the session engine sees it.
#[derive(Debug, Clone, PartialEq)]
enum Seen {
    Ping,
    Event(InputEvent),
    Dropped(DecodeError),
}

fn feed(splitter: &mut FrameSplitter, chunk: &[u8], out: &mut Vec<Seen>) {
    for frame in splitter.push(chunk) {
        out.push(match frame {
            Frame::Ping => Seen::Ping,
            Frame::Record(record) => match decode_record(&record) {
                Ok(event) => Seen::Event(event),
                Err(e) => Seen::Dropped(e),
            },
        });
    }
}

fn parse_chunks(chunks: &[&[u8]]) -> Vec<Seen> {
    let mut splitter = FrameSplitter::new();
    let mut out = Vec::new();
    for chunk in chunks {
        feed(&mut splitter, chunk, &mut out);
    }
    out
}

/// A stream mixing keys, pointer records, pings and one malformed record.
fn sample_stream() -> Vec<u8> {
    let mut stream = Vec::new();
    stream.extend_from_slice(b"K65,1|\0");
    stream.extend_from_slice(b"M1,1,100.000000,200.000000,800.000000,600.000000|");
    stream.push(0);
    stream.extend_from_slice(b"M1,1,abc|");
    stream.extend_from_slice(b"M0,2,5,6,800,600|K65,0|");
    stream.push(0);
    stream
}

#[test]
fn test_whole_stream_decodes_expected_sequence() {
    let seen = parse_chunks(&[&sample_stream()]);

    let events: Vec<&InputEvent> = seen
        .iter()
        .filter_map(|s| match s {
            Seen::Event(e) => Some(e),
            _ => None,
        })
        .collect();
    assert_eq!(events.len(), 4);
    assert_eq!(*events[0], InputEvent::Key(KeyEvent { code: 65, pressed: true }));
    assert_eq!(*events[3], InputEvent::Key(KeyEvent { code: 65, pressed: false }));

    let pings = seen.iter().filter(|s| **s == Seen::Ping).count();
    assert_eq!(pings, 3);

    let dropped = seen.iter().filter(|s| matches!(s, Seen::Dropped(_))).count();
    assert_eq!(dropped, 1, "only the malformed record is dropped");
}

#[test]
fn test_every_two_way_split_matches_unsplit_parse() {
    let stream = sample_stream();
    let expected = parse_chunks(&[&stream]);

    for at in 0..=stream.len() {
        let (a, b) = stream.split_at(at);
        assert_eq!(parse_chunks(&[a, b]), expected, "split at {at}");
    }
}

#[test]
fn test_every_three_way_split_matches_unsplit_parse() {
    let stream = sample_stream();
    let expected = parse_chunks(&[&stream]);

    for i in 0..=stream.len() {
        for j in i..=stream.len() {
            let chunks = [&stream[..i], &stream[i..j], &stream[j..]];
            assert_eq!(parse_chunks(&chunks), expected, "split at {i}/{j}");
        }
    }
}

#[test]
fn test_byte_at_a_time_matches_unsplit_parse() {
    let stream = sample_stream();
    let expected = parse_chunks(&[&stream]);

    let chunks: Vec<&[u8]> = stream.chunks(1).collect();
    assert_eq!(parse_chunks(&chunks), expected);
}

#[test]
fn test_malformed_record_does_not_affect_following_records() {
    let seen = parse_chunks(&[b"M1,1,abc|K5,1|K5,0|"]);

    assert!(matches!(seen[0], Seen::Dropped(_)));
    assert_eq!(seen[1], Seen::Event(InputEvent::Key(KeyEvent { code: 5, pressed: true })));
    assert_eq!(seen[2], Seen::Event(InputEvent::Key(KeyEvent { code: 5, pressed: false })));
}

#[test]
fn test_lone_zero_byte_never_yields_an_event() {
    let seen = parse_chunks(&[&[0u8]]);
    assert_eq!(seen, vec![Seen::Ping]);
}

#[test]
fn test_encoded_events_survive_arbitrary_chunking() {
    // Arrange: a server-side encoding of a short drag gesture
    let gesture = [
        PointerAction::Press,
        PointerAction::Move,
        PointerAction::Move,
        PointerAction::Release,
    ];
    let events: Vec<InputEvent> = gesture
        .iter()
        .enumerate()
        .map(|(i, &action)| {
            InputEvent::Pointer(PointerEvent {
                primary: true,
                action,
                x: 10.0 + i as f32 * 7.5,
                y: 20.0,
                ref_width: 800.0,
                ref_height: 600.0,
            })
        })
        .collect();
    let stream: Vec<u8> = events.iter().flat_map(|e| encode_event(e).into_bytes()).collect();

    // Act: deliver in awkward 5-byte chunks
    let chunks: Vec<&[u8]> = stream.chunks(5).collect();
    let seen = parse_chunks(&chunks);

    // Assert
    let expected: Vec<Seen> = events.into_iter().map(Seen::Event).collect();
    assert_eq!(seen, expected);
}
