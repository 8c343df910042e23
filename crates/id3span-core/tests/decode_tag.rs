use std::io::Cursor;

use id3span_core::{
    LogicalKey, TagError, TagValue, decode_bytes, decode_stream, encode_synchsafe_u28,
    insert_unsynchronization,
};

fn v3_frame(key: &str, payload: &[u8]) -> Vec<u8> {
    let mut bytes = key.as_bytes().to_vec();
    bytes.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    bytes.extend_from_slice(&[0, 0]);
    bytes.extend_from_slice(payload);
    bytes
}

fn v4_frame(key: &str, payload: &[u8]) -> Vec<u8> {
    let mut bytes = key.as_bytes().to_vec();
    bytes.extend_from_slice(&encode_synchsafe_u28(payload.len() as u32).unwrap());
    bytes.extend_from_slice(&[0, 0]);
    bytes.extend_from_slice(payload);
    bytes
}

fn tag(version: u8, flags: u8, body: &[u8]) -> Vec<u8> {
    let mut bytes = b"ID3".to_vec();
    bytes.push(version);
    bytes.push(0);
    bytes.push(flags);
    bytes.extend_from_slice(&encode_synchsafe_u28(body.len() as u32).unwrap());
    bytes.extend_from_slice(body);
    bytes
}

fn text(value: Option<TagValue>) -> String {
    match value {
        Some(TagValue::Text(text)) => text,
        other => panic!("expected text value, got {other:?}"),
    }
}

#[test]
fn v3_tag_with_common_frames() {
    let mut body = Vec::new();
    body.extend_from_slice(&v3_frame("TIT2", b"\x00Title\x00"));
    body.extend_from_slice(&v3_frame("TPE1", b"\x00Artist\x00"));
    body.extend_from_slice(&v3_frame("TALB", b"\x00Album\x00"));
    body.extend_from_slice(&v3_frame("TYER", b"\x001999\x00"));
    body.extend_from_slice(&v3_frame("TRCK", b"\x007/12\x00"));
    body.extend_from_slice(&[0u8; 64]); // padding

    let decoded = decode_bytes(&tag(3, 0, &body)).unwrap();
    assert_eq!(text(decoded.get(LogicalKey::Title)), "Title");
    assert_eq!(text(decoded.get(LogicalKey::Artist)), "Artist");
    assert_eq!(text(decoded.get(LogicalKey::Album)), "Album");
    assert_eq!(text(decoded.get(LogicalKey::Year)), "1999");
    assert_eq!(text(decoded.get(LogicalKey::Track)), "7/12");
    assert_eq!(decoded.get(LogicalKey::Comment), None);
    assert_eq!(decoded.frames().len(), 5);
}

#[test]
fn v4_tag_maps_year_to_recording_time() {
    let mut body = Vec::new();
    body.extend_from_slice(&v4_frame("TDRC", b"\x002004-06-01\x00"));
    let decoded = decode_bytes(&tag(4, 0, &body)).unwrap();
    assert_eq!(decoded.version(), 4);
    assert_eq!(text(decoded.get(LogicalKey::Year)), "2004-06-01");
}

#[test]
fn v2_tag_uses_short_keys() {
    let mut body = Vec::new();
    for (key, payload) in [("TT2", &b"\x00Song"[..]), ("TP1", &b"\x00Band"[..])] {
        body.extend_from_slice(key.as_bytes());
        body.extend_from_slice(&[0, 0, payload.len() as u8]);
        body.extend_from_slice(payload);
    }
    let decoded = decode_bytes(&tag(2, 0, &body)).unwrap();
    assert_eq!(text(decoded.get(LogicalKey::Title)), "Song");
    assert_eq!(text(decoded.get(LogicalKey::Artist)), "Band");
}

#[test]
fn utf16_text_decodes_with_bom() {
    let mut payload = vec![0x01, 0xFF, 0xFE];
    for unit in "Björk".encode_utf16() {
        payload.extend_from_slice(&unit.to_le_bytes());
    }
    payload.extend_from_slice(&[0x00, 0x00]);
    let decoded = decode_bytes(&tag(3, 0, &v3_frame("TPE1", &payload))).unwrap();
    assert_eq!(text(decoded.get(LogicalKey::Artist)), "Björk");
}

#[test]
fn globally_unsynchronized_tag_round_trips() {
    // Frame bytes full of FF values that the writer had to stuff.
    let payload = [0x00, 0xFF, 0xFB, 0x90, 0xFF];
    let frame = v3_frame("TIT2", &payload);
    let stuffed = insert_unsynchronization(&frame);
    assert_ne!(stuffed.len(), frame.len());

    let decoded = decode_bytes(&tag(3, 0x80, &stuffed)).unwrap();
    assert_eq!(decoded.frames()[0].payload, payload);
}

#[test]
fn decode_from_reader_matches_slice_decode() {
    let body = v3_frame("TPE1", b"\x00Stream\x00");
    let bytes = tag(3, 0, &body);
    let from_stream = decode_stream(Cursor::new(bytes.clone())).unwrap();
    let from_slice = decode_bytes(&bytes).unwrap();
    assert_eq!(
        from_stream.get(LogicalKey::Artist),
        from_slice.get(LogicalKey::Artist)
    );
    assert_eq!(from_stream.bytes_to_skip(), from_slice.bytes_to_skip());
}

#[test]
fn non_tag_stream_consumes_at_most_three_bytes() {
    let err = decode_bytes(&[0xFF, 0xFB, 0x90, 0x00, 0x00]).unwrap_err();
    match err {
        TagError::NotATag { .. } => assert!(err.consumed_bytes() <= 3),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn empty_stream_is_not_a_tag() {
    let err = decode_bytes(&[]).unwrap_err();
    assert!(matches!(err, TagError::NotATag { .. }));
}

#[test]
fn unsupported_revision_reports_consumed_bytes() {
    let mut bytes = b"ID3".to_vec();
    bytes.extend_from_slice(&[9, 0, 0, 0, 0, 0, 0]);
    let err = decode_bytes(&bytes).unwrap_err();
    match err {
        TagError::UnsupportedVersion { version, .. } => {
            assert_eq!(version, 9);
            assert_eq!(err.consumed_bytes(), 5);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn oversized_frame_does_not_poison_earlier_frames() {
    let mut body = v3_frame("TPE1", b"\x00Kept\x00");
    // A frame claiming 2 MB of payload it does not have.
    body.extend_from_slice(b"TIT2");
    body.extend_from_slice(&2_000_000u32.to_be_bytes());
    body.extend_from_slice(&[0, 0]);
    body.extend_from_slice(&v3_frame("TALB", b"\x00Lost\x00"));

    let decoded = decode_bytes(&tag(3, 0, &body)).unwrap();
    assert_eq!(text(decoded.get(LogicalKey::Artist)), "Kept");
    // Iteration stopped at the damaged frame.
    assert_eq!(decoded.get(LogicalKey::Album), None);
}

#[test]
fn summary_reflects_decode_diagnostics() {
    let mut body = v3_frame("TPE1", b"\x00Artist\x00");
    body.extend_from_slice(&v3_frame("TIT2", b"\x00Title\x00"));
    let bytes = tag(3, 0, &body);
    let summary = decode_bytes(&bytes).unwrap().summary();
    assert_eq!(summary.version, 3);
    assert_eq!(summary.bytes_to_skip, bytes.len() as u64);
    assert_eq!(summary.skipped_bytes, 0);
    assert!(!summary.crc_mismatch);
    let ids: Vec<&str> = summary.frames.iter().map(|f| f.id.as_str()).collect();
    assert_eq!(ids, ["TPE1", "TIT2"]);
}
