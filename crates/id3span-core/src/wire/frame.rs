use std::collections::HashSet;
use std::io::Read;

use flate2::read::{DeflateDecoder, GzDecoder, ZlibDecoder};

use super::layout;
use super::reader::TagReader;
use super::sync::{decode_synchsafe_u28, remove_unsynchronization};

/// One parsed frame. Immutable once constructed; owned by the tag's frame
/// index.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Wire key: 3 chars for v2, 4 for v3/4.
    pub id: String,
    pub flags: FrameFlags,
    pub group_id: Option<u8>,
    pub encryption_id: Option<u8>,
    /// Length declared on the wire, before optional marker bytes were
    /// subtracted.
    pub declared_len: u32,
    pub uncompressed_len: Option<u32>,
    /// Bytes consumed by resynchronization scanning before this frame was
    /// located.
    pub skipped: u32,
    /// Decompressed if `flags.compressed`.
    pub payload: Vec<u8>,
    header_len: u32,
}

impl Frame {
    /// Total bytes this frame occupied in the tag span, including scan
    /// skips and the frame header. Callers advance past the frame by this
    /// amount regardless of parse outcome.
    pub fn total_span(&self) -> u64 {
        u64::from(self.skipped) + u64::from(self.declared_len) + u64::from(self.header_len)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FrameFlags {
    pub tag_alter_preserved: bool,
    pub file_alter_preserved: bool,
    pub read_only: bool,
    pub compressed: bool,
    pub encrypted: bool,
    pub grouped: bool,
    /// v4 only.
    pub unsynchronized: bool,
    /// v4 only.
    pub has_data_length: bool,
}

/// Per-tag context threaded through frame parsing.
#[derive(Debug, Clone, Copy)]
pub struct FrameContext {
    pub version: u8,
    /// Whether the global unsynchronization transform already ran over the
    /// span; frame-level removal is skipped in that case.
    pub globally_unsynchronized: bool,
}

impl FrameContext {
    pub fn key_len(&self) -> usize {
        if self.version == 2 {
            layout::FRAME_KEY_LEN_V2
        } else {
            layout::FRAME_KEY_LEN_V34
        }
    }

    pub fn header_len(&self) -> usize {
        if self.version == 2 {
            layout::FRAME_HEADER_LEN_V2
        } else {
            layout::FRAME_HEADER_LEN_V34
        }
    }
}

/// Outcome of one frame-parse attempt.
///
/// `Damaged` is terminal for the tag's frame list but not an error: frames
/// parsed before it stay usable. `NeedsTail` asks the orchestrator to pull
/// more bytes from the underlying stream for a boundary-straddling picture.
#[derive(Debug)]
pub enum FrameOutcome {
    Frame(Frame),
    /// Padding reached; no more frames.
    Padding,
    Damaged {
        skipped: u32,
    },
    NeedsTail {
        missing: usize,
    },
}

/// One step of the resynchronization scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanStep {
    Continue,
    FoundValidKey,
    FoundSyncTerminus,
}

/// Wire keys accepted during resynchronization: the version's full key
/// vocabulary seeded up front, plus every key already parsed in this tag.
pub struct KeySet {
    keys: HashSet<String>,
}

impl KeySet {
    pub fn new(seed: &[&str]) -> Self {
        Self {
            keys: seed.iter().map(|k| (*k).to_string()).collect(),
        }
    }

    pub fn insert(&mut self, key: &str) {
        self.keys.insert(key.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    fn contains_prefix(&self, prefix: &str) -> bool {
        self.keys.iter().any(|k| k.starts_with(prefix))
    }
}

/// Parse one frame from the span. The reader is advanced past the frame on
/// every outcome except `NeedsTail`, which expects a retry after the span
/// has been extended.
pub fn parse_frame(
    reader: &mut TagReader<'_>,
    ctx: &FrameContext,
    keys: &KeySet,
) -> FrameOutcome {
    let key_len = ctx.key_len();
    let header_len = ctx.header_len();

    if reader.remaining() < key_len {
        reader.skip_clamped(reader.remaining());
        return FrameOutcome::Padding;
    }
    if reader.peek_bytes(1) == Some([0x00].as_slice()) {
        // Terminus: padding reached. Skip the rest of a frame header's
        // worth of bytes and stop.
        reader.skip_clamped(header_len);
        return FrameOutcome::Padding;
    }

    let (key, skipped) = match locate_key(reader, ctx, keys) {
        KeyScan::Key { key, skipped } => (key, skipped),
        KeyScan::Terminus { skipped } => return FrameOutcome::Damaged { skipped },
    };

    match ctx.version {
        2 => parse_body_v2(reader, key, skipped),
        _ => parse_body_v34(reader, ctx, key, skipped),
    }
}

enum KeyScan {
    Key { key: String, skipped: u32 },
    /// No frame key ahead: MPEG sync pattern seen, scan window exhausted,
    /// or the span ran out.
    Terminus { skipped: u32 },
}

/// Find the next frame key, scanning forward when the bytes at the cursor
/// are not a valid key. The reader ends up just past the key on success;
/// every scanned byte is counted in `skipped`.
fn locate_key(reader: &mut TagReader<'_>, ctx: &FrameContext, keys: &KeySet) -> KeyScan {
    let key_len = ctx.key_len();
    let mut skipped = 0u32;

    loop {
        let step = match reader.peek_bytes(key_len) {
            Some(candidate) => {
                if reader.peek_bytes(4) == Some(&layout::MPEG_SYNC_PROBE[..]) {
                    ScanStep::FoundSyncTerminus
                } else if is_valid_key(candidate, ctx.version)
                    && (skipped == 0 || keys.contains(&key_string(candidate)))
                {
                    ScanStep::FoundValidKey
                } else if skipped == 0
                    && candidate.is_ascii()
                    && keys.contains_prefix(&key_string(&candidate[..2]))
                {
                    // Mangled key whose 2-char prefix matches known
                    // vocabulary: accept it as-is rather than rescan.
                    ScanStep::FoundValidKey
                } else {
                    ScanStep::Continue
                }
            }
            // Not enough bytes left to hold a key.
            None => return KeyScan::Terminus { skipped },
        };

        match step {
            ScanStep::FoundValidKey => match reader.take_bytes(key_len) {
                Some(bytes) => {
                    return KeyScan::Key {
                        key: key_string(bytes),
                        skipped,
                    };
                }
                None => return KeyScan::Terminus { skipped },
            },
            ScanStep::FoundSyncTerminus => return KeyScan::Terminus { skipped },
            ScanStep::Continue => {
                if skipped as usize >= layout::RESYNC_SCAN_WINDOW {
                    return KeyScan::Terminus { skipped };
                }
                if reader.skip(1).is_none() {
                    return KeyScan::Terminus { skipped };
                }
                skipped += 1;
            }
        }
    }
}

fn parse_body_v2(reader: &mut TagReader<'_>, key: String, skipped: u32) -> FrameOutcome {
    let len_bytes = match reader.take_bytes(3) {
        Some(bytes) => bytes,
        None => return damaged(reader, skipped, 0),
    };
    let declared_len =
        (u32::from(len_bytes[0]) << 16) | (u32::from(len_bytes[1]) << 8) | u32::from(len_bytes[2]);
    if declared_len > frame_cap(&key) {
        return damaged(reader, skipped, declared_len);
    }

    let payload_len = declared_len as usize;
    if payload_len > reader.remaining() {
        if is_picture_key(&key) {
            // Same straddle allowance as v3/v4 pictures.
            return FrameOutcome::NeedsTail {
                missing: payload_len - reader.remaining(),
            };
        }
        return damaged(reader, skipped, declared_len);
    }

    let payload = match reader.take_bytes(payload_len) {
        Some(bytes) => bytes.to_vec(),
        None => return damaged(reader, skipped, declared_len),
    };

    FrameOutcome::Frame(Frame {
        id: key,
        flags: FrameFlags::default(),
        group_id: None,
        encryption_id: None,
        declared_len,
        uncompressed_len: None,
        skipped,
        payload,
        header_len: layout::FRAME_HEADER_LEN_V2 as u32,
    })
}

fn parse_body_v34(
    reader: &mut TagReader<'_>,
    ctx: &FrameContext,
    key: String,
    skipped: u32,
) -> FrameOutcome {
    let declared_len = match read_frame_len(reader, ctx.version) {
        Some(len) => len,
        None => return damaged(reader, skipped, 0),
    };
    let flag_bytes: [u8; 2] = match reader.take_array() {
        Some(bytes) => bytes,
        None => return damaged(reader, skipped, declared_len),
    };
    let flags = if ctx.version == 3 {
        decode_flags_v3(flag_bytes)
    } else {
        decode_flags_v4(flag_bytes)
    };

    // Oversized and "negative" (top bit set) lengths are corruption, not
    // hard errors: isolate the frame and stop iterating.
    if declared_len >= 0x8000_0000 || declared_len > frame_cap(&key) {
        return damaged(reader, skipped, declared_len);
    }

    let mut remaining_len = declared_len;
    let mut group_id = None;
    let mut encryption_id = None;
    let mut uncompressed_len = None;

    // Optional sub-fields sit between the flag bytes and the payload, in a
    // version-specific order; each one consumed shrinks the payload.
    let ok = if ctx.version == 3 {
        read_optional_v3(
            reader,
            &flags,
            &mut remaining_len,
            &mut group_id,
            &mut encryption_id,
            &mut uncompressed_len,
        )
    } else {
        read_optional_v4(
            reader,
            &flags,
            &mut remaining_len,
            &mut group_id,
            &mut encryption_id,
            &mut uncompressed_len,
        )
    };
    if !ok {
        return damaged(reader, skipped, remaining_len);
    }
    if let Some(expanded) = uncompressed_len {
        if expanded >= 0x8000_0000 || expanded > frame_cap(&key) {
            return damaged(reader, skipped, remaining_len);
        }
    }

    let payload_len = remaining_len as usize;
    if payload_len > reader.remaining() {
        if is_picture_key(&key) {
            // Pictures are allowed to straddle the declared tag boundary in
            // malformed files; ask the orchestrator for the missing tail.
            return FrameOutcome::NeedsTail {
                missing: payload_len - reader.remaining(),
            };
        }
        return damaged(reader, skipped, remaining_len);
    }

    let mut payload = match reader.take_bytes(payload_len) {
        Some(bytes) => bytes.to_vec(),
        None => return damaged(reader, skipped, remaining_len),
    };

    if flags.unsynchronized && !ctx.globally_unsynchronized {
        payload = remove_unsynchronization(&payload);
    }

    if flags.compressed {
        let expected = uncompressed_len.unwrap_or(frame_cap(&key));
        payload = match inflate(&payload, u64::from(expected)) {
            Some(bytes) => bytes,
            None => return damaged(reader, skipped, 0),
        };
    }

    FrameOutcome::Frame(Frame {
        id: key,
        flags,
        group_id,
        encryption_id,
        declared_len,
        uncompressed_len,
        skipped,
        payload,
        header_len: layout::FRAME_HEADER_LEN_V34 as u32,
    })
}

fn read_frame_len(reader: &mut TagReader<'_>, version: u8) -> Option<u32> {
    if version == 4 {
        decode_synchsafe_u28(reader.take_array()?)
    } else {
        reader.take_u32_be()
    }
}

fn decode_flags_v3(bytes: [u8; 2]) -> FrameFlags {
    FrameFlags {
        tag_alter_preserved: bytes[0] & layout::FRAME_V3_TAG_ALTER != 0,
        file_alter_preserved: bytes[0] & layout::FRAME_V3_FILE_ALTER != 0,
        read_only: bytes[0] & layout::FRAME_V3_READ_ONLY != 0,
        compressed: bytes[1] & layout::FRAME_V3_COMPRESSED != 0,
        encrypted: bytes[1] & layout::FRAME_V3_ENCRYPTED != 0,
        grouped: bytes[1] & layout::FRAME_V3_GROUPED != 0,
        unsynchronized: false,
        has_data_length: false,
    }
}

fn decode_flags_v4(bytes: [u8; 2]) -> FrameFlags {
    FrameFlags {
        tag_alter_preserved: bytes[0] & layout::FRAME_V4_TAG_ALTER != 0,
        file_alter_preserved: bytes[0] & layout::FRAME_V4_FILE_ALTER != 0,
        read_only: bytes[0] & layout::FRAME_V4_READ_ONLY != 0,
        compressed: bytes[1] & layout::FRAME_V4_COMPRESSED != 0,
        encrypted: bytes[1] & layout::FRAME_V4_ENCRYPTED != 0,
        grouped: bytes[1] & layout::FRAME_V4_GROUPED != 0,
        unsynchronized: bytes[1] & layout::FRAME_V4_UNSYNC != 0,
        has_data_length: bytes[1] & layout::FRAME_V4_DATA_LENGTH != 0,
    }
}

fn read_optional_v3(
    reader: &mut TagReader<'_>,
    flags: &FrameFlags,
    remaining_len: &mut u32,
    group_id: &mut Option<u8>,
    encryption_id: &mut Option<u8>,
    uncompressed_len: &mut Option<u32>,
) -> bool {
    if flags.compressed {
        let Some(len) = reader.take_u32_be() else {
            return false;
        };
        *uncompressed_len = Some(len);
        if !consume(remaining_len, 4) {
            return false;
        }
    }
    if flags.encrypted {
        let Some(id) = reader.take_u8() else {
            return false;
        };
        *encryption_id = Some(id);
        if !consume(remaining_len, 1) {
            return false;
        }
    }
    if flags.grouped {
        let Some(id) = reader.take_u8() else {
            return false;
        };
        *group_id = Some(id);
        if !consume(remaining_len, 1) {
            return false;
        }
    }
    true
}

fn read_optional_v4(
    reader: &mut TagReader<'_>,
    flags: &FrameFlags,
    remaining_len: &mut u32,
    group_id: &mut Option<u8>,
    encryption_id: &mut Option<u8>,
    uncompressed_len: &mut Option<u32>,
) -> bool {
    if flags.grouped {
        let Some(id) = reader.take_u8() else {
            return false;
        };
        *group_id = Some(id);
        if !consume(remaining_len, 1) {
            return false;
        }
    }
    if flags.compressed {
        let Some(bytes) = reader.take_array() else {
            return false;
        };
        let Some(len) = decode_synchsafe_u28(bytes) else {
            return false;
        };
        *uncompressed_len = Some(len);
        if !consume(remaining_len, 4) {
            return false;
        }
    }
    if flags.encrypted {
        let Some(id) = reader.take_u8() else {
            return false;
        };
        *encryption_id = Some(id);
        if !consume(remaining_len, 1) {
            return false;
        }
    }
    if flags.has_data_length {
        let Some(bytes) = reader.take_array() else {
            return false;
        };
        let Some(len) = decode_synchsafe_u28(bytes) else {
            return false;
        };
        if uncompressed_len.is_none() {
            *uncompressed_len = Some(len);
        }
        if !consume(remaining_len, 4) {
            return false;
        }
    }
    true
}

fn consume(remaining_len: &mut u32, amount: u32) -> bool {
    match remaining_len.checked_sub(amount) {
        Some(rest) => {
            *remaining_len = rest;
            true
        }
        None => false,
    }
}

fn damaged(reader: &mut TagReader<'_>, skipped: u32, declared_len: u32) -> FrameOutcome {
    // Advance past whatever the frame claimed to occupy so outer byte
    // accounting stays consistent.
    reader.skip_clamped(declared_len as usize);
    FrameOutcome::Damaged { skipped }
}

fn is_valid_key(bytes: &[u8], version: u8) -> bool {
    if version == 2 {
        bytes.len() == layout::FRAME_KEY_LEN_V2
            && bytes[0].is_ascii_uppercase()
            && bytes[1..]
                .iter()
                .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
    } else {
        bytes.len() == layout::FRAME_KEY_LEN_V34
            && bytes[..3].iter().all(u8::is_ascii_uppercase)
            && (bytes[3].is_ascii_uppercase() || (b'0'..=b'4').contains(&bytes[3]))
    }
}

fn key_string(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn is_picture_key(key: &str) -> bool {
    key == "APIC" || key == "PIC"
}

fn frame_cap(key: &str) -> u32 {
    if is_picture_key(key) {
        layout::MAX_PICTURE_FRAME_LEN
    } else {
        layout::MAX_OTHER_FRAME_LEN
    }
}

/// Decompress a frame payload: zlib stream first, then raw deflate, then
/// gzip. Output is bounded by the declared uncompressed length.
fn inflate(data: &[u8], limit: u64) -> Option<Vec<u8>> {
    let mut out = Vec::new();
    if ZlibDecoder::new(data).take(limit).read_to_end(&mut out).is_ok() {
        return Some(out);
    }
    out.clear();
    if DeflateDecoder::new(data)
        .take(limit)
        .read_to_end(&mut out)
        .is_ok()
    {
        return Some(out);
    }
    out.clear();
    if GzDecoder::new(data).take(limit).read_to_end(&mut out).is_ok() {
        return Some(out);
    }
    None
}
