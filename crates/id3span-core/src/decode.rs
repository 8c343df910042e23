//! Tag decoding orchestration: header, span read, global transforms, frame
//! loop, and the key/value lookup surface.
//!
//! All stream I/O happens here; the wire parsers below operate on in-memory
//! spans only.

use std::borrow::Cow;
use std::io::{ErrorKind, Read};

use crate::fields::{self, FieldKind, FieldReader, LogicalKey};
use crate::genre::genre_name;
use crate::text::Encoding;
use crate::wire::error::TagError;
use crate::wire::frame::{Frame, FrameContext, FrameOutcome, KeySet, parse_frame};
use crate::wire::header::{TagHeader, check_effective_size, parse_extended_header, parse_header};
use crate::wire::layout;
use crate::wire::reader::TagReader;
use crate::wire::sync::remove_unsynchronization;

use crate::{Comment, FrameSummary, Picture, TagSummary, TagValue};

/// A fully decoded tag: immutable frame index plus decode diagnostics.
#[derive(Debug)]
pub struct DecodedTag {
    header: TagHeader,
    frames: Vec<Frame>,
    crc_mismatch: bool,
    skipped: u32,
}

/// Decode a tag from a byte source positioned at the presumed tag start.
pub fn decode_stream<R: Read>(mut source: R) -> Result<DecodedTag, TagError> {
    let mut head = [0u8; layout::TAG_HEADER_LEN];
    let filled = read_fully(&mut source, &mut head)?;
    let mut reader = TagReader::new(&head[..filled]);
    let mut header = parse_header(&mut reader)?;

    // The span buffer grows with what the stream actually yields, so a
    // hostile declared size does not cost a huge allocation up front.
    let mut span = Vec::new();
    source
        .by_ref()
        .take(u64::from(header.tag_size))
        .read_to_end(&mut span)?;
    let raw = if header.unsynchronized {
        let raw = std::mem::take(&mut span);
        span = remove_unsynchronization(&raw);
        Some(raw)
    } else {
        None
    };

    let mut pos = 0usize;
    let mut crc_mismatch = false;
    if header.has_extended_header {
        let mut ext_reader = TagReader::new(&span);
        let ext = parse_extended_header(&mut ext_reader, header.version).map_err(|err| {
            offset_consumed(err, layout::TAG_HEADER_LEN)
        })?;
        pos = (ext.size as usize)
            .max(ext_reader.position())
            .min(span.len());
        if let Some(declared) = ext.crc {
            let computed = if header.version == 3 {
                crc32fast::hash(&v3_crc_window(&span, raw.as_deref(), pos, ext.padding))
            } else {
                crc32fast::hash(&span[pos..])
            };
            // A mismatch is reported, not fatal: plenty of third-party
            // encoders get the CRC subtly wrong.
            crc_mismatch = u64::from(computed) != declared;
        }
        header.extended = Some(ext);
    }
    check_effective_size(&header, layout::TAG_HEADER_LEN + pos)?;

    let ctx = FrameContext {
        version: header.version,
        globally_unsynchronized: header.unsynchronized,
    };
    let mut keys = KeySet::new(&fields::wire_keys(header.version));
    let mut frames: Vec<Frame> = Vec::new();
    let mut skipped = header.scanned_bytes;
    let mut parsed_any = false;

    while pos < span.len() {
        let mut frame_reader = TagReader::new(&span[pos..]);
        match parse_frame(&mut frame_reader, &ctx, &keys) {
            FrameOutcome::Frame(frame) => {
                pos += frame_reader.position();
                skipped += frame.skipped;
                // First occurrence wins; later duplicates are dropped.
                if !frames.iter().any(|f| f.id == frame.id) {
                    keys.insert(&frame.id);
                    frames.push(frame);
                }
                parsed_any = true;
            }
            FrameOutcome::Padding => {
                pos += frame_reader.position();
                break;
            }
            FrameOutcome::Damaged { skipped: scanned } => {
                skipped += scanned;
                if !parsed_any {
                    // Nothing recoverable in this tag at all.
                    return Err(TagError::FrameDamaged {
                        consumed: layout::TAG_HEADER_LEN + pos,
                    });
                }
                break;
            }
            FrameOutcome::NeedsTail { missing } => {
                // A picture straddling the declared tag boundary: pull the
                // remainder directly from the stream and retry.
                let mut tail = vec![0u8; missing];
                let extra = read_fully(&mut source, &mut tail)?;
                if extra == 0 {
                    if !parsed_any {
                        return Err(TagError::FrameDamaged {
                            consumed: layout::TAG_HEADER_LEN + pos,
                        });
                    }
                    break;
                }
                tail.truncate(extra);
                if header.unsynchronized {
                    tail = remove_unsynchronization(&tail);
                }
                span.extend_from_slice(&tail);
            }
        }
    }

    Ok(DecodedTag {
        header,
        frames,
        crc_mismatch,
        skipped,
    })
}

/// Decode a tag from an in-memory buffer.
pub fn decode_bytes(bytes: &[u8]) -> Result<DecodedTag, TagError> {
    decode_stream(bytes)
}

impl DecodedTag {
    pub fn version(&self) -> u8 {
        self.header.version
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Total bytes the host should skip to reach the first byte of audio
    /// data: header, declared tag span, and the footer when present.
    pub fn bytes_to_skip(&self) -> u64 {
        let footer = if self.header.has_footer {
            layout::TAG_FOOTER_LEN as u64
        } else {
            0
        };
        layout::TAG_HEADER_LEN as u64 + u64::from(self.header.tag_size) + footer
    }

    /// Bytes that were unusable and skipped over during decoding (header
    /// scanning plus frame resynchronization). Hosts use this to adjust
    /// byte-position-to-playback-time math.
    pub fn skipped_bytes(&self) -> u32 {
        self.skipped
    }

    /// Whether the extended-header CRC failed to verify. Non-fatal.
    pub fn crc_mismatch(&self) -> bool {
        self.crc_mismatch
    }

    /// Look up a logical key and extract its value through the key's field
    /// shape. Absent keys are `None`, not an error.
    pub fn get(&self, key: LogicalKey) -> Option<TagValue> {
        let wire = fields::wire_key(key, self.header.version);
        let frame = self.frames.iter().find(|f| f.id == wire)?;
        let extracted = extract_fields(key, self.header.version, &frame.payload);
        Some(assemble_value(key, extracted))
    }

    pub fn summary(&self) -> TagSummary {
        TagSummary {
            version: self.header.version,
            declared_size: self.header.tag_size,
            bytes_to_skip: self.bytes_to_skip(),
            skipped_bytes: self.skipped,
            crc_mismatch: self.crc_mismatch,
            frames: self
                .frames
                .iter()
                .map(|frame| FrameSummary {
                    id: frame.id.clone(),
                    len: frame.payload.len() as u64,
                    compressed: frame.flags.compressed,
                    group_id: frame.group_id,
                    encryption_id: frame.encryption_id,
                })
                .collect(),
        }
    }
}

#[derive(Default)]
struct ExtractedFields {
    language: String,
    media_type: String,
    picture_type: u8,
    description: String,
    content: String,
    data: Vec<u8>,
}

fn extract_fields(key: LogicalKey, version: u8, payload: &[u8]) -> ExtractedFields {
    let mut reader = FieldReader::new(payload, fields::has_encoding_byte(key));
    let mut out = ExtractedFields::default();
    for spec in fields::field_shape(key, version) {
        match spec.kind {
            FieldKind::EncodedText => {
                let text = reader.read_text();
                match spec.role {
                    fields::FieldRole::Description => out.description = text,
                    _ => out.content = text,
                }
            }
            FieldKind::Latin1Text => {
                out.media_type = reader.read_text_as(Encoding::Latin1);
            }
            FieldKind::FixedBinary(n) => {
                let bytes = reader.read_binary(Some(n));
                match spec.role {
                    fields::FieldRole::Language => {
                        out.language = String::from_utf8_lossy(&bytes).into_owned();
                    }
                    fields::FieldRole::ImageFormat => {
                        out.media_type = String::from_utf8_lossy(&bytes)
                            .trim_end_matches('\0')
                            .to_string();
                    }
                    _ => out.picture_type = bytes.first().copied().unwrap_or(0),
                }
            }
            FieldKind::RestBinary => {
                out.data = reader.read_binary(None);
            }
        }
    }
    out
}

fn assemble_value(key: LogicalKey, extracted: ExtractedFields) -> TagValue {
    match key {
        LogicalKey::Comment | LogicalKey::Lyrics => TagValue::Comment(Comment {
            language: extracted.language,
            description: extracted.description,
            text: extracted.content,
        }),
        LogicalKey::Picture => TagValue::Picture(Picture {
            media_type: extracted.media_type,
            picture_type: extracted.picture_type,
            description: extracted.description,
            data: extracted.data,
        }),
        LogicalKey::Genre => TagValue::Text(resolve_genre(extracted.content)),
        _ => TagValue::Text(extracted.content),
    }
}

/// A genre text beginning with a run of decimal digits is an index into the
/// legacy numeric table; out-of-range indices become "Unknown".
fn resolve_genre(text: String) -> String {
    let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return text;
    }
    match digits.parse::<usize>().ok().and_then(genre_name) {
        Some(name) => name.to_string(),
        None => "Unknown".to_string(),
    }
}

/// The v3 CRC covers the frames region: after the extended header, before
/// the padding. The declared padding counts raw bytes, so for an
/// unsynchronized tag the window is cut on the raw span and the transform
/// reapplied to just that slice.
fn v3_crc_window<'a>(
    span: &'a [u8],
    raw: Option<&[u8]>,
    pos: usize,
    padding: u32,
) -> Cow<'a, [u8]> {
    match raw {
        Some(raw) => {
            let start = raw_offset(raw, pos);
            let end = raw.len().saturating_sub(padding as usize).max(start);
            Cow::Owned(remove_unsynchronization(&raw[start..end]))
        }
        None => {
            let end = span.len().saturating_sub(padding as usize).max(pos);
            Cow::Borrowed(&span[pos..end])
        }
    }
}

/// Raw-span offset corresponding to a position in the de-unsynchronized
/// span.
fn raw_offset(raw: &[u8], unstuffed_pos: usize) -> usize {
    let mut produced = 0;
    let mut i = 0;
    while i < raw.len() && produced < unstuffed_pos {
        if raw[i] == 0xFF && raw.get(i + 1) == Some(&0x00) {
            i += 2;
        } else {
            i += 1;
        }
        produced += 1;
    }
    i
}

fn offset_consumed(err: TagError, base: usize) -> TagError {
    match err {
        TagError::NotATag { consumed } => TagError::NotATag {
            consumed: base + consumed,
        },
        TagError::Malformed { reason, consumed } => TagError::Malformed {
            reason,
            consumed: base + consumed,
        },
        TagError::UnsupportedVersion { version, consumed } => TagError::UnsupportedVersion {
            version,
            consumed: base + consumed,
        },
        TagError::SizeOverflow { size, consumed } => TagError::SizeOverflow {
            size,
            consumed: base + consumed,
        },
        TagError::FrameDamaged { consumed } => TagError::FrameDamaged {
            consumed: base + consumed,
        },
        TagError::Io(err) => TagError::Io(err),
    }
}

/// Fill as much of `buf` as the source can provide; a short count means the
/// stream ended early.
fn read_fully<R: Read>(source: &mut R, buf: &mut [u8]) -> Result<usize, std::io::Error> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
