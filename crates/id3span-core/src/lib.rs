//! id3span core library for ID3v2 metadata decoding.
//!
//! This crate reads the binary tag embedded at the start of an audio byte
//! stream and exposes its key/value metadata, plus the byte count a host
//! must skip to reach actual audio data. The wire parsers (header, frames,
//! text encodings) are byte-oriented and side-effect free; all I/O is
//! isolated in the decode layer. Format conventions live in `wire::layout`
//! so parsers stay minimal.
//!
//! Invariants:
//! - One corrupt frame never costs the frames parsed before it.
//! - Resynchronization scans and frame sizes are bounded, so worst-case
//!   work per tag is predictable even for hostile input.
//! - All diagnostics are typed values; nothing is logged or swallowed.
//!
//! Supported revisions: ID3v2.2, v2.3 and v2.4. Tag writing and ID3v1 are
//! out of scope (only the v1 genre vocabulary is consumed as a lookup).
//!
//! # Examples
//! ```
//! use id3span_core::{LogicalKey, TagValue, decode_bytes};
//!
//! // "ID3", v2.3, no flags, 18-byte body holding one TPE1 frame.
//! let mut tag = vec![0x49, 0x44, 0x33, 3, 0, 0, 0, 0, 0, 18];
//! tag.extend_from_slice(b"TPE1");
//! tag.extend_from_slice(&[0, 0, 0, 8, 0, 0]);
//! tag.extend_from_slice(b"\x00Artist\x00");
//!
//! let decoded = decode_bytes(&tag)?;
//! assert_eq!(
//!     decoded.get(LogicalKey::Artist),
//!     Some(TagValue::Text("Artist".into()))
//! );
//! assert_eq!(decoded.bytes_to_skip(), tag.len() as u64);
//! # Ok::<(), id3span_core::TagError>(())
//! ```

use serde::{Deserialize, Serialize};

mod decode;
mod fields;
mod genre;
mod text;
mod wire;

pub use decode::{DecodedTag, decode_bytes, decode_stream};
pub use fields::{FieldKind, FieldReader, FieldRole, FieldSpec, LogicalKey};
pub use genre::genre_name;
pub use text::{DecodeError, Encoding, decode as decode_text};
pub use wire::error::TagError;
pub use wire::frame::{Frame, FrameFlags};
pub use wire::header::{ExtendedHeader, TagHeader};
pub use wire::sync::{
    decode_synchsafe_u28, encode_synchsafe_u28, insert_unsynchronization,
    remove_unsynchronization,
};

/// A value extracted from a tag frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TagValue {
    Text(String),
    Comment(Comment),
    Picture(Picture),
}

/// Comment and lyrics frames: language, description and body text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Three-letter language code as written in the frame.
    pub language: String,
    pub description: String,
    pub text: String,
}

/// An attached picture frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Picture {
    /// MIME type (v2.3/2.4) or the 3-char image format of v2.2.
    pub media_type: String,
    /// Picture type byte (3 = front cover).
    pub picture_type: u8,
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u8>,
}

/// Serializable report of one decoded tag, for host logs and diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagSummary {
    /// Major tag revision (2, 3 or 4).
    pub version: u8,
    /// Declared tag size, excluding the 10-byte header.
    pub declared_size: u32,
    /// Bytes to skip before audio data begins.
    pub bytes_to_skip: u64,
    /// Unusable bytes skipped during corruption recovery.
    pub skipped_bytes: u32,
    /// Whether the extended-header CRC failed to verify (non-fatal).
    pub crc_mismatch: bool,
    /// Per-frame summaries in tag order.
    pub frames: Vec<FrameSummary>,
}

/// One frame's entry in a [`TagSummary`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSummary {
    /// Wire key, e.g. `TPE1`.
    pub id: String,
    /// Payload length after decompression.
    pub len: u64,
    pub compressed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_id: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture_tag() -> Vec<u8> {
        let mut tag = vec![0x49, 0x44, 0x33, 3, 0, 0, 0, 0, 0, 18];
        tag.extend_from_slice(b"TPE1");
        tag.extend_from_slice(&[0, 0, 0, 8, 0, 0]);
        tag.extend_from_slice(b"\x00Artist\x00");
        tag
    }

    #[test]
    fn summary_omits_optional_fields_when_none() {
        let decoded = decode_bytes(&fixture_tag()).expect("fixture tag");
        let value = serde_json::to_value(decoded.summary()).expect("summary json");

        assert_eq!(value["version"], 3);
        assert_eq!(value["crc_mismatch"], false);
        let frame = &value["frames"][0];
        assert_eq!(frame["id"], "TPE1");
        assert!(frame.get("group_id").is_none());
        assert!(frame.get("encryption_id").is_none());
    }

    #[test]
    fn summary_round_trips_through_json() {
        let decoded = decode_bytes(&fixture_tag()).expect("fixture tag");
        let json = serde_json::to_string(&decoded.summary()).expect("summary json");
        let back: TagSummary = serde_json::from_str(&json).expect("summary parse");
        assert_eq!(back.frames.len(), 1);
        assert_eq!(back.bytes_to_skip, 28);
    }
}
