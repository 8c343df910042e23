//! Logical keys, their wire-key spellings per tag revision, and the static
//! field shapes describing how each frame payload splits into sub-fields.
//!
//! Shapes are plain data resolved through a lookup, so adding a key means
//! adding a table row, not another flag combination.

mod reader;

pub use reader::FieldReader;

use serde::{Deserialize, Serialize};

/// Stable application-facing keys, independent of tag revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalKey {
    Title,
    Artist,
    Album,
    AlbumArtist,
    Composer,
    Track,
    DiscNumber,
    Year,
    Genre,
    Comment,
    Lyrics,
    Picture,
    Bpm,
    Encoder,
}

impl LogicalKey {
    pub const ALL: [LogicalKey; 14] = [
        LogicalKey::Title,
        LogicalKey::Artist,
        LogicalKey::Album,
        LogicalKey::AlbumArtist,
        LogicalKey::Composer,
        LogicalKey::Track,
        LogicalKey::DiscNumber,
        LogicalKey::Year,
        LogicalKey::Genre,
        LogicalKey::Comment,
        LogicalKey::Lyrics,
        LogicalKey::Picture,
        LogicalKey::Bpm,
        LogicalKey::Encoder,
    ];
}

/// Translate a logical key to the wire key used by the given tag revision.
pub fn wire_key(key: LogicalKey, version: u8) -> &'static str {
    if version == 2 {
        match key {
            LogicalKey::Title => "TT2",
            LogicalKey::Artist => "TP1",
            LogicalKey::Album => "TAL",
            LogicalKey::AlbumArtist => "TP2",
            LogicalKey::Composer => "TCM",
            LogicalKey::Track => "TRK",
            LogicalKey::DiscNumber => "TPA",
            LogicalKey::Year => "TYE",
            LogicalKey::Genre => "TCO",
            LogicalKey::Comment => "COM",
            LogicalKey::Lyrics => "ULT",
            LogicalKey::Picture => "PIC",
            LogicalKey::Bpm => "TBP",
            LogicalKey::Encoder => "TEN",
        }
    } else {
        match key {
            LogicalKey::Title => "TIT2",
            LogicalKey::Artist => "TPE1",
            LogicalKey::Album => "TALB",
            LogicalKey::AlbumArtist => "TPE2",
            LogicalKey::Composer => "TCOM",
            LogicalKey::Track => "TRCK",
            LogicalKey::DiscNumber => "TPOS",
            // v4 replaced the year frame with a full recording timestamp.
            LogicalKey::Year => {
                if version == 4 {
                    "TDRC"
                } else {
                    "TYER"
                }
            }
            LogicalKey::Genre => "TCON",
            LogicalKey::Comment => "COMM",
            LogicalKey::Lyrics => "USLT",
            LogicalKey::Picture => "APIC",
            LogicalKey::Bpm => "TBPM",
            LogicalKey::Encoder => "TENC",
        }
    }
}

/// The revision's full wire-key vocabulary, used to seed the resync key set.
pub fn wire_keys(version: u8) -> Vec<&'static str> {
    LogicalKey::ALL
        .iter()
        .map(|&key| wire_key(key, version))
        .collect()
}

/// What a sub-field means within a frame payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRole {
    Language,
    MediaType,
    ImageFormat,
    PictureType,
    Description,
    Content,
    Data,
}

/// How a sub-field's bytes are consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Null-terminated text under the payload's declared encoding.
    EncodedText,
    /// Null-terminated text that is always Latin1 (MIME types).
    Latin1Text,
    FixedBinary(usize),
    RestBinary,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub role: FieldRole,
    pub kind: FieldKind,
}

const fn spec(role: FieldRole, kind: FieldKind) -> FieldSpec {
    FieldSpec { role, kind }
}

const TEXT_SHAPE: &[FieldSpec] = &[spec(FieldRole::Content, FieldKind::EncodedText)];

const COMMENT_SHAPE: &[FieldSpec] = &[
    spec(FieldRole::Language, FieldKind::FixedBinary(3)),
    spec(FieldRole::Description, FieldKind::EncodedText),
    spec(FieldRole::Content, FieldKind::EncodedText),
];

const PICTURE_SHAPE: &[FieldSpec] = &[
    spec(FieldRole::MediaType, FieldKind::Latin1Text),
    spec(FieldRole::PictureType, FieldKind::FixedBinary(1)),
    spec(FieldRole::Description, FieldKind::EncodedText),
    spec(FieldRole::Data, FieldKind::RestBinary),
];

// v2 pictures carry a fixed 3-byte image format instead of a MIME string.
const PICTURE_SHAPE_V2: &[FieldSpec] = &[
    spec(FieldRole::ImageFormat, FieldKind::FixedBinary(3)),
    spec(FieldRole::PictureType, FieldKind::FixedBinary(1)),
    spec(FieldRole::Description, FieldKind::EncodedText),
    spec(FieldRole::Data, FieldKind::RestBinary),
];

/// The ordered sub-field shape for a logical key.
pub fn field_shape(key: LogicalKey, version: u8) -> &'static [FieldSpec] {
    match key {
        LogicalKey::Comment | LogicalKey::Lyrics => COMMENT_SHAPE,
        LogicalKey::Picture => {
            if version == 2 {
                PICTURE_SHAPE_V2
            } else {
                PICTURE_SHAPE
            }
        }
        _ => TEXT_SHAPE,
    }
}

/// Whether the first payload byte is a text-encoding selector for this key.
pub fn has_encoding_byte(key: LogicalKey) -> bool {
    // Every shape in the vocabulary starts with an encoding byte; binary-only
    // frames would be listed here when added.
    let _ = key;
    true
}
