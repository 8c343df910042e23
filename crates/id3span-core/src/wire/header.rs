use super::error::TagError;
use super::layout;
use super::reader::TagReader;
use super::sync::{decode_synchsafe_u28, decode_synchsafe_u35};

/// Fixed tag header plus (once parsed) the extended header.
///
/// Immutable after construction; owned by the decoder for the lifetime of
/// one tag.
#[derive(Debug, Clone)]
pub struct TagHeader {
    /// Major revision: 2, 3 or 4.
    pub version: u8,
    pub unsynchronized: bool,
    pub has_extended_header: bool,
    pub experimental: bool,
    /// v4 only.
    pub has_footer: bool,
    /// Declared tag size, excluding the 10-byte header itself.
    pub tag_size: u32,
    pub extended: Option<ExtendedHeader>,
    /// Bytes skipped while scanning for a malformed header. Always 0 on a
    /// clean parse.
    pub scanned_bytes: u32,
}

#[derive(Debug, Clone)]
pub struct ExtendedHeader {
    /// Total extended-header size including its own size field.
    pub size: u32,
    pub is_update: bool,
    pub crc: Option<u64>,
    pub padding: u32,
    pub has_restrictions: bool,
}

/// Parse the fixed 10-byte tag header.
pub fn parse_header(reader: &mut TagReader<'_>) -> Result<TagHeader, TagError> {
    let magic = reader.take_bytes(layout::TAG_MAGIC.len()).ok_or(TagError::NotATag { consumed: 0 })?;
    if magic != layout::TAG_MAGIC {
        return Err(TagError::NotATag {
            consumed: reader.position(),
        });
    }

    let version = reader.take_u8().ok_or_else(|| truncated(reader))?;
    let revision = reader.take_u8().ok_or_else(|| truncated(reader))?;
    if version == 0xFF && revision == 0xFF {
        return Err(TagError::Malformed {
            reason: "reserved version bytes 0xFF 0xFF",
            consumed: reader.position(),
        });
    }
    if !(2..=4).contains(&version) {
        return Err(TagError::UnsupportedVersion {
            version,
            consumed: reader.position(),
        });
    }

    let flags = reader.take_u8().ok_or_else(|| truncated(reader))?;
    let unsynchronized = flags & layout::TAG_FLAG_UNSYNC != 0;
    let has_extended_header = version >= 3 && flags & layout::TAG_FLAG_EXTENDED != 0;
    let experimental = version >= 3 && flags & layout::TAG_FLAG_EXPERIMENTAL != 0;
    let has_footer = version == 4 && flags & layout::TAG_FLAG_FOOTER != 0;

    let size_bytes: [u8; 4] = reader.take_array().ok_or_else(|| truncated(reader))?;
    let tag_size = decode_synchsafe_u28(size_bytes).ok_or(TagError::Malformed {
        reason: "tag size is not synchsafe",
        consumed: reader.position(),
    })?;

    Ok(TagHeader {
        version,
        unsynchronized,
        has_extended_header,
        experimental,
        has_footer,
        tag_size,
        extended: None,
        scanned_bytes: 0,
    })
}

/// Parse the extended header at the start of the tag span. The reader is
/// left positioned on the first frame.
pub fn parse_extended_header(
    reader: &mut TagReader<'_>,
    version: u8,
) -> Result<ExtendedHeader, TagError> {
    match version {
        3 => parse_extended_v3(reader),
        _ => parse_extended_v4(reader),
    }
}

fn parse_extended_v3(reader: &mut TagReader<'_>) -> Result<ExtendedHeader, TagError> {
    // The declared v3 size excludes the 4-byte size field itself.
    let declared = reader.take_u32_be().ok_or_else(|| truncated(reader))?;
    let size = declared.checked_add(4).ok_or(TagError::Malformed {
        reason: "extended header size overflow",
        consumed: reader.position(),
    })?;
    let flags = reader.take_u16_be().ok_or_else(|| truncated(reader))?;
    let crc_protected = flags & layout::EXT_V3_FLAG_CRC != 0;
    let padding = reader.take_u32_be().ok_or_else(|| truncated(reader))?;
    let crc = if crc_protected {
        Some(u64::from(
            reader.take_u32_be().ok_or_else(|| truncated(reader))?,
        ))
    } else {
        None
    };

    Ok(ExtendedHeader {
        size,
        is_update: false,
        crc,
        padding,
        has_restrictions: false,
    })
}

fn parse_extended_v4(reader: &mut TagReader<'_>) -> Result<ExtendedHeader, TagError> {
    let size_bytes: [u8; 4] = reader.take_array().ok_or_else(|| truncated(reader))?;
    let size = decode_synchsafe_u28(size_bytes).ok_or(TagError::Malformed {
        reason: "extended header size is not synchsafe",
        consumed: reader.position(),
    })?;
    // Number-of-flag-bytes field, fixed at 1.
    reader.skip(1).ok_or_else(|| truncated(reader))?;
    let flags = reader.take_u8().ok_or_else(|| truncated(reader))?;

    let is_update = flags & layout::EXT_V4_FLAG_UPDATE != 0;

    let crc = if flags & layout::EXT_V4_FLAG_CRC != 0 {
        let crc_bytes: [u8; 5] = reader.take_array().ok_or_else(|| truncated(reader))?;
        Some(decode_synchsafe_u35(crc_bytes).ok_or(TagError::Malformed {
            reason: "extended header CRC is not synchsafe",
            consumed: reader.position(),
        })?)
    } else {
        None
    };

    let has_restrictions = flags & layout::EXT_V4_FLAG_RESTRICTIONS != 0;
    if has_restrictions {
        // One length byte plus one data byte.
        reader.skip(2).ok_or_else(|| truncated(reader))?;
    }

    Ok(ExtendedHeader {
        size,
        is_update,
        crc,
        padding: 0,
        has_restrictions,
    })
}

/// Validate the effective tag size against the hard ceiling.
pub fn check_effective_size(header: &TagHeader, consumed: usize) -> Result<(), TagError> {
    let overhead = header
        .extended
        .as_ref()
        .map(|ext| u64::from(ext.size) + u64::from(ext.padding))
        .unwrap_or(0);
    let effective = u64::from(header.tag_size).saturating_sub(overhead);
    if effective > layout::MAX_EFFECTIVE_TAG_SIZE {
        return Err(TagError::SizeOverflow {
            size: effective,
            consumed,
        });
    }
    Ok(())
}

fn truncated(reader: &TagReader<'_>) -> TagError {
    TagError::Malformed {
        reason: "truncated header",
        consumed: reader.position(),
    }
}
