//! Text decoding for frame payloads.
//!
//! Pure byte-to-string transformation, no I/O. The decoders are deliberately
//! lenient: real-world tags are full of truncated multi-byte sequences and
//! odd-length UTF-16 runs, and a bad character must never cost the caller
//! the rest of the tag.

use thiserror::Error;

/// Text encodings selectable by a frame's leading encoding byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// One byte per character, values 0–255 mapped straight to the same
    /// Unicode scalar. Not true ISO-8859-1, but bit-for-bit what legacy
    /// taggers produce and expect.
    Latin1,
    /// UTF-16 with a mandatory byte-order mark.
    Utf16,
    /// UTF-16 big-endian, no byte-order mark.
    Utf16Be,
    Utf8,
}

impl Encoding {
    /// Map a frame's encoding selector byte. Values outside 0..=3 are
    /// unassigned.
    pub fn from_selector(value: u8) -> Option<Self> {
        match value {
            0 => Some(Encoding::Latin1),
            1 => Some(Encoding::Utf16),
            2 => Some(Encoding::Utf16Be),
            3 => Some(Encoding::Utf8),
            _ => None,
        }
    }

    /// Width of the string terminator under this encoding.
    pub fn terminator_len(self) -> usize {
        match self {
            Encoding::Latin1 | Encoding::Utf8 => 1,
            Encoding::Utf16 | Encoding::Utf16Be => 2,
        }
    }
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("UTF-16 text without a recognized byte-order mark")]
    MissingByteOrderMark,
}

/// Decode a byte range under the given encoding.
pub fn decode(bytes: &[u8], encoding: Encoding) -> Result<String, DecodeError> {
    match encoding {
        Encoding::Latin1 => Ok(decode_latin1(bytes)),
        Encoding::Utf16 => decode_utf16_bom(bytes),
        Encoding::Utf16Be => Ok(decode_utf16_units(bytes, true)),
        Encoding::Utf8 => Ok(decode_utf8_lenient(bytes)),
    }
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn decode_utf16_bom(bytes: &[u8]) -> Result<String, DecodeError> {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => Ok(decode_utf16_units(rest, true)),
        [0xFF, 0xFE, rest @ ..] => Ok(decode_utf16_units(rest, false)),
        _ => Err(DecodeError::MissingByteOrderMark),
    }
}

/// Decode UTF-16 code units. An odd-length buffer still produces a final
/// unit, with the missing byte taken as zero; unpaired surrogates degrade
/// to a space.
fn decode_utf16_units(bytes: &[u8], big_endian: bool) -> String {
    let mut units = Vec::with_capacity(bytes.len() / 2 + 1);
    let mut chunks = bytes.chunks_exact(2);
    for pair in &mut chunks {
        let unit = if big_endian {
            u16::from_be_bytes([pair[0], pair[1]])
        } else {
            u16::from_le_bytes([pair[0], pair[1]])
        };
        units.push(unit);
    }
    if let [lone] = chunks.remainder() {
        let unit = if big_endian {
            u16::from_be_bytes([*lone, 0])
        } else {
            u16::from_le_bytes([*lone, 0])
        };
        units.push(unit);
    }
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(' '))
        .collect()
}

/// Hand-rolled UTF-8 decoding. A multi-byte sequence that would run past
/// the buffer end, or an invalid lead/continuation byte, degrades to a
/// single space instead of erroring.
fn decode_utf8_lenient(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let lead = bytes[i];
        if lead < 0x80 {
            out.push(char::from(lead));
            i += 1;
            continue;
        }
        let (len, mut value) = match lead {
            0xC0..=0xDF => (2, u32::from(lead & 0x1F)),
            0xE0..=0xEF => (3, u32::from(lead & 0x0F)),
            0xF0..=0xF7 => (4, u32::from(lead & 0x07)),
            // Stray continuation byte or invalid lead.
            _ => {
                out.push(' ');
                i += 1;
                continue;
            }
        };
        if i + len > bytes.len() {
            // Sequence runs past the buffer boundary.
            out.push(' ');
            break;
        }
        let mut valid = true;
        for &cont in &bytes[i + 1..i + len] {
            if cont & 0xC0 != 0x80 {
                valid = false;
                break;
            }
            value = (value << 6) | u32::from(cont & 0x3F);
        }
        match char::from_u32(value) {
            Some(c) if valid => out.push(c),
            _ => out.push(' '),
        }
        i += len;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_is_byte_preserving() {
        let decoded = decode(&[0x41, 0xE9, 0xFF, 0x00], Encoding::Latin1).unwrap();
        assert_eq!(decoded, "A\u{E9}\u{FF}\u{0}");
    }

    #[test]
    fn utf16_big_endian_bom() {
        let bytes = [0xFE, 0xFF, 0x00, 0x41, 0x00, 0x42];
        assert_eq!(decode(&bytes, Encoding::Utf16).unwrap(), "AB");
    }

    #[test]
    fn utf16_little_endian_bom() {
        let bytes = [0xFF, 0xFE, 0x41, 0x00, 0x42, 0x00];
        assert_eq!(decode(&bytes, Encoding::Utf16).unwrap(), "AB");
    }

    #[test]
    fn utf16_missing_bom_is_an_error() {
        let err = decode(&[0x00, 0x41], Encoding::Utf16).unwrap_err();
        assert!(matches!(err, DecodeError::MissingByteOrderMark));
    }

    #[test]
    fn utf16_be_without_bom() {
        let bytes = [0x00, 0x41, 0x30, 0x42];
        assert_eq!(decode(&bytes, Encoding::Utf16Be).unwrap(), "A\u{3042}");
    }

    #[test]
    fn utf16_odd_length_forces_final_unit() {
        // Trailing lone byte becomes the high byte of one more BE unit.
        let decoded = decode(&[0x00, 0x41, 0x00], Encoding::Utf16Be).unwrap();
        assert_eq!(decoded, "A\u{0}");
    }

    #[test]
    fn utf16_surrogate_pair() {
        // U+1D11E (musical G clef) as a BE surrogate pair.
        let bytes = [0xD8, 0x34, 0xDD, 0x1E];
        assert_eq!(decode(&bytes, Encoding::Utf16Be).unwrap(), "\u{1D11E}");
    }

    #[test]
    fn utf16_unpaired_surrogate_degrades() {
        let bytes = [0xD8, 0x34, 0x00, 0x41];
        assert_eq!(decode(&bytes, Encoding::Utf16Be).unwrap(), " A");
    }

    #[test]
    fn utf8_ascii_and_multibyte() {
        let decoded = decode("héllo ≈".as_bytes(), Encoding::Utf8).unwrap();
        assert_eq!(decoded, "héllo ≈");
    }

    #[test]
    fn utf8_four_byte_sequence() {
        let decoded = decode("🎵".as_bytes(), Encoding::Utf8).unwrap();
        assert_eq!(decoded, "🎵");
    }

    #[test]
    fn utf8_truncated_sequence_becomes_space() {
        // 0xE3 opens a 3-byte sequence but only one byte follows.
        let decoded = decode(&[0x61, 0xE3, 0x81], Encoding::Utf8).unwrap();
        assert_eq!(decoded, "a ");
    }

    #[test]
    fn utf8_stray_continuation_becomes_space() {
        let decoded = decode(&[0x80, 0x62], Encoding::Utf8).unwrap();
        assert_eq!(decoded, " b");
    }

    #[test]
    fn selector_mapping() {
        assert_eq!(Encoding::from_selector(0), Some(Encoding::Latin1));
        assert_eq!(Encoding::from_selector(1), Some(Encoding::Utf16));
        assert_eq!(Encoding::from_selector(2), Some(Encoding::Utf16Be));
        assert_eq!(Encoding::from_selector(3), Some(Encoding::Utf8));
        assert_eq!(Encoding::from_selector(4), None);
    }
}
