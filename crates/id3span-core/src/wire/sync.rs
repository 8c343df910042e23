//! Synchsafe integers and the unsynchronization byte-stuffing transform.
//!
//! Both exist for the same reason: tag bytes must never contain a sequence
//! that an MPEG decoder would mistake for a frame sync. Synchsafe integers
//! keep every top bit clear; unsynchronization stuffs a `0x00` after every
//! `0xFF` in free-form data.

/// Decode a 4-byte synchsafe integer (28 usable bits).
///
/// Returns `None` when any byte has its top bit set, which the format
/// forbids.
pub fn decode_synchsafe_u28(bytes: [u8; 4]) -> Option<u32> {
    if bytes.iter().any(|b| b & 0x80 != 0) {
        return None;
    }
    Some(
        (u32::from(bytes[0]) << 21)
            | (u32::from(bytes[1]) << 14)
            | (u32::from(bytes[2]) << 7)
            | u32::from(bytes[3]),
    )
}

/// Encode a value below 2^28 as a 4-byte synchsafe integer.
pub fn encode_synchsafe_u28(value: u32) -> Option<[u8; 4]> {
    if value >= 1 << 28 {
        return None;
    }
    Some([
        ((value >> 21) & 0x7F) as u8,
        ((value >> 14) & 0x7F) as u8,
        ((value >> 7) & 0x7F) as u8,
        (value & 0x7F) as u8,
    ])
}

/// Decode the 5-byte synchsafe integer (35 usable bits) carried by the v4
/// extended-header CRC field.
pub fn decode_synchsafe_u35(bytes: [u8; 5]) -> Option<u64> {
    if bytes.iter().any(|b| b & 0x80 != 0) {
        return None;
    }
    Some(
        (u64::from(bytes[0]) << 28)
            | (u64::from(bytes[1]) << 21)
            | (u64::from(bytes[2]) << 14)
            | (u64::from(bytes[3]) << 7)
            | u64::from(bytes[4]),
    )
}

/// Undo unsynchronization: every `FF 00` pair collapses to a single `FF`.
pub fn remove_unsynchronization(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        let byte = data[i];
        out.push(byte);
        if byte == 0xFF && data.get(i + 1) == Some(&0x00) {
            i += 2;
        } else {
            i += 1;
        }
    }
    out
}

/// Apply unsynchronization: insert a `0x00` after every `0xFF`.
///
/// The decoder never calls this; it backs the round-trip property and is
/// available to hosts that write tags.
pub fn insert_unsynchronization(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len());
    for &byte in data {
        out.push(byte);
        if byte == 0xFF {
            out.push(0x00);
        }
    }
    out
}
