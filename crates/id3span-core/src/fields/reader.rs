use crate::text::{self, Encoding};

/// Cursor over one frame's payload, extracting null-terminated or
/// fixed-length sub-fields under the payload's declared encoding.
pub struct FieldReader<'a> {
    payload: &'a [u8],
    pos: usize,
    encoding: Encoding,
}

impl<'a> FieldReader<'a> {
    /// Build a reader; when `has_encoding_byte` is set the first payload
    /// byte selects the text encoding (unassigned selector values fall back
    /// to Latin1).
    pub fn new(payload: &'a [u8], has_encoding_byte: bool) -> Self {
        let mut pos = 0;
        let mut encoding = Encoding::Latin1;
        if has_encoding_byte {
            if let Some(&selector) = payload.first() {
                pos = 1;
                if let Some(selected) = Encoding::from_selector(selector) {
                    encoding = selected;
                }
            }
        }
        Self {
            payload,
            pos,
            encoding,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn remaining(&self) -> usize {
        self.payload.len() - self.pos
    }

    /// Read up to the next terminator under the declared encoding, decode,
    /// and advance past the terminator. A missing terminator consumes the
    /// rest of the payload.
    pub fn read_text(&mut self) -> String {
        self.read_text_as(self.encoding)
    }

    /// Like `read_text` but under a fixed encoding, regardless of the
    /// declared one. MIME-type sub-fields are always Latin1.
    pub fn read_text_as(&mut self, encoding: Encoding) -> String {
        let rest = &self.payload[self.pos..];
        let (end, skip) = match find_terminator(rest, encoding) {
            Some(at) => (at, encoding.terminator_len()),
            None => (rest.len(), 0),
        };
        self.pos += end + skip;
        // Decode failures degrade to an empty string rather than losing the
        // frame; cursor advancement already happened so later fields stay
        // aligned.
        text::decode(&rest[..end], encoding).unwrap_or_default()
    }

    /// Copy `len` raw bytes (`None` = rest of payload), clamped to what is
    /// available, and advance.
    pub fn read_binary(&mut self, len: Option<usize>) -> Vec<u8> {
        let available = self.remaining();
        let take = len.map_or(available, |n| n.min(available));
        let out = self.payload[self.pos..self.pos + take].to_vec();
        self.pos += take;
        out
    }
}

/// Locate the string terminator: a single `0x00` for 1-byte encodings, an
/// aligned `0x00 0x00` pair for UTF-16 variants.
fn find_terminator(bytes: &[u8], encoding: Encoding) -> Option<usize> {
    match encoding.terminator_len() {
        1 => bytes.iter().position(|&b| b == 0x00),
        _ => {
            let mut i = 0;
            while i + 1 < bytes.len() {
                if bytes[i] == 0x00 && bytes[i + 1] == 0x00 {
                    return Some(i);
                }
                i += 2;
            }
            None
        }
    }
}
