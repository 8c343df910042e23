/// Positioned cursor over a tag span.
///
/// Reads are sequential and bounds-checked; an out-of-range read returns
/// `None` and leaves the position untouched, so each caller can apply its
/// own error policy (hard error in the header parser, damaged-frame
/// degradation in the frame parser).
pub struct TagReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> TagReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn take_u8(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }

    pub fn take_u16_be(&mut self) -> Option<u16> {
        let bytes: [u8; 2] = self.take_array()?;
        Some(u16::from_be_bytes(bytes))
    }

    pub fn take_u32_be(&mut self) -> Option<u32> {
        let bytes: [u8; 4] = self.take_array()?;
        Some(u32::from_be_bytes(bytes))
    }

    pub fn take_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(len)?;
        let slice = self.data.get(self.pos..end)?;
        self.pos = end;
        Some(slice)
    }

    pub fn take_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let slice = self.take_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Some(out)
    }

    pub fn peek_bytes(&self, len: usize) -> Option<&'a [u8]> {
        self.data.get(self.pos..self.pos.checked_add(len)?)
    }

    pub fn skip(&mut self, len: usize) -> Option<()> {
        self.take_bytes(len).map(|_| ())
    }

    /// Skip up to `len` bytes, stopping at the end of the span. Used when
    /// advancing past a damaged frame whose declared length may lie.
    pub fn skip_clamped(&mut self, len: usize) {
        self.pos += len.min(self.remaining());
    }
}

#[cfg(test)]
mod tests {
    use super::TagReader;

    #[test]
    fn sequential_reads_advance() {
        let mut reader = TagReader::new(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]);
        assert_eq!(reader.take_u8(), Some(0x01));
        assert_eq!(reader.take_u16_be(), Some(0x0203));
        assert_eq!(reader.take_u32_be(), Some(0x0405_0607));
        assert_eq!(reader.position(), 7);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn short_read_leaves_position() {
        let mut reader = TagReader::new(&[0x01, 0x02]);
        assert_eq!(reader.take_u32_be(), None);
        assert_eq!(reader.position(), 0);
        assert_eq!(reader.take_u16_be(), Some(0x0102));
    }

    #[test]
    fn peek_does_not_advance() {
        let reader = TagReader::new(&[0xAA, 0xBB]);
        assert_eq!(reader.peek_bytes(2), Some(&[0xAA, 0xBB][..]));
        assert_eq!(reader.peek_bytes(3), None);
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn skip_clamped_stops_at_end() {
        let mut reader = TagReader::new(&[0u8; 4]);
        reader.skip_clamped(100);
        assert_eq!(reader.position(), 4);
        assert_eq!(reader.remaining(), 0);
    }
}
