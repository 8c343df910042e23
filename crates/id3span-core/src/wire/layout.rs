pub const TAG_MAGIC: &[u8; 3] = b"ID3";

pub const TAG_HEADER_LEN: usize = 10;
pub const TAG_FOOTER_LEN: usize = 10;

/// Hard ceiling on the effective tag size (declared size minus extended
/// header and padding). Anything larger is treated as corruption.
pub const MAX_EFFECTIVE_TAG_SIZE: u64 = 256_000_000;

/// Per-frame payload caps. Pictures routinely embed full-resolution art;
/// everything else stays small.
pub const MAX_PICTURE_FRAME_LEN: u32 = 16_000_000;
pub const MAX_OTHER_FRAME_LEN: u32 = 1_600_000;

/// Upper bound on a resynchronization scan before the tag is written off.
pub const RESYNC_SCAN_WINDOW: usize = 10_000;

/// Byte pattern treated as definitive proof that audio data has begun.
pub const MPEG_SYNC_PROBE: &[u8; 4] = &[0xFF, 0xE0, 0x00, 0x00];

pub const FRAME_HEADER_LEN_V2: usize = 6;
pub const FRAME_HEADER_LEN_V34: usize = 10;

pub const FRAME_KEY_LEN_V2: usize = 3;
pub const FRAME_KEY_LEN_V34: usize = 4;

// Tag header flags byte.
pub const TAG_FLAG_UNSYNC: u8 = 0x80;
pub const TAG_FLAG_EXTENDED: u8 = 0x40;
pub const TAG_FLAG_EXPERIMENTAL: u8 = 0x20;
pub const TAG_FLAG_FOOTER: u8 = 0x10; // v4 only

// v3 extended-header flags (16-bit field).
pub const EXT_V3_FLAG_CRC: u16 = 0x8000;

// v4 extended-header flags byte.
pub const EXT_V4_FLAG_UPDATE: u8 = 0x40;
pub const EXT_V4_FLAG_CRC: u8 = 0x20;
pub const EXT_V4_FLAG_RESTRICTIONS: u8 = 0x10;

// v3 frame status flags (first flag byte).
pub const FRAME_V3_TAG_ALTER: u8 = 0x80;
pub const FRAME_V3_FILE_ALTER: u8 = 0x40;
pub const FRAME_V3_READ_ONLY: u8 = 0x20;

// v3 frame format flags (second flag byte).
pub const FRAME_V3_COMPRESSED: u8 = 0x80;
pub const FRAME_V3_ENCRYPTED: u8 = 0x40;
pub const FRAME_V3_GROUPED: u8 = 0x20;

// v4 frame status flags (first flag byte, shifted down one from v3).
pub const FRAME_V4_TAG_ALTER: u8 = 0x40;
pub const FRAME_V4_FILE_ALTER: u8 = 0x20;
pub const FRAME_V4_READ_ONLY: u8 = 0x10;

// v4 frame format flags (second flag byte).
pub const FRAME_V4_GROUPED: u8 = 0x40;
pub const FRAME_V4_COMPRESSED: u8 = 0x08;
pub const FRAME_V4_ENCRYPTED: u8 = 0x04;
pub const FRAME_V4_UNSYNC: u8 = 0x02;
pub const FRAME_V4_DATA_LENGTH: u8 = 0x01;
