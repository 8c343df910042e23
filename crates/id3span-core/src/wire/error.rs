use thiserror::Error;

/// Errors that abort a whole tag decode.
///
/// Every structural variant carries the number of bytes consumed before the
/// problem was detected, so the host can skip exactly that span and resume
/// looking for audio data.
#[derive(Debug, Error)]
pub enum TagError {
    #[error("no ID3v2 magic at stream start")]
    NotATag { consumed: usize },
    #[error("malformed tag header: {reason}")]
    Malformed { reason: &'static str, consumed: usize },
    #[error("unsupported ID3v2 revision: 2.{version}")]
    UnsupportedVersion { version: u8, consumed: usize },
    #[error("effective tag size {size} exceeds the {max}-byte ceiling", max = crate::wire::layout::MAX_EFFECTIVE_TAG_SIZE)]
    SizeOverflow { size: u64, consumed: usize },
    #[error("first frame is unrecoverable, no tag content available")]
    FrameDamaged { consumed: usize },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TagError {
    /// Bytes consumed from the source before the error was detected.
    pub fn consumed_bytes(&self) -> usize {
        match *self {
            TagError::NotATag { consumed }
            | TagError::Malformed { consumed, .. }
            | TagError::UnsupportedVersion { consumed, .. }
            | TagError::SizeOverflow { consumed, .. }
            | TagError::FrameDamaged { consumed } => consumed,
            TagError::Io(_) => 0,
        }
    }
}
