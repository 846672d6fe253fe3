pub type FrameResult<T> = core::result::Result<T, FrameError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("invalid frame terminator: {0:#04X}")]
    BadTerminator(u8),

    #[error("frame checksum mismatch: expected {expected:#04X}, got {actual:#04X}")]
    ChecksumMismatch { expected: u8, actual: u8 },
}
