use super::{error::FrameError, error::FrameResult, *};

/// Per-connection key the device mixes into every frame it sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionKey(pub [u8; KEY_SIZE]);

impl SessionKey {
    /// Draw a fresh key from the thread-local CSPRNG.
    pub fn generate() -> Self {
        Self(rand::random())
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Payload of the SET_REPORT request that arms the device with this key.
    /// Report id 0 followed by the key bytes.
    pub fn feature_report(&self) -> [u8; KEY_SIZE + 1] {
        let mut report = [0u8; KEY_SIZE + 1];
        report[1..].copy_from_slice(&self.0);
        report
    }
}

/// An 8 byte frame exactly as read from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame(pub [u8; FRAME_SIZE]);

impl RawFrame {
    /// Reinterpret the frame as plaintext, for device variants that do not
    /// obfuscate their output.
    pub fn into_plain(self) -> DecodedFrame {
        DecodedFrame(self.0)
    }
}

/// A descrambled frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame(pub [u8; FRAME_SIZE]);

impl DecodedFrame {
    /// Build a well-formed frame carrying `value` under `kind`.
    pub fn new(kind: u8, value: u16) -> Self {
        let [hi, lo] = value.to_be_bytes();
        let checksum = kind.wrapping_add(hi).wrapping_add(lo);
        Self([kind, hi, lo, checksum, FRAME_TERMINATOR, 0, 0, 0])
    }

    pub fn kind(&self) -> u8 {
        self.0[KIND_OFFSET]
    }

    pub fn value(&self) -> u16 {
        u16::from_be_bytes([self.0[VALUE_OFFSET], self.0[VALUE_OFFSET + 1]])
    }

    pub fn checksum(&self) -> u8 {
        self.0[CHECKSUM_OFFSET]
    }

    pub fn terminator(&self) -> u8 {
        self.0[TERMINATOR_OFFSET]
    }

    fn computed_checksum(&self) -> u8 {
        self.0[..CHECKSUM_OFFSET]
            .iter()
            .fold(0u8, |acc, b| acc.wrapping_add(*b))
    }
}

fn nibble_swap(b: u8) -> u8 {
    b.rotate_left(4)
}

/// Reverse the device's obfuscation of `raw` using the session `key`.
pub fn decode(raw: &RawFrame, key: &SessionKey) -> DecodedFrame {
    let mut shuffled = [0u8; FRAME_SIZE];
    for (i, &j) in SHUFFLE.iter().enumerate() {
        shuffled[j] = raw.0[i];
    }

    let mut mixed = [0u8; FRAME_SIZE];
    for i in 0..FRAME_SIZE {
        mixed[i] = shuffled[i] ^ key.0[i];
    }

    let mut out = [0u8; FRAME_SIZE];
    for i in 0..FRAME_SIZE {
        let prev = mixed[(i + FRAME_SIZE - 1) % FRAME_SIZE];
        let rotated = (mixed[i] >> 3) | (prev << 5);
        out[i] = rotated.wrapping_sub(nibble_swap(MAGIC_WORD[i]));
    }

    DecodedFrame(out)
}

/// Apply the device-side obfuscation. `decode(&encode(f, k), k) == f` for
/// every frame and key.
pub fn encode(frame: &DecodedFrame, key: &SessionKey) -> RawFrame {
    let mut offset = [0u8; FRAME_SIZE];
    for i in 0..FRAME_SIZE {
        offset[i] = frame.0[i].wrapping_add(nibble_swap(MAGIC_WORD[i]));
    }

    let mut mixed = [0u8; FRAME_SIZE];
    for i in 0..FRAME_SIZE {
        let next = offset[(i + 1) % FRAME_SIZE];
        mixed[i] = ((offset[i] << 3) | (next >> 5)) ^ key.0[i];
    }

    let mut raw = [0u8; FRAME_SIZE];
    for (i, &j) in SHUFFLE.iter().enumerate() {
        raw[i] = mixed[j];
    }

    RawFrame(raw)
}

/// Check the terminator byte and the checksum of a decoded frame.
pub fn validate(frame: &DecodedFrame) -> FrameResult<()> {
    if frame.terminator() != FRAME_TERMINATOR {
        return Err(FrameError::BadTerminator(frame.terminator()));
    }

    let expected = frame.computed_checksum();
    if expected != frame.checksum() {
        return Err(FrameError::ChecksumMismatch {
            expected,
            actual: frame.checksum(),
        });
    }

    Ok(())
}

pub fn is_valid(frame: &DecodedFrame) -> bool {
    validate(frame).is_ok()
}
