mod error;
mod frame;
mod measurement;

pub use error::{FrameError, FrameResult};
pub use frame::{DecodedFrame, RawFrame, SessionKey, decode, encode, is_valid, validate};
pub use measurement::{Measurement, MeasurementKind, extract, kelvin16_to_celsius};

// frame structure : kind(1) + value(2, big endian) + checksum(1) + terminator(1) + reserved(3)

pub const FRAME_SIZE: usize = 8;
pub const KEY_SIZE: usize = 8;
pub const FRAME_TERMINATOR: u8 = 0x0D;

pub const KIND_OFFSET: usize = 0;
pub const VALUE_OFFSET: usize = 1;
pub const CHECKSUM_OFFSET: usize = 3;
pub const TERMINATOR_OFFSET: usize = 4;

/// Byte permutation the device applies to every frame. Input byte `i` of a
/// received frame belongs at position `SHUFFLE[i]` of the descrambled one.
pub const SHUFFLE: [usize; FRAME_SIZE] = [2, 4, 0, 7, 1, 6, 5, 3];

/// Constant the device adds to every frame, before nibble swapping.
pub const MAGIC_WORD: [u8; FRAME_SIZE] = *b"Htemp99e";
