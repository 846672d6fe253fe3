//! Wire protocol of USB HID CO2 meters (ZyAura / Holtek based devices).
//!
//! The device emits 8 byte frames, each carrying one measurement. Most
//! models obfuscate frames with a per-session key that the host chooses and
//! hands over in a feature report; [`decode`] undoes that transform and
//! [`validate`] checks the result.

pub mod protocol;

pub use protocol::{
    DecodedFrame, FRAME_SIZE, FrameError, FrameResult, KEY_SIZE, Measurement, MeasurementKind,
    RawFrame, SessionKey, decode, encode, extract, is_valid, kelvin16_to_celsius, validate,
};
