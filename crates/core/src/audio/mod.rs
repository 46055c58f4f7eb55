//! Audio decoding, WAV encoding and device playback.

pub mod decode;
pub mod encode;
#[cfg(feature = "playback")]
pub mod playback;

pub use decode::{decode_audio, resample};
pub use encode::{encode_mix, encode_wav};
