//! Segment scheduling and mixing for emotive narration.
//!
//! A script arrives as [`TaggedSegment`]s. The [`voice`] module turns each
//! one into synthesis markup and voice settings, the [`scheduler`] lays the
//! segments out on a timeline with overlapping crossfades, and the [`mix`]
//! engine renders the synthesized clips into one normalized WAV track.

pub mod audio;
pub mod cache;
pub mod config;
pub mod error;
pub mod mix;
pub mod names;
pub mod pipeline;
pub mod scheduler;
pub mod types;
pub mod voice;

pub use config::SegueConfig;
pub use error::{Error, Result};
pub use mix::{MixInput, MixingEngine};
pub use pipeline::{Pipeline, SegmentTagger, Synthesizer};
pub use scheduler::Scheduler;
pub use types::{
    AudioHandle, DecodedAudioBuffer, EmotionalTone, MixedAudioResult, ScheduledSegment,
    SpeechRate, TaggedSegment, Volume,
};
pub use voice::{VoiceMapper, VoiceRequest};
