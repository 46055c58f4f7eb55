//! Error taxonomy for scheduling, mixing and playback.

use thiserror::Error;

/// Boxed error returned by external collaborators (tagger, synthesizer).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    /// Nothing to mix: caller bug or an empty tagger result.
    #[error("no segments to mix")]
    EmptyInput,

    /// A segment's bytes could not be interpreted as audio.
    #[error("segment {segment}: audio could not be decoded: {reason}")]
    Decode { segment: usize, reason: String },

    /// Audio output subsystem unavailable or in an invalid state.
    #[error("audio output unavailable: {0}")]
    Resource(String),

    #[error("resampling failed: {0}")]
    Resample(String),

    #[error("WAV encoding failed: {0}")]
    Encode(#[from] hound::Error),

    /// The external segment tagger failed.
    #[error("segment tagging failed: {0}")]
    Tagging(#[source] BoxError),

    /// The external synthesis call failed for one segment.
    #[error("synthesis failed for segment {segment}: {source}")]
    Synthesis {
        segment: usize,
        #[source]
        source: BoxError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn decode(segment: usize, reason: impl std::fmt::Display) -> Self {
        Error::Decode {
            segment,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_message_names_segment() {
        let e = Error::decode(3, "not audio");
        assert_eq!(e.to_string(), "segment 3: audio could not be decoded: not audio");
    }

    #[test]
    fn test_synthesis_error_keeps_source() {
        let inner: BoxError = "provider returned 500".into();
        let e = Error::Synthesis { segment: 1, source: inner };
        let source = std::error::Error::source(&e).expect("source");
        assert_eq!(source.to_string(), "provider returned 500");
    }
}
