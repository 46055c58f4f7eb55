use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Emotional tone assigned to a segment by the external tagger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionalTone {
    Sensual,
    Excited,
    Climax,
    Whisper,
    Intense,
    Soft,
}

impl EmotionalTone {
    pub const ALL: [EmotionalTone; 6] = [
        EmotionalTone::Sensual,
        EmotionalTone::Excited,
        EmotionalTone::Climax,
        EmotionalTone::Whisper,
        EmotionalTone::Intense,
        EmotionalTone::Soft,
    ];

    /// Lowercase name, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            EmotionalTone::Sensual => "sensual",
            EmotionalTone::Excited => "excited",
            EmotionalTone::Climax => "climax",
            EmotionalTone::Whisper => "whisper",
            EmotionalTone::Intense => "intense",
            EmotionalTone::Soft => "soft",
        }
    }
}

/// Declared speaking rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeechRate {
    VerySlow,
    Slow,
    Moderate,
    Fast,
    Default,
}

/// Target loudness of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Volume {
    Soft,
    Normal,
    Loud,
}

/// A span of input text annotated by the segment tagger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedSegment {
    pub text: String,
    #[serde(default)]
    pub environment: String,
    pub emotional_tone: EmotionalTone,
    pub speech_rate: SpeechRate,
    pub volume: Volume,
    /// Fade-in override in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_in: Option<f64>,
    /// Fade-out override in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fade_out: Option<f64>,
}

impl TaggedSegment {
    pub fn new(
        text: impl Into<String>,
        emotional_tone: EmotionalTone,
        speech_rate: SpeechRate,
        volume: Volume,
    ) -> Self {
        Self {
            text: text.into(),
            environment: String::new(),
            emotional_tone,
            speech_rate,
            volume,
            fade_in: None,
            fade_out: None,
        }
    }
}

/// A tagged segment placed on the output timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledSegment {
    pub segment: TaggedSegment,
    /// Start time in seconds (>= 0)
    pub start_time: f64,
    /// Planned duration in seconds (> 0)
    pub duration: f64,
    /// Fade-in length in seconds
    pub fade_in: f64,
    /// Fade-out length in seconds. `None` lets the mixer derive a
    /// crossfade tail from the segment duration.
    pub fade_out: Option<f64>,
}

impl ScheduledSegment {
    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Decoded audio for one segment, planar.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudioBuffer {
    pub sample_rate: u32,
    /// One sample vector per channel, values in [-1, 1].
    pub channels: Vec<Vec<f64>>,
}

impl DecodedAudioBuffer {
    pub fn mono(samples: Vec<f64>, sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: vec![samples],
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel).
    pub fn len(&self) -> usize {
        self.channels.first().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration_s(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    /// Samples feeding output channel `ch`. Mono sources are broadcast and
    /// extra source channels beyond the output layout are ignored.
    pub fn channel_for_output(&self, ch: usize) -> &[f64] {
        match self.channels.len() {
            0 => &[],
            n => self.channels[ch.min(n - 1)].as_slice(),
        }
    }
}

/// Number of output channels the mixer renders.
pub const MIX_CHANNELS: usize = 2;

/// Stereo accumulator at the engine rate. Samples are summed, never
/// overwritten.
#[derive(Debug, Clone, PartialEq)]
pub struct MixBuffer {
    pub sample_rate: u32,
    pub channels: [Vec<f64>; MIX_CHANNELS],
}

impl MixBuffer {
    /// Zero-initialized buffer of `frames` samples per channel.
    pub fn new(sample_rate: u32, frames: usize) -> Self {
        Self {
            sample_rate,
            channels: [vec![0.0; frames], vec![0.0; frames]],
        }
    }

    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn duration_s(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    /// Largest absolute sample over all channels.
    pub fn peak(&self) -> f64 {
        self.channels
            .iter()
            .flat_map(|c| c.iter())
            .fold(0.0f64, |peak, s| peak.max(s.abs()))
    }

    /// Scale the whole buffer so its peak sits at `target` when it exceeds
    /// it. Returns the applied gain, or `None` when no correction was needed.
    pub fn normalize(&mut self, target: f64) -> Option<f64> {
        let peak = self.peak();
        if peak <= target {
            return None;
        }
        let gain = target / peak;
        for sample in self.channels.iter_mut().flat_map(|c| c.iter_mut()) {
            *sample *= gain;
        }
        Some(gain)
    }
}

/// Playable handle to an encoded track.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioHandle {
    pub id: Uuid,
    bytes: Vec<u8>,
}

impl AudioHandle {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            id: Uuid::new_v4(),
            bytes,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Write the encoded track to disk, creating parent directories.
    pub fn write_to(&self, path: &std::path::Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.bytes)
    }
}

/// Output of one mix operation.
#[derive(Debug, Clone)]
pub struct MixedAudioResult {
    pub audio: AudioHandle,
    /// Total duration in seconds
    pub duration: f64,
    /// Segments in mix order, for diagnostics
    pub segments: Vec<ScheduledSegment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_segment_serde_names() {
        let json = r#"{
            "text": "Come closer.",
            "environment": "bedroom",
            "emotional_tone": "whisper",
            "speech_rate": "very-slow",
            "volume": "soft"
        }"#;
        let seg: TaggedSegment = serde_json::from_str(json).unwrap();
        assert_eq!(seg.emotional_tone, EmotionalTone::Whisper);
        assert_eq!(seg.speech_rate, SpeechRate::VerySlow);
        assert_eq!(seg.volume, Volume::Soft);
        assert!(seg.fade_in.is_none());
    }

    #[test]
    fn test_scheduled_segment_serializes_nested() {
        let seg = ScheduledSegment {
            segment: TaggedSegment::new("hi", EmotionalTone::Soft, SpeechRate::Default, Volume::Normal),
            start_time: 1.5,
            duration: 2.0,
            fade_in: 0.15,
            fade_out: Some(0.2),
        };
        let value = serde_json::to_value(&seg).unwrap();
        assert_eq!(value["segment"]["text"], "hi");
        assert_eq!(value["start_time"], 1.5);
        assert!((seg.end_time() - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_channel_for_output_broadcasts_mono() {
        let buf = DecodedAudioBuffer::mono(vec![0.1, 0.2], 16000);
        assert_eq!(buf.channel_for_output(0), buf.channel_for_output(1));
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_channel_for_output_empty() {
        let buf = DecodedAudioBuffer { sample_rate: 16000, channels: vec![] };
        assert!(buf.channel_for_output(1).is_empty());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_mix_buffer_normalize_scales_to_target() {
        let mut buf = MixBuffer::new(100, 4);
        buf.channels[0] = vec![0.0, 1.8, -0.9, 0.3];
        buf.channels[1] = vec![0.0, -0.45, 0.0, 0.0];
        let gain = buf.normalize(0.9).unwrap();
        assert!((gain - 0.5).abs() < 1e-12);
        assert!((buf.peak() - 0.9).abs() < 1e-12);
        assert!((buf.channels[1][1] + 0.225).abs() < 1e-12);
    }

    #[test]
    fn test_mix_buffer_normalize_skips_quiet() {
        let mut buf = MixBuffer::new(100, 3);
        buf.channels[0] = vec![0.2, -0.9, 0.1];
        let before = buf.clone();
        assert!(buf.normalize(0.9).is_none());
        assert_eq!(buf, before);
    }
}
