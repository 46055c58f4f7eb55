//! Tunable constants for scheduling, mixing and voice mapping.
//!
//! Every constant is a named field so callers and tests can override it.
//! All structs deserialize with `#[serde(default)]`, so a JSON config file
//! only needs to name the values it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::{EmotionalTone, SpeechRate, Volume};
use crate::voice::analysis::ContextualMood;

/// Aggregate configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegueConfig {
    pub schedule: ScheduleConfig,
    pub mix: MixConfig,
    pub voice: VoiceConfig,
}

impl SegueConfig {
    /// Load a JSON config file. Missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&data)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

// --- Scheduler ---

/// Characters per second for each declared speech rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharsPerSecond {
    pub very_slow: f64,
    pub slow: f64,
    pub moderate: f64,
    pub fast: f64,
    pub default: f64,
}

impl Default for CharsPerSecond {
    fn default() -> Self {
        Self {
            very_slow: 10.0,
            slow: 12.0,
            moderate: 15.0,
            fast: 18.0,
            default: 13.0,
        }
    }
}

impl CharsPerSecond {
    pub fn get(&self, rate: SpeechRate) -> f64 {
        match rate {
            SpeechRate::VerySlow => self.very_slow,
            SpeechRate::Slow => self.slow,
            SpeechRate::Moderate => self.moderate,
            SpeechRate::Fast => self.fast,
            SpeechRate::Default => self.default,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Fade-in when the segment specifies none (s)
    pub default_fade_in: f64,
    /// Fade-out when the segment specifies none (s)
    pub default_fade_out: f64,
    /// Planned overlap between consecutive segments (s)
    pub crossfade: f64,
    /// Time added per sentence-terminal punctuation mark (s)
    pub pause_seconds: f64,
    /// Floor for estimated durations (s)
    pub min_segment_duration: f64,
    pub chars_per_second: CharsPerSecond,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            default_fade_in: 0.15,
            default_fade_out: 0.2,
            crossfade: 0.3,
            pause_seconds: 0.3,
            min_segment_duration: 0.1,
            chars_per_second: CharsPerSecond::default(),
        }
    }
}

// --- Mixer ---

/// Linear gain for each declared volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeGains {
    pub soft: f64,
    pub normal: f64,
    pub loud: f64,
}

impl Default for VolumeGains {
    fn default() -> Self {
        Self {
            soft: 0.7,
            normal: 1.0,
            loud: 1.25,
        }
    }
}

impl VolumeGains {
    pub fn get(&self, volume: Volume) -> f64 {
        match volume {
            Volume::Soft => self.soft,
            Volume::Normal => self.normal,
            Volume::Loud => self.loud,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixConfig {
    /// Engine operating rate (Hz)
    pub sample_rate: u32,
    /// Peak ceiling enforced by normalization
    pub normalization_target: f64,
    /// Upper bound for a computed crossfade tail (s)
    pub max_crossfade: f64,
    /// Computed crossfade tail as a fraction of segment duration
    pub crossfade_ratio: f64,
    /// Frames per block when walking segment buffers
    pub block_size: usize,
    pub volume_gains: VolumeGains,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            normalization_target: 0.9,
            max_crossfade: 0.5,
            crossfade_ratio: 0.2,
            block_size: 1024,
            volume_gains: VolumeGains::default(),
        }
    }
}

// --- Voice mapping ---

/// Voice stability / expressiveness pair sent to the synthesis provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub stability: f64,
    pub expressiveness: f64,
}

impl VoiceSettings {
    pub const fn new(stability: f64, expressiveness: f64) -> Self {
        Self {
            stability,
            expressiveness,
        }
    }
}

/// Base voice settings per emotional tone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettingsTable {
    pub sensual: VoiceSettings,
    pub excited: VoiceSettings,
    pub climax: VoiceSettings,
    pub whisper: VoiceSettings,
    pub intense: VoiceSettings,
    pub soft: VoiceSettings,
}

impl Default for VoiceSettingsTable {
    fn default() -> Self {
        Self {
            sensual: VoiceSettings::new(0.55, 0.80),
            excited: VoiceSettings::new(0.40, 0.85),
            climax: VoiceSettings::new(0.30, 0.95),
            whisper: VoiceSettings::new(0.75, 0.70),
            intense: VoiceSettings::new(0.45, 0.90),
            soft: VoiceSettings::new(0.70, 0.65),
        }
    }
}

impl VoiceSettingsTable {
    pub fn get(&self, tone: EmotionalTone) -> VoiceSettings {
        match tone {
            EmotionalTone::Sensual => self.sensual,
            EmotionalTone::Excited => self.excited,
            EmotionalTone::Climax => self.climax,
            EmotionalTone::Whisper => self.whisper,
            EmotionalTone::Intense => self.intense,
            EmotionalTone::Soft => self.soft,
        }
    }
}

/// Pitch shift and speaking rate for a prosody wrapper, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProsodyPattern {
    /// Relative pitch change, e.g. -5 for "-5%"
    pub pitch_percent: i32,
    /// Absolute rate, e.g. 90 for "90%"
    pub rate_percent: u32,
}

impl ProsodyPattern {
    pub const fn new(pitch_percent: i32, rate_percent: u32) -> Self {
        Self {
            pitch_percent,
            rate_percent,
        }
    }
}

/// Prosody pattern per contextual mood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoodPatterns {
    pub calm: ProsodyPattern,
    pub intimate: ProsodyPattern,
    pub playful: ProsodyPattern,
    pub building: ProsodyPattern,
    pub passionate: ProsodyPattern,
}

impl Default for MoodPatterns {
    fn default() -> Self {
        Self {
            calm: ProsodyPattern::new(-2, 95),
            intimate: ProsodyPattern::new(-5, 85),
            playful: ProsodyPattern::new(5, 105),
            building: ProsodyPattern::new(3, 100),
            passionate: ProsodyPattern::new(8, 110),
        }
    }
}

impl MoodPatterns {
    pub fn get(&self, mood: ContextualMood) -> ProsodyPattern {
        match mood {
            ContextualMood::Calm => self.calm,
            ContextualMood::Intimate => self.intimate,
            ContextualMood::Playful => self.playful,
            ContextualMood::Building => self.building,
            ContextualMood::Passionate => self.passionate,
        }
    }
}

/// One entry of the emotion transition table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransitionRule {
    pub from: EmotionalTone,
    pub to: EmotionalTone,
    pub ms: u32,
}

const fn rule(from: EmotionalTone, to: EmotionalTone, ms: u32) -> TransitionRule {
    TransitionRule { from, to, ms }
}

/// Listed transition durations between differing tones.
pub fn default_transitions() -> Vec<TransitionRule> {
    use EmotionalTone::*;
    vec![
        rule(Whisper, Sensual, 800),
        rule(Sensual, Whisper, 900),
        rule(Sensual, Intense, 600),
        rule(Intense, Climax, 400),
        rule(Excited, Climax, 300),
        rule(Excited, Intense, 400),
        rule(Climax, Soft, 1200),
        rule(Climax, Whisper, 1500),
        rule(Intense, Soft, 1000),
        rule(Soft, Whisper, 700),
        rule(Soft, Sensual, 700),
        rule(Whisper, Excited, 1000),
    ]
}

/// Pause length multipliers per punctuation class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PauseFactors {
    pub exclamation: f64,
    pub question: f64,
    pub ellipsis: f64,
    pub comma: f64,
    pub period: f64,
}

impl Default for PauseFactors {
    fn default() -> Self {
        Self {
            exclamation: 1.5,
            question: 1.1,
            ellipsis: 1.2,
            comma: 0.7,
            period: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    pub voice_settings: VoiceSettingsTable,
    pub mood_patterns: MoodPatterns,
    pub transitions: Vec<TransitionRule>,
    /// Transition between differing tones not listed in `transitions` (ms)
    pub default_transition_ms: u32,
    /// Words counted as emotion-keyword hits (lowercase)
    pub intensity_keywords: Vec<String>,
    /// Pause length at zero intensity (ms)
    pub base_pause_ms: f64,
    /// Extra pause length at full intensity (ms)
    pub intensity_pause_ms: f64,
    pub pause_factors: PauseFactors,
    /// Intensity above which emphasis is "strong"
    pub strong_emphasis_threshold: f64,
    /// Mean sentence length (words) that maps to rhythm 1.0
    pub rhythm_reference_words: f64,
    pub stability_damping: f64,
    pub stability_range: (f64, f64),
    pub progression_boost: f64,
    pub expressiveness_range: (f64, f64),
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            voice_settings: VoiceSettingsTable::default(),
            mood_patterns: MoodPatterns::default(),
            transitions: default_transitions(),
            default_transition_ms: 500,
            intensity_keywords: [
                "love", "desire", "need", "want", "touch", "kiss", "breathe", "closer",
                "heart", "burn", "ache", "tremble", "yes", "please", "now", "more",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            base_pause_ms: 1000.0,
            intensity_pause_ms: 700.0,
            pause_factors: PauseFactors::default(),
            strong_emphasis_threshold: 0.7,
            rhythm_reference_words: 20.0,
            stability_damping: 0.3,
            stability_range: (0.3, 0.9),
            progression_boost: 0.15,
            expressiveness_range: (0.6, 1.0),
        }
    }
}
