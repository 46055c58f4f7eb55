//! Map tagged segments to synthesis voice parameters and markup.

use serde::Serialize;

use crate::config::{VoiceConfig, VoiceSettings};
use crate::types::{EmotionalTone, TaggedSegment};
use crate::voice::analysis::{analyze, TextAnalysis};
use crate::voice::markup::{annotate, Markup, MarkupDialect};

/// Share of emotional progression coming from narrative position.
const POSITION_WEIGHT: f64 = 0.7;
/// Share of emotional progression coming from the tone transition.
const TRANSITION_WEIGHT: f64 = 0.3;

/// Everything the synthesis client needs for one segment.
#[derive(Debug, Clone, Serialize)]
pub struct VoiceRequest {
    /// Position in the segment list
    pub index: usize,
    pub markup: Markup,
    pub settings: VoiceSettings,
    pub analysis: TextAnalysis,
    /// Transition from the previous segment's tone (ms)
    pub transition_ms: u32,
    pub emotional_progression: f64,
}

impl VoiceRequest {
    pub fn ssml(&self) -> String {
        self.markup.to_ssml()
    }

    pub fn render(&self, dialect: &dyn MarkupDialect) -> String {
        dialect.render(&self.markup)
    }
}

#[derive(Debug, Clone, Default)]
pub struct VoiceMapper {
    config: VoiceConfig,
}

impl VoiceMapper {
    pub fn new(config: VoiceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    /// Transition duration between two tones. Zero when the tone is unchanged.
    pub fn transition_ms(&self, from: EmotionalTone, to: EmotionalTone) -> u32 {
        if from == to {
            return 0;
        }
        self.config
            .transitions
            .iter()
            .find(|r| r.from == from && r.to == to)
            .map(|r| r.ms)
            .unwrap_or(self.config.default_transition_ms)
    }

    fn max_transition_ms(&self) -> u32 {
        self.config
            .transitions
            .iter()
            .map(|r| r.ms)
            .chain(std::iter::once(self.config.default_transition_ms))
            .max()
            .unwrap_or(0)
    }

    /// 0-1 score of how far the narrative has built, nudged by how abrupt
    /// the tone change into this segment is.
    pub fn emotional_progression(&self, index: usize, total: usize, transition_ms: u32) -> f64 {
        let position = if total > 1 {
            index as f64 / (total - 1) as f64
        } else {
            0.0
        };
        let max = self.max_transition_ms();
        let transition = if max > 0 {
            transition_ms as f64 / max as f64
        } else {
            0.0
        };
        (POSITION_WEIGHT * position + TRANSITION_WEIGHT * transition).clamp(0.0, 1.0)
    }

    /// Base settings for the tone, damped by intensity and boosted by progression.
    pub fn voice_settings(&self, tone: EmotionalTone, intensity: f64, progression: f64) -> VoiceSettings {
        let c = &self.config;
        let base = c.voice_settings.get(tone);
        let stability = (base.stability * (1.0 - intensity * c.stability_damping))
            .clamp(c.stability_range.0, c.stability_range.1);
        let expressiveness = (base.expressiveness + progression * c.progression_boost)
            .clamp(c.expressiveness_range.0, c.expressiveness_range.1);
        VoiceSettings::new(stability, expressiveness)
    }

    pub fn map_segment(
        &self,
        segment: &TaggedSegment,
        index: usize,
        total: usize,
        previous: Option<EmotionalTone>,
    ) -> VoiceRequest {
        let analysis = analyze(&segment.text, &self.config);
        let transition_ms = previous
            .map(|p| self.transition_ms(p, segment.emotional_tone))
            .unwrap_or(0);
        let progression = self.emotional_progression(index, total, transition_ms);
        let settings = self.voice_settings(segment.emotional_tone, analysis.intensity, progression);
        let markup = annotate(&segment.text, &analysis, &self.config);

        log::debug!(
            "Segment {}: {:?} mood={:?} intensity={:.2} stability={:.2} expressiveness={:.2}",
            index,
            segment.emotional_tone,
            analysis.mood,
            analysis.intensity,
            settings.stability,
            settings.expressiveness
        );

        VoiceRequest {
            index,
            markup,
            settings,
            analysis,
            transition_ms,
            emotional_progression: progression,
        }
    }

    /// Map every segment in order.
    pub fn map(&self, segments: &[TaggedSegment]) -> Vec<VoiceRequest> {
        let mut previous = None;
        segments
            .iter()
            .enumerate()
            .map(|(i, seg)| {
                let request = self.map_segment(seg, i, segments.len(), previous);
                previous = Some(seg.emotional_tone);
                request
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SpeechRate, Volume};
    use EmotionalTone::*;

    fn mapper() -> VoiceMapper {
        VoiceMapper::default()
    }

    fn seg(text: &str, tone: EmotionalTone) -> TaggedSegment {
        TaggedSegment::new(text, tone, SpeechRate::Default, Volume::Normal)
    }

    #[test]
    fn test_transition_table_lookup() {
        let m = mapper();
        assert_eq!(m.transition_ms(Climax, Whisper), 1500);
        assert_eq!(m.transition_ms(Whisper, Sensual), 800);
        assert_eq!(m.transition_ms(Soft, Soft), 0);
        // unlisted pair
        assert_eq!(m.transition_ms(Soft, Climax), 500);
    }

    #[test]
    fn test_every_pair_resolves() {
        let m = mapper();
        for from in EmotionalTone::ALL {
            for to in EmotionalTone::ALL {
                let ms = m.transition_ms(from, to);
                assert_eq!(ms == 0, from == to);
            }
        }
    }

    #[test]
    fn test_stability_damped_by_intensity() {
        let m = mapper();
        let calm = m.voice_settings(Whisper, 0.0, 0.0);
        let hot = m.voice_settings(Whisper, 1.0, 0.0);
        assert!((calm.stability - 0.75).abs() < 1e-12);
        assert!((hot.stability - 0.525).abs() < 1e-12);
    }

    #[test]
    fn test_settings_clamped() {
        let m = mapper();
        let s = m.voice_settings(Climax, 1.0, 1.0);
        assert_eq!(s.stability, 0.3);
        assert_eq!(s.expressiveness, 1.0);

        let s = m.voice_settings(Soft, 0.0, 0.0);
        assert!((s.expressiveness - 0.65).abs() < 1e-12);
        let s = m.voice_settings(Soft, 0.0, 1.0);
        assert!((s.expressiveness - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_progression_bounds() {
        let m = mapper();
        assert_eq!(m.emotional_progression(0, 1, 0), 0.0);
        assert!((m.emotional_progression(4, 5, 0) - 0.7).abs() < 1e-12);
        assert!((m.emotional_progression(4, 5, 1500) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_map_tracks_previous_tone() {
        let m = mapper();
        let requests = m.map(&[
            seg("Hush now.", Whisper),
            seg("Come closer.", Sensual),
            seg("Yes!", Sensual),
        ]);
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].transition_ms, 0);
        assert_eq!(requests[1].transition_ms, 800);
        assert_eq!(requests[2].transition_ms, 0);
        assert!(requests[2].emotional_progression > requests[0].emotional_progression);
        assert!(requests[1].ssml().starts_with("<speak>"));
    }
}
