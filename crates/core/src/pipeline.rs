//! End-to-end orchestration: tag, map, schedule, synthesize, mix.
//!
//! The tagging and synthesis providers are external services, so they come
//! in through [`SegmentTagger`] and [`Synthesizer`]. Segment placement is
//! decided by the schedule alone; the order in which synthesis responses
//! arrive has no effect on the timeline.

use crate::config::SegueConfig;
use crate::error::{BoxError, Error, Result};
use crate::mix::{MixInput, MixingEngine};
use crate::scheduler::Scheduler;
use crate::types::{MixedAudioResult, ScheduledSegment, TaggedSegment};
use crate::voice::{VoiceMapper, VoiceRequest};

/// Splits raw text into tagged segments.
pub trait SegmentTagger {
    fn tag(&self, text: &str) -> std::result::Result<Vec<TaggedSegment>, BoxError>;
}

/// Turns one voice request into encoded audio bytes.
pub trait Synthesizer {
    fn synthesize(&self, request: &VoiceRequest) -> std::result::Result<Vec<u8>, BoxError>;
}

impl<F> SegmentTagger for F
where
    F: Fn(&str) -> std::result::Result<Vec<TaggedSegment>, BoxError>,
{
    fn tag(&self, text: &str) -> std::result::Result<Vec<TaggedSegment>, BoxError> {
        self(text)
    }
}

impl<F> Synthesizer for F
where
    F: Fn(&VoiceRequest) -> std::result::Result<Vec<u8>, BoxError>,
{
    fn synthesize(&self, request: &VoiceRequest) -> std::result::Result<Vec<u8>, BoxError> {
        self(request)
    }
}

/// Voice requests and timeline for a segment list, before any audio exists.
#[derive(Debug, Clone)]
pub struct Plan {
    pub requests: Vec<VoiceRequest>,
    pub schedule: Vec<ScheduledSegment>,
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    mapper: VoiceMapper,
    scheduler: Scheduler,
    engine: MixingEngine,
}

impl Pipeline {
    pub fn new(mapper: VoiceMapper, scheduler: Scheduler, engine: MixingEngine) -> Self {
        Self {
            mapper,
            scheduler,
            engine,
        }
    }

    pub fn from_config(config: &SegueConfig) -> Self {
        Self::new(
            VoiceMapper::new(config.voice.clone()),
            Scheduler::new(config.schedule.clone()),
            MixingEngine::new(config.mix.clone()),
        )
    }

    pub fn plan(&self, segments: &[TaggedSegment]) -> Plan {
        Plan {
            requests: self.mapper.map(segments),
            schedule: self.scheduler.schedule(segments),
        }
    }

    /// Tag `text` and render it to a single mixed track.
    pub fn generate(
        &self,
        text: &str,
        tagger: &dyn SegmentTagger,
        synth: &dyn Synthesizer,
    ) -> Result<MixedAudioResult> {
        let segments = tagger.tag(text).map_err(Error::Tagging)?;
        log::info!("Tagged {} segment(s)", segments.len());
        self.generate_from_segments(&segments, synth)
    }

    /// Render already-tagged segments to a single mixed track.
    pub fn generate_from_segments(
        &self,
        segments: &[TaggedSegment],
        synth: &dyn Synthesizer,
    ) -> Result<MixedAudioResult> {
        if segments.is_empty() {
            return Err(Error::EmptyInput);
        }

        let Plan { requests, schedule } = self.plan(segments);

        let mut inputs = Vec::with_capacity(schedule.len());
        for (request, scheduled) in requests.iter().zip(schedule) {
            log::debug!(
                "Synthesizing segment {} ({:?}, {} chars)",
                request.index,
                scheduled.segment.emotional_tone,
                scheduled.segment.text.chars().count()
            );
            let audio = synth
                .synthesize(request)
                .map_err(|source| Error::Synthesis {
                    segment: request.index,
                    source,
                })?;
            inputs.push(MixInput::new(scheduled, audio));
        }

        log::info!("Synthesized {} segment(s), mixing", inputs.len());
        self.engine.mix(inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode::decode_audio;
    use crate::audio::encode::encode_wav;
    use crate::config::{MixConfig, ScheduleConfig};
    use crate::types::{EmotionalTone, SpeechRate, Volume};
    use std::cell::RefCell;

    const SR: u32 = 8000;

    fn pipeline() -> Pipeline {
        Pipeline::new(
            VoiceMapper::default(),
            Scheduler::new(ScheduleConfig::default()),
            MixingEngine::new(MixConfig {
                sample_rate: SR,
                ..MixConfig::default()
            }),
        )
    }

    fn seg(text: &str, tone: EmotionalTone) -> TaggedSegment {
        TaggedSegment::new(text, tone, SpeechRate::Moderate, Volume::Normal)
    }

    /// Emits a constant tone whose length matches the request's text at
    /// 15 chars/s, so the audio roughly fills its scheduled slot.
    fn tone_synth(request: &VoiceRequest) -> std::result::Result<Vec<u8>, BoxError> {
        let secs = request.markup.text().chars().count() as f64 / 15.0;
        let frames = (secs * SR as f64) as usize;
        Ok(encode_wav(&[vec![0.3; frames], vec![0.3; frames]], SR)?)
    }

    #[test]
    fn test_generate_from_segments_mixes_all() {
        let segments = vec![
            seg("Come a little closer.", EmotionalTone::Whisper),
            seg("Now tell me everything.", EmotionalTone::Sensual),
            seg("YES!", EmotionalTone::Climax),
        ];
        let result = pipeline()
            .generate_from_segments(&segments, &tone_synth)
            .unwrap();

        assert_eq!(result.segments.len(), 3);
        let last = &result.segments[2];
        assert!(result.duration >= last.start_time);

        let decoded = decode_audio(result.audio.bytes(), 0).unwrap();
        assert_eq!(decoded.sample_rate, SR);
        assert_eq!(decoded.channel_count(), 2);
    }

    #[test]
    fn test_generate_uses_tagger() {
        let tagger = |text: &str| -> std::result::Result<Vec<TaggedSegment>, BoxError> {
            Ok(text
                .split('|')
                .map(|part| seg(part.trim(), EmotionalTone::Soft))
                .collect())
        };
        let result = pipeline()
            .generate("Hello there. | Goodbye now.", &tagger, &tone_synth)
            .unwrap();
        assert_eq!(result.segments.len(), 2);
        assert_eq!(result.segments[1].segment.text, "Goodbye now.");
    }

    #[test]
    fn test_tagging_failure() {
        let tagger = |_: &str| -> std::result::Result<Vec<TaggedSegment>, BoxError> {
            Err("tagging service unavailable".into())
        };
        let err = pipeline().generate("anything", &tagger, &tone_synth).unwrap_err();
        assert!(matches!(err, Error::Tagging(_)));
    }

    #[test]
    fn test_synthesis_failure_reports_segment() {
        let synth = |request: &VoiceRequest| -> std::result::Result<Vec<u8>, BoxError> {
            if request.index == 1 {
                Err("rate limited".into())
            } else {
                tone_synth(request)
            }
        };
        let segments = vec![
            seg("First line.", EmotionalTone::Soft),
            seg("Second line.", EmotionalTone::Soft),
        ];
        let err = pipeline().generate_from_segments(&segments, &synth).unwrap_err();
        assert!(matches!(err, Error::Synthesis { segment: 1, .. }));
    }

    #[test]
    fn test_empty_segments_rejected_before_synthesis() {
        let calls = RefCell::new(0);
        let synth = |request: &VoiceRequest| -> std::result::Result<Vec<u8>, BoxError> {
            *calls.borrow_mut() += 1;
            tone_synth(request)
        };
        let err = pipeline().generate_from_segments(&[], &synth).unwrap_err();
        assert!(matches!(err, Error::EmptyInput));
        assert_eq!(*calls.borrow(), 0);
    }

    #[test]
    fn test_synthesis_follows_schedule_order() {
        let seen = RefCell::new(Vec::new());
        let synth = |request: &VoiceRequest| -> std::result::Result<Vec<u8>, BoxError> {
            seen.borrow_mut().push(request.index);
            tone_synth(request)
        };
        let segments = vec![
            seg("One.", EmotionalTone::Soft),
            seg("Two.", EmotionalTone::Soft),
            seg("Three.", EmotionalTone::Soft),
        ];
        pipeline().generate_from_segments(&segments, &synth).unwrap();
        assert_eq!(*seen.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_plan_aligns_requests_with_schedule() {
        let segments = vec![
            seg("Hush.", EmotionalTone::Whisper),
            seg("Louder now!", EmotionalTone::Excited),
        ];
        let plan = pipeline().plan(&segments);
        assert_eq!(plan.requests.len(), plan.schedule.len());
        assert_eq!(plan.requests[1].transition_ms, 1000);
        assert_eq!(plan.schedule[0].start_time, 0.0);
    }
}
