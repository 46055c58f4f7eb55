//! Timeline scheduling: tagged segments to start times, durations and fades.
//!
//! A single fold over the ordered segment list. Consecutive segments are
//! planned to overlap by the crossfade window; the mixer resolves the
//! overlap with additive blending and fades.

use crate::config::ScheduleConfig;
use crate::types::{ScheduledSegment, TaggedSegment};
use crate::voice::analysis::pause_count;

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    config: ScheduleConfig,
}

impl Scheduler {
    pub fn new(config: ScheduleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    /// Estimated spoken duration of one segment in seconds.
    pub fn estimate_duration(&self, segment: &TaggedSegment) -> f64 {
        let cps = self.config.chars_per_second.get(segment.speech_rate);
        let chars = segment.text.chars().count() as f64;
        let speech = if cps > 0.0 { chars / cps } else { 0.0 };
        let pauses = pause_count(&segment.text) as f64 * self.config.pause_seconds;
        (speech + pauses).max(self.config.min_segment_duration)
    }

    /// Place every segment on the timeline, in text order.
    pub fn schedule(&self, segments: &[TaggedSegment]) -> Vec<ScheduledSegment> {
        let mut current_time = 0.0;
        let last = segments.len().saturating_sub(1);

        let scheduled: Vec<ScheduledSegment> = segments
            .iter()
            .enumerate()
            .map(|(i, segment)| {
                let duration = self.estimate_duration(segment);
                let placed = ScheduledSegment {
                    segment: segment.clone(),
                    start_time: current_time,
                    duration,
                    fade_in: segment.fade_in.unwrap_or(self.config.default_fade_in),
                    fade_out: Some(segment.fade_out.unwrap_or(self.config.default_fade_out)),
                };
                if i < last {
                    current_time += (duration - self.config.crossfade).max(0.0);
                }
                placed
            })
            .collect();

        if let Some(end) = scheduled.iter().map(ScheduledSegment::end_time).reduce(f64::max) {
            log::info!("Scheduled {} segments over {:.2}s", scheduled.len(), end);
        }
        scheduled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EmotionalTone, SpeechRate, Volume};

    fn seg(text: &str, rate: SpeechRate) -> TaggedSegment {
        TaggedSegment::new(text, EmotionalTone::Soft, rate, Volume::Normal)
    }

    #[test]
    fn test_duration_estimate() {
        let s = Scheduler::default();
        // 30 chars at 15 cps, no pauses
        let d = s.estimate_duration(&seg(&"a".repeat(30), SpeechRate::Moderate));
        assert!((d - 2.0).abs() < 1e-12);
        // 20 chars at 10 cps + 3 pauses * 0.3
        let d = s.estimate_duration(&seg("Slow down. Breathe!!", SpeechRate::VerySlow));
        assert_eq!("Slow down. Breathe!!".chars().count(), 20);
        assert!((d - 2.9).abs() < 1e-12, "d={}", d);
    }

    #[test]
    fn test_empty_text_gets_positive_duration() {
        let s = Scheduler::default();
        assert!(s.estimate_duration(&seg("", SpeechRate::Fast)) > 0.0);
    }

    #[test]
    fn test_single_segment() {
        let s = Scheduler::default();
        let out = s.schedule(&[seg("just one", SpeechRate::Default)]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].start_time, 0.0);
        assert_eq!(out[0].fade_in, 0.15);
        assert_eq!(out[0].fade_out, Some(0.2));
    }

    #[test]
    fn test_empty_input() {
        assert!(Scheduler::default().schedule(&[]).is_empty());
    }

    #[test]
    fn test_start_times_advance_by_duration_minus_crossfade() {
        let s = Scheduler::default();
        let segments: Vec<_> = [26, 39, 13, 52]
            .iter()
            .map(|&n| seg(&"x".repeat(n), SpeechRate::Default))
            .collect();
        let out = s.schedule(&segments);
        for pair in out.windows(2) {
            let delta = pair[1].start_time - pair[0].start_time;
            assert!(
                (delta - (pair[0].duration - 0.3)).abs() < 1e-12,
                "delta={} duration={}",
                delta,
                pair[0].duration
            );
        }
    }

    #[test]
    fn test_start_times_non_decreasing_for_short_segments() {
        let s = Scheduler::default();
        let out = s.schedule(&[seg("hi", SpeechRate::Fast), seg("yo", SpeechRate::Fast), seg("ok", SpeechRate::Fast)]);
        for pair in out.windows(2) {
            assert!(pair[1].start_time >= pair[0].start_time);
        }
    }

    #[test]
    fn test_segment_fade_overrides() {
        let s = Scheduler::default();
        let mut a = seg("first part of it", SpeechRate::Slow);
        a.fade_in = Some(0.0);
        a.fade_out = Some(0.6);
        let out = s.schedule(&[a, seg("second", SpeechRate::Slow)]);
        assert_eq!(out[0].fade_in, 0.0);
        assert_eq!(out[0].fade_out, Some(0.6));
        assert_eq!(out[1].fade_in, 0.15);
    }

    #[test]
    fn test_custom_crossfade() {
        let s = Scheduler::new(ScheduleConfig {
            crossfade: 0.0,
            ..ScheduleConfig::default()
        });
        let out = s.schedule(&[seg(&"x".repeat(26), SpeechRate::Default), seg("y", SpeechRate::Default)]);
        assert!((out[1].start_time - 2.0).abs() < 1e-12);
    }
}
