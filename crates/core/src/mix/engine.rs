//! Mix scheduled segment audio into one normalized stereo track.

use log::{debug, info};

use crate::audio::decode::{decode_audio, resample};
use crate::audio::encode::encode_mix;
use crate::config::MixConfig;
use crate::error::{Error, Result};
use crate::mix::envelope::{Blocks, GainEnvelope};
use crate::types::{AudioHandle, DecodedAudioBuffer, MixBuffer, MixedAudioResult, ScheduledSegment};

/// One segment's placement plus the raw bytes returned by synthesis.
#[derive(Debug, Clone)]
pub struct MixInput {
    pub segment: ScheduledSegment,
    pub audio: Vec<u8>,
}

impl MixInput {
    pub fn new(segment: ScheduledSegment, audio: Vec<u8>) -> Self {
        Self { segment, audio }
    }
}

/// Normalized mix before encoding.
#[derive(Debug, Clone)]
pub struct RenderedMix {
    pub buffer: MixBuffer,
    /// Latest segment end time (s)
    pub duration: f64,
    /// Segments in mix order
    pub segments: Vec<ScheduledSegment>,
    /// Normalization gain, if one was applied
    pub normalization_gain: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct MixingEngine {
    config: MixConfig,
}

impl MixingEngine {
    pub fn new(config: MixConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MixConfig {
        &self.config
    }

    /// Mix all segments and encode the result as WAV.
    ///
    /// A single segment is returned verbatim: no decode, no normalization.
    /// Any decode failure aborts the whole mix.
    pub fn mix(&self, mut inputs: Vec<MixInput>) -> Result<MixedAudioResult> {
        match inputs.len() {
            0 => Err(Error::EmptyInput),
            1 => {
                let MixInput { segment, audio } = inputs.remove(0);
                info!("Single segment, passing audio through ({} bytes)", audio.len());
                Ok(MixedAudioResult {
                    audio: AudioHandle::new(audio),
                    duration: segment.duration,
                    segments: vec![segment],
                })
            }
            _ => {
                let rendered = self.render(inputs)?;
                let bytes = encode_mix(&rendered.buffer)?;
                info!(
                    "Encoded {:.2}s mix ({} bytes)",
                    rendered.duration,
                    bytes.len()
                );
                Ok(MixedAudioResult {
                    audio: AudioHandle::new(bytes),
                    duration: rendered.duration,
                    segments: rendered.segments,
                })
            }
        }
    }

    /// Decode every segment, then mix and normalize. Nothing is mixed until
    /// all segments decoded successfully.
    pub fn render(&self, inputs: Vec<MixInput>) -> Result<RenderedMix> {
        if inputs.is_empty() {
            return Err(Error::EmptyInput);
        }

        let mut tracks = Vec::with_capacity(inputs.len());
        for (i, input) in inputs.into_iter().enumerate() {
            tracks.push((input.segment, decode_audio(&input.audio, i)?));
        }

        self.mix_buffers(tracks)
    }

    /// Mix already-decoded buffers and normalize. Buffers at another rate
    /// are resampled to the engine rate first.
    pub fn mix_buffers(
        &self,
        tracks: Vec<(ScheduledSegment, DecodedAudioBuffer)>,
    ) -> Result<RenderedMix> {
        if tracks.is_empty() {
            return Err(Error::EmptyInput);
        }

        let sr = self.config.sample_rate;
        let mut tracks = tracks
            .into_iter()
            .enumerate()
            .map(|(i, (segment, audio))| -> Result<(ScheduledSegment, DecodedAudioBuffer)> {
                if audio.sample_rate == sr {
                    return Ok((segment, audio));
                }
                debug!("Segment {}: resampling {} Hz -> {} Hz", i, audio.sample_rate, sr);
                Ok((segment, resample(audio, sr)?))
            })
            .collect::<Result<Vec<_>>>()?;

        // Stable: ties keep input order.
        tracks.sort_by(|a, b| a.0.start_time.total_cmp(&b.0.start_time));

        let duration = tracks
            .iter()
            .map(|(s, _)| s.end_time())
            .fold(0.0f64, f64::max);
        let frames = (duration * sr as f64).ceil() as usize;
        let mut buffer = MixBuffer::new(sr, frames);

        info!(
            "Mixing {} segments into {:.2}s ({} frames @ {} Hz)",
            tracks.len(),
            duration,
            frames,
            sr
        );

        let last = tracks.len() - 1;
        for (i, (segment, audio)) in tracks.iter().enumerate() {
            let fade_out = self.effective_fade_out(segment, i == last);
            let gain = self.config.volume_gains.get(segment.segment.volume);
            let envelope = GainEnvelope::new(gain, segment.fade_in, fade_out, sr, audio.len());
            let start_sample = (segment.start_time * sr as f64).floor() as usize;

            debug!(
                "Segment {}: start={:.3}s ({}), {} frames, gain={:.2}, fade in/out={:.3}/{:.3}s",
                i,
                segment.start_time,
                start_sample,
                audio.len(),
                gain,
                segment.fade_in,
                fade_out
            );

            accumulate(&mut buffer, audio, envelope, start_sample, self.config.block_size);
        }

        let normalization_gain = buffer.normalize(self.config.normalization_target);
        if let Some(g) = normalization_gain {
            info!("Normalized mix peak to {:.2} (gain {:.3})", self.config.normalization_target, g);
        }

        Ok(RenderedMix {
            buffer,
            duration,
            segments: tracks.into_iter().map(|(s, _)| s).collect(),
            normalization_gain,
        })
    }

    /// The segment's own fade-out wins; otherwise every segment but the
    /// last gets a crossfade tail of `min(max_crossfade, duration * ratio)`.
    pub fn effective_fade_out(&self, segment: &ScheduledSegment, is_last: bool) -> f64 {
        match segment.fade_out {
            Some(f) => f,
            None if !is_last => self
                .config
                .max_crossfade
                .min(segment.duration * self.config.crossfade_ratio),
            None => 0.0,
        }
    }
}

/// Add a shaped segment into the mix. Frames past the end are skipped.
fn accumulate(
    buffer: &mut MixBuffer,
    audio: &DecodedAudioBuffer,
    envelope: GainEnvelope,
    start_sample: usize,
    block_size: usize,
) {
    let len = buffer.len();
    for block in Blocks::new(audio, envelope, block_size) {
        for (j, frame) in block.frames.iter().enumerate() {
            let idx = start_sample + block.offset + j;
            if idx >= len {
                return;
            }
            for (ch, &sample) in frame.iter().enumerate() {
                buffer.channels[ch][idx] += sample;
            }
        }
    }
}
