//! Per-segment gain envelope and a block iterator over shaped samples.
//!
//! The envelope is the segment volume times a linear fade-in ramp
//! `s / (fade_in * rate)` for `s < fade_in * rate` and a linear fade-out
//! ramp `(len - s) / (fade_out * rate)` for `s > len - fade_out * rate`.
//! [`Blocks`] walks a decoded buffer in fixed-size blocks and yields stereo
//! frames with the envelope applied, so the mixer only deals with offsets.

use crate::types::{DecodedAudioBuffer, MIX_CHANNELS};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainEnvelope {
    gain: f64,
    fade_in_samples: f64,
    fade_out_samples: f64,
    len: usize,
}

impl GainEnvelope {
    /// `len` is the segment buffer length in frames.
    pub fn new(gain: f64, fade_in_s: f64, fade_out_s: f64, sample_rate: u32, len: usize) -> Self {
        let sr = sample_rate as f64;
        Self {
            gain,
            fade_in_samples: fade_in_s.max(0.0) * sr,
            fade_out_samples: fade_out_s.max(0.0) * sr,
            len,
        }
    }

    pub fn gain_at(&self, s: usize) -> f64 {
        let s = s as f64;
        let len = self.len as f64;
        let mut gain = self.gain;
        if self.fade_in_samples > 0.0 && s < self.fade_in_samples {
            gain *= s / self.fade_in_samples;
        }
        if self.fade_out_samples > 0.0 && s > len - self.fade_out_samples {
            gain *= (len - s) / self.fade_out_samples;
        }
        gain
    }
}

/// A run of consecutive shaped frames starting at `offset` within the
/// segment buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub offset: usize,
    pub frames: Vec<[f64; MIX_CHANNELS]>,
}

/// Iterator over envelope-shaped stereo blocks of a decoded buffer.
pub struct Blocks<'a> {
    buffer: &'a DecodedAudioBuffer,
    envelope: GainEnvelope,
    block_size: usize,
    pos: usize,
}

impl<'a> Blocks<'a> {
    pub fn new(buffer: &'a DecodedAudioBuffer, envelope: GainEnvelope, block_size: usize) -> Self {
        Self {
            buffer,
            envelope,
            block_size: block_size.max(1),
            pos: 0,
        }
    }
}

impl Iterator for Blocks<'_> {
    type Item = Block;

    fn next(&mut self) -> Option<Block> {
        let len = self.buffer.len();
        if self.pos >= len {
            return None;
        }
        let start = self.pos;
        let end = (start + self.block_size).min(len);
        self.pos = end;

        let sources: [&[f64]; MIX_CHANNELS] = [
            self.buffer.channel_for_output(0),
            self.buffer.channel_for_output(1),
        ];
        let frames = (start..end)
            .map(|s| {
                let gain = self.envelope.gain_at(s);
                sources.map(|src| src.get(s).copied().unwrap_or(0.0) * gain)
            })
            .collect();

        Some(Block {
            offset: start,
            frames,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buffer.len().saturating_sub(self.pos);
        let n = remaining.div_ceil(self.block_size);
        (n, Some(n))
    }
}
