//! Audio output as an explicit resource handle.
//!
//! [`PlaybackDevice`] owns the rodio output stream and a master gain. Every
//! loaded track lives on its own sink; `load` releases all existing sinks
//! first so a new result never plays over a stale one. A
//! [`PlaybackSession`] resumes output for its lifetime and stops every
//! source when dropped.

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink};

use crate::audio::decode::decode_audio;
use crate::error::{Error, Result};
use crate::types::{DecodedAudioBuffer, MixedAudioResult};

/// Interleave a planar buffer into f32 frames for rodio.
pub fn interleave_f32(buffer: &DecodedAudioBuffer) -> Vec<f32> {
    let n_channels = buffer.channel_count();
    let mut out = Vec::with_capacity(buffer.len() * n_channels);
    for frame in 0..buffer.len() {
        for ch in &buffer.channels {
            out.push(ch.get(frame).copied().unwrap_or(0.0) as f32);
        }
    }
    out
}

pub struct PlaybackDevice {
    // Must outlive every sink created from `handle`.
    _stream: OutputStream,
    handle: OutputStreamHandle,
    master_gain: f32,
    sinks: Vec<Sink>,
}

impl PlaybackDevice {
    /// Open the default output device.
    pub fn open() -> Result<Self> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| Error::Resource(e.to_string()))?;
        log::info!("Audio output device opened");
        Ok(Self {
            _stream: stream,
            handle,
            master_gain: 1.0,
            sinks: Vec::new(),
        })
    }

    /// Replace whatever is loaded with `result`. The new track starts paused.
    pub fn load(&mut self, result: &MixedAudioResult) -> Result<()> {
        self.stop_all();

        let decoded = decode_audio(result.audio.bytes(), 0)?;
        let source = SamplesBuffer::new(
            decoded.channel_count() as u16,
            decoded.sample_rate,
            interleave_f32(&decoded),
        );

        let sink = Sink::try_new(&self.handle).map_err(|e| Error::Resource(e.to_string()))?;
        sink.pause();
        sink.set_volume(self.master_gain);
        sink.append(source);
        self.sinks.push(sink);

        log::debug!(
            "Loaded track {} ({:.2}s, {} ch @ {} Hz)",
            result.audio.id,
            result.duration,
            decoded.channel_count(),
            decoded.sample_rate
        );
        Ok(())
    }

    pub fn resume(&self) {
        for sink in &self.sinks {
            sink.play();
        }
    }

    pub fn suspend(&self) {
        for sink in &self.sinks {
            sink.pause();
        }
    }

    /// Stop and release every source.
    pub fn stop_all(&mut self) {
        if !self.sinks.is_empty() {
            log::debug!("Releasing {} playback source(s)", self.sinks.len());
        }
        for sink in self.sinks.drain(..) {
            sink.stop();
        }
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    pub fn set_master_gain(&mut self, gain: f32) {
        self.master_gain = gain.max(0.0);
        for sink in &self.sinks {
            sink.set_volume(self.master_gain);
        }
    }

    /// Sources currently held by the device.
    pub fn active_sources(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_playing(&self) -> bool {
        self.sinks.iter().any(|s| !s.is_paused() && !s.empty())
    }

    /// Resume output until the returned guard is dropped.
    pub fn session(&mut self) -> PlaybackSession<'_> {
        self.resume();
        PlaybackSession { device: self }
    }
}

impl Drop for PlaybackDevice {
    fn drop(&mut self) {
        self.stop_all();
    }
}

/// Scoped playback. Dropping it releases all sources.
pub struct PlaybackSession<'a> {
    device: &'a mut PlaybackDevice,
}

impl PlaybackSession<'_> {
    /// Block until every loaded source has finished.
    pub fn wait(&self) {
        for sink in &self.device.sinks {
            sink.sleep_until_end();
        }
    }

    pub fn pause(&self) {
        self.device.suspend();
    }

    pub fn resume(&self) {
        self.device.resume();
    }

    pub fn is_playing(&self) -> bool {
        self.device.is_playing()
    }
}

impl Drop for PlaybackSession<'_> {
    fn drop(&mut self) {
        self.device.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::encode::encode_wav;
    use crate::types::AudioHandle;

    #[test]
    fn test_interleave_stereo() {
        let buf = DecodedAudioBuffer {
            sample_rate: 8000,
            channels: vec![vec![0.1, 0.2], vec![-0.1, -0.2]],
        };
        assert_eq!(interleave_f32(&buf), vec![0.1f32, -0.1, 0.2, -0.2]);
    }

    #[test]
    fn test_interleave_mono_passthrough() {
        let buf = DecodedAudioBuffer::mono(vec![0.25, 0.5, 0.75], 8000);
        assert_eq!(interleave_f32(&buf), vec![0.25f32, 0.5, 0.75]);
    }

    /// Only exercises the device when one is available; otherwise the open
    /// must fail with a resource error rather than panic.
    #[test]
    fn test_load_replaces_previous_sources() {
        let mut device = match PlaybackDevice::open() {
            Ok(d) => d,
            Err(e) => {
                assert!(matches!(e, Error::Resource(_)));
                return;
            }
        };

        let bytes = encode_wav(&[vec![0.0; 800], vec![0.0; 800]], 8000).unwrap();
        let result = MixedAudioResult {
            audio: AudioHandle::new(bytes),
            duration: 0.1,
            segments: vec![],
        };

        device.load(&result).unwrap();
        device.load(&result).unwrap();
        assert_eq!(device.active_sources(), 1);
        assert!(!device.is_playing());

        device.set_master_gain(-1.0);
        assert_eq!(device.master_gain(), 0.0);

        {
            let _session = device.session();
        }
        assert_eq!(device.active_sources(), 0);
    }
}
