//! Decode synthesized audio bytes into planar sample buffers.
//!
//! Supports WAV, MP3 and MP4/AAC via symphonia. Buffers at a different rate
//! than the engine are brought over with rubato.

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::{Error, Result};
use crate::types::DecodedAudioBuffer;

/// Decode an in-memory audio file. `segment` labels any decode error.
pub fn decode_audio(bytes: &[u8], segment: usize) -> Result<DecodedAudioBuffer> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| Error::decode(segment, format!("unsupported format: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| Error::decode(segment, "no audio track found"))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channel_count = track.codec_params.channels.map(|c| c.count());

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| Error::decode(segment, format!("unsupported codec: {}", e)))?;

    let mut channels: Vec<Vec<f64>> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphError::ResetRequired) => break,
            Err(e) => return Err(Error::decode(segment, e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let num_frames = decoded.frames();
                let n_channels = spec.channels.count().max(1);
                sample_rate.get_or_insert(spec.rate);
                channel_count.get_or_insert(n_channels);
                if channels.is_empty() {
                    channels = vec![Vec::new(); n_channels];
                }

                let mut sample_buf = SampleBuffer::<f64>::new(num_frames as u64, spec);
                sample_buf.copy_interleaved_ref(decoded);
                for frame in sample_buf.samples().chunks(n_channels) {
                    for (ch, &s) in frame.iter().enumerate().take(channels.len()) {
                        channels[ch].push(s);
                    }
                }
            }
            Err(e) => return Err(packet_failure(segment, e)),
        }
    }

    if channels.iter().all(Vec::is_empty) {
        return Err(Error::decode(segment, "no audio decoded"));
    }

    let sample_rate = sample_rate.ok_or_else(|| Error::decode(segment, "unknown sample rate"))?;
    log::debug!(
        "Segment {}: decoded {} frames, {} ch @ {} Hz",
        segment,
        channels[0].len(),
        channel_count.unwrap_or(channels.len()),
        sample_rate
    );

    Ok(DecodedAudioBuffer {
        sample_rate,
        channels,
    })
}

/// A packet the decoder rejects fails the whole segment.
fn packet_failure(segment: usize, err: SymphError) -> Error {
    match err {
        SymphError::DecodeError(reason) => {
            Error::decode(segment, format!("corrupt packet: {}", reason))
        }
        other => Error::decode(segment, other),
    }
}

/// Frames fed to the resampler per call.
const RESAMPLE_CHUNK: usize = 1024;

/// Resample every channel to `to_sr`.
///
/// The output holds exactly `round(len * to_sr / from_sr)` frames: the
/// filter delay is trimmed from the front and the tail is flushed.
pub fn resample(buffer: DecodedAudioBuffer, to_sr: u32) -> Result<DecodedAudioBuffer> {
    if buffer.sample_rate == to_sr || buffer.is_empty() {
        return Ok(DecodedAudioBuffer {
            sample_rate: to_sr,
            channels: buffer.channels,
        });
    }

    use rubato::{
        Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType,
        WindowFunction,
    };

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_sr as f64 / buffer.sample_rate as f64;
    let n_channels = buffer.channel_count();
    let len = buffer.len();
    let expected = (len as f64 * ratio).round() as usize;

    let mut resampler =
        SincFixedIn::<f64>::new(ratio, 2.0, params, RESAMPLE_CHUNK, n_channels)
            .map_err(|e| Error::Resample(e.to_string()))?;
    let delay = resampler.output_delay();

    let mut out: Vec<Vec<f64>> = vec![Vec::with_capacity(expected + delay); n_channels];
    let append = |out: &mut Vec<Vec<f64>>, block: Vec<Vec<f64>>| {
        for (dst, src) in out.iter_mut().zip(block) {
            dst.extend(src);
        }
    };

    let mut pos = 0;
    while len - pos >= resampler.input_frames_next() {
        let next = resampler.input_frames_next();
        let chunk: Vec<&[f64]> = buffer.channels.iter().map(|c| &c[pos..pos + next]).collect();
        let block = resampler
            .process(chunk.as_slice(), None)
            .map_err(|e| Error::Resample(e.to_string()))?;
        append(&mut out, block);
        pos += next;
    }

    if pos < len {
        let tail: Vec<&[f64]> = buffer.channels.iter().map(|c| &c[pos..]).collect();
        let block = resampler
            .process_partial(Some(tail.as_slice()), None)
            .map_err(|e| Error::Resample(e.to_string()))?;
        append(&mut out, block);
    }

    // Flush the filter with silence until the delayed tail is out.
    while out[0].len() < expected + delay {
        let block = resampler
            .process_partial(None::<&[Vec<f64>]>, None)
            .map_err(|e| Error::Resample(e.to_string()))?;
        if block.first().map_or(true, Vec::is_empty) {
            break;
        }
        append(&mut out, block);
    }

    for ch in &mut out {
        ch.drain(..delay.min(ch.len()));
        ch.truncate(expected);
    }

    Ok(DecodedAudioBuffer {
        sample_rate: to_sr,
        channels: out,
    })
}
