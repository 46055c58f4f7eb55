//! Encode planar float samples as a 16-bit PCM WAV file in memory.
//!
//! Layout: 44-byte header (`RIFF` size, `WAVE`, 16-byte `fmt ` PCM chunk,
//! `data` size) followed by interleaved little-endian i16 samples.

use std::io::Cursor;

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::error::Result;
use crate::types::MixBuffer;

/// Size of the canonical PCM header in bytes.
pub const WAV_HEADER_LEN: usize = 44;

/// Convert one float sample: clamp to [-1, 1], scale by 32767, truncate.
pub fn to_i16(sample: f64) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0) as i16
}

/// Encode planar channels (equal length) as a 16-bit PCM WAV.
pub fn encode_wav(channels: &[Vec<f64>], sample_rate: u32) -> Result<Vec<u8>> {
    let n_channels = channels.len().max(1);
    let frames = channels.first().map(Vec::len).unwrap_or(0);

    let spec = WavSpec {
        channels: n_channels as u16,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(WAV_HEADER_LEN + frames * n_channels * 2));
    {
        let mut writer = WavWriter::new(&mut cursor, spec)?;
        for frame in 0..frames {
            for ch in 0..n_channels {
                let sample = channels
                    .get(ch)
                    .and_then(|c| c.get(frame))
                    .copied()
                    .unwrap_or(0.0);
                writer.write_sample(to_i16(sample))?;
            }
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

/// Encode a mixed stereo buffer.
pub fn encode_mix(buffer: &MixBuffer) -> Result<Vec<u8>> {
    encode_wav(&buffer.channels, buffer.sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32_at(bytes: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
    }

    fn u16_at(bytes: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([bytes[at], bytes[at + 1]])
    }

    #[test]
    fn test_silence_size_and_header() {
        let len = 1000;
        let buf = MixBuffer::new(44100, len);
        let bytes = encode_mix(&buf).unwrap();

        assert_eq!(bytes.len(), 44 + len * 2 * 2);
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(u32_at(&bytes, 4) as usize, bytes.len() - 8);
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(u32_at(&bytes, 16), 16); // fmt chunk size
        assert_eq!(u16_at(&bytes, 20), 1); // PCM
        assert_eq!(u16_at(&bytes, 22), 2); // channels
        assert_eq!(u32_at(&bytes, 24), 44100);
        assert_eq!(u32_at(&bytes, 28), 44100 * 4); // byte rate
        assert_eq!(u16_at(&bytes, 32), 4); // block align
        assert_eq!(u16_at(&bytes, 34), 16); // bits per sample
        assert_eq!(&bytes[36..40], b"data");
        assert_eq!(u32_at(&bytes, 40) as usize, len * 2 * 2);
    }

    #[test]
    fn test_silence_reads_back_as_zeros() {
        let len = 512;
        let bytes = encode_mix(&MixBuffer::new(44100, len)).unwrap();

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 44100);
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), len * 2);
        assert!(samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_samples_interleaved_and_clamped() {
        let mut buf = MixBuffer::new(8000, 3);
        buf.channels[0] = vec![0.5, 2.0, -0.25];
        buf.channels[1] = vec![-0.5, -3.0, 1.0];
        let bytes = encode_mix(&buf).unwrap();

        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(
            samples,
            vec![16383, -16383, 32767, -32767, -8191, 32767]
        );
    }

    #[test]
    fn test_to_i16_truncates() {
        assert_eq!(to_i16(0.0), 0);
        assert_eq!(to_i16(1.0), 32767);
        assert_eq!(to_i16(-1.0), -32767);
        assert_eq!(to_i16(0.9), 29490);
    }

    #[test]
    fn test_empty_buffer_is_header_only() {
        let bytes = encode_mix(&MixBuffer::new(44100, 0)).unwrap();
        assert_eq!(bytes.len(), WAV_HEADER_LEN);
        assert_eq!(u32_at(&bytes, 40), 0);
    }
}
