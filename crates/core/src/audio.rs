use crate::error::SupertonicError;
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::Cursor;
use std::path::Path;

// ============================================================================
// WAV File I/O (SPEC_FULL §4.8)
// ============================================================================

fn wav_spec(sample_rate: i32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate: sample_rate as u32,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

fn quantize(sample: f32) -> i16 {
    let clamped = sample.max(-1.0).min(1.0);
    (clamped * 32767.0) as i16
}

pub fn write_wav_file<P: AsRef<Path>>(
    filename: P,
    audio_data: &[f32],
    sample_rate: i32,
) -> Result<(), SupertonicError> {
    let mut writer = WavWriter::create(filename, wav_spec(sample_rate))?;

    for &sample in audio_data {
        writer.write_sample(quantize(sample))?;
    }

    writer.finalize()?;
    Ok(())
}

/// Encode a waveform into an in-memory RIFF/WAVE byte buffer — the shape the
/// synthesis façade returns to callers (SPEC_FULL §4.8, §4.9) instead of a
/// file path.
pub fn encode_wav(audio_data: &[f32], sample_rate: i32) -> Result<Vec<u8>, SupertonicError> {
    let buffer = Cursor::new(Vec::new());
    let mut writer = WavWriter::new(buffer, wav_spec(sample_rate))?;

    for &sample in audio_data {
        writer.write_sample(quantize(sample))?;
    }

    let cursor = writer.into_inner()?;
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_wav_produces_canonical_header() {
        let samples = [0.0f32, 0.5, -0.5, 1.0, -1.0];
        let bytes = encode_wav(&samples, 24_000).unwrap();

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(u16::from_le_bytes([bytes[20], bytes[21]]), 1); // PCM
        assert_eq!(u16::from_le_bytes([bytes[22], bytes[23]]), 1); // mono
        assert_eq!(
            u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]),
            24_000
        );
        assert_eq!(u16::from_le_bytes([bytes[34], bytes[35]]), 16); // bits/sample
        assert_eq!(&bytes[36..40], b"data");

        let data_size = u32::from_le_bytes([bytes[40], bytes[41], bytes[42], bytes[43]]);
        assert_eq!(data_size as usize, samples.len() * 2);
        assert_eq!(bytes.len(), 44 + samples.len() * 2);
    }

    #[test]
    fn encode_wav_clamps_out_of_range_samples() {
        let bytes = encode_wav(&[2.0, -2.0], 16_000).unwrap();
        let first = i16::from_le_bytes([bytes[44], bytes[45]]);
        let second = i16::from_le_bytes([bytes[46], bytes[47]]);
        assert_eq!(first, 32767);
        assert_eq!(second, -32767);
    }
}
