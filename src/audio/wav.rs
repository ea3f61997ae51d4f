//! WAV encoding for upload.

use std::io::Cursor;

use thiserror::Error;

use super::capture::AudioClip;

/// Errors converting a clip into upload format.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("resampling failed: {0}")]
    Resample(String),

    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),
}

/// Encode `clip` as a 16-bit PCM WAV file held in memory.
///
/// Samples outside `[-1.0, 1.0]` are clipped.
pub fn encode_wav(clip: &AudioClip) -> Result<Vec<u8>, EncodeError> {
    let spec = hound::WavSpec {
        channels: clip.channels.max(1),
        sample_rate: clip.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in &clip.samples {
            let pcm = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(pcm)?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_readable_16bit_wav() {
        let clip = AudioClip::new(vec![0.0, 0.5, -0.5, 1.0], 16_000, 1);
        let bytes = encode_wav(&clip).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");

        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 16_000);
        assert_eq!(spec.bits_per_sample, 16);

        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 16_383, -16_383, i16::MAX]);
    }

    #[test]
    fn out_of_range_samples_are_clipped() {
        let clip = AudioClip::new(vec![3.0, -3.0], 8_000, 1);
        let bytes = encode_wav(&clip).unwrap();
        let mut reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![i16::MAX, -i16::MAX]);
    }

    #[test]
    fn stereo_clip_keeps_channels() {
        let clip = AudioClip::new(vec![0.1, 0.2, 0.3, 0.4], 96_000, 2);
        let bytes = encode_wav(&clip).unwrap();
        let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.duration(), 2);
    }
}
