//! Channel mixing and sample-rate conversion.
//!
//! Recordings are taken at the device's high native rate and downmixed and
//! resampled before upload:
//!
//! 1. [`stereo_to_mono`] averages interleaved channels.
//! 2. [`resample`] converts rates with a windowed-sinc resampler (`rubato`).

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use super::wav::EncodeError;

/// Input frames fed to the resampler per call.
const CHUNK_FRAMES: usize = 1024;

// ---------------------------------------------------------------------------
// stereo_to_mono
// ---------------------------------------------------------------------------

/// Mix interleaved multi-channel audio down to mono by averaging all channels.
///
/// The output length is `samples.len() / channels`; `channels == 0` yields an
/// empty vector.
///
/// ```rust
/// use rowdy_radio::audio::stereo_to_mono;
///
/// let stereo = vec![0.5_f32, -0.5, 0.2, 0.4]; // L R L R
/// let mono = stereo_to_mono(&stereo, 2);
/// assert_eq!(mono.len(), 2);
/// assert!((mono[1] - 0.3).abs() < 1e-6);
/// ```
pub fn stereo_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    match channels {
        0 => Vec::new(),
        1 => samples.to_vec(),
        n => {
            let n = n as usize;
            samples
                .chunks_exact(n)
                .map(|frame| frame.iter().sum::<f32>() / n as f32)
                .collect()
        }
    }
}

// ---------------------------------------------------------------------------
// resample
// ---------------------------------------------------------------------------

/// Resample mono `samples` from `from_rate` to `to_rate` Hz.
///
/// Equal rates and empty input are returned unchanged. The output is
/// aligned to the input (the filter delay is removed) and holds
/// `round(len * to_rate / from_rate)` samples.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, EncodeError> {
    if from_rate == 0 || to_rate == 0 {
        return Err(EncodeError::Resample(format!(
            "invalid sample rates {from_rate} -> {to_rate}"
        )));
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let expected = (samples.len() as f64 * ratio).round() as usize;

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, CHUNK_FRAMES, 1)
        .map_err(|e| EncodeError::Resample(e.to_string()))?;
    let delay = resampler.output_delay();

    let mut out = Vec::with_capacity(expected + delay + CHUNK_FRAMES);
    let mut chunks = samples.chunks_exact(CHUNK_FRAMES);
    for chunk in &mut chunks {
        let wave_in: [&[f32]; 1] = [chunk];
        let frames = resampler
            .process(&wave_in[..], None)
            .map_err(|e| EncodeError::Resample(e.to_string()))?;
        out.extend_from_slice(&frames[0]);
    }

    let rest = chunks.remainder();
    if !rest.is_empty() {
        let wave_in: [&[f32]; 1] = [rest];
        let frames = resampler
            .process_partial(Some(&wave_in[..]), None)
            .map_err(|e| EncodeError::Resample(e.to_string()))?;
        out.extend_from_slice(&frames[0]);
    }

    // Flush until the delayed tail has come out.
    while out.len() < expected + delay {
        let frames = resampler
            .process_partial::<&[f32]>(None, None)
            .map_err(|e| EncodeError::Resample(e.to_string()))?;
        if frames[0].is_empty() {
            break;
        }
        out.extend_from_slice(&frames[0]);
    }

    Ok(out.into_iter().skip(delay).take(expected).collect())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
