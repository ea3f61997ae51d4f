//! Audio capture: microphone → clip → mono 16 kHz → WAV bytes.
//!
//! # Pipeline
//!
//! ```text
//! cpal input device → DeviceCapture::record (fixed duration)
//!                   → AudioClip::to_mono_16k (stereo_to_mono + rubato)
//!                   → encode_wav (hound, 16-bit PCM)
//! ```
//!
//! [`RetryingSource`] wraps the device capture and retries while the device
//! is missing, surfacing [`CaptureError::DeviceUnavailable`] when it gives up.

pub mod capture;
pub mod resample;
pub mod wav;

pub use capture::{
    list_input_devices, AudioClip, AudioSource, CaptureError, DeviceCapture, InputDeviceInfo,
    RetryingSource,
};
pub use resample::{resample, stereo_to_mono};
pub use wav::{encode_wav, EncodeError};

#[cfg(test)]
pub use capture::MockSource;
