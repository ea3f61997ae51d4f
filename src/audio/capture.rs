//! Microphone capture via `cpal`.
//!
//! [`DeviceCapture`] opens an input device, records a fixed-length clip and
//! returns it as an [`AudioClip`]. Recording blocks the calling thread for
//! the clip duration, so async callers run it on the blocking pool.
//! [`RetryingSource`] wraps any [`AudioSource`] and retries while the device
//! is missing or busy.

use std::sync::mpsc;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use thiserror::Error;

use crate::config::AudioConfig;

use super::resample::{resample, stereo_to_mono};
use super::wav::EncodeError;

// ---------------------------------------------------------------------------
// AudioClip
// ---------------------------------------------------------------------------

/// A recorded clip of interleaved `f32` samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
}

impl AudioClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        match self.channels {
            0 => 0,
            n => self.samples.len() / n as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Length of the clip in wall-clock time.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Downmix to mono and resample to `sample_rate`.
    pub fn to_mono(&self, sample_rate: u32) -> Result<AudioClip, EncodeError> {
        let mono = stereo_to_mono(&self.samples, self.channels);
        let samples = resample(&mono, self.sample_rate, sample_rate)?;
        Ok(AudioClip::new(samples, sample_rate, 1))
    }

    /// Mono 16 kHz copy, the format speech-to-text services expect.
    pub fn to_mono_16k(&self) -> Result<AudioClip, EncodeError> {
        self.to_mono(16_000)
    }
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while opening a device or recording.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("input device `{0}` not found")]
    DeviceNotFound(String),

    #[error("failed to enumerate input devices: {0}")]
    Devices(#[from] cpal::DevicesError),

    #[error("failed to query default input config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start audio stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("recording produced no audio")]
    EmptyRecording,

    /// Retries exhausted while the device stayed missing or busy.
    #[error("audio device unavailable after {attempts} attempts: {last_error}")]
    DeviceUnavailable { attempts: u32, last_error: String },
}

impl CaptureError {
    /// The device is missing or held by someone else; worth retrying.
    pub fn is_device_unavailable(&self) -> bool {
        match self {
            CaptureError::NoDevice | CaptureError::DeviceNotFound(_) => true,
            CaptureError::DefaultConfig(cpal::DefaultStreamConfigError::DeviceNotAvailable)
            | CaptureError::BuildStream(cpal::BuildStreamError::DeviceNotAvailable)
            | CaptureError::PlayStream(cpal::PlayStreamError::DeviceNotAvailable) => true,
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// AudioSource trait
// ---------------------------------------------------------------------------

/// Something that can record a clip of a given length.
///
/// Blocking: implementations may sleep for the whole `duration`.
pub trait AudioSource: Send + Sync {
    fn record(&self, duration: Duration) -> Result<AudioClip, CaptureError>;
}

// ---------------------------------------------------------------------------
// Device listing
// ---------------------------------------------------------------------------

/// One entry of [`list_input_devices`].
#[derive(Debug, Clone, PartialEq)]
pub struct InputDeviceInfo {
    /// Position among input devices; accepted as `audio.device`.
    pub index: usize,
    pub name: String,
    pub channels: u16,
    pub sample_rate: u32,
    pub is_default: bool,
}

/// Enumerate the input devices of the default host.
pub fn list_input_devices() -> Result<Vec<InputDeviceInfo>, CaptureError> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let mut out = Vec::new();
    for (index, device) in host.input_devices()?.enumerate() {
        let name = device.name().unwrap_or_else(|_| format!("device {index}"));
        let (channels, sample_rate) = match device.default_input_config() {
            Ok(cfg) => (cfg.channels(), cfg.sample_rate().0),
            Err(e) => {
                log::debug!("audio: no default config for {name}: {e}");
                (0, 0)
            }
        };
        out.push(InputDeviceInfo {
            index,
            is_default: default_name.as_deref() == Some(name.as_str()),
            name,
            channels,
            sample_rate,
        });
    }
    Ok(out)
}

/// Pick an input device by exact name, by numeric index, or the default.
fn select_device(host: &cpal::Host, wanted: Option<&str>) -> Result<cpal::Device, CaptureError> {
    let Some(wanted) = wanted else {
        return host.default_input_device().ok_or(CaptureError::NoDevice);
    };

    let mut devices = host.input_devices()?;
    let found = match wanted.parse::<usize>() {
        Ok(index) => devices.nth(index),
        Err(_) => devices.find(|d| d.name().map(|n| n == wanted).unwrap_or(false)),
    };
    found.ok_or_else(|| CaptureError::DeviceNotFound(wanted.to_string()))
}

// ---------------------------------------------------------------------------
// DeviceCapture
// ---------------------------------------------------------------------------

/// Records from a cpal input device.
#[derive(Debug, Clone)]
pub struct DeviceCapture {
    /// Device name or index; `None` uses the host default.
    device: Option<String>,
    /// Requested sample rate; the device default is used if it is refused.
    sample_rate: u32,
}

impl DeviceCapture {
    pub fn new(device: Option<String>, sample_rate: u32) -> Self {
        Self {
            device,
            sample_rate,
        }
    }

    pub fn from_config(config: &AudioConfig) -> Self {
        Self::new(config.device.clone(), config.sample_rate)
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        tx: mpsc::Sender<Vec<f32>>,
    ) -> Result<cpal::Stream, cpal::BuildStreamError>
    where
        T: SizedSample,
        f32: FromSample<T>,
    {
        device.build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let chunk: Vec<f32> = data.iter().map(|s| s.to_sample::<f32>()).collect();
                // The receiver is gone once recording has finished.
                let _ = tx.send(chunk);
            },
            |err: cpal::StreamError| {
                log::error!("audio: cpal stream error: {err}");
            },
            None,
        )
    }

    fn open_stream(
        device: &cpal::Device,
        format: cpal::SampleFormat,
        config: &cpal::StreamConfig,
        tx: mpsc::Sender<Vec<f32>>,
    ) -> Result<cpal::Stream, cpal::BuildStreamError> {
        match format {
            cpal::SampleFormat::I16 => Self::build_stream::<i16>(device, config, tx),
            cpal::SampleFormat::U16 => Self::build_stream::<u16>(device, config, tx),
            cpal::SampleFormat::I32 => Self::build_stream::<i32>(device, config, tx),
            _ => Self::build_stream::<f32>(device, config, tx),
        }
    }
}

impl AudioSource for DeviceCapture {
    fn record(&self, duration: Duration) -> Result<AudioClip, CaptureError> {
        let host = cpal::default_host();
        let device = select_device(&host, self.device.as_deref())?;
        let name = device.name().unwrap_or_else(|_| "<unnamed>".into());

        let supported = device.default_input_config()?;
        let format = supported.sample_format();
        let channels = supported.channels();
        let mut config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(self.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (tx, rx) = mpsc::channel::<Vec<f32>>();
        let stream = match Self::open_stream(&device, format, &config, tx.clone()) {
            Ok(stream) => stream,
            Err(cpal::BuildStreamError::StreamConfigNotSupported) => {
                let fallback = supported.sample_rate();
                log::warn!(
                    "audio: {name} refused {} Hz, recording at {} Hz",
                    self.sample_rate,
                    fallback.0
                );
                config.sample_rate = fallback;
                Self::open_stream(&device, format, &config, tx)?
            }
            Err(e) => return Err(e.into()),
        };

        log::info!(
            "audio: recording {:?} from {name} ({} ch @ {} Hz)",
            duration,
            channels,
            config.sample_rate.0
        );
        stream.play()?;
        std::thread::sleep(duration);
        drop(stream);

        let samples: Vec<f32> = rx.try_iter().flatten().collect();
        if samples.is_empty() {
            return Err(CaptureError::EmptyRecording);
        }
        Ok(AudioClip::new(samples, config.sample_rate.0, channels))
    }
}

// ---------------------------------------------------------------------------
// RetryingSource
// ---------------------------------------------------------------------------

/// Retries the inner source with a fixed backoff while the device is
/// unavailable. Other errors are returned immediately.
pub struct RetryingSource<S> {
    inner: S,
    attempts: u32,
    backoff: Duration,
}

impl<S: AudioSource> RetryingSource<S> {
    pub fn new(inner: S, attempts: u32, backoff: Duration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            backoff,
        }
    }
}

impl RetryingSource<DeviceCapture> {
    pub fn from_config(config: &AudioConfig) -> Self {
        Self::new(
            DeviceCapture::from_config(config),
            config.capture_retries,
            Duration::from_secs(config.capture_backoff_secs),
        )
    }
}

impl<S: AudioSource> AudioSource for RetryingSource<S> {
    fn record(&self, duration: Duration) -> Result<AudioClip, CaptureError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.inner.record(duration) {
                Ok(clip) => return Ok(clip),
                Err(e) if e.is_device_unavailable() => {
                    if attempt >= self.attempts {
                        return Err(CaptureError::DeviceUnavailable {
                            attempts: attempt,
                            last_error: e.to_string(),
                        });
                    }
                    log::warn!(
                        "audio: attempt {attempt}/{} failed ({e}), retrying in {:?}",
                        self.attempts,
                        self.backoff
                    );
                    std::thread::sleep(self.backoff);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// MockSource  (test-only)
// ---------------------------------------------------------------------------

/// Source that replays scripted results and then a silent one-second clip.
#[cfg(test)]
pub struct MockSource {
    results: std::sync::Mutex<std::collections::VecDeque<Result<AudioClip, CaptureError>>>,
    pub calls: std::sync::atomic::AtomicU32,
}

#[cfg(test)]
impl MockSource {
    pub fn new(results: Vec<Result<AudioClip, CaptureError>>) -> Self {
        Self {
            results: std::sync::Mutex::new(results.into()),
            calls: Default::default(),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl AudioSource for MockSource {
    fn record(&self, _duration: Duration) -> Result<AudioClip, CaptureError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(AudioClip::new(vec![0.0; 16_000], 16_000, 1)))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
