//! Core STT engine trait, error type and retry wrapper.
//!
//! [`SttEngine`] is the interface used by the ambient pipeline. It is
//! object-safe and `Send + Sync` so it can be held behind an
//! `Arc<dyn SttEngine>`.
//!
//! [`RetryingTranscriber`] wraps any engine and retries timeouts with a fixed
//! backoff; [`MockSttEngine`] (test-only) replays scripted results.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::audio::AudioClip;

// ---------------------------------------------------------------------------
// SttError
// ---------------------------------------------------------------------------

/// All errors that can arise from the STT subsystem.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SttError {
    /// A single request did not complete within the configured timeout.
    #[error("transcription request timed out")]
    Timeout,

    /// Every attempt timed out.
    #[error("transcription timed out after {attempts} attempts")]
    TranscriptionTimeout { attempts: u32 },

    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The service answered with a non-success status.
    #[error("transcription service returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The response body was not the expected JSON.
    #[error("failed to parse transcription response: {0}")]
    Parse(String),

    /// The clip could not be converted to upload format.
    #[error("failed to prepare audio: {0}")]
    Encode(String),
}

impl From<reqwest::Error> for SttError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            SttError::Timeout
        } else {
            SttError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// SttEngine trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for speech-to-text engines.
#[async_trait]
pub trait SttEngine: Send + Sync {
    /// Transcribe `clip` and return the text transcript.
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, SttError>;
}

// Compile-time assertion: Box<dyn SttEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SttEngine>) {}
};

// ---------------------------------------------------------------------------
// RetryingTranscriber
// ---------------------------------------------------------------------------

/// Retries [`SttError::Timeout`] up to `attempts` times with a fixed backoff.
///
/// Any other error is returned immediately. When every attempt times out the
/// result is [`SttError::TranscriptionTimeout`].
pub struct RetryingTranscriber<E> {
    inner: E,
    attempts: u32,
    backoff: Duration,
}

impl<E: SttEngine> RetryingTranscriber<E> {
    pub fn new(inner: E, attempts: u32, backoff: Duration) -> Self {
        Self {
            inner,
            attempts: attempts.max(1),
            backoff,
        }
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: SttEngine> SttEngine for RetryingTranscriber<E> {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, SttError> {
        for attempt in 1..=self.attempts {
            match self.inner.transcribe(clip).await {
                Err(SttError::Timeout) => {
                    if attempt < self.attempts {
                        log::warn!(
                            "stt: attempt {attempt}/{} timed out, retrying in {:?}",
                            self.attempts,
                            self.backoff
                        );
                        tokio::time::sleep(self.backoff).await;
                    }
                }
                other => return other,
            }
        }
        Err(SttError::TranscriptionTimeout {
            attempts: self.attempts,
        })
    }
}

// ---------------------------------------------------------------------------
// MockSttEngine  (test-only)
// ---------------------------------------------------------------------------

/// A test double that replays scripted results, then repeats the last one.
#[cfg(test)]
pub struct MockSttEngine {
    script: std::sync::Mutex<std::collections::VecDeque<Result<String, SttError>>>,
    last: std::sync::Mutex<Result<String, SttError>>,
    calls: std::sync::atomic::AtomicU32,
}

#[cfg(test)]
impl MockSttEngine {
    /// Always returns `Ok(text)`.
    pub fn ok(text: impl Into<String>) -> Self {
        Self::script(vec![Ok(text.into())])
    }

    /// Always returns `Err(error)`.
    pub fn err(error: SttError) -> Self {
        Self::script(vec![Err(error)])
    }

    /// Returns each result in turn; the final one repeats.
    pub fn script(results: Vec<Result<String, SttError>>) -> Self {
        let last = results
            .last()
            .cloned()
            .unwrap_or_else(|| Ok(String::new()));
        Self {
            script: std::sync::Mutex::new(results.into()),
            last: std::sync::Mutex::new(last),
            calls: Default::default(),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait]
impl SttEngine for MockSttEngine {
    async fn transcribe(&self, _clip: &AudioClip) -> Result<String, SttError> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(result) => result,
            None => self.last.lock().unwrap().clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
