//! STT (Speech-to-Text) module.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                  SttEngine (trait)                   │
//! │                                                      │
//! │   ┌─────────────────────┐    ┌────────────────────┐  │
//! │   │ RetryingTranscriber │───▶│  ApiTranscriber    │  │
//! │   │ - timeout retries   │    │ - mono 16 kHz WAV  │  │
//! │   │ - fixed backoff     │    │ - multipart upload │  │
//! │   └─────────────────────┘    └────────────────────┘  │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod engine;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use api::ApiTranscriber;
pub use engine::{RetryingTranscriber, SttEngine, SttError};

#[cfg(test)]
pub use engine::MockSttEngine;

use std::time::Duration;

use crate::config::{AudioConfig, SttConfig};

/// The production engine: [`ApiTranscriber`] behind timeout retries.
pub fn from_config(
    stt: &SttConfig,
    audio: &AudioConfig,
) -> RetryingTranscriber<ApiTranscriber> {
    RetryingTranscriber::new(
        ApiTranscriber::from_config(stt, audio),
        stt.retries,
        Duration::from_secs(stt.retry_backoff_secs),
    )
}
