//! `ApiTranscriber`: OpenAI-compatible `/v1/audio/transcriptions` client.
//!
//! The clip is downmixed, resampled to the upload rate and sent as a WAV
//! file in a multipart form. All connection details come from [`SttConfig`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use crate::audio::{encode_wav, AudioClip};
use crate::config::{AudioConfig, SttConfig};

use super::engine::{SttEngine, SttError};

/// Uploads recordings to a hosted speech-to-text model.
pub struct ApiTranscriber {
    client: reqwest::Client,
    config: SttConfig,
    upload_sample_rate: u32,
}

impl ApiTranscriber {
    /// Build a transcriber from config.
    ///
    /// The HTTP client carries the per-request timeout from
    /// `config.timeout_secs`; a default client is the fallback if the
    /// builder fails.
    pub fn from_config(config: &SttConfig, audio: &AudioConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
            upload_sample_rate: audio.upload_sample_rate,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/audio/transcriptions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

/// Mono, resampled, WAV-encoded bytes ready for upload.
fn prepare_upload(clip: &AudioClip, sample_rate: u32) -> Result<Vec<u8>, SttError> {
    let mono = clip
        .to_mono(sample_rate)
        .map_err(|e| SttError::Encode(e.to_string()))?;
    encode_wav(&mono).map_err(|e| SttError::Encode(e.to_string()))
}

#[async_trait]
impl SttEngine for ApiTranscriber {
    async fn transcribe(&self, clip: &AudioClip) -> Result<String, SttError> {
        let owned = clip.clone();
        let rate = self.upload_sample_rate;
        let wav = tokio::task::spawn_blocking(move || prepare_upload(&owned, rate))
            .await
            .map_err(|e| SttError::Encode(e.to_string()))??;
        log::info!(
            "stt: uploading {:.1}s clip ({} bytes)",
            clip.duration().as_secs_f32(),
            wav.len()
        );

        let file = Part::bytes(wav)
            .file_name("recorded_audio.wav")
            .mime_str("audio/wav")?;
        let mut form = Form::new()
            .text("model", self.config.model.clone())
            .part("file", file);
        if let Some(language) = self.config.language.as_deref().filter(|l| !l.is_empty()) {
            form = form.text("language", language.to_string());
        }

        let mut req = self.client.post(self.endpoint()).multipart(form);
        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SttError::Api {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| SttError::Parse(e.to_string()))?;
        let text = json["text"]
            .as_str()
            .ok_or_else(|| SttError::Parse("missing `text` field".into()))?
            .trim()
            .to_string();

        log::info!("stt: transcribed {} chars", text.chars().count());
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
