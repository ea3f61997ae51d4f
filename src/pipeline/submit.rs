//! Where radio prompts go.
//!
//! [`SongSubmitter`] is implemented by the in-process [`SongQueue`] and by
//! [`JukeboxClient`], which posts to a running jukebox's `/generate`
//! endpoint. Both report failures as [`QueueError`] so the ambient loop does
//! not care which one it talks to.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::RadioConfig;
use crate::gateway::GenerationRequest;
use crate::queue::{QueueError, SongQueue};

/// Accepts a generation prompt and returns the new song's id.
#[async_trait]
pub trait SongSubmitter: Send + Sync {
    async fn submit_prompt(&self, prompt: &str) -> Result<String, QueueError>;
}

#[async_trait]
impl SongSubmitter for SongQueue {
    async fn submit_prompt(&self, prompt: &str) -> Result<String, QueueError> {
        self.submit(GenerationRequest::Prompt {
            prompt: prompt.to_string(),
        })
        .await
    }
}

// ---------------------------------------------------------------------------
// JukeboxClient
// ---------------------------------------------------------------------------

/// The jukebox answers while it waits on the generation service, so this is
/// longer than the gateway timeout.
const JUKEBOX_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct Accepted {
    song_id: String,
}

#[derive(Debug, Deserialize)]
struct Rejected {
    error: String,
}

/// HTTP client for a remote jukebox.
pub struct JukeboxClient {
    client: reqwest::Client,
    generate_url: String,
}

impl JukeboxClient {
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(JUKEBOX_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            generate_url: format!("{}/generate", base_url.trim_end_matches('/')),
        }
    }

    pub fn from_config(config: &RadioConfig) -> Self {
        Self::new(&config.jukebox_url)
    }
}

#[async_trait]
impl SongSubmitter for JukeboxClient {
    async fn submit_prompt(&self, prompt: &str) -> Result<String, QueueError> {
        let body = GenerationRequest::Prompt {
            prompt: prompt.to_string(),
        };

        let response = self
            .client
            .post(&self.generate_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| QueueError::GatewayUnavailable(format!("jukebox unreachable: {e}")))?;

        let status = response.status();
        if status.is_success() {
            let accepted: Accepted = response
                .json()
                .await
                .map_err(|e| QueueError::GatewayUnavailable(format!("bad jukebox reply: {e}")))?;
            return Ok(accepted.song_id);
        }

        let reason = match response.json::<Rejected>().await {
            Ok(rejected) => rejected.error,
            Err(_) => format!("jukebox returned {status}"),
        };
        match status.as_u16() {
            503 => Err(QueueError::QueueFull),
            502 | 504 => Err(QueueError::GatewayUnavailable(reason)),
            _ => Err(QueueError::GenerationFailed { reason }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
