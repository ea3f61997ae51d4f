//! Request / status types shared by the gateway, the queue and the front end.
//!
//! The remote API wraps everything in `{code, msg, data}` envelopes; the
//! `parse_*` helpers turn those into [`GatewayError`]s or typed values so the
//! rest of the crate never touches raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::GatewayError;

// ---------------------------------------------------------------------------
// GenerationRequest
// ---------------------------------------------------------------------------

/// What the caller wants generated.
///
/// Serialises as the jukebox wire format:
/// `{"method": "prompt", "prompt": "..."}` or
/// `{"method": "title_tags", "title": "...", "tags": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum GenerationRequest {
    /// Free-form description; the service writes lyrics and style.
    Prompt { prompt: String },
    /// Explicit title plus comma-separated style tags.
    TitleTags { title: String, tags: String },
}

impl GenerationRequest {
    /// Short description used for logging and the queue view.
    pub fn label(&self) -> String {
        match self {
            GenerationRequest::Prompt { prompt } => prompt.clone(),
            GenerationRequest::TitleTags { title, tags } if tags.is_empty() => title.clone(),
            GenerationRequest::TitleTags { title, tags } => format!("{title} [{tags}]"),
        }
    }
}

// ---------------------------------------------------------------------------
// RemoteStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a remote generation job, as reported by the feed endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    /// Still processing; carries the raw remote status string.
    Pending(String),
    /// Audio is available on the live pipe (see `stream_url`).
    Streaming,
    /// Rendering finished; the final asset lives at `audio_url`.
    Complete { audio_url: String },
    /// The job failed remotely.
    Error { message: String },
}

// ---------------------------------------------------------------------------
// Envelope parsing
// ---------------------------------------------------------------------------

fn envelope_message(json: &Value) -> Option<String> {
    json["msg"]
        .as_str()
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Extract the `song_id` from a submission response.
///
/// Success requires `code == 0` and `data[0].song_id`.
pub fn parse_submit(json: &Value) -> Result<String, GatewayError> {
    let code = json["code"].as_i64();
    if code != Some(0) {
        return Err(GatewayError::GenerationFailed {
            reason: envelope_message(json).unwrap_or_else(|| "Unknown error".into()),
        });
    }

    json["data"][0]
        .get("song_id")
        .and_then(id_string)
        .ok_or_else(|| GatewayError::GenerationFailed {
            reason: "response did not contain a song_id".into(),
        })
}

/// Interpret a feed response for one song.
///
/// A missing `data` object is reported as [`GatewayError::Unavailable`] so
/// the poll loop retries instead of dropping the song.
pub fn parse_feed(json: &Value) -> Result<RemoteStatus, GatewayError> {
    let data = match &json["data"] {
        Value::Object(_) => &json["data"],
        // Some deployments answer with a one-element list.
        Value::Array(items) if !items.is_empty() => &items[0],
        _ => {
            return Err(GatewayError::Unavailable(format!(
                "feed response without data: {}",
                envelope_message(json).unwrap_or_else(|| "no message".into())
            )))
        }
    };

    let status = data["status"]
        .as_str()
        .ok_or_else(|| GatewayError::Unavailable("feed response without status".into()))?
        .trim()
        .to_ascii_lowercase();

    let status = match status.as_str() {
        "streaming" => RemoteStatus::Streaming,
        "complete" => match data["audio_url"].as_str().filter(|u| !u.is_empty()) {
            Some(url) => RemoteStatus::Complete {
                audio_url: url.to_string(),
            },
            None => RemoteStatus::Error {
                message: "job completed without an audio_url".into(),
            },
        },
        "error" => {
            let message = data["meta_data"]["error_message"]
                .as_str()
                .or_else(|| data["error_message"].as_str())
                .map(str::to_string)
                .or_else(|| envelope_message(json))
                .unwrap_or_else(|| "remote generation error".into());
            RemoteStatus::Error { message }
        }
        _ => RemoteStatus::Pending(status),
    };

    Ok(status)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
