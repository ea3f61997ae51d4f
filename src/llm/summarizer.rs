//! Core `Summarizer` trait and `ApiSummarizer` implementation.
//!
//! `ApiSummarizer` calls any OpenAI-compatible `/v1/chat/completions`
//! endpoint. All connection details come from [`LlmConfig`].

use async_trait::async_trait;
use thiserror::Error;

use crate::config::LlmConfig;
use crate::llm::prompt::PromptBuilder;

// ---------------------------------------------------------------------------
// LlmError
// ---------------------------------------------------------------------------

/// Errors that can occur during summarization.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LlmError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("LLM request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("LLM service returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The HTTP response could not be parsed as expected JSON.
    #[error("failed to parse LLM response: {0}")]
    Parse(String),

    /// The LLM returned a response with no usable text content.
    #[error("LLM returned an empty response")]
    EmptyResponse,
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Summarizer trait
// ---------------------------------------------------------------------------

/// Async trait for condensing a transcript into a short summary.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn Summarizer>`.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, transcript: &str) -> Result<String, LlmError>;
}

// ---------------------------------------------------------------------------
// ApiSummarizer
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint once per
/// transcript. No retries: a failed summary skips the cycle.
pub struct ApiSummarizer {
    client: reqwest::Client,
    config: LlmConfig,
    prompt_builder: PromptBuilder,
}

impl ApiSummarizer {
    /// Build an `ApiSummarizer` from config.
    ///
    /// The HTTP client carries the per-request timeout from
    /// `config.timeout_secs`; a default client is the fallback if the
    /// builder fails.
    pub fn from_config(config: &LlmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
            prompt_builder: PromptBuilder::default(),
        }
    }
}

#[async_trait]
impl Summarizer for ApiSummarizer {
    /// Send `transcript` for summarization.
    ///
    /// The `Authorization: Bearer …` header is attached only when
    /// `config.api_key` is a non-empty string.
    async fn summarize(&self, transcript: &str) -> Result<String, LlmError> {
        let (system_msg, user_msg) = self.prompt_builder.build_chat(transcript);

        let url = format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system_msg },
                { "role": "user",   "content": user_msg   }
            ],
            "stream": false
        });
        if let Some(temperature) = self.config.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }

        let mut req = self.client.post(&url).json(&body);

        let key = self.config.api_key.as_deref().unwrap_or("");
        if !key.is_empty() {
            req = req.bearer_auth(key);
        }

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: message.trim().to_string(),
            });
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let summary = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or(LlmError::EmptyResponse)?
            .trim()
            .to_string();

        if summary.is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        log::info!("llm: summarized {} chars into {}", transcript.len(), summary.len());
        Ok(summary)
    }
}

// ---------------------------------------------------------------------------
// MockSummarizer  (test-only)
// ---------------------------------------------------------------------------

/// Returns a fixed result and records every transcript it was given.
#[cfg(test)]
pub struct MockSummarizer {
    response: Result<String, LlmError>,
    pub seen: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockSummarizer {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            seen: Default::default(),
        }
    }

    pub fn err(error: LlmError) -> Self {
        Self {
            response: Err(error),
            seen: Default::default(),
        }
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(&self, transcript: &str) -> Result<String, LlmError> {
        self.seen.lock().unwrap().push(transcript.to_string());
        self.response.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::extract::State;
    use axum::http::{header, HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use super::*;

    type Seen = Arc<Mutex<Vec<(Option<String>, Value)>>>;

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn make_config(base_url: String, api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            base_url,
            api_key: api_key.map(|s| s.to_string()),
            timeout_secs: 1,
            ..LlmConfig::default()
        }
    }

    async fn completions(
        State(seen): State<Seen>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        seen.lock().unwrap().push((auth, body));
        Json(json!({
            "choices": [{ "message": { "role": "assistant", "content": " A calm chat about gardens. " } }]
        }))
    }

    #[tokio::test]
    async fn sends_fixed_prompt_and_returns_trimmed_summary() {
        let seen: Seen = Default::default();
        let base = spawn(
            Router::new()
                .route("/v1/chat/completions", post(completions))
                .with_state(seen.clone()),
        )
        .await;

        let summarizer = ApiSummarizer::from_config(&make_config(base, Some("sk-test")));
        let summary = summarizer.summarize("we talked about tomatoes").await.unwrap();
        assert_eq!(summary, "A calm chat about gardens.");

        let seen = seen.lock().unwrap();
        let (auth, body) = &seen[0];
        assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
        assert_eq!(body["model"], "gpt-4");
        assert_eq!(body["messages"][0]["content"], "You are a helpful assistant.");
        assert_eq!(
            body["messages"][1]["content"],
            "Please summarize the following conversation in 3 sentences: we talked about tomatoes"
        );
        assert!(body.get("temperature").is_none());
    }

    #[tokio::test]
    async fn empty_key_sends_no_authorization() {
        let seen: Seen = Default::default();
        let base = spawn(
            Router::new()
                .route("/v1/chat/completions", post(completions))
                .with_state(seen.clone()),
        )
        .await;

        let summarizer = ApiSummarizer::from_config(&make_config(base, Some("")));
        summarizer.summarize("x").await.unwrap();
        assert!(seen.lock().unwrap()[0].0.is_none());
    }

    #[tokio::test]
    async fn empty_content_is_empty_response() {
        let base = spawn(Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(json!({ "choices": [{ "message": { "content": "   " } }] })) }),
        ))
        .await;

        let summarizer = ApiSummarizer::from_config(&make_config(base, None));
        assert_eq!(summarizer.summarize("x").await, Err(LlmError::EmptyResponse));
    }

    #[tokio::test]
    async fn error_status_is_api_error() {
        let base = spawn(Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "rate limited") }),
        ))
        .await;

        let summarizer = ApiSummarizer::from_config(&make_config(base, None));
        assert_eq!(
            summarizer.summarize("x").await,
            Err(LlmError::Api {
                status: 429,
                message: "rate limited".into()
            })
        );
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let base = spawn(Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(json!({}))
            }),
        ))
        .await;

        let summarizer = ApiSummarizer::from_config(&make_config(base, None));
        assert_eq!(summarizer.summarize("x").await, Err(LlmError::Timeout));
    }

    #[test]
    fn summarizer_is_object_safe() {
        let summarizer: Box<dyn Summarizer> =
            Box::new(ApiSummarizer::from_config(&LlmConfig::default()));
        drop(summarizer);
    }
}
