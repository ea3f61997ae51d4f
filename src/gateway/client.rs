//! Core `GenerationGateway` trait and the `SunoGateway` HTTP implementation.
//!
//! `SunoGateway` talks to a sunoaiapi-style REST API:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | submit by prompt | `POST {base}gateway/generate/gpt_desc` |
//! | submit by title + tags | `POST {base}gateway/generate/music` |
//! | poll status | `GET {base}gateway/feed/{song_id}` |
//!
//! Every request carries the `api-key` header when a key is configured.
//! All connection details come from [`GatewayConfig`].

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::GatewayConfig;

use super::types::{parse_feed, parse_submit, GenerationRequest, RemoteStatus};

// ---------------------------------------------------------------------------
// GatewayError
// ---------------------------------------------------------------------------

/// Errors surfaced by the generation gateway.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GatewayError {
    /// Network failure, non-2xx response or an undecodable body.
    #[error("generation service unavailable: {0}")]
    Unavailable(String),

    /// The service answered but refused to create the job.
    #[error("song generation failed: {reason}")]
    GenerationFailed { reason: String },
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GatewayError::Unavailable("request timed out".into())
        } else {
            GatewayError::Unavailable(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// GenerationGateway trait
// ---------------------------------------------------------------------------

/// Async interface to the remote music-generation service.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn GenerationGateway>` between the HTTP handlers and the poll loop.
#[async_trait]
pub trait GenerationGateway: Send + Sync {
    /// Create a job from a free-form description. Returns the `song_id`.
    async fn submit_by_prompt(&self, prompt: &str) -> Result<String, GatewayError>;

    /// Create a job from an explicit title and style tags.
    async fn submit_by_title_tags(&self, title: &str, tags: &str)
        -> Result<String, GatewayError>;

    /// Query the remote job status.
    async fn poll_status(&self, song_id: &str) -> Result<RemoteStatus, GatewayError>;

    /// Live audio URL for a job that is streaming.
    fn stream_url(&self, song_id: &str) -> String;

    /// Dispatch a [`GenerationRequest`] to the matching submit call.
    async fn submit(&self, request: &GenerationRequest) -> Result<String, GatewayError> {
        match request {
            GenerationRequest::Prompt { prompt } => self.submit_by_prompt(prompt).await,
            GenerationRequest::TitleTags { title, tags } => {
                self.submit_by_title_tags(title, tags).await
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SunoGateway
// ---------------------------------------------------------------------------

/// HTTP client for the remote generation API.
pub struct SunoGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl SunoGateway {
    /// Build a gateway from application config.
    ///
    /// The HTTP client carries the per-request timeout from
    /// `config.timeout_secs`.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        format!("{base}/{path}")
    }

    fn with_key(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_key.as_deref() {
            Some(key) if !key.is_empty() => req.header("api-key", key),
            _ => req,
        }
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> Result<Value, GatewayError> {
        let response = self.with_key(req).send().await?.error_for_status()?;
        let json: Value = response
            .json()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("invalid JSON response: {e}")))?;
        log::debug!("gateway: response {json}");
        Ok(json)
    }

    async fn post_submit(&self, path: &str, body: Value) -> Result<String, GatewayError> {
        let url = self.endpoint(path);
        let json = self.send(self.client.post(&url).json(&body)).await?;
        let song_id = parse_submit(&json)?;
        log::info!("gateway: generation submitted, song_id={song_id}");
        Ok(song_id)
    }
}

#[async_trait]
impl GenerationGateway for SunoGateway {
    async fn submit_by_prompt(&self, prompt: &str) -> Result<String, GatewayError> {
        let body = serde_json::json!({
            "gpt_description_prompt": prompt,
            "mv": self.config.model,
        });
        self.post_submit("gateway/generate/gpt_desc", body).await
    }

    async fn submit_by_title_tags(
        &self,
        title: &str,
        tags: &str,
    ) -> Result<String, GatewayError> {
        let body = serde_json::json!({
            "title": title,
            "tags":  tags,
            "mv":    self.config.model,
        });
        self.post_submit("gateway/generate/music", body).await
    }

    async fn poll_status(&self, song_id: &str) -> Result<RemoteStatus, GatewayError> {
        let url = self.endpoint(&format!("gateway/feed/{song_id}"));
        let json = self.send(self.client.get(&url)).await?;
        parse_feed(&json)
    }

    fn stream_url(&self, song_id: &str) -> String {
        format!("{}?item_id={song_id}", self.config.stream_base_url)
    }
}

// ---------------------------------------------------------------------------
// MockGateway  (test-only)
// ---------------------------------------------------------------------------

/// Scripted gateway used by the queue and front-end tests.
///
/// Submissions hand out `song-1`, `song-2`, … unless a result was queued
/// with [`push_submit`](Self::push_submit). Polls return scripted statuses
/// per song, then `Pending("queued")` once the script is exhausted.
#[cfg(test)]
pub struct MockGateway {
    submit_results: std::sync::Mutex<std::collections::VecDeque<Result<String, GatewayError>>>,
    statuses: std::sync::Mutex<
        std::collections::HashMap<String, std::collections::VecDeque<Result<RemoteStatus, GatewayError>>>,
    >,
    submitted: std::sync::Mutex<Vec<GenerationRequest>>,
    polled: std::sync::Mutex<Vec<String>>,
    counter: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl MockGateway {
    pub fn new() -> Self {
        Self {
            submit_results: Default::default(),
            statuses: Default::default(),
            submitted: Default::default(),
            polled: Default::default(),
            counter: Default::default(),
        }
    }

    /// Queue the result of the next submission.
    pub fn push_submit(&self, result: Result<String, GatewayError>) {
        self.submit_results.lock().unwrap().push_back(result);
    }

    /// Append a poll result to `song_id`'s script.
    pub fn push_status(&self, song_id: &str, result: Result<RemoteStatus, GatewayError>) {
        self.statuses
            .lock()
            .unwrap()
            .entry(song_id.to_string())
            .or_default()
            .push_back(result);
    }

    /// Every request submitted so far, in order.
    pub fn submitted(&self) -> Vec<GenerationRequest> {
        self.submitted.lock().unwrap().clone()
    }

    /// Every song id polled so far, in order.
    pub fn polled(&self) -> Vec<String> {
        self.polled.lock().unwrap().clone()
    }

    fn next_submit(&self, request: GenerationRequest) -> Result<String, GatewayError> {
        self.submitted.lock().unwrap().push(request);
        match self.submit_results.lock().unwrap().pop_front() {
            Some(result) => result,
            None => {
                let n = self
                    .counter
                    .fetch_add(1, std::sync::atomic::Ordering::SeqCst)
                    + 1;
                Ok(format!("song-{n}"))
            }
        }
    }
}

#[cfg(test)]
#[async_trait]
impl GenerationGateway for MockGateway {
    async fn submit_by_prompt(&self, prompt: &str) -> Result<String, GatewayError> {
        self.next_submit(GenerationRequest::Prompt {
            prompt: prompt.to_string(),
        })
    }

    async fn submit_by_title_tags(
        &self,
        title: &str,
        tags: &str,
    ) -> Result<String, GatewayError> {
        self.next_submit(GenerationRequest::TitleTags {
            title: title.to_string(),
            tags: tags.to_string(),
        })
    }

    async fn poll_status(&self, song_id: &str) -> Result<RemoteStatus, GatewayError> {
        self.polled.lock().unwrap().push(song_id.to_string());
        self.statuses
            .lock()
            .unwrap()
            .get_mut(song_id)
            .and_then(|script| script.pop_front())
            .unwrap_or_else(|| Ok(RemoteStatus::Pending("queued".into())))
    }

    fn stream_url(&self, song_id: &str) -> String {
        format!("https://stream.test/?item_id={song_id}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;

    /// What the fake service saw: path, `api-key` header, body.
    type Seen = Arc<Mutex<Vec<(String, Option<String>, Value)>>>;

    fn api_key(headers: &HeaderMap) -> Option<String> {
        headers
            .get("api-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    /// Start an in-process fake of the generation API and return its base URL.
    async fn spawn_fake_api(seen: Seen) -> String {
        async fn gpt_desc(
            State(seen): State<Seen>,
            headers: HeaderMap,
            Json(body): Json<Value>,
        ) -> Json<Value> {
            let prompt = body["gpt_description_prompt"].as_str().unwrap_or("").to_string();
            seen.lock()
                .unwrap()
                .push(("gpt_desc".into(), api_key(&headers), body));
            if prompt == "forbidden" {
                Json(json!({"code": 1, "msg": "prompt rejected"}))
            } else {
                Json(json!({"code": 0, "msg": "success", "data": [{"song_id": "42"}]}))
            }
        }

        async fn music(
            State(seen): State<Seen>,
            headers: HeaderMap,
            Json(body): Json<Value>,
        ) -> Json<Value> {
            seen.lock()
                .unwrap()
                .push(("music".into(), api_key(&headers), body));
            Json(json!({"code": 0, "data": [{"song_id": "77"}]}))
        }

        async fn feed(Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
            match id.as_str() {
                "42" => Ok(Json(
                    json!({"code": 0, "data": {"status": "complete", "audio_url": "http://x/42.mp3"}}),
                )),
                "s1" => Ok(Json(json!({"code": 0, "data": {"status": "streaming"}}))),
                "q1" => Ok(Json(json!({"code": 0, "data": {"status": "queued"}}))),
                _ => Err(StatusCode::INTERNAL_SERVER_ERROR),
            }
        }

        let app = Router::new()
            .route("/api/v1/gateway/generate/gpt_desc", post(gpt_desc))
            .route("/api/v1/gateway/generate/music", post(music))
            .route("/api/v1/gateway/feed/:id", get(feed))
            .with_state(seen);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/api/v1/")
    }

    fn gateway_for(base_url: String, api_key: Option<&str>) -> SunoGateway {
        SunoGateway::from_config(&GatewayConfig {
            base_url,
            api_key: api_key.map(str::to_string),
            timeout_secs: 5,
            ..GatewayConfig::default()
        })
    }

    #[tokio::test]
    async fn submit_by_prompt_sends_key_and_model() {
        let seen: Seen = Arc::default();
        let gw = gateway_for(spawn_fake_api(seen.clone()).await, Some("secret"));

        let id = gw.submit_by_prompt("rain on tin roof").await.unwrap();
        assert_eq!(id, "42");

        let seen = seen.lock().unwrap();
        let (path, key, body) = &seen[0];
        assert_eq!(path, "gpt_desc");
        assert_eq!(key.as_deref(), Some("secret"));
        assert_eq!(body["gpt_description_prompt"], "rain on tin roof");
        assert_eq!(body["mv"], "chirp-v3-5");
    }

    #[tokio::test]
    async fn submit_by_title_tags_posts_music_endpoint() {
        let seen: Seen = Arc::default();
        let gw = gateway_for(spawn_fake_api(seen.clone()).await, None);

        let request = GenerationRequest::TitleTags {
            title: "Dust".into(),
            tags: "lofi".into(),
        };
        assert_eq!(gw.submit(&request).await.unwrap(), "77");

        let seen = seen.lock().unwrap();
        let (path, key, body) = &seen[0];
        assert_eq!(path, "music");
        assert!(key.is_none(), "no api-key header without a key");
        assert_eq!(body["title"], "Dust");
        assert_eq!(body["tags"], "lofi");
    }

    #[tokio::test]
    async fn rejected_submission_is_generation_failed() {
        let gw = gateway_for(spawn_fake_api(Arc::default()).await, None);
        let err = gw.submit_by_prompt("forbidden").await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::GenerationFailed {
                reason: "prompt rejected".into()
            }
        );
    }

    #[tokio::test]
    async fn poll_status_maps_remote_states() {
        let gw = gateway_for(spawn_fake_api(Arc::default()).await, None);

        assert_eq!(
            gw.poll_status("42").await.unwrap(),
            RemoteStatus::Complete {
                audio_url: "http://x/42.mp3".into()
            }
        );
        assert_eq!(gw.poll_status("s1").await.unwrap(), RemoteStatus::Streaming);
        assert_eq!(
            gw.poll_status("q1").await.unwrap(),
            RemoteStatus::Pending("queued".into())
        );
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let gw = gateway_for(spawn_fake_api(Arc::default()).await, None);
        assert!(matches!(
            gw.poll_status("missing").await,
            Err(GatewayError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_service_is_unavailable() {
        // Grab a free port, then close it so nothing listens there.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let gw = gateway_for(format!("http://{addr}/api/v1/"), None);
        assert!(matches!(
            gw.submit_by_prompt("anything").await,
            Err(GatewayError::Unavailable(_))
        ));
    }

    #[test]
    fn stream_url_uses_item_id() {
        let gw = gateway_for("http://unused/".into(), None);
        assert_eq!(gw.stream_url("42"), "https://audiopipe.suno.ai/?item_id=42");
    }

    #[test]
    fn gateway_is_object_safe() {
        let gw: Box<dyn GenerationGateway> = Box::new(gateway_for("http://unused/".into(), None));
        drop(gw);
    }
}
