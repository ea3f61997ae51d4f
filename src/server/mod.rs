//! # Jukebox web front end
//!
//! Small axum app in front of the [`SongQueue`].
//!
//! ## Endpoints
//!
//! | Path | Description |
//! |------|-------------|
//! | `POST /generate` | JSON submission; `202` with the song id, `400` / `500` / `502` / `503` with `{error}` |
//! | `GET /` | HTML form, flashed messages and queue status |
//! | `POST /` | Form submission; flashes the outcome and redirects to `/` |
//! | `GET /status` | Queue snapshot as JSON |
//!
//! Handlers only call [`SongQueue::submit`] and [`SongQueue::snapshot`];
//! polling and playback happen in the queue's own loop. Its
//! [`QueueEvent`]s are turned into flashes when the page is next rendered.

pub mod handlers;
pub mod page;

use std::sync::{Arc, Mutex};

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast::{self, error::TryRecvError};

use crate::queue::{QueueEvent, SongQueue};
use crate::shutdown::{self, ShutdownRx};

pub use handlers::GenerateBody;

// ---------------------------------------------------------------------------
// Flash messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashKind {
    Info,
    Success,
    Danger,
}

/// One-shot message shown on the next `GET /`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn new(kind: FlashKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<QueueEvent> for Flash {
    fn from(event: QueueEvent) -> Self {
        match event {
            QueueEvent::NowPlaying { .. } => Flash::new(FlashKind::Success, "Song is now playing!"),
            QueueEvent::Finished {
                play_error: None, ..
            } => Flash::new(FlashKind::Success, "Song generated and played successfully!"),
            QueueEvent::Finished {
                play_error: Some(e),
                ..
            } => Flash::new(FlashKind::Danger, format!("Playback failed: {e}")),
            QueueEvent::Failed { message, .. } => Flash::new(
                FlashKind::Danger,
                format!("Error during song generation: {message}"),
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Shared state passed to all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<SongQueue>,
    /// Pending flashes. A single shared list: the jukebox has no sessions.
    flashes: Arc<Mutex<Vec<Flash>>>,
    events: Arc<Mutex<broadcast::Receiver<QueueEvent>>>,
}

impl AppState {
    pub fn new(queue: Arc<SongQueue>) -> Self {
        let events = Arc::new(Mutex::new(queue.subscribe()));
        Self {
            queue,
            flashes: Arc::default(),
            events,
        }
    }

    pub fn push_flash(&self, flash: Flash) {
        self.flashes
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(flash);
    }

    /// Remove and return every pending flash, including queue events
    /// received since the last call.
    pub fn take_flashes(&self) -> Vec<Flash> {
        self.collect_queue_events();
        std::mem::take(&mut *self.flashes.lock().unwrap_or_else(|p| p.into_inner()))
    }

    fn collect_queue_events(&self) {
        let mut events = self.events.lock().unwrap_or_else(|p| p.into_inner());
        loop {
            match events.try_recv() {
                Ok(event) => self.push_flash(event.into()),
                Err(TryRecvError::Lagged(skipped)) => {
                    log::warn!("server: dropped {skipped} queue events");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Router / serve
// ---------------------------------------------------------------------------

/// Build the router with all jukebox endpoints.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index).post(handlers::submit_form))
        .route("/generate", post(handlers::generate))
        .route("/status", get(handlers::status))
        .with_state(state)
}

/// Serve the router on `listener` until shutdown is requested.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    mut shutdown_rx: ShutdownRx,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        log::info!("server: listening on http://{addr}");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown::requested(&mut shutdown_rx).await })
        .await?;
    log::info!("server: stopped");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::gateway::{GatewayError, GenerationRequest, MockGateway, RemoteStatus};
    use crate::pipeline::{JukeboxClient, SongSubmitter};
    use crate::playback::RecordingSink;
    use crate::queue::QueueError;

    fn state_with(gateway: &Arc<MockGateway>) -> AppState {
        let queue = SongQueue::with_poll_interval(
            gateway.clone(),
            Arc::new(RecordingSink::new()),
            Duration::from_millis(10),
        );
        AppState::new(Arc::new(queue))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_form(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn text_body(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn generate_accepts_prompt() {
        let gateway = Arc::new(MockGateway::new());
        let app = router(state_with(&gateway));

        let response = app
            .oneshot(post_json("/generate", json!({"method": "prompt", "prompt": "sea shanty"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            json_body(response).await,
            json!({"message": "Song generation started", "song_id": "song-1"})
        );
        assert_eq!(
            gateway.submitted(),
            vec![GenerationRequest::Prompt {
                prompt: "sea shanty".into()
            }]
        );
    }

    #[tokio::test]
    async fn generate_accepts_title_tags() {
        let gateway = Arc::new(MockGateway::new());
        let app = router(state_with(&gateway));

        let response = app
            .oneshot(post_json(
                "/generate",
                json!({"method": "title_tags", "title": "Neon", "tags": "synthwave"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            gateway.submitted(),
            vec![GenerationRequest::TitleTags {
                title: "Neon".into(),
                tags: "synthwave".into()
            }]
        );
    }

    #[tokio::test]
    async fn generate_rejects_invalid_bodies() {
        let gateway = Arc::new(MockGateway::new());
        let state = state_with(&gateway);

        let missing = router(state.clone())
            .oneshot(post_json("/generate", json!({"method": "prompt"})))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(missing).await["error"], "prompt is required");

        let garbage = router(state)
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/generate")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(garbage.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(garbage).await["error"].is_string());
        assert!(gateway.submitted().is_empty());
    }

    #[tokio::test]
    async fn generate_reports_gateway_failure_as_500() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push_submit(Err(GatewayError::GenerationFailed {
            reason: "Insufficient credits".into(),
        }));
        let app = router(state_with(&gateway));

        let response = app
            .oneshot(post_json("/generate", json!({"method": "prompt", "prompt": "x"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(response).await, json!({"error": "Insufficient credits"}));
    }

    #[tokio::test]
    async fn third_submission_gets_503() {
        let gateway = Arc::new(MockGateway::new());
        let state = state_with(&gateway);

        for expected in [StatusCode::ACCEPTED, StatusCode::ACCEPTED, StatusCode::SERVICE_UNAVAILABLE] {
            let response = router(state.clone())
                .oneshot(post_json("/generate", json!({"method": "prompt", "prompt": "x"})))
                .await
                .unwrap();
            assert_eq!(response.status(), expected);
        }
        assert_eq!(gateway.submitted().len(), 2);
    }

    #[tokio::test]
    async fn form_post_flashes_and_redirects() {
        let gateway = Arc::new(MockGateway::new());
        let state = state_with(&gateway);

        let response = router(state.clone())
            .oneshot(post_form("method=prompt&prompt=rainy+tuesday&title=&tags="))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");

        let page = router(state.clone()).oneshot(get("/")).await.unwrap();
        assert_eq!(page.status(), StatusCode::OK);
        let html = text_body(page).await;
        assert!(html.contains("Song generation started. It will begin playing soon..."));
        assert!(html.contains("rainy tuesday"));

        // Flashes are shown once.
        let again = text_body(router(state).oneshot(get("/")).await.unwrap()).await;
        assert!(!again.contains("Song generation started"));
    }

    #[tokio::test]
    async fn form_validation_error_is_flashed() {
        let gateway = Arc::new(MockGateway::new());
        let state = state_with(&gateway);

        router(state.clone())
            .oneshot(post_form("method=title_tags&title=Only+title&tags="))
            .await
            .unwrap();
        let flashes = state.take_flashes();
        assert_eq!(flashes, vec![Flash::new(FlashKind::Danger, "title is required")]);
        assert!(gateway.submitted().is_empty());
    }

    #[tokio::test]
    async fn form_gateway_error_is_flashed() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push_submit(Err(GatewayError::GenerationFailed {
            reason: "bad prompt".into(),
        }));
        let state = state_with(&gateway);

        router(state.clone())
            .oneshot(post_form("method=prompt&prompt=x"))
            .await
            .unwrap();
        assert_eq!(
            state.take_flashes(),
            vec![Flash::new(FlashKind::Danger, "Error generating song: bad prompt")]
        );
    }

    #[tokio::test]
    async fn completed_song_is_reported_on_the_page() {
        let gateway = Arc::new(MockGateway::new());
        let state = state_with(&gateway);

        router(state.clone())
            .oneshot(post_form("method=prompt&prompt=x"))
            .await
            .unwrap();
        gateway.push_status(
            "song-1",
            Ok(RemoteStatus::Complete {
                audio_url: "http://x/1.mp3".into(),
            }),
        );
        state.queue.tick().await;

        let html = text_body(router(state.clone()).oneshot(get("/")).await.unwrap()).await;
        assert!(html.contains("Song generation started. It will begin playing soon..."));
        assert!(html.contains(r#"<div class="flash success">Song is now playing!</div>"#));
        assert!(html.contains(
            r#"<div class="flash success">Song generated and played successfully!</div>"#
        ));

        let again = text_body(router(state).oneshot(get("/")).await.unwrap()).await;
        assert!(!again.contains("played successfully"));
    }

    #[tokio::test]
    async fn remote_failure_is_reported_on_the_page() {
        let gateway = Arc::new(MockGateway::new());
        let state = state_with(&gateway);

        router(state.clone())
            .oneshot(post_json("/generate", json!({"method": "prompt", "prompt": "x"})))
            .await
            .unwrap();
        gateway.push_status(
            "song-1",
            Ok(RemoteStatus::Error {
                message: "content policy".into(),
            }),
        );
        state.queue.tick().await;

        assert_eq!(
            state.take_flashes(),
            vec![Flash::new(
                FlashKind::Danger,
                "Error during song generation: content policy"
            )]
        );
    }

    #[test]
    fn failed_playback_event_flashes_danger() {
        let flash = Flash::from(QueueEvent::Finished {
            song_id: "7".into(),
            play_error: Some("player exited with exit status: 1".into()),
        });
        assert_eq!(flash.kind, FlashKind::Danger);
        assert!(flash.message.starts_with("Playback failed:"));
    }

    #[tokio::test]
    async fn status_returns_queue_snapshot() {
        let gateway = Arc::new(MockGateway::new());
        let state = state_with(&gateway);
        state
            .queue
            .submit(GenerationRequest::Prompt {
                prompt: "first".into(),
            })
            .await
            .unwrap();

        let response = router(state).oneshot(get("/status")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["current"]["song_id"], "song-1");
        assert_eq!(body["current"]["status"], "submitted");
        assert_eq!(body["next"], Value::Null);
        assert_eq!(body["full"], false);
    }

    #[tokio::test]
    async fn jukebox_client_round_trips_through_real_server() {
        let gateway = Arc::new(MockGateway::new());
        let state = state_with(&gateway);
        let (tx, rx) = shutdown::channel();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve(listener, state.clone(), rx));

        let client = JukeboxClient::new(&format!("http://{addr}"));
        assert_eq!(client.submit_prompt("one").await.unwrap(), "song-1");
        assert_eq!(client.submit_prompt("two").await.unwrap(), "song-2");
        assert_eq!(client.submit_prompt("three").await, Err(QueueError::QueueFull));
        drop(client);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), server)
            .await
            .expect("server stopped")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn unreachable_service_reaches_jukebox_client_as_unavailable() {
        let gateway = Arc::new(MockGateway::new());
        gateway.push_submit(Err(GatewayError::Unavailable("connection reset".into())));
        gateway.push_submit(Err(GatewayError::GenerationFailed {
            reason: "Insufficient credits".into(),
        }));
        let state = state_with(&gateway);
        let (tx, rx) = shutdown::channel();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve(listener, state, rx));

        let client = JukeboxClient::new(&format!("http://{addr}"));
        assert!(matches!(
            client.submit_prompt("one").await,
            Err(QueueError::GatewayUnavailable(_))
        ));
        assert_eq!(
            client.submit_prompt("two").await,
            Err(QueueError::GenerationFailed {
                reason: "Insufficient credits".into()
            })
        );
        drop(client);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), server)
            .await
            .expect("server stopped")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn title_without_tags_is_accepted() {
        let gateway = Arc::new(MockGateway::new());
        let state = state_with(&gateway);

        let response = router(state.clone())
            .oneshot(post_json("/generate", json!({"method": "title_tags", "title": "Neon"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(state.queue.snapshot().current.unwrap().prompt, "Neon");
    }

    #[tokio::test]
    async fn played_song_frees_a_slot_for_the_next_request() {
        let gateway = Arc::new(MockGateway::new());
        let state = state_with(&gateway);

        for _ in 0..2 {
            router(state.clone())
                .oneshot(post_json("/generate", json!({"method": "prompt", "prompt": "x"})))
                .await
                .unwrap();
        }
        gateway.push_status(
            "song-1",
            Ok(RemoteStatus::Complete {
                audio_url: "http://x/1.mp3".into(),
            }),
        );
        state.queue.tick().await;

        let response = router(state)
            .oneshot(post_json("/generate", json!({"method": "prompt", "prompt": "x"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }
}
