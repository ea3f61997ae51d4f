//! Request handlers for the jukebox front end.

use axum::extract::rejection::{FormRejection, JsonRejection};
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::json;

use crate::gateway::GenerationRequest;
use crate::queue::{QueueError, QueueSnapshot};

use super::page::render_index;
use super::{AppState, Flash, FlashKind};

// ---------------------------------------------------------------------------
// GenerateBody
// ---------------------------------------------------------------------------

/// Body of `POST /generate` (JSON) and `POST /` (form-encoded).
///
/// Kept flat and lenient so both encodings share it; [`into_request`]
/// does the validation.
///
/// [`into_request`]: GenerateBody::into_request
#[derive(Debug, Default, Deserialize)]
pub struct GenerateBody {
    #[serde(default)]
    pub method: String,
    pub prompt: Option<String>,
    pub title: Option<String>,
    pub tags: Option<String>,
}

impl GenerateBody {
    /// Validate into a [`GenerationRequest`]; `Err` carries a user-facing
    /// message.
    pub fn into_request(self) -> Result<GenerationRequest, String> {
        let non_empty = |v: Option<String>| {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        match self.method.trim() {
            "prompt" => non_empty(self.prompt)
                .map(|prompt| GenerationRequest::Prompt { prompt })
                .ok_or_else(|| "prompt is required".to_string()),
            "title_tags" => non_empty(self.title)
                .map(|title| GenerationRequest::TitleTags {
                    title,
                    tags: non_empty(self.tags).unwrap_or_default(),
                })
                .ok_or_else(|| "title is required".to_string()),
            "" => Err("method is required".to_string()),
            other => Err(format!(
                "unknown method `{other}`, expected `prompt` or `title_tags`"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// HTTP status and message for a refused submission.
fn queue_error_response(error: &QueueError) -> (StatusCode, String) {
    match error {
        QueueError::QueueFull => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Queue is full: a song is playing and another is waiting. Try again later.".into(),
        ),
        QueueError::GenerationFailed { reason } => {
            (StatusCode::INTERNAL_SERVER_ERROR, reason.clone())
        }
        // 502 tells callers the service was unreachable, not that it refused.
        QueueError::GatewayUnavailable(msg) => (
            StatusCode::BAD_GATEWAY,
            format!("Failed to get a valid response from the generation service: {msg}"),
        ),
    }
}

fn json_error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `POST /generate`
pub async fn generate(
    State(state): State<AppState>,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return json_error(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    let request = match body.into_request() {
        Ok(request) => request,
        Err(message) => return json_error(StatusCode::BAD_REQUEST, message),
    };

    match state.queue.submit(request).await {
        Ok(song_id) => (
            StatusCode::ACCEPTED,
            Json(json!({ "message": "Song generation started", "song_id": song_id })),
        )
            .into_response(),
        Err(e) => {
            log::warn!("server: /generate refused: {e}");
            let (status, message) = queue_error_response(&e);
            json_error(status, message)
        }
    }
}

/// `GET /`
pub async fn index(State(state): State<AppState>) -> Html<String> {
    let flashes = state.take_flashes();
    Html(render_index(&flashes, &state.queue.snapshot()))
}

/// `POST /`: submit the form, flash the outcome, redirect back to `/`.
pub async fn submit_form(
    State(state): State<AppState>,
    form: Result<Form<GenerateBody>, FormRejection>,
) -> Redirect {
    let flash = match form {
        Err(rejection) => Flash::new(FlashKind::Danger, rejection.body_text()),
        Ok(Form(body)) => match body.into_request() {
            Err(message) => Flash::new(FlashKind::Danger, message),
            Ok(request) => match state.queue.submit(request).await {
                Ok(song_id) => {
                    log::info!("server: form queued song {song_id}");
                    Flash::new(
                        FlashKind::Info,
                        "Song generation started. It will begin playing soon...",
                    )
                }
                Err(e @ QueueError::QueueFull) => {
                    Flash::new(FlashKind::Danger, queue_error_response(&e).1)
                }
                Err(e) => {
                    let (_, message) = queue_error_response(&e);
                    Flash::new(FlashKind::Danger, format!("Error generating song: {message}"))
                }
            },
        },
    };
    state.push_flash(flash);
    Redirect::to("/")
}

/// `GET /status`
pub async fn status(State(state): State<AppState>) -> Json<QueueSnapshot> {
    Json(state.queue.snapshot())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn body(method: &str, prompt: Option<&str>, title: Option<&str>, tags: Option<&str>) -> GenerateBody {
        GenerateBody {
            method: method.into(),
            prompt: prompt.map(Into::into),
            title: title.map(Into::into),
            tags: tags.map(Into::into),
        }
    }

    #[test]
    fn prompt_body_is_trimmed() {
        assert_eq!(
            body("prompt", Some("  a song about cats "), None, None).into_request(),
            Ok(GenerationRequest::Prompt {
                prompt: "a song about cats".into()
            })
        );
    }

    #[test]
    fn blank_prompt_is_rejected() {
        assert_eq!(
            body("prompt", Some("   "), None, None).into_request(),
            Err("prompt is required".into())
        );
    }

    #[test]
    fn title_tags_need_a_title_but_not_tags() {
        assert_eq!(
            body("title_tags", None, Some("  "), Some("lofi")).into_request(),
            Err("title is required".into())
        );
        assert_eq!(
            body("title_tags", None, Some("Night"), Some("")).into_request(),
            Ok(GenerationRequest::TitleTags {
                title: "Night".into(),
                tags: String::new()
            })
        );
        assert_eq!(
            body("title_tags", None, Some("Night"), None).into_request(),
            Ok(GenerationRequest::TitleTags {
                title: "Night".into(),
                tags: String::new()
            })
        );
        assert_eq!(
            body("title_tags", None, Some("Night"), Some("lofi, rain")).into_request(),
            Ok(GenerationRequest::TitleTags {
                title: "Night".into(),
                tags: "lofi, rain".into()
            })
        );
    }

    #[test]
    fn unknown_or_missing_method_is_rejected() {
        assert!(body("lyrics", Some("x"), None, None)
            .into_request()
            .unwrap_err()
            .contains("lyrics"));
        assert_eq!(
            body("", Some("x"), None, None).into_request(),
            Err("method is required".into())
        );
    }

    #[test]
    fn queue_errors_map_to_status_codes() {
        assert_eq!(
            queue_error_response(&QueueError::QueueFull).0,
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            queue_error_response(&QueueError::GenerationFailed {
                reason: "quota".into()
            }),
            (StatusCode::INTERNAL_SERVER_ERROR, "quota".to_string())
        );
        assert_eq!(
            queue_error_response(&QueueError::GatewayUnavailable("timeout".into())).0,
            StatusCode::BAD_GATEWAY
        );
    }
}
