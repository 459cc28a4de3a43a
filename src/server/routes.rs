//! HTTP routes
//!
//! | Path | Description |
//! |------|-------------|
//! | `POST /control/start` | Start the encoder, `{ok, msg}` |
//! | `POST /control/stop` | Stop the encoder, `{ok, msg}` |
//! | `GET /stream` | Live `audio/mpeg` stream, 503 when nothing is live |
//! | `GET /metadata` | Current `{song}` |
//! | `POST /metadata` | Update `{song}` |
//! | `GET /player.html` | Static player page |
//! | `GET /stats` | Diagnostic counters |
//! | `GET /health` | Liveness probe |

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tower_http::{services::ServeFile, trace::TraceLayer};

use crate::control::{ControlOutcome, Relay};
use crate::error::RelayError;
use crate::metadata::NowPlaying;
use crate::stats::RelayStats;

/// Shared state passed to all request handlers
#[derive(Clone)]
struct AppState {
    relay: Arc<Relay>,
    /// Caps concurrent `/stream` listeners when configured
    listener_limit: Option<Arc<Semaphore>>,
}

/// Body of `POST /metadata`
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MetadataUpdate {
    song: Option<String>,
}

/// Response of `POST /metadata`
#[derive(Debug, Serialize)]
struct MetadataResponse {
    ok: bool,
    metadata: NowPlaying,
}

/// Build the router serving `relay`
pub fn create_router(relay: Arc<Relay>) -> Router {
    let server = &relay.config().server;
    let listener_limit = match server.max_listeners {
        0 => None,
        max => Some(Arc::new(Semaphore::new(max))),
    };
    let player = ServeFile::new(&server.player_path);

    Router::new()
        .route("/health", get(health_check))
        .route("/control/start", post(control_start))
        .route("/control/stop", post(control_stop))
        .route("/stream", get(stream_audio))
        .route("/metadata", get(get_metadata).post(set_metadata))
        .route("/stats", get(get_stats))
        .route_service("/player.html", player)
        .layer(TraceLayer::new_for_http())
        .with_state(AppState {
            relay,
            listener_limit,
        })
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

async fn control_start(State(state): State<AppState>) -> Json<ControlOutcome> {
    let relay = Arc::clone(&state.relay);
    // Spawning and killing processes blocks briefly
    let outcome = tokio::task::spawn_blocking(move || relay.start())
        .await
        .unwrap_or_else(|e| ControlOutcome::failure(format!("Start task failed: {e}")));
    Json(outcome)
}

async fn control_stop(State(state): State<AppState>) -> Json<ControlOutcome> {
    let relay = Arc::clone(&state.relay);
    let outcome = tokio::task::spawn_blocking(move || relay.stop())
        .await
        .unwrap_or_else(|e| ControlOutcome::failure(format!("Stop task failed: {e}")));
    Json(outcome)
}

/// Serve one listener from its own subscriber session
///
/// The session lives inside the response body; when the client goes away
/// hyper drops the body and the session deregisters.
async fn stream_audio(State(state): State<AppState>) -> Response {
    let permit = match &state.listener_limit {
        Some(limit) => match Arc::clone(limit).try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!("Listener rejected: limit reached");
                return (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(ControlOutcome::failure("Listener limit reached")),
                )
                    .into_response();
            }
        },
        None => None,
    };

    let session = match state.relay.subscribe() {
        Ok(session) => session,
        Err(e) => return error_response(&e),
    };

    let body = session.into_stream().map(move |chunk| {
        // Released when the body is dropped
        let _permit = &permit;
        chunk
    });

    (
        [
            (header::CONTENT_TYPE, "audio/mpeg"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(body),
    )
        .into_response()
}

async fn get_metadata(State(state): State<AppState>) -> Json<NowPlaying> {
    Json(state.relay.now_playing())
}

async fn set_metadata(
    State(state): State<AppState>,
    Json(update): Json<MetadataUpdate>,
) -> Json<MetadataResponse> {
    let metadata = state.relay.set_now_playing(update.song.as_deref());
    tracing::info!(song = %metadata.song, "Metadata updated");
    Json(MetadataResponse { ok: true, metadata })
}

async fn get_stats(State(state): State<AppState>) -> Json<RelayStats> {
    Json(state.relay.stats())
}

fn error_response(error: &RelayError) -> Response {
    let status =
        StatusCode::from_u16(error.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(ControlOutcome::failure(error.to_string()))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::config::RelayConfig;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn router() -> Router {
        create_router(Arc::new(Relay::new(RelayConfig::default())))
    }

    #[tokio::test]
    async fn test_health() {
        let response = router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_stream_unavailable_when_stopped() {
        let response = router()
            .oneshot(Request::get("/stream").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["ok"], false);
        assert_eq!(json["msg"], "Stream is not running");
    }

    #[tokio::test]
    async fn test_stop_when_not_running() {
        let response = router()
            .oneshot(Request::post("/control/stop").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json, serde_json::json!({"ok": false, "msg": "Not running"}));
    }

    #[tokio::test]
    async fn test_metadata_get_and_set() {
        let app = router();

        let response = app
            .clone()
            .oneshot(Request::get("/metadata").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await, serde_json::json!({"song": "DJ is offline"}));

        let response = app
            .clone()
            .oneshot(
                Request::post("/metadata")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"song": "Track 1"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"ok": true, "metadata": {"song": "Track 1"}})
        );

        // Missing song leaves the title unchanged
        let response = app
            .clone()
            .oneshot(
                Request::post("/metadata")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(body_json(response).await["metadata"]["song"], "Track 1");
    }

    #[tokio::test]
    async fn test_stats() {
        let response = router()
            .oneshot(Request::get("/stats").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let json = body_json(response).await;
        assert_eq!(json["state"], "stopped");
        assert_eq!(json["active_subscribers"], 0);
        assert!(json["active_generation"].is_null());
    }

    #[tokio::test]
    async fn test_player_missing_is_404() {
        let mut config = RelayConfig::default();
        config.server.player_path = "/nonexistent/player_xyz.html".into();
        let app = create_router(Arc::new(Relay::new(config)));

        let response = app
            .oneshot(Request::get("/player.html").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_player_served() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("player.html");
        std::fs::write(&path, "<audio src=\"/stream\"></audio>").unwrap();

        let mut config = RelayConfig::default();
        config.server.player_path = path;
        let app = create_router(Arc::new(Relay::new(config)));

        let response = app
            .oneshot(Request::get("/player.html").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
    }
}
