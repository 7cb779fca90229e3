use axum::Router;
use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::state::SharedState;

/// Build the main application router with all routes.
pub fn build_router(state: SharedState, twilio_routes: Option<Router>) -> Router {
    let mut app = Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health))
        .route("/static/generated_images/{filename}", get(get_generated_image))
        .with_state(state);

    if let Some(twilio) = twilio_routes {
        app = app.merge(twilio);
    }

    app.layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
    #[serde(default)]
    pub reset: bool,
}

fn default_session_id() -> String {
    "web_default".to_string()
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: String,
}

/// POST /chat: run one conversational round for the session's thread.
///
/// Model and tool failures never surface as HTTP errors here: the caller
/// always gets a 200-shaped body whose message is either the answer or a
/// short apologetic error string.
async fn chat(
    State(state): State<SharedState>,
    axum::Json(request): axum::Json<ChatRequest>,
) -> Response {
    let Some(agent) = &state.agent else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            axum::Json(json!({"detail": "Service unavailable"})),
        )
            .into_response();
    };

    if request.reset {
        if let Err(e) = agent.reset(&request.session_id).await {
            warn!("failed to reset thread {}: {e}", request.session_id);
        }
    }

    match agent
        .process_message(&request.session_id, &request.message)
        .await
    {
        Ok(message) => axum::Json(ChatResponse { message }).into_response(),
        Err(e) => {
            error!("chat round failed for {}: {e}", request.session_id);
            axum::Json(ChatResponse {
                message: format!("I encountered an error: {e}"),
            })
            .into_response()
        }
    }
}

/// GET /static/generated_images/{filename}: serve a generated image.
async fn get_generated_image(
    State(state): State<SharedState>,
    Path(filename): Path<String>,
) -> Response {
    // The route only matches a single segment, but reject separators anyway.
    if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
        return image_not_found(&filename);
    }

    let filepath = state.config.images_dir.join(&filename);
    match tokio::fs::read(&filepath).await {
        Ok(bytes) => {
            let content_type = murmur_media::content_type_for(&filename);
            info!("image fetched: {filename} ({content_type})");
            ([(header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        Err(_) => image_not_found(&filename),
    }
}

fn image_not_found(filename: &str) -> Response {
    error!("image 404: {filename}");
    (
        StatusCode::NOT_FOUND,
        axum::Json(json!({"detail": "Image not found"})),
    )
        .into_response()
}

/// GET /health: constant healthy status, no side effects.
async fn health() -> axum::Json<serde_json::Value> {
    axum::Json(json!({"status": "ok"}))
}
