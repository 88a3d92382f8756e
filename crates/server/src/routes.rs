use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use nodes::RunOptions;
use pipeline::{FinalResponse, RequestId, RequestState};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{AppState, ExampleRequest, EXAMPLES};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/generate", post(generate))
        .route("/api/requests/:id", get(request_state))
        .route("/api/health", get(health))
        .route("/api/config", get(config))
        .route("/api/examples", get(examples))
        .route("/api/test-agents", get(test_agents))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            status: "error",
            error: error.into(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct GenerateBody {
    #[serde(default)]
    request: String,
    #[serde(default = "enabled")]
    enable_review: bool,
}

async fn generate(
    State(state): State<AppState>,
    body: Result<Json<GenerateBody>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => return error_response(rejection.status(), rejection.body_text()),
    };
    let request = body.request.trim();
    if request.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Request text is required");
    }

    let preview: String = request.chars().take(50).collect();
    info!(request = %preview, enable_review = body.enable_review, "Generation requested");

    let response: FinalResponse = state
        .executor()
        .submit_with(
            request,
            RunOptions {
                enable_review: body.enable_review,
            },
        )
        .await;

    info!(
        request_id = %response.request_id(),
        success = response.is_success(),
        "Generation finished"
    );
    Json(response).into_response()
}

async fn request_state(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RequestState>, Response> {
    let not_found = || error_response(StatusCode::NOT_FOUND, format!("Unknown request id '{id}'"));
    let Ok(request_id) = id.parse::<RequestId>() else {
        return Err(not_found());
    };
    state
        .executor()
        .lookup(request_id)
        .await
        .map(Json)
        .ok_or_else(not_found)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let provider = state.provider();
    Json(json!({
        "status": "healthy",
        "provider": provider.provider,
        "model": provider.model,
    }))
}

async fn config(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.provider()))
}

async fn examples() -> Json<&'static [ExampleRequest]> {
    Json(EXAMPLES)
}

async fn test_agents(State(state): State<AppState>) -> Json<analysis::SelfTestReport> {
    Json(analysis::self_test(state.syntax(), state.references()).await)
}
