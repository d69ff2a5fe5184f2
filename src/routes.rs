use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::AppState;

#[derive(Debug, Deserialize)]
pub struct AskParams {
    pub query: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api", get(ask))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// `GET /api?query=...` returns the answer as a JSON string. Internal
/// failures still answer 200 with `""`.
async fn ask(State(state): State<AppState>, Query(params): Query<AskParams>) -> Response {
    if params.query.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, "query must not be empty").into_response();
    }

    info!(question = %params.query, "question received");
    let answer = state.answerer.ask(&params.query).await;
    Json(answer).into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
