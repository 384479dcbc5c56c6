use axum::{
    http::{StatusCode, Uri},
    response::IntoResponse,
    Json,
};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "OK", "message": "server is running" }))
}

pub async fn not_found(uri: Uri) -> impl IntoResponse {
    tracing::debug!(%uri, "no route");
    (StatusCode::NOT_FOUND, Json(json!({ "message": "route not found" })))
}
