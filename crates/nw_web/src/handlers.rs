use axum::{
    extract::{rejection::QueryRejection, Query, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use nw_core::{AnswerResponse, Error};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::error;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

/// Any pipeline failure, rendered as `{"error": ...}`.
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!("Error: {}", self.0);
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub async fn search_news(
    State(state): State<Arc<AppState>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let Query(params) = params.map_err(|rejection| Error::Validation(rejection.body_text()))?;
    let response = state.orchestrator.answer(params.q.as_deref()).await?;
    Ok(Json(response))
}

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
}

pub async fn serve_feed(State(state): State<Arc<AppState>>) -> Response {
    let Some(path) = state.feed_path.as_ref() else {
        return not_found("No feed found");
    };
    match tokio::fs::read_to_string(path).await {
        Ok(body) => {
            let content_type = match path.extension().and_then(|e| e.to_str()) {
                Some("json") => "application/json",
                _ => "application/xml",
            };
            ([(header::CONTENT_TYPE, content_type)], body).into_response()
        }
        Err(_) => not_found("No feed found"),
    }
}

async fn serve_manifest(state: &AppState, relative: &str, request: Request) -> Response {
    let Some(path) = state.manifest_dir.as_ref().map(|dir| dir.join(relative)) else {
        return not_found("No manifest found");
    };
    let is_file = tokio::fs::metadata(&path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false);
    if !is_file {
        return not_found("No manifest found");
    }

    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}

/// Agent discovery manifest.
pub async fn ai_plugin(State(state): State<Arc<AppState>>, request: Request) -> Response {
    serve_manifest(&state, ".well-known/ai-plugin.json", request).await
}

pub async fn openapi(State(state): State<Arc<AppState>>, request: Request) -> Response {
    serve_manifest(&state, "openapi.yaml", request).await
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
