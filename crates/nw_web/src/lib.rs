use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod handlers;
pub mod state;

pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/search", get(handlers::search_news))
        .route("/feed.xml", get(handlers::serve_feed))
        .route("/health", get(handlers::health))
        .route("/.well-known/ai-plugin.json", get(handlers::ai_plugin))
        .route("/openapi.yaml", get(handlers::openapi))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Serves the app until Ctrl+C.
pub async fn serve(addr: SocketAddr, state: AppState) -> nw_core::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🚀 Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutting down");
            }
        })
        .await?;
    Ok(())
}

pub mod prelude {
    pub use nw_core::{AnswerResponse, Result, Error};
    pub use crate::{create_app, AppState};
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use nw_core::{CollectionSpec, Error, InferenceModel, Result, VectorIndex};
    use nw_query::{QueryConfig, QueryOrchestrator};
    use nw_storage::InMemoryStorage;
    use serde_json::Value;
    use std::io::Write;
    use tower::ServiceExt;

    #[derive(Debug)]
    struct FixedModel {
        fail: bool,
    }

    #[async_trait]
    impl InferenceModel for FixedModel {
        fn name(&self) -> &str {
            "fixed"
        }

        fn dimension(&self) -> usize {
            2
        }

        async fn generate_embeddings(&self, _text: &str) -> Result<Vec<f32>> {
            if self.fail {
                return Err(Error::EmbeddingService("upstream down".to_string()));
            }
            Ok(vec![1.0, 0.0])
        }

        async fn complete(&self, _prompt: &str) -> Result<String> {
            Ok("nothing yet".to_string())
        }
    }

    async fn state(fail: bool) -> AppState {
        let storage = Arc::new(InMemoryStorage::new());
        storage.reset_collection(&CollectionSpec::new("news", 2)).await.unwrap();
        let orchestrator = QueryOrchestrator::from_parts(
            Arc::new(FixedModel { fail }),
            storage,
            &QueryConfig::new("news"),
        );
        AppState::new(Arc::new(orchestrator))
    }

    async fn app(fail: bool, feed_path: Option<std::path::PathBuf>) -> Router {
        create_app(state(fail).await.with_feed_path(feed_path))
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, body.to_vec())
    }

    fn json(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[tokio::test]
    async fn test_missing_q_is_bad_request() {
        let (status, body) = get(app(false, None).await, "/search").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json(&body)["error"], "Missing query parameter 'q'");

        let (status, _) = get(app(false, None).await, "/search?q=").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unparseable_query_string_is_json_error() {
        let response = app(false, None)
            .await
            .oneshot(Request::builder().uri("/search?q=a&q=b").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()["content-type"], "application/json");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(json(&body)["error"].as_str().unwrap().contains("duplicate field"));
    }

    #[tokio::test]
    async fn test_search_on_empty_index() {
        let (status, body) = get(app(false, None).await, "/search?q=What%20happened%20in%20AI%3F").await;
        assert_eq!(status, StatusCode::OK);
        let body = json(&body);
        assert_eq!(body["answer"], "nothing yet");
        assert_eq!(body["source_data"], Value::Array(vec![]));
    }

    #[tokio::test]
    async fn test_service_failure_is_internal_error() {
        let (status, body) = get(app(true, None).await, "/search?q=hello").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = json(&body);
        assert!(body["error"].as_str().unwrap().contains("upstream down"));
        assert!(body.get("answer").is_none());
    }

    #[tokio::test]
    async fn test_feed_passthrough() {
        let (status, body) = get(app(false, None).await, "/feed.xml").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json(&body)["error"], "No feed found");

        let mut file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
        file.write_all(b"<rss><channel></channel></rss>").unwrap();
        let app = app(false, Some(file.path().to_path_buf())).await;
        let response = app
            .oneshot(Request::builder().uri("/feed.xml").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/xml");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"<rss><channel></channel></rss>");
    }

    #[tokio::test]
    async fn test_discovery_manifests() {
        let (status, body) = get(app(false, None).await, "/openapi.yaml").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json(&body)["error"], "No manifest found");

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".well-known")).unwrap();
        std::fs::write(
            dir.path().join(".well-known/ai-plugin.json"),
            r#"{"name_for_model": "news"}"#,
        )
        .unwrap();

        let manifests = create_app(state(false).await.with_manifest_dir(Some(dir.path().to_path_buf())));

        let response = manifests
            .clone()
            .oneshot(Request::builder().uri("/.well-known/ai-plugin.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/json");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(json(&body)["name_for_model"], "news");

        // openapi.yaml is absent from this directory
        let (status, body) = get(manifests, "/openapi.yaml").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json(&body)["error"], "No manifest found");
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get(app(false, None).await, "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json(&body)["status"], "ok");
    }
}
