use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use nw_core::{Error, Result};
use std::fmt;
use tracing::debug;
use url::Url;
use crate::Config;

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    input: String,
    model: String,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// Client for any service speaking the OpenAI `/embeddings` and
/// `/chat/completions` wire format.
pub struct OpenAiModel {
    client: Client,
    api_key: String,
    base_url: String,
    embedding_model: String,
    chat_model: String,
    dimension: usize,
}

impl OpenAiModel {
    pub fn new(config: &Config) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Config("OpenAI API key is required (OPENAI_API_KEY)".to_string()))?;
        Url::parse(&config.base_url)
            .map_err(|e| Error::Config(format!("Invalid model URL '{}': {}", config.base_url, e)))?;

        // Per-request timeouts are applied by the callers; this one only
        // guards against a connection that never completes.
        let client = Client::builder()
            .timeout(config.embed_timeout.max(config.generation_timeout))
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            embedding_model: config.embedding_model.clone(),
            chat_model: config.chat_model.clone(),
            dimension: config.dimension,
        })
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req, fail: fn(String) -> Error) -> Result<Resp>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    fail(format!("request to {} timed out", path))
                } else {
                    fail(format!("request to {} failed: {}", path, e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let reason = if status == StatusCode::TOO_MANY_REQUESTS {
                "rate limited".to_string()
            } else {
                format!("status {}", status.as_u16())
            };
            return Err(fail(format!("{} returned {}: {}", path, reason, truncate(&detail, 200))));
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| fail(format!("malformed response from {}: {}", path, e)))
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

impl fmt::Debug for OpenAiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiModel")
            .field("client", &"<reqwest::Client>")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("embedding_model", &self.embedding_model)
            .field("chat_model", &self.chat_model)
            .finish()
    }
}

#[async_trait]
impl super::InferenceModel for OpenAiModel {
    fn name(&self) -> &str {
        "OpenAI"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn generate_embeddings(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            input: text.to_string(),
            model: self.embedding_model.clone(),
        };

        let response: EmbeddingResponse = self
            .post("embeddings", &request, Error::EmbeddingService)
            .await?;

        response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::EmbeddingService("response contained no embedding".to_string()))
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.chat_model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response: ChatResponse = self
            .post("chat/completions", &request, Error::GenerationService)
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::GenerationService("response contained no message".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::InferenceModel;
    use axum::{http::{HeaderMap, StatusCode as HttpStatus}, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v1", addr)
    }

    fn model(base_url: String) -> OpenAiModel {
        OpenAiModel::new(&Config {
            api_key: Some("test-key".to_string()),
            base_url,
            dimension: 3,
            ..Default::default()
        })
        .unwrap()
    }

    async fn embeddings(headers: HeaderMap, Json(body): Json<Value>) -> (HttpStatus, Json<Value>) {
        if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("Bearer test-key") {
            return (HttpStatus::UNAUTHORIZED, Json(json!({"error": "bad key"})));
        }
        if body["model"] != "text-embedding-ada-002" || !body["input"].is_string() {
            return (HttpStatus::BAD_REQUEST, Json(json!({"error": "bad request"})));
        }
        (HttpStatus::OK, Json(json!({"data": [{"embedding": [0.1, 0.2, 0.3]}]})))
    }

    async fn chat(Json(body): Json<Value>) -> Json<Value> {
        let prompt = body["messages"][0]["content"].as_str().unwrap_or_default().to_string();
        Json(json!({
            "choices": [{"message": {"role": "assistant", "content": format!("echo: {}", prompt)}}]
        }))
    }

    #[test]
    fn test_model_requires_api_key() {
        let result = OpenAiModel::new(&Config::default());
        assert!(matches!(result, Err(Error::Config(_))));

        let result = OpenAiModel::new(&Config {
            api_key: Some("test-key".to_string()),
            ..Default::default()
        });
        assert!(result.is_ok());
    }

    #[test]
    fn test_invalid_base_url() {
        let result = OpenAiModel::new(&Config {
            api_key: Some("test-key".to_string()),
            base_url: "::not-a-url".to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_generate_embeddings() {
        let base = spawn(Router::new().route("/v1/embeddings", post(embeddings))).await;
        let embedding = model(base).generate_embeddings("hello world").await.unwrap();
        assert_eq!(embedding, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn test_rate_limit_is_embedding_error() {
        let router = Router::new().route(
            "/v1/embeddings",
            post(|| async { (HttpStatus::TOO_MANY_REQUESTS, "slow down") }),
        );
        let base = spawn(router).await;
        let err = model(base).generate_embeddings("hello").await.unwrap_err();
        match err {
            Error::EmbeddingService(msg) => assert!(msg.contains("rate limited")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_embedding_response() {
        let router = Router::new().route(
            "/v1/embeddings",
            post(|| async { Json(json!({"data": []})) }),
        );
        let base = spawn(router).await;
        let err = model(base).generate_embeddings("hello").await.unwrap_err();
        assert!(matches!(err, Error::EmbeddingService(_)));
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        // Bind and immediately drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = model(format!("http://{}/v1", addr))
            .generate_embeddings("hello")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmbeddingService(_)));
    }

    #[tokio::test]
    async fn test_complete() {
        let base = spawn(Router::new().route("/v1/chat/completions", post(chat))).await;
        let answer = model(base).complete("What happened?").await.unwrap();
        assert_eq!(answer, "echo: What happened?");
    }

    #[tokio::test]
    async fn test_complete_server_error_is_generation_error() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (HttpStatus::INTERNAL_SERVER_ERROR, "boom") }),
        );
        let base = spawn(router).await;
        let err = model(base).complete("hi").await.unwrap_err();
        match err {
            Error::GenerationService(msg) => assert!(msg.contains("500")),
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
