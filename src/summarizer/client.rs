//! OpenAI-compatible chat completions client
//!
//! Talks to any `/chat/completions` endpoint (OpenRouter by default) with
//! plain reqwest, so no provider SDK is needed.

use crate::config::ModelConfig;
use crate::error::{Error, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single chat message
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// Request body for `/chat/completions`
#[derive(Debug, Clone, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    id: String,
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// Outcome of one HTTP attempt
enum Attempt {
    Done(String),
    Retry(Error),
    Fail(Error),
}

/// Chat completions client with timeout and bounded retry
pub struct CompletionClient {
    client: Client,
    api_key: String,
    base_url: String,
    max_retries: u32,
    retry_backoff: Duration,
}

impl CompletionClient {
    /// Create a client from model configuration and a resolved API key
    pub fn new(config: &ModelConfig, api_key: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    /// Run a completion and return the trimmed text of the first choice.
    ///
    /// Transport errors, timeouts, 429 and 5xx responses are retried up to
    /// `max_retries` times with doubling backoff. Everything else fails
    /// immediately.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.attempt(request).await {
                Attempt::Done(text) => return Ok(text),
                Attempt::Fail(e) => return Err(e),
                Attempt::Retry(e) if attempt >= self.max_retries => return Err(e),
                Attempt::Retry(e) => {
                    let delay = self.retry_backoff * 2u32.saturating_pow(attempt);
                    tracing::warn!(
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Model request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(&self, request: &CompletionRequest) -> Attempt {
        let response = match self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("X-Title", "FeedClaw")
            .json(request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let err = Error::Summarizer(format!("Request failed: {}", e));
                return if e.is_timeout() || e.is_connect() || e.is_request() {
                    Attempt::Retry(err)
                } else {
                    Attempt::Fail(err)
                };
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                return Attempt::Retry(Error::Summarizer(format!(
                    "Failed to read response: {}",
                    e
                )))
            }
        };

        if !status.is_success() {
            let detail = match serde_json::from_str::<ApiError>(&text) {
                Ok(err) => format!("{} (code: {:?})", err.error.message, err.error.code),
                Err(_) => text.chars().take(200).collect(),
            };
            let err = Error::Summarizer(format!("Model API error {}: {}", status, detail));
            return if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                Attempt::Retry(err)
            } else {
                Attempt::Fail(err)
            };
        }

        match parse_completion(&text) {
            Ok(content) => Attempt::Done(content),
            Err(e) => Attempt::Fail(e),
        }
    }
}

/// Extract the trimmed text of the first choice
fn parse_completion(body: &str) -> Result<String> {
    let response: CompletionResponse = serde_json::from_str(body).map_err(|e| {
        Error::Summarizer(format!(
            "Malformed response ({}): {}",
            e,
            body.chars().take(200).collect::<String>()
        ))
    })?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::Summarizer("Response has no choices".to_string()))?;

    if let Some(refusal) = choice.message.refusal.as_deref() {
        tracing::warn!(refusal = %refusal, "Model refused to summarize");
    }

    let content = choice.message.content.unwrap_or_default();
    let content = content.trim();
    if content.is_empty() {
        return Err(Error::Summarizer(format!(
            "Empty completion (id: {}, finish_reason: {:?})",
            response.id, choice.finish_reason
        )));
    }

    tracing::debug!(response_id = %response.id, chars = content.len(), "Completion received");
    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode as AxumStatus, routing::post, Json, Router};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn test_config(base_url: String) -> ModelConfig {
        ModelConfig {
            base_url,
            timeout_secs: 5,
            max_retries: 2,
            retry_backoff_ms: 1,
            ..ModelConfig::default()
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "test-model".to_string(),
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("hi")],
            max_tokens: 10,
            temperature: 0.7,
        }
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_parse_completion_trims() {
        let body = r#"{"id":"c1","choices":[{"message":{"content":"  A summary.  \n"},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_completion(body).unwrap(), "A summary.");
    }

    #[test]
    fn test_parse_completion_rejects_empty_and_malformed() {
        let empty = r#"{"id":"c1","choices":[{"message":{"content":"   "}}]}"#;
        assert!(matches!(parse_completion(empty), Err(Error::Summarizer(_))));

        let no_choices = r#"{"id":"c1","choices":[]}"#;
        assert!(matches!(parse_completion(no_choices), Err(Error::Summarizer(_))));

        assert!(matches!(parse_completion("<html>"), Err(Error::Summarizer(_))));
    }

    #[test]
    fn test_request_serialization() {
        let value = serde_json::to_value(request()).unwrap();
        assert_eq!(value["model"], "test-model");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "hi");
        assert_eq!(value["max_tokens"], 10);
    }

    #[tokio::test]
    async fn test_complete_success() {
        let app = Router::new().route(
            "/chat/completions",
            post(|Json(body): Json<serde_json::Value>| async move {
                let prompt = body["messages"][1]["content"].as_str().unwrap_or("").to_string();
                Json(serde_json::json!({
                    "id": "c1",
                    "choices": [{"message": {"content": format!("echo: {}", prompt)}}]
                }))
            }),
        );
        let base = serve(app).await;

        let client = CompletionClient::new(&test_config(base), "key".to_string()).unwrap();
        assert_eq!(client.complete(&request()).await.unwrap(), "echo: hi");
    }

    #[tokio::test]
    async fn test_rate_limit_is_retried_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let app = Router::new().route(
            "/chat/completions",
            post(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        (
                            AxumStatus::TOO_MANY_REQUESTS,
                            Json(serde_json::json!({"error": {"message": "slow down", "code": 429}})),
                        )
                    } else {
                        (
                            AxumStatus::OK,
                            Json(serde_json::json!({"choices": [{"message": {"content": "ok"}}]})),
                        )
                    }
                }
            }),
        );
        let base = serve(app).await;

        let client = CompletionClient::new(&test_config(base), "key".to_string()).unwrap();
        assert_eq!(client.complete(&request()).await.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let app = Router::new().route(
            "/chat/completions",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (
                        AxumStatus::UNAUTHORIZED,
                        Json(serde_json::json!({"error": {"message": "bad key"}})),
                    )
                }
            }),
        );
        let base = serve(app).await;

        let client = CompletionClient::new(&test_config(base), "key".to_string()).unwrap();
        let err = client.complete(&request()).await.unwrap_err();
        assert!(err.to_string().contains("bad key"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_server_errors_exhaust_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let app = Router::new().route(
            "/chat/completions",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (AxumStatus::BAD_GATEWAY, "upstream down")
                }
            }),
        );
        let base = serve(app).await;

        let client = CompletionClient::new(&test_config(base), "key".to_string()).unwrap();
        assert!(client.complete(&request()).await.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_timeout_is_retried_then_fails() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let app = Router::new().route(
            "/chat/completions",
            post(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    Json(serde_json::json!({"choices": [{"message": {"content": "late"}}]}))
                }
            }),
        );
        let base = serve(app).await;

        let config = ModelConfig {
            timeout_secs: 1,
            ..test_config(base)
        };
        let client = CompletionClient::new(&config, "key".to_string()).unwrap();
        let err = client.complete(&request()).await.unwrap_err();

        assert!(matches!(err, Error::Summarizer(_)));
        assert_eq!(calls.load(Ordering::SeqCst), config.max_retries + 1);
    }

    #[tokio::test]
    async fn test_connection_refused_is_retried_then_fails() {
        // Reserve a port, then free it so nothing is listening
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client =
            CompletionClient::new(&test_config(format!("http://{}", addr)), "key".to_string())
                .unwrap();
        let err = client.complete(&request()).await.unwrap_err();

        match err {
            Error::Summarizer(message) => assert!(message.starts_with("Request failed")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_connection_refused_recovers_when_server_appears() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        // The first attempt is refused; the server is up before the retry
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
            let app = Router::new().route(
                "/chat/completions",
                post(|| async {
                    Json(serde_json::json!({"choices": [{"message": {"content": "back"}}]}))
                }),
            );
            axum::serve(listener, app).await.unwrap();
        });

        let config = ModelConfig {
            retry_backoff_ms: 500,
            ..test_config(format!("http://{}", addr))
        };
        let client = CompletionClient::new(&config, "key".to_string()).unwrap();
        assert_eq!(client.complete(&request()).await.unwrap(), "back");
    }
}
