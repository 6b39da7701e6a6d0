//! The remote inference call.
//!
//! [`InferenceRuntime`] is the seam between the dispatcher and the managed
//! inference service. [`HttpRuntime`] speaks the `InvokeModel` REST shape
//! over reqwest; [`MockRuntime`] replays queued replies for tests and
//! offline use.

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::config::RuntimeConfig;
use crate::error::RuntimeError;
use crate::model::ModelId;

/// A synchronous-in-spirit remote model invocation: one request body in,
/// one reply body out. Implementations do not retry.
#[async_trait]
pub trait InferenceRuntime: Send + Sync {
    async fn invoke(&self, model_id: &ModelId, body: &Value) -> Result<Vec<u8>, RuntimeError>;
}

/// `InvokeModel` over HTTPS.
pub struct HttpRuntime {
    client: Client,
    endpoint: String,
    bearer_token: Option<String>,
}

impl HttpRuntime {
    /// Create a runtime from configuration.
    ///
    /// The bearer token is read from the environment variable named in
    /// `config.api_key_env`; when it is unset, requests go out without an
    /// `Authorization` header (for endpoints that sign requests upstream).
    pub fn new(config: &RuntimeConfig) -> Self {
        let bearer_token = std::env::var(&config.api_key_env)
            .ok()
            .filter(|token| !token.is_empty());
        Self::with_token(config, bearer_token)
    }

    pub fn with_token(config: &RuntimeConfig, bearer_token: Option<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint(),
            bearer_token,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn invoke_url(&self, model_id: &ModelId) -> String {
        format!(
            "{}/model/{}/invoke",
            self.endpoint.trim_end_matches('/'),
            urlencoding::encode(model_id.as_str())
        )
    }

    /// Map an HTTP status code to the appropriate `RuntimeError`.
    fn map_http_error(status: reqwest::StatusCode, model_id: &ModelId, body_text: &str) -> RuntimeError {
        let model_id = model_id.to_string();
        match status.as_u16() {
            401 | 403 => RuntimeError::AuthFailed { model_id },
            404 => RuntimeError::ModelNotFound { model_id },
            429 => RuntimeError::Throttled { model_id },
            code => {
                let message = serde_json::from_str::<Value>(body_text)
                    .ok()
                    .and_then(|v| v["message"].as_str().map(str::to_string))
                    .unwrap_or_else(|| body_text.to_string());
                RuntimeError::Api {
                    status: code,
                    message,
                }
            }
        }
    }
}

#[async_trait]
impl InferenceRuntime for HttpRuntime {
    async fn invoke(&self, model_id: &ModelId, body: &Value) -> Result<Vec<u8>, RuntimeError> {
        let url = self.invoke_url(model_id);
        debug!(model_id = %model_id, url = url.as_str(), "Invoking model");

        let payload = serde_json::to_vec(body).map_err(|e| RuntimeError::Encode {
            message: e.to_string(),
        })?;

        let mut request = self
            .client
            .post(&url)
            .header("accept", "application/json")
            .header("content-type", "application/json")
            .body(payload);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| RuntimeError::Transport {
            message: format!("Request to inference endpoint failed: {}", e),
        })?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| RuntimeError::Transport {
            message: format!("Failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            return Err(Self::map_http_error(
                status,
                model_id,
                &String::from_utf8_lossy(&bytes),
            ));
        }

        debug!(model_id = %model_id, bytes = bytes.len(), "Model replied");
        Ok(bytes.to_vec())
    }
}

/// A recorded call made against [`MockRuntime`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedInvocation {
    pub model_id: String,
    pub body: Value,
}

/// A mock runtime for testing and offline use.
///
/// Replies are returned in the order they were queued. When the queue is
/// empty, a fallback reply shaped for the requested model is produced.
pub struct MockRuntime {
    replies: Mutex<Vec<Result<Vec<u8>, RuntimeError>>>,
    invocations: Mutex<Vec<RecordedInvocation>>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(Vec::new()),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Create a mock that answers the first call with `reply`.
    pub fn with_reply(reply: Value) -> Self {
        let runtime = Self::new();
        runtime.queue_reply(reply);
        runtime
    }

    /// Queue a JSON reply for the next `invoke` call.
    pub fn queue_reply(&self, reply: Value) {
        self.queue_raw(Ok(serde_json::to_vec(&reply).unwrap_or_default()));
    }

    /// Queue a raw reply or failure for the next `invoke` call.
    pub fn queue_raw(&self, reply: Result<Vec<u8>, RuntimeError>) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push(reply);
        }
    }

    /// All invocations seen so far, oldest first.
    pub fn invocations(&self) -> Vec<RecordedInvocation> {
        self.invocations
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    /// Canned reply in the shape the given model's decoder expects.
    pub fn fallback_reply(model_id: &ModelId) -> Value {
        use crate::model::{ModelFamily, Vendor};

        const NOTE: &str = "I'm a mock model. No queued replies available.";
        // 1x1 transparent PNG.
        const PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

        match ModelFamily::of(model_id) {
            ModelFamily::ClaudeMessages => serde_json::json!({
                "usage": { "input_tokens": 0, "output_tokens": 0 },
                "content": [{ "type": "text", "text": NOTE }],
            }),
            ModelFamily::StableDiffusion => serde_json::json!({
                "artifacts": [{ "base64": PIXEL_PNG, "finishReason": "SUCCESS" }],
            }),
            ModelFamily::TitanImage => serde_json::json!({
                "images": [PIXEL_PNG],
                "error": null,
            }),
            ModelFamily::TextCompletion(vendor) => match vendor {
                Vendor::Anthropic => serde_json::json!({ "completion": NOTE }),
                Vendor::Ai21 => serde_json::json!({ "completions": [{ "data": { "text": NOTE } }] }),
                Vendor::Cohere => serde_json::json!({ "generations": [{ "text": NOTE }] }),
                Vendor::Meta => serde_json::json!({ "generation": NOTE }),
                Vendor::Mistral => serde_json::json!({ "outputs": [{ "text": NOTE }] }),
                Vendor::Stability | Vendor::Amazon | Vendor::Other => {
                    serde_json::json!({ "results": [{ "outputText": NOTE }] })
                }
            },
        }
    }
}

impl Default for MockRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InferenceRuntime for MockRuntime {
    async fn invoke(&self, model_id: &ModelId, body: &Value) -> Result<Vec<u8>, RuntimeError> {
        if let Ok(mut calls) = self.invocations.lock() {
            calls.push(RecordedInvocation {
                model_id: model_id.to_string(),
                body: body.clone(),
            });
        }

        let queued = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| (!replies.is_empty()).then(|| replies.remove(0)));

        match queued {
            Some(reply) => reply,
            None => serde_json::to_vec(&Self::fallback_reply(model_id)).map_err(|e| {
                RuntimeError::Encode {
                    message: e.to_string(),
                }
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(raw: &str) -> ModelId {
        ModelId::parse(raw).unwrap()
    }

    fn test_config() -> RuntimeConfig {
        RuntimeConfig {
            region: "us-west-2".to_string(),
            endpoint_url: None,
            api_key_env: "CALLMODEL_TEST_UNUSED_TOKEN".to_string(),
        }
    }

    #[test]
    fn test_invoke_url_encodes_version_separator() {
        let runtime = HttpRuntime::with_token(&test_config(), None);
        assert_eq!(
            runtime.invoke_url(&id("anthropic.claude-3-haiku-20240307-v1:0")),
            "https://bedrock-runtime.us-west-2.amazonaws.com/model/anthropic.claude-3-haiku-20240307-v1%3A0/invoke"
        );
    }

    #[test]
    fn test_custom_endpoint() {
        let mut config = test_config();
        config.endpoint_url = Some("http://localhost:9000/".to_string());
        let runtime = HttpRuntime::with_token(&config, Some("token".into()));
        assert_eq!(runtime.endpoint(), "http://localhost:9000/");
        assert_eq!(
            runtime.invoke_url(&id("meta.llama2-13b-chat-v1")),
            "http://localhost:9000/model/meta.llama2-13b-chat-v1/invoke"
        );
    }

    #[test]
    fn test_new_reads_token_env() {
        let env_var = "CALLMODEL_TEST_TOKEN_NEW_READS";
        // SAFETY: single-threaded access to a test-unique variable.
        unsafe { std::env::set_var(env_var, "bedrock-api-key") };
        let mut config = test_config();
        config.api_key_env = env_var.to_string();
        let runtime = HttpRuntime::new(&config);
        assert_eq!(runtime.bearer_token.as_deref(), Some("bedrock-api-key"));
        unsafe { std::env::remove_var(env_var) };
    }

    #[test]
    fn test_map_http_error() {
        let model = id("cohere.command-text-v14");
        assert!(matches!(
            HttpRuntime::map_http_error(reqwest::StatusCode::FORBIDDEN, &model, ""),
            RuntimeError::AuthFailed { .. }
        ));
        assert!(matches!(
            HttpRuntime::map_http_error(reqwest::StatusCode::TOO_MANY_REQUESTS, &model, ""),
            RuntimeError::Throttled { .. }
        ));
        assert!(matches!(
            HttpRuntime::map_http_error(reqwest::StatusCode::NOT_FOUND, &model, ""),
            RuntimeError::ModelNotFound { .. }
        ));
        match HttpRuntime::map_http_error(
            reqwest::StatusCode::BAD_REQUEST,
            &model,
            r#"{"message":"Malformed input request"}"#,
        ) {
            RuntimeError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Malformed input request");
            }
            other => panic!("Expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mock_replays_in_order_and_records() {
        let runtime = MockRuntime::with_reply(json!({ "generation": "first" }));
        runtime.queue_raw(Err(RuntimeError::Transport {
            message: "reset".into(),
        }));

        let model = id("meta.llama2-13b-chat-v1");
        let first = runtime.invoke(&model, &json!({ "prompt": "a" })).await.unwrap();
        assert_eq!(serde_json::from_slice::<Value>(&first).unwrap()["generation"], "first");
        assert!(runtime.invoke(&model, &json!({ "prompt": "b" })).await.is_err());

        let calls = runtime.invocations();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].body["prompt"], "b");
        assert_eq!(calls[0].model_id, "meta.llama2-13b-chat-v1");
    }

    #[tokio::test]
    async fn test_mock_fallback_matches_family() {
        let runtime = MockRuntime::new();
        let reply = runtime
            .invoke(&id("stability.stable-diffusion-xl-v1"), &json!({}))
            .await
            .unwrap();
        let value: Value = serde_json::from_slice(&reply).unwrap();
        assert!(value["artifacts"][0]["base64"].is_string());
    }

    /// Requests seen by [`serve_stub`]: model id, `Authorization` header, body.
    type Seen = std::sync::Arc<Mutex<Vec<(String, Option<String>, Vec<u8>)>>>;

    /// Serve a throwaway `InvokeModel` endpoint on a loopback port. Cohere
    /// ids are throttled, Amazon ids are refused, everything else echoes a
    /// fixed reply.
    async fn serve_stub() -> (String, Seen) {
        use axum::{
            Router,
            body::Bytes,
            extract::{Path, State},
            http::{HeaderMap, StatusCode, header},
            routing::post,
        };

        async fn stub(
            State(seen): State<Seen>,
            Path(model_id): Path<String>,
            headers: HeaderMap,
            body: Bytes,
        ) -> (StatusCode, String) {
            let auth = headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            seen.lock().unwrap().push((model_id.clone(), auth, body.to_vec()));
            if model_id.starts_with("cohere.") {
                (StatusCode::TOO_MANY_REQUESTS, r#"{"message":"Too many requests"}"#.into())
            } else if model_id.starts_with("amazon.") {
                (StatusCode::FORBIDDEN, String::new())
            } else {
                (StatusCode::OK, r#"{"generation": "from the stub"}"#.into())
            }
        }

        let seen = Seen::default();
        let app = Router::new()
            .route("/model/{model_id}/invoke", post(stub))
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), seen)
    }

    fn stub_runtime(endpoint: String, token: Option<&str>) -> HttpRuntime {
        let mut config = test_config();
        config.endpoint_url = Some(endpoint);
        HttpRuntime::with_token(&config, token.map(str::to_string))
    }

    #[tokio::test]
    async fn test_http_invoke_returns_body_unchanged() {
        let (endpoint, seen) = serve_stub().await;
        let runtime = stub_runtime(endpoint, Some("bedrock-api-key"));

        let body = json!({ "prompt": "hi", "max_gen_len": 512 });
        let reply = runtime
            .invoke(&id("meta.llama2-13b-chat-v1"), &body)
            .await
            .unwrap();
        assert_eq!(reply, br#"{"generation": "from the stub"}"#.to_vec());

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        let (model_id, auth, sent) = &seen[0];
        assert_eq!(model_id, "meta.llama2-13b-chat-v1");
        assert_eq!(auth.as_deref(), Some("Bearer bedrock-api-key"));
        assert_eq!(serde_json::from_slice::<Value>(sent).unwrap(), body);
    }

    #[tokio::test]
    async fn test_http_invoke_decodes_path_and_maps_statuses() {
        let (endpoint, seen) = serve_stub().await;
        let runtime = stub_runtime(endpoint, None);

        let throttled = runtime
            .invoke(&id("cohere.command-text-v14"), &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(
            throttled,
            RuntimeError::Throttled { ref model_id } if model_id == "cohere.command-text-v14"
        ));

        let refused = runtime
            .invoke(&id("amazon.titan-text-express-v1"), &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(refused, RuntimeError::AuthFailed { .. }));

        runtime
            .invoke(&id("anthropic.claude-3-haiku-20240307-v1:0"), &json!({}))
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert!(seen.iter().all(|(_, auth, _)| auth.is_none()));
        assert_eq!(seen[2].0, "anthropic.claude-3-haiku-20240307-v1:0");
    }

    #[tokio::test]
    async fn test_http_invoke_unreachable_endpoint_is_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let runtime = stub_runtime(format!("http://{addr}"), None);
        let err = runtime
            .invoke(&id("meta.llama2-13b-chat-v1"), &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Transport { .. }));
    }
}
