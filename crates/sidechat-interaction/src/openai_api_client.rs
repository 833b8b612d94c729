//! OpenAIChatClient - Direct REST API implementation for OpenAI Chat Completions.
//!
//! Sends the whole conversation in one request and waits for the complete
//! reply; no streaming.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use sidechat_core::ChatError;
use sidechat_core::chat::{ChatClient, ChatMessage, ChatRequest};
use sidechat_core::config::{ChatConfig, ChatSettings};

use crate::error_classification::classify_api_error;

/// Reply used when the API answers without any completion text.
pub const EMPTY_COMPLETION_REPLY: &str = "No response generated.";

/// Client implementation that talks to the OpenAI HTTP API.
#[derive(Clone)]
pub struct OpenAIChatClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for OpenAIChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIChatClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAIChatClient {
    /// Creates a client for `base_url` (e.g. `https://api.openai.com/v1`).
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Builds a client from resolved settings.
    ///
    /// Returns `None` when no credential is configured; callers report that
    /// as a configuration error without touching the network.
    pub fn from_settings(settings: &ChatSettings) -> Option<Self> {
        if !settings.has_credential() {
            return None;
        }
        let api_key = settings.api_key.clone()?;
        Some(Self::new(api_key, settings.chat.base_url.clone()).with_config(&settings.chat))
    }

    /// Applies the request timeout from `config`.
    pub fn with_config(mut self, config: &ChatConfig) -> Self {
        self.client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|err| {
                tracing::warn!("[OpenAI] Falling back to default HTTP client: {err}");
                Client::new()
            });
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    async fn send_request(&self, body: &ChatCompletionRequest<'_>) -> Result<String, ChatError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|err| {
                tracing::warn!("[OpenAI] request failed: {err}");
                ChatError::unknown(format!("OpenAI API request failed: {err}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read OpenAI error body".to_string());
            return Err(map_http_error(status, &body_text));
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| ChatError::unknown(format!("Failed to parse OpenAI response: {err}")))?;

        Ok(extract_text_response(parsed))
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        tracing::debug!(
            "[OpenAI] model={} messages={}",
            request.model,
            request.messages.len()
        );

        self.send_request(&body).await
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
    code: Option<String>,
}

fn extract_text_response(response: ChatCompletionResponse) -> String {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.is_empty())
        .unwrap_or_else(|| EMPTY_COMPLETION_REPLY.to_string())
}

/// A body that is not an OpenAI error envelope (e.g. a proxy's HTML page) is
/// only used for classification and never shown to the user.
fn map_http_error(status: StatusCode, body: &str) -> ChatError {
    tracing::warn!("[OpenAI] HTTP {}: {}", status.as_u16(), body);

    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(wrapper) => {
            let message = match wrapper.error.code {
                Some(code) => format!("{} ({})", wrapper.error.message, code),
                None => wrapper.error.message,
            };
            classify_api_error(Some(status.as_u16()), &message)
        }
        Err(_) => match classify_api_error(Some(status.as_u16()), body) {
            ChatError::Unknown(_) => ChatError::unknown(format!(
                "OpenAI API request failed with status {}.",
                status.as_u16()
            )),
            classified => classified,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sidechat_core::chat::ChatRole;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ChatRequest {
        ChatRequest {
            model: "gpt-4".to_string(),
            messages: vec![
                ChatMessage::new(ChatRole::System, "be helpful"),
                ChatMessage::new(ChatRole::User, "explain this"),
            ],
            max_tokens: 2048,
            temperature: 0.7,
        }
    }

    async fn client_for(server: &MockServer) -> OpenAIChatClient {
        OpenAIChatClient::new("sk-test", format!("{}/v1", server.uri()))
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(bearer_token("sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4",
                "max_tokens": 2048,
                "messages": [
                    { "role": "system", "content": "be helpful" },
                    { "role": "user", "content": "explain this" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "It exports a constant." } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let reply = client_for(&server).await.complete(&request()).await.unwrap();
        assert_eq!(reply, "It exports a constant.");
    }

    #[tokio::test]
    async fn test_empty_choices_yield_placeholder_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let reply = client_for(&server).await.complete(&request()).await.unwrap();
        assert_eq!(reply, EMPTY_COMPLETION_REPLY);
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "Incorrect API key provided", "code": "invalid_api_key" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).await.complete(&request()).await.unwrap_err();
        assert_eq!(err, ChatError::Auth);
    }

    #[tokio::test]
    async fn test_quota_and_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "model": "quota" })))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": { "message": "You exceeded your current quota", "code": "insufficient_quota" }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "model": "busy" })))
            .respond_with(ResponseTemplate::new(429).set_body_string("too many requests"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;

        let mut quota = request();
        quota.model = "quota".to_string();
        assert_eq!(client.complete(&quota).await.unwrap_err(), ChatError::Quota);

        let mut busy = request();
        busy.model = "busy".to_string();
        assert_eq!(client.complete(&busy).await.unwrap_err(), ChatError::RateLimit);
    }

    #[tokio::test]
    async fn test_server_error_is_unknown_with_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "error": { "message": "The server had an error" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).await.complete(&request()).await.unwrap_err();
        assert_eq!(err, ChatError::unknown("The server had an error"));
    }

    #[tokio::test]
    async fn test_non_json_error_body_is_not_shown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(502)
                    .set_body_string("<html><body><h1>502 Bad Gateway</h1></body></html>"),
            )
            .mount(&server)
            .await;

        let err = client_for(&server).await.complete(&request()).await.unwrap_err();
        assert_eq!(
            err.user_message(),
            "OpenAI API request failed with status 502."
        );
    }

    #[test]
    fn test_from_settings_requires_credential() {
        let settings = ChatSettings::default();
        assert!(OpenAIChatClient::from_settings(&settings).is_none());

        let settings = ChatSettings {
            api_key: Some("sk-live".to_string()),
            ..Default::default()
        };
        let client = OpenAIChatClient::from_settings(&settings).unwrap();
        assert_eq!(client.endpoint(), "https://api.openai.com/v1/chat/completions");
        assert!(!format!("{client:?}").contains("sk-live"));
    }
}
