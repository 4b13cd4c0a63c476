use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Clone, Debug)]
pub struct OpenAiClientConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub default_timeout: Duration,
    pub max_error_body_bytes: usize,
}

impl OpenAiClientConfig {
    /// Any OpenAI-compatible endpoint works, including Gemini's
    /// `https://generativelanguage.googleapis.com/v1beta/openai` surface.
    pub fn from_env() -> Self {
        let base_url = std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| {
            "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
        });

        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());

        let default_timeout = std::env::var("OPENAI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(60));

        let max_error_body_bytes = std::env::var("OPENAI_MAX_ERROR_BODY_BYTES")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(8 * 1024);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            default_timeout,
            max_error_body_bytes,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OpenAiClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("upstream returned error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },

    #[error("upstream returned non-JSON error: status={status} body={body}")]
    UpstreamBody { status: StatusCode, body: String },

    #[error("completion contained no message content")]
    EmptyCompletion,
}

/// Thin chat-completions client. Calls are made once; failures go straight back
/// to the caller.
#[derive(Clone)]
pub struct OpenAiClient {
    config: OpenAiClientConfig,
    http: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(config: OpenAiClientConfig) -> Result<Self, OpenAiClientError> {
        let http = reqwest::Client::builder()
            .user_agent("faq-generator")
            .timeout(config.default_timeout)
            .build()?;
        Ok(Self { config, http })
    }

    pub async fn chat_completions(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ChatCompletionResponse, OpenAiClientError> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let mut builder = self.http.post(&url).json(request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = read_limited_text(resp, self.config.max_error_body_bytes).await;
            return Err(upstream_error(status, body));
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Single user-turn prompt; returns the first choice's text.
    pub async fn complete_prompt(
        &self,
        model: &str,
        prompt: &str,
    ) -> Result<String, OpenAiClientError> {
        let request = ChatCompletionRequest {
            model: model.to_string(),
            messages: vec![ChatMessage::user(prompt)],
        };
        let response = self.chat_completions(&request).await?;
        let text = response
            .first_text()
            .filter(|t| !t.trim().is_empty())
            .ok_or(OpenAiClientError::EmptyCompletion)?;
        debug!(model, chars = text.len(), "completion received");
        Ok(text.to_string())
    }
}

fn upstream_error(status: StatusCode, body: String) -> OpenAiClientError {
    // Gemini's compatibility layer sometimes wraps the envelope in a one-element array.
    // Derived struct deserializers also accept sequences, so branch on the JSON shape.
    let envelope = match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(serde_json::Value::Array(items)) => items
            .into_iter()
            .next()
            .and_then(|first| serde_json::from_value::<OpenAiErrorEnvelope>(first).ok()),
        Ok(value @ serde_json::Value::Object(_)) => {
            serde_json::from_value::<OpenAiErrorEnvelope>(value).ok()
        }
        _ => None,
    };
    if let Some(parsed) = envelope {
        let message = parsed
            .error
            .message
            .unwrap_or_else(|| "unknown upstream error".to_string());
        return OpenAiClientError::Upstream { status, message };
    }
    OpenAiClientError::UpstreamBody { status, body }
}

async fn read_limited_text(resp: reqwest::Response, max_bytes: usize) -> String {
    match resp.bytes().await {
        Ok(mut b) => {
            if b.len() > max_bytes {
                b.truncate(max_bytes);
            }
            String::from_utf8_lossy(&b).to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to read upstream error body");
            "<failed to read error body>".to_string()
        }
    }
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorEnvelope {
    error: OpenAiErrorObject,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorObject {
    message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// Only the fields the client reads; everything else in the response is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

impl ChatCompletionResponse {
    pub fn first_text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatChoiceMessage {
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_text_reads_first_choice() {
        let json = r#"{
            "id": "c1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "Looks good."}, "finish_reason": "stop"},
                {"index": 1, "message": {"role": "assistant", "content": "ignored"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
        }"#;
        let resp: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.first_text(), Some("Looks good."));
    }

    #[test]
    fn first_text_none_without_choices() {
        let resp: ChatCompletionResponse =
            serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert_eq!(resp.first_text(), None);
    }

    #[test]
    fn upstream_error_extracts_message() {
        let body = r#"{"error": {"message": "API key not valid", "type": "invalid_request"}}"#;
        match upstream_error(StatusCode::BAD_REQUEST, body.to_string()) {
            OpenAiClientError::Upstream { status, message } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn upstream_error_accepts_wrapped_envelope() {
        let body = r#"[{"error": {"message": "quota exceeded"}}]"#;
        assert!(matches!(
            upstream_error(StatusCode::TOO_MANY_REQUESTS, body.to_string()),
            OpenAiClientError::Upstream { message, .. } if message == "quota exceeded"
        ));
    }

    #[test]
    fn upstream_error_reads_first_of_several_wrapped_envelopes() {
        let body = r#"[{"error": {"message": "model overloaded"}}, {"error": {"message": "second"}}]"#;
        assert!(matches!(
            upstream_error(StatusCode::SERVICE_UNAVAILABLE, body.to_string()),
            OpenAiClientError::Upstream { message, .. } if message == "model overloaded"
        ));
    }

    #[test]
    fn upstream_error_keeps_raw_body() {
        assert!(matches!(
            upstream_error(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>".to_string()),
            OpenAiClientError::UpstreamBody { body, .. } if body.contains("bad gateway")
        ));
    }

    #[test]
    fn request_is_a_single_user_turn() {
        let request = ChatCompletionRequest {
            model: "gemini-2.5-flash".to_string(),
            messages: vec![ChatMessage::user("Review these steps")],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "model": "gemini-2.5-flash",
                "messages": [{"role": "user", "content": "Review these steps"}]
            })
        );
    }
}
