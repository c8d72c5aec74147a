use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{instrument, warn};

use battle_core::errors::GatewayError;
use battle_core::provider::{CompletionOptions, LlmProvider, ProviderStream};
use battle_core::security::ApiKey;
use battle_core::stream::StreamEvent;

use crate::sse::{SseDecoder, SseFrame, SseStream};
use crate::transport;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Chat Completions adapter.
pub struct OpenAiProvider {
    client: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(client: Client, api_key: ApiKey, model: impl Into<String>, base_url: Option<&str>) -> Self {
        Self {
            client,
            api_key,
            model: model.into(),
            base_url: transport::trim_base_url(base_url.unwrap_or(DEFAULT_BASE_URL)),
        }
    }

    fn request_body(&self, prompt: &str, options: &CompletionOptions) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "max_completion_tokens": options.max_tokens,
            "stream": true,
        });
        // Reasoning models only accept the default temperature.
        if !is_reasoning_model(&self.model) {
            body["temperature"] = json!(options.temperature);
        }
        body
    }
}

fn is_reasoning_model(model: &str) -> bool {
    let mut chars = model.chars();
    chars.next() == Some('o') && chars.next().is_some_and(|c| c.is_ascii_digit())
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    #[instrument(skip(self, prompt, options), fields(model = %self.model))]
    async fn stream(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<ProviderStream, GatewayError> {
        let req = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(self.api_key.0.expose_secret())
            .header("accept", "text/event-stream")
            .json(&self.request_body(prompt, options));

        let resp = transport::send(req).await?;
        Ok(Box::pin(SseStream::new(resp.bytes_stream(), OpenAiDecoder)))
    }
}

/// Decodes `chat.completion.chunk` payloads.
pub struct OpenAiDecoder;

impl SseDecoder for OpenAiDecoder {
    fn decode(&mut self, frame: &SseFrame) -> Vec<StreamEvent> {
        let data = frame.data.trim();
        if data.is_empty() || data == "[DONE]" {
            return Vec::new();
        }

        let chunk: ChatChunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(error = %e, "skipping unparseable OpenAI chunk");
                return Vec::new();
            }
        };

        if let Some(err) = chunk.error {
            return vec![StreamEvent::Error {
                error: classify_error(&err),
            }];
        }

        chunk
            .choices
            .into_iter()
            .filter_map(|c| c.delta.content)
            .filter(|text| !text.is_empty())
            .map(|delta| StreamEvent::TextDelta { delta })
            .collect()
    }
}

fn classify_error(err: &ErrorPayload) -> GatewayError {
    let is = |names: &[&str]| {
        [err.error_type.as_deref(), err.code.as_deref()]
            .into_iter()
            .flatten()
            .any(|k| names.contains(&k))
    };
    if is(&["invalid_api_key", "authentication_error"]) {
        GatewayError::AuthenticationFailed(err.message.clone())
    } else if is(&["rate_limit_exceeded", "insufficient_quota"]) {
        GatewayError::RateLimited { retry_after: None }
    } else if is(&["invalid_request_error"]) {
        GatewayError::InvalidRequest(err.message.clone())
    } else {
        GatewayError::ServerError {
            status: 500,
            body: err.message.clone(),
        }
    }
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<ErrorPayload>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorPayload {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use secrecy::SecretString;

    fn provider(model: &str, base_url: Option<&str>) -> OpenAiProvider {
        OpenAiProvider::new(
            transport::build_client().unwrap(),
            ApiKey(SecretString::from("sk-test")),
            model,
            base_url,
        )
    }

    fn frame(data: &str) -> SseFrame {
        SseFrame {
            event: None,
            data: data.into(),
        }
    }

    #[test]
    fn provider_properties() {
        let p = provider("gpt-4.1", None);
        assert_eq!(p.name(), "openai");
        assert_eq!(p.model(), "gpt-4.1");
        assert_eq!(p.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn request_body_carries_options() {
        let p = provider("gpt-4.1", None);
        let body = p.request_body("What is AI?", &CompletionOptions::default());
        assert_eq!(body["model"], "gpt-4.1");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "What is AI?");
        assert_eq!(body["temperature"], 0.7);
        assert_eq!(body["max_completion_tokens"], 8192);
        assert!(body.get("max_tokens").is_none());
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn reasoning_models_omit_temperature() {
        assert!(is_reasoning_model("o4-mini"));
        assert!(!is_reasoning_model("gpt-4o"));
        let body = provider("o4-mini", None).request_body("q", &CompletionOptions::default());
        assert!(body.get("temperature").is_none());
        assert_eq!(body["max_completion_tokens"], 8192);
    }

    #[test]
    fn decode_content_delta() {
        let events = OpenAiDecoder.decode(&frame(
            r#"{"id":"c1","object":"chat.completion.chunk","choices":[{"index":0,"delta":{"content":"Hello"}}]}"#,
        ));
        assert!(matches!(&events[..], [StreamEvent::TextDelta { delta }] if delta == "Hello"));
    }

    #[test]
    fn decode_skips_role_only_and_done() {
        let role_only = r#"{"choices":[{"index":0,"delta":{"role":"assistant","content":""}}]}"#;
        assert!(OpenAiDecoder.decode(&frame(role_only)).is_empty());
        assert!(OpenAiDecoder.decode(&frame("[DONE]")).is_empty());
        assert!(OpenAiDecoder
            .decode(&frame(r#"{"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#))
            .is_empty());
    }

    #[test]
    fn decode_error_payload() {
        let events = OpenAiDecoder.decode(&frame(
            r#"{"error":{"message":"Rate limit reached","type":"requests","code":"rate_limit_exceeded"}}"#,
        ));
        assert!(matches!(
            &events[..],
            [StreamEvent::Error { error: GatewayError::RateLimited { .. } }]
        ));

        let events = OpenAiDecoder.decode(&frame(r#"{"error":{"message":"boom","type":"server_error"}}"#));
        assert!(matches!(
            &events[..],
            [StreamEvent::Error { error: GatewayError::ServerError { status: 500, .. } }]
        ));

        let events = OpenAiDecoder.decode(&frame(
            r#"{"error":{"message":"Incorrect API key","type":"invalid_api_key"}}"#,
        ));
        assert!(matches!(
            &events[..],
            [StreamEvent::Error { error: GatewayError::AuthenticationFailed(_) }]
        ));
    }

    #[tokio::test]
    async fn streams_from_server() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"AI is \"}}]}\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"software.\"}}]}\n\n\
                    data: [DONE]\n\n";
        let (base, server) = transport::serve_once(200, body).await;
        let p = provider("gpt-4.1", Some(&base));

        let events: Vec<StreamEvent> = p
            .stream("What is AI?", &CompletionOptions::default())
            .await
            .unwrap()
            .collect()
            .await;

        match events.last() {
            Some(StreamEvent::Done { text }) => assert_eq!(text, "AI is software."),
            other => panic!("expected Done, got {other:?}"),
        }

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/chat/completions"));
        assert!(request.to_lowercase().contains("authorization: bearer sk-test"));
    }

    #[tokio::test]
    async fn status_error_returned_before_streaming() {
        let (base, _server) = transport::serve_once(429, "slow down").await;
        let p = provider("gpt-4.1", Some(&base));
        let result = p.stream("q", &CompletionOptions::default()).await;
        assert!(matches!(result, Err(GatewayError::RateLimited { .. })));
    }
}
