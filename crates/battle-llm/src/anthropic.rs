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

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Messages API adapter.
pub struct AnthropicProvider {
    client: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(client: Client, api_key: ApiKey, model: impl Into<String>, base_url: Option<&str>) -> Self {
        Self {
            client,
            api_key,
            model: model.into(),
            base_url: transport::trim_base_url(base_url.unwrap_or(DEFAULT_BASE_URL)),
        }
    }

    fn request_body(&self, prompt: &str, options: &CompletionOptions) -> Value {
        json!({
            "model": self.model,
            "max_tokens": options.max_tokens,
            "temperature": options.temperature,
            "messages": [{"role": "user", "content": prompt}],
            "stream": true,
        })
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
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
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key.0.expose_secret())
            .header("anthropic-version", API_VERSION)
            .header("accept", "application/json")
            .json(&self.request_body(prompt, options));

        let resp = transport::send(req).await?;
        Ok(Box::pin(SseStream::new(resp.bytes_stream(), AnthropicDecoder)))
    }
}

/// Decodes Messages API stream events. Only text deltas and errors matter
/// here; block boundaries and usage are ignored.
pub struct AnthropicDecoder;

impl SseDecoder for AnthropicDecoder {
    fn decode(&mut self, frame: &SseFrame) -> Vec<StreamEvent> {
        if frame.data.trim().is_empty() {
            return Vec::new();
        }

        let payload: EventPayload = match serde_json::from_str(&frame.data) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "skipping unparseable Anthropic event");
                return Vec::new();
            }
        };

        let event_type = frame.event.as_deref().unwrap_or(payload.event_type.as_str());
        match event_type {
            "content_block_delta" => match payload.delta {
                Some(Delta::TextDelta { text }) if !text.is_empty() => {
                    vec![StreamEvent::TextDelta { delta: text }]
                }
                _ => Vec::new(),
            },
            "error" => match payload.error {
                Some(err) => vec![StreamEvent::Error {
                    error: classify_error(&err),
                }],
                None => Vec::new(),
            },
            _ => Vec::new(),
        }
    }
}

fn classify_error(err: &ErrorPayload) -> GatewayError {
    match err.error_type.as_str() {
        "overloaded_error" => GatewayError::ProviderOverloaded,
        "rate_limit_error" => GatewayError::RateLimited { retry_after: None },
        "authentication_error" | "permission_error" => {
            GatewayError::AuthenticationFailed(err.message.clone())
        }
        "invalid_request_error" | "not_found_error" => GatewayError::InvalidRequest(err.message.clone()),
        _ => GatewayError::ServerError {
            status: 500,
            body: err.message.clone(),
        },
    }
}

#[derive(Deserialize)]
struct EventPayload {
    #[serde(rename = "type", default)]
    event_type: String,
    delta: Option<Delta>,
    error: Option<ErrorPayload>,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Delta {
    TextDelta {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ErrorPayload {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}
