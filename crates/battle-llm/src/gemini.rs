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

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini `streamGenerateContent` adapter.
pub struct GeminiProvider {
    client: Client,
    api_key: ApiKey,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(client: Client, api_key: ApiKey, model: impl Into<String>, base_url: Option<&str>) -> Self {
        Self {
            client,
            api_key,
            model: model.into(),
            base_url: transport::trim_base_url(base_url.unwrap_or(DEFAULT_BASE_URL)),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }

    fn request_body(&self, prompt: &str, options: &CompletionOptions) -> Value {
        json!({
            "contents": [{"role": "user", "parts": [{"text": prompt}]}],
            "generationConfig": {
                "temperature": options.temperature,
                "maxOutputTokens": options.max_tokens,
            },
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
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
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.0.expose_secret())
            .json(&self.request_body(prompt, options));

        let resp = transport::send(req).await?;
        Ok(Box::pin(SseStream::new(resp.bytes_stream(), GeminiDecoder)))
    }
}

/// Decodes `GenerateContentResponse` chunks.
pub struct GeminiDecoder;

impl SseDecoder for GeminiDecoder {
    fn decode(&mut self, frame: &SseFrame) -> Vec<StreamEvent> {
        let data = frame.data.trim();
        if data.is_empty() {
            return Vec::new();
        }

        let chunk: GenerateChunk = match serde_json::from_str(data) {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!(error = %e, "skipping unparseable Gemini chunk");
                return Vec::new();
            }
        };

        if let Some(err) = chunk.error {
            let status = err.code.unwrap_or(500);
            return vec![StreamEvent::Error {
                error: GatewayError::from_status(status, err.message),
            }];
        }

        let Some(candidate) = chunk.candidates.into_iter().next() else {
            return Vec::new();
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.is_empty() {
            if let Some(reason) = candidate.finish_reason.filter(|r| is_blocking_finish(r)) {
                return vec![StreamEvent::Error {
                    error: GatewayError::InvalidRequest(format!("response blocked: {reason}")),
                }];
            }
            return Vec::new();
        }

        vec![StreamEvent::TextDelta { delta: text }]
    }
}

fn is_blocking_finish(reason: &str) -> bool {
    matches!(reason, "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")
}

#[derive(Deserialize)]
struct GenerateChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<GeminiError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiError {
    code: Option<u16>,
    message: String,
}
