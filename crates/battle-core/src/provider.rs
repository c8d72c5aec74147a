use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};

use crate::errors::GatewayError;
use crate::stream::StreamEvent;

pub type ProviderStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Per-call generation parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 8192,
        }
    }
}

/// Trait implemented by each model backend (OpenAI, Gemini, Anthropic).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;

    /// Stream the answer to a single user prompt as text fragments.
    async fn stream(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<ProviderStream, GatewayError>;

    /// One-shot answer. Drains [`stream`](Self::stream) by default.
    async fn complete(
        &self,
        prompt: &str,
        options: &CompletionOptions,
    ) -> Result<String, GatewayError> {
        let mut stream = self.stream(prompt, options).await?;
        let mut text = String::new();
        while let Some(event) = stream.next().await {
            match event {
                StreamEvent::Start => {}
                StreamEvent::TextDelta { delta } => text.push_str(&delta),
                StreamEvent::Done { text: full } => return Ok(full),
                StreamEvent::Error { error } => return Err(error),
            }
        }
        Ok(text)
    }
}
