use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use parking_lot::Mutex;

use battle_core::errors::GatewayError;
use battle_core::provider::{CompletionOptions, LlmProvider, ProviderStream};
use battle_core::stream::StreamEvent;

/// Pre-programmed responses for deterministic testing without API calls.
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Yield a sequence of StreamEvents.
    Stream(Vec<StreamEvent>),
    /// Return an error from the stream() call itself.
    Error(GatewayError),
    /// Wait a duration, then yield the inner response.
    Delay(Duration, Box<MockResponse>),
    /// Panic inside the stream() call.
    Panic(&'static str),
}

impl MockResponse {
    pub fn stream_text(text: &str) -> Self {
        Self::stream_chunks(&[text])
    }

    /// A stream that yields each chunk as its own delta.
    pub fn stream_chunks(chunks: &[&str]) -> Self {
        let mut events = vec![StreamEvent::Start];
        events.extend(chunks.iter().map(|c| StreamEvent::TextDelta {
            delta: (*c).to_string(),
        }));
        events.push(StreamEvent::Done {
            text: chunks.concat(),
        });
        Self::Stream(events)
    }

    /// A stream that yields `chunks` and then fails.
    pub fn stream_error(chunks: &[&str], error: GatewayError) -> Self {
        let mut events = vec![StreamEvent::Start];
        events.extend(chunks.iter().map(|c| StreamEvent::TextDelta {
            delta: (*c).to_string(),
        }));
        events.push(StreamEvent::Error { error });
        Self::Stream(events)
    }

    pub fn delayed(delay: Duration, inner: MockResponse) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Mock provider that returns pre-programmed responses in sequence and
/// records every prompt it receives.
pub struct MockProvider {
    name: String,
    model: String,
    responses: Vec<MockResponse>,
    call_count: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            name: "mock".into(),
            model: "mock-model".into(),
            responses,
            call_count: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_identity(mut self, name: &str, model: &str) -> Self {
        self.name = name.into();
        self.model = model.into();
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn stream(
        &self,
        prompt: &str,
        _options: &CompletionOptions,
    ) -> Result<ProviderStream, GatewayError> {
        self.prompts.lock().push(prompt.to_string());
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);

        let Some(response) = self.responses.get(idx).cloned() else {
            return Err(GatewayError::InvalidRequest(format!(
                "MockProvider: no response configured for call {idx}"
            )));
        };

        resolve_response(response).await
    }
}

/// Unrolls nested delays iteratively to avoid recursive async.
async fn resolve_response(response: MockResponse) -> Result<ProviderStream, GatewayError> {
    let mut current = response;
    loop {
        match current {
            MockResponse::Stream(events) => return Ok(Box::pin(stream::iter(events))),
            MockResponse::Error(e) => return Err(e),
            MockResponse::Delay(duration, inner) => {
                tokio::time::sleep(duration).await;
                current = *inner;
            }
            MockResponse::Panic(message) => panic!("{message}"),
        }
    }
}
