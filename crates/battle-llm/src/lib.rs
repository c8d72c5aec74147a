pub mod anthropic;
pub mod factory;
pub mod gemini;
pub mod models;
pub mod openai;
pub mod sse;
mod transport;

pub mod mock;

pub use anthropic::AnthropicProvider;
pub use factory::{Endpoints, ProviderFactory};
pub use gemini::GeminiProvider;
pub use mock::{MockProvider, MockResponse};
pub use models::{available_models, display_name, AvailableModels, ModelInfo};
pub use openai::OpenAiProvider;
