use std::collections::HashMap;
use std::sync::Arc;

use battle_core::errors::GatewayError;
use battle_core::participant::{Participant, ProviderKind};
use battle_core::provider::LlmProvider;
use battle_core::security::{ApiKey, ApiKeys};

use crate::anthropic::AnthropicProvider;
use crate::gemini::GeminiProvider;
use crate::openai::OpenAiProvider;
use crate::transport;

pub type ProviderConstructor =
    Arc<dyn Fn(&Participant) -> Result<Arc<dyn LlmProvider>, GatewayError> + Send + Sync>;

/// Base URL overrides, one per provider. `None` uses the public endpoint.
#[derive(Clone, Debug, Default)]
pub struct Endpoints {
    pub openai: Option<String>,
    pub gemini: Option<String>,
    pub anthropic: Option<String>,
}

/// Maps provider tags to adapter constructors.
#[derive(Clone, Default)]
pub struct ProviderFactory {
    constructors: HashMap<ProviderKind, ProviderConstructor>,
}

impl ProviderFactory {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register (or replace) the constructor for a provider.
    pub fn register<F>(&mut self, provider: ProviderKind, constructor: F)
    where
        F: Fn(&Participant) -> Result<Arc<dyn LlmProvider>, GatewayError> + Send + Sync + 'static,
    {
        self.constructors.insert(provider, Arc::new(constructor));
    }

    pub fn with<F>(mut self, provider: ProviderKind, constructor: F) -> Self
    where
        F: Fn(&Participant) -> Result<Arc<dyn LlmProvider>, GatewayError> + Send + Sync + 'static,
    {
        self.register(provider, constructor);
        self
    }

    /// Factory for the HTTP adapters. A provider whose key is missing still
    /// gets a constructor; it fails with a configuration error when used.
    pub fn from_keys(keys: ApiKeys, endpoints: Endpoints) -> Result<Self, GatewayError> {
        let client = transport::build_client()?;
        let mut factory = Self::empty();

        for provider in ProviderKind::ALL {
            let key = keys.get(provider).cloned();
            let base_url = match provider {
                ProviderKind::OpenAI => endpoints.openai.clone(),
                ProviderKind::Gemini => endpoints.gemini.clone(),
                ProviderKind::Anthropic => endpoints.anthropic.clone(),
            };
            let client = client.clone();

            factory.register(provider, move |participant| {
                let key = require_key(provider, key.as_ref())?;
                let base_url = base_url.as_deref();
                let model = participant.model_id.clone();
                let adapter: Arc<dyn LlmProvider> = match provider {
                    ProviderKind::OpenAI => Arc::new(OpenAiProvider::new(client.clone(), key, model, base_url)),
                    ProviderKind::Gemini => Arc::new(GeminiProvider::new(client.clone(), key, model, base_url)),
                    ProviderKind::Anthropic => {
                        Arc::new(AnthropicProvider::new(client.clone(), key, model, base_url))
                    }
                };
                Ok(adapter)
            });
        }

        Ok(factory)
    }

    pub fn supports(&self, provider: ProviderKind) -> bool {
        self.constructors.contains_key(&provider)
    }

    /// Build the adapter for one participant.
    pub fn create(&self, participant: &Participant) -> Result<Arc<dyn LlmProvider>, GatewayError> {
        let constructor = self.constructors.get(&participant.provider).ok_or_else(|| {
            GatewayError::Configuration(format!("Unsupported provider: {}", participant.provider))
        })?;
        constructor(participant)
    }
}

fn require_key(provider: ProviderKind, key: Option<&ApiKey>) -> Result<ApiKey, GatewayError> {
    key.cloned().ok_or_else(|| {
        GatewayError::Configuration(format!("{} API key not configured", provider.vendor_name()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockProvider, MockResponse};

    fn keys(openai: bool, gemini: bool, anthropic: bool) -> ApiKeys {
        let key = |on: bool| on.then(|| ApiKey::from_non_empty("k")).flatten();
        ApiKeys {
            openai: key(openai),
            gemini: key(gemini),
            anthropic: key(anthropic),
        }
    }

    #[test]
    fn builds_adapter_for_configured_provider() {
        let factory = ProviderFactory::from_keys(keys(true, true, true), Endpoints::default()).unwrap();
        let adapter = factory
            .create(&Participant::new(ProviderKind::Gemini, "gemini-2.5-pro"))
            .unwrap();
        assert_eq!(adapter.name(), "gemini");
        assert_eq!(adapter.model(), "gemini-2.5-pro");

        let adapter = factory
            .create(&Participant::new(ProviderKind::Anthropic, "claude-haiku-4-5-20251001"))
            .unwrap();
        assert_eq!(adapter.name(), "anthropic");
    }

    #[test]
    fn missing_key_is_configuration_error() {
        let factory = ProviderFactory::from_keys(keys(true, false, false), Endpoints::default()).unwrap();
        let err = factory
            .create(&Participant::new(ProviderKind::Gemini, "gemini-2.5-flash"))
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Google API key not configured");

        let err = factory
            .create(&Participant::new(ProviderKind::Anthropic, "claude"))
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Anthropic API key not configured");
    }

    #[test]
    fn unregistered_provider_rejected() {
        let factory = ProviderFactory::empty();
        assert!(!factory.supports(ProviderKind::OpenAI));
        let err = factory
            .create(&Participant::new(ProviderKind::OpenAI, "gpt-4.1"))
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Unsupported provider: openai");
    }

    #[test]
    fn registered_constructor_replaces_default() {
        let factory = ProviderFactory::from_keys(ApiKeys::default(), Endpoints::default())
            .unwrap()
            .with(ProviderKind::OpenAI, |p| {
                let mock: Arc<dyn LlmProvider> = Arc::new(
                    MockProvider::new(vec![MockResponse::stream_text("hi")]).with_identity("openai", &p.model_id),
                );
                Ok(mock)
            });
        let adapter = factory
            .create(&Participant::new(ProviderKind::OpenAI, "gpt-4o"))
            .unwrap();
        assert_eq!(adapter.model(), "gpt-4o");
    }
}
