use secrecy::SecretString;

use crate::participant::ProviderKind;

/// Wraps an API key with secrecy protection (zeroized on drop, redacted in Debug).
#[derive(Clone)]
pub struct ApiKey(pub SecretString);

impl ApiKey {
    /// Returns `None` for an empty or whitespace-only value.
    pub fn from_non_empty(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self(SecretString::from(trimmed.to_string())))
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

/// Credentials for every provider; a missing key disables that provider.
#[derive(Clone, Debug, Default)]
pub struct ApiKeys {
    pub openai: Option<ApiKey>,
    pub gemini: Option<ApiKey>,
    pub anthropic: Option<ApiKey>,
}

impl ApiKeys {
    pub fn get(&self, provider: ProviderKind) -> Option<&ApiKey> {
        match provider {
            ProviderKind::OpenAI => self.openai.as_ref(),
            ProviderKind::Gemini => self.gemini.as_ref(),
            ProviderKind::Anthropic => self.anthropic.as_ref(),
        }
    }

    /// Providers with a configured key, in canonical order.
    pub fn configured(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL
            .into_iter()
            .filter(|p| self.get(*p).is_some())
            .collect()
    }
}

/// Environment variable names for each provider.
pub mod env_vars {
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";
    pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
    pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
}
