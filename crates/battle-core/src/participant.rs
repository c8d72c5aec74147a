use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported model providers.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAI,
    Gemini,
    Anthropic,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 3] = [Self::OpenAI, Self::Gemini, Self::Anthropic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAI => "openai",
            Self::Gemini => "gemini",
            Self::Anthropic => "anthropic",
        }
    }

    /// Vendor name used in human-facing messages.
    pub fn vendor_name(&self) -> &'static str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Gemini => "Google",
            Self::Anthropic => "Anthropic",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseParticipantError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("expected <provider>:<model>, got {0:?}")]
    Malformed(String),
}

impl FromStr for ProviderKind {
    type Err = ParseParticipantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAI),
            "gemini" | "google" => Ok(Self::Gemini),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(ParseParticipantError::UnknownProvider(other.to_string())),
        }
    }
}

/// One debate contestant: a provider plus a provider-specific model id.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Participant {
    pub provider: ProviderKind,
    pub model_id: String,
}

impl Participant {
    pub fn new(provider: ProviderKind, model_id: impl Into<String>) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
        }
    }

    /// Key under which this participant's latest answer is recorded.
    /// Two participants with the same provider and model share a key.
    pub fn response_key(&self) -> String {
        format!("{}_{}", self.provider, self.model_id)
    }

    /// Pair used when a debate is requested with fewer than two participants.
    pub fn default_pair() -> Vec<Participant> {
        vec![
            Participant::new(ProviderKind::OpenAI, "gpt-4.1"),
            Participant::new(ProviderKind::Gemini, "gemini-2.5-flash"),
        ]
    }
}

/// Substitute the default pair when fewer than two participants were given.
pub fn participants_or_default(participants: Option<Vec<Participant>>) -> Vec<Participant> {
    match participants {
        Some(list) if list.len() >= 2 => list,
        _ => Participant::default_pair(),
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model_id)
    }
}

impl FromStr for Participant {
    type Err = ParseParticipantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (provider, model) = s
            .split_once(':')
            .filter(|(_, m)| !m.trim().is_empty())
            .ok_or_else(|| ParseParticipantError::Malformed(s.to_string()))?;
        Ok(Self::new(provider.parse()?, model.trim()))
    }
}
