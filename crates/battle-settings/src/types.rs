//! Settings types. Field names are camelCase on disk.

use serde::{Deserialize, Serialize};

/// Root settings object.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BattleSettings {
    pub server: ServerSettings,
    pub debate: DebateSettings,
    pub providers: ProviderSettings,
    pub logging: LoggingSettings,
}

/// HTTP listener settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    pub port: u16,
    /// Browser origins allowed to call the API. `*` allows any.
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
            ],
        }
    }
}

/// Debate defaults and limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DebateSettings {
    /// Rounds used when a request omits `max_rounds` or sends 0.
    pub default_max_rounds: u32,
    /// Largest `max_rounds` a request may ask for.
    pub max_rounds_limit: u32,
    /// Pause between rounds, in milliseconds.
    pub round_delay_ms: u64,
    pub temperature: f64,
    pub max_tokens: u32,
    /// Capacity of each debate's event channel.
    pub event_buffer: usize,
}

impl Default for DebateSettings {
    fn default() -> Self {
        Self {
            default_max_rounds: 2,
            max_rounds_limit: 20,
            round_delay_ms: 500,
            temperature: 0.7,
            max_tokens: 8192,
            event_buffer: 256,
        }
    }
}

/// Base URL overrides for the model providers. Unset means the public API.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai_base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini_base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anthropic_base_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
