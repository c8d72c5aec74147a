use std::collections::BTreeMap;

use serde::Serialize;

use battle_core::participant::ProviderKind;
use battle_core::security::ApiKeys;

/// A selectable model and its human-facing name.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct ModelInfo {
    pub provider: ProviderKind,
    pub id: &'static str,
    pub name: &'static str,
}

const fn model(provider: ProviderKind, id: &'static str, name: &'static str) -> ModelInfo {
    ModelInfo { provider, id, name }
}

static OPENAI_MODELS: &[ModelInfo] = &[
    model(ProviderKind::OpenAI, "gpt-4.1", "GPT-4.1"),
    model(ProviderKind::OpenAI, "gpt-4.1-mini", "GPT-4.1 Mini"),
    model(ProviderKind::OpenAI, "gpt-4o", "GPT-4o"),
    model(ProviderKind::OpenAI, "o4-mini", "o4-mini"),
];

static GEMINI_MODELS: &[ModelInfo] = &[
    model(ProviderKind::Gemini, "gemini-2.5-flash", "Gemini 2.5 Flash"),
    model(ProviderKind::Gemini, "gemini-2.5-pro", "Gemini 2.5 Pro"),
    model(ProviderKind::Gemini, "gemini-2.0-flash", "Gemini 2.0 Flash"),
];

static ANTHROPIC_MODELS: &[ModelInfo] = &[
    model(ProviderKind::Anthropic, "claude-sonnet-4-5-20250929", "Claude Sonnet 4.5"),
    model(ProviderKind::Anthropic, "claude-opus-4-1-20250805", "Claude Opus 4.1"),
    model(ProviderKind::Anthropic, "claude-haiku-4-5-20251001", "Claude Haiku 4.5"),
];

pub fn models_for(provider: ProviderKind) -> &'static [ModelInfo] {
    match provider {
        ProviderKind::OpenAI => OPENAI_MODELS,
        ProviderKind::Gemini => GEMINI_MODELS,
        ProviderKind::Anthropic => ANTHROPIC_MODELS,
    }
}

pub fn find_model(provider: ProviderKind, id: &str) -> Option<&'static ModelInfo> {
    models_for(provider).iter().find(|m| m.id == id)
}

/// Friendly name for a model, or the raw id when it is not in the catalog.
pub fn display_name(provider: ProviderKind, model_id: &str) -> &str {
    find_model(provider, model_id).map_or(model_id, |m| m.name)
}

/// Models usable with the configured credentials.
#[derive(Clone, Debug, Serialize)]
pub struct AvailableModels {
    pub models: BTreeMap<String, Vec<ModelInfo>>,
    pub available_providers: Vec<ProviderKind>,
}

pub fn available_models(keys: &ApiKeys) -> AvailableModels {
    let available_providers = keys.configured();
    let models = available_providers
        .iter()
        .map(|p| (p.as_str().to_string(), models_for(*p).to_vec()))
        .collect();
    AvailableModels {
        models,
        available_providers,
    }
}
